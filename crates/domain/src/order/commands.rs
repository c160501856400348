//! Order commands.

use common::StreamId;

use crate::command::Command;

use super::{CustomerId, Money, Order, OrderLine, ProductId};

/// Command to create an empty order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The order ID to create.
    pub order_id: StreamId,

    /// The customer placing the order.
    pub customer_id: CustomerId,
}

impl CreateOrder {
    /// Creates a new CreateOrder command.
    pub fn new(order_id: StreamId, customer_id: CustomerId) -> Self {
        Self {
            order_id,
            customer_id,
        }
    }

    /// Creates a new CreateOrder command with a generated order ID.
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self::new(StreamId::new(), customer_id)
    }
}

impl Command for CreateOrder {
    type Aggregate = Order;

    fn stream_id(&self) -> StreamId {
        self.order_id
    }
}

/// Command to create an order together with its initial lines.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: StreamId,
    pub customer_id: CustomerId,
    pub lines: Vec<OrderLine>,
}

impl PlaceOrder {
    /// Creates a PlaceOrder command with a generated order ID.
    pub fn new(customer_id: CustomerId, lines: Vec<OrderLine>) -> Self {
        Self {
            order_id: StreamId::new(),
            customer_id,
            lines,
        }
    }
}

impl Command for PlaceOrder {
    type Aggregate = Order;

    fn stream_id(&self) -> StreamId {
        self.order_id
    }
}

/// Command to add a line to an existing order.
#[derive(Debug, Clone)]
pub struct AddOrderLine {
    pub order_id: StreamId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl AddOrderLine {
    /// Creates a new AddOrderLine command.
    pub fn new(
        order_id: StreamId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            order_id,
            product_id,
            quantity,
            unit_price,
        }
    }
}

impl Command for AddOrderLine {
    type Aggregate = Order;

    fn stream_id(&self) -> StreamId {
        self.order_id
    }
}
