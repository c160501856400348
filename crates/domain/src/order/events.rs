//! Order domain events.
//!
//! Type tags are part of the stored format and must never change once
//! events carrying them have been written.

use chrono::{DateTime, Utc};
use common::StreamId;
use serde::{Deserialize, Serialize};

use event_store::DomainEvent;

use super::{Currency, CustomerId, Money, ProductId};

/// Tag of [`OrderEvent::OrderCreated`].
pub const ORDER_CREATED: &str = "sales.orders.OrderCreated";

/// Tag of [`OrderEvent::OrderLineAdded`].
pub const ORDER_LINE_ADDED: &str = "sales.orders.OrderLineAdded";

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was created.
    #[serde(rename = "sales.orders.OrderCreated")]
    OrderCreated(OrderCreatedData),

    /// A line was added to the order.
    #[serde(rename = "sales.orders.OrderLineAdded")]
    OrderLineAdded(OrderLineAddedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => ORDER_CREATED,
            OrderEvent::OrderLineAdded(_) => ORDER_LINE_ADDED,
        }
    }

    fn event_types() -> &'static [&'static str] {
        &[ORDER_CREATED, ORDER_LINE_ADDED]
    }
}

/// Data for OrderCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    pub order_id: StreamId,
    pub customer_id: CustomerId,
    pub created_at_utc: DateTime<Utc>,
}

/// Data for OrderLineAdded event.
///
/// The price is flattened into minor units plus currency code so that read
/// models can consume the payload without the domain's value objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineAddedData {
    pub order_id: StreamId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: i64,
    pub currency: Currency,
}

impl OrderLineAddedData {
    /// Returns the unit price as money.
    pub fn unit_price(&self) -> Money {
        Money::new(self.unit_price, self.currency.clone())
    }
}
