//! Order aggregate and related types.

mod aggregate;
mod commands;
mod details;
mod events;
mod service;
mod value_objects;

pub use aggregate::Order;
pub use commands::{AddOrderLine, CreateOrder, PlaceOrder};
pub use details::{OrderDetails, OrderLineDetails};
pub use events::{
    ORDER_CREATED, ORDER_LINE_ADDED, OrderCreatedData, OrderEvent, OrderLineAddedData,
};
pub use service::OrderService;
pub use value_objects::{Currency, CustomerId, Money, OrderLine, ProductId};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Customer ID is required.
    #[error("Customer ID is required")]
    CustomerIdRequired,

    /// Order is already created.
    #[error("Order already created")]
    AlreadyCreated,

    /// Order has not been created yet.
    #[error("Order has not been created")]
    NotCreated,

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Invalid price.
    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: i64 },

    /// A line is priced in a different currency than the order.
    #[error("Currency mismatch: order is in {expected}, line is in {actual}")]
    CurrencyMismatch { expected: Currency, actual: Currency },

    /// Malformed currency code.
    #[error("Invalid currency code: {code:?}")]
    InvalidCurrency { code: String },

    /// A total exceeded the representable range.
    #[error("Amount overflow")]
    AmountOverflow,
}
