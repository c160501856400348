//! Domain layer for the event-sourced orders core.
//!
//! This crate provides:
//! - [`Aggregate`] trait and the [`EventSourced`] replay/mutation engine
//! - [`CommandHandler`] implementing the load → decide → append write path
//! - Order aggregate with its events, value objects and read-side mapping

pub mod aggregate;
pub mod command;
pub mod error;
pub mod order;

pub use aggregate::{Aggregate, EventSourced};
pub use command::{Command, CommandHandler, CommandResult, RetryPolicy};
pub use error::DomainError;
pub use event_store::DomainEvent;
pub use order::{
    AddOrderLine, CreateOrder, Currency, CustomerId, Money, Order, OrderDetails, OrderError,
    OrderEvent, OrderLine, OrderLineDetails, OrderService, PlaceOrder, ProductId,
};
