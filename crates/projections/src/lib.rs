//! Read side of the orders core.
//!
//! - [`OrderSummary`] is the denormalized document kept per order
//! - [`OrderSummaryStore`] is where documents are upserted, with in-memory
//!   and PostgreSQL implementations
//! - [`OrderProjector`] periodically rebuilds every summary from the event
//!   log until it is told to stop

pub mod document;
pub mod error;
pub mod fold;
pub mod projector;
pub mod sink;

pub use document::OrderSummary;
pub use error::{ProjectionError, Result};
pub use fold::project_order;
pub use projector::{OrderProjector, ProjectionReport, ProjectorHandle};
pub use sink::{InMemoryOrderSummaryStore, OrderSummaryStore, PostgresOrderSummaryStore};
