//! Order service providing a simplified API for order operations.

use common::StreamId;
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult, RetryPolicy};
use crate::error::DomainError;

use super::{AddOrderLine, CreateOrder, Order, OrderDetails, PlaceOrder};

/// Service for managing orders.
///
/// Wraps the command handler and exposes one method per use case. Each call
/// hydrates the order from its stream and appends the resulting events with
/// optimistic concurrency.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore> OrderService<S> {
    /// Creates a new order service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Replaces the retry policy applied to [`add_line`](Self::add_line).
    pub fn with_retry_policy(self, retry: RetryPolicy) -> Self {
        Self {
            handler: self.handler.with_retry_policy(retry),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    /// Creates an empty order for a customer.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(
        &self,
        cmd: CreateOrder,
    ) -> Result<CommandResult<Order>, DomainError> {
        let order_id = cmd.order_id;
        let customer_id = cmd.customer_id;

        self.handler
            .execute(order_id, |order| order.create(order_id, customer_id))
            .await
    }

    /// Creates an order and its initial lines in a single append.
    #[tracing::instrument(skip(self), fields(order_id = %cmd.order_id, lines = cmd.lines.len()))]
    pub async fn place_order(
        &self,
        cmd: PlaceOrder,
    ) -> Result<CommandResult<Order>, DomainError> {
        let order_id = cmd.order_id;
        let customer_id = cmd.customer_id;

        let result = self
            .handler
            .execute(order_id, |order| order.place(order_id, customer_id, &cmd.lines))
            .await?;

        tracing::info!(total = %result.aggregate.total(), "order placed");
        Ok(result)
    }

    /// Adds a line to an order.
    ///
    /// A concurrent write to the same order causes the line to be
    /// re-validated against the fresh state and retried.
    #[tracing::instrument(skip(self))]
    pub async fn add_line(&self, cmd: AddOrderLine) -> Result<CommandResult<Order>, DomainError> {
        let AddOrderLine {
            order_id,
            product_id,
            quantity,
            unit_price,
        } = cmd;

        self.handler
            .execute_with_retry(order_id, |order| {
                order.add_line(product_id, quantity, unit_price.clone())
            })
            .await
    }

    /// Returns the current view of an order, or None if it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: StreamId) -> Result<Option<OrderDetails>, DomainError> {
        let order = self.handler.load_existing(order_id).await?;
        Ok(order.map(|order| OrderDetails::from(order.state())))
    }
}
