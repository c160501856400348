//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::StreamId;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    Currency, CustomerId, Money, OrderError, OrderEvent, OrderLine, ProductId,
    events::{OrderCreatedData, OrderLineAddedData},
};

/// Order aggregate root.
///
/// Holds the customer, the lines and the running total. The first line
/// fixes the order's currency; every later line must use the same one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    id: Option<StreamId>,

    /// Customer who placed the order.
    customer_id: Option<CustomerId>,

    /// When the order was created.
    created_at: Option<DateTime<Utc>>,

    /// Lines in the order they were added.
    lines: Vec<OrderLine>,

    /// Running total; None until the first line.
    total: Option<Money>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<StreamId> {
        self.id
    }

    fn when(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            OrderEvent::OrderCreated(data) => self.when_created(data),
            OrderEvent::OrderLineAdded(data) => self.when_line_added(data),
        }
    }
}

// Query methods
impl Order {
    /// Returns true once the order has been created.
    pub fn is_created(&self) -> bool {
        self.id.is_some()
    }

    /// Returns the customer ID.
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    /// Returns the creation time.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns the lines in insertion order.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns the number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the order currency, fixed by the first line.
    pub fn currency(&self) -> Option<&Currency> {
        self.total.as_ref().map(Money::currency)
    }

    /// Returns the order total. An order without lines totals zero in the
    /// default currency.
    pub fn total(&self) -> Money {
        self.total
            .clone()
            .unwrap_or_else(|| Money::zero(Currency::default()))
    }
}

// Command methods
impl Order {
    /// Creates the order.
    pub fn create(
        &self,
        order_id: StreamId,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.is_created() {
            return Err(OrderError::AlreadyCreated);
        }
        if customer_id.is_nil() {
            return Err(OrderError::CustomerIdRequired);
        }

        Ok(vec![OrderEvent::OrderCreated(OrderCreatedData {
            order_id,
            customer_id,
            created_at_utc: Utc::now(),
        })])
    }

    /// Adds a line to the order.
    pub fn add_line(
        &self,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let order_id = self.id.ok_or(OrderError::NotCreated)?;

        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }
        if unit_price.is_negative() {
            return Err(OrderError::InvalidPrice {
                price: unit_price.amount(),
            });
        }

        // Validate against the running total up front so a rejected line
        // never produces an event.
        let line_total = unit_price.checked_multiply(quantity)?;
        if let Some(total) = &self.total {
            total.checked_add(&line_total)?;
        }

        Ok(vec![OrderEvent::OrderLineAdded(OrderLineAddedData {
            order_id,
            product_id,
            quantity,
            unit_price: unit_price.amount(),
            currency: unit_price.currency().clone(),
        })])
    }

    /// Creates the order together with its initial lines.
    ///
    /// Each line is validated against the state produced by the events
    /// decided before it, so the batch is accepted or rejected as a whole.
    pub fn place(
        &self,
        order_id: StreamId,
        customer_id: CustomerId,
        lines: &[OrderLine],
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let mut draft = self.clone();
        let mut events = Vec::with_capacity(lines.len() + 1);

        for event in draft.create(order_id, customer_id)? {
            draft.when(&event)?;
            events.push(event);
        }

        for line in lines {
            for event in draft.add_line(line.product_id, line.quantity, line.unit_price.clone())? {
                draft.when(&event)?;
                events.push(event);
            }
        }

        Ok(events)
    }
}

// Fold
impl Order {
    fn when_created(&mut self, data: &OrderCreatedData) -> Result<(), OrderError> {
        if self.is_created() {
            return Err(OrderError::AlreadyCreated);
        }

        self.id = Some(data.order_id);
        self.customer_id = Some(data.customer_id);
        self.created_at = Some(data.created_at_utc);
        Ok(())
    }

    fn when_line_added(&mut self, data: &OrderLineAddedData) -> Result<(), OrderError> {
        if !self.is_created() {
            return Err(OrderError::NotCreated);
        }

        let line = OrderLine::new(data.product_id, data.quantity, data.unit_price());
        let line_total = line.line_total()?;
        let total = match &self.total {
            Some(total) => total.checked_add(&line_total)?,
            None => line_total,
        };

        self.lines.push(line);
        self.total = Some(total);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::EventSourced;
    use event_store::Version;
    use uuid::Uuid;

    fn eur() -> Currency {
        Currency::new("EUR").unwrap()
    }

    fn created_order() -> (EventSourced<Order>, StreamId) {
        let order_id = StreamId::new();
        let mut order = EventSourced::<Order>::new();
        order
            .execute(|o| o.create(order_id, CustomerId::new()))
            .unwrap();
        (order, order_id)
    }

    #[test]
    fn test_create_order() {
        let (order, order_id) = created_order();

        assert_eq!(order.id(), Some(order_id));
        assert!(order.state().customer_id().is_some());
        assert!(order.state().created_at().is_some());
        assert_eq!(order.version(), Version::first());
        assert_eq!(order.uncommitted_events().len(), 1);
    }

    #[test]
    fn test_create_order_twice_fails() {
        let (order, order_id) = created_order();
        let result = order.state().create(order_id, CustomerId::new());
        assert_eq!(result, Err(OrderError::AlreadyCreated));
    }

    #[test]
    fn test_create_requires_customer() {
        let order = Order::default();
        let result = order.create(StreamId::new(), CustomerId::from_uuid(Uuid::nil()));
        assert_eq!(result, Err(OrderError::CustomerIdRequired));
    }

    #[test]
    fn test_add_line_before_create_fails() {
        let order = Order::default();
        let result = order.add_line(ProductId::new(), 1, Money::usd(100));
        assert_eq!(result, Err(OrderError::NotCreated));
    }

    #[test]
    fn test_add_lines_accumulates_total() {
        let (mut order, _) = created_order();

        order
            .execute(|o| o.add_line(ProductId::new(), 2, Money::usd(1000)))
            .unwrap();
        order
            .execute(|o| o.add_line(ProductId::new(), 1, Money::usd(550)))
            .unwrap();

        assert_eq!(order.state().line_count(), 2);
        assert_eq!(order.state().total(), Money::usd(2550));
        assert_eq!(order.version(), Version::new(3));
    }

    #[test]
    fn test_zero_quantity_fails() {
        let (order, _) = created_order();
        let result = order.state().add_line(ProductId::new(), 0, Money::usd(100));
        assert_eq!(result, Err(OrderError::InvalidQuantity { quantity: 0 }));
    }

    #[test]
    fn test_negative_price_fails() {
        let (order, _) = created_order();
        let result = order.state().add_line(ProductId::new(), 1, Money::usd(-1));
        assert_eq!(result, Err(OrderError::InvalidPrice { price: -1 }));
    }

    #[test]
    fn test_free_line_is_allowed() {
        let (mut order, _) = created_order();
        order
            .execute(|o| o.add_line(ProductId::new(), 3, Money::usd(0)))
            .unwrap();
        assert_eq!(order.state().total(), Money::usd(0));
    }

    #[test]
    fn test_first_line_fixes_currency() {
        let (mut order, _) = created_order();
        assert_eq!(order.state().currency(), None);

        order
            .execute(|o| o.add_line(ProductId::new(), 1, Money::new(700, eur())))
            .unwrap();

        assert_eq!(order.state().currency(), Some(&eur()));
        assert_eq!(order.state().total(), Money::new(700, eur()));
    }

    #[test]
    fn test_currency_mismatch_changes_nothing() {
        let (mut order, _) = created_order();
        order
            .execute(|o| o.add_line(ProductId::new(), 1, Money::usd(1000)))
            .unwrap();
        order.clear_uncommitted();
        let before = order.state().clone();

        let result = order.execute(|o| o.add_line(ProductId::new(), 1, Money::new(500, eur())));

        assert_eq!(
            result,
            Err(OrderError::CurrencyMismatch {
                expected: Currency::usd(),
                actual: eur(),
            })
        );
        assert_eq!(order.state(), &before);
        assert!(!order.has_uncommitted());
        assert_eq!(order.version(), Version::new(2));
    }

    #[test]
    fn test_fold_rejects_mismatched_history() {
        let order_id = StreamId::new();
        let history = vec![
            OrderEvent::OrderCreated(OrderCreatedData {
                order_id,
                customer_id: CustomerId::new(),
                created_at_utc: Utc::now(),
            }),
            OrderEvent::OrderLineAdded(OrderLineAddedData {
                order_id,
                product_id: ProductId::new(),
                quantity: 1,
                unit_price: 100,
                currency: Currency::usd(),
            }),
            OrderEvent::OrderLineAdded(OrderLineAddedData {
                order_id,
                product_id: ProductId::new(),
                quantity: 1,
                unit_price: 100,
                currency: eur(),
            }),
        ];

        let result = EventSourced::<Order>::from_history(history);
        assert!(matches!(result, Err(OrderError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_empty_order_totals_zero_usd() {
        let (order, _) = created_order();
        assert_eq!(order.state().total(), Money::usd(0));
        assert_eq!(order.state().line_count(), 0);
    }

    #[test]
    fn test_place_creates_and_adds_lines() {
        let order_id = StreamId::new();
        let lines = vec![
            OrderLine::new(ProductId::new(), 2, Money::usd(1000)),
            OrderLine::new(ProductId::new(), 1, Money::usd(250)),
        ];

        let events = Order::default()
            .place(order_id, CustomerId::new(), &lines)
            .unwrap();

        assert_eq!(events.len(), 3);
        let order = EventSourced::<Order>::from_history(events).unwrap();
        assert_eq!(order.state().total(), Money::usd(2250));
        assert_eq!(order.state().lines(), lines.as_slice());
    }

    #[test]
    fn test_place_rejects_whole_batch() {
        let lines = vec![
            OrderLine::new(ProductId::new(), 2, Money::usd(1000)),
            OrderLine::new(ProductId::new(), 1, Money::new(250, eur())),
        ];

        let result = Order::default().place(StreamId::new(), CustomerId::new(), &lines);
        assert!(matches!(result, Err(OrderError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_replay_is_idempotent() {
        let (mut order, _) = created_order();
        order
            .execute(|o| o.add_line(ProductId::new(), 4, Money::usd(125)))
            .unwrap();
        let history = order.take_uncommitted();

        let first = EventSourced::<Order>::from_history(history.clone()).unwrap();
        let second = EventSourced::<Order>::from_history(history).unwrap();

        assert_eq!(first.state(), second.state());
        assert_eq!(first.version(), second.version());
    }

    #[test]
    fn test_serialization() {
        let (mut order, _) = created_order();
        order
            .execute(|o| o.add_line(ProductId::new(), 1, Money::usd(100)))
            .unwrap();

        let json = serde_json::to_string(order.state()).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, order.state());
    }
}
