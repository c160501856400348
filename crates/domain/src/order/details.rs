//! Read-side view of an order.

use chrono::{DateTime, Utc};
use common::StreamId;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{CustomerId, Money, Order, ProductId};

/// Flattened view of an order for callers outside the domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub id: Option<StreamId>,
    pub customer_id: Option<CustomerId>,
    pub created_at_utc: Option<DateTime<Utc>>,
    pub lines: Vec<OrderLineDetails>,
    pub total_amount: i64,
    pub currency: String,
}

/// One line of [`OrderDetails`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineDetails {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: i64,
    pub currency: String,
}

impl From<&Order> for OrderDetails {
    fn from(order: &Order) -> Self {
        let total: Money = order.total();

        Self {
            id: order.id(),
            customer_id: order.customer_id(),
            created_at_utc: order.created_at(),
            lines: order
                .lines()
                .iter()
                .map(|line| OrderLineDetails {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price.amount(),
                    currency: line.unit_price.currency().to_string(),
                })
                .collect(),
            total_amount: total.amount(),
            currency: total.currency().to_string(),
        }
    }
}
