//! Order summary read model document.

use common::StreamId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Denormalized summary of one order, keyed by the order's stream id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: StreamId,
    pub customer_id: Uuid,
    /// Sum of quantity × unit price, in minor units.
    pub total_amount: i64,
    pub currency: String,
    pub line_count: u32,
}
