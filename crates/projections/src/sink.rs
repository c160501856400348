//! Storage for order summary documents.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::StreamId;
use sqlx::{PgPool, Row, postgres::PgRow};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::Result;
use crate::document::OrderSummary;

/// Destination of projected order summaries.
#[async_trait]
pub trait OrderSummaryStore: Send + Sync {
    /// Inserts the document, or replaces the one with the same id.
    async fn upsert(&self, summary: OrderSummary) -> Result<()>;

    /// Gets the summary of an order.
    async fn get(&self, id: StreamId) -> Result<Option<OrderSummary>>;

    /// Lists every summary, ordered by id.
    async fn list(&self) -> Result<Vec<OrderSummary>>;
}

/// In-memory summary store, shared between clones.
#[derive(Clone, Default)]
pub struct InMemoryOrderSummaryStore {
    documents: Arc<RwLock<BTreeMap<StreamId, OrderSummary>>>,
}

impl InMemoryOrderSummaryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Returns true if no document has been stored.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl OrderSummaryStore for InMemoryOrderSummaryStore {
    async fn upsert(&self, summary: OrderSummary) -> Result<()> {
        self.documents.write().await.insert(summary.id, summary);
        Ok(())
    }

    async fn get(&self, id: StreamId) -> Result<Option<OrderSummary>> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<OrderSummary>> {
        Ok(self.documents.read().await.values().cloned().collect())
    }
}

/// PostgreSQL-backed summary store using the `order_summaries` table.
#[derive(Clone)]
pub struct PostgresOrderSummaryStore {
    pool: PgPool,
}

impl PostgresOrderSummaryStore {
    /// Creates a new store on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_summary(row: PgRow) -> Result<OrderSummary> {
        Ok(OrderSummary {
            id: StreamId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: row.try_get("customer_id")?,
            total_amount: row.try_get("total_amount")?,
            currency: row.try_get("currency")?,
            line_count: line_count_from_column(row.try_get("line_count")?)?,
        })
    }
}

#[async_trait]
impl OrderSummaryStore for PostgresOrderSummaryStore {
    async fn upsert(&self, summary: OrderSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_summaries (id, customer_id, total_amount, currency, line_count)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                customer_id = EXCLUDED.customer_id,
                total_amount = EXCLUDED.total_amount,
                currency = EXCLUDED.currency,
                line_count = EXCLUDED.line_count
            "#,
        )
        .bind(summary.id.as_uuid())
        .bind(summary.customer_id)
        .bind(summary.total_amount)
        .bind(&summary.currency)
        .bind(line_count_to_column(summary.line_count)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: StreamId) -> Result<Option<OrderSummary>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, total_amount, currency, line_count
            FROM order_summaries
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_summary).transpose()
    }

    async fn list(&self) -> Result<Vec<OrderSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, total_amount, currency, line_count
            FROM order_summaries
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_summary).collect()
    }
}

fn line_count_to_column(line_count: u32) -> Result<i32> {
    i32::try_from(line_count).map_err(|e| sqlx::Error::Encode(Box::new(e)).into())
}

fn line_count_from_column(line_count: i32) -> Result<u32> {
    u32::try_from(line_count).map_err(|e| {
        sqlx::Error::ColumnDecode {
            index: "line_count".to_string(),
            source: Box::new(e),
        }
        .into()
    })
}
