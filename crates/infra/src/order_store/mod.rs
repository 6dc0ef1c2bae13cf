//! Order persistence: list / create / update / delete over the order table.
//!
//! Each operation is a single statement; nothing here spans rows in a
//! transaction, caches, or retries.

mod currency;
mod sql;

use async_trait::async_trait;
use thiserror::Error;

use evergiven_core::{Order, OrderDraft, OrderId};

pub use sql::SqlOrderStore;

/// Backend failures while serving a request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error in {operation}: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to decode order row: {0}")]
    Decode(String),

    /// A currency amount does not fit `NUMERIC(10, 2)` after rounding.
    #[error("{column} value {value} exceeds the column's 8 integer digits")]
    OutOfRange {
        column: &'static str,
        value: rust_decimal::Decimal,
    },
}

/// Result of a whole-record replacement.
///
/// `rows_affected == 0` means no row had that identifier; `order` is still the
/// payload merged with the requested identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub order: Order,
    pub rows_affected: u64,
}

impl UpdateOutcome {
    pub fn matched(&self) -> bool {
        self.rows_affected > 0
    }
}

/// Result of an identifier-keyed delete.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub rows_affected: u64,
}

impl DeleteOutcome {
    pub fn matched(&self) -> bool {
        self.rows_affected > 0
    }
}

/// Order persistence port used by the HTTP layer.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Every order, newest `date_of_order` first.
    async fn list(&self) -> Result<Vec<Order>, StoreError>;

    /// Insert a new order and return it with its store-assigned identifier.
    async fn create(&self, draft: OrderDraft) -> Result<Order, StoreError>;

    /// Replace every field of order `id` with `draft`.
    async fn update(&self, id: OrderId, draft: OrderDraft) -> Result<UpdateOutcome, StoreError>;

    async fn delete(&self, id: OrderId) -> Result<DeleteOutcome, StoreError>;
}

#[async_trait]
impl<S> OrderStore for std::sync::Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        (**self).list().await
    }

    async fn create(&self, draft: OrderDraft) -> Result<Order, StoreError> {
        (**self).create(draft).await
    }

    async fn update(&self, id: OrderId, draft: OrderDraft) -> Result<UpdateOutcome, StoreError> {
        (**self).update(id, draft).await
    }

    async fn delete(&self, id: OrderId) -> Result<DeleteOutcome, StoreError> {
        (**self).delete(id).await
    }
}

pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::ColumnDecode { index, source } => {
            StoreError::Decode(format!("{operation}: column {index}: {source}"))
        }
        sqlx::Error::Decode(source) => StoreError::Decode(format!("{operation}: {source}")),
        other => StoreError::Query {
            operation,
            source: other,
        },
    }
}
