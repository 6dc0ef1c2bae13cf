//! SQL-backed order store (SQLite or Postgres, per [`Database`]).
//!
//! ## Numeric mapping
//!
//! Currency values are normalized to two decimal places before they are
//! written, so the order handed back from `create`/`update` is exactly what a
//! later `list` decodes. Postgres binds `Decimal` to `NUMERIC(10, 2)`; SQLite
//! stores canonical decimal text (see `currency`).
//!
//! ## Timestamps
//!
//! Order dates are kept at microsecond precision (the Postgres `TIMESTAMPTZ`
//! resolution). On SQLite they are written as fixed-width RFC 3339 UTC text so
//! `ORDER BY DateOfOrder` sorts chronologically.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use tracing::instrument;

use evergiven_core::{Order, OrderDraft, OrderId};

use super::currency;
use super::{map_sqlx_error, DeleteOutcome, OrderStore, StoreError, UpdateOutcome};
use crate::db::Database;

const TIMESTAMP_SUBSEC_DIGITS: u16 = 6;

const LIST_ORDERS: &str = r#"
SELECT
    OrderId AS order_id,
    DateOfOrder AS date_of_order,
    TrackingNumber AS tracking_number,
    ShortDescriptOfItem AS description,
    OrderQuantity AS quantity,
    CostPerItemCNY AS cost_per_item_cny,
    TotalPerItemCNY AS total_per_item_cny,
    CostPerItemUSD AS cost_per_item_usd,
    TotalPerItemUSD AS total_per_item_usd
FROM china_orders
ORDER BY DateOfOrder DESC, OrderId DESC
"#;

const SQLITE_INSERT: &str = r#"
INSERT INTO china_orders (
    DateOfOrder, TrackingNumber, ShortDescriptOfItem, OrderQuantity,
    CostPerItemCNY, TotalPerItemCNY, CostPerItemUSD, TotalPerItemUSD
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
RETURNING OrderId
"#;

const SQLITE_UPDATE: &str = r#"
UPDATE china_orders SET
    DateOfOrder = ?,
    TrackingNumber = ?,
    ShortDescriptOfItem = ?,
    OrderQuantity = ?,
    CostPerItemCNY = ?,
    TotalPerItemCNY = ?,
    CostPerItemUSD = ?,
    TotalPerItemUSD = ?
WHERE OrderId = ?
"#;

const SQLITE_DELETE: &str = "DELETE FROM china_orders WHERE OrderId = ?";

const POSTGRES_INSERT: &str = r#"
INSERT INTO china_orders (
    DateOfOrder, TrackingNumber, ShortDescriptOfItem, OrderQuantity,
    CostPerItemCNY, TotalPerItemCNY, CostPerItemUSD, TotalPerItemUSD
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
RETURNING OrderId
"#;

const POSTGRES_UPDATE: &str = r#"
UPDATE china_orders SET
    DateOfOrder = $1,
    TrackingNumber = $2,
    ShortDescriptOfItem = $3,
    OrderQuantity = $4,
    CostPerItemCNY = $5,
    TotalPerItemCNY = $6,
    CostPerItemUSD = $7,
    TotalPerItemUSD = $8
WHERE OrderId = $9
"#;

const POSTGRES_DELETE: &str = "DELETE FROM china_orders WHERE OrderId = $1";

/// Order store over a shared [`Database`] pool.
///
/// The pool is injected, never global, so tests can hand each case its own
/// database. No locking is added on top of the pool.
#[derive(Debug, Clone)]
pub struct SqlOrderStore {
    db: Database,
}

impl SqlOrderStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl OrderStore for SqlOrderStore {
    #[instrument(skip(self), fields(dialect = %self.db.dialect()), err)]
    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let rows = match &self.db {
            Database::Sqlite(pool) => sqlx::query_as::<_, OrderRow>(LIST_ORDERS)
                .fetch_all(pool)
                .await,
            Database::Postgres(pool) => sqlx::query_as::<_, OrderRow>(LIST_ORDERS)
                .fetch_all(pool)
                .await,
        }
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        tracing::debug!(count = rows.len(), "listed orders");
        Ok(rows.into_iter().map(Order::from).collect())
    }

    #[instrument(skip(self, draft), fields(dialect = %self.db.dialect()), err)]
    async fn create(&self, draft: OrderDraft) -> Result<Order, StoreError> {
        let draft = normalize(draft)?;

        let row = match &self.db {
            Database::Sqlite(pool) => bind_sqlite(sqlx::query(SQLITE_INSERT), &draft)
                .fetch_one(pool)
                .await
                .and_then(|row| row.try_get::<i64, _>(0)),
            Database::Postgres(pool) => bind_postgres(sqlx::query(POSTGRES_INSERT), &draft)
                .fetch_one(pool)
                .await
                .and_then(|row| row.try_get::<i64, _>(0)),
        };
        let id = OrderId::from_raw(row.map_err(|e| map_sqlx_error("create_order", e))?);

        tracing::info!(order_id = %id, "order created");
        Ok(draft.with_id(id))
    }

    #[instrument(skip(self, id, draft), fields(dialect = %self.db.dialect(), order_id = %id), err)]
    async fn update(&self, id: OrderId, draft: OrderDraft) -> Result<UpdateOutcome, StoreError> {
        let draft = normalize(draft)?;

        let rows_affected = match &self.db {
            Database::Sqlite(pool) => bind_sqlite(sqlx::query(SQLITE_UPDATE), &draft)
                .bind(id.as_i64())
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Database::Postgres(pool) => bind_postgres(sqlx::query(POSTGRES_UPDATE), &draft)
                .bind(id.as_i64())
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .map_err(|e| map_sqlx_error("update_order", e))?;

        Ok(UpdateOutcome {
            order: draft.with_id(id),
            rows_affected,
        })
    }

    #[instrument(skip(self, id), fields(dialect = %self.db.dialect(), order_id = %id), err)]
    async fn delete(&self, id: OrderId) -> Result<DeleteOutcome, StoreError> {
        let rows_affected = match &self.db {
            Database::Sqlite(pool) => sqlx::query(SQLITE_DELETE)
                .bind(id.as_i64())
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Database::Postgres(pool) => sqlx::query(POSTGRES_DELETE)
                .bind(id.as_i64())
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .map_err(|e| map_sqlx_error("delete_order", e))?;

        Ok(DeleteOutcome { rows_affected })
    }
}

/// Bring a payload to the precision the table stores.
///
/// Amounts outside `NUMERIC(10, 2)` are refused here so both dialects fail
/// the same way, before any statement runs.
fn normalize(mut draft: OrderDraft) -> Result<OrderDraft, StoreError> {
    draft.date_of_order = draft.date_of_order.trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS);
    for (column, amount) in [
        ("CostPerItemCNY", &mut draft.cost_per_item_cny),
        ("TotalPerItemCNY", &mut draft.total_per_item_cny),
        ("CostPerItemUSD", &mut draft.cost_per_item_usd),
        ("TotalPerItemUSD", &mut draft.total_per_item_usd),
    ] {
        *amount = currency::to_column(*amount).ok_or(StoreError::OutOfRange {
            column,
            value: *amount,
        })?;
    }
    Ok(draft)
}

fn sqlite_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;
type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

fn bind_sqlite<'q>(query: SqliteQuery<'q>, draft: &OrderDraft) -> SqliteQuery<'q> {
    query
        .bind(sqlite_timestamp(draft.date_of_order))
        .bind(draft.tracking_number.clone())
        .bind(draft.description.clone())
        .bind(draft.quantity)
        .bind(currency::to_storage(draft.cost_per_item_cny))
        .bind(currency::to_storage(draft.total_per_item_cny))
        .bind(currency::to_storage(draft.cost_per_item_usd))
        .bind(currency::to_storage(draft.total_per_item_usd))
}

fn bind_postgres<'q>(query: PgQuery<'q>, draft: &OrderDraft) -> PgQuery<'q> {
    query
        .bind(draft.date_of_order)
        .bind(draft.tracking_number.clone())
        .bind(draft.description.clone())
        .bind(draft.quantity)
        .bind(draft.cost_per_item_cny)
        .bind(draft.total_per_item_cny)
        .bind(draft.cost_per_item_usd)
        .bind(draft.total_per_item_usd)
}

// SQLx row types

#[derive(Debug)]
struct OrderRow {
    order_id: i64,
    date_of_order: DateTime<Utc>,
    tracking_number: Option<String>,
    description: Option<String>,
    quantity: i32,
    cost_per_item_cny: Decimal,
    total_per_item_cny: Decimal,
    cost_per_item_usd: Decimal,
    total_per_item_usd: Decimal,
}

impl<'r> FromRow<'r, SqliteRow> for OrderRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            order_id: row.try_get("order_id")?,
            date_of_order: row.try_get("date_of_order")?,
            tracking_number: row.try_get("tracking_number")?,
            description: row.try_get("description")?,
            quantity: row.try_get("quantity")?,
            cost_per_item_cny: sqlite_currency(row, "cost_per_item_cny")?,
            total_per_item_cny: sqlite_currency(row, "total_per_item_cny")?,
            cost_per_item_usd: sqlite_currency(row, "cost_per_item_usd")?,
            total_per_item_usd: sqlite_currency(row, "total_per_item_usd")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            order_id: row.try_get("order_id")?,
            date_of_order: row.try_get("date_of_order")?,
            tracking_number: row.try_get("tracking_number")?,
            description: row.try_get("description")?,
            quantity: row.try_get("quantity")?,
            cost_per_item_cny: row.try_get("cost_per_item_cny")?,
            total_per_item_cny: row.try_get("total_per_item_cny")?,
            cost_per_item_usd: row.try_get("cost_per_item_usd")?,
            total_per_item_usd: row.try_get("total_per_item_usd")?,
        })
    }
}

fn sqlite_currency(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let text: String = row.try_get(column)?;
    currency::from_storage(&text).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        OrderDraft {
            date_of_order: row.date_of_order,
            tracking_number: row.tracking_number,
            description: row.description,
            quantity: row.quantity,
            cost_per_item_cny: row.cost_per_item_cny,
            total_per_item_cny: row.total_per_item_cny,
            cost_per_item_usd: row.cost_per_item_usd,
            total_per_item_usd: row.total_per_item_usd,
        }
        .with_id(OrderId::from_raw(row.order_id))
    }
}
