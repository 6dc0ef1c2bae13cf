//! Order table bootstrap.
//!
//! One `CREATE TABLE IF NOT EXISTS` per dialect, run once before the service
//! takes traffic. There is no migration story beyond "create if absent".
//!
//! Column set (both dialects):
//!
//! | Column | SQLite | Postgres |
//! |---|---|---|
//! | `OrderId` | `INTEGER PRIMARY KEY AUTOINCREMENT` | `BIGINT GENERATED ALWAYS AS IDENTITY` |
//! | `DateOfOrder` | `DATETIME NOT NULL` (RFC 3339 text) | `TIMESTAMPTZ NOT NULL` |
//! | `TrackingNumber` | `TEXT` | `VARCHAR(50)` |
//! | `ShortDescriptOfItem` | `TEXT` | `TEXT` |
//! | `OrderQuantity` | `INTEGER` | `INT` |
//! | cost columns (x4) | `TEXT` (canonical 2dp decimal) | `NUMERIC(10, 2)` |
//!
//! SQLite has no exact decimal storage class, so currency is kept as text
//! rather than `REAL`.

use tracing::instrument;

use super::{Database, DbError, Dialect};

/// Name of the single table holding every order.
pub const ORDER_TABLE: &str = "china_orders";

const SQLITE_CREATE_ORDERS: &str = r#"
CREATE TABLE IF NOT EXISTS china_orders (
    OrderId INTEGER PRIMARY KEY AUTOINCREMENT,
    DateOfOrder DATETIME NOT NULL,
    TrackingNumber TEXT,
    ShortDescriptOfItem TEXT,
    OrderQuantity INTEGER,
    CostPerItemCNY TEXT,
    TotalPerItemCNY TEXT,
    CostPerItemUSD TEXT,
    TotalPerItemUSD TEXT
)
"#;

const POSTGRES_CREATE_ORDERS: &str = r#"
CREATE TABLE IF NOT EXISTS china_orders (
    OrderId BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    DateOfOrder TIMESTAMPTZ NOT NULL,
    TrackingNumber VARCHAR(50),
    ShortDescriptOfItem TEXT,
    OrderQuantity INT,
    CostPerItemCNY NUMERIC(10, 2),
    TotalPerItemCNY NUMERIC(10, 2),
    CostPerItemUSD NUMERIC(10, 2),
    TotalPerItemUSD NUMERIC(10, 2)
)
"#;

/// The dialect's create-if-absent statement for the order table.
pub fn create_order_table_sql(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => SQLITE_CREATE_ORDERS,
        Dialect::Postgres => POSTGRES_CREATE_ORDERS,
    }
}

/// Make sure the order table exists. Safe to call on every startup.
#[instrument(skip(db), fields(dialect = %db.dialect()), err)]
pub async fn ensure_order_table(db: &Database) -> Result<(), DbError> {
    let dialect = db.dialect();
    let sql = create_order_table_sql(dialect);

    let res = match db {
        Database::Sqlite(pool) => sqlx::query(sql).execute(pool).await.map(|_| ()),
        Database::Postgres(pool) => sqlx::query(sql).execute(pool).await.map(|_| ()),
    };
    res.map_err(|source| DbError::Schema { dialect, source })?;

    tracing::info!(table = ORDER_TABLE, "order table ready");
    Ok(())
}
