//! Storage backend selection and connection setup.
//!
//! The connection string picks one of two dialects, once, at startup:
//!
//! | Connection string | Backend | Driver |
//! |---|---|---|
//! | `sqlite://orders.db`, `sqlite:///var/lib/orders.db` | `EmbeddedFile` | sqlx SQLite |
//! | anything else (`postgres://...`) | `ClientServer` | sqlx Postgres |
//!
//! [`Database::connect`] opens the pool and runs a liveness probe before
//! returning. A failed probe is a startup error; nothing here retries.

pub mod schema;

use core::fmt;
use core::str::FromStr;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::instrument;

const SQLITE_MARKER: &str = "sqlite";
const SQLITE_MEMORY: &str = ":memory:";

/// SQL dialect of the selected backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => f.write_str("sqlite"),
            Dialect::Postgres => f.write_str("postgres"),
        }
    }
}

/// Where the orders live, resolved from the connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// In-process SQLite against a local file (or `:memory:`).
    EmbeddedFile { path: String },
    /// PostgreSQL server; the URI is handed to the driver untouched.
    ClientServer { uri: String },
}

impl Backend {
    /// Classify a connection string.
    ///
    /// Strings starting with `sqlite` select the embedded backend and have their
    /// `sqlite://` (or `sqlite:`) marker stripped. Everything else is a server URI.
    pub fn from_url(url: &str) -> Self {
        match url.strip_prefix(SQLITE_MARKER) {
            Some(rest) => {
                let path = rest
                    .strip_prefix("://")
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                Backend::EmbeddedFile {
                    path: path.to_string(),
                }
            }
            None => Backend::ClientServer {
                uri: url.to_string(),
            },
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Backend::EmbeddedFile { .. } => Dialect::Sqlite,
            Backend::ClientServer { .. } => Dialect::Postgres,
        }
    }

    fn is_in_memory(&self) -> bool {
        matches!(self, Backend::EmbeddedFile { path } if path.starts_with(SQLITE_MEMORY))
    }
}

/// Startup-time database failures. All of them are fatal to the process.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to connect to {dialect} database: {source}")]
    Connect {
        dialect: Dialect,
        #[source]
        source: sqlx::Error,
    },

    #[error("{dialect} database did not answer liveness probe: {source}")]
    Ping {
        dialect: Dialect,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to ensure order table on {dialect}: {source}")]
    Schema {
        dialect: Dialect,
        #[source]
        source: sqlx::Error,
    },
}

/// Open connection pool bound to the selected dialect's driver.
///
/// ## Thread Safety
///
/// Both variants wrap SQLx pools, which are `Arc`-backed, `Send + Sync` and
/// cheap to clone. Concurrent queries are arbitrated entirely by the pool.
#[derive(Debug, Clone)]
pub enum Database {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl Database {
    /// Open a pool for `backend` and verify it answers a round trip.
    #[instrument(skip(backend), fields(dialect = %backend.dialect()), err)]
    pub async fn connect(backend: &Backend) -> Result<Self, DbError> {
        let dialect = backend.dialect();
        let connect_err = |source| DbError::Connect { dialect, source };

        let db = match backend {
            Backend::EmbeddedFile { path } => {
                let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))
                    .map_err(connect_err)?
                    .create_if_missing(true);

                // Every connection to `:memory:` is its own database, so pin a
                // single long-lived connection.
                let pool_options = if backend.is_in_memory() {
                    SqlitePoolOptions::new()
                        .max_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None)
                } else {
                    SqlitePoolOptions::new()
                };

                let pool = pool_options
                    .connect_with(options)
                    .await
                    .map_err(connect_err)?;
                Database::Sqlite(pool)
            }
            Backend::ClientServer { uri } => {
                let pool = PgPoolOptions::new()
                    .connect(uri)
                    .await
                    .map_err(connect_err)?;
                Database::Postgres(pool)
            }
        };

        db.ping().await?;
        tracing::info!(%dialect, "database connection verified");
        Ok(db)
    }

    /// Open and verify a pool straight from a connection string.
    pub async fn connect_url(url: &str) -> Result<Self, DbError> {
        Self::connect(&Backend::from_url(url)).await
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Database::Sqlite(_) => Dialect::Sqlite,
            Database::Postgres(_) => Dialect::Postgres,
        }
    }

    /// Liveness probe: one `SELECT 1` round trip.
    pub async fn ping(&self) -> Result<(), DbError> {
        let res = match self {
            Database::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            Database::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        };
        res.map_err(|source| DbError::Ping {
            dialect: self.dialect(),
            source,
        })
    }

    /// Close the underlying pool (waits for checked-out connections).
    pub async fn close(&self) {
        match self {
            Database::Sqlite(pool) => pool.close().await,
            Database::Postgres(pool) => pool.close().await,
        }
    }
}
