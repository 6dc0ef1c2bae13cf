//! Infrastructure layer: backend selection, schema setup, order persistence.

pub mod db;
pub mod order_store;

mod integration_tests;

pub use db::{Backend, Database, DbError, Dialect};
pub use order_store::{DeleteOutcome, OrderStore, SqlOrderStore, StoreError, UpdateOutcome};
