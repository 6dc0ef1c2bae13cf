//! `evergiven-core`: order domain types.
//!
//! This crate contains **pure domain** types (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod order;

pub use error::DomainError;
pub use id::OrderId;
pub use order::{Order, OrderDraft};
