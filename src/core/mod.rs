//! Core database system types and traits
//!
//! This module provides the fundamental building blocks for the data-access
//! layer: error types, the backend trait, connection configuration, values,
//! statement binding and transactions.

pub mod database;
pub mod database_types;
pub mod error;
pub mod statement;
pub mod transaction;
pub mod value;

// Re-export commonly used types
pub use database::{ConnectionBuilder, ConnectionConfig, Database};
pub use database_types::DatabaseType;
pub use error::{DatabaseError, Result};
pub use statement::Statement;
pub use transaction::TransactionGuard;
pub use value::{DatabaseResult, DatabaseRow, DatabaseValue, RowExt, SqlType};
