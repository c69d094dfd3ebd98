//! sf-db - Database abstraction layer for Schemaflow
//!
//! This crate provides the transactional execution handle the migration
//! engine consumes (`Database`, `Executor`, `Transaction`) and a DuckDB
//! implementation of it.

pub mod duckdb;
pub mod error;
pub mod traits;
pub mod value;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{Database, Executor, Transaction};
pub use value::{SqlRow, SqlValue};
