//! sf-core - Core library for Schemaflow
//!
//! This crate provides the types shared by the migration engine and the CLI:
//! content checksums, migration version names, and project configuration.

pub mod checksum;
pub mod config;
pub mod error;
pub mod version;

pub use checksum::{compute_checksum, compute_checksum_str, LEGACY_CHECKSUM};
pub use config::{Config, DatabaseConfig, LockConfig};
pub use error::{CoreError, CoreResult};
pub use version::Version;
