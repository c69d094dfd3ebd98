//! Migration script types produced by the catalog.

use crate::error::{MigrateError, MigrateResult};
use sf_core::Version;
use std::path::{Path, PathBuf};

/// A forward migration script, immutable once loaded
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationScript {
    /// `NNN_description`, the filename without extension
    pub version: Version,

    /// Source filename, for diagnostics
    pub filename: String,

    /// Absolute or directory-relative path the body was read from
    pub path: PathBuf,

    /// Full SQL text, verbatim
    pub body: String,

    /// Hex SHA-256 of `body`
    pub checksum: String,

    /// Reverse script, resolved when the catalog was loaded
    pub down: Option<DownScript>,
}

impl MigrationScript {
    pub fn has_down(&self) -> bool {
        self.down.is_some()
    }
}

/// Reference to a reverse script. The body is read on demand at rollback time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownScript {
    /// Forward version this script reverses
    pub reverses: Version,

    pub filename: String,

    pub path: PathBuf,
}

impl DownScript {
    pub(crate) fn new(reverses: Version, filename: String, dir: &Path) -> Self {
        let path = dir.join(&filename);
        Self {
            reverses,
            filename,
            path,
        }
    }

    /// Read the script body from disk
    pub fn read_body(&self) -> MigrateResult<String> {
        read_script(&self.path, &self.filename)
    }
}

/// Read a script as UTF-8 text, naming the file on failure
pub(crate) fn read_script(path: &Path, filename: &str) -> MigrateResult<String> {
    let bytes = std::fs::read(path).map_err(|e| MigrateError::ScriptRead {
        filename: filename.to_string(),
        source: e,
    })?;
    String::from_utf8(bytes).map_err(|e| MigrateError::ScriptRead {
        filename: filename.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })
}
