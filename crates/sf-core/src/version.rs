//! Strongly-typed migration version names.
//!
//! A version is a script filename without its `.sql` extension, formatted as
//! `NNN_description`. The zero-padded numeric prefix makes plain string
//! ordering agree with numeric ordering, so `Version` derives `Ord` on the
//! underlying string.

use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// File extension shared by forward and down scripts.
pub const SCRIPT_EXTENSION: &str = "sql";

/// A validated `NNN_description` migration version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Parse and validate a version string.
    pub fn parse(s: impl Into<String>) -> CoreResult<Self> {
        let s = s.into();
        match s.split_once('_') {
            Some((prefix, description))
                if !prefix.is_empty()
                    && prefix.bytes().all(|b| b.is_ascii_digit())
                    && !description.is_empty() =>
            {
                Ok(Self(s))
            }
            _ => Err(CoreError::InvalidVersion { version: s }),
        }
    }

    /// Derive a version from a forward script filename (`NNN_description.sql`).
    pub fn from_filename(filename: &str) -> CoreResult<Self> {
        let stem = filename
            .strip_suffix(".sql")
            .ok_or_else(|| CoreError::InvalidVersion {
                version: filename.to_string(),
            })?;
        Self::parse(stem)
    }

    /// Numeric prefix, e.g. `"002"` for `002_create_users_table`.
    pub fn prefix(&self) -> &str {
        self.split()
            .map(|(prefix, _)| prefix)
            .unwrap_or(&self.0)
    }

    /// Description part, e.g. `"create_users_table"`.
    pub fn description(&self) -> &str {
        self.split().map(|(_, desc)| desc).unwrap_or("")
    }

    /// Conventional down script filename: `NNN_down_description.sql`.
    pub fn down_filename(&self) -> String {
        format!(
            "{}_down_{}.{SCRIPT_EXTENSION}",
            self.prefix(),
            self.description()
        )
    }

    /// Return the underlying version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once('_')
    }
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Version {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
