//! Migration catalog: discovers scripts in a directory and orders them.
//!
//! The catalog is re-read for every runner operation so that edits to the
//! directory are always observed. Down scripts never enter the forward set;
//! they are indexed by the version they reverse and attached to the matching
//! forward script at load time.

use crate::error::{MigrateError, MigrateResult};
use crate::script::{read_script, DownScript, MigrationScript};
use regex::Regex;
use sf_core::{checksum::compute_checksum_str, Version};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Substring marking a reverse script.
pub const DOWN_MARKER: &str = "_down_";

const SCRIPT_SUFFIX: &str = ".sql";

static DOWN_PREFIXED_RE: OnceLock<Regex> = OnceLock::new();
static DOWN_SUFFIXED_RE: OnceLock<Regex> = OnceLock::new();

/// `NNN_down_description.sql`
fn down_prefixed_re() -> &'static Regex {
    DOWN_PREFIXED_RE
        .get_or_init(|| Regex::new(r"^([0-9]+)_down_(.+)\.sql$").expect("valid regex"))
}

/// `NNN_description_down.sql`
fn down_suffixed_re() -> &'static Regex {
    DOWN_SUFFIXED_RE
        .get_or_init(|| Regex::new(r"^([0-9]+_.+)_down\.sql$").expect("valid regex"))
}

/// How a directory entry participates in the catalog
#[derive(Debug, PartialEq)]
enum FileKind {
    Forward(Version),
    /// Down script, carrying the forward version it reverses
    Down(Version),
    Ignored,
}

fn classify(filename: &str) -> MigrateResult<FileKind> {
    if !filename.ends_with(SCRIPT_SUFFIX) {
        return Ok(FileKind::Ignored);
    }

    let invalid = || MigrateError::InvalidScriptName {
        filename: filename.to_string(),
    };

    if let Some(caps) = down_prefixed_re().captures(filename) {
        let version = Version::parse(format!("{}_{}", &caps[1], &caps[2])).map_err(|_| invalid())?;
        return Ok(FileKind::Down(version));
    }
    if let Some(caps) = down_suffixed_re().captures(filename) {
        let version = Version::parse(&caps[1]).map_err(|_| invalid())?;
        return Ok(FileKind::Down(version));
    }
    if filename.contains(DOWN_MARKER) {
        log::warn!("Ignoring '{filename}': down-marked script does not name a migration");
        return Ok(FileKind::Ignored);
    }

    Version::from_filename(filename)
        .map(FileKind::Forward)
        .map_err(|_| invalid())
}

/// Conventional down script name for a version, used in error messages
pub fn expected_down_filename(version: &str) -> String {
    Version::parse(version)
        .map(|v| v.down_filename())
        .unwrap_or_else(|_| format!("{version}_down{SCRIPT_SUFFIX}"))
}

/// Ordered forward scripts plus the down-script index of one directory
#[derive(Debug, Clone)]
pub struct MigrationCatalog {
    dir: PathBuf,
    scripts: Vec<MigrationScript>,
    down_scripts: BTreeMap<Version, DownScript>,
}

impl MigrationCatalog {
    /// Scan `dir` and load every forward script, ascending by version
    pub fn load(dir: &Path) -> MigrateResult<Self> {
        let catalog_err = |e: std::io::Error| MigrateError::CatalogRead {
            path: dir.display().to_string(),
            source: e,
        };

        let mut filenames = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(catalog_err)? {
            let entry = entry.map_err(catalog_err)?;
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => filenames.push(name),
                Err(name) => log::warn!("Ignoring non UTF-8 filename {name:?}"),
            }
        }
        filenames.sort();

        let mut scripts = Vec::new();
        let mut down_scripts: BTreeMap<Version, DownScript> = BTreeMap::new();

        for filename in filenames {
            match classify(&filename)? {
                FileKind::Forward(version) => {
                    let path = dir.join(&filename);
                    let body = read_script(&path, &filename)?;
                    let checksum = compute_checksum_str(&body);
                    scripts.push(MigrationScript {
                        version,
                        filename,
                        path,
                        body,
                        checksum,
                        down: None,
                    });
                }
                FileKind::Down(reverses) => {
                    let preferred = reverses.down_filename();
                    if let Some(existing) = down_scripts.get(&reverses) {
                        log::warn!(
                            "Multiple down scripts for {reverses}: '{}' and '{filename}', using '{preferred}'",
                            existing.filename
                        );
                        if existing.filename == preferred {
                            continue;
                        }
                    }
                    down_scripts.insert(reverses.clone(), DownScript::new(reverses, filename, dir));
                }
                FileKind::Ignored => {}
            }
        }

        for script in &mut scripts {
            script.down = down_scripts.get(&script.version).cloned();
        }
        scripts.sort_by(|a, b| a.version.cmp(&b.version));

        let widths: BTreeSet<usize> = scripts.iter().map(|s| s.version.prefix().len()).collect();
        if widths.len() > 1 {
            log::warn!(
                "Migration prefixes in {} use mixed widths {:?}; lexical order may not match numeric order",
                dir.display(),
                widths
            );
        }

        log::debug!(
            "Loaded {} migration scripts ({} down scripts) from {}",
            scripts.len(),
            down_scripts.len(),
            dir.display()
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            scripts,
            down_scripts,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Forward scripts, ascending by version
    pub fn scripts(&self) -> &[MigrationScript] {
        &self.scripts
    }

    /// Forward scripts, descending by version
    pub fn descending(&self) -> Vec<&MigrationScript> {
        let mut scripts: Vec<&MigrationScript> = self.scripts.iter().collect();
        scripts.sort_by(|a, b| b.version.cmp(&a.version));
        scripts
    }

    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.scripts.iter().map(|s| &s.version)
    }

    /// Look up a forward script by version
    pub fn get(&self, version: &str) -> Option<&MigrationScript> {
        self.scripts
            .binary_search_by(|s| s.version.as_str().cmp(version))
            .ok()
            .map(|idx| &self.scripts[idx])
    }

    pub fn contains(&self, version: &str) -> bool {
        self.get(version).is_some()
    }

    /// Down script reversing `version`, even if its forward script is gone
    pub fn down_for(&self, version: &str) -> Option<&DownScript> {
        self.down_scripts.get(version)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
