//! Versioned schema for the pegel store
//!
//! Entity shape changes require a new version entry here; every other
//! component goes through the [`CurrentSchema`] alias and never hardcodes a
//! version.

use std::fmt;
use std::str::FromStr;

use crate::error::PersistenceError;

/// Three-part schema version identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SchemaVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SchemaVersion {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(invalid_version(s));
        }
        let major = parts[0].parse().map_err(|_| invalid_version(s))?;
        let minor = parts[1].parse().map_err(|_| invalid_version(s))?;
        let patch = parts[2].parse().map_err(|_| invalid_version(s))?;
        Ok(SchemaVersion::new(major, minor, patch))
    }
}

fn invalid_version(s: &str) -> PersistenceError {
    PersistenceError::Migration(format!("invalid schema version: {s}"))
}

/// The schema the running code targets.
pub type CurrentSchema = SchemaV1;

/// Ordered lineage of declared schema versions, oldest first.
///
/// The store-context initialization walks this list when it finds an older
/// version on disk.
pub const LINEAGE: &[SchemaVersion] = &[SchemaV1::VERSION];

/// Version 1: generic timestamped items plus favorite stations.
pub struct SchemaV1;

impl SchemaV1 {
    pub const VERSION: SchemaVersion = SchemaVersion::new(1, 0, 0);

    /// Entity tables this version declares.
    pub fn entities() -> &'static [&'static str] {
        &["items", "favorite_stations"]
    }

    /// Complete DDL for a fresh store.
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version bookkeeping
CREATE TABLE IF NOT EXISTS schema_version (
    version TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Generic timestamped records
CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    create_timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_timestamp ON items(timestamp);

-- Stations marked as favorite, with measurement history
CREATE TABLE IF NOT EXISTS favorite_stations (
    hzbnr INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    unit TEXT NOT NULL,
    value_history TEXT NOT NULL,
    is_favorite INTEGER NOT NULL DEFAULT 1,
    last_time_of_measurement TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_stations_favorite ON favorite_stations(is_favorite);
"#
    }
}

/// Migration SQL between two adjacent versions in the lineage.
pub fn migration(from: SchemaVersion, to: SchemaVersion) -> Option<&'static str> {
    match (from, to) {
        // Add steps here as the schema evolves
        _ => None,
    }
}
