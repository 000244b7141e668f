//! Station-mapping lookup: river gauge (hzbnr) to nearest weather station
//!
//! The apps ship a `hzbnr,geosphere_id` CSV pairing every gauge with its
//! nearest Geosphere station.

use std::collections::HashMap;
use std::path::Path;

use crate::error::FeedError;

/// Mapping from gauge business keys to Geosphere station ids.
#[derive(Debug, Clone, Default)]
pub struct GeosphereLookup {
    mapping: HashMap<i64, i64>,
}

impl GeosphereLookup {
    /// Load the mapping from a CSV file. A header row, blank lines, and
    /// malformed rows are skipped.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut mapping = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let Some(Ok(hzbnr)) = record.get(0).map(|s| s.parse::<i64>()) else {
                continue;
            };
            let Some(Ok(geosphere_id)) = record.get(1).map(|s| s.parse::<i64>()) else {
                continue;
            };
            mapping.insert(hzbnr, geosphere_id);
        }
        tracing::debug!(entries = mapping.len(), "loaded station mapping");
        Ok(Self { mapping })
    }

    /// Geosphere station id for a gauge, if mapped.
    pub fn get(&self, hzbnr: i64) -> Option<i64> {
        self.mapping.get(&hzbnr).copied()
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}
