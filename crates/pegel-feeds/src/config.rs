//! Feed configuration
//!
//! Endpoints and query defaults for the two upstream feeds. The WFS access
//! key ships with the app configuration, not the source.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FeedError;

/// Configuration for the upstream data feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    /// WFS gateway serving the live gauge readings.
    pub wfs_base_url: String,
    /// Access key for the WFS gateway. Empty by default; must be provided.
    pub wfs_api_key: String,
    /// Server-side filter: hydro service, parameter, non-null values only.
    pub cql_filter: String,
    /// Geosphere historical ten-minute climate endpoint.
    pub geosphere_base_url: String,
    /// Parameter keys requested from the Geosphere feed.
    pub geosphere_parameters: Vec<String>,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            wfs_base_url: "https://gis.lfrz.gv.at/wmsgw/".to_string(),
            wfs_api_key: String::new(),
            cql_filter: "hydrodienst='Niederösterreich' AND parameter='Q' AND wert IS NOT NULL"
                .to_string(),
            geosphere_base_url:
                "https://dataset.api.hub.geosphere.at/v1/station/historical/klima-v2-10min"
                    .to_string(),
            geosphere_parameters: [
                "ff", "p", "rf", "rr", "rrm", "sh", "so", "tb10", "tb20", "tl",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl FeedsConfig {
    /// Load from a TOML file; missing keys fall back to the defaults.
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| FeedError::Config(e.to_string()))
    }
}
