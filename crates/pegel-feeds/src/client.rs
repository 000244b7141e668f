//! HTTP client for the upstream feeds
//!
//! Plain GET plus JSON decode. Transient failures are the caller's concern;
//! there is no retry here.

use chrono::{DateTime, Utc};

use crate::config::FeedsConfig;
use crate::error::FeedError;
use crate::geosphere::GeosphereCollection;
use crate::wfs::{StationReading, StationReadingCollection};

/// Client for the live gauge feed and the Geosphere history feed.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    config: FeedsConfig,
}

impl FeedClient {
    pub fn new(config: FeedsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Fetch the current readings of all stations passing the CQL filter.
    pub async fn fetch_current_stations(&self) -> Result<Vec<StationReading>, FeedError> {
        let params = wfs_query_params(&self.config);
        let response = self
            .http
            .get(&self.config.wfs_base_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        let collection: StationReadingCollection = serde_json::from_str(&body)?;
        tracing::debug!(features = collection.features.len(), "decoded gauge readings");
        Ok(collection.features)
    }

    /// Fetch historical ten-minute series for the given Geosphere stations,
    /// from `start` up to today.
    pub async fn fetch_station_history(
        &self,
        station_ids: &[i64],
        start: DateTime<Utc>,
    ) -> Result<GeosphereCollection, FeedError> {
        let params = geosphere_query_params(&self.config, station_ids, start, Utc::now());
        let response = self
            .http
            .get(&self.config.geosphere_base_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        let collection: GeosphereCollection = serde_json::from_str(&body)?;
        tracing::debug!(
            stations = collection.features.len(),
            samples = collection.timestamps.len(),
            "decoded station history"
        );
        Ok(collection)
    }
}

/// Query parameters for the WFS GetFeature request.
fn wfs_query_params(config: &FeedsConfig) -> Vec<(&'static str, String)> {
    vec![
        ("key", config.wfs_api_key.clone()),
        ("SERVICE", "WFS".to_string()),
        ("REQUEST", "GetFeature".to_string()),
        ("VERSION", "2.0.0".to_string()),
        ("TYPENAMES", "pegelaktuell".to_string()),
        ("SRSNAME", "EPSG:4326".to_string()),
        ("OUTPUTFORMAT", "application/json".to_string()),
        ("CQL_FILTER", config.cql_filter.clone()),
    ]
}

/// Query parameters for the Geosphere historical request.
fn geosphere_query_params(
    config: &FeedsConfig,
    station_ids: &[i64],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    let ids = station_ids
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    vec![
        ("station_ids", ids),
        ("start", format_day_utc(start)),
        ("end", format_day_utc(end)),
        ("parameters", config.geosphere_parameters.join(",")),
        ("output_format", "geojson".to_string()),
    ]
}

/// The Geosphere API expects plain UTC dates for the day bounds.
fn format_day_utc(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}
