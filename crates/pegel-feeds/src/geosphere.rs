//! Decoded models for the Geosphere klima-v2-10min history feed
//!
//! The feed is GeoJSON with one shared timestamp axis for the whole
//! collection and per-station parameter series aligned to it; gaps in a
//! series arrive as nulls.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::FeedError;

/// A point in a station's series, paired with its instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeValuePoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// The feed's collection: shared timestamps plus one feature per station.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawCollection")]
pub struct GeosphereCollection {
    pub timestamps: Vec<DateTime<Utc>>,
    pub features: Vec<GeosphereFeature>,
}

/// One weather station's series bundle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawFeature")]
pub struct GeosphereFeature {
    pub station_id: i64,
    pub lon: f64,
    pub lat: f64,
    pub parameters: HashMap<String, ParameterSeries>,
}

/// A single parameter's series, aligned with the collection timestamps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParameterSeries {
    pub name: String,
    pub unit: String,
    pub data: Vec<Option<f64>>,
}

impl GeosphereFeature {
    /// Non-null samples of one parameter, paired with the shared timestamps.
    pub fn series_points(
        &self,
        parameter: &str,
        timestamps: &[DateTime<Utc>],
    ) -> Vec<TimeValuePoint> {
        let Some(series) = self.parameters.get(parameter) else {
            return Vec::new();
        };
        let count = timestamps.len().min(series.data.len());
        let mut points = Vec::with_capacity(count);
        for i in 0..count {
            if let Some(value) = series.data[i] {
                points.push(TimeValuePoint {
                    time: timestamps[i],
                    value,
                });
            }
        }
        points
    }

    /// Most recent non-null sample of one parameter.
    pub fn latest_value_and_time(
        &self,
        parameter: &str,
        timestamps: &[DateTime<Utc>],
    ) -> Option<TimeValuePoint> {
        let series = self.parameters.get(parameter)?;
        let count = timestamps.len().min(series.data.len());
        (0..count).rev().find_map(|i| {
            series.data[i].map(|value| TimeValuePoint {
                time: timestamps[i],
                value,
            })
        })
    }

    /// Display name for a parameter key: the English table first, then the
    /// feed's own label, then the key itself.
    pub fn display_name(&self, parameter: &str) -> String {
        if let Some(name) = english_parameter_name(parameter) {
            return name.to_string();
        }
        if let Some(series) = self.parameters.get(parameter) {
            return series.name.clone();
        }
        parameter.to_string()
    }

    pub fn unit_for(&self, parameter: &str) -> Option<&str> {
        self.parameters.get(parameter).map(|series| series.unit.as_str())
    }
}

/// English names for the standard ten-minute climate parameters.
pub fn english_parameter_name(key: &str) -> Option<&'static str> {
    Some(match key {
        "ff" => "Wind speed",
        "p" => "Air pressure",
        "rf" => "Relative humidity",
        "rr" => "Precipitation amount",
        "rrm" => "Precipitation duration",
        "sh" => "Snow depth (total)",
        "so" => "Sunshine duration",
        "tb10" => "Soil temperature (-10 cm)",
        "tb20" => "Soil temperature (-20 cm)",
        "tl" => "Air temperature",
        _ => return None,
    })
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    timestamps: Vec<String>,
    features: Vec<GeosphereFeature>,
}

impl TryFrom<RawCollection> for GeosphereCollection {
    type Error = FeedError;

    fn try_from(raw: RawCollection) -> Result<Self, FeedError> {
        let timestamps = raw
            .timestamps
            .iter()
            .map(|s| parse_timestamp(s))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            timestamps,
            features: raw.features,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    geometry: RawGeometry,
    properties: RawProperties,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct RawProperties {
    station: i64,
    parameters: HashMap<String, ParameterSeries>,
}

impl TryFrom<RawFeature> for GeosphereFeature {
    type Error = FeedError;

    fn try_from(raw: RawFeature) -> Result<Self, FeedError> {
        let coordinates = &raw.geometry.coordinates;
        if coordinates.len() < 2 {
            return Err(FeedError::InvalidValue {
                field: "coordinates",
                value: format!("{coordinates:?}"),
            });
        }
        // This feed delivers [lat, lon].
        Ok(Self {
            station_id: raw.properties.station,
            lat: coordinates[0],
            lon: coordinates[1],
            parameters: raw.properties.parameters,
        })
    }
}

/// Timestamps arrive as RFC 3339, with or without fractional seconds, or in
/// the feed's minute-precision form ("2026-01-21T10:40+00:00").
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, FeedError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z")
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| FeedError::InvalidValue {
            field: "timestamps",
            value: raw.to_string(),
        })
}
