//! Decoded models for the live river-gauge feed (WFS "pegelaktuell")
//!
//! The feed is GeoJSON with German property keys; numeric values and
//! coordinates arrive as strings with decimal commas, and instants as
//! ISO-8601 with or without fractional seconds.

use chrono::{DateTime, Utc};
use pegel_core::StationObservation;
use serde::Deserialize;

use crate::error::FeedError;

/// The feed's feature collection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationReadingCollection {
    pub features: Vec<StationReading>,
}

/// One decoded gauge reading.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawFeature")]
pub struct StationReading {
    pub id: String,
    pub dbmsnr: i64,
    pub hzbnr: i64,
    /// Display name (the feed's measuring-point label).
    pub name: String,
    pub water_body: String,
    pub hydro_service: Option<String>,
    pub measuring_point: String,
    pub parameter: String,
    pub value: f64,
    pub unit: String,
    pub time_of_measurement: DateTime<Utc>,
    pub lon: f64,
    pub lat: f64,
}

impl StationReading {
    /// The reconciliation record handed to the favorites repository.
    pub fn to_observation(&self) -> StationObservation {
        StationObservation {
            hzbnr: self.hzbnr,
            name: self.name.clone(),
            unit: self.unit.clone(),
            value: self.value,
            time_of_measurement: self.time_of_measurement,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    id: String,
    properties: RawProperties,
}

#[derive(Debug, Deserialize)]
struct RawProperties {
    dbmsnr: i64,
    hzbnr: i64,
    gewaesser: String,
    hydrodienst: Option<String>,
    messstelle: String,
    parameter: String,
    wert: String,
    einheit: String,
    zeitpunkt: String,
    lon: String,
    lat: String,
}

impl TryFrom<RawFeature> for StationReading {
    type Error = FeedError;

    fn try_from(raw: RawFeature) -> Result<Self, FeedError> {
        let p = raw.properties;
        let value = parse_decimal("wert", &p.wert)?;
        let lon = parse_decimal("lon", &p.lon)?;
        let lat = parse_decimal("lat", &p.lat)?;
        let time_of_measurement = parse_instant("zeitpunkt", &p.zeitpunkt)?;
        Ok(Self {
            id: raw.id,
            dbmsnr: p.dbmsnr,
            hzbnr: p.hzbnr,
            name: p.messstelle.clone(),
            water_body: p.gewaesser,
            hydro_service: p.hydrodienst,
            measuring_point: p.messstelle,
            parameter: p.parameter,
            value,
            unit: p.einheit,
            time_of_measurement,
            lon,
            lat,
        })
    }
}

/// The feed writes decimal commas ("1234,5").
fn parse_decimal(field: &'static str, raw: &str) -> Result<f64, FeedError> {
    raw.replace(',', ".").parse().map_err(|_| FeedError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

fn parse_instant(field: &'static str, raw: &str) -> Result<DateTime<Utc>, FeedError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| FeedError::InvalidValue {
            field,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURE: &str = r#"{
        "id": "pegelaktuell.42",
        "properties": {
            "dbmsnr": 42,
            "hzbnr": 207068,
            "gewaesser": "Donau",
            "hydrodienst": "Niederösterreich",
            "messstelle": "Kienstock",
            "parameter": "Q",
            "wert": "1234,5",
            "einheit": "m³/s",
            "zeitpunkt": "2026-01-21T10:00:00+01:00",
            "lon": "15,46",
            "lat": "48,38"
        }
    }"#;

    #[test]
    fn feature_decodes_with_german_keys_and_comma_decimals() {
        let reading: StationReading = serde_json::from_str(FEATURE).unwrap();
        assert_eq!(reading.hzbnr, 207068);
        assert_eq!(reading.name, "Kienstock");
        assert_eq!(reading.measuring_point, "Kienstock");
        assert_eq!(reading.water_body, "Donau");
        assert_eq!(reading.value, 1234.5);
        assert_eq!(reading.unit, "m³/s");
        assert_eq!(reading.lon, 15.46);
        assert_eq!(reading.lat, 48.38);
        // 10:00 at +01:00 is 09:00 UTC.
        assert_eq!(
            reading.time_of_measurement,
            DateTime::parse_from_rfc3339("2026-01-21T09:00:00Z").unwrap()
        );
    }

    #[test]
    fn fractional_second_instants_decode_too() {
        let raw = FEATURE.replace("2026-01-21T10:00:00+01:00", "2026-01-21T10:00:00.500+01:00");
        let reading: StationReading = serde_json::from_str(&raw).unwrap();
        assert_eq!(reading.time_of_measurement.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn missing_hydro_service_is_tolerated() {
        let raw = FEATURE.replace("\"hydrodienst\": \"Niederösterreich\",", "");
        let reading: StationReading = serde_json::from_str(&raw).unwrap();
        assert!(reading.hydro_service.is_none());
    }

    #[test]
    fn unparseable_value_is_rejected() {
        let raw = FEATURE.replace("1234,5", "n/a");
        let err = serde_json::from_str::<StationReading>(&raw).unwrap_err();
        assert!(err.to_string().contains("wert"));
    }

    #[test]
    fn collection_decodes() {
        let raw = format!("{{\"features\": [{FEATURE}, {FEATURE}]}}");
        let collection: StationReadingCollection = serde_json::from_str(&raw).unwrap();
        assert_eq!(collection.features.len(), 2);
    }

    #[test]
    fn observation_carries_the_reconciliation_fields() {
        let reading: StationReading = serde_json::from_str(FEATURE).unwrap();
        let observation = reading.to_observation();
        assert_eq!(observation.hzbnr, reading.hzbnr);
        assert_eq!(observation.name, reading.name);
        assert_eq!(observation.unit, reading.unit);
        assert_eq!(observation.value, reading.value);
        assert_eq!(observation.time_of_measurement, reading.time_of_measurement);
    }
}
