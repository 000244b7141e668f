use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A river-gauge station marked as favorite, with its measurement history.
///
/// The station is keyed by `hzbnr`, the hydrographic service's business key;
/// the store holds at most one record per key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteStation {
    /// Station business key (unique across the store).
    pub hzbnr: i64,
    pub name: String,
    pub unit: String,
    /// Append-only history of accepted measurements, in arrival order.
    pub values: Vec<f64>,
    pub is_favorite: bool,
    /// Instant of the most recent accepted measurement.
    pub last_time_of_measurement: DateTime<Utc>,
}

impl FavoriteStation {
    pub fn new(
        name: String,
        hzbnr: i64,
        unit: String,
        is_favorite: bool,
        initial_value: f64,
        last_time_of_measurement: DateTime<Utc>,
    ) -> Self {
        Self {
            hzbnr,
            name,
            unit,
            values: vec![initial_value],
            is_favorite,
            last_time_of_measurement,
        }
    }
}

/// One decoded measurement, as delivered by the ingestion layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StationObservation {
    pub hzbnr: i64,
    pub name: String,
    pub unit: String,
    pub value: f64,
    pub time_of_measurement: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_station_seeds_single_element_history() {
        let station = FavoriteStation::new(
            "Alpha".into(),
            123,
            "m3/s".into(),
            true,
            5.0,
            DateTime::from_timestamp(0, 0).unwrap(),
        );
        assert_eq!(station.values, vec![5.0]);
        assert!(station.is_favorite);
    }

    #[test]
    fn station_serde_round_trip() {
        let station = FavoriteStation::new(
            "Alpha".into(),
            123,
            "m3/s".into(),
            false,
            5.0,
            DateTime::from_timestamp(3600, 0).unwrap(),
        );
        let json = serde_json::to_string(&station).unwrap();
        let back: FavoriteStation = serde_json::from_str(&json).unwrap();
        assert_eq!(station, back);
    }
}
