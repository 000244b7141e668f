//! Repository for favorite-station reconciliation

use crate::error::Result;
use crate::query::StationQuery;
use crate::station::{FavoriteStation, StationObservation};

use super::context::{lock_context, SharedContext};

/// Repository applying upsert-with-recency semantics to favorite stations.
///
/// All access goes through the shared store-context lock, so two upserts for
/// the same business key cannot interleave. The recency guard, not the lock,
/// is what orders measurements: feed deliveries can arrive out of order, and
/// a stale observation must never clobber a newer one.
pub struct FavoriteStationRepository {
    context: SharedContext,
}

impl FavoriteStationRepository {
    pub fn new(context: SharedContext) -> Self {
        Self { context }
    }

    /// Insert if missing, otherwise update in place.
    ///
    /// Metadata (`name`, `unit`, and the flag when given) is overwritten
    /// unconditionally. The measurement is appended, and the stored instant
    /// advanced, only when the observation is not older than the stored
    /// instant; an equal instant still appends. `Some(false)` on an existing
    /// record deletes it instead.
    pub fn upsert_station(
        &self,
        observation: StationObservation,
        is_favorite: Option<bool>,
    ) -> Result<()> {
        let mut context = lock_context(&self.context)?;

        let query = StationQuery {
            hzbnr: Some(observation.hzbnr),
            ..Default::default()
        };
        let existing = context.fetch_stations(&query)?.into_iter().next();

        match existing {
            Some(mut station) => {
                if is_favorite == Some(false) {
                    tracing::debug!(hzbnr = station.hzbnr, "removing unfavorited station");
                    context.delete_station(station.hzbnr);
                    context.save()?;
                    return Ok(());
                }

                station.name = observation.name;
                station.unit = observation.unit;
                if let Some(flag) = is_favorite {
                    station.is_favorite = flag;
                }

                if observation.time_of_measurement >= station.last_time_of_measurement {
                    station.values.push(observation.value);
                    station.last_time_of_measurement = observation.time_of_measurement;
                } else {
                    tracing::debug!(hzbnr = station.hzbnr, "discarding stale measurement");
                }

                context.update_station(station);
            }
            None => {
                let station = FavoriteStation::new(
                    observation.name,
                    observation.hzbnr,
                    observation.unit,
                    is_favorite.unwrap_or(true),
                    observation.value,
                    observation.time_of_measurement,
                );
                context.insert_station(station);
            }
        }

        context.save()?;
        Ok(())
    }

    /// Committed stations, for display.
    pub fn fetch_stations(&self, query: &StationQuery) -> Result<Vec<FavoriteStation>> {
        let context = lock_context(&self.context)?;
        Ok(context.fetch_stations(query)?)
    }
}
