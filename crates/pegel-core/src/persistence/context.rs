//! Store context: transactional gateway over the on-device SQLite store

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::item::{Item, ItemId};
use crate::query::{ItemQuery, ItemSort, StationQuery, StationSort};
use crate::station::FavoriteStation;

use super::schema::{self, CurrentSchema, SchemaVersion, LINEAGE};

/// A store context shared between components under the single-writer lock.
pub type SharedContext = Arc<Mutex<StoreContext>>;

/// A staged mutation, applied atomically by [`StoreContext::save`].
#[derive(Debug, Clone)]
enum StagedOp {
    InsertItem(Item),
    UpdateItem(Item),
    DeleteItem(ItemId),
    InsertStation(FavoriteStation),
    UpdateStation(FavoriteStation),
    DeleteStation(i64),
}

/// Transactional context over one SQLite connection, bound to
/// [`CurrentSchema`].
///
/// Mutations are staged and take effect only at [`StoreContext::save`], which
/// commits the whole batch in a single transaction. Fetches see committed
/// state only.
#[derive(Debug)]
pub struct StoreContext {
    conn: Connection,
    staged: Vec<StagedOp>,
}

impl StoreContext {
    /// Open (or create) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        Self::init_with_connection(conn)
    }

    /// Wrap for shared single-writer access by handler and repository.
    pub fn into_shared(self) -> SharedContext {
        Arc::new(Mutex::new(self))
    }

    fn init_with_connection(conn: Connection) -> Result<Self, PersistenceError> {
        let context = Self {
            conn,
            staged: Vec::new(),
        };
        context.initialize()?;
        Ok(context)
    }

    /// Create tables on a fresh store, walk the migration lineage on an older
    /// one, refuse a newer one.
    fn initialize(&self) -> Result<(), PersistenceError> {
        match self.stored_version()? {
            None => {
                tracing::info!(version = %CurrentSchema::VERSION, "creating fresh store");
                self.conn.execute_batch(CurrentSchema::create_tables())?;
                self.record_version(CurrentSchema::VERSION)?;
            }
            Some(found) if found < CurrentSchema::VERSION => {
                self.run_migrations(found)?;
            }
            Some(found) if found > CurrentSchema::VERSION => {
                return Err(PersistenceError::SchemaVersionMismatch {
                    found,
                    current: CurrentSchema::VERSION,
                });
            }
            Some(_) => {}
        }
        Ok(())
    }

    fn run_migrations(&self, from: SchemaVersion) -> Result<(), PersistenceError> {
        let start = LINEAGE.iter().position(|v| *v == from).ok_or_else(|| {
            PersistenceError::Migration(format!("unknown stored schema version {from}"))
        })?;
        for pair in LINEAGE[start..].windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let sql = schema::migration(from, to).ok_or_else(|| {
                PersistenceError::Migration(format!("no migration from {from} to {to}"))
            })?;
            tracing::info!(%from, %to, "migrating store schema");
            self.conn.execute_batch(sql)?;
        }
        self.record_version(CurrentSchema::VERSION)?;
        Ok(())
    }

    fn stored_version(&self) -> Result<Option<SchemaVersion>, PersistenceError> {
        // A fresh database has no bookkeeping table yet.
        let has_table: bool = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count > 0)?;
        if !has_table {
            return Ok(None);
        }
        let version: Option<String> = self
            .conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        version.map(|raw| raw.parse()).transpose()
    }

    fn record_version(&self, version: SchemaVersion) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![version.to_string()],
        )?;
        Ok(())
    }

    // ==================== Fetch ====================

    /// Committed items matching the query.
    pub fn fetch_items(&self, query: &ItemQuery) -> Result<Vec<Item>, PersistenceError> {
        let mut sql = String::from("SELECT id, timestamp, create_timestamp FROM items");
        let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(id) = query.id {
            sql.push_str(" WHERE id = ?1");
            params_vec.push(Box::new(id.to_string()));
        }
        match query.sort {
            Some(ItemSort::TimestampAscending) => sql.push_str(" ORDER BY timestamp ASC"),
            Some(ItemSort::TimestampDescending) => sql.push_str(" ORDER BY timestamp DESC"),
            Some(ItemSort::CreatedAscending) => sql.push_str(" ORDER BY create_timestamp ASC"),
            Some(ItemSort::CreatedDescending) => sql.push_str(" ORDER BY create_timestamp DESC"),
            None => {}
        }

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut items = Vec::with_capacity(raw.len());
        for (id, timestamp, create_timestamp) in raw {
            items.push(Item {
                id: parse_id(&id)?,
                timestamp: parse_instant(&timestamp)?,
                create_timestamp: parse_instant(&create_timestamp)?,
            });
        }
        Ok(items)
    }

    /// Committed stations matching the query.
    pub fn fetch_stations(
        &self,
        query: &StationQuery,
    ) -> Result<Vec<FavoriteStation>, PersistenceError> {
        let mut sql = String::from(
            "SELECT hzbnr, name, unit, value_history, is_favorite, last_time_of_measurement \
             FROM favorite_stations",
        );
        let mut clauses: Vec<String> = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(hzbnr) = query.hzbnr {
            params_vec.push(Box::new(hzbnr));
            clauses.push(format!("hzbnr = ?{}", params_vec.len()));
        }
        if query.favorites_only {
            clauses.push("is_favorite = 1".to_string());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        match query.sort {
            Some(StationSort::NameAscending) => sql.push_str(" ORDER BY name ASC"),
            Some(StationSort::LastMeasurementDescending) => {
                sql.push_str(" ORDER BY last_time_of_measurement DESC")
            }
            None => {}
        }

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stations = Vec::with_capacity(raw.len());
        for (hzbnr, name, unit, history, is_favorite, last_time) in raw {
            stations.push(FavoriteStation {
                hzbnr,
                name,
                unit,
                values: serde_json::from_str(&history)?,
                is_favorite,
                last_time_of_measurement: parse_instant(&last_time)?,
            });
        }
        Ok(stations)
    }

    // ==================== Staging ====================

    /// Stage a new item; takes effect at the next [`StoreContext::save`].
    /// Returns the identity.
    pub fn insert_item(&mut self, item: Item) -> ItemId {
        let id = item.id;
        self.staged.push(StagedOp::InsertItem(item));
        id
    }

    /// Stage an update of an item's mutable fields. The create timestamp is
    /// never written back.
    pub fn update_item(&mut self, item: Item) {
        self.staged.push(StagedOp::UpdateItem(item));
    }

    /// Stage removal of an item.
    pub fn delete_item(&mut self, id: ItemId) {
        self.staged.push(StagedOp::DeleteItem(id));
    }

    /// Stage a new station.
    pub fn insert_station(&mut self, station: FavoriteStation) {
        self.staged.push(StagedOp::InsertStation(station));
    }

    /// Stage an update of a station's mutable fields (everything but the
    /// business key).
    pub fn update_station(&mut self, station: FavoriteStation) {
        self.staged.push(StagedOp::UpdateStation(station));
    }

    /// Stage removal of a station.
    pub fn delete_station(&mut self, hzbnr: i64) {
        self.staged.push(StagedOp::DeleteStation(hzbnr));
    }

    /// Whether any staged mutations are pending.
    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Drop all staged mutations without applying them.
    pub fn discard_staged(&mut self) {
        self.staged.clear();
    }

    /// Commit every staged mutation in one transaction.
    ///
    /// All-or-nothing: on failure the transaction is rolled back, nothing
    /// becomes observable by later fetches, and the staged batch is
    /// discarded.
    pub fn save(&mut self) -> Result<(), PersistenceError> {
        let staged = std::mem::take(&mut self.staged);
        if staged.is_empty() {
            return Ok(());
        }
        tracing::debug!(ops = staged.len(), "committing staged batch");
        let tx = self.conn.transaction()?;
        for op in &staged {
            Self::apply(&tx, op)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn apply(tx: &rusqlite::Transaction<'_>, op: &StagedOp) -> Result<(), PersistenceError> {
        match op {
            StagedOp::InsertItem(item) => {
                tx.execute(
                    "INSERT INTO items (id, timestamp, create_timestamp) VALUES (?1, ?2, ?3)",
                    params![
                        item.id.to_string(),
                        item.timestamp.to_rfc3339(),
                        item.create_timestamp.to_rfc3339(),
                    ],
                )
                .map_err(constraint_or_database)?;
            }
            StagedOp::UpdateItem(item) => {
                tx.execute(
                    "UPDATE items SET timestamp = ?1 WHERE id = ?2",
                    params![item.timestamp.to_rfc3339(), item.id.to_string()],
                )?;
            }
            StagedOp::DeleteItem(id) => {
                tx.execute("DELETE FROM items WHERE id = ?1", params![id.to_string()])?;
            }
            StagedOp::InsertStation(station) => {
                let history = serde_json::to_string(&station.values)?;
                tx.execute(
                    "INSERT INTO favorite_stations \
                     (hzbnr, name, unit, value_history, is_favorite, last_time_of_measurement) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        station.hzbnr,
                        station.name,
                        station.unit,
                        history,
                        station.is_favorite,
                        station.last_time_of_measurement.to_rfc3339(),
                    ],
                )
                .map_err(constraint_or_database)?;
            }
            StagedOp::UpdateStation(station) => {
                let history = serde_json::to_string(&station.values)?;
                tx.execute(
                    "UPDATE favorite_stations \
                     SET name = ?1, unit = ?2, value_history = ?3, is_favorite = ?4, \
                         last_time_of_measurement = ?5 \
                     WHERE hzbnr = ?6",
                    params![
                        station.name,
                        station.unit,
                        history,
                        station.is_favorite,
                        station.last_time_of_measurement.to_rfc3339(),
                        station.hzbnr,
                    ],
                )?;
            }
            StagedOp::DeleteStation(hzbnr) => {
                tx.execute(
                    "DELETE FROM favorite_stations WHERE hzbnr = ?1",
                    params![hzbnr],
                )?;
            }
        }
        Ok(())
    }
}

/// Acquire the shared single-writer lock.
pub(crate) fn lock_context(
    context: &SharedContext,
) -> Result<MutexGuard<'_, StoreContext>, PersistenceError> {
    context
        .lock()
        .map_err(|_| PersistenceError::Database("store lock poisoned".into()))
}

fn parse_id(raw: &str) -> Result<ItemId, PersistenceError> {
    Uuid::parse_str(raw).map_err(|e| PersistenceError::Database(format!("item id {raw}: {e}")))
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PersistenceError::Database(format!("timestamp {raw}: {e}")))
}

fn constraint_or_database(err: rusqlite::Error) -> PersistenceError {
    if let rusqlite::Error::SqliteFailure(ref cause, _) = err {
        if cause.code == rusqlite::ErrorCode::ConstraintViolation {
            return PersistenceError::Constraint(err.to_string());
        }
    }
    PersistenceError::Database(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_station(hzbnr: i64, name: &str) -> FavoriteStation {
        FavoriteStation::new(
            name.into(),
            hzbnr,
            "m3/s".into(),
            true,
            5.0,
            DateTime::from_timestamp(0, 0).unwrap(),
        )
    }

    #[test]
    fn staged_mutations_are_invisible_until_save() {
        let mut context = StoreContext::open_in_memory().unwrap();
        context.insert_station(make_station(123, "Alpha"));
        assert!(context.has_staged());
        assert!(context
            .fetch_stations(&StationQuery::default())
            .unwrap()
            .is_empty());

        context.save().unwrap();
        assert!(!context.has_staged());
        assert_eq!(
            context.fetch_stations(&StationQuery::default()).unwrap().len(),
            1
        );
    }

    #[test]
    fn save_commits_mixed_batch() {
        let mut context = StoreContext::open_in_memory().unwrap();
        let id = context.insert_item(Item::new(DateTime::from_timestamp(0, 0).unwrap()));
        context.insert_station(make_station(123, "Alpha"));
        context.save().unwrap();

        let items = context.fetch_items(&ItemQuery::default()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
        assert_eq!(
            context.fetch_stations(&StationQuery::default()).unwrap().len(),
            1
        );
    }

    #[test]
    fn save_with_nothing_staged_is_a_no_op() {
        let mut context = StoreContext::open_in_memory().unwrap();
        context.save().unwrap();
    }

    #[test]
    fn duplicate_station_insert_is_a_constraint_violation() {
        let mut context = StoreContext::open_in_memory().unwrap();
        context.insert_station(make_station(123, "Alpha"));
        context.save().unwrap();

        context.insert_station(make_station(123, "Alpha again"));
        let err = context.save().unwrap_err();
        assert!(matches!(err, PersistenceError::Constraint(_)));
    }

    #[test]
    fn failed_save_rolls_back_the_whole_batch() {
        let mut context = StoreContext::open_in_memory().unwrap();
        context.insert_station(make_station(123, "Alpha"));
        context.save().unwrap();

        // One batch: a valid update followed by a constraint violation.
        let mut renamed = make_station(123, "Renamed");
        renamed.values = vec![5.0, 6.0];
        context.update_station(renamed);
        context.insert_station(make_station(123, "Duplicate"));
        assert!(context.save().is_err());

        // Nothing from the failed batch is observable, and it is discarded.
        assert!(!context.has_staged());
        let stations = context.fetch_stations(&StationQuery::default()).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "Alpha");
        assert_eq!(stations[0].values, vec![5.0]);
    }

    #[test]
    fn discard_staged_drops_pending_mutations() {
        let mut context = StoreContext::open_in_memory().unwrap();
        context.insert_station(make_station(123, "Alpha"));
        context.discard_staged();
        context.save().unwrap();
        assert!(context
            .fetch_stations(&StationQuery::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn fetch_items_by_id_and_sorted() {
        let mut context = StoreContext::open_in_memory().unwrap();
        let early = context.insert_item(Item::new(DateTime::from_timestamp(0, 0).unwrap()));
        let late = context.insert_item(Item::new(DateTime::from_timestamp(100, 0).unwrap()));
        context.save().unwrap();

        let by_id = context
            .fetch_items(&ItemQuery {
                id: Some(early),
                sort: None,
            })
            .unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].id, early);

        let ascending = context
            .fetch_items(&ItemQuery {
                id: None,
                sort: Some(ItemSort::TimestampAscending),
            })
            .unwrap();
        assert_eq!(ascending[0].id, early);
        assert_eq!(ascending[1].id, late);

        let descending = context
            .fetch_items(&ItemQuery {
                id: None,
                sort: Some(ItemSort::TimestampDescending),
            })
            .unwrap();
        assert_eq!(descending[0].id, late);
    }

    #[test]
    fn station_queries_filter_and_sort() {
        let mut context = StoreContext::open_in_memory().unwrap();
        context.insert_station(make_station(1, "Zeta"));
        let mut not_favorite = make_station(2, "Alpha");
        not_favorite.is_favorite = false;
        context.insert_station(not_favorite);
        context.save().unwrap();

        let favorites = context
            .fetch_stations(&StationQuery {
                favorites_only: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].hzbnr, 1);

        let by_name = context
            .fetch_stations(&StationQuery {
                sort: Some(StationSort::NameAscending),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_name[0].name, "Alpha");
        assert_eq!(by_name[1].name, "Zeta");

        let by_key = context
            .fetch_stations(&StationQuery {
                hzbnr: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_key.len(), 1);
        assert_eq!(by_key[0].name, "Alpha");
    }

    #[test]
    fn station_round_trips_through_storage() {
        let mut context = StoreContext::open_in_memory().unwrap();
        let mut station = make_station(456, "Beta");
        station.values = vec![5.0, 7.5, 3.25];
        station.last_time_of_measurement = DateTime::from_timestamp(7200, 0).unwrap();
        context.insert_station(station.clone());
        context.save().unwrap();

        let stored = context
            .fetch_stations(&StationQuery {
                hzbnr: Some(456),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(stored, vec![station]);
    }

    #[test]
    fn fresh_store_records_current_version() {
        let context = StoreContext::open_in_memory().unwrap();
        let version: String = context
            .conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CurrentSchema::VERSION.to_string());
    }

    #[test]
    fn reopening_does_not_migrate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");

        drop(StoreContext::open(&path).unwrap());
        let context = StoreContext::open(&path).unwrap();

        let rows: i64 = context
            .conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn newer_store_version_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        drop(StoreContext::open(&path).unwrap());

        let conn = Connection::open(&path).unwrap();
        conn.execute("UPDATE schema_version SET version = '9.9.9'", [])
            .unwrap();
        drop(conn);

        let err = StoreContext::open(&path).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::SchemaVersionMismatch { .. }
        ));
    }

    #[test]
    fn unknown_older_version_fails_migration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        drop(StoreContext::open(&path).unwrap());

        let conn = Connection::open(&path).unwrap();
        conn.execute("UPDATE schema_version SET version = '0.9.0'", [])
            .unwrap();
        drop(conn);

        let err = StoreContext::open(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::Migration(_)));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");

        let mut context = StoreContext::open(&path).unwrap();
        context.insert_station(make_station(123, "Alpha"));
        context.save().unwrap();
        drop(context);

        let context = StoreContext::open(&path).unwrap();
        let stations = context.fetch_stations(&StationQuery::default()).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "Alpha");
    }
}
