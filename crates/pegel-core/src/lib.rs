//! Pegel Core - on-device data layer for the pegel flood-awareness apps
//!
//! This crate provides the persistent core shared by the app frontends:
//!
//! - **Schema**: versioned store schema with an explicit migration lineage
//! - **StoreContext**: transactional gateway over the on-device SQLite store
//!   (staged mutations, atomic save)
//! - **FavoriteStationRepository**: upsert-with-recency reconciliation of
//!   river-gauge favorites against out-of-order feed deliveries
//! - **DataHandler**: serialized create/update/delete facade for timestamped
//!   items
//! - **Error**: typed failure reporting distinguishing logical absence from
//!   store-level failures
//!
//! # Architecture
//!
//! The store context is the only shared mutable resource. Both the handler
//! and the repository receive it as an explicit `Arc<Mutex<_>>` dependency
//! and hold the lock for the whole span of one transaction, so mutating
//! operations never interleave.

pub mod error;
pub mod handler;
pub mod item;
pub mod persistence;
pub mod query;
pub mod station;

pub use error::{DataError, PersistenceError, Result};
pub use handler::DataHandler;
pub use item::{Item, ItemId};
pub use persistence::schema::{CurrentSchema, SchemaV1, SchemaVersion};
pub use persistence::{FavoriteStationRepository, SharedContext, StoreContext};
pub use query::{ItemQuery, ItemSort, StationQuery, StationSort};
pub use station::{FavoriteStation, StationObservation};
