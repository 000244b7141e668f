//! Pegel Feeds - upstream data feeds for the pegel flood-awareness apps
//!
//! Decoded models and the fetch client for the two external sources the apps
//! reconcile against:
//!
//! - **wfs**: the live river-gauge feed (WFS "pegelaktuell") with its German
//!   property keys and decimal-comma values
//! - **geosphere**: the Geosphere ten-minute climate history feed, a shared
//!   timestamp axis with per-station parameter series
//! - **client**: plain GET + JSON decode for both feeds; no retry policy
//! - **lookup**: gauge-to-weather-station mapping from the bundled CSV
//! - **config**: endpoints, API key, and query defaults

pub mod client;
pub mod config;
pub mod error;
pub mod geosphere;
pub mod lookup;
pub mod wfs;

pub use client::FeedClient;
pub use config::FeedsConfig;
pub use error::{FeedError, Result};
pub use geosphere::{GeosphereCollection, GeosphereFeature, ParameterSeries, TimeValuePoint};
pub use lookup::GeosphereLookup;
pub use wfs::{StationReading, StationReadingCollection};
