//! Error types for pegel-feeds

use thiserror::Error;

/// Result type alias for feed operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// Failures while fetching or decoding the upstream feeds.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Transport-level failure (including non-2xx responses)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not match the expected feed shape
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A field the feed promises could not be interpreted
    #[error("invalid {field} value: {value:?}")]
    InvalidValue {
        field: &'static str,
        value: String,
    },

    /// The station-mapping file could not be read
    #[error("lookup error: {0}")]
    Lookup(String),

    /// The feeds configuration could not be loaded
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for FeedError {
    fn from(err: csv::Error) -> Self {
        FeedError::Lookup(err.to_string())
    }
}
