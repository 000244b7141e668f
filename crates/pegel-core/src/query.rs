//! Declarative queries against the store context.
//!
//! Fetch order is unspecified unless a query carries a sort.

use crate::item::ItemId;

/// Query over the items table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemQuery {
    /// Restrict to a single identity.
    pub id: Option<ItemId>,
    pub sort: Option<ItemSort>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSort {
    TimestampAscending,
    TimestampDescending,
    CreatedAscending,
    CreatedDescending,
}

/// Query over the favorite-stations table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationQuery {
    /// Restrict to one business key.
    pub hzbnr: Option<i64>,
    /// Only records currently flagged as favorite.
    pub favorites_only: bool,
    pub sort: Option<StationSort>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationSort {
    NameAscending,
    LastMeasurementDescending,
}
