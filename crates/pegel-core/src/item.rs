use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque item identity (UUID v4, generated at construction).
pub type ItemId = Uuid;

/// A generic timestamped record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// User-settable instant.
    pub timestamp: DateTime<Utc>,
    /// Set once at creation; update operations never touch it.
    pub create_timestamp: DateTime<Utc>,
}

impl Item {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            create_timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_timestamp_is_set_on_construction() {
        let before = Utc::now();
        let item = Item::new(DateTime::from_timestamp(0, 0).unwrap());
        let after = Utc::now();
        assert!(item.create_timestamp >= before);
        assert!(item.create_timestamp <= after);
    }

    #[test]
    fn identities_are_unique() {
        let timestamp = DateTime::from_timestamp(0, 0).unwrap();
        let a = Item::new(timestamp);
        let b = Item::new(timestamp);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn item_serde_round_trip() {
        let item = Item::new(DateTime::from_timestamp(100, 0).unwrap());
        let json = serde_json::to_string(&item).unwrap();
        let back: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(item, back);
    }
}
