//! Serialized mutation facade for items

use chrono::{DateTime, Utc};

use crate::error::{DataError, Result};
use crate::item::{Item, ItemId};
use crate::persistence::{lock_context, SharedContext};
use crate::query::ItemQuery;

/// Serializes all mutating access to items.
///
/// Each operation holds the store-context lock for its whole
/// fetch-mutate-save span: at most one mutating transaction is in flight at
/// any instant, and concurrent callers queue rather than interleave. A call
/// either commits or fails atomically; there is no mid-flight cancellation.
pub struct DataHandler {
    context: SharedContext,
}

impl DataHandler {
    pub fn new(context: SharedContext) -> Self {
        Self { context }
    }

    /// Create an item and return its identity.
    pub fn new_item(&self, timestamp: DateTime<Utc>) -> Result<ItemId> {
        let mut context = lock_context(&self.context)?;
        let id = context.insert_item(Item::new(timestamp));
        context.save()?;
        Ok(id)
    }

    /// Set an item's timestamp. The create timestamp is never touched.
    ///
    /// Fails with [`DataError::ItemNotFound`] when the identity is unknown or
    /// was already deleted; the item is never recreated.
    pub fn update_item(&self, id: ItemId, timestamp: DateTime<Utc>) -> Result<()> {
        let mut context = lock_context(&self.context)?;
        let items = context.fetch_items(&ItemQuery::default())?;
        let mut item = items
            .into_iter()
            .find(|item| item.id == id)
            .ok_or(DataError::ItemNotFound(id))?;
        item.timestamp = timestamp;
        context.update_item(item);
        context.save()?;
        Ok(())
    }

    /// Remove an item.
    ///
    /// Fails with [`DataError::ItemNotFound`] when the identity is unknown or
    /// was already deleted.
    pub fn delete_item(&self, id: ItemId) -> Result<()> {
        let mut context = lock_context(&self.context)?;
        let items = context.fetch_items(&ItemQuery::default())?;
        let item = items
            .into_iter()
            .find(|item| item.id == id)
            .ok_or(DataError::ItemNotFound(id))?;
        context.delete_item(item.id);
        context.save()?;
        Ok(())
    }

    /// Committed items, for display.
    pub fn fetch_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let context = lock_context(&self.context)?;
        Ok(context.fetch_items(query)?)
    }
}
