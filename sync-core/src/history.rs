//! Bounded, newest-first history of clipboard items.

use std::collections::VecDeque;

use clipsync_types::{HistoryItem, HISTORY_CAPACITY};

/// Newest-first list of at most `capacity` items.
///
/// Pushing beyond capacity evicts the oldest entry. Reads never reorder.
#[derive(Debug, Clone)]
pub struct HistoryCache {
    capacity: usize,
    items: VecDeque<HistoryItem>,
}

impl HistoryCache {
    /// Create an empty cache holding [`HISTORY_CAPACITY`] items.
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create an empty cache with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Rebuild from a persisted newest-first snapshot, keeping the first
    /// `HISTORY_CAPACITY` items.
    pub fn from_items(items: impl IntoIterator<Item = HistoryItem>) -> Self {
        let mut cache = Self::new();
        cache.items.extend(items.into_iter().take(cache.capacity));
        cache
    }

    /// Insert as the newest item. Returns the evicted item, if any.
    pub fn push(&mut self, item: HistoryItem) -> Option<HistoryItem> {
        self.items.push_front(item);
        if self.items.len() > self.capacity {
            self.items.pop_back()
        } else {
            None
        }
    }

    /// Look up an item by id.
    pub fn get(&self, id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Iterate newest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryItem> {
        self.items.iter()
    }

    /// Newest-first snapshot for persistence or display.
    pub fn to_vec(&self) -> Vec<HistoryItem> {
        self.items.iter().cloned().collect()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if there are no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove every item unconditionally.
    ///
    /// Used on manual disconnect. User-initiated clears go through
    /// [`HistoryCache::request_clear`].
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Start a user-initiated clear that only happens once confirmed.
    pub fn request_clear(&mut self) -> ClearRequest<'_> {
        ClearRequest { cache: self }
    }
}

impl Default for HistoryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// A pending clear. Dropping it without confirming leaves history intact.
#[must_use = "history is only cleared by calling confirm()"]
pub struct ClearRequest<'a> {
    cache: &'a mut HistoryCache,
}

impl ClearRequest<'_> {
    /// Number of items that would be removed.
    pub fn pending(&self) -> usize {
        self.cache.len()
    }

    /// Clear the history. Returns how many items were removed.
    pub fn confirm(self) -> usize {
        let removed = self.cache.len();
        self.cache.clear();
        removed
    }

    /// Abandon the clear.
    pub fn cancel(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsync_types::ItemKind;

    fn item(n: u64) -> HistoryItem {
        HistoryItem::sent(ItemKind::Text, format!("item {}", n), "me", n, None)
    }

    #[test]
    fn newest_first() {
        let mut cache = HistoryCache::new();
        cache.push(item(1));
        cache.push(item(2));

        let contents: Vec<_> = cache.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(contents, vec!["item 2", "item 1"]);
    }

    #[test]
    fn sixty_pushes_keep_fifty_most_recent() {
        let mut cache = HistoryCache::new();
        for n in 1..=60 {
            cache.push(item(n));
        }

        assert_eq!(cache.len(), 50);
        let timestamps: Vec<u64> = cache.iter().map(|i| i.timestamp).collect();
        let expected: Vec<u64> = (11..=60).rev().collect();
        assert_eq!(timestamps, expected);
    }

    #[test]
    fn push_returns_evicted_item() {
        let mut cache = HistoryCache::with_capacity(2);
        assert!(cache.push(item(1)).is_none());
        assert!(cache.push(item(2)).is_none());
        let evicted = cache.push(item(3)).unwrap();
        assert_eq!(evicted.timestamp, 1);
    }

    #[test]
    fn from_items_truncates_to_capacity() {
        let items: Vec<_> = (0..70).rev().map(item).collect();
        let cache = HistoryCache::from_items(items);
        assert_eq!(cache.len(), HISTORY_CAPACITY);
        assert_eq!(cache.iter().next().unwrap().timestamp, 69);
    }

    #[test]
    fn get_by_id() {
        let mut cache = HistoryCache::new();
        let first = item(1);
        let id = first.id.clone();
        cache.push(first);
        cache.push(item(2));

        assert_eq!(cache.get(&id).unwrap().timestamp, 1);
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn clear_requires_confirmation() {
        let mut cache = HistoryCache::new();
        cache.push(item(1));
        cache.push(item(2));

        let request = cache.request_clear();
        assert_eq!(request.pending(), 2);
        request.cancel();
        assert_eq!(cache.len(), 2);

        let removed = cache.request_clear().confirm();
        assert_eq!(removed, 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn snapshot_preserves_order() {
        let mut cache = HistoryCache::new();
        for n in 1..=3 {
            cache.push(item(n));
        }
        let restored = HistoryCache::from_items(cache.to_vec());
        let a: Vec<_> = cache.iter().map(|i| &i.id).collect();
        let b: Vec<_> = restored.iter().map(|i| &i.id).collect();
        assert_eq!(a, b);
    }
}
