//! Decoded asset cache.

use crate::asset::{Asset, Audio, Font, Image, TextLines, ViewNode};
use crate::key::{AssetKey, AssetKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

type Shard = RwLock<HashMap<Arc<str>, Asset>>;

/// Per-kind map from asset name to its decoded value.
///
/// Each kind lives in its own shard so clearing or filling one kind never
/// contends with readers of another. Locks are held only for the map
/// operation itself.
///
/// Entries are immutable once inserted: [`put`](Self::put) keeps whatever
/// was there first, and [`clear`](Self::clear) only drops the cache's own
/// reference, so a caller holding an [`Asset`] keeps a valid value.
#[derive(Debug, Default)]
pub struct ResourceCache {
    shards: [Shard; AssetKind::ALL.len()],
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn shard(&self, kind: AssetKind) -> &Shard {
        &self.shards[kind.index()]
    }

    pub fn get(&self, key: &AssetKey) -> Option<Asset> {
        self.shard(key.kind()).read().get(key.name()).cloned()
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.shard(key.kind()).read().contains_key(key.name())
    }

    /// Insert `asset` unless `key` is already cached.
    ///
    /// Returns the value the cache holds afterwards: `asset` itself if it
    /// was inserted, otherwise the earlier entry (and `asset` is dropped).
    pub fn put(&self, key: &AssetKey, asset: Asset) -> Asset {
        debug_assert_eq!(key.kind(), asset.kind(), "asset stored under a key of another kind");
        let mut shard = self.shard(key.kind()).write();
        shard.entry(Arc::from(key.name())).or_insert(asset).clone()
    }

    /// [`put`](Self::put), but only if `admit` still holds once the shard
    /// is locked. Returns `None` when it doesn't.
    ///
    /// A clear that runs after `admit` turns false takes the same lock, so
    /// an entry admitted before that point is removed by it and nothing is
    /// admitted after it.
    pub(crate) fn put_if(&self, key: &AssetKey, asset: Asset, admit: impl FnOnce() -> bool) -> Option<Asset> {
        debug_assert_eq!(key.kind(), asset.kind(), "asset stored under a key of another kind");
        let mut shard = self.shard(key.kind()).write();
        if !admit() {
            return None;
        }
        Some(shard.entry(Arc::from(key.name())).or_insert(asset).clone())
    }

    /// Drop every entry of `kind`. Returns how many were removed.
    pub fn clear(&self, kind: AssetKind) -> usize {
        let mut shard = self.shard(kind).write();
        let removed = shard.len();
        shard.clear();
        removed
    }

    pub fn clear_all(&self) -> usize {
        AssetKind::ALL.into_iter().map(|kind| self.clear(kind)).sum()
    }

    /// Number of cached entries of `kind`.
    pub fn len(&self, kind: AssetKind) -> usize {
        self.shard(kind).read().len()
    }

    pub fn is_empty(&self) -> bool {
        AssetKind::ALL.into_iter().all(|kind| self.len(kind) == 0)
    }

    pub fn image(&self, name: &str) -> Option<Arc<Image>> {
        self.get(&AssetKey::image(name)).and_then(|asset| asset.as_image().cloned())
    }

    pub fn font(&self, name: &str) -> Option<Arc<Font>> {
        self.get(&AssetKey::font(name)).and_then(|asset| asset.as_font().cloned())
    }

    pub fn audio(&self, name: &str) -> Option<Arc<Audio>> {
        self.get(&AssetKey::audio(name)).and_then(|asset| asset.as_audio().cloned())
    }

    pub fn text(&self, name: &str) -> Option<Arc<TextLines>> {
        self.get(&AssetKey::text(name)).and_then(|asset| asset.as_text().cloned())
    }

    pub fn view(&self, name: &str) -> Option<Arc<ViewNode>> {
        self.get(&AssetKey::view(name)).and_then(|asset| asset.as_view().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset;

    fn text(lines: &[&str]) -> Asset {
        Asset::Text(Arc::new(lines.iter().copied().collect()))
    }

    #[test]
    fn get_after_put() {
        let cache = ResourceCache::new();
        let key = AssetKey::text("dictionary.txt");
        assert!(cache.get(&key).is_none());
        cache.put(&key, text(&["apple"]));
        assert!(cache.contains(&key));
        assert_eq!(cache.text("dictionary.txt").unwrap().lines(), ["apple"]);
        assert!(cache.image("dictionary.txt").is_none());
    }

    #[test]
    fn put_retains_first_writer() {
        let cache = ResourceCache::new();
        let key = AssetKey::text("dictionary.txt");
        let first = text(&["first"]);
        let retained = cache.put(&key, first.clone());
        assert!(retained.ptr_eq(&first));

        let retained = cache.put(&key, text(&["second"]));
        assert!(retained.ptr_eq(&first));
        assert!(cache.get(&key).unwrap().ptr_eq(&first));
        assert_eq!(cache.len(AssetKind::Text), 1);
    }

    #[test]
    fn put_if_checks_under_the_lock() {
        let cache = ResourceCache::new();
        let key = AssetKey::text("dictionary.txt");
        assert!(cache.put_if(&key, text(&["late"]), || false).is_none());
        assert!(!cache.contains(&key));

        let stored = cache.put_if(&key, text(&["apple"]), || true).unwrap();
        assert!(cache.get(&key).unwrap().ptr_eq(&stored));
    }

    #[test]
    fn same_name_different_kind_is_distinct() {
        let cache = ResourceCache::new();
        cache.put(&AssetKey::text("splash.json"), text(&["x"]));
        let view = asset::decode(AssetKind::ViewFragment, br#"{"element":"Pane"}"#).unwrap();
        cache.put(&AssetKey::view("splash.json"), view);
        assert!(cache.text("splash.json").is_some());
        assert!(cache.view("splash.json").is_some());
    }

    #[test]
    fn clear_kind_leaves_other_kinds_identical() {
        let cache = ResourceCache::new();
        let words = AssetKey::text("dictionary.txt");
        cache.put(&words, text(&["apple"]));
        let view = AssetKey::view("splash.view");
        cache.put(&view, asset::decode(AssetKind::ViewFragment, br#"{"element":"Pane"}"#).unwrap());

        let before = cache.get(&words).unwrap();
        assert_eq!(cache.clear(AssetKind::ViewFragment), 1);
        assert!(!cache.contains(&view));
        assert!(cache.get(&words).unwrap().ptr_eq(&before));
    }

    #[test]
    fn clear_does_not_invalidate_held_values() {
        let cache = ResourceCache::new();
        let key = AssetKey::text("wordclass.txt");
        cache.put(&key, text(&["noun"]));
        let held = cache.text("wordclass.txt").unwrap();
        assert_eq!(cache.clear_all(), 1);
        assert!(cache.is_empty());
        assert_eq!(held.lines(), ["noun"]);
    }
}
