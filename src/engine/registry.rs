//! Card registry - key lookup and instance index allocation

use ahash::AHashMap;
use std::collections::BTreeMap;

use crate::core::types::{CardHandle, CardKey};

/// Maps registry keys to card handles
///
/// Within a template id every index is used at most once. New cards get the
/// smallest index not currently taken for their id.
#[derive(Debug, Default)]
pub struct CardRegistry {
    /// template id -> index -> handle
    by_id: AHashMap<String, BTreeMap<u32, CardHandle>>,
    keys: AHashMap<CardHandle, CardKey>,
}

impl CardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, handle: CardHandle) -> bool {
        self.keys.contains_key(&handle)
    }

    pub fn key_of(&self, handle: CardHandle) -> Option<&CardKey> {
        self.keys.get(&handle)
    }

    pub fn is_index_free(&self, id: &str, index: u32) -> bool {
        self.by_id
            .get(id)
            .map_or(true, |indices| !indices.contains_key(&index))
    }

    /// Smallest index not in use for `id`
    pub fn allocate_index(&self, id: &str) -> u32 {
        let Some(indices) = self.by_id.get(id) else {
            return 0;
        };
        let mut candidate = 0;
        for &used in indices.keys() {
            if used != candidate {
                break;
            }
            candidate += 1;
        }
        candidate
    }

    /// Returns false if the key or the handle is already registered
    pub fn insert(&mut self, key: CardKey, handle: CardHandle) -> bool {
        if self.contains(handle) || !self.is_index_free(&key.id, key.index) {
            return false;
        }
        self.by_id
            .entry(key.id.clone())
            .or_default()
            .insert(key.index, handle);
        self.keys.insert(handle, key);
        true
    }

    pub fn remove(&mut self, handle: CardHandle) -> Option<CardKey> {
        let key = self.keys.remove(&handle)?;
        if let Some(indices) = self.by_id.get_mut(&key.id) {
            indices.remove(&key.index);
            if indices.is_empty() {
                self.by_id.remove(&key.id);
            }
        }
        Some(key)
    }

    pub fn get(&self, id: &str, index: u32) -> Option<CardHandle> {
        self.by_id.get(id).and_then(|indices| indices.get(&index).copied())
    }

    /// Every card with this template id, by ascending index
    pub fn all_by_id(&self, id: &str) -> Vec<CardHandle> {
        self.by_id
            .get(id)
            .map(|indices| indices.values().copied().collect())
            .unwrap_or_default()
    }

    /// Card with the lowest index for this template id
    pub fn first_by_id(&self, id: &str) -> Option<CardHandle> {
        self.by_id
            .get(id)
            .and_then(|indices| indices.values().next().copied())
    }

    /// Registered handles in ascending order
    pub fn handles(&self) -> Vec<CardHandle> {
        let mut handles: Vec<CardHandle> = self.keys.keys().copied().collect();
        handles.sort();
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_smallest_free() {
        let mut registry = CardRegistry::new();
        assert_eq!(registry.allocate_index("torch"), 0);

        registry.insert(CardKey::new("torch", 0), CardHandle(10));
        registry.insert(CardKey::new("torch", 2), CardHandle(12));
        assert_eq!(registry.allocate_index("torch"), 1);

        registry.insert(CardKey::new("torch", 1), CardHandle(11));
        assert_eq!(registry.allocate_index("torch"), 3);

        // Other ids are independent
        assert_eq!(registry.allocate_index("log"), 0);
    }

    #[test]
    fn test_freed_index_is_reused() {
        let mut registry = CardRegistry::new();
        for i in 0..3 {
            registry.insert(CardKey::new("torch", i), CardHandle(i));
        }
        assert_eq!(registry.remove(CardHandle(1)), Some(CardKey::new("torch", 1)));
        assert_eq!(registry.allocate_index("torch"), 1);
        assert!(registry.get("torch", 1).is_none());
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut registry = CardRegistry::new();
        assert!(registry.insert(CardKey::new("torch", 0), CardHandle(0)));
        assert!(!registry.insert(CardKey::new("torch", 0), CardHandle(1)));
        assert!(!registry.insert(CardKey::new("torch", 1), CardHandle(0)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookups() {
        let mut registry = CardRegistry::new();
        registry.insert(CardKey::new("log", 1), CardHandle(5));
        registry.insert(CardKey::new("log", 0), CardHandle(9));
        registry.insert(CardKey::new("torch", 0), CardHandle(2));

        assert_eq!(registry.get("log", 1), Some(CardHandle(5)));
        assert_eq!(registry.all_by_id("log"), vec![CardHandle(9), CardHandle(5)]);
        assert_eq!(registry.first_by_id("log"), Some(CardHandle(9)));
        assert!(registry.first_by_id("stone").is_none());
        assert_eq!(
            registry.handles(),
            vec![CardHandle(2), CardHandle(5), CardHandle(9)]
        );
        assert_eq!(registry.key_of(CardHandle(2)), Some(&CardKey::new("torch", 0)));
    }
}
