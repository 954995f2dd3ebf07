use std::collections::HashMap;
use std::hash::Hash;

/// Key-value persistence used by the stores.
///
/// Implementations are plain data structures; callers provide synchronisation.
pub trait Storage<K, V>: Send {
    fn get(&self, key: &K) -> Option<V>;
    fn set(&mut self, key: K, value: V);
    fn delete(&mut self, key: &K) -> Option<V>;
    /// All values, in the order their keys were first inserted
    fn list(&self) -> Vec<V>;

    fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

/// Process-memory storage. Contents are lost on restart.
#[derive(Clone, Debug)]
pub struct MemoryStorage<K, V> {
    entries: HashMap<K, V>,
    order: Vec<K>,
}

impl<K, V> MemoryStorage<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<K, V> Default for MemoryStorage<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Storage<K, V> for MemoryStorage<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: K, value: V) {
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key, value);
    }

    fn delete(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    fn list(&self) -> Vec<V> {
        self.order
            .iter()
            .filter_map(|k| self.entries.get(k).cloned())
            .collect()
    }

    fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_keeps_insertion_order() {
        let mut storage = MemoryStorage::new();
        storage.set("b", 2);
        storage.set("a", 1);
        storage.set("c", 3);
        // Overwriting does not move the key
        storage.set("b", 20);

        assert_eq!(storage.list(), vec![20, 1, 3]);
    }

    #[test]
    fn delete_reports_whether_key_existed() {
        let mut storage = MemoryStorage::new();
        storage.set("a", 1);

        assert_eq!(storage.delete(&"a"), Some(1));
        assert_eq!(storage.delete(&"a"), None);
        assert!(!storage.contains(&"a"));
        assert!(storage.list().is_empty());
    }
}
