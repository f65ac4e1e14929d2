use std::collections::HashMap;

use anyhow::Result;
use serde_json::Value;

use super::{CollectionKey, Store};

/// Non-persistent store used by tests and `--store memory`
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    collections: HashMap<CollectionKey, Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn load(&self, key: CollectionKey) -> Result<Option<Vec<Value>>> {
        Ok(self.collections.get(&key).cloned())
    }

    fn save(&mut self, key: CollectionKey, records: &[Value]) -> Result<()> {
        self.collections.insert(key, records.to_vec());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.collections.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unsaved_collection_loads_as_none() {
        let mut store = MemoryStore::new();
        assert!(store.load(CollectionKey::Players).unwrap().is_none());
        store.save(CollectionKey::Players, &[json!({"id": "p1"})]).unwrap();
        assert_eq!(store.load(CollectionKey::Players).unwrap().unwrap().len(), 1);
    }
}
