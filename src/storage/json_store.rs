use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde_json::Value;

use super::{CollectionKey, Store};
use crate::errors::storage_context;

/// One pretty-printed JSON file per collection inside a data directory
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        Ok(Self { data_dir })
    }

    pub fn exists(&self, key: CollectionKey) -> bool {
        self.build_path(key).exists()
    }

    fn build_path(&self, key: CollectionKey) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }
}

impl Store for JsonStore {
    fn load(&self, key: CollectionKey) -> Result<Option<Vec<Value>>> {
        let file_path = self.build_path(key);
        if !file_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&file_path).with_context(|| storage_context("read", key.as_str()))?;
        let records = serde_json::from_str(&json).with_context(|| {
            format!(
                "Failed to parse JSON from {:?}. First 200 chars: {}",
                file_path,
                json.chars().take(200).collect::<String>()
            )
        })?;

        info!("Loaded {} from {}", key, file_path.display());
        Ok(Some(records))
    }

    fn save(&mut self, key: CollectionKey, records: &[Value]) -> Result<()> {
        let file_path = self.build_path(key);
        let json = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
        fs::write(&file_path, json).with_context(|| storage_context("write", key.as_str()))?;

        info!("Saved {} {} to {}", records.len(), key, file_path.display());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        fs::remove_dir_all(&self.data_dir).context("Failed to clear data directory")?;
        fs::create_dir_all(&self.data_dir).context("Failed to recreate data directory")?;

        info!("Cleared data directory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pingpong_json_store_{}_{}", name, std::process::id()))
    }

    #[test]
    fn test_save_then_load_collection() {
        let dir = temp_dir("roundtrip");
        let mut store = JsonStore::new(&dir).unwrap();

        assert!(store.load(CollectionKey::Rules).unwrap().is_none());
        store.save(CollectionKey::Rules, &[json!({"id": "rule_1", "value": 11})]).unwrap();
        assert!(store.exists(CollectionKey::Rules));

        let loaded = store.load(CollectionKey::Rules).unwrap().unwrap();
        assert_eq!(loaded[0]["value"], 11);

        store.clear().unwrap();
        assert!(!store.exists(CollectionKey::Rules));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_corrupt_file_reports_path() {
        let dir = temp_dir("corrupt");
        let store = JsonStore::new(&dir).unwrap();
        fs::write(dir.join("players.json"), "{not json").unwrap();

        let err = store.load(CollectionKey::Players).unwrap_err();
        assert!(format!("{err}").contains("players.json"));
        fs::remove_dir_all(&dir).unwrap();
    }
}
