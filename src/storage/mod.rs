pub mod json_store;
pub mod memory;
pub mod sqlite_store;

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde_json::Value;

use crate::config::{StorageBackend, StorageSettings};

pub use json_store::JsonStore;
pub use memory::MemoryStore;
pub use sqlite_store::SqliteStore;

/// Named collections the club persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKey {
    Players,
    Doubles,
    Teams,
    Tournaments,
    Matches,
    Rules,
}

impl CollectionKey {
    pub const ALL: [CollectionKey; 6] = [
        CollectionKey::Players,
        CollectionKey::Doubles,
        CollectionKey::Teams,
        CollectionKey::Tournaments,
        CollectionKey::Matches,
        CollectionKey::Rules,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKey::Players => "players",
            CollectionKey::Doubles => "doubles",
            CollectionKey::Teams => "teams",
            CollectionKey::Tournaments => "tournaments",
            CollectionKey::Matches => "matches",
            CollectionKey::Rules => "rules",
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKey {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match CollectionKey::ALL.into_iter().find(|key| key.as_str() == value) {
            Some(key) => Ok(key),
            None => bail!("Unknown collection: {}", value),
        }
    }
}

/// Persistence port: whole collections of plain records by key
pub trait Store {
    /// Records of a collection, or `None` when it was never saved
    fn load(&self, key: CollectionKey) -> Result<Option<Vec<Value>>>;

    fn save(&mut self, key: CollectionKey, records: &[Value]) -> Result<()>;

    fn clear(&mut self) -> Result<()>;
}

pub fn open_store(settings: &StorageSettings) -> Result<Box<dyn Store>> {
    let store: Box<dyn Store> = match settings.backend {
        StorageBackend::Json => Box::new(JsonStore::new(&settings.path)?),
        StorageBackend::Sqlite => Box::new(SqliteStore::open(&settings.path.join("club.db"))?),
        StorageBackend::Memory => Box::new(MemoryStore::new()),
    };
    Ok(store)
}
