use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::record_context;

/// Conversion between entities and plain JSON records
pub trait Record: Sized {
    fn to_record(&self) -> serde_json::Result<Value>;
    fn from_record(record: Value) -> serde_json::Result<Self>;
}

impl<T: Serialize + DeserializeOwned> Record for T {
    fn to_record(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    fn from_record(record: Value) -> serde_json::Result<Self> {
        serde_json::from_value(record)
    }
}

pub fn to_records<T: Record>(items: &[T], entity: &str) -> Result<Vec<Value>> {
    items
        .iter()
        .map(|item| item.to_record().with_context(|| record_context(entity)))
        .collect()
}

pub fn from_records<T: Record>(records: Vec<Value>, entity: &str) -> Result<Vec<T>> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            T::from_record(record).with_context(|| format!("{} #{}", record_context(entity), index + 1))
        })
        .collect()
}
