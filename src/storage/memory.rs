//! In-process storage, used when no database is configured

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::traits::{InferenceRecord, ResultStorage};

#[derive(Default)]
pub struct MemoryStorage {
    records: RwLock<Vec<InferenceRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStorage for MemoryStorage {
    async fn add(&self, record: InferenceRecord) -> Result<InferenceRecord> {
        let mut records = self.records.write();
        if records.iter().any(|r| r.id == record.id) {
            anyhow::bail!("Record {} already exists", record.id);
        }
        records.push(record.clone());
        debug!("Saved record: {}", record.id);
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<InferenceRecord>> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<InferenceRecord>> {
        Ok(self.records.read().clone())
    }

    async fn update(&self, record: &InferenceRecord) -> Result<bool> {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.records.read().len() as i64)
    }
}
