use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use sikap_lib::sikap_summary::SikapRecord;
use tokio::sync::Mutex;

use crate::{DataManagerError, KeyPath, RecordId, SikapStore};

#[derive(Default)]
struct MemoryTree {
    fields: HashMap<KeyPath, String>,
    records: HashMap<KeyPath, Vec<(RecordId, SikapRecord)>>,
}

/// Store that lives only as long as the process.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tree: Arc<Mutex<MemoryTree>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SikapStore for MemoryStore {
    async fn push(&self, parent: &KeyPath, record: &SikapRecord) -> Result<RecordId, DataManagerError> {
        let id = RecordId::generate();
        let mut tree = self.tree.lock().await;
        tree.records
            .entry(parent.clone())
            .or_default()
            .push((id.clone(), record.clone()));
        Ok(id)
    }

    async fn read_field(&self, path: &KeyPath) -> Result<Option<String>, DataManagerError> {
        Ok(self.tree.lock().await.fields.get(path).cloned())
    }

    async fn write_field(&self, path: &KeyPath, value: &str) -> Result<(), DataManagerError> {
        self.tree.lock().await.fields.insert(path.clone(), value.to_string());
        Ok(())
    }

    async fn list(&self, parent: &KeyPath) -> Result<Vec<(RecordId, SikapRecord)>, DataManagerError> {
        Ok(self.tree.lock().await.records.get(parent).cloned().unwrap_or_default())
    }
}
