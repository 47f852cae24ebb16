use async_trait::async_trait;
use sikap_lib::sikap_summary::SikapRecord;

use crate::{DataManagerError, KeyPath, RecordId};

/// A key-path addressed store. Records are pushed under a parent key with an
/// auto-generated id, string fields live at their own path.
#[async_trait]
pub trait SikapStore: Send + Sync {
    async fn push(&self, parent: &KeyPath, record: &SikapRecord) -> Result<RecordId, DataManagerError>;

    async fn read_field(&self, path: &KeyPath) -> Result<Option<String>, DataManagerError>;

    async fn write_field(&self, path: &KeyPath, value: &str) -> Result<(), DataManagerError>;

    /// Records under `parent`, oldest first.
    async fn list(&self, parent: &KeyPath) -> Result<Vec<(RecordId, SikapRecord)>, DataManagerError>;
}
