use std::{path::Path, sync::Arc};

use sikap_lib::{
    sikap_summary::{SikapRecord, SikapSummary},
    user::UserProfile,
};

use crate::{database::db::SikapDatabase, DataManagerError, KeyPath, MemoryStore, RecordId, SikapStore};

const NAME_FIELD: &str = "name";

#[derive(Clone)]
pub struct DataManager {
    store: Arc<dyn SikapStore>,
}

/// The public interface for all sikap data management.
impl DataManager {
    pub async fn start(database_path: &Path) -> Result<Self, DataManagerError> {
        // Create data dir if it doesn't exist
        if let Some(data_dir) = database_path.parent() {
            if !data_dir.as_os_str().is_empty() && !data_dir.exists() {
                std::fs::create_dir_all(data_dir)
                    .map_err(|_| DataManagerError::Database(format!("Failed to create data directory: {:?}", data_dir)))?;
            }
        }

        let database = SikapDatabase::connect(database_path).await?;
        Ok(Self::with_store(Arc::new(database)))
    }

    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn SikapStore>) -> Self {
        Self { store }
    }

    /// Writes `{date, distance}` under the summary's user with a fresh record id.
    pub async fn save_sikap(&self, summary: &SikapSummary) -> Result<RecordId, DataManagerError> {
        let parent = KeyPath::user(summary.user())?;
        let id = self.store.push(&parent, &summary.record()).await?;
        tracing::info!("Saved sikap {} for {}", id, summary.user());
        Ok(id)
    }

    pub async fn display_name(&self, username: &str) -> Result<Option<String>, DataManagerError> {
        let path = KeyPath::user(username)?.child(NAME_FIELD)?;
        self.store.read_field(&path).await
    }

    pub async fn set_display_name(&self, username: &str, name: &str) -> Result<(), DataManagerError> {
        let path = KeyPath::user(username)?.child(NAME_FIELD)?;
        self.store.write_field(&path, name).await
    }

    pub async fn profile(&self, username: &str) -> Result<UserProfile, DataManagerError> {
        let name = self.display_name(username).await?;
        Ok(UserProfile::new(username, name))
    }

    pub async fn sikap_history(&self, username: &str) -> Result<Vec<(RecordId, SikapRecord)>, DataManagerError> {
        self.store.list(&KeyPath::user(username)?).await
    }
}
