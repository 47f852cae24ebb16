use std::path::PathBuf;

use const_format::concatcp;

pub mod database;
pub mod gpx_util;
mod data_manager;
mod key_path;
mod memory_store;
mod store;

pub use data_manager::*;
pub use key_path::{KeyPath, RecordId};
pub use memory_store::MemoryStore;
pub use store::SikapStore;

pub const DATA_DIR: &str = "data/";
pub const DATABASE_PATH: &str = concatcp!(DATA_DIR, "sikap.db");

#[derive(Debug, thiserror::Error)]
pub enum DataManagerError {
    #[error("database error: {0}")]
    Database(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("gpx error: {0}")]
    Gpx(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// `data/sikap.db` under the project root.
pub fn default_database_path() -> Result<PathBuf, DataManagerError> {
    let root = project_root::get_project_root()
        .map_err(|e| DataManagerError::NotFound(format!("Failed to find project root: {e}")))?;
    Ok(root.join(DATABASE_PATH))
}
