use std::{path::Path, str::FromStr};

use async_trait::async_trait;
use chrono::Utc;
use const_format::concatcp;
use sikap_lib::sikap_summary::SikapRecord;
use sqlx::{
    query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, FromRow, Pool, Sqlite,
};

use crate::{DataManagerError, KeyPath, RecordId, SikapStore};

use super::constants::*;

#[derive(FromRow)]
struct StoredSikap {
    record_id: String,
    #[sqlx(flatten)]
    record: SikapRecord,
}

#[derive(Clone)]
pub struct SikapDatabase {
    pool: Pool<Sqlite>,
}

impl SikapDatabase {
    pub async fn connect(path: &Path) -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options).await
            .map_err(|e| DataManagerError::Database(format!("Failed to connect to database {path:?}: {e}")))?;

        let db = Self { pool };
        db.init().await?;

        tracing::debug!("Connected to database {:?}", path);
        Ok(db)
    }

    /// A private database that disappears with the pool.
    pub async fn connect_in_memory() -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DataManagerError::Database(format!("Invalid connection string: {e}")))?;

        // Every connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options).await
            .map_err(|e| DataManagerError::Database(format!("Failed to open in-memory database: {e}")))?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    pub async fn init(&self) -> Result<(), DataManagerError> {
        self.pool.execute(concatcp!("
            CREATE TABLE IF NOT EXISTS ", FIELDS_TABLE_NAME, "(",
                PATH,  " TEXT PRIMARY KEY,",
                VALUE, " TEXT NOT NULL);

            CREATE TABLE IF NOT EXISTS ", SIKAPS_TABLE_NAME, "(",
                RECORD_ID,  " TEXT PRIMARY KEY,",
                PARENT,     " TEXT NOT NULL,",
                DATE,       " TEXT NOT NULL,",
                DISTANCE,   " TEXT NOT NULL,",
                CREATED_AT, " TIMESTAMP NOT NULL);

            CREATE INDEX IF NOT EXISTS idx_sikaps_parent ON ", SIKAPS_TABLE_NAME, "(", PARENT, ");
            ")).await
            .map_err(|e| DataManagerError::Database(format!("Failed to create tables: {e}")))
            .map(|_| ())
    }
}

#[async_trait]
impl SikapStore for SikapDatabase {
    async fn push(&self, parent: &KeyPath, record: &SikapRecord) -> Result<RecordId, DataManagerError> {
        let record_id = RecordId::generate();

        query(concatcp!("
            INSERT INTO ", SIKAPS_TABLE_NAME, "(",
            RECORD_ID, ", ", PARENT, ", ", DATE, ", ", DISTANCE, ", ", CREATED_AT, ")
            VALUES (?1, ?2, ?3, ?4, ?5)"))
                .bind(record_id.as_str())
                .bind(parent.as_str())
                .bind(&record.date)
                .bind(&record.distance)
                .bind(Utc::now())
                .execute(&self.pool).await
                .map_err(|e| DataManagerError::Database(format!("Failed to insert sikap under {parent}: {e}")))?;

        Ok(record_id)
    }

    async fn read_field(&self, path: &KeyPath) -> Result<Option<String>, DataManagerError> {
        query_as::<_, (String,)>(concatcp!("SELECT ", VALUE, " FROM ", FIELDS_TABLE_NAME, " WHERE ", PATH, " = ?1"))
            .bind(path.as_str())
            .fetch_optional(&self.pool).await
            .map_err(|e| DataManagerError::Database(format!("Failed to read {path}: {e}")))
            .map(|row| row.map(|row| row.0))
    }

    async fn write_field(&self, path: &KeyPath, value: &str) -> Result<(), DataManagerError> {
        query(concatcp!("
            INSERT INTO ", FIELDS_TABLE_NAME, "(", PATH, ", ", VALUE, ") VALUES (?1, ?2)
            ON CONFLICT(", PATH, ") DO UPDATE SET ", VALUE, " = excluded.", VALUE))
                .bind(path.as_str())
                .bind(value)
                .execute(&self.pool).await
                .map_err(|e| DataManagerError::Database(format!("Failed to write {path}: {e}")))
                .map(|_| ())
    }

    async fn list(&self, parent: &KeyPath) -> Result<Vec<(RecordId, SikapRecord)>, DataManagerError> {
        query_as::<_, StoredSikap>(concatcp!("
            SELECT ", RECORD_ID, ", ", DATE, ", ", DISTANCE, " FROM ", SIKAPS_TABLE_NAME, "
            WHERE ", PARENT, " = ?1 ORDER BY rowid"))
                .bind(parent.as_str())
                .fetch_all(&self.pool).await
                .map_err(|e| DataManagerError::Database(format!("Failed to list sikaps under {parent}: {e}")))
                .map(|rows| rows.into_iter()
                    .map(|row| (RecordId::from_stored(row.record_id), row.record))
                    .collect()
                )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(distance: &str) -> SikapRecord {
        SikapRecord {
            date: "May 27, 2019".into(),
            distance: distance.into(),
        }
    }

    #[tokio::test]
    async fn push_and_list_in_memory() {
        let db = SikapDatabase::connect_in_memory().await.unwrap();
        let michael = KeyPath::user("michael").unwrap();
        let other = KeyPath::user("other").unwrap();

        let first = db.push(&michael, &record("1.00 mi")).await.unwrap();
        let second = db.push(&michael, &record("0.50 mi")).await.unwrap();
        db.push(&other, &record("9.00 mi")).await.unwrap();

        let listed = db.list(&michael).await.unwrap();
        assert_eq!(listed, vec![(first, record("1.00 mi")), (second, record("0.50 mi"))]);
    }

    #[tokio::test]
    async fn fields_upsert() {
        let db = SikapDatabase::connect_in_memory().await.unwrap();
        let path = KeyPath::parse("michael/name").unwrap();

        assert_eq!(db.read_field(&path).await.unwrap(), None);
        db.write_field(&path, "Mike").await.unwrap();
        db.write_field(&path, "Michael").await.unwrap();
        assert_eq!(db.read_field(&path).await.unwrap().as_deref(), Some("Michael"));
    }

    #[tokio::test]
    async fn file_database_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sikap.db");
        let michael = KeyPath::user("michael").unwrap();

        {
            let db = SikapDatabase::connect(&path).await.unwrap();
            db.push(&michael, &record("3.10 mi")).await.unwrap();
        }

        let db = SikapDatabase::connect(&path).await.unwrap();
        let listed = db.list(&michael).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].1, record("3.10 mi"));
    }
}
