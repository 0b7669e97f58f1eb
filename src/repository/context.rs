//! Database context for managing the connection pool and repository access.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;

use super::job::JobRepository;
use super::loader::HierarchicalLoader;
use super::pool::{DbError, DbPool};
use super::snapshot::SnapshotRepository;

/// Entry point for database operations. Create one per command, then use it
/// to reach each repository.
#[derive(Clone)]
pub struct DbContext {
    pool: DbPool,
}

impl DbContext {
    /// Create a context from a database URL like `sqlite:path/to/db` or a
    /// plain file path.
    pub fn new(database_url: &str) -> Self {
        Self {
            pool: DbPool::new(database_url),
        }
    }

    pub fn from_path(db_path: &Path) -> Self {
        Self {
            pool: DbPool::from_path(db_path),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn snapshots(&self) -> SnapshotRepository {
        SnapshotRepository::new(self.pool.clone())
    }

    pub fn jobs(&self) -> JobRepository {
        JobRepository::new(self.pool.clone())
    }

    pub fn loader(&self) -> HierarchicalLoader {
        HierarchicalLoader::new(self.pool.clone())
    }

    /// Create every table and index that does not exist yet.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;

        conn.batch_execute(
            r#"
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                website TEXT
            );

            CREATE TABLE IF NOT EXISTS services (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                website TEXT,
                UNIQUE(company_id, name),
                FOREIGN KEY (company_id) REFERENCES companies(id) ON DELETE RESTRICT
            );

            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                service_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                module TEXT NOT NULL,
                UNIQUE(service_id, name),
                FOREIGN KEY (service_id) REFERENCES services(id) ON DELETE RESTRICT
            );

            CREATE TABLE IF NOT EXISTS languages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                code_iso_639_1 TEXT NOT NULL UNIQUE CHECK (length(code_iso_639_1) = 2)
            );

            CREATE TABLE IF NOT EXISTS document_instances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL,
                language_id INTEGER NOT NULL,
                url TEXT NOT NULL,
                is_enabled INTEGER NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL,
                UNIQUE(document_id, language_id),
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE RESTRICT,
                FOREIGN KEY (language_id) REFERENCES languages(id) ON DELETE RESTRICT
            );

            CREATE INDEX IF NOT EXISTS idx_document_instances_enabled
                ON document_instances(is_enabled);

            CREATE TABLE IF NOT EXISTS snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_instance_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                datetime TEXT NOT NULL,
                text TEXT,
                UNIQUE(document_instance_id, datetime),
                FOREIGN KEY (document_instance_id) REFERENCES document_instances(id) ON DELETE RESTRICT
            );

            CREATE INDEX IF NOT EXISTS idx_snapshots_datetime ON snapshots(datetime);
            CREATE INDEX IF NOT EXISTS idx_snapshots_date_time ON snapshots(date, time);

            CREATE TABLE IF NOT EXISTS transforms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL,
                module TEXT NOT NULL,
                execution_priority INTEGER NOT NULL DEFAULT 0,
                UNIQUE(document_id, module),
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE RESTRICT
            );
            "#,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_schema_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::from_path(&dir.path().join("schema.db"));

        ctx.init_schema().await.unwrap();
        ctx.init_schema().await.unwrap();

        assert!(ctx.jobs().enabled_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_new_accepts_sqlite_url() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("url.db").display());
        let ctx = DbContext::new(&url);

        ctx.init_schema().await.unwrap();
        assert!(dir.path().join("url.db").exists());
    }
}
