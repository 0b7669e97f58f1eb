//! SQLite connection pool.
//!
//! Connections are opened on demand through diesel-async's
//! `SyncConnectionWrapper`, so every repository gets an async interface on top
//! of the synchronous SQLite driver.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};

use super::util::to_diesel_error;

/// Diesel error type alias.
pub type DbError = diesel::result::Error;

/// Async SQLite connection type.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// Per-connection settings. SQLite keeps foreign key enforcement off unless
/// each connection asks for it.
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 30000;";

/// SQLite connection pool (lightweight - creates connections on demand).
#[derive(Clone, Debug)]
pub struct DbPool {
    database_url: String,
}

impl DbPool {
    /// Create a new pool. A leading `sqlite:` or `sqlite://` is stripped.
    pub fn new(database_url: &str) -> Self {
        let url = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    /// Create pool from a file path.
    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.display().to_string())
    }

    /// Get a connection with foreign keys enforced.
    pub async fn get(&self) -> Result<SqliteConn, DbError> {
        let mut conn = SqliteConn::establish(&self.database_url)
            .await
            .map_err(to_diesel_error)?;
        conn.batch_execute(CONNECTION_PRAGMAS).await?;
        Ok(conn)
    }

    /// Get the database path handed to SQLite.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_stripping() {
        assert_eq!(DbPool::new("/path/to/db.sqlite").database_url(), "/path/to/db.sqlite");
        assert_eq!(DbPool::new("sqlite:/path/to/db").database_url(), "/path/to/db");
        assert_eq!(DbPool::new("sqlite://data/db").database_url(), "data/db");
    }

    #[tokio::test]
    async fn test_connections_enforce_foreign_keys() {
        use diesel::sql_types::Integer;
        use diesel_async::RunQueryDsl;

        #[derive(diesel::QueryableByName)]
        struct Pragma {
            #[diesel(sql_type = Integer)]
            foreign_keys: i32,
        }

        let dir = tempfile::tempdir().unwrap();
        let pool = DbPool::from_path(&dir.path().join("pool.db"));
        let mut conn = pool.get().await.unwrap();

        let row: Pragma = diesel::sql_query("PRAGMA foreign_keys")
            .get_result(&mut conn)
            .await
            .unwrap();
        assert_eq!(row.foreign_keys, 1);
    }
}
