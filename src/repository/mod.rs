//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking on
//! top of SQLite.

pub mod context;
pub mod job;
pub mod loader;
pub mod models;
pub mod pool;
pub mod snapshot;
pub mod util;

pub use context::DbContext;
pub use job::JobRepository;
pub use loader::{HierarchicalLoader, LoadError, LoadReport};
pub use pool::{DbError, DbPool, SqliteConn};
pub use snapshot::SnapshotRepository;

use diesel_async::RunQueryDsl;

use models::LastInsertRowId;
use util::to_diesel_error;

/// Id of the row most recently inserted on this connection.
pub(crate) async fn last_insert_id(conn: &mut SqliteConn) -> Result<i32, DbError> {
    let row = diesel::sql_query("SELECT last_insert_rowid()")
        .get_result::<LastInsertRowId>(conn)
        .await?;
    i32::try_from(row.id).map_err(to_diesel_error)
}
