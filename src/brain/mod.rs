//! Reference knowledge base: ASME Y14.5 characteristics, process capability
//! and material data in SQLite.

pub mod lookup;
pub mod manufacturing;
pub mod sqlite;

pub use lookup::*;
pub use manufacturing::*;
pub use sqlite::*;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;

use crate::pipeline::CollaboratorError;

/// Connection shared by the lookup services. Queries run on the blocking pool.
pub type SharedConnection = Arc<Mutex<Connection>>;

#[derive(Error, Debug)]
pub enum BrainError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Invalid JSON column {column}: {reason}")]
    InvalidJson { column: String, reason: String },

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Database task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BrainError> for CollaboratorError {
    fn from(e: BrainError) -> Self {
        CollaboratorError::Backend(e.to_string())
    }
}

pub fn shared(conn: Connection) -> SharedConnection {
    Arc::new(Mutex::new(conn))
}

/// Run `f` against the shared connection on the blocking thread pool.
pub(crate) async fn with_connection<T, F>(conn: &SharedConnection, f: F) -> Result<T, BrainError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, BrainError> + Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let guard = conn.lock().map_err(|_| BrainError::LockPoisoned)?;
        f(&guard)
    })
    .await
    .map_err(|e| BrainError::Task(e.to_string()))?
}
