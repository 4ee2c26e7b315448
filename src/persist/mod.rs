pub mod sqlite;

use thiserror::Error;

use crate::transition::Transition;

/// Journaling failures.
#[derive(Debug, Error)]
pub enum PersistError {
    /// SQLite driver error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Payload encode/decode error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Anything else.
    #[error("{0}")]
    Message(String),
}

/// Result alias for journaling operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Receives every committed transition before it becomes visible.
///
/// A failing `record` aborts the transition: the store keeps its previous
/// state and emits no event.
pub trait StateSink<T>: Send {
    /// Journals one transition.
    fn record(&mut self, transition: &Transition<T>) -> PersistResult<()>;

    /// Forces buffered writes to durable storage.
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }
}
