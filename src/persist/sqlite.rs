//! SQLite-backed append-only transition journal.

use std::{path::Path, sync::Arc};

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    config::StoreConfig,
    transition::{TRANSITION_FORMAT_VERSION, Transition, TransitionEnvelope},
    types::Seq,
};

use super::{PersistError, PersistResult, StateSink};

/// SQLite implementation of [`crate::persist::StateSink`].
///
/// One journal file belongs to one store; sequences are the primary key.
pub struct SqliteStateSink {
    conn: Connection,
}

impl SqliteStateSink {
    /// Opens the journal file at `path`, creating the table on first use.
    ///
    /// The connection runs in WAL mode with `synchronous=NORMAL`, so a commit
    /// survives a process crash but may be lost on power failure.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Journal that lives only as long as the returned sink.
    pub fn open_in_memory() -> PersistResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> PersistResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    /// Appends one transition row.
    pub fn append<T: Serialize>(&mut self, transition: &Transition<T>) -> PersistResult<()> {
        let envelope = TransitionEnvelope::new(Transition {
            seq: transition.seq,
            ts_ms: transition.ts_ms,
            label: transition.label.clone(),
            kind: transition.kind,
            state: Arc::clone(&transition.state),
        });
        let payload = serde_json::to_vec(&envelope)?;
        let seq = i64::try_from(transition.seq).map_err(|_| {
            PersistError::Message(format!("transition seq {} exceeds journal range", transition.seq))
        })?;
        self.conn.execute(
            "INSERT INTO transitions(seq, ts_ms, kind, label, payload) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                seq,
                sql_int(transition.ts_ms),
                transition.kind.code(),
                transition.label.as_deref(),
                payload,
            ],
        )?;
        Ok(())
    }

    /// Loads transitions strictly after `seq`, oldest first.
    pub fn load_after<T: DeserializeOwned>(&self, seq: Seq) -> PersistResult<Vec<Transition<T>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM transitions WHERE seq > ?1 ORDER BY seq ASC")?;
        let payloads = stmt
            .query_map(params![sql_int(seq)], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|payload| decode_transition_payload(payload).map_err(PersistError::Message))
            .collect()
    }

    /// Loads the newest transition, if any.
    pub fn load_latest<T: DeserializeOwned>(&self) -> PersistResult<Option<Transition<T>>> {
        let payload: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT payload FROM transitions ORDER BY seq DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        decode_transition_payload(&payload)
            .map(Some)
            .map_err(PersistError::Message)
    }

    /// Returns the latest sequence in the journal, or `0` when empty.
    pub fn latest_seq(&self) -> PersistResult<Seq> {
        let seq: Option<i64> = self
            .conn
            .query_row("SELECT MAX(seq) FROM transitions", [], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .optional()?
            .flatten();
        Ok(seq.unwrap_or(0) as Seq)
    }

    /// Deletes transitions up to and including `seq`. The newest row is always kept.
    pub fn compact_through(&mut self, seq: Seq) -> PersistResult<usize> {
        let count = self.conn.execute(
            "DELETE FROM transitions WHERE seq <= ?1 AND seq < (SELECT MAX(seq) FROM transitions)",
            params![sql_int(seq)],
        )?;
        debug!(through = seq, removed = count, "compacted transition journal");
        Ok(count)
    }

    /// Builds a store config that resumes from the newest journaled state.
    ///
    /// Falls back to `fallback` at sequence `0` when the journal is empty.
    /// The sink is attached to the returned config.
    pub fn resume<T>(self, fallback: T) -> PersistResult<StoreConfig<T>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let config = match self.load_latest::<T>()? {
            Some(last) => {
                let seq = last.seq;
                let state = Arc::try_unwrap(last.state).unwrap_or_else(|shared| (*shared).clone());
                debug!(seq, "resuming store from journal");
                StoreConfig::new(state).with_initial_seq(seq)
            }
            None => StoreConfig::new(fallback),
        };
        Ok(config.with_sink(self))
    }
}

impl<T: Serialize> StateSink<T> for SqliteStateSink {
    fn record(&mut self, transition: &Transition<T>) -> PersistResult<()> {
        self.append(transition)
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }
}

/// Journal columns are `INTEGER`; values past `i64::MAX` saturate.
fn sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn decode_transition_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<Transition<T>, String> {
    let envelope: TransitionEnvelope<T> = serde_json::from_slice(payload)
        .map_err(|e| format!("transition payload decode failed: {e}"))?;
    if envelope.format_version != TRANSITION_FORMAT_VERSION {
        return Err(format!(
            "unsupported transition format version: {}",
            envelope.format_version
        ));
    }
    Ok(envelope.transition)
}
