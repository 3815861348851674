//! # LedgerStore: Persistent Storage Engine
//!
//! Persists ledger snapshots on top of sled's embedded key-value store so a
//! node survives restarts with every balance and approval intact.
//!
//! ## Tree Layout
//!
//! | Tree        | Key                  | Value                          |
//! |-------------|----------------------|--------------------------------|
//! | `contracts` | contract name (UTF-8)| `bincode(snapshot)`            |
//! | `metadata`  | key (UTF-8)          | value (bytes)                  |
//! | `events`    | sequence (u64, BE)   | `bincode(event)`               |
//!
//! The event log is append-only and lives outside the snapshot, so the
//! snapshot stays the size of the ledger state however many calls it has
//! seen. A snapshot and the events it emitted are written in one sled
//! transaction.
//!
//! The store is deliberately ignorant of the contract type: it writes any
//! `Serialize` snapshot and reads back any `DeserializeOwned` one. The
//! snapshot format version is recorded next to each snapshot so a node
//! refuses to load state written by an incompatible build.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionResult, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;

use crate::config::SNAPSHOT_FORMAT_VERSION;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("snapshot format mismatch for {name}: stored v{stored}, supported v{supported}")]
    FormatMismatch {
        name: String,
        stored: u32,
        supported: u32,
    },
}

pub type DbResult<T> = Result<T, DbError>;

/// Metadata key prefix for per-snapshot format versions.
const META_FORMAT_PREFIX: &str = "format:";

/// Metadata key under which the node records its network name.
pub const META_NETWORK: &str = "network";

// ---------------------------------------------------------------------------
// LedgerStore
// ---------------------------------------------------------------------------

/// sled-backed snapshot store.
///
/// sled trees are internally synchronized, so a `LedgerStore` can be shared
/// through an `Arc` without an extra lock. Callers that need snapshots to
/// reflect a serialized sequence of mutations (the node does) must write
/// while still holding their own state lock.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    db: Db,
    contracts: Tree,
    metadata: Tree,
    events: Tree,
}

impl LedgerStore {
    /// Opens or creates a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Creates a throwaway store that is deleted on drop. For tests.
    pub fn open_temporary() -> DbResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let contracts = db.open_tree("contracts")?;
        let metadata = db.open_tree("metadata")?;
        let events = db.open_tree("events")?;
        Ok(Self {
            db,
            contracts,
            metadata,
            events,
        })
    }

    // -- Snapshots ----------------------------------------------------------

    /// Writes `snapshot` under `name`, replacing any previous snapshot, and
    /// flushes to disk before returning.
    pub fn put_snapshot<T: Serialize>(&self, name: &str, snapshot: &T) -> DbResult<()> {
        self.put_snapshot_with_events::<T, ()>(name, snapshot, 0, &[])
    }

    /// Writes `snapshot` under `name` and appends `events` to the event log
    /// starting at sequence number `first_seq`, atomically, then flushes.
    ///
    /// Either everything lands or nothing does.
    pub fn put_snapshot_with_events<T: Serialize, E: Serialize>(
        &self,
        name: &str,
        snapshot: &T,
        first_seq: u64,
        events: &[E],
    ) -> DbResult<()> {
        let bytes = encode(snapshot)?;
        let format_key = format!("{}{}", META_FORMAT_PREFIX, name);
        let encoded = events
            .iter()
            .enumerate()
            .map(|(offset, event)| -> DbResult<([u8; 8], Vec<u8>)> {
                Ok(((first_seq + offset as u64).to_be_bytes(), encode(event)?))
            })
            .collect::<DbResult<Vec<_>>>()?;

        (&self.contracts, &self.metadata, &self.events)
            .transaction(
                |(contracts, metadata, log)| -> ConflictableTransactionResult<(), DbError> {
                    contracts.insert(name.as_bytes(), bytes.as_slice())?;
                    metadata.insert(
                        format_key.as_bytes(),
                        &SNAPSHOT_FORMAT_VERSION.to_be_bytes()[..],
                    )?;
                    for (seq, event) in &encoded {
                        log.insert(&seq[..], event.as_slice())?;
                    }
                    Ok(())
                },
            )
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => DbError::Sled(e),
            })?;
        self.db.flush()?;
        Ok(())
    }

    /// Reads the snapshot stored under `name`.
    ///
    /// Returns `None` if nothing was ever stored there, and
    /// [`DbError::FormatMismatch`] if it was written by a build with a
    /// different snapshot format.
    pub fn get_snapshot<T: DeserializeOwned>(&self, name: &str) -> DbResult<Option<T>> {
        let bytes = match self.contracts.get(name.as_bytes())? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let stored = self.snapshot_format(name)?.unwrap_or(0);
        if stored != SNAPSHOT_FORMAT_VERSION {
            return Err(DbError::FormatMismatch {
                name: name.to_string(),
                stored,
                supported: SNAPSHOT_FORMAT_VERSION,
            });
        }

        let snapshot =
            bincode::deserialize(&bytes).map_err(|e| DbError::Serialization(e.to_string()))?;
        Ok(Some(snapshot))
    }

    /// Returns `true` if a snapshot exists under `name`.
    pub fn has_snapshot(&self, name: &str) -> DbResult<bool> {
        Ok(self.contracts.contains_key(name.as_bytes())?)
    }

    /// Returns the number of stored snapshots.
    pub fn snapshot_count(&self) -> usize {
        self.contracts.len()
    }

    fn snapshot_format(&self, name: &str) -> DbResult<Option<u32>> {
        let key = format!("{}{}", META_FORMAT_PREFIX, name);
        match self.metadata.get(key.as_bytes())? {
            Some(bytes) => {
                let raw: [u8; 4] = bytes
                    .as_ref()
                    .try_into()
                    .map_err(|_| DbError::Serialization("invalid format bytes".to_string()))?;
                Ok(Some(u32::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    // -- Event log ----------------------------------------------------------

    /// Reads up to `limit` logged events starting at sequence `from`.
    pub fn events_from<E: DeserializeOwned>(&self, from: u64, limit: usize) -> DbResult<Vec<E>> {
        self.events
            .range(from.to_be_bytes()..)
            .take(limit)
            .map(|entry| -> DbResult<E> {
                let (_, bytes) = entry?;
                bincode::deserialize(&bytes).map_err(|e| DbError::Serialization(e.to_string()))
            })
            .collect()
    }

    /// Number of logged events.
    pub fn event_count(&self) -> u64 {
        self.events.len() as u64
    }

    // -- Metadata -----------------------------------------------------------

    /// Stores a UTF-8 metadata value.
    pub fn put_meta(&self, key: &str, value: &str) -> DbResult<()> {
        self.metadata.insert(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    /// Reads a UTF-8 metadata value.
    pub fn get_meta(&self, key: &str) -> DbResult<Option<String>> {
        match self.metadata.get(key.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| DbError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}
