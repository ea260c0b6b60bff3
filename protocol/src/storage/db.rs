//! # LedgerDb — Persistent Storage Engine
//!
//! The persistence layer behind the registries, built on sled's embedded
//! key-value store. Everything that survives a restart goes through here.
//!
//! ## Tree Layout
//!
//! | Tree          | Key                              | Value                   |
//! |---------------|----------------------------------|-------------------------|
//! | `events`      | `sequence` (8B BE)               | `bincode(LedgerEvent)`  |
//! | `issuers`     | `address` (20B)                  | `bincode(Issuer)`       |
//! | `dids`        | `did` (UTF-8)                    | `bincode(DidRecord)`    |
//! | `credentials` | `hash` (32B)                     | `bincode(Credential)`   |
//! | `proofs`      | `credential hash ‖ sequence`     | `bincode(ProofRecord)`  |
//! | `metadata`    | key (UTF-8)                      | value (bytes)           |
//!
//! The event log is the source of truth; the other tables are materialized
//! rows kept for direct inspection. Sequence numbers are big-endian so
//! sled's lexicographic order is numeric order and a prefix scan over
//! `proofs` returns one credential's audit trail in append order.
//!
//! ## Atomicity
//!
//! [`LedgerDb::append`] writes the event, its materialized row and the
//! sequence watermark in one multi-tree transaction. Either all three land
//! or none do. The transaction is flushed to disk before `append` returns,
//! so an appended event survives a crash.
//!
//! This layer deals in bytes and `serde` types; it has no idea what an
//! issuer is. The record types live in `attest-contracts`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use sled::{Db, Tree};
use std::path::Path;
use tracing::{debug, info};

use crate::config::LEDGER_SCHEMA_VERSION;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("ledger schema version {found} is not supported (expected {expected})")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("corrupt entry in {0}")]
    Corrupt(&'static str),
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Materialized tables. Each maps onto one sled tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Issuers,
    Dids,
    Credentials,
    Proofs,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Issuers => "issuers",
            Table::Dids => "dids",
            Table::Credentials => "credentials",
            Table::Proofs => "proofs",
        }
    }
}

/// A row to upsert alongside an event.
#[derive(Debug, Clone, Copy)]
pub struct RowWrite<'a> {
    pub table: Table,
    pub key: &'a [u8],
    pub value: &'a [u8],
}

const META_LAST_SEQUENCE: &[u8] = b"last_sequence";
const META_SCHEMA_VERSION: &[u8] = b"schema_version";

/// Encode a value for storage.
pub fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

/// Decode a stored value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Persistent event log plus materialized tables.
///
/// # Thread Safety
///
/// sled trees support lock-free concurrent reads and serialized writes, so
/// a `LedgerDb` can be shared as `Arc<LedgerDb>` without extra locking.
/// Ordering *between* events is the caller's concern: the registries call
/// [`append`](Self::append) while holding the lock that serializes the
/// mutation being logged.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    events: Tree,
    issuers: Tree,
    dids: Tree,
    credentials: Tree,
    proofs: Tree,
    metadata: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Temporary database, removed when dropped. For tests.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let ledger = Self {
            events: db.open_tree("events")?,
            issuers: db.open_tree("issuers")?,
            dids: db.open_tree("dids")?,
            credentials: db.open_tree("credentials")?,
            proofs: db.open_tree("proofs")?,
            metadata: db.open_tree("metadata")?,
            db,
        };
        ledger.check_schema()?;
        debug!(events = ledger.events.len(), "ledger trees opened");
        Ok(ledger)
    }

    /// Stamp a fresh database with the schema version, or refuse one
    /// written by an incompatible build.
    fn check_schema(&self) -> DbResult<()> {
        match self.metadata.get(META_SCHEMA_VERSION)? {
            Some(bytes) => {
                let raw: [u8; 4] = bytes
                    .as_ref()
                    .try_into()
                    .map_err(|_| DbError::Corrupt("metadata"))?;
                let found = u32::from_be_bytes(raw);
                if found != LEDGER_SCHEMA_VERSION {
                    return Err(DbError::SchemaMismatch {
                        found,
                        expected: LEDGER_SCHEMA_VERSION,
                    });
                }
            }
            None => {
                self.metadata
                    .insert(META_SCHEMA_VERSION, &LEDGER_SCHEMA_VERSION.to_be_bytes()[..])?;
                info!(schema = LEDGER_SCHEMA_VERSION, "initialized empty ledger");
            }
        }
        Ok(())
    }

    fn tree(&self, table: Table) -> &Tree {
        match table {
            Table::Issuers => &self.issuers,
            Table::Dids => &self.dids,
            Table::Credentials => &self.credentials,
            Table::Proofs => &self.proofs,
        }
    }

    // -- Event log ----------------------------------------------------------

    /// Append an encoded event and upsert its materialized row atomically.
    ///
    /// Returns the sequence number assigned to the event. Sequence numbers
    /// are strictly increasing but not necessarily dense.
    pub fn append(&self, event: &[u8], row: RowWrite<'_>) -> DbResult<u64> {
        let sequence = self.db.generate_id()?;
        let seq_key = sequence.to_be_bytes();
        let table = self.tree(row.table);

        (&self.events, table, &self.metadata)
            .transaction(|(events, table, meta)| {
                events.insert(&seq_key[..], event)?;
                table.insert(row.key, row.value)?;
                meta.insert(META_LAST_SEQUENCE, &seq_key[..])?;
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e| match e {
                TransactionError::Storage(err) => DbError::Sled(err),
                TransactionError::Abort(()) => DbError::Corrupt("transaction"),
            })?;

        // Flush before the caller applies the event in memory.
        self.db.flush()?;

        Ok(sequence)
    }

    /// Every event in sequence order, decoded.
    pub fn events<T: DeserializeOwned>(&self) -> DbResult<Vec<(u64, T)>> {
        let mut out = Vec::with_capacity(self.events.len());
        for item in self.events.iter() {
            let (key, value) = item?;
            let raw: [u8; 8] = key.as_ref().try_into().map_err(|_| DbError::Corrupt("events"))?;
            out.push((u64::from_be_bytes(raw), decode(&value)?));
        }
        Ok(out)
    }

    /// A fresh id from the same monotonic source as sequence numbers. Used
    /// to give rows that share a prefix a stable order.
    pub fn next_id(&self) -> DbResult<u64> {
        Ok(self.db.generate_id()?)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// The sequence number of the last appended event, if any.
    pub fn last_sequence(&self) -> DbResult<Option<u64>> {
        match self.metadata.get(META_LAST_SEQUENCE)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_ref()
                    .try_into()
                    .map_err(|_| DbError::Corrupt("metadata"))?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    // -- Tables -------------------------------------------------------------

    /// Fetch and decode a row.
    pub fn get<T: DeserializeOwned>(&self, table: Table, key: &[u8]) -> DbResult<Option<T>> {
        match self.tree(table).get(key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every row whose key starts with `prefix`, in key order.
    pub fn scan_prefix<T: DeserializeOwned>(&self, table: Table, prefix: &[u8]) -> DbResult<Vec<T>> {
        let mut out = Vec::new();
        for item in self.tree(table).scan_prefix(prefix) {
            let (_key, value) = item?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    pub fn count(&self, table: Table) -> usize {
        self.tree(table).len()
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        name: String,
        n: u64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Event {
        Put(Row),
    }

    fn append_row(db: &LedgerDb, table: Table, key: &[u8], row: &Row) -> u64 {
        let event = encode(&Event::Put(row.clone())).unwrap();
        let value = encode(row).unwrap();
        db.append(
            &event,
            RowWrite {
                table,
                key,
                value: &value,
            },
        )
        .unwrap()
    }

    #[test]
    fn open_temporary_database() {
        let db = LedgerDb::open_temporary().expect("should create temp db");
        assert_eq!(db.event_count(), 0);
        assert_eq!(db.count(Table::Issuers), 0);
        assert!(db.last_sequence().unwrap().is_none());
    }

    #[test]
    fn append_writes_event_and_row() {
        let db = LedgerDb::open_temporary().unwrap();
        let row = Row {
            name: "Test University".into(),
            n: 1,
        };
        let seq = append_row(&db, Table::Issuers, b"issuer-1", &row);

        assert_eq!(db.event_count(), 1);
        assert_eq!(db.last_sequence().unwrap(), Some(seq));
        let stored: Row = db.get(Table::Issuers, b"issuer-1").unwrap().unwrap();
        assert_eq!(stored, row);

        let events: Vec<(u64, Event)> = db.events().unwrap();
        assert_eq!(events, vec![(seq, Event::Put(row))]);
    }

    #[test]
    fn events_come_back_in_append_order() {
        let db = LedgerDb::open_temporary().unwrap();
        let mut seqs = Vec::new();
        for i in 0..20u64 {
            let row = Row {
                name: format!("row-{i}"),
                n: i,
            };
            seqs.push(append_row(&db, Table::Credentials, &i.to_be_bytes(), &row));
        }

        let events: Vec<(u64, Event)> = db.events().unwrap();
        let got: Vec<u64> = events.iter().map(|(s, _)| *s).collect();
        assert_eq!(got, seqs);
        assert!(got.windows(2).all(|w| w[0] < w[1]));
        for (i, (_, Event::Put(row))) in events.iter().enumerate() {
            assert_eq!(row.n, i as u64);
        }
    }

    #[test]
    fn upsert_overwrites_row_but_keeps_both_events() {
        let db = LedgerDb::open_temporary().unwrap();
        let v1 = Row {
            name: "a".into(),
            n: 1,
        };
        let v2 = Row {
            name: "a".into(),
            n: 2,
        };
        append_row(&db, Table::Dids, b"did:web:a", &v1);
        append_row(&db, Table::Dids, b"did:web:a", &v2);

        assert_eq!(db.event_count(), 2);
        assert_eq!(db.count(Table::Dids), 1);
        let stored: Row = db.get(Table::Dids, b"did:web:a").unwrap().unwrap();
        assert_eq!(stored.n, 2);
    }

    #[test]
    fn prefix_scan_returns_one_credentials_proofs() {
        let db = LedgerDb::open_temporary().unwrap();
        let cred_a = [0xAA; 32];
        let cred_b = [0xBB; 32];
        for (i, cred) in [cred_a, cred_b, cred_a, cred_a].iter().enumerate() {
            let mut key = cred.to_vec();
            key.extend_from_slice(&(i as u64).to_be_bytes());
            let row = Row {
                name: hex::encode(cred),
                n: i as u64,
            };
            append_row(&db, Table::Proofs, &key, &row);
        }

        let a: Vec<Row> = db.scan_prefix(Table::Proofs, &cred_a).unwrap();
        assert_eq!(a.iter().map(|r| r.n).collect::<Vec<_>>(), vec![0, 2, 3]);
        let b: Vec<Row> = db.scan_prefix(Table::Proofs, &cred_b).unwrap();
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn get_missing_row_is_none() {
        let db = LedgerDb::open_temporary().unwrap();
        let missing: Option<Row> = db.get(Table::Credentials, b"nope").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn reopen_persists_events() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let db = LedgerDb::open(dir.path()).unwrap();
            append_row(
                &db,
                Table::Issuers,
                b"k",
                &Row {
                    name: "x".into(),
                    n: 7,
                },
            );
            db.flush().unwrap();
        }
        let db = LedgerDb::open(dir.path()).unwrap();
        let events: Vec<(u64, Event)> = db.events().unwrap();
        assert_eq!(events.len(), 1);
        let row: Row = db.get(Table::Issuers, b"k").unwrap().unwrap();
        assert_eq!(row.n, 7);
    }

    #[test]
    fn schema_mismatch_refuses_to_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let db = sled::open(dir.path()).unwrap();
            let meta = db.open_tree("metadata").unwrap();
            meta.insert(META_SCHEMA_VERSION, &999u32.to_be_bytes()[..]).unwrap();
            db.flush().unwrap();
        }
        let err = LedgerDb::open(dir.path()).unwrap_err();
        assert!(matches!(err, DbError::SchemaMismatch { found: 999, .. }));
    }
}
