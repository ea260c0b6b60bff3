//! # Storage Module
//!
//! Durable state for ATTEST: an append-only event log with materialized
//! tables next to it, on top of sled.
//!
//! ## Data Flow
//!
//! ```text
//! registry mutation ──► LedgerEvent ──► LedgerDb::append
//!                                          │
//!                      ┌───────────────────┼───────────────┐
//!                      ▼                   ▼               ▼
//!                   events            <table> row     last_sequence
//! ```
//!
//! On startup the log is replayed in sequence order to rebuild in-memory
//! state. Bincode on disk, JSON only at the API.

pub mod db;

pub use db::{decode, encode, DbError, DbResult, LedgerDb, RowWrite, Table};
