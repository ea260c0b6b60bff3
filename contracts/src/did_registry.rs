//! # DID Registry
//!
//! Binds decentralized identifiers to an owner account and an Ed25519
//! public key. Independent of the issuer registry: anyone may register a
//! DID, and registering one confers no trust.
//!
//! ## Versioning
//!
//! The binding between a DID and its key is never silently overwritten.
//! [`DidRegistry::rotate_key`] bumps `version` and moves the outgoing key
//! into `previous_keys`, so a signature made last year can still be
//! checked against the key that was current last year. Endpoint updates
//! bump `version` too. Both are owner-only.
//!
//! DIDs are unique across the whole registry; one owner may hold several.

use attest_protocol::crypto::PublicKey;
use attest_protocol::identity::{Address, Did, DidDocument, DocumentSource};
use attest_protocol::time::Clock;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{RegistryError, RegistryResult};
use crate::events::{EventSink, LedgerEvent};

/// A registered DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidRecord {
    pub did: Did,
    pub owner: Address,
    /// Current key, lowercase hex without prefix.
    pub public_key: String,
    /// In registration order.
    pub service_endpoints: Vec<String>,
    pub metadata_uri: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Starts at 1; bumped by every update.
    pub version: u32,
    pub previous_keys: Vec<RetiredKey>,
}

/// A key that was current before a rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetiredKey {
    pub public_key: String,
    /// The record version during which this key was current.
    pub version: u32,
    pub retired_at: DateTime<Utc>,
}

#[derive(Default)]
struct DidTable {
    by_did: HashMap<String, DidRecord>,
    by_owner: HashMap<Address, Vec<String>>,
}

impl DidTable {
    fn upsert(&mut self, record: DidRecord) {
        let key = record.did.to_string();
        if !self.by_did.contains_key(&key) {
            self.by_owner
                .entry(record.owner)
                .or_default()
                .push(key.clone());
        }
        self.by_did.insert(key, record);
    }
}

/// Parse and normalize a hex Ed25519 key.
fn normalize_key(public_key: &str) -> RegistryResult<PublicKey> {
    PublicKey::from_hex(public_key).map_err(|_| {
        RegistryError::InvalidKey("expected a hex-encoded 32-byte Ed25519 public key".into())
    })
}

pub struct DidRegistry {
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn EventSink>>,
    table: RwLock<DidTable>,
}

impl DidRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            sink: None,
            table: RwLock::new(DidTable::default()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn emit(&self, event: &LedgerEvent) -> RegistryResult<()> {
        if let Some(sink) = &self.sink {
            sink.record(event)?;
        }
        Ok(())
    }

    /// Register `did` to `caller`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidDid`] if `did` isn't DID syntax.
    /// - [`RegistryError::InvalidKey`] if `public_key` isn't a valid key.
    /// - [`RegistryError::DuplicateDid`] if `did` is taken, by anyone.
    pub fn create_did(
        &self,
        caller: &Address,
        did: &str,
        public_key: &str,
        service_endpoints: Vec<String>,
        metadata_uri: &str,
    ) -> RegistryResult<DidRecord> {
        let did = Did::parse(did)?;
        let key = normalize_key(public_key)?;

        let mut table = self.table.write();
        if table.by_did.contains_key(did.as_str()) {
            debug!(did = %did, "rejected duplicate DID");
            return Err(RegistryError::DuplicateDid(did.to_string()));
        }

        let now = self.clock.now();
        let record = DidRecord {
            did,
            owner: *caller,
            public_key: key.to_hex(),
            service_endpoints,
            metadata_uri: metadata_uri.to_string(),
            created_at: now,
            updated_at: now,
            version: 1,
            previous_keys: Vec::new(),
        };

        self.emit(&LedgerEvent::DidCreated(record.clone()))?;
        table.upsert(record.clone());

        info!(did = %record.did, owner = %caller, "DID created");
        Ok(record)
    }

    pub fn resolve_did(&self, did: &str) -> RegistryResult<DidRecord> {
        self.table
            .read()
            .by_did
            .get(did)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("DID", did))
    }

    /// Render the W3C DID Document for a registered DID.
    pub fn resolve_document(&self, did: &str) -> RegistryResult<DidDocument> {
        let table = self.table.read();
        let record = table
            .by_did
            .get(did)
            .ok_or_else(|| RegistryError::not_found("DID", did))?;
        // Stored keys were validated on the way in.
        let public_key = normalize_key(&record.public_key)?;
        Ok(DidDocument::render(DocumentSource {
            did: &record.did,
            owner: &record.owner,
            public_key: &public_key,
            key_version: record.version,
            service_endpoints: &record.service_endpoints,
            created: record.created_at,
            updated: record.updated_at,
        }))
    }

    /// Replace the DID's key. The old key is kept in `previous_keys`.
    pub fn rotate_key(
        &self,
        caller: &Address,
        did: &str,
        new_public_key: &str,
    ) -> RegistryResult<DidRecord> {
        let key = normalize_key(new_public_key)?;
        self.update_owned(caller, did, |record, now| {
            record.previous_keys.push(RetiredKey {
                public_key: std::mem::replace(&mut record.public_key, key.to_hex()),
                version: record.version,
                retired_at: now,
            });
        })
    }

    /// Replace the DID's service endpoints.
    pub fn update_service_endpoints(
        &self,
        caller: &Address,
        did: &str,
        endpoints: Vec<String>,
    ) -> RegistryResult<DidRecord> {
        self.update_owned(caller, did, move |record, _| {
            record.service_endpoints = endpoints;
        })
    }

    fn update_owned<F>(&self, caller: &Address, did: &str, change: F) -> RegistryResult<DidRecord>
    where
        F: FnOnce(&mut DidRecord, DateTime<Utc>),
    {
        let mut table = self.table.write();
        let current = table
            .by_did
            .get(did)
            .ok_or_else(|| RegistryError::not_found("DID", did))?;

        if current.owner != *caller {
            debug!(did, caller = %caller, "non-owner tried to update DID");
            return Err(RegistryError::Unauthorized(format!(
                "{} does not own {}",
                caller, did
            )));
        }

        let now = self.clock.now();
        let mut updated = current.clone();
        change(&mut updated, now);
        updated.version += 1;
        updated.updated_at = now;

        self.emit(&LedgerEvent::DidUpdated(updated.clone()))?;
        table.upsert(updated.clone());

        info!(did, version = updated.version, "DID updated");
        Ok(updated)
    }

    /// DIDs owned by `owner`, in creation order.
    pub fn get_dids_by_owner(&self, owner: &Address) -> Vec<DidRecord> {
        let table = self.table.read();
        table
            .by_owner
            .get(owner)
            .map(|dids| {
                dids.iter()
                    .filter_map(|d| table.by_did.get(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of registered DIDs. Never decreases.
    pub fn get_total_dids(&self) -> u64 {
        self.table.read().by_did.len() as u64
    }

    pub(crate) fn replay(&self, event: &LedgerEvent) {
        if let LedgerEvent::DidCreated(record) | LedgerEvent::DidUpdated(record) = event {
            self.table.write().upsert(record.clone());
        }
    }
}

impl std::fmt::Debug for DidRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DidRegistry")
            .field("dids", &self.get_total_dids())
            .finish()
    }
}
