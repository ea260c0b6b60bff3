//! # Issuer Registry
//!
//! Who is allowed to issue credentials. Anyone can register as an issuer;
//! only the registry authority can mark an issuer as trusted.
//!
//! ## Lifecycle
//!
//! ```text
//! Unregistered ──register──► Registered (unverified) ──verify──► Verified
//! ```
//!
//! There is no way back. Issuer records are never deleted and trust is
//! never withdrawn; a compromised issuer is handled by revoking what it
//! issued, one credential at a time.
//!
//! ## Design
//!
//! One `RwLock` over the whole table. Registration and verification are
//! rare next to the trust lookups the credential registry does on every
//! issuance, so readers sharing the lock is what matters.

use attest_protocol::identity::Address;
use attest_protocol::time::Clock;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{RegistryError, RegistryResult};
use crate::events::{EventSink, LedgerEvent};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A registered issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    /// The issuer's account; also its registry key.
    pub address: Address,
    pub name: String,
    /// The issuer's self-declared DID. Not required to be registered in
    /// the DID registry.
    pub did: String,
    pub metadata_uri: String,
    pub verified: bool,
    pub registered_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct IssuerTable {
    by_address: HashMap<Address, Issuer>,
    /// Registration order.
    order: Vec<Address>,
}

impl IssuerTable {
    fn upsert(&mut self, issuer: Issuer) {
        if !self.by_address.contains_key(&issuer.address) {
            self.order.push(issuer.address);
        }
        self.by_address.insert(issuer.address, issuer);
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct IssuerRegistry {
    authority: Address,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn EventSink>>,
    table: RwLock<IssuerTable>,
}

impl IssuerRegistry {
    /// An empty registry governed by `authority`.
    pub fn new(authority: Address, clock: Arc<dyn Clock>) -> Self {
        Self {
            authority,
            clock,
            sink: None,
            table: RwLock::new(IssuerTable::default()),
        }
    }

    /// Route every accepted mutation through `sink` before applying it.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The address allowed to verify issuers.
    pub fn authority(&self) -> Address {
        self.authority
    }

    fn emit(&self, event: &LedgerEvent) -> RegistryResult<()> {
        if let Some(sink) = &self.sink {
            sink.record(event)?;
        }
        Ok(())
    }

    /// Register `caller` as an issuer. The new record is unverified.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateIssuer`] if `caller` already has a record,
    /// verified or not.
    pub fn register_issuer(
        &self,
        caller: &Address,
        name: &str,
        did: &str,
        metadata_uri: &str,
    ) -> RegistryResult<Issuer> {
        let mut table = self.table.write();
        if table.by_address.contains_key(caller) {
            debug!(issuer = %caller, "rejected duplicate issuer registration");
            return Err(RegistryError::DuplicateIssuer(*caller));
        }

        let issuer = Issuer {
            address: *caller,
            name: name.to_string(),
            did: did.to_string(),
            metadata_uri: metadata_uri.to_string(),
            verified: false,
            registered_at: self.clock.now(),
            verified_at: None,
        };

        self.emit(&LedgerEvent::IssuerRegistered(issuer.clone()))?;
        table.upsert(issuer.clone());

        info!(issuer = %caller, name = %issuer.name, "issuer registered");
        Ok(issuer)
    }

    /// Mark an issuer as trusted. Authority only.
    ///
    /// Verifying an already-verified issuer is a no-op that returns the
    /// record unchanged (and logs nothing).
    pub fn verify_issuer(&self, caller: &Address, address: &Address) -> RegistryResult<Issuer> {
        if *caller != self.authority {
            debug!(caller = %caller, target = %address, "non-authority tried to verify issuer");
            return Err(RegistryError::Unauthorized(format!(
                "{} is not the registry authority",
                caller
            )));
        }

        let mut table = self.table.write();
        let current = table
            .by_address
            .get(address)
            .ok_or_else(|| RegistryError::not_found("issuer", address))?;

        if current.verified {
            return Ok(current.clone());
        }

        let mut updated = current.clone();
        updated.verified = true;
        updated.verified_at = Some(self.clock.now());

        self.emit(&LedgerEvent::IssuerVerified(updated.clone()))?;
        table.upsert(updated.clone());

        info!(issuer = %address, "issuer verified");
        Ok(updated)
    }

    pub fn get_issuer_details(&self, address: &Address) -> RegistryResult<Issuer> {
        self.table
            .read()
            .by_address
            .get(address)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("issuer", address))
    }

    /// All verified issuers, in registration order.
    pub fn get_all_verified_issuers(&self) -> Vec<Issuer> {
        let table = self.table.read();
        table
            .order
            .iter()
            .filter_map(|addr| table.by_address.get(addr))
            .filter(|issuer| issuer.verified)
            .cloned()
            .collect()
    }

    /// Trust check used on every issuance.
    pub fn is_verified_issuer(&self, address: &Address) -> bool {
        self.table
            .read()
            .by_address
            .get(address)
            .is_some_and(|issuer| issuer.verified)
    }

    /// Number of registered issuers. Never decreases.
    pub fn get_total_issuers(&self) -> u64 {
        self.table.read().order.len() as u64
    }

    /// Apply a logged event without re-emitting it.
    pub(crate) fn replay(&self, event: &LedgerEvent) {
        if let LedgerEvent::IssuerRegistered(issuer) | LedgerEvent::IssuerVerified(issuer) = event
        {
            self.table.write().upsert(issuer.clone());
        }
    }
}

impl std::fmt::Debug for IssuerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerRegistry")
            .field("authority", &self.authority)
            .field("issuers", &self.get_total_issuers())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
