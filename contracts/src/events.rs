//! # Ledger Events
//!
//! Every accepted mutation is described by exactly one [`LedgerEvent`]
//! carrying the full post-mutation record. Registries hand the event to an
//! [`EventSink`] *before* applying it in memory, while still holding the
//! guard that serializes the mutation. If the sink fails, the mutation is
//! abandoned and the caller gets [`RegistryError::Storage`].
//!
//! That ordering makes the sink a write-ahead log: anything visible in
//! memory is already durable, and replaying the log in order rebuilds
//! exactly the state that was visible.
//!
//! [`RegistryError::Storage`]: crate::error::RegistryError::Storage

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::credential_registry::{Credential, ProofRecord};
use crate::did_registry::DidRecord;
use crate::issuer_registry::Issuer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    IssuerRegistered(Issuer),
    IssuerVerified(Issuer),
    DidCreated(DidRecord),
    DidUpdated(DidRecord),
    CredentialIssued(Credential),
    ProofRecorded(ProofRecord),
    CredentialRevoked(Credential),
}

impl LedgerEvent {
    /// Short name for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::IssuerRegistered(_) => "issuer_registered",
            LedgerEvent::IssuerVerified(_) => "issuer_verified",
            LedgerEvent::DidCreated(_) => "did_created",
            LedgerEvent::DidUpdated(_) => "did_updated",
            LedgerEvent::CredentialIssued(_) => "credential_issued",
            LedgerEvent::ProofRecorded(_) => "proof_recorded",
            LedgerEvent::CredentialRevoked(_) => "credential_revoked",
        }
    }
}

/// A sink refused an event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SinkError(String);

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Receives events ahead of the in-memory apply.
///
/// Implementations are called while a registry lock is held. Keep them
/// short, and never call back into a registry from inside `record`.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &LedgerEvent) -> Result<(), SinkError>;
}

/// Forwards each event to several sinks in order, stopping at the first
/// failure.
///
/// Put the durable sink first: sinks after it only see events that are
/// already on disk.
#[derive(Default, Clone)]
pub struct SinkChain {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl SinkChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for SinkChain {
    fn record(&self, event: &LedgerEvent) -> Result<(), SinkError> {
        for sink in &self.sinks {
            sink.record(event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_protocol::identity::Address;
    use chrono::Utc;
    use parking_lot::Mutex;

    struct Recorder(Mutex<Vec<&'static str>>);

    impl EventSink for Recorder {
        fn record(&self, event: &LedgerEvent) -> Result<(), SinkError> {
            self.0.lock().push(event.kind());
            Ok(())
        }
    }

    struct Refuse;

    impl EventSink for Refuse {
        fn record(&self, _event: &LedgerEvent) -> Result<(), SinkError> {
            Err(SinkError::new("refused"))
        }
    }

    fn sample() -> LedgerEvent {
        LedgerEvent::IssuerRegistered(Issuer {
            address: Address::from_bytes([1; 20]),
            name: "Test University".into(),
            did: "did:web:test.example".into(),
            metadata_uri: String::new(),
            verified: false,
            registered_at: Utc::now(),
            verified_at: None,
        })
    }

    #[test]
    fn chain_stops_at_first_failure() {
        let before = Arc::new(Recorder(Mutex::new(Vec::new())));
        let after = Arc::new(Recorder(Mutex::new(Vec::new())));
        let chain = SinkChain::new()
            .with(before.clone())
            .with(Arc::new(Refuse))
            .with(after.clone());

        assert_eq!(chain.record(&sample()), Err(SinkError::new("refused")));
        assert_eq!(*before.0.lock(), vec!["issuer_registered"]);
        assert!(after.0.lock().is_empty());
    }

    #[test]
    fn empty_chain_accepts_everything() {
        let chain = SinkChain::new();
        assert!(chain.is_empty());
        assert!(chain.record(&sample()).is_ok());
    }

    #[test]
    fn events_roundtrip_through_bincode() {
        let event = sample();
        let bytes = bincode::serialize(&event).unwrap();
        let back: LedgerEvent = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, event);
    }
}
