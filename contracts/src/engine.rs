//! # Engine
//!
//! The three registries wired together. Nothing here is global: each
//! `Engine` owns its own registries, so tests build as many isolated
//! engines as they like.
//!
//! ```
//! use attest_contracts::engine::Engine;
//! use attest_protocol::crypto::Keypair;
//!
//! let authority = Keypair::generate();
//! let engine = Engine::builder(authority.address()).build();
//! assert_eq!(engine.stats().credentials, 0);
//! ```
//!
//! [`EngineBuilder::open`] attaches a [`LedgerJournal`] and replays whatever
//! the database already holds before handing the engine back.

use attest_protocol::identity::Address;
use attest_protocol::storage::{DbResult, LedgerDb};
use attest_protocol::time::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::credential_registry::CredentialRegistry;
use crate::did_registry::DidRegistry;
use crate::events::{EventSink, LedgerEvent, SinkChain};
use crate::issuer_registry::IssuerRegistry;
use crate::journal::LedgerJournal;

/// The four monotonic totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub issuers: u64,
    pub dids: u64,
    pub credentials: u64,
    pub proofs: u64,
}

pub struct Engine {
    issuers: Arc<IssuerRegistry>,
    dids: Arc<DidRegistry>,
    credentials: Arc<CredentialRegistry>,
    clock: Arc<dyn Clock>,
}

pub struct EngineBuilder {
    authority: Address,
    clock: Arc<dyn Clock>,
    sinks: SinkChain,
}

impl EngineBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Add a sink. Sinks see events in the order they were added.
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks = self.sinks.with(sink);
        self
    }

    /// An engine with no journal. State lives as long as the engine does.
    pub fn build(self) -> Engine {
        let sink: Option<Arc<dyn EventSink>> = if self.sinks.is_empty() {
            None
        } else {
            Some(Arc::new(self.sinks))
        };

        let mut issuers = IssuerRegistry::new(self.authority, self.clock.clone());
        let mut dids = DidRegistry::new(self.clock.clone());
        if let Some(sink) = &sink {
            issuers = issuers.with_sink(sink.clone());
            dids = dids.with_sink(sink.clone());
        }
        let issuers = Arc::new(issuers);

        let mut credentials = CredentialRegistry::new(issuers.clone(), self.clock.clone());
        if let Some(sink) = sink {
            credentials = credentials.with_sink(sink);
        }

        Engine {
            issuers,
            dids: Arc::new(dids),
            credentials: Arc::new(credentials),
            clock: self.clock,
        }
    }

    /// Replay `db` and journal every further mutation into it.
    ///
    /// The journal runs ahead of any sink added with [`sink`](Self::sink),
    /// so those only ever see events that are already durable.
    pub fn open(mut self, db: LedgerDb) -> DbResult<Engine> {
        let journal = LedgerJournal::new(db);
        let events = journal.load_events()?;

        let extra = std::mem::take(&mut self.sinks);
        self.sinks = SinkChain::new().with(Arc::new(journal)).with(Arc::new(extra));

        let engine = self.build();
        for event in &events {
            engine.replay(event);
        }
        info!(events = events.len(), stats = ?engine.stats(), "ledger replayed");
        Ok(engine)
    }
}

impl Engine {
    pub fn builder(authority: Address) -> EngineBuilder {
        EngineBuilder {
            authority,
            clock: Arc::new(SystemClock),
            sinks: SinkChain::new(),
        }
    }

    /// Open a journaled engine on `db`.
    pub fn open(db: LedgerDb, authority: Address, clock: Arc<dyn Clock>) -> DbResult<Self> {
        Self::builder(authority).clock(clock).open(db)
    }

    pub fn issuers(&self) -> &IssuerRegistry {
        &self.issuers
    }

    pub fn dids(&self) -> &DidRegistry {
        &self.dids
    }

    pub fn credentials(&self) -> &CredentialRegistry {
        &self.credentials
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn authority(&self) -> Address {
        self.issuers.authority()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            issuers: self.issuers.get_total_issuers(),
            dids: self.dids.get_total_dids(),
            credentials: self.credentials.get_total_credentials(),
            proofs: self.credentials.get_total_proofs(),
        }
    }

    fn replay(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::IssuerRegistered(_) | LedgerEvent::IssuerVerified(_) => {
                self.issuers.replay(event)
            }
            LedgerEvent::DidCreated(_) | LedgerEvent::DidUpdated(_) => self.dids.replay(event),
            LedgerEvent::CredentialIssued(_)
            | LedgerEvent::ProofRecorded(_)
            | LedgerEvent::CredentialRevoked(_) => self.credentials.replay(event),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("authority", &self.authority())
            .field("stats", &self.stats())
            .finish()
    }
}
