//! # ATTEST Registries
//!
//! The credential lifecycle engine, as in-process state machines:
//!
//! - **Issuer Registry**: who may issue. Registration is open; trust is
//!   granted by the registry authority and never withdrawn.
//! - **DID Registry**: DIDs bound to an owner and a versioned key.
//! - **Credential Registry**: issuance, proof logging, revocation and
//!   validity queries. Consults the issuer registry for trust and the
//!   proof verifier for signatures.
//!
//! Registries are plain values composed by [`engine::Engine`]; there is no
//! global state.
//!
//! ## Design Principles
//!
//! 1. State transitions are explicit and one-way. Revocation is terminal;
//!    issuer verification has no undo.
//! 2. Every accepted mutation becomes a [`events::LedgerEvent`] that is
//!    journaled *before* it becomes visible.
//! 3. Mutations on one credential are serialized; different credentials
//!    proceed in parallel.
//! 4. Errors are typed and terminal. Nothing retries behind your back.

pub mod credential_registry;
pub mod did_registry;
pub mod engine;
pub mod error;
pub mod events;
pub mod issuer_registry;
pub mod journal;

pub use credential_registry::{
    Credential, CredentialRegistry, CredentialStatus, IssueRequest, ProofRecord, Validity,
};
pub use did_registry::{DidRecord, DidRegistry, RetiredKey};
pub use engine::{Engine, EngineBuilder, EngineStats};
pub use error::{RegistryError, RegistryResult};
pub use events::{EventSink, LedgerEvent, SinkChain, SinkError};
pub use issuer_registry::{Issuer, IssuerRegistry};
pub use journal::LedgerJournal;
