//! # Identity Module
//!
//! Who is who in ATTEST. Two layers:
//!
//! 1. **Address**: the `0x`-prefixed account identifier derived from an
//!    Ed25519 public key. Issuers, holders and verifiers are all addresses.
//! 2. **DID**: W3C Decentralized Identifiers registered against an owner
//!    address, plus DID Document rendering for interop with the wider SSI
//!    ecosystem.
//!
//! Key material itself lives in [`crate::crypto::keys`].

pub mod address;
pub mod did;

pub use address::{Address, AddressError};
pub use did::{Did, DidDocument, DidError, DocumentSource, ServiceEndpoint, VerificationMethod};
