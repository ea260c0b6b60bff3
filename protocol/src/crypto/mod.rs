//! # Cryptographic Primitives
//!
//! Every signature, address and digest in ATTEST flows through here.
//!
//! We deliberately chose boring, well-audited cryptography:
//!
//! - **Ed25519** for signatures.
//! - **BLAKE3** for credential hashes and address derivation.
//! - **SHA-256** for proof hashes, because verifiers compute those in
//!   environments that only ship SHA-256.
//!
//! Everything here is a thin, typed wrapper around audited implementations.
//! If you're tempted to optimize these functions, please reconsider.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, sha256, Hash256, HashParseError};
pub use keys::{KeyError, Keypair, PublicKey, Signature};
pub use signatures::{sign_message, SignatureEnvelope, SignatureError};
