//! # Hashing Utilities
//!
//! Two hash functions, and no plans for a third:
//!
//! - **BLAKE3**: our default. Credential hashes and address derivation use
//!   it because it is fast and has no length-extension weakness to design
//!   around.
//! - **SHA-256**: proof hashes. Verifiers frequently compute these outside
//!   ATTEST (browsers, wallets, HSMs) and SHA-256 is what every one of those
//!   environments already has.
//!
//! [`Hash256`] is the 32-byte digest type that flows through the registries.
//! It serializes as a `0x`-prefixed lowercase hex string, which is what both
//! the HTTP API and humans expect to paste around.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use attest_protocol::crypto::sha256;
///
/// let hash = sha256(b"ATTEST");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the BLAKE3 hash of the input data.
///
/// ```
/// use attest_protocol::crypto::blake3_hash;
///
/// assert_eq!(blake3_hash(b"ATTEST").len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Errors from parsing a hex digest.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashParseError {
    #[error("hash must be 64 hex characters, got {0}")]
    InvalidLength(usize),

    #[error("hash contains non-hex characters")]
    InvalidHex,
}

/// A 32-byte digest.
///
/// Used for credential hashes and proof hashes. Ordering is bytewise so a
/// `BTreeMap<Hash256, _>` iterates deterministically.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// The all-zero digest. Never produced by a real hash in practice; handy
    /// as a sentinel in tests.
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse a digest from hex. The `0x` prefix is optional and case is
    /// ignored.
    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        let s = s.trim();
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if body.len() != 64 {
            return Err(HashParseError::InvalidLength(body.len()));
        }
        let bytes = hex::decode(body).map_err(|_| HashParseError::InvalidHex)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Hash256 {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({}..)", &hex::encode(self.0)[..12])
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
