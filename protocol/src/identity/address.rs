//! # Account Addresses
//!
//! An address is the public handle of an ATTEST participant: issuers are
//! keyed by it, credentials name their holder and issuer by it, and the
//! registry authority is one.
//!
//! ## Format
//!
//! ```text
//! 0x<40 hex characters>
//! ```
//!
//! derived as the first 20 bytes of `BLAKE3(ed25519_public_key)`.
//!
//! Parsing accepts any mix of upper and lower case and normalizes to
//! lowercase. Because an [`Address`] is stored as raw bytes, two addresses
//! that differ only in case are the *same value*; there is no code path
//! where a case-sensitive comparison could sneak in.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::ADDRESS_LENGTH;
use crate::crypto::hash::blake3_hash;
use crate::crypto::keys::PublicKey;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must start with 0x")]
    MissingPrefix,

    #[error("address must be 40 hex characters after 0x, got {0}")]
    InvalidLength(usize),

    #[error("address contains non-hex characters")]
    InvalidHex,
}

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derive the address controlled by `public_key`.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = blake3_hash(public_key.as_bytes());
        let mut out = [0u8; ADDRESS_LENGTH];
        out.copy_from_slice(&digest[..ADDRESS_LENGTH]);
        Self(out)
    }

    /// Parse `0x`-prefixed hex, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let s = s.trim();
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        if body.len() != ADDRESS_LENGTH * 2 {
            return Err(AddressError::InvalidLength(body.len()));
        }
        let bytes = hex::decode(body).map_err(|_| AddressError::InvalidHex)?;
        let mut out = [0u8; ADDRESS_LENGTH];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Canonical lowercase form, `0x`-prefixed.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
