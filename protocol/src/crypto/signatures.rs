//! # Signature Envelopes
//!
//! Ed25519 can't recover a public key from a signature the way ECDSA can,
//! so a bare 64-byte signature says nothing about *who* signed. ATTEST
//! signatures therefore travel as a 96-byte envelope:
//!
//! ```text
//! +----------------------+------------------------------+
//! | public key (32 B)    | Ed25519 signature (64 B)     |
//! +----------------------+------------------------------+
//! ```
//!
//! hex-encoded on the wire (192 characters, optional `0x`). "Recovering"
//! the signer means verifying the signature with the embedded key and, if
//! that succeeds, deriving the key's address. An attacker can embed any key
//! they like, but then the recovered address is *their* address, and the
//! comparison against the claimed identity fails.
//!
//! ## Strictness
//!
//! Verification uses `verify_strict`, which rejects small-order keys and
//! non-canonical signatures that lenient implementations accept.

use thiserror::Error;

use super::keys::{Keypair, PublicKey, Signature};
use crate::config::{ENVELOPE_LENGTH, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use crate::identity::address::Address;

/// Errors while decoding an envelope.
///
/// Intentionally coarse. [`crate::proof::verify_signature`] collapses all of
/// them into `false` anyway.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature envelope is not valid hex")]
    InvalidHex,

    #[error("signature envelope must be 96 bytes, got {0}")]
    InvalidLength(usize),

    #[error("embedded public key is not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("signature verification failed")]
    VerificationFailed,
}

/// A decoded envelope: who claims to have signed, and the signature.
#[derive(Debug, Clone)]
pub struct SignatureEnvelope {
    pub public_key: PublicKey,
    pub signature: Signature,
}

impl SignatureEnvelope {
    /// Sign `message` with `keypair` and wrap the result.
    pub fn sign(keypair: &Keypair, message: &[u8]) -> Self {
        Self {
            public_key: keypair.public_key(),
            signature: keypair.sign(message),
        }
    }

    /// Decode a hex envelope. Does not verify anything.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let s = s.trim();
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(body).map_err(|_| SignatureError::InvalidHex)?;
        if bytes.len() != ENVELOPE_LENGTH {
            return Err(SignatureError::InvalidLength(bytes.len()));
        }
        let (pk, sig) = bytes.split_at(PUBLIC_KEY_LENGTH);
        debug_assert_eq!(sig.len(), SIGNATURE_LENGTH);
        let public_key =
            PublicKey::try_from_slice(pk).map_err(|_| SignatureError::InvalidPublicKey)?;
        Ok(Self {
            public_key,
            signature: Signature::from_slice(sig),
        })
    }

    /// `0x`-prefixed hex of `public_key ‖ signature`.
    pub fn to_hex(&self) -> String {
        let mut bytes = Vec::with_capacity(ENVELOPE_LENGTH);
        bytes.extend_from_slice(self.public_key.as_bytes());
        bytes.extend_from_slice(self.signature.as_bytes());
        format!("0x{}", hex::encode(bytes))
    }

    /// Verify the signature against the embedded key and return the signer
    /// address.
    pub fn recover(&self, message: &[u8]) -> Result<Address, SignatureError> {
        if self.public_key.verify(message, &self.signature) {
            Ok(self.public_key.address())
        } else {
            Err(SignatureError::VerificationFailed)
        }
    }
}

/// Sign a message and return the hex envelope, ready to put on the wire.
///
/// ```
/// use attest_protocol::crypto::{Keypair, sign_message};
/// use attest_protocol::proof::recover_signer;
///
/// let kp = Keypair::generate();
/// let sig = sign_message(&kp, b"hello");
/// assert_eq!(recover_signer(b"hello", &sig), Some(kp.address()));
/// ```
pub fn sign_message(keypair: &Keypair, message: &[u8]) -> String {
    SignatureEnvelope::sign(keypair, message).to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_recovers_signer() {
        let kp = Keypair::from_seed(&[3u8; 32]);
        let env = SignatureEnvelope::sign(&kp, b"payload");
        let decoded = SignatureEnvelope::from_hex(&env.to_hex()).unwrap();
        assert_eq!(decoded.recover(b"payload").unwrap(), kp.address());
    }

    #[test]
    fn envelope_hex_is_96_bytes() {
        let kp = Keypair::generate();
        let hex_str = sign_message(&kp, b"m");
        assert!(hex_str.starts_with("0x"));
        assert_eq!(hex_str.len(), 2 + ENVELOPE_LENGTH * 2);
    }

    #[test]
    fn tampered_message_fails_recovery() {
        let kp = Keypair::generate();
        let env = SignatureEnvelope::sign(&kp, b"original");
        assert_eq!(
            env.recover(b"tampered").unwrap_err(),
            SignatureError::VerificationFailed
        );
    }

    #[test]
    fn swapped_public_key_fails_recovery() {
        let alice = Keypair::generate();
        let mallory = Keypair::generate();
        let mut env = SignatureEnvelope::sign(&alice, b"msg");
        env.public_key = mallory.public_key();
        assert!(env.recover(b"msg").is_err());
    }

    #[test]
    fn malformed_envelopes_rejected() {
        assert_eq!(
            SignatureEnvelope::from_hex("0xnothex").unwrap_err(),
            SignatureError::InvalidHex
        );
        assert_eq!(
            SignatureEnvelope::from_hex("0xabcd").unwrap_err(),
            SignatureError::InvalidLength(2)
        );
    }
}
