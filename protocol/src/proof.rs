//! # Proof Verifier
//!
//! Stateless checks the credential registry relies on:
//!
//! - [`verify_signature`] / [`recover_signer`]: who signed this message?
//! - [`compute_credential_hash`]: the content address of a credential.
//! - [`compute_proof_hash`]: the digest a verifier records as evidence.
//!
//! Nothing here touches registry state, so everything here is safe to call
//! from any thread without coordination.
//!
//! ## Credential hash preimage
//!
//! ```text
//! "ATTEST-CREDENTIAL-v1"
//! ‖ len(holder)   ‖ holder bytes      (20)
//! ‖ len(issuer)   ‖ issuer bytes      (20)
//! ‖ len(type)     ‖ type UTF-8
//! ‖ issued_at     (i64 BE, Unix seconds)
//! ‖ len(metadata) ‖ metadata UTF-8
//! ```
//!
//! Lengths are `u64` big-endian. Length prefixes keep `("ab", "c")` and
//! `("a", "bc")` from colliding, and the fixed byte order makes the hash
//! identical on every platform.

use chrono::{DateTime, Utc};

use crate::config::{CREDENTIAL_HASH_DOMAIN, PROOF_MESSAGE_PREFIX};
use crate::crypto::hash::{blake3_hash, sha256, Hash256};
use crate::crypto::signatures::SignatureEnvelope;
use crate::identity::address::Address;

/// Recover the address that produced `signature` over `message`.
///
/// `None` for anything malformed or any signature that doesn't verify.
pub fn recover_signer(message: &[u8], signature: &str) -> Option<Address> {
    let envelope = SignatureEnvelope::from_hex(signature).ok()?;
    envelope.recover(message).ok()
}

/// Does `signature` over `message` recover to `claimed`?
///
/// `claimed` is compared case-insensitively. Malformed input of any kind
/// (bad hex, wrong length, unparsable address) is `false`, never an error.
pub fn verify_signature(message: &[u8], signature: &str, claimed: &str) -> bool {
    let Ok(claimed) = Address::parse(claimed) else {
        return false;
    };
    verify_signature_for(message, signature, &claimed)
}

/// [`verify_signature`] for an already-parsed address.
pub fn verify_signature_for(message: &[u8], signature: &str, claimed: &Address) -> bool {
    recover_signer(message, signature).is_some_and(|signer| signer == *claimed)
}

/// Deterministic content hash of a credential.
pub fn compute_credential_hash(
    holder: &Address,
    issuer: &Address,
    credential_type: &str,
    issued_at: DateTime<Utc>,
    metadata: &str,
) -> Hash256 {
    let mut preimage = Vec::with_capacity(
        CREDENTIAL_HASH_DOMAIN.len() + 8 * 4 + 20 * 2 + 8 + credential_type.len() + metadata.len(),
    );
    preimage.extend_from_slice(CREDENTIAL_HASH_DOMAIN);
    push_field(&mut preimage, holder.as_bytes());
    push_field(&mut preimage, issuer.as_bytes());
    push_field(&mut preimage, credential_type.as_bytes());
    preimage.extend_from_slice(&issued_at.timestamp().to_be_bytes());
    push_field(&mut preimage, metadata.as_bytes());
    Hash256::from_bytes(blake3_hash(&preimage))
}

/// SHA-256 of an arbitrary proof payload.
pub fn compute_proof_hash(payload: &[u8]) -> Hash256 {
    Hash256::from_bytes(sha256(payload))
}

/// The message a holder signs to prove possession of a credential.
///
/// ```
/// use attest_protocol::crypto::Hash256;
/// use attest_protocol::proof::proof_message;
///
/// let msg = proof_message(&Hash256::ZERO, "nonce-42");
/// assert!(msg.starts_with("attest-proof:0x0000"));
/// assert!(msg.ends_with(":nonce-42"));
/// ```
pub fn proof_message(credential_hash: &Hash256, challenge: &str) -> String {
    format!("{}{}:{}", PROOF_MESSAGE_PREFIX, credential_hash, challenge)
}

fn push_field(buf: &mut Vec<u8>, field: &[u8]) {
    buf.extend_from_slice(&(field.len() as u64).to_be_bytes());
    buf.extend_from_slice(field);
}
