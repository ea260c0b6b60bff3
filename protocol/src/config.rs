//! # Protocol Configuration & Constants
//!
//! Every magic number in ATTEST lives here. Domain-separation tags in
//! particular are part of the hash format: change one and every stored
//! credential hash stops matching its recomputation.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Crate-independent protocol version, reported by `/health` and the CLI.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Schema version of the persisted event log. Bumped when a
/// `LedgerEvent` variant changes shape.
pub const LEDGER_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Signature envelope: public key followed by signature.
pub const ENVELOPE_LENGTH: usize = PUBLIC_KEY_LENGTH + SIGNATURE_LENGTH;

/// Account addresses are the first 20 bytes of BLAKE3(public key).
pub const ADDRESS_LENGTH: usize = 20;

pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Domain Separation
// ---------------------------------------------------------------------------

/// Prefix of the credential hash preimage. Versioned so a future encoding
/// can coexist with this one.
pub const CREDENTIAL_HASH_DOMAIN: &[u8] = b"ATTEST-CREDENTIAL-v1";

/// Prefix of the message a holder signs for proof of possession.
pub const PROOF_MESSAGE_PREFIX: &str = "attest-proof:";

// ---------------------------------------------------------------------------
// DIDs
// ---------------------------------------------------------------------------

/// The DID method ATTEST mints identifiers under.
pub const DID_METHOD: &str = "attest";

/// Multicodec prefix for Ed25519 public keys (0xed01, varint-encoded).
pub const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";
pub const ED25519_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2020/v1";

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_RPC_PORT: u16 = 9841;
pub const DEFAULT_METRICS_PORT: u16 = 9842;
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Largest accepted JSON body on the HTTP API.
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_parameter_sizes() {
        assert_eq!(PUBLIC_KEY_LENGTH, 32);
        assert_eq!(SIGNATURE_LENGTH, 64);
        assert_eq!(ENVELOPE_LENGTH, 96);
        assert!(ADDRESS_LENGTH <= HASH_OUTPUT_LENGTH);
    }

    #[test]
    fn test_ports_are_distinct() {
        assert_ne!(DEFAULT_RPC_PORT, DEFAULT_METRICS_PORT);
    }

    #[test]
    fn test_did_method_is_valid_method_name() {
        // did-core: method-name = 1*method-char, method-char = %x61-7A / DIGIT
        assert!(DID_METHOD
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_proof_prefix_is_ascii() {
        assert!(PROOF_MESSAGE_PREFIX.is_ascii());
        assert!(PROOF_MESSAGE_PREFIX.ends_with(':'));
    }
}
