//! Registry error type shared by all three registries.

use attest_protocol::crypto::Hash256;
use attest_protocol::identity::{Address, DidError};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::events::SinkError;

/// Every way a registry operation can fail.
///
/// All variants are terminal: nothing retries internally, so whoever gets
/// one of these decides what to do next.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{entity} not found: {key}")]
    NotFound {
        /// What kind of record was looked up ("issuer", "DID", "credential").
        entity: &'static str,
        key: String,
    },

    #[error("issuer {0} is already registered")]
    DuplicateIssuer(Address),

    #[error("DID {0} already exists")]
    DuplicateDid(String),

    #[error("credential {0} already exists")]
    DuplicateCredential(Hash256),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("expiry {expires_at} is not after issuance time {issued_at}")]
    InvalidExpiry {
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },

    #[error("invalid public key: {0}")]
    InvalidKey(String),

    #[error("credential {0} is already revoked")]
    AlreadyRevoked(Hash256),

    #[error("invalid DID: {0}")]
    InvalidDid(#[from] DidError),

    #[error("invalid proof: {0}")]
    InvalidProof(String),

    /// The write-ahead sink refused the event; nothing was applied.
    #[error("storage failure: {0}")]
    Storage(#[from] SinkError),
}

impl RegistryError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        RegistryError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Stable machine-readable code, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::NotFound { .. } => "NOT_FOUND",
            RegistryError::DuplicateIssuer(_) => "DUPLICATE_ISSUER",
            RegistryError::DuplicateDid(_) => "DUPLICATE_DID",
            RegistryError::DuplicateCredential(_) => "DUPLICATE_CREDENTIAL",
            RegistryError::Unauthorized(_) => "UNAUTHORIZED",
            RegistryError::InvalidExpiry { .. } => "INVALID_EXPIRY",
            RegistryError::InvalidKey(_) => "INVALID_KEY",
            RegistryError::AlreadyRevoked(_) => "ALREADY_REVOKED",
            RegistryError::InvalidDid(_) => "INVALID_DID",
            RegistryError::InvalidProof(_) => "INVALID_PROOF",
            RegistryError::Storage(_) => "STORAGE",
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
