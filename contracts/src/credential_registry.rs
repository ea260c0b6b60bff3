//! # Credential Registry
//!
//! The core of ATTEST: issuing credentials, recording proofs against them,
//! revoking them, and answering "is this credential good right now?".
//!
//! ## State Machine
//!
//! ```text
//!              time passes
//!   Active ─────────────────► Expired        (derived, never stored)
//!     │                         │
//!     └──────revoke─────────────┴──► Revoked  (stored, terminal)
//! ```
//!
//! `Revoked` dominates `Expired` when reporting status. `revoked` flips
//! false→true exactly once; a second revocation is an error, not a no-op,
//! so a double revocation is always visible to whoever attempted it.
//!
//! ## Identity
//!
//! A credential is named by its content hash
//! ([`compute_credential_hash`]) over holder, issuer, type, issuance
//! second and metadata URI. Issuing identical content twice within the
//! same second produces the same hash and the second attempt fails with
//! `DuplicateCredential`. Nothing is ever overwritten.
//!
//! ## Proofs
//!
//! `verify_proof` logs a verification attempt. It does *not* require the
//! credential to be valid: auditors want failed verifications on the
//! record too. Each [`ProofRecord`] carries `credential_valid`, the
//! validity observed when it was logged, so a verifier learns about a
//! revoked or expired credential from the same response instead of having
//! to ask again.
//!
//! ## Concurrency
//!
//! Credentials live in a `DashMap`. Every mutation of one credential runs
//! under that entry's exclusive guard, so operations on the same hash are
//! serialized and operations on different hashes (in different shards)
//! proceed in parallel. Issuance goes through the `entry` API, making the
//! duplicate check and the insert one atomic step.
//!
//! Lock order is always map shard, then index lock. Readers of the holder
//! and issuer indexes copy the hash list and release the index lock before
//! they touch the map.

use attest_protocol::crypto::Hash256;
use attest_protocol::identity::Address;
use attest_protocol::proof::{
    compute_credential_hash, compute_proof_hash, proof_message, verify_signature_for,
};
use attest_protocol::time::Clock;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::events::{EventSink, LedgerEvent};
use crate::issuer_registry::IssuerRegistry;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub hash: Hash256,
    pub holder: Address,
    pub issuer: Address,
    pub credential_type: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata_uri: String,
    pub revoked: bool,
    pub revocation_reason: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    /// Proofs recorded against this credential so far.
    pub verification_count: u64,
}

impl Credential {
    /// Expired means `now` has reached `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> CredentialStatus {
        if self.revoked {
            CredentialStatus::Revoked
        } else if self.is_expired_at(now) {
            CredentialStatus::Expired
        } else {
            CredentialStatus::Active
        }
    }

    pub fn validity_at(&self, now: DateTime<Utc>) -> Validity {
        let expired = self.is_expired_at(now);
        Validity {
            exists: true,
            valid: !self.revoked && !expired,
            revoked: self.revoked,
            expired,
        }
    }
}

/// One logged verification attempt. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRecord {
    pub proof_hash: Hash256,
    pub credential_hash: Hash256,
    pub verifier: Address,
    pub verification_data: String,
    pub verified_at: DateTime<Utc>,
    /// Whether the credential was valid when this proof was recorded.
    pub credential_valid: bool,
}

/// Answer to "is this credential good right now?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Validity {
    pub exists: bool,
    pub valid: bool,
    pub revoked: bool,
    pub expired: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Active,
    Expired,
    Revoked,
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialStatus::Active => write!(f, "Active"),
            CredentialStatus::Expired => write!(f, "Expired"),
            CredentialStatus::Revoked => write!(f, "Revoked"),
        }
    }
}

/// Arguments to [`CredentialRegistry::issue_credential`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub holder: Address,
    pub credential_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata_uri: String,
}

struct Entry {
    credential: Credential,
    proofs: Vec<ProofRecord>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct CredentialRegistry {
    issuers: Arc<IssuerRegistry>,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn EventSink>>,
    credentials: DashMap<Hash256, Entry>,
    by_holder: RwLock<HashMap<Address, Vec<Hash256>>>,
    by_issuer: RwLock<HashMap<Address, Vec<Hash256>>>,
    total_credentials: AtomicU64,
    total_proofs: AtomicU64,
}

impl CredentialRegistry {
    /// `issuers` is consulted read-only for trust checks.
    pub fn new(issuers: Arc<IssuerRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            issuers,
            clock,
            sink: None,
            credentials: DashMap::new(),
            by_holder: RwLock::new(HashMap::new()),
            by_issuer: RwLock::new(HashMap::new()),
            total_credentials: AtomicU64::new(0),
            total_proofs: AtomicU64::new(0),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn emit(&self, event: &LedgerEvent) -> RegistryResult<()> {
        if let Some(sink) = &self.sink {
            sink.record(event)?;
        }
        Ok(())
    }

    fn index(&self, credential: &Credential) {
        self.by_holder
            .write()
            .entry(credential.holder)
            .or_default()
            .push(credential.hash);
        self.by_issuer
            .write()
            .entry(credential.issuer)
            .or_default()
            .push(credential.hash);
    }

    // -- Mutations ----------------------------------------------------------

    /// Issue a credential from `caller` to `request.holder`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Unauthorized`] unless `caller` is a verified issuer.
    /// - [`RegistryError::InvalidExpiry`] if `expires_at` is not strictly
    ///   after the issuance time.
    /// - [`RegistryError::DuplicateCredential`] if the content hash exists.
    pub fn issue_credential(
        &self,
        caller: &Address,
        request: IssueRequest,
    ) -> RegistryResult<Hash256> {
        if !self.issuers.is_verified_issuer(caller) {
            debug!(caller = %caller, "issuance refused: not a verified issuer");
            return Err(RegistryError::Unauthorized(format!(
                "{} is not a verified issuer",
                caller
            )));
        }

        let issued_at = self.clock.now();
        if let Some(expires_at) = request.expires_at {
            if expires_at <= issued_at {
                return Err(RegistryError::InvalidExpiry {
                    issued_at,
                    expires_at,
                });
            }
        }

        let hash = compute_credential_hash(
            &request.holder,
            caller,
            &request.credential_type,
            issued_at,
            &request.metadata_uri,
        );

        match self.credentials.entry(hash) {
            MapEntry::Occupied(_) => {
                debug!(%hash, "issuance refused: duplicate content hash");
                Err(RegistryError::DuplicateCredential(hash))
            }
            MapEntry::Vacant(slot) => {
                let credential = Credential {
                    hash,
                    holder: request.holder,
                    issuer: *caller,
                    credential_type: request.credential_type,
                    issued_at,
                    expires_at: request.expires_at,
                    metadata_uri: request.metadata_uri,
                    revoked: false,
                    revocation_reason: None,
                    revoked_at: None,
                    verification_count: 0,
                };

                self.emit(&LedgerEvent::CredentialIssued(credential.clone()))?;
                self.index(&credential);
                info!(
                    %hash,
                    issuer = %credential.issuer,
                    holder = %credential.holder,
                    credential_type = %credential.credential_type,
                    "credential issued"
                );
                slot.insert(Entry {
                    credential,
                    proofs: Vec::new(),
                });
                self.total_credentials.fetch_add(1, Ordering::SeqCst);
                Ok(hash)
            }
        }
    }

    /// Log a verification attempt against a credential.
    ///
    /// Succeeds for revoked and expired credentials too; the returned
    /// record's `credential_valid` says which case this was.
    pub fn verify_proof(
        &self,
        caller: &Address,
        credential_hash: &Hash256,
        proof_hash: Hash256,
        verification_data: &str,
    ) -> RegistryResult<ProofRecord> {
        let mut entry = self
            .credentials
            .get_mut(credential_hash)
            .ok_or_else(|| RegistryError::not_found("credential", credential_hash))?;

        let now = self.clock.now();
        let record = ProofRecord {
            proof_hash,
            credential_hash: *credential_hash,
            verifier: *caller,
            verification_data: verification_data.to_string(),
            verified_at: now,
            credential_valid: entry.credential.validity_at(now).valid,
        };

        self.emit(&LedgerEvent::ProofRecorded(record.clone()))?;
        entry.credential.verification_count += 1;
        entry.proofs.push(record.clone());
        self.total_proofs.fetch_add(1, Ordering::SeqCst);

        if record.credential_valid {
            info!(credential = %credential_hash, verifier = %caller, "proof recorded");
        } else {
            warn!(
                credential = %credential_hash,
                verifier = %caller,
                "proof recorded against a credential that is not currently valid"
            );
        }
        Ok(record)
    }

    /// Proof of possession: the holder signed
    /// `"attest-proof:<hash>:<challenge>"`.
    ///
    /// On success the proof is logged through [`verify_proof`] with the
    /// SHA-256 of the signed message as its proof hash.
    ///
    /// [`verify_proof`]: Self::verify_proof
    pub fn verify_signed_proof(
        &self,
        caller: &Address,
        credential_hash: &Hash256,
        challenge: &str,
        signature: &str,
    ) -> RegistryResult<ProofRecord> {
        let holder = self
            .credentials
            .get(credential_hash)
            .map(|entry| entry.credential.holder)
            .ok_or_else(|| RegistryError::not_found("credential", credential_hash))?;

        let message = proof_message(credential_hash, challenge);
        if !verify_signature_for(message.as_bytes(), signature, &holder) {
            debug!(credential = %credential_hash, "signed proof does not recover to holder");
            return Err(RegistryError::InvalidProof(
                "signature does not match the credential holder".into(),
            ));
        }

        let proof_hash = compute_proof_hash(message.as_bytes());
        self.verify_proof(caller, credential_hash, proof_hash, challenge)
    }

    /// Revoke a credential. Only its issuer may, and only once.
    pub fn revoke_credential(
        &self,
        caller: &Address,
        credential_hash: &Hash256,
        reason: &str,
    ) -> RegistryResult<Credential> {
        let mut entry = self
            .credentials
            .get_mut(credential_hash)
            .ok_or_else(|| RegistryError::not_found("credential", credential_hash))?;

        if entry.credential.issuer != *caller {
            debug!(credential = %credential_hash, caller = %caller, "revocation by non-issuer refused");
            return Err(RegistryError::Unauthorized(format!(
                "{} did not issue {}",
                caller, credential_hash
            )));
        }
        if entry.credential.revoked {
            debug!(credential = %credential_hash, "credential already revoked");
            return Err(RegistryError::AlreadyRevoked(*credential_hash));
        }

        let mut updated = entry.credential.clone();
        updated.revoked = true;
        updated.revocation_reason = Some(reason.to_string());
        updated.revoked_at = Some(self.clock.now());

        self.emit(&LedgerEvent::CredentialRevoked(updated.clone()))?;
        entry.credential = updated.clone();

        info!(credential = %credential_hash, reason, "credential revoked");
        Ok(updated)
    }

    // -- Queries ------------------------------------------------------------

    /// Validity right now. Unknown hashes report all `false`; this query
    /// never fails.
    pub fn check_credential_validity(&self, credential_hash: &Hash256) -> Validity {
        let now = self.clock.now();
        self.credentials
            .get(credential_hash)
            .map(|entry| entry.credential.validity_at(now))
            .unwrap_or_default()
    }

    pub fn credential_status(&self, credential_hash: &Hash256) -> RegistryResult<CredentialStatus> {
        let now = self.clock.now();
        self.credentials
            .get(credential_hash)
            .map(|entry| entry.credential.status_at(now))
            .ok_or_else(|| RegistryError::not_found("credential", credential_hash))
    }

    pub fn get_credential_details(&self, credential_hash: &Hash256) -> RegistryResult<Credential> {
        self.credentials
            .get(credential_hash)
            .map(|entry| entry.credential.clone())
            .ok_or_else(|| RegistryError::not_found("credential", credential_hash))
    }

    /// The audit trail for one credential, oldest first.
    pub fn get_credential_proofs(
        &self,
        credential_hash: &Hash256,
    ) -> RegistryResult<Vec<ProofRecord>> {
        self.credentials
            .get(credential_hash)
            .map(|entry| entry.proofs.clone())
            .ok_or_else(|| RegistryError::not_found("credential", credential_hash))
    }

    /// Hashes of credentials held by `holder`, in issuance order.
    pub fn get_credentials_by_holder(&self, holder: &Address) -> Vec<Hash256> {
        self.by_holder
            .read()
            .get(holder)
            .cloned()
            .unwrap_or_default()
    }

    /// Hashes of credentials issued by `issuer`, in issuance order.
    pub fn get_credentials_by_issuer(&self, issuer: &Address) -> Vec<Hash256> {
        self.by_issuer
            .read()
            .get(issuer)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_total_credentials(&self) -> u64 {
        self.total_credentials.load(Ordering::SeqCst)
    }

    pub fn get_total_proofs(&self) -> u64 {
        self.total_proofs.load(Ordering::SeqCst)
    }

    // -- Replay -------------------------------------------------------------

    pub(crate) fn replay(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::CredentialIssued(credential) => {
                if let MapEntry::Vacant(slot) = self.credentials.entry(credential.hash) {
                    self.index(credential);
                    slot.insert(Entry {
                        credential: credential.clone(),
                        proofs: Vec::new(),
                    });
                    self.total_credentials.fetch_add(1, Ordering::SeqCst);
                }
            }
            LedgerEvent::ProofRecorded(record) => {
                if let Some(mut entry) = self.credentials.get_mut(&record.credential_hash) {
                    entry.credential.verification_count += 1;
                    entry.proofs.push(record.clone());
                    self.total_proofs.fetch_add(1, Ordering::SeqCst);
                }
            }
            LedgerEvent::CredentialRevoked(credential) => {
                if let Some(mut entry) = self.credentials.get_mut(&credential.hash) {
                    entry.credential = credential.clone();
                }
            }
            _ => {}
        }
    }
}

impl fmt::Debug for CredentialRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRegistry")
            .field("credentials", &self.get_total_credentials())
            .field("proofs", &self.get_total_proofs())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use attest_protocol::crypto::{sign_message, Keypair};
    use attest_protocol::time::ManualClock;
    use chrono::Duration;

    struct Fixture {
        clock: Arc<ManualClock>,
        issuers: Arc<IssuerRegistry>,
        registry: CredentialRegistry,
        issuer: Keypair,
        holder: Keypair,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let authority = Keypair::from_seed(&[0xA0; 32]);
        let issuer = Keypair::from_seed(&[0x11; 32]);
        let holder = Keypair::from_seed(&[0x22; 32]);

        let issuers = Arc::new(IssuerRegistry::new(authority.address(), clock.clone()));
        issuers
            .register_issuer(&issuer.address(), "Test University", "did:web:test.edu", "")
            .unwrap();
        issuers
            .verify_issuer(&authority.address(), &issuer.address())
            .unwrap();

        let registry = CredentialRegistry::new(issuers.clone(), clock.clone());
        Fixture {
            clock,
            issuers,
            registry,
            issuer,
            holder,
        }
    }

    fn degree(holder: &Keypair, expires_at: Option<DateTime<Utc>>) -> IssueRequest {
        IssueRequest {
            holder: holder.address(),
            credential_type: "DEGREE".into(),
            expires_at,
            metadata_uri: "ipfs://degree".into(),
        }
    }

    #[test]
    fn issue_creates_active_credential() {
        let f = fixture();
        let hash = f
            .registry
            .issue_credential(&f.issuer.address(), degree(&f.holder, None))
            .unwrap();

        let c = f.registry.get_credential_details(&hash).unwrap();
        assert_eq!(c.hash, hash);
        assert!(!c.revoked);
        assert_eq!(c.issued_at, f.clock.now());
        assert_eq!(
            hash,
            compute_credential_hash(
                &f.holder.address(),
                &f.issuer.address(),
                "DEGREE",
                f.clock.now(),
                "ipfs://degree"
            )
        );
        assert_eq!(f.registry.credential_status(&hash).unwrap(), CredentialStatus::Active);
        assert_eq!(f.registry.get_total_credentials(), 1);
    }

    #[test]
    fn unverified_issuer_is_unauthorized() {
        let f = fixture();
        let stranger = Keypair::from_seed(&[0x33; 32]);
        f.issuers
            .register_issuer(&stranger.address(), "Diploma Mill", "did:web:mill", "")
            .unwrap();
        let err = f
            .registry
            .issue_credential(&stranger.address(), degree(&f.holder, None))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized(_)));
        assert_eq!(f.registry.get_total_credentials(), 0);
    }

    #[test]
    fn expiry_must_be_strictly_in_the_future() {
        let f = fixture();
        for expires_at in [f.clock.now(), f.clock.now() - Duration::seconds(1)] {
            let err = f
                .registry
                .issue_credential(&f.issuer.address(), degree(&f.holder, Some(expires_at)))
                .unwrap_err();
            assert!(matches!(err, RegistryError::InvalidExpiry { .. }));
        }
        assert!(f
            .registry
            .issue_credential(
                &f.issuer.address(),
                degree(&f.holder, Some(f.clock.now() + Duration::seconds(1)))
            )
            .is_ok());
    }

    #[test]
    fn identical_content_in_same_second_is_duplicate() {
        let f = fixture();
        let first = f
            .registry
            .issue_credential(&f.issuer.address(), degree(&f.holder, None))
            .unwrap();
        let err = f
            .registry
            .issue_credential(&f.issuer.address(), degree(&f.holder, None))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateCredential(h) if h == first));
        assert_eq!(f.registry.get_total_credentials(), 1);

        // A second later the content hash differs.
        f.clock.advance(Duration::seconds(1));
        let second = f
            .registry
            .issue_credential(&f.issuer.address(), degree(&f.holder, None))
            .unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn expiry_flips_validity_without_writes() {
        let f = fixture();
        let expires = f.clock.now() + Duration::days(30);
        let hash = f
            .registry
            .issue_credential(&f.issuer.address(), degree(&f.holder, Some(expires)))
            .unwrap();
        assert!(f.registry.check_credential_validity(&hash).valid);

        f.clock.set(expires - Duration::seconds(1));
        assert!(f.registry.check_credential_validity(&hash).valid);

        f.clock.set(expires);
        let v = f.registry.check_credential_validity(&hash);
        assert_eq!(
            v,
            Validity {
                exists: true,
                valid: false,
                revoked: false,
                expired: true
            }
        );
        assert_eq!(f.registry.credential_status(&hash).unwrap(), CredentialStatus::Expired);
    }

    #[test]
    fn revoked_dominates_expired() {
        let f = fixture();
        let hash = f
            .registry
            .issue_credential(
                &f.issuer.address(),
                degree(&f.holder, Some(f.clock.now() + Duration::days(1))),
            )
            .unwrap();
        f.registry
            .revoke_credential(&f.issuer.address(), &hash, "error")
            .unwrap();
        f.clock.advance(Duration::days(2));

        let v = f.registry.check_credential_validity(&hash);
        assert!(v.revoked && v.expired && !v.valid);
        assert_eq!(f.registry.credential_status(&hash).unwrap(), CredentialStatus::Revoked);
    }

    #[test]
    fn revocation_rules() {
        let f = fixture();
        let hash = f
            .registry
            .issue_credential(&f.issuer.address(), degree(&f.holder, None))
            .unwrap();

        // The holder can't revoke what the issuer issued.
        assert!(matches!(
            f.registry.revoke_credential(&f.holder.address(), &hash, "mine"),
            Err(RegistryError::Unauthorized(_))
        ));

        let revoked = f
            .registry
            .revoke_credential(&f.issuer.address(), &hash, "error")
            .unwrap();
        assert!(revoked.revoked);
        assert_eq!(revoked.revocation_reason.as_deref(), Some("error"));
        assert_eq!(revoked.revoked_at, Some(f.clock.now()));

        assert!(matches!(
            f.registry.revoke_credential(&f.issuer.address(), &hash, "again"),
            Err(RegistryError::AlreadyRevoked(h)) if h == hash
        ));
        // The first reason sticks.
        let c = f.registry.get_credential_details(&hash).unwrap();
        assert_eq!(c.revocation_reason.as_deref(), Some("error"));
    }

    #[test]
    fn unknown_hash_behaviour() {
        let f = fixture();
        let missing = Hash256::from_bytes([0x99; 32]);
        assert_eq!(f.registry.check_credential_validity(&missing), Validity::default());
        assert!(matches!(
            f.registry.get_credential_details(&missing),
            Err(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            f.registry
                .verify_proof(&f.holder.address(), &missing, Hash256::ZERO, ""),
            Err(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            f.registry.revoke_credential(&f.issuer.address(), &missing, "x"),
            Err(RegistryError::NotFound { .. })
        ));
        assert!(f.registry.get_credential_proofs(&missing).is_err());
        assert_eq!(f.registry.get_total_proofs(), 0);
    }

    #[test]
    fn proofs_are_logged_even_against_revoked_credentials() {
        let f = fixture();
        let verifier = Keypair::from_seed(&[0x44; 32]);
        let hash = f
            .registry
            .issue_credential(&f.issuer.address(), degree(&f.holder, None))
            .unwrap();

        let p1 = f
            .registry
            .verify_proof(&verifier.address(), &hash, compute_proof_hash(b"one"), "{}")
            .unwrap();
        assert!(p1.credential_valid);

        f.registry
            .revoke_credential(&f.issuer.address(), &hash, "error")
            .unwrap();
        let p2 = f
            .registry
            .verify_proof(&verifier.address(), &hash, compute_proof_hash(b"two"), "{}")
            .unwrap();
        assert!(!p2.credential_valid);

        assert_eq!(f.registry.get_total_proofs(), 2);
        assert_eq!(f.registry.get_credential_details(&hash).unwrap().verification_count, 2);
        let trail = f.registry.get_credential_proofs(&hash).unwrap();
        assert_eq!(trail, vec![p1, p2]);
    }

    #[test]
    fn signed_proof_of_possession() {
        let f = fixture();
        let verifier = Keypair::from_seed(&[0x44; 32]);
        let hash = f
            .registry
            .issue_credential(&f.issuer.address(), degree(&f.holder, None))
            .unwrap();

        let message = proof_message(&hash, "nonce-1");
        let signature = sign_message(&f.holder, message.as_bytes());
        let record = f
            .registry
            .verify_signed_proof(&verifier.address(), &hash, "nonce-1", &signature)
            .unwrap();
        assert_eq!(record.proof_hash, compute_proof_hash(message.as_bytes()));
        assert_eq!(record.verification_data, "nonce-1");

        // Signed by someone other than the holder.
        let forged = sign_message(&verifier, message.as_bytes());
        assert!(matches!(
            f.registry
                .verify_signed_proof(&verifier.address(), &hash, "nonce-1", &forged),
            Err(RegistryError::InvalidProof(_))
        ));
        // Right signer, different challenge.
        assert!(matches!(
            f.registry
                .verify_signed_proof(&verifier.address(), &hash, "nonce-2", &signature),
            Err(RegistryError::InvalidProof(_))
        ));
        assert_eq!(f.registry.get_total_proofs(), 1);
    }

    #[test]
    fn holder_and_issuer_indexes() {
        let f = fixture();
        let other_holder = Keypair::from_seed(&[0x55; 32]);
        let a = f
            .registry
            .issue_credential(&f.issuer.address(), degree(&f.holder, None))
            .unwrap();
        let b = f
            .registry
            .issue_credential(&f.issuer.address(), degree(&other_holder, None))
            .unwrap();
        f.clock.advance(Duration::seconds(1));
        let c = f
            .registry
            .issue_credential(&f.issuer.address(), degree(&f.holder, None))
            .unwrap();

        assert_eq!(f.registry.get_credentials_by_holder(&f.holder.address()), vec![a, c]);
        assert_eq!(f.registry.get_credentials_by_holder(&other_holder.address()), vec![b]);
        assert_eq!(f.registry.get_credentials_by_issuer(&f.issuer.address()), vec![a, b, c]);
        assert!(f.registry.get_credentials_by_issuer(&f.holder.address()).is_empty());
    }

    #[test]
    fn totals_never_decrease_on_revocation() {
        let f = fixture();
        let hash = f
            .registry
            .issue_credential(&f.issuer.address(), degree(&f.holder, None))
            .unwrap();
        f.registry
            .revoke_credential(&f.issuer.address(), &hash, "error")
            .unwrap();
        assert_eq!(f.registry.get_total_credentials(), 1);
    }
}
