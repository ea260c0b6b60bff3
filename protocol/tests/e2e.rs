//! End-to-end tests for the ATTEST protocol primitives.
//!
//! These compose the pieces a registry relies on: key generation, address
//! and DID derivation, DID document rendering, credential hashing, holder
//! proof signatures, and the ledger database across a reopen.
//!
//! Each test stands alone with its own keys and temporary storage.

use attest_protocol::crypto::{sign_message, Keypair, SignatureEnvelope};
use attest_protocol::identity::{Address, Did, DidDocument, DocumentSource};
use attest_protocol::proof::{
    compute_credential_hash, compute_proof_hash, proof_message, recover_signer, verify_signature,
};
use attest_protocol::storage::{LedgerDb, RowWrite, Table};
use attest_protocol::time::{Clock, ManualClock};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[test]
fn key_to_address_to_did_document() {
    let keypair = Keypair::from_seed(&[0x21; 32]);
    let address = keypair.address();
    let did = Did::for_address(&address);
    assert_eq!(did.method(), "attest");
    assert_eq!(did.method_specific_id(), address.to_hex());

    let clock = ManualClock::at_unix(1_735_689_600);
    let endpoints = vec!["https://wallet.example/inbox".to_string()];
    let doc = DidDocument::render(DocumentSource {
        did: &did,
        owner: &address,
        public_key: &keypair.public_key(),
        key_version: 1,
        service_endpoints: &endpoints,
        created: clock.now(),
        updated: clock.now(),
    });

    let json = serde_json::to_value(&doc).unwrap();
    assert_eq!(json["id"], did.as_str());
    assert_eq!(json["verificationMethod"][0]["id"], format!("{}#key-1", did.as_str()));
    assert_eq!(json["service"][0]["serviceEndpoint"], endpoints[0]);
}

// ---------------------------------------------------------------------------
// Proofs
// ---------------------------------------------------------------------------

#[test]
fn holder_answers_a_challenge() {
    let issuer = Keypair::from_seed(&[0x01; 32]);
    let holder = Keypair::from_seed(&[0x02; 32]);
    let clock = ManualClock::at_unix(1_735_689_600);

    let hash = compute_credential_hash(
        &holder.address(),
        &issuer.address(),
        "DEGREE",
        clock.now(),
        "ipfs://QmDegree",
    );

    let message = proof_message(&hash, "verifier-nonce");
    let signature = sign_message(&holder, message.as_bytes());

    assert_eq!(recover_signer(message.as_bytes(), &signature), Some(holder.address()));
    assert!(verify_signature(
        message.as_bytes(),
        &signature,
        &holder.address().to_hex()
    ));
    // Same signature, different challenge: rejected.
    let replayed = proof_message(&hash, "other-nonce");
    assert!(!verify_signature(
        replayed.as_bytes(),
        &signature,
        &holder.address().to_hex()
    ));
}

#[test]
fn envelope_survives_hex_transport() {
    let keypair = Keypair::generate();
    let envelope = SignatureEnvelope::sign(&keypair, b"payload");
    let parsed = SignatureEnvelope::from_hex(&envelope.to_hex()).unwrap();
    assert_eq!(parsed.recover(b"payload").unwrap(), keypair.address());
}

#[test]
fn proof_hash_is_content_addressed() {
    let a = compute_proof_hash(b"presentation-a");
    let b = compute_proof_hash(b"presentation-b");
    assert_ne!(a, b);
    assert_eq!(a, compute_proof_hash(b"presentation-a"));
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Row {
    owner: Address,
    note: String,
}

#[test]
fn ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let owner = Keypair::from_seed(&[0x03; 32]).address();
    let row = Row {
        owner,
        note: "first".into(),
    };

    {
        let db = LedgerDb::open(dir.path()).unwrap();
        let event = attest_protocol::storage::encode(&"created".to_string()).unwrap();
        let value = attest_protocol::storage::encode(&row).unwrap();
        db.append(
            &event,
            RowWrite {
                table: Table::Dids,
                key: b"did:attest:x",
                value: &value,
            },
        )
        .unwrap();
        db.flush().unwrap();
    }

    let db = LedgerDb::open(dir.path()).unwrap();
    let events: Vec<(u64, String)> = db.events().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1, "created");
    assert_eq!(db.get::<Row>(Table::Dids, b"did:attest:x").unwrap(), Some(row));
}
