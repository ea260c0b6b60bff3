//! # Ledger Journal
//!
//! The durable [`EventSink`]: every event goes into the sled event log and
//! its record is upserted into the matching table, in one transaction.
//!
//! | Event                                   | Table         | Row key                    |
//! |-----------------------------------------|---------------|----------------------------|
//! | `IssuerRegistered`, `IssuerVerified`    | `issuers`     | address bytes              |
//! | `DidCreated`, `DidUpdated`              | `dids`        | DID string                 |
//! | `CredentialIssued`, `CredentialRevoked` | `credentials` | credential hash            |
//! | `ProofRecorded`                         | `proofs`      | credential hash ‖ id (BE)  |
//!
//! The `credentials` row is rewritten on issuance and revocation only, so
//! its `verification_count` can trail the `proofs` table. The event log is
//! authoritative; replay gets the count right.

use attest_protocol::crypto::Hash256;
use attest_protocol::identity::Address;
use attest_protocol::storage::{encode, DbResult, LedgerDb, RowWrite, Table};
use tracing::error;

use crate::credential_registry::{Credential, ProofRecord};
use crate::did_registry::DidRecord;
use crate::events::{EventSink, LedgerEvent, SinkError};
use crate::issuer_registry::Issuer;

#[derive(Debug, Clone)]
pub struct LedgerJournal {
    db: LedgerDb,
}

impl LedgerJournal {
    pub fn new(db: LedgerDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &LedgerDb {
        &self.db
    }

    /// The whole event log in append order.
    pub fn load_events(&self) -> DbResult<Vec<LedgerEvent>> {
        Ok(self
            .db
            .events::<LedgerEvent>()?
            .into_iter()
            .map(|(_, event)| event)
            .collect())
    }

    pub fn issuer(&self, address: &Address) -> DbResult<Option<Issuer>> {
        self.db.get(Table::Issuers, address.as_bytes())
    }

    pub fn did(&self, did: &str) -> DbResult<Option<DidRecord>> {
        self.db.get(Table::Dids, did.as_bytes())
    }

    pub fn credential(&self, hash: &Hash256) -> DbResult<Option<Credential>> {
        self.db.get(Table::Credentials, hash.as_bytes())
    }

    /// Persisted proofs for one credential, oldest first.
    pub fn proofs(&self, credential_hash: &Hash256) -> DbResult<Vec<ProofRecord>> {
        self.db.scan_prefix(Table::Proofs, credential_hash.as_bytes())
    }

    fn write(&self, event: &LedgerEvent) -> DbResult<u64> {
        let encoded = encode(event)?;
        let (table, key, row) = match event {
            LedgerEvent::IssuerRegistered(issuer) | LedgerEvent::IssuerVerified(issuer) => (
                Table::Issuers,
                issuer.address.as_bytes().to_vec(),
                encode(issuer)?,
            ),
            LedgerEvent::DidCreated(record) | LedgerEvent::DidUpdated(record) => (
                Table::Dids,
                record.did.as_str().as_bytes().to_vec(),
                encode(record)?,
            ),
            LedgerEvent::CredentialIssued(credential)
            | LedgerEvent::CredentialRevoked(credential) => (
                Table::Credentials,
                credential.hash.as_bytes().to_vec(),
                encode(credential)?,
            ),
            LedgerEvent::ProofRecorded(proof) => {
                let mut key = proof.credential_hash.as_bytes().to_vec();
                key.extend_from_slice(&self.db.next_id()?.to_be_bytes());
                (Table::Proofs, key, encode(proof)?)
            }
        };

        self.db.append(
            &encoded,
            RowWrite {
                table,
                key: &key,
                value: &row,
            },
        )
    }
}

impl EventSink for LedgerJournal {
    fn record(&self, event: &LedgerEvent) -> Result<(), SinkError> {
        self.write(event).map(|_| ()).map_err(|e| {
            error!(event = event.kind(), error = %e, "failed to journal event");
            SinkError::new(e.to_string())
        })
    }
}
