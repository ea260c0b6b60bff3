//! # Decentralized Identifiers
//!
//! Syntax checking for W3C DIDs and rendering of DID Documents from a
//! registered key.
//!
//! ## DID Format
//!
//! ```text
//! did:<method>:<method-specific-id>
//! ```
//!
//! The registry accepts DIDs of *any* method (`did:attest:...`,
//! `did:web:example.com`, `did:key:z6Mk...`), because the record owner
//! supplies the key material directly. What we do enforce is the DID Core
//! ABNF, loosely: the method is lowercase alphanumeric and the identifier
//! is non-empty, made of `ALPHA / DIGIT / "." / "-" / "_" / ":" / "%"`,
//! and doesn't end in a colon.
//!
//! ## DID Document
//!
//! [`DidDocument::render`] produces:
//!
//! - `@context`: DID Core + Ed25519-2020 suite
//! - `id`, `controller`
//! - `verificationMethod`: the current key as `publicKeyMultibase`
//! - `authentication`, `assertionMethod`: references to that key
//! - `service`: one `LinkedDomains` entry per registered endpoint
//!
//! ## Standards References
//!
//! - [DID Core v1.0](https://www.w3.org/TR/did-core/)
//! - [Ed25519VerificationKey2020](https://w3c-ccg.github.io/di-eddsa-2020/)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{DID_CONTEXT, DID_METHOD, ED25519_CONTEXT, ED25519_MULTICODEC};
use crate::crypto::keys::PublicKey;
use crate::identity::address::Address;

/// Verification method type for Ed25519 public keys.
const VERIFICATION_KEY_TYPE: &str = "Ed25519VerificationKey2020";

/// Service type used for registered endpoints.
const SERVICE_TYPE: &str = "LinkedDomains";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DidError {
    /// Not of the shape `did:<method>:<id>`.
    #[error("invalid DID format: {0}")]
    InvalidFormat(String),

    #[error("invalid DID method '{0}': must be lowercase alphanumeric")]
    InvalidMethod(String),

    #[error("invalid method-specific identifier: {0}")]
    InvalidIdentifier(String),
}

// ---------------------------------------------------------------------------
// Did
// ---------------------------------------------------------------------------

/// A syntactically valid DID string.
///
/// ```
/// use attest_protocol::identity::Did;
///
/// let did: Did = "did:web:university.example".parse().unwrap();
/// assert_eq!(did.method(), "web");
/// assert_eq!(did.method_specific_id(), "university.example");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    pub fn parse(s: &str) -> Result<Self, DidError> {
        let mut parts = s.splitn(3, ':');
        let (Some(scheme), Some(method), Some(id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DidError::InvalidFormat(
                "DID must have format 'did:<method>:<identifier>'".into(),
            ));
        };

        if scheme != "did" {
            return Err(DidError::InvalidFormat(format!(
                "expected 'did' prefix, got '{}'",
                scheme
            )));
        }

        if method.is_empty()
            || !method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(DidError::InvalidMethod(method.to_string()));
        }

        if id.is_empty() {
            return Err(DidError::InvalidIdentifier("identifier is empty".into()));
        }
        if id.ends_with(':') {
            return Err(DidError::InvalidIdentifier(
                "identifier must not end with ':'".into(),
            ));
        }
        if let Some(bad) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '%')))
        {
            return Err(DidError::InvalidIdentifier(format!(
                "unexpected character {:?}",
                bad
            )));
        }

        Ok(Self(s.to_string()))
    }

    /// Mint a `did:attest:<address>` identifier for an account.
    pub fn for_address(address: &Address) -> Self {
        Self(format!("did:{}:{}", DID_METHOD, address))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn method(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }

    pub fn method_specific_id(&self) -> &str {
        self.0.splitn(3, ':').nth(2).unwrap_or_default()
    }
}

impl FromStr for Did {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Did {
    type Error = DidError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Multibase (base58btc, `z` prefix) encoding of an Ed25519 key with its
/// multicodec header, as used by `publicKeyMultibase`.
pub fn public_key_multibase(public_key: &PublicKey) -> String {
    let mut bytes = ED25519_MULTICODEC.to_vec();
    bytes.extend_from_slice(public_key.as_bytes());
    format!("z{}", bs58::encode(&bytes).into_string())
}

// ---------------------------------------------------------------------------
// DID Document Types
// ---------------------------------------------------------------------------

/// A W3C DID Document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    pub id: String,

    /// The DID of the controlling account (`did:attest:<owner>`).
    pub controller: String,

    #[serde(rename = "verificationMethod")]
    pub verification_method: Vec<VerificationMethod>,

    pub authentication: Vec<String>,

    #[serde(rename = "assertionMethod")]
    pub assertion_method: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<ServiceEndpoint>,

    pub created: DateTime<Utc>,

    pub updated: DateTime<Utc>,
}

/// A verification method entry in a DID Document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationMethod {
    pub id: String,

    #[serde(rename = "type")]
    pub type_: String,

    pub controller: String,

    #[serde(rename = "publicKeyMultibase")]
    pub public_key_multibase: String,
}

/// A `service` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub id: String,

    #[serde(rename = "type")]
    pub type_: String,

    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

/// Everything needed to render a document. Borrowed so callers holding a
/// registry read guard don't have to clone the record first.
#[derive(Debug, Clone, Copy)]
pub struct DocumentSource<'a> {
    pub did: &'a Did,
    pub owner: &'a Address,
    pub public_key: &'a PublicKey,
    /// Key version; becomes the `#key-N` fragment.
    pub key_version: u32,
    pub service_endpoints: &'a [String],
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl DidDocument {
    pub fn render(src: DocumentSource<'_>) -> Self {
        let did_string = src.did.to_string();
        let key_id = format!("{}#key-{}", did_string, src.key_version);

        let service = src
            .service_endpoints
            .iter()
            .enumerate()
            .map(|(i, endpoint)| ServiceEndpoint {
                id: format!("{}#service-{}", did_string, i + 1),
                type_: SERVICE_TYPE.to_string(),
                service_endpoint: endpoint.clone(),
            })
            .collect();

        DidDocument {
            context: vec![DID_CONTEXT.to_string(), ED25519_CONTEXT.to_string()],
            id: did_string.clone(),
            controller: Did::for_address(src.owner).to_string(),
            verification_method: vec![VerificationMethod {
                id: key_id.clone(),
                type_: VERIFICATION_KEY_TYPE.to_string(),
                controller: did_string,
                public_key_multibase: public_key_multibase(src.public_key),
            }],
            authentication: vec![key_id.clone()],
            assertion_method: vec![key_id],
            service,
            created: src.created,
            updated: src.updated,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;

    #[test]
    fn accepts_common_methods() {
        for s in [
            "did:attest:0xabcdef0123456789abcdef0123456789abcdef01",
            "did:web:university.example",
            "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK",
            "did:example:123:456",
            "did:ion:EiClkZMDxPKqC9c-umQfTkR8vvZ9JPhl_xLDI9Nfk38w5w",
        ] {
            assert!(Did::parse(s).is_ok(), "rejected {}", s);
        }
    }

    #[test]
    fn rejects_bad_prefix_and_shape() {
        assert!(matches!(
            Did::parse("notadid:web:x"),
            Err(DidError::InvalidFormat(_))
        ));
        assert!(matches!(Did::parse("did:web"), Err(DidError::InvalidFormat(_))));
        assert!(matches!(Did::parse(""), Err(DidError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_bad_method() {
        assert_eq!(
            Did::parse("did:Web:x"),
            Err(DidError::InvalidMethod("Web".into()))
        );
        assert_eq!(Did::parse("did::x"), Err(DidError::InvalidMethod("".into())));
    }

    #[test]
    fn rejects_bad_identifier() {
        assert!(matches!(
            Did::parse("did:web:"),
            Err(DidError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            Did::parse("did:web:has space"),
            Err(DidError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            Did::parse("did:web:trailing:"),
            Err(DidError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn accessors() {
        let did = Did::parse("did:example:a:b").unwrap();
        assert_eq!(did.method(), "example");
        assert_eq!(did.method_specific_id(), "a:b");
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: Did = serde_json::from_str("\"did:web:x.org\"").unwrap();
        assert_eq!(ok.as_str(), "did:web:x.org");
        assert!(serde_json::from_str::<Did>("\"did:WEB:x\"").is_err());
    }

    #[test]
    fn for_address_uses_attest_method() {
        let kp = Keypair::from_seed(&[1u8; 32]);
        let did = Did::for_address(&kp.address());
        assert_eq!(did.method(), DID_METHOD);
        assert!(Did::parse(did.as_str()).is_ok());
    }

    #[test]
    fn multibase_has_z_prefix_and_decodes() {
        let kp = Keypair::from_seed(&[2u8; 32]);
        let mb = public_key_multibase(&kp.public_key());
        assert!(mb.starts_with('z'));
        let decoded = bs58::decode(&mb[1..]).into_vec().unwrap();
        assert_eq!(&decoded[..2], &ED25519_MULTICODEC);
        assert_eq!(&decoded[2..], kp.public_key().as_bytes());
    }

    #[test]
    fn document_rendering() {
        let kp = Keypair::from_seed(&[5u8; 32]);
        let owner = kp.address();
        let did = Did::parse("did:web:university.example").unwrap();
        let endpoints = vec![
            "https://university.example/credentials".to_string(),
            "https://university.example/status".to_string(),
        ];
        let now = Utc::now();
        let doc = DidDocument::render(DocumentSource {
            did: &did,
            owner: &owner,
            public_key: &kp.public_key(),
            key_version: 2,
            service_endpoints: &endpoints,
            created: now,
            updated: now,
        });

        assert_eq!(doc.id, "did:web:university.example");
        assert_eq!(doc.controller, format!("did:attest:{}", owner));
        assert_eq!(doc.verification_method[0].id, "did:web:university.example#key-2");
        assert_eq!(doc.authentication, vec![doc.verification_method[0].id.clone()]);
        assert_eq!(doc.service.len(), 2);
        assert_eq!(doc.service[1].id, "did:web:university.example#service-2");
        assert_eq!(doc.service[0].service_endpoint, endpoints[0]);

        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("@context").is_some());
        assert!(json["verificationMethod"][0].get("publicKeyMultibase").is_some());
        assert_eq!(json["service"][0]["serviceEndpoint"], endpoints[0]);
    }

    #[test]
    fn document_without_endpoints_omits_service() {
        let kp = Keypair::generate();
        let did = Did::for_address(&kp.address());
        let doc = DidDocument::render(DocumentSource {
            did: &did,
            owner: &kp.address(),
            public_key: &kp.public_key(),
            key_version: 1,
            service_endpoints: &[],
            created: Utc::now(),
            updated: Utc::now(),
        });
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("service").is_none());
    }
}
