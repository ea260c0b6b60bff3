//! # Engine Client
//!
//! Typed HTTP client for a running `attest-node`. Built from an explicit
//! [`ClientConfig`]; there is no ambient default endpoint.
//!
//! Write calls are wrapped in a [`SignedCall`] signed by the configured
//! keypair. Read calls need no key. API errors come back as
//! [`ClientError::Api`] carrying the server's status and error code.

use std::time::Duration;

use attest_contracts::{
    Credential, CredentialStatus, DidRecord, EngineStats, IssueRequest, Issuer, ProofRecord,
    Validity,
};
use attest_protocol::crypto::{Hash256, Keypair};
use attest_protocol::identity::{Address, DidDocument};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::api::{
    CreateDidParams, ErrorResponse, HealthResponse, IssueResponse, RegisterIssuerParams,
    RevokeCredentialParams, RotateKeyParams, SignedProofParams, StatusResponse,
    UpdateEndpointsParams, VerifyIssuerParams, VerifyProofParams,
};
use crate::auth::{ops, SignedCall};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{status} {code}: {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("a keypair is required to sign {0}")]
    MissingKeypair(&'static str),

    #[error("failed to encode params: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    /// The server's error code, if the server answered with one.
    #[allow(dead_code)]
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `http://127.0.0.1:9841`.
    pub endpoint: String,
    /// Signs write calls. Read-only clients leave this empty.
    pub keypair: Option<Keypair>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            keypair: None,
            timeout: Duration::from_secs(10),
        }
    }

    #[allow(dead_code)]
    pub fn with_keypair(mut self, keypair: Keypair) -> Self {
        self.keypair = Some(keypair);
        self
    }
}

#[derive(Debug, Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
    keypair: Option<Keypair>,
}

// The binary only drives the read side; the write side is the library
// surface other tools embed.
#[allow(dead_code)]
impl EngineClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            keypair: config.keypair,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let body = response.text().await?;
        Err(match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => ClientError::Api {
                status,
                code: err.code,
                message: err.error,
            },
            Err(_) => ClientError::Api {
                status,
                code: "HTTP".into(),
                message: body,
            },
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.http.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn post_signed<P: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        operation: &'static str,
        params: &P,
    ) -> ClientResult<T> {
        let keypair = self
            .keypair
            .as_ref()
            .ok_or(ClientError::MissingKeypair(operation))?;
        let call = SignedCall::sign(keypair, operation, params)?;
        let response = self.http.post(self.url(path)).json(&call).send().await?;
        Self::decode(response).await
    }

    // -- Reads --------------------------------------------------------------

    pub async fn health(&self) -> ClientResult<HealthResponse> {
        self.get("/health").await
    }

    pub async fn stats(&self) -> ClientResult<EngineStats> {
        self.get("/stats").await
    }

    pub async fn issuer(&self, address: &Address) -> ClientResult<Issuer> {
        self.get(&format!("/issuers/{address}")).await
    }

    pub async fn verified_issuers(&self) -> ClientResult<Vec<Issuer>> {
        self.get("/issuers/verified").await
    }

    pub async fn resolve_did(&self, did: &str) -> ClientResult<DidRecord> {
        self.get(&format!("/dids/{did}")).await
    }

    pub async fn resolve_document(&self, did: &str) -> ClientResult<DidDocument> {
        self.get(&format!("/dids/{did}/document")).await
    }

    pub async fn credential(&self, hash: &Hash256) -> ClientResult<Credential> {
        self.get(&format!("/credentials/{hash}")).await
    }

    pub async fn validity(&self, hash: &Hash256) -> ClientResult<Validity> {
        self.get(&format!("/credentials/{hash}/validity")).await
    }

    pub async fn status(&self, hash: &Hash256) -> ClientResult<CredentialStatus> {
        let resp: StatusResponse = self.get(&format!("/credentials/{hash}/status")).await?;
        Ok(resp.status)
    }

    pub async fn proofs(&self, hash: &Hash256) -> ClientResult<Vec<ProofRecord>> {
        self.get(&format!("/credentials/{hash}/proofs")).await
    }

    pub async fn credentials_by_holder(&self, holder: &Address) -> ClientResult<Vec<Hash256>> {
        self.get(&format!("/holders/{holder}/credentials")).await
    }

    pub async fn credentials_by_issuer(&self, issuer: &Address) -> ClientResult<Vec<Hash256>> {
        self.get(&format!("/issuers/{issuer}/credentials")).await
    }

    // -- Writes -------------------------------------------------------------

    /// Register the configured keypair's address as an issuer.
    pub async fn register_issuer(
        &self,
        name: &str,
        did: &str,
        metadata_uri: &str,
    ) -> ClientResult<Issuer> {
        let params = RegisterIssuerParams {
            name: name.into(),
            did: did.into(),
            metadata_uri: metadata_uri.into(),
        };
        self.post_signed("/issuers", ops::REGISTER_ISSUER, &params)
            .await
    }

    pub async fn verify_issuer(&self, issuer: &Address) -> ClientResult<Issuer> {
        let params = VerifyIssuerParams { issuer: *issuer };
        self.post_signed("/issuers/verify", ops::VERIFY_ISSUER, &params)
            .await
    }

    pub async fn create_did(&self, params: &CreateDidParams) -> ClientResult<DidRecord> {
        self.post_signed("/dids", ops::CREATE_DID, params).await
    }

    pub async fn rotate_key(&self, did: &str, new_public_key: &str) -> ClientResult<DidRecord> {
        let params = RotateKeyParams {
            did: did.into(),
            new_public_key: new_public_key.into(),
        };
        self.post_signed("/dids/rotate", ops::ROTATE_KEY, &params)
            .await
    }

    pub async fn update_service_endpoints(
        &self,
        did: &str,
        service_endpoints: Vec<String>,
    ) -> ClientResult<DidRecord> {
        let params = UpdateEndpointsParams {
            did: did.into(),
            service_endpoints,
        };
        self.post_signed("/dids/endpoints", ops::UPDATE_SERVICE_ENDPOINTS, &params)
            .await
    }

    pub async fn issue_credential(&self, request: &IssueRequest) -> ClientResult<Hash256> {
        let resp: IssueResponse = self
            .post_signed("/credentials", ops::ISSUE_CREDENTIAL, request)
            .await?;
        Ok(resp.credential_hash)
    }

    pub async fn revoke_credential(&self, hash: &Hash256, reason: &str) -> ClientResult<Credential> {
        let params = RevokeCredentialParams {
            credential_hash: *hash,
            reason: reason.into(),
        };
        self.post_signed("/credentials/revoke", ops::REVOKE_CREDENTIAL, &params)
            .await
    }

    pub async fn verify_proof(
        &self,
        hash: &Hash256,
        proof_hash: Hash256,
        verification_data: &str,
    ) -> ClientResult<ProofRecord> {
        let params = VerifyProofParams {
            credential_hash: *hash,
            proof_hash,
            verification_data: verification_data.into(),
        };
        self.post_signed("/proofs", ops::VERIFY_PROOF, &params).await
    }

    pub async fn verify_signed_proof(
        &self,
        hash: &Hash256,
        challenge: &str,
        holder_signature: &str,
    ) -> ClientResult<ProofRecord> {
        let params = SignedProofParams {
            credential_hash: *hash,
            challenge: challenge.into(),
            signature: holder_signature.into(),
        };
        self.post_signed("/proofs/signed", ops::VERIFY_SIGNED_PROOF, &params)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{create_router, AppState};
    use crate::metrics::NodeMetrics;
    use attest_contracts::Engine;
    use attest_protocol::crypto::sign_message;
    use attest_protocol::proof::{compute_proof_hash, proof_message};
    use attest_protocol::time::ManualClock;
    use std::sync::Arc;

    /// Serve a fresh engine on an ephemeral port.
    async fn spawn_node(authority: &Keypair) -> String {
        let engine = Engine::builder(authority.address())
            .clock(Arc::new(ManualClock::at_unix(1_735_689_600)))
            .build();
        let state = AppState {
            version: "test".into(),
            engine: Arc::new(engine),
            metrics: Arc::new(NodeMetrics::new().unwrap()),
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(endpoint: &str, keypair: &Keypair) -> EngineClient {
        EngineClient::new(ClientConfig::new(endpoint).with_keypair(keypair.clone())).unwrap()
    }

    #[tokio::test]
    async fn full_lifecycle_through_the_client() {
        let authority_key = Keypair::from_seed(&[0xAA; 32]);
        let endpoint = spawn_node(&authority_key).await;
        let issuer_key = Keypair::from_seed(&[0x01; 32]);
        let holder_key = Keypair::from_seed(&[0x02; 32]);
        let verifier_key = Keypair::from_seed(&[0x03; 32]);

        let authority = client(&endpoint, &authority_key);
        let issuer = client(&endpoint, &issuer_key);
        let verifier = client(&endpoint, &verifier_key);

        assert_eq!(issuer.health().await.unwrap().status, "ok");

        issuer
            .register_issuer("Test University", "did:web:test-university.edu", "")
            .await
            .unwrap();
        authority.verify_issuer(&issuer_key.address()).await.unwrap();
        assert_eq!(issuer.verified_issuers().await.unwrap().len(), 1);

        let hash = issuer
            .issue_credential(&IssueRequest {
                holder: holder_key.address(),
                credential_type: "DEGREE".into(),
                expires_at: None,
                metadata_uri: "ipfs://QmDegree".into(),
            })
            .await
            .unwrap();
        assert!(issuer.validity(&hash).await.unwrap().valid);

        verifier
            .verify_proof(&hash, compute_proof_hash(b"vp"), "hiring")
            .await
            .unwrap();
        let holder_sig = sign_message(&holder_key, proof_message(&hash, "n-1").as_bytes());
        verifier
            .verify_signed_proof(&hash, "n-1", &holder_sig)
            .await
            .unwrap();
        assert_eq!(verifier.proofs(&hash).await.unwrap().len(), 2);

        issuer.revoke_credential(&hash, "error").await.unwrap();
        assert_eq!(issuer.status(&hash).await.unwrap(), CredentialStatus::Revoked);

        let stats = issuer.stats().await.unwrap();
        assert_eq!((stats.issuers, stats.credentials, stats.proofs), (1, 1, 2));
    }

    #[tokio::test]
    async fn api_errors_carry_the_server_code() {
        let authority_key = Keypair::from_seed(&[0xAA; 32]);
        let endpoint = spawn_node(&authority_key).await;
        let stranger = client(&endpoint, &Keypair::from_seed(&[0x09; 32]));

        let err = stranger
            .verify_issuer(&Keypair::generate().address())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("UNAUTHORIZED"));

        let err = stranger
            .credential(&Hash256::from_bytes([1; 32]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Api { status, .. } if status == StatusCode::NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn writes_need_a_keypair() {
        let read_only = EngineClient::new(ClientConfig::new("http://127.0.0.1:9")).unwrap();
        let err = read_only
            .revoke_credential(&Hash256::ZERO, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingKeypair("revoke_credential")));
    }
}
