//! # REST API
//!
//! Builds the axum router that exposes the registries over HTTP. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                                | Description                       |
//! |--------|-------------------------------------|-----------------------------------|
//! | GET    | `/health`                           | Liveness probe                    |
//! | GET    | `/stats`                            | Totals for all four tables        |
//! | POST   | `/issuers`                          | Register caller as issuer (signed)|
//! | POST   | `/issuers/verify`                   | Grant trust (signed, authority)   |
//! | GET    | `/issuers/verified`                 | Trusted issuers                   |
//! | GET    | `/issuers/:address`                 | Issuer details                    |
//! | GET    | `/issuers/:address/credentials`     | Hashes issued by an issuer        |
//! | POST   | `/dids`                             | Create DID (signed)               |
//! | POST   | `/dids/rotate`                      | Rotate DID key (signed, owner)    |
//! | POST   | `/dids/endpoints`                   | Replace service endpoints (signed)|
//! | GET    | `/dids/:did`                        | DID record                        |
//! | GET    | `/dids/:did/document`               | W3C DID document                  |
//! | GET    | `/owners/:address/dids`             | DIDs owned by an address          |
//! | POST   | `/credentials`                      | Issue credential (signed)         |
//! | POST   | `/credentials/revoke`               | Revoke credential (signed)        |
//! | GET    | `/credentials/:hash`                | Credential details                |
//! | GET    | `/credentials/:hash/validity`       | Validity flags                    |
//! | GET    | `/credentials/:hash/status`         | Active / Expired / Revoked        |
//! | GET    | `/credentials/:hash/proofs`         | Proof audit trail                 |
//! | GET    | `/holders/:address/credentials`     | Hashes held by an address         |
//! | POST   | `/proofs`                           | Record a proof (signed)           |
//! | POST   | `/proofs/signed`                    | Record a holder-signed proof      |
//!
//! Write calls carry a [`SignedCall`](crate::auth::SignedCall) body.

use std::sync::Arc;
use std::time::Instant;

use attest_contracts::{
    Credential, CredentialStatus, DidRecord, Engine, EngineStats, IssueRequest, Issuer,
    ProofRecord, RegistryError, Validity,
};
use attest_protocol::config::MAX_REQUEST_BODY_BYTES;
use attest_protocol::crypto::Hash256;
use attest_protocol::identity::{Address, DidDocument};
use axum::{
    extract::{DefaultBodyLimit, Path, Request, State},
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{ops, SignedCall};
use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub engine: Arc<Engine>,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/issuers", post(register_issuer_handler))
        .route("/issuers/verify", post(verify_issuer_handler))
        .route("/issuers/verified", get(verified_issuers_handler))
        .route("/issuers/:address", get(issuer_handler))
        .route("/issuers/:address/credentials", get(issuer_credentials_handler))
        .route("/dids", post(create_did_handler))
        .route("/dids/rotate", post(rotate_key_handler))
        .route("/dids/endpoints", post(update_endpoints_handler))
        .route("/dids/:did", get(resolve_did_handler))
        .route("/dids/:did/document", get(did_document_handler))
        .route("/owners/:address/dids", get(owner_dids_handler))
        .route("/credentials", post(issue_credential_handler))
        .route("/credentials/revoke", post(revoke_credential_handler))
        .route("/credentials/:hash", get(credential_handler))
        .route("/credentials/:hash/validity", get(validity_handler))
        .route("/credentials/:hash/status", get(status_handler))
        .route("/credentials/:hash/proofs", get(proofs_handler))
        .route("/holders/:address/credentials", get(holder_credentials_handler))
        .route("/proofs", post(verify_proof_handler))
        .route("/proofs/signed", post(verify_signed_proof_handler))
        .layer(middleware::from_fn_with_state(state.clone(), observe))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Records latency for every request and counts rejections by code.
async fn observe(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let response = next.run(request).await;
    state
        .metrics
        .request_latency_seconds
        .observe(started.elapsed().as_secs_f64());
    if let Some(ErrorCode(code)) = response.extensions().get::<ErrorCode>() {
        state.metrics.reject(code);
    }
    response
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error body for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Attached to error responses so the metrics middleware can label them.
#[derive(Debug, Clone, Copy)]
struct ErrorCode(&'static str);

#[derive(Debug)]
pub enum ApiError {
    Registry(RegistryError),
    /// The signature does not recover to the claimed caller.
    BadSignature,
    InvalidParams(String),
    InvalidAddress(String),
    InvalidHash(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Registry(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Registry(err) => match err {
                RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
                RegistryError::Unauthorized(_) => StatusCode::FORBIDDEN,
                RegistryError::DuplicateIssuer(_)
                | RegistryError::DuplicateDid(_)
                | RegistryError::DuplicateCredential(_)
                | RegistryError::AlreadyRevoked(_) => StatusCode::CONFLICT,
                RegistryError::InvalidExpiry { .. }
                | RegistryError::InvalidKey(_)
                | RegistryError::InvalidDid(_)
                | RegistryError::InvalidProof(_) => StatusCode::UNPROCESSABLE_ENTITY,
                RegistryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadSignature => StatusCode::UNAUTHORIZED,
            ApiError::InvalidParams(_) | ApiError::InvalidAddress(_) | ApiError::InvalidHash(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Registry(err) => err.code(),
            ApiError::BadSignature => "BAD_SIGNATURE",
            ApiError::InvalidParams(_) => "INVALID_PARAMS",
            ApiError::InvalidAddress(_) => "INVALID_ADDRESS",
            ApiError::InvalidHash(_) => "INVALID_HASH",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Registry(err) => err.to_string(),
            ApiError::BadSignature => "signature does not match caller".into(),
            ApiError::InvalidParams(msg) => format!("invalid params: {msg}"),
            ApiError::InvalidAddress(msg) => format!("invalid address: {msg}"),
            ApiError::InvalidHash(msg) => format!("invalid hash: {msg}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        if status.is_server_error() {
            tracing::error!(code, error = %self.message(), "request failed");
        } else {
            tracing::debug!(code, error = %self.message(), "request rejected");
        }
        let body = ErrorResponse {
            error: self.message(),
            code: code.to_string(),
        };
        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(ErrorCode(code));
        response
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    Address::parse(raw).map_err(|e| ApiError::InvalidAddress(e.to_string()))
}

fn parse_hash(raw: &str) -> Result<Hash256, ApiError> {
    Hash256::from_hex(raw).map_err(|e| ApiError::InvalidHash(e.to_string()))
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterIssuerParams {
    pub name: String,
    pub did: String,
    #[serde(default)]
    pub metadata_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyIssuerParams {
    pub issuer: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDidParams {
    pub did: String,
    pub public_key: String,
    #[serde(default)]
    pub service_endpoints: Vec<String>,
    #[serde(default)]
    pub metadata_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateKeyParams {
    pub did: String,
    pub new_public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEndpointsParams {
    pub did: String,
    pub service_endpoints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeCredentialParams {
    pub credential_hash: Hash256,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyProofParams {
    pub credential_hash: Hash256,
    pub proof_hash: Hash256,
    #[serde(default)]
    pub verification_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedProofParams {
    pub credential_hash: Hash256,
    pub challenge: String,
    /// Holder's signature envelope over the proof message.
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueResponse {
    pub credential_hash: Hash256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub credential_hash: Hash256,
    pub status: CredentialStatus,
}

// ---------------------------------------------------------------------------
// Handlers: node
// ---------------------------------------------------------------------------

/// `GET /health`. Liveness only.
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: state.version.clone(),
    })
}

async fn stats_handler(State(state): State<AppState>) -> Json<EngineStats> {
    Json(state.engine.stats())
}

// ---------------------------------------------------------------------------
// Handlers: issuers
// ---------------------------------------------------------------------------

/// `POST /issuers`. The signer registers itself.
async fn register_issuer_handler(
    State(state): State<AppState>,
    Json(call): Json<SignedCall>,
) -> ApiResult<Issuer> {
    let (caller, p): (_, RegisterIssuerParams) = call.authenticate(ops::REGISTER_ISSUER)?;
    let issuer = state
        .engine
        .issuers()
        .register_issuer(&caller, &p.name, &p.did, &p.metadata_uri)?;
    Ok(Json(issuer))
}

async fn verify_issuer_handler(
    State(state): State<AppState>,
    Json(call): Json<SignedCall>,
) -> ApiResult<Issuer> {
    let (caller, p): (_, VerifyIssuerParams) = call.authenticate(ops::VERIFY_ISSUER)?;
    Ok(Json(state.engine.issuers().verify_issuer(&caller, &p.issuer)?))
}

async fn verified_issuers_handler(State(state): State<AppState>) -> Json<Vec<Issuer>> {
    Json(state.engine.issuers().get_all_verified_issuers())
}

async fn issuer_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Issuer> {
    let address = parse_address(&address)?;
    Ok(Json(state.engine.issuers().get_issuer_details(&address)?))
}

async fn issuer_credentials_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Vec<Hash256>> {
    let address = parse_address(&address)?;
    Ok(Json(
        state.engine.credentials().get_credentials_by_issuer(&address),
    ))
}

// ---------------------------------------------------------------------------
// Handlers: DIDs
// ---------------------------------------------------------------------------

async fn create_did_handler(
    State(state): State<AppState>,
    Json(call): Json<SignedCall>,
) -> ApiResult<DidRecord> {
    let (caller, p): (_, CreateDidParams) = call.authenticate(ops::CREATE_DID)?;
    let record = state.engine.dids().create_did(
        &caller,
        &p.did,
        &p.public_key,
        p.service_endpoints,
        &p.metadata_uri,
    )?;
    Ok(Json(record))
}

async fn rotate_key_handler(
    State(state): State<AppState>,
    Json(call): Json<SignedCall>,
) -> ApiResult<DidRecord> {
    let (caller, p): (_, RotateKeyParams) = call.authenticate(ops::ROTATE_KEY)?;
    Ok(Json(
        state
            .engine
            .dids()
            .rotate_key(&caller, &p.did, &p.new_public_key)?,
    ))
}

async fn update_endpoints_handler(
    State(state): State<AppState>,
    Json(call): Json<SignedCall>,
) -> ApiResult<DidRecord> {
    let (caller, p): (_, UpdateEndpointsParams) =
        call.authenticate(ops::UPDATE_SERVICE_ENDPOINTS)?;
    Ok(Json(state.engine.dids().update_service_endpoints(
        &caller,
        &p.did,
        p.service_endpoints,
    )?))
}

async fn resolve_did_handler(
    Path(did): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<DidRecord> {
    Ok(Json(state.engine.dids().resolve_did(&did)?))
}

async fn did_document_handler(
    Path(did): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<DidDocument> {
    Ok(Json(state.engine.dids().resolve_document(&did)?))
}

async fn owner_dids_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Vec<DidRecord>> {
    let owner = parse_address(&address)?;
    Ok(Json(state.engine.dids().get_dids_by_owner(&owner)))
}

// ---------------------------------------------------------------------------
// Handlers: credentials
// ---------------------------------------------------------------------------

async fn issue_credential_handler(
    State(state): State<AppState>,
    Json(call): Json<SignedCall>,
) -> ApiResult<IssueResponse> {
    let (caller, request): (_, IssueRequest) = call.authenticate(ops::ISSUE_CREDENTIAL)?;
    let credential_hash = state
        .engine
        .credentials()
        .issue_credential(&caller, request)?;
    Ok(Json(IssueResponse { credential_hash }))
}

async fn revoke_credential_handler(
    State(state): State<AppState>,
    Json(call): Json<SignedCall>,
) -> ApiResult<Credential> {
    let (caller, p): (_, RevokeCredentialParams) = call.authenticate(ops::REVOKE_CREDENTIAL)?;
    Ok(Json(state.engine.credentials().revoke_credential(
        &caller,
        &p.credential_hash,
        &p.reason,
    )?))
}

async fn credential_handler(
    Path(hash): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Credential> {
    let hash = parse_hash(&hash)?;
    Ok(Json(state.engine.credentials().get_credential_details(&hash)?))
}

/// `GET /credentials/:hash/validity`. Never 404s: an unknown hash is all
/// false.
async fn validity_handler(
    Path(hash): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Validity> {
    let hash = parse_hash(&hash)?;
    Ok(Json(state.engine.credentials().check_credential_validity(&hash)))
}

async fn status_handler(
    Path(hash): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<StatusResponse> {
    let credential_hash = parse_hash(&hash)?;
    let status = state.engine.credentials().credential_status(&credential_hash)?;
    Ok(Json(StatusResponse {
        credential_hash,
        status,
    }))
}

async fn proofs_handler(
    Path(hash): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Vec<ProofRecord>> {
    let hash = parse_hash(&hash)?;
    Ok(Json(state.engine.credentials().get_credential_proofs(&hash)?))
}

async fn holder_credentials_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Vec<Hash256>> {
    let holder = parse_address(&address)?;
    Ok(Json(
        state.engine.credentials().get_credentials_by_holder(&holder),
    ))
}

// ---------------------------------------------------------------------------
// Handlers: proofs
// ---------------------------------------------------------------------------

async fn verify_proof_handler(
    State(state): State<AppState>,
    Json(call): Json<SignedCall>,
) -> ApiResult<ProofRecord> {
    let (caller, p): (_, VerifyProofParams) = call.authenticate(ops::VERIFY_PROOF)?;
    Ok(Json(state.engine.credentials().verify_proof(
        &caller,
        &p.credential_hash,
        p.proof_hash,
        &p.verification_data,
    )?))
}

/// `POST /proofs/signed`. The outer signature authenticates the verifier;
/// the inner one proves the holder answered the challenge.
async fn verify_signed_proof_handler(
    State(state): State<AppState>,
    Json(call): Json<SignedCall>,
) -> ApiResult<ProofRecord> {
    let (caller, p): (_, SignedProofParams) = call.authenticate(ops::VERIFY_SIGNED_PROOF)?;
    Ok(Json(state.engine.credentials().verify_signed_proof(
        &caller,
        &p.credential_hash,
        &p.challenge,
        &p.signature,
    )?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
