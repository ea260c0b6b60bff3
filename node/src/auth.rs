//! # Signed Calls
//!
//! Every state-changing API call names its caller and proves it:
//!
//! ```json
//! { "caller": "0x…", "signature": "<envelope hex>", "params": { … } }
//! ```
//!
//! `signature` is a signature envelope over `"<operation>:" ‖ json(params)`
//! and must recover to `caller`. The JSON is produced through
//! [`serde_json::Value`], whose maps are key-sorted, so client and server
//! agree on the bytes regardless of struct field order.

use attest_protocol::crypto::{sign_message, Keypair};
use attest_protocol::identity::Address;
use attest_protocol::proof::verify_signature_for;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Operation names bound into signatures. A signature for one operation
/// cannot be replayed against another.
pub mod ops {
    pub const REGISTER_ISSUER: &str = "register_issuer";
    pub const VERIFY_ISSUER: &str = "verify_issuer";
    pub const CREATE_DID: &str = "create_did";
    pub const ROTATE_KEY: &str = "rotate_key";
    pub const UPDATE_SERVICE_ENDPOINTS: &str = "update_service_endpoints";
    pub const ISSUE_CREDENTIAL: &str = "issue_credential";
    pub const REVOKE_CREDENTIAL: &str = "revoke_credential";
    pub const VERIFY_PROOF: &str = "verify_proof";
    pub const VERIFY_SIGNED_PROOF: &str = "verify_signed_proof";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedCall<P = serde_json::Value> {
    pub caller: Address,
    pub signature: String,
    pub params: P,
}

/// The exact bytes a caller signs for `operation`.
pub fn signing_message<P: Serialize>(operation: &str, params: &P) -> serde_json::Result<String> {
    let canonical = serde_json::to_value(params)?;
    Ok(format!("{operation}:{canonical}"))
}

impl SignedCall {
    /// Sign `params` for `operation` as `keypair`.
    pub fn sign<P: Serialize>(
        keypair: &Keypair,
        operation: &str,
        params: &P,
    ) -> serde_json::Result<Self> {
        let params = serde_json::to_value(params)?;
        let message = signing_message(operation, &params)?;
        Ok(Self {
            caller: keypair.address(),
            signature: sign_message(keypair, message.as_bytes()),
            params,
        })
    }

    /// Check the signature and decode the params.
    ///
    /// A bad signature is reported before malformed params, so an
    /// unauthenticated client learns nothing about the schema.
    pub fn authenticate<P: DeserializeOwned>(
        self,
        operation: &str,
    ) -> Result<(Address, P), ApiError> {
        let message = signing_message(operation, &self.params)
            .map_err(|e| ApiError::InvalidParams(e.to_string()))?;
        if !verify_signature_for(message.as_bytes(), &self.signature, &self.caller) {
            return Err(ApiError::BadSignature);
        }
        let params = serde_json::from_value(self.params)
            .map_err(|e| ApiError::InvalidParams(e.to_string()))?;
        Ok((self.caller, params))
    }
}
