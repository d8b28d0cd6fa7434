//! Ceremony request/response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use webauthn_rs::prelude::*;

use super::store::StoredCredential;

/// Request to start credential registration
#[derive(Debug, Deserialize, ToSchema)]
pub struct BeginRegistrationRequest {
    #[schema(value_type = String, example = "550e8400-e29b-41d4-a716-446655440000")]
    pub employee_id: Uuid,
}

/// Response containing the registration challenge
#[derive(Debug, Serialize)]
pub struct BeginRegistrationResponse {
    /// Credential creation options (to be passed to navigator.credentials.create)
    pub public_key: CreationChallengeResponse,
}

/// Request to complete credential registration
#[derive(Debug, Deserialize)]
pub struct CompleteRegistrationRequest {
    pub employee_id: Uuid,
    /// Optional human-readable device name
    pub device_name: Option<String>,
    /// Credential response from navigator.credentials.create
    pub response: RegisterPublicKeyCredential,
}

/// Request to start an authentication ceremony
#[derive(Debug, Deserialize, ToSchema)]
pub struct BeginAuthenticationRequest {
    #[schema(value_type = String, example = "550e8400-e29b-41d4-a716-446655440000")]
    pub employee_id: Uuid,
}

/// Response containing the authentication challenge
#[derive(Debug, Serialize)]
pub struct BeginAuthenticationResponse {
    /// Request options (to be passed to navigator.credentials.get)
    pub public_key: RequestChallengeResponse,
}

/// Request to complete an authentication ceremony
#[derive(Debug, Deserialize)]
pub struct CompleteAuthenticationRequest {
    pub employee_id: Uuid,
    /// Assertion response from navigator.credentials.get
    pub response: PublicKeyCredential,
}

/// Response for a completed authentication ceremony
#[derive(Debug, Serialize, ToSchema)]
pub struct CompleteAuthenticationResponse {
    pub verified: bool,
    /// Credential that signed the assertion (base64url)
    pub credential_id: String,
}

/// Client-visible view of a registered credential
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CredentialSummary {
    /// Credential ID (base64url)
    pub credential_id: String,
    pub device_name: Option<String>,
    /// Last signature counter seen
    pub counter: u32,
    #[schema(value_type = String, example = "2026-01-08T10:00:00Z")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Option<String>)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<&StoredCredential> for CredentialSummary {
    fn from(credential: &StoredCredential) -> Self {
        Self {
            credential_id: credential.credential_id.clone(),
            device_name: credential.device_name.clone(),
            counter: credential.counter,
            created_at: credential.created_at,
            last_used_at: credential.last_used_at,
        }
    }
}
