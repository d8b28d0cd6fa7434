//! Ceremony HTTP endpoint handlers
//!
//! Every ceremony endpoint re-checks that the employee exists and is active;
//! deactivation mid-ceremony invalidates the pending challenge in practice
//! because the complete phase is rejected before the store is consulted.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::types::{
    BeginAuthenticationRequest, BeginAuthenticationResponse, BeginRegistrationRequest,
    BeginRegistrationResponse, CompleteAuthenticationRequest, CompleteAuthenticationResponse,
    CompleteRegistrationRequest, CredentialSummary,
};
use crate::db::Employee;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameter selecting the employee a credential operation acts on
#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    #[param(value_type = String, example = "550e8400-e29b-41d4-a716-446655440000")]
    pub employee_id: Uuid,
}

async fn require_active_employee(state: &AppState, id: Uuid) -> Result<Employee, ApiError> {
    state
        .employee_repo()?
        .find_active(id)
        .await
        .map_err(|e| ApiError::internal(format!("employee lookup failed: {e}")))?
        .ok_or_else(|| ApiError::unauthorized("Unknown or inactive employee"))
}

/// POST /auth/registration/begin
///
/// Start a registration ceremony binding a new credential to an employee.
/// Returns a challenge that must be signed by the authenticator.
#[utoipa::path(
    post,
    path = "/auth/registration/begin",
    tag = "Auth",
    request_body = BeginRegistrationRequest,
    responses(
        (status = 200, description = "Registration challenge created (JSON with public_key options)"),
        (status = 401, description = "Unknown or inactive employee"),
        (status = 503, description = "Employee store not configured")
    )
)]
pub async fn begin_registration(
    State(state): State<AppState>,
    Json(req): Json<BeginRegistrationRequest>,
) -> Result<Json<BeginRegistrationResponse>, ApiError> {
    let employee = require_active_employee(&state, req.employee_id).await?;
    let public_key = state
        .registry
        .begin_registration(employee.id, &employee.name)
        .await?;
    Ok(Json(BeginRegistrationResponse { public_key }))
}

/// POST /auth/registration/complete
///
/// Complete a registration ceremony with the authenticator's response.
#[utoipa::path(
    post,
    path = "/auth/registration/complete",
    tag = "Auth",
    request_body(content_type = "application/json", description = "Registration response from the authenticator"),
    responses(
        (status = 200, description = "Credential registered", body = CredentialSummary),
        (status = 401, description = "Challenge missing, expired, or verification failed"),
        (status = 503, description = "Employee store not configured")
    )
)]
pub async fn complete_registration(
    State(state): State<AppState>,
    Json(req): Json<CompleteRegistrationRequest>,
) -> Result<Json<CredentialSummary>, ApiError> {
    let employee = require_active_employee(&state, req.employee_id).await?;
    let summary = state
        .registry
        .complete_registration(employee.id, &req.response, req.device_name)
        .await?;
    Ok(Json(summary))
}

/// POST /auth/authentication/begin
///
/// Start an authentication ceremony against the employee's registered
/// credentials.
#[utoipa::path(
    post,
    path = "/auth/authentication/begin",
    tag = "Auth",
    request_body = BeginAuthenticationRequest,
    responses(
        (status = 200, description = "Authentication challenge created (JSON with public_key options)"),
        (status = 400, description = "No registered credentials"),
        (status = 401, description = "Unknown or inactive employee"),
        (status = 503, description = "Employee store not configured")
    )
)]
pub async fn begin_authentication(
    State(state): State<AppState>,
    Json(req): Json<BeginAuthenticationRequest>,
) -> Result<Json<BeginAuthenticationResponse>, ApiError> {
    let employee = require_active_employee(&state, req.employee_id).await?;
    let public_key = state.registry.begin_authentication(employee.id).await?;
    Ok(Json(BeginAuthenticationResponse { public_key }))
}

/// POST /auth/authentication/complete
///
/// Complete an authentication ceremony with the authenticator's assertion.
#[utoipa::path(
    post,
    path = "/auth/authentication/complete",
    tag = "Auth",
    request_body(content_type = "application/json", description = "Assertion from the authenticator"),
    responses(
        (status = 200, description = "Assertion verified", body = CompleteAuthenticationResponse),
        (status = 401, description = "Challenge missing, expired, replayed, or signature invalid"),
        (status = 503, description = "Employee store not configured")
    )
)]
pub async fn complete_authentication(
    State(state): State<AppState>,
    Json(req): Json<CompleteAuthenticationRequest>,
) -> Result<Json<CompleteAuthenticationResponse>, ApiError> {
    let employee = require_active_employee(&state, req.employee_id).await?;
    let assertion = state
        .registry
        .complete_authentication(employee.id, &req.response)
        .await?;
    Ok(Json(CompleteAuthenticationResponse {
        verified: true,
        credential_id: assertion.credential_id,
    }))
}

/// GET /auth/credentials
///
/// List the employee's active credentials.
#[utoipa::path(
    get,
    path = "/auth/credentials",
    tag = "Auth",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Active credentials", body = [CredentialSummary]),
        (status = 401, description = "Unknown or inactive employee"),
        (status = 503, description = "Employee store not configured")
    )
)]
pub async fn list_credentials(
    State(state): State<AppState>,
    Query(query): Query<EmployeeQuery>,
) -> Result<Json<Vec<CredentialSummary>>, ApiError> {
    let employee = require_active_employee(&state, query.employee_id).await?;
    let credentials = state
        .registry
        .list_credentials(employee.id)
        .await
        .map_err(|e| ApiError::internal(format!("credential listing failed: {e}")))?;
    Ok(Json(credentials))
}

/// DELETE /auth/credentials/{credential_id}
///
/// Revoke one of the employee's credentials.
#[utoipa::path(
    delete,
    path = "/auth/credentials/{credential_id}",
    tag = "Auth",
    params(
        ("credential_id" = String, Path, description = "Credential ID (base64url)"),
        EmployeeQuery,
    ),
    responses(
        (status = 204, description = "Credential revoked"),
        (status = 404, description = "No active credential with this ID for this employee"),
        (status = 503, description = "Employee store not configured")
    )
)]
pub async fn revoke_credential(
    State(state): State<AppState>,
    Path(credential_id): Path<String>,
    Query(query): Query<EmployeeQuery>,
) -> Result<axum::http::StatusCode, ApiError> {
    let employee = require_active_employee(&state, query.employee_id).await?;
    let revoked = state
        .registry
        .revoke_credential(employee.id, &credential_id)
        .await
        .map_err(|e| ApiError::internal(format!("credential revocation failed: {e}")))?;

    if revoked {
        Ok(axum::http::StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Credential not found"))
    }
}
