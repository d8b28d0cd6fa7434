//! Challenge-response verification ceremonies
//!
//! Employees prove presence with a registered authenticator before punching.
//! Two ceremonies exist, each split into a begin and a complete phase:
//!
//! - Registration binds a new credential to an employee.
//! - Authentication verifies an assertion against a registered credential
//!   and advances its replay counter.
//!
//! Challenges are addressed to one employee, live for five minutes, and are
//! consumed exactly once; issuing a new challenge invalidates the pending
//! one.
//!
//! ## Architecture
//!
//! - `config`: Relying Party configuration
//! - `registry`: ceremony orchestration and counter replay protection
//! - `store`: hybrid storage (PostgreSQL when configured, memory fallback)
//! - `types`: request/response types for the ceremony API
//! - `handlers`: HTTP endpoint handlers

pub mod config;
pub mod handlers;
pub mod registry;
pub mod store;
mod types;

pub use config::{RelyingParty, RelyingPartyError};
pub use registry::{counter_advances, CredentialRegistry, VerifiedAssertion};
pub use store::{CeremonyStorage, StorageError, StoredCredential, TakenState};
pub use types::{
    BeginAuthenticationRequest, BeginAuthenticationResponse, BeginRegistrationRequest,
    BeginRegistrationResponse, CompleteAuthenticationRequest, CompleteAuthenticationResponse,
    CompleteRegistrationRequest, CredentialSummary,
};

/// Ceremony protocol failures.
///
/// Variants stay distinct for audit logging; the HTTP layer collapses the
/// security-sensitive ones into a single generic client message.
#[derive(Debug, thiserror::Error)]
pub enum CeremonyError {
    #[error("no pending challenge for this employee")]
    ChallengeMissing,

    #[error("the pending challenge has expired")]
    ChallengeExpired,

    #[error("assertion verification failed: {0}")]
    VerificationFailed(String),

    #[error("counter replay detected (stored {stored}, provided {provided})")]
    CounterReplay { stored: u32, provided: u32 },

    #[error("credential not found or not owned by this employee")]
    CredentialNotFound,

    #[error("no registered credentials for this employee")]
    NoCredentials,

    #[error("ceremony storage failure: {0}")]
    Storage(#[from] StorageError),
}
