//! Credential registry: the registration and authentication ceremonies
//!
//! Orchestrates the challenge-response protocol on top of the hybrid store.
//! Each ceremony is two phases: `begin_*` issues a challenge addressed to
//! one employee, `complete_*` consumes the pending state exactly once and
//! verifies the authenticator's response. A challenge is valid for five
//! minutes and is replaced when a new one is issued.

use chrono::Utc;
use uuid::Uuid;
use webauthn_rs::prelude::*;

use super::config::RelyingParty;
use super::store::{CeremonyStorage, StorageError, StoredCredential, TakenState};
use super::types::CredentialSummary;
use super::CeremonyError;

/// Whether an assertion counter is acceptable against the stored one.
///
/// Strictly greater is required once a counter is in use. Authenticators
/// that do not implement a signature counter always report zero, so the
/// zero-to-zero case passes and replay protection starts with the first
/// nonzero value.
pub fn counter_advances(stored: u32, provided: u32) -> bool {
    provided > stored || (stored == 0 && provided == 0)
}

/// Outcome of a completed authentication ceremony
#[derive(Debug)]
pub struct VerifiedAssertion {
    pub credential_id: String,
    pub counter: u32,
}

/// The credential registry
pub struct CredentialRegistry {
    rp: RelyingParty,
    storage: CeremonyStorage,
}

impl CredentialRegistry {
    pub fn new(rp: RelyingParty, storage: CeremonyStorage) -> Self {
        Self { rp, storage }
    }

    /// Begin a registration ceremony for an employee.
    ///
    /// Existing credentials are excluded so an authenticator cannot be
    /// registered twice for the same employee.
    pub async fn begin_registration(
        &self,
        employee_id: Uuid,
        employee_name: &str,
    ) -> Result<CreationChallengeResponse, CeremonyError> {
        let existing = self.storage.credentials_for(employee_id).await?;
        let exclude: Vec<CredentialID> = existing
            .iter()
            .map(|c| c.passkey.cred_id().clone())
            .collect();
        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(exclude)
        };

        let (ccr, reg_state) = self
            .rp
            .webauthn()
            .start_passkey_registration(employee_id, employee_name, employee_name, exclude)
            .map_err(|e| CeremonyError::VerificationFailed(format!("{:?}", e)))?;

        self.storage
            .put_registration_state(employee_id, reg_state)
            .await?;

        tracing::info!(employee_id = %employee_id, "registration ceremony started");
        Ok(ccr)
    }

    /// Complete a registration ceremony, storing the new credential with a
    /// zero counter.
    pub async fn complete_registration(
        &self,
        employee_id: Uuid,
        response: &RegisterPublicKeyCredential,
        device_name: Option<String>,
    ) -> Result<CredentialSummary, CeremonyError> {
        let reg_state = match self.storage.take_registration_state(employee_id).await? {
            TakenState::Valid(state) => state,
            TakenState::Missing => return Err(CeremonyError::ChallengeMissing),
            TakenState::Expired => return Err(CeremonyError::ChallengeExpired),
        };

        let passkey = self
            .rp
            .webauthn()
            .finish_passkey_registration(response, &reg_state)
            .map_err(|e| CeremonyError::VerificationFailed(format!("{:?}", e)))?;

        let credential_id = base64_url_encode(passkey.cred_id());
        let credential = StoredCredential {
            credential_id: credential_id.clone(),
            employee_id,
            passkey,
            counter: 0,
            device_name,
            active: true,
            created_at: Utc::now(),
            last_used_at: None,
        };
        let summary = CredentialSummary::from(&credential);
        self.storage.insert_credential(credential).await?;

        tracing::info!(
            employee_id = %employee_id,
            credential_id = %credential_id,
            "registration ceremony completed"
        );
        Ok(summary)
    }

    /// Begin an authentication ceremony against all of the employee's
    /// active credentials.
    pub async fn begin_authentication(
        &self,
        employee_id: Uuid,
    ) -> Result<RequestChallengeResponse, CeremonyError> {
        let credentials = self.storage.credentials_for(employee_id).await?;
        if credentials.is_empty() {
            return Err(CeremonyError::NoCredentials);
        }
        let passkeys: Vec<Passkey> = credentials.into_iter().map(|c| c.passkey).collect();

        let (rcr, auth_state) = self
            .rp
            .webauthn()
            .start_passkey_authentication(&passkeys)
            .map_err(|e| CeremonyError::VerificationFailed(format!("{:?}", e)))?;

        self.storage
            .put_authentication_state(employee_id, auth_state)
            .await?;

        tracing::info!(employee_id = %employee_id, "authentication ceremony started");
        Ok(rcr)
    }

    /// Complete an authentication ceremony.
    ///
    /// After signature verification the assertion counter is checked
    /// against the stored one and advanced with a conditional update; a
    /// stale counter means a replayed or cloned authenticator and fails
    /// the ceremony.
    pub async fn complete_authentication(
        &self,
        employee_id: Uuid,
        response: &PublicKeyCredential,
    ) -> Result<VerifiedAssertion, CeremonyError> {
        let auth_state = match self.storage.take_authentication_state(employee_id).await? {
            TakenState::Valid(state) => state,
            TakenState::Missing => return Err(CeremonyError::ChallengeMissing),
            TakenState::Expired => return Err(CeremonyError::ChallengeExpired),
        };

        let auth_result = self
            .rp
            .webauthn()
            .finish_passkey_authentication(response, &auth_state)
            .map_err(|e| CeremonyError::VerificationFailed(format!("{:?}", e)))?;

        let credential_id = base64_url_encode(auth_result.cred_id());
        let stored = self
            .storage
            .find_credential(&credential_id)
            .await?
            .filter(|c| c.employee_id == employee_id)
            .ok_or(CeremonyError::CredentialNotFound)?;

        let provided = auth_result.counter();
        if !counter_advances(stored.counter, provided) {
            return Err(CeremonyError::CounterReplay {
                stored: stored.counter,
                provided,
            });
        }

        if provided == 0 {
            // Counter-less authenticator; nothing to advance
            self.storage.touch_last_used(&credential_id).await?;
        } else {
            let mut passkey = stored.passkey.clone();
            passkey.update_credential(&auth_result);
            let advanced = self
                .storage
                .advance_counter(&credential_id, &passkey, provided)
                .await?;
            if !advanced {
                // A concurrent assertion won the conditional update
                return Err(CeremonyError::CounterReplay {
                    stored: stored.counter,
                    provided,
                });
            }
        }

        tracing::info!(
            employee_id = %employee_id,
            credential_id = %credential_id,
            counter = provided,
            "authentication ceremony completed"
        );
        Ok(VerifiedAssertion {
            credential_id,
            counter: provided,
        })
    }

    /// List an employee's active credentials.
    pub async fn list_credentials(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<CredentialSummary>, StorageError> {
        let credentials = self.storage.credentials_for(employee_id).await?;
        Ok(credentials.iter().map(CredentialSummary::from).collect())
    }

    /// Revoke one of an employee's credentials. Returns `false` when no
    /// active credential matches.
    pub async fn revoke_credential(
        &self,
        employee_id: Uuid,
        credential_id: &str,
    ) -> Result<bool, StorageError> {
        let revoked = self
            .storage
            .revoke_credential(employee_id, credential_id)
            .await?;
        if revoked {
            tracing::info!(
                employee_id = %employee_id,
                credential_id = %credential_id,
                "credential revoked"
            );
        }
        Ok(revoked)
    }

    /// Check if using persistent storage
    pub fn is_persistent(&self) -> bool {
        self.storage.is_persistent()
    }
}

impl std::fmt::Debug for CredentialRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRegistry")
            .field("storage", &self.storage)
            .finish()
    }
}

/// Base64url encode bytes
fn base64_url_encode(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_must_strictly_increase() {
        assert!(counter_advances(5, 6));
        assert!(counter_advances(5, 100));
        assert!(!counter_advances(5, 5));
        assert!(!counter_advances(5, 4));
        assert!(!counter_advances(5, 0));
    }

    #[test]
    fn test_counterless_authenticator_stays_at_zero() {
        assert!(counter_advances(0, 0));
        assert!(counter_advances(0, 1));
    }

    #[test]
    fn test_counter_cannot_return_to_zero() {
        // Once a counter has been seen, zero means a cloned authenticator
        assert!(!counter_advances(1, 0));
    }

    #[test]
    fn test_base64_url_encoding_has_no_padding() {
        assert_eq!(base64_url_encode(b"credential"), "Y3JlZGVudGlhbA");
        assert!(!base64_url_encode(&[0xfb, 0xef]).contains('='));
    }
}
