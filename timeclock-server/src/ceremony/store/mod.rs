//! Hybrid storage for ceremony state and credentials
//!
//! Two kinds of data with very different lifetimes live here:
//!
//! - Pending ceremony state, valid for five minutes and consumed exactly
//!   once. Addressed by employee and ceremony kind; issuing a new challenge
//!   replaces any pending one for the same pair.
//! - Registered credentials, long-lived and replay-protected by a signature
//!   counter.
//!
//! PostgreSQL is used when available so challenges and credentials survive
//! restarts and are shared across instances; the in-memory backend serves
//! development and tests.

pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use webauthn_rs::prelude::*;

use memory::MemoryStore;
use postgres::PostgresStore;

/// Maximum age of a pending ceremony (5 minutes)
pub const CHALLENGE_TTL_SECS: u64 = 300;

/// Which ceremony a pending state belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeKind {
    Registration,
    Authentication,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::Registration => "REGISTRATION",
            ChallengeKind::Authentication => "AUTHENTICATION",
        }
    }
}

/// Outcome of consuming a pending ceremony state.
///
/// `Missing` and `Expired` are distinguished for audit logging; clients see
/// the same rejection for both.
#[derive(Debug)]
pub enum TakenState<T> {
    Valid(T),
    Missing,
    Expired,
}

/// A registered credential with its replay counter
#[derive(Debug, Clone)]
pub struct StoredCredential {
    /// Credential ID, base64url without padding
    pub credential_id: String,
    pub employee_id: Uuid,
    pub passkey: Passkey,
    /// Highest signature counter seen; zero until the authenticator
    /// reports one
    pub counter: u32,
    pub device_name: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Hybrid ceremony storage backend
pub enum CeremonyStorage {
    /// PostgreSQL storage (production)
    Postgres(PostgresStore),
    /// In-memory storage (development fallback)
    Memory(MemoryStore),
}

impl CeremonyStorage {
    /// Create storage backed by PostgreSQL
    pub fn with_postgres(pool: PgPool) -> Self {
        Self::Postgres(PostgresStore::new(pool))
    }

    /// Create in-memory storage (development only)
    pub fn in_memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Check if using persistent storage
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Postgres(_))
    }

    /// Store a pending registration, replacing any previous one for this
    /// employee.
    pub async fn put_registration_state(
        &self,
        employee_id: Uuid,
        state: PasskeyRegistration,
    ) -> Result<(), StorageError> {
        match self {
            Self::Postgres(store) => store.put_registration_state(employee_id, state).await,
            Self::Memory(store) => {
                store.registrations.insert(employee_id, state);
                Ok(())
            }
        }
    }

    /// Consume the pending registration for this employee, exactly once.
    pub async fn take_registration_state(
        &self,
        employee_id: Uuid,
    ) -> Result<TakenState<PasskeyRegistration>, StorageError> {
        match self {
            Self::Postgres(store) => store.take_registration_state(employee_id).await,
            Self::Memory(store) => Ok(store.registrations.take(employee_id)),
        }
    }

    /// Store a pending authentication, replacing any previous one for this
    /// employee.
    pub async fn put_authentication_state(
        &self,
        employee_id: Uuid,
        state: PasskeyAuthentication,
    ) -> Result<(), StorageError> {
        match self {
            Self::Postgres(store) => store.put_authentication_state(employee_id, state).await,
            Self::Memory(store) => {
                store.authentications.insert(employee_id, state);
                Ok(())
            }
        }
    }

    /// Consume the pending authentication for this employee, exactly once.
    pub async fn take_authentication_state(
        &self,
        employee_id: Uuid,
    ) -> Result<TakenState<PasskeyAuthentication>, StorageError> {
        match self {
            Self::Postgres(store) => store.take_authentication_state(employee_id).await,
            Self::Memory(store) => Ok(store.authentications.take(employee_id)),
        }
    }

    /// Persist a newly registered credential.
    pub async fn insert_credential(&self, credential: StoredCredential) -> Result<(), StorageError> {
        match self {
            Self::Postgres(store) => store.insert_credential(credential).await,
            Self::Memory(store) => {
                store.insert_credential(credential);
                Ok(())
            }
        }
    }

    /// List the active credentials of an employee, oldest first.
    pub async fn credentials_for(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<StoredCredential>, StorageError> {
        match self {
            Self::Postgres(store) => store.credentials_for(employee_id).await,
            Self::Memory(store) => Ok(store.credentials_for(employee_id)),
        }
    }

    /// Find an active credential by its base64url credential ID.
    pub async fn find_credential(
        &self,
        credential_id: &str,
    ) -> Result<Option<StoredCredential>, StorageError> {
        match self {
            Self::Postgres(store) => store.find_credential(credential_id).await,
            Self::Memory(store) => Ok(store.find_credential(credential_id)),
        }
    }

    /// Advance the replay counter, compare-and-swap style.
    ///
    /// Returns `false` when the stored counter has already reached
    /// `new_counter`, which means a replayed or cloned assertion. The
    /// updated passkey is persisted alongside the counter.
    pub async fn advance_counter(
        &self,
        credential_id: &str,
        passkey: &Passkey,
        new_counter: u32,
    ) -> Result<bool, StorageError> {
        match self {
            Self::Postgres(store) => {
                store
                    .advance_counter(credential_id, passkey, new_counter)
                    .await
            }
            Self::Memory(store) => Ok(store.advance_counter(credential_id, passkey, new_counter)),
        }
    }

    /// Record a successful use of a counter-less credential.
    pub async fn touch_last_used(&self, credential_id: &str) -> Result<(), StorageError> {
        match self {
            Self::Postgres(store) => store.touch_last_used(credential_id).await,
            Self::Memory(store) => {
                store.touch_last_used(credential_id);
                Ok(())
            }
        }
    }

    /// Deactivate a credential. Returns `false` when no active credential
    /// with this ID belongs to the employee.
    pub async fn revoke_credential(
        &self,
        employee_id: Uuid,
        credential_id: &str,
    ) -> Result<bool, StorageError> {
        match self {
            Self::Postgres(store) => store.revoke_credential(employee_id, credential_id).await,
            Self::Memory(store) => Ok(store.revoke_credential(employee_id, credential_id)),
        }
    }
}

impl std::fmt::Debug for CeremonyStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres(_) => f
                .debug_struct("CeremonyStorage")
                .field("backend", &"PostgreSQL")
                .finish(),
            Self::Memory(store) => f
                .debug_struct("CeremonyStorage")
                .field("backend", &"Memory")
                .field("credentials", &store.credential_count())
                .finish(),
        }
    }
}
