//! PostgreSQL ceremony storage
//!
//! Pending ceremony state is persisted as JSONB in `ceremony_challenges` so
//! a ceremony can complete against any server instance. Exactly-once
//! consumption relies on the DELETE row count: two concurrent completes race
//! on the same row and only one DELETE reports an affected row.
//!
//! The replay counter advance is a single conditional UPDATE; the database
//! decides the race, not the process.

use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use webauthn_rs::prelude::*;

use super::{ChallengeKind, StorageError, StoredCredential, TakenState, CHALLENGE_TTL_SECS};

/// Conditional counter advance. The `counter < $3` guard makes a replayed
/// assertion a no-op regardless of interleaving.
const ADVANCE_COUNTER_SQL: &str = r#"
    UPDATE credentials
    SET counter = $3, passkey_data = $2, last_used_at = NOW()
    WHERE credential_id = $1 AND active AND counter < $3
"#;

/// Raw credential row; the passkey is stored as JSONB
#[derive(FromRow)]
struct CredentialRow {
    credential_id: String,
    employee_id: Uuid,
    passkey_data: serde_json::Value,
    counter: i64,
    device_name: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    last_used_at: Option<DateTime<Utc>>,
}

impl TryFrom<CredentialRow> for StoredCredential {
    type Error = StorageError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        Ok(StoredCredential {
            credential_id: row.credential_id,
            employee_id: row.employee_id,
            passkey: serde_json::from_value(row.passkey_data)?,
            counter: row.counter as u32,
            device_name: row.device_name,
            active: row.active,
            created_at: row.created_at,
            last_used_at: row.last_used_at,
        })
    }
}

/// PostgreSQL-backed ceremony storage
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn put_registration_state(
        &self,
        employee_id: Uuid,
        state: PasskeyRegistration,
    ) -> Result<(), StorageError> {
        self.put_state(employee_id, ChallengeKind::Registration, serde_json::to_value(&state)?)
            .await
    }

    pub async fn take_registration_state(
        &self,
        employee_id: Uuid,
    ) -> Result<TakenState<PasskeyRegistration>, StorageError> {
        self.take_state(employee_id, ChallengeKind::Registration)
            .await
    }

    pub async fn put_authentication_state(
        &self,
        employee_id: Uuid,
        state: PasskeyAuthentication,
    ) -> Result<(), StorageError> {
        self.put_state(
            employee_id,
            ChallengeKind::Authentication,
            serde_json::to_value(&state)?,
        )
        .await
    }

    pub async fn take_authentication_state(
        &self,
        employee_id: Uuid,
    ) -> Result<TakenState<PasskeyAuthentication>, StorageError> {
        self.take_state(employee_id, ChallengeKind::Authentication)
            .await
    }

    /// Insert a pending state, discarding any earlier pending ceremony of
    /// the same kind so only the most recent challenge can complete.
    async fn put_state(
        &self,
        employee_id: Uuid,
        kind: ChallengeKind,
        state: serde_json::Value,
    ) -> Result<(), StorageError> {
        let expires_at = Utc::now() + Duration::seconds(CHALLENGE_TTL_SECS as i64);
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM ceremony_challenges WHERE employee_id = $1 AND kind = $2")
            .bind(employee_id)
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO ceremony_challenges (id, employee_id, kind, state, created_at, expires_at)
            VALUES ($1, $2, $3, $4, NOW(), $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(employee_id)
        .bind(kind.as_str())
        .bind(state)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Consume the most recent pending state for (employee, kind).
    ///
    /// An expired row is deleted and reported as `Expired`; losing the
    /// DELETE race to a concurrent complete is reported as `Missing`.
    async fn take_state<T: serde::de::DeserializeOwned>(
        &self,
        employee_id: Uuid,
        kind: ChallengeKind,
    ) -> Result<TakenState<T>, StorageError> {
        let row: Option<(Uuid, serde_json::Value, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, state, expires_at
            FROM ceremony_challenges
            WHERE employee_id = $1 AND kind = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let (id, state, expires_at) = match row {
            None => return Ok(TakenState::Missing),
            Some(row) => row,
        };

        let deleted = sqlx::query("DELETE FROM ceremony_challenges WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted != 1 {
            // Another complete consumed it first
            return Ok(TakenState::Missing);
        }
        if expires_at <= Utc::now() {
            return Ok(TakenState::Expired);
        }
        Ok(TakenState::Valid(serde_json::from_value(state)?))
    }

    pub async fn insert_credential(&self, credential: StoredCredential) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO credentials
                (credential_id, employee_id, passkey_data, counter, device_name,
                 active, created_at, last_used_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&credential.credential_id)
        .bind(credential.employee_id)
        .bind(serde_json::to_value(&credential.passkey)?)
        .bind(credential.counter as i64)
        .bind(&credential.device_name)
        .bind(credential.active)
        .bind(credential.created_at)
        .bind(credential.last_used_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn credentials_for(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<StoredCredential>, StorageError> {
        let rows = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT credential_id, employee_id, passkey_data, counter, device_name,
                   active, created_at, last_used_at
            FROM credentials
            WHERE employee_id = $1 AND active
            ORDER BY created_at
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredCredential::try_from).collect()
    }

    pub async fn find_credential(
        &self,
        credential_id: &str,
    ) -> Result<Option<StoredCredential>, StorageError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT credential_id, employee_id, passkey_data, counter, device_name,
                   active, created_at, last_used_at
            FROM credentials
            WHERE credential_id = $1 AND active
            "#,
        )
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredCredential::try_from).transpose()
    }

    pub async fn advance_counter(
        &self,
        credential_id: &str,
        passkey: &Passkey,
        new_counter: u32,
    ) -> Result<bool, StorageError> {
        let updated = sqlx::query(ADVANCE_COUNTER_SQL)
            .bind(credential_id)
            .bind(serde_json::to_value(passkey)?)
            .bind(new_counter as i64)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated == 1)
    }

    pub async fn touch_last_used(&self, credential_id: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE credentials SET last_used_at = NOW() WHERE credential_id = $1 AND active")
            .bind(credential_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn revoke_credential(
        &self,
        employee_id: Uuid,
        credential_id: &str,
    ) -> Result<bool, StorageError> {
        let updated = sqlx::query(
            r#"
            UPDATE credentials
            SET active = FALSE
            WHERE credential_id = $1 AND employee_id = $2 AND active
            "#,
        )
        .bind(credential_id)
        .bind(employee_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated == 1)
    }
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("pool", &"<PgPool>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_counter_sql_is_conditional() {
        // The replay guard must live in the statement itself
        assert!(ADVANCE_COUNTER_SQL.contains("counter < $3"));
        assert!(ADVANCE_COUNTER_SQL.contains("AND active"));
        assert!(ADVANCE_COUNTER_SQL.contains("last_used_at = NOW()"));
    }
}
