//! Employee entity and repository
//!
//! Employees are reference data mutated by the admin collaborator; this core
//! only reads them. Soft deletion goes through the `active` flag and inactive
//! employees are rejected at every entry point.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Employee entity from database
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    /// bcrypt hash backing the EMERGENCY_PIN method; verification is the
    /// auth collaborator's concern
    #[serde(skip_serializing)]
    pub pin_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Repository for employee database operations
#[derive(Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

impl EmployeeRepository {
    /// Create a new employee repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an active employee by id. Returns `None` for unknown or
    /// soft-deleted employees, which callers must treat as a rejection.
    pub async fn find_active(&self, id: Uuid) -> Result<Option<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, name, active, pin_hash, created_at
            FROM employees
            WHERE id = $1 AND active
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find an employee by id regardless of active flag.
    ///
    /// Reports use this: punches are the audit trail and keep referencing
    /// employees after deactivation.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, name, active, pin_hash, created_at
            FROM employees
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}

impl std::fmt::Debug for EmployeeRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmployeeRepository")
            .field("pool", &"<PgPool>")
            .finish()
    }
}
