//! Application state module
//!
//! Defines shared state accessible across all request handlers.
//!
//! The ledger and credential registry always exist, falling back to memory
//! backends without a database. The repositories hold reference data that
//! only lives in PostgreSQL, so they are optional and handlers that need
//! them degrade to 503 when unconfigured.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use crate::ceremony::{CeremonyStorage, CredentialRegistry, RelyingParty};
use crate::config::Config;
use crate::db::{EmployeeRepository, PunchLedger, SiteRepository};
use crate::error::ApiError;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Employee repository, present when a database is configured
    pub employee_repo: Option<Arc<EmployeeRepository>>,
    /// Site repository, present when a database is configured
    pub site_repo: Option<Arc<SiteRepository>>,
    /// Punch ledger (PostgreSQL or memory fallback)
    pub ledger: Arc<PunchLedger>,
    /// Credential registry for verification ceremonies
    pub registry: Arc<CredentialRegistry>,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// With `DATABASE_URL` set, connects a pool, runs migrations, and wires
    /// every component to PostgreSQL. Without it, everything runs on the
    /// memory fallback and data is lost on restart.
    pub async fn from_config(config: &Config) -> Result<Self, ApiError> {
        let rp = RelyingParty::from_env()
            .map_err(|e| ApiError::internal(format!("relying party configuration failed: {e}")))?;

        let pool = match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.database_max_connections)
                    .min_connections(config.database_min_connections)
                    .connect(url)
                    .await
                    .map_err(|e| ApiError::internal(format!("database connection failed: {e}")))?;

                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .map_err(|e| ApiError::internal(format!("migration failed: {e}")))?;

                tracing::info!("storage: PostgreSQL");
                Some(pool)
            }
            None => {
                tracing::warn!("storage: memory fallback, data is lost on restart");
                None
            }
        };

        Ok(match pool {
            Some(pool) => Self {
                employee_repo: Some(Arc::new(EmployeeRepository::new(pool.clone()))),
                site_repo: Some(Arc::new(SiteRepository::new(pool.clone()))),
                ledger: Arc::new(PunchLedger::with_postgres(pool.clone())),
                registry: Arc::new(CredentialRegistry::new(
                    rp,
                    CeremonyStorage::with_postgres(pool),
                )),
            },
            None => Self {
                employee_repo: None,
                site_repo: None,
                ledger: Arc::new(PunchLedger::in_memory()),
                registry: Arc::new(CredentialRegistry::new(rp, CeremonyStorage::in_memory())),
            },
        })
    }

    /// Build state from environment variables.
    pub async fn from_env() -> Result<Self, ApiError> {
        Self::from_config(&Config::from_env()).await
    }

    /// Fully in-memory state (for testing).
    pub fn in_memory() -> Result<Self, ApiError> {
        let rp = RelyingParty::from_env()
            .map_err(|e| ApiError::internal(format!("relying party configuration failed: {e}")))?;
        Ok(Self {
            employee_repo: None,
            site_repo: None,
            ledger: Arc::new(PunchLedger::in_memory()),
            registry: Arc::new(CredentialRegistry::new(rp, CeremonyStorage::in_memory())),
        })
    }

    /// Employee repository, or 503 when no database is configured.
    pub fn employee_repo(&self) -> Result<&EmployeeRepository, ApiError> {
        self.employee_repo
            .as_deref()
            .ok_or_else(|| ApiError::service_unavailable("Employee store not configured"))
    }

    /// Site repository, or 503 when no database is configured.
    pub fn site_repo(&self) -> Result<&SiteRepository, ApiError> {
        self.site_repo
            .as_deref()
            .ok_or_else(|| ApiError::service_unavailable("Site store not configured"))
    }
}
