//! Timeclock Server Library - REST API for verified attendance tracking
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod ceremony;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod validation;

pub use ceremony::{CeremonyError, CredentialRegistry, RelyingParty};
pub use config::Config;
pub use db::{
    Employee, EmployeeRepository, LedgerError, PunchLedger, PunchRecord, PunchStatus, Site,
    SiteRepository,
};
pub use error::ApiError;
pub use openapi::ApiDoc;
pub use routes::{create_router, create_router_with_config};
pub use state::AppState;
