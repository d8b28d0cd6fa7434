//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod health;
pub mod punch;
pub mod reports;
pub mod sites;

pub use crate::state::AppState;
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use punch::{punch_entry, punch_exit, punch_status, PunchRequest, PunchResponse, StatusQuery};
pub use reports::{
    hours_report, EmployeeHours, FormattedTotals, HoursReportQuery, HoursReportResponse,
};
pub use sites::{nearby_sites, NearbyQuery, NearbySite};
