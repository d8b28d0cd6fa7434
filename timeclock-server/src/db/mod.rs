//! Database module for the timeclock server
//!
//! Contains entities, repositories, and the punch ledger.

pub mod employee;
pub mod punch;
pub mod site;

pub use employee::{Employee, EmployeeRepository};
pub use punch::{LedgerError, PunchLedger, PunchRecord, PunchStatus};
pub use site::{Site, SiteRepository};
