//! Timeclock Core - attendance verification and time-accounting primitives
//!
//! This crate provides the pure domain logic of the timeclock attendance
//! service: geofence resolution against a set of authorized sites and the
//! worked-hours computation that splits punch pairs into normal, overtime
//! and night-differential buckets.
//!
//! Everything here is I/O-free and infallible on bad input: reports must not
//! crash on historical data anomalies, so the accounting functions return
//! zeroed results instead of errors, and geofence resolution returns an
//! explicit [`GeoResolution::NoSites`] rather than guessing.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use timeclock_core::compute_detail;
//!
//! let entry = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap().and_hms_opt(9, 0, 0).unwrap();
//! let exit = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap().and_hms_opt(17, 0, 0).unwrap();
//!
//! let detail = compute_detail(entry, exit);
//! assert_eq!(detail.total, 8.0);
//! assert_eq!(detail.normal, 6.0);
//! assert_eq!(detail.overtime, 2.0);
//! assert_eq!(detail.night_differential, 0.0);
//! ```

pub mod error;
pub mod geo;
pub mod hours;
pub mod punch;

// Re-export main types for convenience
pub use error::CoreError;
pub use geo::{haversine_distance, resolve, GeoResolution, GeoSite, EARTH_RADIUS_METERS};
pub use hours::{
    compute_aggregate, compute_detail, format_hours, AggregateHours, HoursDetail, PunchEvent,
    DAILY_NORMAL_HOURS, NIGHT_START_HOUR,
};
pub use punch::{PunchKind, VerificationMethod};
