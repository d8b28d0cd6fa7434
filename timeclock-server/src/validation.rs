//! Input validation module
//!
//! Validates request input before any storage is touched: malformed input is
//! a 400, never a business-rule rejection.

use chrono::NaiveDate;

use crate::error::ApiError;

/// Validates a reported WGS84 coordinate pair.
///
/// Rejects non-finite values and out-of-range latitudes/longitudes.
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<(), ApiError> {
    if !lat.is_finite() || !lng.is_finite() {
        return Err(ApiError::bad_request("Coordinates must be finite numbers"));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(ApiError::bad_request(format!(
            "Latitude {} out of range [-90, 90]",
            lat
        )));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(ApiError::bad_request(format!(
            "Longitude {} out of range [-180, 180]",
            lng
        )));
    }
    Ok(())
}

/// Validates an inclusive report date range.
pub fn validate_date_range(from: NaiveDate, to: NaiveDate) -> Result<(), ApiError> {
    if from > to {
        return Err(ApiError::bad_request(format!(
            "date_from {} is after date_to {}",
            from, to
        )));
    }
    Ok(())
}
