//! Worked-hours report handler
//!
//! Aggregates the punch ledger into per-employee worked hours over an
//! inclusive local date range. Punches are stored in UTC; the range bounds
//! and the night-rate breakpoint are interpreted in the server's local
//! timezone, so records are converted before classification.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use timeclock_core::{compute_aggregate, format_hours, PunchEvent};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::PunchRecord;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::validate_date_range;

/// Query parameters for the hours report
#[derive(Debug, Deserialize, IntoParams)]
pub struct HoursReportQuery {
    /// First day of the range (inclusive), YYYY-MM-DD
    #[param(example = "2026-03-01")]
    pub date_from: NaiveDate,
    /// Last day of the range (inclusive), YYYY-MM-DD
    #[param(example = "2026-03-31")]
    pub date_to: NaiveDate,
    /// Restrict the report to one employee
    #[param(value_type = Option<String>)]
    pub employee_id: Option<Uuid>,
}

/// Hour totals formatted as HH:MM for display
#[derive(Debug, Serialize, ToSchema)]
pub struct FormattedTotals {
    #[schema(example = "128:30")]
    pub total: String,
    pub normal: String,
    pub overtime: String,
    pub night_differential: String,
}

/// Per-employee aggregate in the report
#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeHours {
    #[schema(value_type = String)]
    pub employee_id: Uuid,
    pub employee_name: String,
    pub days_worked: usize,
    pub normal_hours: f64,
    pub overtime_hours: f64,
    pub night_differential_hours: f64,
    pub total_hours: f64,
    pub formatted: FormattedTotals,
}

/// Hours report response
#[derive(Debug, Serialize, ToSchema)]
pub struct HoursReportResponse {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub employees: Vec<EmployeeHours>,
}

/// Convert a local date to the UTC instant where it starts or ends.
///
/// A nonexistent local time (DST gap) falls back to reading the wall-clock
/// value as UTC, which can only widen the range.
fn local_bound(date: NaiveDate, end_of_day: bool) -> DateTime<Utc> {
    let naive = if end_of_day {
        date.and_hms_opt(23, 59, 59).unwrap_or_default()
    } else {
        date.and_hms_opt(0, 0, 0).unwrap_or_default()
    };
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}

fn to_event(record: &PunchRecord) -> PunchEvent {
    PunchEvent {
        kind: record.kind,
        at: record.timestamp.with_timezone(&Local).naive_local(),
    }
}

/// GET /reports/hours
///
/// Worked-hours totals per employee over an inclusive date range, split
/// into normal, overtime, and night-differential hours.
#[utoipa::path(
    get,
    path = "/reports/hours",
    tag = "Reports",
    params(HoursReportQuery),
    responses(
        (status = 200, description = "Aggregated worked hours", body = HoursReportResponse),
        (status = 400, description = "Invalid date range"),
        (status = 503, description = "Backing store not configured")
    )
)]
pub async fn hours_report(
    State(state): State<AppState>,
    Query(query): Query<HoursReportQuery>,
) -> Result<Json<HoursReportResponse>, ApiError> {
    validate_date_range(query.date_from, query.date_to)?;
    let employee_repo = state.employee_repo()?;

    let from = local_bound(query.date_from, false);
    let to = local_bound(query.date_to, true);
    let records = state.ledger.list_range(from, to, query.employee_id).await?;

    // BTreeMap keeps the output deterministic across runs
    let mut by_employee: BTreeMap<Uuid, Vec<PunchEvent>> = BTreeMap::new();
    for record in &records {
        by_employee
            .entry(record.employee_id)
            .or_default()
            .push(to_event(record));
    }

    let mut employees = Vec::with_capacity(by_employee.len());
    for (employee_id, events) in by_employee {
        let aggregate = compute_aggregate(&events);

        // Deactivated employees keep appearing in historical reports
        let employee_name = employee_repo
            .find_by_id(employee_id)
            .await
            .map_err(|e| ApiError::internal(format!("employee lookup failed: {e}")))?
            .map(|e| e.name)
            .unwrap_or_else(|| "<unknown>".to_string());

        employees.push(EmployeeHours {
            employee_id,
            employee_name,
            days_worked: aggregate.days_worked,
            normal_hours: aggregate.normal,
            overtime_hours: aggregate.overtime,
            night_differential_hours: aggregate.night_differential,
            total_hours: aggregate.total,
            formatted: FormattedTotals {
                total: format_hours(aggregate.total),
                normal: format_hours(aggregate.normal),
                overtime: format_hours(aggregate.overtime),
                night_differential: format_hours(aggregate.night_differential),
            },
        });
    }
    employees.sort_by(|a, b| a.employee_name.cmp(&b.employee_name));

    Ok(Json(HoursReportResponse {
        date_from: query.date_from,
        date_to: query.date_to,
        employees,
    }))
}
