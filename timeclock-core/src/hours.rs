//! Worked-hours computation over punch pairs.
//!
//! A punch pair (entry, exit) is split into three buckets:
//!
//! - **normal**: day-portion minutes up to the daily threshold
//! - **overtime**: day-portion minutes beyond the threshold
//! - **night differential**: minutes after the 21:00 night boundary of the
//!   entry's calendar day, reported separately and never split further
//!
//! The night boundary is a single breakpoint, not a recurring nightly
//! window: a shift starting after 21:00 is entirely night, one ending before
//! 21:00 is entirely day, and minutes past midnight stay night.
//!
//! All hour values are rounded to 2 decimals at the point of computation.
//! Aggregates sum the already-rounded per-pair values so per-pair and
//! aggregate report views always agree.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::punch::PunchKind;

/// Daily normal-hours threshold, applied to the day portion only.
pub const DAILY_NORMAL_HOURS: i64 = 6;

/// Local hour at which the night-differential window opens.
pub const NIGHT_START_HOUR: u32 = 21;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Hour buckets for a single punch pair, 2-decimal rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HoursDetail {
    pub total: f64,
    pub normal: f64,
    pub overtime: f64,
    pub night_differential: f64,
}

/// A punch event as seen by the accountant: local timestamp plus direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PunchEvent {
    pub kind: PunchKind,
    pub at: NaiveDateTime,
}

/// Summed hour buckets for one employee over a record range.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateHours {
    /// Distinct calendar days with at least one punch in the range.
    pub days_worked: usize,
    pub normal: f64,
    pub overtime: f64,
    pub night_differential: f64,
    pub total: f64,
}

fn round2(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

fn minutes_to_hours(minutes: i64) -> f64 {
    round2(minutes as f64 / 60.0)
}

/// Split a punch pair into hour buckets.
///
/// Returns all-zero when the interval is negative or at least 24h, guarding
/// reports against corrupted or unpaired historical data.
pub fn compute_detail(entry: NaiveDateTime, exit: NaiveDateTime) -> HoursDetail {
    let total_minutes = (exit - entry).num_minutes();
    if total_minutes < 0 || total_minutes >= MINUTES_PER_DAY {
        return HoursDetail::default();
    }

    // Single night breakpoint at 21:00 of the entry's calendar day.
    let night_start = entry
        .date()
        .and_hms_opt(NIGHT_START_HOUR, 0, 0)
        .expect("21:00:00 is a valid time of day");

    let night_minutes = if exit > night_start {
        (exit - entry.max(night_start)).num_minutes()
    } else {
        0
    };
    let day_minutes = total_minutes - night_minutes;

    let normal_limit = DAILY_NORMAL_HOURS * 60;
    let (normal_minutes, overtime_minutes) = if day_minutes > normal_limit {
        (normal_limit, day_minutes - normal_limit)
    } else {
        (day_minutes.max(0), 0)
    };

    HoursDetail {
        total: minutes_to_hours(total_minutes),
        normal: minutes_to_hours(normal_minutes),
        overtime: minutes_to_hours(overtime_minutes),
        night_differential: minutes_to_hours(night_minutes),
    }
}

/// Sum hour buckets over a chronologically ordered punch sequence.
///
/// Pairs each ENTRY with the next EXIT in the sequence. Malformed runs
/// (ENTRY followed by ENTRY, or a dangling ENTRY with no EXIT in the range)
/// contribute zero and are skipped rather than erroring; dangling EXITs are
/// ignored. Pairs rejected by [`compute_detail`] contribute nothing.
pub fn compute_aggregate(events: &[PunchEvent]) -> AggregateHours {
    let mut days: HashSet<chrono::NaiveDate> = HashSet::new();
    let mut normal = 0.0;
    let mut overtime = 0.0;
    let mut night = 0.0;
    let mut total = 0.0;

    for event in events {
        days.insert(event.at.date());
    }

    let mut i = 0;
    while i < events.len() {
        if events[i].kind == PunchKind::Entry {
            // Scan forward to the next EXIT, skipping anomalies.
            let mut j = i + 1;
            while j < events.len() && events[j].kind != PunchKind::Exit {
                j += 1;
            }

            if j < events.len() {
                let detail = compute_detail(events[i].at, events[j].at);
                if detail.total > 0.0 {
                    total += detail.total;
                    normal += detail.normal;
                    overtime += detail.overtime;
                    night += detail.night_differential;
                }
                i = j;
            }
        }
        i += 1;
    }

    AggregateHours {
        days_worked: days.len(),
        normal: round2(normal),
        overtime: round2(overtime),
        night_differential: round2(night),
        total: round2(total),
    }
}

/// Format decimal hours as `HH:MM` for report display.
pub fn format_hours(decimal_hours: f64) -> String {
    let hours = decimal_hours.floor() as i64;
    let minutes = ((decimal_hours - hours as f64) * 60.0).round() as i64;
    format!("{hours:02}:{minutes:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn event(kind: PunchKind, ts: NaiveDateTime) -> PunchEvent {
        PunchEvent { kind, at: ts }
    }

    #[test]
    fn test_day_shift_with_overtime() {
        // 09:00 -> 17:00: 8h of day work, threshold 6h
        let detail = compute_detail(at(2, 9, 0), at(2, 17, 0));
        assert_eq!(detail.total, 8.0);
        assert_eq!(detail.normal, 6.0);
        assert_eq!(detail.overtime, 2.0);
        assert_eq!(detail.night_differential, 0.0);
    }

    #[test]
    fn test_shift_crossing_night_boundary() {
        // 20:00 -> 23:00: 1h day + 2h night
        let detail = compute_detail(at(2, 20, 0), at(2, 23, 0));
        assert_eq!(detail.total, 3.0);
        assert_eq!(detail.normal, 1.0);
        assert_eq!(detail.overtime, 0.0);
        assert_eq!(detail.night_differential, 2.0);
    }

    #[test]
    fn test_shift_entirely_after_night_start() {
        // 22:00 -> 02:00 next day: all night, nothing normal
        let detail = compute_detail(at(2, 22, 0), at(3, 2, 0));
        assert_eq!(detail.total, 4.0);
        assert_eq!(detail.normal, 0.0);
        assert_eq!(detail.overtime, 0.0);
        assert_eq!(detail.night_differential, 4.0);
    }

    #[test]
    fn test_night_includes_past_midnight() {
        // 18:00 -> 01:00 next day: 3h day, 4h night (21:00 onward)
        let detail = compute_detail(at(2, 18, 0), at(3, 1, 0));
        assert_eq!(detail.total, 7.0);
        assert_eq!(detail.normal, 3.0);
        assert_eq!(detail.overtime, 0.0);
        assert_eq!(detail.night_differential, 4.0);
    }

    #[test]
    fn test_negative_interval_is_zeroed() {
        let detail = compute_detail(at(2, 17, 0), at(2, 9, 0));
        assert_eq!(detail, HoursDetail::default());
    }

    #[test]
    fn test_full_day_interval_is_zeroed() {
        // Exactly 24h is rejected
        let detail = compute_detail(at(2, 9, 0), at(3, 9, 0));
        assert_eq!(detail, HoursDetail::default());
    }

    #[test]
    fn test_two_decimal_rounding() {
        // 09:00 -> 16:10: 7h10m total, 6h normal + 1h10m overtime
        let detail = compute_detail(at(2, 9, 0), at(2, 16, 10));
        assert_eq!(detail.total, 7.17);
        assert_eq!(detail.normal, 6.0);
        assert_eq!(detail.overtime, 1.17);
    }

    #[test]
    fn test_aggregate_pairs_and_days() {
        let events = vec![
            event(PunchKind::Entry, at(2, 9, 0)),
            event(PunchKind::Exit, at(2, 17, 0)),
            event(PunchKind::Entry, at(3, 20, 0)),
            event(PunchKind::Exit, at(3, 23, 0)),
        ];
        let agg = compute_aggregate(&events);
        assert_eq!(agg.days_worked, 2);
        assert_eq!(agg.total, 11.0);
        assert_eq!(agg.normal, 7.0);
        assert_eq!(agg.overtime, 2.0);
        assert_eq!(agg.night_differential, 2.0);
    }

    #[test]
    fn test_aggregate_skips_double_entry() {
        // ENTRY-ENTRY anomaly: the scan pairs the first ENTRY with the next
        // EXIT and the duplicate in between is skipped.
        let events = vec![
            event(PunchKind::Entry, at(2, 9, 0)),
            event(PunchKind::Entry, at(2, 10, 0)),
            event(PunchKind::Exit, at(2, 14, 0)),
        ];
        let agg = compute_aggregate(&events);
        // Pairing takes the first ENTRY with the EXIT: 5h
        assert_eq!(agg.total, 5.0);
        assert_eq!(agg.days_worked, 1);
    }

    #[test]
    fn test_aggregate_dangling_entry_contributes_zero() {
        let events = vec![
            event(PunchKind::Entry, at(2, 9, 0)),
            event(PunchKind::Exit, at(2, 15, 0)),
            event(PunchKind::Entry, at(3, 9, 0)),
        ];
        let agg = compute_aggregate(&events);
        assert_eq!(agg.total, 6.0);
        // The dangling day still counts as a worked day (a punch exists).
        assert_eq!(agg.days_worked, 2);
    }

    #[test]
    fn test_aggregate_leading_exit_ignored() {
        let events = vec![
            event(PunchKind::Exit, at(2, 8, 0)),
            event(PunchKind::Entry, at(2, 9, 0)),
            event(PunchKind::Exit, at(2, 12, 0)),
        ];
        let agg = compute_aggregate(&events);
        assert_eq!(agg.total, 3.0);
    }

    #[test]
    fn test_aggregate_empty() {
        let agg = compute_aggregate(&[]);
        assert_eq!(agg, AggregateHours::default());
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(8.0), "08:00");
        assert_eq!(format_hours(7.17), "07:10");
        assert_eq!(format_hours(0.5), "00:30");
        assert_eq!(format_hours(12.25), "12:15");
    }
}
