//! Bookable-window policy: weekly recurring rules, date overrides, overlap
//! and notice checks. Pure functions; the repository re-checks overlap
//! inside the claiming transaction.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use service_core::error::AppError;

use crate::models::{AvailabilityOverride, AvailabilityRule};

/// An available window within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Available windows for a calendar date.
///
/// Overrides replace the weekly rules for their date: an unavailable
/// override blocks the whole day; an available override with times narrows
/// the day to those windows; an available override without times leaves the
/// weekly rules in force.
pub fn windows_for_date(
    date: chrono::NaiveDate,
    rules: &[AvailabilityRule],
    overrides: &[AvailabilityOverride],
) -> Vec<TimeWindow> {
    let todays: Vec<&AvailabilityOverride> = overrides.iter().filter(|o| o.date == date).collect();

    if todays.iter().any(|o| !o.is_available) {
        return Vec::new();
    }

    let overriding: Vec<TimeWindow> = todays
        .iter()
        .filter_map(|o| match (o.start_time, o.end_time) {
            (Some(start), Some(end)) if start < end => Some(TimeWindow { start, end }),
            _ => None,
        })
        .collect();
    if !overriding.is_empty() {
        return overriding;
    }

    let weekday = date.weekday().num_days_from_monday() as i16;
    rules
        .iter()
        .filter(|r| r.day_of_week == weekday)
        .map(|r| TimeWindow {
            start: r.start_time,
            end: r.end_time,
        })
        .collect()
}

/// Whether `[start, end)` lies inside an available window on its date.
pub fn fits_availability(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    rules: &[AvailabilityRule],
    overrides: &[AvailabilityOverride],
) -> bool {
    let date = start.date_naive();
    if end.date_naive() != date {
        return false;
    }
    let (start_t, end_t) = (start.time(), end.time());
    windows_for_date(date, rules, overrides)
        .iter()
        .any(|w| w.start <= start_t && end_t <= w.end)
}

/// Half-open interval overlap.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Advisory-lock key for claims on the booking's calendar day. Claims that
/// share a day take the same lock and so check overlap one at a time.
pub fn day_lock_key(start_time: DateTime<Utc>) -> i64 {
    i64::from(start_time.date_naive().num_days_from_ce())
}

/// Enforce the booking type's notice and advance limits relative to now.
pub fn check_notice(
    now: DateTime<Utc>,
    start_time: DateTime<Utc>,
    min_notice_hours: i32,
    max_advance_days: i32,
) -> Result<(), AppError> {
    if start_time < now + Duration::hours(min_notice_hours as i64) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Bookings require at least {} hours notice",
            min_notice_hours
        )));
    }
    if start_time > now + Duration::days(max_advance_days as i64) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Bookings can be made at most {} days in advance",
            max_advance_days
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use uuid::Uuid;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn rule(day: i16, start: NaiveTime, end: NaiveTime) -> AvailabilityRule {
        AvailabilityRule {
            rule_id: Uuid::new_v4(),
            day_of_week: day,
            start_time: start,
            end_time: end,
            created_utc: Utc::now(),
        }
    }

    fn day_override(
        date: NaiveDate,
        is_available: bool,
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
    ) -> AvailabilityOverride {
        AvailabilityOverride {
            override_id: Uuid::new_v4(),
            date,
            is_available,
            start_time: start,
            end_time: end,
            reason: None,
            created_utc: Utc::now(),
        }
    }

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    // 2026-03-02 is a Monday.
    const MONDAY: (i32, u32, u32) = (2026, 3, 2);

    #[test]
    fn weekly_rule_applies_on_its_weekday() {
        let rules = vec![rule(0, t(9, 0), t(17, 0))];
        let monday = NaiveDate::from_ymd_opt(MONDAY.0, MONDAY.1, MONDAY.2).unwrap();
        let windows = windows_for_date(monday, &rules, &[]);
        assert_eq!(
            windows,
            vec![TimeWindow {
                start: t(9, 0),
                end: t(17, 0)
            }]
        );
        // Tuesday has no rule
        assert!(windows_for_date(monday.succ_opt().unwrap(), &rules, &[]).is_empty());
    }

    #[test]
    fn unavailable_override_blocks_the_whole_day() {
        let rules = vec![rule(0, t(9, 0), t(17, 0))];
        let monday = NaiveDate::from_ymd_opt(MONDAY.0, MONDAY.1, MONDAY.2).unwrap();
        let overrides = vec![day_override(monday, false, None, None)];
        assert!(windows_for_date(monday, &rules, &overrides).is_empty());
    }

    #[test]
    fn available_override_with_times_replaces_weekly_rules() {
        let rules = vec![rule(0, t(9, 0), t(17, 0))];
        let monday = NaiveDate::from_ymd_opt(MONDAY.0, MONDAY.1, MONDAY.2).unwrap();
        let overrides = vec![day_override(monday, true, Some(t(13, 0)), Some(t(15, 0)))];
        assert_eq!(
            windows_for_date(monday, &rules, &overrides),
            vec![TimeWindow {
                start: t(13, 0),
                end: t(15, 0)
            }]
        );
    }

    #[test]
    fn booking_must_fit_inside_a_window() {
        let rules = vec![rule(0, t(9, 0), t(17, 0))];
        let (y, mo, d) = MONDAY;
        assert!(fits_availability(
            dt(y, mo, d, 10, 0),
            dt(y, mo, d, 11, 0),
            &rules,
            &[]
        ));
        // spills past the end of the window
        assert!(!fits_availability(
            dt(y, mo, d, 16, 30),
            dt(y, mo, d, 17, 30),
            &rules,
            &[]
        ));
        // starts before the window opens
        assert!(!fits_availability(
            dt(y, mo, d, 8, 0),
            dt(y, mo, d, 9, 30),
            &rules,
            &[]
        ));
    }

    #[test]
    fn overlap_is_half_open() {
        let (y, mo, d) = MONDAY;
        let a = (dt(y, mo, d, 10, 0), dt(y, mo, d, 11, 0));
        // back-to-back bookings do not overlap
        assert!(!overlaps(a.0, a.1, dt(y, mo, d, 11, 0), dt(y, mo, d, 12, 0)));
        assert!(overlaps(a.0, a.1, dt(y, mo, d, 10, 30), dt(y, mo, d, 11, 30)));
        assert!(overlaps(a.0, a.1, dt(y, mo, d, 9, 0), dt(y, mo, d, 12, 0)));
    }

    #[test]
    fn claims_on_the_same_day_share_a_lock_key() {
        let (y, mo, d) = MONDAY;
        assert_eq!(
            day_lock_key(dt(y, mo, d, 9, 0)),
            day_lock_key(dt(y, mo, d, 16, 0))
        );
        assert_ne!(
            day_lock_key(dt(y, mo, d, 9, 0)),
            day_lock_key(dt(y, mo, d + 1, 9, 0))
        );
    }

    #[test]
    fn notice_window_is_enforced() {
        let now = dt(2026, 3, 2, 12, 0);
        // 24h notice: tomorrow-morning start rejected, next-week start allowed
        assert!(check_notice(now, dt(2026, 3, 2, 18, 0), 24, 60).is_err());
        assert!(check_notice(now, dt(2026, 3, 9, 10, 0), 24, 60).is_ok());
        // beyond the advance limit
        assert!(check_notice(now, dt(2026, 6, 1, 10, 0), 24, 60).is_err());
    }
}
