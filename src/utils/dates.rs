use chrono::{Duration, NaiveDateTime, TimeDelta, Utc};

use crate::models::projects::{PackageTier, SizeClass};

/// Base turnaround used when a stored package tier is not recognized.
pub const DEFAULT_BASE_DAYS: i64 = 5;

#[derive(Debug, thiserror::Error)]
#[error("ETA shifted by {0} day(s) is out of range")]
pub struct EtaOutOfRange(pub i64);

/// Current UTC wall-clock time. All project timestamps are naive UTC so day
/// arithmetic never crosses a daylight-saving shift.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Whole days of turnaround for a package tier and size class.
///
/// Unknown tiers fall back to [`DEFAULT_BASE_DAYS`]; any size other than
/// `large` is treated as normal. Large projects take 1.5x, rounded up.
pub fn turnaround_days(package: &str, size: &str) -> i64 {
    let base_days = package
        .parse::<PackageTier>()
        .map(|tier| tier.base_days())
        .unwrap_or(DEFAULT_BASE_DAYS);

    match size.parse::<SizeClass>() {
        Ok(SizeClass::Large) => (base_days * 3 + 1) / 2,
        _ => base_days,
    }
}

pub fn calc_eta(start: NaiveDateTime, package: &str, size: &str) -> NaiveDateTime {
    start + Duration::days(turnaround_days(package, size))
}

/// Moves an ETA by a signed number of days, keeping the time of day.
/// `None` when the result leaves the representable date range.
pub fn shift_eta(eta: NaiveDateTime, delta_days: i64) -> Option<NaiveDateTime> {
    TimeDelta::try_days(delta_days).and_then(|delta| eta.checked_add_signed(delta))
}

/// Whole hours left until `deadline`, floored and never negative.
pub fn hours_until(deadline: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (deadline - now).num_hours().max(0)
}
