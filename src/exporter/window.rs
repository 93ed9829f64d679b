//! Request-window planning for the catch-up loop.
//!
//! Windows are planned against a wall clock truncated *down* to the area's
//! resolution boundary, so a slot is only ever requested once it has fully
//! elapsed. Rounding up would ask the source for a slot still in progress.

use crate::entsoe::TimeInterval;
use chrono::{DateTime, Days, Duration, Months, Utc};

/// Length of one catch-up request window in minutes (4 days).
///
/// Bounds a single response's size while still making rapid progress when
/// far behind. A policy knob, not a correctness requirement: the loop keeps
/// planning windows until it is caught up either way.
const CATCH_UP_WINDOW_MINUTES: i64 = 4 * 24 * 60;

/// How far to look back on the first run of an area, in calendar units.
#[derive(Debug, Clone, Copy, Default)]
pub struct LookBack {
    /// Calendar years.
    pub years: u32,
    /// Calendar months.
    pub months: u32,
    /// Calendar days.
    pub days: u32,
}

/// Truncate a timestamp down to the nearest resolution boundary, aligned to
/// whole multiples of the resolution since the Unix epoch.
pub fn truncate_to_resolution(t: DateTime<Utc>, resolution_minutes: u32) -> DateTime<Utc> {
    if resolution_minutes == 0 {
        return t;
    }
    let step = i64::from(resolution_minutes) * 60;
    let secs = t.timestamp() - t.timestamp().rem_euclid(step);
    // Rounding down never leaves the representable range.
    DateTime::from_timestamp(secs, 0).unwrap_or(t)
}

/// Plan the next request window for an area.
///
/// With no checkpoint the window starts a calendar look-back ago; with a
/// checkpoint it starts one resolution unit after it, so an already-stored
/// slot is never requested again. The end is one catch-up window later,
/// clamped to the (truncated) current time. `None` means the area is caught
/// up and the pass is done.
pub fn next_window(
    resolution_minutes: u32,
    look_back: LookBack,
    last_retrieved: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<TimeInterval> {
    if resolution_minutes == 0 {
        return None;
    }
    let now = truncate_to_resolution(now, resolution_minutes);

    let start = match last_retrieved {
        Some(last) => last + Duration::minutes(i64::from(resolution_minutes)),
        None => initial_start(now, look_back),
    };

    let slots = CATCH_UP_WINDOW_MINUTES / i64::from(resolution_minutes);
    let mut end = start + Duration::minutes(slots * i64::from(resolution_minutes));
    if end > now {
        end = now;
    }

    if start >= end {
        return None;
    }
    Some(TimeInterval { start, end })
}

/// First-run window start: `now` minus the configured look-back, in calendar
/// arithmetic (a month ago in March is shorter than one in January). An
/// underflowing look-back collapses to an empty window.
fn initial_start(now: DateTime<Utc>, look_back: LookBack) -> DateTime<Utc> {
    let months = Months::new(look_back.years.saturating_mul(12) + look_back.months);
    now.checked_sub_months(months)
        .and_then(|t| t.checked_sub_days(Days::new(u64::from(look_back.days))))
        .unwrap_or(now)
}
