//! Local-day window math under the fixed +09:00 offset
//!
//! Every piece of day bucketing in the service goes through this
//! module: "today" navigation, the fetch window and the delete window
//! are all derived from the same two functions, so what is displayed
//! and what is deleted can never drift apart. The offset is fixed, not
//! read from the system timezone.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

/// Fixed local offset for day bucketing (+09:00)
const LOCAL_OFFSET_SECONDS: i32 = 9 * 60 * 60;

fn local_offset() -> FixedOffset {
    FixedOffset::east_opt(LOCAL_OFFSET_SECONDS).expect("valid fixed offset")
}

/// Calendar date currently in effect under the fixed local offset
pub fn today_local_date() -> NaiveDate {
    Utc::now().with_timezone(&local_offset()).date_naive()
}

/// Shift a local calendar date by whole days
///
/// Reconstructs local midnight of `date`, adds the days as an instant
/// shift, then re-derives the local calendar date of the result. The
/// two-step re-derivation keeps the arithmetic anchored to the offset
/// application point instead of raw day counting.
pub fn shift_local_date(date: NaiveDate, delta_days: i64) -> NaiveDate {
    let midnight = local_midnight(date);
    (midnight + Duration::days(delta_days))
        .with_timezone(&local_offset())
        .date_naive()
}

/// Half-open UTC window `[start, end)` covering one local calendar day
pub fn window_for(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(date).with_timezone(&Utc);
    let end = start + Duration::hours(24);
    (start, end)
}

/// Render an instant as `HH:MM` under the fixed local offset
///
/// Display only; bucketing never goes through this function.
pub fn format_local(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&local_offset())
        .format("%H:%M")
        .to_string()
}

fn local_midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    local_offset()
        .from_local_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight exists"))
        .single()
        .expect("fixed offsets have no ambiguous local times")
}
