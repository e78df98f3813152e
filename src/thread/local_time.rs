// ABOUTME: Resolves a user-typed local time or date-time into a Unix instant
// ABOUTME: Formats come from ThreadConfig; the whole input must match

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone};
use slackline_core::config::ThreadConfig;

/// Resolve `input` against the current local clock.
pub fn resolve_local_time(input: &str, formats: &ThreadConfig) -> Option<i64> {
    resolve_at(input, &Local::now(), formats)
}

/// Resolve `input` relative to `now`.
///
/// Tries the time-only format first, taking the calendar date from `now`,
/// then the full date-time format. Each attempt must consume all of `input`;
/// trailing text fails the attempt. Returns `None` when neither matches or
/// the wall-clock time does not exist in `now`'s timezone. An instant of
/// exactly zero is also `None`.
pub fn resolve_at<Tz: TimeZone>(
    input: &str,
    now: &DateTime<Tz>,
    formats: &ThreadConfig,
) -> Option<i64> {
    let naive = parse_time_today(input, now, formats)
        .or_else(|| NaiveDateTime::parse_from_str(input, &formats.date_time_format()).ok())?;

    let instant = now
        .timezone()
        .from_local_datetime(&naive)
        .earliest()?
        .timestamp();

    (instant != 0).then_some(instant)
}

fn parse_time_today<Tz: TimeZone>(
    input: &str,
    now: &DateTime<Tz>,
    formats: &ThreadConfig,
) -> Option<NaiveDateTime> {
    let time = NaiveTime::parse_from_str(input, &formats.time_format).ok()?;
    Some(now.date_naive().and_time(time))
}
