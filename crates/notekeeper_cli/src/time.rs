//! Local-time parsing and formatting for the CLI.

use anyhow::{anyhow, bail, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};

const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parses a local date-time such as `2026-10-20 14:30` into epoch ms.
pub fn parse_due(value: &str) -> Result<i64> {
    let trimmed = value.trim();
    let naive = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| anyhow!("invalid date/time `{trimmed}`; expected YYYY-MM-DD HH:MM"))?;
    local_millis(naive)
}

/// `[start, end)` epoch ms bounds of a local calendar day.
pub fn day_bounds(value: &str) -> Result<(i64, i64)> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| anyhow!("invalid date `{}`: {err}", value.trim()))?;
    let next = date
        .succ_opt()
        .ok_or_else(|| anyhow!("date `{date}` has no following day"))?;
    Ok((start_of(date)?, start_of(next)?))
}

pub fn format_ms(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(at) => at.format(DISPLAY_FORMAT).to_string(),
        None => format!("@{ms}"),
    }
}

fn start_of(date: NaiveDate) -> Result<i64> {
    match date.and_hms_opt(0, 0, 0) {
        Some(midnight) => local_millis(midnight),
        None => bail!("invalid midnight for {date}"),
    }
}

fn local_millis(naive: NaiveDateTime) -> Result<i64> {
    // DST gaps have no local mapping; ambiguous folds take the earlier instant.
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|at| at.timestamp_millis())
        .ok_or_else(|| anyhow!("`{naive}` does not exist in the local time zone"))
}

#[cfg(test)]
mod tests {
    use super::{day_bounds, format_ms, parse_due};

    #[test]
    fn parse_and_format_roundtrip_at_minute_precision() {
        let ms = parse_due("2026-10-20 14:30").unwrap();
        assert_eq!(format_ms(ms), "2026-10-20 14:30");
        assert_eq!(parse_due("2026-10-20T14:30").unwrap(), ms);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_due("tomorrow").is_err());
        assert!(day_bounds("2026-13-01").is_err());
    }

    #[test]
    fn day_bounds_cover_the_day() {
        let (start, end) = day_bounds("2026-10-20").unwrap();
        let noon = parse_due("2026-10-20 12:00").unwrap();
        assert!(start <= noon && noon < end);
        assert_eq!(format_ms(start), "2026-10-20 00:00");
    }
}
