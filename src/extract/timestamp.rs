/// Recover when a conversation happened from its rendered text.
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeDelta, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// "· 3h", "·5m", "· 2d"
static RELATIVE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"·\s*(\d+)([hmd])").expect("valid relative marker regex"));

/// "May 14", "Apr 2, 2023", "Dec 31 2022"
static MONTH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+(\d{1,2})(?:,?\s+(\d{4}))?")
        .expect("valid month date regex")
});

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Relative marker first, then an absolute month-day date. `now` carries the
/// local offset used for dates without a time of day.
pub fn parse_message_time(text: &str, now: DateTime<FixedOffset>) -> Option<DateTime<Utc>> {
    parse_relative(text, now).or_else(|| parse_month_date(text, now))
}

fn parse_relative(text: &str, now: DateTime<FixedOffset>) -> Option<DateTime<Utc>> {
    let caps = RELATIVE_MARKER.captures(text)?;
    let amount: i64 = caps[1].parse().ok()?;
    let delta = match &caps[2] {
        "m" => TimeDelta::try_minutes(amount)?,
        "h" => TimeDelta::try_hours(amount)?,
        "d" => TimeDelta::try_days(amount)?,
        _ => return None,
    };
    now.checked_sub_signed(delta).map(|t| t.with_timezone(&Utc))
}

fn parse_month_date(text: &str, now: DateTime<FixedOffset>) -> Option<DateTime<Utc>> {
    let caps = MONTH_DATE.captures(text)?;
    let month = MONTHS.iter().position(|m| *m == &caps[1])? as u32 + 1;
    let day: u32 = caps[2].parse().ok()?;
    let year = match caps.get(3) {
        Some(year) => year.as_str().parse().ok()?,
        None => now.year(),
    };

    let midnight = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    now.offset()
        .from_local_datetime(&midnight)
        .single()
        .map(|t| t.with_timezone(&Utc))
}

/// Remove every "· N[hmd]" marker
pub fn strip_relative_markers(text: &str) -> String {
    RELATIVE_MARKER.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-06-10T15:30:00+02:00").unwrap()
    }

    #[test]
    fn test_relative_units() {
        let now = now();
        assert_eq!(parse_message_time("Jane · 5m", now), Some((now - TimeDelta::minutes(5)).to_utc()));
        assert_eq!(parse_message_time("Jane ·2h", now), Some((now - TimeDelta::hours(2)).to_utc()));
        assert_eq!(parse_message_time("Jane · 3d\nhi", now), Some((now - TimeDelta::days(3)).to_utc()));
    }

    #[test]
    fn test_relative_wins_over_date() {
        let now = now();
        assert_eq!(
            parse_message_time("see you May 3 · 1h", now),
            Some((now - TimeDelta::hours(1)).to_utc())
        );
    }

    #[test]
    fn test_month_date_defaults_to_current_year() {
        let parsed = parse_message_time("Jane\nMay 14\nhello", now()).unwrap();
        // Local midnight at +02:00
        assert_eq!(parsed, DateTime::parse_from_rfc3339("2024-05-13T22:00:00Z").unwrap());
    }

    #[test]
    fn test_month_date_with_year() {
        let parsed = parse_message_time("Apr 2, 2023", now()).unwrap();
        assert_eq!(parsed, DateTime::parse_from_rfc3339("2023-04-01T22:00:00Z").unwrap());

        let parsed = parse_message_time("Dec 31 2022", now()).unwrap();
        assert_eq!(parsed, DateTime::parse_from_rfc3339("2022-12-30T22:00:00Z").unwrap());
    }

    #[test]
    fn test_unparseable_text() {
        assert_eq!(parse_message_time("hey are you free", now()), None);
        assert_eq!(parse_message_time("Feb 31", now()), None);
        assert_eq!(parse_message_time("Mayday 4", now()), None);
    }

    #[test]
    fn test_strip_relative_markers() {
        assert_eq!(strip_relative_markers("Jane Doe · 2h"), "Jane Doe ");
        assert_eq!(strip_relative_markers("a ·1m b · 4d"), "a  b ");
    }
}
