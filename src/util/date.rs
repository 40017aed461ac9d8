use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// Formats feeds use beyond RFC 2822 / RFC 3339. Parsed as naive local
/// times and taken as UTC — comparing across feeds needs one convention.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_ONLY_FORMATS: &[&str] = &["%Y-%m-%d", "%d %b %Y"];

/// Parses a loosely-formatted feed date into a canonical timestamp.
///
/// Total function: every input maps to some instant, falling back to "now"
/// rather than failing. The lookup order:
///
/// 1. Missing, empty, or whitespace-only input → current instant.
/// 2. RFC 2822 (`pubDate` style) or RFC 3339 (`published`/`updated` style),
///    then a short list of naive fallback formats. Offsets supplied by the
///    source are preserved; naive results are taken as UTC.
/// 3. A structured time tuple — the first 3 to 6 integer fields of the
///    string read as (year, month, day[, hour, minute, second]).
/// 4. Current instant.
pub fn parse_date(raw: Option<&str>) -> DateTime<FixedOffset> {
    let Some(s) = raw else {
        return now();
    };
    let s = s.trim();
    if s.is_empty() {
        return now();
    }
    parse_flexible(s)
        .or_else(|| parse_parts(s))
        .unwrap_or_else(now)
}

/// Short human-readable form, e.g. "Jan 01, 2024".
pub fn format_display(instant: &DateTime<FixedOffset>) -> String {
    instant.format("%b %d, %Y").to_string()
}

fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

fn parse_flexible(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    for fmt in DATE_ONLY_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset());
        }
    }
    None
}

/// Reads the string as a structured time tuple: integer runs in order as
/// (year, month, day, hour, minute, second). Year, month and day are
/// required; missing trailing fields are zero. Out-of-range fields reject
/// the whole string.
fn parse_parts(s: &str) -> Option<DateTime<FixedOffset>> {
    let mut fields = s
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(|run| run.parse::<u32>().ok());

    let mut next = || fields.next().flatten();
    let year = next()?;
    let month = next()?;
    let day = next()?;
    let (hour, minute, second) = (
        next().unwrap_or(0),
        next().unwrap_or(0),
        next().unwrap_or(0),
    );

    let date = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?;
    let naive = date.and_hms_opt(hour, minute, second)?;
    Some(naive.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Asserts that `parsed` is "now" within the window bracketing the call.
    fn assert_is_now(parsed: DateTime<FixedOffset>, before: DateTime<Utc>) {
        let after = Utc::now();
        assert!(parsed >= before.fixed_offset() && parsed <= after.fixed_offset());
    }

    #[test]
    fn test_rfc2822_gmt() {
        let dt = parse_date(Some("Mon, 01 Jan 2024 00:00:00 GMT"));
        assert_eq!(dt.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_rfc2822_offset_preserved() {
        let dt = parse_date(Some("Tue, 02 Jan 2024 10:30:00 -0500"));
        assert_eq!(dt.to_rfc3339(), "2024-01-02T10:30:00-05:00");
    }

    #[test]
    fn test_rfc3339_zulu() {
        let dt = parse_date(Some("2024-03-15T08:00:00Z"));
        assert_eq!(dt.to_rfc3339(), "2024-03-15T08:00:00+00:00");
    }

    #[test]
    fn test_rfc3339_offset_preserved() {
        let dt = parse_date(Some("2024-03-15T08:00:00+09:00"));
        assert_eq!(dt.to_rfc3339(), "2024-03-15T08:00:00+09:00");
    }

    #[test]
    fn test_naive_iso_taken_as_utc() {
        let dt = parse_date(Some("2024-03-15T08:00:00"));
        assert_eq!(dt.to_rfc3339(), "2024-03-15T08:00:00+00:00");
    }

    #[test]
    fn test_date_only() {
        let dt = parse_date(Some("2024-03-15"));
        assert_eq!(dt.to_rfc3339(), "2024-03-15T00:00:00+00:00");
    }

    #[test]
    fn test_structured_tuple() {
        let dt = parse_date(Some("(2024, 1, 2, 12, 30, 45)"));
        assert_eq!(dt.to_rfc3339(), "2024-01-02T12:30:45+00:00");
    }

    #[test]
    fn test_structured_tuple_partial() {
        let dt = parse_date(Some("2024 7 4"));
        assert_eq!(dt.to_rfc3339(), "2024-07-04T00:00:00+00:00");
    }

    #[test]
    fn test_none_is_now() {
        let before = Utc::now();
        assert_is_now(parse_date(None), before);
    }

    #[test]
    fn test_empty_is_now() {
        let before = Utc::now();
        assert_is_now(parse_date(Some("")), before);
        assert_is_now(parse_date(Some("   ")), before);
    }

    #[test]
    fn test_garbage_is_now() {
        let before = Utc::now();
        assert_is_now(parse_date(Some("sometime last week")), before);
    }

    #[test]
    fn test_out_of_range_tuple_is_now() {
        let before = Utc::now();
        assert_is_now(parse_date(Some("(2024, 13, 40)")), before);
    }

    #[test]
    fn test_format_display() {
        let dt = parse_date(Some("Mon, 01 Jan 2024 00:00:00 GMT"));
        assert_eq!(format_display(&dt), "Jan 01, 2024");

        let dt = parse_date(Some("2024-11-09T23:59:59Z"));
        assert_eq!(format_display(&dt), "Nov 09, 2024");
    }
}
