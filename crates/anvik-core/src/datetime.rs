//! Natural-language date and time parsing in a user's timezone.
//!
//! Accepted date forms: `DD MMM YYYY` (month short or long, any case),
//! `MMM DD YYYY`, ISO `YYYY-MM-DD`, `today`, `tonight`, `tomorrow` and
//! weekday names (next occurrence). Accepted clock forms: `H:mm`,
//! `h:mm AM/PM` and `h AM/PM`. A bare hour without AM/PM is not a time.

use std::sync::OnceLock;

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use regex::Regex;

/// Time used when only a date is given.
pub const DEFAULT_EVENT_HOUR: u32 = 10;

/// Resolves an IANA name, falling back to UTC.
pub fn parse_timezone(name: &str) -> Tz {
    name.trim().parse().unwrap_or(Tz::UTC)
}

fn clock_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(am|pm|a\.m\.|p\.m\.)?$").expect("valid clock regex")
    })
}

fn trailing_clock_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*?)(?:,?\s+at)?\s+(\d{1,2}(?::\d{2})?\s*(?:am|pm|a\.m\.|p\.m\.)?)$")
            .expect("valid clock regex")
    })
}

fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parses a wall-clock time: `H:mm`, `h:mm am/pm` or `h am/pm`.
pub fn parse_clock(input: &str) -> Option<NaiveTime> {
    let s = normalize(input);
    let caps = clock_regex().captures(&s)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let meridiem = caps.get(3).map(|m| m.as_str().starts_with('p'));

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            }
        }
        // 24-hour form needs the minutes
        None if caps.get(2).is_some() => hour,
        None => return None,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn weekday_from(word: &str) -> Option<Weekday> {
    match word {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parses a calendar date relative to `today`.
pub fn parse_date(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = normalize(input);
    let s = s.strip_prefix("on ").unwrap_or(&s).trim_end_matches(',');
    let s = s.strip_prefix("next ").unwrap_or(s);

    match s {
        "today" | "tonight" => return Some(today),
        "tomorrow" => return today.succ_opt(),
        _ => {}
    }

    if let Some(target) = weekday_from(s) {
        let ahead = (target.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
        let ahead = if ahead == 0 { 7 } else { ahead };
        return today.checked_add_signed(Duration::days(i64::from(ahead)));
    }

    const FORMATS: &[&str] = &["%Y-%m-%d", "%d %B %Y", "%B %d %Y", "%B %d, %Y", "%d/%m/%Y"];
    FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

/// Maps a local wall-clock time onto `tz`, skipping forward over DST gaps.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

/// Resolved start of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDateTime {
    pub at: DateTime<Tz>,
    /// Whether the input named a time of day.
    pub has_time: bool,
}

/// Parses an event date/time in `tz`.
///
/// Tries RFC 3339 and ISO forms first, then `<date> [at] <time>`, then a
/// bare date (at 10:00) and finally a bare time (today).
pub fn parse_event_datetime(input: &str, tz: Tz, now: DateTime<Utc>) -> Option<ParsedDateTime> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ParsedDateTime {
            at: dt.with_timezone(&tz),
            has_time: true,
        });
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return localize(tz, naive).map(|at| ParsedDateTime { at, has_time: true });
        }
    }

    let today = now.with_timezone(&tz).date_naive();
    let s = normalize(trimmed);

    if let Some(caps) = trailing_clock_regex().captures(&s) {
        let date_part = caps.get(1).map_or("", |m| m.as_str());
        let time_part = caps.get(2).map_or("", |m| m.as_str());
        if let (Some(date), Some(time)) = (parse_date(date_part, today), parse_clock(time_part)) {
            return localize(tz, date.and_time(time)).map(|at| ParsedDateTime { at, has_time: true });
        }
    }

    if let Some(date) = parse_date(&s, today) {
        let time = NaiveTime::from_hms_opt(DEFAULT_EVENT_HOUR, 0, 0)?;
        return localize(tz, date.and_time(time)).map(|at| ParsedDateTime { at, has_time: false });
    }

    let bare = s.strip_prefix("at ").unwrap_or(&s);
    let time = parse_clock(bare)?;
    localize(tz, today.and_time(time)).map(|at| ParsedDateTime { at, has_time: true })
}

/// Next instant after `now` at which the wall clock in `tz` reads `time`.
pub fn next_occurrence(time: NaiveTime, tz: Tz, now: DateTime<Utc>) -> Option<DateTime<Tz>> {
    let today = now.with_timezone(&tz).date_naive();
    let candidate = localize(tz, today.and_time(time))?;
    if candidate.with_timezone(&Utc) > now {
        return Some(candidate);
    }
    localize(tz, today.succ_opt()?.and_time(time))
}

/// Due date for a task: `None` or anything unparseable means today.
pub fn resolve_due_date(input: Option<&str>, today: NaiveDate) -> NaiveDate {
    input
        .and_then(|s| parse_date(s, today))
        .unwrap_or(today)
}

/// Human-readable timestamp used in replies.
pub fn format_for_reply<T: TimeZone>(dt: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    dt.format("%d %b %Y, %I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_clock_forms() {
        assert_eq!(parse_clock("20:15"), NaiveTime::from_hms_opt(20, 15, 0));
        assert_eq!(parse_clock("8:05 PM"), NaiveTime::from_hms_opt(20, 5, 0));
        assert_eq!(parse_clock("8pm"), NaiveTime::from_hms_opt(20, 0, 0));
        assert_eq!(parse_clock("12 am"), NaiveTime::from_hms_opt(0, 0, 0));
        assert_eq!(parse_clock("12:30 pm"), NaiveTime::from_hms_opt(12, 30, 0));
        assert_eq!(parse_clock("8"), None);
        assert_eq!(parse_clock("25:00"), None);
        assert_eq!(parse_clock("13 pm"), None);
        assert_eq!(parse_clock("in an hour"), None);
    }

    #[test]
    fn test_parse_date_forms() {
        let today = date(2025, 3, 12); // Wednesday
        assert_eq!(parse_date("today", today), Some(today));
        assert_eq!(parse_date("Tomorrow", today), Some(date(2025, 3, 13)));
        assert_eq!(parse_date("25 Dec 2025", today), Some(date(2025, 12, 25)));
        assert_eq!(parse_date("25 december 2025", today), Some(date(2025, 12, 25)));
        assert_eq!(parse_date("Dec 25, 2025", today), Some(date(2025, 12, 25)));
        assert_eq!(parse_date("2025-11-01", today), Some(date(2025, 11, 1)));
        assert_eq!(parse_date("friday", today), Some(date(2025, 3, 14)));
        assert_eq!(parse_date("wednesday", today), Some(date(2025, 3, 19)));
        assert_eq!(parse_date("someday", today), None);
    }

    #[test]
    fn test_event_formats_in_timezone() {
        let tz: Tz = "Asia/Kolkata".parse().unwrap();
        let now = utc("2025-03-12T06:00:00Z");

        let parsed = parse_event_datetime("25 Dec 2025 5 PM", tz, now).unwrap();
        assert_eq!(parsed.at.date_naive(), date(2025, 12, 25));
        assert_eq!(parsed.at.hour(), 17);
        assert!(parsed.has_time);

        let parsed = parse_event_datetime("25 Dec 2025 17:30", tz, now).unwrap();
        assert_eq!((parsed.at.hour(), parsed.at.minute()), (17, 30));

        let parsed = parse_event_datetime("tomorrow at 5pm", tz, now).unwrap();
        assert_eq!(parsed.at.date_naive(), date(2025, 3, 13));
        assert_eq!(parsed.at.hour(), 17);
    }

    #[test]
    fn test_date_only_defaults_to_ten() {
        let now = utc("2025-03-12T06:00:00Z");
        let parsed = parse_event_datetime("25 Dec 2025", Tz::UTC, now).unwrap();
        assert_eq!(parsed.at.hour(), DEFAULT_EVENT_HOUR);
        assert!(!parsed.has_time);
    }

    #[test]
    fn test_rfc3339_converted_to_user_zone() {
        let tz: Tz = "Europe/London".parse().unwrap();
        let now = utc("2025-03-12T06:00:00Z");
        let parsed = parse_event_datetime("2025-07-01T09:00:00Z", tz, now).unwrap();
        // BST is UTC+1
        assert_eq!(parsed.at.hour(), 10);
    }

    #[test]
    fn test_garbage_is_none() {
        let now = utc("2025-03-12T06:00:00Z");
        assert!(parse_event_datetime("whenever", Tz::UTC, now).is_none());
        assert!(parse_event_datetime("", Tz::UTC, now).is_none());
    }

    #[test]
    fn test_next_occurrence_rolls_over() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // 14:00 local (EDT, UTC-4)
        let now = utc("2025-06-10T18:00:00Z");

        let later = next_occurrence(NaiveTime::from_hms_opt(20, 0, 0).unwrap(), tz, now).unwrap();
        assert_eq!(later.date_naive(), date(2025, 6, 10));
        assert_eq!(later.hour(), 20);

        let earlier = next_occurrence(NaiveTime::from_hms_opt(9, 0, 0).unwrap(), tz, now).unwrap();
        assert_eq!(earlier.date_naive(), date(2025, 6, 11));
        assert!(earlier.with_timezone(&Utc) > now);
    }

    #[test]
    fn test_next_occurrence_same_minute_rolls() {
        let now = utc("2025-06-10T18:00:00Z");
        let t = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        let next = next_occurrence(t, Tz::UTC, now).unwrap();
        assert_eq!(next.date_naive(), date(2025, 6, 11));
    }

    #[test]
    fn test_resolve_due_date_defaults_today() {
        let today = date(2025, 3, 12);
        assert_eq!(resolve_due_date(None, today), today);
        assert_eq!(resolve_due_date(Some("next week-ish"), today), today);
        assert_eq!(resolve_due_date(Some("tomorrow"), today), date(2025, 3, 13));
        assert_eq!(resolve_due_date(Some("01 Nov 2025"), today), date(2025, 11, 1));
    }

    #[test]
    fn test_unknown_timezone_falls_back() {
        assert_eq!(parse_timezone("Mars/Olympus"), Tz::UTC);
        assert_eq!(parse_timezone("Asia/Kolkata").name(), "Asia/Kolkata");
    }
}
