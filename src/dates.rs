//! # Date Normalizer
//! Maps free-form listing dates ("Saturday, February 21st", "01/10/2026 09:00 AM PST",
//! "Feb 6-8, 2026", ...) to a total-order sort key.
//!
//! Pure: the reference clock is passed in as `now`, nothing reads the wall clock.
//! Dates that match no template degrade to [`NormalizedDate::Unparseable`], which
//! sorts after every real date.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::OnceCell;
use regex::Regex;

/// Placeholder strings sources emit when they found no date.
pub const SENTINEL_DATES: &[&str] = &["Date not found", "Date TBD"];

/// Leap year used to validate month/day pairs before the real year is inferred.
const PLACEHOLDER_YEAR: i32 = 2000;

/// Sort key for a listing date. Variant order matters: every `At` < `Unparseable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NormalizedDate {
    At(NaiveDateTime),
    Unparseable,
}

impl NormalizedDate {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            NormalizedDate::At(dt) => Some(dt.date()),
            NormalizedDate::Unparseable => None,
        }
    }

    pub fn is_unparseable(&self) -> bool {
        matches!(self, NormalizedDate::Unparseable)
    }
}

/// One entry of the template table: a display name and its parser.
pub struct DateTemplate {
    pub name: &'static str,
    parse: fn(&str, NaiveDateTime) -> Option<NaiveDateTime>,
}

impl DateTemplate {
    pub fn parse(&self, cleaned: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
        (self.parse)(cleaned, now)
    }
}

/// Templates in priority order, most specific first. First hit wins.
pub static TEMPLATES: &[DateTemplate] = &[
    DateTemplate {
        name: "Month D, YYYY",
        parse: parse_long_with_year,
    },
    DateTemplate {
        name: "Mon D, YYYY",
        parse: parse_short_with_year,
    },
    DateTemplate {
        name: "MM/DD/YYYY HH:MM AM/PM",
        parse: parse_numeric_with_time,
    },
    DateTemplate {
        name: "MM/DD/YYYY",
        parse: parse_numeric,
    },
    DateTemplate {
        name: "Mon D",
        parse: parse_short_no_year,
    },
    DateTemplate {
        name: "Month D",
        parse: parse_long_no_year,
    },
    DateTemplate {
        name: "Mon D + current year",
        parse: parse_short_append_year,
    },
];

fn parse_long_with_year(s: &str, _now: NaiveDateTime) -> Option<NaiveDateTime> {
    date_at_midnight(s, "%B %d, %Y")
}

fn parse_short_with_year(s: &str, _now: NaiveDateTime) -> Option<NaiveDateTime> {
    date_at_midnight(s, "%b %d, %Y")
}

fn parse_numeric_with_time(s: &str, _now: NaiveDateTime) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%m/%d/%Y %I:%M %p").ok()
}

fn parse_numeric(s: &str, _now: NaiveDateTime) -> Option<NaiveDateTime> {
    date_at_midnight(s, "%m/%d/%Y")
}

fn parse_short_no_year(s: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    month_day_forward(s, "%b %d %Y", now)
}

fn parse_long_no_year(s: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    month_day_forward(s, "%B %d %Y", now)
}

fn parse_short_append_year(s: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let with_year = format!("{s} {}", now.year());
    let d = NaiveDate::parse_from_str(&with_year, "%b %d %Y").ok()?;
    forward_year(d.month(), d.day(), now).and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn date_at_midnight(s: &str, fmt: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(s, fmt)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Year-less input: validate month/day against a leap placeholder, then infer the year.
fn month_day_forward(s: &str, fmt_with_year: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let probe = format!("{s} {PLACEHOLDER_YEAR}");
    let d = NaiveDate::parse_from_str(&probe, fmt_with_year).ok()?;
    forward_year(d.month(), d.day(), now).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Current year unless that date already passed, then the next year the date exists in.
pub fn forward_year(month: u32, day: u32, now: NaiveDateTime) -> Option<NaiveDate> {
    let today = now.date();
    (now.year()..=now.year() + 4)
        .filter_map(|y| NaiveDate::from_ymd_opt(y, month, day))
        .find(|d| *d >= today)
}

fn re_weekday() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(monday|tuesday|wednesday|thursday|friday|saturday|sunday),?\s+")
            .expect("weekday regex")
    })
}

fn re_ordinal() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("ordinal regex"))
}

fn re_timezone() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+(PST|PDT|EST|EDT)\b.*$").expect("timezone regex"))
}

fn re_year() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4})\s*$").expect("year regex"))
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// Steps 1-4 of normalization plus timezone stripping.
/// Returns `None` for sentinel/empty input.
pub fn clean_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || SENTINEL_DATES.contains(&trimmed) {
        return None;
    }

    let mut s = re_ws().replace_all(trimmed, " ").to_string();
    s = re_weekday().replace(&s, "").to_string();
    s = re_ordinal().replace_all(&s, "$1").to_string();

    // A range collapses to its start; a trailing year on the end carries over.
    if let Some(idx) = s.find(['-', '\u{2013}']) {
        let (start, rest) = s.split_at(idx);
        let start = start.trim().trim_end_matches(',').trim();
        let end_year = re_year().captures(rest).map(|c| c[1].to_string());
        let collapsed = match end_year {
            Some(y) if !re_year().is_match(start) && !start.contains('/') => {
                format!("{start}, {y}")
            }
            _ => start.to_string(),
        };
        s = collapsed;
    }

    s = re_timezone().replace(&s, "").to_string();
    Some(s.trim().to_string())
}

fn parse_cleaned(cleaned: &str, now: NaiveDateTime) -> Option<(&'static str, NaiveDateTime)> {
    TEMPLATES
        .iter()
        .find_map(|t| t.parse(cleaned, now).map(|dt| (t.name, dt)))
}

/// Parse without side effects; returns the matching template name alongside the value.
pub fn parse_with_template(raw: &str, now: NaiveDateTime) -> Option<(&'static str, NaiveDateTime)> {
    parse_cleaned(&clean_date(raw)?, now)
}

/// Sort key for `raw`. Logs a warning (never an error) when nothing matches.
pub fn normalize_date(raw: &str, now: NaiveDateTime) -> NormalizedDate {
    let Some(cleaned) = clean_date(raw) else {
        return NormalizedDate::Unparseable;
    };
    match parse_cleaned(&cleaned, now) {
        Some((_, dt)) => NormalizedDate::At(dt),
        None => {
            tracing::warn!(date = raw, "could not parse date; sorting to end");
            NormalizedDate::Unparseable
        }
    }
}
