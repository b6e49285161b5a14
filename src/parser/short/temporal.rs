use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::parser::{ParserError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static INTERVAL_TERM: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)(?P<n>[-+]?\d+)\s*(?P<unit>years?|yrs?|y|months?|mons?|weeks?|w|days?|d|hours?|hrs?|h|minutes?|mins?|m|seconds?|secs?|s)\b").ok()
});

static INTERVAL_CLOCK: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?P<sign>[-+]?)(?P<h>\d+):(?P<m>\d{2})(?::(?P<s>\d{2}))?").ok()
});

/// Validated `YYYY-MM-DD`.
pub fn date_literal(year: i64, month: i64, day: i64) -> Result<String> {
    let date = i32::try_from(year).ok()
        .zip(u32::try_from(month).ok())
        .zip(u32::try_from(day).ok())
        .and_then(|((y, m), d)| NaiveDate::from_ymd_opt(y, m, d))
        .ok_or_else(|| ParserError::InvalidShort(format!("invalid date {}-{}-{}", year, month, day)))?;

    Ok(date.format(DATE_FORMAT).to_string())
}

/// Validated `YYYY-MM-DDTHH:MM:SS`.
pub fn datetime_literal(year: i64, month: i64, day: i64, hour: i64, minute: i64, second: i64) -> Result<String> {
    let date = date_literal(year, month, day)?;
    let time = u32::try_from(hour).ok()
        .zip(u32::try_from(minute).ok())
        .zip(u32::try_from(second).ok())
        .and_then(|((h, m), s)| NaiveTime::from_hms_opt(h, m, s))
        .ok_or_else(|| ParserError::InvalidShort(format!("invalid time {}:{}:{}", hour, minute, second)))?;

    Ok(format!("{}T{}", date, time.format("%H:%M:%S")))
}

/// Checks a date string as PostgreSQL would accept it for `::date`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

/// Checks a timestamp string (`T` or space separated, optional fraction).
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"].iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| parse_date(text).and_then(|date| date.and_hms_opt(0, 0, 0)))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interval {
    pub years: i64,
    pub months: i64,
    pub weeks: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Interval {
    /// Parses `1 year 2 mons`, `3 days 04:05:06`, `2w`, ... Units may be
    /// singular, plural or abbreviated.
    pub fn parse(text: &str) -> Result<Interval> {
        let (Some(term_re), Some(clock_re)) = (INTERVAL_TERM.as_ref(), INTERVAL_CLOCK.as_ref()) else {
            return ParserError::invalid("interval patterns unavailable").err();
        };

        let invalid = || ParserError::invalid(format!("invalid interval '{}'", text));
        let mut interval = Interval::default();
        let mut covered = vec![false; text.len()];
        let mut found = false;

        for captures in term_re.captures_iter(text) {
            let (Some(whole), Some(n), Some(unit)) = (captures.get(0), captures.name("n"), captures.name("unit")) else {
                continue;
            };
            let n: i64 = n.as_str().parse().map_err(|_| invalid())?;
            interval.add(n, unit.as_str())?;
            covered[whole.range()].fill(true);
            found = true;
        }

        for captures in clock_re.captures_iter(text) {
            let Some(whole) = captures.get(0) else { continue };
            if covered[whole.range()].iter().any(|c| *c) {
                continue;
            }
            let part = |name: &str| captures.name(name).map_or(Ok(0), |m| m.as_str().parse::<i64>());
            let (h, m, s) = (part("h").map_err(|_| invalid())?, part("m").map_err(|_| invalid())?, part("s").map_err(|_| invalid())?);
            let sign = if captures.name("sign").is_some_and(|m| m.as_str() == "-") { -1 } else { 1 };
            interval.add(sign * h, "hours")?;
            interval.add(sign * m, "minutes")?;
            interval.add(sign * s, "seconds")?;
            covered[whole.range()].fill(true);
            found = true;
        }

        let leftover = text.char_indices()
            .any(|(i, c)| !covered[i] && !c.is_whitespace() && c != ',');
        if !found || leftover {
            return Err(invalid());
        }

        interval.total_days()?;
        Ok(interval)
    }

    fn add(&mut self, n: i64, unit: &str) -> Result<()> {
        let unit = unit.to_ascii_lowercase();
        let slot = match unit.as_str() {
            "y" | "yr" | "yrs" | "year" | "years" => &mut self.years,
            "mon" | "mons" | "month" | "months" => &mut self.months,
            "w" | "week" | "weeks" => &mut self.weeks,
            "d" | "day" | "days" => &mut self.days,
            "h" | "hr" | "hrs" | "hour" | "hours" => &mut self.hours,
            "m" | "min" | "mins" | "minute" | "minutes" => &mut self.minutes,
            "s" | "sec" | "secs" | "second" | "seconds" => &mut self.seconds,
            _ => return ParserError::invalid(format!("unknown interval unit '{}'", unit)).err(),
        };
        *slot = slot.checked_add(n)
            .ok_or_else(|| ParserError::invalid(format!("interval {} overflows", unit)))?;
        Ok(())
    }

    /// Weeks and days as a day count.
    pub fn total_days(&self) -> Result<i64> {
        self.weeks.checked_mul(7)
            .and_then(|days| days.checked_add(self.days))
            .ok_or_else(|| ParserError::invalid(format!("interval of {} weeks {} days overflows", self.weeks, self.days)))
    }

    pub fn is_zero(&self) -> bool {
        *self == Interval::default()
    }

    fn parts(&self) -> [(i64, &'static str); 7] {
        [
            (self.years, "years"),
            (self.months, "months"),
            (self.weeks, "weeks"),
            (self.days, "days"),
            (self.hours, "hours"),
            (self.minutes, "minutes"),
            (self.seconds, "seconds"),
        ]
    }

    /// `1 years 2 days`, or `0 seconds` when empty.
    pub fn to_literal(&self) -> String {
        self.to_string()
    }

    /// Non-zero `(amount, UNIT)` pairs in Trino's interval units, weeks
    /// folded into days.
    pub fn terms(&self) -> Result<Vec<(i64, &'static str)>> {
        let terms: Vec<(i64, &'static str)> = [
            (self.years, "YEAR"),
            (self.months, "MONTH"),
            (self.total_days()?, "DAY"),
            (self.hours, "HOUR"),
            (self.minutes, "MINUTE"),
            (self.seconds, "SECOND"),
        ]
        .into_iter()
        .filter(|(n, _)| *n != 0)
        .collect();

        Ok(match terms.is_empty() {
            true => vec![(0, "SECOND")],
            false => terms,
        })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0 seconds");
        }

        let parts: Vec<String> = self.parts().iter()
            .filter(|(n, _)| *n != 0)
            .map(|(n, unit)| format!("{} {}", n, unit))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}
