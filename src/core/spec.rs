//! Schedule spec parsing.
//!
//! Accepted forms:
//!
//! - standard cron: `min hour dom month dow`
//! - with the `Seconds` option: `sec min hour dom month dow`
//! - descriptors: `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`,
//!   `@midnight`, `@hourly`
//! - fixed intervals: `@every 1h30m`, `@every 10s`
//!
//! Day-of-week numbers follow the usual cron convention (0 or 7 is Sunday).
//! When both day-of-month and day-of-week are restricted, a day matching
//! either field fires.
//! Field grammar is delegated to the `cron` crate.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};

use crate::core::option::Location;
use crate::core::TimerError;

const DAY_NAMES: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// A parsed trigger schedule.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Calendar schedule in 6-field `cron` crate form. Holds two schedules
    /// when day-of-month and day-of-week are both restricted; a time matching
    /// either one fires.
    Cron(Vec<cron::Schedule>),
    /// Fires every fixed interval after registration.
    Every(Duration),
}

impl Schedule {
    /// Parse `spec`. `seconds` selects the 6-field grammar.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::InvalidSpec` with the parser diagnostic.
    pub fn parse(spec: &str, seconds: bool) -> Result<Self, TimerError> {
        let invalid = |reason: String| TimerError::InvalidSpec {
            spec: spec.to_owned(),
            reason,
        };

        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty spec string".into()));
        }

        if let Some(rest) = trimmed.strip_prefix("@every") {
            let interval = parse_interval(rest.trim()).map_err(invalid)?;
            return Ok(Self::Every(interval));
        }

        let exprs = if trimmed.starts_with('@') {
            let expr = descriptor(trimmed)
                .ok_or_else(|| invalid(format!("unrecognized descriptor `{trimmed}`")))?;
            vec![expr.to_owned()]
        } else {
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            let expected = if seconds { 6 } else { 5 };
            if fields.len() != expected {
                return Err(invalid(format!(
                    "expected {expected} fields, found {}",
                    fields.len()
                )));
            }
            let (sec, rest) = if seconds {
                (fields[0], &fields[1..])
            } else {
                ("0", &fields[..])
            };
            let (min, hour, dom, month) = (rest[0], rest[1], rest[2], rest[3]);
            let dow = translate_weekdays(rest[4]);
            if is_unrestricted(dom) || is_unrestricted(rest[4]) {
                vec![format!("{sec} {min} {hour} {dom} {month} {dow}")]
            } else {
                // Both day fields restricted: either may match.
                vec![
                    format!("{sec} {min} {hour} {dom} {month} *"),
                    format!("{sec} {min} {hour} * {month} {dow}"),
                ]
            }
        };

        exprs
            .iter()
            .map(|expr| cron::Schedule::from_str(expr).map_err(|e| invalid(e.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Cron)
    }

    /// Next trigger strictly after `now`, evaluated in `location`.
    pub fn next_after(&self, now: DateTime<Utc>, location: Location) -> Option<DateTime<Utc>> {
        match self {
            Self::Every(interval) => {
                let step = chrono::Duration::from_std(*interval).ok()?;
                now.checked_add_signed(step)
            }
            Self::Cron(schedules) => schedules
                .iter()
                .filter_map(|schedule| match location {
                    Location::Utc => schedule.after(&now).next(),
                    Location::Local => next_in(schedule, &now.with_timezone(&Local)),
                    Location::Fixed { east_secs } => {
                        let offset = FixedOffset::east_opt(east_secs)?;
                        next_in(schedule, &now.with_timezone(&offset))
                    }
                })
                .min(),
        }
    }
}

fn next_in<Z: TimeZone>(schedule: &cron::Schedule, now: &DateTime<Z>) -> Option<DateTime<Utc>> {
    schedule.after(now).next().map(|t| t.with_timezone(&Utc))
}

/// `*` and `?` leave a day field unrestricted. A stepped star like `*/2` is
/// a restriction.
fn is_unrestricted(field: &str) -> bool {
    matches!(field, "*" | "?" | "*/1" | "?/1")
}

fn descriptor(name: &str) -> Option<&'static str> {
    match name {
        "@yearly" | "@annually" => Some("0 0 0 1 1 *"),
        "@monthly" => Some("0 0 0 1 * *"),
        "@weekly" => Some("0 0 0 * * SUN"),
        "@daily" | "@midnight" => Some("0 0 0 * * *"),
        "@hourly" => Some("0 0 * * * *"),
        _ => None,
    }
}

/// Rewrite numeric weekdays (0-7, Sunday = 0 or 7) as names so the `cron`
/// crate, which numbers days from 1, reads them the usual way.
fn translate_weekdays(field: &str) -> String {
    field
        .split(',')
        .map(|part| {
            let (base, step) = match part.split_once('/') {
                Some((base, step)) => (base, Some(step)),
                None => (part, None),
            };
            let base = base
                .split('-')
                .map(|piece| match piece.parse::<usize>() {
                    Ok(n) if n < DAY_NAMES.len() => DAY_NAMES[n].to_owned(),
                    _ => piece.to_owned(),
                })
                .collect::<Vec<_>>()
                .join("-");
            match step {
                Some(step) => format!("{base}/{step}"),
                None => base,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a duration string (`1h30m`, `10s`, `1.5m`, `500ms`). The result is
/// truncated to whole seconds with a one second floor.
fn parse_interval(input: &str) -> Result<Duration, String> {
    if input.is_empty() {
        return Err("missing duration after @every".into());
    }

    let mut total_secs = 0f64;
    let mut rest = input;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration `{input}`"))?;
        if num_end == 0 {
            return Err(format!("invalid duration `{input}`"));
        }
        let value: f64 = rest[..num_end]
            .parse()
            .map_err(|_| format!("invalid number in duration `{input}`"))?;
        rest = &rest[num_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let per_unit = match &rest[..unit_end] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            unit => return Err(format!("unknown unit `{unit}` in duration `{input}`")),
        };
        total_secs += value * per_unit;
        rest = &rest[unit_end..];
    }

    let whole = Duration::try_from_secs_f64(total_secs)
        .map_err(|e| format!("duration `{input}` out of range: {e}"))?
        .as_secs();
    Ok(Duration::from_secs(whole.max(1)))
}
