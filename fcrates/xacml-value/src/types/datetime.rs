//! I define the `dateTime`, `date` and `time` typed values.
//!
//! `dateTime` always carries a timezone: the parser rejects a literal
//! without one (spec §4.1). `date` and `time` may omit it; comparisons
//! between timezone-less values fall back to a caller-supplied default
//! offset (spec §3).
//!

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone};

use crate::error::ValueParseError;

/// A XACML `dateTime` value: an instant with a required offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XacmlDateTime(pub chrono::DateTime<FixedOffset>);

impl XacmlDateTime {
    /// Parse an ISO-8601 `dateTime` literal. A missing timezone designator
    /// is a [`ValueParseError::MissingDateTimeTimezone`], not silently
    /// defaulted — per spec §4.1.
    pub fn parse(literal: &str) -> Result<Self, ValueParseError> {
        let has_tz = literal.ends_with('Z')
            || literal.rfind(['+', '-']).is_some_and(|idx| idx > 10);
        if !has_tz {
            return Err(ValueParseError::MissingDateTimeTimezone(literal.to_owned()));
        }
        chrono::DateTime::parse_from_rfc3339(literal)
            .map(Self)
            .map_err(|_| ValueParseError::InvalidLiteral {
                data_type_uri: super::super::data_type::DataType::DateTime.uri(),
                literal: literal.to_owned(),
            })
    }

    /// Two `dateTime` values are equal iff they denote the same instant.
    pub fn equals(&self, other: &Self) -> bool {
        self.0 == other.0
    }

    /// Absolute-instant ordering.
    pub fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }

    /// Canonical (RFC 3339) string form.
    pub fn to_canonical_string(&self) -> String {
        self.0.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
    }

    /// Shift by a day-time duration (seconds granularity).
    pub fn add_day_time_seconds(&self, seconds: i64) -> Self {
        Self(self.0 + chrono::Duration::seconds(seconds))
    }

    /// Shift by whole months (year-month duration granularity), clamping the
    /// day-of-month if the target month is shorter.
    pub fn add_months(&self, months: i32) -> Self {
        Self(shift_months(self.0, months))
    }
}

/// A XACML `date` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XacmlDate {
    /// Calendar date.
    pub date: NaiveDate,
    /// Timezone, if the literal specified one.
    pub tz: Option<FixedOffset>,
}

impl XacmlDate {
    /// Parse an ISO-8601 `date` literal, e.g. `2026-01-01` or `2026-01-01Z`.
    pub fn parse(literal: &str) -> Result<Self, ValueParseError> {
        let invalid = || ValueParseError::InvalidLiteral {
            data_type_uri: super::super::data_type::DataType::Date.uri(),
            literal: literal.to_owned(),
        };
        let (date_part, tz) = split_tz(literal);
        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| invalid())?;
        Ok(Self { date, tz })
    }

    /// Resolve to a concrete instant at midnight, using `default_tz` when
    /// this value carries no timezone of its own.
    pub fn at_midnight(&self, default_tz: FixedOffset) -> chrono::DateTime<FixedOffset> {
        let tz = self.tz.unwrap_or(default_tz);
        tz.from_utc_datetime(&self.date.and_hms_opt(0, 0, 0).expect("valid midnight"))
    }

    /// Equal iff they denote the same calendar date once resolved against
    /// `default_tz`.
    pub fn equals(&self, other: &Self, default_tz: FixedOffset) -> bool {
        self.at_midnight(default_tz) == other.at_midnight(default_tz)
    }

    /// Ordering once resolved against `default_tz`.
    pub fn cmp(&self, other: &Self, default_tz: FixedOffset) -> std::cmp::Ordering {
        self.at_midnight(default_tz).cmp(&other.at_midnight(default_tz))
    }

    /// Canonical string form.
    pub fn to_canonical_string(&self) -> String {
        match self.tz {
            Some(tz) if tz.local_minus_utc() == 0 => format!("{}Z", self.date.format("%Y-%m-%d")),
            Some(tz) => format!("{}{}", self.date.format("%Y-%m-%d"), format_offset(tz)),
            None => self.date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// A XACML `time` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XacmlTime {
    /// Time of day, nanosecond precision.
    pub time: NaiveTime,
    /// Timezone, if the literal specified one.
    pub tz: Option<FixedOffset>,
}

impl XacmlTime {
    /// Parse an ISO-8601 `time` literal, e.g. `23:59:59` or `23:59:59.5Z`.
    pub fn parse(literal: &str) -> Result<Self, ValueParseError> {
        let invalid = || ValueParseError::InvalidLiteral {
            data_type_uri: super::super::data_type::DataType::Time.uri(),
            literal: literal.to_owned(),
        };
        let (time_part, tz) = split_tz(literal);
        let time = NaiveTime::parse_from_str(time_part, "%H:%M:%S%.f").map_err(|_| invalid())?;
        Ok(Self { time, tz })
    }

    /// Equal using `default_tz` to resolve a missing offset on either side.
    pub fn equals(&self, other: &Self, default_tz: FixedOffset) -> bool {
        self.normalize(default_tz) == other.normalize(default_tz)
    }

    /// Ordering using `default_tz` to resolve a missing offset on either side.
    pub fn cmp(&self, other: &Self, default_tz: FixedOffset) -> std::cmp::Ordering {
        self.normalize(default_tz).cmp(&other.normalize(default_tz))
    }

    fn normalize(&self, default_tz: FixedOffset) -> NaiveTime {
        let tz = self.tz.unwrap_or(default_tz);
        // Shift the naive time by the offset so UTC-normalized times compare correctly.
        self.time - chrono::Duration::seconds(tz.local_minus_utc() as i64)
    }

    /// Canonical string form.
    pub fn to_canonical_string(&self) -> String {
        match self.tz {
            Some(tz) if tz.local_minus_utc() == 0 => format!("{}Z", self.time.format("%H:%M:%S%.f")),
            Some(tz) => format!("{}{}", self.time.format("%H:%M:%S%.f"), format_offset(tz)),
            None => self.time.format("%H:%M:%S%.f").to_string(),
        }
    }
}

fn split_tz(literal: &str) -> (&str, Option<FixedOffset>) {
    if let Some(stripped) = literal.strip_suffix('Z') {
        return (stripped, Some(FixedOffset::east_opt(0).expect("zero offset")));
    }
    // A `+HH:MM`/`-HH:MM` suffix, not to be confused with a leading `-` in a year.
    if literal.len() > 6 {
        let tail = &literal[literal.len() - 6..];
        if (tail.starts_with('+') || tail.starts_with('-')) && tail.as_bytes()[3] == b':' {
            let sign = if tail.starts_with('-') { -1 } else { 1 };
            if let (Ok(h), Ok(m)) = (tail[1..3].parse::<i32>(), tail[4..6].parse::<i32>()) {
                let offset = FixedOffset::east_opt(sign * (h * 3600 + m * 60));
                if let Some(offset) = offset {
                    return (&literal[..literal.len() - 6], Some(offset));
                }
            }
        }
    }
    (literal, None)
}

fn format_offset(tz: FixedOffset) -> String {
    let total = tz.local_minus_utc();
    let sign = if total < 0 { '-' } else { '+' };
    let total = total.abs();
    format!("{sign}{:02}:{:02}", total / 3600, (total % 3600) / 60)
}

fn shift_months(dt: chrono::DateTime<FixedOffset>, months: i32) -> chrono::DateTime<FixedOffset> {
    use chrono::Datelike;
    let total = dt.year() * 12 + dt.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month0 = total.rem_euclid(12);
    let last_day = days_in_month(year, month0 as u32 + 1);
    let day = dt.day().min(last_day);
    let naive = NaiveDate::from_ymd_opt(year, month0 as u32 + 1, day)
        .expect("computed valid date")
        .and_time(dt.time());
    dt.timezone().from_local_datetime(&naive).single().unwrap_or(dt)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("valid next month")
        .pred_opt()
        .expect("valid previous day")
        .day()
}
