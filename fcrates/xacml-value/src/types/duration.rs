//! I define the `dayTimeDuration` and `yearMonthDuration` typed values.
//!

use crate::{data_type::DataType, error::ValueParseError};

/// An ISO-8601 `dayTimeDuration`, stored as a signed second count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DayTimeDuration {
    /// Total seconds, negative for a negative duration.
    pub seconds: i64,
}

impl DayTimeDuration {
    /// Parse e.g. `P1DT2H3M4S`, `-PT30M`.
    pub fn parse(literal: &str) -> Result<Self, ValueParseError> {
        parse_duration(literal, false)
            .map(|(seconds, _months)| Self { seconds })
            .ok_or_else(|| ValueParseError::InvalidLiteral {
                data_type_uri: DataType::DayTimeDuration.uri(),
                literal: literal.to_owned(),
            })
    }

    /// Canonical string form.
    pub fn to_canonical_string(&self) -> String {
        format_day_time(self.seconds)
    }
}

/// An ISO-8601 `yearMonthDuration`, stored as a signed month count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonthDuration {
    /// Total months, negative for a negative duration.
    pub months: i32,
}

impl YearMonthDuration {
    /// Parse e.g. `P1Y2M`, `-P3M`.
    pub fn parse(literal: &str) -> Result<Self, ValueParseError> {
        parse_duration(literal, true)
            .map(|(_seconds, months)| Self { months })
            .ok_or_else(|| ValueParseError::InvalidLiteral {
                data_type_uri: DataType::YearMonthDuration.uri(),
                literal: literal.to_owned(),
            })
    }

    /// Canonical string form.
    pub fn to_canonical_string(&self) -> String {
        let sign = if self.months < 0 { "-" } else { "" };
        let months = self.months.unsigned_abs();
        format!("{sign}P{}Y{}M", months / 12, months % 12)
    }
}

/// Parse an ISO-8601 duration literal `[-]PnYnMnDTnHnMnS`. Returns
/// `(seconds, months)`; callers pick the component relevant to their type.
/// `year_month_only` relaxes validation to accept only the date portion,
/// which is how `yearMonthDuration` literals are normally written.
fn parse_duration(literal: &str, year_month_only: bool) -> Option<(i64, i32)> {
    let (negative, rest) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let rest = rest.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };
    if year_month_only && time_part.is_some() {
        return None;
    }

    let mut years = 0i64;
    let mut months = 0i64;
    let mut days = 0i64;
    let mut cur = date_part;
    while !cur.is_empty() {
        let (num, rest) = take_number(cur)?;
        let (unit, rest) = rest.split_at(1);
        cur = rest;
        match unit {
            "Y" => years = num,
            "M" => months = num,
            "D" => days = num,
            _ => return None,
        }
    }

    let mut hours = 0i64;
    let mut minutes = 0i64;
    let mut seconds = 0i64;
    if let Some(time_part) = time_part {
        let mut cur = time_part;
        while !cur.is_empty() {
            let (num, rest) = take_number(cur)?;
            let (unit, rest) = rest.split_at(1);
            cur = rest;
            match unit {
                "H" => hours = num,
                "M" => minutes = num,
                "S" => seconds = num,
                _ => return None,
            }
        }
    }

    let total_months = years * 12 + months;
    let total_seconds = days * 86_400 + hours * 3_600 + minutes * 60 + seconds;
    let sign = if negative { -1 } else { 1 };
    Some((sign * total_seconds, (sign as i32) * total_months as i32))
}

fn take_number(s: &str) -> Option<(i64, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit())?;
    if end == 0 {
        return None;
    }
    let num = s[..end].parse().ok()?;
    Some((num, &s[end..]))
}

fn format_day_time(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let mut s = seconds.unsigned_abs();
    let days = s / 86_400;
    s %= 86_400;
    let hours = s / 3_600;
    s %= 3_600;
    let minutes = s / 60;
    s %= 60;
    format!("{sign}P{days}DT{hours}H{minutes}M{s}S")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_time_duration() {
        assert_eq!(
            DayTimeDuration::parse("P1DT2H3M4S").unwrap().seconds,
            86_400 + 2 * 3_600 + 3 * 60 + 4
        );
    }

    #[test]
    fn parses_negative_duration() {
        assert_eq!(DayTimeDuration::parse("-PT30M").unwrap().seconds, -1_800);
    }

    #[test]
    fn parses_year_month_duration() {
        assert_eq!(YearMonthDuration::parse("P1Y2M").unwrap().months, 14);
    }
}
