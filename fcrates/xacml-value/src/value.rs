//! I define [`Value`] — the single in-memory representation for every
//! XACML typed attribute value (spec §3 `AttributeValue`).
//!

use std::cmp::Ordering;

use base64::Engine;
use chrono::FixedOffset;
use num_bigint::BigInt;

use crate::{
    data_type::DataType,
    error::ValueParseError,
    types::{
        datetime::{XacmlDate, XacmlDateTime, XacmlTime},
        duration::{DayTimeDuration, YearMonthDuration},
        name::{Rfc822Name, X500Name},
    },
};

/// A single typed XACML attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `xs:string`
    String(String),
    /// `xs:boolean`
    Boolean(bool),
    /// `xs:integer`
    Integer(BigInt),
    /// `xs:double`
    Double(f64),
    /// `xs:dateTime`
    DateTime(XacmlDateTime),
    /// `xs:date`
    Date(XacmlDate),
    /// `xs:time`
    Time(XacmlTime),
    /// `xacml:dayTimeDuration`
    DayTimeDuration(DayTimeDuration),
    /// `xacml:yearMonthDuration`
    YearMonthDuration(YearMonthDuration),
    /// `xs:anyURI`, stored in canonical form.
    AnyUri(String),
    /// `xs:hexBinary`, stored decoded.
    HexBinary(Vec<u8>),
    /// `xs:base64Binary`, stored decoded.
    Base64Binary(Vec<u8>),
    /// `rfc822Name`
    Rfc822Name(Rfc822Name),
    /// `x500Name`
    X500Name(X500Name),
}

impl Value {
    /// The data type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Boolean(_) => DataType::Boolean,
            Self::Integer(_) => DataType::Integer,
            Self::Double(_) => DataType::Double,
            Self::DateTime(_) => DataType::DateTime,
            Self::Date(_) => DataType::Date,
            Self::Time(_) => DataType::Time,
            Self::DayTimeDuration(_) => DataType::DayTimeDuration,
            Self::YearMonthDuration(_) => DataType::YearMonthDuration,
            Self::AnyUri(_) => DataType::AnyUri,
            Self::HexBinary(_) => DataType::HexBinary,
            Self::Base64Binary(_) => DataType::Base64Binary,
            Self::Rfc822Name(_) => DataType::Rfc822Name,
            Self::X500Name(_) => DataType::X500Name,
        }
    }

    /// Parse a literal into a value of the given data type. Eager, per
    /// spec §4.3: a parse failure inside a policy document is a load-time
    /// error; inside a Request it becomes `Indeterminate(syntax-error)` at
    /// the loader boundary (spec §4.7) — both callers map this the same
    /// [`ValueParseError`] to their own error surface.
    pub fn parse(data_type: DataType, literal: &str) -> Result<Self, ValueParseError> {
        Ok(match data_type {
            DataType::String => Self::String(literal.to_owned()),
            DataType::Boolean => Self::Boolean(parse_boolean(literal)?),
            DataType::Integer => Self::Integer(
                literal
                    .parse()
                    .map_err(|_| invalid(DataType::Integer, literal))?,
            ),
            DataType::Double => Self::Double(
                literal
                    .parse()
                    .map_err(|_| invalid(DataType::Double, literal))?,
            ),
            DataType::DateTime => Self::DateTime(XacmlDateTime::parse(literal)?),
            DataType::Date => Self::Date(XacmlDate::parse(literal)?),
            DataType::Time => Self::Time(XacmlTime::parse(literal)?),
            DataType::DayTimeDuration => Self::DayTimeDuration(DayTimeDuration::parse(literal)?),
            DataType::YearMonthDuration => {
                Self::YearMonthDuration(YearMonthDuration::parse(literal)?)
            }
            DataType::AnyUri => Self::AnyUri(canonicalize_uri(literal)),
            DataType::HexBinary => Self::HexBinary(
                parse_hex(literal).ok_or_else(|| invalid(DataType::HexBinary, literal))?,
            ),
            DataType::Base64Binary => Self::Base64Binary(
                base64::engine::general_purpose::STANDARD
                    .decode(literal)
                    .map_err(|_| invalid(DataType::Base64Binary, literal))?,
            ),
            DataType::Rfc822Name => Self::Rfc822Name(Rfc822Name::parse(literal)?),
            DataType::X500Name => Self::X500Name(X500Name::parse(literal)?),
        })
    }

    /// Re-serialize to the canonical literal form for this value's type.
    pub fn to_canonical_string(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Boolean(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Double(d) => format_double(*d),
            Self::DateTime(dt) => dt.to_canonical_string(),
            Self::Date(d) => d.to_canonical_string(),
            Self::Time(t) => t.to_canonical_string(),
            Self::DayTimeDuration(d) => d.to_canonical_string(),
            Self::YearMonthDuration(d) => d.to_canonical_string(),
            Self::AnyUri(u) => u.clone(),
            Self::HexBinary(b) => b.iter().map(|byte| format!("{byte:02x}")).collect(),
            Self::Base64Binary(b) => base64::engine::general_purpose::STANDARD.encode(b),
            Self::Rfc822Name(n) => n.to_canonical_string(),
            Self::X500Name(n) => n.0.clone(),
        }
    }

    /// XACML semantic equality. `default_tz` resolves timezone-less `date`
    /// and `time` values (spec §3). Values of differing data types are
    /// never equal.
    pub fn semantic_eq(&self, other: &Self, default_tz: FixedOffset) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a.equals(b),
            (Self::Date(a), Self::Date(b)) => a.equals(b, default_tz),
            (Self::Time(a), Self::Time(b)) => a.equals(b, default_tz),
            (Self::DayTimeDuration(a), Self::DayTimeDuration(b)) => a == b,
            (Self::YearMonthDuration(a), Self::YearMonthDuration(b)) => a == b,
            (Self::AnyUri(a), Self::AnyUri(b)) => a == b,
            (Self::HexBinary(a), Self::HexBinary(b)) => a == b,
            (Self::Base64Binary(a), Self::Base64Binary(b)) => a == b,
            (Self::Rfc822Name(a), Self::Rfc822Name(b)) => a.equals(b),
            (Self::X500Name(a), Self::X500Name(b)) => a == b,
            _ => false,
        }
    }

    /// XACML ordering, where defined. Returns `None` for non-orderable
    /// types, mismatched types, or a comparison involving `NaN` (spec §4.1:
    /// "ordering with NaN is an error").
    pub fn compare(&self, other: &Self, default_tz: FixedOffset) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Double(a), Self::Double(b)) => a.partial_cmp(b),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b, default_tz)),
            (Self::Time(a), Self::Time(b)) => Some(a.cmp(b, default_tz)),
            (Self::DayTimeDuration(a), Self::DayTimeDuration(b)) => Some(a.cmp(b)),
            (Self::YearMonthDuration(a), Self::YearMonthDuration(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

fn invalid(data_type: DataType, literal: &str) -> ValueParseError {
    ValueParseError::InvalidLiteral {
        data_type_uri: data_type.uri(),
        literal: literal.to_owned(),
    }
}

fn parse_boolean(literal: &str) -> Result<bool, ValueParseError> {
    match literal {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(invalid(DataType::Boolean, literal)),
    }
}

fn parse_hex(literal: &str) -> Option<Vec<u8>> {
    if literal.len() % 2 != 0 {
        return None;
    }
    (0..literal.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&literal[i..i + 2], 16).ok())
        .collect()
}

/// Double canonicalization preserving IEEE 754 `NaN`/`INF` spellings used by
/// XML Schema.
fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_owned()
    } else if d.is_infinite() {
        if d > 0.0 { "INF".to_owned() } else { "-INF".to_owned() }
    } else {
        d.to_string()
    }
}

/// Canonicalize an `anyURI` literal by upper-casing percent-encoded octets,
/// the one reserved-character normalization step spec §4.1 calls for.
fn canonicalize_uri(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let bytes = literal.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            out.push('%');
            out.push(bytes[i + 1].to_ascii_uppercase() as char);
            out.push(bytes[i + 2].to_ascii_uppercase() as char);
            i += 3;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).expect("zero offset is always valid")
    }

    #[test]
    fn nan_is_never_equal_to_itself() {
        let a = Value::Double(f64::NAN);
        let b = Value::Double(f64::NAN);
        assert!(!a.semantic_eq(&b, utc()));
    }

    #[test]
    fn nan_comparison_is_indeterminate() {
        let a = Value::Double(f64::NAN);
        let b = Value::Double(1.0);
        assert_eq!(a.compare(&b, utc()), None);
    }

    #[test]
    fn mismatched_types_are_never_equal() {
        let a = Value::Integer(1.into());
        let b = Value::String("1".to_owned());
        assert!(!a.semantic_eq(&b, utc()));
    }

    #[rstest]
    #[case("%2f%41", "%2F%41")]
    #[case("http://example.com/a", "http://example.com/a")]
    fn anyuri_canonicalizes_percent_escapes(#[case] input: &str, #[case] expected: &str) {
        let Value::AnyUri(canon) = Value::parse(DataType::AnyUri, input).unwrap() else {
            unreachable!()
        };
        assert_eq!(canon, expected);
    }

    #[test]
    fn hex_binary_round_trips() {
        let v = Value::parse(DataType::HexBinary, "0fd7").unwrap();
        assert_eq!(v.to_canonical_string(), "0fd7");
    }

    #[test]
    fn base64_binary_round_trips() {
        let v = Value::parse(DataType::Base64Binary, "aGVsbG8=").unwrap();
        assert_eq!(v, Value::Base64Binary(b"hello".to_vec()));
    }

    #[test]
    fn big_integer_is_arbitrary_width() {
        let literal = "123456789012345678901234567890";
        let v = Value::parse(DataType::Integer, literal).unwrap();
        assert_eq!(v.to_canonical_string(), literal);
    }
}
