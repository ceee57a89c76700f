//! I define the `rfc822Name` and `x500Name` typed values.
//!
//! Per spec §1 Non-goals (no full grammar beyond what's needed), these are
//! intentionally light: `rfc822Name` equality is case-insensitive on the
//! domain part per RFC 822's historical XACML profile, `x500Name` equality
//! is a canonical RDN-sequence string match.
//!

use crate::{data_type::DataType, error::ValueParseError};

/// An `rfc822Name` value: `local-part@domain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rfc822Name {
    /// Local part, compared case-sensitively.
    pub local_part: String,
    /// Domain part, compared case-insensitively.
    pub domain: String,
}

impl Rfc822Name {
    /// Parse a literal of the form `local-part@domain`.
    pub fn parse(literal: &str) -> Result<Self, ValueParseError> {
        let (local_part, domain) = literal.split_once('@').ok_or_else(|| {
            ValueParseError::InvalidLiteral {
                data_type_uri: DataType::Rfc822Name.uri(),
                literal: literal.to_owned(),
            }
        })?;
        if local_part.is_empty() || domain.is_empty() {
            return Err(ValueParseError::InvalidLiteral {
                data_type_uri: DataType::Rfc822Name.uri(),
                literal: literal.to_owned(),
            });
        }
        Ok(Self {
            local_part: local_part.to_owned(),
            domain: domain.to_owned(),
        })
    }

    /// Equality: local part is exact, domain is case-insensitive.
    pub fn equals(&self, other: &Self) -> bool {
        self.local_part == other.local_part && self.domain.eq_ignore_ascii_case(&other.domain)
    }

    /// Canonical string form.
    pub fn to_canonical_string(&self) -> String {
        format!("{}@{}", self.local_part, self.domain.to_lowercase())
    }
}

/// An `x500Name` value, kept as its canonical RDN-sequence string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X500Name(pub String);

impl X500Name {
    /// Parse (accepts any non-empty comma-separated RDN sequence).
    pub fn parse(literal: &str) -> Result<Self, ValueParseError> {
        if literal.trim().is_empty() {
            return Err(ValueParseError::InvalidLiteral {
                data_type_uri: DataType::X500Name.uri(),
                literal: literal.to_owned(),
            });
        }
        let canonical = literal
            .split(',')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(",");
        Ok(Self(canonical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc822_domain_matches_case_insensitively() {
        let a = Rfc822Name::parse("alice@Example.com").unwrap();
        let b = Rfc822Name::parse("alice@example.COM").unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn rfc822_local_part_is_case_sensitive() {
        let a = Rfc822Name::parse("Alice@example.com").unwrap();
        let b = Rfc822Name::parse("alice@example.com").unwrap();
        assert!(!a.equals(&b));
    }

    #[test]
    fn x500_name_normalizes_whitespace() {
        let a = X500Name::parse("cn=Bob, o=Example").unwrap();
        let b = X500Name::parse("cn=Bob,o=Example").unwrap();
        assert_eq!(a, b);
    }
}
