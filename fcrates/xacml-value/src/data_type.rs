//! I define the registry of XACML primitive data types.
//!
//! Each data type is identified by a canonical uri, per the
//! `urn:oasis:names:tc:xacml:...` namespaces. The registry maps those uris
//! to the [`DataType`] variant that owns parsing, canonicalization and
//! comparison for it.
//!

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// A XACML primitive data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// `xs:string`
    String,
    /// `xs:boolean`
    Boolean,
    /// `xs:integer`, arbitrary precision.
    Integer,
    /// `xs:double`, IEEE 754 binary64.
    Double,
    /// `xs:dateTime`, timezone required.
    DateTime,
    /// `xs:date`, timezone optional.
    Date,
    /// `xs:time`, timezone optional.
    Time,
    /// `xacml:dayTimeDuration`.
    DayTimeDuration,
    /// `xacml:yearMonthDuration`.
    YearMonthDuration,
    /// `xs:anyURI`.
    AnyUri,
    /// `xs:hexBinary`.
    HexBinary,
    /// `xs:base64Binary`.
    Base64Binary,
    /// `urn:oasis:names:tc:xacml:1.0:data-type:rfc822Name`.
    Rfc822Name,
    /// `urn:oasis:names:tc:xacml:1.0:data-type:x500Name`.
    X500Name,
}

impl DataType {
    /// Canonical uri of this data type.
    pub const fn uri(self) -> &'static str {
        match self {
            Self::String => "http://www.w3.org/2001/XMLSchema#string",
            Self::Boolean => "http://www.w3.org/2001/XMLSchema#boolean",
            Self::Integer => "http://www.w3.org/2001/XMLSchema#integer",
            Self::Double => "http://www.w3.org/2001/XMLSchema#double",
            Self::DateTime => "http://www.w3.org/2001/XMLSchema#dateTime",
            Self::Date => "http://www.w3.org/2001/XMLSchema#date",
            Self::Time => "http://www.w3.org/2001/XMLSchema#time",
            Self::DayTimeDuration => {
                "urn:oasis:names:tc:xacml:2.0:data-type:dayTimeDuration"
            }
            Self::YearMonthDuration => {
                "urn:oasis:names:tc:xacml:2.0:data-type:yearMonthDuration"
            }
            Self::AnyUri => "http://www.w3.org/2001/XMLSchema#anyURI",
            Self::HexBinary => "http://www.w3.org/2001/XMLSchema#hexBinary",
            Self::Base64Binary => "http://www.w3.org/2001/XMLSchema#base64Binary",
            Self::Rfc822Name => "urn:oasis:names:tc:xacml:1.0:data-type:rfc822Name",
            Self::X500Name => "urn:oasis:names:tc:xacml:1.0:data-type:x500Name",
        }
    }

    /// Resolve a data type from its uri.
    pub fn from_uri(uri: &str) -> Option<Self> {
        static REGISTRY: Lazy<HashMap<&'static str, DataType>> = Lazy::new(|| {
            use DataType::*;
            [
                String, Boolean, Integer, Double, DateTime, Date, Time, DayTimeDuration,
                YearMonthDuration, AnyUri, HexBinary, Base64Binary, Rfc822Name, X500Name,
            ]
            .into_iter()
            .map(|dt| (dt.uri(), dt))
            .collect()
        });
        REGISTRY.get(uri).copied()
    }

    /// Whether this data type supports a total order (`<`, `<=`, `>`, `>=`).
    pub const fn is_orderable(self) -> bool {
        matches!(
            self,
            Self::Integer
                | Self::Double
                | Self::DateTime
                | Self::Date
                | Self::Time
                | Self::DayTimeDuration
                | Self::YearMonthDuration
                | Self::String
        )
    }
}
