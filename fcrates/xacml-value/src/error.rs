//! I define errors raised while parsing and canonicalizing typed attribute values.
//!

/// Error raised while parsing a literal into a typed [`crate::value::Value`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValueParseError {
    /// The data-type uri is not one this crate knows how to handle.
    #[error("Unknown data type uri: `{0}`")]
    UnknownDataType(String),

    /// The literal is not syntactically valid for the claimed data type.
    #[error("Invalid literal `{literal}` for data type `{data_type_uri}`")]
    InvalidLiteral {
        /// Claimed data type uri.
        data_type_uri: &'static str,
        /// Offending literal.
        literal: String,
    },

    /// A `dateTime` literal lacked a required timezone designator.
    #[error("dateTime literal `{0}` is missing a required timezone designator")]
    MissingDateTimeTimezone(String),
}
