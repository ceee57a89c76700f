//! I define [`Status`], [`StatusCode`] and [`EvaluationResult`] — the
//! `Indeterminate`-as-a-value machinery the whole engine hinges on (see
//! spec §9: "prefer a `Result`-style sum type throughout").
//!

use iri_string::types::UriReferenceString;

use crate::data_type::DataType;

/// One of the standard XACML status codes, or an extension code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCode {
    /// `urn:oasis:names:tc:xacml:1.0:status:ok`
    Ok,
    /// `urn:oasis:names:tc:xacml:1.0:status:missing-attribute`
    MissingAttribute,
    /// `urn:oasis:names:tc:xacml:1.0:status:syntax-error`
    SyntaxError,
    /// `urn:oasis:names:tc:xacml:1.0:status:processing-error`
    ProcessingError,
    /// An implementation-defined extension status code.
    Other(UriReferenceString),
}

impl StatusCode {
    /// Canonical uri for this status code.
    pub fn uri(&self) -> &str {
        match self {
            Self::Ok => "urn:oasis:names:tc:xacml:1.0:status:ok",
            Self::MissingAttribute => "urn:oasis:names:tc:xacml:1.0:status:missing-attribute",
            Self::SyntaxError => "urn:oasis:names:tc:xacml:1.0:status:syntax-error",
            Self::ProcessingError => "urn:oasis:names:tc:xacml:1.0:status:processing-error",
            Self::Other(uri) => uri.as_str(),
        }
    }
}

/// Descriptor of an attribute that was missing during evaluation, carried in
/// [`StatusDetail::MissingAttribute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingAttributeDescriptor {
    /// Attribute category uri.
    pub category: String,
    /// Attribute id uri.
    pub attribute_id: String,
    /// Expected data type.
    pub data_type: DataType,
    /// Expected issuer, if the designator constrained one.
    pub issuer: Option<String>,
}

/// Structured detail attached to a non-`ok` [`Status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusDetail {
    /// One or more attributes that were required but absent.
    MissingAttribute(Vec<MissingAttributeDescriptor>),
}

/// Outcome status of an evaluation, per spec §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Status code.
    pub code: StatusCode,
    /// Optional human readable message.
    pub message: Option<String>,
    /// Optional structured detail.
    pub detail: Option<StatusDetail>,
}

impl Status {
    /// The single canonical `ok` status.
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: None,
            detail: None,
        }
    }

    /// Build a `missing-attribute` status for a single descriptor.
    pub fn missing_attribute(descriptor: MissingAttributeDescriptor) -> Self {
        Self {
            code: StatusCode::MissingAttribute,
            message: Some(format!(
                "Missing required attribute: category=`{}` id=`{}` type=`{}`",
                descriptor.category,
                descriptor.attribute_id,
                descriptor.data_type.uri()
            )),
            detail: Some(StatusDetail::MissingAttribute(vec![descriptor])),
        }
    }

    /// Build a `syntax-error` status.
    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::SyntaxError,
            message: Some(message.into()),
            detail: None,
        }
    }

    /// Build a `processing-error` status.
    pub fn processing_error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::ProcessingError,
            message: Some(message.into()),
            detail: None,
        }
    }

    /// Merge the missing-attribute descriptors of `self` and `other` into a
    /// single status, preferring `missing-attribute` over other codes when
    /// combining statuses on an escalation path (spec §7).
    pub fn merge(self, other: Self) -> Self {
        match (&self.code, &other.code) {
            (StatusCode::MissingAttribute, StatusCode::MissingAttribute) => {
                let mut descriptors = Vec::new();
                if let Some(StatusDetail::MissingAttribute(d)) = self.detail {
                    descriptors.extend(d);
                }
                if let Some(StatusDetail::MissingAttribute(d)) = other.detail {
                    descriptors.extend(d);
                }
                Self {
                    code: StatusCode::MissingAttribute,
                    message: Some("Missing one or more required attributes".to_owned()),
                    detail: Some(StatusDetail::MissingAttribute(descriptors)),
                }
            }
            (StatusCode::MissingAttribute, _) => self,
            (_, StatusCode::MissingAttribute) => other,
            _ => self,
        }
    }
}

/// Result of evaluating any expression node: either a definite `Value`, or
/// `Indeterminate` with a [`Status`] explaining why not (spec §3).
///
/// `Indeterminate` is absorbing by default: combinators here propagate it
/// unless a caller explicitly short-circuits (see `xacml-expr`'s `and`/`or`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationResult<T> {
    /// A definite value.
    Value(T),
    /// Evaluation could not produce a definite value.
    Indeterminate(Status),
}

impl<T> EvaluationResult<T> {
    /// Map the contained value, leaving `Indeterminate` untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> EvaluationResult<U> {
        match self {
            Self::Value(v) => EvaluationResult::Value(f(v)),
            Self::Indeterminate(s) => EvaluationResult::Indeterminate(s),
        }
    }

    /// Chain another fallible step, leaving `Indeterminate` untouched.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> EvaluationResult<U>) -> EvaluationResult<U> {
        match self {
            Self::Value(v) => f(v),
            Self::Indeterminate(s) => EvaluationResult::Indeterminate(s),
        }
    }

    /// Borrow the value, if any.
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Indeterminate(_) => None,
        }
    }

    /// True if this is `Indeterminate`.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Indeterminate(_))
    }

    /// Convert into a plain [`Result`], for use with `?`.
    pub fn into_result(self) -> Result<T, Status> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Indeterminate(s) => Err(s),
        }
    }
}

impl<T> From<Result<T, Status>> for EvaluationResult<T> {
    fn from(r: Result<T, Status>) -> Self {
        match r {
            Ok(v) => Self::Value(v),
            Err(s) => Self::Indeterminate(s),
        }
    }
}
