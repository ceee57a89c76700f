//! I define [`AttributeKey`] and [`Attribute`] — the indexing key and the
//! stored form of a Request attribute (spec §3 `Attribute`).
//!

use xacml_value::{Bag, DataType};

/// The lookup key identifying one attribute: category, id, data type, and an
/// optional issuer constraint.
///
/// `issuer: None` in a *query* means "any issuer"; `issuer: Some(_)` in a
/// *stored* attribute records the issuer the Request actually named.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeKey {
    /// Attribute category uri, e.g. `...:subject-category:access-subject`.
    pub category: String,
    /// Attribute id uri.
    pub id: String,
    /// Attribute's data type.
    pub data_type: DataType,
    /// Issuer, if the Request attribute named one.
    pub issuer: Option<String>,
}

impl AttributeKey {
    /// Build a key.
    pub fn new(
        category: impl Into<String>,
        id: impl Into<String>,
        data_type: DataType,
        issuer: Option<String>,
    ) -> Self {
        Self {
            category: category.into(),
            id: id.into(),
            data_type,
            issuer,
        }
    }

    /// Whether a *stored* attribute under `self` satisfies a *query* key
    /// `query`: category/id/dataType must match exactly; the query's issuer,
    /// if present, must match ours; an absent query issuer matches any.
    pub fn satisfies(&self, query: &Self) -> bool {
        self.category == query.category
            && self.id == query.id
            && self.data_type == query.data_type
            && match &query.issuer {
                Some(wanted) => self.issuer.as_deref() == Some(wanted.as_str()),
                None => true,
            }
    }
}

/// One Request attribute: a key plus its bag of values, plus whether it
/// should be echoed back in the Response (spec §3 `Attribute.includeInResult`).
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Indexing key.
    pub key: AttributeKey,
    /// Supplied values.
    pub values: Bag,
    /// Whether the Response must echo this attribute back.
    pub include_in_result: bool,
}

impl Attribute {
    /// Build an attribute not marked for echo.
    pub fn new(key: AttributeKey, values: Bag) -> Self {
        Self {
            key,
            values,
            include_in_result: false,
        }
    }
}
