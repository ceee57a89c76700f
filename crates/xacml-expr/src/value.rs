//! I define [`ExprValue`] — the result shape every expression node produces:
//! either a single typed value or a bag of them (spec §3 `EvaluationResult`).
//!

use xacml_value::{Bag, DataType, Value};

/// The non-error payload of an expression's [`xacml_value::EvaluationResult`]:
/// a scalar [`Value`] or a [`Bag`] of values of one data type.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    /// A single value.
    Single(Value),
    /// A bag of values.
    Bag(Bag),
}

impl ExprValue {
    /// The data type this result carries, if it carries one at all (an empty
    /// bag built with no type context has none).
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Single(v) => Some(v.data_type()),
            Self::Bag(b) => b.iter().next().map(Value::data_type),
        }
    }

    /// View as a single value, if this is one.
    pub fn as_single(&self) -> Option<&Value> {
        match self {
            Self::Single(v) => Some(v),
            Self::Bag(_) => None,
        }
    }

    /// View as a bag, if this is one.
    pub fn as_bag(&self) -> Option<&Bag> {
        match self {
            Self::Single(_) => None,
            Self::Bag(b) => Some(b),
        }
    }

    /// Consume into a bag: a scalar becomes a singleton bag, a bag passes
    /// through. Functions that accept "a bag argument" commonly get handed
    /// either shape depending on the caller (spec §4.3 group 5/6).
    pub fn into_bag(self) -> Bag {
        match self {
            Self::Single(v) => Bag::from_values([v]),
            Self::Bag(b) => b,
        }
    }
}

impl From<Value> for ExprValue {
    fn from(v: Value) -> Self {
        Self::Single(v)
    }
}

impl From<Bag> for ExprValue {
    fn from(b: Bag) -> Self {
        Self::Bag(b)
    }
}
