//! I define [`Bag`] — an unordered multiset of same-typed [`Value`]s
//! (spec §3/§4.1).
//!

use chrono::FixedOffset;

use crate::value::Value;

/// An unordered multiset of values of one data type. Never nested, may be
/// empty (an empty bag is itself a legal, distinct value per spec §3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bag {
    values: Vec<Value>,
}

impl Bag {
    /// An empty bag.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a bag from an iterator of values. Does not check that all
    /// values share a data type; callers that need that invariant enforced
    /// should use [`Bag::try_from_values`].
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Build a bag, rejecting a mix of data types.
    pub fn try_from_values(
        values: impl IntoIterator<Item = Value>,
    ) -> Result<Self, MixedDataTypesError> {
        let values: Vec<_> = values.into_iter().collect();
        if let Some(first) = values.first() {
            let dt = first.data_type();
            if values.iter().any(|v| v.data_type() != dt) {
                return Err(MixedDataTypesError);
            }
        }
        Ok(Self { values })
    }

    /// Number of values in the bag.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Whether the bag has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate the bag's values.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Consume into a plain vector.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Whether `value` is a member of this bag (XACML semantic equality).
    pub fn contains(&self, value: &Value, default_tz: FixedOffset) -> bool {
        self.values.iter().any(|v| v.semantic_eq(value, default_tz))
    }

    /// The one-and-only element of a singleton bag.
    ///
    /// Per spec §4.1, any other cardinality is a `processing-error`.
    pub fn one_and_only(&self) -> Result<&Value, BagCardinalityError> {
        match self.values.as_slice() {
            [single] => Ok(single),
            _ => Err(BagCardinalityError { size: self.values.len() }),
        }
    }

    /// Bag union: every distinct value from both bags (the standard
    /// `*-union` functions return a bag with duplicates removed, not a
    /// plain multiset concatenation).
    pub fn union(&self, other: &Self, default_tz: FixedOffset) -> Self {
        let mut values = self.values.clone();
        for v in &other.values {
            if !values.iter().any(|existing| existing.semantic_eq(v, default_tz)) {
                values.push(v.clone());
            }
        }
        Self { values }
    }

    /// Multiset intersection, deduplicated to set semantics (the only form
    /// the standard bag functions need).
    pub fn intersection(&self, other: &Self, default_tz: FixedOffset) -> Self {
        let mut values = Vec::new();
        for v in &self.values {
            if other.contains(v, default_tz)
                && !values.iter().any(|existing: &Value| existing.semantic_eq(v, default_tz))
            {
                values.push(v.clone());
            }
        }
        Self { values }
    }

    /// Whether every value of `self` is a member of `other` (`*-subset`).
    pub fn is_subset_of(&self, other: &Self, default_tz: FixedOffset) -> bool {
        self.values.iter().all(|v| other.contains(v, default_tz))
    }

    /// Whether `self` and `other` contain exactly the same set of distinct
    /// values (`*-set-equals`), ignoring duplicate counts.
    pub fn set_equals(&self, other: &Self, default_tz: FixedOffset) -> bool {
        self.is_subset_of(other, default_tz) && other.is_subset_of(self, default_tz)
    }
}

impl FromIterator<Value> for Bag {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self::from_values(iter)
    }
}

/// Raised by [`Bag::try_from_values`] when supplied values don't share a
/// single data type.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("Bag values do not share a single data type")]
pub struct MixedDataTypesError;

/// Raised by [`Bag::one_and_only`] when the bag's size is not exactly one.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("Expected exactly one value in bag, found {size}")]
pub struct BagCardinalityError {
    /// Observed bag size.
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn empty_bag_is_distinct_and_legal() {
        let bag = Bag::empty();
        assert_eq!(bag.size(), 0);
        assert!(bag.is_empty());
    }

    #[test]
    fn one_and_only_fails_on_non_singleton() {
        let bag = Bag::from_values([Value::Boolean(true), Value::Boolean(false)]);
        assert!(bag.one_and_only().is_err());
        assert!(Bag::empty().one_and_only().is_err());
    }

    #[test]
    fn one_and_only_succeeds_on_singleton() {
        let bag = Bag::from_values([Value::Boolean(true)]);
        assert_eq!(bag.one_and_only().unwrap(), &Value::Boolean(true));
    }

    #[test]
    fn intersection_is_deduplicated() {
        let a = Bag::from_values([Value::Integer(1.into()), Value::Integer(2.into())]);
        let b = Bag::from_values([Value::Integer(2.into()), Value::Integer(2.into())]);
        assert_eq!(a.intersection(&b, utc()).size(), 1);
    }

    #[test]
    fn set_equals_ignores_duplicate_counts() {
        let a = Bag::from_values([Value::Integer(1.into()), Value::Integer(1.into())]);
        let b = Bag::from_values([Value::Integer(1.into())]);
        assert!(a.set_equals(&b, utc()));
    }
}
