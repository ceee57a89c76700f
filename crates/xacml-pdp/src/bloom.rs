//! Optional Bloom pre-filter for candidate policy pruning (spec §9).
//!
//! Built once per loaded root at `Pdp::load` time from every `(category,
//! id, data type, canonical literal)` tuple harvested out of that root's
//! `<Target>` `Match` elements, recursively. At evaluation time, a root is
//! pruned only if *none* of the Request's actual attribute values for any
//! of those `(category, id, data type)` triples hash to a set bit — a
//! miss. A hit is always a *maybe*: false positives just mean a root gets
//! evaluated that didn't need to be, which is correct, never the other way
//! around. This must never be the thing that decides an outcome, only
//! whether evaluation is attempted at all.

use std::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

use xacml_context::{AttributeKey, RequestContext};
use xacml_policy::{AllOf, AnyOf, Match, PolicySet, PolicySetChild, Target};
use xacml_value::{DataType, EvaluationResult};

const BITS: usize = 2048;
const WORDS: usize = BITS / 64;
const HASH_FNS: usize = 3;

/// A fixed-size Bloom filter over `(category, id, data type, canonical
/// literal)` tuples drawn from one loaded root's Target tree.
pub struct PolicyBloomFilter {
    bits: [u64; WORDS],
    /// Distinct `(category, id, data type)` triples worth re-querying
    /// against a Request at evaluation time.
    keys: Vec<(String, String, DataType)>,
}

impl PolicyBloomFilter {
    /// Build a filter from every `Match` tuple in `target`.
    pub fn for_policy(target: &Target) -> Self {
        let mut filter = Self::empty();
        filter.insert_target(target);
        filter
    }

    /// Build a filter covering a `PolicySet` root and every directly
    /// nested `Policy`/`PolicySet` child (reference children contribute
    /// nothing — they aren't resolved yet at the point a filter is built,
    /// so the containing root is never pruned on their account).
    pub fn for_policy_set(policy_set: &PolicySet) -> Self {
        let mut filter = Self::empty();
        filter.insert_target(&policy_set.target);
        filter.insert_children(&policy_set.children);
        filter
    }

    fn empty() -> Self {
        Self { bits: [0u64; WORDS], keys: Vec::new() }
    }

    fn insert_children(&mut self, children: &[PolicySetChild]) {
        for child in children {
            match child {
                PolicySetChild::Policy(policy) => self.insert_target(&policy.target),
                PolicySetChild::PolicySet(nested) => {
                    self.insert_target(&nested.target);
                    self.insert_children(&nested.children);
                }
                PolicySetChild::PolicyIdReference(_) | PolicySetChild::PolicySetIdReference(_) => {}
            }
        }
    }

    fn insert_target(&mut self, target: &Target) {
        for any_of in &target.any_ofs {
            self.insert_any_of(any_of);
        }
    }

    fn insert_any_of(&mut self, any_of: &AnyOf) {
        for all_of in &any_of.all_ofs {
            self.insert_all_of(all_of);
        }
    }

    fn insert_all_of(&mut self, all_of: &AllOf) {
        for m in &all_of.matches {
            self.insert_match(m);
        }
    }

    fn insert_match(&mut self, m: &Match) {
        let Some((category, id)) = designator_key(m) else { return };
        let data_type = m.literal.data_type();
        self.set(&category, &id, data_type, &m.literal.to_canonical_string());
        if !self.keys.iter().any(|(c, i, dt)| c == &category && i == &id && *dt == data_type) {
            self.keys.push((category, id, data_type));
        }
    }

    fn set(&mut self, category: &str, id: &str, data_type: DataType, literal: &str) {
        for i in 0..HASH_FNS {
            let h = hash_tuple(category, id, data_type, literal, i as u64) as usize % BITS;
            self.bits[h / 64] |= 1 << (h % 64);
        }
    }

    fn contains(&self, category: &str, id: &str, data_type: DataType, literal: &str) -> bool {
        (0..HASH_FNS).all(|i| {
            let h = hash_tuple(category, id, data_type, literal, i as u64) as usize % BITS;
            self.bits[h / 64] & (1 << (h % 64)) != 0
        })
    }

    /// True if `request` might still apply to this root: either this
    /// filter has no keys at all (an empty/targetless root never gets
    /// pruned), or at least one of the request's actual attribute values
    /// for a relevant `(category, id, data type)` triple hits the filter.
    pub async fn maybe_applicable(&self, request: &RequestContext) -> bool {
        if self.keys.is_empty() {
            return true;
        }
        for (category, id, data_type) in &self.keys {
            let query = AttributeKey::new(category.clone(), id.clone(), *data_type, None);
            if let EvaluationResult::Value(bag) = request.get_attribute(&query).await {
                for value in bag.iter() {
                    if self.contains(category, id, *data_type, &value.to_canonical_string()) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

fn designator_key(m: &Match) -> Option<(String, String)> {
    match &m.designator {
        xacml_expr::Expr::AttributeDesignator { category, id, .. } => Some((category.clone(), id.clone())),
        _ => None,
    }
}

fn hash_tuple(category: &str, id: &str, data_type: DataType, literal: &str, seed: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    category.hash(&mut hasher);
    id.hash(&mut hasher);
    data_type.hash(&mut hasher);
    literal.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_recognizes_inserted_tuple() {
        let mut filter = PolicyBloomFilter::empty();
        filter.set("cat", "id", DataType::String, "read");
        assert!(filter.contains("cat", "id", DataType::String, "read"));
    }

    #[test]
    fn filter_rejects_unrelated_tuple() {
        let mut filter = PolicyBloomFilter::empty();
        filter.set("cat", "id", DataType::String, "read");
        assert!(!filter.contains("cat", "id", DataType::String, "write"));
        assert!(!filter.contains("other", "id", DataType::String, "read"));
    }
}
