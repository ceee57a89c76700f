//! I define [`RequestContext`] — the per-evaluation attribute store (spec
//! §4.2) and its [`RequestContextBuilder`].
//!

use std::{collections::HashMap, sync::Mutex};

use tower::ServiceExt;
use tracing::debug;
use xacml_value::{Bag, DataType, EvaluationResult};

use crate::{
    attribute::{Attribute, AttributeKey},
    finder::BoxedAttributeFinderModule,
};

/// A parsed Request, ready for evaluation: the attribute store, per-category
/// `<Content>` fragments, the chain of attribute-finder modules consulted on
/// a miss, and the two Request-level flags from spec §3.
///
/// The lookup cache (§4.2/§9) lives here, in the per-evaluation context — it
/// is never static or shared across evaluations, which is the corrected
/// form of the reference engine's known global-cache defect (spec §9).
pub struct RequestContext {
    attributes: HashMap<(String, String, DataType), Vec<Attribute>>,
    content: HashMap<String, String>,
    finders: Vec<BoxedAttributeFinderModule>,
    // A `Mutex`, not a `RefCell`: `RequestContext` is held behind `&EvalContext`
    // across `.await` points in futures that must stay `Send` (see
    // `xacml_expr::functions::FunctionFuture`), which requires `Sync`.
    cache: Mutex<HashMap<AttributeKey, Bag>>,
    /// Whether the Response must list the identifiers of policies that
    /// contributed to the decision.
    pub return_policy_id_list: bool,
    /// Whether multiple applicable resources/actions should be collapsed
    /// into a single combined Response.
    pub combined_decision: bool,
}

impl RequestContext {
    /// Look up the bag of values for `query`, consulting the Request store
    /// first and falling through the finder chain on a miss (spec §4.2).
    ///
    /// An empty bag — not an error — is returned when neither the Request
    /// nor any finder module produced a value; callers (`AttributeDesignator`,
    /// `AttributeSelector` in `xacml-expr`) decide whether that's acceptable.
    #[tracing::instrument(skip(self))]
    pub async fn get_attribute(&self, query: &AttributeKey) -> EvaluationResult<Bag> {
        if let Some(cached) = self.cache.lock().expect("cache mutex poisoned").get(query) {
            return EvaluationResult::Value(cached.clone());
        }

        if let Some(bag) = self.lookup_stored(query) {
            self.cache.lock().expect("cache mutex poisoned").insert(query.clone(), bag.clone());
            return EvaluationResult::Value(bag);
        }

        for finder in &self.finders {
            match finder.clone().oneshot(query.clone()).await {
                Ok(Some(bag)) => {
                    debug!(category = %query.category, id = %query.id, "attribute resolved by finder module");
                    self.cache.lock().expect("cache mutex poisoned").insert(query.clone(), bag.clone());
                    return EvaluationResult::Value(bag);
                }
                Ok(None) => continue,
                Err(status) => return EvaluationResult::Indeterminate(status),
            }
        }

        let empty = Bag::empty();
        self.cache.lock().expect("cache mutex poisoned").insert(query.clone(), empty.clone());
        EvaluationResult::Value(empty)
    }

    fn lookup_stored(&self, query: &AttributeKey) -> Option<Bag> {
        let group = self
            .attributes
            .get(&(query.category.clone(), query.id.clone(), query.data_type))?;
        let matches: Vec<&Attribute> = group.iter().filter(|attr| attr.key.satisfies(query)).collect();
        if matches.is_empty() {
            // The Request has this (category, id, dataType) but not under an
            // issuer this query accepts — treat as a miss, not an empty hit.
            return None;
        }
        Some(Bag::from_values(
            matches.into_iter().flat_map(|attr| attr.values.iter().cloned()),
        ))
    }

    /// The raw `<Content>` XML fragment registered for `category`, if any.
    pub fn get_content(&self, category: &str) -> Option<&str> {
        self.content.get(category).map(String::as_str)
    }
}

/// Builder for [`RequestContext`], performing the category-group merge spec
/// §4.7 requires of the Request loader (duplicate category groups' bags
/// concatenated, not deduplicated — that's the distinct `*-union` function
/// semantics in `xacml-value::Bag::union`).
#[derive(Default)]
pub struct RequestContextBuilder {
    attributes: HashMap<(String, String, DataType), Vec<Attribute>>,
    content: HashMap<String, String>,
    finders: Vec<BoxedAttributeFinderModule>,
    return_policy_id_list: bool,
    combined_decision: bool,
}

impl RequestContextBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute, merging its values into any existing entry
    /// under the same `(category, id, dataType, issuer)` key.
    pub fn add_attribute(mut self, attribute: Attribute) -> Self {
        let bucket = self
            .attributes
            .entry((
                attribute.key.category.clone(),
                attribute.key.id.clone(),
                attribute.key.data_type,
            ))
            .or_default();
        if let Some(existing) = bucket
            .iter_mut()
            .find(|a| a.key.issuer == attribute.key.issuer)
        {
            let merged = existing
                .values
                .iter()
                .cloned()
                .chain(attribute.values.iter().cloned())
                .collect();
            existing.values = merged;
            existing.include_in_result = existing.include_in_result || attribute.include_in_result;
        } else {
            bucket.push(attribute);
        }
        self
    }

    /// Register a `<Content>` fragment for `category`.
    pub fn with_content(mut self, category: impl Into<String>, xml: impl Into<String>) -> Self {
        self.content.insert(category.into(), xml.into());
        self
    }

    /// Append an attribute-finder module to the chain.
    pub fn with_finder(mut self, finder: BoxedAttributeFinderModule) -> Self {
        self.finders.push(finder);
        self
    }

    /// Set the `ReturnPolicyIdList` Request flag.
    pub fn return_policy_id_list(mut self, value: bool) -> Self {
        self.return_policy_id_list = value;
        self
    }

    /// Set the `CombinedDecision` Request flag.
    pub fn combined_decision(mut self, value: bool) -> Self {
        self.combined_decision = value;
        self
    }

    /// Finish building.
    pub fn build(self) -> RequestContext {
        RequestContext {
            attributes: self.attributes,
            content: self.content,
            finders: self.finders,
            cache: Mutex::new(HashMap::new()),
            return_policy_id_list: self.return_policy_id_list,
            combined_decision: self.combined_decision,
        }
    }
}
