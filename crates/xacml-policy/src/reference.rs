//! I define [`PolicyIdReference`] and [`PolicySetIdReference`] — lazy
//! handles a `PolicySet` holds for a `<PolicyIdReference>`/
//! `<PolicySetIdReference>` element (spec §4.4), resolved once, after every
//! Policy/PolicySet in a load batch is parsed, by the loader (C6/C7) that
//! owns the id→policy index.
//!
//! A lightweight handle resolved against an index to its full description,
//! without any graph machinery — here the "graph" is just a
//! `HashMap<String, Arc<_>>` built at `Pdp::load` time.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::{policy::Policy, policy_set::PolicySet};

/// A `<PolicyIdReference>`: names a `Policy` by id, resolved after load.
pub struct PolicyIdReference {
    /// The referenced `PolicyId`.
    pub policy_id: String,
    resolved: OnceCell<Arc<Policy>>,
}

/// A `<PolicySetIdReference>`: names a `PolicySet` by id, resolved after load.
pub struct PolicySetIdReference {
    /// The referenced `PolicySetId`.
    pub policy_set_id: String,
    resolved: OnceCell<Arc<PolicySet>>,
}

/// Error dereferencing an unresolved or dangling policy reference.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ReferenceError {
    /// The reference was never resolved against a loaded policy set (a
    /// loader bug: resolution must happen for every reference before the
    /// `Pdp` is handed to a caller).
    #[error("policy reference `{0}` was never resolved")]
    Unresolved(String),
}

impl PolicyIdReference {
    /// Build an unresolved reference.
    pub fn new(policy_id: impl Into<String>) -> Self {
        Self { policy_id: policy_id.into(), resolved: OnceCell::new() }
    }

    /// Bind this reference to its target. Idempotent: a second call with a
    /// different target is ignored, since the loader resolves each
    /// reference exactly once by construction.
    pub fn resolve(&self, policy: Arc<Policy>) {
        let _ = self.resolved.set(policy);
    }

    /// The resolved target, or an error if resolution never happened.
    pub fn get(&self) -> Result<&Arc<Policy>, ReferenceError> {
        self.resolved.get().ok_or_else(|| ReferenceError::Unresolved(self.policy_id.clone()))
    }
}

impl PolicySetIdReference {
    /// Build an unresolved reference.
    pub fn new(policy_set_id: impl Into<String>) -> Self {
        Self { policy_set_id: policy_set_id.into(), resolved: OnceCell::new() }
    }

    /// Bind this reference to its target. Idempotent, see
    /// [`PolicyIdReference::resolve`].
    pub fn resolve(&self, policy_set: Arc<PolicySet>) {
        let _ = self.resolved.set(policy_set);
    }

    /// The resolved target, or an error if resolution never happened.
    pub fn get(&self) -> Result<&Arc<PolicySet>, ReferenceError> {
        self.resolved.get().ok_or_else(|| ReferenceError::Unresolved(self.policy_set_id.clone()))
    }
}
