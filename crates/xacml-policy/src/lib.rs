//! Policy tree, target matching, combining algorithms and obligation/advice
//! gathering for a XACML 3.0 policy engine.
//!
//! This crate sits above `xacml-expr`: [`target::Target`] is the 3-valued
//! target-matching tree (spec §4.4), [`rule::Rule`]/[`policy::Policy`]/
//! [`policy_set::PolicySet`] are the policy tree's nodes, [`combining`] is
//! the eight combining algorithms (spec §4.5), and [`reference`] is the
//! lazy Policy/PolicySet reference handle the loader (C6/C7) resolves.
#![warn(missing_docs)]
#![cfg_attr(doc_cfg, feature(doc_auto_cfg))]
#![deny(unused_qualifications)]

pub mod combining;
pub mod decision;
pub mod obligation;
pub mod policy;
pub mod policy_set;
pub mod reference;
pub mod rule;
pub mod target;

pub use combining::Algorithm;
pub use decision::{Decision, Effect};
pub use obligation::{AdviceExpression, ObligationExpression, ResolvedAdvice, ResolvedAssignment, ResolvedObligation};
pub use policy::{Policy, PolicyEvaluation};
pub use policy_set::{PolicySet, PolicySetChild};
pub use reference::{PolicyIdReference, PolicySetIdReference, ReferenceError};
pub use rule::Rule;
pub use target::{AllOf, AnyOf, Match, MatchResult, Target};
