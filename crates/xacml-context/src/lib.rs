//! Request context, attribute store and attribute-finder chain for a XACML
//! 3.0 policy engine.
//!
//! This crate owns the evaluation-time view of a Request: [`RequestContext`]
//! stores the attributes a Request supplied, merges duplicate category
//! groups, and resolves misses through a caller-supplied chain of
//! [`finder::AttributeFinderModule`]s, with a lookup cache scoped strictly
//! to the single [`RequestContext`] instance (spec §4.2/§9 — never a
//! process-wide cache).
#![warn(missing_docs)]
#![cfg_attr(doc_cfg, feature(doc_auto_cfg))]
#![deny(unused_qualifications)]

pub mod attribute;
pub mod finder;
pub mod store;

pub use attribute::{Attribute, AttributeKey};
pub use finder::{AttributeFinderModule, BoxedAttributeFinderModule, EnvironmentFinder};
pub use store::{RequestContext, RequestContextBuilder};
