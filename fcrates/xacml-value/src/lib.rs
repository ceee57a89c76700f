//! Typed attribute-value and bag model for a XACML 3.0 policy engine.
//!
//! This crate owns the leaf data model that everything above it builds on:
//! the primitive [`data_type::DataType`] registry, the [`value::Value`]
//! union over every XACML primitive type, multiset [`bag::Bag`]s of values,
//! and the [`status::EvaluationResult`]/[`status::Status`] pair used to
//! thread `Indeterminate` through evaluation as a first-class value rather
//! than a side channel.
#![warn(missing_docs)]
#![cfg_attr(doc_cfg, feature(doc_auto_cfg))]
#![deny(unused_qualifications)]

pub mod bag;
pub mod data_type;
pub mod error;
pub mod status;
pub mod types;
pub mod value;

pub use bag::{Bag, BagCardinalityError, MixedDataTypesError};
pub use data_type::DataType;
pub use error::ValueParseError;
pub use status::{EvaluationResult, MissingAttributeDescriptor, Status, StatusCode, StatusDetail};
pub use value::Value;
