//! XACML 3.0 Policy Decision Point orchestrator: loads Policy/PolicySet XML
//! documents, resolves cross-document references, and evaluates Request XML
//! into Response XML (spec §4.1/§4.6/§4.7).
//!
//! This crate sits atop `xacml-policy`'s tree and `xacml-context`'s
//! per-evaluation store: [`pdp::Pdp`] is the thing a caller actually holds
//! and calls `evaluate` on; [`xml`] is every wire-format concern (Request
//! parsing, Response serialization, Policy/PolicySet loading); [`config`] is
//! the PDP's runtime configuration.

#![warn(missing_docs)]
#![cfg_attr(doc_cfg, feature(doc_auto_cfg))]
#![deny(unused_qualifications)]

pub mod bloom;
pub mod config;
pub mod error;
pub mod pdp;
pub mod xml;

pub use config::PdpConfig;
pub use error::PdpLoadError;
pub use pdp::Pdp;
