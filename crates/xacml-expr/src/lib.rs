//! Evaluable expression tree and standard function catalog for a XACML 3.0
//! policy engine.
//!
//! This crate sits above `xacml-value`'s typed value model and
//! `xacml-context`'s attribute store: [`expr::Expr`] is the compiled form
//! every Target Match, Condition, ObligationExpression and AdviceExpression
//! reduces to, and [`functions`] is the standard function catalog §4.3
//! function ids resolve against at policy-load time.
#![warn(missing_docs)]
#![cfg_attr(doc_cfg, feature(doc_auto_cfg))]
#![deny(unused_qualifications)]

pub mod ctx;
pub mod error;
pub mod expr;
pub mod functions;
pub mod selector;
pub mod value;
pub mod variables;

pub use ctx::EvalContext;
pub use error::ExprBuildError;
pub use expr::Expr;
pub use functions::{check_arity, resolve_function, Arity, Function, FunctionFuture};
pub use value::ExprValue;
pub use variables::VariableScope;
