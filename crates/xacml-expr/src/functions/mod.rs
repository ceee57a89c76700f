//! I define the [`Function`] trait and the static function-id registry
//! (spec §4.3): function dispatch is resolved once, at policy load, to a
//! `Arc<dyn Function>` held directly by the `Apply` node — never a string
//! lookup in the evaluation hot path (teacher idiom: `acp`'s
//! `HashMap<ArcTerm, BoxedAttributeMatchService>` static dispatch tables).
//!

pub mod arithmetic;
pub mod bag_fns;
pub mod comparison;
pub mod datetime_fns;
pub mod equality;
pub mod higher_order;
pub mod logical;
pub mod regex_fns;
pub mod string_fns;

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use once_cell::sync::Lazy;
use xacml_value::{DataType, EvaluationResult, Status};

use crate::{ctx::EvalContext, error::ExprBuildError, expr::Expr, value::ExprValue};

/// A boxed future resolving to a function's result.
pub type FunctionFuture<'a> = Pin<Box<dyn Future<Output = EvaluationResult<ExprValue>> + Send + 'a>>;

/// The number of arguments a [`Function`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` arguments.
    Exact(usize),
    /// At least `n` arguments (`n-of`, `*-concatenate`, `any-of`/`all-of`).
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, n: usize) -> bool {
        match self {
            Self::Exact(k) => n == k,
            Self::AtLeast(k) => n >= k,
        }
    }
}

/// A standard XACML function. Implementations receive the *unevaluated*
/// argument expressions so that short-circuit functions (`and`, `or`,
/// `n-of`) can choose not to evaluate every one (spec §4.3).
pub trait Function: Send + Sync {
    /// The function's id uri.
    fn id(&self) -> &'static str;

    /// Accepted argument count.
    fn arity(&self) -> Arity;

    /// Evaluate against `args` in `ctx`.
    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a>;
}

/// Evaluate every argument expression in syntactic order, short-circuiting
/// on the first `Indeterminate` — the default (non-short-circuiting)
/// argument-evaluation strategy spec §4.3 describes for most functions.
pub async fn eval_all<'a>(
    args: &'a [Expr],
    ctx: &'a EvalContext<'a>,
) -> EvaluationResult<Vec<ExprValue>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        match arg.evaluate(ctx).await {
            EvaluationResult::Value(v) => values.push(v),
            EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
        }
    }
    EvaluationResult::Value(values)
}

/// Resolve a function id to its implementation, at policy-load time. Unknown
/// ids are a load error (spec §4.3), never `Indeterminate`.
pub fn resolve_function(id: &str) -> Result<Arc<dyn Function>, ExprBuildError> {
    REGISTRY
        .get(id)
        .cloned()
        .ok_or_else(|| ExprBuildError::UnknownFunction(id.to_owned()))
}

/// Check the argument count a caller is about to bind against a function's
/// declared arity, at policy-load time.
pub fn check_arity(function: &dyn Function, arg_count: usize) -> Result<(), ExprBuildError> {
    if function.arity().accepts(arg_count) {
        Ok(())
    } else {
        let expected = match function.arity() {
            Arity::Exact(k) | Arity::AtLeast(k) => k,
        };
        Err(ExprBuildError::ArityMismatch {
            function_id: function.id().to_owned(),
            expected,
            actual: arg_count,
        })
    }
}

/// The XACML-standard short type name used inside family-of-types function
/// ids (`{type}-equal`, `{type}-bag`, ...). Not every [`DataType`] variant
/// takes part in every family; callers restrict to the subsets spec §4.3
/// names for each function group.
pub(crate) fn short_name(dt: DataType) -> &'static str {
    match dt {
        DataType::String => "string",
        DataType::Boolean => "boolean",
        DataType::Integer => "integer",
        DataType::Double => "double",
        DataType::DateTime => "dateTime",
        DataType::Date => "date",
        DataType::Time => "time",
        DataType::DayTimeDuration => "dayTimeDuration",
        DataType::YearMonthDuration => "yearMonthDuration",
        DataType::AnyUri => "anyURI",
        DataType::HexBinary => "hexBinary",
        DataType::Base64Binary => "base64Binary",
        DataType::Rfc822Name => "rfc822Name",
        DataType::X500Name => "x500Name",
    }
}

pub(crate) fn processing_error(message: impl Into<String>) -> Status {
    Status::processing_error(message.into())
}

static REGISTRY: Lazy<HashMap<&'static str, Arc<dyn Function>>> = Lazy::new(|| {
    let mut all: Vec<Arc<dyn Function>> = Vec::new();
    equality::register(&mut all);
    comparison::register(&mut all);
    arithmetic::register(&mut all);
    logical::register(&mut all);
    bag_fns::register(&mut all);
    higher_order::register(&mut all);
    string_fns::register(&mut all);
    regex_fns::register(&mut all);
    datetime_fns::register(&mut all);
    all.into_iter().map(|f| (f.id(), f)).collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_function_resolves_by_its_own_id() {
        for (id, f) in REGISTRY.iter() {
            assert_eq!(*id, f.id());
            assert!(resolve_function(id).is_ok());
        }
    }

    #[test]
    fn unknown_function_id_is_a_build_error() {
        assert!(resolve_function("urn:example:not-a-function").is_err());
    }
}
