//! Group 4 — `not`/`and`/`or`/`n-of` (spec §4.3.4).
//!
//! `and`, `or` and `n-of` evaluate their arguments themselves, left to
//! right, so they can stop as soon as the outcome is determined — an
//! `Indeterminate` argument after that point is never observed (spec §4.3:
//! "an `and` with one `false` returns `false` even if another arg is
//! `Indeterminate`").
//!

use std::sync::Arc;

use xacml_value::{EvaluationResult, Status, Value};

use super::{processing_error, Arity, Function, FunctionFuture};
use crate::{ctx::EvalContext, expr::Expr, value::ExprValue};

struct Not;

impl Function for Not {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:1.0:function:not"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            match args[0].evaluate(ctx).await {
                EvaluationResult::Value(ExprValue::Single(Value::Boolean(b))) => {
                    EvaluationResult::Value(ExprValue::Single(Value::Boolean(!b)))
                }
                EvaluationResult::Value(_) => {
                    EvaluationResult::Indeterminate(processing_error("not: expected a boolean argument"))
                }
                EvaluationResult::Indeterminate(s) => EvaluationResult::Indeterminate(s),
            }
        })
    }
}

struct And;

impl Function for And {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:1.0:function:and"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let mut saw_indeterminate = false;
            for arg in args {
                match arg.evaluate(ctx).await {
                    EvaluationResult::Value(ExprValue::Single(Value::Boolean(false))) => {
                        return EvaluationResult::Value(ExprValue::Single(Value::Boolean(false)));
                    }
                    EvaluationResult::Value(ExprValue::Single(Value::Boolean(true))) => continue,
                    EvaluationResult::Value(_) => {
                        return EvaluationResult::Indeterminate(processing_error(
                            "and: expected a boolean argument",
                        ));
                    }
                    EvaluationResult::Indeterminate(_) => saw_indeterminate = true,
                }
            }
            if saw_indeterminate {
                EvaluationResult::Indeterminate(Status::processing_error(
                    "and: an argument was Indeterminate and no false was found",
                ))
            } else {
                EvaluationResult::Value(ExprValue::Single(Value::Boolean(true)))
            }
        })
    }
}

struct Or;

impl Function for Or {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:1.0:function:or"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let mut saw_indeterminate = false;
            for arg in args {
                match arg.evaluate(ctx).await {
                    EvaluationResult::Value(ExprValue::Single(Value::Boolean(true))) => {
                        return EvaluationResult::Value(ExprValue::Single(Value::Boolean(true)));
                    }
                    EvaluationResult::Value(ExprValue::Single(Value::Boolean(false))) => continue,
                    EvaluationResult::Value(_) => {
                        return EvaluationResult::Indeterminate(processing_error(
                            "or: expected a boolean argument",
                        ));
                    }
                    EvaluationResult::Indeterminate(_) => saw_indeterminate = true,
                }
            }
            if saw_indeterminate {
                EvaluationResult::Indeterminate(Status::processing_error(
                    "or: an argument was Indeterminate and no true was found",
                ))
            } else {
                EvaluationResult::Value(ExprValue::Single(Value::Boolean(false)))
            }
        })
    }
}

/// `n-of(n, b1, .., bk)`: true iff at least `n` of the booleans `b1..bk` are
/// true. Short-circuits once `n` trues are seen.
struct NOf;

impl Function for NOf {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:1.0:function:n-of"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(1)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let n = match args[0].evaluate(ctx).await {
                EvaluationResult::Value(ExprValue::Single(Value::Integer(n))) => {
                    match TryInto::<usize>::try_into(n) {
                        Ok(n) => n,
                        Err(_) => {
                            return EvaluationResult::Indeterminate(processing_error(
                                "n-of: n out of range",
                            ));
                        }
                    }
                }
                EvaluationResult::Value(_) => {
                    return EvaluationResult::Indeterminate(processing_error(
                        "n-of: first argument must be an integer",
                    ));
                }
                EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
            };

            if n == 0 {
                return EvaluationResult::Value(ExprValue::Single(Value::Boolean(true)));
            }

            let mut trues = 0usize;
            let mut saw_indeterminate = false;
            for arg in &args[1..] {
                match arg.evaluate(ctx).await {
                    EvaluationResult::Value(ExprValue::Single(Value::Boolean(true))) => {
                        trues += 1;
                        if trues >= n {
                            return EvaluationResult::Value(ExprValue::Single(Value::Boolean(true)));
                        }
                    }
                    EvaluationResult::Value(ExprValue::Single(Value::Boolean(false))) => continue,
                    EvaluationResult::Value(_) => {
                        return EvaluationResult::Indeterminate(processing_error(
                            "n-of: expected boolean arguments",
                        ));
                    }
                    EvaluationResult::Indeterminate(_) => saw_indeterminate = true,
                }
            }

            if saw_indeterminate {
                EvaluationResult::Indeterminate(Status::processing_error(
                    "n-of: could not determine enough arguments to settle the count",
                ))
            } else {
                EvaluationResult::Value(ExprValue::Single(Value::Boolean(false)))
            }
        })
    }
}

pub(super) fn register(all: &mut Vec<Arc<dyn Function>>) {
    all.push(Arc::new(Not));
    all.push(Arc::new(And));
    all.push(Arc::new(Or));
    all.push(Arc::new(NOf));
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;
    use xacml_value::Status;

    use super::*;
    use crate::{functions::resolve_function, variables::VariableScope};

    fn ctx_for<'a>(request: &'a xacml_context::RequestContext, variables: &'a VariableScope) -> EvalContext<'a> {
        EvalContext {
            request,
            default_tz: FixedOffset::east_opt(0).unwrap(),
            variables,
        }
    }

    /// An `AttributeDesignator` that will always resolve to `Indeterminate`
    /// against an empty [`xacml_context::RequestContext`].
    fn missing_attribute_expr() -> Expr {
        Expr::AttributeDesignator {
            category: "urn:example:subject".into(),
            id: "urn:example:missing".into(),
            data_type: xacml_value::DataType::Boolean,
            issuer: None,
            must_be_present: true,
        }
    }

    #[tokio::test]
    async fn and_short_circuits_on_first_false() {
        let f = resolve_function("urn:oasis:names:tc:xacml:1.0:function:and").unwrap();
        let args = [
            Expr::AttributeValue(Value::Boolean(false)),
            Expr::AttributeValue(Value::Boolean(true)),
        ];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let result = f.call(&args, &ctx).await;
        assert_eq!(result, EvaluationResult::Value(ExprValue::Single(Value::Boolean(false))));
    }

    #[tokio::test]
    async fn and_is_indeterminate_when_an_arg_is_indeterminate_and_none_is_false() {
        let f = resolve_function("urn:oasis:names:tc:xacml:1.0:function:and").unwrap();
        let args = [
            Expr::AttributeValue(Value::Boolean(true)),
            missing_attribute_expr(),
        ];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        assert!(f.call(&args, &ctx).await.is_indeterminate());
    }

    #[tokio::test]
    async fn or_is_true_if_any_true() {
        let f = resolve_function("urn:oasis:names:tc:xacml:1.0:function:or").unwrap();
        let args = [
            Expr::AttributeValue(Value::Boolean(false)),
            Expr::AttributeValue(Value::Boolean(true)),
        ];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let result = f.call(&args, &ctx).await;
        assert_eq!(result, EvaluationResult::Value(ExprValue::Single(Value::Boolean(true))));
    }

    #[tokio::test]
    async fn n_of_counts_trues() {
        let f = resolve_function("urn:oasis:names:tc:xacml:1.0:function:n-of").unwrap();
        let args = [
            Expr::AttributeValue(Value::Integer(2.into())),
            Expr::AttributeValue(Value::Boolean(true)),
            Expr::AttributeValue(Value::Boolean(false)),
            Expr::AttributeValue(Value::Boolean(true)),
        ];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let result = f.call(&args, &ctx).await;
        assert_eq!(result, EvaluationResult::Value(ExprValue::Single(Value::Boolean(true))));
    }

    #[test]
    fn status_import_is_used_in_processing_error_paths() {
        let _ = Status::ok();
    }
}
