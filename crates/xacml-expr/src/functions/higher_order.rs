//! Group 6 — higher-order bag functions (spec §4.3.6): `any-of`, `all-of`,
//! `any-of-any`, `all-of-any`, `any-of-all`, `all-of-all`, `map`.
//!
//! Each of these takes a `Function` reference as its first argument —
//! represented by [`Expr::FunctionReference`], evaluated not for a value but
//! matched directly — followed by scalar/bag arguments the referenced
//! function is applied against.

use std::sync::Arc;

use xacml_value::{Bag, EvaluationResult, Status, Value};

use super::{processing_error, Arity, Function, FunctionFuture};
use crate::{ctx::EvalContext, expr::Expr, value::ExprValue};

fn as_function(expr: &Expr) -> Option<&Arc<dyn Function>> {
    match expr {
        Expr::FunctionReference(f) => Some(f),
        _ => None,
    }
}

async fn as_bag(expr: &Expr, ctx: &EvalContext<'_>) -> EvaluationResult<Bag> {
    expr.evaluate(ctx).await.map(ExprValue::into_bag)
}

async fn predicate(
    f: &Arc<dyn Function>,
    call_args: &[Expr],
    ctx: &EvalContext<'_>,
) -> EvaluationResult<bool> {
    match f.call(call_args, ctx).await {
        EvaluationResult::Value(ExprValue::Single(Value::Boolean(b))) => EvaluationResult::Value(b),
        EvaluationResult::Value(_) => EvaluationResult::Indeterminate(processing_error(
            "higher-order function: referenced function must return a boolean",
        )),
        EvaluationResult::Indeterminate(s) => EvaluationResult::Indeterminate(s),
    }
}

struct AnyOf;

impl Function for AnyOf {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:3.0:function:any-of"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(2)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let Some(f) = as_function(&args[0]) else {
                return EvaluationResult::Indeterminate(processing_error(
                    "any-of: first argument must be a function reference",
                ));
            };
            let rest = &args[1..];
            let (prefix, last) = rest.split_at(rest.len() - 1);
            let bag = match as_bag(&last[0], ctx).await {
                EvaluationResult::Value(b) => b,
                EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
            };
            let mut saw_indeterminate = false;
            for elem in bag.iter() {
                let mut call_args = prefix.to_vec();
                call_args.push(Expr::AttributeValue(elem.clone()));
                match predicate(f, &call_args, ctx).await {
                    EvaluationResult::Value(true) => {
                        return EvaluationResult::Value(ExprValue::Single(Value::Boolean(true)));
                    }
                    EvaluationResult::Value(false) => continue,
                    EvaluationResult::Indeterminate(_) => saw_indeterminate = true,
                }
            }
            if saw_indeterminate {
                EvaluationResult::Indeterminate(Status::processing_error(
                    "any-of: an element was indeterminate and none was true",
                ))
            } else {
                EvaluationResult::Value(ExprValue::Single(Value::Boolean(false)))
            }
        })
    }
}

struct AllOf;

impl Function for AllOf {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:3.0:function:all-of"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(2)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let Some(f) = as_function(&args[0]) else {
                return EvaluationResult::Indeterminate(processing_error(
                    "all-of: first argument must be a function reference",
                ));
            };
            let rest = &args[1..];
            let (prefix, last) = rest.split_at(rest.len() - 1);
            let bag = match as_bag(&last[0], ctx).await {
                EvaluationResult::Value(b) => b,
                EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
            };
            let mut saw_indeterminate = false;
            for elem in bag.iter() {
                let mut call_args = prefix.to_vec();
                call_args.push(Expr::AttributeValue(elem.clone()));
                match predicate(f, &call_args, ctx).await {
                    EvaluationResult::Value(false) => {
                        return EvaluationResult::Value(ExprValue::Single(Value::Boolean(false)));
                    }
                    EvaluationResult::Value(true) => continue,
                    EvaluationResult::Indeterminate(_) => saw_indeterminate = true,
                }
            }
            if saw_indeterminate {
                EvaluationResult::Indeterminate(Status::processing_error(
                    "all-of: an element was indeterminate and none was false",
                ))
            } else {
                EvaluationResult::Value(ExprValue::Single(Value::Boolean(true)))
            }
        })
    }
}

struct AnyOfAny;

impl Function for AnyOfAny {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:3.0:function:any-of-any"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let Some(f) = as_function(&args[0]) else {
                return EvaluationResult::Indeterminate(processing_error(
                    "any-of-any: first argument must be a function reference",
                ));
            };
            let (bag1, bag2) = match pair_of_bags(&args[1], &args[2], ctx).await {
                Ok(bags) => bags,
                Err(s) => return EvaluationResult::Indeterminate(s),
            };
            let mut saw_indeterminate = false;
            for e1 in bag1.iter() {
                for e2 in bag2.iter() {
                    let call_args = [Expr::AttributeValue(e1.clone()), Expr::AttributeValue(e2.clone())];
                    match predicate(f, &call_args, ctx).await {
                        EvaluationResult::Value(true) => {
                            return EvaluationResult::Value(ExprValue::Single(Value::Boolean(true)));
                        }
                        EvaluationResult::Value(false) => continue,
                        EvaluationResult::Indeterminate(_) => saw_indeterminate = true,
                    }
                }
            }
            if saw_indeterminate {
                EvaluationResult::Indeterminate(processing_error("any-of-any: no pair was definitely true"))
            } else {
                EvaluationResult::Value(ExprValue::Single(Value::Boolean(false)))
            }
        })
    }
}

struct AllOfAny;

impl Function for AllOfAny {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:3.0:function:all-of-any"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let Some(f) = as_function(&args[0]) else {
                return EvaluationResult::Indeterminate(processing_error(
                    "all-of-any: first argument must be a function reference",
                ));
            };
            let (bag1, bag2) = match pair_of_bags(&args[1], &args[2], ctx).await {
                Ok(bags) => bags,
                Err(s) => return EvaluationResult::Indeterminate(s),
            };
            let mut saw_indeterminate = false;
            for e1 in bag1.iter() {
                let mut row_true = false;
                let mut row_indeterminate = false;
                for e2 in bag2.iter() {
                    let call_args = [Expr::AttributeValue(e1.clone()), Expr::AttributeValue(e2.clone())];
                    match predicate(f, &call_args, ctx).await {
                        EvaluationResult::Value(true) => {
                            row_true = true;
                            break;
                        }
                        EvaluationResult::Value(false) => continue,
                        EvaluationResult::Indeterminate(_) => row_indeterminate = true,
                    }
                }
                if !row_true {
                    if row_indeterminate {
                        saw_indeterminate = true;
                    } else {
                        return EvaluationResult::Value(ExprValue::Single(Value::Boolean(false)));
                    }
                }
            }
            if saw_indeterminate {
                EvaluationResult::Indeterminate(processing_error("all-of-any: a bag1 element had no definite match"))
            } else {
                EvaluationResult::Value(ExprValue::Single(Value::Boolean(true)))
            }
        })
    }
}

struct AnyOfAll;

impl Function for AnyOfAll {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:3.0:function:any-of-all"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let Some(f) = as_function(&args[0]) else {
                return EvaluationResult::Indeterminate(processing_error(
                    "any-of-all: first argument must be a function reference",
                ));
            };
            let (bag1, bag2) = match pair_of_bags(&args[1], &args[2], ctx).await {
                Ok(bags) => bags,
                Err(s) => return EvaluationResult::Indeterminate(s),
            };
            let mut saw_indeterminate = false;
            for e1 in bag1.iter() {
                let mut row_all_true = true;
                let mut row_indeterminate = false;
                for e2 in bag2.iter() {
                    let call_args = [Expr::AttributeValue(e1.clone()), Expr::AttributeValue(e2.clone())];
                    match predicate(f, &call_args, ctx).await {
                        EvaluationResult::Value(true) => continue,
                        EvaluationResult::Value(false) => {
                            row_all_true = false;
                            break;
                        }
                        EvaluationResult::Indeterminate(_) => row_indeterminate = true,
                    }
                }
                if row_all_true {
                    if row_indeterminate {
                        saw_indeterminate = true;
                    } else {
                        return EvaluationResult::Value(ExprValue::Single(Value::Boolean(true)));
                    }
                }
            }
            if saw_indeterminate {
                EvaluationResult::Indeterminate(processing_error("any-of-all: no bag1 element was definitely all-true"))
            } else {
                EvaluationResult::Value(ExprValue::Single(Value::Boolean(false)))
            }
        })
    }
}

struct AllOfAll;

impl Function for AllOfAll {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:3.0:function:all-of-all"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let Some(f) = as_function(&args[0]) else {
                return EvaluationResult::Indeterminate(processing_error(
                    "all-of-all: first argument must be a function reference",
                ));
            };
            let (bag1, bag2) = match pair_of_bags(&args[1], &args[2], ctx).await {
                Ok(bags) => bags,
                Err(s) => return EvaluationResult::Indeterminate(s),
            };
            let mut saw_indeterminate = false;
            for e1 in bag1.iter() {
                for e2 in bag2.iter() {
                    let call_args = [Expr::AttributeValue(e1.clone()), Expr::AttributeValue(e2.clone())];
                    match predicate(f, &call_args, ctx).await {
                        EvaluationResult::Value(true) => continue,
                        EvaluationResult::Value(false) => {
                            return EvaluationResult::Value(ExprValue::Single(Value::Boolean(false)));
                        }
                        EvaluationResult::Indeterminate(_) => saw_indeterminate = true,
                    }
                }
            }
            if saw_indeterminate {
                EvaluationResult::Indeterminate(processing_error("all-of-all: a pair was indeterminate"))
            } else {
                EvaluationResult::Value(ExprValue::Single(Value::Boolean(true)))
            }
        })
    }
}

struct Map;

impl Function for Map {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:3.0:function:map"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let Some(f) = as_function(&args[0]) else {
                return EvaluationResult::Indeterminate(processing_error(
                    "map: first argument must be a function reference",
                ));
            };
            let bag = match as_bag(&args[1], ctx).await {
                EvaluationResult::Value(b) => b,
                EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
            };
            let mut out = Vec::with_capacity(bag.size());
            for elem in bag.iter() {
                let call_args = [Expr::AttributeValue(elem.clone())];
                match f.call(&call_args, ctx).await {
                    EvaluationResult::Value(ExprValue::Single(v)) => out.push(v),
                    EvaluationResult::Value(ExprValue::Bag(_)) => {
                        return EvaluationResult::Indeterminate(processing_error(
                            "map: referenced function must return a single value per element",
                        ));
                    }
                    EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
                }
            }
            EvaluationResult::Value(ExprValue::Bag(Bag::from_values(out)))
        })
    }
}

async fn pair_of_bags(a: &Expr, b: &Expr, ctx: &EvalContext<'_>) -> Result<(Bag, Bag), Status> {
    let bag1 = match as_bag(a, ctx).await {
        EvaluationResult::Value(b) => b,
        EvaluationResult::Indeterminate(s) => return Err(s),
    };
    let bag2 = match as_bag(b, ctx).await {
        EvaluationResult::Value(b) => b,
        EvaluationResult::Indeterminate(s) => return Err(s),
    };
    Ok((bag1, bag2))
}

pub(super) fn register(all: &mut Vec<Arc<dyn Function>>) {
    all.push(Arc::new(AnyOf));
    all.push(Arc::new(AllOf));
    all.push(Arc::new(AnyOfAny));
    all.push(Arc::new(AllOfAny));
    all.push(Arc::new(AnyOfAll));
    all.push(Arc::new(AllOfAll));
    all.push(Arc::new(Map));
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;
    use crate::{functions::resolve_function, variables::VariableScope};

    fn ctx_for<'a>(request: &'a xacml_context::RequestContext, variables: &'a VariableScope) -> EvalContext<'a> {
        EvalContext {
            request,
            default_tz: FixedOffset::east_opt(0).unwrap(),
            variables,
        }
    }

    #[tokio::test]
    async fn any_of_true_if_one_element_matches() {
        let any_of = resolve_function("urn:oasis:names:tc:xacml:3.0:function:any-of").unwrap();
        let equal = resolve_function("urn:oasis:names:tc:xacml:1.0:function:integer-equal").unwrap();
        let bag = Expr::Apply {
            function: resolve_function("urn:oasis:names:tc:xacml:1.0:function:integer-bag").unwrap(),
            args: vec![
                Expr::AttributeValue(Value::Integer(1.into())),
                Expr::AttributeValue(Value::Integer(2.into())),
            ],
        };
        let args = [
            Expr::FunctionReference(equal),
            Expr::AttributeValue(Value::Integer(2.into())),
            bag,
        ];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let result = any_of.call(&args, &ctx).await;
        assert_eq!(result, EvaluationResult::Value(ExprValue::Single(Value::Boolean(true))));
    }

    #[tokio::test]
    async fn all_of_false_if_one_element_fails() {
        let all_of = resolve_function("urn:oasis:names:tc:xacml:3.0:function:all-of").unwrap();
        let equal = resolve_function("urn:oasis:names:tc:xacml:1.0:function:integer-equal").unwrap();
        let bag = Expr::Apply {
            function: resolve_function("urn:oasis:names:tc:xacml:1.0:function:integer-bag").unwrap(),
            args: vec![
                Expr::AttributeValue(Value::Integer(2.into())),
                Expr::AttributeValue(Value::Integer(3.into())),
            ],
        };
        let args = [
            Expr::FunctionReference(equal),
            Expr::AttributeValue(Value::Integer(2.into())),
            bag,
        ];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let result = all_of.call(&args, &ctx).await;
        assert_eq!(result, EvaluationResult::Value(ExprValue::Single(Value::Boolean(false))));
    }
}
