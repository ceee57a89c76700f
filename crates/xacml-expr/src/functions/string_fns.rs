//! Group 7 — string manipulation functions (spec §4.3.7): `string-concatenate`,
//! `string-normalize-space`, `string-normalize-to-lower-case`,
//! `string-starts-with`, `string-ends-with`, `string-contains`,
//! `string-substring`.
//!

use std::sync::Arc;

use num_traits::ToPrimitive;
use xacml_value::{EvaluationResult, Value};

use super::{eval_all, processing_error, Arity, Function, FunctionFuture};
use crate::{ctx::EvalContext, expr::Expr, value::ExprValue};

fn strings(values: &[ExprValue]) -> Option<Vec<&str>> {
    values
        .iter()
        .map(|v| match v.as_single() {
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        })
        .collect()
}

struct Concatenate;

impl Function for Concatenate {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:2.0:function:string-concatenate"
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(2)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let values = match eval_all(args, ctx).await {
                EvaluationResult::Value(v) => v,
                EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
            };
            let Some(parts) = strings(&values) else {
                return EvaluationResult::Indeterminate(processing_error(
                    "string-concatenate: expected string arguments",
                ));
            };
            EvaluationResult::Value(ExprValue::Single(Value::String(parts.concat())))
        })
    }
}

struct NormalizeSpace;

impl Function for NormalizeSpace {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:1.0:function:string-normalize-space"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            match args[0].evaluate(ctx).await {
                EvaluationResult::Value(ExprValue::Single(Value::String(s))) => {
                    EvaluationResult::Value(ExprValue::Single(Value::String(s.trim().to_owned())))
                }
                EvaluationResult::Value(_) => {
                    EvaluationResult::Indeterminate(processing_error(
                        "string-normalize-space: expected a string argument",
                    ))
                }
                EvaluationResult::Indeterminate(s) => EvaluationResult::Indeterminate(s),
            }
        })
    }
}

struct NormalizeToLowerCase;

impl Function for NormalizeToLowerCase {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:1.0:function:string-normalize-to-lower-case"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            match args[0].evaluate(ctx).await {
                EvaluationResult::Value(ExprValue::Single(Value::String(s))) => {
                    EvaluationResult::Value(ExprValue::Single(Value::String(s.to_lowercase())))
                }
                EvaluationResult::Value(_) => {
                    EvaluationResult::Indeterminate(processing_error(
                        "string-normalize-to-lower-case: expected a string argument",
                    ))
                }
                EvaluationResult::Indeterminate(s) => EvaluationResult::Indeterminate(s),
            }
        })
    }
}

#[derive(Clone, Copy)]
enum Probe {
    StartsWith,
    EndsWith,
    Contains,
}

struct ProbeFunction {
    id: &'static str,
    probe: Probe,
}

impl Function for ProbeFunction {
    fn id(&self) -> &'static str {
        self.id
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let values = match eval_all(args, ctx).await {
                EvaluationResult::Value(v) => v,
                EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
            };
            let Some(parts) = strings(&values) else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: expected two string arguments",
                    self.id
                )));
            };
            let [needle, haystack] = [parts[0], parts[1]];
            let holds = match self.probe {
                Probe::StartsWith => haystack.starts_with(needle),
                Probe::EndsWith => haystack.ends_with(needle),
                Probe::Contains => haystack.contains(needle),
            };
            EvaluationResult::Value(ExprValue::Single(Value::Boolean(holds)))
        })
    }
}

struct Substring;

impl Function for Substring {
    fn id(&self) -> &'static str {
        "urn:oasis:names:tc:xacml:3.0:function:string-substring"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let values = match eval_all(args, ctx).await {
                EvaluationResult::Value(v) => v,
                EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
            };
            let (Some(Value::String(s)), Some(Value::Integer(begin)), Some(Value::Integer(end))) =
                (values[0].as_single(), values[1].as_single(), values[2].as_single())
            else {
                return EvaluationResult::Indeterminate(processing_error(
                    "string-substring: expected (string, integer, integer)",
                ));
            };
            let chars: Vec<char> = s.chars().collect();
            let Some(begin) = begin.to_usize() else {
                return EvaluationResult::Indeterminate(processing_error(
                    "string-substring: beginIndex out of range",
                ));
            };
            let end = if *end < num_bigint::BigInt::from(0) {
                chars.len()
            } else {
                match end.to_usize() {
                    Some(end) => end,
                    None => {
                        return EvaluationResult::Indeterminate(processing_error(
                            "string-substring: endIndex out of range",
                        ))
                    }
                }
            };
            if begin > chars.len() || end > chars.len() || begin > end {
                return EvaluationResult::Indeterminate(processing_error(
                    "string-substring: index out of range",
                ));
            }
            EvaluationResult::Value(ExprValue::Single(Value::String(chars[begin..end].iter().collect())))
        })
    }
}

pub(super) fn register(all: &mut Vec<Arc<dyn Function>>) {
    all.push(Arc::new(Concatenate));
    all.push(Arc::new(NormalizeSpace));
    all.push(Arc::new(NormalizeToLowerCase));
    all.push(Arc::new(ProbeFunction {
        id: "urn:oasis:names:tc:xacml:3.0:function:string-starts-with",
        probe: Probe::StartsWith,
    }));
    all.push(Arc::new(ProbeFunction {
        id: "urn:oasis:names:tc:xacml:3.0:function:string-ends-with",
        probe: Probe::EndsWith,
    }));
    all.push(Arc::new(ProbeFunction {
        id: "urn:oasis:names:tc:xacml:3.0:function:string-contains",
        probe: Probe::Contains,
    }));
    all.push(Arc::new(Substring));
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
    async fn concatenate_joins_in_order() {
        let f = resolve_function("urn:oasis:names:tc:xacml:2.0:function:string-concatenate").unwrap();
        let args = [
            Expr::AttributeValue(Value::String("foo".into())),
            Expr::AttributeValue(Value::String("bar".into())),
        ];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let result = f.call(&args, &ctx).await;
        assert_eq!(result, EvaluationResult::Value(ExprValue::Single(Value::String("foobar".into()))));
    }

    #[tokio::test]
    async fn substring_to_end_with_negative_end_index() {
        let f = resolve_function("urn:oasis:names:tc:xacml:3.0:function:string-substring").unwrap();
        let args = [
            Expr::AttributeValue(Value::String("policy-decision-point".into())),
            Expr::AttributeValue(Value::Integer(7.into())),
            Expr::AttributeValue(Value::Integer((-1).into())),
        ];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let result = f.call(&args, &ctx).await;
        assert_eq!(result, EvaluationResult::Value(ExprValue::Single(Value::String("decision-point".into()))));
    }
}
