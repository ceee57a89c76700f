//! Group 8 — regular-expression matching (spec §4.3.8):
//! `{type}-regexp-match`, for the types a policy typically pattern-matches
//! against an attribute (`string`, `anyURI`, `rfc822Name`, `x500Name`).
//!

use std::sync::Arc;

use regex::Regex;
use xacml_value::{DataType, EvaluationResult, Value};

use super::{eval_all, processing_error, short_name, Arity, Function, FunctionFuture};
use crate::{ctx::EvalContext, expr::Expr, value::ExprValue};

const MATCHABLE_TYPES: [DataType; 4] =
    [DataType::String, DataType::AnyUri, DataType::Rfc822Name, DataType::X500Name];

fn canonical_of(v: &Value, expected: DataType) -> Option<String> {
    (v.data_type() == expected).then(|| v.to_canonical_string())
}

struct RegexpMatchFunction {
    id: &'static str,
    data_type: DataType,
}

impl Function for RegexpMatchFunction {
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
            let Some(Value::String(pattern)) = values[0].as_single() else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: the pattern argument must be a string",
                    self.id
                )));
            };
            let Some(subject) = values[1].as_single().and_then(|v| canonical_of(v, self.data_type)) else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: expected a {} value to match against",
                    self.id,
                    short_name(self.data_type)
                )));
            };
            match Regex::new(pattern) {
                Ok(re) => EvaluationResult::Value(ExprValue::Single(Value::Boolean(re.is_match(&subject)))),
                Err(err) => EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: invalid regular expression `{pattern}`: {err}",
                    self.id
                ))),
            }
        })
    }
}

fn leak_id(dt: DataType) -> &'static str {
    Box::leak(format!("urn:oasis:names:tc:xacml:1.0:function:{}-regexp-match", short_name(dt)).into_boxed_str())
}

pub(super) fn register(all: &mut Vec<Arc<dyn Function>>) {
    for dt in MATCHABLE_TYPES {
        all.push(Arc::new(RegexpMatchFunction { id: leak_id(dt), data_type: dt }));
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;
    use crate::{functions::resolve_function, variables::VariableScope};

    #[tokio::test]
    async fn string_regexp_match_matches_pattern() {
        let f = resolve_function("urn:oasis:names:tc:xacml:1.0:function:string-regexp-match").unwrap();
        let args = [
            Expr::AttributeValue(Value::String("^urn:example:.*$".into())),
            Expr::AttributeValue(Value::String("urn:example:resource".into())),
        ];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = EvalContext {
            request: &request,
            default_tz: FixedOffset::east_opt(0).unwrap(),
            variables: &variables,
        };
        let result = f.call(&args, &ctx).await;
        assert_eq!(result, EvaluationResult::Value(ExprValue::Single(Value::Boolean(true))));
    }

    #[tokio::test]
    async fn malformed_pattern_is_processing_error() {
        let f = resolve_function("urn:oasis:names:tc:xacml:1.0:function:string-regexp-match").unwrap();
        let args = [
            Expr::AttributeValue(Value::String("(".into())),
            Expr::AttributeValue(Value::String("anything".into())),
        ];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = EvalContext {
            request: &request,
            default_tz: FixedOffset::east_opt(0).unwrap(),
            variables: &variables,
        };
        assert!(f.call(&args, &ctx).await.is_indeterminate());
    }
}
