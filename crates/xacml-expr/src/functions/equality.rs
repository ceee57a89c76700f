//! Group 1 — `{type}-equal` for every primitive data type (spec §4.3.1).
//!

use std::sync::Arc;

use xacml_value::{DataType, EvaluationResult, Value};

use super::{eval_all, processing_error, short_name, Arity, Function, FunctionFuture};
use crate::{ctx::EvalContext, expr::Expr, value::ExprValue};

const ALL_TYPES: [DataType; 14] = [
    DataType::String,
    DataType::Boolean,
    DataType::Integer,
    DataType::Double,
    DataType::DateTime,
    DataType::Date,
    DataType::Time,
    DataType::DayTimeDuration,
    DataType::YearMonthDuration,
    DataType::AnyUri,
    DataType::HexBinary,
    DataType::Base64Binary,
    DataType::Rfc822Name,
    DataType::X500Name,
];

struct EqualFunction {
    id: &'static str,
    data_type: DataType,
}

impl Function for EqualFunction {
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
            let [a, b] = take_two(values);
            let (Some(a), Some(b)) = (single(&a, self.data_type), single(&b, self.data_type)) else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: expected two {} values",
                    self.id, short_name(self.data_type)
                )));
            };
            EvaluationResult::Value(ExprValue::Single(Value::Boolean(
                a.semantic_eq(b, ctx.default_tz),
            )))
        })
    }
}

fn take_two(mut values: Vec<ExprValue>) -> [ExprValue; 2] {
    let b = values.pop().expect("arity checked at load time");
    let a = values.pop().expect("arity checked at load time");
    [a, b]
}

fn single(v: &ExprValue, expected: DataType) -> Option<&Value> {
    v.as_single().filter(|v| v.data_type() == expected)
}

/// Leak a function id built at static-init time into a `'static` string.
/// Runs once, for fourteen ids total, when the function [`super::REGISTRY`]
/// is first built — not a per-call or per-request leak.
fn leak_id(dt: DataType) -> &'static str {
    Box::leak(format!("urn:oasis:names:tc:xacml:1.0:function:{}-equal", short_name(dt)).into_boxed_str())
}

pub(super) fn register(all: &mut Vec<Arc<dyn Function>>) {
    for dt in ALL_TYPES {
        all.push(Arc::new(EqualFunction {
            id: leak_id(dt),
            data_type: dt,
        }));
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;
    use crate::{functions::resolve_function, variables::VariableScope};

    #[tokio::test]
    async fn integer_equal_compares_values() {
        let f = resolve_function("urn:oasis:names:tc:xacml:1.0:function:integer-equal").unwrap();
        let args = [
            Expr::AttributeValue(Value::Integer(1.into())),
            Expr::AttributeValue(Value::Integer(1.into())),
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

    #[rstest::rstest]
    #[case("urn:oasis:names:tc:xacml:1.0:function:string-equal", Value::String("a".into()), Value::String("a".into()), true)]
    #[case("urn:oasis:names:tc:xacml:1.0:function:string-equal", Value::String("a".into()), Value::String("b".into()), false)]
    #[case("urn:oasis:names:tc:xacml:1.0:function:boolean-equal", Value::Boolean(true), Value::Boolean(true), true)]
    #[case("urn:oasis:names:tc:xacml:1.0:function:boolean-equal", Value::Boolean(true), Value::Boolean(false), false)]
    #[case("urn:oasis:names:tc:xacml:1.0:function:double-equal", Value::Double(1.5), Value::Double(1.5), true)]
    #[case("urn:oasis:names:tc:xacml:1.0:function:double-equal", Value::Double(1.5), Value::Double(2.5), false)]
    #[tokio::test]
    async fn equal_function_table(#[case] id: &str, #[case] a: Value, #[case] b: Value, #[case] expected: bool) {
        let f = resolve_function(id).unwrap();
        let args = [Expr::AttributeValue(a), Expr::AttributeValue(b)];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = EvalContext {
            request: &request,
            default_tz: FixedOffset::east_opt(0).unwrap(),
            variables: &variables,
        };
        let result = f.call(&args, &ctx).await;
        assert_eq!(result, EvaluationResult::Value(ExprValue::Single(Value::Boolean(expected))));
    }
}
