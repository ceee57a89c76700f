//! Group 2 — `{type}-greater-than[-or-equal]`/`{type}-less-than[-or-equal]`
//! for numeric and temporal data types (spec §4.3.2). `dateTime` comparison
//! is on absolute instant, per `xacml_value::Value::compare`.
//!

use std::{cmp::Ordering, sync::Arc};

use xacml_value::{DataType, EvaluationResult, Value};

use super::{eval_all, processing_error, short_name, Arity, Function, FunctionFuture};
use crate::{ctx::EvalContext, expr::Expr, value::ExprValue};

const ORDERABLE_TYPES: [DataType; 5] = [
    DataType::Integer,
    DataType::Double,
    DataType::DateTime,
    DataType::Date,
    DataType::Time,
];

#[derive(Clone, Copy)]
enum Op {
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl Op {
    const ALL: [(Self, &'static str); 4] = [
        (Self::GreaterThan, "greater-than"),
        (Self::LessThan, "less-than"),
        (Self::GreaterThanOrEqual, "greater-than-or-equal"),
        (Self::LessThanOrEqual, "less-than-or-equal"),
    ];

    fn holds(self, ord: Ordering) -> bool {
        match self {
            Self::GreaterThan => ord == Ordering::Greater,
            Self::LessThan => ord == Ordering::Less,
            Self::GreaterThanOrEqual => ord != Ordering::Less,
            Self::LessThanOrEqual => ord != Ordering::Greater,
        }
    }
}

struct CompareFunction {
    id: &'static str,
    data_type: DataType,
    op: Op,
}

impl Function for CompareFunction {
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
            let mut it = values.into_iter();
            let (Some(a), Some(b)) = (it.next(), it.next()) else {
                unreachable!("arity checked at load time")
            };
            let (Some(a), Some(b)) = (typed(&a, self.data_type), typed(&b, self.data_type)) else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: expected two {} values",
                    self.id, short_name(self.data_type)
                )));
            };
            match a.compare(b, ctx.default_tz) {
                Some(ord) => EvaluationResult::Value(ExprValue::Single(Value::Boolean(self.op.holds(ord)))),
                None => EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: values are not comparable (NaN or mismatched type)",
                    self.id
                ))),
            }
        })
    }
}

fn typed(v: &ExprValue, expected: DataType) -> Option<&Value> {
    v.as_single().filter(|v| v.data_type() == expected)
}

fn leak_id(dt: DataType, suffix: &str) -> &'static str {
    Box::leak(
        format!("urn:oasis:names:tc:xacml:1.0:function:{}-{suffix}", short_name(dt)).into_boxed_str(),
    )
}

pub(super) fn register(all: &mut Vec<Arc<dyn Function>>) {
    for dt in ORDERABLE_TYPES {
        for (op, suffix) in Op::ALL {
            all.push(Arc::new(CompareFunction {
                id: leak_id(dt, suffix),
                data_type: dt,
                op,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;
    use crate::{functions::resolve_function, variables::VariableScope};

    #[tokio::test]
    async fn integer_greater_than() {
        let f = resolve_function("urn:oasis:names:tc:xacml:1.0:function:integer-greater-than").unwrap();
        let args = [
            Expr::AttributeValue(Value::Integer(5.into())),
            Expr::AttributeValue(Value::Integer(3.into())),
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
    async fn nan_comparison_is_processing_error() {
        let f = resolve_function("urn:oasis:names:tc:xacml:1.0:function:double-less-than").unwrap();
        let args = [
            Expr::AttributeValue(Value::Double(f64::NAN)),
            Expr::AttributeValue(Value::Double(1.0)),
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

    #[rstest::rstest]
    #[case("integer-greater-than", 5, 3, true)]
    #[case("integer-greater-than", 3, 5, false)]
    #[case("integer-less-than", 3, 5, true)]
    #[case("integer-greater-than-or-equal", 5, 5, true)]
    #[case("integer-less-than-or-equal", 5, 5, true)]
    #[case("integer-less-than-or-equal", 6, 5, false)]
    #[tokio::test]
    async fn integer_comparison_table(#[case] suffix: &str, #[case] a: i64, #[case] b: i64, #[case] expected: bool) {
        let id = format!("urn:oasis:names:tc:xacml:1.0:function:{suffix}");
        let f = resolve_function(&id).unwrap();
        let args = [Expr::AttributeValue(Value::Integer(a.into())), Expr::AttributeValue(Value::Integer(b.into()))];
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
