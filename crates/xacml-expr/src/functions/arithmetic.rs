//! Group 3 — arithmetic on `integer`/`double` (spec §4.3.3).
//!

use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::Zero;
use xacml_value::{EvaluationResult, Value};

use super::{eval_all, processing_error, Arity, Function, FunctionFuture};
use crate::{ctx::EvalContext, expr::Expr, value::ExprValue};

macro_rules! integer_fn {
    ($name:ident, $id:literal, $arity:expr, |$args:ident| $body:block) => {
        struct $name;
        impl Function for $name {
            fn id(&self) -> &'static str {
                $id
            }
            fn arity(&self) -> Arity {
                $arity
            }
            fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
                Box::pin(async move {
                    let values = match eval_all(args, ctx).await {
                        EvaluationResult::Value(v) => v,
                        EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
                    };
                    let Some($args) = integers(&values) else {
                        return EvaluationResult::Indeterminate(processing_error(concat!(
                            $id,
                            ": expected integer arguments"
                        )));
                    };
                    $body
                })
            }
        }
    };
}

fn integers(values: &[ExprValue]) -> Option<Vec<BigInt>> {
    values
        .iter()
        .map(|v| match v.as_single() {
            Some(Value::Integer(i)) => Some(i.clone()),
            _ => None,
        })
        .collect()
}

fn doubles(values: &[ExprValue]) -> Option<Vec<f64>> {
    values
        .iter()
        .map(|v| match v.as_single() {
            Some(Value::Double(d)) => Some(*d),
            _ => None,
        })
        .collect()
}

integer_fn!(IntegerAdd, "urn:oasis:names:tc:xacml:1.0:function:integer-add", Arity::AtLeast(2), |args| {
    EvaluationResult::Value(ExprValue::Single(Value::Integer(args.into_iter().sum())))
});

integer_fn!(
    IntegerMultiply,
    "urn:oasis:names:tc:xacml:1.0:function:integer-multiply",
    Arity::AtLeast(2),
    |args| {
        let product = args.into_iter().fold(BigInt::from(1), |acc, v| acc * v);
        EvaluationResult::Value(ExprValue::Single(Value::Integer(product)))
    }
);

integer_fn!(
    IntegerSubtract,
    "urn:oasis:names:tc:xacml:1.0:function:integer-subtract",
    Arity::Exact(2),
    |args| {
        EvaluationResult::Value(ExprValue::Single(Value::Integer(args[0].clone() - args[1].clone())))
    }
);

integer_fn!(
    IntegerDivide,
    "urn:oasis:names:tc:xacml:1.0:function:integer-divide",
    Arity::Exact(2),
    |args| {
        if args[1].is_zero() {
            EvaluationResult::Indeterminate(processing_error("integer-divide: division by zero"))
        } else {
            EvaluationResult::Value(ExprValue::Single(Value::Integer(args[0].clone() / args[1].clone())))
        }
    }
);

integer_fn!(IntegerMod, "urn:oasis:names:tc:xacml:1.0:function:integer-mod", Arity::Exact(2), |args| {
    if args[1].is_zero() {
        EvaluationResult::Indeterminate(processing_error("integer-mod: division by zero"))
    } else {
        EvaluationResult::Value(ExprValue::Single(Value::Integer(args[0].clone() % args[1].clone())))
    }
});

integer_fn!(IntegerAbs, "urn:oasis:names:tc:xacml:1.0:function:integer-abs", Arity::Exact(1), |args| {
    EvaluationResult::Value(ExprValue::Single(Value::Integer(args[0].clone().abs())))
});

macro_rules! double_fn {
    ($name:ident, $id:literal, $arity:expr, |$args:ident| $body:block) => {
        struct $name;
        impl Function for $name {
            fn id(&self) -> &'static str {
                $id
            }
            fn arity(&self) -> Arity {
                $arity
            }
            fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
                Box::pin(async move {
                    let values = match eval_all(args, ctx).await {
                        EvaluationResult::Value(v) => v,
                        EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
                    };
                    let Some($args) = doubles(&values) else {
                        return EvaluationResult::Indeterminate(processing_error(concat!(
                            $id,
                            ": expected double arguments"
                        )));
                    };
                    $body
                })
            }
        }
    };
}

double_fn!(DoubleAdd, "urn:oasis:names:tc:xacml:1.0:function:double-add", Arity::AtLeast(2), |args| {
    EvaluationResult::Value(ExprValue::Single(Value::Double(args.into_iter().sum())))
});

double_fn!(
    DoubleMultiply,
    "urn:oasis:names:tc:xacml:1.0:function:double-multiply",
    Arity::AtLeast(2),
    |args| {
        EvaluationResult::Value(ExprValue::Single(Value::Double(args.into_iter().product())))
    }
);

double_fn!(
    DoubleSubtract,
    "urn:oasis:names:tc:xacml:1.0:function:double-subtract",
    Arity::Exact(2),
    |args| { EvaluationResult::Value(ExprValue::Single(Value::Double(args[0] - args[1]))) }
);

double_fn!(
    DoubleDivide,
    "urn:oasis:names:tc:xacml:1.0:function:double-divide",
    Arity::Exact(2),
    |args| {
        if args[1] == 0.0 {
            EvaluationResult::Indeterminate(processing_error("double-divide: division by zero"))
        } else {
            EvaluationResult::Value(ExprValue::Single(Value::Double(args[0] / args[1])))
        }
    }
);

double_fn!(DoubleAbs, "urn:oasis:names:tc:xacml:1.0:function:double-abs", Arity::Exact(1), |args| {
    EvaluationResult::Value(ExprValue::Single(Value::Double(args[0].abs())))
});

pub(super) fn register(all: &mut Vec<Arc<dyn Function>>) {
    all.push(Arc::new(IntegerAdd));
    all.push(Arc::new(IntegerMultiply));
    all.push(Arc::new(IntegerSubtract));
    all.push(Arc::new(IntegerDivide));
    all.push(Arc::new(IntegerMod));
    all.push(Arc::new(IntegerAbs));
    all.push(Arc::new(DoubleAdd));
    all.push(Arc::new(DoubleMultiply));
    all.push(Arc::new(DoubleSubtract));
    all.push(Arc::new(DoubleDivide));
    all.push(Arc::new(DoubleAbs));
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;
    use crate::{functions::resolve_function, variables::VariableScope};

    async fn run(id: &str, vals: Vec<Value>) -> EvaluationResult<ExprValue> {
        let f = resolve_function(id).unwrap();
        let args: Vec<Expr> = vals.into_iter().map(Expr::AttributeValue).collect();
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = EvalContext {
            request: &request,
            default_tz: FixedOffset::east_opt(0).unwrap(),
            variables: &variables,
        };
        f.call(&args, &ctx).await
    }

    #[tokio::test]
    async fn integer_add_sums_all_args() {
        let result = run(
            "urn:oasis:names:tc:xacml:1.0:function:integer-add",
            vec![Value::Integer(1.into()), Value::Integer(2.into()), Value::Integer(3.into())],
        )
        .await;
        assert_eq!(result, EvaluationResult::Value(ExprValue::Single(Value::Integer(6.into()))));
    }

    #[tokio::test]
    async fn integer_divide_by_zero_is_processing_error() {
        let result = run(
            "urn:oasis:names:tc:xacml:1.0:function:integer-divide",
            vec![Value::Integer(1.into()), Value::Integer(0.into())],
        )
        .await;
        assert!(result.is_indeterminate());
    }
}
