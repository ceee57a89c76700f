//! Group 5 — bag and set functions (spec §4.3.5): `{type}-bag`,
//! `{type}-bag-size`, `{type}-is-in`, `{type}-one-and-only`, and the set
//! functions `{type}-intersection`, `{type}-union`, `{type}-subset`,
//! `{type}-set-equals`, `{type}-at-least-one-member-of`.
//!

use std::sync::Arc;

use xacml_value::{Bag, DataType, EvaluationResult, Value};

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

fn typed(v: &Value, expected: DataType) -> bool {
    v.data_type() == expected
}

fn typed_bag(ev: ExprValue, expected: DataType) -> Option<Bag> {
    let bag = ev.into_bag();
    bag.iter().all(|v| typed(v, expected)).then_some(bag)
}

struct BagConstructFunction {
    id: &'static str,
    data_type: DataType,
}

impl Function for BagConstructFunction {
    fn id(&self) -> &'static str {
        self.id
    }

    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let values = match eval_all(args, ctx).await {
                EvaluationResult::Value(v) => v,
                EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
            };
            let mut out = Vec::with_capacity(values.len());
            for ev in values {
                match ev.as_single() {
                    Some(v) if typed(v, self.data_type) => out.push(v.clone()),
                    _ => {
                        return EvaluationResult::Indeterminate(processing_error(format!(
                            "{}: expected {} arguments",
                            self.id,
                            short_name(self.data_type)
                        )))
                    }
                }
            }
            EvaluationResult::Value(ExprValue::Bag(Bag::from_values(out)))
        })
    }
}

struct OneAndOnlyFunction {
    id: &'static str,
    data_type: DataType,
}

impl Function for OneAndOnlyFunction {
    fn id(&self) -> &'static str {
        self.id
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let ev = match args[0].evaluate(ctx).await {
                EvaluationResult::Value(v) => v,
                EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
            };
            let Some(bag) = typed_bag(ev, self.data_type) else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: expected a bag of {} values",
                    self.id,
                    short_name(self.data_type)
                )));
            };
            match bag.one_and_only() {
                Ok(v) => EvaluationResult::Value(ExprValue::Single(v.clone())),
                Err(e) => EvaluationResult::Indeterminate(processing_error(format!("{}: {e}", self.id))),
            }
        })
    }
}

struct BagSizeFunction {
    id: &'static str,
    data_type: DataType,
}

impl Function for BagSizeFunction {
    fn id(&self) -> &'static str {
        self.id
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn call<'a>(&'a self, args: &'a [Expr], ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            let ev = match args[0].evaluate(ctx).await {
                EvaluationResult::Value(v) => v,
                EvaluationResult::Indeterminate(s) => return EvaluationResult::Indeterminate(s),
            };
            let Some(bag) = typed_bag(ev, self.data_type) else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: expected a bag of {} values",
                    self.id,
                    short_name(self.data_type)
                )));
            };
            EvaluationResult::Value(ExprValue::Single(Value::Integer(bag.size().into())))
        })
    }
}

struct IsInFunction {
    id: &'static str,
    data_type: DataType,
}

impl Function for IsInFunction {
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
            let (Some(needle), Some(haystack)) = (it.next(), it.next()) else {
                unreachable!("arity checked at load time")
            };
            let Some(needle) = needle.as_single().filter(|v| typed(v, self.data_type)).cloned() else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: expected a {} value",
                    self.id,
                    short_name(self.data_type)
                )));
            };
            let Some(bag) = typed_bag(haystack, self.data_type) else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: expected a bag of {} values",
                    self.id,
                    short_name(self.data_type)
                )));
            };
            EvaluationResult::Value(ExprValue::Single(Value::Boolean(bag.contains(&needle, ctx.default_tz))))
        })
    }
}

#[derive(Clone, Copy)]
enum SetOp {
    Intersection,
    Union,
    Subset,
    SetEquals,
    AtLeastOneMemberOf,
}

impl SetOp {
    const ALL: [(Self, &'static str); 5] = [
        (Self::Intersection, "intersection"),
        (Self::Union, "union"),
        (Self::Subset, "subset"),
        (Self::SetEquals, "set-equals"),
        (Self::AtLeastOneMemberOf, "at-least-one-member-of"),
    ];
}

struct SetFunction {
    id: &'static str,
    data_type: DataType,
    op: SetOp,
}

impl Function for SetFunction {
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
            let (Some(a), Some(b)) = (typed_bag(a, self.data_type), typed_bag(b, self.data_type)) else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: expected two bags of {} values",
                    self.id,
                    short_name(self.data_type)
                )));
            };
            let tz = ctx.default_tz;
            EvaluationResult::Value(match self.op {
                SetOp::Intersection => ExprValue::Bag(a.intersection(&b, tz)),
                SetOp::Union => ExprValue::Bag(a.union(&b, tz)),
                SetOp::Subset => ExprValue::Single(Value::Boolean(a.is_subset_of(&b, tz))),
                SetOp::SetEquals => ExprValue::Single(Value::Boolean(a.set_equals(&b, tz))),
                SetOp::AtLeastOneMemberOf => {
                    ExprValue::Single(Value::Boolean(!a.intersection(&b, tz).is_empty()))
                }
            })
        })
    }
}

fn leak_id(dt: DataType, suffix: &str) -> &'static str {
    Box::leak(
        format!("urn:oasis:names:tc:xacml:1.0:function:{}-{suffix}", short_name(dt)).into_boxed_str(),
    )
}

pub(super) fn register(all: &mut Vec<Arc<dyn Function>>) {
    for dt in ALL_TYPES {
        all.push(Arc::new(BagConstructFunction { id: leak_id(dt, "bag"), data_type: dt }));
        all.push(Arc::new(OneAndOnlyFunction { id: leak_id(dt, "one-and-only"), data_type: dt }));
        all.push(Arc::new(BagSizeFunction { id: leak_id(dt, "bag-size"), data_type: dt }));
        all.push(Arc::new(IsInFunction { id: leak_id(dt, "is-in"), data_type: dt }));
        for (op, suffix) in SetOp::ALL {
            all.push(Arc::new(SetFunction { id: leak_id(dt, suffix), data_type: dt, op }));
        }
    }
}
