//! Group 9 — `dateTime`/`date` arithmetic with durations (spec §4.3.9):
//! `dateTime-add-dayTimeDuration`, `dateTime-subtract-dayTimeDuration`,
//! `dateTime-add-yearMonthDuration`, `dateTime-subtract-yearMonthDuration`,
//! `date-add-yearMonthDuration`, `date-subtract-yearMonthDuration`.
//!

use std::sync::Arc;

use xacml_value::{
    types::datetime::{XacmlDate, XacmlDateTime},
    EvaluationResult, Value,
};

use super::{eval_all, processing_error, Arity, Function, FunctionFuture};
use crate::{ctx::EvalContext, expr::Expr, value::ExprValue};

#[derive(Clone, Copy)]
enum Sign {
    Add,
    Subtract,
}

impl Sign {
    fn apply(self, magnitude: i64) -> i64 {
        match self {
            Self::Add => magnitude,
            Self::Subtract => -magnitude,
        }
    }
}

struct DateTimeDayTimeDuration {
    id: &'static str,
    sign: Sign,
}

impl Function for DateTimeDayTimeDuration {
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
            let (Some(Value::DateTime(dt)), Some(Value::DayTimeDuration(d))) =
                (values[0].as_single(), values[1].as_single())
            else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: expected (dateTime, dayTimeDuration)",
                    self.id
                )));
            };
            let shifted: XacmlDateTime = dt.add_day_time_seconds(self.sign.apply(d.seconds));
            EvaluationResult::Value(ExprValue::Single(Value::DateTime(shifted)))
        })
    }
}

struct DateTimeYearMonthDuration {
    id: &'static str,
    sign: Sign,
}

impl Function for DateTimeYearMonthDuration {
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
            let (Some(Value::DateTime(dt)), Some(Value::YearMonthDuration(d))) =
                (values[0].as_single(), values[1].as_single())
            else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: expected (dateTime, yearMonthDuration)",
                    self.id
                )));
            };
            let shifted = dt.add_months(self.sign.apply(d.months as i64) as i32);
            EvaluationResult::Value(ExprValue::Single(Value::DateTime(shifted)))
        })
    }
}

struct DateYearMonthDuration {
    id: &'static str,
    sign: Sign,
}

impl Function for DateYearMonthDuration {
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
            let (Some(Value::Date(d)), Some(Value::YearMonthDuration(dur))) =
                (values[0].as_single(), values[1].as_single())
            else {
                return EvaluationResult::Indeterminate(processing_error(format!(
                    "{}: expected (date, yearMonthDuration)",
                    self.id
                )));
            };
            let anchor = XacmlDateTime(d.at_midnight(d.tz.unwrap_or_else(|| {
                chrono::FixedOffset::east_opt(0).expect("zero offset is always valid")
            })));
            let shifted = anchor.add_months(self.sign.apply(dur.months as i64) as i32);
            EvaluationResult::Value(ExprValue::Single(Value::Date(XacmlDate {
                date: shifted.0.date_naive(),
                tz: d.tz,
            })))
        })
    }
}

pub(super) fn register(all: &mut Vec<Arc<dyn Function>>) {
    all.push(Arc::new(DateTimeDayTimeDuration {
        id: "urn:oasis:names:tc:xacml:3.0:function:dateTime-add-dayTimeDuration",
        sign: Sign::Add,
    }));
    all.push(Arc::new(DateTimeDayTimeDuration {
        id: "urn:oasis:names:tc:xacml:3.0:function:dateTime-subtract-dayTimeDuration",
        sign: Sign::Subtract,
    }));
    all.push(Arc::new(DateTimeYearMonthDuration {
        id: "urn:oasis:names:tc:xacml:3.0:function:dateTime-add-yearMonthDuration",
        sign: Sign::Add,
    }));
    all.push(Arc::new(DateTimeYearMonthDuration {
        id: "urn:oasis:names:tc:xacml:3.0:function:dateTime-subtract-yearMonthDuration",
        sign: Sign::Subtract,
    }));
    all.push(Arc::new(DateYearMonthDuration {
        id: "urn:oasis:names:tc:xacml:3.0:function:date-add-yearMonthDuration",
        sign: Sign::Add,
    }));
    all.push(Arc::new(DateYearMonthDuration {
        id: "urn:oasis:names:tc:xacml:3.0:function:date-subtract-yearMonthDuration",
        sign: Sign::Subtract,
    }));
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;
    use xacml_value::types::datetime::XacmlDateTime;

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
    async fn adds_a_day_time_duration() {
        let f = resolve_function("urn:oasis:names:tc:xacml:3.0:function:dateTime-add-dayTimeDuration").unwrap();
        let args = [
            Expr::AttributeValue(Value::DateTime(XacmlDateTime::parse("2026-01-01T00:00:00Z").unwrap())),
            Expr::AttributeValue(Value::DayTimeDuration(
                xacml_value::types::duration::DayTimeDuration { seconds: 3600 },
            )),
        ];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let EvaluationResult::Value(ExprValue::Single(Value::DateTime(result))) = f.call(&args, &ctx).await else {
            panic!("expected a dateTime result")
        };
        assert_eq!(result.to_canonical_string(), "2026-01-01T01:00:00Z");
    }

    #[tokio::test]
    async fn subtracting_year_month_duration_clamps_day_of_month() {
        let f = resolve_function("urn:oasis:names:tc:xacml:3.0:function:dateTime-subtract-yearMonthDuration")
            .unwrap();
        let args = [
            Expr::AttributeValue(Value::DateTime(XacmlDateTime::parse("2026-03-31T00:00:00Z").unwrap())),
            Expr::AttributeValue(Value::YearMonthDuration(
                xacml_value::types::duration::YearMonthDuration { months: 1 },
            )),
        ];
        let request = xacml_context::RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let EvaluationResult::Value(ExprValue::Single(Value::DateTime(result))) = f.call(&args, &ctx).await else {
            panic!("expected a dateTime result")
        };
        assert_eq!(result.to_canonical_string(), "2026-02-28T00:00:00Z");
    }
}
