//! I define [`ObligationExpression`], [`AdviceExpression`] and their shared
//! `AttributeAssignmentExpression` machinery (spec §4.5): obligations/advice
//! are gathered from whichever Rule/Policy/PolicySet children matched the
//! final combined decision and must never be silently dropped on a failure
//! (fail-closed: an indeterminate assignment promotes the enclosing
//! element's decision instead).

use xacml_value::{EvaluationResult, Status, Value};
use xacml_expr::{EvalContext, Expr};

use crate::decision::Effect;

/// One `<AttributeAssignmentExpression>`: an id plus the expression whose
/// evaluated value(s) become the assignment's content.
pub struct AttributeAssignmentExpression {
    /// The assignment's attribute id.
    pub attribute_id: String,
    /// Expression to evaluate for this assignment's value(s).
    pub expression: Expr,
    /// Optional category carried through to the Response, if present.
    pub category: Option<String>,
}

/// A resolved, evaluated attribute assignment ready to attach to a Response.
#[derive(Debug, Clone)]
pub struct ResolvedAssignment {
    /// The assignment's attribute id.
    pub attribute_id: String,
    /// Category, if the expression carried one.
    pub category: Option<String>,
    /// The values the assignment's expression evaluated to.
    pub values: Vec<Value>,
}

/// A `<ObligationExpression>` or `<AdviceExpression>`: fires when the
/// enclosing element's final decision matches `fulfill_on`.
pub struct ObligationExpression {
    /// The obligation's id.
    pub obligation_id: String,
    /// The decision effect this obligation applies to.
    pub fulfill_on: Effect,
    /// This obligation's attribute assignments.
    pub assignments: Vec<AttributeAssignmentExpression>,
}

/// A `<AdviceExpression>`: identical shape to [`ObligationExpression`], kept
/// as a distinct type since Response assembly (C6/C7) places the two in
/// separate XML elements.
pub struct AdviceExpression {
    /// The advice's id.
    pub advice_id: String,
    /// The decision effect this advice applies to.
    pub applies_to: Effect,
    /// This advice's attribute assignments.
    pub assignments: Vec<AttributeAssignmentExpression>,
}

/// A resolved obligation, ready to attach to a Response.
#[derive(Debug, Clone)]
pub struct ResolvedObligation {
    /// The obligation's id.
    pub obligation_id: String,
    /// Its evaluated assignments.
    pub assignments: Vec<ResolvedAssignment>,
}

/// A resolved piece of advice, ready to attach to a Response.
#[derive(Debug, Clone)]
pub struct ResolvedAdvice {
    /// The advice's id.
    pub advice_id: String,
    /// Its evaluated assignments.
    pub assignments: Vec<ResolvedAssignment>,
}

async fn evaluate_assignments(
    assignments: &[AttributeAssignmentExpression],
    ctx: &EvalContext<'_>,
) -> Result<Vec<ResolvedAssignment>, Status> {
    let mut resolved = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        match assignment.expression.evaluate(ctx).await {
            EvaluationResult::Value(v) => resolved.push(ResolvedAssignment {
                attribute_id: assignment.attribute_id.clone(),
                category: assignment.category.clone(),
                values: match v {
                    xacml_expr::ExprValue::Single(value) => vec![value],
                    xacml_expr::ExprValue::Bag(bag) => bag.into_values(),
                },
            }),
            EvaluationResult::Indeterminate(s) => return Err(s),
        }
    }
    Ok(resolved)
}

impl ObligationExpression {
    /// Evaluate this obligation's assignments if `decision_effect` matches
    /// `fulfill_on`, else `Ok(None)`. An evaluation failure is returned as
    /// `Err` so the caller can promote the enclosing decision rather than
    /// drop the obligation (spec §4.5: fail-closed).
    pub async fn evaluate_if_applicable(
        &self,
        decision_effect: Effect,
        ctx: &EvalContext<'_>,
    ) -> Result<Option<ResolvedObligation>, Status> {
        if self.fulfill_on != decision_effect {
            return Ok(None);
        }
        let assignments = evaluate_assignments(&self.assignments, ctx).await?;
        Ok(Some(ResolvedObligation { obligation_id: self.obligation_id.clone(), assignments }))
    }
}

impl AdviceExpression {
    /// Evaluate this advice's assignments if `decision_effect` matches
    /// `applies_to`, else `Ok(None)`. See
    /// [`ObligationExpression::evaluate_if_applicable`] for failure handling.
    pub async fn evaluate_if_applicable(
        &self,
        decision_effect: Effect,
        ctx: &EvalContext<'_>,
    ) -> Result<Option<ResolvedAdvice>, Status> {
        if self.applies_to != decision_effect {
            return Ok(None);
        }
        let assignments = evaluate_assignments(&self.assignments, ctx).await?;
        Ok(Some(ResolvedAdvice { advice_id: self.advice_id.clone(), assignments }))
    }
}
