//! I define [`Rule`] — the leaf decision-making element of a Policy (spec
//! §4.4/§4.5): a target, an optional condition, and a declared effect.

use xacml_value::{EvaluationResult, Status, Value};
use xacml_expr::{EvalContext, Expr, ExprValue};

use crate::{
    decision::{Decision, Effect},
    obligation::{AdviceExpression, ObligationExpression},
    target::{MatchResult, Target},
};

/// A `<Rule>`.
pub struct Rule {
    /// The rule's id, echoed in `ReturnPolicyIdList` responses.
    pub rule_id: String,
    /// The effect this rule produces when it matches and its condition (if
    /// any) evaluates `true`.
    pub effect: Effect,
    /// The rule's target. `None` means "inherit the enclosing Policy's
    /// applicability" (an always-matching target for this rule's own
    /// evaluation — XACML rules without a `<Target>` always apply once
    /// their enclosing Policy's target has matched).
    pub target: Option<Target>,
    /// The rule's `<Condition>`, if any. Must evaluate to a boolean.
    pub condition: Option<Expr>,
    /// Obligations that fire when this rule decides the final decision.
    pub obligations: Vec<ObligationExpression>,
    /// Advice that fires when this rule decides the final decision.
    pub advice: Vec<AdviceExpression>,
}

impl Rule {
    /// Evaluate this rule's target and condition against `ctx`, producing a
    /// [`Decision`] (spec §4.4: a rule with no target always applies; a
    /// `NoMatch` target yields `NotApplicable`; a condition that evaluates
    /// `false` also yields `NotApplicable`; `Indeterminate` anywhere yields
    /// the matching `Indeterminate{D,P}` flavour for this rule's effect).
    pub async fn evaluate(&self, ctx: &EvalContext<'_>) -> Decision {
        if let Some(target) = &self.target {
            match target.evaluate(ctx).await {
                MatchResult::NoMatch => return Decision::NotApplicable,
                MatchResult::Indeterminate(s) => return Decision::indeterminate_for(self.effect, s),
                MatchResult::Match => {}
            }
        }

        let Some(condition) = &self.condition else {
            return effect_decision(self.effect);
        };

        match condition.evaluate(ctx).await {
            EvaluationResult::Value(ExprValue::Single(Value::Boolean(true))) => effect_decision(self.effect),
            EvaluationResult::Value(ExprValue::Single(Value::Boolean(false))) => Decision::NotApplicable,
            EvaluationResult::Value(_) => {
                Decision::indeterminate_for(self.effect, Status::processing_error("Condition: expected a boolean"))
            }
            EvaluationResult::Indeterminate(s) => Decision::indeterminate_for(self.effect, s),
        }
    }
}

fn effect_decision(effect: Effect) -> Decision {
    match effect {
        Effect::Permit => Decision::Permit,
        Effect::Deny => Decision::Deny,
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;
    use xacml_context::RequestContextBuilder;
    use xacml_expr::variables::VariableScope;

    use super::*;

    fn ctx_for<'a>(request: &'a xacml_context::RequestContext, variables: &'a VariableScope) -> EvalContext<'a> {
        EvalContext {
            request,
            default_tz: FixedOffset::east_opt(0).unwrap(),
            variables,
        }
    }

    #[tokio::test]
    async fn rule_without_target_or_condition_always_applies() {
        let rule = Rule {
            rule_id: "r1".into(),
            effect: Effect::Permit,
            target: None,
            condition: None,
            obligations: vec![],
            advice: vec![],
        };
        let request = RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        assert_eq!(rule.evaluate(&ctx).await, Decision::Permit);
    }

    #[tokio::test]
    async fn false_condition_is_not_applicable() {
        let rule = Rule {
            rule_id: "r2".into(),
            effect: Effect::Deny,
            target: None,
            condition: Some(Expr::AttributeValue(Value::Boolean(false))),
            obligations: vec![],
            advice: vec![],
        };
        let request = RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        assert_eq!(rule.evaluate(&ctx).await, Decision::NotApplicable);
    }

    #[tokio::test]
    async fn indeterminate_condition_yields_matching_flavour() {
        let rule = Rule {
            rule_id: "r3".into(),
            effect: Effect::Deny,
            target: None,
            condition: Some(Expr::AttributeDesignator {
                category: "urn:example:subject".into(),
                id: "urn:example:missing".into(),
                data_type: xacml_value::DataType::Boolean,
                issuer: None,
                must_be_present: true,
            }),
            obligations: vec![],
            advice: vec![],
        };
        let request = RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        assert!(matches!(rule.evaluate(&ctx).await, Decision::IndeterminateD(_)));
    }
}
