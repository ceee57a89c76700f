//! I define [`Policy`] — a `<Policy>`: a target, a rule-combining algorithm,
//! its `Rule`s, and obligation/advice expressions (spec §4.4/§4.5).

use std::{collections::HashMap, sync::Arc};

use xacml_expr::{variables::VariableScope, EvalContext, Expr};

use crate::{
    combining::Algorithm,
    decision::{Decision, Effect},
    obligation::{AdviceExpression, ObligationExpression, ResolvedAdvice, ResolvedObligation},
    rule::Rule,
    target::{MatchResult, Target},
};

/// The outcome of evaluating a `Policy`/`PolicySet`: its combined
/// [`Decision`] plus whichever obligations/advice applied to it (spec
/// §4.5's fail-closed obligation-gathering step).
pub struct PolicyEvaluation {
    /// The combined decision.
    pub decision: Decision,
    /// Obligations collected for this decision.
    pub obligations: Vec<ResolvedObligation>,
    /// Advice collected for this decision.
    pub advice: Vec<ResolvedAdvice>,
    /// Ids of the Policy/PolicySet/Rule elements on the winning path, for
    /// `ReturnPolicyIdList`.
    pub policy_identifiers: Vec<String>,
}

/// A `<Policy>`.
pub struct Policy {
    /// `PolicyId`.
    pub policy_id: String,
    /// The policy's target.
    pub target: Target,
    /// Algorithm combining this policy's rule decisions.
    pub rule_combining_algorithm: Algorithm,
    /// The policy's rules, in document order.
    pub rules: Vec<Rule>,
    /// This policy's `VariableDefinition`s, scoped to it alone — a
    /// `VariableReference` in a sibling Policy cannot see these (spec §4.3).
    pub variable_definitions: HashMap<String, Arc<Expr>>,
    /// Obligation expressions gathered after rule combination.
    pub obligations: Vec<ObligationExpression>,
    /// Advice expressions gathered after rule combination.
    pub advice: Vec<AdviceExpression>,
}

impl Policy {
    /// Evaluate: target match, then rule combination, then obligation/advice
    /// gathering (spec §4.4/§4.5). Builds its own, freshly-memoized
    /// [`VariableScope`] from this policy's `variable_definitions` — a
    /// `VariableDefinition`'s scope never crosses a Policy boundary.
    pub async fn evaluate(&self, ctx: &EvalContext<'_>) -> PolicyEvaluation {
        let variables = VariableScope::new(self.variable_definitions.clone());
        let ctx = &EvalContext { request: ctx.request, default_tz: ctx.default_tz, variables: &variables };
        match self.target.evaluate(ctx).await {
            MatchResult::NoMatch => {
                return PolicyEvaluation {
                    decision: Decision::NotApplicable,
                    obligations: vec![],
                    advice: vec![],
                    policy_identifiers: vec![],
                }
            }
            MatchResult::Indeterminate(s) => {
                // A Policy's own target failing to resolve could still have
                // gone either way; without rule-level detail to narrow it,
                // treat conservatively as DP (spec §7: fail-closed).
                return PolicyEvaluation {
                    decision: Decision::IndeterminateDP(s),
                    obligations: vec![],
                    advice: vec![],
                    policy_identifiers: vec![self.policy_id.clone()],
                };
            }
            MatchResult::Match => {}
        }

        let mut rule_decisions = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            rule_decisions.push(rule.evaluate(ctx).await);
        }
        let decision = self.rule_combining_algorithm.combine(rule_decisions.clone());

        let mut policy_identifiers = vec![self.policy_id.clone()];
        if decision.is_definite() {
            let effect = match decision {
                Decision::Permit => Effect::Permit,
                Decision::Deny => Effect::Deny,
                _ => unreachable!("is_definite() guarantees Permit or Deny"),
            };
            return match self.gather_obligations_and_advice(effect, &rule_decisions, ctx).await {
                Ok((obligations, advice)) => PolicyEvaluation { decision, obligations, advice, policy_identifiers },
                Err(s) => PolicyEvaluation {
                    decision: Decision::indeterminate_for(effect, s),
                    obligations: vec![],
                    advice: vec![],
                    policy_identifiers,
                },
            };
        }

        if matches!(decision, Decision::NotApplicable) {
            policy_identifiers.clear();
        }
        PolicyEvaluation { decision, obligations: vec![], advice: vec![], policy_identifiers }
    }

    /// Collect obligations/advice whose effect matches `effect`: this
    /// policy's own, plus those of whichever rules individually decided
    /// `effect` too (spec §4.5 — a rule's obligations ride along only when
    /// that rule's own effect agrees with the policy's final decision).
    async fn gather_obligations_and_advice(
        &self,
        effect: Effect,
        rule_decisions: &[Decision],
        ctx: &EvalContext<'_>,
    ) -> Result<(Vec<ResolvedObligation>, Vec<ResolvedAdvice>), xacml_value::Status> {
        let mut obligations = Vec::new();
        let mut advice = Vec::new();

        for (rule, rule_decision) in self.rules.iter().zip(rule_decisions) {
            let rule_effect = match rule_decision {
                Decision::Permit => Some(Effect::Permit),
                Decision::Deny => Some(Effect::Deny),
                _ => None,
            };
            if rule_effect != Some(effect) {
                continue;
            }
            for expr in &rule.obligations {
                if let Some(resolved) = expr.evaluate_if_applicable(effect, ctx).await? {
                    obligations.push(resolved);
                }
            }
            for expr in &rule.advice {
                if let Some(resolved) = expr.evaluate_if_applicable(effect, ctx).await? {
                    advice.push(resolved);
                }
            }
        }

        for expr in &self.obligations {
            if let Some(resolved) = expr.evaluate_if_applicable(effect, ctx).await? {
                obligations.push(resolved);
            }
        }
        for expr in &self.advice {
            if let Some(resolved) = expr.evaluate_if_applicable(effect, ctx).await? {
                advice.push(resolved);
            }
        }
        Ok((obligations, advice))
    }
}
