//! I define [`PolicySet`] — a `<PolicySet>`: a target, a policy-combining
//! algorithm, and children that are either nested `Policy`/`PolicySet`
//! nodes or lazy [`PolicyIdReference`]/[`PolicySetIdReference`] handles
//! (spec §4.4/§4.5).

use std::sync::Arc;

use xacml_expr::EvalContext;
use xacml_value::Status;

use crate::{
    combining::Algorithm,
    decision::{Decision, Effect},
    obligation::{AdviceExpression, ObligationExpression, ResolvedAdvice, ResolvedObligation},
    policy::{Policy, PolicyEvaluation},
    reference::{PolicyIdReference, PolicySetIdReference},
    target::{MatchResult, Target},
};

/// One child of a `PolicySet`, in document order.
pub enum PolicySetChild {
    /// A directly nested `Policy`.
    Policy(Arc<Policy>),
    /// A directly nested `PolicySet`.
    PolicySet(Arc<PolicySet>),
    /// A `<PolicyIdReference>`, resolved by the loader after all
    /// Policy/PolicySet documents in a load batch are parsed.
    PolicyIdReference(PolicyIdReference),
    /// A `<PolicySetIdReference>`, resolved the same way.
    PolicySetIdReference(PolicySetIdReference),
}

impl PolicySetChild {
    fn evaluate<'a>(
        &'a self,
        ctx: &'a EvalContext<'a>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = PolicyEvaluation> + Send + 'a>> {
        Box::pin(async move {
            match self {
                Self::Policy(policy) => policy.evaluate(ctx).await,
                Self::PolicySet(policy_set) => policy_set.evaluate(ctx).await,
                Self::PolicyIdReference(reference) => match reference.get() {
                    Ok(policy) => policy.evaluate(ctx).await,
                    Err(e) => PolicyEvaluation {
                        decision: Decision::IndeterminateDP(Status::processing_error(e.to_string())),
                        obligations: vec![],
                        advice: vec![],
                        policy_identifiers: vec![],
                    },
                },
                Self::PolicySetIdReference(reference) => match reference.get() {
                    Ok(policy_set) => policy_set.evaluate(ctx).await,
                    Err(e) => PolicyEvaluation {
                        decision: Decision::IndeterminateDP(Status::processing_error(e.to_string())),
                        obligations: vec![],
                        advice: vec![],
                        policy_identifiers: vec![],
                    },
                },
            }
        })
    }
}

/// A `<PolicySet>`.
pub struct PolicySet {
    /// `PolicySetId`.
    pub policy_set_id: String,
    /// The policy set's target.
    pub target: Target,
    /// Algorithm combining this set's children's decisions.
    pub policy_combining_algorithm: Algorithm,
    /// Children, in document order.
    pub children: Vec<PolicySetChild>,
    /// Obligation expressions gathered after combination.
    pub obligations: Vec<ObligationExpression>,
    /// Advice expressions gathered after combination.
    pub advice: Vec<AdviceExpression>,
}

impl PolicySet {
    /// Evaluate: target match, combine children's decisions, then gather
    /// obligations/advice — the same shape as [`Policy::evaluate`], one
    /// level up the tree (spec §4.4/§4.5).
    pub fn evaluate<'a>(
        &'a self,
        ctx: &'a EvalContext<'a>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = PolicyEvaluation> + Send + 'a>> {
        Box::pin(async move {
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
                    return PolicyEvaluation {
                        decision: Decision::IndeterminateDP(s),
                        obligations: vec![],
                        advice: vec![],
                        policy_identifiers: vec![self.policy_set_id.clone()],
                    };
                }
                MatchResult::Match => {}
            }

            let mut child_evaluations = Vec::with_capacity(self.children.len());
            for child in &self.children {
                child_evaluations.push(child.evaluate(ctx).await);
            }
            let decision = self
                .policy_combining_algorithm
                .combine(child_evaluations.iter().map(|e| e.decision.clone()).collect());

            let mut policy_identifiers: Vec<String> = std::iter::once(self.policy_set_id.clone())
                .chain(child_evaluations.iter().flat_map(|e| e.policy_identifiers.iter().cloned()))
                .collect();

            if decision.is_definite() {
                let effect = match decision {
                    Decision::Permit => Effect::Permit,
                    Decision::Deny => Effect::Deny,
                    _ => unreachable!("is_definite() guarantees Permit or Deny"),
                };
                return match self.gather_obligations_and_advice(effect, ctx).await {
                    Ok((mut obligations, mut advice)) => {
                        for eval in child_evaluations {
                            let child_effect = match eval.decision {
                                Decision::Permit => Some(Effect::Permit),
                                Decision::Deny => Some(Effect::Deny),
                                _ => None,
                            };
                            if child_effect == Some(effect) {
                                obligations.extend(eval.obligations);
                                advice.extend(eval.advice);
                            }
                        }
                        PolicyEvaluation { decision, obligations, advice, policy_identifiers }
                    }
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
        })
    }

    async fn gather_obligations_and_advice(
        &self,
        effect: Effect,
        ctx: &EvalContext<'_>,
    ) -> Result<(Vec<ResolvedObligation>, Vec<ResolvedAdvice>), Status> {
        let mut obligations = Vec::new();
        for expr in &self.obligations {
            if let Some(resolved) = expr.evaluate_if_applicable(effect, ctx).await? {
                obligations.push(resolved);
            }
        }
        let mut advice = Vec::new();
        for expr in &self.advice {
            if let Some(resolved) = expr.evaluate_if_applicable(effect, ctx).await? {
                advice.push(resolved);
            }
        }
        Ok((obligations, advice))
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;
    use xacml_context::RequestContextBuilder;
    use xacml_expr::variables::VariableScope;

    use super::*;
    use crate::rule::Rule;

    fn ctx_for<'a>(request: &'a xacml_context::RequestContext, variables: &'a VariableScope) -> EvalContext<'a> {
        EvalContext {
            request,
            default_tz: FixedOffset::east_opt(0).unwrap(),
            variables,
        }
    }

    fn permit_policy(id: &str) -> Arc<Policy> {
        Arc::new(Policy {
            policy_id: id.to_owned(),
            target: Target::default(),
            rule_combining_algorithm: Algorithm::DenyOverrides,
            rules: vec![Rule {
                rule_id: format!("{id}-rule"),
                effect: Effect::Permit,
                target: None,
                condition: None,
                obligations: vec![],
                advice: vec![],
            }],
            variable_definitions: Default::default(),
            obligations: vec![],
            advice: vec![],
        })
    }

    fn deny_policy(id: &str) -> Arc<Policy> {
        Arc::new(Policy {
            policy_id: id.to_owned(),
            target: Target::default(),
            rule_combining_algorithm: Algorithm::DenyOverrides,
            rules: vec![Rule {
                rule_id: format!("{id}-rule"),
                effect: Effect::Deny,
                target: None,
                condition: None,
                obligations: vec![],
                advice: vec![],
            }],
            variable_definitions: Default::default(),
            obligations: vec![],
            advice: vec![],
        })
    }

    fn permit_policy_with_permit_obligation(id: &str, obligation_id: &str) -> Arc<Policy> {
        Arc::new(Policy {
            policy_id: id.to_owned(),
            target: Target::default(),
            rule_combining_algorithm: Algorithm::DenyOverrides,
            rules: vec![Rule {
                rule_id: format!("{id}-rule"),
                effect: Effect::Permit,
                target: None,
                condition: None,
                obligations: vec![],
                advice: vec![],
            }],
            variable_definitions: Default::default(),
            obligations: vec![crate::obligation::ObligationExpression {
                obligation_id: obligation_id.to_owned(),
                fulfill_on: Effect::Permit,
                assignments: vec![],
            }],
            advice: vec![],
        })
    }

    #[tokio::test]
    async fn policy_set_combines_its_children() {
        let policy_set = PolicySet {
            policy_set_id: "urn:example:policyset:ps1".into(),
            target: Target::default(),
            policy_combining_algorithm: Algorithm::DenyOverrides,
            children: vec![
                PolicySetChild::Policy(permit_policy("urn:example:policy:p1")),
                PolicySetChild::Policy(deny_policy("urn:example:policy:p2")),
            ],
            obligations: vec![],
            advice: vec![],
        };
        let request = RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let eval = policy_set.evaluate(&ctx).await;
        assert_eq!(eval.decision, Decision::Deny);
        assert!(eval.policy_identifiers.contains(&"urn:example:policy:p2".to_owned()));
    }

    #[tokio::test]
    async fn deny_overriding_permit_drops_the_permit_childs_obligation() {
        let policy_set = PolicySet {
            policy_set_id: "urn:example:policyset:ps3".into(),
            target: Target::default(),
            policy_combining_algorithm: Algorithm::DenyOverrides,
            children: vec![
                PolicySetChild::Policy(permit_policy_with_permit_obligation(
                    "urn:example:policy:p1",
                    "urn:example:obligation:on-permit",
                )),
                PolicySetChild::Policy(deny_policy("urn:example:policy:p2")),
            ],
            obligations: vec![],
            advice: vec![],
        };
        let request = RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let eval = policy_set.evaluate(&ctx).await;
        assert_eq!(eval.decision, Decision::Deny);
        assert!(eval.obligations.is_empty());
    }

    #[tokio::test]
    async fn unresolved_policy_reference_is_indeterminate() {
        let policy_set = PolicySet {
            policy_set_id: "urn:example:policyset:ps2".into(),
            target: Target::default(),
            policy_combining_algorithm: Algorithm::DenyOverrides,
            children: vec![PolicySetChild::PolicyIdReference(PolicyIdReference::new(
                "urn:example:policy:never-resolved",
            ))],
            obligations: vec![],
            advice: vec![],
        };
        let request = RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let eval = policy_set.evaluate(&ctx).await;
        assert!(matches!(eval.decision, Decision::IndeterminateDP(_)));
    }
}
