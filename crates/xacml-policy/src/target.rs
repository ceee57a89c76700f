//! I define [`Target`], [`AnyOf`], [`AllOf`] and [`Match`] — the 3-valued
//! target-matching tree spec §4.4 describes: `Target` is a conjunction of
//! `AnyOf`s, each `AnyOf` a disjunction of `AllOf`s, each `AllOf` a
//! conjunction of `Match`es.

use std::sync::Arc;

use xacml_value::{EvaluationResult, Status, Value};
use xacml_expr::{functions::Function, EvalContext, Expr, ExprValue};

/// The outcome of evaluating a target-matching node (spec §4.4).
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// The node matched the Request.
    Match,
    /// The node did not match the Request.
    NoMatch,
    /// The node's match status could not be determined.
    Indeterminate(Status),
}

/// One `<Match>`: a designator/selector expression, compared element-wise
/// against a literal via a match function (spec §4.4).
pub struct Match {
    /// The designator or selector expression to evaluate to a bag.
    pub designator: Expr,
    /// The match function (e.g. `string-equal`), applied as `f(literal, v)`
    /// for each `v` in the designator's bag.
    pub match_function: Arc<dyn Function>,
    /// The literal compared against each bag element.
    pub literal: Value,
}

impl Match {
    /// Evaluate against `ctx`.
    pub async fn evaluate(&self, ctx: &EvalContext<'_>) -> MatchResult {
        let bag = match self.designator.evaluate(ctx).await {
            EvaluationResult::Value(v) => v.into_bag(),
            EvaluationResult::Indeterminate(s) => return MatchResult::Indeterminate(s),
        };

        let mut saw_indeterminate = false;
        for value in bag.iter() {
            let args = [Expr::AttributeValue(self.literal.clone()), Expr::AttributeValue(value.clone())];
            match self.match_function.call(&args, ctx).await {
                EvaluationResult::Value(ExprValue::Single(Value::Boolean(true))) => return MatchResult::Match,
                EvaluationResult::Value(_) => {}
                EvaluationResult::Indeterminate(_) => saw_indeterminate = true,
            }
        }

        if saw_indeterminate {
            MatchResult::Indeterminate(Status::processing_error("Match: indeterminate element comparison"))
        } else {
            MatchResult::NoMatch
        }
    }
}

/// Conjunction of [`Match`]es: `NoMatch` absorbs `Indeterminate` (spec §4.4:
/// `NoMatch ∧ Indeterminate = NoMatch`).
pub struct AllOf {
    /// The conjuncts.
    pub matches: Vec<Match>,
}

impl AllOf {
    /// Evaluate against `ctx`.
    pub async fn evaluate(&self, ctx: &EvalContext<'_>) -> MatchResult {
        let mut indeterminate_status = None;
        for m in &self.matches {
            match m.evaluate(ctx).await {
                MatchResult::NoMatch => return MatchResult::NoMatch,
                MatchResult::Indeterminate(s) => indeterminate_status.get_or_insert(s),
                MatchResult::Match => continue,
            };
        }
        match indeterminate_status {
            Some(s) => MatchResult::Indeterminate(s),
            None => MatchResult::Match,
        }
    }
}

/// Disjunction of [`AllOf`]s: `Match` absorbs `Indeterminate` (spec §4.4:
/// `Match ∨ Indeterminate = Match`).
pub struct AnyOf {
    /// The disjuncts.
    pub all_ofs: Vec<AllOf>,
}

impl AnyOf {
    /// Evaluate against `ctx`.
    pub async fn evaluate(&self, ctx: &EvalContext<'_>) -> MatchResult {
        let mut indeterminate_status = None;
        for all_of in &self.all_ofs {
            match all_of.evaluate(ctx).await {
                MatchResult::Match => return MatchResult::Match,
                MatchResult::Indeterminate(s) => indeterminate_status.get_or_insert(s),
                MatchResult::NoMatch => continue,
            };
        }
        match indeterminate_status {
            Some(s) => MatchResult::Indeterminate(s),
            None => MatchResult::NoMatch,
        }
    }
}

/// A `<Target>`: a conjunction of [`AnyOf`]s. An empty target always matches
/// (spec §4.4).
#[derive(Default)]
pub struct Target {
    /// The conjuncts. Empty means "always matches".
    pub any_ofs: Vec<AnyOf>,
}

impl Target {
    /// Evaluate against `ctx`.
    pub async fn evaluate(&self, ctx: &EvalContext<'_>) -> MatchResult {
        if self.any_ofs.is_empty() {
            return MatchResult::Match;
        }
        let mut indeterminate_status = None;
        for any_of in &self.any_ofs {
            match any_of.evaluate(ctx).await {
                MatchResult::NoMatch => return MatchResult::NoMatch,
                MatchResult::Indeterminate(s) => indeterminate_status.get_or_insert(s),
                MatchResult::Match => continue,
            };
        }
        match indeterminate_status {
            Some(s) => MatchResult::Indeterminate(s),
            None => MatchResult::Match,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;
    use xacml_context::RequestContextBuilder;
    use xacml_expr::{functions::resolve_function, variables::VariableScope};
    use xacml_value::DataType;

    use super::*;

    fn ctx_for<'a>(request: &'a xacml_context::RequestContext, variables: &'a VariableScope) -> EvalContext<'a> {
        EvalContext {
            request,
            default_tz: FixedOffset::east_opt(0).unwrap(),
            variables,
        }
    }

    fn equal() -> Arc<dyn Function> {
        resolve_function("urn:oasis:names:tc:xacml:1.0:function:string-equal").unwrap()
    }

    #[tokio::test]
    async fn empty_target_always_matches() {
        let target = Target::default();
        let request = RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        assert_eq!(target.evaluate(&ctx).await, MatchResult::Match);
    }

    #[tokio::test]
    async fn all_of_no_match_absorbs_indeterminate() {
        let designator_present = Expr::AttributeValue(Value::String("train".into()));
        let designator_missing = Expr::AttributeDesignator {
            category: "urn:example:action".into(),
            id: "urn:example:missing".into(),
            data_type: DataType::String,
            issuer: None,
            must_be_present: true,
        };
        let all_of = AllOf {
            matches: vec![
                Match { designator: designator_present, match_function: equal(), literal: Value::String("serve".into()) },
                Match { designator: designator_missing, match_function: equal(), literal: Value::String("serve".into()) },
            ],
        };
        let request = RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        assert_eq!(all_of.evaluate(&ctx).await, MatchResult::NoMatch);
    }
}
