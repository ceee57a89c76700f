//! I define [`VariableScope`] — a Policy's `VariableDefinition`s, resolved
//! by [`crate::expr::Expr::VariableReference`] with per-Request memoization
//! (spec §4.3).
//!

use std::{collections::HashMap, sync::Arc, sync::Mutex};

use xacml_value::EvaluationResult;

use crate::{error::ExprBuildError, expr::Expr, value::ExprValue};

/// The variable definitions visible within one enclosing Policy, plus a
/// memo table scoped to the current Request evaluation. Re-evaluating the
/// same `VariableReference` twice inside one Request returns the cached
/// result rather than re-running the definition's expression.
pub struct VariableScope {
    definitions: HashMap<String, Arc<Expr>>,
    // A `Mutex`, not a `RefCell`: held behind `&EvalContext` across `.await`
    // points in futures that must stay `Send` (see
    // `crate::functions::FunctionFuture`), which requires `Sync`.
    memo: Mutex<HashMap<String, EvaluationResult<ExprValue>>>,
}

impl VariableScope {
    /// Build a scope from a Policy's `VariableDefinition`s.
    pub fn new(definitions: HashMap<String, Arc<Expr>>) -> Self {
        Self {
            definitions,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// An empty scope, for expressions evaluated outside any Policy (e.g.
    /// in isolated function/unit tests).
    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    /// Resolve `id` to its definition, erroring at build time if absent.
    pub fn resolve(&self, id: &str) -> Result<Arc<Expr>, ExprBuildError> {
        self.definitions
            .get(id)
            .cloned()
            .ok_or_else(|| ExprBuildError::UnknownVariable(id.to_owned()))
    }

    /// The memoized result for `id`, if this Request has already evaluated
    /// it once.
    pub fn cached(&self, id: &str) -> Option<EvaluationResult<ExprValue>> {
        self.memo.lock().expect("variable memo mutex poisoned").get(id).cloned()
    }

    /// Record the result of evaluating `id` for the remainder of this
    /// Request.
    pub fn record(&self, id: &str, result: EvaluationResult<ExprValue>) {
        self.memo.lock().expect("variable memo mutex poisoned").insert(id.to_owned(), result);
    }
}
