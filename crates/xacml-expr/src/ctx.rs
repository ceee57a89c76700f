//! I define [`EvalContext`] — everything an [`crate::expr::Expr`] needs at
//! evaluation time, bundled so recursive evaluation doesn't thread four
//! separate parameters.
//!

use chrono::FixedOffset;
use xacml_context::RequestContext;

use crate::variables::VariableScope;

/// Evaluation-time environment for one Request: the attribute store, the
/// configured default timezone (spec §3, for timezone-less `date`/`time`
/// comparisons), and the enclosing Policy's variable definitions.
pub struct EvalContext<'a> {
    /// The Request's attribute store and finder chain.
    pub request: &'a RequestContext,
    /// Default timezone for comparing timezone-less `date`/`time` values.
    pub default_tz: FixedOffset,
    /// Variable definitions in scope, with per-Request memoization.
    pub variables: &'a VariableScope,
}
