//! I define load-time errors for the expression tree and function catalog.
//!

/// Error raised while building an [`crate::expr::Expr`] tree, before any
/// Request is evaluated against it. Per spec §4.3/§4.7, these always abort
/// policy load — they never surface as `Indeterminate`.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ExprBuildError {
    /// The literal failed to parse as its claimed data type.
    #[error(transparent)]
    InvalidLiteral(#[from] xacml_value::ValueParseError),

    /// No function is registered under this id.
    #[error("Unknown function id: `{0}`")]
    UnknownFunction(String),

    /// A function was invoked with the wrong number of arguments.
    #[error("Function `{function_id}` expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        /// Offending function id.
        function_id: String,
        /// Expected argument count.
        expected: usize,
        /// Actual argument count supplied.
        actual: usize,
    },

    /// A `VariableReference` names a `VariableDefinition` absent from the
    /// enclosing Policy.
    #[error("Unknown variable id: `{0}`")]
    UnknownVariable(String),
}
