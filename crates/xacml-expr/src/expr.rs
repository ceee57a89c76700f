//! I define [`Expr`] — the evaluable expression tree every Target, Match,
//! Condition, ObligationExpression and AdviceExpression compiles down to
//! (spec §4.3/§4.4). Evaluation is recursive and `async` (designators and
//! selectors may call out to an [`crate::finder`]-backed attribute store),
//! so nodes box their own recursion the usual way a trait-object AST does.

use std::{fmt, sync::Arc};

use xacml_context::AttributeKey;
use xacml_value::{Bag, DataType, EvaluationResult, MissingAttributeDescriptor, Status, Value};

use crate::{ctx::EvalContext, functions::Function, functions::FunctionFuture, selector, value::ExprValue};

/// A node in the compiled expression tree.
///
/// Function dispatch is resolved once, at policy-load time, to the
/// `Arc<dyn Function>` held by [`Expr::Apply`] — never a string lookup
/// during evaluation (see `crate::functions`).
pub enum Expr {
    /// A literal, already-typed value.
    AttributeValue(Value),
    /// `AttributeDesignator`: look up a bag of values by category/id/type,
    /// optionally constrained to an issuer.
    AttributeDesignator {
        /// Attribute category uri.
        category: String,
        /// Attribute id uri.
        id: String,
        /// Expected data type.
        data_type: DataType,
        /// Optional issuer constraint.
        issuer: Option<String>,
        /// Whether an empty result is `Indeterminate` rather than an empty bag.
        must_be_present: bool,
    },
    /// `AttributeSelector`: extract values from a category's `<Content>`
    /// fragment via a minimal XPath-subset path (see [`crate::selector`]).
    AttributeSelector {
        /// Attribute category uri naming the `<Content>` to search.
        category: String,
        /// The selector path.
        path: String,
        /// Expected data type of the matched nodes' text.
        data_type: DataType,
        /// Whether an empty result is `Indeterminate` rather than an empty bag.
        must_be_present: bool,
    },
    /// `Apply`: invoke a resolved function against its argument expressions.
    Apply {
        /// The function to invoke.
        function: Arc<dyn Function>,
        /// Argument expressions, unevaluated (short-circuit functions decide
        /// for themselves which to evaluate).
        args: Vec<Expr>,
    },
    /// `VariableReference`: re-use an enclosing Policy's `VariableDefinition`,
    /// memoized per-Request by [`crate::variables::VariableScope`].
    VariableReference {
        /// The variable's id.
        id: String,
        /// Its resolved definition (bound once, at policy-load time).
        definition: Arc<Expr>,
    },
    /// A bare `<Function FunctionId="..."/>` reference, meaningful only as
    /// the first argument to a higher-order bag function (`any-of`,
    /// `map`, ...) — evaluating it directly is a processing error.
    FunctionReference(Arc<dyn Function>),
}

impl Clone for Expr {
    fn clone(&self) -> Self {
        match self {
            Self::AttributeValue(v) => Self::AttributeValue(v.clone()),
            Self::AttributeDesignator { category, id, data_type, issuer, must_be_present } => {
                Self::AttributeDesignator {
                    category: category.clone(),
                    id: id.clone(),
                    data_type: *data_type,
                    issuer: issuer.clone(),
                    must_be_present: *must_be_present,
                }
            }
            Self::AttributeSelector { category, path, data_type, must_be_present } => Self::AttributeSelector {
                category: category.clone(),
                path: path.clone(),
                data_type: *data_type,
                must_be_present: *must_be_present,
            },
            Self::Apply { function, args } => Self::Apply { function: function.clone(), args: args.clone() },
            Self::VariableReference { id, definition } => {
                Self::VariableReference { id: id.clone(), definition: definition.clone() }
            }
            Self::FunctionReference(f) => Self::FunctionReference(f.clone()),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttributeValue(v) => f.debug_tuple("AttributeValue").field(v).finish(),
            Self::AttributeDesignator { category, id, data_type, issuer, must_be_present } => f
                .debug_struct("AttributeDesignator")
                .field("category", category)
                .field("id", id)
                .field("data_type", data_type)
                .field("issuer", issuer)
                .field("must_be_present", must_be_present)
                .finish(),
            Self::AttributeSelector { category, path, data_type, must_be_present } => f
                .debug_struct("AttributeSelector")
                .field("category", category)
                .field("path", path)
                .field("data_type", data_type)
                .field("must_be_present", must_be_present)
                .finish(),
            Self::Apply { function, args } => f
                .debug_struct("Apply")
                .field("function", &function.id())
                .field("args", args)
                .finish(),
            Self::VariableReference { id, .. } => f.debug_struct("VariableReference").field("id", id).finish(),
            Self::FunctionReference(function) => f.debug_tuple("FunctionReference").field(&function.id()).finish(),
        }
    }
}

impl Expr {
    /// Evaluate this node against `ctx`.
    pub fn evaluate<'a>(&'a self, ctx: &'a EvalContext<'a>) -> FunctionFuture<'a> {
        Box::pin(async move {
            match self {
                Self::AttributeValue(v) => EvaluationResult::Value(ExprValue::Single(v.clone())),

                Self::AttributeDesignator { category, id, data_type, issuer, must_be_present } => {
                    let key = AttributeKey::new(category.clone(), id.clone(), *data_type, issuer.clone());
                    match ctx.request.get_attribute(&key).await {
                        EvaluationResult::Value(bag) => missing_or_bag(bag, *must_be_present, || {
                            Status::missing_attribute(MissingAttributeDescriptor {
                                category: category.clone(),
                                attribute_id: id.clone(),
                                data_type: *data_type,
                                issuer: issuer.clone(),
                            })
                        }),
                        EvaluationResult::Indeterminate(s) => EvaluationResult::Indeterminate(s),
                    }
                }

                Self::AttributeSelector { category, path, data_type, must_be_present } => {
                    match ctx.request.get_content(category) {
                        Some(xml) => match selector::select(xml, path, *data_type) {
                            Ok(bag) => missing_or_bag(bag, *must_be_present, || {
                                Status::processing_error(format!(
                                    "AttributeSelector: path `{path}` matched nothing in category `{category}`"
                                ))
                            }),
                            Err(e) => EvaluationResult::Indeterminate(Status::processing_error(e.to_string())),
                        },
                        None if *must_be_present => EvaluationResult::Indeterminate(Status::processing_error(
                            format!("AttributeSelector: no <Content> registered for category `{category}`"),
                        )),
                        None => EvaluationResult::Value(ExprValue::Bag(Bag::empty())),
                    }
                }

                Self::Apply { function, args } => function.call(args, ctx).await,

                Self::VariableReference { id, definition } => {
                    if let Some(cached) = ctx.variables.cached(id) {
                        return cached;
                    }
                    let result = definition.evaluate(ctx).await;
                    ctx.variables.record(id, result.clone());
                    result
                }

                Self::FunctionReference(_) => EvaluationResult::Indeterminate(Status::processing_error(
                    "a <Function> reference cannot be evaluated on its own; it is only valid as a \
                     higher-order function's first argument",
                )),
            }
        })
    }
}

fn missing_or_bag(
    bag: Bag,
    must_be_present: bool,
    missing: impl FnOnce() -> Status,
) -> EvaluationResult<ExprValue> {
    if bag.is_empty() && must_be_present {
        EvaluationResult::Indeterminate(missing())
    } else {
        EvaluationResult::Value(ExprValue::Bag(bag))
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;
    use xacml_context::{Attribute, AttributeKey as Key, RequestContextBuilder};

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
    async fn attribute_value_evaluates_to_itself() {
        let expr = Expr::AttributeValue(Value::Boolean(true));
        let request = RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let result = expr.evaluate(&ctx).await;
        assert_eq!(result, EvaluationResult::Value(ExprValue::Single(Value::Boolean(true))));
    }

    #[tokio::test]
    async fn missing_designator_without_must_be_present_is_empty_bag() {
        let expr = Expr::AttributeDesignator {
            category: "urn:example:subject".into(),
            id: "urn:example:role".into(),
            data_type: DataType::String,
            issuer: None,
            must_be_present: false,
        };
        let request = RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let EvaluationResult::Value(ExprValue::Bag(bag)) = expr.evaluate(&ctx).await else {
            panic!("expected a value")
        };
        assert!(bag.is_empty());
    }

    #[tokio::test]
    async fn missing_designator_with_must_be_present_is_indeterminate() {
        let expr = Expr::AttributeDesignator {
            category: "urn:example:subject".into(),
            id: "urn:example:role".into(),
            data_type: DataType::String,
            issuer: None,
            must_be_present: true,
        };
        let request = RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        assert!(expr.evaluate(&ctx).await.is_indeterminate());
    }

    #[tokio::test]
    async fn apply_dispatches_to_its_function() {
        let equal = resolve_function("urn:oasis:names:tc:xacml:1.0:function:integer-equal").unwrap();
        let expr = Expr::Apply {
            function: equal,
            args: vec![
                Expr::AttributeValue(Value::Integer(1.into())),
                Expr::AttributeValue(Value::Integer(1.into())),
            ],
        };
        let request = RequestContextBuilder::new().build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let result = expr.evaluate(&ctx).await;
        assert_eq!(result, EvaluationResult::Value(ExprValue::Single(Value::Boolean(true))));
    }

    #[tokio::test]
    async fn variable_reference_is_memoized() {
        let definition = Arc::new(Expr::AttributeValue(Value::Integer(7.into())));
        let mut definitions = std::collections::HashMap::new();
        definitions.insert("v1".to_owned(), definition.clone());
        let variables = VariableScope::new(definitions);
        let expr = Expr::VariableReference { id: "v1".to_owned(), definition };
        let request = RequestContextBuilder::new().build();
        let ctx = ctx_for(&request, &variables);
        let first = expr.evaluate(&ctx).await;
        assert_eq!(first, EvaluationResult::Value(ExprValue::Single(Value::Integer(7.into()))));
        assert!(variables.cached("v1").is_some());
    }

    #[tokio::test]
    async fn designator_picks_up_stored_attribute() {
        let key = Key::new("urn:example:subject", "urn:example:role", DataType::String, None);
        let attr = Attribute::new(key, Bag::from_values([Value::String("admin".into())]));
        let request = RequestContextBuilder::new().add_attribute(attr).build();
        let variables = VariableScope::empty();
        let ctx = ctx_for(&request, &variables);
        let expr = Expr::AttributeDesignator {
            category: "urn:example:subject".into(),
            id: "urn:example:role".into(),
            data_type: DataType::String,
            issuer: None,
            must_be_present: true,
        };
        let EvaluationResult::Value(ExprValue::Bag(bag)) = expr.evaluate(&ctx).await else {
            panic!("expected a value")
        };
        assert_eq!(bag.one_and_only().unwrap(), &Value::String("admin".into()));
    }
}
