//! I parse XACML 3.0 Policy/PolicySet XML into the [`xacml_policy`] tree
//! (spec §4.7). Same quick-xml event-loop idiom as [`crate::xml::request`]:
//! each nesting level owns an explicit end marker, any unexpected event is
//! a hard parse error.

use std::{collections::HashMap, sync::Arc};

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Reader;
use xacml_expr::{
    functions::{check_arity, resolve_function},
    Expr,
};
use xacml_policy::{
    AdviceExpression, AllOf, Algorithm, AnyOf, AttributeAssignmentExpression, Effect, Match, ObligationExpression,
    Policy, PolicyIdReference, PolicySet, PolicySetChild, PolicySetIdReference, Rule, Target,
};
use xacml_value::{DataType, Value};

/// Failure parsing a Policy/PolicySet document. Always a load-time abort
/// (spec §4.7/§7) — never surfaced as `Indeterminate`.
#[derive(Debug, thiserror::Error)]
pub enum PolicyLoadError {
    /// The document was not well-formed XML.
    #[error("malformed policy xml: {0}")]
    Xml(#[from] quick_xml::Error),
    /// An event appeared somewhere the grammar doesn't allow it.
    #[error("unexpected xml event while parsing <{context}>: {event:?}")]
    UnexpectedEvent {
        /// The element whose children were being read.
        context: &'static str,
        /// Debug form of the offending event.
        event: String,
    },
    /// The top-level element was neither `<Policy>` nor `<PolicySet>`.
    #[error("unknown top-level element `{0}`, expected <Policy> or <PolicySet>")]
    UnknownRootElement(String),
    /// No `<Policy>`/`<PolicySet>` element was found at all.
    #[error("document contained neither a <Policy> nor a <PolicySet> element")]
    NoRootElement,
    /// A required XML attribute was missing.
    #[error("<{element}> missing required `{attribute}` attribute")]
    MissingXmlAttribute {
        /// The element missing the attribute.
        element: &'static str,
        /// The missing attribute's name.
        attribute: &'static str,
    },
    /// `DataType` named a uri this engine doesn't recognize.
    #[error("unknown data type uri `{0}`")]
    UnknownDataType(String),
    /// A literal failed to parse as its declared data type.
    #[error("invalid value `{literal}` for data type `{data_type}`: {source}")]
    InvalidValue {
        /// The offending literal.
        literal: String,
        /// The data type it was supposed to parse as.
        data_type: &'static str,
        /// Underlying parse failure.
        #[source]
        source: xacml_value::ValueParseError,
    },
    /// A combining-algorithm id was not recognized.
    #[error(transparent)]
    UnknownAlgorithm(#[from] xacml_policy::UnknownAlgorithm),
    /// An `Effect`/`FulfillOn`/`AppliesTo` attribute held neither `Permit`
    /// nor `Deny`.
    #[error("invalid effect `{0}`, expected `Permit` or `Deny`")]
    InvalidEffect(String),
    /// A function id named in `FunctionId`/`MatchId` is not registered.
    #[error(transparent)]
    UnknownFunction(#[from] xacml_expr::ExprBuildError),
    /// A `<VariableReference>` named a `VariableId` not yet defined in this
    /// Policy (XACML requires definition-before-use).
    #[error("<VariableReference> refers to undefined variable `{0}`")]
    UnknownVariable(String),
    /// A `<Match>` element's second operand wasn't an
    /// `AttributeDesignator`/`AttributeSelector`, or its first wasn't a
    /// literal `AttributeValue`.
    #[error("<Match> must pair one <AttributeValue> with one designator/selector expression")]
    MalformedMatch,
}

/// A top-level Policy/PolicySet document, parsed but not yet linked into a
/// [`crate::pdp::Pdp`]'s reference index.
pub enum LoadedDocument {
    /// A `<Policy>` document.
    Policy(Arc<Policy>),
    /// A `<PolicySet>` document.
    PolicySet(Arc<PolicySet>),
}

impl LoadedDocument {
    /// This document's `PolicyId`/`PolicySetId`.
    pub fn id(&self) -> &str {
        match self {
            Self::Policy(p) => &p.policy_id,
            Self::PolicySet(p) => &p.policy_set_id,
        }
    }
}

/// Parse one Policy/PolicySet XML document (spec §4.7). `<PolicyIdReference>`
/// and `<PolicySetIdReference>` children are parsed as unresolved handles;
/// [`crate::pdp::Pdp::load`] binds them once every document in a load batch
/// has been parsed.
#[tracing::instrument(skip_all)]
pub fn parse_policy_document(xml: &str) -> Result<LoadedDocument, PolicyLoadError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"Policy" => {
                return Ok(LoadedDocument::Policy(Arc::new(parse_policy(&mut reader, &tag)?)));
            }
            Event::Start(tag) if local_name(&tag) == b"PolicySet" => {
                return Ok(LoadedDocument::PolicySet(Arc::new(parse_policy_set(&mut reader, &tag)?)));
            }
            Event::Start(tag) => return Err(PolicyLoadError::UnknownRootElement(name_string(&tag))),
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => continue,
            Event::Eof => return Err(PolicyLoadError::NoRootElement),
            other => {
                return Err(PolicyLoadError::UnexpectedEvent { context: "document", event: format!("{other:?}") })
            }
        }
    }
}

fn parse_policy(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Policy, PolicyLoadError> {
    let policy_id = required_attr(start, "Policy", "PolicyId")?;
    let rule_combining_algorithm =
        Algorithm::from_uri(&required_attr(start, "Policy", "RuleCombiningAlgId")?)?;
    let end = start.to_end();

    let mut target = Target::default();
    let mut variables: HashMap<String, Arc<Expr>> = HashMap::new();
    let mut rules = Vec::new();
    let mut obligations = Vec::new();
    let mut advice = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"Target" => target = parse_target(reader, &tag, &variables)?,
            Event::Empty(tag) if local_name(&tag) == b"Target" => {}
            Event::Start(tag) if local_name(&tag) == b"Description" => skip_element(reader, &tag)?,
            Event::Start(tag) if local_name(&tag) == b"VariableDefinition" => {
                let (id, expr) = parse_variable_definition(reader, &tag, &variables)?;
                variables.insert(id, expr);
            }
            Event::Start(tag) if local_name(&tag) == b"Rule" => rules.push(parse_rule(reader, &tag, &variables)?),
            Event::Start(tag) if local_name(&tag) == b"ObligationExpressions" => {
                obligations = parse_obligation_expressions(reader, &tag, &variables)?;
            }
            Event::Start(tag) if local_name(&tag) == b"AdviceExpressions" => {
                advice = parse_advice_expressions(reader, &tag, &variables)?;
            }
            Event::End(tag) if tag == end => break,
            Event::Comment(_) => continue,
            other => {
                return Err(PolicyLoadError::UnexpectedEvent { context: "Policy", event: format!("{other:?}") })
            }
        }
        buf.clear();
    }

    Ok(Policy { policy_id, target, rule_combining_algorithm, rules, variable_definitions: variables, obligations, advice })
}

fn parse_policy_set(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<PolicySet, PolicyLoadError> {
    let policy_set_id = required_attr(start, "PolicySet", "PolicySetId")?;
    let policy_combining_algorithm =
        Algorithm::from_uri(&required_attr(start, "PolicySet", "PolicyCombiningAlgId")?)?;
    let end = start.to_end();

    let mut target = Target::default();
    let mut children = Vec::new();
    let mut obligations = Vec::new();
    let mut advice = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"Target" => {
                target = parse_target(reader, &tag, &HashMap::new())?
            }
            Event::Empty(tag) if local_name(&tag) == b"Target" => {}
            Event::Start(tag) if local_name(&tag) == b"Description" => skip_element(reader, &tag)?,
            Event::Start(tag) if local_name(&tag) == b"Policy" => {
                children.push(PolicySetChild::Policy(Arc::new(parse_policy(reader, &tag)?)));
            }
            Event::Start(tag) if local_name(&tag) == b"PolicySet" => {
                children.push(PolicySetChild::PolicySet(Arc::new(parse_policy_set(reader, &tag)?)));
            }
            Event::Start(tag) if local_name(&tag) == b"PolicyIdReference" => {
                let end = tag.to_end();
                let id = read_text_until(reader, &end)?;
                children.push(PolicySetChild::PolicyIdReference(PolicyIdReference::new(id)));
            }
            Event::Start(tag) if local_name(&tag) == b"PolicySetIdReference" => {
                let end = tag.to_end();
                let id = read_text_until(reader, &end)?;
                children.push(PolicySetChild::PolicySetIdReference(PolicySetIdReference::new(id)));
            }
            Event::Start(tag) if local_name(&tag) == b"ObligationExpressions" => {
                obligations = parse_obligation_expressions(reader, &tag, &HashMap::new())?;
            }
            Event::Start(tag) if local_name(&tag) == b"AdviceExpressions" => {
                advice = parse_advice_expressions(reader, &tag, &HashMap::new())?;
            }
            Event::End(tag) if tag == end => break,
            Event::Comment(_) => continue,
            other => {
                return Err(PolicyLoadError::UnexpectedEvent { context: "PolicySet", event: format!("{other:?}") })
            }
        }
        buf.clear();
    }

    Ok(PolicySet { policy_set_id, target, policy_combining_algorithm, children, obligations, advice })
}

fn parse_rule(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    variables: &HashMap<String, Arc<Expr>>,
) -> Result<Rule, PolicyLoadError> {
    let rule_id = required_attr(start, "Rule", "RuleId")?;
    let effect = parse_effect(&required_attr(start, "Rule", "Effect")?)?;
    let end = start.to_end();

    let mut target = None;
    let mut condition = None;
    let mut obligations = Vec::new();
    let mut advice = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"Description" => skip_element(reader, &tag)?,
            Event::Start(tag) if local_name(&tag) == b"Target" => {
                target = Some(parse_target(reader, &tag, variables)?)
            }
            Event::Empty(tag) if local_name(&tag) == b"Target" => target = Some(Target::default()),
            Event::Start(tag) if local_name(&tag) == b"Condition" => {
                condition = Some(parse_condition_body(reader, &tag, variables)?);
            }
            Event::Start(tag) if local_name(&tag) == b"ObligationExpressions" => {
                obligations = parse_obligation_expressions(reader, &tag, variables)?;
            }
            Event::Start(tag) if local_name(&tag) == b"AdviceExpressions" => {
                advice = parse_advice_expressions(reader, &tag, variables)?;
            }
            Event::End(tag) if tag == end => break,
            Event::Comment(_) => continue,
            other => return Err(PolicyLoadError::UnexpectedEvent { context: "Rule", event: format!("{other:?}") }),
        }
        buf.clear();
    }

    Ok(Rule { rule_id, effect, target, condition, obligations, advice })
}

/// A `<Condition>` wraps exactly one expression element.
fn parse_condition_body(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    variables: &HashMap<String, Arc<Expr>>,
) -> Result<Expr, PolicyLoadError> {
    let end = start.to_end();
    let mut buf = Vec::new();
    let expr = loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) => break parse_expr(reader, &tag, variables)?,
            Event::Empty(tag) => break parse_expr_empty(&tag, variables)?,
            other => {
                return Err(PolicyLoadError::UnexpectedEvent { context: "Condition", event: format!("{other:?}") })
            }
        }
    };
    buf.clear();
    expect_end(reader, &end, "Condition")?;
    Ok(expr)
}

fn parse_variable_definition(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    variables: &HashMap<String, Arc<Expr>>,
) -> Result<(String, Arc<Expr>), PolicyLoadError> {
    let id = required_attr(start, "VariableDefinition", "VariableId")?;
    let end = start.to_end();
    let mut buf = Vec::new();
    let expr = loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) => break parse_expr(reader, &tag, variables)?,
            Event::Empty(tag) => break parse_expr_empty(&tag, variables)?,
            other => {
                return Err(PolicyLoadError::UnexpectedEvent {
                    context: "VariableDefinition",
                    event: format!("{other:?}"),
                })
            }
        }
    };
    buf.clear();
    expect_end(reader, &end, "VariableDefinition")?;
    Ok((id, Arc::new(expr)))
}

fn parse_target(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    variables: &HashMap<String, Arc<Expr>>,
) -> Result<Target, PolicyLoadError> {
    let end = start.to_end();
    let mut any_ofs = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"AnyOf" => any_ofs.push(parse_any_of(reader, &tag, variables)?),
            Event::End(tag) if tag == end => break,
            other => {
                return Err(PolicyLoadError::UnexpectedEvent { context: "Target", event: format!("{other:?}") })
            }
        }
        buf.clear();
    }
    Ok(Target { any_ofs })
}

fn parse_any_of(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    variables: &HashMap<String, Arc<Expr>>,
) -> Result<AnyOf, PolicyLoadError> {
    let end = start.to_end();
    let mut all_ofs = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"AllOf" => all_ofs.push(parse_all_of(reader, &tag, variables)?),
            Event::End(tag) if tag == end => break,
            other => return Err(PolicyLoadError::UnexpectedEvent { context: "AnyOf", event: format!("{other:?}") }),
        }
        buf.clear();
    }
    Ok(AnyOf { all_ofs })
}

fn parse_all_of(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    variables: &HashMap<String, Arc<Expr>>,
) -> Result<AllOf, PolicyLoadError> {
    let end = start.to_end();
    let mut matches = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"Match" => matches.push(parse_match(reader, &tag, variables)?),
            Event::End(tag) if tag == end => break,
            other => return Err(PolicyLoadError::UnexpectedEvent { context: "AllOf", event: format!("{other:?}") }),
        }
        buf.clear();
    }
    Ok(AllOf { matches })
}

fn parse_match(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    variables: &HashMap<String, Arc<Expr>>,
) -> Result<Match, PolicyLoadError> {
    let match_id = required_attr(start, "Match", "MatchId")?;
    let match_function = resolve_function(&match_id)?;
    let end = start.to_end();
    let mut operands = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) => operands.push(parse_expr(reader, &tag, variables)?),
            Event::Empty(tag) => operands.push(parse_expr_empty(&tag, variables)?),
            Event::End(tag) if tag == end => break,
            other => return Err(PolicyLoadError::UnexpectedEvent { context: "Match", event: format!("{other:?}") }),
        }
        buf.clear();
    }
    check_arity(match_function.as_ref(), 2).map_err(PolicyLoadError::UnknownFunction)?;
    let mut operands = operands.into_iter();
    let (literal_expr, designator) = match (operands.next(), operands.next()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(PolicyLoadError::MalformedMatch),
    };
    let literal = match literal_expr {
        Expr::AttributeValue(v) => v,
        _ => return Err(PolicyLoadError::MalformedMatch),
    };
    Ok(Match { designator, match_function, literal })
}

fn parse_obligation_expressions(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    variables: &HashMap<String, Arc<Expr>>,
) -> Result<Vec<ObligationExpression>, PolicyLoadError> {
    let end = start.to_end();
    let mut obligations = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"ObligationExpression" => {
                let obligation_id = required_attr(&tag, "ObligationExpression", "ObligationId")?;
                let fulfill_on = parse_effect(&required_attr(&tag, "ObligationExpression", "FulfillOn")?)?;
                let assignments = parse_attribute_assignment_expressions(reader, &tag, variables)?;
                obligations.push(ObligationExpression { obligation_id, fulfill_on, assignments });
            }
            Event::End(tag) if tag == end => break,
            other => {
                return Err(PolicyLoadError::UnexpectedEvent {
                    context: "ObligationExpressions",
                    event: format!("{other:?}"),
                })
            }
        }
        buf.clear();
    }
    Ok(obligations)
}

fn parse_advice_expressions(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    variables: &HashMap<String, Arc<Expr>>,
) -> Result<Vec<AdviceExpression>, PolicyLoadError> {
    let end = start.to_end();
    let mut advice = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"AdviceExpression" => {
                let advice_id = required_attr(&tag, "AdviceExpression", "AdviceId")?;
                let applies_to = parse_effect(&required_attr(&tag, "AdviceExpression", "AppliesTo")?)?;
                let assignments = parse_attribute_assignment_expressions(reader, &tag, variables)?;
                advice.push(AdviceExpression { advice_id, applies_to, assignments });
            }
            Event::End(tag) if tag == end => break,
            other => {
                return Err(PolicyLoadError::UnexpectedEvent {
                    context: "AdviceExpressions",
                    event: format!("{other:?}"),
                })
            }
        }
        buf.clear();
    }
    Ok(advice)
}

fn parse_attribute_assignment_expressions(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    variables: &HashMap<String, Arc<Expr>>,
) -> Result<Vec<AttributeAssignmentExpression>, PolicyLoadError> {
    let end = start.to_end();
    let mut assignments = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"AttributeAssignmentExpression" => {
                let attribute_id = required_attr(&tag, "AttributeAssignmentExpression", "AttributeId")?;
                let category = attr_value(&tag, "Category")?;
                let assignment_end = tag.to_end();
                let mut inner_buf = Vec::new();
                let expression = loop {
                    match reader.read_event_into(&mut inner_buf)? {
                        Event::Start(inner) => break parse_expr(reader, &inner, variables)?,
                        Event::Empty(inner) => break parse_expr_empty(&inner, variables)?,
                        other => {
                            return Err(PolicyLoadError::UnexpectedEvent {
                                context: "AttributeAssignmentExpression",
                                event: format!("{other:?}"),
                            })
                        }
                    }
                };
                inner_buf.clear();
                expect_end(reader, &assignment_end, "AttributeAssignmentExpression")?;
                assignments.push(AttributeAssignmentExpression { attribute_id, expression, category });
            }
            Event::End(tag) if tag == end => break,
            other => {
                return Err(PolicyLoadError::UnexpectedEvent {
                    context: "ObligationExpression",
                    event: format!("{other:?}"),
                })
            }
        }
        buf.clear();
    }
    Ok(assignments)
}

/// Dispatch an expression element that opened with `Event::Start`.
fn parse_expr(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    variables: &HashMap<String, Arc<Expr>>,
) -> Result<Expr, PolicyLoadError> {
    match local_name(start) {
        b"AttributeValue" => {
            let data_type_uri = required_attr(start, "AttributeValue", "DataType")?;
            let data_type =
                DataType::from_uri(&data_type_uri).ok_or_else(|| PolicyLoadError::UnknownDataType(data_type_uri))?;
            let end = start.to_end();
            let literal = read_text_until(reader, &end)?;
            let value = Value::parse(data_type, literal.trim()).map_err(|source| PolicyLoadError::InvalidValue {
                literal,
                data_type: data_type.uri(),
                source,
            })?;
            Ok(Expr::AttributeValue(value))
        }
        b"AttributeDesignator" => {
            let expr = attribute_designator(start)?;
            consume_to_end(reader, start)?;
            Ok(expr)
        }
        b"AttributeSelector" => {
            let expr = attribute_selector(start)?;
            consume_to_end(reader, start)?;
            Ok(expr)
        }
        b"Function" => {
            let function = resolve_function(&required_attr(start, "Function", "FunctionId")?)?;
            consume_to_end(reader, start)?;
            Ok(Expr::FunctionReference(function))
        }
        b"VariableReference" => {
            let id = required_attr(start, "VariableReference", "VariableId")?;
            consume_to_end(reader, start)?;
            let definition =
                variables.get(&id).cloned().ok_or_else(|| PolicyLoadError::UnknownVariable(id.clone()))?;
            Ok(Expr::VariableReference { id, definition })
        }
        b"Apply" => {
            let function = resolve_function(&required_attr(start, "Apply", "FunctionId")?)?;
            let end = start.to_end();
            let mut args = Vec::new();
            let mut buf = Vec::new();
            loop {
                match reader.read_event_into(&mut buf)? {
                    Event::Start(tag) => args.push(parse_expr(reader, &tag, variables)?),
                    Event::Empty(tag) => args.push(parse_expr_empty(&tag, variables)?),
                    Event::End(tag) if tag == end => break,
                    other => {
                        return Err(PolicyLoadError::UnexpectedEvent { context: "Apply", event: format!("{other:?}") })
                    }
                }
                buf.clear();
            }
            check_arity(function.as_ref(), args.len()).map_err(PolicyLoadError::UnknownFunction)?;
            Ok(Expr::Apply { function, args })
        }
        _ => Err(PolicyLoadError::UnexpectedEvent {
            context: "expression",
            event: format!("<{}>", name_string(start)),
        }),
    }
}

/// Dispatch an expression element that opened (and closed) with
/// `Event::Empty` — only designators, selectors, `<Function>` and
/// `<VariableReference>` can be self-closing; `AttributeValue`/`Apply`
/// always have content.
fn parse_expr_empty(start: &BytesStart, variables: &HashMap<String, Arc<Expr>>) -> Result<Expr, PolicyLoadError> {
    match local_name(start) {
        b"AttributeDesignator" => attribute_designator(start),
        b"AttributeSelector" => attribute_selector(start),
        b"Function" => {
            let function = resolve_function(&required_attr(start, "Function", "FunctionId")?)?;
            Ok(Expr::FunctionReference(function))
        }
        b"VariableReference" => {
            let id = required_attr(start, "VariableReference", "VariableId")?;
            let definition =
                variables.get(&id).cloned().ok_or_else(|| PolicyLoadError::UnknownVariable(id.clone()))?;
            Ok(Expr::VariableReference { id, definition })
        }
        _ => Err(PolicyLoadError::UnexpectedEvent {
            context: "expression",
            event: format!("<{}/>", name_string(start)),
        }),
    }
}

fn attribute_designator(tag: &BytesStart) -> Result<Expr, PolicyLoadError> {
    let category = required_attr(tag, "AttributeDesignator", "Category")?;
    let id = required_attr(tag, "AttributeDesignator", "AttributeId")?;
    let data_type_uri = required_attr(tag, "AttributeDesignator", "DataType")?;
    let data_type =
        DataType::from_uri(&data_type_uri).ok_or_else(|| PolicyLoadError::UnknownDataType(data_type_uri))?;
    let issuer = attr_value(tag, "Issuer")?;
    let must_be_present = attr_bool(tag, "MustBePresent")?.unwrap_or(false);
    Ok(Expr::AttributeDesignator { category, id, data_type, issuer, must_be_present })
}

fn attribute_selector(tag: &BytesStart) -> Result<Expr, PolicyLoadError> {
    let category = required_attr(tag, "AttributeSelector", "Category")?;
    let path = required_attr(tag, "AttributeSelector", "Path")?;
    let data_type_uri = required_attr(tag, "AttributeSelector", "DataType")?;
    let data_type =
        DataType::from_uri(&data_type_uri).ok_or_else(|| PolicyLoadError::UnknownDataType(data_type_uri))?;
    let must_be_present = attr_bool(tag, "MustBePresent")?.unwrap_or(false);
    Ok(Expr::AttributeSelector { category, path, data_type, must_be_present })
}

fn parse_effect(literal: &str) -> Result<Effect, PolicyLoadError> {
    match literal {
        "Permit" => Ok(Effect::Permit),
        "Deny" => Ok(Effect::Deny),
        other => Err(PolicyLoadError::InvalidEffect(other.to_owned())),
    }
}

/// Skip a `<Description>` (or any other element this loader has no
/// structured use for), discarding its content.
fn skip_element(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<(), PolicyLoadError> {
    consume_to_end(reader, start)
}

/// Drain events until `start`'s matching end tag, ignoring everything read
/// (used for elements — `Description`, self-closing designators read via
/// `Event::Start` rather than `Event::Empty` — whose content doesn't matter
/// beyond balancing the event stream).
fn consume_to_end(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<(), PolicyLoadError> {
    let end = start.to_end();
    expect_end(reader, &end, "element")
}

fn expect_end(reader: &mut Reader<&[u8]>, end: &BytesEnd, context: &'static str) -> Result<(), PolicyLoadError> {
    let mut depth = 0usize;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(tag) if depth == 0 && tag == *end => break,
            Event::End(_) => depth -= 1,
            Event::Eof => {
                return Err(PolicyLoadError::UnexpectedEvent { context, event: "Eof".to_owned() })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn read_text_until(reader: &mut Reader<&[u8]>, end: &BytesEnd) -> Result<String, PolicyLoadError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(t) => text.push_str(&String::from_utf8_lossy(&t.into_inner())),
            Event::End(tag) if &tag == end => break,
            other => {
                return Err(PolicyLoadError::UnexpectedEvent { context: "text content", event: format!("{other:?}") })
            }
        }
        buf.clear();
    }
    Ok(text)
}

fn local_name<'a>(tag: &'a BytesStart) -> &'a [u8] {
    let full = tag.name();
    let full = full.as_ref();
    match full.iter().position(|&b| b == b':') {
        Some(i) => &full[i + 1..],
        None => full,
    }
}

fn name_string(tag: &BytesStart) -> String {
    String::from_utf8_lossy(tag.name().as_ref()).into_owned()
}

fn attr_value(tag: &BytesStart, name: &str) -> Result<Option<String>, PolicyLoadError> {
    for attr in tag.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn attr_bool(tag: &BytesStart, name: &str) -> Result<Option<bool>, PolicyLoadError> {
    Ok(attr_value(tag, name)?.map(|v| v == "true" || v == "1"))
}

fn required_attr(tag: &BytesStart, element: &'static str, attribute: &'static str) -> Result<String, PolicyLoadError> {
    attr_value(tag, attribute)?.ok_or(PolicyLoadError::MissingXmlAttribute { element, attribute })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_permit_policy() {
        let xml = r#"<Policy xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17"
            PolicyId="urn:example:policy:p1"
            RuleCombiningAlgId="urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides">
            <Target/>
            <Rule RuleId="r1" Effect="Permit">
                <Target/>
            </Rule>
        </Policy>"#;
        let doc = parse_policy_document(xml).expect("valid policy");
        let LoadedDocument::Policy(policy) = doc else { panic!("expected a Policy") };
        assert_eq!(policy.policy_id, "urn:example:policy:p1");
        assert_eq!(policy.rules.len(), 1);
    }

    #[test]
    fn parses_target_match_and_condition() {
        let xml = r#"<Policy xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17"
            PolicyId="urn:example:policy:p2"
            RuleCombiningAlgId="urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides">
            <Target>
                <AnyOf>
                    <AllOf>
                        <Match MatchId="urn:oasis:names:tc:xacml:1.0:function:string-equal">
                            <AttributeValue DataType="http://www.w3.org/2001/XMLSchema#string">read</AttributeValue>
                            <AttributeDesignator Category="urn:oasis:names:tc:xacml:3.0:attribute-category:action"
                                AttributeId="urn:oasis:names:tc:xacml:1.0:action:action-id"
                                DataType="http://www.w3.org/2001/XMLSchema#string" MustBePresent="true"/>
                        </Match>
                    </AllOf>
                </AnyOf>
            </Target>
            <Rule RuleId="r1" Effect="Permit">
                <Condition>
                    <Apply FunctionId="urn:oasis:names:tc:xacml:1.0:function:integer-equal">
                        <AttributeValue DataType="http://www.w3.org/2001/XMLSchema#integer">1</AttributeValue>
                        <AttributeValue DataType="http://www.w3.org/2001/XMLSchema#integer">1</AttributeValue>
                    </Apply>
                </Condition>
            </Rule>
        </Policy>"#;
        let doc = parse_policy_document(xml).expect("valid policy");
        let LoadedDocument::Policy(policy) = doc else { panic!("expected a Policy") };
        assert_eq!(policy.target.any_ofs.len(), 1);
        assert!(policy.rules[0].condition.is_some());
    }

    #[test]
    fn unknown_combining_algorithm_is_an_error() {
        let xml = r#"<Policy xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17"
            PolicyId="urn:example:policy:p3" RuleCombiningAlgId="urn:example:not-an-algorithm">
            <Target/>
        </Policy>"#;
        assert!(matches!(parse_policy_document(xml), Err(PolicyLoadError::UnknownAlgorithm(_))));
    }

    #[test]
    fn parses_policy_set_with_reference_child() {
        let xml = r#"<PolicySet xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17"
            PolicySetId="urn:example:policyset:ps1"
            PolicyCombiningAlgId="urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:deny-overrides">
            <Target/>
            <PolicyIdReference>urn:example:policy:p1</PolicyIdReference>
        </PolicySet>"#;
        let doc = parse_policy_document(xml).expect("valid policy set");
        let LoadedDocument::PolicySet(policy_set) = doc else { panic!("expected a PolicySet") };
        assert_eq!(policy_set.children.len(), 1);
        assert!(matches!(policy_set.children[0], PolicySetChild::PolicyIdReference(_)));
    }

    #[test]
    fn parses_obligation_with_assignment() {
        let xml = r#"<Policy xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17"
            PolicyId="urn:example:policy:p4"
            RuleCombiningAlgId="urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides">
            <Target/>
            <Rule RuleId="r1" Effect="Permit"/>
            <ObligationExpressions>
                <ObligationExpression ObligationId="urn:example:obligation:log" FulfillOn="Permit">
                    <AttributeAssignmentExpression AttributeId="urn:example:note">
                        <AttributeValue DataType="http://www.w3.org/2001/XMLSchema#string">granted</AttributeValue>
                    </AttributeAssignmentExpression>
                </ObligationExpression>
            </ObligationExpressions>
        </Policy>"#;
        let doc = parse_policy_document(xml).expect("valid policy");
        let LoadedDocument::Policy(policy) = doc else { panic!("expected a Policy") };
        assert_eq!(policy.obligations.len(), 1);
        assert_eq!(policy.obligations[0].assignments.len(), 1);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_policy_document("<Policy><Target").is_err());
    }
}
