//! I parse XACML 3.0 Request XML into a [`ParsedRequest`] (spec §4.7).
//!
//! Grounded on the same quick-xml event-loop-with-explicit-unexpected-event-
//! errors idiom as `xacml_expr::selector` (itself modeled on a NETCONF XML
//! reader): every nesting level tracks its own end marker and any event that
//! isn't one of the few expected shapes becomes an error, never a silent skip.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use xacml_context::{Attribute, AttributeKey, RequestContextBuilder};
use xacml_value::{DataType, Value};

/// Failure parsing a Request document. Never escapes the PDP boundary —
/// [`crate::pdp::Pdp::evaluate`] maps every variant to
/// `Indeterminate(syntax-error)` (spec §4.7/§7).
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The document was not well-formed XML.
    #[error("malformed request xml: {0}")]
    Xml(#[from] quick_xml::Error),
    /// An event appeared somewhere the grammar doesn't allow it.
    #[error("unexpected xml event while parsing <{context}>: {event:?}")]
    UnexpectedEvent {
        /// The element whose children were being read.
        context: &'static str,
        /// Debug form of the offending event.
        event: String,
    },
    /// The top-level element wasn't `<Request>`.
    #[error("unknown top-level element `{0}`, expected <Request>")]
    UnknownRootElement(String),
    /// `<Attributes Category="...">` omitted its required attribute.
    #[error("<Attributes> missing required `Category` attribute")]
    MissingCategory,
    /// An `<Attribute>` omitted a required XML attribute.
    #[error("<Attribute> missing required `{0}` attribute")]
    MissingXmlAttribute(&'static str),
    /// `DataType` named a uri this engine doesn't recognize.
    #[error("unknown data type uri `{0}`")]
    UnknownDataType(String),
    /// An `<AttributeValue>`'s text didn't parse as its declared data type.
    #[error("invalid value `{literal}` for data type `{data_type}`: {source}")]
    InvalidValue {
        /// The literal text that failed to parse.
        literal: String,
        /// The data type it was supposed to parse as.
        data_type: &'static str,
        /// Underlying parse failure.
        #[source]
        source: xacml_value::ValueParseError,
    },
    /// No `<Request>` element was found at all.
    #[error("document contained no <Request> element")]
    NoRequestElement,
}

/// One attribute the Response must echo back, because its Request element
/// carried `IncludeInResult="true"` (spec §6).
#[derive(Debug, Clone)]
pub struct EchoedAttribute {
    /// Attribute category uri.
    pub category: String,
    /// Attribute id uri.
    pub id: String,
    /// Declared data type.
    pub data_type: DataType,
    /// Issuer, if named.
    pub issuer: Option<String>,
    /// Supplied values.
    pub values: Vec<Value>,
}

/// The result of parsing a Request document: a not-yet-finalized attribute
/// store builder (the caller still attaches attribute-finder modules) plus
/// the attributes the Response must echo.
pub struct ParsedRequest {
    /// Builder for the evaluation's [`xacml_context::RequestContext`].
    pub builder: RequestContextBuilder,
    /// Attributes to echo back in the Response.
    pub echoed: Vec<EchoedAttribute>,
    /// The Request's own `ReturnPolicyIdList` attribute, if it named one.
    /// `None` means the caller's configured default applies.
    pub return_policy_id_list_attr: Option<bool>,
    /// The Request's own `CombinedDecision` attribute, if it named one.
    /// `None` means the caller's configured default applies.
    pub combined_decision_attr: Option<bool>,
}

/// Parse a Request document (spec §4.7).
#[tracing::instrument(skip_all)]
pub fn parse_request_xml(xml: &str) -> Result<ParsedRequest, RequestError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut builder = RequestContextBuilder::new();
    let mut echoed = Vec::new();
    let mut found_request = false;
    let mut return_policy_id_list_attr = None;
    let mut combined_decision_attr = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"Request" => {
                found_request = true;
                return_policy_id_list_attr = attr_bool(&tag, "ReturnPolicyIdList")?;
                combined_decision_attr = attr_bool(&tag, "CombinedDecision")?;
                builder = builder
                    .return_policy_id_list(return_policy_id_list_attr.unwrap_or(false))
                    .combined_decision(combined_decision_attr.unwrap_or(false));
                parse_request_body(&mut reader, &tag, &mut builder, &mut echoed)?;
            }
            Event::Start(tag) => return Err(RequestError::UnknownRootElement(name_string(&tag))),
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => continue,
            Event::Eof => break,
            other => {
                return Err(RequestError::UnexpectedEvent {
                    context: "document",
                    event: format!("{other:?}"),
                })
            }
        }
        buf.clear();
    }

    if !found_request {
        return Err(RequestError::NoRequestElement);
    }
    Ok(ParsedRequest { builder, echoed, return_policy_id_list_attr, combined_decision_attr })
}

fn parse_request_body(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    builder: &mut RequestContextBuilder,
    echoed: &mut Vec<EchoedAttribute>,
) -> Result<(), RequestError> {
    let end = start.to_end();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"Attributes" => {
                parse_attributes_group(reader, &tag, builder, echoed)?;
            }
            Event::Empty(tag) if local_name(&tag) == b"Attributes" => {
                attr_value(&tag, "Category")?.ok_or(RequestError::MissingCategory)?;
            }
            Event::End(tag) if tag == end => break,
            Event::Comment(_) => continue,
            other => {
                return Err(RequestError::UnexpectedEvent {
                    context: "Request",
                    event: format!("{other:?}"),
                })
            }
        }
        buf.clear();
    }
    Ok(())
}

fn parse_attributes_group(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    builder: &mut RequestContextBuilder,
    echoed: &mut Vec<EchoedAttribute>,
) -> Result<(), RequestError> {
    let category = attr_value(start, "Category")?.ok_or(RequestError::MissingCategory)?;
    let end = start.to_end();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"Attribute" => {
                parse_attribute(reader, &tag, &category, builder, echoed)?;
            }
            Event::Start(tag) if local_name(&tag) == b"Content" => {
                let content_end = tag.to_end();
                let content_xml = capture_inner_xml(reader, &content_end)?;
                *builder = std::mem::replace(builder, RequestContextBuilder::new())
                    .with_content(category.clone(), content_xml);
            }
            Event::End(tag) if tag == end => break,
            Event::Comment(_) => continue,
            other => {
                return Err(RequestError::UnexpectedEvent {
                    context: "Attributes",
                    event: format!("{other:?}"),
                })
            }
        }
        buf.clear();
    }
    Ok(())
}

fn parse_attribute(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    category: &str,
    builder: &mut RequestContextBuilder,
    echoed: &mut Vec<EchoedAttribute>,
) -> Result<(), RequestError> {
    let id = attr_value(start, "AttributeId")?.ok_or(RequestError::MissingXmlAttribute("AttributeId"))?;
    let data_type_uri =
        attr_value(start, "DataType")?.ok_or(RequestError::MissingXmlAttribute("DataType"))?;
    let data_type =
        DataType::from_uri(&data_type_uri).ok_or_else(|| RequestError::UnknownDataType(data_type_uri.clone()))?;
    let issuer = attr_value(start, "Issuer")?;
    let include_in_result = attr_bool(start, "IncludeInResult")?.unwrap_or(false);

    let end = start.to_end();
    let mut values = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if local_name(&tag) == b"AttributeValue" => {
                let value_end = tag.to_end();
                let literal = read_text_until(reader, &value_end)?;
                values.push(Value::parse(data_type, literal.trim()).map_err(|source| {
                    RequestError::InvalidValue { literal: literal.clone(), data_type: data_type.uri(), source }
                })?);
            }
            Event::Empty(tag) if local_name(&tag) == b"AttributeValue" => {
                values.push(Value::parse(data_type, "").map_err(|source| RequestError::InvalidValue {
                    literal: String::new(),
                    data_type: data_type.uri(),
                    source,
                })?);
            }
            Event::End(tag) if tag == end => break,
            other => {
                return Err(RequestError::UnexpectedEvent {
                    context: "Attribute",
                    event: format!("{other:?}"),
                })
            }
        }
        buf.clear();
    }

    let key = AttributeKey::new(category.to_owned(), id.clone(), data_type, issuer.clone());
    let mut attribute = Attribute::new(key, xacml_value::Bag::from_values(values.iter().cloned()));
    attribute.include_in_result = include_in_result;
    *builder = std::mem::replace(builder, RequestContextBuilder::new()).add_attribute(attribute);

    if include_in_result {
        echoed.push(EchoedAttribute { category: category.to_owned(), id, data_type, issuer, values });
    }
    Ok(())
}

/// Read plain text content up to `end`, erroring on any nested element
/// (an `<AttributeValue>` is XACML-simple-content only; it never nests tags).
fn read_text_until(reader: &mut Reader<&[u8]>, end: &quick_xml::events::BytesEnd) -> Result<String, RequestError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(t) => text.push_str(&String::from_utf8_lossy(&t.into_inner())),
            Event::End(tag) if &tag == end => break,
            other => {
                return Err(RequestError::UnexpectedEvent {
                    context: "AttributeValue",
                    event: format!("{other:?}"),
                })
            }
        }
        buf.clear();
    }
    Ok(text)
}

/// Re-serialize every event between here and `end` (exclusive), yielding the
/// `<Content>` fragment's child XML exactly as written — the form
/// `xacml_expr::selector::select` expects.
fn capture_inner_xml(reader: &mut Reader<&[u8]>, end: &quick_xml::events::BytesEnd) -> Result<String, RequestError> {
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::End(tag) if &tag == end => break,
            event => {
                writer.write_event(event).map_err(RequestError::Xml)?;
            }
        }
        buf.clear();
    }
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn local_name<'a>(tag: &'a BytesStart) -> &'a [u8] {
    let name = tag.name();
    let full = name.as_ref();
    match full.iter().position(|&b| b == b':') {
        Some(i) => &full[i + 1..],
        None => full,
    }
}

fn name_string(tag: &BytesStart) -> String {
    String::from_utf8_lossy(tag.name().as_ref()).into_owned()
}

fn attr_value(tag: &BytesStart, name: &str) -> Result<Option<String>, RequestError> {
    for attr in tag.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn attr_bool(tag: &BytesStart, name: &str) -> Result<Option<bool>, RequestError> {
    Ok(attr_value(tag, name)?.map(|v| v == "true" || v == "1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subject_attribute_and_flags() {
        let xml = r#"<Request xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17" ReturnPolicyIdList="true">
            <Attributes Category="urn:oasis:names:tc:xacml:3.0:attribute-category:subject">
                <Attribute AttributeId="urn:oasis:names:tc:xacml:1.0:subject:subject-id"
                           DataType="http://www.w3.org/2001/XMLSchema#string" IncludeInResult="true">
                    <AttributeValue>alice</AttributeValue>
                </Attribute>
            </Attributes>
        </Request>"#;
        let parsed = parse_request_xml(xml).expect("valid request");
        assert_eq!(parsed.echoed.len(), 1);
        assert_eq!(parsed.echoed[0].id, "urn:oasis:names:tc:xacml:1.0:subject:subject-id");
        let ctx = parsed.builder.build();
        assert!(ctx.return_policy_id_list);
        assert!(!ctx.combined_decision);
    }

    #[test]
    fn unknown_data_type_is_an_error() {
        let xml = r#"<Request xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17">
            <Attributes Category="urn:example:subject">
                <Attribute AttributeId="urn:example:id" DataType="urn:example:not-a-type">
                    <AttributeValue>x</AttributeValue>
                </Attribute>
            </Attributes>
        </Request>"#;
        assert!(matches!(parse_request_xml(xml), Err(RequestError::UnknownDataType(_))));
    }

    #[test]
    fn content_fragment_is_captured_verbatim() {
        let xml = r#"<Request xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17">
            <Attributes Category="urn:example:resource">
                <Content><record><age>42</age></record></Content>
            </Attributes>
        </Request>"#;
        let parsed = parse_request_xml(xml).expect("valid request");
        let ctx = parsed.builder.build();
        let content = ctx.get_content("urn:example:resource").expect("content registered");
        assert!(content.contains("<age>42</age>"));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let xml = "<Request><Attributes";
        assert!(parse_request_xml(xml).is_err());
    }
}
