//! I evaluate the minimal XPath subset spec §4.3/§C.2 asks of
//! `AttributeSelector`: an absolute path of element names, each segment
//! matching one level of nesting in a `<Content>` fragment, with the matched
//! leaf elements' text content parsed as the selector's declared data type.
//!
//! This isn't a general XPath engine — just the "descend through named
//! children, collect text" shape real `AttributeSelector` paths use in
//! practice (quick-xml event-loop idiom grounded on a NETCONF XML reader).

use quick_xml::events::Event;
use quick_xml::Reader;
use xacml_value::{Bag, DataType, MixedDataTypesError, Value, ValueParseError};

/// Error evaluating an `AttributeSelector` path against a `<Content>` fragment.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SelectorError {
    /// The path was empty (`/` or `""`).
    #[error("AttributeSelector path must name at least one element")]
    EmptyPath,
    /// The `<Content>` fragment was not well-formed XML.
    #[error("malformed <Content>: {0}")]
    Xml(String),
    /// A matched leaf's text failed to parse as the selector's data type.
    #[error(transparent)]
    InvalidValue(#[from] ValueParseError),
    /// Matched leaves did not share a single data type.
    #[error(transparent)]
    MixedTypes(#[from] MixedDataTypesError),
}

/// Evaluate `path` against `xml`, parsing every matched leaf's text as
/// `data_type`. A path with no matches yields an empty bag, not an error —
/// callers decide whether that's acceptable via `MustBePresent`.
pub fn select(xml: &str, path: &str, data_type: DataType) -> Result<Bag, SelectorError> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(SelectorError::EmptyPath);
    }

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut stack: Vec<String> = Vec::new();
    let mut matched_depth: Option<usize> = None;
    let mut values = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(tag)) => {
                stack.push(local_name(tag.name().as_ref()));
                if stack_matches(&stack, &segments) {
                    matched_depth = Some(stack.len());
                }
            }
            Ok(Event::Empty(_)) => {
                // A self-closing matched leaf has no text; nothing to collect.
            }
            Ok(Event::Text(text)) => {
                if matched_depth == Some(stack.len()) {
                    let unescaped = text.unescape().map_err(|e| SelectorError::Xml(e.to_string()))?;
                    values.push(Value::parse(data_type, unescaped.trim())?);
                }
            }
            Ok(Event::End(_)) => {
                if matched_depth == Some(stack.len()) {
                    matched_depth = None;
                }
                stack.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SelectorError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(Bag::try_from_values(values)?)
}

fn local_name(qname: &[u8]) -> String {
    let name = std::str::from_utf8(qname).unwrap_or_default();
    name.rsplit(':').next().unwrap_or(name).to_owned()
}

fn stack_matches(stack: &[String], segments: &[&str]) -> bool {
    stack.len() == segments.len() && stack.iter().zip(segments).all(|(s, seg)| s == seg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_matching_leaf_text() {
        let xml = r#"<root><record><age>42</age></record></root>"#;
        let bag = select(xml, "/root/record/age", DataType::Integer).unwrap();
        assert_eq!(bag.size(), 1);
        assert_eq!(bag.one_and_only().unwrap(), &Value::Integer(42.into()));
    }

    #[test]
    fn collects_every_repeated_leaf() {
        let xml = r#"<root><record><tag>a</tag><tag>b</tag></record></root>"#;
        let bag = select(xml, "/root/record/tag", DataType::String).unwrap();
        assert_eq!(bag.size(), 2);
    }

    #[test]
    fn non_matching_path_yields_empty_bag() {
        let xml = r#"<root><record><age>42</age></record></root>"#;
        let bag = select(xml, "/root/record/missing", DataType::Integer).unwrap();
        assert!(bag.is_empty());
    }

    #[test]
    fn empty_path_is_an_error() {
        assert!(select("<root/>", "/", DataType::String).is_err());
    }
}
