//! I serialize a [`Response`] to XACML 3.0 Response XML (spec §4.6/§6).

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use xacml_policy::{Decision, ResolvedAdvice, ResolvedObligation};
use xacml_value::{Status, StatusCode};

use crate::xml::request::EchoedAttribute;

/// The outcome of one `evaluate` call, ready to serialize (spec §4.6).
#[derive(Debug, Clone)]
pub struct Response {
    /// Final decision.
    pub decision: Decision,
    /// Obligations fired for this decision.
    pub obligations: Vec<ResolvedObligation>,
    /// Advice fired for this decision.
    pub advice: Vec<ResolvedAdvice>,
    /// Attributes the Request marked `IncludeInResult="true"`.
    pub echoed_attributes: Vec<EchoedAttribute>,
    /// Ids of policies/policy sets that contributed, if `ReturnPolicyIdList`
    /// was set on the Request.
    pub policy_identifiers: Option<Vec<String>>,
}

/// Serialize `response` to a complete XACML 3.0 Response document.
pub fn write_response_xml(response: &Response) -> String {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut root = BytesStart::new("Response");
    root.push_attribute(("xmlns", "urn:oasis:names:tc:xacml:3.0:core:schema:wd-17"));
    writer.write_event(Event::Start(root)).expect("in-memory write never fails");

    write_result(&mut writer, response);

    writer
        .write_event(Event::End(BytesEnd::new("Response")))
        .expect("in-memory write never fails");
    String::from_utf8(writer.into_inner()).expect("writer only ever emits utf-8")
}

fn write_result(writer: &mut Writer<Vec<u8>>, response: &Response) {
    writer.write_event(Event::Start(BytesStart::new("Result"))).unwrap();

    write_text_element(writer, "Decision", decision_string(&response.decision));
    write_status(writer, &response.decision.status());

    if !response.obligations.is_empty() {
        write_obligations(writer, response);
    }
    if !response.advice.is_empty() {
        write_advice(writer, response);
    }
    if !response.echoed_attributes.is_empty() {
        write_echoed_attributes(writer, response);
    }
    if let Some(ids) = &response.policy_identifiers {
        write_policy_identifiers(writer, ids);
    }

    writer.write_event(Event::End(BytesEnd::new("Result"))).unwrap();
}

fn decision_string(decision: &Decision) -> &'static str {
    match decision {
        Decision::Permit => "Permit",
        Decision::Deny => "Deny",
        Decision::NotApplicable => "NotApplicable",
        Decision::IndeterminateD(_) | Decision::IndeterminateP(_) | Decision::IndeterminateDP(_) => "Indeterminate",
    }
}

fn write_status(writer: &mut Writer<Vec<u8>>, status: &Status) {
    writer.write_event(Event::Start(BytesStart::new("Status"))).unwrap();
    let mut code = BytesStart::new("StatusCode");
    code.push_attribute(("Value", status_code_uri(&status.code)));
    writer.write_event(Event::Empty(code)).unwrap();
    if let Some(message) = &status.message {
        write_text_element(writer, "StatusMessage", message);
    }
    writer.write_event(Event::End(BytesEnd::new("Status"))).unwrap();
}

fn status_code_uri(code: &StatusCode) -> &str {
    code.uri()
}

fn write_obligations(writer: &mut Writer<Vec<u8>>, response: &Response) {
    writer.write_event(Event::Start(BytesStart::new("Obligations"))).unwrap();
    for obligation in &response.obligations {
        let mut tag = BytesStart::new("Obligation");
        tag.push_attribute(("ObligationId", obligation.obligation_id.as_str()));
        writer.write_event(Event::Start(tag)).unwrap();
        for assignment in &obligation.assignments {
            write_assignment(writer, &assignment.attribute_id, &assignment.category, &assignment.values);
        }
        writer.write_event(Event::End(BytesEnd::new("Obligation"))).unwrap();
    }
    writer.write_event(Event::End(BytesEnd::new("Obligations"))).unwrap();
}

fn write_advice(writer: &mut Writer<Vec<u8>>, response: &Response) {
    writer.write_event(Event::Start(BytesStart::new("AssociatedAdvice"))).unwrap();
    for advice in &response.advice {
        let mut tag = BytesStart::new("Advice");
        tag.push_attribute(("AdviceId", advice.advice_id.as_str()));
        writer.write_event(Event::Start(tag)).unwrap();
        for assignment in &advice.assignments {
            write_assignment(writer, &assignment.attribute_id, &assignment.category, &assignment.values);
        }
        writer.write_event(Event::End(BytesEnd::new("Advice"))).unwrap();
    }
    writer.write_event(Event::End(BytesEnd::new("AssociatedAdvice"))).unwrap();
}

fn write_assignment(
    writer: &mut Writer<Vec<u8>>,
    attribute_id: &str,
    category: &Option<String>,
    values: &[xacml_value::Value],
) {
    for value in values {
        let mut tag = BytesStart::new("AttributeAssignment");
        tag.push_attribute(("AttributeId", attribute_id));
        tag.push_attribute(("DataType", value.data_type().uri()));
        if let Some(category) = category {
            tag.push_attribute(("Category", category.as_str()));
        }
        writer.write_event(Event::Start(tag)).unwrap();
        writer
            .write_event(Event::Text(BytesText::new(&value.to_canonical_string())))
            .unwrap();
        writer.write_event(Event::End(BytesEnd::new("AttributeAssignment"))).unwrap();
    }
}

fn write_echoed_attributes(writer: &mut Writer<Vec<u8>>, response: &Response) {
    let mut by_category: Vec<(&str, Vec<&EchoedAttribute>)> = Vec::new();
    for attr in &response.echoed_attributes {
        match by_category.iter_mut().find(|(c, _)| *c == attr.category) {
            Some((_, group)) => group.push(attr),
            None => by_category.push((attr.category.as_str(), vec![attr])),
        }
    }

    for (category, attrs) in by_category {
        let mut group = BytesStart::new("Attributes");
        group.push_attribute(("Category", category));
        writer.write_event(Event::Start(group)).unwrap();
        for attr in attrs {
            let mut tag = BytesStart::new("Attribute");
            tag.push_attribute(("AttributeId", attr.id.as_str()));
            tag.push_attribute(("DataType", attr.data_type.uri()));
            tag.push_attribute(("IncludeInResult", "true"));
            if let Some(issuer) = &attr.issuer {
                tag.push_attribute(("Issuer", issuer.as_str()));
            }
            writer.write_event(Event::Start(tag)).unwrap();
            for value in &attr.values {
                writer.write_event(Event::Start(BytesStart::new("AttributeValue"))).unwrap();
                writer
                    .write_event(Event::Text(BytesText::new(&value.to_canonical_string())))
                    .unwrap();
                writer.write_event(Event::End(BytesEnd::new("AttributeValue"))).unwrap();
            }
            writer.write_event(Event::End(BytesEnd::new("Attribute"))).unwrap();
        }
        writer.write_event(Event::End(BytesEnd::new("Attributes"))).unwrap();
    }
}

fn write_policy_identifiers(writer: &mut Writer<Vec<u8>>, ids: &[String]) {
    writer.write_event(Event::Start(BytesStart::new("PolicyIdentifierList"))).unwrap();
    for id in ids {
        write_text_element(writer, "PolicyIdReference", id);
    }
    writer.write_event(Event::End(BytesEnd::new("PolicyIdentifierList"))).unwrap();
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: impl AsRef<str>) {
    writer.write_event(Event::Start(BytesStart::new(name))).unwrap();
    writer.write_event(Event::Text(BytesText::new(text.as_ref()))).unwrap();
    writer.write_event(Event::End(BytesEnd::new(name))).unwrap();
}

#[cfg(test)]
mod tests {
    use xacml_value::Status;

    use super::*;

    #[test]
    fn permit_with_no_extras_serializes_minimally() {
        let response = Response {
            decision: Decision::Permit,
            obligations: vec![],
            advice: vec![],
            echoed_attributes: vec![],
            policy_identifiers: None,
        };
        let xml = write_response_xml(&response);
        assert!(xml.contains("<Decision>Permit</Decision>"));
        assert!(!xml.contains("Obligations"));
    }

    #[test]
    fn indeterminate_carries_its_status_message() {
        let response = Response {
            decision: Decision::IndeterminateP(Status::processing_error("boom")),
            obligations: vec![],
            advice: vec![],
            echoed_attributes: vec![],
            policy_identifiers: None,
        };
        let xml = write_response_xml(&response);
        assert!(xml.contains("<Decision>Indeterminate</Decision>"));
        assert!(xml.contains("boom"));
    }
}
