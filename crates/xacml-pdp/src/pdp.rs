//! The PDP orchestrator (spec §4.1/§4.6): loads a batch of Policy/PolicySet
//! documents, resolves every `<PolicyIdReference>`/`<PolicySetIdReference>`
//! against that batch, and evaluates Requests against the result.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use xacml_context::finder::EnvironmentFinder;
use xacml_expr::{variables::VariableScope, EvalContext};
use xacml_policy::{Algorithm, Decision, Effect, PolicySet, PolicySetChild};
use xacml_value::Status;

use crate::bloom::PolicyBloomFilter;
use crate::config::PdpConfig;
use crate::error::PdpLoadError;
use crate::xml::policy::{parse_policy_document, LoadedDocument};
use crate::xml::request::parse_request_xml;
use crate::xml::response::{write_response_xml, Response};

/// A XACML 3.0 Policy Decision Point: an immutable, `Clone`-able set of
/// loaded Policy/PolicySet documents plus the configuration governing how
/// they combine (spec §4.1). Cheap to clone — everything behind an `Arc`.
#[derive(Clone)]
pub struct Pdp {
    inner: Arc<PdpInner>,
}

struct PdpInner {
    roots: Vec<LoadedRoot>,
    root_algorithm: Algorithm,
    default_timezone: chrono::FixedOffset,
    default_return_policy_id_list: bool,
    default_combined_decision: bool,
}

enum LoadedPolicyRoot {
    Policy(Arc<xacml_policy::Policy>),
    PolicySet(Arc<PolicySet>),
}

/// A loaded root plus the Bloom pre-filter built for it, if the PDP was
/// configured to build one (spec §9 — purely advisory, see [`PolicyBloomFilter`]).
struct LoadedRoot {
    root: LoadedPolicyRoot,
    bloom: Option<PolicyBloomFilter>,
}

impl Pdp {
    /// Parse every document in `sources` (each paired with a name used only
    /// for error messages) plus every `*.xml` file found under
    /// `config.policy_source_directories`, resolve every cross-document
    /// reference, and build an evaluation-ready `Pdp`. Aborts on the first
    /// failure — a PDP never starts in a half-loaded state (spec §7).
    #[tracing::instrument(skip_all)]
    pub fn load<'a, I>(sources: I, config: PdpConfig) -> Result<Self, PdpLoadError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let root_algorithm = config.root_algorithm()?;

        let mut policies: HashMap<String, Arc<xacml_policy::Policy>> = HashMap::new();
        let mut policy_sets: HashMap<String, Arc<PolicySet>> = HashMap::new();
        let mut load_order = Vec::new();

        for (name, xml) in sources {
            load_one(name, xml, &mut policies, &mut policy_sets, &mut load_order)?;
        }

        for directory in &config.policy_source_directories {
            for (path, xml) in read_policy_directory(directory)? {
                load_one(&path, &xml, &mut policies, &mut policy_sets, &mut load_order)?;
            }
        }

        for policy_set in policy_sets.values() {
            resolve_children(policy_set, &policies, &policy_sets)?;
        }

        info!(policies = policies.len(), policy_sets = policy_sets.len(), "policy documents loaded");

        let build_bloom = config.enable_bloom_prefilter;
        let roots = load_order
            .into_iter()
            .map(|root| {
                let bloom = build_bloom.then(|| match &root {
                    LoadedPolicyRoot::Policy(policy) => PolicyBloomFilter::for_policy(&policy.target),
                    LoadedPolicyRoot::PolicySet(policy_set) => PolicyBloomFilter::for_policy_set(policy_set),
                });
                LoadedRoot { root, bloom }
            })
            .collect();

        Ok(Self {
            inner: Arc::new(PdpInner {
                roots,
                root_algorithm,
                default_timezone: config.default_timezone(),
                default_return_policy_id_list: config.default_return_policy_id_list,
                default_combined_decision: config.default_combined_decision,
            }),
        })
    }

    /// Evaluate one Request document against every loaded root, combining
    /// their decisions with the configured root algorithm, and serialize
    /// the result (spec §4.6). Never panics or propagates an error out of
    /// the XACML decision boundary: malformed input becomes an
    /// `Indeterminate` Response, per spec §7's fail-closed contract.
    #[tracing::instrument(skip_all)]
    pub async fn evaluate(&self, request_xml: &str) -> String {
        let parsed = match parse_request_xml(request_xml) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "request failed to parse");
                return write_response_xml(&Response {
                    decision: Decision::IndeterminateDP(Status::syntax_error(e.to_string())),
                    obligations: vec![],
                    advice: vec![],
                    echoed_attributes: vec![],
                    policy_identifiers: None,
                });
            }
        };

        let now = Utc::now().with_timezone(&self.inner.default_timezone);
        let return_policy_id_list =
            parsed.return_policy_id_list_attr.unwrap_or(self.inner.default_return_policy_id_list);
        let combined_decision =
            parsed.combined_decision_attr.unwrap_or(self.inner.default_combined_decision);
        let request = parsed
            .builder
            .with_finder(Box::new(EnvironmentFinder::new(now)))
            .return_policy_id_list(return_policy_id_list)
            .combined_decision(combined_decision)
            .build();
        let variables = VariableScope::empty();
        let ctx = EvalContext { request: &request, default_tz: self.inner.default_timezone, variables: &variables };

        let mut decisions = Vec::with_capacity(self.inner.roots.len());
        let mut root_obligations = Vec::new();
        let mut root_advice = Vec::new();
        let mut policy_identifiers = Vec::new();

        for loaded in &self.inner.roots {
            if let Some(bloom) = &loaded.bloom {
                if !bloom.maybe_applicable(&request).await {
                    decisions.push(Decision::NotApplicable);
                    continue;
                }
            }
            let evaluation = match &loaded.root {
                LoadedPolicyRoot::Policy(policy) => policy.evaluate(&ctx).await,
                LoadedPolicyRoot::PolicySet(policy_set) => policy_set.evaluate(&ctx).await,
            };
            let root_effect = match evaluation.decision {
                Decision::Permit => Some(Effect::Permit),
                Decision::Deny => Some(Effect::Deny),
                _ => None,
            };
            decisions.push(evaluation.decision.clone());
            if let Some(effect) = root_effect {
                root_obligations.extend(evaluation.obligations.into_iter().map(|o| (effect, o)));
                root_advice.extend(evaluation.advice.into_iter().map(|a| (effect, a)));
            }
            policy_identifiers.extend(evaluation.policy_identifiers);
        }

        let decision = self.inner.root_algorithm.combine(decisions);
        // Only obligations/advice from roots whose own effect agrees with the
        // final combined decision survive (spec §4.5: never leak the losing
        // side's obligations into a Response).
        let final_effect = match decision {
            Decision::Permit => Some(Effect::Permit),
            Decision::Deny => Some(Effect::Deny),
            _ => None,
        };
        let obligations = match final_effect {
            Some(effect) => root_obligations.into_iter().filter(|(e, _)| *e == effect).map(|(_, o)| o).collect(),
            None => Vec::new(),
        };
        let advice = match final_effect {
            Some(effect) => root_advice.into_iter().filter(|(e, _)| *e == effect).map(|(_, a)| a).collect(),
            None => Vec::new(),
        };

        write_response_xml(&Response {
            decision,
            obligations,
            advice,
            echoed_attributes: parsed.echoed,
            policy_identifiers: return_policy_id_list.then_some(policy_identifiers),
        })
    }
}

fn load_one(
    name: &str,
    xml: &str,
    policies: &mut HashMap<String, Arc<xacml_policy::Policy>>,
    policy_sets: &mut HashMap<String, Arc<PolicySet>>,
    load_order: &mut Vec<LoadedPolicyRoot>,
) -> Result<(), PdpLoadError> {
    let document = parse_policy_document(xml)
        .map_err(|source| PdpLoadError::Parse { source_name: name.to_owned(), source })?;
    let id = document.id().to_owned();
    match document {
        LoadedDocument::Policy(policy) => {
            if policies.insert(id.clone(), policy.clone()).is_some() {
                return Err(PdpLoadError::DuplicateId(id));
            }
            load_order.push(LoadedPolicyRoot::Policy(policy));
        }
        LoadedDocument::PolicySet(policy_set) => {
            if policy_sets.insert(id.clone(), policy_set.clone()).is_some() {
                return Err(PdpLoadError::DuplicateId(id));
            }
            load_order.push(LoadedPolicyRoot::PolicySet(policy_set));
        }
    }
    Ok(())
}

/// Read every `*.xml` file directly under `directory`, sorted by filename
/// for deterministic load order.
fn read_policy_directory(directory: &str) -> Result<Vec<(String, String)>, PdpLoadError> {
    let dir = Path::new(directory);
    let mut entries: Vec<_> = fs::read_dir(dir)
        .map_err(|source| PdpLoadError::Io { path: directory.to_owned(), source })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("xml"))
        .collect();
    entries.sort();

    entries
        .into_iter()
        .map(|path| {
            let xml = fs::read_to_string(&path)
                .map_err(|source| PdpLoadError::Io { path: path.display().to_string(), source })?;
            Ok((path.display().to_string(), xml))
        })
        .collect()
}

fn resolve_children(
    policy_set: &PolicySet,
    policies: &HashMap<String, Arc<xacml_policy::Policy>>,
    policy_sets: &HashMap<String, Arc<PolicySet>>,
) -> Result<(), PdpLoadError> {
    for child in &policy_set.children {
        match child {
            PolicySetChild::PolicyIdReference(reference) => {
                let target = policies
                    .get(&reference.policy_id)
                    .cloned()
                    .ok_or_else(|| PdpLoadError::DanglingReference(reference.policy_id.clone()))?;
                reference.resolve(target);
            }
            PolicySetChild::PolicySetIdReference(reference) => {
                let target = policy_sets
                    .get(&reference.policy_set_id)
                    .cloned()
                    .ok_or_else(|| PdpLoadError::DanglingReference(reference.policy_set_id.clone()))?;
                reference.resolve(target);
            }
            PolicySetChild::PolicySet(nested) => resolve_children(nested, policies, policy_sets)?,
            PolicySetChild::Policy(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERMIT_POLICY: &str = r#"<Policy xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17"
        PolicyId="urn:example:policy:permit-all"
        RuleCombiningAlgId="urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides">
        <Target/>
        <Rule RuleId="r1" Effect="Permit"><Target/></Rule>
    </Policy>"#;

    const DENY_POLICY: &str = r#"<Policy xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17"
        PolicyId="urn:example:policy:deny-all"
        RuleCombiningAlgId="urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides">
        <Target/>
        <Rule RuleId="r1" Effect="Deny"><Target/></Rule>
    </Policy>"#;

    const PERMIT_POLICY_WITH_OBLIGATION: &str = r#"<Policy xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17"
        PolicyId="urn:example:policy:permit-with-obligation"
        RuleCombiningAlgId="urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides">
        <Target/>
        <Rule RuleId="r1" Effect="Permit"><Target/></Rule>
        <ObligationExpressions>
            <ObligationExpression ObligationId="urn:example:obligation:on-permit" FulfillOn="Permit"></ObligationExpression>
        </ObligationExpressions>
    </Policy>"#;

    const MINIMAL_REQUEST: &str = r#"<Request xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17">
        <Attributes Category="urn:oasis:names:tc:xacml:3.0:attribute-category:action">
            <Attribute AttributeId="urn:oasis:names:tc:xacml:1.0:action:action-id"
                DataType="http://www.w3.org/2001/XMLSchema#string" IncludeInResult="false">
                <AttributeValue DataType="http://www.w3.org/2001/XMLSchema#string">read</AttributeValue>
            </Attribute>
        </Attributes>
    </Request>"#;

    #[tokio::test]
    async fn single_permit_policy_yields_permit() {
        let pdp = Pdp::load(
            [("permit-all.xml", PERMIT_POLICY)],
            PdpConfig::default(),
        )
        .expect("valid load batch");
        let response = pdp.evaluate(MINIMAL_REQUEST).await;
        assert!(response.contains("<Decision>Permit</Decision>"));
    }

    #[tokio::test]
    async fn deny_overrides_root_algorithm_prefers_deny() {
        let pdp = Pdp::load(
            [("permit-all.xml", PERMIT_POLICY), ("deny-all.xml", DENY_POLICY)],
            PdpConfig::default(),
        )
        .expect("valid load batch");
        let response = pdp.evaluate(MINIMAL_REQUEST).await;
        assert!(response.contains("<Decision>Deny</Decision>"));
    }

    #[tokio::test]
    async fn malformed_request_is_indeterminate_not_a_panic() {
        let pdp = Pdp::load([("permit-all.xml", PERMIT_POLICY)], PdpConfig::default()).expect("valid load batch");
        let response = pdp.evaluate("<Request><Attributes").await;
        assert!(response.contains("Indeterminate"));
    }

    #[test]
    fn duplicate_policy_id_is_rejected() {
        let result = Pdp::load(
            [("a.xml", PERMIT_POLICY), ("b.xml", PERMIT_POLICY)],
            PdpConfig::default(),
        );
        assert!(matches!(result, Err(PdpLoadError::DuplicateId(_))));
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let policy_set = r#"<PolicySet xmlns="urn:oasis:names:tc:xacml:3.0:core:schema:wd-17"
            PolicySetId="urn:example:policyset:ps1"
            PolicyCombiningAlgId="urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:deny-overrides">
            <Target/>
            <PolicyIdReference>urn:example:policy:never-loaded</PolicyIdReference>
        </PolicySet>"#;
        let result = Pdp::load([("ps.xml", policy_set)], PdpConfig::default());
        assert!(matches!(result, Err(PdpLoadError::DanglingReference(_))));
    }

    #[tokio::test]
    async fn deny_overriding_root_drops_the_permitting_roots_obligation() {
        let pdp = Pdp::load(
            [("permit-with-obligation.xml", PERMIT_POLICY_WITH_OBLIGATION), ("deny-all.xml", DENY_POLICY)],
            PdpConfig::default(),
        )
        .expect("valid load batch");
        let response = pdp.evaluate(MINIMAL_REQUEST).await;
        assert!(response.contains("<Decision>Deny</Decision>"));
        assert!(!response.contains("Obligations"));
    }

    #[tokio::test]
    async fn bloom_prefilter_does_not_change_the_decision() {
        let config = PdpConfig { enable_bloom_prefilter: true, ..PdpConfig::default() };
        let pdp = Pdp::load([("permit-all.xml", PERMIT_POLICY)], config).expect("valid load batch");
        let response = pdp.evaluate(MINIMAL_REQUEST).await;
        assert!(response.contains("<Decision>Permit</Decision>"));
    }

    #[tokio::test]
    async fn config_default_return_policy_id_list_applies_when_request_omits_it() {
        let config = PdpConfig { default_return_policy_id_list: true, ..PdpConfig::default() };
        let pdp = Pdp::load([("permit-all.xml", PERMIT_POLICY)], config).expect("valid load batch");
        let response = pdp.evaluate(MINIMAL_REQUEST).await;
        assert!(response.contains("<PolicyIdentifierList"));
    }

    #[test]
    fn loads_policies_from_a_directory() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("xacml-pdp-test-{nanos}"));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        std::fs::write(dir.join("permit-all.xml"), PERMIT_POLICY).expect("write fixture");
        let config = PdpConfig {
            policy_source_directories: vec![dir.to_string_lossy().into_owned()],
            ..PdpConfig::default()
        };
        let result = Pdp::load(std::iter::empty::<(&str, &str)>(), config);
        std::fs::remove_dir_all(&dir).ok();
        assert!(result.is_ok());
    }
}
