//! I define [`Algorithm`] — the eight rule/policy combining algorithms spec
//! §4.5 names (six base algorithms, each with an `ordered-` URI variant that
//! shares this crate's always-document-order evaluation and so needs no
//! separate implementation — only a distinct registered id).

use xacml_value::Status;

use crate::decision::Decision;

/// A combining algorithm, resolved once at policy-load time from its URI
/// (spec §4.5). `ordered-*` ids resolve to the same variant as their
/// unordered counterpart: every combinator here evaluates children in the
/// order given, which already satisfies `ordered-*`'s stronger requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// `deny-overrides` / `ordered-deny-overrides`.
    DenyOverrides,
    /// `permit-overrides` / `ordered-permit-overrides`.
    PermitOverrides,
    /// `first-applicable`.
    FirstApplicable,
    /// `only-one-applicable`.
    OnlyOneApplicable,
    /// `deny-unless-permit`.
    DenyUnlessPermit,
    /// `permit-unless-deny`.
    PermitUnlessDeny,
}

/// Error resolving a combining-algorithm id at policy-load time.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("unknown combining-algorithm id: `{0}`")]
pub struct UnknownAlgorithm(pub String);

impl Algorithm {
    /// Resolve a combining-algorithm URI, accepting both the unordered and
    /// `ordered-` forms for the algorithms that have one.
    pub fn from_uri(uri: &str) -> Result<Self, UnknownAlgorithm> {
        let base = uri.rsplit(':').next().unwrap_or(uri);
        match base {
            "deny-overrides" | "ordered-deny-overrides" => Ok(Self::DenyOverrides),
            "permit-overrides" | "ordered-permit-overrides" => Ok(Self::PermitOverrides),
            "first-applicable" => Ok(Self::FirstApplicable),
            "only-one-applicable" => Ok(Self::OnlyOneApplicable),
            "deny-unless-permit" | "ordered-deny-unless-permit" => Ok(Self::DenyUnlessPermit),
            "permit-unless-deny" | "ordered-permit-unless-deny" => Ok(Self::PermitUnlessDeny),
            _ => Err(UnknownAlgorithm(uri.to_owned())),
        }
    }

    /// Combine already-evaluated child decisions, in document order, per
    /// this algorithm's reduction table (spec §4.5).
    ///
    /// Children are passed pre-evaluated rather than as a lazy iterator:
    /// `first-applicable` and `only-one-applicable` are the only variants
    /// that could short-circuit evaluation itself, and the caller
    /// (`Policy`/`PolicySet`) already controls evaluation order directly,
    /// so this function only implements the reduction.
    pub fn combine(self, decisions: Vec<Decision>) -> Decision {
        match self {
            Self::DenyOverrides => deny_overrides_impl(decisions),
            Self::PermitOverrides => permit_overrides_impl(decisions),
            Self::FirstApplicable => first_applicable(decisions),
            Self::OnlyOneApplicable => only_one_applicable(decisions),
            Self::DenyUnlessPermit => deny_unless_permit(decisions),
            Self::PermitUnlessDeny => permit_unless_deny(decisions),
        }
    }
}

/// `deny-overrides`: any `Deny` wins outright; else an `Indeterminate{D,DP}`
/// escalates to `Indeterminate{D}` if a `Deny` was still possible somewhere;
/// else any `Permit` wins; else any `Indeterminate{P}` escalates; else
/// `NotApplicable`.
fn deny_overrides_impl(decisions: Vec<Decision>) -> Decision {
    if decisions.iter().any(|d| matches!(d, Decision::Deny)) {
        return Decision::Deny;
    }
    let potential_deny = decisions.iter().any(Decision::could_deny);
    let indeterminate_dish = decisions
        .iter()
        .filter(|d| matches!(d, Decision::IndeterminateD(_) | Decision::IndeterminateDP(_)))
        .cloned()
        .reduce(Decision::merge_indeterminate);
    if potential_deny {
        if let Some(merged) = indeterminate_dish {
            return Decision::IndeterminateD(merged.status());
        }
    }
    if decisions.iter().any(|d| matches!(d, Decision::Permit)) {
        return Decision::Permit;
    }
    if let Some(merged) = decisions
        .into_iter()
        .filter(|d| matches!(d, Decision::IndeterminateP(_)))
        .reduce(Decision::merge_indeterminate)
    {
        return Decision::IndeterminateP(merged.status());
    }
    Decision::NotApplicable
}

/// `permit-overrides`: the mirror image of [`deny_overrides_impl`].
fn permit_overrides_impl(decisions: Vec<Decision>) -> Decision {
    if decisions.iter().any(|d| matches!(d, Decision::Permit)) {
        return Decision::Permit;
    }
    let potential_permit = decisions.iter().any(Decision::could_permit);
    let indeterminate_pish = decisions
        .iter()
        .filter(|d| matches!(d, Decision::IndeterminateP(_) | Decision::IndeterminateDP(_)))
        .cloned()
        .reduce(Decision::merge_indeterminate);
    if potential_permit {
        if let Some(merged) = indeterminate_pish {
            return Decision::IndeterminateP(merged.status());
        }
    }
    if decisions.iter().any(|d| matches!(d, Decision::Deny)) {
        return Decision::Deny;
    }
    if let Some(merged) = decisions
        .into_iter()
        .filter(|d| matches!(d, Decision::IndeterminateD(_)))
        .reduce(Decision::merge_indeterminate)
    {
        return Decision::IndeterminateD(merged.status());
    }
    Decision::NotApplicable
}

fn first_applicable(decisions: Vec<Decision>) -> Decision {
    decisions
        .into_iter()
        .find(|d| !matches!(d, Decision::NotApplicable))
        .unwrap_or(Decision::NotApplicable)
}

fn only_one_applicable(decisions: Vec<Decision>) -> Decision {
    let applicable: Vec<Decision> = decisions.into_iter().filter(|d| !matches!(d, Decision::NotApplicable)).collect();
    match applicable.len() {
        0 => Decision::NotApplicable,
        1 => applicable.into_iter().next().expect("length checked"),
        _ => Decision::IndeterminateDP(Status::processing_error(
            "only-one-applicable: more than one child policy applied to this Request",
        )),
    }
}

fn deny_unless_permit(decisions: Vec<Decision>) -> Decision {
    if decisions.iter().any(|d| matches!(d, Decision::Permit)) {
        Decision::Permit
    } else {
        Decision::Deny
    }
}

fn permit_unless_deny(decisions: Vec<Decision>) -> Decision {
    if decisions.iter().any(|d| matches!(d, Decision::Deny)) {
        Decision::Deny
    } else {
        Decision::Permit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_overrides_any_deny_wins() {
        let decisions = vec![Decision::Permit, Decision::Deny, Decision::NotApplicable];
        assert_eq!(Algorithm::DenyOverrides.combine(decisions), Decision::Deny);
    }

    #[test]
    fn permit_overrides_any_permit_wins() {
        let decisions = vec![Decision::Deny, Decision::Permit];
        assert_eq!(Algorithm::PermitOverrides.combine(decisions), Decision::Permit);
    }

    #[test]
    fn first_applicable_skips_not_applicable() {
        let decisions = vec![Decision::NotApplicable, Decision::Deny, Decision::Permit];
        assert_eq!(Algorithm::FirstApplicable.combine(decisions), Decision::Deny);
    }

    #[test]
    fn only_one_applicable_errors_on_two() {
        let decisions = vec![Decision::Permit, Decision::Deny];
        assert!(matches!(
            Algorithm::OnlyOneApplicable.combine(decisions),
            Decision::IndeterminateDP(_)
        ));
    }

    #[test]
    fn deny_unless_permit_never_indeterminate() {
        let decisions = vec![Decision::IndeterminateD(Status::processing_error("boom")), Decision::NotApplicable];
        assert_eq!(Algorithm::DenyUnlessPermit.combine(decisions), Decision::Deny);
    }

    #[test]
    fn deny_overrides_escalates_indeterminate_d_when_deny_was_possible() {
        let decisions = vec![
            Decision::IndeterminateD(Status::processing_error("boom")),
            Decision::NotApplicable,
        ];
        assert!(matches!(
            Algorithm::DenyOverrides.combine(decisions),
            Decision::IndeterminateD(_)
        ));
    }

    #[test]
    fn ordered_uri_resolves_to_same_algorithm() {
        assert_eq!(
            Algorithm::from_uri("urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:ordered-deny-overrides")
                .unwrap(),
            Algorithm::from_uri("urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:deny-overrides").unwrap(),
        );
    }

    #[rstest::rstest]
    #[case(Algorithm::DenyOverrides, vec![Decision::Permit, Decision::NotApplicable], Decision::Permit)]
    #[case(Algorithm::DenyOverrides, vec![Decision::NotApplicable, Decision::NotApplicable], Decision::NotApplicable)]
    #[case(Algorithm::PermitOverrides, vec![Decision::Deny, Decision::NotApplicable], Decision::Deny)]
    #[case(Algorithm::PermitOverrides, vec![Decision::NotApplicable], Decision::NotApplicable)]
    #[case(Algorithm::FirstApplicable, vec![Decision::NotApplicable, Decision::NotApplicable], Decision::NotApplicable)]
    #[case(Algorithm::OnlyOneApplicable, vec![Decision::NotApplicable, Decision::Permit], Decision::Permit)]
    #[case(Algorithm::DenyUnlessPermit, vec![Decision::NotApplicable], Decision::Deny)]
    #[case(Algorithm::DenyUnlessPermit, vec![Decision::Permit, Decision::Deny], Decision::Permit)]
    #[case(Algorithm::PermitUnlessDeny, vec![Decision::NotApplicable], Decision::Permit)]
    #[case(Algorithm::PermitUnlessDeny, vec![Decision::Deny, Decision::Permit], Decision::Deny)]
    fn base_reduction_table(#[case] algorithm: Algorithm, #[case] decisions: Vec<Decision>, #[case] expected: Decision) {
        assert_eq!(algorithm.combine(decisions), expected);
    }
}
