//! I define [`Effect`] and [`Decision`] — the outcome vocabulary combining
//! algorithms reduce rule/policy children down to (spec §4.5).

use xacml_value::Status;

/// A Rule's declared effect, or the effect an obligation/advice expression's
/// `FulfillOn`/`AppliesTo` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// `Permit`.
    Permit,
    /// `Deny`.
    Deny,
}

/// The outcome of evaluating a Rule, Policy or PolicySet.
///
/// The three `Indeterminate` flavours record which definite decisions the
/// element *could* have produced had evaluation not failed — combining
/// algorithms need that to decide whether a failure further up the tree is
/// still absorbable (spec §4.5, §7).
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Definite `Permit`.
    Permit,
    /// Definite `Deny`.
    Deny,
    /// The element's Target did not match the Request.
    NotApplicable,
    /// Could have been `Deny` had evaluation succeeded.
    IndeterminateD(Status),
    /// Could have been `Permit` had evaluation succeeded.
    IndeterminateP(Status),
    /// Could have been either `Permit` or `Deny` had evaluation succeeded.
    IndeterminateDP(Status),
}

impl Decision {
    /// Build the matching `Indeterminate{D,P,DP}` flavour for a Rule/Policy
    /// whose declared/combined effect is `effect`, carrying `status`.
    pub fn indeterminate_for(effect: Effect, status: Status) -> Self {
        match effect {
            Effect::Permit => Self::IndeterminateP(status),
            Effect::Deny => Self::IndeterminateD(status),
        }
    }

    /// This decision's [`Status`], or `Status::ok()` for a definite or
    /// `NotApplicable` outcome.
    pub fn status(&self) -> Status {
        match self {
            Self::Permit | Self::Deny | Self::NotApplicable => Status::ok(),
            Self::IndeterminateD(s) | Self::IndeterminateP(s) | Self::IndeterminateDP(s) => s.clone(),
        }
    }

    /// Whether this decision is `Permit` or `Deny`.
    pub fn is_definite(&self) -> bool {
        matches!(self, Self::Permit | Self::Deny)
    }

    /// Whether this decision is some flavour of `Indeterminate`.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::IndeterminateD(_) | Self::IndeterminateP(_) | Self::IndeterminateDP(_))
    }

    /// Whether `Deny` is among the decisions this element could have
    /// produced: a definite `Deny`, `IndeterminateD`, or `IndeterminateDP`.
    pub fn could_deny(&self) -> bool {
        matches!(self, Self::Deny | Self::IndeterminateD(_) | Self::IndeterminateDP(_))
    }

    /// Whether `Permit` is among the decisions this element could have
    /// produced: a definite `Permit`, `IndeterminateP`, or `IndeterminateDP`.
    pub fn could_permit(&self) -> bool {
        matches!(self, Self::Permit | Self::IndeterminateP(_) | Self::IndeterminateDP(_))
    }

    /// Escalate two `Indeterminate` flavours into their join: `D` and `P`
    /// together become `DP`; either joined with itself stays itself.
    pub fn merge_indeterminate(self, other: Self) -> Self {
        let status = self.status().merge(other.status());
        match (self.could_deny(), self.could_permit(), other.could_deny(), other.could_permit()) {
            (true, true, _, _) | (_, _, true, true) => Self::IndeterminateDP(status),
            (true, false, false, true) | (false, true, true, false) => Self::IndeterminateDP(status),
            (true, false, _, _) => Self::IndeterminateD(status),
            _ => Self::IndeterminateP(status),
        }
    }
}
