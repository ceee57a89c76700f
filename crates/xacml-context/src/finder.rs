//! I define the pluggable attribute-finder chain (spec §4.2).
//!
//! An [`AttributeFinderModule`] is a `tower::Service` over an
//! [`AttributeFinderRequest`]: type-erased, `Clone`-able trait objects
//! chained by the caller, composed with `tower::util::ServiceExt`
//! combinators rather than a bespoke chain type.
//!

use std::{future::Future, pin::Pin};

use dyn_clone::{clone_trait_object, DynClone};
use tower::Service;
use xacml_value::{Bag, Status};

use crate::attribute::AttributeKey;

/// A boxed future resolving to an attribute lookup outcome.
pub type FinderFuture = Pin<Box<dyn Future<Output = Result<Option<Bag>, Status>> + Send>>;

/// A source of attribute values consulted when the Request itself lacks a
/// requested attribute: an environment clock, a policy information point, a
/// content selector fallback, etc.
///
/// `Ok(None)` means "this module has no opinion, try the next one";
/// `Ok(Some(bag))` — including an empty bag — terminates the chain.
pub trait AttributeFinderModule:
    Service<AttributeKey, Response = Option<Bag>, Error = Status, Future = FinderFuture>
    + DynClone
    + Send
    + Sync
{
}

impl<S> AttributeFinderModule for S where
    S: Service<AttributeKey, Response = Option<Bag>, Error = Status, Future = FinderFuture>
        + DynClone
        + Send
        + Sync
{
}

clone_trait_object!(AttributeFinderModule);

/// Type-erased attribute-finder module.
pub type BoxedAttributeFinderModule = Box<dyn AttributeFinderModule>;

/// The default environment finder: answers the standard
/// `current-date-time`/`current-date`/`current-time` environment attribute
/// ids with a single instant fixed for the whole evaluation (spec §4.2
/// `current_date_time()`). Any other key is declined.
#[derive(Debug, Clone)]
pub struct EnvironmentFinder {
    now: chrono::DateTime<chrono::FixedOffset>,
}

impl EnvironmentFinder {
    /// Environment category uri, per the XACML 3.0 core schema.
    pub const CATEGORY: &'static str =
        "urn:oasis:names:tc:xacml:3.0:attribute-category:environment";
    /// `current-date-time` attribute id.
    pub const CURRENT_DATE_TIME: &'static str =
        "urn:oasis:names:tc:xacml:1.0:environment:current-dateTime";
    /// `current-date` attribute id.
    pub const CURRENT_DATE: &'static str = "urn:oasis:names:tc:xacml:1.0:environment:current-date";
    /// `current-time` attribute id.
    pub const CURRENT_TIME: &'static str = "urn:oasis:names:tc:xacml:1.0:environment:current-time";

    /// Fix the evaluation instant this finder will answer with.
    pub fn new(now: chrono::DateTime<chrono::FixedOffset>) -> Self {
        Self { now }
    }

    /// The fixed evaluation instant.
    pub fn now(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.now
    }
}

impl Service<AttributeKey> for EnvironmentFinder {
    type Response = Option<Bag>;
    type Error = Status;
    type Future = FinderFuture;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, key: AttributeKey) -> Self::Future {
        use xacml_value::{
            types::datetime::{XacmlDate, XacmlTime, XacmlDateTime},
            Value,
        };

        let result = if key.category != Self::CATEGORY {
            None
        } else if key.id == Self::CURRENT_DATE_TIME {
            Some(Bag::from_values([Value::DateTime(XacmlDateTime(self.now))]))
        } else if key.id == Self::CURRENT_DATE {
            Some(Bag::from_values([Value::Date(XacmlDate {
                date: self.now.date_naive(),
                tz: Some(*self.now.offset()),
            })]))
        } else if key.id == Self::CURRENT_TIME {
            Some(Bag::from_values([Value::Time(XacmlTime {
                time: self.now.time(),
                tz: Some(*self.now.offset()),
            })]))
        } else {
            None
        };
        Box::pin(async move { Ok(result) })
    }
}

#[cfg(test)]
mod tests {
    use claims::assert_ok;
    use tower::ServiceExt;

    use super::*;
    use crate::attribute::AttributeKey;
    use xacml_value::DataType;

    #[tokio::test]
    async fn environment_finder_answers_current_date_time() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-01-01T12:00:00Z").unwrap();
        let mut finder = EnvironmentFinder::new(now);
        let key = AttributeKey::new(
            EnvironmentFinder::CATEGORY,
            EnvironmentFinder::CURRENT_DATE_TIME,
            DataType::DateTime,
            None,
        );
        let result = assert_ok!((&mut finder).oneshot(key).await);
        assert!(result.is_some_and(|bag| bag.size() == 1));
    }

    #[tokio::test]
    async fn environment_finder_declines_unknown_attribute() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-01-01T12:00:00Z").unwrap();
        let mut finder = EnvironmentFinder::new(now);
        let key = AttributeKey::new("urn:example:other", "urn:example:id", DataType::String, None);
        let result = assert_ok!((&mut finder).oneshot(key).await);
        assert!(result.is_none());
    }
}
