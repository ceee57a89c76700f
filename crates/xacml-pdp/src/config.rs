//! Runtime configuration for a [`crate::pdp::Pdp`].
//!
//! A `config::Config` assembled from a TOML source string and deserialized
//! into a plain `serde::Deserialize` struct, rather than hand-rolled
//! environment/CLI parsing.

use serde::Deserialize;
use xacml_policy::{Algorithm, UnknownAlgorithm};

/// PDP-wide configuration: which combining algorithm governs the top-level
/// set of loaded policies, the default timezone offset applied to
/// timezone-less `date`/`time`/`dateTime` comparisons (spec §3), where to
/// load policy documents from, whether the Bloom pre-filter (spec §9) is
/// enabled, and the request-level defaults a Request may omit.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PdpConfig {
    /// Combining algorithm identifier applied across every top-level
    /// Policy/PolicySet document this PDP was loaded with.
    pub root_combining_algorithm: String,
    /// Default timezone offset, in minutes east of UTC, assumed for
    /// timezone-less `date`/`time`/`dateTime` literals and for
    /// `current-dateTime`/`current-date`/`current-time` (spec §3). Defaults
    /// to UTC.
    #[serde(default)]
    pub default_timezone_offset_minutes: i32,
    /// Directories to scan for `*.xml` Policy/PolicySet documents at load
    /// time, in addition to (or instead of) any in-memory sources a caller
    /// passes directly to [`crate::pdp::Pdp::load`]. Scanned in the order
    /// listed; within a directory, entries are loaded in sorted filename
    /// order for deterministic `DuplicateId` diagnostics.
    #[serde(default)]
    pub policy_source_directories: Vec<String>,
    /// Whether the Bloom pre-filter (spec §9) is built at load time and
    /// consulted before evaluating each root. Purely a performance
    /// optimization — disabling it changes nothing about any Decision, only
    /// how many roots get a full Target/Rule evaluation. Defaults to off.
    #[serde(default)]
    pub enable_bloom_prefilter: bool,
    /// Default for `ReturnPolicyIdList` when a Request omits the attribute
    /// entirely. The Request's own `ReturnPolicyIdList` attribute, if
    /// present, always wins over this default.
    #[serde(default)]
    pub default_return_policy_id_list: bool,
    /// Default for `CombinedDecision` when a Request omits the attribute
    /// entirely. Reserved for multiple-decision-request support; a single
    /// Request/Response exchange's own `CombinedDecision` attribute, if
    /// present, always wins over this default.
    #[serde(default)]
    pub default_combined_decision: bool,
}

impl Default for PdpConfig {
    fn default() -> Self {
        Self {
            root_combining_algorithm: DenyOverridesUri::URI.to_owned(),
            default_timezone_offset_minutes: 0,
            policy_source_directories: Vec::new(),
            enable_bloom_prefilter: false,
            default_return_policy_id_list: false,
            default_combined_decision: false,
        }
    }
}

struct DenyOverridesUri;
impl DenyOverridesUri {
    const URI: &'static str = "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:deny-overrides";
}

impl PdpConfig {
    /// Parse `toml` as a `PdpConfig` (spec ambient stack — configuration).
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Resolve [`Self::root_combining_algorithm`] to a concrete
    /// [`Algorithm`].
    pub fn root_algorithm(&self) -> Result<Algorithm, UnknownAlgorithm> {
        Algorithm::from_uri(&self.root_combining_algorithm)
    }

    /// The configured default timezone as a [`chrono::FixedOffset`].
    pub fn default_timezone(&self) -> chrono::FixedOffset {
        chrono::FixedOffset::east_opt(self.default_timezone_offset_minutes * 60)
            .unwrap_or_else(|| chrono::FixedOffset::east_opt(0).expect("zero offset is always valid"))
    }
}
