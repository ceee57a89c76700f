//! I define the errors [`crate::pdp::Pdp::load`] can fail with. Per spec
//! §7, every one of these aborts initialization outright — the PDP never
//! starts in a half-loaded state.

use xacml_policy::{ReferenceError, UnknownAlgorithm};

use crate::xml::policy::PolicyLoadError;

/// Failure loading the configured set of Policy/PolicySet documents.
#[derive(Debug, thiserror::Error)]
pub enum PdpLoadError {
    /// Reading a configured policy source from disk failed.
    #[error("could not read policy file `{path}`: {source}")]
    Io {
        /// The path that failed to read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A Policy/PolicySet document failed to parse.
    #[error("failed to parse policy document `{source_name}`: {source}")]
    Parse {
        /// Name (path, or "<in-memory>") of the offending source.
        source_name: String,
        /// Underlying parse failure.
        #[source]
        source: PolicyLoadError,
    },
    /// Two loaded Policy/PolicySet documents declared the same id.
    #[error("duplicate policy id `{0}` across loaded documents")]
    DuplicateId(String),
    /// A `<PolicyIdReference>`/`<PolicySetIdReference>` named an id absent
    /// from every loaded document.
    #[error("policy reference `{0}` does not resolve to any loaded document")]
    DanglingReference(String),
    /// The configured root combining algorithm id was not recognized.
    #[error(transparent)]
    UnknownAlgorithm(#[from] UnknownAlgorithm),
    /// Internal: a reference was left unresolved after `Pdp::load` finished
    /// wiring every document together (a loader bug, not a caller error).
    #[error(transparent)]
    Unresolved(#[from] ReferenceError),
}
