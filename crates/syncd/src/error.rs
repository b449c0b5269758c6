//! Error taxonomy for the synchronization engine.

use sonic_sairedis::{ObjectType, VersionError, Vid};
use thiserror::Error;

/// Errors surfaced by dispatch, translation, and view reconciliation.
///
/// Dispatcher and identifier errors abort the whole pending operation;
/// `DependencyUnresolved` aborts an entire view apply. No partial state
/// is committed on any of these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncdError {
    /// Object type absent from the loaded metadata.
    #[error("unknown object type: {0}")]
    UnknownObjectType(ObjectType),

    /// Valid type, but no handler case for this entry kind.
    #[error("object type not implemented: {0}")]
    NotImplemented(ObjectType),

    /// Caller contract violation (key style mismatch, bad attribute
    /// list pairing).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Identifier rebind attempt.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Lookup or unbind of an absent id or key.
    #[error("not found: {0}")]
    NotFound(String),

    /// Reconciliation could not resolve a referenced object id.
    #[error("unresolved dependency on {0}")]
    DependencyUnresolved(Vid),

    /// Attribute rejected by the version gate. Not fatal: the
    /// attribute is skipped during discovery.
    #[error("attribute rejected by version gate: {0}")]
    VersionRejected(String),

    /// ASIC driver rejected the operation.
    #[error("driver error: {0}")]
    Driver(String),
}

impl From<VersionError> for SyncdError {
    fn from(err: VersionError) -> Self {
        match err {
            VersionError::InvalidArgument(msg) => SyncdError::InvalidArgument(msg.to_string()),
            VersionError::InvalidVersionString(s) => SyncdError::InvalidArgument(s),
        }
    }
}

/// Result type for engine operations.
pub type SyncdResult<T> = Result<T, SyncdError>;
