//! Error taxonomy for access-control operations.
//!
//! Every failure is local and recoverable: it is returned to the caller and
//! recorded in the audit trail, never fatal to the process.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credential::CredentialError;
use crate::policy::DenyReason;

/// Malformed input rejected at the service boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Level name outside the fixed vocabulary.
    #[error("unknown security level '{0}'")]
    UnknownLevel(String),
    /// Numeric level rank outside `0..=3`.
    #[error("security level rank {0} out of range (expected 0-3)")]
    LevelOutOfRange(i64),
    /// Category outside the closed category vocabulary.
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
    /// Identifier or name that is empty or whitespace only.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },
    /// Identifier that is too long or contains control characters.
    #[error("{field} is not a valid identifier: {value:?}")]
    InvalidIdentifier {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Coarse failure classification shared by callers and the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Subject id or object name is already taken.
    AlreadyExists,
    /// Subject or object does not exist.
    NotFound,
    /// Credential verification failed.
    Unauthorized,
    /// Actor's level is below the target label's level.
    InsufficientLevel,
    /// Actor lacks one or more of the target label's categories.
    MissingCategories,
    /// Actor's level differs from the object's level on write.
    LevelMismatch,
    /// Actor is neither the owner nor strictly above the object's level.
    InsufficientRights,
    /// Boundary input was malformed.
    ValidationError,
    /// The credential collaborator failed.
    Internal,
}

/// Failure of a single access-control operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// A subject with this id is already registered.
    #[error("subject '{0}' already exists")]
    SubjectExists(String),
    /// An object with this name is already stored.
    #[error("object '{0}' already exists")]
    ObjectExists(String),
    /// No subject with this id.
    #[error("subject '{0}' not found")]
    SubjectNotFound(String),
    /// No object with this name.
    #[error("object '{0}' not found")]
    ObjectNotFound(String),
    /// Password did not match the stored credential.
    #[error("authentication failed for '{0}'")]
    Unauthorized(String),
    /// The policy engine denied the operation.
    #[error("access denied: {0}")]
    Denied(DenyReason),
    /// Input rejected before reaching the policy engine.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    /// The credential verifier could not produce a credential.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),
}

impl AccessError {
    /// Map this error onto the caller-visible taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SubjectExists(_) | Self::ObjectExists(_) => ErrorKind::AlreadyExists,
            Self::SubjectNotFound(_) | Self::ObjectNotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Denied(reason) => reason.kind(),
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::Credential(_) => ErrorKind::Internal,
        }
    }
}

impl From<DenyReason> for AccessError {
    fn from(reason: DenyReason) -> Self {
        Self::Denied(reason)
    }
}
