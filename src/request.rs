//! Transport-agnostic operation contract.
//!
//! A transport decodes its wire format into [`Request`], hands it to
//! [`crate::service::AccessService::execute`], and encodes the resulting
//! [`Response`] or [`crate::error::AccessError`]. Raw level and category
//! values are validated here, before any policy decision.

use serde::{Deserialize, Serialize};

use crate::audit::AuditAction;
use crate::credential::Password;
use crate::error::{AccessError, ErrorKind, ValidationError};
use crate::label::{self, Label, Level};
use crate::store::SubjectSummary;

const MAX_IDENTIFIER_LEN: usize = 256;

/// Reject empty, oversized, or control-character identifiers.
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] or [`ValidationError::InvalidIdentifier`].
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.chars().count() > MAX_IDENTIFIER_LEN || value.chars().any(char::is_control) {
        return Err(ValidationError::InvalidIdentifier {
            field,
            value: value.to_owned(),
        });
    }
    Ok(())
}

/// Level as sent by a client: a name (`"SECRET"`) or a rank (`2`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelInput {
    /// Numeric rank 0-3.
    Rank(i64),
    /// Level name, case-insensitive.
    Name(String),
}

impl LevelInput {
    /// Resolve into a [`Level`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for unknown names or out-of-range ranks.
    pub fn resolve(&self) -> Result<Level, ValidationError> {
        match self {
            Self::Rank(rank) => Level::from_rank(*rank),
            Self::Name(name) => name.parse(),
        }
    }
}

/// Build a label from raw boundary input.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn parse_label(level: &LevelInput, categories: &[String]) -> Result<Label, ValidationError> {
    Ok(Label {
        level: level.resolve()?,
        categories: label::parse_categories(categories)?,
    })
}

/// One access-control operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Register a subject.
    Register {
        /// New subject id.
        id: String,
        /// Plaintext password; hashed before storage.
        password: Password,
        /// Clearance level.
        level: LevelInput,
        /// Held categories.
        #[serde(default)]
        categories: Vec<String>,
    },
    /// Verify a subject's password.
    Authenticate {
        /// Subject id.
        id: String,
        /// Plaintext password.
        password: Password,
    },
    /// Create a labeled object owned by `actor`.
    CreateObject {
        /// Acting subject id.
        actor: String,
        /// New object name.
        name: String,
        /// Initial content.
        content: String,
        /// Classification level.
        level: LevelInput,
        /// Required categories.
        #[serde(default)]
        categories: Vec<String>,
    },
    /// Read an object's content.
    ReadObject {
        /// Acting subject id.
        actor: String,
        /// Object name.
        name: String,
    },
    /// Replace an object's content.
    UpdateObject {
        /// Acting subject id.
        actor: String,
        /// Object name.
        name: String,
        /// Replacement content.
        content: String,
    },
    /// Remove an object.
    DeleteObject {
        /// Acting subject id.
        actor: String,
        /// Object name.
        name: String,
    },
}

impl Request {
    /// Audit action this request maps to.
    pub fn action(&self) -> AuditAction {
        match self {
            Self::Register { .. } => AuditAction::Register,
            Self::Authenticate { .. } => AuditAction::Authenticate,
            Self::CreateObject { .. } => AuditAction::CreateObject,
            Self::ReadObject { .. } => AuditAction::ReadObject,
            Self::UpdateObject { .. } => AuditAction::UpdateObject,
            Self::DeleteObject { .. } => AuditAction::DeleteObject,
        }
    }

    /// Id of the acting (or registering) subject.
    pub fn actor(&self) -> &str {
        match self {
            Self::Register { id, .. } | Self::Authenticate { id, .. } => id,
            Self::CreateObject { actor, .. }
            | Self::ReadObject { actor, .. }
            | Self::UpdateObject { actor, .. }
            | Self::DeleteObject { actor, .. } => actor,
        }
    }

    /// Object name, for object operations.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Register { .. } | Self::Authenticate { .. } => None,
            Self::CreateObject { name, .. }
            | Self::ReadObject { name, .. }
            | Self::UpdateObject { name, .. }
            | Self::DeleteObject { name, .. } => Some(name),
        }
    }

    /// Check boundary input without touching any state.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Register {
                id,
                level,
                categories,
                ..
            } => {
                validate_identifier("id", id)?;
                parse_label(level, categories).map(|_| ())
            }
            Self::Authenticate { id, .. } => validate_identifier("id", id),
            Self::CreateObject {
                actor,
                name,
                level,
                categories,
                ..
            } => {
                validate_identifier("actor", actor)?;
                validate_identifier("name", name)?;
                parse_label(level, categories).map(|_| ())
            }
            Self::ReadObject { actor, name }
            | Self::UpdateObject { actor, name, .. }
            | Self::DeleteObject { actor, name } => {
                validate_identifier("actor", actor)?;
                validate_identifier("name", name)
            }
        }
    }
}

/// Successful result of a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Response {
    /// Subject registered.
    Registered {
        /// Subject id.
        id: String,
    },
    /// Password verified.
    Authenticated {
        /// Public view of the subject.
        subject: SubjectSummary,
    },
    /// Object created.
    Created {
        /// Object name.
        name: String,
    },
    /// Object content.
    Content {
        /// Object name.
        name: String,
        /// Current content.
        content: String,
    },
    /// Object content replaced.
    Updated {
        /// Object name.
        name: String,
    },
    /// Object removed.
    Deleted {
        /// Object name.
        name: String,
    },
}

/// Error body a transport can serialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// Taxonomy kind.
    pub error: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl From<&AccessError> for ErrorResponse {
    fn from(err: &AccessError) -> Self {
        Self {
            error: err.kind(),
            message: err.to_string(),
        }
    }
}
