//! Policy engine: per-operation authorization decisions.
//!
//! Every function here is pure. Given the actor's label (and, for delete,
//! whether the actor owns the object) and the target label, it returns a
//! [`Decision`] carrying a [`DenyReason`] on denial. Storage, auditing and
//! mutation live in [`crate::service`].
//!
//! | Operation | Grants when                                                   |
//! |-----------|---------------------------------------------------------------|
//! | Create    | actor dominates proposed label                                |
//! | Read      | actor dominates object label ("no read up")                   |
//! | Update    | actor level == object level, object categories ⊆ actor's      |
//! | Delete    | actor owns object, or actor level > object level (no category check) |

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::label::{self, format_categories, Category, Label, Level};

/// Why the policy engine refused an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
    /// Actor's level is below the target's level.
    #[error("level {subject} is below required level {required}")]
    InsufficientLevel {
        /// Actor's level.
        subject: Level,
        /// Target label's level.
        required: Level,
    },
    /// Actor lacks categories required by the target label.
    #[error("missing categories {{{}}}", format_categories(.missing))]
    MissingCategories {
        /// Categories the target requires and the actor does not hold.
        missing: BTreeSet<Category>,
    },
    /// Write attempted at a level other than the object's own.
    #[error("{}", level_mismatch_message(.subject, .object))]
    LevelMismatch {
        /// Actor's level.
        subject: Level,
        /// Object's level.
        object: Level,
    },
    /// Non-owner whose level does not strictly exceed the object's.
    #[error("insufficient rights: not the owner and level {subject} does not exceed {object}")]
    InsufficientRights {
        /// Actor's level.
        subject: Level,
        /// Object's level.
        object: Level,
    },
}

impl DenyReason {
    /// Taxonomy kind for this reason.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientLevel { .. } => ErrorKind::InsufficientLevel,
            Self::MissingCategories { .. } => ErrorKind::MissingCategories,
            Self::LevelMismatch { .. } => ErrorKind::LevelMismatch,
            Self::InsufficientRights { .. } => ErrorKind::InsufficientRights,
        }
    }
}

fn level_mismatch_message(subject: &Level, object: &Level) -> String {
    if subject < object {
        format!("cannot write to a higher security level ({subject} < {object})")
    } else {
        format!("cannot write to an object with a different security level ({subject} != {object})")
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Operation may proceed.
    Grant,
    /// Operation is refused.
    Deny(DenyReason),
}

impl Decision {
    /// `true` for [`Decision::Grant`].
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Grant)
    }

    /// Convert into a `Result` for `?` propagation.
    ///
    /// # Errors
    ///
    /// Returns the [`DenyReason`] on denial.
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Self::Grant => Ok(()),
            Self::Deny(reason) => Err(reason),
        }
    }
}

// ── Named rules ──
//
// Update and delete deviate from plain dominance. Each deviation is isolated
// here so that changing it touches one line.

/// Writes are confined to the object's exact level.
pub fn write_level_permitted(subject: Level, object: Level) -> bool {
    subject == object
}

/// A non-owner may delete only from strictly above the object's level.
/// Categories are deliberately not consulted.
pub fn delete_override_permitted(subject: Level, object: Level) -> bool {
    subject > object
}

// ── Decisions ──

/// May `subject` create an object labeled `proposed`?
pub fn decide_create(subject: &Label, proposed: &Label) -> Decision {
    if label::dominates(subject, proposed) {
        return Decision::Grant;
    }
    clearance_denial(subject, proposed)
}

/// May `subject` read an object labeled `object`? ("no read up")
pub fn decide_read(subject: &Label, object: &Label) -> Decision {
    if label::dominates(subject, object) {
        return Decision::Grant;
    }
    clearance_denial(subject, object)
}

/// May `subject` replace the content of an object labeled `object`?
pub fn decide_update(subject: &Label, object: &Label) -> Decision {
    if !write_level_permitted(subject.level, object.level) {
        return Decision::Deny(DenyReason::LevelMismatch {
            subject: subject.level,
            object: object.level,
        });
    }
    if !label::categories_subset(&object.categories, &subject.categories) {
        return Decision::Deny(DenyReason::MissingCategories {
            missing: label::missing_categories(&object.categories, &subject.categories),
        });
    }
    Decision::Grant
}

/// May `subject` delete an object labeled `object`?
pub fn decide_delete(subject: &Label, object: &Label, is_owner: bool) -> Decision {
    if is_owner || delete_override_permitted(subject.level, object.level) {
        return Decision::Grant;
    }
    Decision::Deny(DenyReason::InsufficientRights {
        subject: subject.level,
        object: object.level,
    })
}

/// Reason a dominance check failed: level first, then categories.
fn clearance_denial(subject: &Label, target: &Label) -> Decision {
    if subject.level < target.level {
        return Decision::Deny(DenyReason::InsufficientLevel {
            subject: subject.level,
            required: target.level,
        });
    }
    Decision::Deny(DenyReason::MissingCategories {
        missing: label::missing_categories(&target.categories, &subject.categories),
    })
}
