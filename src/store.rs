//! Subject registry and object store.
//!
//! [`SecurityStore`] is the storage seam: the service holds one behind a
//! reader/writer lock and performs every check-then-act sequence while
//! holding it, so implementations need no internal synchronization.
//! [`InMemoryStore`] is the only implementation; nothing survives a restart.

use std::collections::HashMap;

use serde::Serialize;

use crate::credential::StoredCredential;
use crate::label::{Category, Label, Level};

/// A registered actor. The label is fixed for the subject's lifetime.
#[derive(Debug, Clone)]
pub struct Subject {
    /// Unique, immutable identifier.
    pub id: String,
    /// Opaque verifier state.
    pub credential: StoredCredential,
    /// Clearance.
    pub label: Label,
}

impl Subject {
    /// Public view returned by authentication.
    pub fn summary(&self) -> SubjectSummary {
        SubjectSummary {
            id: self.id.clone(),
            level: self.label.level,
            categories: self.label.categories.iter().copied().collect(),
        }
    }
}

/// Subject as reported to callers: no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectSummary {
    /// Subject identifier.
    pub id: String,
    /// Clearance level.
    pub level: Level,
    /// Held categories.
    pub categories: Vec<Category>,
}

/// A named, labeled, owned record. Only `content` ever changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledObject {
    /// Unique, immutable key.
    pub name: String,
    /// Id of the creating subject.
    pub owner: String,
    /// Classification, fixed at creation.
    pub label: Label,
    /// Mutable payload, stored in clear.
    pub content: String,
}

/// Storage for subjects and objects.
pub trait SecurityStore: Send + Sync {
    /// Look up a subject.
    fn subject(&self, id: &str) -> Option<&Subject>;

    /// Insert a subject. Returns `false` and leaves the store unchanged if
    /// the id is taken.
    fn insert_subject(&mut self, subject: Subject) -> bool;

    /// Look up an object.
    fn object(&self, name: &str) -> Option<&LabeledObject>;

    /// Insert an object. Returns `false` and leaves the store unchanged if
    /// the name is taken.
    fn insert_object(&mut self, object: LabeledObject) -> bool;

    /// Replace an object's content. Returns `false` if absent.
    fn replace_content(&mut self, name: &str, content: String) -> bool;

    /// Remove and return an object.
    fn remove_object(&mut self, name: &str) -> Option<LabeledObject>;

    /// Number of registered subjects.
    fn subject_count(&self) -> usize;

    /// Number of stored objects.
    fn object_count(&self) -> usize;
}

/// Hash-map backed store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    subjects: HashMap<String, Subject>,
    objects: HashMap<String, LabeledObject>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecurityStore for InMemoryStore {
    fn subject(&self, id: &str) -> Option<&Subject> {
        self.subjects.get(id)
    }

    fn insert_subject(&mut self, subject: Subject) -> bool {
        if self.subjects.contains_key(&subject.id) {
            return false;
        }
        self.subjects.insert(subject.id.clone(), subject);
        true
    }

    fn object(&self, name: &str) -> Option<&LabeledObject> {
        self.objects.get(name)
    }

    fn insert_object(&mut self, object: LabeledObject) -> bool {
        if self.objects.contains_key(&object.name) {
            return false;
        }
        self.objects.insert(object.name.clone(), object);
        true
    }

    fn replace_content(&mut self, name: &str, content: String) -> bool {
        match self.objects.get_mut(name) {
            Some(object) => {
                object.content = content;
                true
            }
            None => false,
        }
    }

    fn remove_object(&mut self, name: &str) -> Option<LabeledObject> {
        self.objects.remove(name)
    }

    fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    fn object_count(&self) -> usize {
        self.objects.len()
    }
}
