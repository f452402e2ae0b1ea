//! Access-control service: resolve, decide, mutate, audit.
//!
//! Each operation resolves the actor (and object), asks [`crate::policy`]
//! for a decision, applies the mutation only on grant, and appends exactly
//! one audit record whatever the outcome.
//!
//! The store sits behind one `RwLock`. Mutating operations hold the write
//! side across resolve → decide → mutate, so two creates of the same name
//! cannot both succeed and a read never observes a half-applied delete.
//! Password hashing and verification run outside the lock, on tokio's
//! blocking pool.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::audit::{AuditAction, AuditRecord, AuditSink};
use crate::credential::{CredentialError, CredentialVerifier, StoredCredential};
use crate::error::AccessError;
use crate::label::Label;
use crate::policy::{self, Decision};
use crate::request::{parse_label, validate_identifier, Request, Response};
use crate::store::{LabeledObject, SecurityStore, Subject, SubjectSummary};

/// Multi-level-security access-control service.
pub struct AccessService<S> {
    store: RwLock<S>,
    verifier: Arc<dyn CredentialVerifier>,
    audit: Arc<dyn AuditSink>,
}

impl<S: SecurityStore> AccessService<S> {
    /// Build a service over `store`, hashing with `verifier` and auditing to `audit`.
    pub fn new(store: S, verifier: Arc<dyn CredentialVerifier>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store: RwLock::new(store),
            verifier,
            audit,
        }
    }

    /// Register a subject with a clearance that never changes afterwards.
    ///
    /// # Errors
    ///
    /// [`AccessError::SubjectExists`] if `id` is taken; validation or
    /// credential errors otherwise.
    pub async fn register(
        &self,
        id: &str,
        password: &str,
        label: Label,
    ) -> Result<SubjectSummary, AccessError> {
        let result = self.try_register(id, password, label).await;
        self.record(AuditAction::Register, id, None, &result, |_| {
            "subject registered".to_owned()
        });
        result
    }

    async fn try_register(
        &self,
        id: &str,
        password: &str,
        label: Label,
    ) -> Result<SubjectSummary, AccessError> {
        validate_identifier("id", id)?;
        // Cheap pre-check so a duplicate does not pay for key derivation.
        if self.store.read().await.subject(id).is_some() {
            return Err(AccessError::SubjectExists(id.to_owned()));
        }
        let credential = self.hash_credential(password).await?;
        let subject = Subject {
            id: id.to_owned(),
            credential,
            label,
        };
        let summary = subject.summary();
        if !self.store.write().await.insert_subject(subject) {
            return Err(AccessError::SubjectExists(id.to_owned()));
        }
        Ok(summary)
    }

    /// Verify `password` for subject `id`.
    ///
    /// # Errors
    ///
    /// [`AccessError::SubjectNotFound`] or [`AccessError::Unauthorized`].
    pub async fn authenticate(
        &self,
        id: &str,
        password: &str,
    ) -> Result<SubjectSummary, AccessError> {
        let result = self.try_authenticate(id, password).await;
        self.record(AuditAction::Authenticate, id, None, &result, |_| {
            "authentication successful".to_owned()
        });
        result
    }

    async fn try_authenticate(
        &self,
        id: &str,
        password: &str,
    ) -> Result<SubjectSummary, AccessError> {
        validate_identifier("id", id)?;
        let subject = {
            let store = self.store.read().await;
            store
                .subject(id)
                .cloned()
                .ok_or_else(|| AccessError::SubjectNotFound(id.to_owned()))?
        };
        if !self.verify_credential(password, subject.credential.clone()).await {
            return Err(AccessError::Unauthorized(id.to_owned()));
        }
        Ok(subject.summary())
    }

    /// Create object `name` labeled `label`, owned by `actor`.
    ///
    /// # Errors
    ///
    /// Not-found, policy denial, or [`AccessError::ObjectExists`].
    pub async fn create_object(
        &self,
        actor: &str,
        name: &str,
        content: &str,
        label: Label,
    ) -> Result<(), AccessError> {
        let result = self.try_create_object(actor, name, content, label).await;
        self.record(AuditAction::CreateObject, actor, Some(name), &result, |_| {
            "object created".to_owned()
        });
        result
    }

    async fn try_create_object(
        &self,
        actor: &str,
        name: &str,
        content: &str,
        label: Label,
    ) -> Result<(), AccessError> {
        validate_identifier("actor", actor)?;
        validate_identifier("name", name)?;
        let mut store = self.store.write().await;
        let subject = resolve_subject(&*store, actor)?;
        policy::decide_create(&subject.label, &label).into_result()?;
        let object = LabeledObject {
            name: name.to_owned(),
            owner: subject.id.clone(),
            label,
            content: content.to_owned(),
        };
        if !store.insert_object(object) {
            return Err(AccessError::ObjectExists(name.to_owned()));
        }
        Ok(())
    }

    /// Return the content of `name` if `actor` may read it.
    ///
    /// # Errors
    ///
    /// Not-found or policy denial.
    pub async fn read_object(&self, actor: &str, name: &str) -> Result<String, AccessError> {
        let result = self.try_read_object(actor, name).await;
        self.record(AuditAction::ReadObject, actor, Some(name), &result, |_| {
            "object read".to_owned()
        });
        result
    }

    async fn try_read_object(&self, actor: &str, name: &str) -> Result<String, AccessError> {
        validate_identifier("actor", actor)?;
        validate_identifier("name", name)?;
        let store = self.store.read().await;
        let (subject, object) = resolve_pair(&*store, actor, name)?;
        policy::decide_read(&subject.label, &object.label).into_result()?;
        Ok(object.content.clone())
    }

    /// Replace the content of `name` if `actor` may write it.
    ///
    /// # Errors
    ///
    /// Not-found or policy denial.
    pub async fn update_object(
        &self,
        actor: &str,
        name: &str,
        content: &str,
    ) -> Result<(), AccessError> {
        let result = self.try_update_object(actor, name, content).await;
        self.record(AuditAction::UpdateObject, actor, Some(name), &result, |_| {
            "object updated".to_owned()
        });
        result
    }

    async fn try_update_object(
        &self,
        actor: &str,
        name: &str,
        content: &str,
    ) -> Result<(), AccessError> {
        validate_identifier("actor", actor)?;
        validate_identifier("name", name)?;
        let mut store = self.store.write().await;
        let decision = {
            let (subject, object) = resolve_pair(&*store, actor, name)?;
            policy::decide_update(&subject.label, &object.label)
        };
        decision.into_result()?;
        if !store.replace_content(name, content.to_owned()) {
            return Err(AccessError::ObjectNotFound(name.to_owned()));
        }
        Ok(())
    }

    /// Remove `name` if `actor` owns it or is cleared strictly above it.
    ///
    /// # Errors
    ///
    /// Not-found or [`crate::policy::DenyReason::InsufficientRights`].
    pub async fn delete_object(&self, actor: &str, name: &str) -> Result<(), AccessError> {
        let result = self.try_delete_object(actor, name).await;
        self.record(AuditAction::DeleteObject, actor, Some(name), &result, |_| {
            "object deleted".to_owned()
        });
        result
    }

    async fn try_delete_object(&self, actor: &str, name: &str) -> Result<(), AccessError> {
        validate_identifier("actor", actor)?;
        validate_identifier("name", name)?;
        let mut store = self.store.write().await;
        let decision: Decision = {
            let (subject, object) = resolve_pair(&*store, actor, name)?;
            policy::decide_delete(&subject.label, &object.label, subject.id == object.owner)
        };
        decision.into_result()?;
        store
            .remove_object(name)
            .map(|_| ())
            .ok_or_else(|| AccessError::ObjectNotFound(name.to_owned()))
    }

    /// Validate and dispatch a boundary request.
    ///
    /// Input that fails validation is audited here, so every request
    /// yields exactly one audit record.
    ///
    /// # Errors
    ///
    /// Any [`AccessError`] from validation or the underlying operation.
    pub async fn execute(&self, request: Request) -> Result<Response, AccessError> {
        if let Err(e) = request.validate() {
            return Err(self.reject(&request, e.into()));
        }
        // Labels below were accepted by `validate`.
        match request {
            Request::Register {
                id,
                password,
                level,
                categories,
            } => {
                let label = parse_label(&level, &categories)?;
                self.register(&id, password.expose(), label).await?;
                Ok(Response::Registered { id })
            }
            Request::Authenticate { id, password } => {
                let subject = self.authenticate(&id, password.expose()).await?;
                Ok(Response::Authenticated { subject })
            }
            Request::CreateObject {
                actor,
                name,
                content,
                level,
                categories,
            } => {
                let label = parse_label(&level, &categories)?;
                self.create_object(&actor, &name, &content, label).await?;
                Ok(Response::Created { name })
            }
            Request::ReadObject { actor, name } => {
                let content = self.read_object(&actor, &name).await?;
                Ok(Response::Content { name, content })
            }
            Request::UpdateObject {
                actor,
                name,
                content,
            } => {
                self.update_object(&actor, &name, &content).await?;
                Ok(Response::Updated { name })
            }
            Request::DeleteObject { actor, name } => {
                self.delete_object(&actor, &name).await?;
                Ok(Response::Deleted { name })
            }
        }
    }

    /// Key derivation is CPU-bound; run it on the blocking pool.
    async fn hash_credential(&self, password: &str) -> Result<StoredCredential, AccessError> {
        let verifier = Arc::clone(&self.verifier);
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || verifier.hash(&password))
            .await
            .map_err(|e| CredentialError::Derivation(format!("hashing task failed: {e}")))?
            .map_err(AccessError::from)
    }

    async fn verify_credential(&self, password: &str, stored: StoredCredential) -> bool {
        let verifier = Arc::clone(&self.verifier);
        let password = password.to_owned();
        match tokio::task::spawn_blocking(move || verifier.verify(&password, &stored)).await {
            Ok(verified) => verified,
            Err(e) => {
                warn!(error = %e, "credential verification task failed");
                false
            }
        }
    }

    /// Number of registered subjects and stored objects.
    pub async fn counts(&self) -> (usize, usize) {
        let store = self.store.read().await;
        (store.subject_count(), store.object_count())
    }

    fn reject(&self, request: &Request, error: AccessError) -> AccessError {
        let (action, actor, target) = (request.action(), request.actor(), request.target());
        warn!(
            ?action,
            actor,
            object = ?target,
            kind = ?error.kind(),
            reason = %error,
            "request rejected"
        );
        self.audit
            .append(AuditRecord::failure(action, actor, target, &error));
        error
    }

    fn record<T>(
        &self,
        action: AuditAction,
        actor: &str,
        target: Option<&str>,
        result: &Result<T, AccessError>,
        describe: impl FnOnce(&T) -> String,
    ) {
        let record = match result {
            Ok(value) => {
                info!(?action, actor, object = ?target, "access granted");
                AuditRecord::success(action, actor, target, describe(value))
            }
            Err(error) => {
                warn!(
                    ?action,
                    actor,
                    object = ?target,
                    kind = ?error.kind(),
                    reason = %error,
                    "access denied"
                );
                AuditRecord::failure(action, actor, target, error)
            }
        };
        self.audit.append(record);
    }
}

fn resolve_subject<'a, S: SecurityStore + ?Sized>(
    store: &'a S,
    actor: &str,
) -> Result<&'a Subject, AccessError> {
    store
        .subject(actor)
        .ok_or_else(|| AccessError::SubjectNotFound(actor.to_owned()))
}

fn resolve_pair<'a, S: SecurityStore + ?Sized>(
    store: &'a S,
    actor: &str,
    name: &str,
) -> Result<(&'a Subject, &'a LabeledObject), AccessError> {
    let subject = resolve_subject(store, actor)?;
    let object = store
        .object(name)
        .ok_or_else(|| AccessError::ObjectNotFound(name.to_owned()))?;
    Ok((subject, object))
}
