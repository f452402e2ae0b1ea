//! Shared fixtures for service tests.

use std::sync::Arc;

use clearance::audit::MemoryAuditLog;
use clearance::credential::{CredentialError, CredentialVerifier, StoredCredential};
use clearance::label::{Category, Label, Level};
use clearance::service::AccessService;
use clearance::store::InMemoryStore;

/// Stores the password verbatim so tests do not depend on a KDF.
pub struct PlainVerifier;

impl CredentialVerifier for PlainVerifier {
    fn hash(&self, password: &str) -> Result<StoredCredential, CredentialError> {
        Ok(StoredCredential::new(format!("plain:{password}")))
    }

    fn verify(&self, password: &str, stored: &StoredCredential) -> bool {
        stored.as_str().strip_prefix("plain:") == Some(password)
    }
}

pub type TestService = AccessService<InMemoryStore>;

pub fn service() -> (Arc<TestService>, Arc<MemoryAuditLog>) {
    let audit = Arc::new(MemoryAuditLog::new());
    let service = AccessService::new(InMemoryStore::new(), Arc::new(PlainVerifier), audit.clone());
    (Arc::new(service), audit)
}

pub fn label(level: Level, categories: &[Category]) -> Label {
    Label::new(level, categories.iter().copied())
}

/// Register `id` with password `pw`, panicking on failure.
pub async fn register(service: &TestService, id: &str, level: Level, categories: &[Category]) {
    if let Err(err) = service.register(id, "pw", label(level, categories)).await {
        panic!("register {id} should succeed: {err}");
    }
}
