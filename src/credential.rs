//! Pluggable credential verification.
//!
//! The access-control core only ever calls [`CredentialVerifier::hash`] at
//! registration and [`CredentialVerifier::verify`] at authentication; it never
//! inspects the stored form. [`Pbkdf2Verifier`] is the production
//! implementation: a random per-credential salt fed through PBKDF2-HMAC-SHA256.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::warn;

const SCHEME: &str = "pbkdf2-sha256";
const DERIVED_LEN: usize = 32;

/// Credential hashing or decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The stored credential string is not in the expected format.
    #[error("malformed stored credential: {0}")]
    Malformed(String),
    /// Key derivation could not complete.
    #[error("key derivation failed: {0}")]
    Derivation(String),
}

/// Password as received at the boundary.
///
/// Debug output always shows `__REDACTED__`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    /// Wrap a plaintext password.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the plaintext. Use only when handing it to a verifier.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("__REDACTED__")
    }
}

/// Opaque verifier state kept alongside a subject.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredCredential(String);

impl StoredCredential {
    /// Wrap an encoded credential produced by a verifier.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("__REDACTED__")
    }
}

/// External collaborator that hashes and verifies passwords.
pub trait CredentialVerifier: Send + Sync {
    /// Produce stored verifier state for `password`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] if the primitive fails.
    fn hash(&self, password: &str) -> Result<StoredCredential, CredentialError>;

    /// `true` iff `password` matches `stored`.
    fn verify(&self, password: &str, stored: &StoredCredential) -> bool;
}

/// Salted PBKDF2-HMAC-SHA256 verifier.
///
/// Encoded as `pbkdf2-sha256$<iterations>$<salt>$<hash>` with unpadded
/// base64. The iteration count travels with the credential, so raising it
/// later does not invalidate existing subjects.
#[derive(Debug, Clone)]
pub struct Pbkdf2Verifier {
    iterations: u32,
    salt_len: usize,
}

impl Pbkdf2Verifier {
    /// Create a verifier with the given work factor and salt length.
    pub fn new(iterations: u32, salt_len: usize) -> Self {
        Self {
            iterations: iterations.max(1),
            salt_len: salt_len.max(1),
        }
    }
}

impl Default for Pbkdf2Verifier {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_KDF_ITERATIONS, crate::config::DEFAULT_SALT_LEN)
    }
}

impl CredentialVerifier for Pbkdf2Verifier {
    fn hash(&self, password: &str) -> Result<StoredCredential, CredentialError> {
        let mut salt = vec![0u8; self.salt_len];
        rand::thread_rng().fill_bytes(&mut salt);
        let derived = pbkdf2_sha256(password.as_bytes(), &salt, self.iterations);
        Ok(StoredCredential(format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            STANDARD_NO_PAD.encode(&salt),
            STANDARD_NO_PAD.encode(derived)
        )))
    }

    fn verify(&self, password: &str, stored: &StoredCredential) -> bool {
        let parsed = match ParsedCredential::decode(stored.as_str()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "rejecting malformed stored credential");
                return false;
            }
        };
        let derived = pbkdf2_sha256(password.as_bytes(), &parsed.salt, parsed.iterations);
        derived.as_slice().ct_eq(parsed.hash.as_slice()).into()
    }
}

struct ParsedCredential {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl ParsedCredential {
    fn decode(encoded: &str) -> Result<Self, CredentialError> {
        let mut parts = encoded.split('$');
        let scheme = parts.next().unwrap_or_default();
        if scheme != SCHEME {
            return Err(CredentialError::Malformed(format!(
                "unsupported scheme '{scheme}'"
            )));
        }
        let (Some(iterations), Some(salt), Some(hash), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CredentialError::Malformed(
                "expected 4 '$'-separated fields".to_owned(),
            ));
        };
        let iterations: u32 = iterations
            .parse()
            .map_err(|e| CredentialError::Malformed(format!("iterations: {e}")))?;
        if iterations == 0 {
            return Err(CredentialError::Malformed("iterations must be > 0".to_owned()));
        }
        let salt = STANDARD_NO_PAD
            .decode(salt)
            .map_err(|e| CredentialError::Malformed(format!("salt: {e}")))?;
        let hash = STANDARD_NO_PAD
            .decode(hash)
            .map_err(|e| CredentialError::Malformed(format!("hash: {e}")))?;
        if hash.len() != DERIVED_LEN {
            return Err(CredentialError::Malformed(format!(
                "hash must be {DERIVED_LEN} bytes, got {}",
                hash.len()
            )));
        }
        Ok(Self {
            iterations,
            salt,
            hash,
        })
    }
}

/// PBKDF2 (RFC 8018) with HMAC-SHA256, one 32-byte block.
fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> [u8; DERIVED_LEN] {
    let mut derived = [0u8; DERIVED_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut derived);
    derived
}
