//! Configuration loading and validation.
//!
//! Loaded from `config.toml` (path given on the command line, or
//! `~/.clearance/config.toml`). Every field has a default, so a missing
//! file is not an error.
//!
//! Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Default PBKDF2 work factor for new credentials.
pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;
/// Default salt length in bytes.
pub const DEFAULT_SALT_LEN: usize = 16;

const MIN_KDF_ITERATIONS: u32 = 1_000;
const MIN_SALT_LEN: usize = 8;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Audit trail destination.
    pub audit: AuditConfig,
    /// Credential hashing parameters.
    pub credentials: CredentialsConfig,
    /// Diagnostic logging.
    pub logging: LoggingConfig,
}

/// Audit trail settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// JSON-lines file the audit trail is appended to. `None` keeps it in memory.
    pub path: Option<PathBuf>,
    /// Write records from a background task instead of inline.
    pub asynchronous: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: None,
            asynchronous: true,
        }
    }
}

/// Password hashing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// PBKDF2 iteration count.
    pub iterations: u32,
    /// Random salt length in bytes.
    pub salt_len: usize,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_KDF_ITERATIONS,
            salt_len: DEFAULT_SALT_LEN,
        }
    }
}

/// Diagnostic logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated JSON logs. Console only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            dir: None,
        }
    }
}

impl Config {
    /// Load from `path` (or the default location), then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting values fail validation.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_dir()?.join("config.toml"),
        };
        let mut config = load_config(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Apply environment overrides through `env` (injectable for tests).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("CLEARANCE_AUDIT_LOG") {
            self.audit.path = Some(PathBuf::from(v));
        }
        if let Some(v) = env("CLEARANCE_KDF_ITERATIONS") {
            match v.parse() {
                Ok(n) => self.credentials.iterations = n,
                Err(_) => tracing::warn!(
                    var = "CLEARANCE_KDF_ITERATIONS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("CLEARANCE_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Reject parameters too weak to protect stored credentials.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending field.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.credentials.iterations < MIN_KDF_ITERATIONS {
            anyhow::bail!(
                "credentials.iterations must be at least {MIN_KDF_ITERATIONS}, got {}",
                self.credentials.iterations
            );
        }
        if self.credentials.salt_len < MIN_SALT_LEN {
            anyhow::bail!(
                "credentials.salt_len must be at least {MIN_SALT_LEN}, got {}",
                self.credentials.salt_len
            );
        }
        Ok(())
    }
}

/// Load config from a TOML file, returning defaults if it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            tracing::debug!(path = %path.display(), "loading config from file");
            toml::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(anyhow::anyhow!(
            "failed to read config at {}: {e}",
            path.display()
        )),
    }
}

/// Resolve the default config directory (`~/.clearance/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".clearance"))
}
