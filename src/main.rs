//! Clearance CLI entry point.
//!
//! Provides `run`, `check`, and `hash-password` subcommands for replaying a
//! request script against a fresh in-memory service, validating a script
//! without executing it, or producing a stored credential.

#![forbid(unsafe_code)]

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use clearance::audit::{
    AuditSink, AuditWorker, ChannelAuditLog, JsonLinesAuditLog, MemoryAuditLog, TeeAuditLog,
};
use clearance::config::Config;
use clearance::credential::{CredentialVerifier, Pbkdf2Verifier};
use clearance::request::ErrorResponse;
use clearance::script::load_script;
use clearance::service::AccessService;
use clearance::store::InMemoryStore;

/// Clearance: multi-level-security access control.
#[derive(Parser)]
#[command(name = "clearance", version, about)]
struct Cli {
    /// Path to `config.toml` (default: `~/.clearance/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Execute a request script and print one JSON result per request.
    Run {
        /// JSON-lines or JSON-array script.
        script: PathBuf,
    },
    /// Parse and validate a request script without executing it.
    Check {
        /// JSON-lines or JSON-array script.
        script: PathBuf,
    },
    /// Read a password from stdin and print its stored credential.
    HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    let _logging_guard = match &config.logging.dir {
        Some(dir) => Some(clearance::logging::init_file(dir, &config.logging.level)?),
        None => {
            clearance::logging::init_console(&config.logging.level);
            None
        }
    };
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "loaded environment file");
    }

    match cli.command {
        Command::Run { script } => handle_run(&config, &script).await,
        Command::Check { script } => handle_check(&script),
        Command::HashPassword => handle_hash_password(&config),
    }
}

fn verifier(config: &Config) -> Pbkdf2Verifier {
    Pbkdf2Verifier::new(config.credentials.iterations, config.credentials.salt_len)
}

/// Build the audit pipeline: in-memory tally, optional JSON-lines file,
/// optionally behind a background worker.
fn audit_pipeline(
    config: &Config,
    memory: Arc<MemoryAuditLog>,
) -> anyhow::Result<(Arc<dyn AuditSink>, Option<AuditWorker>)> {
    let mut sinks: Vec<Arc<dyn AuditSink>> = Vec::new();
    sinks.push(memory);
    if let Some(path) = &config.audit.path {
        sinks.push(Arc::new(JsonLinesAuditLog::open(path)?));
        info!(path = %path.display(), "audit trail opened");
    }
    let tee: Arc<dyn AuditSink> = Arc::new(TeeAuditLog::new(sinks));
    if config.audit.asynchronous {
        let (log, worker) = ChannelAuditLog::spawn(tee);
        Ok((Arc::new(log), Some(worker)))
    } else {
        Ok((tee, None))
    }
}

/// Execute every request in order against a fresh service.
async fn handle_run(config: &Config, script: &Path) -> anyhow::Result<()> {
    let requests = load_script(script)?;
    let total = requests.len();

    let memory = Arc::new(MemoryAuditLog::new());
    let (audit, worker) = audit_pipeline(config, Arc::clone(&memory))?;
    let service = AccessService::new(InMemoryStore::new(), Arc::new(verifier(config)), audit);

    let mut failed: usize = 0;
    for request in requests {
        let line = match service.execute(request).await {
            Ok(response) => serde_json::to_string(&response)?,
            Err(e) => {
                failed = failed.saturating_add(1);
                serde_json::to_string(&ErrorResponse::from(&e))?
            }
        };
        println!("{line}");
    }

    let (subjects, objects) = service.counts().await;
    // Dropping the service closes the audit channel so the worker can drain.
    drop(service);
    if let Some(worker) = worker {
        worker.finish().await;
    }

    info!(
        requests = total,
        failed,
        subjects,
        objects,
        audit_records = memory.len(),
        "script complete"
    );
    Ok(())
}

/// Validate every request; fail if any is malformed.
fn handle_check(script: &Path) -> anyhow::Result<()> {
    let requests = load_script(script)?;
    let mut invalid: usize = 0;
    for (index, request) in requests.iter().enumerate() {
        if let Err(e) = request.validate() {
            invalid = invalid.saturating_add(1);
            warn!(request = index.saturating_add(1), error = %e, "invalid request");
            println!("request {}: {e}", index.saturating_add(1));
        }
    }
    if invalid > 0 {
        anyhow::bail!("{invalid} of {} requests are invalid", requests.len());
    }
    println!("{} requests OK", requests.len());
    Ok(())
}

/// Hash one line of stdin with the configured verifier.
fn handle_hash_password(config: &Config) -> anyhow::Result<()> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    let stored = verifier(config).hash(password)?;
    println!("{}", stored.as_str());
    Ok(())
}
