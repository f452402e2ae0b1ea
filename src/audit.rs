//! Audit trail for access-control decisions.
//!
//! Every operation, granted or denied, produces exactly one [`AuditRecord`].
//! Sinks are write-only from the core's point of view and can never fail
//! the caller: write errors are reported through `tracing` and swallowed.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use crate::error::{AccessError, ErrorKind};

/// Operation being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Subject registration.
    Register,
    /// Credential check.
    Authenticate,
    /// Object creation.
    CreateObject,
    /// Object content read.
    ReadObject,
    /// Object content replacement.
    UpdateObject,
    /// Object removal.
    DeleteObject,
}

/// Whether the audited operation took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Operation granted and applied.
    Success,
    /// Operation refused or failed; nothing changed.
    Failure,
}

/// One immutable entry in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique id of this record.
    pub record_id: Uuid,
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
    /// Subject id that initiated the operation.
    pub actor: String,
    /// Operation performed.
    pub action: AuditAction,
    /// Object name, when the operation targets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Grant or deny.
    pub outcome: AuditOutcome,
    /// Failure classification, absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Human-readable reason.
    pub reason: String,
}

impl AuditRecord {
    /// Record a successful operation.
    pub fn success(
        action: AuditAction,
        actor: &str,
        target: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        Self::build(action, actor, target, AuditOutcome::Success, None, reason.into())
    }

    /// Record a refused or failed operation.
    pub fn failure(
        action: AuditAction,
        actor: &str,
        target: Option<&str>,
        error: &AccessError,
    ) -> Self {
        Self::build(
            action,
            actor,
            target,
            AuditOutcome::Failure,
            Some(error.kind()),
            error.to_string(),
        )
    }

    fn build(
        action: AuditAction,
        actor: &str,
        target: Option<&str>,
        outcome: AuditOutcome,
        error_kind: Option<ErrorKind>,
        reason: String,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: actor.to_owned(),
            action,
            target: target.map(str::to_owned),
            outcome,
            error_kind,
            reason,
        }
    }
}

/// Append-only destination for audit records.
///
/// `append` is infallible by contract: implementations report their own
/// failures out-of-band and never surface them to the caller.
pub trait AuditSink: Send + Sync {
    /// Append one record.
    fn append(&self, record: AuditRecord);
}

// ── JSON lines ──

/// Writes one JSON object per line to an append-only writer.
pub struct JsonLinesAuditLog {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesAuditLog {
    /// Append to the file at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for appending.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| anyhow::anyhow!("failed to open audit log {}: {e}", path.display()))?;
        Ok(Self::from_writer(Box::new(file)))
    }

    /// Wrap an arbitrary writer (for testing).
    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn write_record(&self, record: &AuditRecord) -> anyhow::Result<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("audit lock poisoned: {e}"))?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}

impl AuditSink for JsonLinesAuditLog {
    fn append(&self, record: AuditRecord) {
        if let Err(e) = self.write_record(&record) {
            warn!(
                error = %e,
                record_id = %record.record_id,
                action = ?record.action,
                "failed to write audit record"
            );
        }
    }
}

// ── In memory ──

/// Keeps records in memory. Used by tests and the CLI summary.
#[derive(Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records in arrival order.
    pub fn records(&self) -> Vec<AuditRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        match self.records.lock() {
            Ok(records) => records.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// `true` if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, record: AuditRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

// ── Fan-out ──

/// Appends every record to each inner sink in turn.
pub struct TeeAuditLog {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl TeeAuditLog {
    /// Combine several sinks.
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }
}

impl AuditSink for TeeAuditLog {
    fn append(&self, record: AuditRecord) {
        for sink in &self.sinks {
            sink.append(record.clone());
        }
    }
}

// ── Asynchronous ──

/// Hands records to a background task over an unbounded channel.
///
/// `append` never blocks. A single consumer drains the channel, so records
/// reach the inner sink in arrival order.
pub struct ChannelAuditLog {
    tx: mpsc::UnboundedSender<AuditRecord>,
}

/// Background task draining a [`ChannelAuditLog`].
pub struct AuditWorker {
    handle: JoinHandle<usize>,
}

impl ChannelAuditLog {
    /// Spawn the draining task on the current tokio runtime.
    pub fn spawn(inner: Arc<dyn AuditSink>) -> (Self, AuditWorker) {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditRecord>();
        let handle = tokio::spawn(async move {
            let mut written: usize = 0;
            while let Some(record) = rx.recv().await {
                inner.append(record);
                written = written.saturating_add(1);
            }
            written
        });
        (Self { tx }, AuditWorker { handle })
    }
}

impl AuditSink for ChannelAuditLog {
    fn append(&self, record: AuditRecord) {
        if let Err(e) = self.tx.send(record) {
            warn!(record_id = %e.0.record_id, "audit worker stopped; record dropped");
        }
    }
}

impl AuditWorker {
    /// Wait for the worker to drain. Completes once every
    /// [`ChannelAuditLog`] handle has been dropped.
    ///
    /// Returns the number of records delivered.
    pub async fn finish(self) -> usize {
        match self.handle.await {
            Ok(written) => written,
            Err(e) => {
                warn!(error = %e, "audit worker terminated abnormally");
                0
            }
        }
    }
}
