// crates/hello-action-server/src/audit.rs
// ============================================================================
// Module: Action Audit Logging
// Description: Structured audit events for authentication and follow-ups.
// Purpose: Emit JSON-line audit records without a logging framework.
// Dependencies: hello-action-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every authentication decision and every follow-up lifecycle transition is
//! written as one JSON line. Sinks are pluggable; follow-up failures are only
//! ever visible here, never in an HTTP response. Signatures, tokens, and
//! request bodies are never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use hello_action_core::LifecycleEvent;
use hello_action_core::LifecycleObserver;
use hello_action_core::LifecycleState;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Authentication decision for an inbound interaction.
#[derive(Debug, Clone, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// `allow` or `deny`.
    pub decision: &'static str,
    /// Scheme of the verified signature.
    pub scheme: Option<&'static str>,
    /// Normalized failure label.
    pub reason: Option<&'static str>,
    /// HTTP status returned.
    pub status: u16,
    /// Interaction identifier when the payload parsed.
    pub interaction_id: Option<String>,
    /// Request body size in bytes.
    pub request_bytes: usize,
}

impl AuthAuditEvent {
    /// Creates an allow event.
    #[must_use]
    pub fn allow(scheme: &'static str, interaction_id: String, request_bytes: usize) -> Self {
        Self {
            event: "interaction_auth",
            timestamp_ms: now_ms(),
            decision: "allow",
            scheme: Some(scheme),
            reason: None,
            status: 200,
            interaction_id: Some(interaction_id),
            request_bytes,
        }
    }

    /// Creates a deny event.
    #[must_use]
    pub fn deny(reason: &'static str, status: u16, request_bytes: usize) -> Self {
        Self {
            event: "interaction_auth",
            timestamp_ms: now_ms(),
            decision: "deny",
            scheme: None,
            reason: Some(reason),
            status,
            interaction_id: None,
            request_bytes,
        }
    }
}

/// Follow-up lifecycle transition.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Interaction identifier.
    pub interaction_id: String,
    /// State before the transition.
    pub from: LifecycleState,
    /// State after the transition.
    pub to: LifecycleState,
    /// Follow-up message id when known.
    pub message_id: Option<String>,
    /// Edit number for edit transitions.
    pub edit: Option<usize>,
    /// Error text for failures.
    pub error: Option<String>,
}

impl From<&LifecycleEvent> for LifecycleAuditEvent {
    fn from(event: &LifecycleEvent) -> Self {
        Self {
            event: "followup_lifecycle",
            timestamp_ms: now_ms(),
            interaction_id: event.interaction_id.clone(),
            from: event.from,
            to: event.to,
            message_id: event.message_id.clone(),
            edit: event.edit,
            error: event.error.clone(),
        }
    }
}

/// Returns the current time in milliseconds since the epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for action events.
pub trait ActionAuditSink: Send + Sync {
    /// Record an authentication decision.
    fn record_auth(&self, event: &AuthAuditEvent);

    /// Record a lifecycle transition.
    fn record_lifecycle(&self, _event: &LifecycleAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ActionAuditSink for StderrAuditSink {
    fn record_auth(&self, event: &AuthAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event.
    fn write_line<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event) {
            if let Ok(mut guard) = self.file.lock() {
                let _ = writeln!(guard, "{payload}");
            }
        }
    }
}

impl ActionAuditSink for FileAuditSink {
    fn record_auth(&self, event: &AuthAuditEvent) {
        self.write_line(event);
    }

    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        self.write_line(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl ActionAuditSink for NoopAuditSink {
    fn record_auth(&self, _event: &AuthAuditEvent) {}
}

// ============================================================================
// SECTION: Lifecycle Bridge
// ============================================================================

/// Forwards lifecycle transitions to an audit sink.
#[derive(Clone)]
pub struct AuditLifecycleObserver {
    /// Destination sink.
    sink: Arc<dyn ActionAuditSink>,
}

impl AuditLifecycleObserver {
    /// Wraps `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn ActionAuditSink>) -> Self {
        Self {
            sink,
        }
    }
}

impl LifecycleObserver for AuditLifecycleObserver {
    fn record(&self, event: &LifecycleEvent) {
        self.sink.record_lifecycle(&LifecycleAuditEvent::from(event));
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
