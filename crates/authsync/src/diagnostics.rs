//! Structured reporting of reconciliation failures and decisions.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, info, warn};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// `get_user` failed; the pair degrades to empty.
    UserLookupFailed,
    /// `get_user` succeeded but reported no user.
    NoUser,
    /// `get_session` failed while a user was present.
    SessionLookupFailed,
    /// `get_user` and `get_session` named different identities.
    IdentityDivergence,
    /// A placeholder session was built for a verified user.
    SessionSynthesized,
    /// Initialization failed as a whole and was reset to empty.
    InitializationFailed,
    /// An auth event changed the pair.
    EventApplied,
    /// An auth event carried the already-held session.
    EventSkipped,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserLookupFailed => "user_lookup_failed",
            Self::NoUser => "no_user",
            Self::SessionLookupFailed => "session_lookup_failed",
            Self::IdentityDivergence => "identity_divergence",
            Self::SessionSynthesized => "session_synthesized",
            Self::InitializationFailed => "initialization_failed",
            Self::EventApplied => "event_applied",
            Self::EventSkipped => "event_skipped",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured observability record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub user_id: Option<String>,
    /// Rendered cause, when the record reports a failure.
    pub error: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            user_id: None,
            error: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Receives every [`Diagnostic`] the reconciler produces.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Emits diagnostics as `tracing` events at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, d: Diagnostic) {
        let kind = d.kind.as_str();
        let user_id = d.user_id.as_deref().unwrap_or("");
        let cause = d.error.as_deref().unwrap_or("");
        match d.severity {
            Severity::Debug => debug!(kind, user_id, error = cause, "{}", d.message),
            Severity::Info => info!(kind, user_id, error = cause, "{}", d.message),
            Severity::Warning => warn!(kind, user_id, error = cause, "{}", d.message),
            Severity::Error => error!(kind, user_id, error = cause, "{}", d.message),
        }
    }
}

/// Keeps diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Diagnostic> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.records().into_iter().map(|d| d.kind).collect()
    }

    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.kinds().contains(&kind)
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: Diagnostic) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for std::sync::Arc<S> {
    fn report(&self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}
