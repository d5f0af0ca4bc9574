//! Diagnostic sinks for key-loading and signing failures.
//!
//! Every failure path in [`crate::key::PrivateKey`] emits exactly one
//! [`Diagnostic`] to the sink injected into the handle. The default sink
//! forwards to `tracing`; [`CapturingSink`] keeps records in memory.

use std::fmt;
use std::sync::Mutex;

use crate::error::{Error, ErrorKind};

/// One human-readable failure report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Operation that failed, e.g. `"PrivateKey::load"`.
    pub operation: &'static str,
    /// Underlying cause, including the failing step where there is one.
    pub detail: String,
    /// Error category, when the diagnostic came from an [`Error`].
    pub kind: Option<ErrorKind>,
}

impl Diagnostic {
    pub fn new(operation: &'static str, detail: impl Into<String>) -> Self {
        Self {
            operation,
            detail: detail.into(),
            kind: None,
        }
    }

    pub fn from_error(operation: &'static str, err: &Error) -> Self {
        Self {
            kind: Some(err.kind()),
            ..Self::new(operation, err.to_string())
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "{}: [{}] {}", self.operation, kind, self.detail),
            None => write!(f, "{}: {}", self.operation, self.detail),
        }
    }
}

/// Receives diagnostics. Implementations must tolerate calls from any thread.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        tracing::error!(
            operation = diagnostic.operation,
            detail = %diagnostic.detail,
            "{}",
            diagnostic
        );
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CapturingSink {
    records: Mutex<Vec<Diagnostic>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, oldest first.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for CapturingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic.clone());
    }
}
