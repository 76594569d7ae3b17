//! Diagnostic accumulator shared by the stages of a pass.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Accumulates diagnostics emitted during a run.
///
/// Per-severity counts are kept atomically so `has_errors` and `count` do not
/// lock the diagnostic vector.
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    counts: [AtomicUsize; 4],
}

impl DiagnosticSink {
    /// Creates a new empty diagnostic sink.
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            counts: Default::default(),
        }
    }

    /// Emits a diagnostic into the sink.
    pub fn emit(&self, diag: Diagnostic) {
        self.counts[diag.severity.index()].fetch_add(1, Ordering::Relaxed);
        self.lock().push(diag);
    }

    /// Returns `true` if any error-severity diagnostics have been emitted.
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Returns how many diagnostics of `severity` have been emitted so far.
    ///
    /// Counts survive [`take_all`](Self::take_all).
    pub fn count(&self, severity: Severity) -> usize {
        self.counts[severity.index()].load(Ordering::Relaxed)
    }

    /// Takes all accumulated diagnostics, leaving the sink empty.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    /// Returns a snapshot of all accumulated diagnostics without draining.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        // A panic while holding the lock cannot leave the Vec half-updated.
        self.diagnostics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    fn note() -> Diagnostic {
        Diagnostic::note(DiagnosticCode::new(Category::Note, 101), "group 0 placed")
    }

    fn error() -> Diagnostic {
        Diagnostic::error(DiagnosticCode::new(Category::Error, 305), "no valid site")
    }

    #[test]
    fn empty_sink() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        assert!(sink.take_all().is_empty());
    }

    #[test]
    fn counts_by_severity() {
        let sink = DiagnosticSink::new();
        sink.emit(note());
        sink.emit(note());
        sink.emit(error());
        assert_eq!(sink.count(Severity::Note), 2);
        assert_eq!(sink.count(Severity::Error), 1);
        assert_eq!(sink.count(Severity::Warning), 0);
        assert!(sink.has_errors());
    }

    #[test]
    fn take_all_drains_but_keeps_counts() {
        let sink = DiagnosticSink::new();
        sink.emit(error());
        sink.emit(note());
        assert_eq!(sink.take_all().len(), 2);
        assert!(sink.diagnostics().is_empty());
        assert_eq!(sink.count(Severity::Error), 1);
    }
}
