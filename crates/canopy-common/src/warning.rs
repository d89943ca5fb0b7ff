//! Non-fatal warnings and the sinks that receive them.
//!
//! The selector engine never prints anything itself. Every component that
//! tolerates bad input reports it through a [`DiagnosticSink`] handed in by
//! the caller, so the engine stays side-effect free and testable.

use std::collections::HashSet;
use std::fmt;

/// ANSI color codes for terminal output
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// A single non-fatal problem found while processing input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Warning {
    /// Component that raised the warning, e.g. `"Selector"`.
    pub component: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl Warning {
    /// Create a warning for `component`.
    #[must_use]
    pub fn new(component: &'static str, message: impl Into<String>) -> Self {
        Self {
            component,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.component, self.message)
    }
}

/// Receiver for warnings.
pub trait DiagnosticSink {
    /// Record one warning.
    fn warn(&mut self, warning: Warning);
}

/// Sink that keeps every warning in order.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create an empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Warnings recorded so far, oldest first.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Take ownership of the recorded warnings.
    #[must_use]
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

impl DiagnosticSink for Diagnostics {
    fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreWarnings;

impl DiagnosticSink for IgnoreWarnings {
    fn warn(&mut self, _warning: Warning) {}
}

/// Sink that prints each distinct warning once to stderr, in yellow.
///
/// # Example
/// ```ignore
/// let mut sink = StderrSink::new();
/// sink.warn(Warning::new("Selector", "bad number in range: strip[x]"));
/// ```
#[derive(Debug, Default)]
pub struct StderrSink {
    seen: HashSet<Warning>,
}

impl StderrSink {
    /// Create a sink with nothing printed yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget what has been printed (call when starting on new input).
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

impl DiagnosticSink for StderrSink {
    fn warn(&mut self, warning: Warning) {
        let component = warning.component;
        let message = warning.message.clone();
        if self.seen.insert(warning) {
            eprintln!("{YELLOW}[Canopy {component}] ⚠ {message}{RESET}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_keep_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(Warning::new("A", "first"));
        diagnostics.warn(Warning::new("B", "second"));
        assert_eq!(diagnostics.warnings().len(), 2);
        assert_eq!(diagnostics.warnings()[0].to_string(), "[A] first");
        assert_eq!(diagnostics.warnings()[1].component, "B");
    }

    #[test]
    fn stderr_sink_deduplicates() {
        let mut sink = StderrSink::new();
        sink.warn(Warning::new("Selector", "same"));
        sink.warn(Warning::new("Selector", "same"));
        assert_eq!(sink.seen.len(), 1);
        sink.clear();
        assert!(sink.seen.is_empty());
    }
}
