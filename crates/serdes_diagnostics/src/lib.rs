//! Structured diagnostics for the SerDes placement pass.
//!
//! Every stage of the pass reports through a [`DiagnosticSink`] instead of
//! printing: group summaries and fallback notices are emitted as notes, and
//! fatal placement errors convert into error diagnostics that the embedding
//! tool renders with a [`DiagnosticRenderer`].

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
