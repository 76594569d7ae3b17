//! Diagnostic rendering backends.

use crate::diagnostic::Diagnostic;

/// Formats a diagnostic for output.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;

    /// Renders every diagnostic in order, concatenated.
    fn render_all(&self, diags: &[Diagnostic]) -> String {
        diags.iter().map(|d| self.render(d)).collect()
    }
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// ```text
/// error[E305]: no valid site for block
///   --> group 1, block 4/a (ISERDES Shift)
///    = note: searched around X1/Y5/lc0
/// ```
pub struct TerminalRenderer {
    /// Whether to color the severity with ANSI escape codes.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn severity_label(&self, diag: &Diagnostic) -> String {
        if !self.color {
            return diag.severity.to_string();
        }
        let ansi = match diag.severity {
            crate::Severity::Error => "31",
            crate::Severity::Warning => "33",
            crate::Severity::Note => "36",
            crate::Severity::Help => "32",
        };
        format!("\x1b[1;{ansi}m{}\x1b[0m", diag.severity)
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!(
            "{}[{}]: {}\n",
            self.severity_label(diag),
            diag.code,
            diag.message
        );
        if let Some(subject) = &diag.subject {
            out.push_str(&format!("  --> {subject}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

/// Renders each diagnostic as one line of JSON.
pub struct JsonRenderer;

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        // Serializing plain strings and enums into a String cannot fail.
        let mut line = serde_json::to_string(diag).unwrap_or_default();
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    fn sample() -> Diagnostic {
        Diagnostic::error(DiagnosticCode::new(Category::Error, 305), "no valid site for block")
            .with_subject("group 1, block 4/a")
            .with_note("target X1/Y5/lc0")
            .with_help("free a neighbouring site")
    }

    #[test]
    fn terminal_plain() {
        let out = TerminalRenderer::new(false).render(&sample());
        assert!(out.starts_with("error[E305]: no valid site for block\n"));
        assert!(out.contains("  --> group 1, block 4/a\n"));
        assert!(out.contains("   = note: target X1/Y5/lc0\n"));
        assert!(out.contains("   = help: free a neighbouring site\n"));
    }

    #[test]
    fn terminal_color_wraps_severity() {
        let out = TerminalRenderer::new(true).render(&sample());
        assert!(out.starts_with("\x1b[1;31merror\x1b[0m[E305]"));
    }

    #[test]
    fn terminal_without_subject() {
        let diag = Diagnostic::note(DiagnosticCode::new(Category::Note, 101), "done");
        assert_eq!(TerminalRenderer::new(false).render(&diag), "note[N101]: done\n");
    }

    #[test]
    fn json_one_line_each() {
        let diags = vec![sample(), sample()];
        let out = JsonRenderer.render_all(&diags);
        assert_eq!(out.lines().count(), 2);
        let first: Diagnostic = serde_json::from_str(out.lines().next().unwrap()).unwrap();
        assert_eq!(first, sample());
    }
}
