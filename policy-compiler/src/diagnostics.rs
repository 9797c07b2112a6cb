//! Rendering for the compiler's error taxonomy.

use policy_core::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// `{ kind, message, range }` — every diagnostic carries all three.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: &'static str,
    pub message: String,
    pub range: Range,
}

impl Diagnostic {
    pub fn error(kind: &'static str, message: impl Into<String>, range: Range) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
            range,
        }
    }

    pub fn warning(kind: &'static str, message: impl Into<String>, range: Range) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message: message.into(),
            range,
        }
    }

    /// Elm-style terminal rendering, following the category-dashboard format
    /// this front end's diagnostics are meant to share with the evaluator's.
    pub fn render_ansi(&self) -> String {
        let category = match self.severity {
            Severity::Error => self.kind,
            Severity::Warning => "WARNING",
        };
        let color = match self.severity {
            Severity::Error => red,
            Severity::Warning => cyan,
        };
        let location = format!(" {} ", self.range);
        let title_width = 80usize;
        let dashes = title_width.saturating_sub(category.len() + location.len() + 6);
        format!(
            "{}{}{}\n\n  {}\n",
            color(&format!("── {category} {}", "─".repeat(dashes))),
            color(&location),
            color("──"),
            self.message,
        )
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.kind, self.message, self.range)
    }
}

fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}

fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy_core::Pos;
    use std::sync::Arc;

    #[test]
    fn display_matches_range_format() {
        let range = Range::point(Arc::from("p.pl"), Pos::new(2, 3, 10));
        let d = Diagnostic::error("OrderingViolation", "fact after use", range);
        assert!(d.to_string().contains("p.pl:2:3-3"));
    }
}
