use std::fmt;
use std::path::PathBuf;

use crate::diagnostics::{Diagnostic, DiagnosticCode, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LintCategory {
    Correctness,
}

impl LintCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correctness => "correctness",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "correctness" => Some(Self::Correctness),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintLevel {
    Allow,
    Warn,
    Error,
}

impl LintLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "allow" | "off" => Some(Self::Allow),
            "warn" | "warning" => Some(Self::Warn),
            "deny" | "error" => Some(Self::Error),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

#[derive(Debug, Clone)]
pub struct LintDescriptor {
    pub code: &'static str,
    pub name: &'static str,
    /// Other spellings accepted by suppression attributes, e.g. `@SuppressWarnings("GuardedBy")`.
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub category: LintCategory,
    pub default_level: LintLevel,
}

#[derive(Debug, Clone)]
pub struct LintSuggestion {
    pub message: String,
    pub span: Option<Span>,
}

impl LintSuggestion {
    #[must_use]
    pub fn new(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LintDiagnostic {
    pub descriptor: &'static LintDescriptor,
    pub level: LintLevel,
    pub message: String,
    pub file: PathBuf,
    pub span: Option<Span>,
    pub notes: Vec<String>,
    pub suggestions: Vec<LintSuggestion>,
}

impl LintDiagnostic {
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.descriptor.code
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    /// Host diagnostic carrying the lint code; suggestions become `help:` notes.
    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = if self.level.is_error() {
            Diagnostic::error(self.message.clone(), self.span)
        } else {
            Diagnostic::warning(self.message.clone(), self.span)
        };
        let mut diagnostic = diagnostic.with_code(DiagnosticCode::new(
            self.descriptor.code,
            Some(self.descriptor.category.as_str().to_string()),
        ));
        for note in &self.notes {
            diagnostic.add_note(note.clone());
        }
        for suggestion in &self.suggestions {
            diagnostic.add_note(format!("help: {}", suggestion.message));
        }
        diagnostic
    }
}

impl fmt::Display for LintDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = match self.span {
            Some(span) => format!(":{}..{}", span.start, span.end),
            None => String::new(),
        };
        write!(
            f,
            "{} [{}] {}{}: {}",
            self.level.as_str(),
            self.descriptor.name,
            self.file.display(),
            span,
            self.message
        )
    }
}
