use crate::diagnostics::Span;
use crate::frontend::ast::CompilationUnit;

use super::allow::LintAllowance;
use super::config::LintConfig;
use super::diagnostic::{LintDescriptor, LintDiagnostic, LintLevel};

/// What a check sees while it runs over one compilation unit.
pub struct LintContext<'u> {
    unit: &'u CompilationUnit,
    config: &'u LintConfig,
    diagnostics: Vec<LintDiagnostic>,
}

impl<'u> LintContext<'u> {
    #[must_use]
    pub fn new(unit: &'u CompilationUnit, config: &'u LintConfig) -> Self {
        Self {
            unit,
            config,
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn unit(&self) -> &'u CompilationUnit {
        self.unit
    }

    #[must_use]
    pub fn config(&self) -> &'u LintConfig {
        self.config
    }

    /// Level `descriptor` is reported at, after suppression attributes and configuration.
    #[must_use]
    pub fn level(&self, descriptor: &LintDescriptor, allowance: &LintAllowance) -> LintLevel {
        if allowance.allows(descriptor.category, descriptor.name) {
            LintLevel::Allow
        } else {
            self.config.level_for(
                descriptor.name,
                descriptor.category,
                descriptor.default_level,
            )
        }
    }

    /// Record a diagnostic unless it is allowed; the returned entry can be given notes.
    pub fn emit(
        &mut self,
        descriptor: &'static LintDescriptor,
        allowance: &LintAllowance,
        message: impl Into<String>,
        span: Option<Span>,
    ) -> Option<&mut LintDiagnostic> {
        let level = self.level(descriptor, allowance);
        if level == LintLevel::Allow {
            tracing::trace!(
                target: "lockguard::lint",
                rule = descriptor.name,
                ?span,
                "diagnostic suppressed"
            );
            return None;
        }
        self.diagnostics.push(LintDiagnostic {
            descriptor,
            level,
            message: message.into(),
            file: self.unit.path.clone(),
            span,
            notes: Vec::new(),
            suggestions: Vec::new(),
        });
        self.diagnostics.last_mut()
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<LintDiagnostic> {
        self.diagnostics
    }
}
