//! Lint engine: descriptors, levels, configuration, suppression and the check registry.

mod allow;
mod config;
mod context;
mod diagnostic;
pub mod registry;

pub use allow::LintAllowance;
pub(crate) use allow::allowance_from_attributes;
pub use config::{LINT_CONFIG_ENV, LintConfig, LintConfigLayer, discover, discover_with_override};
pub use context::LintContext;
pub use diagnostic::{LintCategory, LintDescriptor, LintDiagnostic, LintLevel, LintSuggestion};
pub use registry::{
    Check, CheckFactory, CheckFlags, CheckRegistration, CheckRegistry, Scanner, ScannerConfig,
};

#[must_use]
pub fn descriptors() -> &'static [LintDescriptor] {
    DESCRIPTORS
}

#[must_use]
pub fn find_descriptor(name: &str) -> Option<&'static LintDescriptor> {
    let canonical = canonical_lint_name(name);
    DESCRIPTORS.iter().find(|descriptor| {
        descriptor.name == canonical || descriptor.code.eq_ignore_ascii_case(name)
    })
}

pub(crate) fn canonical_lint_name(raw: &str) -> String {
    raw.trim_matches(|c: char| c == '"' || c == '\'')
        .trim()
        .replace('-', "_")
        .to_ascii_lowercase()
}

static DESCRIPTORS: &[LintDescriptor] = &[
    LintDescriptor {
        code: "GUARD001",
        name: "guarded_by",
        aliases: &["GuardedBy"],
        description: "guarded members accessed without holding their lock",
        category: LintCategory::Correctness,
        default_level: LintLevel::Error,
    },
    LintDescriptor {
        code: "GUARD002",
        name: "static_guard_mismatch",
        aliases: &[],
        description: "static members guarded by a lock that needs an instance",
        category: LintCategory::Correctness,
        default_level: LintLevel::Error,
    },
    LintDescriptor {
        code: "GUARD003",
        name: "unresolvable_guard",
        aliases: &[],
        description: "lock expressions that do not parse or do not name a lock in scope",
        category: LintCategory::Correctness,
        default_level: LintLevel::Warn,
    },
];
