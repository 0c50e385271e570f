//! The guard engine exposed as a lint check.

use super::checker::GuardViolationChecker;
use super::held::GuardOptions;
use super::{GuardErrorKind, GuardFinding};
use crate::frontend::SymbolTable;
use crate::lint::registry::{Check, CheckFlags};
use crate::lint::{
    LintAllowance, LintContext, LintSuggestion, allowance_from_attributes, find_descriptor,
};

#[derive(Debug, Clone, Default)]
pub struct GuardedByCheck {
    options: GuardOptions,
}

impl GuardedByCheck {
    pub const ID: &'static str = "guarded_by";
    pub const RULES: &'static [&'static str] =
        &["guarded_by", "static_guard_mismatch", "unresolvable_guard"];

    #[must_use]
    pub fn new(options: GuardOptions) -> Self {
        Self { options }
    }

    /// Reads `guarded_by.lock_types`, `guarded_by.acquire_methods` and
    /// `guarded_by.release_methods`; missing flags keep their defaults.
    #[must_use]
    pub fn from_flags(flags: &CheckFlags) -> Self {
        let mut options = GuardOptions::default();
        if let Some(types) = flags.get_list("guarded_by.lock_types") {
            options.lock_types = types;
        }
        if let Some(methods) = flags.get_list("guarded_by.acquire_methods") {
            options.acquire_methods = methods;
        }
        if let Some(methods) = flags.get_list("guarded_by.release_methods") {
            options.release_methods = methods;
        }
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &GuardOptions {
        &self.options
    }
}

fn rule_for(kind: GuardErrorKind) -> &'static str {
    match kind {
        GuardErrorKind::GuardViolation => "guarded_by",
        GuardErrorKind::StaticInstanceMismatch => "static_guard_mismatch",
        GuardErrorKind::MalformedLockExpression | GuardErrorKind::UnresolvableLockExpression => {
            "unresolvable_guard"
        }
    }
}

/// Suppressions on the owning type, its enclosing types and the member itself.
fn allowance_for(symbols: &SymbolTable<'_>, finding: &GuardFinding) -> LintAllowance {
    let mut allowance = LintAllowance::default();
    let Some(decl) = symbols.type_decl(&finding.owner) else {
        return allowance;
    };
    allowance = allowance.merged(&allowance_from_attributes(&decl.attributes));
    for outer in symbols.outer_types(&finding.owner) {
        if let Some(outer) = symbols.type_decl(outer) {
            allowance = allowance.merged(&allowance_from_attributes(&outer.attributes));
        }
    }
    if let Some(member) = &finding.member {
        let attributes = decl
            .fields
            .iter()
            .find(|field| &field.name == member)
            .map(|field| field.attributes.as_slice())
            .or_else(|| {
                decl.methods
                    .iter()
                    .find(|method| &method.name == member)
                    .map(|method| method.attributes.as_slice())
            });
        if let Some(attributes) = attributes {
            allowance = allowance.merged(&allowance_from_attributes(attributes));
        }
    }
    allowance
}

impl Check for GuardedByCheck {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn run(&self, cx: &mut LintContext<'_>) {
        let unit = cx.unit();
        let symbols = SymbolTable::build(unit);
        let checker = GuardViolationChecker::new(&symbols, self.options.clone());
        for finding in checker.check_unit() {
            let Some(descriptor) = find_descriptor(rule_for(finding.kind)) else {
                continue;
            };
            let allowance = allowance_for(&symbols, &finding);
            let emitted = cx.emit(descriptor, &allowance, finding.message.clone(), finding.span);
            let Some(diagnostic) = emitted else {
                continue;
            };
            if let Some(note) = finding.note {
                diagnostic.notes.push(note);
            }
            if finding.kind == GuardErrorKind::GuardViolation {
                diagnostic.suggestions.push(LintSuggestion::new(
                    format!(
                        "acquire the lock first, or annotate `{}` with `@allow(guarded_by)`",
                        finding.member.as_deref().unwrap_or(&finding.owner)
                    ),
                    finding.span,
                ));
            }
        }
    }
}
