use std::collections::HashSet;

use crate::frontend::ast::Attribute;

use super::diagnostic::LintCategory;
use super::{canonical_lint_name, descriptors};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintAllowance {
    allow_all: bool,
    allowed_rules: HashSet<String>,
    allowed_categories: HashSet<LintCategory>,
}

impl LintAllowance {
    #[must_use]
    pub fn allows(&self, category: LintCategory, rule: &str) -> bool {
        if self.allow_all {
            return true;
        }
        let canonical = canonical_lint_name(rule);
        self.allowed_rules.contains(&canonical) || self.allowed_categories.contains(&category)
    }

    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        if other.allow_all {
            merged.allow_all = true;
        }
        merged
            .allowed_rules
            .extend(other.allowed_rules.iter().cloned());
        merged
            .allowed_categories
            .extend(other.allowed_categories.iter().cloned());
        merged
    }

    fn insert_value(&mut self, value: &str) {
        let canonical = canonical_lint_name(value);
        if canonical.is_empty() {
            return;
        }
        if canonical == "all" {
            self.allow_all = true;
        } else if let Some(category) = LintCategory::from_str(&canonical) {
            self.allowed_categories.insert(category);
        } else if let Some(descriptor) = descriptors().iter().find(|descriptor| {
            descriptor
                .aliases
                .iter()
                .any(|alias| canonical_lint_name(alias) == canonical)
        }) {
            self.allowed_rules.insert(descriptor.name.to_string());
        } else {
            self.allowed_rules.insert(canonical);
        }
    }
}

/// Suppressions written as `@allow(rule|category|all)` or `@SuppressWarnings("GuardedBy")`.
pub(crate) fn allowance_from_attributes(attrs: &[Attribute]) -> LintAllowance {
    let mut allowance = LintAllowance::default();

    for attr in attrs {
        let simple = attr.name.rsplit('.').next().unwrap_or(attr.name.as_str());
        let lowered = canonical_lint_name(simple);
        if lowered == "allow" || lowered == "suppresswarnings" {
            for argument in &attr.arguments {
                for value in argument.value.split(',') {
                    allowance.insert_value(value);
                }
            }
            continue;
        }
        if let Some(category) = LintCategory::from_str(&lowered) {
            allowance.allowed_categories.insert(category);
            continue;
        }
        if descriptors().iter().any(|descriptor| {
            descriptor.name == lowered || descriptor.code.eq_ignore_ascii_case(&attr.name)
        }) {
            allowance.allowed_rules.insert(lowered.clone());
        }
    }

    allowance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_accepts_rules_categories_and_all() {
        let allowance = allowance_from_attributes(&[Attribute::with_values(
            "allow",
            ["guarded-by"],
        )]);
        assert!(allowance.allows(LintCategory::Correctness, "guarded_by"));
        assert!(!allowance.allows(LintCategory::Correctness, "unresolvable_guard"));

        let category =
            allowance_from_attributes(&[Attribute::with_values("allow", ["correctness"])]);
        assert!(category.allows(LintCategory::Correctness, "unresolvable_guard"));

        let everything = allowance_from_attributes(&[Attribute::with_values("allow", ["all"])]);
        assert!(everything.allows(LintCategory::Correctness, "static_guard_mismatch"));
    }

    #[test]
    fn suppress_warnings_understands_rule_aliases() {
        let allowance = allowance_from_attributes(&[Attribute::with_values(
            "java.lang.SuppressWarnings",
            ["\"GuardedBy\""],
        )]);
        assert!(allowance.allows(LintCategory::Correctness, "guarded_by"));
        assert!(!allowance.allows(LintCategory::Correctness, "static_guard_mismatch"));

        let unrelated = allowance_from_attributes(&[Attribute::with_values(
            "SuppressWarnings",
            ["unchecked"],
        )]);
        assert!(!unrelated.allows(LintCategory::Correctness, "guarded_by"));
    }

    #[test]
    fn merged_unions_both_sides() {
        let outer =
            allowance_from_attributes(&[Attribute::with_values("allow", ["unresolvable_guard"])]);
        let inner = allowance_from_attributes(&[Attribute::with_values("allow", ["guarded_by"])]);
        let merged = outer.merged(&inner);
        assert!(merged.allows(LintCategory::Correctness, "guarded_by"));
        assert!(merged.allows(LintCategory::Correctness, "unresolvable_guard"));
    }
}
