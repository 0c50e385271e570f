//! Check registration and the scanner that runs enabled checks over a unit.
//!
//! Checks are registered once under a stable id together with the lint rules
//! they report and the constructors that build them. A [`ScannerConfig`] is a
//! validated, immutable selection over a registry; a [`Scanner`] is the set of
//! check instances built from it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::diagnostics::DiagnosticSink;
use crate::error::{Error, Result};
use crate::frontend::ast::CompilationUnit;
use crate::guard::GuardedByCheck;

use super::config::LintConfig;
use super::context::LintContext;
use super::diagnostic::LintDiagnostic;
use super::{canonical_lint_name, find_descriptor};

pub trait Check: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, cx: &mut LintContext<'_>);
}

/// Named string options handed to check constructors, keyed `<check>.<option>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckFlags(BTreeMap<String, String>);

impl CheckFlags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Some(true),
            "false" | "no" | "off" => Some(false),
            other => {
                tracing::warn!(
                    target: "lockguard::registry",
                    key,
                    value = other,
                    "flag is not a boolean"
                );
                None
            }
        }
    }

    /// Comma-separated values, trimmed, empty entries dropped.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CheckFlags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Clone, Copy)]
pub enum CheckFactory {
    WithFlags(fn(&CheckFlags) -> Box<dyn Check>),
    Default(fn() -> Box<dyn Check>),
}

impl fmt::Debug for CheckFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithFlags(_) => f.write_str("CheckFactory::WithFlags"),
            Self::Default(_) => f.write_str("CheckFactory::Default"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckRegistration {
    pub id: &'static str,
    /// Lint rules this check reports under.
    pub rules: &'static [&'static str],
    factories: Vec<CheckFactory>,
}

impl CheckRegistration {
    #[must_use]
    pub fn new(id: &'static str, rules: &'static [&'static str]) -> Self {
        Self {
            id,
            rules,
            factories: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, factory: fn(&CheckFlags) -> Box<dyn Check>) -> Self {
        self.factories.push(CheckFactory::WithFlags(factory));
        self
    }

    #[must_use]
    pub fn with_default(mut self, factory: fn() -> Box<dyn Check>) -> Self {
        self.factories.push(CheckFactory::Default(factory));
        self
    }

    /// Flag-taking constructors win over default ones regardless of registration order.
    fn instantiate(&self, flags: &CheckFlags) -> Result<Box<dyn Check>> {
        let with_flags = self.factories.iter().find_map(|factory| match factory {
            CheckFactory::WithFlags(build) => Some(build(flags)),
            CheckFactory::Default(_) => None,
        });
        if let Some(check) = with_flags {
            return Ok(check);
        }
        self.factories
            .iter()
            .find_map(|factory| match factory {
                CheckFactory::Default(build) => Some(build()),
                CheckFactory::WithFlags(_) => None,
            })
            .ok_or_else(|| Error::registry(format!("check `{}` has no constructor", self.id)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckRegistry {
    entries: BTreeMap<&'static str, CheckRegistration>,
}

impl CheckRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every check shipped with the crate.
    ///
    /// # Errors
    ///
    /// Fails only if two built-in checks share an id.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(
            CheckRegistration::new(GuardedByCheck::ID, GuardedByCheck::RULES)
                .with_flags(|flags| Box::new(GuardedByCheck::from_flags(flags)))
                .with_default(|| Box::new(GuardedByCheck::default())),
        )?;
        Ok(registry)
    }

    /// # Errors
    ///
    /// Rejects duplicate ids, registrations without a constructor and unknown rule names.
    pub fn register(&mut self, registration: CheckRegistration) -> Result<()> {
        if self.entries.contains_key(registration.id) {
            return Err(Error::registry(format!(
                "check `{}` is registered twice",
                registration.id
            )));
        }
        if registration.factories.is_empty() {
            return Err(Error::registry(format!(
                "check `{}` has no constructor",
                registration.id
            )));
        }
        if let Some(rule) = registration
            .rules
            .iter()
            .find(|rule| find_descriptor(rule).is_none())
        {
            return Err(Error::registry(format!(
                "check `{}` reports unknown rule `{rule}`",
                registration.id
            )));
        }
        tracing::debug!(target: "lockguard::registry", id = registration.id, "registered check");
        self.entries.insert(registration.id, registration);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    fn knows_rule(&self, rule: &str) -> bool {
        self.entries
            .values()
            .flat_map(|entry| entry.rules.iter())
            .any(|known| *known == rule)
    }

    fn instantiate(&self, id: &str, flags: &CheckFlags) -> Result<Box<dyn Check>> {
        self.entries
            .get(id)
            .ok_or_else(|| Error::registry(format!("unknown check `{id}`")))?
            .instantiate(flags)
    }
}

/// Validated selection of checks, levels and flags. Compared by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    levels: LintConfig,
    disabled: BTreeSet<String>,
    flags: CheckFlags,
}

impl ScannerConfig {
    /// Everything in `registry` enabled at default levels.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            levels: LintConfig::default(),
            disabled: BTreeSet::new(),
            flags: CheckFlags::new(),
        }
    }

    /// Build from a discovered lint configuration.
    ///
    /// # Errors
    ///
    /// Fails when a disabled id, a flag prefix or a configured rule is unknown to `registry`.
    pub fn from_lint_config(registry: &CheckRegistry, config: LintConfig) -> Result<Self> {
        let flags = config
            .flags()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let scanner = Self {
            disabled: config.disabled().clone(),
            levels: config,
            flags,
        };
        scanner.validate(registry)?;
        Ok(scanner)
    }

    /// Copy with `id` switched off.
    ///
    /// # Errors
    ///
    /// Fails for ids `registry` does not know.
    pub fn with_disabled(&self, registry: &CheckRegistry, id: &str) -> Result<Self> {
        let mut next = self.clone();
        next.disabled.insert(canonical_lint_name(id));
        next.validate(registry)?;
        Ok(next)
    }

    /// Copy with one flag set.
    ///
    /// # Errors
    ///
    /// Fails when the flag is not prefixed by a known check id.
    pub fn with_flag(&self, registry: &CheckRegistry, key: &str, value: &str) -> Result<Self> {
        let mut next = self.clone();
        next.flags.insert(key, value);
        next.validate(registry)?;
        Ok(next)
    }

    #[must_use]
    pub fn levels(&self) -> &LintConfig {
        &self.levels
    }

    #[must_use]
    pub fn flags(&self) -> &CheckFlags {
        &self.flags
    }

    #[must_use]
    pub fn is_enabled(&self, id: &str) -> bool {
        !self.disabled.contains(id)
    }

    fn validate(&self, registry: &CheckRegistry) -> Result<()> {
        if let Some(id) = self.disabled.iter().find(|id| !registry.contains(id)) {
            return Err(Error::registry(format!("cannot disable unknown check `{id}`")));
        }
        for key in self.flags.keys() {
            let check = key.split('.').next().unwrap_or(key);
            if !registry.contains(check) {
                return Err(Error::registry(format!(
                    "flag `{key}` does not belong to a known check"
                )));
            }
        }
        if let Some(rule) = self
            .levels
            .configured_rules()
            .find(|rule| !registry.knows_rule(rule))
        {
            return Err(Error::registry(format!("level set for unknown rule `{rule}`")));
        }
        Ok(())
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Enabled check instances, built once and reused for every unit.
pub struct Scanner {
    checks: Vec<Box<dyn Check>>,
    config: ScannerConfig,
}

impl Scanner {
    /// # Errors
    ///
    /// Fails when `config` does not fit `registry` or a check cannot be constructed.
    pub fn new(registry: &CheckRegistry, config: &ScannerConfig) -> Result<Self> {
        config.validate(registry)?;
        let checks = registry
            .ids()
            .filter(|id| config.is_enabled(id))
            .map(|id| registry.instantiate(id, &config.flags))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(
            target: "lockguard::registry",
            enabled = checks.len(),
            "scanner ready"
        );
        Ok(Self {
            checks,
            config: config.clone(),
        })
    }

    pub fn checks(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.checks.iter().map(|check| check.id())
    }

    #[must_use]
    pub fn scan(&self, unit: &CompilationUnit) -> Vec<LintDiagnostic> {
        let mut cx = LintContext::new(unit, &self.config.levels);
        for check in &self.checks {
            let _span = tracing::debug_span!("check", id = check.id()).entered();
            check.run(&mut cx);
        }
        cx.into_diagnostics()
    }

    pub fn scan_into(&self, unit: &CompilationUnit, sink: &mut DiagnosticSink) {
        for diagnostic in self.scan(unit) {
            sink.push(diagnostic.to_diagnostic());
        }
    }
}
