use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

use super::canonical_lint_name;
use super::diagnostic::{LintCategory, LintLevel};

/// Environment variable naming an extra lint document applied last.
pub const LINT_CONFIG_ENV: &str = "LOCKGUARD_LINT_CONFIG";

const CANDIDATES: [&str; 3] = ["lint.yaml", "lockguard.yaml", "lint.yml"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintConfig {
    category_levels: HashMap<LintCategory, LintLevel>,
    rule_levels: HashMap<String, LintLevel>,
    flags: BTreeMap<String, String>,
    disabled: BTreeSet<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        let mut category_levels = HashMap::new();
        category_levels.insert(LintCategory::Correctness, LintLevel::Error);
        let mut rule_levels = HashMap::new();
        rule_levels.insert(canonical_lint_name("unresolvable_guard"), LintLevel::Warn);
        Self {
            category_levels,
            rule_levels,
            flags: BTreeMap::new(),
            disabled: BTreeSet::new(),
        }
    }
}

impl LintConfig {
    #[must_use]
    pub fn level_for(&self, name: &str, category: LintCategory, default: LintLevel) -> LintLevel {
        let canonical = canonical_lint_name(name);
        if let Some(level) = self.rule_levels.get(&canonical) {
            return *level;
        }
        if let Some(level) = self.category_levels.get(&category) {
            *level
        } else {
            default
        }
    }

    /// Rules given an explicit level, canonicalised.
    pub fn configured_rules(&self) -> impl Iterator<Item = &str> {
        self.rule_levels.keys().map(String::as_str)
    }

    #[must_use]
    pub fn flags(&self) -> &BTreeMap<String, String> {
        &self.flags
    }

    /// Check ids switched off entirely.
    #[must_use]
    pub fn disabled(&self) -> &BTreeSet<String> {
        &self.disabled
    }

    pub fn set_rule_level(&mut self, rule: &str, level: LintLevel) {
        self.rule_levels.insert(canonical_lint_name(rule), level);
    }

    pub fn disable(&mut self, check: &str) {
        self.disabled.insert(canonical_lint_name(check));
    }

    pub fn apply_layer(&mut self, layer: LintConfigLayer) {
        for (category, level) in layer.category_levels {
            self.category_levels.insert(category, level);
        }
        for (rule, level) in layer.rule_levels {
            self.rule_levels.insert(rule, level);
        }
        self.flags.extend(layer.flags);
        self.disabled.extend(layer.disabled);
    }
}

#[derive(Debug, Clone, Default)]
pub struct LintConfigLayer {
    pub category_levels: HashMap<LintCategory, LintLevel>,
    pub rule_levels: HashMap<String, LintLevel>,
    pub flags: BTreeMap<String, String>,
    pub disabled: BTreeSet<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawLintDocument {
    #[serde(default)]
    extends: Option<String>,
    #[serde(default)]
    #[serde(alias = "category-levels")]
    categories: HashMap<String, String>,
    #[serde(default)]
    rules: HashMap<String, String>,
    #[serde(default)]
    flags: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    disabled: Vec<String>,
}

fn parse_layer(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<Vec<LintConfigLayer>> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical.clone()) {
        return Err(Error::config(format!(
            "cyclic lint configuration detected involving {}",
            path.display()
        )));
    }
    let mut contents = fs::read_to_string(path).map_err(|err| {
        Error::config(format!(
            "failed to read lint config `{}`: {err}",
            path.display()
        ))
    })?;
    if contents.starts_with("---\n") {
        // serde_yaml tolerates the header, but normalise to keep error messages clean.
        contents = contents.replacen("---\n", "", 1);
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(&contents).map_err(|err| {
        Error::config(format!(
            "failed to parse lint config `{}`: {err}",
            path.display()
        ))
    })?;
    let section = match yaml {
        serde_yaml::Value::Mapping(ref mapping)
            if mapping.contains_key(serde_yaml::Value::String("lint".into())) =>
        {
            mapping
                .get(serde_yaml::Value::String("lint".into()))
                .cloned()
        }
        serde_yaml::Value::Mapping(_) => Some(yaml.clone()),
        _ => None,
    };
    let Some(section) = section else {
        return Ok(Vec::new());
    };
    let raw: RawLintDocument = serde_yaml::from_value(section).map_err(|err| {
        Error::config(format!(
            "failed to parse lint settings in `{}`: {err}",
            path.display()
        ))
    })?;

    let mut layers = Vec::new();
    if let Some(extends) = raw.extends.as_deref() {
        let base = path
            .parent()
            .map(|parent| parent.join(extends))
            .unwrap_or_else(|| PathBuf::from(extends));
        layers.extend(parse_layer(&base, visited)?);
    }
    layers.push(raw.into_layer(path));
    Ok(layers)
}

/// Flag values are kept as text; sequences become comma-separated lists.
fn flag_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(text) => Some(text.clone()),
        serde_yaml::Value::Bool(flag) => Some(flag.to_string()),
        serde_yaml::Value::Number(number) => Some(number.to_string()),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(flag_text)
            .collect::<Option<Vec<_>>>()
            .map(|items| items.join(",")),
        _ => None,
    }
}

impl RawLintDocument {
    fn into_layer(self, path: &Path) -> LintConfigLayer {
        let mut layer = LintConfigLayer::default();
        for (category, level) in self.categories {
            if let (Some(cat), Some(level)) = (
                LintCategory::from_str(&category),
                LintLevel::from_str(&level),
            ) {
                layer.category_levels.insert(cat, level);
            } else {
                tracing::warn!(
                    target: "lockguard::lint_config",
                    "ignored category entry `{category}` -> `{level}` in {}",
                    path.display()
                );
            }
        }
        for (rule, level) in self.rules {
            if let Some(level) = LintLevel::from_str(&level) {
                layer.rule_levels.insert(canonical_lint_name(&rule), level);
            } else {
                tracing::warn!(
                    target: "lockguard::lint_config",
                    "ignored rule entry `{rule}` -> `{level}` in {}",
                    path.display()
                );
            }
        }
        for (key, value) in self.flags {
            if let Some(text) = flag_text(&value) {
                layer.flags.insert(key, text);
            } else {
                tracing::warn!(
                    target: "lockguard::lint_config",
                    "ignored flag `{key}` with a non-scalar value in {}",
                    path.display()
                );
            }
        }
        layer
            .disabled
            .extend(self.disabled.iter().map(|check| canonical_lint_name(check)));
        layer
    }
}

fn discover_layers(start_dir: &Path) -> Result<Vec<LintConfigLayer>> {
    let mut cursor = Some(start_dir.to_path_buf());
    let mut discovered = Vec::new();
    let mut visited = HashSet::new();
    while let Some(dir) = cursor {
        for candidate in CANDIDATES {
            let path = dir.join(candidate);
            if path.exists() && path.is_file() {
                let mut layers = parse_layer(&path, &mut visited)?;
                discovered.append(&mut layers);
            }
        }
        cursor = dir.parent().map(Path::to_path_buf);
    }
    // Walked from leaf to root; apply root-most first.
    discovered.reverse();
    Ok(discovered)
}

fn start_dir_for_inputs(inputs: &[PathBuf]) -> Result<PathBuf> {
    if let Some(first) = inputs.first() {
        if first.is_dir() {
            Ok(first.clone())
        } else {
            first
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| Error::config("input had no parent directory"))
        }
    } else {
        Ok(std::env::current_dir()?)
    }
}

pub fn discover(inputs: &[PathBuf]) -> Result<LintConfig> {
    discover_with_override(inputs, None)
}

pub fn discover_with_override(inputs: &[PathBuf], explicit: Option<&Path>) -> Result<LintConfig> {
    let mut config = LintConfig::default();
    let start_dir = start_dir_for_inputs(inputs)?;
    for layer in discover_layers(&start_dir)? {
        config.apply_layer(layer);
    }

    if let Some(path) = explicit {
        for layer in parse_layer(path, &mut HashSet::new())? {
            config.apply_layer(layer);
        }
    }

    if let Ok(env_path) = std::env::var(LINT_CONFIG_ENV) {
        let env_path = PathBuf::from(env_path);
        if env_path.exists() {
            for layer in parse_layer(&env_path, &mut HashSet::new())? {
                config.apply_layer(layer);
            }
        }
    }

    tracing::debug!(
        target: "lockguard::lint_config",
        start = %start_dir.display(),
        flags = config.flags.len(),
        disabled = config.disabled.len(),
        "resolved lint configuration"
    );
    Ok(config)
}
