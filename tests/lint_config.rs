mod common;

use common::{guarded_counter, scan_with, write_config};
use lockguard::Error;
use lockguard::frontend::ast::builders::{block, expr_stmt, ident, post_increment};
use lockguard::frontend::ast::{CompilationUnit, MethodDecl};
use lockguard::lint::{
    CheckRegistry, LintCategory, LintLevel, ScannerConfig, discover, discover_with_override,
};
use tempfile::tempdir;

fn unguarded() -> CompilationUnit {
    CompilationUnit::new(
        "Test.java",
        vec![guarded_counter(|decl| {
            decl.method(MethodDecl::new("m").body(block(vec![expr_stmt(post_increment(ident("x")))])))
        })],
    )
}

#[test]
fn discovers_rules_flags_and_disabled_checks() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_config(
        &dir.path().join("lint.yaml"),
        "lint:\n  rules:\n    guarded-by: warn\n  flags:\n    guarded_by.lock_types: [Lock, Mutex]\n    guarded_by.acquire_methods: acquire\n",
    );
    let config = discover(&[dir.path().join("Test.java")])?;

    assert_eq!(
        config.level_for("guarded_by", LintCategory::Correctness, LintLevel::Error),
        LintLevel::Warn
    );
    assert_eq!(
        config.flags().get("guarded_by.lock_types").map(String::as_str),
        Some("Lock,Mutex")
    );
    assert!(config.disabled().is_empty());

    let registry = CheckRegistry::builtin()?;
    let scanner = ScannerConfig::from_lint_config(&registry, config)?;
    assert_eq!(
        scanner.flags().get_list("guarded_by.lock_types"),
        Some(vec!["Lock".to_string(), "Mutex".to_string()])
    );
    let diagnostics = scan_with(&unguarded(), &scanner);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].level, LintLevel::Warn);
    Ok(())
}

#[test]
fn nearer_files_override_parent_directories() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_config(
        &dir.path().join("lint.yaml"),
        "categories:\n  correctness: warn\nrules:\n  guarded_by: allow\n",
    );
    let nested = dir.path().join("pkg");
    write_config(&nested.join("lockguard.yaml"), "rules:\n  guarded_by: error\n");

    let config = discover(&[nested.clone()])?;
    assert_eq!(
        config.level_for("guarded_by", LintCategory::Correctness, LintLevel::Error),
        LintLevel::Error
    );
    assert_eq!(
        config.level_for("static_guard_mismatch", LintCategory::Correctness, LintLevel::Error),
        LintLevel::Warn
    );
    Ok(())
}

#[test]
fn extends_layers_the_base_first() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_config(
        &dir.path().join("base.yaml"),
        "rules:\n  guarded_by: warn\n  unresolvable_guard: error\n",
    );
    let explicit = dir.path().join("team.yaml");
    write_config(&explicit, "extends: base.yaml\nrules:\n  guarded_by: allow\n");

    let config = discover_with_override(&[dir.path().to_path_buf()], Some(&explicit))?;
    assert_eq!(
        config.level_for("guarded_by", LintCategory::Correctness, LintLevel::Error),
        LintLevel::Allow
    );
    assert_eq!(
        config.level_for("unresolvable_guard", LintCategory::Correctness, LintLevel::Warn),
        LintLevel::Error
    );

    let registry = CheckRegistry::builtin()?;
    let scanner = ScannerConfig::from_lint_config(&registry, config)?;
    assert!(scan_with(&unguarded(), &scanner).is_empty());
    Ok(())
}

#[test]
fn cyclic_extends_is_a_configuration_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let a = dir.path().join("a.yaml");
    write_config(&a, "extends: b.yaml\n");
    write_config(&dir.path().join("b.yaml"), "extends: a.yaml\n");

    let err = discover_with_override(&[dir.path().to_path_buf()], Some(&a)).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    assert!(err.to_string().contains("cyclic lint configuration"));
    Ok(())
}

#[test]
fn unreadable_documents_are_configuration_errors() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_config(&dir.path().join("lint.yaml"), "rules: [unterminated\n");
    let err = discover(&[dir.path().to_path_buf()]).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));

    let missing = dir.path().join("missing.yaml");
    let err = discover_with_override(&[], Some(&missing)).unwrap_err();
    assert!(err.to_string().starts_with("configuration error: failed to read lint config"));
    Ok(())
}

#[test]
fn unknown_checks_and_rules_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let registry = CheckRegistry::builtin()?;

    let dir = tempdir()?;
    write_config(&dir.path().join("lint.yaml"), "disabled: [thread_confined]\n");
    let config = discover(&[dir.path().to_path_buf()])?;
    let err = ScannerConfig::from_lint_config(&registry, config).unwrap_err();
    assert_eq!(
        err.to_string(),
        "check registry error: cannot disable unknown check `thread_confined`"
    );

    let other = tempdir()?;
    write_config(&other.path().join("lint.yaml"), "disabled: [guarded-by]\n");
    let config = discover(&[other.path().to_path_buf()])?;
    let scanner = ScannerConfig::from_lint_config(&registry, config)?;
    assert!(!scanner.is_enabled("guarded_by"));
    assert!(scan_with(&unguarded(), &scanner).is_empty());
    Ok(())
}
