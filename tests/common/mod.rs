use std::fs;
use std::path::Path;

use lockguard::frontend::ast::builders::{
    block, call, expr_stmt, ident, method_call, post_increment, try_finally,
};
use lockguard::frontend::ast::{Attribute, CompilationUnit, FieldDecl, MethodDecl, TypeDecl};
use lockguard::lint::{CheckRegistry, LintDiagnostic, Scanner, ScannerConfig};

// Each integration-test crate pulls only some of these helpers; keep them local to avoid
// per-crate dead-code warnings.
#[allow(dead_code)]
pub fn write_config(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|err| panic!("create dir {}: {err}", parent.display()));
    }
    fs::write(path, contents).unwrap_or_else(|err| panic!("write config: {err}"));
}

#[allow(dead_code)]
pub fn guarded_by(lock: &str) -> Attribute {
    Attribute::with_values("GuardedBy", [lock])
}

/// `class Test { Lock lock; @GuardedBy("lock") int x; }` plus `extra` members.
#[allow(dead_code)]
pub fn guarded_counter(extra: impl FnOnce(TypeDecl) -> TypeDecl) -> TypeDecl {
    extra(
        TypeDecl::class("Test")
            .field(FieldDecl::new("lock", "Lock"))
            .field(FieldDecl::new("x", "int").attribute(guarded_by("lock"))),
    )
}

/// `lock()` / `unlock()` helpers bracketing `x++` in a try/finally.
#[allow(dead_code)]
pub fn lock_method_unit() -> CompilationUnit {
    let test = guarded_counter(|decl| {
        decl.method(
            MethodDecl::new("lock")
                .attribute(Attribute::with_values("LockMethod", ["lock"]))
                .body(block(vec![expr_stmt(method_call(ident("lock"), "lock", vec![]))])),
        )
        .method(
            MethodDecl::new("unlock")
                .attribute(Attribute::with_values("UnlockMethod", ["lock"]))
                .body(block(vec![expr_stmt(method_call(ident("lock"), "unlock", vec![]))])),
        )
        .method(MethodDecl::new("m").body(block(vec![
            expr_stmt(call("lock", vec![])),
            try_finally(
                vec![expr_stmt(post_increment(ident("x")))],
                vec![expr_stmt(call("unlock", vec![]))],
            ),
        ])))
    });
    CompilationUnit::new("threadsafety/Test.java", vec![test])
}

#[allow(dead_code)]
pub fn scan(unit: &CompilationUnit) -> Vec<LintDiagnostic> {
    scan_with(unit, &ScannerConfig::defaults())
}

#[allow(dead_code)]
pub fn scan_with(unit: &CompilationUnit, config: &ScannerConfig) -> Vec<LintDiagnostic> {
    let registry = CheckRegistry::builtin().unwrap_or_else(|err| panic!("registry: {err}"));
    Scanner::new(&registry, config)
        .unwrap_or_else(|err| panic!("scanner: {err}"))
        .scan(unit)
}

#[allow(dead_code)]
pub fn render(diagnostics: &[LintDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
