//! Per-type tables of guarded members and lock helper methods.
//!
//! Both tables are filled lazily, once per declaring type, the first time any
//! member of that type is queried. Cells are thread-safe so a table built for
//! one unit can be shared by reference between workers analysing its methods.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::OnceCell;

use super::resolve::{DeclScope, LockResolver, ResolveError, ResolvedLock};
use super::{GuardErrorKind, GuardFinding};
use crate::diagnostics::Span;
use crate::frontend::SymbolTable;
use crate::frontend::ast::{Attribute, MethodDecl};

const GUARD_ATTRIBUTES: &[&str] = &["GuardedBy", "Guard"];
const ACQUIRE_ATTRIBUTES: &[&str] = &["AcquireLock", "LockMethod"];
const RELEASE_ATTRIBUTES: &[&str] = &["ReleaseLock", "UnlockMethod"];

/// Matches `name` and qualified spellings such as `javax.annotation.concurrent.GuardedBy`.
fn attribute_matches(attr: &Attribute, names: &[&str]) -> bool {
    let simple = attr.name.rsplit('.').next().unwrap_or(attr.name.as_str());
    names.contains(&simple)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Method { arity: usize },
}

/// Identity of a field or method: declaring type, name and, for methods, arity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub kind: MemberKind,
}

impl MemberRef {
    #[must_use]
    pub fn field(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            kind: MemberKind::Field,
        }
    }

    #[must_use]
    pub fn method(owner: &str, method: &MethodDecl) -> Self {
        Self {
            owner: owner.to_string(),
            name: method.name.clone(),
            kind: MemberKind::Method {
                arity: method.arity(),
            },
        }
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MemberKind::Field => write!(f, "{}.{}", self.owner, self.name),
            MemberKind::Method { .. } => write!(f, "{}.{}()", self.owner, self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedEntity {
    pub member: MemberRef,
    pub required: ResolvedLock,
    pub is_static: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEffect {
    Acquire,
    Release,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockMethodBinding {
    pub method: MemberRef,
    pub lock: ResolvedLock,
    pub kind: LockEffect,
}

fn declaration_finding(
    error: ResolveError,
    member: &MemberRef,
    span: Option<Span>,
) -> GuardFinding {
    let (kind, message, note) = match &error {
        ResolveError::Malformed(err) => (
            GuardErrorKind::MalformedLockExpression,
            format!("unresolvable lock expression '{}'", err.text),
            Some(err.reason.clone()),
        ),
        ResolveError::Unresolvable { text, detail } => (
            GuardErrorKind::UnresolvableLockExpression,
            format!("unresolvable lock expression '{text}'"),
            Some(detail.clone()),
        ),
        ResolveError::StaticInstanceMismatch { text } => (
            GuardErrorKind::StaticInstanceMismatch,
            format!("static member guarded by instance lock '{text}'"),
            Some(format!("`{member}` is static but the lock needs an instance")),
        ),
    };
    tracing::debug!(
        target: "lockguard::index",
        member = %member,
        error = %error,
        "excluding member from guard checking"
    );
    GuardFinding {
        kind,
        message,
        span,
        owner: member.owner.clone(),
        member: Some(member.name.clone()),
        note,
    }
}

/// Each lock expression listed by an attribute; arguments may also be comma-separated.
fn lock_texts(attr: &Attribute) -> Vec<String> {
    attr.arguments
        .iter()
        .flat_map(|argument| argument.value.split(','))
        .map(|text| text.trim().to_string())
        .collect()
}

#[derive(Debug, Default)]
pub struct TypeGuards {
    fields: HashMap<String, GuardedEntity>,
    methods: HashMap<(String, usize), GuardedEntity>,
    findings: Vec<GuardFinding>,
}

/// Guarded fields and methods, keyed by declaring type.
pub struct GuardedEntityIndex<'s, 'a> {
    symbols: &'s SymbolTable<'a>,
    per_type: HashMap<&'a str, OnceCell<TypeGuards>>,
}

impl<'s, 'a> GuardedEntityIndex<'s, 'a> {
    #[must_use]
    pub fn new(symbols: &'s SymbolTable<'a>) -> Self {
        let per_type = symbols
            .types()
            .map(|decl| (decl.name.as_str(), OnceCell::new()))
            .collect();
        Self { symbols, per_type }
    }

    fn entries(&self, owner: &str) -> Option<&TypeGuards> {
        self.per_type
            .get(owner)
            .map(|cell| cell.get_or_init(|| self.build(owner)))
    }

    #[must_use]
    pub fn guarded_field(&self, owner: &str, name: &str) -> Option<&GuardedEntity> {
        self.entries(owner)?.fields.get(name)
    }

    #[must_use]
    pub fn guarded_method(&self, owner: &str, name: &str, arity: usize) -> Option<&GuardedEntity> {
        self.entries(owner)?
            .methods
            .get(&(name.to_string(), arity))
    }

    /// Declaration problems found while indexing `owner`.
    #[must_use]
    pub fn findings(&self, owner: &str) -> &[GuardFinding] {
        self.entries(owner)
            .map(|entries| entries.findings.as_slice())
            .unwrap_or_default()
    }

    fn build(&self, owner: &str) -> TypeGuards {
        let mut guards = TypeGuards::default();
        let Some(decl) = self.symbols.type_decl(owner) else {
            return guards;
        };
        let resolver = LockResolver::new(self.symbols);

        for field in &decl.fields {
            let member = MemberRef::field(owner, &field.name);
            let scope = DeclScope::field(owner, field.is_static);
            let found = guard_for(
                &resolver,
                &field.attributes,
                &scope,
                &member,
                field.span,
                &mut guards.findings,
            );
            if let Some(required) = found {
                guards.fields.insert(
                    field.name.clone(),
                    GuardedEntity {
                        member,
                        required,
                        is_static: field.is_static,
                    },
                );
            }
        }

        for method in &decl.methods {
            let member = MemberRef::method(owner, method);
            let scope = DeclScope::method(owner, &method.parameters, method.is_static);
            if let Some(required) = guard_for(
                &resolver,
                &method.attributes,
                &scope,
                &member,
                method.span,
                &mut guards.findings,
            ) {
                guards.methods.insert(
                    (method.name.clone(), method.arity()),
                    GuardedEntity {
                        member,
                        required,
                        is_static: method.is_static,
                    },
                );
            }
        }

        tracing::debug!(
            target: "lockguard::index",
            owner,
            fields = guards.fields.len(),
            methods = guards.methods.len(),
            findings = guards.findings.len(),
            "indexed guarded members"
        );
        guards
    }
}

fn guard_for(
    resolver: &LockResolver<'_, '_>,
    attributes: &[Attribute],
    scope: &DeclScope<'_>,
    member: &MemberRef,
    member_span: Option<Span>,
    findings: &mut Vec<GuardFinding>,
) -> Option<ResolvedLock> {
    let attr = attributes
        .iter()
        .find(|attr| attribute_matches(attr, GUARD_ATTRIBUTES))?;
    let span = attr.span.or(member_span);
    let texts = lock_texts(attr);
    let [text] = texts.as_slice() else {
        findings.push(GuardFinding {
            kind: GuardErrorKind::MalformedLockExpression,
            message: format!("unresolvable lock expression '{}'", texts.join(", ")),
            span,
            owner: member.owner.clone(),
            member: Some(member.name.clone()),
            note: Some("a guard names exactly one lock".into()),
        });
        return None;
    };
    match resolver.resolve(text, scope) {
        Ok(lock) => Some(lock),
        Err(error) => {
            findings.push(declaration_finding(error, member, span));
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct TypeLockMethods {
    bindings: HashMap<(String, usize), Vec<LockMethodBinding>>,
    findings: Vec<GuardFinding>,
}

/// Methods that acquire or release a lock on behalf of their caller.
pub struct LockMethodRegistry<'s, 'a> {
    symbols: &'s SymbolTable<'a>,
    per_type: HashMap<&'a str, OnceCell<TypeLockMethods>>,
}

impl<'s, 'a> LockMethodRegistry<'s, 'a> {
    #[must_use]
    pub fn new(symbols: &'s SymbolTable<'a>) -> Self {
        let per_type = symbols
            .types()
            .map(|decl| (decl.name.as_str(), OnceCell::new()))
            .collect();
        Self { symbols, per_type }
    }

    fn entries(&self, owner: &str) -> Option<&TypeLockMethods> {
        self.per_type
            .get(owner)
            .map(|cell| cell.get_or_init(|| self.build(owner)))
    }

    #[must_use]
    pub fn bindings(&self, owner: &str, name: &str, arity: usize) -> &[LockMethodBinding] {
        self.entries(owner)
            .and_then(|entries| entries.bindings.get(&(name.to_string(), arity)))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn findings(&self, owner: &str) -> &[GuardFinding] {
        self.entries(owner)
            .map(|entries| entries.findings.as_slice())
            .unwrap_or_default()
    }

    fn build(&self, owner: &str) -> TypeLockMethods {
        let mut table = TypeLockMethods::default();
        let Some(decl) = self.symbols.type_decl(owner) else {
            return table;
        };
        let resolver = LockResolver::new(self.symbols);

        for method in &decl.methods {
            let member = MemberRef::method(owner, method);
            let scope = DeclScope::method(owner, &method.parameters, method.is_static);
            for attr in &method.attributes {
                let kind = if attribute_matches(attr, ACQUIRE_ATTRIBUTES) {
                    LockEffect::Acquire
                } else if attribute_matches(attr, RELEASE_ATTRIBUTES) {
                    LockEffect::Release
                } else {
                    continue;
                };
                let span = attr.span.or(method.span);
                for text in lock_texts(attr) {
                    match resolver.resolve(&text, &scope) {
                        Ok(lock) => table
                            .bindings
                            .entry((method.name.clone(), method.arity()))
                            .or_default()
                            .push(LockMethodBinding {
                                method: member.clone(),
                                lock,
                                kind,
                            }),
                        Err(error) => table
                            .findings
                            .push(declaration_finding(error, &member, span)),
                    }
                }
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{Attribute, CompilationUnit, FieldDecl, MethodDecl, TypeDecl};
    use crate::guard::alias::LockPath;

    fn unit() -> CompilationUnit {
        CompilationUnit::new(
            "Test.java",
            vec![
                TypeDecl::class("Test")
                    .field(FieldDecl::new("lock", "Lock"))
                    .field(
                        FieldDecl::new("x", "int")
                            .attribute(Attribute::with_values(
                                "javax.annotation.concurrent.GuardedBy",
                                ["lock"],
                            )),
                    )
                    .field(
                        FieldDecl::new("broken", "int")
                            .attribute(Attribute::with_values("GuardedBy", ["lock("]).at(40, 52)),
                    )
                    .field(
                        FieldDecl::new("counter", "int")
                            .make_static()
                            .attribute(Attribute::with_values("GuardedBy", ["lock"])),
                    )
                    .method(
                        MethodDecl::new("lock")
                            .attribute(Attribute::with_values("LockMethod", ["lock"])),
                    )
                    .method(
                        MethodDecl::new("unlock")
                            .attribute(Attribute::with_values("UnlockMethod", ["lock, other"])),
                    )
                    .method(
                        MethodDecl::new("mutate")
                            .param("foo", "Lock")
                            .make_static()
                            .attribute(Attribute::with_values("GuardedBy", ["foo"])),
                    )
                    .method(
                        MethodDecl::new("lockAll")
                            .make_static()
                            .attribute(Attribute::with_values("AcquireLock", ["lock"]).at(60, 78)),
                    ),
            ],
        )
    }

    #[test]
    fn index_records_resolved_guards_and_findings() {
        let unit = unit();
        let symbols = SymbolTable::build(&unit);
        let index = GuardedEntityIndex::new(&symbols);

        let x = index.guarded_field("Test", "x").unwrap();
        assert_eq!(x.required.path, LockPath::this().field("lock"));
        assert_eq!(x.member.to_string(), "Test.x");
        assert!(index.guarded_field("Test", "broken").is_none());
        assert!(index.guarded_field("Test", "counter").is_none());
        assert!(index.guarded_field("Missing", "x").is_none());

        let mutate = index.guarded_method("Test", "mutate", 1).unwrap();
        assert!(mutate.is_static && mutate.required.is_static);
        assert!(index.guarded_method("Test", "mutate", 0).is_none());

        let kinds: Vec<_> = index
            .findings("Test")
            .iter()
            .map(|f| (f.kind, f.message.as_str(), f.span))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (
                    GuardErrorKind::MalformedLockExpression,
                    "unresolvable lock expression 'lock('",
                    Some(Span::new(40, 52))
                ),
                (
                    GuardErrorKind::StaticInstanceMismatch,
                    "static member guarded by instance lock 'lock'",
                    None
                ),
            ]
        );
    }

    #[test]
    fn registry_binds_each_listed_lock() {
        let unit = unit();
        let symbols = SymbolTable::build(&unit);
        let registry = LockMethodRegistry::new(&symbols);

        let acquire = registry.bindings("Test", "lock", 0);
        assert_eq!(acquire.len(), 1);
        assert_eq!(acquire[0].kind, LockEffect::Acquire);
        assert_eq!(acquire[0].lock.path, LockPath::this().field("lock"));

        let release = registry.bindings("Test", "unlock", 0);
        assert_eq!(release.len(), 1);
        assert_eq!(release[0].kind, LockEffect::Release);
        assert!(registry.bindings("Test", "mutate", 1).is_empty());

        assert!(registry.bindings("Test", "lockAll", 0).is_empty());

        let findings = registry.findings("Test");
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].kind, GuardErrorKind::UnresolvableLockExpression);
        assert_eq!(findings[0].message, "unresolvable lock expression 'other'");
        assert_eq!(findings[0].member.as_deref(), Some("unlock"));
        assert_eq!(findings[1].kind, GuardErrorKind::StaticInstanceMismatch);
        assert_eq!(findings[1].message, "static member guarded by instance lock 'lock'");
        assert_eq!(findings[1].member.as_deref(), Some("lockAll"));
        assert_eq!(findings[1].span, Some(Span::new(60, 78)));
    }
}
