//! Driver: one walk per method body, reporting guarded accesses made without their lock.

use super::alias::LockPath;
use super::held::{AccessVisitor, GuardOptions, HeldLockSet, HeldLockWalker, MemberAccess};
use super::index::{GuardedEntityIndex, LockMethodRegistry, MemberKind};
use super::{GuardErrorKind, GuardFinding};
use crate::frontend::SymbolTable;
use crate::frontend::ast::MethodDecl;

pub struct GuardViolationChecker<'s, 'a> {
    symbols: &'s SymbolTable<'a>,
    index: GuardedEntityIndex<'s, 'a>,
    locks: LockMethodRegistry<'s, 'a>,
    options: GuardOptions,
}

impl<'s, 'a> GuardViolationChecker<'s, 'a> {
    #[must_use]
    pub fn new(symbols: &'s SymbolTable<'a>, options: GuardOptions) -> Self {
        Self {
            symbols,
            index: GuardedEntityIndex::new(symbols),
            locks: LockMethodRegistry::new(symbols),
            options,
        }
    }

    /// Declaration findings followed by violations, type by type.
    #[must_use]
    pub fn check_unit(&self) -> Vec<GuardFinding> {
        let mut findings = Vec::new();
        for decl in self.symbols.types() {
            let owner = decl.name.as_str();
            findings.extend_from_slice(self.index.findings(owner));
            findings.extend_from_slice(self.locks.findings(owner));
            for method in &decl.methods {
                findings.extend(self.check_method(owner, method));
            }
        }
        findings
    }

    /// Violations inside the body of `method`, declared on `owner`.
    #[must_use]
    pub fn check_method(&self, owner: &'a str, method: &MethodDecl) -> Vec<GuardFinding> {
        let Some(body) = &method.body else {
            return Vec::new();
        };
        let entry = self.entry_state(owner, method);
        let mut collector = ViolationCollector {
            index: &self.index,
            owner,
            method: &method.name,
            in_constructor: method.is_constructor(),
            findings: Vec::new(),
        };
        HeldLockWalker::new(self.symbols, &self.locks, &self.options, owner, method, &mut collector)
            .walk(body, entry);
        tracing::debug!(
            target: "lockguard::checker",
            owner,
            method = %method.name,
            violations = collector.findings.len(),
            "checked method body"
        );
        collector.findings
    }

    /// A guarded method runs with its own guard held.
    fn entry_state(&self, owner: &str, method: &MethodDecl) -> HeldLockSet {
        let mut entry = HeldLockSet::new();
        let Some(own) = self
            .index
            .guarded_method(owner, &method.name, method.arity())
        else {
            return entry;
        };
        let params: Vec<_> = method
            .parameters
            .iter()
            .map(|param| Some(LockPath::variable(&param.name)))
            .collect();
        if let Some(lock) = own
            .required
            .path
            .instantiate(Some(&LockPath::this()), &params)
        {
            entry.insert(lock);
        }
        entry
    }
}

struct ViolationCollector<'i, 's, 'a> {
    index: &'i GuardedEntityIndex<'s, 'a>,
    owner: &'i str,
    method: &'i str,
    in_constructor: bool,
    findings: Vec<GuardFinding>,
}

impl AccessVisitor for ViolationCollector<'_, '_, '_> {
    fn on_access(&mut self, access: &MemberAccess, held: &HeldLockSet) {
        let member = &access.member;
        let entity = match member.kind {
            MemberKind::Field => self.index.guarded_field(&member.owner, &member.name),
            MemberKind::Method { arity } => {
                self.index
                    .guarded_method(&member.owner, &member.name, arity)
            }
        };
        let Some(entity) = entity else {
            return;
        };
        // The object under construction is not yet visible to other threads.
        if self.in_constructor
            && !access.is_static
            && access.receiver.as_ref() == Some(&LockPath::this())
        {
            return;
        }
        let Some(required) = entity
            .required
            .path
            .instantiate(access.receiver.as_ref(), &access.args)
        else {
            tracing::debug!(
                target: "lockguard::checker",
                member = %entity.member,
                lock = %entity.required.text,
                span = ?access.span,
                "access site has no canonical path for the guard; not checked"
            );
            return;
        };
        if held.holds(&required) {
            return;
        }
        self.findings.push(GuardFinding {
            kind: GuardErrorKind::GuardViolation,
            message: format!(
                "{} is guarded by '{}' but no matching lock is held",
                entity.member, entity.required.text
            ),
            span: access.span,
            owner: self.owner.to_string(),
            member: Some(self.method.to_string()),
            note: Some(format!("expected `{required}` to be held")),
        });
    }
}
