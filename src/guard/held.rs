//! Must-held lock analysis over a method body.
//!
//! The walk is structural: each statement maps an incoming state to an
//! outgoing one, joins intersect, and `None` marks a point no path reaches.
//! Loops are iterated silently until the head state stops shrinking, then
//! walked once more with reporting enabled. Member accesses are handed to an
//! [`AccessVisitor`] together with the locks held at that point.

use std::collections::BTreeSet;

use super::alias::{LockPath, equivalent};
use super::index::{LockEffect, LockMethodRegistry, MemberRef};
use super::scope::{BodyScope, split_callee};
use crate::diagnostics::Span;
use crate::frontend::SymbolTable;
use crate::frontend::ast::{
    Block, ExprNode, Expression, ForStatement, ForeachStatement, MethodDecl, Statement,
    StatementKind, SwitchStatement, TryStatement,
};

/// Intrinsic lock API recognised on values of a lock type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOptions {
    pub lock_types: Vec<String>,
    pub acquire_methods: Vec<String>,
    pub release_methods: Vec<String>,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            lock_types: vec!["Lock".into(), "ReentrantLock".into()],
            acquire_methods: vec!["lock".into(), "lockInterruptibly".into()],
            release_methods: vec!["unlock".into()],
        }
    }
}

impl GuardOptions {
    #[must_use]
    pub fn is_lock_type(&self, ty: &str) -> bool {
        let simple = ty.rsplit('.').next().unwrap_or(ty);
        self.lock_types
            .iter()
            .any(|lock| lock == ty || lock == simple)
    }

    fn intrinsic_effect(&self, method: &str) -> Option<LockEffect> {
        if self.acquire_methods.iter().any(|name| name == method) {
            Some(LockEffect::Acquire)
        } else if self.release_methods.iter().any(|name| name == method) {
            Some(LockEffect::Release)
        } else {
            None
        }
    }
}

/// Locks provably held at a program point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldLockSet {
    locks: BTreeSet<LockPath>,
}

impl HeldLockSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, lock: LockPath) {
        self.locks.insert(lock);
    }

    pub fn remove(&mut self, lock: &LockPath) {
        self.locks.retain(|held| !equivalent(held, lock));
    }

    /// Drop every lock reached through `place`, which now names a different object.
    pub fn invalidate(&mut self, place: &LockPath) {
        self.locks.retain(|held| !held.extends(place));
    }

    #[must_use]
    pub fn holds(&self, lock: &LockPath) -> bool {
        self.locks.iter().any(|held| equivalent(held, lock))
    }

    /// Locks held on both sides.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        Self {
            locks: self
                .locks
                .iter()
                .filter(|lock| other.holds(lock))
                .cloned()
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LockPath> {
        self.locks.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl FromIterator<LockPath> for HeldLockSet {
    fn from_iter<I: IntoIterator<Item = LockPath>>(iter: I) -> Self {
        Self {
            locks: iter.into_iter().collect(),
        }
    }
}

/// Held locks at a point, or `None` when the point is unreachable.
pub type FlowState = Option<HeldLockSet>;

/// Control-flow merge: unreachable predecessors contribute nothing.
#[must_use]
pub fn join(a: FlowState, b: FlowState) -> FlowState {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.meet(&b)),
        (Some(state), None) | (None, Some(state)) => Some(state),
        (None, None) => None,
    }
}

fn join_all(state: FlowState, others: Vec<HeldLockSet>) -> FlowState {
    others
        .into_iter()
        .fold(state, |acc, other| join(acc, Some(other)))
}

/// A read, write or call of a member, as seen from the analysed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccess {
    pub member: MemberRef,
    /// Path of the object the member is reached through; `None` when static or unnameable.
    pub receiver: Option<LockPath>,
    /// Paths of the call arguments, positionally; empty for fields.
    pub args: Vec<Option<LockPath>>,
    pub is_static: bool,
    pub span: Option<Span>,
}

pub trait AccessVisitor {
    fn on_access(&mut self, access: &MemberAccess, held: &HeldLockSet);
}

#[derive(Debug, Default)]
struct JumpFrame {
    is_loop: bool,
    breaks: Vec<HeldLockSet>,
    continues: Vec<HeldLockSet>,
}

struct LoopPass {
    exit: FlowState,
    back: FlowState,
}

fn is_true_literal(expr: &Expression) -> bool {
    matches!(&expr.node, ExprNode::Literal(text) if text == "true")
}

pub struct HeldLockWalker<'w, 's, 'a, V: AccessVisitor + ?Sized> {
    locks: &'w LockMethodRegistry<'s, 'a>,
    options: &'w GuardOptions,
    scope: BodyScope<'s, 'a>,
    visitor: &'w mut V,
    reporting: bool,
    jumps: Vec<JumpFrame>,
    /// Running intersection of the states seen inside each enclosing `try`.
    tries: Vec<HeldLockSet>,
}

impl<'w, 's, 'a, V: AccessVisitor + ?Sized> HeldLockWalker<'w, 's, 'a, V> {
    pub fn new(
        symbols: &'s SymbolTable<'a>,
        locks: &'w LockMethodRegistry<'s, 'a>,
        options: &'w GuardOptions,
        owner: &'a str,
        method: &MethodDecl,
        visitor: &'w mut V,
    ) -> Self {
        Self {
            locks,
            options,
            scope: BodyScope::new(symbols, owner, method),
            visitor,
            reporting: true,
            jumps: Vec::new(),
            tries: Vec::new(),
        }
    }

    /// Walk `body` from `entry`, returning the state on normal completion.
    pub fn walk(mut self, body: &Block, entry: HeldLockSet) -> FlowState {
        self.block(body, Some(entry))
    }

    fn block(&mut self, block: &Block, state: FlowState) -> FlowState {
        self.scope.push();
        let state = block
            .statements
            .iter()
            .fold(state, |state, stmt| self.statement(stmt, state));
        self.scope.pop();
        state
    }

    fn statement(&mut self, stmt: &Statement, state: FlowState) -> FlowState {
        let mut held = state?;
        match &stmt.kind {
            StatementKind::Block(block) => self.block(block, Some(held)),
            StatementKind::Empty => Some(held),
            StatementKind::VariableDeclaration(decl) => {
                if let Some(init) = &decl.initializer {
                    self.expression(init, &mut held);
                }
                self.scope
                    .declare(&decl.name, decl.ty.as_ref(), decl.initializer.as_ref());
                self.rebind(&LockPath::variable(&decl.name), &mut held);
                Some(held)
            }
            StatementKind::Expression(expr) => {
                self.expression(expr, &mut held);
                Some(held)
            }
            StatementKind::Return { expression } | StatementKind::Throw { expression } => {
                if let Some(expr) = expression {
                    self.expression(expr, &mut held);
                }
                None
            }
            StatementKind::Break => {
                if let Some(frame) = self.jumps.last_mut() {
                    frame.breaks.push(held);
                }
                None
            }
            StatementKind::Continue => {
                if let Some(frame) = self.jumps.iter_mut().rev().find(|frame| frame.is_loop) {
                    frame.continues.push(held);
                }
                None
            }
            StatementKind::If(stmt) => {
                self.expression(&stmt.condition, &mut held);
                let then_state = self.statement(&stmt.then_branch, Some(held.clone()));
                let else_state = match &stmt.else_branch {
                    Some(else_branch) => self.statement(else_branch, Some(held)),
                    None => Some(held),
                };
                join(then_state, else_state)
            }
            StatementKind::While { condition, body } => self.while_loop(condition, body, held),
            StatementKind::DoWhile { body, condition } => self.do_while_loop(body, condition, held),
            StatementKind::For(stmt) => self.for_loop(stmt, held),
            StatementKind::Foreach(stmt) => self.foreach_loop(stmt, held),
            StatementKind::Switch(stmt) => self.switch(stmt, held),
            StatementKind::Try(stmt) => self.try_statement(stmt, held),
            StatementKind::Lock { expression, body } => self.lock_statement(expression, body, held),
        }
    }

    /// Iterate `pass` until the loop head state is stable, then run it once for real.
    fn run_loop<F>(&mut self, entry: HeldLockSet, mut pass: F) -> FlowState
    where
        F: FnMut(&mut Self, HeldLockSet) -> LoopPass,
    {
        let reporting = std::mem::replace(&mut self.reporting, false);
        let mut head = entry;
        loop {
            let LoopPass { back, .. } = pass(&mut *self, head.clone());
            let next = match back {
                Some(back) => head.meet(&back),
                None => head.clone(),
            };
            if next == head {
                break;
            }
            head = next;
        }
        self.reporting = reporting;
        pass(&mut *self, head).exit
    }

    fn loop_body(&mut self, body: &Statement, state: HeldLockSet) -> (FlowState, JumpFrame) {
        self.jumps.push(JumpFrame {
            is_loop: true,
            ..JumpFrame::default()
        });
        let out = self.statement(body, Some(state));
        let frame = self.jumps.pop().unwrap_or_default();
        (out, frame)
    }

    fn while_loop(
        &mut self,
        condition: &Expression,
        body: &Statement,
        entry: HeldLockSet,
    ) -> FlowState {
        let endless = is_true_literal(condition);
        self.run_loop(entry, |walker, mut held| {
            walker.expression(condition, &mut held);
            let (out, frame) = walker.loop_body(body, held.clone());
            let exit = if endless { None } else { Some(held) };
            LoopPass {
                exit: join_all(exit, frame.breaks),
                back: join_all(out, frame.continues),
            }
        })
    }

    fn do_while_loop(
        &mut self,
        body: &Statement,
        condition: &Expression,
        entry: HeldLockSet,
    ) -> FlowState {
        let endless = is_true_literal(condition);
        self.run_loop(entry, |walker, held| {
            let (out, frame) = walker.loop_body(body, held);
            let back = join_all(out, frame.continues).map(|mut held| {
                walker.expression(condition, &mut held);
                held
            });
            let exit = if endless { None } else { back.clone() };
            LoopPass {
                exit: join_all(exit, frame.breaks),
                back,
            }
        })
    }

    fn for_loop(&mut self, stmt: &ForStatement, entry: HeldLockSet) -> FlowState {
        self.scope.push();
        let state = stmt
            .initializer
            .iter()
            .fold(Some(entry), |state, init| self.statement(init, state));
        let result = state.and_then(|entry| {
            let endless = stmt.condition.as_ref().is_none_or(is_true_literal);
            self.run_loop(entry, |walker, mut held| {
                if let Some(condition) = &stmt.condition {
                    walker.expression(condition, &mut held);
                }
                let (out, frame) = walker.loop_body(&stmt.body, held.clone());
                let back = join_all(out, frame.continues).map(|mut held| {
                    for step in &stmt.iterator {
                        walker.expression(step, &mut held);
                    }
                    held
                });
                let exit = if endless { None } else { Some(held) };
                LoopPass {
                    exit: join_all(exit, frame.breaks),
                    back,
                }
            })
        });
        self.scope.pop();
        result
    }

    fn foreach_loop(&mut self, stmt: &ForeachStatement, mut entry: HeldLockSet) -> FlowState {
        self.expression(&stmt.iterable, &mut entry);
        self.scope.push();
        self.scope.declare(&stmt.variable, stmt.ty.as_ref(), None);
        let variable = LockPath::variable(&stmt.variable);
        let result = self.run_loop(entry, |walker, mut held| {
            walker.rebind(&variable, &mut held);
            let (out, frame) = walker.loop_body(&stmt.body, held.clone());
            LoopPass {
                exit: join_all(Some(held), frame.breaks),
                back: join_all(out, frame.continues),
            }
        });
        self.scope.pop();
        result
    }

    fn switch(&mut self, stmt: &SwitchStatement, mut held: HeldLockSet) -> FlowState {
        self.expression(&stmt.expression, &mut held);
        self.jumps.push(JumpFrame::default());
        let mut exit = None;
        for section in &stmt.sections {
            self.scope.push();
            let out = section
                .statements
                .iter()
                .fold(Some(held.clone()), |state, stmt| self.statement(stmt, state));
            self.scope.pop();
            exit = join(exit, out);
        }
        if !stmt.sections.iter().any(|section| section.is_default) {
            exit = join(exit, Some(held));
        }
        let frame = self.jumps.pop().unwrap_or_default();
        join_all(exit, frame.breaks)
    }

    fn try_statement(&mut self, stmt: &TryStatement, entry: HeldLockSet) -> FlowState {
        let marks = self.jump_marks();
        if stmt.finally.is_some() {
            self.tries.push(entry.clone());
        }
        self.tries.push(entry.clone());
        let body_out = self.block(&stmt.body, Some(entry));
        let catch_entry = self.tries.pop().unwrap_or_default();

        let mut normal = body_out;
        for clause in &stmt.catches {
            self.scope.push();
            let mut entry = catch_entry.clone();
            if let Some(identifier) = &clause.identifier {
                self.scope
                    .declare(identifier, clause.type_annotation.as_ref(), None);
                self.rebind(&LockPath::variable(identifier), &mut entry);
            }
            let out = self.block(&clause.body, Some(entry));
            self.scope.pop();
            normal = join(normal, out);
        }

        let Some(finally) = &stmt.finally else {
            return normal;
        };
        let exceptional = self.tries.pop().unwrap_or_default();
        let finally_marks = self.jump_marks();
        self.block(finally, join(normal.clone(), Some(exceptional)));
        self.truncate_jumps(&finally_marks);

        self.rewrite_jumps(&marks, |walker, state| walker.replay(finally, state));
        normal.and_then(|state| self.replay(finally, state))
    }

    fn lock_statement(
        &mut self,
        expression: &Expression,
        body: &Statement,
        mut held: HeldLockSet,
    ) -> FlowState {
        self.expression(expression, &mut held);
        let Some(lock) = self.scope.place(expression).path else {
            tracing::debug!(
                target: "lockguard::held",
                owner = self.scope.owner(),
                span = ?expression.span,
                "lock target has no canonical path; body analysed without it"
            );
            return self.statement(body, Some(held));
        };
        if held.holds(&lock) {
            return self.statement(body, Some(held));
        }
        let marks = self.jump_marks();
        held.insert(lock.clone());
        let out = self.statement(body, Some(held));
        let release = |mut state: HeldLockSet| {
            state.remove(&lock);
            state
        };
        self.rewrite_jumps(&marks, |_, state| Some(release(state)));
        out.map(release)
    }

    /// Re-run a `finally` block silently to get the state after it.
    fn replay(&mut self, finally: &Block, state: HeldLockSet) -> FlowState {
        let reporting = std::mem::replace(&mut self.reporting, false);
        let marks = self.jump_marks();
        let out = self.block(finally, Some(state));
        self.truncate_jumps(&marks);
        self.reporting = reporting;
        out
    }

    fn jump_marks(&self) -> Vec<(usize, usize)> {
        self.jumps
            .iter()
            .map(|frame| (frame.breaks.len(), frame.continues.len()))
            .collect()
    }

    fn truncate_jumps(&mut self, marks: &[(usize, usize)]) {
        for (frame, &(breaks, continues)) in self.jumps.iter_mut().zip(marks) {
            frame.breaks.truncate(breaks);
            frame.continues.truncate(continues);
        }
    }

    /// Pass every jump recorded since `marks` through `exit`, the code it leaves on the way out.
    fn rewrite_jumps<F>(&mut self, marks: &[(usize, usize)], mut exit: F)
    where
        F: FnMut(&mut Self, HeldLockSet) -> FlowState,
    {
        for (index, &(breaks, continues)) in marks.iter().enumerate() {
            let Some(frame) = self.jumps.get_mut(index) else {
                break;
            };
            let pending_breaks = frame.breaks.split_off(breaks);
            let pending_continues = frame.continues.split_off(continues);
            let breaks: Vec<_> = pending_breaks
                .into_iter()
                .filter_map(|state| exit(&mut *self, state))
                .collect();
            let continues: Vec<_> = pending_continues
                .into_iter()
                .filter_map(|state| exit(&mut *self, state))
                .collect();
            if let Some(frame) = self.jumps.get_mut(index) {
                frame.breaks.extend(breaks);
                frame.continues.extend(continues);
            }
        }
    }

    fn expression(&mut self, expr: &Expression, held: &mut HeldLockSet) {
        match &expr.node {
            ExprNode::Literal(_) | ExprNode::This => {}
            ExprNode::Identifier(name) => {
                if let Some(site) = self.scope.field_site(None, name) {
                    let access = MemberAccess {
                        member: MemberRef::field(site.owner, name),
                        receiver: site.receiver,
                        args: Vec::new(),
                        is_static: site.decl.is_static,
                        span: expr.span,
                    };
                    self.report(&access, held);
                }
            }
            ExprNode::Member { base, member } => {
                self.expression(base, held);
                if let Some(site) = self.scope.field_site(Some(base.as_ref()), member) {
                    let access = MemberAccess {
                        member: MemberRef::field(site.owner, member),
                        receiver: site.receiver,
                        args: Vec::new(),
                        is_static: site.decl.is_static,
                        span: expr.span,
                    };
                    self.report(&access, held);
                }
            }
            ExprNode::Call { callee, args } => self.call(expr, callee, args, held),
            ExprNode::Assign { target, value } => {
                self.expression(target, held);
                self.expression(value, held);
                if let Some(place) = self.scope.place(target).path {
                    self.rebind(&place, held);
                }
            }
            ExprNode::Unary { expr, .. } => self.expression(expr, held),
            ExprNode::Binary { op, left, right } => {
                self.expression(left, held);
                if op.short_circuits() {
                    let mut rhs = held.clone();
                    self.expression(right, &mut rhs);
                    *held = held.meet(&rhs);
                } else {
                    self.expression(right, held);
                }
            }
            ExprNode::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expression(condition, held);
                let mut then_held = held.clone();
                self.expression(then_branch, &mut then_held);
                self.expression(else_branch, held);
                *held = held.meet(&then_held);
            }
            ExprNode::New { args, .. } => {
                for arg in args {
                    self.expression(arg, held);
                }
            }
        }
    }

    fn call(
        &mut self,
        expr: &Expression,
        callee: &Expression,
        args: &[Expression],
        held: &mut HeldLockSet,
    ) {
        let Some((base, name)) = split_callee(callee) else {
            self.expression(callee, held);
            for arg in args {
                self.expression(arg, held);
            }
            return;
        };
        if let Some(base) = base {
            self.expression(base, held);
        }
        for arg in args {
            self.expression(arg, held);
        }

        let arg_paths: Vec<Option<LockPath>> =
            args.iter().map(|arg| self.scope.place(arg).path).collect();
        if let Some(site) = self.scope.method_site(base, name, args.len()) {
            let access = MemberAccess {
                member: MemberRef::method(site.owner, site.decl),
                receiver: site.receiver.clone(),
                args: arg_paths.clone(),
                is_static: site.decl.is_static,
                span: expr.span,
            };
            self.report(&access, held);

            let locks = self.locks;
            for binding in locks.bindings(site.owner, name, args.len()) {
                match binding.lock.path.instantiate(site.receiver.as_ref(), &arg_paths) {
                    Some(path) => self.apply(binding.kind, path, held),
                    None => tracing::debug!(
                        target: "lockguard::held",
                        method = %binding.method,
                        lock = %binding.lock.text,
                        "lock method call site has no canonical path for its lock"
                    ),
                }
            }
        }

        if let (Some(base), true) = (base, args.is_empty()) {
            self.intrinsic(base, name, held);
        }
    }

    fn intrinsic(&mut self, base: &Expression, method: &str, held: &mut HeldLockSet) {
        let Some(effect) = self.options.intrinsic_effect(method) else {
            return;
        };
        let place = self.scope.place(base);
        if !place
            .ty
            .as_deref()
            .is_some_and(|ty| self.options.is_lock_type(ty))
        {
            return;
        }
        match place.path {
            Some(path) => self.apply(effect, path, held),
            None => tracing::debug!(
                target: "lockguard::held",
                owner = self.scope.owner(),
                method,
                "lock receiver has no canonical path"
            ),
        }
    }

    fn apply(&mut self, effect: LockEffect, lock: LockPath, held: &mut HeldLockSet) {
        tracing::trace!(target: "lockguard::held", ?effect, lock = %lock, "lock state change");
        match effect {
            LockEffect::Acquire => held.insert(lock),
            LockEffect::Release => held.remove(&lock),
        }
        for seen in &mut self.tries {
            *seen = seen.meet(held);
        }
    }

    /// `place` now holds a different object; locks reached through it are no longer known.
    fn rebind(&mut self, place: &LockPath, held: &mut HeldLockSet) {
        if !held.iter().any(|lock| lock.extends(place)) {
            return;
        }
        tracing::trace!(
            target: "lockguard::held",
            place = %place,
            "place rebound; dropping its locks"
        );
        held.invalidate(place);
        for seen in &mut self.tries {
            *seen = seen.meet(held);
        }
    }

    fn report(&mut self, access: &MemberAccess, held: &HeldLockSet) {
        if self.reporting {
            self.visitor.on_access(access, held);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::builders::{
        assign, binary, block, block_stmt, break_stmt, call, case_section, catch_clause,
        conditional, continue_stmt, declare, do_while_stmt, expr_stmt, for_stmt, foreach_stmt,
        ident, if_stmt, literal, lock_stmt, member, method_call, new_object, post_increment,
        return_stmt, switch_stmt, this, try_finally, try_stmt, while_stmt,
    };
    use crate::frontend::ast::{
        Attribute, BinaryOp, CompilationUnit, FieldDecl, MethodDecl, TypeDecl,
    };

    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
    }

    impl AccessVisitor for Recorder {
        fn on_access(&mut self, access: &MemberAccess, held: &HeldLockSet) {
            let locks: Vec<_> = held.iter().map(ToString::to_string).collect();
            self.seen
                .push(format!("{} [{}]", access.member.name, locks.join(", ")));
        }
    }

    fn unit(body: Vec<Statement>) -> CompilationUnit {
        CompilationUnit::new(
            "Test.java",
            vec![
                TypeDecl::class("Test")
                    .field(FieldDecl::new("lock", "Lock"))
                    .field(FieldDecl::new("mu", "Object"))
                    .field(FieldDecl::new("x", "int"))
                    .field(FieldDecl::new("y", "int"))
                    .method(
                        MethodDecl::new("acquire")
                            .attribute(Attribute::with_values("LockMethod", ["lock"])),
                    )
                    .method(
                        MethodDecl::new("release")
                            .attribute(Attribute::with_values("UnlockMethod", ["lock"])),
                    )
                    .method(MethodDecl::new("m").body(block(body))),
            ],
        )
    }

    fn walk(body: Vec<Statement>) -> (Vec<String>, FlowState) {
        let unit = unit(body);
        let symbols = SymbolTable::build(&unit);
        let locks = LockMethodRegistry::new(&symbols);
        let options = GuardOptions::default();
        let method = &unit.types[0].methods[2];
        let mut recorder = Recorder::default();
        let exit = HeldLockWalker::new(&symbols, &locks, &options, "Test", method, &mut recorder)
            .walk(method.body.as_ref().unwrap(), HeldLockSet::new());
        (recorder.seen, exit)
    }

    fn touch(name: &str) -> Statement {
        expr_stmt(post_increment(ident(name)))
    }

    fn lock_call(name: &str) -> Statement {
        expr_stmt(method_call(ident("lock"), name, vec![]))
    }

    #[test]
    fn meet_and_join_intersect_reachable_states() {
        let a: HeldLockSet = [LockPath::this().field("a"), LockPath::this().field("b")]
            .into_iter()
            .collect();
        let b: HeldLockSet = [LockPath::this().field("b")].into_iter().collect();
        assert_eq!(a.meet(&b), b);
        assert_eq!(join(Some(a.clone()), None), Some(a.clone()));
        assert_eq!(join(None, None), None);
        assert_eq!(join(Some(a), Some(b.clone())), Some(b));
    }

    #[test]
    fn straight_line_acquire_and_release() {
        let (seen, exit) = walk(vec![
            touch("x"),
            lock_call("lock"),
            touch("x"),
            lock_call("unlock"),
            touch("x"),
            expr_stmt(call("acquire", vec![])),
            touch("y"),
            expr_stmt(call("release", vec![])),
            touch("y"),
        ]);
        assert_eq!(
            seen,
            vec![
                "x []",
                "lock []",
                "x [this.lock]",
                "lock [this.lock]",
                "x []",
                "acquire []",
                "y [this.lock]",
                "release [this.lock]",
                "y []",
            ]
        );
        assert_eq!(exit, Some(HeldLockSet::new()));
    }

    #[test]
    fn branches_join_by_intersection() {
        let (seen, _) = walk(vec![
            if_stmt(
                ident("c"),
                block_of(vec![lock_call("lock")]),
                Some(block_of(vec![lock_call("lock"), touch("y")])),
            ),
            touch("x"),
            if_stmt(ident("c"), block_of(vec![lock_call("unlock")]), None),
            touch("x"),
        ]);
        assert_eq!(seen.last().map(String::as_str), Some("x []"));
        assert!(seen.contains(&"y [this.lock]".to_string()));
        assert!(seen.contains(&"x [this.lock]".to_string()));
    }

    fn block_of(statements: Vec<Statement>) -> Statement {
        block_stmt(statements)
    }

    #[test]
    fn loop_head_loses_locks_released_in_the_body() {
        let (seen, exit) = walk(vec![
            lock_call("lock"),
            while_stmt(
                ident("c"),
                block_of(vec![touch("x"), lock_call("unlock")]),
            ),
            touch("y"),
        ]);
        assert_eq!(seen, vec!["lock []", "x []", "lock []", "y []"]);
        assert_eq!(exit, Some(HeldLockSet::new()));
    }

    #[test]
    fn do_while_bodies_run_at_least_once() {
        let (seen, _) = walk(vec![
            lock_call("lock"),
            do_while_stmt(block_of(vec![touch("x"), lock_call("unlock")]), ident("c")),
            touch("y"),
        ]);
        assert_eq!(seen, vec!["lock []", "x []", "lock []", "y []"]);

        let (seen, exit) = walk(vec![
            do_while_stmt(block_of(vec![lock_call("lock")]), ident("c")),
            touch("x"),
        ]);
        assert_eq!(seen, vec!["lock []", "x [this.lock]"]);
        assert_eq!(exit, Some([LockPath::this().field("lock")].into_iter().collect()));
    }

    #[test]
    fn for_loops_join_the_head_and_endless_ones_exit_by_break() {
        let (seen, _) = walk(vec![
            lock_call("lock"),
            for_stmt(
                vec![declare("i", Some("int"), Some(literal("0")))],
                Some(ident("c")),
                vec![post_increment(ident("i"))],
                block_of(vec![lock_call("unlock")]),
            ),
            touch("x"),
        ]);
        assert_eq!(seen, vec!["lock []", "lock []", "x []"]);

        let (seen, _) = walk(vec![
            for_stmt(
                vec![],
                None,
                vec![],
                block_of(vec![
                    lock_call("lock"),
                    if_stmt(ident("c"), break_stmt(), None),
                    lock_call("unlock"),
                ]),
            ),
            touch("x"),
        ]);
        assert_eq!(seen, vec!["lock []", "lock [this.lock]", "x [this.lock]"]);
    }

    #[test]
    fn foreach_variables_are_fresh_each_iteration() {
        let (seen, exit) = walk(vec![
            lock_call("lock"),
            foreach_stmt(
                "t",
                Some("Test"),
                ident("items"),
                block_of(vec![
                    expr_stmt(method_call(member(ident("t"), "lock"), "lock", vec![])),
                    expr_stmt(post_increment(member(ident("t"), "x"))),
                    lock_call("unlock"),
                ]),
            ),
            touch("x"),
        ]);
        assert_eq!(seen, vec!["lock []", "lock []", "x [t.lock]", "lock [t.lock]", "x []"]);
        assert_eq!(exit, Some(HeldLockSet::new()));
    }

    #[test]
    fn conditional_expressions_meet_their_arms() {
        let acquire = || method_call(ident("lock"), "lock", vec![]);
        let (seen, _) = walk(vec![
            expr_stmt(conditional(ident("c"), acquire(), literal("0"))),
            touch("x"),
            expr_stmt(conditional(ident("c"), acquire(), acquire())),
            touch("y"),
        ]);
        assert_eq!(seen, vec!["lock []", "x []", "lock []", "lock []", "y [this.lock]"]);
    }

    #[test]
    fn reassigned_variables_lose_their_locks() {
        let (seen, _) = walk(vec![
            declare("a", Some("Test"), None),
            declare("b", Some("Test"), None),
            expr_stmt(method_call(member(ident("a"), "lock"), "lock", vec![])),
            expr_stmt(post_increment(member(ident("a"), "x"))),
            expr_stmt(assign(ident("a"), ident("b"))),
            expr_stmt(post_increment(member(ident("a"), "x"))),
        ]);
        assert_eq!(seen, vec!["lock []", "x [a.lock]", "x []"]);
    }

    #[test]
    fn replacing_a_held_lock_field_drops_it() {
        let (seen, exit) = walk(vec![lock_stmt(
            ident("lock"),
            vec![
                touch("x"),
                expr_stmt(assign(ident("lock"), new_object("ReentrantLock", vec![]))),
                touch("x"),
            ],
        )]);
        assert_eq!(seen, vec!["lock []", "x [this.lock]", "lock [this.lock]", "x []"]);
        assert_eq!(exit, Some(HeldLockSet::new()));
    }

    #[test]
    fn redeclared_variables_start_without_locks() {
        let (seen, _) = walk(vec![
            block_of(vec![
                declare("a", Some("Test"), None),
                expr_stmt(method_call(member(ident("a"), "lock"), "lock", vec![])),
                expr_stmt(post_increment(member(ident("a"), "x"))),
            ]),
            block_of(vec![
                declare("a", Some("Test"), None),
                expr_stmt(post_increment(member(ident("a"), "x"))),
            ]),
        ]);
        assert_eq!(seen, vec!["lock []", "x [a.lock]", "x []"]);
    }

    #[test]
    fn break_and_continue_reach_the_right_join() {
        let (seen, _) = walk(vec![
            lock_call("lock"),
            while_stmt(
                literal("true"),
                block_of(vec![
                    if_stmt(ident("c"), break_stmt(), None),
                    if_stmt(ident("d"), continue_stmt(), None),
                    touch("x"),
                ]),
            ),
            touch("y"),
        ]);
        assert_eq!(seen, vec!["lock []", "x [this.lock]", "y [this.lock]"]);
    }

    #[test]
    fn return_and_throw_make_the_rest_unreachable() {
        let (seen, exit) = walk(vec![return_stmt(None), touch("x")]);
        assert!(seen.is_empty());
        assert_eq!(exit, None);
    }

    #[test]
    fn lock_statements_hold_their_target_for_the_body() {
        let (seen, exit) = walk(vec![
            lock_stmt(ident("mu"), vec![touch("x")]),
            lock_stmt(member(this(), "mu"), vec![touch("y")]),
            touch("x"),
        ]);
        assert_eq!(seen, vec!["mu []", "x [this.mu]", "mu []", "y [this.mu]", "x []"]);
        assert_eq!(exit, Some(HeldLockSet::new()));
    }

    #[test]
    fn catch_sees_only_locks_held_throughout_the_try() {
        let (seen, _) = walk(vec![
            try_stmt(
                vec![lock_call("lock"), touch("x")],
                vec![catch_clause("Exception", "e", vec![touch("y")])],
                None,
            ),
        ]);
        assert_eq!(seen, vec!["lock []", "x [this.lock]", "y []"]);
    }

    #[test]
    fn catch_releasing_the_lock_reaches_finally_and_the_exit() {
        let (seen, exit) = walk(vec![
            lock_call("lock"),
            try_stmt(
                vec![touch("x")],
                vec![catch_clause("Exception", "e", vec![lock_call("unlock")])],
                Some(vec![touch("y")]),
            ),
            touch("x"),
        ]);
        assert_eq!(
            seen,
            vec!["lock []", "x [this.lock]", "lock [this.lock]", "y []", "x []"]
        );
        assert_eq!(exit, Some(HeldLockSet::new()));
    }

    #[test]
    fn finally_is_checked_against_every_entry_and_applied_afterwards() {
        let (seen, exit) = walk(vec![
            lock_call("lock"),
            try_finally(vec![touch("x")], vec![touch("y"), lock_call("unlock")]),
            touch("x"),
        ]);
        assert_eq!(
            seen,
            vec!["lock []", "x [this.lock]", "y [this.lock]", "lock [this.lock]", "x []"]
        );
        assert_eq!(exit, Some(HeldLockSet::new()));

        let (seen, _) = walk(vec![try_finally(
            vec![lock_call("lock"), touch("x")],
            vec![touch("y")],
        )]);
        assert_eq!(seen.last().map(String::as_str), Some("y []"));
    }

    #[test]
    fn breaks_leaving_a_lock_block_release_it() {
        let (seen, _) = walk(vec![
            while_stmt(
                ident("c"),
                lock_stmt(ident("mu"), vec![if_stmt(ident("d"), break_stmt(), None)]),
            ),
            touch("x"),
        ]);
        assert_eq!(seen.last().map(String::as_str), Some("x []"));
    }

    #[test]
    fn switch_sections_start_from_the_discriminant_state() {
        let (seen, _) = walk(vec![
            lock_call("lock"),
            switch_stmt(
                ident("c"),
                vec![
                    case_section(vec![lock_call("unlock"), break_stmt()]),
                    case_section(vec![touch("x")]),
                ],
            ),
            touch("y"),
        ]);
        assert_eq!(seen, vec!["lock []", "lock [this.lock]", "x [this.lock]", "y []"]);
    }

    #[test]
    fn short_circuit_operands_join() {
        let (seen, _) = walk(vec![
            expr_stmt(binary(
                BinaryOp::LogicalAnd,
                ident("c"),
                assign(ident("d"), method_call(ident("lock"), "lock", vec![])),
            )),
            touch("x"),
        ]);
        assert_eq!(seen.last().map(String::as_str), Some("x []"));
    }
}
