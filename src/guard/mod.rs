//! Lock guard verification.
//!
//! Members annotated with `@GuardedBy("expr")` may only be read, written or
//! called while a lock equivalent to `expr` is provably held. The pipeline
//! parses annotation text ([`expr`]), binds it to the declaring scope
//! ([`resolve`]), canonicalises it ([`alias`]), indexes guarded members and
//! lock helper methods per type ([`index`]), computes held locks through each
//! method body ([`held`]) and reports accesses made without the lock
//! ([`checker`]).

pub mod alias;
mod check;
pub mod checker;
pub mod expr;
pub mod held;
pub mod index;
pub mod resolve;
pub mod scope;


use std::fmt;

pub use alias::{LockPath, LockRoot, LockStep, equivalent};
pub use check::GuardedByCheck;
pub use checker::GuardViolationChecker;
pub use expr::{LockExpression, MalformedLockExpression};
pub use held::{AccessVisitor, FlowState, GuardOptions, HeldLockSet, HeldLockWalker, MemberAccess};
pub use index::{
    GuardedEntity, GuardedEntityIndex, LockEffect, LockMethodBinding, LockMethodRegistry,
    MemberKind, MemberRef,
};
pub use resolve::{DeclScope, LockResolver, ResolveError, ResolvedLock};

use crate::diagnostics::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardErrorKind {
    MalformedLockExpression,
    UnresolvableLockExpression,
    StaticInstanceMismatch,
    GuardViolation,
}

impl GuardErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedLockExpression => "malformed-lock-expression",
            Self::UnresolvableLockExpression => "unresolvable-lock-expression",
            Self::StaticInstanceMismatch => "static-instance-mismatch",
            Self::GuardViolation => "guard-violation",
        }
    }
}

/// One problem found by the engine, attached to the member it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardFinding {
    pub kind: GuardErrorKind,
    pub message: String,
    pub span: Option<Span>,
    /// Type declaring the member the finding belongs to.
    pub owner: String,
    /// The annotated member for declaration findings, the enclosing method for violations.
    pub member: Option<String>,
    pub note: Option<String>,
}

impl fmt::Display for GuardFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)?;
        if let Some(span) = self.span {
            write!(f, " @ {span}")?;
        }
        if let Some(note) = &self.note {
            write!(f, " ({note})")?;
        }
        Ok(())
    }
}
