//! Canonical lock paths and alias equivalence.
//!
//! Two locks are the same lock exactly when their canonical paths are equal.
//! Resolution already folds implicit and explicit `this` into one root and
//! restarts chains at static members, so no further normalisation is needed
//! here. Distinct roots are never equated, even if they could hold the same
//! object at runtime.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockRoot {
    /// Receiver of the member being analysed or declared.
    This,
    /// Instance of an enclosing type, reached from a nested type.
    Outer(String),
    /// Parameter of the declaring method, matched positionally at call sites.
    Parameter { index: usize, name: String },
    /// Parameter or local of the method body under analysis.
    Variable(String),
    /// Class-level root, reachable without an instance.
    Static(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockStep {
    Field(String),
    Call(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockPath {
    pub root: LockRoot,
    pub steps: Vec<LockStep>,
}

impl LockPath {
    #[must_use]
    pub fn new(root: LockRoot) -> Self {
        Self {
            root,
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn this() -> Self {
        Self::new(LockRoot::This)
    }

    #[must_use]
    pub fn variable(name: &str) -> Self {
        Self::new(LockRoot::Variable(name.to_string()))
    }

    #[must_use]
    pub fn of_static(owner: &str) -> Self {
        Self::new(LockRoot::Static(owner.to_string()))
    }

    #[must_use]
    pub fn field(mut self, name: &str) -> Self {
        self.steps.push(LockStep::Field(name.to_string()));
        self
    }

    #[must_use]
    pub fn call(mut self, name: &str) -> Self {
        self.steps.push(LockStep::Call(name.to_string()));
        self
    }

    #[must_use]
    pub fn is_bare_static(&self) -> bool {
        matches!(self.root, LockRoot::Static(_)) && self.steps.is_empty()
    }

    /// Whether `self` is `prefix` or reached through it (`a.lock` extends `a`).
    #[must_use]
    pub fn extends(&self, prefix: &LockPath) -> bool {
        self.root == prefix.root && self.steps.starts_with(&prefix.steps)
    }

    /// Rebase a declaration-relative path onto a concrete access site.
    ///
    /// `This` is replaced by the receiver path and `Parameter { index }` by the
    /// path of the argument at `index`. Returns `None` when the needed receiver
    /// or argument has no canonical path.
    #[must_use]
    pub fn instantiate(
        &self,
        receiver: Option<&LockPath>,
        args: &[Option<LockPath>],
    ) -> Option<LockPath> {
        let base = match &self.root {
            LockRoot::This => receiver?.clone(),
            LockRoot::Parameter { index, .. } => args.get(*index)?.clone()?,
            LockRoot::Outer(_) | LockRoot::Variable(_) | LockRoot::Static(_) => {
                return Some(self.clone());
            }
        };
        let mut steps = base.steps;
        steps.extend(self.steps.iter().cloned());
        Some(LockPath {
            root: base.root,
            steps,
        })
    }
}

impl fmt::Display for LockPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            LockRoot::This => f.write_str("this")?,
            LockRoot::Outer(owner) => write!(f, "{owner}.this")?,
            LockRoot::Parameter { name, .. } | LockRoot::Variable(name) => f.write_str(name)?,
            LockRoot::Static(owner) => f.write_str(owner)?,
        }
        for step in &self.steps {
            match step {
                LockStep::Field(name) => write!(f, ".{name}")?,
                LockStep::Call(name) => write!(f, ".{name}()")?,
            }
        }
        Ok(())
    }
}

/// Whether `a` and `b` denote the same lock.
#[must_use]
pub fn equivalent(a: &LockPath, b: &LockPath) -> bool {
    a == b
}
