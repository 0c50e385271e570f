//! Name binding inside a method body under analysis.
//!
//! Locals and parameters become `Variable` roots, members reached through
//! them extend the path, and static members restart at their declaring type.
//! Anything that cannot be named as a path (calls with arguments, `new`,
//! literals, arithmetic) has no path.

use super::alias::{LockPath, LockRoot};
use crate::frontend::SymbolTable;
use crate::frontend::ast::{ExprNode, Expression, FieldDecl, MethodDecl, TypeExpr};

/// Canonical path and static type of an expression, where known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Place {
    pub path: Option<LockPath>,
    pub ty: Option<String>,
}

/// A member referenced from the body, with the receiver it was reached through.
#[derive(Debug, Clone)]
pub struct MemberSite<'a, T> {
    pub owner: &'a str,
    pub decl: &'a T,
    /// `None` for static members and receivers without a path.
    pub receiver: Option<LockPath>,
}

#[derive(Debug, Clone)]
struct Local {
    name: String,
    ty: Option<String>,
}

pub struct BodyScope<'s, 'a> {
    symbols: &'s SymbolTable<'a>,
    owner: &'a str,
    frames: Vec<Vec<Local>>,
}

impl<'s, 'a> BodyScope<'s, 'a> {
    #[must_use]
    pub fn new(symbols: &'s SymbolTable<'a>, owner: &'a str, method: &MethodDecl) -> Self {
        let params = method
            .parameters
            .iter()
            .map(|param| Local {
                name: param.name.clone(),
                ty: Some(param.ty.name.clone()),
            })
            .collect();
        Self {
            symbols,
            owner,
            frames: vec![params],
        }
    }

    #[must_use]
    pub fn owner(&self) -> &'a str {
        self.owner
    }

    pub fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Declare a local; without a written type the initializer's type is used.
    pub fn declare(&mut self, name: &str, ty: Option<&TypeExpr>, initializer: Option<&Expression>) {
        let ty = match ty {
            Some(ty) => Some(ty.name.clone()),
            None => initializer.and_then(|init| self.place(init).ty),
        };
        if let Some(frame) = self.frames.last_mut() {
            frame.push(Local {
                name: name.to_string(),
                ty,
            });
        }
    }

    fn local(&self, name: &str) -> Option<&Local> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|local| local.name == name)
    }

    #[must_use]
    pub fn is_local(&self, name: &str) -> bool {
        self.local(name).is_some()
    }

    /// Field named `name`, either bare (`x`) or selected from `base` (`base.x`).
    #[must_use]
    pub fn field_site(
        &self,
        base: Option<&Expression>,
        name: &str,
    ) -> Option<MemberSite<'a, FieldDecl>> {
        match base {
            None => {
                if self.is_local(name) {
                    return None;
                }
                let found = self.symbols.find_field_in_scope(self.owner, name)?;
                let receiver = implicit_receiver(found.decl.is_static, found.via_outer);
                Some(MemberSite {
                    owner: found.owner,
                    decl: found.decl,
                    receiver,
                })
            }
            Some(base) => {
                let place = self.place(base);
                let found = self.symbols.find_field(place.ty.as_deref()?, name)?;
                Some(MemberSite {
                    owner: found.owner,
                    decl: found.decl,
                    receiver: explicit_receiver(found.decl.is_static, place.path),
                })
            }
        }
    }

    /// Method named `name` taking `arity` arguments, called bare or on `base`.
    #[must_use]
    pub fn method_site(
        &self,
        base: Option<&Expression>,
        name: &str,
        arity: usize,
    ) -> Option<MemberSite<'a, MethodDecl>> {
        match base {
            None => {
                let found = self.symbols.find_method_in_scope(self.owner, name, arity)?;
                let receiver = implicit_receiver(found.decl.is_static, found.via_outer);
                Some(MemberSite {
                    owner: found.owner,
                    decl: found.decl,
                    receiver,
                })
            }
            Some(base) => {
                let place = self.place(base);
                let found = self
                    .symbols
                    .find_method(place.ty.as_deref()?, name, arity)?;
                Some(MemberSite {
                    owner: found.owner,
                    decl: found.decl,
                    receiver: explicit_receiver(found.decl.is_static, place.path),
                })
            }
        }
    }

    /// Path and type of `expr` at this point of the body.
    #[must_use]
    pub fn place(&self, expr: &Expression) -> Place {
        match &expr.node {
            ExprNode::This => Place {
                path: Some(LockPath::this()),
                ty: Some(self.owner.to_string()),
            },
            ExprNode::Identifier(name) => {
                if let Some(local) = self.local(name) {
                    return Place {
                        path: Some(LockPath::variable(name)),
                        ty: local.ty.clone(),
                    };
                }
                if let Some(site) = self.field_site(None, name) {
                    return Place {
                        path: member_path(&site, name, LockPath::field),
                        ty: Some(site.decl.ty.name.clone()),
                    };
                }
                if self.symbols.contains_type(name) {
                    return Place {
                        path: Some(LockPath::of_static(name)),
                        ty: Some(name.clone()),
                    };
                }
                Place::default()
            }
            ExprNode::Member { base, member } => {
                match self.field_site(Some(base.as_ref()), member) {
                    Some(site) => Place {
                        path: member_path(&site, member, LockPath::field),
                        ty: Some(site.decl.ty.name.clone()),
                    },
                    None => Place::default(),
                }
            }
            ExprNode::Call { callee, args } => {
                let Some((base, name)) = split_callee(callee) else {
                    return Place::default();
                };
                let Some(site) = self.method_site(base, name, args.len()) else {
                    return Place::default();
                };
                let ty = site.decl.return_type.as_ref().map(|ty| ty.name.clone());
                // Calls with arguments can return anything; only getters name a lock.
                let path = if args.is_empty() {
                    member_path(&site, name, LockPath::call)
                } else {
                    None
                };
                Place { path, ty }
            }
            ExprNode::New { ty, .. } => Place {
                path: None,
                ty: Some(ty.name.clone()),
            },
            ExprNode::Assign { value, .. } => Place {
                path: None,
                ty: self.place(value).ty,
            },
            ExprNode::Literal(_)
            | ExprNode::Unary { .. }
            | ExprNode::Binary { .. }
            | ExprNode::Conditional { .. } => Place::default(),
        }
    }
}

/// Splits a call target into its optional receiver and method name.
#[must_use]
pub fn split_callee(callee: &Expression) -> Option<(Option<&Expression>, &str)> {
    match &callee.node {
        ExprNode::Identifier(name) => Some((None, name.as_str())),
        ExprNode::Member { base, member } => Some((Some(base.as_ref()), member.as_str())),
        _ => None,
    }
}

trait StaticMember {
    fn is_static(&self) -> bool;
}

impl StaticMember for FieldDecl {
    fn is_static(&self) -> bool {
        self.is_static
    }
}

impl StaticMember for MethodDecl {
    fn is_static(&self) -> bool {
        self.is_static
    }
}

fn member_path<T: StaticMember>(
    site: &MemberSite<'_, T>,
    name: &str,
    step: fn(LockPath, &str) -> LockPath,
) -> Option<LockPath> {
    if site.decl.is_static() {
        Some(step(LockPath::of_static(site.owner), name))
    } else {
        site.receiver.clone().map(|receiver| step(receiver, name))
    }
}

/// Bare member names reach either `this` or the enclosing instance they were found through.
fn implicit_receiver(is_static: bool, via_outer: Option<&str>) -> Option<LockPath> {
    match via_outer {
        _ if is_static => None,
        Some(outer) => Some(LockPath::new(LockRoot::Outer(outer.to_string()))),
        None => Some(LockPath::this()),
    }
}

fn explicit_receiver(is_static: bool, base: Option<LockPath>) -> Option<LockPath> {
    if is_static {
        return None;
    }
    // An instance member reached through a bare type name has no receiver.
    base.filter(|path| !path.is_bare_static())
}
