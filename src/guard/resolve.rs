//! Binding lock expressions to the scope of the declaration that carries them.
//!
//! A bare identifier is looked up as a parameter of the declaring method
//! first, then as a field of the declaring type (own, inherited, enclosing),
//! and finally as a type name. Parameters shadow fields.

use std::fmt;

use super::alias::{LockPath, LockRoot};
use super::expr::{LockExpression, MalformedLockExpression};
use crate::frontend::SymbolTable;
use crate::frontend::ast::Parameter;

/// Scope a lock expression is resolved against: the guarded or annotated member.
#[derive(Debug, Clone, Copy)]
pub struct DeclScope<'a> {
    pub owner: &'a str,
    pub parameters: &'a [Parameter],
    pub is_static: bool,
}

impl<'a> DeclScope<'a> {
    #[must_use]
    pub fn field(owner: &'a str, is_static: bool) -> Self {
        Self {
            owner,
            parameters: &[],
            is_static,
        }
    }

    #[must_use]
    pub fn method(owner: &'a str, parameters: &'a [Parameter], is_static: bool) -> Self {
        Self {
            owner,
            parameters,
            is_static,
        }
    }
}

/// A lock expression bound to its declaring scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLock {
    pub expression: LockExpression,
    /// Annotation text as written, used in diagnostics.
    pub text: String,
    pub path: LockPath,
    pub owner: String,
    /// Reachable without an instance of `owner`.
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    Malformed(MalformedLockExpression),
    Unresolvable { text: String, detail: String },
    StaticInstanceMismatch { text: String },
}

impl ResolveError {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Malformed(err) => &err.text,
            Self::Unresolvable { text, .. } | Self::StaticInstanceMismatch { text } => text,
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "{err}"),
            Self::Unresolvable { text, detail } => {
                write!(f, "unresolvable lock expression '{text}': {detail}")
            }
            Self::StaticInstanceMismatch { text } => {
                write!(f, "static member guarded by instance lock '{text}'")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

#[derive(Debug, Clone)]
struct Bound {
    path: LockPath,
    /// Static type of the bound node, when known.
    ty: Option<String>,
}

pub struct LockResolver<'s, 'a> {
    symbols: &'s SymbolTable<'a>,
}

impl<'s, 'a> LockResolver<'s, 'a> {
    #[must_use]
    pub fn new(symbols: &'s SymbolTable<'a>) -> Self {
        Self { symbols }
    }

    /// Parse and resolve `text` relative to `scope`.
    ///
    /// # Errors
    ///
    /// Fails when the text does not parse, when any element of the chain has no
    /// matching declaration, or when a static scope is guarded by a lock that
    /// needs an instance.
    pub fn resolve(&self, text: &str, scope: &DeclScope<'_>) -> Result<ResolvedLock, ResolveError> {
        let expression = LockExpression::parse(text).map_err(ResolveError::Malformed)?;
        let unresolvable = |detail: String| ResolveError::Unresolvable {
            text: text.to_string(),
            detail,
        };
        let bound = self.bind(&expression, scope).map_err(unresolvable)?;
        if bound.path.is_bare_static() {
            return Err(ResolveError::Unresolvable {
                text: text.to_string(),
                detail: "a type name is not a lock".into(),
            });
        }

        let is_static = match &bound.path.root {
            LockRoot::Static(_) => true,
            LockRoot::Parameter { .. } => scope.is_static,
            LockRoot::This | LockRoot::Outer(_) | LockRoot::Variable(_) => false,
        };
        if scope.is_static && !is_static {
            return Err(ResolveError::StaticInstanceMismatch {
                text: text.to_string(),
            });
        }
        tracing::trace!(
            target: "lockguard::resolve",
            owner = scope.owner,
            text,
            path = %bound.path,
            is_static,
            "resolved lock expression"
        );
        Ok(ResolvedLock {
            expression,
            text: text.to_string(),
            path: bound.path,
            owner: scope.owner.to_string(),
            is_static,
        })
    }

    fn bind(&self, expr: &LockExpression, scope: &DeclScope<'_>) -> Result<Bound, String> {
        match expr {
            LockExpression::ThisReference => Ok(Bound {
                path: LockPath::this(),
                ty: Some(scope.owner.to_string()),
            }),
            LockExpression::Identifier(name) => self.bind_identifier(name, scope),
            LockExpression::Invocation { base: None, method } => {
                let found = self
                    .symbols
                    .find_method_in_scope(scope.owner, method, 0)
                    .ok_or_else(|| format!("no zero-argument method `{method}` in scope"))?;
                let path = if found.decl.is_static {
                    LockPath::of_static(found.owner).call(method)
                } else if let Some(outer) = found.via_outer {
                    LockPath::new(LockRoot::Outer(outer.to_string())).call(method)
                } else {
                    LockPath::this().call(method)
                };
                Ok(Bound {
                    path,
                    ty: found.decl.return_type.as_ref().map(|ty| ty.name.clone()),
                })
            }
            LockExpression::Invocation {
                base: Some(base),
                method,
            } => {
                let base = self.bind(base, scope)?;
                let ty = base
                    .ty
                    .as_deref()
                    .ok_or_else(|| format!("cannot look up `{method}()` on `{}`", base.path))?;
                let found = self
                    .symbols
                    .find_method(ty, method, 0)
                    .ok_or_else(|| format!("`{ty}` has no zero-argument method `{method}`"))?;
                let path = if found.decl.is_static {
                    LockPath::of_static(found.owner).call(method)
                } else if base.path.is_bare_static() {
                    return Err(format!("`{method}()` is an instance method of `{ty}`"));
                } else {
                    base.path.call(method)
                };
                Ok(Bound {
                    path,
                    ty: found.decl.return_type.as_ref().map(|ty| ty.name.clone()),
                })
            }
            LockExpression::Select { base, member } => {
                let base = self.bind(base, scope)?;
                let ty = base
                    .ty
                    .as_deref()
                    .ok_or_else(|| format!("cannot look up `{member}` on `{}`", base.path))?;
                let found = self
                    .symbols
                    .find_field(ty, member)
                    .ok_or_else(|| format!("`{ty}` has no field `{member}`"))?;
                let path = if found.decl.is_static {
                    LockPath::of_static(found.owner).field(member)
                } else if base.path.is_bare_static() {
                    return Err(format!("`{member}` is an instance field of `{ty}`"));
                } else {
                    base.path.field(member)
                };
                Ok(Bound {
                    path,
                    ty: Some(found.decl.ty.name.clone()),
                })
            }
        }
    }

    fn bind_identifier(&self, name: &str, scope: &DeclScope<'_>) -> Result<Bound, String> {
        if let Some((index, param)) = scope
            .parameters
            .iter()
            .enumerate()
            .find(|(_, param)| param.name == name)
        {
            return Ok(Bound {
                path: LockPath::new(LockRoot::Parameter {
                    index,
                    name: name.to_string(),
                }),
                ty: Some(param.ty.name.clone()),
            });
        }
        if let Some(found) = self.symbols.find_field_in_scope(scope.owner, name) {
            let path = if found.decl.is_static {
                LockPath::of_static(found.owner)
            } else if let Some(outer) = found.via_outer {
                LockPath::new(LockRoot::Outer(outer.to_string()))
            } else {
                LockPath::this()
            };
            return Ok(Bound {
                path: path.field(name),
                ty: Some(found.decl.ty.name.clone()),
            });
        }
        if self.symbols.contains_type(name) {
            return Ok(Bound {
                path: LockPath::of_static(name),
                ty: Some(name.to_string()),
            });
        }
        Err(format!("`{name}` is not a parameter, field or type in scope"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{CompilationUnit, FieldDecl, MethodDecl, Parameter, TypeDecl};

    fn unit() -> CompilationUnit {
        CompilationUnit::new(
            "threadsafety/Test.java",
            vec![
                TypeDecl::class("IndirectFoo")
                    .field(FieldDecl::new("lock", "Lock"))
                    .method(MethodDecl::new("getLock").returns("Lock")),
                TypeDecl::class("Foo")
                    .field(FieldDecl::new("indirectFoo", "IndirectFoo"))
                    .field(FieldDecl::new("lock", "Lock"))
                    .method(MethodDecl::new("getIndirectFoo").returns("IndirectFoo")),
                TypeDecl::class("Base").field(FieldDecl::new("baseLock", "Lock")),
                TypeDecl::class("Utils")
                    .extends("Base")
                    .field(FieldDecl::new("LOCK", "Object").make_static())
                    .field(FieldDecl::new("foo", "Lock"))
                    .method(MethodDecl::new("getLock").returns("Lock"))
                    .method(MethodDecl::new("staticLock").returns("Lock").make_static())
                    .nested(TypeDecl::class("Inner").field(FieldDecl::new("x", "int"))),
            ],
        )
    }

    fn resolve(text: &str, scope: DeclScope<'_>) -> Result<ResolvedLock, ResolveError> {
        let unit = unit();
        let symbols = SymbolTable::build(&unit);
        LockResolver::new(&symbols).resolve(text, &scope)
    }

    #[test]
    fn static_method_parameter_chains_resolve() {
        let params = [Parameter::new("foo", "Foo")];
        let scope = DeclScope::method("Utils", &params, true);
        for (text, expected) in [
            ("foo.lock", "foo.lock"),
            ("foo.indirectFoo.getLock()", "foo.indirectFoo.getLock()"),
            ("foo.getIndirectFoo().getLock()", "foo.getIndirectFoo().getLock()"),
            ("foo.getIndirectFoo().lock", "foo.getIndirectFoo().lock"),
        ] {
            let resolved = resolve(text, scope).unwrap();
            assert!(resolved.is_static, "{text}");
            assert_eq!(resolved.path.to_string(), expected);
            assert_eq!(resolved.text, text);
        }
    }

    #[test]
    fn parameters_shadow_fields() {
        let params = [Parameter::new("foo", "Lock")];
        let resolved = resolve("foo", DeclScope::method("Utils", &params, true)).unwrap();
        assert_eq!(
            resolved.path.root,
            LockRoot::Parameter {
                index: 0,
                name: "foo".into()
            }
        );
        let field = resolve("foo", DeclScope::method("Utils", &[], false)).unwrap();
        assert_eq!(field.path, LockPath::this().field("foo"));
        assert!(!field.is_static);
    }

    #[test]
    fn implicit_and_explicit_this_share_a_path() {
        let scope = DeclScope::field("Utils", false);
        let implicit = resolve("foo", scope).unwrap();
        let explicit = resolve("this.foo", scope).unwrap();
        assert_eq!(implicit.path, explicit.path);
        let call = resolve("getLock()", scope).unwrap();
        let explicit_call = resolve("this.getLock()", scope).unwrap();
        assert_eq!(call.path, explicit_call.path);
    }

    #[test]
    fn static_members_restart_at_their_declaring_type() {
        let scope = DeclScope::field("Utils", true);
        assert_eq!(
            resolve("LOCK", scope).unwrap().path,
            LockPath::of_static("Utils").field("LOCK")
        );
        assert_eq!(
            resolve("Utils.LOCK", scope).unwrap().path,
            LockPath::of_static("Utils").field("LOCK")
        );
        assert_eq!(
            resolve("staticLock()", scope).unwrap().path,
            LockPath::of_static("Utils").call("staticLock")
        );
    }

    #[test]
    fn static_scope_rejects_instance_roots() {
        let scope = DeclScope::method("Utils", &[], true);
        for text in ["getLock()", "this", "foo", "this.foo"] {
            let err = resolve(text, scope).unwrap_err();
            assert_eq!(
                err,
                ResolveError::StaticInstanceMismatch { text: text.into() },
                "{text}"
            );
        }
    }

    #[test]
    fn nested_types_see_outer_fields() {
        let resolved = resolve("foo", DeclScope::field("Inner", false)).unwrap();
        assert_eq!(
            resolved.path,
            LockPath::new(LockRoot::Outer("Utils".into())).field("foo")
        );
        assert_eq!(
            resolve("LOCK", DeclScope::field("Inner", true)).unwrap().path,
            LockPath::of_static("Utils").field("LOCK")
        );
    }

    #[test]
    fn inherited_outer_fields_root_at_the_enclosing_type() {
        let resolved = resolve("baseLock", DeclScope::field("Inner", false)).unwrap();
        assert_eq!(
            resolved.path,
            LockPath::new(LockRoot::Outer("Utils".into())).field("baseLock")
        );
        assert_eq!(
            resolve("baseLock", DeclScope::field("Utils", false)).unwrap().path,
            LockPath::this().field("baseLock")
        );
    }

    #[test]
    fn unknown_names_and_members_are_unresolvable() {
        let scope = DeclScope::field("Utils", false);
        let texts = [
            "missing",
            "foo.missing",
            "getLock().missing",
            "Utils",
            "Utils.foo",
            "Utils.getLock()",
            "missing()",
        ];
        for text in texts {
            match resolve(text, scope) {
                Err(ResolveError::Unresolvable { text: reported, .. }) => {
                    assert_eq!(reported, text);
                }
                other => panic!("{text}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_text_is_reported_as_such() {
        let err = resolve("foo.", DeclScope::field("Utils", false)).unwrap_err();
        assert!(matches!(err, ResolveError::Malformed(_)));
        assert_eq!(err.text(), "foo.");
    }
}
