//! Type and member lookups over a compilation unit.
//!
//! Types are keyed by their simple name; nested types record the type that
//! encloses them so lookups can walk outwards the way name resolution does.

use std::collections::{HashMap, HashSet};

use super::ast::{CompilationUnit, FieldDecl, MethodDecl, TypeDecl};

#[derive(Debug, Clone, Copy)]
struct TypeEntry<'a> {
    decl: &'a TypeDecl,
    outer: Option<&'a str>,
}

/// A member found by a lookup, together with the type that declares it.
#[derive(Debug, Clone, Copy)]
pub struct MemberLookup<'a, T> {
    pub owner: &'a str,
    pub decl: &'a T,
    /// Enclosing type the member was reached through, when it is not on the
    /// queried type or its bases. `owner` may be a base of this type.
    pub via_outer: Option<&'a str>,
}

#[derive(Debug, Default)]
pub struct SymbolTable<'a> {
    order: Vec<&'a str>,
    types: HashMap<&'a str, TypeEntry<'a>>,
}

impl<'a> SymbolTable<'a> {
    #[must_use]
    pub fn build(unit: &'a CompilationUnit) -> Self {
        let mut table = Self::default();
        for decl in &unit.types {
            table.insert(decl, None);
        }
        table
    }

    fn insert(&mut self, decl: &'a TypeDecl, outer: Option<&'a str>) {
        if self.types.contains_key(decl.name.as_str()) {
            tracing::warn!(
                target: "lockguard::symbols",
                "duplicate type `{}` ignored; the first declaration wins",
                decl.name
            );
        } else {
            self.order.push(decl.name.as_str());
            self.types
                .insert(decl.name.as_str(), TypeEntry { decl, outer });
        }
        for nested in &decl.nested_types {
            self.insert(nested, Some(decl.name.as_str()));
        }
    }

    /// All types, outer types before their nested types, in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &'a TypeDecl> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.types.get(name).map(|entry| entry.decl))
    }

    #[must_use]
    pub fn type_decl(&self, name: &str) -> Option<&'a TypeDecl> {
        self.types.get(name).map(|entry| entry.decl)
    }

    #[must_use]
    pub fn contains_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Enclosing types of `name`, innermost first.
    #[must_use]
    pub fn outer_types(&self, name: &str) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut cursor = self.types.get(name).and_then(|entry| entry.outer);
        while let Some(outer) = cursor {
            if chain.contains(&outer) {
                break;
            }
            chain.push(outer);
            cursor = self.types.get(outer).and_then(|entry| entry.outer);
        }
        chain
    }

    /// `name` followed by its base types, stopping at unknown or cyclic bases.
    fn hierarchy(&self, name: &str) -> Vec<&'a TypeDecl> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.type_decl(name);
        while let Some(decl) = cursor {
            if !seen.insert(decl.name.as_str()) {
                break;
            }
            chain.push(decl);
            cursor = decl.base.as_deref().and_then(|base| self.type_decl(base));
        }
        chain
    }

    /// Field declared on `ty` or one of its base types.
    #[must_use]
    pub fn find_field(&self, ty: &str, name: &str) -> Option<MemberLookup<'a, FieldDecl>> {
        self.hierarchy(ty).into_iter().find_map(|decl| {
            decl.fields
                .iter()
                .find(|field| field.name == name)
                .map(|field| MemberLookup {
                    owner: decl.name.as_str(),
                    decl: field,
                    via_outer: None,
                })
        })
    }

    /// Method declared on `ty` or one of its base types with the given arity.
    #[must_use]
    pub fn find_method(
        &self,
        ty: &str,
        name: &str,
        arity: usize,
    ) -> Option<MemberLookup<'a, MethodDecl>> {
        self.hierarchy(ty).into_iter().find_map(|decl| {
            decl.methods
                .iter()
                .find(|method| method.name == name && method.arity() == arity)
                .map(|method| MemberLookup {
                    owner: decl.name.as_str(),
                    decl: method,
                    via_outer: None,
                })
        })
    }

    /// Field visible by simple name from inside `ty`: own and inherited first, then outer types.
    #[must_use]
    pub fn find_field_in_scope(&self, ty: &str, name: &str) -> Option<MemberLookup<'a, FieldDecl>> {
        self.find_field(ty, name).or_else(|| {
            self.outer_types(ty).into_iter().find_map(|outer| {
                self.find_field(outer, name).map(|found| MemberLookup {
                    via_outer: Some(outer),
                    ..found
                })
            })
        })
    }

    /// Method visible by simple name from inside `ty`: own and inherited first, then outer types.
    #[must_use]
    pub fn find_method_in_scope(
        &self,
        ty: &str,
        name: &str,
        arity: usize,
    ) -> Option<MemberLookup<'a, MethodDecl>> {
        self.find_method(ty, name, arity).or_else(|| {
            self.outer_types(ty).into_iter().find_map(|outer| {
                self.find_method(outer, name, arity).map(|found| MemberLookup {
                    via_outer: Some(outer),
                    ..found
                })
            })
        })
    }
}
