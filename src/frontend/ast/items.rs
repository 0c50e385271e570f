//! Declaration nodes: compilation units, types, members and attributes.

use std::path::PathBuf;

use super::expressions::Block;
use crate::diagnostics::Span;

/// One source file handed over by the host compiler.
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    pub path: PathBuf,
    pub types: Vec<TypeDecl>,
}

impl CompilationUnit {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, types: Vec<TypeDecl>) -> Self {
        Self {
            path: path.into(),
            types,
        }
    }
}

/// A named type reference. Generic arguments are not modelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub name: String,
}

impl TypeExpr {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeArgument {
    pub name: Option<String>,
    pub value: String,
    pub span: Option<Span>,
}

impl AttributeArgument {
    #[must_use]
    pub fn new(name: Option<String>, value: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            name,
            value: value.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub arguments: Vec<AttributeArgument>,
    pub span: Option<Span>,
}

impl Attribute {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        arguments: Vec<AttributeArgument>,
        span: Option<Span>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            span,
        }
    }

    /// Attribute with positional string arguments, e.g. `@GuardedBy("lock")`.
    #[must_use]
    pub fn with_values<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let arguments = values
            .into_iter()
            .map(|value| AttributeArgument::new(None, value, None))
            .collect();
        Self::new(name, arguments, None)
    }

    #[must_use]
    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.span = Some(Span::new(start, end));
        self
    }
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub base: Option<String>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub nested_types: Vec<TypeDecl>,
    pub attributes: Vec<Attribute>,
    pub span: Option<Span>,
}

impl TypeDecl {
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            fields: Vec::new(),
            methods: Vec::new(),
            nested_types: Vec::new(),
            attributes: Vec::new(),
            span: None,
        }
    }

    #[must_use]
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn nested(mut self, nested: TypeDecl) -> Self {
        self.nested_types.push(nested);
        self
    }

    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub is_static: bool,
    pub attributes: Vec<Attribute>,
    pub span: Option<Span>,
}

impl FieldDecl {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: TypeExpr::named(ty),
            is_static: false,
            attributes: Vec::new(),
            span: None,
        }
    }

    #[must_use]
    pub fn make_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    #[must_use]
    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.span = Some(Span::new(start, end));
        self
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Option<Span>,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: TypeExpr::named(ty),
            span: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Constructor,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub kind: MethodKind,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeExpr>,
    pub is_static: bool,
    pub attributes: Vec<Attribute>,
    pub body: Option<Block>,
    pub span: Option<Span>,
}

impl MethodDecl {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Method,
            parameters: Vec::new(),
            return_type: None,
            is_static: false,
            attributes: Vec::new(),
            body: None,
            span: None,
        }
    }

    #[must_use]
    pub fn constructor(owner: impl Into<String>) -> Self {
        Self {
            kind: MethodKind::Constructor,
            ..Self::new(owner)
        }
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.parameters.push(Parameter::new(name, ty));
        self
    }

    #[must_use]
    pub fn returns(mut self, ty: impl Into<String>) -> Self {
        self.return_type = Some(TypeExpr::named(ty));
        self
    }

    #[must_use]
    pub fn make_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    #[must_use]
    pub fn body(mut self, body: Block) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.span = Some(Span::new(start, end));
        self
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    #[must_use]
    pub fn is_constructor(&self) -> bool {
        matches!(self.kind, MethodKind::Constructor)
    }
}
