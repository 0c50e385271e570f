//! AST expression and statement nodes.

use super::items::TypeExpr;
use crate::diagnostics::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Gt,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    /// Short-circuiting operators evaluate their right operand conditionally.
    #[must_use]
    pub fn short_circuits(self) -> bool {
        matches!(self, Self::LogicalAnd | Self::LogicalOr)
    }
}

/// Expression node with span metadata.
#[derive(Debug, Clone)]
pub struct Expression {
    pub node: ExprNode,
    pub span: Option<Span>,
}

impl Expression {
    #[must_use]
    pub fn new(node: ExprNode) -> Self {
        Self { node, span: None }
    }

    #[must_use]
    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.span = Some(Span::new(start, end));
        self
    }
}

#[derive(Debug, Clone)]
pub enum ExprNode {
    Literal(String),
    This,
    Identifier(String),
    Member {
        base: Box<Expression>,
        member: String,
    },
    /// `callee` is an `Identifier` for bare calls or a `Member` for receiver calls.
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
    Assign {
        target: Box<Expression>,
        value: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Conditional {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
    New {
        ty: TypeExpr,
        args: Vec<Expression>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Option<Span>,
}

impl Block {
    #[must_use]
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            statements,
            span: None,
        }
    }
}

/// Statement node with span metadata.
#[derive(Debug, Clone)]
pub struct Statement {
    pub span: Option<Span>,
    pub kind: StatementKind,
}

impl Statement {
    #[must_use]
    pub fn new(kind: StatementKind) -> Self {
        Self { span: None, kind }
    }

    #[must_use]
    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.span = Some(Span::new(start, end));
        self
    }
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Block(Block),
    Empty,
    VariableDeclaration(VariableDeclaration),
    Expression(Expression),
    Return { expression: Option<Expression> },
    Throw { expression: Option<Expression> },
    Break,
    Continue,
    If(IfStatement),
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    DoWhile {
        body: Box<Statement>,
        condition: Expression,
    },
    For(ForStatement),
    Foreach(ForeachStatement),
    Switch(SwitchStatement),
    Try(TryStatement),
    /// Block-scoped mutual exclusion on `expression`.
    Lock {
        expression: Expression,
        body: Box<Statement>,
    },
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<Statement>>,
}

#[derive(Debug, Clone)]
pub struct ForStatement {
    pub initializer: Vec<Statement>,
    pub condition: Option<Expression>,
    pub iterator: Vec<Expression>,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone)]
pub struct ForeachStatement {
    pub variable: String,
    pub ty: Option<TypeExpr>,
    pub iterable: Expression,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone)]
pub struct SwitchStatement {
    pub expression: Expression,
    pub sections: Vec<SwitchSection>,
}

#[derive(Debug, Clone)]
pub struct SwitchSection {
    pub is_default: bool,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct TryStatement {
    pub body: Block,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub type_annotation: Option<TypeExpr>,
    pub identifier: Option<String>,
    pub body: Block,
}
