//! Syntax model supplied by the host compiler.

pub mod builders;
mod expressions;
mod items;

pub use expressions::{
    BinaryOp, Block, CatchClause, ExprNode, Expression, ForStatement, ForeachStatement,
    IfStatement, Statement, StatementKind, SwitchSection, SwitchStatement, TryStatement, UnaryOp,
    VariableDeclaration,
};
pub use items::{
    Attribute, AttributeArgument, CompilationUnit, FieldDecl, MethodDecl, MethodKind, Parameter,
    TypeDecl, TypeExpr,
};
