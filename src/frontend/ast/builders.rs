//! Terse constructors for expression and statement trees.
//!
//! Hosts that lower their own syntax into this model, and tests, use these to
//! avoid spelling out boxed node structs by hand.

use super::expressions::{
    BinaryOp, Block, CatchClause, ExprNode, Expression, ForStatement, ForeachStatement,
    IfStatement, Statement, StatementKind, SwitchSection, SwitchStatement, TryStatement, UnaryOp,
    VariableDeclaration,
};
use super::items::TypeExpr;

#[must_use]
pub fn this() -> Expression {
    Expression::new(ExprNode::This)
}

#[must_use]
pub fn ident(name: &str) -> Expression {
    Expression::new(ExprNode::Identifier(name.to_string()))
}

#[must_use]
pub fn literal(text: &str) -> Expression {
    Expression::new(ExprNode::Literal(text.to_string()))
}

#[must_use]
pub fn member(base: Expression, name: &str) -> Expression {
    Expression::new(ExprNode::Member {
        base: Box::new(base),
        member: name.to_string(),
    })
}

/// Bare call such as `lock()` with an implicit receiver.
#[must_use]
pub fn call(name: &str, args: Vec<Expression>) -> Expression {
    Expression::new(ExprNode::Call {
        callee: Box::new(ident(name)),
        args,
    })
}

/// Receiver call such as `foo.getLock()`.
#[must_use]
pub fn method_call(receiver: Expression, name: &str, args: Vec<Expression>) -> Expression {
    Expression::new(ExprNode::Call {
        callee: Box::new(member(receiver, name)),
        args,
    })
}

#[must_use]
pub fn assign(target: Expression, value: Expression) -> Expression {
    Expression::new(ExprNode::Assign {
        target: Box::new(target),
        value: Box::new(value),
    })
}

#[must_use]
pub fn unary(op: UnaryOp, expr: Expression) -> Expression {
    Expression::new(ExprNode::Unary {
        op,
        expr: Box::new(expr),
    })
}

#[must_use]
pub fn post_increment(expr: Expression) -> Expression {
    unary(UnaryOp::PostIncrement, expr)
}

#[must_use]
pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::new(ExprNode::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

#[must_use]
pub fn conditional(
    condition: Expression,
    then_branch: Expression,
    else_branch: Expression,
) -> Expression {
    Expression::new(ExprNode::Conditional {
        condition: Box::new(condition),
        then_branch: Box::new(then_branch),
        else_branch: Box::new(else_branch),
    })
}

#[must_use]
pub fn new_object(ty: &str, args: Vec<Expression>) -> Expression {
    Expression::new(ExprNode::New {
        ty: TypeExpr::named(ty),
        args,
    })
}

#[must_use]
pub fn block(statements: Vec<Statement>) -> Block {
    Block::new(statements)
}

#[must_use]
pub fn expr_stmt(expression: Expression) -> Statement {
    Statement::new(StatementKind::Expression(expression))
}

#[must_use]
pub fn block_stmt(statements: Vec<Statement>) -> Statement {
    Statement::new(StatementKind::Block(Block::new(statements)))
}

#[must_use]
pub fn declare(name: &str, ty: Option<&str>, initializer: Option<Expression>) -> Statement {
    Statement::new(StatementKind::VariableDeclaration(VariableDeclaration {
        name: name.to_string(),
        ty: ty.map(TypeExpr::named),
        initializer,
    }))
}

#[must_use]
pub fn return_stmt(expression: Option<Expression>) -> Statement {
    Statement::new(StatementKind::Return { expression })
}

#[must_use]
pub fn throw_stmt(expression: Option<Expression>) -> Statement {
    Statement::new(StatementKind::Throw { expression })
}

#[must_use]
pub fn break_stmt() -> Statement {
    Statement::new(StatementKind::Break)
}

#[must_use]
pub fn continue_stmt() -> Statement {
    Statement::new(StatementKind::Continue)
}

#[must_use]
pub fn if_stmt(
    condition: Expression,
    then_branch: Statement,
    else_branch: Option<Statement>,
) -> Statement {
    Statement::new(StatementKind::If(IfStatement {
        condition,
        then_branch: Box::new(then_branch),
        else_branch: else_branch.map(Box::new),
    }))
}

#[must_use]
pub fn while_stmt(condition: Expression, body: Statement) -> Statement {
    Statement::new(StatementKind::While {
        condition,
        body: Box::new(body),
    })
}

#[must_use]
pub fn do_while_stmt(body: Statement, condition: Expression) -> Statement {
    Statement::new(StatementKind::DoWhile {
        body: Box::new(body),
        condition,
    })
}

#[must_use]
pub fn for_stmt(
    initializer: Vec<Statement>,
    condition: Option<Expression>,
    iterator: Vec<Expression>,
    body: Statement,
) -> Statement {
    Statement::new(StatementKind::For(ForStatement {
        initializer,
        condition,
        iterator,
        body: Box::new(body),
    }))
}

#[must_use]
pub fn foreach_stmt(
    variable: &str,
    ty: Option<&str>,
    iterable: Expression,
    body: Statement,
) -> Statement {
    Statement::new(StatementKind::Foreach(ForeachStatement {
        variable: variable.to_string(),
        ty: ty.map(TypeExpr::named),
        iterable,
        body: Box::new(body),
    }))
}

#[must_use]
pub fn switch_stmt(expression: Expression, sections: Vec<SwitchSection>) -> Statement {
    Statement::new(StatementKind::Switch(SwitchStatement {
        expression,
        sections,
    }))
}

#[must_use]
pub fn case_section(statements: Vec<Statement>) -> SwitchSection {
    SwitchSection {
        is_default: false,
        statements,
    }
}

#[must_use]
pub fn default_section(statements: Vec<Statement>) -> SwitchSection {
    SwitchSection {
        is_default: true,
        statements,
    }
}

#[must_use]
pub fn try_stmt(
    body: Vec<Statement>,
    catches: Vec<CatchClause>,
    finally: Option<Vec<Statement>>,
) -> Statement {
    Statement::new(StatementKind::Try(TryStatement {
        body: Block::new(body),
        catches,
        finally: finally.map(Block::new),
    }))
}

#[must_use]
pub fn try_finally(body: Vec<Statement>, finally: Vec<Statement>) -> Statement {
    try_stmt(body, Vec::new(), Some(finally))
}

#[must_use]
pub fn catch_clause(ty: &str, identifier: &str, body: Vec<Statement>) -> CatchClause {
    CatchClause {
        type_annotation: Some(TypeExpr::named(ty)),
        identifier: Some(identifier.to_string()),
        body: Block::new(body),
    }
}

#[must_use]
pub fn lock_stmt(expression: Expression, body: Vec<Statement>) -> Statement {
    Statement::new(StatementKind::Lock {
        expression,
        body: Box::new(block_stmt(body)),
    })
}
