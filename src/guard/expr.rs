//! Lock expression syntax: `this`, `lock`, `foo.lock`, `foo.getLock()`, `getLock()`.

use std::error::Error as StdError;
use std::fmt;

/// Parsed, unresolved lock expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockExpression {
    ThisReference,
    Identifier(String),
    Select {
        base: Box<LockExpression>,
        member: String,
    },
    /// Zero-argument call; `base` is `None` for a bare `getLock()`.
    Invocation {
        base: Option<Box<LockExpression>>,
        method: String,
    },
}

impl LockExpression {
    /// Parse annotation text into a lock expression.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedLockExpression`] for empty input, illegal characters,
    /// unbalanced or non-empty argument lists, and dangling `.` separators.
    pub fn parse(text: &str) -> Result<Self, MalformedLockExpression> {
        let tokens = tokenize(text)?;
        Parser {
            text,
            tokens: &tokens,
            pos: 0,
        }
        .parse()
    }

    /// The left-most node of a select/invocation chain.
    #[must_use]
    pub fn root(&self) -> &LockExpression {
        match self {
            Self::Select { base, .. } => base.root(),
            Self::Invocation {
                base: Some(base), ..
            } => base.root(),
            other => other,
        }
    }
}

impl fmt::Display for LockExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThisReference => f.write_str("this"),
            Self::Identifier(name) => f.write_str(name),
            Self::Select { base, member } => write!(f, "{base}.{member}"),
            Self::Invocation { base: None, method } => write!(f, "{method}()"),
            Self::Invocation {
                base: Some(base),
                method,
            } => write!(f, "{base}.{method}()"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLockExpression {
    pub text: String,
    pub reason: String,
}

impl MalformedLockExpression {
    fn new(text: &str, reason: impl Into<String>) -> Self {
        Self {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MalformedLockExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed lock expression '{}': {}", self.text, self.reason)
    }
}

impl StdError for MalformedLockExpression {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    This,
    Dot,
    OpenParen,
    CloseParen,
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

fn tokenize(text: &str) -> Result<Vec<Token>, MalformedLockExpression> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            '.' => tokens.push(Token::Dot),
            '(' => tokens.push(Token::OpenParen),
            ')' => tokens.push(Token::CloseParen),
            c if is_ident_start(c) => {
                let mut end = start + c.len_utf8();
                while let Some(&(idx, next)) = chars.peek() {
                    if !is_ident_continue(next) {
                        break;
                    }
                    end = idx + next.len_utf8();
                    chars.next();
                }
                let word = &text[start..end];
                tokens.push(if word == "this" {
                    Token::This
                } else {
                    Token::Ident(word.to_string())
                });
            }
            other => {
                return Err(MalformedLockExpression::new(
                    text,
                    format!("unexpected character `{other}` at offset {start}"),
                ));
            }
        }
    }
    if tokens.is_empty() {
        return Err(MalformedLockExpression::new(text, "empty lock expression"));
    }
    Ok(tokens)
}

struct Parser<'t> {
    text: &'t str,
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn error(&self, reason: impl Into<String>) -> MalformedLockExpression {
        MalformedLockExpression::new(self.text, reason)
    }

    fn peek(&self) -> Option<&'t Token> {
        let tokens = self.tokens;
        tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'t Token> {
        let tokens = self.tokens;
        let token = tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn parse(mut self) -> Result<LockExpression, MalformedLockExpression> {
        let mut expr = match self.bump().cloned() {
            Some(Token::This) => {
                if self.peek() == Some(&Token::OpenParen) {
                    return Err(self.error("`this` cannot be invoked"));
                }
                LockExpression::ThisReference
            }
            Some(Token::Ident(name)) => {
                if self.eat_call_parens()? {
                    LockExpression::Invocation {
                        base: None,
                        method: name,
                    }
                } else {
                    LockExpression::Identifier(name)
                }
            }
            Some(_) | None => return Err(self.error("expected an identifier or `this`")),
        };

        while let Some(token) = self.bump().cloned() {
            if token != Token::Dot {
                return Err(self.error("expected `.` between chain elements"));
            }
            let name = match self.bump().cloned() {
                Some(Token::Ident(name)) => name,
                Some(Token::This) => return Err(self.error("`this` is not a member name")),
                _ => return Err(self.error("expected a member name after `.`")),
            };
            expr = if self.eat_call_parens()? {
                LockExpression::Invocation {
                    base: Some(Box::new(expr)),
                    method: name,
                }
            } else {
                LockExpression::Select {
                    base: Box::new(expr),
                    member: name,
                }
            };
        }
        Ok(expr)
    }

    /// Consumes `()` when present; only zero-argument calls are accepted.
    fn eat_call_parens(&mut self) -> Result<bool, MalformedLockExpression> {
        if self.peek() != Some(&Token::OpenParen) {
            return Ok(false);
        }
        self.pos += 1;
        match self.bump() {
            Some(Token::CloseParen) => Ok(true),
            Some(_) => Err(self.error("lock methods take no arguments")),
            None => Err(self.error("unbalanced parentheses")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> LockExpression {
        LockExpression::Identifier(name.to_string())
    }

    #[test]
    fn parses_chains_left_to_right() {
        let parsed = LockExpression::parse("foo.indirectFoo.getLock()").unwrap();
        assert_eq!(
            parsed,
            LockExpression::Invocation {
                base: Some(Box::new(LockExpression::Select {
                    base: Box::new(ident("foo")),
                    member: "indirectFoo".into(),
                })),
                method: "getLock".into(),
            }
        );
        assert_eq!(parsed.root(), &ident("foo"));
    }

    #[test]
    fn parses_this_and_bare_invocations() {
        assert_eq!(
            LockExpression::parse("this").unwrap(),
            LockExpression::ThisReference
        );
        assert_eq!(
            LockExpression::parse(" getLock ( ) ").unwrap(),
            LockExpression::Invocation {
                base: None,
                method: "getLock".into()
            }
        );
        assert_eq!(
            LockExpression::parse("this.lock").unwrap(),
            LockExpression::Select {
                base: Box::new(LockExpression::ThisReference),
                member: "lock".into()
            }
        );
    }

    #[test]
    fn rejects_malformed_text() {
        for text in [
            "",
            "   ",
            "foo.",
            ".foo",
            "foo..bar",
            "getLock(",
            "getLock)",
            "getLock(x)",
            "foo bar",
            "foo-bar",
            "foo.this",
            "this()",
            "lock[0]",
        ] {
            let err = LockExpression::parse(text).unwrap_err();
            assert_eq!(err.text, text);
        }
    }

    #[test]
    fn rendering_round_trips() {
        for text in [
            "this",
            "lock",
            "this.lock",
            "getLock()",
            "this.getLock()",
            "foo.indirectFoo.getLock()",
            "foo.getIndirectFoo().lock",
            "Outer.LOCK",
            "$lock_1",
        ] {
            let parsed = LockExpression::parse(text).unwrap();
            let rendered = parsed.to_string();
            assert_eq!(rendered, text);
            assert_eq!(LockExpression::parse(&rendered).unwrap(), parsed);
        }
    }

    #[test]
    fn error_messages_name_the_problem() {
        let err = LockExpression::parse("getLock(x)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed lock expression 'getLock(x)': lock methods take no arguments"
        );
    }
}
