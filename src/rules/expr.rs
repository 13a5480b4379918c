//! Condition expressions.
//!
//! ```text
//! or      := and (("||" | "or") and)*
//! and     := unary (("&&" | "and") unary)*
//! unary   := ("!" | "not") unary | compare
//! compare := "(" or ")" | operand (cmp operand)?
//! operand := path | string | number | true | false | null
//! path    := ident ("." ident)*
//! ```
//!
//! Parsing is purely syntactic. Whether a path names a real field is decided
//! by [`super::resolve_path`] against the owning entity.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    /// A bare path used as a boolean.
    Truthy(FieldPath),
    Const(bool),
}

impl Expr {
    /// Every field path in the expression, left to right.
    pub fn paths(&self) -> Vec<&FieldPath> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a FieldPath>) {
        match self {
            Expr::Or(a, b) | Expr::And(a, b) => {
                a.collect_paths(out);
                b.collect_paths(out);
            }
            Expr::Not(inner) => inner.collect_paths(out),
            Expr::Compare { left, right, .. } => {
                for operand in [left, right] {
                    if let Operand::Path(p) = operand {
                        out.push(p);
                    }
                }
            }
            Expr::Truthy(p) => out.push(p),
            Expr::Const(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Path(FieldPath),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, ExprError> {
        match parse_condition(raw)? {
            Expr::Truthy(path) => Ok(path),
            _ => Err(ExprError::new(0, format!("`{raw}` is not a field path"))),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    /// Kept as written so emitted output is byte-stable.
    Number(String),
    Bool(bool),
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "{s:?}"),
            Literal::Number(n) => f.write_str(n),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn is_ordering(&self) -> bool {
        matches!(self, CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct ExprError {
    pub offset: usize,
    pub message: String,
}

impl ExprError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        ExprError {
            offset,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(String),
    Dot,
    LParen,
    RParen,
    Not,
    And,
    Or,
    Cmp(CompareOp),
}

fn tokenize(src: &str) -> Result<Vec<(usize, Token)>, ExprError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (pos, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push((pos, Token::LParen));
                i += 1;
            }
            ')' => {
                tokens.push((pos, Token::RParen));
                i += 1;
            }
            '.' => {
                tokens.push((pos, Token::Dot));
                i += 1;
            }
            '=' if next == Some('=') => {
                tokens.push((pos, Token::Cmp(CompareOp::Eq)));
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push((pos, Token::Cmp(CompareOp::Ne)));
                i += 2;
            }
            '!' => {
                tokens.push((pos, Token::Not));
                i += 1;
            }
            '<' | '>' => {
                let op = match (c, next == Some('=')) {
                    ('<', true) => CompareOp::Le,
                    ('<', false) => CompareOp::Lt,
                    ('>', true) => CompareOp::Ge,
                    _ => CompareOp::Gt,
                };
                tokens.push((pos, Token::Cmp(op)));
                i += if next == Some('=') { 2 } else { 1 };
            }
            '&' if next == Some('&') => {
                tokens.push((pos, Token::And));
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push((pos, Token::Or));
                i += 2;
            }
            '"' | '\'' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    let Some(&(_, ch)) = chars.get(i) else {
                        return Err(ExprError::new(pos, "unterminated string literal"));
                    };
                    i += 1;
                    match ch {
                        '\\' => {
                            let Some(&(_, escaped)) = chars.get(i) else {
                                return Err(ExprError::new(pos, "unterminated string literal"));
                            };
                            i += 1;
                            value.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                other => other,
                            });
                        }
                        ch if ch == quote => break,
                        ch => value.push(ch),
                    }
                }
                tokens.push((pos, Token::Str(value)));
            }
            c if c.is_ascii_digit()
                || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                let mut seen_dot = false;
                while let Some(&(_, ch)) = chars.get(i) {
                    if ch.is_ascii_digit() {
                        i += 1;
                    } else if ch == '.'
                        && !seen_dot
                        && chars.get(i + 1).is_some_and(|(_, n)| n.is_ascii_digit())
                    {
                        seen_dot = true;
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text: String = chars[start..i].iter().map(|(_, c)| *c).collect();
                tokens.push((pos, Token::Number(text)));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while chars
                    .get(i)
                    .is_some_and(|(_, ch)| ch.is_ascii_alphanumeric() || *ch == '_')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().map(|(_, c)| *c).collect();
                let token = match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                };
                tokens.push((pos, token));
            }
            other => {
                return Err(ExprError::new(pos, format!("unexpected character `{other}`")));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(o, _)| *o).unwrap_or(self.end)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.bump();
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.bump();
            let right = self.unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::Not) {
            self.bump();
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::LParen) {
            let open = self.offset();
            self.bump();
            let inner = self.or()?;
            if self.bump() != Some(Token::RParen) {
                return Err(ExprError::new(open, "unclosed parenthesis"));
            }
            return Ok(inner);
        }
        let left = self.operand()?;
        if let Some(Token::Cmp(op)) = self.peek().cloned() {
            self.bump();
            let right = self.operand()?;
            return Ok(Expr::Compare { left, op, right });
        }
        match left {
            Operand::Path(path) => Ok(Expr::Truthy(path)),
            Operand::Literal(Literal::Bool(b)) => Ok(Expr::Const(b)),
            Operand::Literal(other) => Err(ExprError::new(
                self.offset(),
                format!("literal {other} cannot stand alone as a condition"),
            )),
        }
    }

    fn operand(&mut self) -> Result<Operand, ExprError> {
        let offset = self.offset();
        match self.bump() {
            Some(Token::Str(s)) => Ok(Operand::Literal(Literal::String(s))),
            Some(Token::Number(n)) => Ok(Operand::Literal(Literal::Number(n))),
            Some(Token::Ident(word)) => match word.as_str() {
                "true" => Ok(Operand::Literal(Literal::Bool(true))),
                "false" => Ok(Operand::Literal(Literal::Bool(false))),
                "null" => Ok(Operand::Literal(Literal::Null)),
                _ => {
                    let mut segments = vec![word];
                    while self.peek() == Some(&Token::Dot) {
                        self.bump();
                        match self.bump() {
                            Some(Token::Ident(next)) => segments.push(next),
                            _ => {
                                return Err(ExprError::new(
                                    self.offset(),
                                    "expected a name after `.`",
                                ))
                            }
                        }
                    }
                    Ok(Operand::Path(FieldPath { segments }))
                }
            },
            Some(other) => Err(ExprError::new(
                offset,
                format!("expected a field or literal, found {other:?}"),
            )),
            None => Err(ExprError::new(offset, "unexpected end of condition")),
        }
    }
}

/// Parse a condition expression.
pub fn parse_condition(src: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(ExprError::new(0, "condition is empty"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: src.len(),
    };
    let expr = parser.or()?;
    if parser.pos < parser.tokens.len() {
        return Err(ExprError::new(parser.offset(), "unexpected trailing input"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> FieldPath {
        FieldPath {
            segments: raw.split('.').map(String::from).collect(),
        }
    }

    #[test]
    fn test_simple_comparison() {
        let expr = parse_condition("completed == true").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                left: Operand::Path(path("completed")),
                op: CompareOp::Eq,
                right: Operand::Literal(Literal::Bool(true)),
            }
        );
    }

    #[test]
    fn test_precedence_and_keywords() {
        let expr = parse_condition("a || b and not c").unwrap();
        let Expr::Or(left, right) = expr else {
            panic!("expected or at the root");
        };
        assert_eq!(*left, Expr::Truthy(path("a")));
        let Expr::And(b, not_c) = *right else {
            panic!("expected and on the right");
        };
        assert_eq!(*b, Expr::Truthy(path("b")));
        assert_eq!(*not_c, Expr::Not(Box::new(Expr::Truthy(path("c")))));
    }

    #[test]
    fn test_literals_and_paths() {
        let expr = parse_condition("(project.name != 'it\\'s') && priority >= -2.5").unwrap();
        let paths: Vec<String> = expr.paths().iter().map(|p| p.to_string()).collect();
        assert_eq!(paths, vec!["project.name", "priority"]);
        let Expr::And(_, right) = expr else {
            panic!("expected and");
        };
        assert_eq!(
            *right,
            Expr::Compare {
                left: Operand::Path(path("priority")),
                op: CompareOp::Ge,
                right: Operand::Literal(Literal::Number("-2.5".into())),
            }
        );
    }

    #[test]
    fn test_errors_carry_offsets() {
        let err = parse_condition("title == ").unwrap_err();
        assert_eq!(err.offset, 9);
        assert!(parse_condition("").is_err());
        assert!(parse_condition("(a == 1").is_err());
        assert!(parse_condition("a == 'open").is_err());
        assert!(parse_condition("a = 1").is_err());
        assert!(parse_condition("a == 1 b").is_err());
        assert!(parse_condition("'alone'").is_err());
        assert!(parse_condition("a.").is_err());
    }

    #[test]
    fn test_field_path_parse() {
        assert_eq!(FieldPath::parse("owner.email").unwrap(), path("owner.email"));
        assert!(FieldPath::parse("a == b").is_err());
    }
}
