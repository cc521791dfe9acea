use std::fmt;

use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::PluralFormsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Num(i64),
    N,
    LParen,
    RParen,
    Question,
    Colon,
    OrOr,
    AndAnd,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Num(value) => return write!(f, "{value}"),
            Token::N => "n",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Question => "?",
            Token::Colon => ":",
            Token::OrOr => "||",
            Token::AndAnd => "&&",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Bang => "!",
        };
        f.write_str(text)
    }
}

/// Binary precedence groups, loosest first. Everything binds tighter than `?:`.
const BINARY_LEVELS: [&[(Token, BinaryOp)]; 6] = [
    &[(Token::OrOr, BinaryOp::Or)],
    &[(Token::AndAnd, BinaryOp::And)],
    &[(Token::EqEq, BinaryOp::Eq), (Token::NotEq, BinaryOp::Ne)],
    &[
        (Token::Lt, BinaryOp::Lt),
        (Token::Le, BinaryOp::Le),
        (Token::Gt, BinaryOp::Gt),
        (Token::Ge, BinaryOp::Ge),
    ],
    &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
    &[
        (Token::Star, BinaryOp::Mul),
        (Token::Slash, BinaryOp::Div),
        (Token::Percent, BinaryOp::Rem),
    ],
];

/// Deepest nesting of parentheses, prefix operators and `?:` branches accepted.
pub(crate) const MAX_DEPTH: usize = 128;

/// Compiles a C conditional expression over `n` into an [`Expr`] tree.
pub(crate) fn compile(source: &str) -> Result<Expr, PluralFormsError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.ternary()?;
    if let Some(&(offset, token)) = parser.tokens.get(parser.pos) {
        return Err(PluralFormsError::UnexpectedToken {
            found: token.to_string(),
            offset,
        });
    }
    Ok(expr)
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, PluralFormsError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut idx = 0;

    while idx < bytes.len() {
        let start = idx;
        let next = bytes.get(idx + 1).copied();
        let (token, width) = match bytes[idx] {
            b' ' | b'\t' | b'\r' | b'\n' => {
                idx += 1;
                continue;
            }
            b'0'..=b'9' => {
                let mut end = idx;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                let value = source[idx..end]
                    .parse::<i64>()
                    .map_err(|_| PluralFormsError::LiteralOverflow { offset: start })?;
                (Token::Num(value), end - idx)
            }
            b'n' => (Token::N, 1),
            b'(' => (Token::LParen, 1),
            b')' => (Token::RParen, 1),
            b'?' => (Token::Question, 1),
            b':' => (Token::Colon, 1),
            b'+' => (Token::Plus, 1),
            b'-' => (Token::Minus, 1),
            b'*' => (Token::Star, 1),
            b'/' => (Token::Slash, 1),
            b'%' => (Token::Percent, 1),
            b'|' if next == Some(b'|') => (Token::OrOr, 2),
            b'&' if next == Some(b'&') => (Token::AndAnd, 2),
            b'=' if next == Some(b'=') => (Token::EqEq, 2),
            b'!' if next == Some(b'=') => (Token::NotEq, 2),
            b'!' => (Token::Bang, 1),
            b'<' if next == Some(b'=') => (Token::Le, 2),
            b'<' => (Token::Lt, 1),
            b'>' if next == Some(b'=') => (Token::Ge, 2),
            b'>' => (Token::Gt, 1),
            _ => {
                let ch = source[idx..].chars().next().unwrap_or('\u{FFFD}');
                return Err(PluralFormsError::UnexpectedChar { ch, offset: start });
            }
        };
        tokens.push((start, token));
        idx += width;
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [(usize, Token)],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|&(_, token)| token)
    }

    fn bump(&mut self) -> Option<(usize, Token)> {
        let item = self.tokens.get(self.pos).copied();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn expect(&mut self, wanted: Token, opened_at: usize) -> Result<(), PluralFormsError> {
        match self.bump() {
            Some((_, token)) if token == wanted => Ok(()),
            Some((offset, token)) => Err(PluralFormsError::UnexpectedToken {
                found: token.to_string(),
                offset,
            }),
            None if wanted == Token::RParen => Err(PluralFormsError::UnclosedParen {
                offset: opened_at,
            }),
            None => Err(PluralFormsError::UnexpectedEnd),
        }
    }

    /// Runs `rule` one nesting level deeper, failing past [`MAX_DEPTH`].
    fn nested(
        &mut self,
        rule: fn(&mut Self) -> Result<Expr, PluralFormsError>,
    ) -> Result<Expr, PluralFormsError> {
        if self.depth >= MAX_DEPTH {
            let offset = self
                .tokens
                .get(self.pos.saturating_sub(1))
                .map_or(0, |&(offset, _)| offset);
            return Err(PluralFormsError::TooDeep { offset });
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    // cond ? a : b, right-associative
    fn ternary(&mut self) -> Result<Expr, PluralFormsError> {
        let condition = self.binary(0)?;
        let Some((offset, Token::Question)) = self.tokens.get(self.pos).copied() else {
            return Ok(condition);
        };
        self.pos += 1;
        let when_true = self.nested(Self::ternary)?;
        self.expect(Token::Colon, offset)?;
        let when_false = self.nested(Self::ternary)?;
        Ok(Expr::Ternary(
            Box::new(condition),
            Box::new(when_true),
            Box::new(when_false),
        ))
    }

    fn binary(&mut self, level: usize) -> Result<Expr, PluralFormsError> {
        let Some(operators) = BINARY_LEVELS.get(level) else {
            return self.unary();
        };
        let mut lhs = self.binary(level + 1)?;
        while let Some(token) = self.peek() {
            let Some(&(_, op)) = operators.iter().find(|(candidate, _)| *candidate == token)
            else {
                break;
            };
            self.pos += 1;
            let rhs = self.binary(level + 1)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, PluralFormsError> {
        match self.peek() {
            Some(Token::Bang) => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Not, Box::new(self.nested(Self::unary)?)))
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.nested(Self::unary)?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, PluralFormsError> {
        match self.bump() {
            Some((_, Token::Num(value))) => Ok(Expr::Literal(value)),
            Some((_, Token::N)) => Ok(Expr::Var),
            Some((offset, Token::LParen)) => {
                let inner = self.nested(Self::ternary)?;
                self.expect(Token::RParen, offset)?;
                Ok(inner)
            }
            Some((offset, token)) => Err(PluralFormsError::UnexpectedToken {
                found: token.to_string(),
                offset,
            }),
            None => Err(PluralFormsError::UnexpectedEnd),
        }
    }
}
