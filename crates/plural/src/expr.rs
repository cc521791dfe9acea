//! Compiled form of a `Plural-Forms` expression.
//!
//! The tree is built once by the parser and evaluated as many times as
//! needed; nothing in here allocates or mutates during evaluation.

use std::fmt;

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Infix operators, listed from lowest to highest precedence group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    // `&&` and `||` short-circuit in `Expr::evaluate` and never reach here.
    fn apply(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            BinaryOp::Or => i64::from(lhs != 0 || rhs != 0),
            BinaryOp::And => i64::from(lhs != 0 && rhs != 0),
            BinaryOp::Eq => i64::from(lhs == rhs),
            BinaryOp::Ne => i64::from(lhs != rhs),
            BinaryOp::Lt => i64::from(lhs < rhs),
            BinaryOp::Le => i64::from(lhs <= rhs),
            BinaryOp::Gt => i64::from(lhs > rhs),
            BinaryOp::Ge => i64::from(lhs >= rhs),
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
            BinaryOp::Div => {
                if rhs == 0 {
                    0
                } else {
                    lhs.wrapping_div(rhs)
                }
            }
            BinaryOp::Rem => {
                if rhs == 0 {
                    0
                } else {
                    lhs.wrapping_rem(rhs)
                }
            }
        }
    }
}

/// Node of a compiled plural expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(i64),
    /// The quantity `n`.
    Var,
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub(crate) fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Evaluates the expression for `n` using C semantics: zero is false,
    /// comparisons and logical operators yield `0` or `1`.
    pub fn evaluate(&self, n: i64) -> i64 {
        match self {
            Expr::Literal(value) => *value,
            Expr::Var => n,
            Expr::Unary(UnaryOp::Not, operand) => i64::from(operand.evaluate(n) == 0),
            Expr::Unary(UnaryOp::Neg, operand) => operand.evaluate(n).wrapping_neg(),
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                i64::from(lhs.evaluate(n) != 0 && rhs.evaluate(n) != 0)
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                i64::from(lhs.evaluate(n) != 0 || rhs.evaluate(n) != 0)
            }
            Expr::Binary(op, lhs, rhs) => op.apply(lhs.evaluate(n), rhs.evaluate(n)),
            Expr::Ternary(condition, when_true, when_false) => {
                if condition.evaluate(n) != 0 {
                    when_true.evaluate(n)
                } else {
                    when_false.evaluate(n)
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Var => f.write_str("n"),
            Expr::Unary(UnaryOp::Not, operand) => write!(f, "!{operand}"),
            Expr::Unary(UnaryOp::Neg, operand) => write!(f, "-{operand}"),
            Expr::Binary(op, lhs, rhs) => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Ternary(condition, when_true, when_false) => {
                write!(f, "({condition} ? {when_true} : {when_false})")
            }
        }
    }
}
