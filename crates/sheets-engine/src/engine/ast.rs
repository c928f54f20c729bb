//! Formula syntax tree.

use rust_decimal::Decimal;

use super::cell_ref::AnchoredRef;
use super::value::CellErrorType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A cell reference node.
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    /// Sheet qualifier as written (quotes removed).
    pub sheet: Option<String>,
    /// `None` when the location is syntactically a reference but lies outside the grid.
    pub location: Option<AnchoredRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(Decimal),
    Text(String),
    Boolean(bool),
    Error(CellErrorType),
    Reference(Reference),
    Paren(Box<Expr>),
    Negate(Box<Expr>),
    Plus(Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Concat(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    /// Arguments are left unevaluated so conditional functions can pick a branch.
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    /// Visit every node, parents before children.
    ///
    /// Returning `false` from `visit` skips that node's children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr) -> bool) {
        if !visit(self) {
            return;
        }
        match self {
            Expr::Paren(inner) | Expr::Negate(inner) | Expr::Plus(inner) => inner.walk(visit),
            Expr::Arith(_, lhs, rhs) | Expr::Concat(lhs, rhs) | Expr::Compare(_, lhs, rhs) => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expr::Number(_)
            | Expr::Text(_)
            | Expr::Boolean(_)
            | Expr::Error(_)
            | Expr::Reference(_) => {}
        }
    }
}
