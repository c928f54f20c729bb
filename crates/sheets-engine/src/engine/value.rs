//! Cell values and the coercion rules formulas apply to them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::ast::{ArithOp, CompareOp};
use super::format::format_value;

/// Kinds of error a cell value can carry.
///
/// Declaration order is the ordinal used when sorting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CellErrorType {
    ParseError,
    CircularReference,
    BadReference,
    BadName,
    TypeError,
    DivideByZero,
}

impl CellErrorType {
    pub const ALL: [CellErrorType; 6] = [
        CellErrorType::ParseError,
        CellErrorType::CircularReference,
        CellErrorType::BadReference,
        CellErrorType::BadName,
        CellErrorType::TypeError,
        CellErrorType::DivideByZero,
    ];

    /// The literal spelling used in cell contents and formulas.
    pub fn as_code(&self) -> &'static str {
        match self {
            CellErrorType::ParseError => "#ERROR!",
            CellErrorType::CircularReference => "#CIRCREF!",
            CellErrorType::BadReference => "#REF!",
            CellErrorType::BadName => "#NAME?",
            CellErrorType::TypeError => "#VALUE!",
            CellErrorType::DivideByZero => "#DIV/0!",
        }
    }

    /// Case-insensitive lookup of an error literal.
    pub fn from_code(code: &str) -> Option<CellErrorType> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for CellErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// An error value: a kind plus a human readable detail.
///
/// Equality only looks at the kind; the detail is informational.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CellError {
    pub error_type: CellErrorType,
    pub detail: String,
}

impl CellError {
    pub fn new(error_type: CellErrorType, detail: impl Into<String>) -> CellError {
        CellError {
            error_type,
            detail: detail.into(),
        }
    }

    pub fn circular() -> CellError {
        CellError::new(CellErrorType::CircularReference, "circular reference detected")
    }
}

impl PartialEq for CellError {
    fn eq(&self, other: &Self) -> bool {
        self.error_type == other.error_type
    }
}

impl Eq for CellError {}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.error_type)
        } else {
            write!(f, "{} ({})", self.error_type, self.detail)
        }
    }
}

/// The computed value of a cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Number(Decimal),
    Text(String),
    Boolean(bool),
    Error(CellError),
}

impl CellValue {
    pub fn error(error_type: CellErrorType, detail: impl Into<String>) -> CellValue {
        CellValue::Error(CellError::new(error_type, detail))
    }

    pub fn number(n: Decimal) -> CellValue {
        CellValue::Number(n.normalize())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    pub fn error_type(&self) -> Option<CellErrorType> {
        match self {
            CellValue::Error(e) => Some(e.error_type),
            _ => None,
        }
    }

    /// Numeric coercion used by arithmetic.
    pub fn to_number(&self) -> Result<Decimal, CellError> {
        match self {
            CellValue::Empty => Ok(Decimal::ZERO),
            CellValue::Number(n) => Ok(*n),
            CellValue::Boolean(b) => Ok(if *b { Decimal::ONE } else { Decimal::ZERO }),
            CellValue::Text(s) => parse_decimal(s).ok_or_else(|| {
                CellError::new(CellErrorType::TypeError, format!("{:?} is not a number", s))
            }),
            CellValue::Error(e) => Err(e.clone()),
        }
    }

    /// Text coercion used by concatenation and text functions.
    pub fn to_text(&self) -> Result<String, CellError> {
        match self {
            CellValue::Error(e) => Err(e.clone()),
            other => Ok(format_value(other)),
        }
    }

    /// Boolean coercion used by logical functions and conditions.
    pub fn to_bool(&self) -> Result<bool, CellError> {
        match self {
            CellValue::Empty => Ok(false),
            CellValue::Boolean(b) => Ok(*b),
            CellValue::Number(n) => Ok(!n.is_zero()),
            CellValue::Text(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            CellValue::Text(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            CellValue::Text(s) => Err(CellError::new(
                CellErrorType::TypeError,
                format!("{:?} is not a boolean", s),
            )),
            CellValue::Error(e) => Err(e.clone()),
        }
    }

    /// The value a blank operand takes when compared against `self`.
    fn zero_like(&self) -> CellValue {
        match self {
            CellValue::Number(_) => CellValue::Number(Decimal::ZERO),
            CellValue::Text(_) => CellValue::Text(String::new()),
            CellValue::Boolean(_) => CellValue::Boolean(false),
            other => other.clone(),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            CellValue::Number(_) => 0,
            CellValue::Text(_) => 1,
            CellValue::Boolean(_) => 2,
            CellValue::Empty | CellValue::Error(_) => 3,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_value(self))
    }
}

/// Parse a finite decimal, tolerating surrounding whitespace.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

fn first_error(lhs: &CellValue, rhs: &CellValue) -> Option<CellValue> {
    [lhs, rhs].into_iter().find(|v| v.is_error()).cloned()
}

fn overflow() -> CellValue {
    CellValue::error(CellErrorType::TypeError, "numeric overflow")
}

/// Apply a binary arithmetic operator.
pub fn arithmetic(op: ArithOp, lhs: &CellValue, rhs: &CellValue) -> CellValue {
    if let Some(err) = first_error(lhs, rhs) {
        return err;
    }
    let (a, b) = match (lhs.to_number(), rhs.to_number()) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return CellValue::Error(e),
    };
    let result = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div => {
            if b.is_zero() {
                return CellValue::error(CellErrorType::DivideByZero, "division by zero");
            }
            a.checked_div(b)
        }
    };
    result.map(CellValue::number).unwrap_or_else(overflow)
}

/// Unary minus; unary plus is `negate = false` and only coerces.
pub fn unary(negate: bool, operand: &CellValue) -> CellValue {
    match operand.to_number() {
        Ok(n) if negate => CellValue::number(-n),
        Ok(n) => CellValue::number(n),
        Err(e) => CellValue::Error(e),
    }
}

/// String concatenation (`&`).
pub fn concat(lhs: &CellValue, rhs: &CellValue) -> CellValue {
    if let Some(err) = first_error(lhs, rhs) {
        return err;
    }
    let mut text = format_value(lhs);
    text.push_str(&format_value(rhs));
    CellValue::Text(text)
}

/// Order two non-error values the way comparison operators see them.
pub fn compare_values(lhs: &CellValue, rhs: &CellValue) -> Ordering {
    let (lhs, rhs) = match (lhs, rhs) {
        (CellValue::Empty, CellValue::Empty) => return Ordering::Equal,
        (CellValue::Empty, other) => (other.zero_like(), other.clone()),
        (other, CellValue::Empty) => (other.clone(), other.zero_like()),
        (a, b) => (a.clone(), b.clone()),
    };
    match (&lhs, &rhs) {
        (CellValue::Number(a), CellValue::Number(b)) => a.cmp(b),
        (CellValue::Text(a), CellValue::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (CellValue::Boolean(a), CellValue::Boolean(b)) => a.cmp(b),
        (a, b) => a.type_rank().cmp(&b.type_rank()),
    }
}

/// Apply a comparison operator, yielding a boolean value.
pub fn compare(op: CompareOp, lhs: &CellValue, rhs: &CellValue) -> CellValue {
    if let Some(err) = first_error(lhs, rhs) {
        return err;
    }
    let ord = compare_values(lhs, rhs);
    let result = match op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Ne => ord != Ordering::Equal,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Le => ord != Ordering::Greater,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Ge => ord != Ordering::Less,
    };
    CellValue::Boolean(result)
}
