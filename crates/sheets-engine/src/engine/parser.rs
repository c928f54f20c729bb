//! Formula lexer and parser.
//!
//! The lexer keeps byte spans for every token so the text rewriter can patch
//! references in place without disturbing the rest of the formula. The parser
//! is a small Pratt parser over those tokens.
//!
//! Precedence, loosest first: comparison, `&`, `+ -`, `* /`, unary sign.
//!
//! Trees deeper than [`MAX_NESTING`] are rejected. Evaluation, dependency
//! walks and dropping an [`Expr`] all recurse once per level, so a long
//! `A1+A1+...` chain or deep parentheses would otherwise exhaust the stack.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use super::ast::{ArithOp, CompareOp, Expr, Reference};
use super::cell_ref::{AnchoredRef, looks_like_location};
use super::value::CellErrorType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at {}..{})", .span.start, .span.end)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    fn new(message: impl Into<String>, span: Span) -> ParseError {
        ParseError {
            message: message.into(),
            span,
        }
    }
}

/// Sheet qualifier of a reference, e.g. `Sheet1` or `'My Sheet'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetQualifier {
    pub name: String,
    /// Covers the name including any quotes, but not the `!`.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellToken {
    pub sheet: Option<SheetQualifier>,
    pub location: Option<AnchoredRef>,
    pub location_span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(Decimal),
    String(String),
    Boolean(bool),
    Error(CellErrorType),
    Cell(CellToken),
    Ident(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Amp,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Parse a formula body (the text after the leading `=`).
pub fn parse_formula(formula: &str) -> Result<Expr, ParseError> {
    let tokens = lex(formula)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: formula.len(),
        active: 0,
    };
    let (expr, _) = parser.parse_expression(0)?;
    if let Some(tok) = parser.peek() {
        return Err(ParseError::new("unexpected trailing input", tok.span));
    }
    Ok(expr)
}

/// Parse a standalone `[sheet!]location` reference, as accepted by `INDIRECT`.
pub fn parse_reference(text: &str) -> Option<Reference> {
    let tokens = lex(text.trim()).ok()?;
    match tokens.as_slice() {
        [
            Token {
                kind: TokenKind::Cell(cell),
                ..
            },
        ] => Some(Reference {
            sheet: cell.sheet.as_ref().map(|s| s.name.clone()),
            location: Some(cell.location?),
        }),
        _ => None,
    }
}

/// Split a formula body into tokens.
pub fn lex(src: &str) -> Result<Vec<Token>, ParseError> {
    Lexer { src, idx: 0 }.run()
}

struct Lexer<'a> {
    src: &'a str,
    idx: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

impl<'a> Lexer<'a> {
    fn peek_char(&self) -> Option<char> {
        self.src[self.idx..].chars().next()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.idx..]
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.idx;
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            self.idx += ch.len_utf8();
        }
        &self.src[start..self.idx]
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek_char() {
            let start = self.idx;
            if ch.is_whitespace() {
                self.idx += ch.len_utf8();
                continue;
            }
            let kind = match ch {
                '"' => self.lex_string()?,
                '\'' => self.lex_quoted_sheet()?,
                '#' => self.lex_error_literal()?,
                c if is_word_char(c) || c == '.' => self.lex_word()?,
                _ => self.lex_operator()?,
            };
            tokens.push(Token {
                kind,
                span: Span::new(start, self.idx),
            });
        }
        Ok(tokens)
    }

    fn lex_string(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.idx;
        self.idx += 1;
        let body = self.take_while(|c| c != '"');
        if self.peek_char() != Some('"') {
            return Err(ParseError::new(
                "unterminated string literal",
                Span::new(start, self.idx),
            ));
        }
        self.idx += 1;
        Ok(TokenKind::String(body.to_string()))
    }

    fn lex_quoted_sheet(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.idx;
        self.idx += 1;
        let name = self.take_while(|c| c != '\'');
        if self.peek_char() != Some('\'') {
            return Err(ParseError::new(
                "unterminated sheet name",
                Span::new(start, self.idx),
            ));
        }
        self.idx += 1;
        let sheet = SheetQualifier {
            name: name.to_string(),
            span: Span::new(start, self.idx),
        };
        if self.peek_char() != Some('!') {
            return Err(ParseError::new(
                "quoted sheet name must be followed by '!'",
                sheet.span,
            ));
        }
        self.idx += 1;
        self.lex_location(Some(sheet))
    }

    fn lex_location(&mut self, sheet: Option<SheetQualifier>) -> Result<TokenKind, ParseError> {
        let start = self.idx;
        let word = self.take_while(is_word_char);
        let span = Span::new(start, self.idx);
        if !looks_like_location(word) {
            return Err(ParseError::new(
                format!("expected a cell location, found {:?}", word),
                span,
            ));
        }
        Ok(TokenKind::Cell(CellToken {
            sheet,
            location: AnchoredRef::parse(word),
            location_span: span,
        }))
    }

    fn lex_error_literal(&mut self) -> Result<TokenKind, ParseError> {
        let rest = self.rest();
        for kind in CellErrorType::ALL {
            let code = kind.as_code();
            if rest.len() >= code.len()
                && rest.is_char_boundary(code.len())
                && rest[..code.len()].eq_ignore_ascii_case(code)
            {
                self.idx += code.len();
                return Ok(TokenKind::Error(kind));
            }
        }
        Err(ParseError::new(
            "unknown error literal",
            Span::new(self.idx, self.idx + 1),
        ))
    }

    fn lex_word(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.idx;
        let word = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');

        let bang = self.rest().starts_with('!') && !self.rest().starts_with("!=");
        if bang && !word.is_empty() && !word.contains('$') {
            let sheet = SheetQualifier {
                name: word.to_string(),
                span: Span::new(start, self.idx),
            };
            self.idx += 1;
            return self.lex_location(Some(sheet));
        }

        let first = word.chars().next();
        if first.is_none_or(|c| c.is_ascii_digit()) {
            self.idx = start;
            return self.lex_number();
        }

        let next_is_paren = self.rest().trim_start().starts_with('(');
        if !next_is_paren && looks_like_location(word) {
            return Ok(TokenKind::Cell(CellToken {
                sheet: None,
                location: AnchoredRef::parse(word),
                location_span: Span::new(start, self.idx),
            }));
        }
        if word.contains('$') {
            return Err(ParseError::new(
                format!("unexpected {:?}", word),
                Span::new(start, self.idx),
            ));
        }
        if !next_is_paren && word.eq_ignore_ascii_case("true") {
            return Ok(TokenKind::Boolean(true));
        }
        if !next_is_paren && word.eq_ignore_ascii_case("false") {
            return Ok(TokenKind::Boolean(false));
        }
        Ok(TokenKind::Ident(word.to_ascii_uppercase()))
    }

    fn lex_number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.idx;
        let int_part = self.take_while(|c| c.is_ascii_digit());
        let mut text = if int_part.is_empty() {
            String::from("0")
        } else {
            int_part.to_string()
        };
        if self.peek_char() == Some('.') {
            self.idx += 1;
            let frac = self.take_while(|c| c.is_ascii_digit());
            if !frac.is_empty() {
                text.push('.');
                text.push_str(frac);
            } else if int_part.is_empty() {
                return Err(ParseError::new("expected digits", Span::new(start, self.idx)));
            }
        }
        let span = Span::new(start, self.idx);
        if self.peek_char().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
            return Err(ParseError::new("malformed number", span));
        }
        Decimal::from_str(&text)
            .map(|n| TokenKind::Number(n.normalize()))
            .map_err(|_| ParseError::new("number out of range", span))
    }

    fn lex_operator(&mut self) -> Result<TokenKind, ParseError> {
        let rest = self.rest();
        let (kind, len) = if rest.starts_with("==") {
            (TokenKind::Eq, 2)
        } else if rest.starts_with("<>") || rest.starts_with("!=") {
            (TokenKind::Ne, 2)
        } else if rest.starts_with("<=") {
            (TokenKind::Le, 2)
        } else if rest.starts_with(">=") {
            (TokenKind::Ge, 2)
        } else {
            let kind = match rest.chars().next() {
                Some('(') => TokenKind::LParen,
                Some(')') => TokenKind::RParen,
                Some(',') => TokenKind::Comma,
                Some('+') => TokenKind::Plus,
                Some('-') => TokenKind::Minus,
                Some('*') => TokenKind::Star,
                Some('/') => TokenKind::Slash,
                Some('&') => TokenKind::Amp,
                Some('=') => TokenKind::Eq,
                Some('<') => TokenKind::Lt,
                Some('>') => TokenKind::Gt,
                other => {
                    let len = other.map_or(1, char::len_utf8);
                    return Err(ParseError::new(
                        format!("unexpected character {:?}", other.unwrap_or(' ')),
                        Span::new(self.idx, self.idx + len),
                    ));
                }
            };
            (kind, 1)
        };
        self.idx += len;
        Ok(kind)
    }
}

enum Infix {
    Arith(ArithOp),
    Concat,
    Compare(CompareOp),
}

fn infix_op(kind: &TokenKind) -> Option<Infix> {
    Some(match kind {
        TokenKind::Plus => Infix::Arith(ArithOp::Add),
        TokenKind::Minus => Infix::Arith(ArithOp::Sub),
        TokenKind::Star => Infix::Arith(ArithOp::Mul),
        TokenKind::Slash => Infix::Arith(ArithOp::Div),
        TokenKind::Amp => Infix::Concat,
        TokenKind::Eq => Infix::Compare(CompareOp::Eq),
        TokenKind::Ne => Infix::Compare(CompareOp::Ne),
        TokenKind::Lt => Infix::Compare(CompareOp::Lt),
        TokenKind::Le => Infix::Compare(CompareOp::Le),
        TokenKind::Gt => Infix::Compare(CompareOp::Gt),
        TokenKind::Ge => Infix::Compare(CompareOp::Ge),
        _ => return None,
    })
}

fn infix_binding_power(op: &Infix) -> (u8, u8) {
    match op {
        Infix::Compare(_) => (1, 2),
        Infix::Concat => (3, 4),
        Infix::Arith(ArithOp::Add | ArithOp::Sub) => (5, 6),
        Infix::Arith(ArithOp::Mul | ArithOp::Div) => (7, 8),
    }
}

const PREFIX_BP: u8 = 9;

/// Deepest expression tree a formula may produce.
pub const MAX_NESTING: usize = 512;

/// Expression paired with the depth of its tree.
type Node = (Expr, usize);

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
    /// Open `parse_expression` frames.
    active: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eof_span(&self) -> Span {
        Span::new(self.end, self.end)
    }

    fn here(&self) -> Span {
        self.peek().map_or_else(|| self.eof_span(), |tok| tok.span)
    }

    fn expect(&mut self, want: TokenKind, what: &str) -> Result<(), ParseError> {
        match self.next() {
            Some(tok) if tok.kind == want => Ok(()),
            Some(tok) => Err(ParseError::new(format!("expected {}", what), tok.span)),
            None => Err(ParseError::new(format!("expected {}", what), self.eof_span())),
        }
    }

    fn check_depth(&self, depth: usize) -> Result<usize, ParseError> {
        if depth > MAX_NESTING {
            return Err(ParseError::new(
                format!("formula nested deeper than {} levels", MAX_NESTING),
                self.here(),
            ));
        }
        Ok(depth)
    }

    fn parse_expression(&mut self, min_bp: u8) -> Result<Node, ParseError> {
        self.active += 1;
        self.check_depth(self.active)?;
        let node = self.parse_infix(min_bp);
        self.active -= 1;
        node
    }

    fn parse_infix(&mut self, min_bp: u8) -> Result<Node, ParseError> {
        let (mut lhs, mut depth) = self.parse_prefix()?;

        loop {
            let Some(op) = self.peek().and_then(|tok| infix_op(&tok.kind)) else {
                break;
            };
            let (l_bp, r_bp) = infix_binding_power(&op);
            if l_bp < min_bp {
                break;
            }
            self.next();
            let (rhs, rhs_depth) = self.parse_expression(r_bp)?;
            depth = self.check_depth(depth.max(rhs_depth) + 1)?;
            let lhs_box = Box::new(lhs);
            let rhs = Box::new(rhs);
            lhs = match op {
                Infix::Arith(op) => Expr::Arith(op, lhs_box, rhs),
                Infix::Concat => Expr::Concat(lhs_box, rhs),
                Infix::Compare(op) => Expr::Compare(op, lhs_box, rhs),
            };
        }

        Ok((lhs, depth))
    }

    fn parse_prefix(&mut self) -> Result<Node, ParseError> {
        let Some(tok) = self.next() else {
            return Err(ParseError::new("unexpected end of formula", self.eof_span()));
        };
        let leaf = match tok.kind {
            TokenKind::Number(n) => Expr::Number(n),
            TokenKind::String(s) => Expr::Text(s),
            TokenKind::Boolean(b) => Expr::Boolean(b),
            TokenKind::Error(kind) => Expr::Error(kind),
            TokenKind::Cell(cell) => Expr::Reference(Reference {
                sheet: cell.sheet.map(|s| s.name),
                location: cell.location,
            }),
            TokenKind::Minus => {
                let (inner, depth) = self.parse_expression(PREFIX_BP)?;
                return Ok((Expr::Negate(Box::new(inner)), self.check_depth(depth + 1)?));
            }
            TokenKind::Plus => {
                let (inner, depth) = self.parse_expression(PREFIX_BP)?;
                return Ok((Expr::Plus(Box::new(inner)), self.check_depth(depth + 1)?));
            }
            TokenKind::LParen => {
                let (inner, depth) = self.parse_expression(0)?;
                self.expect(TokenKind::RParen, "')'")?;
                return Ok((Expr::Paren(Box::new(inner)), self.check_depth(depth + 1)?));
            }
            TokenKind::Ident(name) => {
                self.expect(TokenKind::LParen, "'(' after function name")?;
                let (args, depth) = self.parse_args()?;
                return Ok((Expr::Call { name, args }, self.check_depth(depth + 1)?));
            }
            _ => return Err(ParseError::new("unexpected token", tok.span)),
        };
        Ok((leaf, 1))
    }

    /// Arguments up to the closing `)`, with the depth of the deepest one.
    fn parse_args(&mut self) -> Result<(Vec<Expr>, usize), ParseError> {
        let mut args = Vec::new();
        let mut depth = 0;
        if matches!(self.peek(), Some(tok) if tok.kind == TokenKind::RParen) {
            self.next();
            return Ok((args, depth));
        }
        loop {
            let (arg, arg_depth) = self.parse_expression(0)?;
            args.push(arg);
            depth = depth.max(arg_depth);
            match self.next() {
                Some(tok) if tok.kind == TokenKind::Comma => continue,
                Some(tok) if tok.kind == TokenKind::RParen => return Ok((args, depth)),
                Some(tok) => return Err(ParseError::new("expected ',' or ')'", tok.span)),
                None => return Err(ParseError::new("unclosed function call", self.eof_span())),
            }
        }
    }
}
