//! Formula evaluation.
//!
//! The evaluator walks a parsed [`Expr`] and asks a [`CellResolver`] for the
//! value of every cell it reads. Reads made underneath a conditional function
//! are flagged as dynamic so the resolver can record them as dynamic edges.

use super::ast::{Expr, Reference};
use super::cell_ref::CellRef;
use super::value::{self, CellErrorType, CellValue};
use crate::builtins;

/// Access to cell values from inside a formula.
pub trait CellResolver {
    /// Value of `cell` on `sheet` (the formula's own sheet when `None`).
    ///
    /// `dynamic` is set when the read happens inside a conditional function.
    fn read_cell(&mut self, sheet: Option<&str>, cell: CellRef, dynamic: bool) -> CellValue;

    /// Text reported by `VERSION()`.
    fn version(&self) -> &str;
}

pub struct Evaluator<'r> {
    resolver: &'r mut dyn CellResolver,
    dynamic_depth: usize,
}

impl<'r> Evaluator<'r> {
    pub fn new(resolver: &'r mut dyn CellResolver) -> Self {
        Evaluator {
            resolver,
            dynamic_depth: 0,
        }
    }

    /// Evaluate a whole formula. A blank result reads as zero.
    pub fn evaluate(&mut self, expr: &Expr) -> CellValue {
        match self.eval(expr) {
            CellValue::Empty => CellValue::number(rust_decimal::Decimal::ZERO),
            other => other,
        }
    }

    pub(crate) fn eval(&mut self, expr: &Expr) -> CellValue {
        match expr {
            Expr::Number(n) => CellValue::number(*n),
            Expr::Text(s) => CellValue::Text(s.clone()),
            Expr::Boolean(b) => CellValue::Boolean(*b),
            Expr::Error(kind) => CellValue::error(*kind, "error literal"),
            Expr::Reference(r) => self.read_reference(r),
            Expr::Paren(inner) => self.eval(inner),
            Expr::Negate(inner) => {
                let v = self.eval(inner);
                value::unary(true, &v)
            }
            Expr::Plus(inner) => {
                let v = self.eval(inner);
                value::unary(false, &v)
            }
            Expr::Arith(op, lhs, rhs) => {
                let (a, b) = (self.eval(lhs), self.eval(rhs));
                value::arithmetic(*op, &a, &b)
            }
            Expr::Concat(lhs, rhs) => {
                let (a, b) = (self.eval(lhs), self.eval(rhs));
                value::concat(&a, &b)
            }
            Expr::Compare(op, lhs, rhs) => {
                let (a, b) = (self.eval(lhs), self.eval(rhs));
                value::compare(*op, &a, &b)
            }
            Expr::Call { name, args } => match builtins::lookup(name) {
                Some(builtin) => (builtin.func)(self, args),
                None => CellValue::error(
                    CellErrorType::BadName,
                    format!("unknown function {}", name),
                ),
            },
        }
    }

    /// Evaluate an argument whose cell reads are dynamic dependencies.
    pub(crate) fn eval_dynamic(&mut self, expr: &Expr) -> CellValue {
        self.dynamic_depth += 1;
        let v = self.eval(expr);
        self.dynamic_depth -= 1;
        v
    }

    pub(crate) fn read_reference(&mut self, reference: &Reference) -> CellValue {
        let Some(location) = reference.location else {
            return CellValue::error(CellErrorType::BadReference, "location out of range");
        };
        self.resolver.read_cell(
            reference.sheet.as_deref(),
            location.cell,
            self.dynamic_depth > 0,
        )
    }

    /// Read a reference computed at evaluation time, e.g. by `INDIRECT`.
    pub(crate) fn read_dynamic(&mut self, reference: &Reference) -> CellValue {
        self.dynamic_depth += 1;
        let v = self.read_reference(reference);
        self.dynamic_depth -= 1;
        v
    }

    pub(crate) fn version(&self) -> String {
        self.resolver.version().to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::parser::parse_formula;
    use std::collections::HashMap;

    /// In-memory resolver recording which reads were dynamic.
    #[derive(Default)]
    pub(crate) struct MapResolver {
        pub values: HashMap<(String, CellRef), CellValue>,
        pub reads: Vec<(String, bool)>,
    }

    impl MapResolver {
        pub fn with(cells: &[(&str, &str)]) -> Self {
            let mut resolver = MapResolver::default();
            for (loc, contents) in cells {
                let value = parse_formula(contents)
                    .map(|expr| {
                        let mut scratch = MapResolver::default();
                        Evaluator::new(&mut scratch).evaluate(&expr)
                    })
                    .unwrap_or_else(|_| CellValue::Text(contents.to_string()));
                let key = ("SHEET1".to_string(), CellRef::from_str(loc).unwrap());
                resolver.values.insert(key, value);
            }
            resolver
        }
    }

    impl CellResolver for MapResolver {
        fn read_cell(&mut self, sheet: Option<&str>, cell: CellRef, dynamic: bool) -> CellValue {
            let sheet = sheet.unwrap_or("Sheet1").to_uppercase();
            self.reads.push((format!("{}!{}", sheet, cell), dynamic));
            if sheet != "SHEET1" {
                return CellValue::error(CellErrorType::BadReference, "no such sheet");
            }
            self.values.get(&(sheet, cell)).cloned().unwrap_or_default()
        }

        fn version(&self) -> &str {
            "1.2"
        }
    }

    pub(crate) fn eval_with(resolver: &mut MapResolver, src: &str) -> CellValue {
        let expr = parse_formula(src).unwrap();
        Evaluator::new(resolver).evaluate(&expr)
    }

    fn num(n: i64) -> CellValue {
        CellValue::number(rust_decimal::Decimal::from(n))
    }

    #[test]
    fn test_blank_result_is_zero() {
        let mut r = MapResolver::default();
        assert_eq!(eval_with(&mut r, "A1"), num(0));
        assert_eq!(eval_with(&mut r, "A1 & \"\""), CellValue::Text(String::new()));
    }

    #[test]
    fn test_arithmetic_over_cells() {
        let mut r = MapResolver::with(&[("A1", "2"), ("A2", "3")]);
        assert_eq!(eval_with(&mut r, "A1 * (A2 + 1) - -1"), num(9));
        assert_eq!(
            eval_with(&mut r, "A1 / 0").error_type(),
            Some(CellErrorType::DivideByZero)
        );
    }

    #[test]
    fn test_missing_sheet_and_out_of_range_are_bad_references() {
        let mut r = MapResolver::default();
        assert_eq!(
            eval_with(&mut r, "Other!A1").error_type(),
            Some(CellErrorType::BadReference)
        );
        assert_eq!(
            eval_with(&mut r, "A10000 + 1").error_type(),
            Some(CellErrorType::BadReference)
        );
    }

    #[test]
    fn test_unknown_function_is_bad_name() {
        let mut r = MapResolver::default();
        assert_eq!(
            eval_with(&mut r, "NOPE(A1)").error_type(),
            Some(CellErrorType::BadName)
        );
        assert!(r.reads.is_empty());
    }

    #[test]
    fn test_reads_under_conditionals_are_dynamic() {
        let mut r = MapResolver::with(&[("A2", "TRUE")]);
        eval_with(&mut r, "B1 + IF(A2, A3, A4)");
        assert_eq!(
            r.reads,
            vec![
                ("SHEET1!B1".to_string(), false),
                ("SHEET1!A2".to_string(), true),
                ("SHEET1!A3".to_string(), true),
            ]
        );
    }
}
