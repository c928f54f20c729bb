//! Static dependency extraction from parsed formulas.
//!
//! Walks the syntax tree to find every cell reference a formula reads
//! unconditionally. Arguments of conditional functions (`IF`, `IFERROR`,
//! `CHOOSE`, `INDIRECT`) are skipped: which of them are live is only known at
//! evaluation time, where they are recorded as dynamic dependencies instead.

use super::ast::{Expr, Reference};
use crate::builtins;

/// Collect the static references of a formula, in source order.
pub fn extract_dependencies(expr: &Expr) -> Vec<&Reference> {
    let mut deps = Vec::new();
    expr.walk(&mut |node| match node {
        Expr::Reference(r) => {
            deps.push(r);
            false
        }
        Expr::Call { name, .. } => !builtins::is_dynamic(name),
        _ => true,
    });
    deps
}

/// Whether evaluating this formula can record dynamic dependencies.
pub fn has_dynamic_calls(expr: &Expr) -> bool {
    let mut found = false;
    expr.walk(&mut |node| {
        if let Expr::Call { name, .. } = node
            && builtins::is_dynamic(name)
        {
            found = true;
        }
        !found
    });
    found
}
