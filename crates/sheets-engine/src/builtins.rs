//! Built-in spreadsheet functions and their metadata.
//!
//! Conventions:
//! - Function names are ALL CAPS and matched case-insensitively.
//! - Every function receives its arguments unevaluated. Functions flagged
//!   `dynamic` evaluate them through [`Evaluator::eval_dynamic`] so the cells
//!   they actually read become dynamic dependencies.
//! - Wrong argument counts produce `#VALUE!`.
//! - If you add a new built-in, add it to `BUILTINS`.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::engine::{CellErrorType, CellValue, Evaluator, Expr, parse_reference};

pub type BuiltinFn = fn(&mut Evaluator<'_>, &[Expr]) -> CellValue;

pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
    /// Reads only some of its arguments, chosen at evaluation time.
    pub dynamic: bool,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "AND",
        func: fn_and,
        dynamic: false,
    },
    Builtin {
        name: "OR",
        func: fn_or,
        dynamic: false,
    },
    Builtin {
        name: "NOT",
        func: fn_not,
        dynamic: false,
    },
    Builtin {
        name: "XOR",
        func: fn_xor,
        dynamic: false,
    },
    Builtin {
        name: "EXACT",
        func: fn_exact,
        dynamic: false,
    },
    Builtin {
        name: "ISBLANK",
        func: fn_isblank,
        dynamic: false,
    },
    Builtin {
        name: "ISERROR",
        func: fn_iserror,
        dynamic: false,
    },
    Builtin {
        name: "VERSION",
        func: fn_version,
        dynamic: false,
    },
    Builtin {
        name: "IF",
        func: fn_if,
        dynamic: true,
    },
    Builtin {
        name: "IFERROR",
        func: fn_iferror,
        dynamic: true,
    },
    Builtin {
        name: "CHOOSE",
        func: fn_choose,
        dynamic: true,
    },
    Builtin {
        name: "INDIRECT",
        func: fn_indirect,
        dynamic: true,
    },
];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name.eq_ignore_ascii_case(name))
}

pub fn is_dynamic(name: &str) -> bool {
    lookup(name).is_some_and(|b| b.dynamic)
}

fn type_error(detail: impl Into<String>) -> CellValue {
    CellValue::error(CellErrorType::TypeError, detail)
}

fn arity(name: &str, args: &[Expr], min: usize, max: usize) -> Result<(), CellValue> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = match (min, max) {
        (min, usize::MAX) => format!("at least {}", min),
        (min, max) if min == max => min.to_string(),
        (min, max) => format!("{} to {}", min, max),
    };
    Err(type_error(format!(
        "{} takes {} arguments, got {}",
        name,
        expected,
        args.len()
    )))
}

fn eval_bool(ev: &mut Evaluator<'_>, arg: &Expr) -> Result<bool, CellValue> {
    ev.eval(arg).to_bool().map_err(CellValue::Error)
}

fn fn_and(ev: &mut Evaluator<'_>, args: &[Expr]) -> CellValue {
    if let Err(e) = arity("AND", args, 1, usize::MAX) {
        return e;
    }
    for arg in args {
        match eval_bool(ev, arg) {
            Ok(true) => {}
            Ok(false) => return CellValue::Boolean(false),
            Err(e) => return e,
        }
    }
    CellValue::Boolean(true)
}

fn fn_or(ev: &mut Evaluator<'_>, args: &[Expr]) -> CellValue {
    if let Err(e) = arity("OR", args, 1, usize::MAX) {
        return e;
    }
    for arg in args {
        match eval_bool(ev, arg) {
            Ok(true) => return CellValue::Boolean(true),
            Ok(false) => {}
            Err(e) => return e,
        }
    }
    CellValue::Boolean(false)
}

fn fn_not(ev: &mut Evaluator<'_>, args: &[Expr]) -> CellValue {
    if let Err(e) = arity("NOT", args, 1, 1) {
        return e;
    }
    match eval_bool(ev, &args[0]) {
        Ok(b) => CellValue::Boolean(!b),
        Err(e) => e,
    }
}

fn fn_xor(ev: &mut Evaluator<'_>, args: &[Expr]) -> CellValue {
    if let Err(e) = arity("XOR", args, 1, usize::MAX) {
        return e;
    }
    let mut odd = false;
    for arg in args {
        match eval_bool(ev, arg) {
            Ok(b) => odd ^= b,
            Err(e) => return e,
        }
    }
    CellValue::Boolean(odd)
}

fn fn_exact(ev: &mut Evaluator<'_>, args: &[Expr]) -> CellValue {
    if let Err(e) = arity("EXACT", args, 2, 2) {
        return e;
    }
    let lhs = ev.eval(&args[0]);
    let rhs = ev.eval(&args[1]);
    match (lhs.to_text(), rhs.to_text()) {
        (Ok(a), Ok(b)) => CellValue::Boolean(a == b),
        (Err(e), _) | (_, Err(e)) => CellValue::Error(e),
    }
}

fn fn_isblank(ev: &mut Evaluator<'_>, args: &[Expr]) -> CellValue {
    if let Err(e) = arity("ISBLANK", args, 1, 1) {
        return e;
    }
    CellValue::Boolean(matches!(ev.eval(&args[0]), CellValue::Empty))
}

fn fn_iserror(ev: &mut Evaluator<'_>, args: &[Expr]) -> CellValue {
    if let Err(e) = arity("ISERROR", args, 1, 1) {
        return e;
    }
    CellValue::Boolean(ev.eval(&args[0]).is_error())
}

fn fn_version(ev: &mut Evaluator<'_>, args: &[Expr]) -> CellValue {
    if let Err(e) = arity("VERSION", args, 0, 0) {
        return e;
    }
    CellValue::Text(ev.version())
}

fn fn_if(ev: &mut Evaluator<'_>, args: &[Expr]) -> CellValue {
    if let Err(e) = arity("IF", args, 2, 3) {
        return e;
    }
    let cond = match ev.eval_dynamic(&args[0]).to_bool() {
        Ok(b) => b,
        Err(e) => return CellValue::Error(e),
    };
    match (cond, args.get(2)) {
        (true, _) => ev.eval_dynamic(&args[1]),
        (false, Some(otherwise)) => ev.eval_dynamic(otherwise),
        (false, None) => CellValue::Boolean(false),
    }
}

fn fn_iferror(ev: &mut Evaluator<'_>, args: &[Expr]) -> CellValue {
    if let Err(e) = arity("IFERROR", args, 1, 2) {
        return e;
    }
    let value = ev.eval_dynamic(&args[0]);
    if !value.is_error() {
        return value;
    }
    match args.get(1) {
        Some(alt) => ev.eval_dynamic(alt),
        None => CellValue::Text(String::new()),
    }
}

fn fn_choose(ev: &mut Evaluator<'_>, args: &[Expr]) -> CellValue {
    if let Err(e) = arity("CHOOSE", args, 1, usize::MAX) {
        return e;
    }
    let index = match ev.eval_dynamic(&args[0]) {
        CellValue::Error(e) => return CellValue::Error(e),
        other => match other.to_number() {
            Ok(n) => n,
            Err(_) => return type_error("CHOOSE index must be a number"),
        },
    };
    if index.fract() != Decimal::ZERO {
        return type_error("CHOOSE index must be a whole number");
    }
    match index.to_usize() {
        Some(i) if i >= 1 && i < args.len() => ev.eval_dynamic(&args[i]),
        _ => type_error(format!("CHOOSE index {} out of range", index)),
    }
}

fn fn_indirect(ev: &mut Evaluator<'_>, args: &[Expr]) -> CellValue {
    if let Err(e) = arity("INDIRECT", args, 1, 1) {
        return e;
    }
    let text = match ev.eval_dynamic(&args[0]).to_text() {
        Ok(text) => text,
        Err(e) => return CellValue::Error(e),
    };
    match parse_reference(&text) {
        Some(reference) => ev.read_dynamic(&reference),
        None => CellValue::error(
            CellErrorType::BadReference,
            format!("{:?} is not a cell reference", text),
        ),
    }
}
