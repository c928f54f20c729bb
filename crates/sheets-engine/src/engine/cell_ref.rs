//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style cell references
//! (e.g., "A1", "$B2", "AA$100") and zero-indexed column/row coordinates.
//!
//! Valid locations span columns `A..=ZZZZ` and rows `1..=9999`.
//!
//! # Examples
//!
//! ```ignore
//! let cell = CellRef::from_str("B3").unwrap();
//! assert_eq!(cell.col, 1);  // 0-indexed
//! assert_eq!(cell.row, 2);
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Highest valid column, 1-based (`ZZZZ`).
pub const MAX_COL: usize = 475_254;
/// Highest valid row, 1-based.
pub const MAX_ROW: usize = 9_999;

/// A reference to a cell by column and row indices (0-indexed).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

/// A cell reference as written in a formula, keeping its `$` anchors.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct AnchoredRef {
    pub cell: CellRef,
    pub abs_col: bool,
    pub abs_row: bool,
}

impl CellRef {
    pub fn new(col: usize, row: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell reference from spreadsheet notation (e.g., "A1", "$B$2", "aa10").
    /// Returns None if the input is invalid or outside the sheet bounds.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        AnchoredRef::parse(name).map(|r| r.cell)
    }

    /// Whether `col`/`row` (0-indexed) fall inside the addressable grid.
    pub fn in_bounds(col: usize, row: usize) -> bool {
        col < MAX_COL && row < MAX_ROW
    }

    /// Shift by a signed delta; `None` when the result leaves the grid.
    pub fn offset(&self, delta_col: isize, delta_row: isize) -> Option<CellRef> {
        let col = self.col.checked_add_signed(delta_col)?;
        let row = self.row.checked_add_signed(delta_row)?;
        Self::in_bounds(col, row).then(|| CellRef::new(col, row))
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }
}

impl AnchoredRef {
    /// Parse `$?letters$?digits`, rejecting out-of-bounds locations.
    pub fn parse(name: &str) -> Option<AnchoredRef> {
        let caps = a1_re().captures(name)?;
        let letters = &caps["letters"];
        let numbers = &caps["numbers"];

        let mut col_acc = 0usize;
        for c in letters.to_ascii_uppercase().bytes() {
            let digit = (c - b'A') as usize + 1;
            col_acc = col_acc.checked_mul(26)?.checked_add(digit)?;
        }
        let col = col_acc.checked_sub(1)?;
        let row = numbers.parse::<usize>().ok()?.checked_sub(1)?;
        if !CellRef::in_bounds(col, row) {
            return None;
        }

        Some(AnchoredRef {
            cell: CellRef::new(col, row),
            abs_col: caps.name("col_anchor").is_some(),
            abs_row: caps.name("row_anchor").is_some(),
        })
    }

    /// Shift the unanchored components. Anchored components stay put.
    pub fn offset(&self, delta_col: isize, delta_row: isize) -> Option<AnchoredRef> {
        let dc = if self.abs_col { 0 } else { delta_col };
        let dr = if self.abs_row { 0 } else { delta_row };
        Some(AnchoredRef {
            cell: self.cell.offset(dc, dr)?,
            ..*self
        })
    }
}

/// True when `text` has the shape of a location, whether or not it is in bounds.
pub fn looks_like_location(text: &str) -> bool {
    a1_re().is_match(text)
}

fn a1_re() -> &'static Regex {
    static A1_RE: OnceLock<Regex> = OnceLock::new();
    A1_RE.get_or_init(|| {
        Regex::new(r"^(?<col_anchor>\$)?(?<letters>[A-Za-z]+)(?<row_anchor>\$)?(?<numbers>[0-9]+)$")
            .expect("A1 location regex must compile")
    })
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellRef::from_str(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellRef::col_to_letters(self.col), self.row + 1)
    }
}

impl fmt::Display for AnchoredRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let col_anchor = if self.abs_col { "$" } else { "" };
        let row_anchor = if self.abs_row { "$" } else { "" };
        write!(
            f,
            "{}{}{}{}",
            col_anchor,
            CellRef::col_to_letters(self.cell.col),
            row_anchor,
            self.cell.row + 1
        )
    }
}
