//! Row ordering for region sorts.

use std::cmp::Ordering;

use super::value::{CellValue, compare_values};

/// One sort key: a column offset within the region and its direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub column: usize,
    pub descending: bool,
}

fn rank(value: &CellValue) -> u8 {
    match value {
        CellValue::Empty => 0,
        CellValue::Error(_) => 1,
        CellValue::Number(_) => 2,
        CellValue::Text(_) => 3,
        CellValue::Boolean(_) => 4,
    }
}

/// Ascending order of two values within one key column.
///
/// Blanks sort first, then errors (by kind), numbers, text (ignoring case)
/// and booleans.
pub fn compare_for_sort(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Error(x), CellValue::Error(y)) => x.error_type.cmp(&y.error_type),
        _ if rank(a) == rank(b) => compare_values(a, b),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Compare two rows of key values. `a[i]` and `b[i]` belong to `keys[i]`.
pub fn compare_rows(a: &[CellValue], b: &[CellValue], keys: &[SortKey]) -> Ordering {
    for (i, key) in keys.iter().enumerate() {
        let (Some(x), Some(y)) = (a.get(i), b.get(i)) else {
            break;
        };
        let ord = compare_for_sort(x, y);
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
