use rust_decimal::Decimal;

use super::value::CellValue;

/// Format a value for display and for text coercion.
pub fn format_value(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Number(n) => format_number(n),
        CellValue::Text(s) => s.clone(),
        CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        CellValue::Error(e) => e.error_type.as_code().to_string(),
    }
}

/// Format a number without trailing fractional zeros.
pub fn format_number(n: &Decimal) -> String {
    if n.is_zero() {
        "0".to_string()
    } else {
        n.normalize().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_number_strips_trailing_zeros() {
        assert_eq!(format_number(&Decimal::from_str("5.00").unwrap()), "5");
        assert_eq!(format_number(&Decimal::from_str("-0.0").unwrap()), "0");
        assert_eq!(format_number(&Decimal::from_str("12.50").unwrap()), "12.5");
        assert_eq!(format_number(&Decimal::from_str("100").unwrap()), "100");
    }
}
