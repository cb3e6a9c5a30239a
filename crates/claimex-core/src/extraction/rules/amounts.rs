//! Amount parsing and formatting for Vietnamese documents.
//!
//! Vietnamese documents group thousands with dots (`1.250.000`) and use a
//! comma for the rare fractional part (`1.250.000,50`). OCR output and
//! foreign templates also produce `1,250,000` and `1250000.50`.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// Parse an amount, tolerating currency markers and either separator style.
pub fn parse_vnd_amount(s: &str) -> Option<f64> {
    let filtered: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    let negative = filtered.starts_with('-');
    let cleaned: String = filtered.chars().filter(|c| *c != '-').collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // Both present: whichever comes last is the decimal separator
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => normalize_single_separator(&cleaned, ','),
        (None, Some(_)) => normalize_single_separator(&cleaned, '.'),
        (None, None) => cleaned,
    };

    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// A lone separator kind is grouping when it repeats or is followed by
/// exactly three digits; otherwise it marks decimals.
fn normalize_single_separator(s: &str, sep: char) -> String {
    let count = s.matches(sep).count();
    let tail_len = s.rsplit(sep).next().map(str::len).unwrap_or(0);

    if count > 1 || tail_len == 3 {
        s.replace(sep, "")
    } else {
        s.replace(sep, ".")
    }
}

/// Format an amount with dot grouping and a comma decimal separator
/// (e.g. `1.250.000` or `1.234,56`).
pub fn format_vnd_amount(amount: Decimal, fraction_digits: u32) -> String {
    let rounded = amount.round_dp(fraction_digits);
    let s = format!("{:.*}", fraction_digits as usize, rounded);

    let (sign, unsigned) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let (integer_part, decimal_part) = match unsigned.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (unsigned, None),
    };

    // Add thousand separators
    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    match decimal_part {
        Some(d) => format!("{}{},{}", sign, formatted, d),
        None => format!("{}{}", sign, formatted),
    }
}

/// Locale-style currency string: `1.250.000 ₫` for VND, `1.234,56 USD` otherwise.
pub fn format_currency(amount: f64, currency: &str) -> Option<String> {
    let amount = Decimal::from_f64(amount)?;
    let code = currency.trim().to_uppercase();

    Some(match code.as_str() {
        "VND" | "VNĐ" => format!("{} ₫", format_vnd_amount(amount, 0)),
        _ => format!("{} {}", format_vnd_amount(amount, 2), code),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_vnd_amount() {
        assert_eq!(parse_vnd_amount("1.250.000 vnđ"), Some(1250000.0));
        assert_eq!(parse_vnd_amount("1,250,000"), Some(1250000.0));
        assert_eq!(parse_vnd_amount("150.000"), Some(150000.0));
        assert_eq!(parse_vnd_amount("1.250.000,50"), Some(1250000.5));
        assert_eq!(parse_vnd_amount("1,250,000.50"), Some(1250000.5));
        assert_eq!(parse_vnd_amount("12,5"), Some(12.5));
        assert_eq!(parse_vnd_amount("1.5"), Some(1.5));
        assert_eq!(parse_vnd_amount("-300.000đ"), Some(-300000.0));
        assert_eq!(parse_vnd_amount("đồng"), None);
    }

    #[test]
    fn test_format_vnd_amount() {
        let amount = Decimal::from_str("1250000").unwrap();
        assert_eq!(format_vnd_amount(amount, 0), "1.250.000");

        let amount = Decimal::from_str("1234.56").unwrap();
        assert_eq!(format_vnd_amount(amount, 2), "1.234,56");

        let amount = Decimal::from_str("-999").unwrap();
        assert_eq!(format_vnd_amount(amount, 0), "-999");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1250000.0, "VND").unwrap(), "1.250.000 ₫");
        assert_eq!(format_currency(99.5, "usd").unwrap(), "99,50 USD");
    }
}
