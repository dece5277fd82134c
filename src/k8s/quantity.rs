//! Kubernetes resource quantity parsing
//!
//! Quantities are a signed decimal mantissa followed by an optional scale
//! suffix, e.g. `"200Mi"`, `"500m"`, `"12345678n"` or `"4"`. Values are
//! returned as exact [`Decimal`]s so nanocores and exabytes both survive
//! without rounding.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("invalid quantity {0:?}: no numeric mantissa")]
    Mantissa(String),

    #[error("invalid quantity {quantity:?}: unknown suffix {suffix:?}")]
    Suffix { quantity: String, suffix: String },

    #[error("invalid quantity {0:?}: value out of range")]
    Overflow(String),
}

/// Binary (base 1024) suffixes and their exponent
const BINARY_SUFFIXES: [(&str, u32); 6] =
    [("Ki", 1), ("Mi", 2), ("Gi", 3), ("Ti", 4), ("Pi", 5), ("Ei", 6)];

/// Decimal (base 1000) suffixes and their power of ten
const DECIMAL_SUFFIXES: [(&str, i32); 10] = [
    ("n", -9),
    ("u", -6),
    ("m", -3),
    ("", 0),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

/// Parse a quantity string into its exact decimal value
///
/// Examples:
/// - `"200Mi"` -> `209715200`
/// - `"500m"` -> `0.5`
/// - `"1Ki"` -> `1024`
/// - `"1e3"` -> `1000`
///
/// # Errors
///
/// Returns `QuantityError` when `text` does not match the quantity grammar
/// or the scaled value does not fit in a `Decimal`.
pub fn parse(text: &str) -> Result<Decimal, QuantityError> {
    let (mantissa, exponent, suffix) = split(text)?;
    let overflow = || QuantityError::Overflow(text.to_string());

    let mut value = parse_mantissa(mantissa).ok_or_else(|| QuantityError::Mantissa(text.to_string()))?;
    if let Some(exponent) = exponent {
        value = scale_by_ten(value, exponent).ok_or_else(overflow)?;
    }

    if let Some((_, power)) = BINARY_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
        let factor = Decimal::from(1_u64 << (10 * power));
        return value.checked_mul(factor).ok_or_else(overflow);
    }

    match DECIMAL_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
        Some((_, power)) => scale_by_ten(value, *power).ok_or_else(overflow),
        None => Err(QuantityError::Suffix {
            quantity: text.to_string(),
            suffix: suffix.to_string(),
        }),
    }
}

/// Split `text` into mantissa, optional `e` exponent, and suffix
fn split(text: &str) -> Result<(&str, Option<i32>, &str), QuantityError> {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let mut digits = 0;
    let mut dots = 0;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' if dots == 0 => dots += 1,
            _ => break,
        }
        end += 1;
    }
    if digits == 0 {
        return Err(QuantityError::Mantissa(text.to_string()));
    }
    let mantissa = &text[..end];
    let rest = &text[end..];

    // Lowercase `e` followed by an integer is an exponent; uppercase `E` is the exa suffix
    if let Some(exp) = rest.strip_prefix('e') {
        let exp_digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if !exp_digits.is_empty() && exp_digits.bytes().all(|b| b.is_ascii_digit()) {
            let exponent = exp
                .parse::<i32>()
                .map_err(|_| QuantityError::Overflow(text.to_string()))?;
            return Ok((mantissa, Some(exponent), ""));
        }
    }

    Ok((mantissa, None, rest))
}

fn parse_mantissa(mantissa: &str) -> Option<Decimal> {
    let (negative, unsigned) = match mantissa.as_bytes().first() {
        Some(b'-') => (true, &mantissa[1..]),
        Some(b'+') => (false, &mantissa[1..]),
        _ => (false, mantissa),
    };
    let unsigned = unsigned.strip_suffix('.').unwrap_or(unsigned);
    let value = if unsigned.starts_with('.') {
        Decimal::from_str(&format!("0{unsigned}")).ok()?
    } else {
        Decimal::from_str(unsigned).ok()?
    };
    Some(if negative { -value } else { value })
}

fn scale_by_ten(value: Decimal, power: i32) -> Option<Decimal> {
    if power >= 0 {
        let mut scaled = value;
        for _ in 0..power {
            scaled = scaled.checked_mul(Decimal::TEN)?;
        }
        Some(scaled)
    } else {
        let mut scaled = value;
        for _ in 0..power.unsigned_abs() {
            if scaled.is_zero() {
                break;
            }
            scaled = scaled.checked_div(Decimal::TEN)?;
        }
        Some(scaled)
    }
}
