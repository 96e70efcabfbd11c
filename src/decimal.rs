//! Exact Decimal Text
//!
//! Packed (BCD) and decimal floating point (DECF16, DECF34) values cross the
//! library boundary as text. These helpers move between that text and
//! [`dashu::Decimal`] without rounding, whatever the number of digits.

use dashu::{Decimal, Integer};

/// Significant digits of a decimal, trailing zeros folded into the exponent.
///
/// The value is `digits * 10^exponent`; zero has no digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digits {
    pub negative: bool,
    pub digits: String,
    pub exponent: isize,
}

impl Digits {
    pub fn of(value: &Decimal) -> Self {
        let repr = value.repr();
        let text = repr.significand().to_string();
        let (negative, all) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.as_str()),
        };
        let trimmed = all.trim_end_matches('0');
        if trimmed.is_empty() {
            return Digits {
                negative: false,
                digits: String::new(),
                exponent: 0,
            };
        }
        Digits {
            negative,
            digits: trimmed.to_string(),
            exponent: repr.exponent() + (all.len() - trimmed.len()) as isize,
        }
    }

    /// Number of significant digits
    pub fn precision(&self) -> usize {
        self.digits.len()
    }

    /// Digits after the decimal point
    pub fn scale(&self) -> usize {
        if self.exponent < 0 {
            self.exponent.unsigned_abs()
        } else {
            0
        }
    }

    /// Digits before the decimal point, leading zeros excluded
    pub fn integer_digits(&self) -> usize {
        let count = self.digits.len() as isize + self.exponent;
        if count > 0 {
            count as usize
        } else {
            0
        }
    }
}

/// Parse decimal text such as `-12.50`, `.5` or `1.5E+3` exactly.
///
/// Returns `None` for anything that is not a plain or exponent-form number.
pub fn parse(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(at) => (&text[..at], text[at + 1..].parse::<isize>().ok()?),
        None => (text, 0),
    };
    let (negative, unsigned) = match mantissa.as_bytes().first() {
        Some(b'-') => (true, &mantissa[1..]),
        Some(b'+') => (false, &mantissa[1..]),
        _ => (false, mantissa),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut significand: Integer = format!("{}{}", whole, fraction).parse().ok()?;
    if negative {
        significand = -significand;
    }
    let exponent = exponent.checked_sub(fraction.len() as isize)?;
    Some(Decimal::from_parts(significand, exponent))
}

/// Positional text of a decimal, never in exponent form
pub fn to_text(value: &Decimal) -> String {
    let Digits {
        negative,
        digits,
        exponent,
    } = Digits::of(value);
    if digits.is_empty() {
        return "0".to_string();
    }

    let mut out = String::with_capacity(digits.len() + exponent.unsigned_abs() + 2);
    if negative {
        out.push('-');
    }
    if exponent >= 0 {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take(exponent as usize));
        return out;
    }

    let point = digits.len() as isize + exponent;
    if point > 0 {
        let (whole, fraction) = digits.split_at(point as usize);
        out.push_str(whole);
        out.push('.');
        out.push_str(fraction);
    } else {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take(point.unsigned_abs()));
        out.push_str(&digits);
    }
    out
}

/// An integer as an exact decimal
pub fn from_int(value: i64) -> Decimal {
    Decimal::from_parts(Integer::from(value), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(text: &str) -> String {
        to_text(&parse(text).unwrap())
    }

    #[test]
    fn test_positional_text() {
        assert_eq!(round_trip("12.50"), "12.5");
        assert_eq!(round_trip("-0.0125"), "-0.0125");
        assert_eq!(round_trip("+7"), "7");
        assert_eq!(round_trip(".5"), "0.5");
        assert_eq!(round_trip("0.000"), "0");
        assert_eq!(round_trip("-0"), "0");
        assert_eq!(round_trip("1.5E+3"), "1500");
        assert_eq!(round_trip("25e-4"), "0.0025");
    }

    #[test]
    fn test_wide_values_keep_every_digit() {
        let bcd = "9999999999999999999999999999999";
        assert_eq!(round_trip(bcd), bcd);
        let decf34 = "0.1234567890123456789012345678901234";
        assert_eq!(round_trip(decf34), decf34);
        assert_eq!(round_trip("1E+40"), format!("1{}", "0".repeat(40)));
    }

    #[test]
    fn test_rejects_malformed_text() {
        for bad in ["", "-", ".", "12,5", "1.2.3", "1e", "abc", "1e+x"] {
            assert!(parse(bad).is_none(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn test_digit_counts() {
        let d = Digits::of(&parse("-123.4500").unwrap());
        assert!(d.negative);
        assert_eq!(d.digits, "12345");
        assert_eq!(d.precision(), 5);
        assert_eq!(d.scale(), 2);
        assert_eq!(d.integer_digits(), 3);

        let d = Digits::of(&parse("0.004").unwrap());
        assert_eq!((d.precision(), d.scale(), d.integer_digits()), (1, 3, 0));

        let d = Digits::of(&parse("1200").unwrap());
        assert_eq!((d.precision(), d.scale(), d.integer_digits()), (2, 0, 4));

        let d = Digits::of(&from_int(0));
        assert_eq!((d.precision(), d.scale(), d.integer_digits()), (0, 0, 0));
    }

    #[test]
    fn test_equal_values_compare_equal() {
        assert_eq!(parse("10.05"), parse("10.05"));
        assert_eq!(Digits::of(&parse("1.50").unwrap()), Digits::of(&parse("1.5").unwrap()));
        assert_eq!(to_text(&from_int(-42)), "-42");
    }
}
