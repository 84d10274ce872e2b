//! Fixed-point rational arithmetic matching GnuCash's `N/D` encoding
//!
//! This module implements the Fraction type which stores an exact
//! numerator/denominator pair. The textual form of a parsed value is
//! preserved verbatim (no reduction on parse), so a value read from a
//! book serializes back byte-identically.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Neg;
use std::str::FromStr;

use num_integer::Integer;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during fraction operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FractionError {
    #[error("Denominator must not be zero")]
    ZeroDenominator,
    #[error("Cannot parse fraction from string: {0}")]
    Parse(String),
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Value {0} has no exact representation on denominator {1}")]
    Inexact(String, i64),
}

/// Result type for fraction operations
pub type FractionResult<T> = Result<T, FractionError>;

// Currency entities and glyphs stripped before locale parsing.
static CURRENCY_GLYPHS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&euro;|&pound;|[€£$\u{00a0}\s]").expect("static pattern"));

/// An exact rational number with the GnuCash `N/D` string form
///
/// The denominator a value was constructed with is kept as-is; arithmetic
/// on two fractions uses the least common denominator, and products are
/// reduced to lowest terms. Equality and ordering compare the represented
/// value, not the textual form.
#[derive(Debug, Clone, Copy)]
pub struct Fraction {
    num: i64,
    den: i64,
}

impl Fraction {
    /// Create a fraction from a numerator and a non-zero denominator
    ///
    /// A negative denominator is normalized onto the numerator.
    pub fn new(num: i64, den: i64) -> FractionResult<Self> {
        if den == 0 {
            return Err(FractionError::ZeroDenominator);
        }
        if den < 0 {
            let num = num.checked_neg().ok_or(FractionError::Overflow)?;
            let den = den.checked_neg().ok_or(FractionError::Overflow)?;
            Ok(Self { num, den })
        } else {
            Ok(Self { num, den })
        }
    }

    /// The canonical zero value `0/1`
    pub fn zero() -> Self {
        Self { num: 0, den: 1 }
    }

    /// Create an integral fraction `n/1`
    pub fn from_int(num: i64) -> Self {
        Self { num, den: 1 }
    }

    /// Parse the canonical GnuCash form `"N/D"`
    ///
    /// A bare integer `"N"` is accepted as `N/1`.
    pub fn parse(value_str: &str) -> FractionResult<Self> {
        let trimmed = value_str.trim();
        let (num_str, den_str) = match trimmed.split_once('/') {
            Some((n, d)) => (n, d),
            None => (trimmed, "1"),
        };
        let num =
            num_str.parse::<i64>().map_err(|_| FractionError::Parse(value_str.to_string()))?;
        let den =
            den_str.parse::<i64>().map_err(|_| FractionError::Parse(value_str.to_string()))?;
        Self::new(num, den)
    }

    /// Parse a locale-formatted decimal string
    ///
    /// Currency entities (`&euro;`, `&pound;`) and glyphs are stripped
    /// first. The canonical `N/D` form is tried next, then a plain
    /// decimal, then the comma-decimal convention (`1.234,56`). When both
    /// separators appear, the last one wins as the decimal point.
    pub fn parse_decimal(value_str: &str) -> FractionResult<Self> {
        let cleaned = CURRENCY_GLYPHS.replace_all(value_str, "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return Err(FractionError::Parse(value_str.to_string()));
        }
        if cleaned.contains('/') {
            return Self::parse(cleaned);
        }

        let has_comma = cleaned.contains(',');
        let has_dot = cleaned.contains('.');
        let normalized = if has_comma && has_dot {
            let comma_last = cleaned.rfind(',') > cleaned.rfind('.');
            if comma_last {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        } else if has_comma {
            cleaned.replace(',', ".")
        } else {
            cleaned.to_string()
        };

        let decimal = Decimal::from_str(&normalized)
            .map_err(|_| FractionError::Parse(value_str.to_string()))?;
        Self::from_decimal(decimal)
    }

    /// Create a fraction from a `rust_decimal::Decimal`
    ///
    /// The mantissa becomes the numerator and `10^scale` the denominator,
    /// so `123.45` becomes `12345/100` with no precision loss.
    pub fn from_decimal(decimal: Decimal) -> FractionResult<Self> {
        let num = decimal.mantissa();
        let den = 10_i128
            .checked_pow(decimal.scale())
            .ok_or(FractionError::Overflow)?;
        Self::from_i128(num, den)
    }

    // Narrow an i128 pair back to i64, reducing only when it would
    // otherwise overflow.
    fn from_i128(mut num: i128, mut den: i128) -> FractionResult<Self> {
        debug_assert!(den > 0);
        if !fits_i64(num) || !fits_i64(den) {
            let g = num.gcd(&den);
            if g > 1 {
                num /= g;
                den /= g;
            }
        }
        if fits_i64(num) && fits_i64(den) {
            Ok(Self { num: num as i64, den: den as i64 })
        } else {
            Err(FractionError::Overflow)
        }
    }

    /// Numerator
    pub fn numerator(&self) -> i64 {
        self.num
    }

    /// Denominator (always positive)
    pub fn denominator(&self) -> i64 {
        self.den
    }

    /// Check whether the represented value is zero
    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    /// Sign of the value: -1, 0 or 1
    pub fn sign(&self) -> i32 {
        match self.num.cmp(&0) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    /// Absolute value
    pub fn abs(&self) -> Self {
        Self { num: self.num.abs(), den: self.den }
    }

    /// Negated value
    pub fn negated(&self) -> Self {
        Self { num: -self.num, den: self.den }
    }

    /// Add another fraction, keeping the least common denominator
    pub fn checked_add(&self, other: &Fraction) -> FractionResult<Self> {
        let d1 = self.den as i128;
        let d2 = other.den as i128;
        let den = d1.lcm(&d2);
        let num = (self.num as i128) * (den / d1) + (other.num as i128) * (den / d2);
        Self::from_i128(num, den)
    }

    /// Subtract another fraction, keeping the least common denominator
    pub fn checked_sub(&self, other: &Fraction) -> FractionResult<Self> {
        self.checked_add(&other.negated())
    }

    /// Multiply by another fraction, reducing the result to lowest terms
    pub fn checked_mul(&self, other: &Fraction) -> FractionResult<Self> {
        let num = (self.num as i128) * (other.num as i128);
        let den = (self.den as i128) * (other.den as i128);
        let g = num.gcd(&den);
        if g > 1 {
            Self::from_i128(num / g, den / g)
        } else {
            Self::from_i128(num, den)
        }
    }

    /// Divide by a non-zero integer, reducing the result to lowest terms
    pub fn checked_div_int(&self, divisor: i64) -> FractionResult<Self> {
        if divisor == 0 {
            return Err(FractionError::ZeroDenominator);
        }
        self.checked_mul(&Self::new(1, divisor)?)
    }

    /// Reciprocal value; fails on zero
    pub fn recip(&self) -> FractionResult<Self> {
        Self::new(self.den, self.num)
    }

    /// Re-express the value on the given denominator
    ///
    /// Fails with [`FractionError::Inexact`] when the value cannot be
    /// represented exactly, e.g. `1/3` on denominator 100.
    pub fn with_denominator(&self, den: i64) -> FractionResult<Self> {
        if den <= 0 {
            return Err(FractionError::ZeroDenominator);
        }
        let scaled = (self.num as i128) * (den as i128);
        if scaled % (self.den as i128) != 0 {
            return Err(FractionError::Inexact(self.to_string(), den));
        }
        Self::from_i128(scaled / (self.den as i128), den as i128)
    }

    /// Reduce to lowest terms
    pub fn reduced(&self) -> Self {
        let g = self.num.gcd(&self.den);
        if g > 1 {
            Self { num: self.num / g, den: self.den / g }
        } else {
            *self
        }
    }

    /// Approximate value as f64, for diagnostics only
    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

fn fits_i64(v: i128) -> bool {
    v >= i64::MIN as i128 && v <= i64::MAX as i128
}

impl Default for Fraction {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialEq for Fraction {
    fn eq(&self, other: &Self) -> bool {
        (self.num as i128) * (other.den as i128) == (other.num as i128) * (self.den as i128)
    }
}

impl Eq for Fraction {}

impl Hash for Fraction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash the reduced form so equal values hash equally
        let reduced = self.reduced();
        reduced.num.hash(state);
        reduced.den.hash(state);
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = (self.num as i128) * (other.den as i128);
        let rhs = (other.num as i128) * (self.den as i128);
        lhs.cmp(&rhs)
    }
}

impl Neg for Fraction {
    type Output = Fraction;

    fn neg(self) -> Self::Output {
        self.negated()
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl FromStr for Fraction {
    type Err = FractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Fraction {
    type Error = FractionError;

    fn try_from(value: &str) -> FractionResult<Self> {
        Self::parse(value)
    }
}

impl From<i64> for Fraction {
    fn from(value: i64) -> Self {
        Self::from_int(value)
    }
}

// Serialize as the canonical string form so the denominator survives.
impl Serialize for Fraction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Fraction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical() {
        let f = Fraction::parse("1234/100").unwrap();
        assert_eq!(f.numerator(), 1234);
        assert_eq!(f.denominator(), 100);
    }

    #[test]
    fn test_parse_bare_integer() {
        let f = Fraction::parse("42").unwrap();
        assert_eq!(f.numerator(), 42);
        assert_eq!(f.denominator(), 1);
    }

    #[test]
    fn test_parse_preserves_denominator() {
        // No reduction on parse: the textual form round-trips verbatim.
        let f = Fraction::parse("23800/100").unwrap();
        assert_eq!(f.to_string(), "23800/100");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(Fraction::parse("abc"), Err(FractionError::Parse(_))));
        assert!(matches!(Fraction::parse("1/0"), Err(FractionError::ZeroDenominator)));
    }

    #[test]
    fn test_negative_denominator_normalized() {
        let f = Fraction::new(5, -10).unwrap();
        assert_eq!(f.numerator(), -5);
        assert_eq!(f.denominator(), 10);
    }

    #[test]
    fn test_value_equality_ignores_form() {
        assert_eq!(Fraction::parse("1/2").unwrap(), Fraction::parse("50/100").unwrap());
        assert_eq!(Fraction::parse("0/100").unwrap(), Fraction::zero());
        assert_ne!(Fraction::parse("1/2").unwrap(), Fraction::parse("1/3").unwrap());
    }

    #[test]
    fn test_add_keeps_common_denominator() {
        let a = Fraction::parse("1/2").unwrap();
        let b = Fraction::parse("1/3").unwrap();
        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum.to_string(), "5/6");

        let c = Fraction::parse("100/100").unwrap();
        let d = Fraction::parse("138/100").unwrap();
        assert_eq!(c.checked_add(&d).unwrap().to_string(), "238/100");
    }

    #[test]
    fn test_sub_and_negate() {
        let a = Fraction::parse("238/100").unwrap();
        let diff = a.checked_sub(&a).unwrap();
        assert!(diff.is_zero());
        assert_eq!(a.negated().numerator(), -238);
    }

    #[test]
    fn test_mul_reduces() {
        let qty = Fraction::parse("2/1").unwrap();
        let price = Fraction::parse("100/1").unwrap();
        assert_eq!(qty.checked_mul(&price).unwrap().to_string(), "200/1");

        let net = Fraction::parse("200/1").unwrap();
        let pct = Fraction::parse("19/1").unwrap();
        let tax = net.checked_mul(&pct).unwrap().checked_div_int(100).unwrap();
        assert_eq!(tax.to_string(), "38/1");
    }

    #[test]
    fn test_ordering() {
        let a = Fraction::parse("1/2").unwrap();
        let b = Fraction::parse("2/3").unwrap();
        assert!(a < b);
        assert!(Fraction::parse("-1/2").unwrap() < Fraction::zero());
    }

    #[test]
    fn test_with_denominator() {
        let f = Fraction::parse("238/1").unwrap();
        assert_eq!(f.with_denominator(100).unwrap().to_string(), "23800/100");
        assert!(matches!(
            Fraction::parse("1/3").unwrap().with_denominator(100),
            Err(FractionError::Inexact(_, 100))
        ));
    }

    #[test]
    fn test_parse_decimal_dot() {
        let f = Fraction::parse_decimal("123.45").unwrap();
        assert_eq!(f.to_string(), "12345/100");
    }

    #[test]
    fn test_parse_decimal_comma() {
        let f = Fraction::parse_decimal("1.234,56").unwrap();
        assert_eq!(f.to_string(), "123456/100");
        let g = Fraction::parse_decimal("1,5").unwrap();
        assert_eq!(g.to_string(), "15/10");
    }

    #[test]
    fn test_parse_decimal_strips_currency_glyphs() {
        assert_eq!(Fraction::parse_decimal("&euro; 12,50").unwrap().to_string(), "1250/100");
        assert_eq!(Fraction::parse_decimal("&pound;3.99").unwrap().to_string(), "399/100");
        assert_eq!(Fraction::parse_decimal("€ 100").unwrap().to_string(), "100/1");
        assert_eq!(Fraction::parse_decimal("$ 1,234.56").unwrap().to_string(), "123456/100");
    }

    #[test]
    fn test_parse_decimal_failure_propagates() {
        assert!(matches!(Fraction::parse_decimal("€ abc"), Err(FractionError::Parse(_))));
        assert!(matches!(Fraction::parse_decimal(""), Err(FractionError::Parse(_))));
    }

    #[test]
    fn test_string_round_trip() {
        for s in ["0/1", "-7/2", "23800/100", "1/3", "9223372036854775807/1"] {
            let f = Fraction::parse(s).unwrap();
            assert_eq!(Fraction::parse(&f.to_string()).unwrap(), f);
            assert_eq!(f.to_string(), s);
        }
    }

    #[test]
    fn test_overflow_reduces_before_failing() {
        let a = Fraction::new(i64::MAX, 2).unwrap();
        let b = Fraction::new(1, 2).unwrap();
        // lcm keeps the denominator at 2; the numerator sum overflows i64
        // but reduces back into range.
        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum.numerator(), i64::MAX / 2 + 1);
        assert_eq!(sum.denominator(), 1);
    }

    #[test]
    fn test_serde_string_form() {
        let f = Fraction::parse("23800/100").unwrap();
        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(json, "\"23800/100\"");
        let back: Fraction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), "23800/100");
    }
}
