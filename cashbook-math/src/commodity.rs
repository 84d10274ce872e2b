//! Commodity identity and conversion-factor table
//!
//! A commodity is identified by a namespace plus a code, e.g.
//! `ISO4217:EUR` for a currency or `EUREX:SAP` for a listed security.
//! The currency table holds per-commodity conversion factors used when
//! amounts in different commodities need a common measure.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fraction::Fraction;

/// Namespace for ISO 4217 currency codes
pub const NAMESPACE_CURRENCY: &str = "ISO4217";

/// Identity of a commodity: namespace plus code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommodityId {
    /// Namespace, e.g. `ISO4217` or an exchange name
    pub namespace: String,
    /// Ticker or currency code, e.g. `EUR`
    pub code: String,
}

impl CommodityId {
    /// Create an identity from namespace and code
    pub fn new(namespace: impl Into<String>, code: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), code: code.into() }
    }

    /// Identity of an ISO 4217 currency
    pub fn currency(code: impl Into<String>) -> Self {
        Self::new(NAMESPACE_CURRENCY, code)
    }

    /// Whether this commodity is an ISO 4217 currency
    pub fn is_currency(&self) -> bool {
        self.namespace == NAMESPACE_CURRENCY || self.namespace == "CURRENCY"
    }
}

impl fmt::Display for CommodityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.code)
    }
}

/// A commodity known to a book
///
/// `fraction` is the smallest representable subunit divisor, e.g. 100
/// for a currency with cents. The quote fields carry the online-quote
/// configuration verbatim for round-tripping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commodity {
    /// Identity of this commodity
    pub id: CommodityId,
    /// Display name, e.g. `US Dollar`
    pub name: Option<String>,
    /// Smallest representable subunit divisor
    pub fraction: i64,
    /// Exchange-specific code, e.g. an ISIN
    pub exchange_code: Option<String>,
    /// Whether online quotes are fetched for this commodity
    pub get_quotes: bool,
    /// Online quote source, e.g. `currency` or `yahoo`
    pub quote_source: Option<String>,
    /// Online quote timezone, kept verbatim
    pub quote_tz: Option<String>,
}

impl Commodity {
    /// Create a commodity with the given identity and subunit fraction
    pub fn new(id: CommodityId, fraction: i64) -> Self {
        Self {
            id,
            name: None,
            fraction,
            exchange_code: None,
            get_quotes: false,
            quote_source: None,
            quote_tz: None,
        }
    }

    /// Create an ISO 4217 currency with the conventional fraction of 100
    pub fn iso_currency(code: impl Into<String>) -> Self {
        Self::new(CommodityId::currency(code), 100)
    }
}

/// Conversion factors between commodities
///
/// Factors are expressed relative to a common base (the book's default
/// currency by convention). Converting between two commodities divides
/// the source factor by the destination factor.
#[derive(Debug, Clone, Default)]
pub struct CurrencyTable {
    factors: HashMap<CommodityId, Fraction>,
}

impl CurrencyTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the conversion factor for a commodity
    pub fn set_factor(&mut self, id: CommodityId, factor: Fraction) {
        self.factors.insert(id, factor);
    }

    /// Get the conversion factor for a commodity, if known
    pub fn factor(&self, id: &CommodityId) -> Option<&Fraction> {
        self.factors.get(id)
    }

    /// Convert an amount from one commodity to another
    ///
    /// Returns `None` when either factor is unknown or zero; the caller
    /// decides whether that is an error.
    pub fn convert(&self, amount: &Fraction, from: &CommodityId, to: &CommodityId) -> Option<Fraction> {
        if from == to {
            return Some(*amount);
        }
        let from_factor = self.factor(from)?;
        let to_factor = self.factor(to)?;
        if to_factor.is_zero() {
            return None;
        }
        let inverted =
            Fraction::new(to_factor.denominator(), to_factor.numerator()).ok()?;
        amount.checked_mul(from_factor).ok()?.checked_mul(&inverted).ok()
    }

    /// Number of commodities with a known factor
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commodity_id_display() {
        let id = CommodityId::currency("EUR");
        assert_eq!(id.to_string(), "ISO4217:EUR");
        assert!(id.is_currency());
        assert!(!CommodityId::new("EUREX", "SAP").is_currency());
    }

    #[test]
    fn test_iso_currency_defaults() {
        let eur = Commodity::iso_currency("EUR");
        assert_eq!(eur.fraction, 100);
        assert_eq!(eur.id.code, "EUR");
    }

    #[test]
    fn test_convert_identity() {
        let table = CurrencyTable::new();
        let eur = CommodityId::currency("EUR");
        let amount = Fraction::parse("100/1").unwrap();
        assert_eq!(table.convert(&amount, &eur, &eur), Some(amount));
    }

    #[test]
    fn test_convert_through_factors() {
        let mut table = CurrencyTable::new();
        let eur = CommodityId::currency("EUR");
        let usd = CommodityId::currency("USD");
        table.set_factor(eur.clone(), Fraction::from_int(1));
        // 1 USD = 4/5 EUR
        table.set_factor(usd.clone(), Fraction::new(4, 5).unwrap());

        let amount = Fraction::parse("10/1").unwrap();
        let in_eur = table.convert(&amount, &usd, &eur).unwrap();
        assert_eq!(in_eur, Fraction::from_int(8));

        let back = table.convert(&in_eur, &eur, &usd).unwrap();
        assert_eq!(back, Fraction::from_int(10));
    }

    #[test]
    fn test_convert_unknown_pair() {
        let table = CurrencyTable::new();
        let amount = Fraction::from_int(1);
        let eur = CommodityId::currency("EUR");
        let usd = CommodityId::currency("USD");
        assert_eq!(table.convert(&amount, &eur, &usd), None);
    }
}
