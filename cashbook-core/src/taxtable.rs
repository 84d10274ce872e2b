//! Tax tables
//!
//! A tax table holds one or more entries, each charging a percentage or
//! an absolute value into a destination account. Tables may form an
//! inheritance chain through the parent reference.

use serde::{Deserialize, Serialize};

use cashbook_math::Fraction;

use crate::error::{BookError, BookResult};
use crate::guid::Guid;

/// How a tax table entry's amount is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxBasis {
    /// Amount is a percentage of the taxed value
    Percent,
    /// Amount is an absolute value
    Value,
}

impl TaxBasis {
    /// The XML string form
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxBasis::Percent => "PERCENT",
            TaxBasis::Value => "VALUE",
        }
    }

    /// Parse the XML string form
    pub fn parse(s: &str) -> BookResult<Self> {
        Ok(match s {
            "PERCENT" => TaxBasis::Percent,
            "VALUE" => TaxBasis::Value,
            other => return Err(BookError::Schema(format!("unknown tax basis: {other}"))),
        })
    }
}

/// One line of a tax table
#[derive(Debug, Clone, PartialEq)]
pub struct TaxTableEntry {
    /// Account the tax amount posts to
    pub account: Guid,
    /// Percentage or absolute amount, per `basis`
    pub amount: Fraction,
    /// How `amount` is applied
    pub basis: TaxBasis,
}

/// A tax table
#[derive(Debug, Clone, PartialEq)]
pub struct TaxTable {
    /// Tax table identifier
    pub id: Guid,
    /// Display name
    pub name: String,
    /// Number of entities referencing this table
    pub refcount: i64,
    /// Whether the table is hidden from pickers
    pub invisible: bool,
    /// Parent table in an inheritance chain
    pub parent: Option<Guid>,
    /// Entries of this table
    pub entries: Vec<TaxTableEntry>,
}

impl TaxTable {
    /// Create an empty tax table
    pub fn new(id: Guid, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), refcount: 0, invisible: false, parent: None, entries: Vec::new() }
    }

    /// Sum of percentage-basis amounts across entries
    pub fn percent_sum(&self) -> BookResult<Fraction> {
        let mut sum = Fraction::zero();
        for entry in self.entries.iter().filter(|e| e.basis == TaxBasis::Percent) {
            sum = sum.checked_add(&entry.amount)?;
        }
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_round_trip() {
        assert_eq!(TaxBasis::parse("PERCENT").unwrap(), TaxBasis::Percent);
        assert_eq!(TaxBasis::parse("VALUE").unwrap(), TaxBasis::Value);
        assert!(TaxBasis::parse("RATIO").is_err());
    }

    #[test]
    fn test_percent_sum() {
        let mut table = TaxTable::new(Guid::generate(), "VAT 19%");
        table.entries.push(TaxTableEntry {
            account: Guid::generate(),
            amount: Fraction::parse("19/1").unwrap(),
            basis: TaxBasis::Percent,
        });
        table.entries.push(TaxTableEntry {
            account: Guid::generate(),
            amount: Fraction::parse("5/1").unwrap(),
            basis: TaxBasis::Value,
        });
        assert_eq!(table.percent_sum().unwrap(), Fraction::parse("19/1").unwrap());
    }
}
