//! Transactions and splits
//!
//! A transaction owns its splits; split order is insertion order and is
//! significant for a faithful round-trip. Split account and lot fields
//! are GUID references resolved through the book.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use cashbook_math::{CommodityId, Fraction};

use crate::error::{BookError, BookResult};
use crate::guid::Guid;
use crate::slots::{Slot, SlotHolder};

/// Timestamp format used throughout the XML dialect
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Reconciliation state of a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Reconciled {
    /// Not reconciled
    #[default]
    No,
    /// Cleared
    Cleared,
    /// Reconciled
    Yes,
    /// Frozen
    Frozen,
    /// Voided
    Voided,
}

impl Reconciled {
    /// The single-character XML form
    pub fn as_str(&self) -> &'static str {
        match self {
            Reconciled::No => "n",
            Reconciled::Cleared => "c",
            Reconciled::Yes => "y",
            Reconciled::Frozen => "f",
            Reconciled::Voided => "v",
        }
    }

    /// Parse the single-character XML form
    pub fn parse(s: &str) -> BookResult<Self> {
        Ok(match s {
            "n" => Reconciled::No,
            "c" => Reconciled::Cleared,
            "y" => Reconciled::Yes,
            "f" => Reconciled::Frozen,
            "v" => Reconciled::Voided,
            other => {
                return Err(BookError::Schema(format!("unknown reconciled state: {other}")))
            }
        })
    }
}

/// Controlled action tags a split may carry
///
/// The field itself is free-form; these are the values the mutation
/// layer writes.
pub mod split_action {
    /// Payment leg of an invoice settlement
    pub const PAYMENT: &str = "Payment";
    /// Posting leg of a customer invoice
    pub const INVOICE: &str = "Invoice";
    /// Posting leg of a vendor bill
    pub const BILL: &str = "Bill";
    /// Security purchase
    pub const BUY: &str = "Buy";
    /// Security sale
    pub const SELL: &str = "Sell";
}

/// One debit/credit leg of a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// Split identifier
    pub id: Guid,
    /// Free-form memo
    pub memo: Option<String>,
    /// Action tag, free-form or one of [`split_action`]
    pub action: Option<String>,
    /// Reconciliation state
    pub reconciled: Reconciled,
    /// Amount in the transaction currency
    pub value: Fraction,
    /// Amount in the account commodity; equals `value` when they match
    pub quantity: Fraction,
    /// Account this split posts to
    pub account: Guid,
    /// Lot this split settles into, if any
    pub lot: Option<Guid>,
}

impl Split {
    /// Create a split posting `value` to the given account
    ///
    /// Quantity starts equal to value, the common same-currency case.
    pub fn new(id: Guid, account: Guid, value: Fraction) -> Self {
        Self {
            id,
            memo: None,
            action: None,
            reconciled: Reconciled::No,
            value,
            quantity: value,
            account,
            lot: None,
        }
    }
}

/// A transaction with its ordered splits
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Transaction identifier
    pub id: Guid,
    /// Currency every split value is denominated in
    pub currency: CommodityId,
    /// Transaction number, e.g. a check or invoice number
    pub num: Option<String>,
    /// Date the transaction takes effect
    pub date_posted: DateTime<FixedOffset>,
    /// Date the transaction was recorded
    pub date_entered: DateTime<FixedOffset>,
    /// Description shown in registers
    pub description: String,
    /// Ordered splits; insertion order is significant
    pub splits: Vec<Split>,
    /// Extension attributes
    pub slots: Vec<Slot>,
}

impl Transaction {
    /// Create an empty transaction
    pub fn new(
        id: Guid,
        currency: CommodityId,
        date_posted: DateTime<FixedOffset>,
        date_entered: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id,
            currency,
            num: None,
            date_posted,
            date_entered,
            description: String::new(),
            splits: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// Append a split
    pub fn add_split(&mut self, split: Split) {
        self.splits.push(split);
    }

    /// Find a split by identifier
    pub fn split(&self, id: &Guid) -> Option<&Split> {
        self.splits.iter().find(|s| &s.id == id)
    }

    /// Sum of all split values
    pub fn value_sum(&self) -> BookResult<Fraction> {
        let mut sum = Fraction::zero();
        for split in &self.splits {
            sum = sum.checked_add(&split.value)?;
        }
        Ok(sum)
    }

    /// Whether the split values sum to zero
    pub fn is_balanced(&self) -> BookResult<bool> {
        Ok(self.value_sum()?.is_zero())
    }
}

impl SlotHolder for Transaction {
    fn slots(&self) -> &[Slot] {
        &self.slots
    }
    fn slots_mut(&mut self) -> &mut Vec<Slot> {
        &mut self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    fn test_transaction() -> Transaction {
        Transaction::new(Guid::generate(), CommodityId::currency("EUR"), ts(), ts())
    }

    #[test]
    fn test_reconciled_round_trip() {
        for r in [
            Reconciled::No,
            Reconciled::Cleared,
            Reconciled::Yes,
            Reconciled::Frozen,
            Reconciled::Voided,
        ] {
            assert_eq!(Reconciled::parse(r.as_str()).unwrap(), r);
        }
        assert!(Reconciled::parse("x").is_err());
    }

    #[test]
    fn test_balance_check() {
        let mut txn = test_transaction();
        let account_a = Guid::generate();
        let account_b = Guid::generate();
        txn.add_split(Split::new(Guid::generate(), account_a, Fraction::parse("238/1").unwrap()));
        assert!(!txn.is_balanced().unwrap());

        txn.add_split(Split::new(
            Guid::generate(),
            account_b,
            Fraction::parse("-238/1").unwrap(),
        ));
        assert!(txn.is_balanced().unwrap());
        assert_eq!(txn.value_sum().unwrap(), Fraction::zero());
    }

    #[test]
    fn test_split_order_preserved() {
        let mut txn = test_transaction();
        let first = Guid::generate();
        let second = Guid::generate();
        txn.add_split(Split::new(first.clone(), Guid::generate(), Fraction::from_int(1)));
        txn.add_split(Split::new(second.clone(), Guid::generate(), Fraction::from_int(-1)));
        assert_eq!(txn.splits[0].id, first);
        assert_eq!(txn.splits[1].id, second);
    }

    #[test]
    fn test_new_split_quantity_matches_value() {
        let value = Fraction::parse("100/1").unwrap();
        let split = Split::new(Guid::generate(), Guid::generate(), value);
        assert_eq!(split.quantity, value);
        assert_eq!(split.reconciled, Reconciled::No);
    }

    #[test]
    fn test_ts_format() {
        assert_eq!(ts().format(TS_FORMAT).to_string(), "2024-07-01 12:00:00 +0000");
    }
}
