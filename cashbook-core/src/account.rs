//! Account tree nodes
//!
//! Accounts form a tree with exactly one ROOT-typed node. Parent links
//! are GUID references resolved through the book; the book, not the
//! account, owns the child index and enforces the tree invariants.

use serde::{Deserialize, Serialize};

use cashbook_math::CommodityId;

use crate::error::{BookError, BookResult};
use crate::guid::Guid;
use crate::slots::{Slot, SlotHolder, SlotValue};

/// Account type classification mirroring the GnuCash vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    /// The invisible root of the account tree
    Root,
    /// Bank account
    Bank,
    /// Cash on hand
    Cash,
    /// Credit card
    Credit,
    /// Generic asset
    Asset,
    /// Generic liability
    Liability,
    /// Stock holding
    Stock,
    /// Mutual fund holding
    Mutual,
    /// Currency trading account
    Currency,
    /// Income
    Income,
    /// Expense
    Expense,
    /// Equity
    Equity,
    /// Accounts receivable (customer invoices post here)
    Receivable,
    /// Accounts payable (vendor bills post here)
    Payable,
    /// Trading account for multi-currency books
    Trading,
}

impl AccountType {
    /// The XML string form of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Root => "ROOT",
            AccountType::Bank => "BANK",
            AccountType::Cash => "CASH",
            AccountType::Credit => "CREDIT",
            AccountType::Asset => "ASSET",
            AccountType::Liability => "LIABILITY",
            AccountType::Stock => "STOCK",
            AccountType::Mutual => "MUTUAL",
            AccountType::Currency => "CURRENCY",
            AccountType::Income => "INCOME",
            AccountType::Expense => "EXPENSE",
            AccountType::Equity => "EQUITY",
            AccountType::Receivable => "RECEIVABLE",
            AccountType::Payable => "PAYABLE",
            AccountType::Trading => "TRADING",
        }
    }

    /// Parse the XML string form; the vocabulary is closed
    pub fn parse(s: &str) -> BookResult<Self> {
        Ok(match s {
            "ROOT" => AccountType::Root,
            "BANK" => AccountType::Bank,
            "CASH" => AccountType::Cash,
            "CREDIT" => AccountType::Credit,
            "ASSET" => AccountType::Asset,
            "LIABILITY" => AccountType::Liability,
            "STOCK" => AccountType::Stock,
            "MUTUAL" => AccountType::Mutual,
            "CURRENCY" => AccountType::Currency,
            "INCOME" => AccountType::Income,
            "EXPENSE" => AccountType::Expense,
            "EQUITY" => AccountType::Equity,
            "RECEIVABLE" => AccountType::Receivable,
            "PAYABLE" => AccountType::Payable,
            "TRADING" => AccountType::Trading,
            other => return Err(BookError::Schema(format!("unknown account type: {other}"))),
        })
    }
}

/// A lot grouping an invoice's posting with the payments that settle it
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    /// Lot identifier
    pub id: Guid,
    /// Lot metadata; posting stores a `gncInvoice` frame here
    pub slots: Vec<Slot>,
}

impl Lot {
    /// Create an empty lot
    pub fn new(id: Guid) -> Self {
        Self { id, slots: Vec::new() }
    }
}

impl SlotHolder for Lot {
    fn slots(&self) -> &[Slot] {
        &self.slots
    }
    fn slots_mut(&mut self) -> &mut Vec<Slot> {
        &mut self.slots
    }
}

/// A node in the account tree
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Account identifier
    pub id: Guid,
    /// Account name, unique among siblings by convention
    pub name: String,
    /// Optional account code
    pub code: Option<String>,
    /// Optional description
    pub description: Option<String>,
    /// Type classification
    pub account_type: AccountType,
    /// Commodity this account is denominated in
    pub commodity: CommodityId,
    /// Smallest commodity unit used by this account
    pub commodity_scu: i64,
    /// Whether the account uses a non-standard smallest unit
    pub non_standard_scu: bool,
    /// Parent account; `None` only for the root
    pub parent: Option<Guid>,
    /// Extension attributes
    pub slots: Vec<Slot>,
    /// Lots held by this account
    pub lots: Vec<Lot>,
}

impl Account {
    /// Create a minimally valid account
    pub fn new(id: Guid, name: impl Into<String>, account_type: AccountType, commodity: CommodityId) -> Self {
        Self {
            id,
            name: name.into(),
            code: None,
            description: None,
            account_type,
            commodity,
            commodity_scu: 100,
            non_standard_scu: false,
            parent: None,
            slots: Vec::new(),
            lots: Vec::new(),
        }
    }

    /// Whether this account is the tree root
    pub fn is_root(&self) -> bool {
        self.account_type == AccountType::Root
    }

    /// Placeholder flag, stored as a slot
    pub fn is_placeholder(&self) -> bool {
        self.text_slot("placeholder") == Some("true")
    }

    /// Set the placeholder flag
    pub fn set_placeholder(&mut self, placeholder: bool) {
        if placeholder {
            self.set_slot("placeholder", SlotValue::Text("true".into()));
        } else {
            self.remove_slot("placeholder");
        }
    }

    /// User notes, stored as a slot
    pub fn notes(&self) -> Option<&str> {
        self.text_slot("notes")
    }

    /// Set the user notes
    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.set_slot("notes", SlotValue::Text(notes.into()));
    }

    /// Find a lot by identifier
    pub fn lot(&self, id: &Guid) -> Option<&Lot> {
        self.lots.iter().find(|l| &l.id == id)
    }
}

impl SlotHolder for Account {
    fn slots(&self) -> &[Slot] {
        &self.slots
    }
    fn slots_mut(&mut self) -> &mut Vec<Slot> {
        &mut self.slots
    }
}
