//! Price database
//!
//! The price database holds quote records pairing a commodity with a
//! currency at a point in time. `Book::add_currency` appends here when
//! it learns a new conversion factor.

use chrono::{DateTime, FixedOffset};

use cashbook_math::{CommodityId, Fraction};

use crate::guid::Guid;

/// One price quote
#[derive(Debug, Clone, PartialEq)]
pub struct Price {
    /// Quote identifier
    pub id: Guid,
    /// Commodity being priced
    pub commodity: CommodityId,
    /// Currency the price is expressed in
    pub currency: CommodityId,
    /// Quote timestamp
    pub time: DateTime<FixedOffset>,
    /// Where the quote came from, e.g. `user:xfer-dialog`
    pub source: String,
    /// Quote type, e.g. `last` or `transaction`
    pub price_type: Option<String>,
    /// The price itself
    pub value: Fraction,
}

/// The book's price database
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceDb {
    /// Quotes in file order
    pub prices: Vec<Price>,
}

impl PriceDb {
    /// An empty price database
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a quote for the pair at the given value already exists
    pub fn has_quote(&self, commodity: &CommodityId, currency: &CommodityId, value: &Fraction) -> bool {
        self.prices
            .iter()
            .any(|p| &p.commodity == commodity && &p.currency == currency && &p.value == value)
    }

    /// Append a quote
    pub fn push(&mut self, price: Price) {
        self.prices.push(price);
    }

    /// Number of quotes
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Whether the database holds no quotes
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
