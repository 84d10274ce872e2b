//! Book model and XML codec for GnuCash accounting files
//!
//! This crate provides the in-memory representation of a GnuCash book
//! (accounts, transactions, splits, commodities, customers, vendors,
//! jobs, invoices, tax tables), the rules for mutating it without
//! breaking referential or double-entry invariants, and a codec that
//! reads the GnuCash XML v2 dialect and writes it back byte-compatibly.

#![warn(clippy::all)]
#![warn(missing_docs)]

/// Module for the error taxonomy shared across the crate
pub mod error;

/// Module for 32-character hexadecimal entity identifiers
pub mod guid;

/// Module for key/value extension attributes ("slots")
pub mod slots;

/// Module for the account tree node and lots
pub mod account;

/// Module for transactions and their splits
pub mod transaction;

/// Module for customers, vendors, jobs, owners and addresses
pub mod business;

/// Module for invoices and invoice entries
pub mod invoice;

/// Module for tax tables
pub mod taxtable;

/// Module for the price database
pub mod price;

/// Module for the book graph owning every entity
pub mod book;

/// Module for invoice posting, payment and balanced entry mutation
pub mod posting;

/// Module for the XML codec
pub mod xml;

// Re-export main types
pub use account::{Account, AccountType, Lot};
pub use book::{Book, PropertyChange};
pub use business::{Address, Customer, Job, Owner, OwnerKind, TaxIncluded, Vendor};
pub use error::{BookError, BookResult};
pub use guid::Guid;
pub use invoice::{EntryAction, Invoice, InvoiceEntry, InvoiceRole, InvoiceState};
pub use posting::{EntryAmounts, EntrySide, NewEntry};
pub use slots::{Slot, SlotValue};
pub use taxtable::{TaxBasis, TaxTable, TaxTableEntry};
pub use transaction::{Reconciled, Split, Transaction};
pub use xml::{open_book, read_book, write_book};
