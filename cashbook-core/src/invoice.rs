//! Invoices and invoice entries
//!
//! One generic invoice type serves customer invoices, vendor bills and
//! job invoices; the role is derived from the owner reference. Entries
//! carry separate invoice-side (`i_*`) and bill-side (`b_*`) field
//! groups because a generic entry may serve either role.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use cashbook_math::{CommodityId, Fraction};

use crate::business::{Owner, OwnerKind};
use crate::error::{BookError, BookResult};
use crate::guid::Guid;
use crate::slots::{Slot, SlotHolder};

/// Role of an invoice, derived from its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceRole {
    /// Issued to a customer; posts to a receivable account
    CustomerInvoice,
    /// Received from a vendor; posts to a payable account
    VendorBill,
    /// Issued against a job; resolves to the job owner's role
    JobInvoice,
}

/// Lifecycle state of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceState {
    /// No posted transaction yet; fully editable
    Draft,
    /// Posted but unpaid; still modifiable
    Posted,
    /// Has at least one paying transaction; frozen
    Paid,
}

/// Closed vocabulary for the entry action field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryAction {
    /// Work billed per job
    Job,
    /// Material costs
    Material,
    /// Work billed per hour
    Hours,
}

impl EntryAction {
    /// The XML string form
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryAction::Job => "Job",
            EntryAction::Material => "Material",
            EntryAction::Hours => "Hours",
        }
    }

    /// Parse the XML string form; the vocabulary is closed
    pub fn parse(s: &str) -> BookResult<Self> {
        Ok(match s {
            "Job" => EntryAction::Job,
            "Material" => EntryAction::Material,
            "Hours" => EntryAction::Hours,
            other => return Err(BookError::Schema(format!("unknown entry action: {other}"))),
        })
    }
}

/// A generic invoice
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    /// Invoice identifier
    pub id: Guid,
    /// Invoice number, e.g. `000012`
    pub number: String,
    /// Customer, vendor or job this invoice belongs to
    pub owner: Owner,
    /// Currency of all entry prices
    pub currency: CommodityId,
    /// When the invoice was opened
    pub opened: DateTime<FixedOffset>,
    /// When the invoice was posted; `None` while in draft
    pub posted: Option<DateTime<FixedOffset>>,
    /// Billing terms reference
    pub terms: Option<Guid>,
    /// Free-form billing identifier
    pub billing_id: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Active flag
    pub active: bool,
    /// Posting transaction; `None` while in draft
    pub post_txn: Option<Guid>,
    /// Posting lot on the post account; `None` while in draft
    pub post_lot: Option<Guid>,
    /// Receivable or payable account posted to; `None` while in draft
    pub post_acc: Option<Guid>,
    /// Extra charge amount, kept verbatim
    pub charge_amt: Option<Fraction>,
    /// Extension attributes
    pub slots: Vec<Slot>,
}

impl Invoice {
    /// Create a minimally valid draft invoice
    pub fn new(
        id: Guid,
        number: impl Into<String>,
        owner: Owner,
        currency: CommodityId,
        opened: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id,
            number: number.into(),
            owner,
            currency,
            opened,
            posted: None,
            terms: None,
            billing_id: None,
            notes: None,
            active: true,
            post_txn: None,
            post_lot: None,
            post_acc: None,
            charge_amt: None,
            slots: Vec::new(),
        }
    }

    /// Role of this invoice, derived from the owner kind
    pub fn role(&self) -> InvoiceRole {
        match self.owner.kind {
            OwnerKind::Customer => InvoiceRole::CustomerInvoice,
            OwnerKind::Vendor => InvoiceRole::VendorBill,
            OwnerKind::Job => InvoiceRole::JobInvoice,
        }
    }

    /// Whether this invoice has been posted
    pub fn is_posted(&self) -> bool {
        self.post_txn.is_some()
    }
}

impl SlotHolder for Invoice {
    fn slots(&self) -> &[Slot] {
        &self.slots
    }
    fn slots_mut(&mut self) -> &mut Vec<Slot> {
        &mut self.slots
    }
}

/// One line of an invoice
///
/// The `i_*` group is read when the entry serves a customer invoice,
/// the `b_*` group when it serves a vendor bill. Discount fields are
/// round-tripped but not interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceEntry {
    /// Entry identifier
    pub id: Guid,
    /// Date of the billed work or delivery
    pub date: DateTime<FixedOffset>,
    /// Date the entry was recorded
    pub entered: DateTime<FixedOffset>,
    /// Description shown on the invoice
    pub description: String,
    /// Action classification
    pub action: EntryAction,
    /// Billed quantity
    pub quantity: Fraction,
    /// Customer invoice this entry belongs to
    pub invoice: Option<Guid>,
    /// Income account for the invoice side
    pub i_acct: Option<Guid>,
    /// Unit price on the invoice side
    pub i_price: Option<Fraction>,
    /// Discount amount on the invoice side, kept verbatim
    pub i_discount: Option<Fraction>,
    /// Discount type on the invoice side, kept verbatim
    pub i_disc_type: Option<String>,
    /// Discount application rule on the invoice side, kept verbatim
    pub i_disc_how: Option<String>,
    /// Whether the invoice side is taxable
    pub i_taxable: bool,
    /// Whether the invoice-side price includes tax
    pub i_taxincluded: bool,
    /// Tax table for the invoice side
    pub i_taxtable: Option<Guid>,
    /// Vendor bill this entry belongs to
    pub bill: Option<Guid>,
    /// Expense account for the bill side
    pub b_acct: Option<Guid>,
    /// Unit price on the bill side
    pub b_price: Option<Fraction>,
    /// Whether the bill side is taxable
    pub b_taxable: bool,
    /// Whether the bill-side price includes tax
    pub b_taxincluded: bool,
    /// Tax table for the bill side
    pub b_taxtable: Option<Guid>,
    /// Whether the bill side is paid directly rather than accrued
    pub b_pay: Option<String>,
}

impl InvoiceEntry {
    /// Create a minimally valid entry
    pub fn new(
        id: Guid,
        date: DateTime<FixedOffset>,
        entered: DateTime<FixedOffset>,
        action: EntryAction,
        quantity: Fraction,
    ) -> Self {
        Self {
            id,
            date,
            entered,
            description: String::new(),
            action,
            quantity,
            invoice: None,
            i_acct: None,
            i_price: None,
            i_discount: None,
            i_disc_type: None,
            i_disc_how: None,
            i_taxable: false,
            i_taxincluded: false,
            i_taxtable: None,
            bill: None,
            b_acct: None,
            b_price: None,
            b_taxable: false,
            b_taxincluded: false,
            b_taxtable: None,
            b_pay: None,
        }
    }

    /// The invoice or bill this entry belongs to, whichever is set
    pub fn owning_invoice(&self) -> Option<&Guid> {
        self.invoice.as_ref().or(self.bill.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_entry_action_round_trip() {
        for action in [EntryAction::Job, EntryAction::Material, EntryAction::Hours] {
            assert_eq!(EntryAction::parse(action.as_str()).unwrap(), action);
        }
        assert!(matches!(EntryAction::parse("Misc"), Err(BookError::Schema(_))));
    }

    #[test]
    fn test_role_follows_owner() {
        let customer = Owner::customer(Guid::generate());
        let invoice = Invoice::new(
            Guid::generate(),
            "000001",
            customer,
            CommodityId::currency("EUR"),
            ts(),
        );
        assert_eq!(invoice.role(), InvoiceRole::CustomerInvoice);
        assert!(!invoice.is_posted());

        let bill = Invoice::new(
            Guid::generate(),
            "000002",
            Owner::vendor(Guid::generate()),
            CommodityId::currency("EUR"),
            ts(),
        );
        assert_eq!(bill.role(), InvoiceRole::VendorBill);
    }

    #[test]
    fn test_owning_invoice_prefers_invoice_side() {
        let mut entry = InvoiceEntry::new(
            Guid::generate(),
            ts(),
            ts(),
            EntryAction::Hours,
            Fraction::from_int(1),
        );
        assert!(entry.owning_invoice().is_none());
        let invoice_guid = Guid::generate();
        entry.invoice = Some(invoice_guid.clone());
        assert_eq!(entry.owning_invoice(), Some(&invoice_guid));
    }
}
