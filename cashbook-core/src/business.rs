//! Customers, vendors, jobs and their shared pieces
//!
//! These are the "business object" entities of a book. Owner references
//! are a tagged GUID so a job or invoice can belong to a customer, a
//! vendor, or another job.

use serde::{Deserialize, Serialize};

use cashbook_math::{CommodityId, Fraction};

use crate::error::{BookError, BookResult};
use crate::guid::Guid;
use crate::slots::{Slot, SlotHolder};

/// A postal address with contact details
///
/// No validation beyond empty-string defaults; GnuCash treats all eight
/// fields as free-form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Addressee name
    pub name: String,
    /// First address line
    pub addr1: String,
    /// Second address line
    pub addr2: String,
    /// Third address line
    pub addr3: String,
    /// Fourth address line
    pub addr4: String,
    /// Phone number
    pub phone: String,
    /// Fax number
    pub fax: String,
    /// Email address
    pub email: String,
}

impl Address {
    /// An empty address
    pub fn new() -> Self {
        Self::default()
    }
}

/// Tax-inclusion policy on customers and vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaxIncluded {
    /// Prices include tax
    Yes,
    /// Prices exclude tax
    No,
    /// Defer to the book-wide setting
    #[default]
    UseGlobal,
}

impl TaxIncluded {
    /// The XML string form
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxIncluded::Yes => "YES",
            TaxIncluded::No => "NO",
            TaxIncluded::UseGlobal => "USEGLOBAL",
        }
    }

    /// Parse the XML string form
    pub fn parse(s: &str) -> BookResult<Self> {
        Ok(match s {
            "YES" => TaxIncluded::Yes,
            "NO" => TaxIncluded::No,
            "USEGLOBAL" => TaxIncluded::UseGlobal,
            other => {
                return Err(BookError::Schema(format!("unknown tax-included policy: {other}")))
            }
        })
    }
}

/// Kind tag of an owner reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerKind {
    /// Owned by a customer
    Customer,
    /// Owned by a vendor
    Vendor,
    /// Owned by a job
    Job,
}

impl OwnerKind {
    /// The XML string form
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Customer => "gncCustomer",
            OwnerKind::Vendor => "gncVendor",
            OwnerKind::Job => "gncJob",
        }
    }

    /// Parse the XML string form
    pub fn parse(s: &str) -> BookResult<Self> {
        Ok(match s {
            "gncCustomer" => OwnerKind::Customer,
            "gncVendor" => OwnerKind::Vendor,
            "gncJob" => OwnerKind::Job,
            other => return Err(BookError::Schema(format!("unknown owner kind: {other}"))),
        })
    }
}

/// A tagged reference to a customer, vendor or job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// What entity type the reference points at
    pub kind: OwnerKind,
    /// The referenced entity
    pub guid: Guid,
}

impl Owner {
    /// Reference a customer
    pub fn customer(guid: Guid) -> Self {
        Self { kind: OwnerKind::Customer, guid }
    }

    /// Reference a vendor
    pub fn vendor(guid: Guid) -> Self {
        Self { kind: OwnerKind::Vendor, guid }
    }

    /// Reference a job
    pub fn job(guid: Guid) -> Self {
        Self { kind: OwnerKind::Job, guid }
    }
}

/// A customer
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    /// Customer identifier
    pub id: Guid,
    /// Customer number, e.g. `000001`
    pub number: String,
    /// Display name
    pub name: String,
    /// Free-form notes
    pub notes: Option<String>,
    /// Billing terms reference
    pub terms: Option<Guid>,
    /// Tax-inclusion policy
    pub tax_included: TaxIncluded,
    /// Active flag
    pub active: bool,
    /// Default discount
    pub discount: Fraction,
    /// Credit limit
    pub credit: Fraction,
    /// Default invoice currency
    pub currency: CommodityId,
    /// Whether the assigned tax table overrides entry tables
    pub tax_table_override: bool,
    /// Assigned tax table
    pub tax_table: Option<Guid>,
    /// Billing address
    pub address: Address,
    /// Shipping address
    pub ship_address: Address,
    /// Extension attributes
    pub slots: Vec<Slot>,
}

impl Customer {
    /// Create a minimally valid customer
    pub fn new(id: Guid, number: impl Into<String>, name: impl Into<String>, currency: CommodityId) -> Self {
        Self {
            id,
            number: number.into(),
            name: name.into(),
            notes: None,
            terms: None,
            tax_included: TaxIncluded::UseGlobal,
            active: true,
            discount: Fraction::zero(),
            credit: Fraction::zero(),
            currency,
            tax_table_override: false,
            tax_table: None,
            address: Address::new(),
            ship_address: Address::new(),
            slots: Vec::new(),
        }
    }
}

impl SlotHolder for Customer {
    fn slots(&self) -> &[Slot] {
        &self.slots
    }
    fn slots_mut(&mut self) -> &mut Vec<Slot> {
        &mut self.slots
    }
}

/// A vendor
#[derive(Debug, Clone, PartialEq)]
pub struct Vendor {
    /// Vendor identifier
    pub id: Guid,
    /// Vendor number
    pub number: String,
    /// Display name
    pub name: String,
    /// Free-form notes
    pub notes: Option<String>,
    /// Billing terms reference
    pub terms: Option<Guid>,
    /// Tax-inclusion policy
    pub tax_included: TaxIncluded,
    /// Active flag
    pub active: bool,
    /// Default bill currency
    pub currency: CommodityId,
    /// Whether the assigned tax table overrides entry tables
    pub tax_table_override: bool,
    /// Assigned tax table
    pub tax_table: Option<Guid>,
    /// Billing address
    pub address: Address,
    /// Extension attributes
    pub slots: Vec<Slot>,
}

impl Vendor {
    /// Create a minimally valid vendor
    pub fn new(id: Guid, number: impl Into<String>, name: impl Into<String>, currency: CommodityId) -> Self {
        Self {
            id,
            number: number.into(),
            name: name.into(),
            notes: None,
            terms: None,
            tax_included: TaxIncluded::UseGlobal,
            active: true,
            currency,
            tax_table_override: false,
            tax_table: None,
            address: Address::new(),
            slots: Vec::new(),
        }
    }
}

impl SlotHolder for Vendor {
    fn slots(&self) -> &[Slot] {
        &self.slots
    }
    fn slots_mut(&mut self) -> &mut Vec<Slot> {
        &mut self.slots
    }
}

/// A job, grouping invoices under a customer or vendor
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Job identifier
    pub id: Guid,
    /// Job number
    pub number: String,
    /// Display name
    pub name: String,
    /// Free-form reference, e.g. the owner's order number
    pub reference: Option<String>,
    /// The customer or vendor this job belongs to
    pub owner: Owner,
    /// Active flag
    pub active: bool,
}

impl Job {
    /// Create a minimally valid job
    pub fn new(id: Guid, number: impl Into<String>, name: impl Into<String>, owner: Owner) -> Self {
        Self { id, number: number.into(), name: name.into(), reference: None, owner, active: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_kind_round_trip() {
        for kind in [OwnerKind::Customer, OwnerKind::Vendor, OwnerKind::Job] {
            assert_eq!(OwnerKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(OwnerKind::parse("gncEmployee").is_err());
    }

    #[test]
    fn test_tax_included_round_trip() {
        for policy in [TaxIncluded::Yes, TaxIncluded::No, TaxIncluded::UseGlobal] {
            assert_eq!(TaxIncluded::parse(policy.as_str()).unwrap(), policy);
        }
    }

    #[test]
    fn test_customer_defaults() {
        let customer =
            Customer::new(Guid::generate(), "000001", "ACME", CommodityId::currency("EUR"));
        assert!(customer.active);
        assert!(customer.discount.is_zero());
        assert!(customer.credit.is_zero());
        assert_eq!(customer.tax_included, TaxIncluded::UseGlobal);
        assert_eq!(customer.address, Address::new());
    }

    #[test]
    fn test_job_owner() {
        let customer_guid = Guid::generate();
        let job = Job::new(Guid::generate(), "J-1", "Install", Owner::customer(customer_guid.clone()));
        assert_eq!(job.owner.kind, OwnerKind::Customer);
        assert_eq!(job.owner.guid, customer_guid);
    }
}
