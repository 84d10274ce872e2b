//! The book graph
//!
//! A Book owns every entity in per-type ordered collections with
//! GUID lookup maps, the way a journal owns its account and commodity
//! registries. Cross-entity references are GUIDs resolved through these
//! maps, never direct pointers, so the graph has no ownership cycles.
//!
//! All mutation goes through Book methods: they enforce the referential
//! invariants, keep the lookup maps current, clear the balance cache and
//! record a change event for each touched property.

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use log::warn;

use cashbook_math::{Commodity, CommodityId, CurrencyTable, Fraction};

use crate::account::{Account, AccountType};
use crate::business::{Customer, Job, Owner, Vendor};
use crate::error::{BookError, BookResult};
use crate::guid::Guid;
use crate::invoice::{Invoice, InvoiceEntry};
use crate::price::{Price, PriceDb};
use crate::slots::{Slot, SlotHolder, SlotValue};
use crate::taxtable::TaxTable;
use crate::transaction::{Split, Transaction};
use crate::xml::dom::XmlElement;

/// A key/old-value/new-value triple describing one mutation
///
/// Mutating calls append these to the book's change journal; external
/// layers drain the journal with [`Book::take_changes`] instead of
/// subscribing to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    /// Entity the change happened on
    pub entity: Guid,
    /// Property name, e.g. `name` or `transactionSplits`
    pub property: &'static str,
    /// Previous value, rendered as text
    pub old: String,
    /// New value, rendered as text
    pub new: String,
}

/// The top-level container of all entities in one XML document
#[derive(Debug)]
pub struct Book {
    pub(crate) id: Guid,
    pub(crate) base_currency: CommodityId,
    pub(crate) slots: Vec<Slot>,

    pub(crate) commodities: Vec<Commodity>,
    pub(crate) price_db: PriceDb,
    pub(crate) accounts: Vec<Account>,
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) customers: Vec<Customer>,
    pub(crate) vendors: Vec<Vendor>,
    pub(crate) jobs: Vec<Job>,
    pub(crate) invoices: Vec<Invoice>,
    pub(crate) entries: Vec<InvoiceEntry>,
    pub(crate) tax_tables: Vec<TaxTable>,

    // Recognized-but-uninterpreted top-level elements (budgets, scheduled
    // transactions, template transactions, bill terms, employees) kept
    // verbatim for round-tripping.
    pub(crate) raw_elements: Vec<XmlElement>,

    account_index: HashMap<Guid, usize>,
    transaction_index: HashMap<Guid, usize>,
    customer_index: HashMap<Guid, usize>,
    vendor_index: HashMap<Guid, usize>,
    job_index: HashMap<Guid, usize>,
    invoice_index: HashMap<Guid, usize>,
    entry_index: HashMap<Guid, usize>,
    tax_table_index: HashMap<Guid, usize>,

    currency_table: CurrencyTable,
    changes: Vec<PropertyChange>,
    balance_cache: RefCell<HashMap<Guid, Fraction>>,
    pub(crate) last_write: Option<DateTime<Utc>>,
}

impl Book {
    /// Create an empty book denominated in the given currency
    pub fn new(base_currency: Commodity) -> Self {
        let mut book = Self {
            id: Guid::generate(),
            base_currency: base_currency.id.clone(),
            slots: Vec::new(),
            commodities: Vec::new(),
            price_db: PriceDb::new(),
            accounts: Vec::new(),
            transactions: Vec::new(),
            customers: Vec::new(),
            vendors: Vec::new(),
            jobs: Vec::new(),
            invoices: Vec::new(),
            entries: Vec::new(),
            tax_tables: Vec::new(),
            raw_elements: Vec::new(),
            account_index: HashMap::new(),
            transaction_index: HashMap::new(),
            customer_index: HashMap::new(),
            vendor_index: HashMap::new(),
            job_index: HashMap::new(),
            invoice_index: HashMap::new(),
            entry_index: HashMap::new(),
            tax_table_index: HashMap::new(),
            currency_table: CurrencyTable::new(),
            changes: Vec::new(),
            balance_cache: RefCell::new(HashMap::new()),
            last_write: None,
        };
        book.commodities.push(base_currency);
        book
    }

    // Shell for the reader: no seeded commodity, identifier from the
    // file. The base currency is fixed up once commodities are decoded.
    pub(crate) fn new_raw(id: Guid) -> Self {
        let mut book = Self::new(Commodity::iso_currency("EUR"));
        book.commodities.clear();
        book.id = id;
        book
    }

    pub(crate) fn set_base_currency(&mut self, id: CommodityId) {
        self.base_currency = id;
    }

    /// Book identifier
    pub fn id(&self) -> &Guid {
        &self.id
    }

    /// The book's default currency
    pub fn base_currency(&self) -> &CommodityId {
        &self.base_currency
    }

    /// When this book was last written to disk, if it has been
    pub fn last_write(&self) -> Option<DateTime<Utc>> {
        self.last_write
    }

    /// Drain the accumulated change events
    pub fn take_changes(&mut self) -> Vec<PropertyChange> {
        std::mem::take(&mut self.changes)
    }

    fn record_change(&mut self, entity: &Guid, property: &'static str, old: String, new: String) {
        self.changes.push(PropertyChange { entity: entity.clone(), property, old, new });
    }

    pub(crate) fn push_change(
        &mut self,
        entity: &Guid,
        property: &'static str,
        old: String,
        new: String,
    ) {
        self.record_change(entity, property, old, new);
    }

    fn invalidate_balances(&mut self) {
        self.balance_cache.borrow_mut().clear();
    }

    pub(crate) fn invalidate_all_balances(&mut self) {
        self.invalidate_balances();
    }

    pub(crate) fn drop_entry_at(&mut self, idx: usize) {
        self.entries.remove(idx);
        self.entry_index =
            self.entries.iter().enumerate().map(|(i, e)| (e.id.clone(), i)).collect();
    }

    // ---- lookups ---------------------------------------------------------

    /// All commodities in file order
    pub fn commodities(&self) -> &[Commodity] {
        &self.commodities
    }

    /// Find a commodity by identity
    pub fn commodity(&self, id: &CommodityId) -> Option<&Commodity> {
        self.commodities.iter().find(|c| &c.id == id)
    }

    /// The price database
    pub fn price_db(&self) -> &PriceDb {
        &self.price_db
    }

    /// The currency conversion table
    pub fn currency_table(&self) -> &CurrencyTable {
        &self.currency_table
    }

    pub(crate) fn currency_table_mut(&mut self) -> &mut CurrencyTable {
        &mut self.currency_table
    }

    /// All accounts in file order
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Look up an account by identifier
    pub fn account(&self, id: &Guid) -> Option<&Account> {
        self.account_index.get(id).map(|&i| &self.accounts[i])
    }

    /// Find an account by name
    pub fn find_account_by_name(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name == name)
    }

    /// The single ROOT-typed account, if present
    pub fn root_account(&self) -> Option<&Account> {
        self.accounts.iter().find(|a| a.is_root())
    }

    /// Direct children of an account, in file order
    pub fn account_children(&self, id: &Guid) -> Vec<&Account> {
        self.accounts.iter().filter(|a| a.parent.as_ref() == Some(id)).collect()
    }

    /// All transactions in file order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Look up a transaction by identifier
    pub fn transaction(&self, id: &Guid) -> Option<&Transaction> {
        self.transaction_index.get(id).map(|&i| &self.transactions[i])
    }

    /// Every split posting to the given account, with its transaction
    pub fn splits_for_account(&self, account: &Guid) -> Vec<(&Transaction, &Split)> {
        let mut result = Vec::new();
        for txn in &self.transactions {
            for split in &txn.splits {
                if &split.account == account {
                    result.push((txn, split));
                }
            }
        }
        result
    }

    /// All customers in file order
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// Look up a customer by identifier
    pub fn customer(&self, id: &Guid) -> Option<&Customer> {
        self.customer_index.get(id).map(|&i| &self.customers[i])
    }

    /// Find a customer by customer number
    pub fn find_customer_by_number(&self, number: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.number == number)
    }

    /// All vendors in file order
    pub fn vendors(&self) -> &[Vendor] {
        &self.vendors
    }

    /// Look up a vendor by identifier
    pub fn vendor(&self, id: &Guid) -> Option<&Vendor> {
        self.vendor_index.get(id).map(|&i| &self.vendors[i])
    }

    /// All jobs in file order
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Look up a job by identifier
    pub fn job(&self, id: &Guid) -> Option<&Job> {
        self.job_index.get(id).map(|&i| &self.jobs[i])
    }

    /// Jobs belonging to the given owner
    pub fn jobs_for_owner(&self, owner: &Guid) -> Vec<&Job> {
        self.jobs.iter().filter(|j| &j.owner.guid == owner).collect()
    }

    /// All invoices in file order
    pub fn invoices(&self) -> &[Invoice] {
        &self.invoices
    }

    /// Look up an invoice by identifier
    pub fn invoice(&self, id: &Guid) -> Option<&Invoice> {
        self.invoice_index.get(id).map(|&i| &self.invoices[i])
    }

    /// Invoices belonging to the given owner
    pub fn invoices_for_owner(&self, owner: &Guid) -> Vec<&Invoice> {
        self.invoices.iter().filter(|i| &i.owner.guid == owner).collect()
    }

    /// All invoice entries in file order
    pub fn entries(&self) -> &[InvoiceEntry] {
        &self.entries
    }

    /// Look up an invoice entry by identifier
    pub fn entry(&self, id: &Guid) -> Option<&InvoiceEntry> {
        self.entry_index.get(id).map(|&i| &self.entries[i])
    }

    /// Entries belonging to the given invoice or bill, in file order
    pub fn entries_for_invoice(&self, invoice: &Guid) -> Vec<&InvoiceEntry> {
        self.entries.iter().filter(|e| e.owning_invoice() == Some(invoice)).collect()
    }

    /// Tax tables, recomputed from the live collection on every call
    pub fn tax_tables(&self) -> &[TaxTable] {
        &self.tax_tables
    }

    /// Look up a tax table by identifier
    pub fn tax_table(&self, id: &Guid) -> Option<&TaxTable> {
        self.tax_table_index.get(id).map(|&i| &self.tax_tables[i])
    }

    /// Find a tax table by name
    pub fn find_tax_table_by_name(&self, name: &str) -> Option<&TaxTable> {
        self.tax_tables.iter().find(|t| t.name == name)
    }

    // ---- guid handling ---------------------------------------------------

    /// Whether any entity in the book carries the given identifier
    pub fn contains_guid(&self, guid: &Guid) -> bool {
        self.id == *guid
            || self.account_index.contains_key(guid)
            || self.transaction_index.contains_key(guid)
            || self.customer_index.contains_key(guid)
            || self.vendor_index.contains_key(guid)
            || self.job_index.contains_key(guid)
            || self.invoice_index.contains_key(guid)
            || self.entry_index.contains_key(guid)
            || self.tax_table_index.contains_key(guid)
            || self.transactions.iter().any(|t| t.splits.iter().any(|s| s.id == *guid))
            || self.accounts.iter().any(|a| a.lots.iter().any(|l| l.id == *guid))
    }

    fn claim_guid(&self, supplied: Option<Guid>) -> BookResult<Guid> {
        match supplied {
            Some(guid) => {
                if self.contains_guid(&guid) {
                    Err(BookError::ReferentialIntegrity(format!("duplicate GUID {guid}")))
                } else {
                    Ok(guid)
                }
            }
            None => Ok(Guid::generate()),
        }
    }

    fn require_nonblank(value: &str, field: &'static str) -> BookResult<()> {
        if value.trim().is_empty() {
            Err(BookError::InvalidValue { field, reason: "must not be blank".into() })
        } else {
            Ok(())
        }
    }

    // ---- registration (used by factories and the reader) -----------------

    pub(crate) fn insert_account(&mut self, account: Account) {
        self.account_index.insert(account.id.clone(), self.accounts.len());
        self.accounts.push(account);
    }

    pub(crate) fn insert_transaction(&mut self, txn: Transaction) {
        self.transaction_index.insert(txn.id.clone(), self.transactions.len());
        self.transactions.push(txn);
        self.invalidate_balances();
    }

    pub(crate) fn insert_customer(&mut self, customer: Customer) {
        self.customer_index.insert(customer.id.clone(), self.customers.len());
        self.customers.push(customer);
    }

    pub(crate) fn insert_vendor(&mut self, vendor: Vendor) {
        self.vendor_index.insert(vendor.id.clone(), self.vendors.len());
        self.vendors.push(vendor);
    }

    pub(crate) fn insert_job(&mut self, job: Job) {
        self.job_index.insert(job.id.clone(), self.jobs.len());
        self.jobs.push(job);
    }

    pub(crate) fn insert_invoice(&mut self, invoice: Invoice) {
        self.invoice_index.insert(invoice.id.clone(), self.invoices.len());
        self.invoices.push(invoice);
    }

    pub(crate) fn insert_entry(&mut self, entry: InvoiceEntry) {
        self.entry_index.insert(entry.id.clone(), self.entries.len());
        self.entries.push(entry);
    }

    pub(crate) fn insert_tax_table(&mut self, table: TaxTable) {
        self.tax_table_index.insert(table.id.clone(), self.tax_tables.len());
        self.tax_tables.push(table);
    }

    fn reindex_accounts(&mut self) {
        self.account_index =
            self.accounts.iter().enumerate().map(|(i, a)| (a.id.clone(), i)).collect();
    }

    fn reindex_transactions(&mut self) {
        self.transaction_index =
            self.transactions.iter().enumerate().map(|(i, t)| (t.id.clone(), i)).collect();
    }

    fn account_idx(&self, id: &Guid) -> BookResult<usize> {
        self.account_index
            .get(id)
            .copied()
            .ok_or_else(|| BookError::MissingReference(format!("no account {id}")))
    }

    fn transaction_idx(&self, id: &Guid) -> BookResult<usize> {
        self.transaction_index
            .get(id)
            .copied()
            .ok_or_else(|| BookError::MissingReference(format!("no transaction {id}")))
    }

    pub(crate) fn invoice_idx(&self, id: &Guid) -> BookResult<usize> {
        self.invoice_index
            .get(id)
            .copied()
            .ok_or_else(|| BookError::MissingReference(format!("no invoice {id}")))
    }

    pub(crate) fn entry_idx(&self, id: &Guid) -> BookResult<usize> {
        self.entry_index
            .get(id)
            .copied()
            .ok_or_else(|| BookError::MissingReference(format!("no invoice entry {id}")))
    }

    pub(crate) fn account_mut(&mut self, id: &Guid) -> BookResult<&mut Account> {
        let idx = self.account_idx(id)?;
        Ok(&mut self.accounts[idx])
    }

    pub(crate) fn transaction_mut(&mut self, id: &Guid) -> BookResult<&mut Transaction> {
        let idx = self.transaction_idx(id)?;
        Ok(&mut self.transactions[idx])
    }

    pub(crate) fn invoice_mut(&mut self, id: &Guid) -> BookResult<&mut Invoice> {
        let idx = self.invoice_idx(id)?;
        Ok(&mut self.invoices[idx])
    }

    pub(crate) fn entry_mut(&mut self, id: &Guid) -> BookResult<&mut InvoiceEntry> {
        let idx = self.entry_idx(id)?;
        Ok(&mut self.entries[idx])
    }

    // ---- factories -------------------------------------------------------

    /// Create an account and return its identifier
    ///
    /// A `None` parent is only valid for the first ROOT-typed account.
    pub fn create_account(
        &mut self,
        guid: Option<Guid>,
        name: &str,
        account_type: AccountType,
        commodity: CommodityId,
        parent: Option<Guid>,
    ) -> BookResult<Guid> {
        Self::require_nonblank(name, "name")?;
        match &parent {
            Some(parent_guid) => {
                self.account_idx(parent_guid)?;
            }
            None => {
                if account_type != AccountType::Root {
                    return Err(BookError::ReferentialIntegrity(
                        "only the ROOT account may have no parent".into(),
                    ));
                }
                if self.root_account().is_some() {
                    return Err(BookError::ReferentialIntegrity(
                        "book already has a root account".into(),
                    ));
                }
            }
        }
        let guid = self.claim_guid(guid)?;
        let mut account = Account::new(guid.clone(), name, account_type, commodity);
        account.parent = parent;
        self.insert_account(account);
        self.record_change(&guid, "accounts", String::new(), name.to_string());
        Ok(guid)
    }

    /// Create an empty transaction and return its identifier
    pub fn create_transaction(
        &mut self,
        guid: Option<Guid>,
        currency: CommodityId,
        date_posted: DateTime<FixedOffset>,
        date_entered: DateTime<FixedOffset>,
    ) -> BookResult<Guid> {
        let guid = self.claim_guid(guid)?;
        let txn = Transaction::new(guid.clone(), currency, date_posted, date_entered);
        self.insert_transaction(txn);
        self.record_change(&guid, "transactions", String::new(), guid.to_string());
        Ok(guid)
    }

    /// Create a customer and return its identifier
    pub fn create_customer(
        &mut self,
        guid: Option<Guid>,
        number: &str,
        name: &str,
        currency: CommodityId,
    ) -> BookResult<Guid> {
        Self::require_nonblank(number, "number")?;
        Self::require_nonblank(name, "name")?;
        let guid = self.claim_guid(guid)?;
        self.insert_customer(Customer::new(guid.clone(), number, name, currency));
        self.record_change(&guid, "customers", String::new(), name.to_string());
        Ok(guid)
    }

    /// Create a vendor and return its identifier
    pub fn create_vendor(
        &mut self,
        guid: Option<Guid>,
        number: &str,
        name: &str,
        currency: CommodityId,
    ) -> BookResult<Guid> {
        Self::require_nonblank(number, "number")?;
        Self::require_nonblank(name, "name")?;
        let guid = self.claim_guid(guid)?;
        self.insert_vendor(Vendor::new(guid.clone(), number, name, currency));
        self.record_change(&guid, "vendors", String::new(), name.to_string());
        Ok(guid)
    }

    /// Create a job owned by a customer
    pub fn create_customer_job(
        &mut self,
        guid: Option<Guid>,
        number: &str,
        name: &str,
        customer: &Guid,
    ) -> BookResult<Guid> {
        Self::require_nonblank(number, "number")?;
        Self::require_nonblank(name, "name")?;
        if self.customer(customer).is_none() {
            return Err(BookError::MissingReference(format!("no customer {customer}")));
        }
        let guid = self.claim_guid(guid)?;
        self.insert_job(Job::new(guid.clone(), number, name, Owner::customer(customer.clone())));
        self.record_change(&guid, "jobs", String::new(), name.to_string());
        Ok(guid)
    }

    /// Create a job owned by a vendor
    pub fn create_vendor_job(
        &mut self,
        guid: Option<Guid>,
        number: &str,
        name: &str,
        vendor: &Guid,
    ) -> BookResult<Guid> {
        Self::require_nonblank(number, "number")?;
        Self::require_nonblank(name, "name")?;
        if self.vendor(vendor).is_none() {
            return Err(BookError::MissingReference(format!("no vendor {vendor}")));
        }
        let guid = self.claim_guid(guid)?;
        self.insert_job(Job::new(guid.clone(), number, name, Owner::vendor(vendor.clone())));
        self.record_change(&guid, "jobs", String::new(), name.to_string());
        Ok(guid)
    }

    /// Create a draft invoice issued to a customer
    pub fn create_customer_invoice(
        &mut self,
        guid: Option<Guid>,
        number: &str,
        customer: &Guid,
        currency: CommodityId,
        opened: DateTime<FixedOffset>,
    ) -> BookResult<Guid> {
        if self.customer(customer).is_none() {
            return Err(BookError::MissingReference(format!("no customer {customer}")));
        }
        self.create_invoice_with_owner(guid, number, Owner::customer(customer.clone()), currency, opened)
    }

    /// Create a draft bill received from a vendor
    pub fn create_vendor_bill(
        &mut self,
        guid: Option<Guid>,
        number: &str,
        vendor: &Guid,
        currency: CommodityId,
        opened: DateTime<FixedOffset>,
    ) -> BookResult<Guid> {
        if self.vendor(vendor).is_none() {
            return Err(BookError::MissingReference(format!("no vendor {vendor}")));
        }
        self.create_invoice_with_owner(guid, number, Owner::vendor(vendor.clone()), currency, opened)
    }

    /// Create a draft invoice issued against a job
    pub fn create_job_invoice(
        &mut self,
        guid: Option<Guid>,
        number: &str,
        job: &Guid,
        currency: CommodityId,
        opened: DateTime<FixedOffset>,
    ) -> BookResult<Guid> {
        if self.job(job).is_none() {
            return Err(BookError::MissingReference(format!("no job {job}")));
        }
        self.create_invoice_with_owner(guid, number, Owner::job(job.clone()), currency, opened)
    }

    fn create_invoice_with_owner(
        &mut self,
        guid: Option<Guid>,
        number: &str,
        owner: Owner,
        currency: CommodityId,
        opened: DateTime<FixedOffset>,
    ) -> BookResult<Guid> {
        Self::require_nonblank(number, "number")?;
        let guid = self.claim_guid(guid)?;
        self.insert_invoice(Invoice::new(guid.clone(), number, owner, currency, opened));
        self.record_change(&guid, "invoices", String::new(), number.to_string());
        Ok(guid)
    }

    /// Create a tax table; every destination account must exist
    pub fn create_tax_table(
        &mut self,
        guid: Option<Guid>,
        name: &str,
        entries: Vec<crate::taxtable::TaxTableEntry>,
    ) -> BookResult<Guid> {
        Self::require_nonblank(name, "name")?;
        for entry in &entries {
            self.account_idx(&entry.account)?;
        }
        let guid = self.claim_guid(guid)?;
        let mut table = TaxTable::new(guid.clone(), name);
        table.entries = entries;
        self.insert_tax_table(table);
        self.record_change(&guid, "taxTables", String::new(), name.to_string());
        Ok(guid)
    }

    /// Register a currency and record its conversion factor
    ///
    /// Idempotent: a commodity already present is left alone, and no
    /// duplicate price quote is appended when one for the same pair at
    /// the same factor already exists.
    pub fn add_currency(
        &mut self,
        namespace: &str,
        code: &str,
        factor: Fraction,
        fraction: i64,
        name: &str,
    ) -> BookResult<()> {
        Self::require_nonblank(namespace, "namespace")?;
        Self::require_nonblank(code, "code")?;
        let id = CommodityId::new(namespace, code);
        if self.commodity(&id).is_none() {
            let mut commodity = Commodity::new(id.clone(), fraction);
            if !name.trim().is_empty() {
                commodity.name = Some(name.to_string());
            }
            self.commodities.push(commodity);
        }
        self.currency_table.set_factor(id.clone(), factor);

        let base = self.base_currency.clone();
        if id != base && !self.price_db.has_quote(&id, &base, &factor) {
            self.price_db.push(Price {
                id: Guid::generate(),
                commodity: id,
                currency: base,
                time: Utc::now().fixed_offset(),
                source: "user:price-editor".into(),
                price_type: None,
                value: factor,
            });
        }
        Ok(())
    }

    // ---- removals --------------------------------------------------------

    /// Remove an account
    ///
    /// Refused while the account has child accounts or transaction
    /// splits; the book is left untouched on failure.
    pub fn remove_account(&mut self, id: &Guid) -> BookResult<()> {
        let idx = self.account_idx(id)?;
        if !self.account_children(id).is_empty() {
            return Err(BookError::ReferentialIntegrity(format!(
                "account {id} still has child accounts"
            )));
        }
        if !self.splits_for_account(id).is_empty() {
            return Err(BookError::ReferentialIntegrity(format!(
                "account {id} still has transaction splits"
            )));
        }
        let removed = self.accounts.remove(idx);
        self.reindex_accounts();
        self.invalidate_balances();
        self.record_change(id, "accounts", removed.name, String::new());
        Ok(())
    }

    /// Remove a transaction and all its splits
    pub fn remove_transaction(&mut self, id: &Guid) -> BookResult<()> {
        let idx = self.transaction_idx(id)?;
        if self.invoices.iter().any(|i| i.post_txn.as_ref() == Some(id)) {
            return Err(BookError::ReferentialIntegrity(format!(
                "transaction {id} is the posting transaction of an invoice"
            )));
        }
        let removed = self.transactions.remove(idx);
        self.reindex_transactions();
        self.invalidate_balances();
        self.record_change(id, "transactions", removed.description, String::new());
        Ok(())
    }

    /// Remove a customer; refused while jobs or invoices reference it
    pub fn remove_customer(&mut self, id: &Guid) -> BookResult<()> {
        let idx = self
            .customer_index
            .get(id)
            .copied()
            .ok_or_else(|| BookError::MissingReference(format!("no customer {id}")))?;
        self.check_owner_dependents(id, "customer")?;
        let removed = self.customers.remove(idx);
        self.customer_index =
            self.customers.iter().enumerate().map(|(i, c)| (c.id.clone(), i)).collect();
        self.record_change(id, "customers", removed.name, String::new());
        Ok(())
    }

    /// Remove a vendor; refused while jobs or invoices reference it
    pub fn remove_vendor(&mut self, id: &Guid) -> BookResult<()> {
        let idx = self
            .vendor_index
            .get(id)
            .copied()
            .ok_or_else(|| BookError::MissingReference(format!("no vendor {id}")))?;
        self.check_owner_dependents(id, "vendor")?;
        let removed = self.vendors.remove(idx);
        self.vendor_index =
            self.vendors.iter().enumerate().map(|(i, v)| (v.id.clone(), i)).collect();
        self.record_change(id, "vendors", removed.name, String::new());
        Ok(())
    }

    fn check_owner_dependents(&self, id: &Guid, what: &str) -> BookResult<()> {
        if !self.jobs_for_owner(id).is_empty() {
            return Err(BookError::ReferentialIntegrity(format!("{what} {id} still has jobs")));
        }
        if !self.invoices_for_owner(id).is_empty() {
            return Err(BookError::ReferentialIntegrity(format!(
                "{what} {id} still has invoices"
            )));
        }
        Ok(())
    }

    /// Remove a job; refused while invoices reference it
    pub fn remove_job(&mut self, id: &Guid) -> BookResult<()> {
        let idx = self
            .job_index
            .get(id)
            .copied()
            .ok_or_else(|| BookError::MissingReference(format!("no job {id}")))?;
        if !self.invoices_for_owner(id).is_empty() {
            return Err(BookError::ReferentialIntegrity(format!("job {id} still has invoices")));
        }
        let removed = self.jobs.remove(idx);
        self.job_index = self.jobs.iter().enumerate().map(|(i, j)| (j.id.clone(), i)).collect();
        self.record_change(id, "jobs", removed.name, String::new());
        Ok(())
    }

    /// Remove a draft invoice together with its entries
    ///
    /// A posted invoice is load-bearing for its transaction and lot and
    /// cannot be removed.
    pub fn remove_invoice(&mut self, id: &Guid) -> BookResult<()> {
        let idx = self.invoice_idx(id)?;
        if self.invoices[idx].is_posted() {
            return Err(BookError::ReferentialIntegrity(format!(
                "invoice {id} has a posting transaction"
            )));
        }
        let removed = self.invoices.remove(idx);
        self.invoice_index =
            self.invoices.iter().enumerate().map(|(i, v)| (v.id.clone(), i)).collect();
        self.entries.retain(|e| e.owning_invoice() != Some(id));
        self.entry_index =
            self.entries.iter().enumerate().map(|(i, e)| (e.id.clone(), i)).collect();
        self.record_change(id, "invoices", removed.number, String::new());
        Ok(())
    }

    /// Remove a tax table; refused while anything references it
    pub fn remove_tax_table(&mut self, id: &Guid) -> BookResult<()> {
        let idx = self
            .tax_table_index
            .get(id)
            .copied()
            .ok_or_else(|| BookError::MissingReference(format!("no tax table {id}")))?;
        let referenced = self.customers.iter().any(|c| c.tax_table.as_ref() == Some(id))
            || self.vendors.iter().any(|v| v.tax_table.as_ref() == Some(id))
            || self
                .entries
                .iter()
                .any(|e| e.i_taxtable.as_ref() == Some(id) || e.b_taxtable.as_ref() == Some(id))
            || self.tax_tables.iter().any(|t| t.parent.as_ref() == Some(id));
        if referenced {
            return Err(BookError::ReferentialIntegrity(format!(
                "tax table {id} is still referenced"
            )));
        }
        let removed = self.tax_tables.remove(idx);
        self.tax_table_index =
            self.tax_tables.iter().enumerate().map(|(i, t)| (t.id.clone(), i)).collect();
        self.record_change(id, "taxTables", removed.name, String::new());
        Ok(())
    }

    // ---- account mutation ------------------------------------------------

    /// Rename an account
    pub fn set_account_name(&mut self, id: &Guid, name: &str) -> BookResult<()> {
        Self::require_nonblank(name, "name")?;
        let idx = self.account_idx(id)?;
        let old = std::mem::replace(&mut self.accounts[idx].name, name.to_string());
        self.record_change(id, "name", old, name.to_string());
        Ok(())
    }

    /// Set an account's code
    pub fn set_account_code(&mut self, id: &Guid, code: Option<String>) -> BookResult<()> {
        let idx = self.account_idx(id)?;
        let old = std::mem::replace(&mut self.accounts[idx].code, code.clone());
        self.record_change(id, "code", old.unwrap_or_default(), code.unwrap_or_default());
        Ok(())
    }

    /// Set an account's description
    pub fn set_account_description(&mut self, id: &Guid, description: Option<String>) -> BookResult<()> {
        let idx = self.account_idx(id)?;
        let old = std::mem::replace(&mut self.accounts[idx].description, description.clone());
        self.record_change(id, "description", old.unwrap_or_default(), description.unwrap_or_default());
        Ok(())
    }

    /// Reparent an account
    ///
    /// Rejected when the new parent is the account itself or one of its
    /// descendants; both accounts are left unchanged on failure.
    pub fn set_account_parent(&mut self, id: &Guid, new_parent: &Guid) -> BookResult<()> {
        let idx = self.account_idx(id)?;
        self.account_idx(new_parent)?;
        if id == new_parent {
            return Err(BookError::ReferentialIntegrity(format!(
                "account {id} cannot be its own parent"
            )));
        }
        // Walk up from the proposed parent; finding ourselves means the
        // parent is a descendant. Bounded in case the file already holds
        // a cycle.
        let mut cursor = Some(new_parent.clone());
        for _ in 0..=self.accounts.len() {
            match cursor {
                None => break,
                Some(ancestor) => {
                    if &ancestor == id {
                        return Err(BookError::ReferentialIntegrity(format!(
                            "account {new_parent} is a descendant of {id}"
                        )));
                    }
                    cursor = self.account(&ancestor).and_then(|a| a.parent.clone());
                }
            }
        }
        let old = self.accounts[idx].parent.replace(new_parent.clone());
        self.record_change(
            id,
            "parent",
            old.map(|g| g.to_string()).unwrap_or_default(),
            new_parent.to_string(),
        );
        Ok(())
    }

    /// Set an account's user notes
    pub fn set_account_notes(&mut self, id: &Guid, notes: &str) -> BookResult<()> {
        let idx = self.account_idx(id)?;
        let old = self.accounts[idx].notes().unwrap_or_default().to_string();
        self.accounts[idx].set_notes(notes);
        self.record_change(id, "notes", old, notes.to_string());
        Ok(())
    }

    /// Set an account's placeholder flag
    pub fn set_account_placeholder(&mut self, id: &Guid, placeholder: bool) -> BookResult<()> {
        let idx = self.account_idx(id)?;
        let old = self.accounts[idx].is_placeholder();
        self.accounts[idx].set_placeholder(placeholder);
        self.record_change(id, "placeholder", old.to_string(), placeholder.to_string());
        Ok(())
    }

    /// Set or replace a user-defined slot on an account
    pub fn set_account_slot(&mut self, id: &Guid, key: &str, value: SlotValue) -> BookResult<()> {
        let idx = self.account_idx(id)?;
        self.accounts[idx].set_slot(key, value);
        self.record_change(id, "slots", String::new(), key.to_string());
        Ok(())
    }

    /// Set or replace a user-defined slot on a transaction
    pub fn set_transaction_slot(&mut self, id: &Guid, key: &str, value: SlotValue) -> BookResult<()> {
        let idx = self.transaction_idx(id)?;
        self.transactions[idx].set_slot(key, value);
        self.record_change(id, "slots", String::new(), key.to_string());
        Ok(())
    }

    // ---- transaction and split mutation ----------------------------------

    /// Set a transaction's description
    pub fn set_transaction_description(&mut self, id: &Guid, description: &str) -> BookResult<()> {
        let idx = self.transaction_idx(id)?;
        let old =
            std::mem::replace(&mut self.transactions[idx].description, description.to_string());
        self.record_change(id, "description", old, description.to_string());
        Ok(())
    }

    /// Set a transaction's number
    pub fn set_transaction_num(&mut self, id: &Guid, num: Option<String>) -> BookResult<()> {
        let idx = self.transaction_idx(id)?;
        let old = std::mem::replace(&mut self.transactions[idx].num, num.clone());
        self.record_change(id, "transactionNumber", old.unwrap_or_default(), num.unwrap_or_default());
        Ok(())
    }

    /// Set the posted date; clears cached balances since a split may
    /// move across "now"
    pub fn set_transaction_date_posted(
        &mut self,
        id: &Guid,
        date: DateTime<FixedOffset>,
    ) -> BookResult<()> {
        let idx = self.transaction_idx(id)?;
        let old = std::mem::replace(&mut self.transactions[idx].date_posted, date);
        self.invalidate_balances();
        self.record_change(id, "datePosted", old.to_rfc3339(), date.to_rfc3339());
        Ok(())
    }

    /// Append a split to a transaction and return the split identifier
    pub fn add_split(
        &mut self,
        txn: &Guid,
        account: &Guid,
        value: Fraction,
        quantity: Option<Fraction>,
    ) -> BookResult<Guid> {
        let txn_idx = self.transaction_idx(txn)?;
        self.account_idx(account)?;
        let split_guid = Guid::generate();
        let mut split = Split::new(split_guid.clone(), account.clone(), value);
        if let Some(quantity) = quantity {
            split.quantity = quantity;
        }
        self.transactions[txn_idx].add_split(split);
        self.invalidate_balances();
        self.record_change(txn, "transactionSplits", String::new(), split_guid.to_string());
        Ok(split_guid)
    }

    /// Remove a split from a transaction
    pub fn remove_split(&mut self, txn: &Guid, split: &Guid) -> BookResult<()> {
        let txn_idx = self.transaction_idx(txn)?;
        let splits = &mut self.transactions[txn_idx].splits;
        let pos = splits
            .iter()
            .position(|s| &s.id == split)
            .ok_or_else(|| BookError::MissingReference(format!("no split {split} in {txn}")))?;
        splits.remove(pos);
        self.invalidate_balances();
        self.record_change(txn, "transactionSplits", split.to_string(), String::new());
        Ok(())
    }

    /// Set a split's value and quantity
    pub fn set_split_amounts(
        &mut self,
        txn: &Guid,
        split: &Guid,
        value: Fraction,
        quantity: Fraction,
    ) -> BookResult<()> {
        let txn_idx = self.transaction_idx(txn)?;
        let splits = &mut self.transactions[txn_idx].splits;
        let target = splits
            .iter_mut()
            .find(|s| &s.id == split)
            .ok_or_else(|| BookError::MissingReference(format!("no split {split} in {txn}")))?;
        let old = target.value;
        target.value = value;
        target.quantity = quantity;
        self.invalidate_balances();
        self.record_change(split, "splits", old.to_string(), value.to_string());
        Ok(())
    }

    // ---- balances --------------------------------------------------------

    /// Current balance of an account: the sum of its splits' quantities
    pub fn account_balance(&self, account: &Guid) -> BookResult<Fraction> {
        let mut future = Vec::new();
        self.account_balance_excluding_future(account, Utc::now().fixed_offset(), &mut future)
    }

    /// Balance as of `now`, collecting future-dated splits
    ///
    /// Splits posted after `now` are skipped and their identifiers are
    /// appended to `future`. The result is memoized only when nothing
    /// was excluded: a future split could change the "current" balance
    /// once now advances past it.
    pub fn account_balance_excluding_future(
        &self,
        account: &Guid,
        now: DateTime<FixedOffset>,
        future: &mut Vec<Guid>,
    ) -> BookResult<Fraction> {
        self.account_idx(account)?;
        if let Some(cached) = self.balance_cache.borrow().get(account) {
            return Ok(*cached);
        }
        let mut sum = Fraction::zero();
        for (txn, split) in self.splits_for_account(account) {
            if txn.date_posted > now {
                future.push(split.id.clone());
                continue;
            }
            sum = sum.checked_add(&split.quantity)?;
        }
        if future.is_empty() {
            self.balance_cache.borrow_mut().insert(account.clone(), sum);
        }
        Ok(sum)
    }

    // ---- load-time repair ------------------------------------------------

    /// Merge multiple top-level accounts under a single root
    ///
    /// The first ROOT-typed account wins; every other parentless account
    /// is reparented under it with a logged warning.
    pub(crate) fn repair_root(&mut self) {
        let root = match self.accounts.iter().find(|a| a.is_root()) {
            Some(root) => root.id.clone(),
            None => {
                let orphans = self.accounts.iter().filter(|a| a.parent.is_none()).count();
                if orphans > 1 {
                    warn!("book has {orphans} top-level accounts and no ROOT account");
                }
                return;
            }
        };
        for account in &mut self.accounts {
            if account.parent.is_none() && account.id != root && !account.is_root() {
                warn!(
                    "reparenting stray top-level account {} ({}) under root {}",
                    account.name, account.id, root
                );
                account.parent = Some(root.clone());
            }
        }
    }
}
