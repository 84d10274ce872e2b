//! Invoice posting, payment and balanced entry mutation
//!
//! Posting an invoice creates its transaction and lot; recording a
//! payment against that lot freezes the invoice. Every entry-level
//! mutator checks modifiability first, and edits on a posted invoice
//! follow the subtract-then-add pattern: the entry's current
//! contribution is removed from the posting transaction, the entry is
//! changed, and the new contribution is added back, so the transaction
//! stays balanced through the edit.

use chrono::{DateTime, FixedOffset, Utc};

use cashbook_math::Fraction;

use crate::account::{AccountType, Lot};
use crate::book::Book;
use crate::business::OwnerKind;
use crate::error::{BookError, BookResult};
use crate::guid::Guid;
use crate::invoice::{EntryAction, InvoiceEntry, InvoiceRole, InvoiceState};
use crate::slots::{Slot, SlotHolder, SlotValue};
use crate::transaction::{split_action, Split, Transaction};

/// Which field group of an entry is in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySide {
    /// Customer invoice: the `i_*` group
    Invoice,
    /// Vendor bill: the `b_*` group
    Bill,
}

/// The balanced amounts one entry contributes to a posting transaction
#[derive(Debug, Clone)]
pub struct EntryAmounts {
    /// Tax-exclusive amount, posted against the entry's account
    pub net: Fraction,
    /// Tax amounts per destination account
    pub tax_parts: Vec<(Guid, Fraction)>,
    /// Tax-inclusive amount, posted against the receivable or payable
    pub gross: Fraction,
}

/// Parameters for creating an invoice entry
#[derive(Debug, Clone)]
pub struct NewEntry {
    /// Date of the billed work or delivery
    pub date: DateTime<FixedOffset>,
    /// Description shown on the invoice
    pub description: String,
    /// Action classification
    pub action: EntryAction,
    /// Billed quantity
    pub quantity: Fraction,
    /// Unit price
    pub price: Fraction,
    /// Income account (customer invoice) or expense account (bill)
    pub account: Guid,
    /// Whether the entry is taxable
    pub taxable: bool,
    /// Whether the price includes tax
    pub tax_included: bool,
    /// Tax table; required when taxable
    pub tax_table: Option<Guid>,
}

impl Book {
    /// Lifecycle state of an invoice
    pub fn invoice_state(&self, invoice: &Guid) -> BookResult<InvoiceState> {
        let idx = self.invoice_idx(invoice)?;
        if !self.invoices()[idx].is_posted() {
            return Ok(InvoiceState::Draft);
        }
        if self.paying_transactions(invoice)?.is_empty() {
            Ok(InvoiceState::Posted)
        } else {
            Ok(InvoiceState::Paid)
        }
    }

    /// Whether structural edits to the invoice are still allowed
    ///
    /// True exactly while the invoice has zero paying transactions.
    pub fn is_invoice_modifiable(&self, invoice: &Guid) -> BookResult<bool> {
        Ok(self.invoice_state(invoice)? != InvoiceState::Paid)
    }

    /// Transactions paying into the invoice's lot
    pub fn paying_transactions(&self, invoice: &Guid) -> BookResult<Vec<&Transaction>> {
        let idx = self.invoice_idx(invoice)?;
        let inv = &self.invoices()[idx];
        let lot = match &inv.post_lot {
            Some(lot) => lot,
            None => return Ok(Vec::new()),
        };
        Ok(self
            .transactions()
            .iter()
            .filter(|t| Some(&t.id) != inv.post_txn.as_ref())
            .filter(|t| t.splits.iter().any(|s| s.lot.as_ref() == Some(lot)))
            .collect())
    }

    /// Which entry field group the invoice reads
    ///
    /// A job invoice resolves through the job to its owner's side.
    pub fn invoice_entry_side(&self, invoice: &Guid) -> BookResult<EntrySide> {
        let idx = self.invoice_idx(invoice)?;
        let inv = &self.invoices()[idx];
        match inv.role() {
            InvoiceRole::CustomerInvoice => Ok(EntrySide::Invoice),
            InvoiceRole::VendorBill => Ok(EntrySide::Bill),
            InvoiceRole::JobInvoice => {
                let job = self
                    .job(&inv.owner.guid)
                    .ok_or_else(|| BookError::MissingReference(format!("no job {}", inv.owner.guid)))?;
                match job.owner.kind {
                    OwnerKind::Customer => Ok(EntrySide::Invoice),
                    OwnerKind::Vendor => Ok(EntrySide::Bill),
                    OwnerKind::Job => Err(BookError::Schema(format!(
                        "job {} is owned by another job",
                        job.id
                    ))),
                }
            }
        }
    }

    /// The balanced amounts an entry contributes, per its side
    ///
    /// A taxable entry must resolve a tax table; there is no fallback to
    /// an arbitrary table.
    pub fn entry_amounts(&self, entry: &InvoiceEntry, side: EntrySide) -> BookResult<EntryAmounts> {
        let price = match side {
            EntrySide::Invoice => entry.i_price,
            EntrySide::Bill => entry.b_price,
        }
        .ok_or_else(|| BookError::MissingReference(format!("entry {} has no price", entry.id)))?;
        let base = entry.quantity.checked_mul(&price)?;

        let (taxable, tax_included, table_ref) = match side {
            EntrySide::Invoice => (entry.i_taxable, entry.i_taxincluded, &entry.i_taxtable),
            EntrySide::Bill => (entry.b_taxable, entry.b_taxincluded, &entry.b_taxtable),
        };
        if !taxable {
            return Ok(EntryAmounts { net: base, tax_parts: Vec::new(), gross: base });
        }

        let table_guid = table_ref.as_ref().ok_or_else(|| {
            BookError::MissingReference(format!("taxable entry {} has no tax table", entry.id))
        })?;
        let table = self
            .tax_table(table_guid)
            .ok_or_else(|| BookError::MissingReference(format!("no tax table {table_guid}")))?;
        if table.entries.is_empty() {
            return Err(BookError::MissingReference(format!(
                "tax table {} has no entries",
                table.name
            )));
        }

        let hundred = Fraction::from_int(100);
        let percent_sum = table.percent_sum()?;
        let mut value_sum = Fraction::zero();
        for tte in &table.entries {
            if tte.basis == crate::taxtable::TaxBasis::Value {
                value_sum = value_sum.checked_add(&tte.amount)?;
            }
        }

        let net = if tax_included {
            // Back the tax out: net = (base - values) * 100 / (100 + percent)
            let scale = hundred.checked_add(&percent_sum)?.recip()?;
            base.checked_sub(&value_sum)?.checked_mul(&hundred)?.checked_mul(&scale)?
        } else {
            base
        };

        let mut tax_parts = Vec::with_capacity(table.entries.len());
        let mut gross = net;
        for tte in &table.entries {
            let amount = match tte.basis {
                crate::taxtable::TaxBasis::Percent => {
                    net.checked_mul(&tte.amount)?.checked_div_int(100)?
                }
                crate::taxtable::TaxBasis::Value => tte.amount,
            };
            gross = gross.checked_add(&amount)?;
            tax_parts.push((tte.account.clone(), amount));
        }
        Ok(EntryAmounts { net, tax_parts, gross })
    }

    /// Post an invoice: create its transaction and lot
    ///
    /// The post account must be RECEIVABLE for a customer invoice and
    /// PAYABLE for a vendor bill. The generated transaction carries one
    /// split per entry account, one per tax destination account and the
    /// offsetting split on the post account, and is asserted to balance.
    pub fn post_invoice(
        &mut self,
        invoice: &Guid,
        post_account: &Guid,
        post_date: DateTime<FixedOffset>,
        due_date: DateTime<FixedOffset>,
        description: &str,
    ) -> BookResult<Guid> {
        let idx = self.invoice_idx(invoice)?;
        if self.invoices()[idx].is_posted() {
            return Err(BookError::StateViolation(format!("invoice {invoice} is already posted")));
        }
        let side = self.invoice_entry_side(invoice)?;
        let account = self
            .account(post_account)
            .ok_or_else(|| BookError::MissingReference(format!("no account {post_account}")))?;
        let expected = match side {
            EntrySide::Invoice => AccountType::Receivable,
            EntrySide::Bill => AccountType::Payable,
        };
        if account.account_type != expected {
            return Err(BookError::TypeMismatch(format!(
                "post account {} is {}, expected {}",
                post_account,
                account.account_type.as_str(),
                expected.as_str()
            )));
        }

        // Gather all contributions before touching anything.
        let currency = self.invoices()[idx].currency.clone();
        let number = self.invoices()[idx].number.clone();
        let entry_ids: Vec<Guid> =
            self.entries_for_invoice(invoice).iter().map(|e| e.id.clone()).collect();
        let mut contributions = Vec::with_capacity(entry_ids.len());
        for entry_id in &entry_ids {
            let entry_idx = self.entry_idx(entry_id)?;
            let entry = &self.entries()[entry_idx];
            let entry_account = match side {
                EntrySide::Invoice => entry.i_acct.clone(),
                EntrySide::Bill => entry.b_acct.clone(),
            }
            .ok_or_else(|| {
                BookError::MissingReference(format!("entry {} has no account", entry.id))
            })?;
            let amounts = self.entry_amounts(entry, side)?;
            contributions.push((entry_account, amounts));
        }

        // A customer invoice debits the receivable; a bill credits the
        // payable.
        let entry_sign = match side {
            EntrySide::Invoice => -1,
            EntrySide::Bill => 1,
        };

        let txn_guid = Guid::generate();
        let lot_guid = Guid::generate();
        let mut txn = Transaction::new(
            txn_guid.clone(),
            currency,
            post_date,
            Utc::now().fixed_offset(),
        );
        txn.description = description.to_string();
        txn.num = Some(number);
        txn.set_slot("trans-txn-type", SlotValue::Text("I".into()));
        txn.set_slot("trans-date-due", SlotValue::Timespec(due_date));
        txn.set_slot(
            "gncInvoice",
            SlotValue::Frame(vec![Slot::new("invoice-guid", SlotValue::Guid(invoice.clone()))]),
        );

        let mut gross_total = Fraction::zero();
        for (entry_account, amounts) in &contributions {
            accumulate_split(&mut txn, entry_account, &signed(&amounts.net, entry_sign), None)?;
            for (tax_account, tax) in &amounts.tax_parts {
                accumulate_split(&mut txn, tax_account, &signed(tax, entry_sign), None)?;
            }
            gross_total = gross_total.checked_add(&amounts.gross)?;
        }
        let offset_value = signed(&gross_total, -entry_sign);
        let mut offset = Split::new(Guid::generate(), post_account.clone(), offset_value);
        offset.lot = Some(lot_guid.clone());
        offset.action = Some(
            match side {
                EntrySide::Invoice => split_action::INVOICE,
                EntrySide::Bill => split_action::BILL,
            }
            .to_string(),
        );
        txn.add_split(offset);

        if !txn.is_balanced()? {
            return Err(BookError::StateViolation(format!(
                "posting transaction for invoice {invoice} does not balance: sum {}",
                txn.value_sum()?
            )));
        }

        let mut lot = Lot::new(lot_guid.clone());
        lot.set_slot(
            "gncInvoice",
            SlotValue::Frame(vec![Slot::new("invoice-guid", SlotValue::Guid(invoice.clone()))]),
        );
        self.account_mut(post_account)?.lots.push(lot);
        self.insert_transaction(txn);

        let inv = self.invoice_mut(invoice)?;
        inv.posted = Some(post_date);
        inv.post_txn = Some(txn_guid.clone());
        inv.post_lot = Some(lot_guid);
        inv.post_acc = Some(post_account.clone());
        Ok(txn_guid)
    }

    /// Record a payment against a posted invoice
    ///
    /// Creates the payment transaction whose receivable/payable split
    /// references the invoice's lot; the first payment moves the invoice
    /// to the Paid state.
    pub fn pay_invoice(
        &mut self,
        invoice: &Guid,
        transfer_account: &Guid,
        amount: Fraction,
        date: DateTime<FixedOffset>,
        memo: &str,
    ) -> BookResult<Guid> {
        let idx = self.invoice_idx(invoice)?;
        let (post_lot, post_acc, currency) = {
            let inv = &self.invoices()[idx];
            match (&inv.post_lot, &inv.post_acc) {
                (Some(lot), Some(acc)) => (lot.clone(), acc.clone(), inv.currency.clone()),
                _ => {
                    return Err(BookError::StateViolation(format!(
                        "invoice {invoice} is not posted"
                    )))
                }
            }
        };
        let side = self.invoice_entry_side(invoice)?;
        if self.account(transfer_account).is_none() {
            return Err(BookError::MissingReference(format!("no account {transfer_account}")));
        }

        let txn_guid = Guid::generate();
        let mut txn =
            Transaction::new(txn_guid.clone(), currency, date, Utc::now().fixed_offset());
        txn.description = memo.to_string();
        txn.set_slot("trans-txn-type", SlotValue::Text("P".into()));

        // Money moves opposite to the posting: a customer payment debits
        // the transfer account and settles the receivable.
        let (transfer_value, settle_value) = match side {
            EntrySide::Invoice => (amount, amount.negated()),
            EntrySide::Bill => (amount.negated(), amount),
        };
        let mut transfer = Split::new(Guid::generate(), transfer_account.clone(), transfer_value);
        transfer.action = Some(split_action::PAYMENT.to_string());
        txn.add_split(transfer);
        let mut settle = Split::new(Guid::generate(), post_acc, settle_value);
        settle.action = Some(split_action::PAYMENT.to_string());
        settle.lot = Some(post_lot);
        txn.add_split(settle);

        self.insert_transaction(txn);
        Ok(txn_guid)
    }

    /// Create an entry on an invoice
    ///
    /// Rejected once the invoice is paid. On a posted invoice the new
    /// entry's contribution is immediately added to the posting
    /// transaction so it stays balanced.
    pub fn create_invoice_entry(&mut self, invoice: &Guid, params: NewEntry) -> BookResult<Guid> {
        let idx = self.invoice_idx(invoice)?;
        if !self.is_invoice_modifiable(invoice)? {
            return Err(BookError::StateViolation(format!(
                "invoice {invoice} already has paying transactions"
            )));
        }
        let side = self.invoice_entry_side(invoice)?;
        if self.account(&params.account).is_none() {
            return Err(BookError::MissingReference(format!("no account {}", params.account)));
        }
        if let Some(table) = &params.tax_table {
            if self.tax_table(table).is_none() {
                return Err(BookError::MissingReference(format!("no tax table {table}")));
            }
        }

        let guid = Guid::generate();
        let mut entry = InvoiceEntry::new(
            guid.clone(),
            params.date,
            Utc::now().fixed_offset(),
            params.action,
            params.quantity,
        );
        entry.description = params.description;
        match side {
            EntrySide::Invoice => {
                entry.invoice = Some(invoice.clone());
                entry.i_acct = Some(params.account);
                entry.i_price = Some(params.price);
                entry.i_taxable = params.taxable;
                entry.i_taxincluded = params.tax_included;
                entry.i_taxtable = params.tax_table;
            }
            EntrySide::Bill => {
                entry.bill = Some(invoice.clone());
                entry.b_acct = Some(params.account);
                entry.b_price = Some(params.price);
                entry.b_taxable = params.taxable;
                entry.b_taxincluded = params.tax_included;
                entry.b_taxtable = params.tax_table;
            }
        }
        self.insert_entry(entry);

        if self.invoices()[idx].is_posted() {
            self.apply_entry_contribution(invoice, &guid, false)?;
        }
        Ok(guid)
    }

    /// Remove an entry from its invoice
    ///
    /// Rejected once the invoice is paid. On a posted invoice the
    /// entry's contribution is subtracted from the posting transaction
    /// first.
    pub fn remove_invoice_entry(&mut self, entry: &Guid) -> BookResult<()> {
        let entry_idx = self.entry_idx(entry)?;
        let invoice = self.entries()[entry_idx]
            .owning_invoice()
            .cloned()
            .ok_or_else(|| BookError::MissingReference(format!("entry {entry} has no invoice")))?;
        if !self.is_invoice_modifiable(&invoice)? {
            return Err(BookError::StateViolation(format!(
                "invoice {invoice} already has paying transactions"
            )));
        }
        if self.invoice(&invoice).map(|i| i.is_posted()).unwrap_or(false) {
            self.apply_entry_contribution(&invoice, entry, true)?;
        }
        self.remove_entry_record(entry)
    }

    /// Set an entry's quantity, keeping the posting transaction balanced
    pub fn set_entry_quantity(&mut self, entry: &Guid, quantity: Fraction) -> BookResult<()> {
        self.edit_entry(entry, None, move |e| {
            let old = std::mem::replace(&mut e.quantity, quantity);
            ("quantity", old.to_string(), quantity.to_string())
        })
    }

    /// Set an entry's action classification
    pub fn set_entry_action(&mut self, entry: &Guid, action: EntryAction) -> BookResult<()> {
        self.edit_entry(entry, None, move |e| {
            let old = std::mem::replace(&mut e.action, action);
            ("action", old.as_str().to_string(), action.as_str().to_string())
        })
    }

    /// Set the invoice-side unit price; rejected on a vendor bill
    pub fn set_entry_invoice_price(&mut self, entry: &Guid, price: Fraction) -> BookResult<()> {
        self.edit_entry(entry, Some(EntrySide::Invoice), move |e| {
            let old = e.i_price.replace(price);
            ("price", render(old), price.to_string())
        })
    }

    /// Set the bill-side unit price; rejected on a customer invoice
    pub fn set_entry_bill_price(&mut self, entry: &Guid, price: Fraction) -> BookResult<()> {
        self.edit_entry(entry, Some(EntrySide::Bill), move |e| {
            let old = e.b_price.replace(price);
            ("price", render(old), price.to_string())
        })
    }

    /// Set the invoice-side taxable flag; rejected on a vendor bill
    pub fn set_entry_invoice_taxable(&mut self, entry: &Guid, taxable: bool) -> BookResult<()> {
        self.edit_entry(entry, Some(EntrySide::Invoice), move |e| {
            let old = std::mem::replace(&mut e.i_taxable, taxable);
            ("taxable", old.to_string(), taxable.to_string())
        })
    }

    /// Set the bill-side taxable flag; rejected on a customer invoice
    pub fn set_entry_bill_taxable(&mut self, entry: &Guid, taxable: bool) -> BookResult<()> {
        self.edit_entry(entry, Some(EntrySide::Bill), move |e| {
            let old = std::mem::replace(&mut e.b_taxable, taxable);
            ("taxable", old.to_string(), taxable.to_string())
        })
    }

    /// Set the invoice-side tax-included flag; rejected on a vendor bill
    pub fn set_entry_invoice_tax_included(&mut self, entry: &Guid, included: bool) -> BookResult<()> {
        self.edit_entry(entry, Some(EntrySide::Invoice), move |e| {
            let old = std::mem::replace(&mut e.i_taxincluded, included);
            ("taxIncluded", old.to_string(), included.to_string())
        })
    }

    /// Set the bill-side tax-included flag; rejected on a customer invoice
    pub fn set_entry_bill_tax_included(&mut self, entry: &Guid, included: bool) -> BookResult<()> {
        self.edit_entry(entry, Some(EntrySide::Bill), move |e| {
            let old = std::mem::replace(&mut e.b_taxincluded, included);
            ("taxIncluded", old.to_string(), included.to_string())
        })
    }

    /// Set the invoice-side tax table; rejected on a vendor bill
    pub fn set_entry_invoice_tax_table(&mut self, entry: &Guid, table: Guid) -> BookResult<()> {
        if self.tax_table(&table).is_none() {
            return Err(BookError::MissingReference(format!("no tax table {table}")));
        }
        self.edit_entry(entry, Some(EntrySide::Invoice), move |e| {
            let old = e.i_taxtable.replace(table.clone());
            ("taxTable", render(old), table.to_string())
        })
    }

    /// Set the bill-side tax table; rejected on a customer invoice
    pub fn set_entry_bill_tax_table(&mut self, entry: &Guid, table: Guid) -> BookResult<()> {
        if self.tax_table(&table).is_none() {
            return Err(BookError::MissingReference(format!("no tax table {table}")));
        }
        self.edit_entry(entry, Some(EntrySide::Bill), move |e| {
            let old = e.b_taxtable.replace(table.clone());
            ("taxTable", render(old), table.to_string())
        })
    }

    // Shared edit path: check side and modifiability, then
    // subtract-then-add around the closure when the invoice is posted.
    fn edit_entry<F>(&mut self, entry: &Guid, required: Option<EntrySide>, apply: F) -> BookResult<()>
    where
        F: FnOnce(&mut InvoiceEntry) -> (&'static str, String, String),
    {
        let entry_idx = self.entry_idx(entry)?;
        let invoice = self.entries()[entry_idx]
            .owning_invoice()
            .cloned()
            .ok_or_else(|| BookError::MissingReference(format!("entry {entry} has no invoice")))?;
        let side = self.invoice_entry_side(&invoice)?;
        if let Some(required) = required {
            if required != side {
                return Err(BookError::TypeMismatch(format!(
                    "entry {entry} belongs to a {} invoice",
                    match side {
                        EntrySide::Invoice => "customer",
                        EntrySide::Bill => "vendor",
                    }
                )));
            }
        }
        if !self.is_invoice_modifiable(&invoice)? {
            return Err(BookError::StateViolation(format!(
                "invoice {invoice} already has paying transactions"
            )));
        }
        let posted = self.invoice(&invoice).map(|i| i.is_posted()).unwrap_or(false);
        if posted {
            self.apply_entry_contribution(&invoice, entry, true)?;
        }
        let (property, old, new) = apply(self.entry_mut(entry)?);
        self.push_change(entry, property, old, new);
        if posted {
            self.apply_entry_contribution(&invoice, entry, false)?;
        }
        Ok(())
    }

    // Add (or, negated, subtract) an entry's contribution to its
    // invoice's posting transaction, locating or creating each split.
    fn apply_entry_contribution(&mut self, invoice: &Guid, entry: &Guid, negate: bool) -> BookResult<()> {
        let side = self.invoice_entry_side(invoice)?;
        let (txn_guid, post_lot, post_acc) = {
            let idx = self.invoice_idx(invoice)?;
            let inv = &self.invoices()[idx];
            match (&inv.post_txn, &inv.post_lot, &inv.post_acc) {
                (Some(txn), Some(lot), Some(acc)) => (txn.clone(), lot.clone(), acc.clone()),
                _ => {
                    return Err(BookError::StateViolation(format!(
                        "invoice {invoice} is not posted"
                    )))
                }
            }
        };
        let entry_idx = self.entry_idx(entry)?;
        let entry_record = &self.entries()[entry_idx];
        let entry_account = match side {
            EntrySide::Invoice => entry_record.i_acct.clone(),
            EntrySide::Bill => entry_record.b_acct.clone(),
        }
        .ok_or_else(|| BookError::MissingReference(format!("entry {entry} has no account")))?;
        let amounts = self.entry_amounts(entry_record, side)?;

        let mut entry_sign = match side {
            EntrySide::Invoice => -1,
            EntrySide::Bill => 1,
        };
        if negate {
            entry_sign = -entry_sign;
        }

        let txn = self.transaction_mut(&txn_guid)?;
        accumulate_split(txn, &entry_account, &signed(&amounts.net, entry_sign), None)?;
        for (tax_account, tax) in &amounts.tax_parts {
            accumulate_split(txn, tax_account, &signed(tax, entry_sign), None)?;
        }
        accumulate_split(txn, &post_acc, &signed(&amounts.gross, -entry_sign), Some(&post_lot))?;
        debug_assert!(self.transaction(&txn_guid).unwrap().is_balanced().unwrap_or(false));

        self.invalidate_all_balances();
        self.push_change(&txn_guid, "splits", String::new(), entry.to_string());
        Ok(())
    }

    pub(crate) fn remove_entry_record(&mut self, entry: &Guid) -> BookResult<()> {
        let entry_idx = self.entry_idx(entry)?;
        self.drop_entry_at(entry_idx);
        self.push_change(entry, "invoiceEntries", entry.to_string(), String::new());
        Ok(())
    }
}

fn render(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn signed(amount: &Fraction, sign: i32) -> Fraction {
    if sign < 0 {
        amount.negated()
    } else {
        *amount
    }
}

// Locate the split for the given account (or lot, for the offsetting
// split) and shift its value; create the split when absent.
fn accumulate_split(
    txn: &mut Transaction,
    account: &Guid,
    delta: &Fraction,
    lot: Option<&Guid>,
) -> BookResult<()> {
    let position = match lot {
        Some(lot) => txn.splits.iter().position(|s| s.lot.as_ref() == Some(lot)),
        None => txn.splits.iter().position(|s| &s.account == account && s.lot.is_none()),
    };
    match position {
        Some(idx) => {
            let split = &mut txn.splits[idx];
            split.value = split.value.checked_add(delta)?;
            split.quantity = split.quantity.checked_add(delta)?;
        }
        None => {
            let mut split = Split::new(Guid::generate(), account.clone(), *delta);
            split.lot = lot.cloned();
            txn.add_split(split);
        }
    }
    Ok(())
}
