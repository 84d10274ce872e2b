//! Entity to element-tree encoding
//!
//! Builds the document the writer serializes. Count-data values are
//! recomputed from the live collections and the top-level elements are
//! stable-sorted into the fixed type-priority order before anything is
//! written; an unrecognized element kind aborts the save.

use chrono::{DateTime, FixedOffset};

use cashbook_math::{Commodity, CommodityId, Fraction};

use crate::account::{Account, Lot};
use crate::book::Book;
use crate::business::{Address, Customer, Job, Owner, Vendor};
use crate::error::{BookError, BookResult};
use crate::guid::Guid;
use crate::invoice::{Invoice, InvoiceEntry};
use crate::price::Price;
use crate::slots::{Slot, SlotValue};
use crate::taxtable::TaxTable;
use crate::transaction::{Split, Transaction, TS_FORMAT};
use crate::xml::dom::XmlElement;

const VERSION: &str = "2.0.0";

// Fixed type-priority order for top-level book elements. The sort is
// stable, so within a type the book's insertion order survives.
fn raw_priority(name: &str) -> BookResult<u8> {
    Ok(match name {
        "gnc_budget" => 3,
        "gnc_template-transactions" => 5,
        "gnc_schedxaction" => 6,
        "gnc_GncEmployee" => 11,
        "gnc_GncBillTerm" => 13,
        other => {
            return Err(BookError::Schema(format!(
                "unrecognized element in book element list: {other}"
            )))
        }
    })
}

fn count_data(cd_type: &str, count: usize) -> XmlElement {
    XmlElement::new("gnc_count-data").with_attr("cd_type", cd_type).with_text(count.to_string())
}

// Empty text stays out of the tree so an empty element reads back in
// the same shape it was written from.
fn text_el(name: &str, text: impl Into<String>) -> XmlElement {
    let text = text.into();
    let el = XmlElement::new(name);
    if text.is_empty() {
        el
    } else {
        el.with_text(text)
    }
}

fn guid_el(name: &str, guid: &Guid) -> XmlElement {
    XmlElement::new(name).with_attr("type", "guid").with_text(guid.as_str())
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn ts_el(name: &str, when: &DateTime<FixedOffset>) -> XmlElement {
    XmlElement::new(name).with_child(text_el("ts_date", when.format(TS_FORMAT).to_string()))
}

fn commodity_ref_el(name: &str, id: &CommodityId) -> XmlElement {
    XmlElement::new(name)
        .with_child(text_el("cmdty_space", &id.namespace))
        .with_child(text_el("cmdty_id", &id.code))
}

fn fraction_el(name: &str, value: &Fraction) -> XmlElement {
    text_el(name, value.to_string())
}

// ---- slots ---------------------------------------------------------------

fn slot_value_el(value: &SlotValue) -> XmlElement {
    let el = XmlElement::new("slot_value").with_attr("type", value.type_name());
    match value {
        SlotValue::Text(s) => el.with_text(s),
        SlotValue::Integer(i) => el.with_text(i.to_string()),
        SlotValue::Numeric(f) => el.with_text(f.to_string()),
        SlotValue::Guid(g) => el.with_text(g.as_str()),
        SlotValue::GDate(d) => el.with_child(text_el("gdate", d.format("%Y-%m-%d").to_string())),
        SlotValue::Timespec(t) => el.with_child(text_el("ts_date", t.format(TS_FORMAT).to_string())),
        SlotValue::Frame(slots) => {
            let mut frame = el;
            for slot in slots {
                frame.push(slot_el(slot));
            }
            frame
        }
    }
}

fn slot_el(slot: &Slot) -> XmlElement {
    XmlElement::new("slot")
        .with_child(text_el("slot_key", &slot.key))
        .with_child(slot_value_el(&slot.value))
}

fn slots_el(name: &str, slots: &[Slot]) -> Option<XmlElement> {
    if slots.is_empty() {
        return None;
    }
    let mut el = XmlElement::new(name);
    for slot in slots {
        el.push(slot_el(slot));
    }
    Some(el)
}

// ---- entities ------------------------------------------------------------

fn commodity_el(commodity: &Commodity) -> XmlElement {
    let mut el = XmlElement::new("gnc_commodity").with_attr("version", VERSION);
    el.push(text_el("cmdty_space", &commodity.id.namespace));
    el.push(text_el("cmdty_id", &commodity.id.code));
    if let Some(name) = &commodity.name {
        el.push(text_el("cmdty_name", name));
    }
    if let Some(xcode) = &commodity.exchange_code {
        el.push(text_el("cmdty_xcode", xcode));
    }
    el.push(text_el("cmdty_fraction", commodity.fraction.to_string()));
    if commodity.get_quotes {
        el.push(XmlElement::new("cmdty_get_quotes"));
    }
    if let Some(source) = &commodity.quote_source {
        el.push(text_el("cmdty_quote_source", source));
    }
    if let Some(tz) = &commodity.quote_tz {
        // Wire-form name: quote_tz is not on the folding exclusion list.
        el.push(text_el("cmdty:quote_tz", tz));
    }
    el
}

fn lot_el(lot: &Lot) -> XmlElement {
    let mut el = XmlElement::new("gnc_lot");
    el.push(guid_el("lot_id", &lot.id));
    if let Some(slots) = slots_el("lot_slots", &lot.slots) {
        el.push(slots);
    }
    el
}

fn account_el(account: &Account) -> XmlElement {
    let mut el = XmlElement::new("gnc_account").with_attr("version", VERSION);
    el.push(text_el("act_name", &account.name));
    el.push(guid_el("act_id", &account.id));
    el.push(text_el("act_type", account.account_type.as_str()));
    el.push(commodity_ref_el("act_commodity", &account.commodity));
    el.push(text_el("act_commodity-scu", account.commodity_scu.to_string()));
    if account.non_standard_scu {
        el.push(XmlElement::new("act_non-standard-scu"));
    }
    if let Some(code) = &account.code {
        el.push(text_el("act_code", code));
    }
    if let Some(description) = &account.description {
        el.push(text_el("act_description", description));
    }
    if let Some(slots) = slots_el("act_slots", &account.slots) {
        el.push(slots);
    }
    if let Some(parent) = &account.parent {
        el.push(guid_el("act_parent", parent));
    }
    if !account.lots.is_empty() {
        let mut lots = XmlElement::new("act_lots");
        for lot in &account.lots {
            lots.push(lot_el(lot));
        }
        el.push(lots);
    }
    el
}

fn split_el(split: &Split) -> XmlElement {
    let mut el = XmlElement::new("trn_split");
    el.push(guid_el("split_id", &split.id));
    if let Some(memo) = &split.memo {
        el.push(text_el("split_memo", memo));
    }
    if let Some(action) = &split.action {
        el.push(text_el("split_action", action));
    }
    el.push(text_el("split_reconciled-state", split.reconciled.as_str()));
    el.push(fraction_el("split_value", &split.value));
    el.push(fraction_el("split_quantity", &split.quantity));
    el.push(guid_el("split_account", &split.account));
    if let Some(lot) = &split.lot {
        el.push(guid_el("split_lot", lot));
    }
    el
}

fn transaction_el(txn: &Transaction) -> XmlElement {
    let mut el = XmlElement::new("gnc_transaction").with_attr("version", VERSION);
    el.push(guid_el("trn_id", &txn.id));
    el.push(commodity_ref_el("trn_currency", &txn.currency));
    if let Some(num) = &txn.num {
        el.push(text_el("trn_num", num));
    }
    el.push(ts_el("trn_date-posted", &txn.date_posted));
    el.push(ts_el("trn_date-entered", &txn.date_entered));
    // Always present, even when empty: the writer keeps it explicit.
    el.push(text_el("trn_description", &txn.description));
    if let Some(slots) = slots_el("trn_slots", &txn.slots) {
        el.push(slots);
    }
    let mut splits = XmlElement::new("trn_splits");
    for split in &txn.splits {
        splits.push(split_el(split));
    }
    el.push(splits);
    el
}

fn address_el(name: &str, address: &Address) -> XmlElement {
    let mut el = XmlElement::new(name).with_attr("version", VERSION);
    for (tag, value) in [
        ("addr_name", &address.name),
        ("addr_addr1", &address.addr1),
        ("addr_addr2", &address.addr2),
        ("addr_addr3", &address.addr3),
        ("addr_addr4", &address.addr4),
        ("addr_phone", &address.phone),
        ("addr_fax", &address.fax),
        ("addr_email", &address.email),
    ] {
        if !value.is_empty() {
            el.push(text_el(tag, value));
        }
    }
    el
}

fn owner_el(name: &str, owner: &Owner) -> XmlElement {
    XmlElement::new(name)
        .with_attr("version", VERSION)
        .with_child(text_el("owner_type", owner.kind.as_str()))
        .with_child(guid_el("owner_id", &owner.guid))
}

fn customer_el(customer: &Customer) -> XmlElement {
    let mut el = XmlElement::new("gnc_GncCustomer").with_attr("version", VERSION);
    el.push(guid_el("cust_guid", &customer.id));
    el.push(text_el("cust_name", &customer.name));
    el.push(text_el("cust_id", &customer.number));
    el.push(address_el("cust_addr", &customer.address));
    el.push(address_el("cust_shipaddr", &customer.ship_address));
    if let Some(notes) = &customer.notes {
        el.push(text_el("cust_notes", notes));
    }
    if let Some(terms) = &customer.terms {
        el.push(guid_el("cust_terms", terms));
    }
    el.push(text_el("cust_taxincluded", customer.tax_included.as_str()));
    el.push(text_el("cust_active", bool_text(customer.active)));
    el.push(fraction_el("cust_discount", &customer.discount));
    el.push(fraction_el("cust_credit", &customer.credit));
    el.push(commodity_ref_el("cust_currency", &customer.currency));
    el.push(text_el("cust_use-tt", bool_text(customer.tax_table_override)));
    if let Some(table) = &customer.tax_table {
        el.push(guid_el("cust_taxtable", table));
    }
    if let Some(slots) = slots_el("cust_slots", &customer.slots) {
        el.push(slots);
    }
    el
}

fn vendor_el(vendor: &Vendor) -> XmlElement {
    let mut el = XmlElement::new("gnc_GncVendor").with_attr("version", VERSION);
    el.push(guid_el("vendor_guid", &vendor.id));
    el.push(text_el("vendor_name", &vendor.name));
    el.push(text_el("vendor_id", &vendor.number));
    el.push(address_el("vendor_addr", &vendor.address));
    if let Some(notes) = &vendor.notes {
        el.push(text_el("vendor_notes", notes));
    }
    if let Some(terms) = &vendor.terms {
        el.push(guid_el("vendor_terms", terms));
    }
    el.push(text_el("vendor_taxincluded", vendor.tax_included.as_str()));
    el.push(text_el("vendor_active", bool_text(vendor.active)));
    el.push(commodity_ref_el("vendor_currency", &vendor.currency));
    el.push(text_el("vendor_use-tt", bool_text(vendor.tax_table_override)));
    if let Some(table) = &vendor.tax_table {
        el.push(guid_el("vendor_taxtable", table));
    }
    if let Some(slots) = slots_el("vendor_slots", &vendor.slots) {
        el.push(slots);
    }
    el
}

fn job_el(job: &Job) -> XmlElement {
    let mut el = XmlElement::new("gnc_GncJob").with_attr("version", VERSION);
    el.push(guid_el("job_guid", &job.id));
    el.push(text_el("job_id", &job.number));
    el.push(text_el("job_name", &job.name));
    if let Some(reference) = &job.reference {
        el.push(text_el("job_reference", reference));
    }
    el.push(owner_el("job_owner", &job.owner));
    el.push(text_el("job_active", bool_text(job.active)));
    el
}

fn invoice_el(invoice: &Invoice) -> XmlElement {
    let mut el = XmlElement::new("gnc_GncInvoice").with_attr("version", VERSION);
    el.push(guid_el("invoice_guid", &invoice.id));
    el.push(text_el("invoice_id", &invoice.number));
    el.push(owner_el("invoice_owner", &invoice.owner));
    el.push(ts_el("invoice_opened", &invoice.opened));
    if let Some(posted) = &invoice.posted {
        el.push(ts_el("invoice_posted", posted));
    }
    if let Some(terms) = &invoice.terms {
        el.push(guid_el("invoice_terms", terms));
    }
    if let Some(billing_id) = &invoice.billing_id {
        el.push(text_el("invoice_billing_id", billing_id));
    }
    if let Some(notes) = &invoice.notes {
        el.push(text_el("invoice_notes", notes));
    }
    el.push(text_el("invoice_active", bool_text(invoice.active)));
    if let Some(post_txn) = &invoice.post_txn {
        el.push(guid_el("invoice_posttxn", post_txn));
    }
    if let Some(post_lot) = &invoice.post_lot {
        el.push(guid_el("invoice_postlot", post_lot));
    }
    if let Some(post_acc) = &invoice.post_acc {
        el.push(guid_el("invoice_postacc", post_acc));
    }
    el.push(commodity_ref_el("invoice_currency", &invoice.currency));
    if let Some(charge) = &invoice.charge_amt {
        el.push(fraction_el("invoice_charge-amt", charge));
    }
    if let Some(slots) = slots_el("invoice_slots", &invoice.slots) {
        el.push(slots);
    }
    el
}

fn entry_el(entry: &InvoiceEntry) -> XmlElement {
    let mut el = XmlElement::new("gnc_GncEntry").with_attr("version", VERSION);
    el.push(guid_el("entry_guid", &entry.id));
    el.push(ts_el("entry_date", &entry.date));
    el.push(ts_el("entry_entered", &entry.entered));
    el.push(text_el("entry_description", &entry.description));
    el.push(text_el("entry_action", entry.action.as_str()));
    el.push(fraction_el("entry_qty", &entry.quantity));
    if let Some(acct) = &entry.i_acct {
        el.push(guid_el("entry_i-acct", acct));
    }
    if let Some(price) = &entry.i_price {
        el.push(fraction_el("entry_i-price", price));
    }
    if let Some(discount) = &entry.i_discount {
        el.push(fraction_el("entry_i-discount", discount));
    }
    if let Some(disc_type) = &entry.i_disc_type {
        el.push(text_el("entry_i-disc-type", disc_type));
    }
    if let Some(disc_how) = &entry.i_disc_how {
        el.push(text_el("entry_i-disc-how", disc_how));
    }
    if let Some(invoice) = &entry.invoice {
        el.push(guid_el("entry_invoice", invoice));
        el.push(text_el("entry_i-taxable", bool_text(entry.i_taxable)));
        el.push(text_el("entry_i-taxincluded", bool_text(entry.i_taxincluded)));
        if let Some(table) = &entry.i_taxtable {
            el.push(guid_el("entry_i-taxtable", table));
        }
    }
    if let Some(acct) = &entry.b_acct {
        el.push(guid_el("entry_b-acct", acct));
    }
    if let Some(price) = &entry.b_price {
        el.push(fraction_el("entry_b-price", price));
    }
    if let Some(bill) = &entry.bill {
        el.push(guid_el("entry_bill", bill));
        el.push(text_el("entry_b-taxable", bool_text(entry.b_taxable)));
        el.push(text_el("entry_b-taxincluded", bool_text(entry.b_taxincluded)));
        if let Some(table) = &entry.b_taxtable {
            el.push(guid_el("entry_b-taxtable", table));
        }
        if let Some(pay) = &entry.b_pay {
            el.push(text_el("entry_b-pay", pay));
        }
    }
    el
}

fn tax_table_el(table: &TaxTable) -> XmlElement {
    let mut el = XmlElement::new("gnc_GncTaxTable").with_attr("version", VERSION);
    el.push(guid_el("taxtable_guid", &table.id));
    el.push(text_el("taxtable_name", &table.name));
    el.push(text_el("taxtable_refcount", table.refcount.to_string()));
    el.push(text_el("taxtable_invisible", bool_text(table.invisible)));
    if let Some(parent) = &table.parent {
        el.push(guid_el("taxtable_parent", parent));
    }
    let mut entries = XmlElement::new("taxtable_entries");
    for tte in &table.entries {
        entries.push(
            XmlElement::new("gnc_GncTaxTableEntry")
                .with_child(guid_el("tte_acct", &tte.account))
                .with_child(fraction_el("tte_amount", &tte.amount))
                .with_child(text_el("tte_type", tte.basis.as_str())),
        );
    }
    el.push(entries);
    el
}

fn price_el(price: &Price) -> XmlElement {
    let mut el = XmlElement::new("price");
    el.push(guid_el("price_id", &price.id));
    el.push(commodity_ref_el("price_commodity", &price.commodity));
    el.push(commodity_ref_el("price_currency", &price.currency));
    el.push(ts_el("price_time", &price.time));
    el.push(text_el("price_source", &price.source));
    if let Some(price_type) = &price.price_type {
        el.push(text_el("price_type", price_type));
    }
    el.push(fraction_el("price_value", &price.value));
    el
}

fn pricedb_el(book: &Book) -> XmlElement {
    let mut el = XmlElement::new("gnc_pricedb").with_attr("version", "1");
    for price in &book.price_db().prices {
        el.push(price_el(price));
    }
    el
}

// ---- the book ------------------------------------------------------------

/// Encode the whole book as the top-level children of `<gnc-v2>`
///
/// Recomputes every count-data value and stable-sorts the element list
/// into the fixed type-priority order. An unrecognized raw element kind
/// is a schema error: refusing the save beats silently dropping data.
pub fn encode_book(book: &Book) -> BookResult<Vec<XmlElement>> {
    let mut raw_counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    let mut ordered: Vec<(u8, XmlElement)> = Vec::new();

    for commodity in book.commodities() {
        ordered.push((0, commodity_el(commodity)));
    }
    if !book.price_db().is_empty() {
        ordered.push((1, pricedb_el(book)));
    }
    for account in book.accounts() {
        ordered.push((2, account_el(account)));
    }
    for txn in book.transactions() {
        ordered.push((4, transaction_el(txn)));
    }
    for job in book.jobs() {
        ordered.push((7, job_el(job)));
    }
    for table in book.tax_tables() {
        ordered.push((8, tax_table_el(table)));
    }
    for invoice in book.invoices() {
        ordered.push((9, invoice_el(invoice)));
    }
    for customer in book.customers() {
        ordered.push((10, customer_el(customer)));
    }
    for entry in book.entries() {
        ordered.push((12, entry_el(entry)));
    }
    for vendor in book.vendors() {
        ordered.push((14, vendor_el(vendor)));
    }
    for raw in &book.raw_elements {
        let priority = raw_priority(&raw.name)?;
        *raw_counts.entry(match raw.name.as_str() {
            "gnc_budget" => "budget",
            "gnc_schedxaction" => "schedxaction",
            "gnc_GncEmployee" => "gnc:GncEmployee",
            "gnc_GncBillTerm" => "gnc:GncBillTerm",
            _ => "",
        })
        .or_insert(0) += 1;
        ordered.push((priority, raw.clone()));
    }
    ordered.sort_by_key(|(priority, _)| *priority);

    let mut book_el = XmlElement::new("gnc_book").with_attr("version", VERSION);
    book_el.push(guid_el("book_id", book.id()));
    if let Some(slots) = slots_el("book_slots", &book.slots) {
        book_el.push(slots);
    }

    let raw_count = |key: &str| raw_counts.get(key).copied().unwrap_or(0);
    for (cd_type, count) in [
        ("commodity", book.commodities().len()),
        ("account", book.accounts().len()),
        ("transaction", book.transactions().len()),
        ("budget", raw_count("budget")),
        ("schedxaction", raw_count("schedxaction")),
        ("gnc:GncJob", book.jobs().len()),
        ("gnc:GncTaxTable", book.tax_tables().len()),
        ("gnc:GncInvoice", book.invoices().len()),
        ("gnc:GncCustomer", book.customers().len()),
        ("gnc:GncEmployee", raw_count("gnc:GncEmployee")),
        ("gnc:GncEntry", book.entries().len()),
        ("gnc:GncBillTerm", raw_count("gnc:GncBillTerm")),
        ("gnc:GncVendor", book.vendors().len()),
        ("price", book.price_db().len()),
    ] {
        if count > 0 {
            book_el.push(count_data(cd_type, count));
        }
    }

    for (_, element) in ordered {
        book_el.push(element);
    }

    Ok(vec![count_data("book", 1), book_el])
}
