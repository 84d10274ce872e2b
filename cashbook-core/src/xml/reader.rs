//! Deserialization of the book dialect
//!
//! A pull-parser event loop builds the element tree, then per-entity
//! decode functions materialize typed records. Known malformed-file
//! conditions are repaired rather than rejected: a transaction missing
//! its posted date takes the entered date with a logged warning, and
//! stray top-level accounts are merged under the first ROOT account.

use std::io::BufRead;

use log::warn;
use quick_xml::events::Event;
use quick_xml::Reader;

use cashbook_math::{Commodity, CommodityId, Fraction};

use crate::account::{Account, AccountType, Lot};
use crate::book::Book;
use crate::business::{Address, Customer, Job, Owner, OwnerKind, TaxIncluded, Vendor};
use crate::error::{BookError, BookResult};
use crate::guid::Guid;
use crate::invoice::{EntryAction, Invoice, InvoiceEntry};
use crate::price::Price;
use crate::slots::{Slot, SlotValue};
use crate::taxtable::{TaxBasis, TaxTable, TaxTableEntry};
use crate::transaction::{Reconciled, Split, Transaction, TS_FORMAT};
use crate::xml::dom::{XmlElement, XmlNode};

// Incoming names are folded to underscore form at the parser boundary.
fn fold_incoming(raw: &[u8]) -> BookResult<String> {
    let name = std::str::from_utf8(raw)
        .map_err(|_| BookError::Parse("non-UTF-8 name in XML".into()))?;
    Ok(name.replace(':', "_"))
}

/// Parse a document into its root element
pub fn parse_dom(reader: impl BufRead) -> BookResult<XmlElement> {
    let mut reader = Reader::from_reader(reader);
    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let mut element = XmlElement::new(fold_incoming(e.name().as_ref())?);
                for attr in e.attributes() {
                    let attr =
                        attr.map_err(|err| BookError::Parse(format!("XML attribute: {err}")))?;
                    let key = fold_incoming(attr.key.as_ref())?;
                    let value = attr
                        .unescape_value()
                        .map_err(|err| BookError::Parse(format!("XML attribute: {err}")))?;
                    element.attributes.push((key, value.into_owned()));
                }
                stack.push(element);
            }
            Event::Empty(ref e) => {
                let mut element = XmlElement::new(fold_incoming(e.name().as_ref())?);
                for attr in e.attributes() {
                    let attr =
                        attr.map_err(|err| BookError::Parse(format!("XML attribute: {err}")))?;
                    let key = fold_incoming(attr.key.as_ref())?;
                    let value = attr
                        .unescape_value()
                        .map_err(|err| BookError::Parse(format!("XML attribute: {err}")))?;
                    element.attributes.push((key, value.into_owned()));
                }
                match stack.last_mut() {
                    Some(parent) => parent.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(ref t) => {
                let text = t.unescape()?;
                if !text.trim().is_empty() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(text.into_owned()));
                    }
                }
            }
            Event::CData(ref t) => {
                let bytes: &[u8] = t;
                let text = String::from_utf8_lossy(bytes).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| BookError::Parse("unbalanced closing tag".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.push(element),
                    None => root = Some(element),
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| BookError::Schema("document has no root element".into()))
}

// ---- field helpers -------------------------------------------------------

fn req_child<'a>(el: &'a XmlElement, name: &str) -> BookResult<&'a XmlElement> {
    el.child(name)
        .ok_or_else(|| BookError::Schema(format!("{} is missing <{}>", el.name, name)))
}

fn req_text(el: &XmlElement, name: &str) -> BookResult<String> {
    Ok(req_child(el, name)?.text())
}

fn req_guid(el: &XmlElement, name: &str) -> BookResult<Guid> {
    Guid::parse(&req_text(el, name)?)
}

fn opt_guid(el: &XmlElement, name: &str) -> BookResult<Option<Guid>> {
    match el.child(name) {
        Some(child) => Ok(Some(Guid::parse(&child.text())?)),
        None => Ok(None),
    }
}

fn req_fraction(el: &XmlElement, name: &str) -> BookResult<Fraction> {
    Ok(Fraction::parse(&req_text(el, name)?)?)
}

fn opt_fraction(el: &XmlElement, name: &str) -> BookResult<Option<Fraction>> {
    match el.child(name) {
        Some(child) => Ok(Some(Fraction::parse(&child.text())?)),
        None => Ok(None),
    }
}

fn parse_bool(text: &str) -> BookResult<bool> {
    match text {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(BookError::Schema(format!("expected boolean 0/1, got {other:?}"))),
    }
}

fn opt_bool(el: &XmlElement, name: &str, default: bool) -> BookResult<bool> {
    match el.child(name) {
        Some(child) => parse_bool(&child.text()),
        None => Ok(default),
    }
}

fn parse_timestamp(el: &XmlElement) -> BookResult<chrono::DateTime<chrono::FixedOffset>> {
    let date = req_text(el, "ts_date")?;
    Ok(chrono::DateTime::parse_from_str(date.trim(), TS_FORMAT)?)
}

fn req_timestamp(el: &XmlElement, name: &str) -> BookResult<chrono::DateTime<chrono::FixedOffset>> {
    parse_timestamp(req_child(el, name)?)
}

fn opt_timestamp(
    el: &XmlElement,
    name: &str,
) -> BookResult<Option<chrono::DateTime<chrono::FixedOffset>>> {
    match el.child(name) {
        Some(child) => Ok(Some(parse_timestamp(child)?)),
        None => Ok(None),
    }
}

fn commodity_ref(el: &XmlElement, name: &str) -> BookResult<CommodityId> {
    let child = req_child(el, name)?;
    Ok(CommodityId::new(req_text(child, "cmdty_space")?, req_text(child, "cmdty_id")?))
}

// ---- slots ---------------------------------------------------------------

fn decode_slot_value(el: &XmlElement) -> BookResult<SlotValue> {
    let slot_type = el
        .attribute("type")
        .ok_or_else(|| BookError::Schema("slot value has no type attribute".into()))?;
    Ok(match slot_type {
        "string" => SlotValue::Text(el.text()),
        "integer" => SlotValue::Integer(
            el.text()
                .trim()
                .parse::<i64>()
                .map_err(|_| BookError::Parse(format!("integer slot: {:?}", el.text())))?,
        ),
        "numeric" => SlotValue::Numeric(Fraction::parse(&el.text())?),
        "guid" => SlotValue::Guid(Guid::parse(&el.text())?),
        "gdate" => {
            let date = req_text(el, "gdate")?;
            SlotValue::GDate(
                chrono::NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                    .map_err(|err| BookError::Parse(format!("gdate slot: {err}")))?,
            )
        }
        "timespec" => SlotValue::Timespec(parse_timestamp(el)?),
        "frame" => {
            let mut slots = Vec::new();
            for child in el.children_named("slot") {
                slots.push(decode_slot(child)?);
            }
            SlotValue::Frame(slots)
        }
        other => return Err(BookError::Schema(format!("unknown slot value type: {other}"))),
    })
}

fn decode_slot(el: &XmlElement) -> BookResult<Slot> {
    let key = req_text(el, "slot_key")?;
    let value = decode_slot_value(req_child(el, "slot_value")?)?;
    Ok(Slot { key, value })
}

fn decode_slots(el: &XmlElement) -> BookResult<Vec<Slot>> {
    let mut slots = Vec::new();
    for child in el.children_named("slot") {
        slots.push(decode_slot(child)?);
    }
    Ok(slots)
}

fn opt_slots(el: &XmlElement, name: &str) -> BookResult<Vec<Slot>> {
    match el.child(name) {
        Some(child) => decode_slots(child),
        None => Ok(Vec::new()),
    }
}

// ---- entities ------------------------------------------------------------

fn decode_commodity(el: &XmlElement) -> BookResult<Commodity> {
    let id = CommodityId::new(req_text(el, "cmdty_space")?, req_text(el, "cmdty_id")?);
    let fraction = match el.child("cmdty_fraction") {
        Some(child) => child
            .text()
            .trim()
            .parse::<i64>()
            .map_err(|_| BookError::Parse(format!("commodity fraction: {:?}", child.text())))?,
        None => 100,
    };
    let mut commodity = Commodity::new(id, fraction);
    commodity.name = el.child_text("cmdty_name");
    commodity.exchange_code = el.child_text("cmdty_xcode");
    commodity.get_quotes = el.child("cmdty_get_quotes").is_some();
    commodity.quote_source = el.child_text("cmdty_quote_source");
    commodity.quote_tz = el.child("cmdty_quote_tz").map(|c| c.text());
    Ok(commodity)
}

fn decode_lot(el: &XmlElement) -> BookResult<Lot> {
    let mut lot = Lot::new(req_guid(el, "lot_id")?);
    lot.slots = opt_slots(el, "lot_slots")?;
    Ok(lot)
}

fn decode_account(el: &XmlElement) -> BookResult<Account> {
    let id = req_guid(el, "act_id")?;
    let name = req_text(el, "act_name")?;
    let account_type = AccountType::parse(&req_text(el, "act_type")?)?;
    let commodity = commodity_ref(el, "act_commodity")?;
    let mut account = Account::new(id, name, account_type, commodity);
    if let Some(scu) = el.child("act_commodity-scu") {
        account.commodity_scu = scu
            .text()
            .trim()
            .parse::<i64>()
            .map_err(|_| BookError::Parse(format!("commodity scu: {:?}", scu.text())))?;
    }
    account.non_standard_scu = el.child("act_non-standard-scu").is_some();
    account.code = el.child_text("act_code");
    account.description = el.child_text("act_description");
    account.slots = opt_slots(el, "act_slots")?;
    account.parent = opt_guid(el, "act_parent")?;
    if let Some(lots) = el.child("act_lots") {
        for lot in lots.children_named("gnc_lot") {
            account.lots.push(decode_lot(lot)?);
        }
    }
    Ok(account)
}

fn decode_split(el: &XmlElement) -> BookResult<Split> {
    let id = req_guid(el, "split_id")?;
    let account = req_guid(el, "split_account")?;
    let value = req_fraction(el, "split_value")?;
    let mut split = Split::new(id, account, value);
    split.quantity = req_fraction(el, "split_quantity")?;
    split.memo = el.child_text("split_memo");
    split.action = el.child_text("split_action");
    split.reconciled = Reconciled::parse(&req_text(el, "split_reconciled-state")?)?;
    split.lot = opt_guid(el, "split_lot")?;
    Ok(split)
}

fn decode_transaction(el: &XmlElement) -> BookResult<Transaction> {
    let id = req_guid(el, "trn_id")?;
    let currency = commodity_ref(el, "trn_currency")?;
    let date_entered = req_timestamp(el, "trn_date-entered")?;
    // Known tolerable defect: a missing posted date is repaired from the
    // entered date instead of failing the read.
    let date_posted = match opt_timestamp(el, "trn_date-posted")? {
        Some(date) => date,
        None => {
            warn!("transaction {id} has no date-posted; using date-entered");
            date_entered
        }
    };
    let mut txn = Transaction::new(id, currency, date_posted, date_entered);
    txn.num = el.child_text("trn_num");
    txn.description = el.child_text("trn_description").unwrap_or_default();
    txn.slots = opt_slots(el, "trn_slots")?;
    if let Some(splits) = el.child("trn_splits") {
        for split in splits.children_named("trn_split") {
            txn.add_split(decode_split(split)?);
        }
    }
    Ok(txn)
}

fn decode_address(el: &XmlElement) -> Address {
    Address {
        name: el.child_text("addr_name").unwrap_or_default(),
        addr1: el.child_text("addr_addr1").unwrap_or_default(),
        addr2: el.child_text("addr_addr2").unwrap_or_default(),
        addr3: el.child_text("addr_addr3").unwrap_or_default(),
        addr4: el.child_text("addr_addr4").unwrap_or_default(),
        phone: el.child_text("addr_phone").unwrap_or_default(),
        fax: el.child_text("addr_fax").unwrap_or_default(),
        email: el.child_text("addr_email").unwrap_or_default(),
    }
}

fn opt_address(el: &XmlElement, name: &str) -> Address {
    el.child(name).map(decode_address).unwrap_or_default()
}

fn decode_customer(el: &XmlElement) -> BookResult<Customer> {
    let id = req_guid(el, "cust_guid")?;
    let number = req_text(el, "cust_id")?;
    let name = req_text(el, "cust_name")?;
    let currency = commodity_ref(el, "cust_currency")?;
    let mut customer = Customer::new(id, number, name, currency);
    customer.address = opt_address(el, "cust_addr");
    customer.ship_address = opt_address(el, "cust_shipaddr");
    customer.notes = el.child_text("cust_notes");
    customer.terms = opt_guid(el, "cust_terms")?;
    if let Some(policy) = el.child_text("cust_taxincluded") {
        customer.tax_included = TaxIncluded::parse(&policy)?;
    }
    customer.active = opt_bool(el, "cust_active", true)?;
    if let Some(discount) = opt_fraction(el, "cust_discount")? {
        customer.discount = discount;
    }
    if let Some(credit) = opt_fraction(el, "cust_credit")? {
        customer.credit = credit;
    }
    customer.tax_table_override = opt_bool(el, "cust_use-tt", false)?;
    customer.tax_table = opt_guid(el, "cust_taxtable")?;
    customer.slots = opt_slots(el, "cust_slots")?;
    Ok(customer)
}

fn decode_vendor(el: &XmlElement) -> BookResult<Vendor> {
    let id = req_guid(el, "vendor_guid")?;
    let number = req_text(el, "vendor_id")?;
    let name = req_text(el, "vendor_name")?;
    let currency = commodity_ref(el, "vendor_currency")?;
    let mut vendor = Vendor::new(id, number, name, currency);
    vendor.address = opt_address(el, "vendor_addr");
    vendor.notes = el.child_text("vendor_notes");
    vendor.terms = opt_guid(el, "vendor_terms")?;
    if let Some(policy) = el.child_text("vendor_taxincluded") {
        vendor.tax_included = TaxIncluded::parse(&policy)?;
    }
    vendor.active = opt_bool(el, "vendor_active", true)?;
    vendor.tax_table_override = opt_bool(el, "vendor_use-tt", false)?;
    vendor.tax_table = opt_guid(el, "vendor_taxtable")?;
    vendor.slots = opt_slots(el, "vendor_slots")?;
    Ok(vendor)
}

fn decode_owner(el: &XmlElement) -> BookResult<Owner> {
    let kind = OwnerKind::parse(&req_text(el, "owner_type")?)?;
    let guid = req_guid(el, "owner_id")?;
    Ok(Owner { kind, guid })
}

fn decode_job(el: &XmlElement) -> BookResult<Job> {
    let id = req_guid(el, "job_guid")?;
    let number = req_text(el, "job_id")?;
    let name = req_text(el, "job_name")?;
    let owner = decode_owner(req_child(el, "job_owner")?)?;
    let mut job = Job::new(id, number, name, owner);
    job.reference = el.child_text("job_reference");
    job.active = opt_bool(el, "job_active", true)?;
    Ok(job)
}

fn decode_invoice(el: &XmlElement) -> BookResult<Invoice> {
    let id = req_guid(el, "invoice_guid")?;
    let number = req_text(el, "invoice_id")?;
    let owner = decode_owner(req_child(el, "invoice_owner")?)?;
    let currency = commodity_ref(el, "invoice_currency")?;
    let opened = req_timestamp(el, "invoice_opened")?;
    let mut invoice = Invoice::new(id, number, owner, currency, opened);
    invoice.posted = opt_timestamp(el, "invoice_posted")?;
    invoice.terms = opt_guid(el, "invoice_terms")?;
    invoice.billing_id = el.child_text("invoice_billing_id");
    invoice.notes = el.child_text("invoice_notes");
    invoice.active = opt_bool(el, "invoice_active", true)?;
    invoice.post_txn = opt_guid(el, "invoice_posttxn")?;
    invoice.post_lot = opt_guid(el, "invoice_postlot")?;
    invoice.post_acc = opt_guid(el, "invoice_postacc")?;
    invoice.charge_amt = opt_fraction(el, "invoice_charge-amt")?;
    invoice.slots = opt_slots(el, "invoice_slots")?;
    Ok(invoice)
}

fn decode_entry(el: &XmlElement) -> BookResult<InvoiceEntry> {
    let id = req_guid(el, "entry_guid")?;
    let date = req_timestamp(el, "entry_date")?;
    let entered = req_timestamp(el, "entry_entered")?;
    let action = EntryAction::parse(&req_text(el, "entry_action")?)?;
    let quantity = req_fraction(el, "entry_qty")?;
    let mut entry = InvoiceEntry::new(id, date, entered, action, quantity);
    entry.description = el.child_text("entry_description").unwrap_or_default();
    entry.invoice = opt_guid(el, "entry_invoice")?;
    entry.i_acct = opt_guid(el, "entry_i-acct")?;
    entry.i_price = opt_fraction(el, "entry_i-price")?;
    entry.i_discount = opt_fraction(el, "entry_i-discount")?;
    entry.i_disc_type = el.child_text("entry_i-disc-type");
    entry.i_disc_how = el.child_text("entry_i-disc-how");
    entry.i_taxable = opt_bool(el, "entry_i-taxable", false)?;
    entry.i_taxincluded = opt_bool(el, "entry_i-taxincluded", false)?;
    entry.i_taxtable = opt_guid(el, "entry_i-taxtable")?;
    entry.bill = opt_guid(el, "entry_bill")?;
    entry.b_acct = opt_guid(el, "entry_b-acct")?;
    entry.b_price = opt_fraction(el, "entry_b-price")?;
    entry.b_taxable = opt_bool(el, "entry_b-taxable", false)?;
    entry.b_taxincluded = opt_bool(el, "entry_b-taxincluded", false)?;
    entry.b_taxtable = opt_guid(el, "entry_b-taxtable")?;
    entry.b_pay = el.child_text("entry_b-pay");
    Ok(entry)
}

fn decode_tax_table(el: &XmlElement) -> BookResult<TaxTable> {
    let id = req_guid(el, "taxtable_guid")?;
    let name = req_text(el, "taxtable_name")?;
    let mut table = TaxTable::new(id, name);
    if let Some(refcount) = el.child("taxtable_refcount") {
        table.refcount = refcount
            .text()
            .trim()
            .parse::<i64>()
            .map_err(|_| BookError::Parse(format!("tax table refcount: {:?}", refcount.text())))?;
    }
    table.invisible = opt_bool(el, "taxtable_invisible", false)?;
    table.parent = opt_guid(el, "taxtable_parent")?;
    if let Some(entries) = el.child("taxtable_entries") {
        for tte in entries.children_named("gnc_GncTaxTableEntry") {
            table.entries.push(TaxTableEntry {
                account: req_guid(tte, "tte_acct")?,
                amount: req_fraction(tte, "tte_amount")?,
                basis: TaxBasis::parse(&req_text(tte, "tte_type")?)?,
            });
        }
    }
    Ok(table)
}

fn decode_price(el: &XmlElement) -> BookResult<Price> {
    Ok(Price {
        id: req_guid(el, "price_id")?,
        commodity: commodity_ref(el, "price_commodity")?,
        currency: commodity_ref(el, "price_currency")?,
        time: req_timestamp(el, "price_time")?,
        source: req_text(el, "price_source")?,
        price_type: el.child_text("price_type"),
        value: req_fraction(el, "price_value")?,
    })
}

// ---- the book ------------------------------------------------------------

/// Materialize a book from a parsed document
pub fn decode_book(root: &XmlElement) -> BookResult<Book> {
    if root.name != "gnc-v2" {
        return Err(BookError::Schema(format!("unexpected root element: {}", root.name)));
    }
    let book_el = root
        .child("gnc_book")
        .ok_or_else(|| BookError::Schema("document has no <gnc:book>".into()))?;
    let id = req_guid(book_el, "book_id")?;
    let mut book = Book::new_raw(id);
    book.slots = opt_slots(book_el, "book_slots")?;

    for element in book_el.elements() {
        match element.name.as_str() {
            // Count-data is recomputed at save time; book:id and
            // book:slots were consumed above.
            "gnc_count-data" | "book_id" | "book_slots" => {}
            "gnc_commodity" => book.commodities.push(decode_commodity(element)?),
            "gnc_pricedb" => {
                for price in element.children_named("price") {
                    book.price_db.push(decode_price(price)?);
                }
            }
            "gnc_account" => {
                let account = decode_account(element)?;
                book.insert_account(account);
            }
            "gnc_transaction" => {
                let txn = decode_transaction(element)?;
                book.insert_transaction(txn);
            }
            "gnc_GncCustomer" => {
                let customer = decode_customer(element)?;
                book.insert_customer(customer);
            }
            "gnc_GncVendor" => {
                let vendor = decode_vendor(element)?;
                book.insert_vendor(vendor);
            }
            "gnc_GncJob" => {
                let job = decode_job(element)?;
                book.insert_job(job);
            }
            "gnc_GncInvoice" => {
                let invoice = decode_invoice(element)?;
                book.insert_invoice(invoice);
            }
            "gnc_GncEntry" => {
                let entry = decode_entry(element)?;
                book.insert_entry(entry);
            }
            "gnc_GncTaxTable" => {
                let table = decode_tax_table(element)?;
                book.insert_tax_table(table);
            }
            // Everything else is carried verbatim; the writer decides
            // at save time whether the kind is recognized.
            _ => book.raw_elements.push(element.clone()),
        }
    }

    if let Some(currency) = book
        .commodities()
        .iter()
        .find(|c| c.id.is_currency())
        .or_else(|| book.commodities().first())
    {
        let id = currency.id.clone();
        book.set_base_currency(id);
    }
    // Seed the conversion table from quotes against the base currency.
    let base = book.base_currency().clone();
    let factors: Vec<(CommodityId, Fraction)> = book
        .price_db()
        .prices
        .iter()
        .filter(|p| p.currency == base)
        .map(|p| (p.commodity.clone(), p.value))
        .collect();
    for (id, factor) in factors {
        book.currency_table_mut().set_factor(id, factor);
    }
    book.repair_root();
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(doc: &str) -> XmlElement {
        parse_dom(doc.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_dom_folds_names() {
        let root = parse("<gnc-v2><gnc:book version=\"2.0.0\"><book:id type=\"guid\">0123456789abcdef0123456789abcdef</book:id></gnc:book></gnc-v2>");
        assert_eq!(root.name, "gnc-v2");
        let book = root.child("gnc_book").unwrap();
        assert_eq!(book.attribute("version"), Some("2.0.0"));
        assert_eq!(
            book.child_text("book_id").as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
    }

    #[test]
    fn test_parse_dom_drops_indentation_whitespace() {
        let root = parse("<a>\n  <b>kept text</b>\n</a>");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.child_text("b").as_deref(), Some("kept text"));
    }

    #[test]
    fn test_parse_dom_unescapes_entities() {
        let root = parse("<a><b>R&amp;D &lt;tools&gt;</b></a>");
        assert_eq!(root.child_text("b").as_deref(), Some("R&D <tools>"));
    }

    #[test]
    fn test_decode_commodity_quote_fields() {
        let root = parse(
            "<gnc:commodity version=\"2.0.0\">\
             <cmdty:space>ISO4217</cmdty:space>\
             <cmdty:id>EUR</cmdty:id>\
             <cmdty:fraction>100</cmdty:fraction>\
             <cmdty:get_quotes/>\
             <cmdty:quote_source>currency</cmdty:quote_source>\
             <cmdty:quote_tz/>\
             </gnc:commodity>",
        );
        let commodity = decode_commodity(&root).unwrap();
        assert_eq!(commodity.id, CommodityId::currency("EUR"));
        assert!(commodity.get_quotes);
        assert_eq!(commodity.quote_source.as_deref(), Some("currency"));
        assert_eq!(commodity.quote_tz.as_deref(), Some(""));
    }

    #[test]
    fn test_decode_transaction_repairs_missing_date_posted() {
        let root = parse(
            "<gnc:transaction version=\"2.0.0\">\
             <trn:id type=\"guid\">11112222333344445555666677778888</trn:id>\
             <trn:currency><cmdty:space>ISO4217</cmdty:space><cmdty:id>EUR</cmdty:id></trn:currency>\
             <trn:date-entered><ts:date>2024-07-01 12:00:00 +0000</ts:date></trn:date-entered>\
             <trn:description>repair me</trn:description>\
             <trn:splits/>\
             </gnc:transaction>",
        );
        let txn = decode_transaction(&root).unwrap();
        assert_eq!(txn.date_posted, txn.date_entered);
        assert_eq!(txn.description, "repair me");
    }

    #[test]
    fn test_decode_transaction_missing_entered_is_error() {
        let root = parse(
            "<gnc:transaction version=\"2.0.0\">\
             <trn:id type=\"guid\">11112222333344445555666677778888</trn:id>\
             <trn:currency><cmdty:space>ISO4217</cmdty:space><cmdty:id>EUR</cmdty:id></trn:currency>\
             <trn:splits/>\
             </gnc:transaction>",
        );
        assert!(matches!(decode_transaction(&root), Err(BookError::Schema(_))));
    }

    #[test]
    fn test_decode_guid_lowercases() {
        let root = parse(
            "<gnc:account version=\"2.0.0\">\
             <act:name>Bank</act:name>\
             <act:id type=\"guid\">ABCDEF00112233445566778899AABBCC</act:id>\
             <act:type>BANK</act:type>\
             <act:commodity><cmdty:space>ISO4217</cmdty:space><cmdty:id>EUR</cmdty:id></act:commodity>\
             </gnc:account>",
        );
        let account = decode_account(&root).unwrap();
        assert_eq!(account.id.as_str(), "abcdef00112233445566778899aabbcc");
    }

    #[test]
    fn test_decode_book_keeps_unknown_elements_raw() {
        let root = parse(
            "<gnc-v2><gnc:book version=\"2.0.0\">\
             <book:id type=\"guid\">0123456789abcdef0123456789abcdef</book:id>\
             <gnc:budget version=\"2.0.0\"><bgt:id type=\"guid\">aaaabbbbccccddddeeeeffff00001111</bgt:id></gnc:budget>\
             </gnc:book></gnc-v2>",
        );
        let book = decode_book(&root).unwrap();
        assert_eq!(book.raw_elements.len(), 1);
        assert_eq!(book.raw_elements[0].name, "gnc_budget");
    }
}
