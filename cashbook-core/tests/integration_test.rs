//! Integration tests for cashbook-core

use cashbook_core::xml::{read_book, write_book_to_string, writer};
use cashbook_core::{
    AccountType, Book, BookError, EntryAction, Guid, InvoiceState, NewEntry, SlotValue, TaxBasis,
    TaxTableEntry,
};
use cashbook_math::{Commodity, CommodityId, Fraction};
use chrono::{DateTime, FixedOffset, TimeZone};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ts(y: i32, m: u32, d: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn eur() -> CommodityId {
    CommodityId::currency("EUR")
}

fn frac(s: &str) -> Fraction {
    Fraction::parse(s).unwrap()
}

struct InvoiceFixture {
    book: Book,
    income: Guid,
    receivable: Guid,
    tax_account: Guid,
    bank: Guid,
    tax_table: Guid,
    invoice: Guid,
    entry: Guid,
}

// Customer, account tree, a 19% tax table and a one-entry draft
// invoice: quantity 2/1 at price 100/1, taxable, tax-exclusive.
fn invoice_fixture() -> InvoiceFixture {
    init_logging();
    let mut book = Book::new(Commodity::iso_currency("EUR"));
    let root = book.create_account(None, "Root Account", AccountType::Root, eur(), None).unwrap();
    let income = book
        .create_account(None, "Consulting Income", AccountType::Income, eur(), Some(root.clone()))
        .unwrap();
    let receivable = book
        .create_account(None, "Receivable", AccountType::Receivable, eur(), Some(root.clone()))
        .unwrap();
    let tax_account = book
        .create_account(None, "VAT Collected", AccountType::Liability, eur(), Some(root.clone()))
        .unwrap();
    let bank =
        book.create_account(None, "Checking", AccountType::Bank, eur(), Some(root)).unwrap();

    let customer = book.create_customer(None, "000001", "ACME GmbH", eur()).unwrap();
    let tax_table = book
        .create_tax_table(
            None,
            "VAT 19%",
            vec![TaxTableEntry {
                account: tax_account.clone(),
                amount: frac("19/1"),
                basis: TaxBasis::Percent,
            }],
        )
        .unwrap();
    let invoice = book
        .create_customer_invoice(None, "000001", &customer, eur(), ts(2024, 7, 1))
        .unwrap();
    let entry = book
        .create_invoice_entry(
            &invoice,
            NewEntry {
                date: ts(2024, 7, 1),
                description: "Consulting".into(),
                action: EntryAction::Hours,
                quantity: frac("2/1"),
                price: frac("100/1"),
                account: income.clone(),
                taxable: true,
                tax_included: false,
                tax_table: Some(tax_table.clone()),
            },
        )
        .unwrap();

    InvoiceFixture { book, income, receivable, tax_account, bank, tax_table, invoice, entry }
}

fn post(fixture: &mut InvoiceFixture) -> Guid {
    fixture
        .book
        .post_invoice(
            &fixture.invoice,
            &fixture.receivable,
            ts(2024, 7, 2),
            ts(2024, 8, 1),
            "Invoice 000001",
        )
        .unwrap()
}

#[test]
fn test_posting_creates_three_balanced_splits() {
    let mut fixture = invoice_fixture();
    let txn_guid = post(&mut fixture);
    let book = &fixture.book;

    let txn = book.transaction(&txn_guid).unwrap();
    assert_eq!(txn.splits.len(), 3);
    assert!(txn.is_balanced().unwrap());
    assert_eq!(txn.value_sum().unwrap(), Fraction::zero());

    let split_for = |account: &Guid| txn.splits.iter().find(|s| &s.account == account).unwrap();
    assert_eq!(split_for(&fixture.income).value, frac("-200/1"));
    assert_eq!(split_for(&fixture.tax_account).value, frac("-38/1"));
    let receivable_split = split_for(&fixture.receivable);
    assert_eq!(receivable_split.value, frac("238/1"));
    assert!(receivable_split.lot.is_some());

    let invoice = book.invoice(&fixture.invoice).unwrap();
    assert_eq!(invoice.post_txn.as_ref(), Some(&txn_guid));
    assert_eq!(invoice.post_acc.as_ref(), Some(&fixture.receivable));
    let lot_guid = invoice.post_lot.clone().unwrap();
    assert!(book.account(&fixture.receivable).unwrap().lot(&lot_guid).is_some());

    assert_eq!(book.invoice_state(&fixture.invoice).unwrap(), InvoiceState::Posted);
    assert_eq!(book.account_balance(&fixture.receivable).unwrap(), frac("238/1"));
}

#[test]
fn test_double_posting_rejected() {
    let mut fixture = invoice_fixture();
    post(&mut fixture);
    let err = fixture
        .book
        .post_invoice(&fixture.invoice, &fixture.receivable, ts(2024, 7, 3), ts(2024, 8, 1), "again")
        .unwrap_err();
    assert!(matches!(err, BookError::StateViolation(_)));
}

#[test]
fn test_post_account_type_checked() {
    let mut fixture = invoice_fixture();
    let err = fixture
        .book
        .post_invoice(&fixture.invoice, &fixture.bank, ts(2024, 7, 2), ts(2024, 8, 1), "wrong")
        .unwrap_err();
    assert!(matches!(err, BookError::TypeMismatch(_)));
}

#[test]
fn test_payment_freezes_invoice() {
    let mut fixture = invoice_fixture();
    post(&mut fixture);
    fixture
        .book
        .pay_invoice(&fixture.invoice, &fixture.bank, frac("238/1"), ts(2024, 7, 10), "payment")
        .unwrap();
    let book = &mut fixture.book;
    assert_eq!(book.invoice_state(&fixture.invoice).unwrap(), InvoiceState::Paid);
    assert!(!book.is_invoice_modifiable(&fixture.invoice).unwrap());
    assert_eq!(book.paying_transactions(&fixture.invoice).unwrap().len(), 1);
    assert_eq!(book.account_balance(&fixture.receivable).unwrap(), Fraction::zero());
    assert_eq!(book.account_balance(&fixture.bank).unwrap(), frac("238/1"));

    // Modifiability is monotone: every entry mutator now fails.
    let entry = &fixture.entry;
    assert!(matches!(
        book.set_entry_quantity(entry, frac("3/1")),
        Err(BookError::StateViolation(_))
    ));
    assert!(matches!(
        book.set_entry_invoice_price(entry, frac("50/1")),
        Err(BookError::StateViolation(_))
    ));
    assert!(matches!(
        book.set_entry_invoice_taxable(entry, false),
        Err(BookError::StateViolation(_))
    ));
    assert!(matches!(
        book.set_entry_invoice_tax_included(entry, true),
        Err(BookError::StateViolation(_))
    ));
    assert!(matches!(
        book.set_entry_invoice_tax_table(entry, fixture.tax_table.clone()),
        Err(BookError::StateViolation(_))
    ));
    assert!(matches!(
        book.set_entry_action(entry, EntryAction::Material),
        Err(BookError::StateViolation(_))
    ));
    assert!(matches!(book.remove_invoice_entry(entry), Err(BookError::StateViolation(_))));
    let err = book
        .create_invoice_entry(
            &fixture.invoice,
            NewEntry {
                date: ts(2024, 7, 11),
                description: "late".into(),
                action: EntryAction::Hours,
                quantity: frac("1/1"),
                price: frac("10/1"),
                account: fixture.income.clone(),
                taxable: false,
                tax_included: false,
                tax_table: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, BookError::StateViolation(_)));
}

#[test]
fn test_entry_edits_keep_posted_transaction_balanced() {
    let mut fixture = invoice_fixture();
    let txn_guid = post(&mut fixture);
    let book = &mut fixture.book;

    // Price edit: subtract-then-add leaves the transaction balanced
    // with the new contribution in place.
    book.set_entry_invoice_price(&fixture.entry, frac("150/1")).unwrap();
    {
        let txn = book.transaction(&txn_guid).unwrap();
        assert!(txn.is_balanced().unwrap());
        let receivable =
            txn.splits.iter().find(|s| s.account == fixture.receivable).unwrap();
        // 2 * 150 = 300 net, 57 tax, 357 gross.
        assert_eq!(receivable.value, frac("357/1"));
    }

    book.set_entry_quantity(&fixture.entry, frac("3/1")).unwrap();
    {
        let txn = book.transaction(&txn_guid).unwrap();
        assert!(txn.is_balanced().unwrap());
        let income = txn.splits.iter().find(|s| s.account == fixture.income).unwrap();
        assert_eq!(income.value, frac("-450/1"));
    }

    // Dropping taxability zeroes the tax split but keeps balance.
    book.set_entry_invoice_taxable(&fixture.entry, false).unwrap();
    {
        let txn = book.transaction(&txn_guid).unwrap();
        assert!(txn.is_balanced().unwrap());
        let tax = txn.splits.iter().find(|s| s.account == fixture.tax_account).unwrap();
        assert!(tax.value.is_zero());
        let receivable =
            txn.splits.iter().find(|s| s.account == fixture.receivable).unwrap();
        assert_eq!(receivable.value, frac("450/1"));
    }
}

#[test]
fn test_adding_entry_to_posted_invoice_updates_transaction() {
    let mut fixture = invoice_fixture();
    let txn_guid = post(&mut fixture);
    let second = fixture
        .book
        .create_invoice_entry(
            &fixture.invoice,
            NewEntry {
                date: ts(2024, 7, 3),
                description: "Materials".into(),
                action: EntryAction::Material,
                quantity: frac("1/1"),
                price: frac("50/1"),
                account: fixture.income.clone(),
                taxable: false,
                tax_included: false,
                tax_table: None,
            },
        )
        .unwrap();
    {
        let txn = fixture.book.transaction(&txn_guid).unwrap();
        assert!(txn.is_balanced().unwrap());
        let receivable =
            txn.splits.iter().find(|s| s.account == fixture.receivable).unwrap();
        assert_eq!(receivable.value, frac("288/1"));
    }

    fixture.book.remove_invoice_entry(&second).unwrap();
    let txn = fixture.book.transaction(&txn_guid).unwrap();
    assert!(txn.is_balanced().unwrap());
    let receivable = txn.splits.iter().find(|s| s.account == fixture.receivable).unwrap();
    assert_eq!(receivable.value, frac("238/1"));
    assert!(fixture.book.entry(&second).is_none());
}

#[test]
fn test_tax_included_entry_backs_tax_out() {
    let mut fixture = invoice_fixture();
    fixture.book.set_entry_invoice_tax_included(&fixture.entry, true).unwrap();
    let txn_guid = post(&mut fixture);
    let txn = fixture.book.transaction(&txn_guid).unwrap();
    assert!(txn.is_balanced().unwrap());
    // Gross stays 200; net = 200 * 100/119 = 20000/119.
    let receivable = txn.splits.iter().find(|s| s.account == fixture.receivable).unwrap();
    assert_eq!(receivable.value, frac("200/1"));
    let income = txn.splits.iter().find(|s| s.account == fixture.income).unwrap();
    assert_eq!(income.value, frac("-20000/119"));
}

#[test]
fn test_vendor_bill_side_checks() {
    init_logging();
    let mut book = Book::new(Commodity::iso_currency("EUR"));
    let root = book.create_account(None, "Root Account", AccountType::Root, eur(), None).unwrap();
    let expense = book
        .create_account(None, "Office Supplies", AccountType::Expense, eur(), Some(root.clone()))
        .unwrap();
    let payable =
        book.create_account(None, "Payable", AccountType::Payable, eur(), Some(root)).unwrap();
    let vendor = book.create_vendor(None, "V-0001", "Paper Corp", eur()).unwrap();
    let bill = book.create_vendor_bill(None, "B-0001", &vendor, eur(), ts(2024, 7, 1)).unwrap();
    let entry = book
        .create_invoice_entry(
            &bill,
            NewEntry {
                date: ts(2024, 7, 1),
                description: "Paper".into(),
                action: EntryAction::Material,
                quantity: frac("10/1"),
                price: frac("4/1"),
                account: expense.clone(),
                taxable: false,
                tax_included: false,
                tax_table: None,
            },
        )
        .unwrap();

    // Invoice-side setters are customer-invoice-only.
    let err = book.set_entry_invoice_price(&entry, frac("5/1")).unwrap_err();
    assert!(matches!(err, BookError::TypeMismatch(_)));
    book.set_entry_bill_price(&entry, frac("5/1")).unwrap();

    let txn_guid =
        book.post_invoice(&bill, &payable, ts(2024, 7, 2), ts(2024, 8, 1), "Bill B-0001").unwrap();
    let txn = book.transaction(&txn_guid).unwrap();
    assert!(txn.is_balanced().unwrap());
    let expense_split = txn.splits.iter().find(|s| s.account == expense).unwrap();
    assert_eq!(expense_split.value, frac("50/1"));
    let payable_split = txn.splits.iter().find(|s| s.account == payable).unwrap();
    assert_eq!(payable_split.value, frac("-50/1"));
}

#[test]
fn test_taxable_entry_without_table_fails_posting() {
    let mut fixture = invoice_fixture();
    // Second taxable entry without any tax table.
    fixture
        .book
        .create_invoice_entry(
            &fixture.invoice,
            NewEntry {
                date: ts(2024, 7, 1),
                description: "untaxed but taxable".into(),
                action: EntryAction::Hours,
                quantity: frac("1/1"),
                price: frac("10/1"),
                account: fixture.income.clone(),
                taxable: true,
                tax_included: false,
                tax_table: None,
            },
        )
        .unwrap();
    let err = fixture
        .book
        .post_invoice(&fixture.invoice, &fixture.receivable, ts(2024, 7, 2), ts(2024, 8, 1), "x")
        .unwrap_err();
    assert!(matches!(err, BookError::MissingReference(_)));
    // The failed posting left the invoice in draft.
    assert_eq!(fixture.book.invoice_state(&fixture.invoice).unwrap(), InvoiceState::Draft);
}

#[test]
fn test_cyclic_parenting_rejected_via_public_api() {
    init_logging();
    let mut book = Book::new(Commodity::iso_currency("EUR"));
    let root = book.create_account(None, "Root Account", AccountType::Root, eur(), None).unwrap();
    let a = book.create_account(None, "A", AccountType::Asset, eur(), Some(root.clone())).unwrap();
    let b = book.create_account(None, "B", AccountType::Asset, eur(), Some(a.clone())).unwrap();

    let err = book.set_account_parent(&a, &b).unwrap_err();
    assert!(matches!(err, BookError::ReferentialIntegrity(_)));
    assert_eq!(book.account(&a).unwrap().parent, Some(root));
    assert_eq!(book.account(&b).unwrap().parent, Some(a));
}

#[test]
fn test_account_with_posted_split_refuses_removal() {
    let mut fixture = invoice_fixture();
    post(&mut fixture);
    let before = fixture.book.accounts().len();
    let err = fixture.book.remove_account(&fixture.income).unwrap_err();
    assert!(matches!(err, BookError::ReferentialIntegrity(_)));
    assert_eq!(fixture.book.accounts().len(), before);
}

#[test]
fn test_count_data_tracks_creates_and_removes() {
    let mut fixture = invoice_fixture();
    let scratch = fixture.book.create_customer(None, "000002", "Scratch Ltd", eur()).unwrap();
    fixture.book.remove_customer(&scratch).unwrap();

    let output = write_book_to_string(&fixture.book).unwrap();
    assert!(output.contains("<gnc:count-data cd:type=\"commodity\">1</gnc:count-data>"));
    assert!(output.contains("<gnc:count-data cd:type=\"account\">5</gnc:count-data>"));
    assert!(output.contains("<gnc:count-data cd:type=\"gnc:GncCustomer\">1</gnc:count-data>"));
    assert!(output.contains("<gnc:count-data cd:type=\"gnc:GncInvoice\">1</gnc:count-data>"));
    assert!(output.contains("<gnc:count-data cd:type=\"gnc:GncEntry\">1</gnc:count-data>"));
    assert!(output.contains("<gnc:count-data cd:type=\"gnc:GncTaxTable\">1</gnc:count-data>"));
    // No transactions yet, so no transaction count-data at all.
    assert!(!output.contains("cd:type=\"transaction\""));
}

#[test]
fn test_guid_lowercased_on_write() {
    init_logging();
    let mut book = Book::new(Commodity::iso_currency("EUR"));
    let upper = Guid::parse("ABCDEF00112233445566778899AABBCC").unwrap();
    book.create_account(Some(upper), "Root Account", AccountType::Root, eur(), None).unwrap();
    let output = write_book_to_string(&book).unwrap();
    assert!(output.contains("abcdef00112233445566778899aabbcc"));
    assert!(!output.contains("ABCDEF00112233445566778899AABBCC"));
}

#[test]
fn test_write_read_write_idempotence() {
    let mut fixture = invoice_fixture();
    post(&mut fixture);
    fixture
        .book
        .pay_invoice(&fixture.invoice, &fixture.bank, frac("238/1"), ts(2024, 7, 10), "payment")
        .unwrap();
    fixture.book.add_currency("ISO4217", "USD", frac("4/5"), 100, "US Dollar").unwrap();
    fixture
        .book
        .set_account_slot(&fixture.bank, "reconcile-info", SlotValue::Integer(42))
        .unwrap();
    fixture
        .book
        .set_account_slot(
            &fixture.income,
            "last-review",
            SlotValue::GDate(chrono::NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()),
        )
        .unwrap();
    fixture.book.set_account_placeholder(&fixture.tax_account, true).unwrap();
    fixture.book.set_account_notes(&fixture.bank, "main account").unwrap();

    let first = write_book_to_string(&fixture.book).unwrap();
    let reread = read_book(first.as_bytes()).unwrap();
    let second = write_book_to_string(&reread).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_fixture_round_trip_is_byte_identical() {
    init_logging();
    let mut namespaces = String::new();
    for (prefix, uri) in writer::NAMESPACES {
        namespaces.push_str(&format!("\n     xmlns:{prefix}=\"{uri}\""));
    }
    let fixture = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n\
         <gnc-v2{namespaces}>\n\
         <gnc:count-data cd:type=\"book\">1</gnc:count-data>\n\
         <gnc:book version=\"2.0.0\">\n\
         <book:id type=\"guid\">aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa</book:id>\n\
         <gnc:count-data cd:type=\"commodity\">1</gnc:count-data>\n\
         <gnc:count-data cd:type=\"account\">2</gnc:count-data>\n\
         <gnc:commodity version=\"2.0.0\">\n\
         \x20 <cmdty:space>ISO4217</cmdty:space>\n\
         \x20 <cmdty:id>EUR</cmdty:id>\n\
         \x20 <cmdty:fraction>100</cmdty:fraction>\n\
         </gnc:commodity>\n\
         <gnc:account version=\"2.0.0\">\n\
         \x20 <act:name>Root Account</act:name>\n\
         \x20 <act:id type=\"guid\">bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb</act:id>\n\
         \x20 <act:type>ROOT</act:type>\n\
         \x20 <act:commodity>\n\
         \x20   <cmdty:space>ISO4217</cmdty:space>\n\
         \x20   <cmdty:id>EUR</cmdty:id>\n\
         \x20 </act:commodity>\n\
         \x20 <act:commodity-scu>100</act:commodity-scu>\n\
         </gnc:account>\n\
         <gnc:account version=\"2.0.0\">\n\
         \x20 <act:name>Checking</act:name>\n\
         \x20 <act:id type=\"guid\">cccccccccccccccccccccccccccccccc</act:id>\n\
         \x20 <act:type>BANK</act:type>\n\
         \x20 <act:commodity>\n\
         \x20   <cmdty:space>ISO4217</cmdty:space>\n\
         \x20   <cmdty:id>EUR</cmdty:id>\n\
         \x20 </act:commodity>\n\
         \x20 <act:commodity-scu>100</act:commodity-scu>\n\
         \x20 <act:parent type=\"guid\">bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb</act:parent>\n\
         </gnc:account>\n\
         </gnc:book>\n\
         </gnc-v2>\n\
         \n\
         <!-- Local variables: -->\n\
         <!-- mode: xml        -->\n\
         <!-- End:             -->\n"
    );

    let book = read_book(fixture.as_bytes()).unwrap();
    assert_eq!(book.accounts().len(), 2);
    assert_eq!(book.commodities().len(), 1);
    let output = write_book_to_string(&book).unwrap();
    assert_eq!(output, fixture);
}

#[test]
fn test_change_events_flow_through_posting() {
    let mut fixture = invoice_fixture();
    fixture.book.take_changes();
    fixture.book.set_entry_quantity(&fixture.entry, frac("4/1")).unwrap();
    let changes = fixture.book.take_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].property, "quantity");
    assert_eq!(changes[0].old, "2/1");
    assert_eq!(changes[0].new, "4/1");
}
