use std::{
    sync::{Arc, Mutex},
    thread,
};

use chrono::NaiveDate;
use defter_core::{
    BalanceCalculator, EntityStore, FixedClock, PaymentOutcome, PaymentReconciler,
};
use defter_domain::{
    money::cents, InvoiceStatus, NewClient, NewCurrency, NewInvoice, NewTransaction,
};

fn store() -> (EntityStore, uuid::Uuid) {
    let date = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
    let mut store = EntityStore::new("Shared", Arc::new(FixedClock::on(date)));
    let currency = store
        .add_currency(NewCurrency::new("TRY", "₺", "Turkish Lira"))
        .expect("add currency");
    let client = store
        .add_client(NewClient::new("Deniz A.Ş.", currency.id))
        .expect("add client");
    (store, client.id)
}

#[test]
fn concurrent_full_payments_apply_once() {
    let (mut store, client) = store();
    let date = store.today();
    let invoice = store
        .add_invoice(NewInvoice::new("F-2024-090", client, date).with_total(cents(75_000)))
        .expect("add invoice");
    let shared = Arc::new(Mutex::new(store));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let mut store = shared.lock().expect("store lock");
                PaymentReconciler::mark_invoice_as_paid(&mut store, invoice.id, cents(75_000))
                    .expect("payment")
            })
        })
        .collect();
    let outcomes: Vec<PaymentOutcome> = handles
        .into_iter()
        .map(|handle| handle.join().expect("payment thread"))
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_applied()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, PaymentOutcome::AlreadyPaid(_)))
            .count(),
        1
    );

    let store = shared.lock().expect("store lock");
    let stored = store.book().invoice(invoice.id).expect("invoice");
    assert_eq!(stored.paid_amount, cents(75_000));
    assert_eq!(stored.status, InvoiceStatus::Paid);
    assert_eq!(store.book().transactions.len(), 1);
}

#[test]
fn imported_bank_lines_reconcile_by_invoice_number() {
    let (mut store, client) = store();
    let date = store.today();
    for (number, total) in [("F-1", 10_000), ("F-12", 20_000)] {
        store
            .add_invoice(NewInvoice::new(number, client, date).with_total(cents(total)))
            .expect("add invoice");
    }
    let lines = [
        ("EFT F-12 ödeme", 20_000),
        ("Havale F-1 kısmi", 4_000),
        ("Kira", 9_000),
    ];
    let ids: Vec<_> = lines
        .iter()
        .map(|(description, amount)| {
            store
                .add_transaction(
                    NewTransaction::income(cents(*amount), date).with_description(*description),
                )
                .expect("add transaction")
                .id
        })
        .collect();

    let outcomes: Vec<_> = ids
        .iter()
        .map(|id| PaymentReconciler::process_payment_from_transaction(&mut store, *id))
        .collect::<Result<_, _>>()
        .expect("reconcile");
    assert!(outcomes[0].is_applied());
    assert!(outcomes[1].is_applied());
    assert!(matches!(outcomes[2], PaymentOutcome::Unmatched(_)));

    let book = store.book();
    let f12 = book.invoice_by_number("F-12").expect("F-12");
    assert_eq!(f12.status, InvoiceStatus::Paid);
    let f1 = book.invoice_by_number("F-1").expect("F-1");
    assert_eq!(f1.paid_amount, cents(4_000));
    assert_eq!(
        BalanceCalculator::client_pending_balance(book, client, None).unwrap(),
        cents(6_000)
    );
    // The unmatched line keeps no client, so only reconciled income counts.
    assert_eq!(
        BalanceCalculator::client_balance(book, client, None).unwrap(),
        cents(24_000)
    );
}
