use std::sync::Arc;

use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use defter_core::{BalanceCalculator, EntityStore, FixedClock, PaymentReconciler};
use defter_domain::{money::cents, Book, NewCashAccount, NewClient, NewCurrency, NewInvoice};
use defter_storage_json::{load_book_from_path, save_book_to_path};
use tempfile::tempdir;
use uuid::Uuid;

fn build_sample_book(client_count: usize, invoices_per_client: usize) -> (Book, Vec<Uuid>) {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let mut store = EntityStore::new("Benchmark", Arc::new(FixedClock::on(start)));
    let currency = store
        .add_currency(NewCurrency::new("TRY", "₺", "Turkish Lira"))
        .unwrap();
    store
        .add_cash_account(NewCashAccount::new("Kasa", currency.id).as_default())
        .unwrap();

    let mut clients = Vec::with_capacity(client_count);
    for idx in 0..client_count {
        let client = store
            .add_client(NewClient::new(format!("Client {idx}"), currency.id))
            .unwrap();
        for n in 0..invoices_per_client {
            let issued = start + Days::new((n % 365) as u64);
            let invoice = store
                .add_invoice(
                    NewInvoice::new(format!("F-{idx}-{n}"), client.id, issued)
                        .with_total(cents(10_000 + (n as i64 % 100) * 100)),
                )
                .unwrap();
            if n % 3 == 0 {
                PaymentReconciler::mark_invoice_as_paid(&mut store, invoice.id, cents(5_000))
                    .unwrap();
            }
        }
        clients.push(client.id);
    }
    (store.into_book(), clients)
}

fn bench_balances(c: &mut Criterion) {
    let (book, clients) = build_sample_book(black_box(200), black_box(25));

    c.bench_function("client_balances_200x25", |b| {
        b.iter(|| black_box(BalanceCalculator::client_balances(&book)))
    });

    c.bench_function("client_pending_balance_single", |b| {
        b.iter(|| {
            black_box(BalanceCalculator::client_pending_balance(&book, clients[0], None).unwrap())
        })
    });

    c.bench_function("invoice_number_match", |b| {
        b.iter(|| {
            black_box(PaymentReconciler::match_invoice_number(
                &book,
                "Havale F-199-24 ödeme",
                None,
            ))
        })
    });
}

fn bench_book_io(c: &mut Criterion) {
    let (book, _) = build_sample_book(200, 25);
    let dir = tempdir().expect("tempdir");
    let file_path = dir.path().join("book.json");

    c.bench_function("book_save_5k_invoices", |b| {
        b.iter(|| save_book_to_path(&book, &file_path).expect("save book"))
    });

    save_book_to_path(&book, &file_path).expect("seed");

    c.bench_function("book_load_5k_invoices", |b| {
        b.iter_batched(
            || file_path.clone(),
            |path| black_box(load_book_from_path(&path).expect("load book")),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_balances, bench_book_io);
criterion_main!(benches);
