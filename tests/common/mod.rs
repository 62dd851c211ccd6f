#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use defter::BookManager;
use defter_config::ConfigManager;
use defter_core::FixedClock;
use defter_domain::{money::cents, NewCashAccount, NewClient, NewCurrency};
use defter_storage_json::JsonBookStorage;
use once_cell::sync::Lazy;
use tempfile::TempDir;
use uuid::Uuid;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

/// Creates isolated managers backed by unique directories for each test.
pub fn setup_test_env() -> (BookManager, ConfigManager) {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);

    let storage = JsonBookStorage::with_retention(base.join("books"), base.join("backups"), 3)
        .expect("create json storage backend");
    let book_manager = BookManager::new(Box::new(storage), Arc::new(FixedClock::on(today())));
    let config_manager =
        ConfigManager::with_base_dir(base).expect("create config manager for temp dir");

    (book_manager, config_manager)
}

pub struct Seeded {
    pub currency: Uuid,
    pub account: Uuid,
    pub client: Uuid,
}

/// Creates `name` with one currency, a default cash account, and one client.
pub fn seeded_book(manager: &mut BookManager, name: &str) -> Seeded {
    manager.create(name).expect("create book");
    manager
        .mutate(|store| {
            let currency = store.add_currency(NewCurrency::new("TRY", "₺", "Turkish Lira"))?;
            let account = store.add_cash_account(
                NewCashAccount::new("Kasa", currency.id)
                    .with_opening_balance(cents(100_000))
                    .as_default(),
            )?;
            let client = store.add_client(NewClient::new("Yıldız Ltd", currency.id))?;
            Ok(Seeded {
                currency: currency.id,
                account: account.id,
                client: client.id,
            })
        })
        .expect("seed book")
}
