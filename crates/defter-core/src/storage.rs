use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use defter_domain::{Book, Displayable};

use crate::CoreError;

/// Describes a persisted backup artifact for a book.
#[derive(Debug, Clone)]
pub struct BookBackupInfo {
    pub book: String,
    pub id: String,
    pub created_at: String,
    pub path: PathBuf,
}

/// Abstraction over persistence backends capable of storing books and backups.
pub trait BookStorage: Send + Sync {
    fn save_book(&self, name: &str, book: &Book) -> Result<(), CoreError>;
    fn load_book(&self, name: &str) -> Result<Book, CoreError>;
    fn list_books(&self) -> Result<Vec<String>, CoreError>;
    fn delete_book(&self, name: &str) -> Result<(), CoreError>;
    fn save_book_to_path(&self, book: &Book, path: &Path) -> Result<(), CoreError>;
    fn load_book_from_path(&self, path: &Path) -> Result<Book, CoreError>;
    fn backup_book(
        &self,
        name: &str,
        book: &Book,
        note: Option<&str>,
    ) -> Result<BookBackupInfo, CoreError>;
    fn list_backups(&self, name: &str) -> Result<Vec<BookBackupInfo>, CoreError>;
    fn restore_backup(&self, backup: &BookBackupInfo) -> Result<Book, CoreError>;
}

/// Detects dangling references and invariant drift within a book snapshot.
pub fn book_warnings(book: &Book) -> Vec<String> {
    let currency_ids: HashSet<_> = book.currencies.iter().map(|c| c.id).collect();
    let account_ids: HashSet<_> = book.cash_accounts.iter().map(|a| a.id).collect();
    let client_ids: HashSet<_> = book.clients.iter().map(|c| c.id).collect();
    let invoice_ids: HashSet<_> = book.invoices.iter().map(|i| i.id).collect();
    let mut warnings = Vec::new();

    let defaults = book.cash_accounts.iter().filter(|a| a.is_default).count();
    if defaults > 1 {
        warnings.push(format!("{defaults} cash accounts are marked as default"));
    }
    for account in &book.cash_accounts {
        if !currency_ids.contains(&account.currency_id) {
            warnings.push(format!(
                "cash account {} references unknown currency {}",
                account.id, account.currency_id
            ));
        }
    }
    for client in &book.clients {
        if !currency_ids.contains(&client.currency_id) {
            warnings.push(format!(
                "client {} references unknown currency {}",
                client.id, client.currency_id
            ));
        }
    }

    for txn in &book.transactions {
        if let Some(client) = txn.client_id {
            if !client_ids.contains(&client) {
                warnings.push(format!(
                    "transaction {} references unknown client {}",
                    txn.id, client
                ));
            }
        }
        if let Some(account) = txn.cash_account_id {
            if !account_ids.contains(&account) {
                warnings.push(format!(
                    "transaction {} references unknown cash account {}",
                    txn.id, account
                ));
            }
        }
        if let Some(invoice) = txn.invoice_id {
            if !invoice_ids.contains(&invoice) {
                warnings.push(format!(
                    "transaction {} references missing invoice {}",
                    txn.id, invoice
                ));
            }
        }
    }

    for invoice in &book.invoices {
        if !client_ids.contains(&invoice.client_id) {
            warnings.push(format!(
                "invoice {} references unknown client {}",
                invoice.invoice_number, invoice.client_id
            ));
        }
        if invoice.paid_amount > invoice.total_amount {
            warnings.push(format!(
                "invoice {} paid {} exceeds total {}",
                invoice.invoice_number, invoice.paid_amount, invoice.total_amount
            ));
        }
        if invoice.status != invoice.derived_status() {
            warnings.push(format!(
                "invoice {} status does not match its paid amount",
                invoice.display_label()
            ));
        }
    }

    for pending in &book.pending_balances {
        match book.invoice(pending.invoice_id) {
            None => warnings.push(format!(
                "pending balance {} references missing invoice {}",
                pending.id, pending.invoice_id
            )),
            Some(invoice) => {
                if pending.is_open() && pending.amount != invoice.outstanding() {
                    warnings.push(format!(
                        "pending balance for invoice {} is {} but {} is outstanding",
                        invoice.invoice_number,
                        pending.amount,
                        invoice.outstanding()
                    ));
                }
                if pending.is_open() == pending.amount.is_zero() {
                    warnings.push(format!(
                        "pending balance for invoice {} is {} with amount {}",
                        invoice.invoice_number, pending.status, pending.amount
                    ));
                }
            }
        }
    }

    for debt in &book.debts {
        if let Some(client) = debt.client_id {
            if !client_ids.contains(&client) {
                warnings.push(format!(
                    "debt {} references unknown client {}",
                    debt.display_label(),
                    client
                ));
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use defter_domain::{money::cents, NewClient, NewCurrency, NewInvoice};
    use std::sync::Arc;

    use super::*;
    use crate::{EntityStore, FixedClock};

    #[test]
    fn consistent_book_has_no_warnings() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut store = EntityStore::new("Clean", Arc::new(FixedClock::on(date)));
        let currency = store
            .add_currency(NewCurrency::new("TRY", "₺", "Turkish Lira"))
            .unwrap();
        let client = store.add_client(NewClient::new("Ada", currency.id)).unwrap();
        store
            .add_invoice(NewInvoice::new("F-1", client.id, date).with_total(cents(1_000)))
            .unwrap();
        assert!(book_warnings(store.book()).is_empty());
    }

    #[test]
    fn drifted_pending_balance_is_reported() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut store = EntityStore::new("Drift", Arc::new(FixedClock::on(date)));
        let currency = store
            .add_currency(NewCurrency::new("TRY", "₺", "Turkish Lira"))
            .unwrap();
        let client = store.add_client(NewClient::new("Ada", currency.id)).unwrap();
        store
            .add_invoice(NewInvoice::new("F-1", client.id, date).with_total(cents(1_000)))
            .unwrap();

        let mut book = store.into_book();
        book.pending_balances[0].amount = cents(10);
        book.clients.clear();

        let warnings = book_warnings(&book);
        assert!(warnings.iter().any(|w| w.contains("outstanding")), "{warnings:?}");
        assert!(warnings.iter().any(|w| w.contains("unknown client")), "{warnings:?}");
    }
}
