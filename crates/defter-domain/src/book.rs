//! The `Book`: one business's complete set of records and the unit of persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    common::Identifiable, CashAccount, Client, Currency, Debt, Invoice, PendingBalance, Quote,
    RegularPayment, Transaction,
};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub currencies: Vec<Currency>,
    #[serde(default)]
    pub cash_accounts: Vec<CashAccount>,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub pending_balances: Vec<PendingBalance>,
    #[serde(default)]
    pub regular_payments: Vec<RegularPayment>,
    #[serde(default)]
    pub quotes: Vec<Quote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by every mutating operation; callers may memoize derived values on it.
    #[serde(default)]
    pub version: u64,
    #[serde(default = "Book::schema_version_default")]
    pub schema_version: u8,
}

impl Book {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            currencies: Vec::new(),
            cash_accounts: Vec::new(),
            clients: Vec::new(),
            transactions: Vec::new(),
            debts: Vec::new(),
            invoices: Vec::new(),
            pending_balances: Vec::new(),
            regular_payments: Vec::new(),
            quotes: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Records a mutation: bumps the version counter and the modification time.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }

    pub fn currency(&self, id: Uuid) -> Option<&Currency> {
        by_id(&self.currencies, id)
    }

    pub fn currency_by_code(&self, code: &str) -> Option<&Currency> {
        let code = code.trim();
        self.currencies
            .iter()
            .find(|currency| currency.code.eq_ignore_ascii_case(code))
    }

    pub fn cash_account(&self, id: Uuid) -> Option<&CashAccount> {
        by_id(&self.cash_accounts, id)
    }

    pub fn cash_account_mut(&mut self, id: Uuid) -> Option<&mut CashAccount> {
        by_id_mut(&mut self.cash_accounts, id)
    }

    /// The landing account for transactions without an explicit account.
    pub fn default_cash_account(&self) -> Option<&CashAccount> {
        self.cash_accounts.iter().find(|account| account.is_default)
    }

    pub fn client(&self, id: Uuid) -> Option<&Client> {
        by_id(&self.clients, id)
    }

    pub fn transaction(&self, id: Uuid) -> Option<&Transaction> {
        by_id(&self.transactions, id)
    }

    pub fn transaction_mut(&mut self, id: Uuid) -> Option<&mut Transaction> {
        by_id_mut(&mut self.transactions, id)
    }

    pub fn debt(&self, id: Uuid) -> Option<&Debt> {
        by_id(&self.debts, id)
    }

    pub fn debt_mut(&mut self, id: Uuid) -> Option<&mut Debt> {
        by_id_mut(&mut self.debts, id)
    }

    pub fn invoice(&self, id: Uuid) -> Option<&Invoice> {
        by_id(&self.invoices, id)
    }

    pub fn invoice_mut(&mut self, id: Uuid) -> Option<&mut Invoice> {
        by_id_mut(&mut self.invoices, id)
    }

    pub fn invoice_by_number(&self, number: &str) -> Option<&Invoice> {
        let number = number.trim();
        self.invoices
            .iter()
            .find(|invoice| invoice.invoice_number.eq_ignore_ascii_case(number))
    }

    pub fn pending_balance(&self, id: Uuid) -> Option<&PendingBalance> {
        by_id(&self.pending_balances, id)
    }

    /// The pending balance tracking `invoice_id`, preferring one still open.
    pub fn pending_balance_for_invoice(&self, invoice_id: Uuid) -> Option<&PendingBalance> {
        self.pending_balances
            .iter()
            .filter(|pending| pending.invoice_id == invoice_id)
            .max_by_key(|pending| pending.is_open())
    }

    pub fn pending_balance_for_invoice_mut(
        &mut self,
        invoice_id: Uuid,
    ) -> Option<&mut PendingBalance> {
        self.pending_balances
            .iter_mut()
            .filter(|pending| pending.invoice_id == invoice_id)
            .max_by_key(|pending| pending.is_open())
    }

    pub fn regular_payment(&self, id: Uuid) -> Option<&RegularPayment> {
        by_id(&self.regular_payments, id)
    }

    pub fn regular_payment_mut(&mut self, id: Uuid) -> Option<&mut RegularPayment> {
        by_id_mut(&mut self.regular_payments, id)
    }

    pub fn quote(&self, id: Uuid) -> Option<&Quote> {
        by_id(&self.quotes, id)
    }
}

fn by_id<T: Identifiable>(records: &[T], id: Uuid) -> Option<&T> {
    records.iter().find(|record| record.id() == id)
}

fn by_id_mut<T: Identifiable>(records: &mut [T], id: Uuid) -> Option<&mut T> {
    records.iter_mut().find(|record| record.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_book_is_empty_and_unversioned() {
        let book = Book::new("Atölye", Utc::now());
        assert_eq!(book.version, 0);
        assert_eq!(book.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(book.cash_accounts.is_empty());
        assert!(book.default_cash_account().is_none());
    }

    #[test]
    fn touch_bumps_version() {
        let mut book = Book::new("Atölye", Utc::now());
        book.touch(Utc::now());
        book.touch(Utc::now());
        assert_eq!(book.version, 2);
    }

    #[test]
    fn legacy_snapshot_without_collections_deserializes() {
        let json = r#"{
            "id": "9b2f4c3e-6d1a-4f7e-8a52-0c3d2b1e4f60",
            "name": "Legacy",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let book: Book = serde_json::from_str(json).expect("legacy book");
        assert_eq!(book.name, "Legacy");
        assert_eq!(book.version, 0);
        assert_eq!(book.schema_version, CURRENT_SCHEMA_VERSION);
    }
}
