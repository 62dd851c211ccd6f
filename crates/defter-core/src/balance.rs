//! Derived balances. Everything here is a pure function of a [`Book`]
//! snapshot; callers memoise on [`Book::version`] if they need to.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use defter_domain::{money, Book, EntityKind, Transaction};

use crate::{CoreError, CoreResult};

/// A client's running and outstanding balances, as shown in client listings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientBalance {
    pub client_id: Uuid,
    pub name: String,
    pub currency_id: Uuid,
    pub balance: Decimal,
    pub pending: Decimal,
}

pub struct BalanceCalculator;

impl BalanceCalculator {
    /// Opening balance plus the signed sum of the account's transactions.
    ///
    /// Transactions without a cash account land on the default account.
    pub fn cash_account_balance(book: &Book, account_id: Uuid) -> CoreResult<Decimal> {
        let account = book
            .cash_account(account_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::CashAccount, account_id))?;
        let movements = book
            .transactions
            .iter()
            .filter(|txn| match txn.cash_account_id {
                Some(id) => id == account_id,
                None => account.is_default,
            })
            .map(Transaction::signed_amount);
        Ok(money::normalize(account.balance.saturating_add(money::sum(movements))))
    }

    /// Opening balance plus the signed sum of the client's transactions.
    ///
    /// With `currency_id` set, the opening balance counts only when it is
    /// kept in that currency, and a transaction counts when its effective
    /// currency (its own, else its cash account's, else the client's) matches.
    pub fn client_balance(
        book: &Book,
        client_id: Uuid,
        currency_id: Option<Uuid>,
    ) -> CoreResult<Decimal> {
        let client = book
            .client(client_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Client, client_id))?;
        let opening = match currency_id {
            Some(currency) if currency != client.currency_id => Decimal::ZERO,
            _ => client.balance,
        };
        let movements = book
            .transactions
            .iter()
            .filter(|txn| txn.client_id == Some(client_id))
            .filter(|txn| {
                currency_id.map_or(true, |currency| {
                    effective_currency(book, txn, client.currency_id) == currency
                })
            })
            .map(Transaction::signed_amount);
        Ok(money::normalize(opening.saturating_add(money::sum(movements))))
    }

    /// Sum of the client's open pending balances. Never negative.
    ///
    /// With `currency_id` set, only pending balances whose invoice is kept in
    /// that currency (the client's when the invoice names none) count.
    pub fn client_pending_balance(
        book: &Book,
        client_id: Uuid,
        currency_id: Option<Uuid>,
    ) -> CoreResult<Decimal> {
        let client = book
            .client(client_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Client, client_id))?;
        let amounts = book
            .pending_balances
            .iter()
            .filter(|pending| pending.client_id == client_id && pending.is_open())
            .filter(|pending| {
                currency_id.map_or(true, |currency| {
                    let invoice_currency = book
                        .invoice(pending.invoice_id)
                        .and_then(|invoice| invoice.currency_id)
                        .unwrap_or(client.currency_id);
                    invoice_currency == currency
                })
            })
            .map(|pending| pending.amount.max(Decimal::ZERO));
        Ok(money::sum(amounts))
    }

    /// Balance rows for every client, in insertion order.
    pub fn client_balances(book: &Book) -> Vec<ClientBalance> {
        book.clients
            .iter()
            .map(|client| ClientBalance {
                client_id: client.id,
                name: client.name.clone(),
                currency_id: client.currency_id,
                balance: Self::client_balance(book, client.id, None).unwrap_or(client.balance),
                pending: Self::client_pending_balance(book, client.id, None)
                    .unwrap_or(Decimal::ZERO),
            })
            .collect()
    }

    /// Per-currency sum of the balances of active cash accounts.
    pub fn cash_totals_by_currency(book: &Book) -> BTreeMap<Uuid, Decimal> {
        let mut totals = BTreeMap::new();
        for account in book.cash_accounts.iter().filter(|account| account.is_active) {
            let balance = Self::cash_account_balance(book, account.id).unwrap_or(account.balance);
            let total = totals.entry(account.currency_id).or_insert(Decimal::ZERO);
            *total = total.saturating_add(balance);
        }
        totals
    }

    /// Everything still owed to the business across all clients.
    pub fn receivables_total(book: &Book) -> Decimal {
        money::sum(
            book.pending_balances
                .iter()
                .filter(|pending| pending.is_open())
                .map(|pending| pending.amount),
        )
    }
}

fn effective_currency(book: &Book, txn: &Transaction, client_currency: Uuid) -> Uuid {
    txn.currency_id
        .or_else(|| {
            txn.cash_account_id
                .and_then(|id| book.cash_account(id))
                .map(|account| account.currency_id)
        })
        .unwrap_or(client_currency)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use defter_domain::{
        money::cents, NewCashAccount, NewClient, NewCurrency, NewInvoice, NewTransaction,
    };

    use super::*;
    use crate::{Clock, EntityStore, FixedClock};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn unassigned_transactions_land_on_default_account() {
        let mut store = EntityStore::new("Balances", Arc::new(FixedClock::on(date())));
        let lira = store
            .add_currency(NewCurrency::new("TRY", "₺", "Turkish Lira"))
            .unwrap();
        let main = store
            .add_cash_account(
                NewCashAccount::new("Main", lira.id)
                    .with_opening_balance(cents(100_000))
                    .as_default(),
            )
            .unwrap();
        let bank = store
            .add_cash_account(NewCashAccount::new("Bank", lira.id))
            .unwrap();
        store
            .add_transaction(NewTransaction::income(cents(25_000), date()))
            .unwrap();
        store
            .add_transaction(NewTransaction::expense(cents(5_000), date()).in_account(bank.id))
            .unwrap();

        let book = store.book();
        assert_eq!(
            BalanceCalculator::cash_account_balance(book, main.id).unwrap(),
            cents(125_000)
        );
        assert_eq!(
            BalanceCalculator::cash_account_balance(book, bank.id).unwrap(),
            cents(-5_000)
        );
        let totals = BalanceCalculator::cash_totals_by_currency(book);
        assert_eq!(totals.get(&lira.id), Some(&cents(120_000)));
    }

    #[test]
    fn oversized_imported_amounts_saturate_instead_of_panicking() {
        let mut store = EntityStore::new("Balances", Arc::new(FixedClock::on(date())));
        let lira = store
            .add_currency(NewCurrency::new("TRY", "₺", "Turkish Lira"))
            .unwrap();
        let first = store
            .add_cash_account(NewCashAccount::new("Main", lira.id).as_default())
            .unwrap();
        let second = store
            .add_cash_account(NewCashAccount::new("Bank", lira.id))
            .unwrap();
        let mut book = store.into_book();
        for account in &mut book.cash_accounts {
            account.balance = Decimal::MAX;
        }

        assert_eq!(
            BalanceCalculator::cash_account_balance(&book, first.id).unwrap(),
            money::normalize(Decimal::MAX)
        );
        assert!(BalanceCalculator::cash_account_balance(&book, second.id).is_ok());
        let totals = BalanceCalculator::cash_totals_by_currency(&book);
        assert_eq!(totals.get(&lira.id), Some(&Decimal::MAX));
    }

    #[test]
    fn currency_filter_uses_effective_currency() {
        let mut store = EntityStore::new("Balances", Arc::new(FixedClock::on(date())));
        let lira = store
            .add_currency(NewCurrency::new("TRY", "₺", "Turkish Lira"))
            .unwrap();
        let euro = store
            .add_currency(NewCurrency::new("EUR", "€", "Euro"))
            .unwrap();
        let euro_account = store
            .add_cash_account(NewCashAccount::new("Euro", euro.id))
            .unwrap();
        let client = store
            .add_client(NewClient::new("Ada", lira.id).with_opening_balance(cents(1_000)))
            .unwrap();
        store
            .add_transaction(NewTransaction::income(cents(2_000), date()).for_client(client.id))
            .unwrap();
        store
            .add_transaction(
                NewTransaction::income(cents(7_000), date())
                    .for_client(client.id)
                    .in_account(euro_account.id),
            )
            .unwrap();

        let book = store.book();
        let all = BalanceCalculator::client_balance(book, client.id, None).unwrap();
        let in_lira = BalanceCalculator::client_balance(book, client.id, Some(lira.id)).unwrap();
        let in_euro = BalanceCalculator::client_balance(book, client.id, Some(euro.id)).unwrap();
        assert_eq!(all, cents(10_000));
        assert_eq!(in_lira, cents(3_000));
        assert_eq!(in_euro, cents(7_000));
    }

    #[test]
    fn pending_total_sums_open_balances() {
        let mut store = EntityStore::new("Balances", Arc::new(FixedClock::on(date())));
        let lira = store
            .add_currency(NewCurrency::new("TRY", "₺", "Turkish Lira"))
            .unwrap();
        let client = store.add_client(NewClient::new("Ada", lira.id)).unwrap();
        for (number, total) in [("F-1", 40_000), ("F-2", 60_000)] {
            store
                .add_invoice(NewInvoice::new(number, client.id, date()).with_total(cents(total)))
                .unwrap();
        }

        let book = store.book();
        assert_eq!(
            BalanceCalculator::client_pending_balance(book, client.id, None).unwrap(),
            cents(100_000)
        );
        assert_eq!(BalanceCalculator::receivables_total(book), cents(100_000));
        let rows = BalanceCalculator::client_balances(book);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pending, cents(100_000));
    }

    #[test]
    fn unknown_client_is_not_found() {
        let book = Book::new("Empty", FixedClock::on(date()).now());
        let err = BalanceCalculator::client_balance(&book, Uuid::new_v4(), None).unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err:?}");
    }
}
