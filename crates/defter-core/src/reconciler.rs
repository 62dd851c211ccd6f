//! Applies payments to invoices and their pending balances.
//!
//! Both entry points validate against the current snapshot first and then
//! write the invoice, its pending balance, and the payment transaction in one
//! step, bumping the book version once. Outcomes that change nothing are
//! reported as [`PaymentOutcome`] variants rather than errors.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, trace};
use uuid::Uuid;

use defter_domain::{
    money, Book, Displayable, EntityKind, Invoice, PendingBalance, Timestamped, Transaction,
    TransactionType,
};

use crate::store::{positive_amount, sync_pending};
use crate::{CoreError, CoreResult, EntityStore};

/// A payment recorded against an invoice from the outside.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub amount: Decimal,
    /// Account receiving the money; `None` lands on the default account.
    pub cash_account_id: Option<Uuid>,
    /// Defaults to the clock's today.
    pub paid_on: Option<NaiveDate>,
}

impl PaymentRequest {
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount,
            cash_account_id: None,
            paid_on: None,
        }
    }

    pub fn into_account(mut self, cash_account_id: Uuid) -> Self {
        self.cash_account_id = Some(cash_account_id);
        self
    }

    pub fn on(mut self, paid_on: NaiveDate) -> Self {
        self.paid_on = Some(paid_on);
        self
    }
}

/// What a successful reconciliation wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPayment {
    pub invoice: Invoice,
    /// `None` when the invoice has no pending balance to settle.
    pub pending_balance: Option<PendingBalance>,
    pub transaction: Transaction,
    pub requested: Decimal,
    /// `requested` clamped to what was outstanding.
    pub applied: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Applied(AppliedPayment),
    /// The invoice was already settled; nothing changed.
    AlreadyPaid(Invoice),
    /// The transaction had been applied before; nothing changed.
    AlreadyReconciled(Transaction),
    /// No invoice could be resolved for the transaction, or it is not a
    /// payment; nothing changed.
    Unmatched(Transaction),
}

impl PaymentOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PaymentOutcome::Applied(_))
    }

    pub fn applied(&self) -> Option<&AppliedPayment> {
        match self {
            PaymentOutcome::Applied(applied) => Some(applied),
            _ => None,
        }
    }

    /// The invoice the outcome concerns, when one was resolved.
    pub fn invoice(&self) -> Option<&Invoice> {
        match self {
            PaymentOutcome::Applied(applied) => Some(&applied.invoice),
            PaymentOutcome::AlreadyPaid(invoice) => Some(invoice),
            PaymentOutcome::AlreadyReconciled(_) | PaymentOutcome::Unmatched(_) => None,
        }
    }
}

pub struct PaymentReconciler;

impl PaymentReconciler {
    /// Records a payment of `payment_amount` against an invoice, dated today
    /// and landing on the default cash account.
    pub fn mark_invoice_as_paid(
        store: &mut EntityStore,
        invoice_id: Uuid,
        payment_amount: Decimal,
    ) -> CoreResult<PaymentOutcome> {
        Self::mark_invoice_as_paid_with(store, invoice_id, PaymentRequest::new(payment_amount))
    }

    /// Records a payment against an invoice and creates the income
    /// transaction for the applied amount.
    ///
    /// Overpayments are clamped to the outstanding amount.
    pub fn mark_invoice_as_paid_with(
        store: &mut EntityStore,
        invoice_id: Uuid,
        request: PaymentRequest,
    ) -> CoreResult<PaymentOutcome> {
        let invoice = store
            .book()
            .invoice(invoice_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Invoice, invoice_id))?;
        let requested = positive_amount("Payment amount", request.amount)?;
        if let Some(account_id) = request.cash_account_id {
            if store.book().cash_account(account_id).is_none() {
                return Err(CoreError::not_found(EntityKind::CashAccount, account_id));
            }
        }
        if invoice.is_fully_paid() {
            trace!(invoice = %invoice.invoice_number, "invoice already paid");
            return Ok(PaymentOutcome::AlreadyPaid(invoice));
        }
        let applied = requested.min(invoice.outstanding());

        let now = store.now();
        let transaction = Transaction {
            id: Uuid::new_v4(),
            kind: TransactionType::Income,
            amount: applied,
            client_id: Some(invoice.client_id),
            cash_account_id: request.cash_account_id,
            invoice_id: Some(invoice.id),
            currency_id: invoice.currency_id,
            category: None,
            description: format!("Payment for invoice #{}", invoice.invoice_number),
            transaction_date: request.paid_on.unwrap_or_else(|| store.today()),
            vat_rate: None,
            vat_amount: None,
            reconciled: true,
            created_at: now,
            updated_at: now,
        };

        let book = store.book_mut();
        let (invoice, pending_balance) = apply_to_invoice(book, invoice_id, applied, now)?;
        book.transactions.push(transaction.clone());
        store.commit(now);
        debug!(
            invoice = %invoice.display_label(),
            %requested,
            %applied,
            "payment applied"
        );
        Ok(PaymentOutcome::Applied(AppliedPayment {
            invoice,
            pending_balance,
            transaction,
            requested,
            applied,
        }))
    }

    /// Applies an existing income transaction to the invoice it pays.
    ///
    /// The explicit `invoice_id` link is preferred; transactions without one
    /// are matched by an invoice number appearing in their description.
    pub fn process_payment_from_transaction(
        store: &mut EntityStore,
        transaction_id: Uuid,
    ) -> CoreResult<PaymentOutcome> {
        let txn = store
            .book()
            .transaction(transaction_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Transaction, transaction_id))?;
        if txn.reconciled {
            trace!(transaction = %txn.id, "transaction already reconciled");
            return Ok(PaymentOutcome::AlreadyReconciled(txn));
        }
        if txn.kind != TransactionType::Income {
            trace!(transaction = %txn.id, "expense transactions are not payments");
            return Ok(PaymentOutcome::Unmatched(txn));
        }
        let invoice = match Self::resolve_invoice(store.book(), &txn) {
            Some(invoice) => invoice.clone(),
            None => {
                trace!(transaction = %txn.id, "no invoice matched");
                return Ok(PaymentOutcome::Unmatched(txn));
            }
        };
        if invoice.is_fully_paid() {
            trace!(invoice = %invoice.invoice_number, "invoice already paid");
            return Ok(PaymentOutcome::AlreadyPaid(invoice));
        }
        let requested = txn.amount;
        let applied = requested.min(invoice.outstanding());

        let now = store.now();
        let book = store.book_mut();
        let (invoice, pending_balance) = apply_to_invoice(book, invoice.id, applied, now)?;
        let transaction = match book.transaction_mut(transaction_id) {
            Some(slot) => {
                slot.invoice_id = Some(invoice.id);
                slot.reconciled = true;
                slot.client_id.get_or_insert(invoice.client_id);
                slot.touch(now);
                slot.clone()
            }
            None => return Err(CoreError::not_found(EntityKind::Transaction, transaction_id)),
        };
        store.commit(now);
        debug!(
            invoice = %invoice.display_label(),
            transaction = %transaction.display_label(),
            %applied,
            "transaction reconciled"
        );
        Ok(PaymentOutcome::Applied(AppliedPayment {
            invoice,
            pending_balance,
            transaction,
            requested,
            applied,
        }))
    }

    /// Finds the invoice a transaction pays, if any.
    ///
    /// A dangling explicit link or an invoice of another client resolves to
    /// nothing.
    pub fn resolve_invoice<'a>(book: &'a Book, txn: &Transaction) -> Option<&'a Invoice> {
        let invoice = match txn.invoice_id {
            Some(id) => book.invoice(id)?,
            None => Self::match_invoice_number(book, &txn.description, txn.client_id)?,
        };
        match txn.client_id {
            Some(client_id) if client_id != invoice.client_id => None,
            _ => Some(invoice),
        }
    }

    /// Legacy matching for transactions recorded before explicit links:
    /// the longest invoice number that appears in `description` as a whole
    /// token, compared case-insensitively. With `client_id` set, only that
    /// client's invoices are candidates.
    pub fn match_invoice_number<'a>(
        book: &'a Book,
        description: &str,
        client_id: Option<Uuid>,
    ) -> Option<&'a Invoice> {
        let haystack = description.to_ascii_lowercase();
        book.invoices
            .iter()
            .filter(|invoice| client_id.map_or(true, |client| invoice.client_id == client))
            .filter(|invoice| contains_token(&haystack, &invoice.invoice_number))
            .max_by_key(|invoice| invoice.invoice_number.trim().len())
    }
}

/// Adds `applied` to the invoice's paid amount and resynchronizes its
/// pending balance. Returns owned copies of both.
fn apply_to_invoice(
    book: &mut Book,
    invoice_id: Uuid,
    applied: Decimal,
    now: DateTime<Utc>,
) -> CoreResult<(Invoice, Option<PendingBalance>)> {
    let invoice = book
        .invoice_mut(invoice_id)
        .ok_or_else(|| CoreError::not_found(EntityKind::Invoice, invoice_id))?;
    invoice.paid_amount = money::normalize(invoice.paid_amount + applied).min(invoice.total_amount);
    invoice.status = invoice.derived_status();
    invoice.touch(now);
    let invoice = invoice.clone();

    let pending = book.pending_balance_for_invoice_mut(invoice_id).map(|pending| {
        sync_pending(pending, &invoice, now);
        pending.clone()
    });
    Ok((invoice, pending))
}

fn contains_token(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(&needle).any(|(start, found)| {
        let end = start + found.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.map_or(false, char::is_alphanumeric) && !after.map_or(false, char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use defter_domain::{
        money::cents, InvoiceStatus, NewClient, NewCurrency, NewInvoice, NewTransaction,
    };

    use super::*;
    use crate::FixedClock;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn store_with_invoice(number: &str, total: Decimal) -> (EntityStore, Invoice) {
        let mut store = EntityStore::new("Reconcile", Arc::new(FixedClock::on(date())));
        let currency = store
            .add_currency(NewCurrency::new("TRY", "₺", "Turkish Lira"))
            .unwrap();
        let client = store.add_client(NewClient::new("Ada", currency.id)).unwrap();
        let invoice = store
            .add_invoice(NewInvoice::new(number, client.id, date()).with_total(total))
            .unwrap();
        (store, invoice)
    }

    #[test]
    fn token_match_respects_boundaries() {
        assert!(contains_token("payment inv-1 received", "INV-1"));
        assert!(!contains_token("payment inv-10 received", "INV-1"));
        assert!(!contains_token("xinv-1", "INV-1"));
        assert!(contains_token("(inv-1)", "INV-1"));
        assert!(!contains_token("anything", "  "));
    }

    #[test]
    fn longest_invoice_number_wins() {
        let (mut store, short) = store_with_invoice("2024", cents(1_000));
        let long = store
            .add_invoice(
                NewInvoice::new("2024-001", short.client_id, date()).with_total(cents(1_000)),
            )
            .unwrap();

        let matched =
            PaymentReconciler::match_invoice_number(store.book(), "EFT 2024-001 tahsilat", None);
        assert_eq!(matched.map(|invoice| invoice.id), Some(long.id));
        let matched =
            PaymentReconciler::match_invoice_number(store.book(), "EFT 2024 tahsilat", None);
        assert_eq!(matched.map(|invoice| invoice.id), Some(short.id));
    }

    #[test]
    fn client_scoped_match_ignores_longer_numbers_of_other_clients() {
        let (mut store, own) = store_with_invoice("F-1", cents(30_000));
        let currency = store.book().currencies[0].id;
        let other = store.add_client(NewClient::new("Bora", currency)).unwrap();
        store
            .add_invoice(NewInvoice::new("F-1-B", other.id, date()).with_total(cents(9_000)))
            .unwrap();
        let txn = store
            .add_transaction(
                NewTransaction::income(cents(30_000), date())
                    .for_client(own.client_id)
                    .with_description("F-1 and F-1-B"),
            )
            .unwrap();

        let outcome =
            PaymentReconciler::process_payment_from_transaction(&mut store, txn.id).unwrap();
        let applied = outcome.applied().expect("payment applied");
        assert_eq!(applied.invoice.id, own.id);
        assert_eq!(applied.invoice.paid_amount, cents(30_000));
        assert_eq!(applied.invoice.status, InvoiceStatus::Paid);
    }

    #[test]
    fn mark_paid_creates_reconciled_income() {
        let (mut store, invoice) = store_with_invoice("F-1", cents(100_000));
        let outcome =
            PaymentReconciler::mark_invoice_as_paid(&mut store, invoice.id, cents(40_000)).unwrap();
        let applied = outcome.applied().expect("payment applied");

        assert_eq!(applied.applied, cents(40_000));
        assert_eq!(applied.invoice.paid_amount, cents(40_000));
        assert_eq!(applied.invoice.status, InvoiceStatus::Pending);
        assert_eq!(applied.pending_balance.as_ref().unwrap().amount, cents(60_000));
        assert_eq!(applied.transaction.kind, TransactionType::Income);
        assert_eq!(applied.transaction.invoice_id, Some(invoice.id));
        assert_eq!(applied.transaction.client_id, Some(invoice.client_id));
        assert_eq!(applied.transaction.transaction_date, date());
        assert!(applied.transaction.reconciled);
        assert!(applied.transaction.description.contains("F-1"));
    }

    #[test]
    fn rejected_payment_leaves_book_untouched() {
        let (mut store, invoice) = store_with_invoice("F-1", cents(100_000));
        let version = store.version();

        let err = PaymentReconciler::mark_invoice_as_paid(&mut store, invoice.id, Decimal::ZERO)
            .unwrap_err();
        assert!(err.is_validation(), "unexpected error: {err:?}");
        let err = PaymentReconciler::mark_invoice_as_paid(&mut store, Uuid::new_v4(), cents(1))
            .unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err:?}");
        let err = PaymentReconciler::mark_invoice_as_paid_with(
            &mut store,
            invoice.id,
            PaymentRequest::new(cents(1)).into_account(Uuid::new_v4()),
        )
        .unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err:?}");

        assert_eq!(store.version(), version);
        assert!(store.book().transactions.is_empty());
    }

    #[test]
    fn transaction_with_explicit_link_is_applied_once() {
        let (mut store, invoice) = store_with_invoice("F-7", cents(50_000));
        let txn = store
            .add_transaction(
                NewTransaction::income(cents(20_000), date()).paying_invoice(invoice.id),
            )
            .unwrap();

        let first =
            PaymentReconciler::process_payment_from_transaction(&mut store, txn.id).unwrap();
        let applied = first.applied().expect("payment applied");
        assert_eq!(applied.invoice.paid_amount, cents(20_000));
        assert_eq!(applied.transaction.client_id, Some(invoice.client_id));
        assert!(applied.transaction.reconciled);

        let version = store.version();
        let second =
            PaymentReconciler::process_payment_from_transaction(&mut store, txn.id).unwrap();
        assert!(matches!(second, PaymentOutcome::AlreadyReconciled(_)));
        assert_eq!(store.version(), version);
        assert_eq!(store.book().invoice(invoice.id).unwrap().paid_amount, cents(20_000));
    }

    #[test]
    fn description_fallback_links_the_invoice() {
        let (mut store, invoice) = store_with_invoice("F-2024-12", cents(30_000));
        let txn = store
            .add_transaction(
                NewTransaction::income(cents(30_000), date()).with_description("Havale f-2024-12"),
            )
            .unwrap();

        let outcome =
            PaymentReconciler::process_payment_from_transaction(&mut store, txn.id).unwrap();
        let applied = outcome.applied().expect("payment applied");
        assert_eq!(applied.invoice.status, InvoiceStatus::Paid);
        assert_eq!(applied.transaction.invoice_id, Some(invoice.id));
        assert!(!applied.pending_balance.as_ref().unwrap().is_open());
    }

    #[test]
    fn expense_and_unknown_numbers_are_unmatched() {
        let (mut store, _) = store_with_invoice("F-1", cents(30_000));
        let expense = store
            .add_transaction(NewTransaction::expense(cents(100), date()).with_description("F-1"))
            .unwrap();
        let stray = store
            .add_transaction(NewTransaction::income(cents(100), date()).with_description("F-99"))
            .unwrap();
        let version = store.version();

        for id in [expense.id, stray.id] {
            let outcome =
                PaymentReconciler::process_payment_from_transaction(&mut store, id).unwrap();
            assert!(matches!(outcome, PaymentOutcome::Unmatched(_)));
            assert!(outcome.invoice().is_none());
        }
        assert_eq!(store.version(), version);
    }
}
