//! Invoices, their pending balances, and quotes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use defter_domain::{
    items_total, money, EntityKind, Invoice, InvoicePatch, InvoiceStatus, LineItem, NewInvoice,
    NewQuote, PendingBalance, PendingBalancePatch, Quote, QuotePatch, SettlementStatus,
    Timestamped,
};

use super::{
    computed_total, optional_text, positive_amount, required_text, same_text, EntityStore,
};
use crate::{CoreError, CoreResult};

impl EntityStore {
    /// Issues an invoice and opens the pending balance tracking its unpaid amount.
    pub fn add_invoice(&mut self, draft: NewInvoice) -> CoreResult<Invoice> {
        let invoice_number = required_text("Invoice number", &draft.invoice_number)?;
        self.ensure_unique_invoice_number(None, &invoice_number)?;
        self.ensure_client(draft.client_id)?;
        self.ensure_optional_currency(draft.currency_id)?;
        let items = validate_items(draft.items.clone())?;
        let total_amount = computed_total("Invoice total", draft.resolved_total())?;
        validate_dates(draft.issue_date, draft.due_date)?;

        let now = self.now();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            invoice_number,
            client_id: draft.client_id,
            issue_date: draft.issue_date,
            due_date: draft.due_date,
            items,
            total_amount,
            paid_amount: Decimal::ZERO,
            status: InvoiceStatus::Pending,
            currency_id: draft.currency_id,
            notes: optional_text(draft.notes),
            created_at: now,
            updated_at: now,
        };
        let pending = open_pending_for(&invoice, invoice.due_date, now);
        let book = self.book_mut();
        book.invoices.push(invoice.clone());
        book.pending_balances.push(pending);
        self.commit(now);
        debug!(
            id = %invoice.id,
            number = %invoice.invoice_number,
            total = %invoice.total_amount,
            "invoice added"
        );
        Ok(invoice)
    }

    /// Updates an invoice and resynchronizes its pending balance.
    ///
    /// The total may not drop below what has already been paid.
    pub fn update_invoice(&mut self, id: Uuid, patch: InvoicePatch) -> CoreResult<Invoice> {
        let mut updated = self
            .book()
            .invoice(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Invoice, id))?;
        if let Some(number) = patch.invoice_number {
            let number = required_text("Invoice number", &number)?;
            self.ensure_unique_invoice_number(Some(id), &number)?;
            updated.invoice_number = number;
        }
        if let Some(issue_date) = patch.issue_date {
            updated.issue_date = issue_date;
        }
        if let Some(due_date) = patch.due_date {
            updated.due_date = due_date;
        }
        if let Some(currency_id) = patch.currency_id {
            self.ensure_optional_currency(currency_id)?;
            updated.currency_id = currency_id;
        }
        if let Some(notes) = patch.notes {
            updated.notes = optional_text(notes);
        }
        let items_changed = patch.items.is_some();
        if let Some(items) = patch.items {
            updated.items = validate_items(items)?;
        }
        match patch.total_amount {
            Some(total) => updated.total_amount = positive_amount("Invoice total", total)?,
            None if items_changed && !updated.items.is_empty() => {
                updated.total_amount =
                    computed_total("Invoice total", items_total(&updated.items))?
            }
            None => {}
        }
        validate_dates(updated.issue_date, updated.due_date)?;
        if updated.total_amount < updated.paid_amount {
            return Err(CoreError::Constraint(format!(
                "Invoice total {} is below the paid amount {}",
                updated.total_amount, updated.paid_amount
            )));
        }
        updated.status = updated.derived_status();

        let now = self.now();
        updated.touch(now);
        let book = self.book_mut();
        if let Some(slot) = book.invoice_mut(id) {
            *slot = updated.clone();
        }
        if let Some(pending) = book.pending_balance_for_invoice_mut(id) {
            sync_pending(pending, &updated, now);
            pending.due_date = updated.due_date;
        }
        self.commit(now);
        Ok(updated)
    }

    /// Removes an invoice together with its pending balances; transactions
    /// that referenced it keep their amounts but lose the link.
    pub fn delete_invoice(&mut self, id: Uuid) -> CoreResult<()> {
        if self.book().invoice(id).is_none() {
            return Err(CoreError::not_found(EntityKind::Invoice, id));
        }

        let now = self.now();
        let book = self.book_mut();
        book.invoices.retain(|invoice| invoice.id != id);
        book.pending_balances.retain(|pending| pending.invoice_id != id);
        for txn in book
            .transactions
            .iter_mut()
            .filter(|txn| txn.invoice_id == Some(id))
        {
            txn.invoice_id = None;
            txn.touch(now);
        }
        self.commit(now);
        Ok(())
    }

    /// Opens a pending balance for an invoice that has none, e.g. one loaded
    /// from an older snapshot. The amount is the invoice's outstanding total.
    pub fn add_pending_balance(
        &mut self,
        invoice_id: Uuid,
        due_date: Option<NaiveDate>,
    ) -> CoreResult<PendingBalance> {
        let invoice = self
            .book()
            .invoice(invoice_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Invoice, invoice_id))?;
        if self.book().pending_balance_for_invoice(invoice_id).is_some() {
            return Err(CoreError::Constraint(format!(
                "Invoice #{} already has a pending balance",
                invoice.invoice_number
            )));
        }
        if invoice.is_fully_paid() {
            return Err(CoreError::Constraint(format!(
                "Invoice #{} is fully paid",
                invoice.invoice_number
            )));
        }

        let now = self.now();
        let pending = open_pending_for(&invoice, due_date.or(invoice.due_date), now);
        self.book_mut().pending_balances.push(pending.clone());
        self.commit(now);
        Ok(pending)
    }

    pub fn update_pending_balance(
        &mut self,
        id: Uuid,
        patch: PendingBalancePatch,
    ) -> CoreResult<PendingBalance> {
        let mut updated = self
            .book()
            .pending_balance(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::PendingBalance, id))?;
        if let Some(due_date) = patch.due_date {
            updated.due_date = due_date;
        }

        let now = self.now();
        updated.touch(now);
        if let Some(slot) = self
            .book_mut()
            .pending_balances
            .iter_mut()
            .find(|pending| pending.id == id)
        {
            *slot = updated.clone();
        }
        self.commit(now);
        Ok(updated)
    }

    /// Stops tracking an invoice's unpaid amount. The invoice itself is untouched.
    pub fn delete_pending_balance(&mut self, id: Uuid) -> CoreResult<()> {
        if self.book().pending_balance(id).is_none() {
            return Err(CoreError::not_found(EntityKind::PendingBalance, id));
        }
        let now = self.now();
        self.book_mut()
            .pending_balances
            .retain(|pending| pending.id != id);
        self.commit(now);
        Ok(())
    }

    pub fn add_quote(&mut self, draft: NewQuote) -> CoreResult<Quote> {
        let quote_number = required_text("Quote number", &draft.quote_number)?;
        self.ensure_unique_quote_number(None, &quote_number)?;
        self.ensure_client(draft.client_id)?;
        self.ensure_optional_currency(draft.currency_id)?;
        let items = validate_items(draft.items.clone())?;
        let total_amount = computed_total("Quote total", draft.resolved_total())?;
        validate_dates(draft.issue_date, draft.valid_until)?;

        let now = self.now();
        let quote = Quote {
            id: Uuid::new_v4(),
            quote_number,
            client_id: draft.client_id,
            issue_date: draft.issue_date,
            valid_until: draft.valid_until,
            items,
            total_amount,
            status: draft.status,
            currency_id: draft.currency_id,
            notes: optional_text(draft.notes),
            created_at: now,
            updated_at: now,
        };
        self.book_mut().quotes.push(quote.clone());
        self.commit(now);
        Ok(quote)
    }

    pub fn update_quote(&mut self, id: Uuid, patch: QuotePatch) -> CoreResult<Quote> {
        let mut updated = self
            .book()
            .quote(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Quote, id))?;
        if let Some(number) = patch.quote_number {
            let number = required_text("Quote number", &number)?;
            self.ensure_unique_quote_number(Some(id), &number)?;
            updated.quote_number = number;
        }
        if let Some(issue_date) = patch.issue_date {
            updated.issue_date = issue_date;
        }
        if let Some(valid_until) = patch.valid_until {
            updated.valid_until = valid_until;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        if let Some(currency_id) = patch.currency_id {
            self.ensure_optional_currency(currency_id)?;
            updated.currency_id = currency_id;
        }
        if let Some(notes) = patch.notes {
            updated.notes = optional_text(notes);
        }
        let items_changed = patch.items.is_some();
        if let Some(items) = patch.items {
            updated.items = validate_items(items)?;
        }
        match patch.total_amount {
            Some(total) => updated.total_amount = positive_amount("Quote total", total)?,
            None if items_changed && !updated.items.is_empty() => {
                updated.total_amount = computed_total("Quote total", items_total(&updated.items))?
            }
            None => {}
        }
        validate_dates(updated.issue_date, updated.valid_until)?;

        let now = self.now();
        updated.touch(now);
        if let Some(slot) = self.book_mut().quotes.iter_mut().find(|q| q.id == id) {
            *slot = updated.clone();
        }
        self.commit(now);
        Ok(updated)
    }

    pub fn delete_quote(&mut self, id: Uuid) -> CoreResult<()> {
        if self.book().quote(id).is_none() {
            return Err(CoreError::not_found(EntityKind::Quote, id));
        }
        let now = self.now();
        self.book_mut().quotes.retain(|quote| quote.id != id);
        self.commit(now);
        Ok(())
    }

    fn ensure_unique_invoice_number(&self, exclude: Option<Uuid>, number: &str) -> CoreResult<()> {
        let duplicate = self.book().invoices.iter().any(|invoice| {
            same_text(&invoice.invoice_number, number) && exclude != Some(invoice.id)
        });
        if duplicate {
            Err(CoreError::Constraint(format!(
                "Invoice number `{number}` already exists"
            )))
        } else {
            Ok(())
        }
    }

    fn ensure_unique_quote_number(&self, exclude: Option<Uuid>, number: &str) -> CoreResult<()> {
        let duplicate = self
            .book()
            .quotes
            .iter()
            .any(|quote| same_text(&quote.quote_number, number) && exclude != Some(quote.id));
        if duplicate {
            Err(CoreError::Constraint(format!(
                "Quote number `{number}` already exists"
            )))
        } else {
            Ok(())
        }
    }
}

/// Brings a pending balance in line with its invoice's outstanding amount.
pub(crate) fn sync_pending(pending: &mut PendingBalance, invoice: &Invoice, now: DateTime<Utc>) {
    pending.amount = invoice.outstanding();
    pending.status = if pending.amount.is_zero() {
        SettlementStatus::Paid
    } else {
        SettlementStatus::Pending
    };
    pending.touch(now);
}

fn open_pending_for(
    invoice: &Invoice,
    due_date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> PendingBalance {
    PendingBalance {
        id: Uuid::new_v4(),
        invoice_id: invoice.id,
        client_id: invoice.client_id,
        amount: invoice.outstanding(),
        due_date,
        status: SettlementStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

fn validate_items(items: Vec<LineItem>) -> CoreResult<Vec<LineItem>> {
    items
        .into_iter()
        .map(|item| {
            let description = required_text("Line item description", &item.description)?;
            if item.quantity <= Decimal::ZERO {
                return Err(CoreError::Validation(format!(
                    "Quantity of `{description}` must be greater than zero"
                )));
            }
            if item.unit_price < Decimal::ZERO || item.vat_rate < Decimal::ZERO {
                return Err(CoreError::Validation(format!(
                    "Price and VAT of `{description}` cannot be negative"
                )));
            }
            computed_total(&format!("Total of `{description}`"), item.checked_total())?;
            Ok(LineItem {
                description,
                quantity: item.quantity,
                unit_price: money::normalize(item.unit_price),
                vat_rate: item.vat_rate,
            })
        })
        .collect()
}

fn validate_dates(start: NaiveDate, end: Option<NaiveDate>) -> CoreResult<()> {
    match end {
        Some(end) if end < start => Err(CoreError::Validation(
            "Due date cannot precede the issue date".into(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use defter_domain::{money::cents, NewClient, NewCurrency};

    use super::*;
    use crate::FixedClock;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn store() -> (EntityStore, Uuid) {
        let mut store = EntityStore::new("Invoices", Arc::new(FixedClock::on(date(1))));
        let currency = store
            .add_currency(NewCurrency::new("TRY", "₺", "Turkish Lira"))
            .unwrap();
        let client = store
            .add_client(NewClient::new("Deniz A.Ş.", currency.id))
            .unwrap();
        (store, client.id)
    }

    #[test]
    fn add_invoice_opens_matching_pending_balance() {
        let (mut store, client) = store();
        let invoice = store
            .add_invoice(
                NewInvoice::new("F-2024-001", client, date(1))
                    .due_on(date(30))
                    .with_item(LineItem::new("Bakım", Decimal::from(2), cents(25_000))),
            )
            .unwrap();
        assert_eq!(invoice.total_amount, cents(50_000));

        let pending = store.book().pending_balance_for_invoice(invoice.id).unwrap();
        assert_eq!(pending.amount, cents(50_000));
        assert_eq!(pending.client_id, client);
        assert_eq!(pending.due_date, Some(date(30)));
        assert!(pending.is_open());
    }

    #[test]
    fn invoice_numbers_are_unique() {
        let (mut store, client) = store();
        store
            .add_invoice(NewInvoice::new("F-1", client, date(1)).with_total(cents(100)))
            .unwrap();
        let err = store
            .add_invoice(NewInvoice::new("f-1", client, date(1)).with_total(cents(100)))
            .unwrap_err();
        assert!(err.is_constraint(), "unexpected error: {err:?}");
    }

    #[test]
    fn overflowing_line_item_is_a_validation_error() {
        let (mut store, client) = store();
        let huge = Decimal::from(1_000_000_000_000_000_000_i64);
        let draft = NewInvoice::new("F-1", client, date(1)).with_item(LineItem::new("x", huge, huge));
        let err = store.add_invoice(draft).unwrap_err();
        assert!(err.is_validation(), "unexpected error: {err:?}");
        assert!(store.book().invoices.is_empty());
        assert!(store.book().pending_balances.is_empty());
    }

    #[test]
    fn invoice_without_total_or_items_is_invalid() {
        let (mut store, client) = store();
        let err = store
            .add_invoice(NewInvoice::new("F-1", client, date(1)))
            .unwrap_err();
        assert!(err.is_validation(), "unexpected error: {err:?}");
        assert!(store.book().pending_balances.is_empty());
    }

    #[test]
    fn raising_total_resyncs_pending_balance() {
        let (mut store, client) = store();
        let invoice = store
            .add_invoice(NewInvoice::new("F-1", client, date(1)).with_total(cents(100_000)))
            .unwrap();

        let updated = store
            .update_invoice(
                invoice.id,
                InvoicePatch {
                    total_amount: Some(cents(120_000)),
                    ..InvoicePatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, InvoiceStatus::Pending);
        let pending = store.book().pending_balance_for_invoice(invoice.id).unwrap();
        assert_eq!(pending.amount, cents(120_000));
    }

    #[test]
    fn second_pending_balance_is_rejected() {
        let (mut store, client) = store();
        let invoice = store
            .add_invoice(NewInvoice::new("F-1", client, date(1)).with_total(cents(100)))
            .unwrap();
        let err = store.add_pending_balance(invoice.id, None).unwrap_err();
        assert!(err.is_constraint(), "unexpected error: {err:?}");
    }

    #[test]
    fn delete_invoice_removes_pending_balance() {
        let (mut store, client) = store();
        let invoice = store
            .add_invoice(NewInvoice::new("F-1", client, date(1)).with_total(cents(100)))
            .unwrap();
        store.delete_invoice(invoice.id).unwrap();
        assert!(store.book().invoices.is_empty());
        assert!(store.book().pending_balances.is_empty());
    }

    #[test]
    fn quote_total_follows_items() {
        let (mut store, client) = store();
        let quote = store
            .add_quote(
                NewQuote::new("T-1", client, date(1))
                    .with_item(
                        LineItem::new("Kurulum", Decimal::ONE, cents(80_000))
                            .with_vat(Decimal::from(20)),
                    ),
            )
            .unwrap();
        assert_eq!(quote.total_amount, cents(96_000));

        let updated = store
            .update_quote(
                quote.id,
                QuotePatch {
                    items: Some(vec![LineItem::new("Kurulum", Decimal::ONE, cents(50_000))]),
                    ..QuotePatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.total_amount, cents(50_000));
    }
}
