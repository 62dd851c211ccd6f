use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use defter_domain::{
    money, EntityKind, NewTransaction, Timestamped, Transaction, TransactionPatch,
};

use super::{non_negative, optional_text, positive_amount, EntityStore};
use crate::{CoreError, CoreResult};

impl EntityStore {
    /// Records a transaction. A referenced invoice is only linked here; apply
    /// it with `PaymentReconciler::process_payment_from_transaction`.
    pub fn add_transaction(&mut self, draft: NewTransaction) -> CoreResult<Transaction> {
        let amount = positive_amount("Transaction amount", draft.amount)?;
        self.ensure_optional_client(draft.client_id)?;
        if let Some(account_id) = draft.cash_account_id {
            self.ensure_cash_account(account_id)?;
        }
        self.ensure_optional_currency(draft.currency_id)?;
        if let Some(invoice_id) = draft.invoice_id {
            self.ensure_invoice_matches_client(invoice_id, draft.client_id)?;
        }
        let vat_rate = optional_non_negative("VAT rate", draft.vat_rate)?;
        let vat_amount = optional_non_negative("VAT amount", draft.vat_amount)?;

        let now = self.now();
        let transaction = Transaction {
            id: Uuid::new_v4(),
            kind: draft.kind,
            amount,
            client_id: draft.client_id,
            cash_account_id: draft.cash_account_id,
            invoice_id: draft.invoice_id,
            currency_id: draft.currency_id,
            category: optional_text(draft.category),
            description: draft.description.trim().to_string(),
            transaction_date: draft.transaction_date,
            vat_rate,
            vat_amount,
            reconciled: false,
            created_at: now,
            updated_at: now,
        };
        self.book_mut().transactions.push(transaction.clone());
        self.commit(now);
        debug!(
            id = %transaction.id,
            kind = %transaction.kind,
            amount = %transaction.amount,
            "transaction added"
        );
        Ok(transaction)
    }

    /// Updates a transaction. Once reconciled against an invoice its kind and
    /// amount are frozen, since the invoice's paid amount depends on them.
    pub fn update_transaction(
        &mut self,
        id: Uuid,
        patch: TransactionPatch,
    ) -> CoreResult<Transaction> {
        let mut updated = self
            .book()
            .transaction(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Transaction, id))?;

        let money_changes = patch.kind.map_or(false, |kind| kind != updated.kind)
            || patch
                .amount
                .map_or(false, |amount| money::normalize(amount) != updated.amount);
        if updated.reconciled && money_changes {
            return Err(CoreError::Constraint(
                "A reconciled transaction's type and amount cannot change".into(),
            ));
        }

        if let Some(kind) = patch.kind {
            updated.kind = kind;
        }
        if let Some(amount) = patch.amount {
            updated.amount = positive_amount("Transaction amount", amount)?;
        }
        if let Some(client_id) = patch.client_id {
            self.ensure_optional_client(client_id)?;
            updated.client_id = client_id;
        }
        if let Some(account_id) = patch.cash_account_id {
            if let Some(account_id) = account_id {
                self.ensure_cash_account(account_id)?;
            }
            updated.cash_account_id = account_id;
        }
        if let Some(currency_id) = patch.currency_id {
            self.ensure_optional_currency(currency_id)?;
            updated.currency_id = currency_id;
        }
        if let Some(category) = patch.category {
            updated.category = optional_text(category);
        }
        if let Some(description) = patch.description {
            updated.description = description.trim().to_string();
        }
        if let Some(date) = patch.transaction_date {
            updated.transaction_date = date;
        }
        if let Some(vat_rate) = patch.vat_rate {
            updated.vat_rate = optional_non_negative("VAT rate", vat_rate)?;
        }
        if let Some(vat_amount) = patch.vat_amount {
            updated.vat_amount = optional_non_negative("VAT amount", vat_amount)?;
        }
        if let Some(invoice_id) = updated.invoice_id {
            self.ensure_invoice_matches_client(invoice_id, updated.client_id)?;
        }

        let now = self.now();
        updated.touch(now);
        if let Some(slot) = self.book_mut().transaction_mut(id) {
            *slot = updated.clone();
        }
        self.commit(now);
        Ok(updated)
    }

    /// Removes a transaction unless it settled an invoice that still exists.
    pub fn delete_transaction(&mut self, id: Uuid) -> CoreResult<()> {
        let txn = self
            .book()
            .transaction(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Transaction, id))?;
        let settles_invoice = txn.reconciled
            && txn
                .invoice_id
                .map_or(false, |invoice| self.book().invoice(invoice).is_some());
        if settles_invoice {
            return Err(CoreError::Constraint(
                "Transaction settles an invoice; delete the invoice first".into(),
            ));
        }

        let now = self.now();
        self.book_mut().transactions.retain(|txn| txn.id != id);
        self.commit(now);
        Ok(())
    }

    fn ensure_invoice_matches_client(
        &self,
        invoice_id: Uuid,
        client_id: Option<Uuid>,
    ) -> CoreResult<()> {
        let invoice = self
            .book()
            .invoice(invoice_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Invoice, invoice_id))?;
        match client_id {
            Some(client_id) if client_id != invoice.client_id => Err(CoreError::Validation(
                format!(
                    "Invoice #{} belongs to another client",
                    invoice.invoice_number
                ),
            )),
            _ => Ok(()),
        }
    }
}

fn optional_non_negative(field: &str, value: Option<Decimal>) -> CoreResult<Option<Decimal>> {
    value.map(|value| non_negative(field, value)).transpose()
}
