//! Debts and regular payments.

use tracing::debug;
use uuid::Uuid;

use defter_domain::{
    Debt, DebtPatch, Displayable, EntityKind, NewDebt, NewRegularPayment, RegularPayment,
    RegularPaymentPatch, SettlementStatus, Timestamped,
};

use super::{optional_text, positive_amount, required_text, EntityStore};
use crate::{CoreError, CoreResult};

impl EntityStore {
    pub fn add_debt(&mut self, draft: NewDebt) -> CoreResult<Debt> {
        let title = required_text("Debt title", &draft.title)?;
        let amount = positive_amount("Debt amount", draft.amount)?;
        self.ensure_optional_client(draft.client_id)?;
        self.ensure_optional_currency(draft.currency_id)?;

        let now = self.now();
        let debt = Debt {
            id: Uuid::new_v4(),
            title,
            amount,
            kind: draft.kind,
            status: draft.status,
            due_date: draft.due_date,
            client_id: draft.client_id,
            currency_id: draft.currency_id,
            description: optional_text(draft.description),
            created_at: now,
            updated_at: now,
        };
        self.book_mut().debts.push(debt.clone());
        self.commit(now);
        debug!(id = %debt.id, kind = %debt.kind, due = %debt.due_date, "debt added");
        Ok(debt)
    }

    pub fn update_debt(&mut self, id: Uuid, patch: DebtPatch) -> CoreResult<Debt> {
        let mut updated = self
            .book()
            .debt(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Debt, id))?;
        if let Some(title) = patch.title {
            updated.title = required_text("Debt title", &title)?;
        }
        if let Some(amount) = patch.amount {
            updated.amount = positive_amount("Debt amount", amount)?;
        }
        if let Some(kind) = patch.kind {
            updated.kind = kind;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        if let Some(due_date) = patch.due_date {
            updated.due_date = due_date;
        }
        if let Some(client_id) = patch.client_id {
            self.ensure_optional_client(client_id)?;
            updated.client_id = client_id;
        }
        if let Some(currency_id) = patch.currency_id {
            self.ensure_optional_currency(currency_id)?;
            updated.currency_id = currency_id;
        }
        if let Some(description) = patch.description {
            updated.description = optional_text(description);
        }

        let now = self.now();
        updated.touch(now);
        if let Some(slot) = self.book_mut().debt_mut(id) {
            *slot = updated.clone();
        }
        self.commit(now);
        Ok(updated)
    }

    pub fn delete_debt(&mut self, id: Uuid) -> CoreResult<()> {
        if self.book().debt(id).is_none() {
            return Err(CoreError::not_found(EntityKind::Debt, id));
        }
        let now = self.now();
        self.book_mut().debts.retain(|debt| debt.id != id);
        self.commit(now);
        Ok(())
    }

    /// Sets a debt's stored status. Setting the status it already has
    /// leaves the book untouched.
    pub fn set_debt_status(&mut self, id: Uuid, status: SettlementStatus) -> CoreResult<Debt> {
        let now = self.now();
        let debt = self
            .book_mut()
            .debt_mut(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Debt, id))?;
        if debt.status == status {
            return Ok(debt.clone());
        }
        debt.status = status;
        debt.touch(now);
        let debt = debt.clone();
        self.commit(now);
        debug!(id = %id, debt = %debt.display_label(), "debt status changed");
        Ok(debt)
    }

    pub fn add_regular_payment(&mut self, draft: NewRegularPayment) -> CoreResult<RegularPayment> {
        let title = required_text("Regular payment title", &draft.title)?;
        let amount = positive_amount("Regular payment amount", draft.amount)?;
        self.ensure_optional_currency(draft.currency_id)?;

        let now = self.now();
        let payment = RegularPayment {
            id: Uuid::new_v4(),
            title,
            amount,
            frequency: draft.frequency,
            category: optional_text(draft.category),
            due_date: draft.due_date,
            status: draft.status,
            currency_id: draft.currency_id,
            description: optional_text(draft.description),
            created_at: now,
            updated_at: now,
        };
        self.book_mut().regular_payments.push(payment.clone());
        self.commit(now);
        debug!(id = %payment.id, frequency = %payment.frequency, "regular payment added");
        Ok(payment)
    }

    pub fn update_regular_payment(
        &mut self,
        id: Uuid,
        patch: RegularPaymentPatch,
    ) -> CoreResult<RegularPayment> {
        let mut updated = self
            .book()
            .regular_payment(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::RegularPayment, id))?;
        if let Some(title) = patch.title {
            updated.title = required_text("Regular payment title", &title)?;
        }
        if let Some(amount) = patch.amount {
            updated.amount = positive_amount("Regular payment amount", amount)?;
        }
        if let Some(frequency) = patch.frequency {
            updated.frequency = frequency;
        }
        if let Some(category) = patch.category {
            updated.category = optional_text(category);
        }
        if let Some(due_date) = patch.due_date {
            updated.due_date = due_date;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        if let Some(currency_id) = patch.currency_id {
            self.ensure_optional_currency(currency_id)?;
            updated.currency_id = currency_id;
        }
        if let Some(description) = patch.description {
            updated.description = optional_text(description);
        }

        let now = self.now();
        updated.touch(now);
        if let Some(slot) = self.book_mut().regular_payment_mut(id) {
            *slot = updated.clone();
        }
        self.commit(now);
        Ok(updated)
    }

    pub fn delete_regular_payment(&mut self, id: Uuid) -> CoreResult<()> {
        if self.book().regular_payment(id).is_none() {
            return Err(CoreError::not_found(EntityKind::RegularPayment, id));
        }
        let now = self.now();
        self.book_mut()
            .regular_payments
            .retain(|payment| payment.id != id);
        self.commit(now);
        Ok(())
    }

    /// Sets a regular payment's stored status. The due date is left alone.
    pub fn set_regular_payment_status(
        &mut self,
        id: Uuid,
        status: SettlementStatus,
    ) -> CoreResult<RegularPayment> {
        let now = self.now();
        let payment = self
            .book_mut()
            .regular_payment_mut(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::RegularPayment, id))?;
        if payment.status == status {
            return Ok(payment.clone());
        }
        payment.status = status;
        payment.touch(now);
        let payment = payment.clone();
        self.commit(now);
        debug!(id = %id, payment = %payment.display_label(), "regular payment status changed");
        Ok(payment)
    }
}
