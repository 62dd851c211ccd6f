use tracing::debug;
use uuid::Uuid;

use defter_domain::{Client, ClientPatch, ContactDetails, EntityKind, NewClient, Timestamped};

use super::{bounded_amount, optional_text, required_text, DeletePolicy, EntityStore};
use crate::{CoreError, CoreResult};

impl EntityStore {
    pub fn add_client(&mut self, draft: NewClient) -> CoreResult<Client> {
        let name = required_text("Client name", &draft.name)?;
        self.ensure_currency(draft.currency_id)?;

        let now = self.now();
        let client = Client {
            id: Uuid::new_v4(),
            name,
            contact: clean_contact(draft.contact),
            currency_id: draft.currency_id,
            balance: bounded_amount("Client balance", draft.balance)?,
            is_active: draft.is_active,
            notes: optional_text(draft.notes),
            created_at: now,
            updated_at: now,
        };
        self.book_mut().clients.push(client.clone());
        self.commit(now);
        debug!(id = %client.id, "client added");
        Ok(client)
    }

    pub fn update_client(&mut self, id: Uuid, patch: ClientPatch) -> CoreResult<Client> {
        let mut updated = self
            .book()
            .client(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Client, id))?;
        if let Some(name) = patch.name {
            updated.name = required_text("Client name", &name)?;
        }
        if let Some(contact) = patch.contact {
            updated.contact = clean_contact(contact);
        }
        if let Some(currency_id) = patch.currency_id {
            self.ensure_currency(currency_id)?;
            updated.currency_id = currency_id;
        }
        if let Some(balance) = patch.balance {
            updated.balance = bounded_amount("Client balance", balance)?;
        }
        if let Some(is_active) = patch.is_active {
            updated.is_active = is_active;
        }
        if let Some(notes) = patch.notes {
            updated.notes = optional_text(notes);
        }

        let now = self.now();
        updated.touch(now);
        if let Some(slot) = self.book_mut().clients.iter_mut().find(|c| c.id == id) {
            *slot = updated.clone();
        }
        self.commit(now);
        Ok(updated)
    }

    /// Removes a client.
    ///
    /// Under [`DeletePolicy::Restrict`] any invoice, pending balance, quote,
    /// debt, or transaction pointing at the client blocks the delete. Under
    /// [`DeletePolicy::Cascade`] the client's invoices, pending balances,
    /// quotes, and debts are removed and its transactions are detached.
    pub fn delete_client(&mut self, id: Uuid, policy: DeletePolicy) -> CoreResult<()> {
        self.ensure_client(id)?;
        let book = self.book();
        let open_pending = book
            .pending_balances
            .iter()
            .filter(|pending| pending.client_id == id && pending.is_open())
            .count();
        let referenced = open_pending > 0
            || book.invoices.iter().any(|invoice| invoice.client_id == id)
            || book.pending_balances.iter().any(|p| p.client_id == id)
            || book.quotes.iter().any(|quote| quote.client_id == id)
            || book.debts.iter().any(|debt| debt.client_id == Some(id))
            || book.transactions.iter().any(|txn| txn.client_id == Some(id));

        if referenced && policy == DeletePolicy::Restrict {
            return Err(CoreError::Constraint(if open_pending > 0 {
                format!("Client has {open_pending} open pending balance(s)")
            } else {
                "Client is referenced by other records".into()
            }));
        }

        let now = self.now();
        let book = self.book_mut();
        let removed_invoices: Vec<Uuid> = book
            .invoices
            .iter()
            .filter(|invoice| invoice.client_id == id)
            .map(|invoice| invoice.id)
            .collect();
        book.invoices.retain(|invoice| invoice.client_id != id);
        book.pending_balances.retain(|pending| pending.client_id != id);
        book.quotes.retain(|quote| quote.client_id != id);
        book.debts.retain(|debt| debt.client_id != Some(id));
        for txn in book.transactions.iter_mut() {
            let owns_client = txn.client_id == Some(id);
            let pays_removed = txn
                .invoice_id
                .map_or(false, |invoice| removed_invoices.contains(&invoice));
            if owns_client {
                txn.client_id = None;
            }
            if pays_removed {
                txn.invoice_id = None;
            }
            if owns_client || pays_removed {
                txn.touch(now);
            }
        }
        book.clients.retain(|client| client.id != id);
        self.commit(now);
        debug!(id = %id, ?policy, invoices = removed_invoices.len(), "client deleted");
        Ok(())
    }
}

fn clean_contact(contact: ContactDetails) -> ContactDetails {
    ContactDetails {
        email: optional_text(contact.email),
        phone: optional_text(contact.phone),
        address: optional_text(contact.address),
        tax_number: optional_text(contact.tax_number),
        tax_office: optional_text(contact.tax_office),
    }
}
