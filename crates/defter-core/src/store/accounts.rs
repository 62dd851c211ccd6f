//! Currencies and cash accounts.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use defter_domain::{
    CashAccount, CashAccountPatch, Currency, CurrencyPatch, EntityKind, NewCashAccount,
    NewCurrency, Timestamped,
};

use super::{bounded_amount, optional_text, required_text, same_text, EntityStore};
use crate::{CoreError, CoreResult};

impl EntityStore {
    pub fn add_currency(&mut self, draft: NewCurrency) -> CoreResult<Currency> {
        let code = required_text("Currency code", &draft.code)?.to_ascii_uppercase();
        let name = required_text("Currency name", &draft.name)?;
        self.ensure_unique_currency_code(None, &code)?;
        let symbol = optional_text(Some(draft.symbol)).unwrap_or_else(|| code.clone());

        let now = self.now();
        let currency = Currency {
            id: Uuid::new_v4(),
            code,
            symbol,
            name,
            created_at: now,
            updated_at: now,
        };
        self.book_mut().currencies.push(currency.clone());
        self.commit(now);
        debug!(id = %currency.id, code = %currency.code, "currency added");
        Ok(currency)
    }

    pub fn update_currency(&mut self, id: Uuid, patch: CurrencyPatch) -> CoreResult<Currency> {
        let mut updated = self
            .book()
            .currency(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Currency, id))?;
        if let Some(code) = patch.code {
            let code = required_text("Currency code", &code)?.to_ascii_uppercase();
            self.ensure_unique_currency_code(Some(id), &code)?;
            updated.code = code;
        }
        if let Some(name) = patch.name {
            updated.name = required_text("Currency name", &name)?;
        }
        if let Some(symbol) = patch.symbol {
            updated.symbol = optional_text(Some(symbol)).unwrap_or_else(|| updated.code.clone());
        }

        let now = self.now();
        updated.touch(now);
        if let Some(slot) = self.book_mut().currencies.iter_mut().find(|c| c.id == id) {
            *slot = updated.clone();
        }
        self.commit(now);
        Ok(updated)
    }

    /// Removes a currency nothing refers to.
    pub fn delete_currency(&mut self, id: Uuid) -> CoreResult<()> {
        self.ensure_currency(id)?;
        let book = self.book();
        let referenced = book.cash_accounts.iter().any(|a| a.currency_id == id)
            || book.clients.iter().any(|c| c.currency_id == id)
            || book.transactions.iter().any(|t| t.currency_id == Some(id))
            || book.debts.iter().any(|d| d.currency_id == Some(id))
            || book.invoices.iter().any(|i| i.currency_id == Some(id))
            || book.regular_payments.iter().any(|p| p.currency_id == Some(id))
            || book.quotes.iter().any(|q| q.currency_id == Some(id));
        if referenced {
            return Err(CoreError::Constraint(
                "Currency is referenced by other records".into(),
            ));
        }

        let now = self.now();
        self.book_mut().currencies.retain(|currency| currency.id != id);
        self.commit(now);
        Ok(())
    }

    pub fn add_cash_account(&mut self, draft: NewCashAccount) -> CoreResult<CashAccount> {
        let name = required_text("Cash account name", &draft.name)?;
        self.ensure_unique_account_name(None, &name)?;
        self.ensure_currency(draft.currency_id)?;

        let now = self.now();
        let account = CashAccount {
            id: Uuid::new_v4(),
            name,
            currency_id: draft.currency_id,
            balance: bounded_amount("Opening balance", draft.balance)?,
            is_default: draft.is_default,
            is_active: draft.is_active,
            description: optional_text(draft.description),
            created_at: now,
            updated_at: now,
        };
        if account.is_default {
            self.clear_default_flags(now);
        }
        self.book_mut().cash_accounts.push(account.clone());
        self.commit(now);
        debug!(id = %account.id, default = account.is_default, "cash account added");
        Ok(account)
    }

    pub fn update_cash_account(
        &mut self,
        id: Uuid,
        patch: CashAccountPatch,
    ) -> CoreResult<CashAccount> {
        let mut updated = self
            .book()
            .cash_account(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::CashAccount, id))?;
        if let Some(name) = patch.name {
            let name = required_text("Cash account name", &name)?;
            self.ensure_unique_account_name(Some(id), &name)?;
            updated.name = name;
        }
        if let Some(currency_id) = patch.currency_id {
            self.ensure_currency(currency_id)?;
            updated.currency_id = currency_id;
        }
        if let Some(balance) = patch.balance {
            updated.balance = bounded_amount("Opening balance", balance)?;
        }
        if let Some(is_active) = patch.is_active {
            updated.is_active = is_active;
        }
        if let Some(description) = patch.description {
            updated.description = optional_text(description);
        }
        if let Some(is_default) = patch.is_default {
            updated.is_default = is_default;
        }

        let now = self.now();
        updated.touch(now);
        if updated.is_default {
            self.clear_default_flags(now);
        }
        if let Some(slot) = self.book_mut().cash_account_mut(id) {
            *slot = updated.clone();
        }
        self.commit(now);
        Ok(updated)
    }

    /// Removes a cash account. The default account and accounts with
    /// transactions are protected.
    pub fn delete_cash_account(&mut self, id: Uuid) -> CoreResult<()> {
        let account = self
            .book()
            .cash_account(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::CashAccount, id))?;
        if account.is_default {
            return Err(CoreError::Constraint(
                "The default cash account cannot be deleted".into(),
            ));
        }
        if self
            .book()
            .transactions
            .iter()
            .any(|txn| txn.cash_account_id == Some(id))
        {
            return Err(CoreError::Constraint(
                "Cash account has linked transactions".into(),
            ));
        }

        let now = self.now();
        self.book_mut().cash_accounts.retain(|account| account.id != id);
        self.commit(now);
        Ok(())
    }

    /// Makes `id` the single default account.
    pub fn set_default_cash_account(&mut self, id: Uuid) -> CoreResult<CashAccount> {
        self.update_cash_account(
            id,
            CashAccountPatch {
                is_default: Some(true),
                ..CashAccountPatch::default()
            },
        )
    }

    fn clear_default_flags(&mut self, now: DateTime<Utc>) {
        for account in self
            .book_mut()
            .cash_accounts
            .iter_mut()
            .filter(|account| account.is_default)
        {
            account.is_default = false;
            account.touch(now);
        }
    }

    fn ensure_unique_currency_code(&self, exclude: Option<Uuid>, code: &str) -> CoreResult<()> {
        let duplicate = self
            .book()
            .currencies
            .iter()
            .any(|currency| same_text(&currency.code, code) && exclude != Some(currency.id));
        if duplicate {
            Err(CoreError::Constraint(format!(
                "Currency `{code}` already exists"
            )))
        } else {
            Ok(())
        }
    }

    fn ensure_unique_account_name(&self, exclude: Option<Uuid>, name: &str) -> CoreResult<()> {
        let duplicate = self
            .book()
            .cash_accounts
            .iter()
            .any(|account| same_text(&account.name, name) && exclude != Some(account.id));
        if duplicate {
            Err(CoreError::Constraint(format!(
                "Cash account `{name}` already exists"
            )))
        } else {
            Ok(())
        }
    }
}
