//! The entity store: sole owner of the book's records and the only write path
//! besides payment reconciliation.
//!
//! Every mutating operation validates its input against the current snapshot
//! before touching anything, so a failed call leaves the book unchanged and a
//! successful one is observed as a whole.

mod accounts;
mod clients;
mod invoices;
mod obligations;
mod transactions;

pub(crate) use invoices::sync_pending;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use defter_domain::{money, Book, EntityKind};

use crate::{Clock, CoreError, CoreResult};

/// How a delete treats records that still reference the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Refuse with a constraint error while references exist.
    #[default]
    Restrict,
    /// Remove dependent records and detach loose references.
    Cascade,
}

/// Owns the canonical [`Book`] and funnels all mutation through typed operations.
pub struct EntityStore {
    book: Book,
    clock: Arc<dyn Clock>,
}

impl EntityStore {
    /// Starts an empty book.
    pub fn new(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        let book = Book::new(name, clock.now());
        Self { book, clock }
    }

    /// Wraps a snapshot loaded from persistence.
    pub fn from_book(book: Book, clock: Arc<dyn Clock>) -> Self {
        Self { book, clock }
    }

    /// Read-only view of the current snapshot.
    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn into_book(self) -> Book {
        self.book
    }

    /// Snapshot version; changes after every successful mutation.
    pub fn version(&self) -> u64 {
        self.book.version
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn book_mut(&mut self) -> &mut Book {
        &mut self.book
    }

    /// Marks the snapshot as changed at `now`.
    pub(crate) fn commit(&mut self, now: DateTime<Utc>) {
        self.book.touch(now);
    }

    fn ensure_currency(&self, id: Uuid) -> CoreResult<()> {
        self.book
            .currency(id)
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found(EntityKind::Currency, id))
    }

    fn ensure_optional_currency(&self, id: Option<Uuid>) -> CoreResult<()> {
        id.map_or(Ok(()), |id| self.ensure_currency(id))
    }

    fn ensure_client(&self, id: Uuid) -> CoreResult<()> {
        self.book
            .client(id)
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found(EntityKind::Client, id))
    }

    fn ensure_optional_client(&self, id: Option<Uuid>) -> CoreResult<()> {
        id.map_or(Ok(()), |id| self.ensure_client(id))
    }

    fn ensure_cash_account(&self, id: Uuid) -> CoreResult<()> {
        self.book
            .cash_account(id)
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found(EntityKind::CashAccount, id))
    }
}

/// Trims a required text field, rejecting blanks.
pub(crate) fn required_text(field: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(CoreError::Validation(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trims optional text, folding blanks into `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Normalizes an amount whose magnitude must stay within [`money::max_amount`].
pub(crate) fn bounded_amount(field: &str, amount: Decimal) -> CoreResult<Decimal> {
    let amount = money::normalize(amount);
    if amount.abs() > money::max_amount() {
        Err(CoreError::Validation(format!(
            "{field} exceeds the largest supported amount"
        )))
    } else {
        Ok(amount)
    }
}

/// Normalizes an amount that must be strictly positive.
pub(crate) fn positive_amount(field: &str, amount: Decimal) -> CoreResult<Decimal> {
    let amount = bounded_amount(field, amount)?;
    if amount <= Decimal::ZERO {
        Err(CoreError::Validation(format!(
            "{field} must be greater than zero"
        )))
    } else {
        Ok(amount)
    }
}

/// Normalizes an amount that may be zero but never negative.
pub(crate) fn non_negative(field: &str, amount: Decimal) -> CoreResult<Decimal> {
    if amount < Decimal::ZERO {
        Err(CoreError::Validation(format!("{field} cannot be negative")))
    } else {
        bounded_amount(field, amount)
    }
}

/// A total computed from line items; `None` means the arithmetic overflowed.
pub(crate) fn computed_total(field: &str, total: Option<Decimal>) -> CoreResult<Decimal> {
    let total = total.ok_or_else(|| {
        CoreError::Validation(format!("{field} exceeds the largest supported amount"))
    })?;
    positive_amount(field, total)
}

pub(crate) fn same_text(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}
