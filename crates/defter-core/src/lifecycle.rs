//! Pending / overdue / paid states for debts and regular payments.
//!
//! Only `pending` and `paid` are stored. `overdue` is derived from the due
//! date whenever it is asked for, so it never goes stale.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use defter_domain::{
    money, Book, Debt, DebtType, EntityKind, RegularPayment, SettlementStatus,
};

use crate::{CoreError, CoreResult, EntityStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Pending,
    Overdue,
    Paid,
}

impl LifecycleState {
    pub fn derive(status: SettlementStatus, due_date: NaiveDate, today: NaiveDate) -> Self {
        match status {
            SettlementStatus::Paid => LifecycleState::Paid,
            SettlementStatus::Pending if due_date < today => LifecycleState::Overdue,
            SettlementStatus::Pending => LifecycleState::Pending,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleState::Pending => "Pending",
            LifecycleState::Overdue => "Overdue",
            LifecycleState::Paid => "Paid",
        };
        f.write_str(label)
    }
}

/// Open debt totals for dashboards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebtSummary {
    /// Pending amounts the business owes.
    pub payable: Decimal,
    /// Pending amounts owed to the business.
    pub receivable: Decimal,
    pub overdue_count: usize,
    pub overdue_amount: Decimal,
}

impl DebtSummary {
    /// Receivables minus payables.
    pub fn net(&self) -> Decimal {
        self.receivable.saturating_sub(self.payable)
    }
}

pub struct DebtLifecycleTracker;

impl DebtLifecycleTracker {
    /// Pending and due strictly before `today`. A debt due today is not overdue.
    pub fn is_overdue(status: SettlementStatus, due_date: NaiveDate, today: NaiveDate) -> bool {
        status.is_pending() && due_date < today
    }

    pub fn debt_state(debt: &Debt, today: NaiveDate) -> LifecycleState {
        LifecycleState::derive(debt.status, debt.due_date, today)
    }

    pub fn regular_payment_state(payment: &RegularPayment, today: NaiveDate) -> LifecycleState {
        LifecycleState::derive(payment.status, payment.due_date, today)
    }

    pub fn mark_debt_paid(store: &mut EntityStore, id: Uuid) -> CoreResult<Debt> {
        store.set_debt_status(id, SettlementStatus::Paid)
    }

    pub fn mark_debt_pending(store: &mut EntityStore, id: Uuid) -> CoreResult<Debt> {
        store.set_debt_status(id, SettlementStatus::Pending)
    }

    pub fn mark_regular_payment_paid(
        store: &mut EntityStore,
        id: Uuid,
    ) -> CoreResult<RegularPayment> {
        store.set_regular_payment_status(id, SettlementStatus::Paid)
    }

    pub fn mark_regular_payment_pending(
        store: &mut EntityStore,
        id: Uuid,
    ) -> CoreResult<RegularPayment> {
        store.set_regular_payment_status(id, SettlementStatus::Pending)
    }

    /// Current state of a stored debt.
    pub fn debt_state_by_id(book: &Book, id: Uuid, today: NaiveDate) -> CoreResult<LifecycleState> {
        book.debt(id)
            .map(|debt| Self::debt_state(debt, today))
            .ok_or_else(|| CoreError::not_found(EntityKind::Debt, id))
    }

    /// Pending debts that are past due, oldest first.
    pub fn overdue_debts(book: &Book, today: NaiveDate) -> Vec<Debt> {
        let mut overdue: Vec<Debt> = book
            .debts
            .iter()
            .filter(|debt| Self::is_overdue(debt.status, debt.due_date, today))
            .cloned()
            .collect();
        overdue.sort_by_key(|debt| debt.due_date);
        overdue
    }

    pub fn debt_summary(book: &Book, today: NaiveDate) -> DebtSummary {
        let mut summary = DebtSummary::default();
        for debt in book.debts.iter().filter(|debt| debt.status.is_pending()) {
            match debt.kind {
                DebtType::Payable => {
                    summary.payable = summary.payable.saturating_add(debt.amount)
                }
                DebtType::Receivable => {
                    summary.receivable = summary.receivable.saturating_add(debt.amount)
                }
            }
            if Self::is_overdue(debt.status, debt.due_date, today) {
                summary.overdue_count += 1;
                summary.overdue_amount = summary.overdue_amount.saturating_add(debt.amount);
            }
        }
        summary.payable = money::normalize(summary.payable);
        summary.receivable = money::normalize(summary.receivable);
        summary.overdue_amount = money::normalize(summary.overdue_amount);
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use defter_domain::{money::cents, NewDebt};

    use super::*;
    use crate::FixedClock;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[test]
    fn due_today_is_not_overdue() {
        let today = date(10);
        assert!(!DebtLifecycleTracker::is_overdue(
            SettlementStatus::Pending,
            today,
            today
        ));
        assert!(DebtLifecycleTracker::is_overdue(
            SettlementStatus::Pending,
            date(9),
            today
        ));
        assert!(!DebtLifecycleTracker::is_overdue(
            SettlementStatus::Paid,
            date(1),
            today
        ));
    }

    #[test]
    fn paying_an_overdue_debt_clears_the_state() {
        let today = date(10);
        let mut store = EntityStore::new("Debts", Arc::new(FixedClock::on(today)));
        let debt = store
            .add_debt(NewDebt::new("Supplier", DebtType::Payable, cents(75_000), date(3)))
            .unwrap();
        assert_eq!(
            DebtLifecycleTracker::debt_state(&debt, today),
            LifecycleState::Overdue
        );

        let paid = DebtLifecycleTracker::mark_debt_paid(&mut store, debt.id).unwrap();
        assert_eq!(
            DebtLifecycleTracker::debt_state(&paid, today),
            LifecycleState::Paid
        );
        let reopened = DebtLifecycleTracker::mark_debt_pending(&mut store, debt.id).unwrap();
        assert_eq!(
            DebtLifecycleTracker::debt_state_by_id(store.book(), reopened.id, today).unwrap(),
            LifecycleState::Overdue
        );
    }

    #[test]
    fn summary_splits_by_direction() {
        let today = date(10);
        let mut store = EntityStore::new("Debts", Arc::new(FixedClock::on(today)));
        store
            .add_debt(NewDebt::new("Rent", DebtType::Payable, cents(10_000), date(1)))
            .unwrap();
        store
            .add_debt(NewDebt::new("Loan out", DebtType::Receivable, cents(4_000), date(20)))
            .unwrap();
        let settled = store
            .add_debt(NewDebt::new("Old", DebtType::Payable, cents(99_900), date(1)))
            .unwrap();
        DebtLifecycleTracker::mark_debt_paid(&mut store, settled.id).unwrap();

        let summary = DebtLifecycleTracker::debt_summary(store.book(), today);
        assert_eq!(summary.payable, cents(10_000));
        assert_eq!(summary.receivable, cents(4_000));
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.overdue_amount, cents(10_000));
        assert_eq!(summary.net(), cents(-6_000));
        assert_eq!(
            DebtLifecycleTracker::overdue_debts(store.book(), today).len(),
            1
        );
    }
}
