//! Read-only overview of a book, shaped for presentation layers.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use defter_core::{
    BalanceCalculator, DebtLifecycleTracker, RegularPaymentScheduler, ScheduleGroup,
};
use defter_domain::Book;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub book: String,
    pub as_of: NaiveDate,
    /// Active cash account totals keyed by currency code.
    pub cash_by_currency: BTreeMap<String, Decimal>,
    pub receivables: Decimal,
    pub open_invoices: usize,
    pub debts_payable: Decimal,
    pub debts_receivable: Decimal,
    pub overdue_debts: usize,
    pub overdue_debt_amount: Decimal,
    pub overdue_regular_payments: usize,
    pub due_soon_regular_payments: usize,
    pub monthly_commitment: Decimal,
}

impl Dashboard {
    pub fn build(book: &Book, today: NaiveDate, due_soon_days: u32) -> Self {
        let cash_by_currency = BalanceCalculator::cash_totals_by_currency(book)
            .into_iter()
            .map(|(currency_id, total)| {
                let code = book
                    .currency(currency_id)
                    .map(|currency| currency.code.clone())
                    .unwrap_or_else(|| currency_id.to_string());
                (code, total)
            })
            .collect();
        let debts = DebtLifecycleTracker::debt_summary(book, today);
        let schedule = RegularPaymentScheduler::group_by_schedule(book, today, due_soon_days);
        let bucket = |group: ScheduleGroup| schedule.get(&group).map_or(0, Vec::len);

        Self {
            book: book.name.clone(),
            as_of: today,
            cash_by_currency,
            receivables: BalanceCalculator::receivables_total(book),
            open_invoices: book
                .invoices
                .iter()
                .filter(|invoice| !invoice.is_fully_paid())
                .count(),
            debts_payable: debts.payable,
            debts_receivable: debts.receivable,
            overdue_debts: debts.overdue_count,
            overdue_debt_amount: debts.overdue_amount,
            overdue_regular_payments: bucket(ScheduleGroup::Overdue),
            due_soon_regular_payments: bucket(ScheduleGroup::DueSoon),
            monthly_commitment: RegularPaymentScheduler::monthly_commitment(book),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
