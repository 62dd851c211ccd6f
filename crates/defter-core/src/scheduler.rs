//! Display grouping for regular payments. Each occurrence is a stored record
//! managed by the caller; nothing here creates the next one.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use defter_domain::{money, Book, Frequency, RegularPayment};

/// Days ahead of today that still count as "due soon".
pub const DEFAULT_DUE_SOON_DAYS: u32 = 7;

/// Where a regular payment sits relative to today. Ordered by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScheduleGroup {
    Overdue,
    DueSoon,
    Scheduled,
    Paid,
}

impl fmt::Display for ScheduleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScheduleGroup::Overdue => "Overdue",
            ScheduleGroup::DueSoon => "Due soon",
            ScheduleGroup::Scheduled => "Scheduled",
            ScheduleGroup::Paid => "Paid",
        };
        f.write_str(label)
    }
}

pub struct RegularPaymentScheduler;

impl RegularPaymentScheduler {
    pub fn classify(
        payment: &RegularPayment,
        today: NaiveDate,
        due_soon_days: u32,
    ) -> ScheduleGroup {
        if payment.status.is_paid() {
            return ScheduleGroup::Paid;
        }
        let horizon = today
            .checked_add_days(Days::new(u64::from(due_soon_days)))
            .unwrap_or(NaiveDate::MAX);
        if payment.due_date < today {
            ScheduleGroup::Overdue
        } else if payment.due_date <= horizon {
            ScheduleGroup::DueSoon
        } else {
            ScheduleGroup::Scheduled
        }
    }

    /// Payments bucketed by [`ScheduleGroup`], each bucket sorted by due date.
    /// Empty buckets are omitted.
    pub fn group_by_schedule(
        book: &Book,
        today: NaiveDate,
        due_soon_days: u32,
    ) -> BTreeMap<ScheduleGroup, Vec<RegularPayment>> {
        let mut groups: BTreeMap<ScheduleGroup, Vec<RegularPayment>> = BTreeMap::new();
        for payment in &book.regular_payments {
            groups
                .entry(Self::classify(payment, today, due_soon_days))
                .or_default()
                .push(payment.clone());
        }
        for payments in groups.values_mut() {
            payments.sort_by_key(|payment| payment.due_date);
        }
        groups
    }

    /// Payments bucketed by frequency, each bucket sorted by due date.
    pub fn group_by_frequency(book: &Book) -> BTreeMap<Frequency, Vec<RegularPayment>> {
        let mut groups: BTreeMap<Frequency, Vec<RegularPayment>> = BTreeMap::new();
        for payment in &book.regular_payments {
            groups
                .entry(payment.frequency)
                .or_default()
                .push(payment.clone());
        }
        for payments in groups.values_mut() {
            payments.sort_by_key(|payment| payment.due_date);
        }
        groups
    }

    /// The due date one period after the stored one. For display; never written back.
    pub fn next_due_date(payment: &RegularPayment) -> NaiveDate {
        payment.frequency.interval().next_date(payment.due_date)
    }

    /// Pending payments normalised to a monthly figure.
    pub fn monthly_commitment(book: &Book) -> Decimal {
        money::normalize(money::sum(
            book.regular_payments
                .iter()
                .filter(|payment| payment.status.is_pending())
                .map(|payment| monthly_share(payment.amount, payment.frequency)),
        ))
    }
}

fn monthly_share(amount: Decimal, frequency: Frequency) -> Decimal {
    match frequency {
        Frequency::Weekly => amount.saturating_mul(Decimal::from(52)) / Decimal::from(12),
        Frequency::Monthly => amount,
        Frequency::Quarterly => amount / Decimal::from(3),
        Frequency::Yearly => amount / Decimal::from(12),
    }
}
