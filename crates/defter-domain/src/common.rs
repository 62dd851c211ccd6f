//! Shared traits, settlement states, and calendar arithmetic for bookkeeping records.

use std::fmt;

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exposes a stable identifier for records stored in the book.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Converts a record into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Creation and modification timestamps carried by every record.
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
    fn touch(&mut self, now: DateTime<Utc>);
}

/// Implements the identity and timestamp traits for a record with the standard fields.
#[macro_export]
macro_rules! impl_record {
    ($ty:ty) => {
        impl $crate::common::Identifiable for $ty {
            fn id(&self) -> ::uuid::Uuid {
                self.id
            }
        }

        impl $crate::common::Timestamped for $ty {
            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.updated_at
            }

            fn touch(&mut self, now: ::chrono::DateTime<::chrono::Utc>) {
                self.updated_at = now;
            }
        }
    };
}

/// Names each record collection; used in lookups and error reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Currency,
    CashAccount,
    Client,
    Transaction,
    Debt,
    Invoice,
    PendingBalance,
    RegularPayment,
    Quote,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Currency => "Currency",
            EntityKind::CashAccount => "Cash account",
            EntityKind::Client => "Client",
            EntityKind::Transaction => "Transaction",
            EntityKind::Debt => "Debt",
            EntityKind::Invoice => "Invoice",
            EntityKind::PendingBalance => "Pending balance",
            EntityKind::RegularPayment => "Regular payment",
            EntityKind::Quote => "Quote",
        };
        f.write_str(label)
    }
}

/// Stored settlement flag shared by debts, pending balances, and regular payments.
///
/// `overdue` is not stored; it is derived from the due date at read time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    #[default]
    Pending,
    Paid,
}

impl SettlementStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, SettlementStatus::Pending)
    }

    pub fn is_paid(self) -> bool {
        matches!(self, SettlementStatus::Paid)
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SettlementStatus::Pending => "Pending",
            SettlementStatus::Paid => "Paid",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Enumerates time units used by `TimeInterval`.
pub enum TimeUnit {
    Day,
    Week,
    Month,
    Year,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimeUnit::Day => "Day",
            TimeUnit::Week => "Week",
            TimeUnit::Month => "Month",
            TimeUnit::Year => "Year",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Represents a time unit and multiplier for due-date arithmetic.
pub struct TimeInterval {
    pub every: u32,
    pub unit: TimeUnit,
}

impl TimeInterval {
    /// Calculates the next date after `from` according to the interval.
    /// Month and year steps clamp to the last day of a shorter month; dates
    /// past the calendar's end saturate at [`NaiveDate::MAX`].
    pub fn next_date(&self, from: NaiveDate) -> NaiveDate {
        let every = u64::from(self.every);
        let next = match self.unit {
            TimeUnit::Day => from.checked_add_days(Days::new(every)),
            TimeUnit::Week => every
                .checked_mul(7)
                .and_then(|days| from.checked_add_days(Days::new(days))),
            TimeUnit::Month => from.checked_add_months(Months::new(self.every)),
            TimeUnit::Year => self
                .every
                .checked_mul(12)
                .and_then(|months| from.checked_add_months(Months::new(months))),
        };
        next.unwrap_or(NaiveDate::MAX)
    }

    pub fn label(&self) -> String {
        match (self.every, &self.unit) {
            (1, TimeUnit::Day) => "Daily".into(),
            (1, TimeUnit::Week) => "Weekly".into(),
            (1, TimeUnit::Month) => "Monthly".into(),
            (3, TimeUnit::Month) => "Quarterly".into(),
            (1, TimeUnit::Year) => "Yearly".into(),
            (n, unit) => format!("Every {} {}{}", n, unit, if n > 1 { "s" } else { "" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_shift_clamps_to_last_day() {
        let interval = TimeInterval {
            every: 1,
            unit: TimeUnit::Month,
        };
        assert_eq!(interval.next_date(date(2024, 1, 31)), date(2024, 2, 29));
        assert_eq!(interval.next_date(date(2024, 12, 15)), date(2025, 1, 15));
    }

    #[test]
    fn steps_near_the_calendar_end_saturate() {
        let near_end = NaiveDate::MAX.pred_opt().unwrap();
        for unit in [TimeUnit::Day, TimeUnit::Week, TimeUnit::Month, TimeUnit::Year] {
            let interval = TimeInterval { every: 2, unit };
            assert_eq!(interval.next_date(near_end), NaiveDate::MAX);
        }
        let huge = TimeInterval {
            every: u32::MAX,
            unit: TimeUnit::Year,
        };
        assert_eq!(huge.next_date(date(2024, 1, 1)), NaiveDate::MAX);
    }

    #[test]
    fn quarter_and_year_shifts() {
        let quarterly = TimeInterval {
            every: 3,
            unit: TimeUnit::Month,
        };
        assert_eq!(quarterly.next_date(date(2024, 11, 30)), date(2025, 2, 28));
        assert_eq!(quarterly.label(), "Quarterly");

        let yearly = TimeInterval {
            every: 1,
            unit: TimeUnit::Year,
        };
        assert_eq!(yearly.next_date(date(2024, 2, 29)), date(2025, 2, 28));
    }

    #[test]
    fn settlement_status_serializes_lowercase() {
        let json = serde_json::to_string(&SettlementStatus::Paid).unwrap();
        assert_eq!(json, "\"paid\"");
    }
}
