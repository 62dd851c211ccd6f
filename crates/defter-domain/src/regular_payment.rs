use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Yearly,
    ];

    /// Calendar step between two occurrences.
    pub fn interval(self) -> TimeInterval {
        match self {
            Frequency::Weekly => TimeInterval {
                every: 1,
                unit: TimeUnit::Week,
            },
            Frequency::Monthly => TimeInterval {
                every: 1,
                unit: TimeUnit::Month,
            },
            Frequency::Quarterly => TimeInterval {
                every: 3,
                unit: TimeUnit::Month,
            },
            Frequency::Yearly => TimeInterval {
                every: 1,
                unit: TimeUnit::Year,
            },
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.interval().label())
    }
}

/// A recurring obligation (rent, loan installment, utility).
///
/// Each occurrence is its own stored record; nothing here generates the next one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegularPayment {
    pub id: Uuid,
    pub title: String,
    pub amount: Decimal,
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: SettlementStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::impl_record!(RegularPayment);

impl Displayable for RegularPayment {
    fn display_label(&self) -> String {
        format!("{} ({}, due {})", self.title, self.frequency, self.due_date)
    }
}

/// Input for creating a [`RegularPayment`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewRegularPayment {
    pub title: String,
    pub amount: Decimal,
    pub frequency: Frequency,
    pub category: Option<String>,
    pub due_date: NaiveDate,
    pub status: SettlementStatus,
    pub currency_id: Option<Uuid>,
    pub description: Option<String>,
}

impl NewRegularPayment {
    pub fn new(
        title: impl Into<String>,
        amount: Decimal,
        frequency: Frequency,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            title: title.into(),
            amount,
            frequency,
            category: None,
            due_date,
            status: SettlementStatus::Pending,
            currency_id: None,
            description: None,
        }
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Partial update for a [`RegularPayment`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegularPaymentPatch {
    pub title: Option<String>,
    pub amount: Option<Decimal>,
    pub frequency: Option<Frequency>,
    pub category: Option<Option<String>>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<SettlementStatus>,
    pub currency_id: Option<Option<Uuid>>,
    pub description: Option<Option<String>>,
}
