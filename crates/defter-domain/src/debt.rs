use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
/// Whether the business owes (`Payable`, "borç") or is owed (`Receivable`, "alacak").
pub enum DebtType {
    Payable,
    Receivable,
}

impl fmt::Display for DebtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DebtType::Payable => "Payable",
            DebtType::Receivable => "Receivable",
        };
        f.write_str(label)
    }
}

/// An obligation independent of invoices. Never linked to transactions automatically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Debt {
    pub id: Uuid,
    pub title: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: DebtType,
    #[serde(default)]
    pub status: SettlementStatus,
    pub due_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::impl_record!(Debt);

impl Displayable for Debt {
    fn display_label(&self) -> String {
        format!("{} [{} {}]", self.title, self.kind, self.status)
    }
}

/// Input for creating a [`Debt`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewDebt {
    pub title: String,
    pub amount: Decimal,
    pub kind: DebtType,
    pub status: SettlementStatus,
    pub due_date: NaiveDate,
    pub client_id: Option<Uuid>,
    pub currency_id: Option<Uuid>,
    pub description: Option<String>,
}

impl NewDebt {
    pub fn new(
        title: impl Into<String>,
        kind: DebtType,
        amount: Decimal,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            title: title.into(),
            amount,
            kind,
            status: SettlementStatus::Pending,
            due_date,
            client_id: None,
            currency_id: None,
            description: None,
        }
    }

    pub fn for_client(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }
}

/// Partial update for a [`Debt`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebtPatch {
    pub title: Option<String>,
    pub amount: Option<Decimal>,
    pub kind: Option<DebtType>,
    pub status: Option<SettlementStatus>,
    pub due_date: Option<NaiveDate>,
    pub client_id: Option<Option<Uuid>>,
    pub currency_id: Option<Option<Uuid>>,
    pub description: Option<Option<String>>,
}
