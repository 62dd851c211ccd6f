use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// A named cash or bank holding ("kasa").
///
/// `balance` is the opening balance; the running balance is derived from
/// transactions at read time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashAccount {
    pub id: Uuid,
    pub name: String,
    pub currency_id: Uuid,
    pub balance: Decimal,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::impl_record!(CashAccount);

impl Displayable for CashAccount {
    fn display_label(&self) -> String {
        if self.is_default {
            format!("{} (default)", self.name)
        } else {
            self.name.clone()
        }
    }
}

pub(crate) fn default_true() -> bool {
    true
}

/// Input for creating a [`CashAccount`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewCashAccount {
    pub name: String,
    pub currency_id: Uuid,
    pub balance: Decimal,
    pub is_default: bool,
    pub is_active: bool,
    pub description: Option<String>,
}

impl NewCashAccount {
    pub fn new(name: impl Into<String>, currency_id: Uuid) -> Self {
        Self {
            name: name.into(),
            currency_id,
            balance: Decimal::ZERO,
            is_default: false,
            is_active: true,
            description: None,
        }
    }

    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Partial update for a [`CashAccount`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CashAccountPatch {
    pub name: Option<String>,
    pub currency_id: Option<Uuid>,
    pub balance: Option<Decimal>,
    pub is_default: Option<bool>,
    pub is_active: Option<bool>,
    pub description: Option<Option<String>>,
}
