use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cash_account::default_true;
use crate::common::*;

/// A counterparty ("cari"): customer or supplier with its own running balance.
///
/// A positive derived balance means the client owes the business.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub contact: ContactDetails,
    pub currency_id: Uuid,
    pub balance: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::impl_record!(Client);

impl Displayable for Client {
    fn display_label(&self) -> String {
        match &self.contact.email {
            Some(email) => format!("{} <{}>", self.name, email),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_office: Option<String>,
}

/// Input for creating a [`Client`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewClient {
    pub name: String,
    pub contact: ContactDetails,
    pub currency_id: Uuid,
    pub balance: Decimal,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl NewClient {
    pub fn new(name: impl Into<String>, currency_id: Uuid) -> Self {
        Self {
            name: name.into(),
            contact: ContactDetails::default(),
            currency_id,
            balance: Decimal::ZERO,
            is_active: true,
            notes: None,
        }
    }

    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_contact(mut self, contact: ContactDetails) -> Self {
        self.contact = contact;
        self
    }
}

/// Partial update for a [`Client`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub contact: Option<ContactDetails>,
    pub currency_id: Option<Uuid>,
    pub balance: Option<Decimal>,
    pub is_active: Option<bool>,
    pub notes: Option<Option<String>>,
}
