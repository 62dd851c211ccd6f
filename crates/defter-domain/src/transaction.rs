//! Cash movements and their direction.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
/// Direction of a transaction; amounts themselves are never negative.
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// Applies the direction to a non-negative amount.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Income => amount,
            TransactionType::Expense => -amount,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_account_id: Option<Uuid>,
    /// Explicit link to the invoice this transaction pays, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    pub transaction_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_amount: Option<Decimal>,
    /// Set once the transaction has been applied to an invoice.
    #[serde(default)]
    pub reconciled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::impl_record!(Transaction);

impl Transaction {
    /// Amount with the direction applied: income positive, expense negative.
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }
}

impl Displayable for Transaction {
    fn display_label(&self) -> String {
        format!(
            "{} {} {} on {}",
            self.kind, self.amount, self.description, self.transaction_date
        )
    }
}

/// Input for creating a [`Transaction`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub kind: TransactionType,
    pub amount: Decimal,
    pub client_id: Option<Uuid>,
    pub cash_account_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub currency_id: Option<Uuid>,
    pub category: Option<String>,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub vat_rate: Option<Decimal>,
    pub vat_amount: Option<Decimal>,
}

impl NewTransaction {
    pub fn new(kind: TransactionType, amount: Decimal, transaction_date: NaiveDate) -> Self {
        Self {
            kind,
            amount,
            client_id: None,
            cash_account_id: None,
            invoice_id: None,
            currency_id: None,
            category: None,
            description: String::new(),
            transaction_date,
            vat_rate: None,
            vat_amount: None,
        }
    }

    pub fn income(amount: Decimal, transaction_date: NaiveDate) -> Self {
        Self::new(TransactionType::Income, amount, transaction_date)
    }

    pub fn expense(amount: Decimal, transaction_date: NaiveDate) -> Self {
        Self::new(TransactionType::Expense, amount, transaction_date)
    }

    pub fn for_client(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn in_account(mut self, cash_account_id: Uuid) -> Self {
        self.cash_account_id = Some(cash_account_id);
        self
    }

    pub fn paying_invoice(mut self, invoice_id: Uuid) -> Self {
        self.invoice_id = Some(invoice_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial update for a [`Transaction`].
///
/// The invoice link and reconciled flag are owned by the payment reconciler
/// and cannot be patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub kind: Option<TransactionType>,
    pub amount: Option<Decimal>,
    pub client_id: Option<Option<Uuid>>,
    pub cash_account_id: Option<Option<Uuid>>,
    pub currency_id: Option<Option<Uuid>>,
    pub category: Option<Option<String>>,
    pub description: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub vat_rate: Option<Option<Decimal>>,
    pub vat_amount: Option<Option<Decimal>>,
}
