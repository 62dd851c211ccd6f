//! Invoices, their line items, and payment progress.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;
use crate::money::normalize;

/// One billed line on an invoice or quote. `vat_rate` is a percentage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub vat_rate: Decimal,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            vat_rate: Decimal::ZERO,
        }
    }

    pub fn with_vat(mut self, vat_rate: Decimal) -> Self {
        self.vat_rate = vat_rate;
        self
    }

    pub fn net(&self) -> Decimal {
        normalize(self.quantity.saturating_mul(self.unit_price))
    }

    pub fn vat(&self) -> Decimal {
        normalize(self.net().saturating_mul(self.vat_rate) / Decimal::ONE_HUNDRED)
    }

    pub fn total(&self) -> Decimal {
        self.net().saturating_add(self.vat())
    }

    /// Net plus VAT, or `None` when the arithmetic overflows.
    pub fn checked_total(&self) -> Option<Decimal> {
        let net = normalize(self.quantity.checked_mul(self.unit_price)?);
        let vat = normalize(net.checked_mul(self.vat_rate)? / Decimal::ONE_HUNDRED);
        net.checked_add(vat)
    }
}

/// Sum of line totals (net plus VAT), `None` on overflow.
pub fn items_total(items: &[LineItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.checked_total()?))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Paid => "Paid",
        };
        f.write_str(label)
    }
}

/// A bill issued to a client. Invariant: `0 <= paid_amount <= total_amount`
/// and `status == Paid` exactly when the two are equal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub client_id: Uuid,
    pub issue_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub paid_amount: Decimal,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::impl_record!(Invoice);

impl Invoice {
    /// Amount still owed on the invoice.
    pub fn outstanding(&self) -> Decimal {
        (self.total_amount - self.paid_amount).max(Decimal::ZERO)
    }

    pub fn is_fully_paid(&self) -> bool {
        self.paid_amount >= self.total_amount
    }

    /// Status implied by the paid amount.
    pub fn derived_status(&self) -> InvoiceStatus {
        if self.is_fully_paid() {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Pending
        }
    }
}

impl Displayable for Invoice {
    fn display_label(&self) -> String {
        format!(
            "#{} {}/{} [{}]",
            self.invoice_number, self.paid_amount, self.total_amount, self.status
        )
    }
}

/// Input for creating an [`Invoice`]. When `total_amount` is `None` the
/// total is the sum of the line items.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub client_id: Uuid,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub items: Vec<LineItem>,
    pub total_amount: Option<Decimal>,
    pub currency_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl NewInvoice {
    pub fn new(invoice_number: impl Into<String>, client_id: Uuid, issue_date: NaiveDate) -> Self {
        Self {
            invoice_number: invoice_number.into(),
            client_id,
            issue_date,
            due_date: None,
            items: Vec::new(),
            total_amount: None,
            currency_id: None,
            notes: None,
        }
    }

    pub fn with_total(mut self, total: Decimal) -> Self {
        self.total_amount = Some(total);
        self
    }

    pub fn with_item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn due_on(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Explicit total, or the line items' sum. `None` when the items overflow.
    pub fn resolved_total(&self) -> Option<Decimal> {
        match self.total_amount {
            Some(total) => Some(total),
            None => items_total(&self.items),
        }
    }
}

/// Partial update for an [`Invoice`]. Paid amount and status are owned by
/// the payment reconciler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoicePatch {
    pub invoice_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<Option<NaiveDate>>,
    pub items: Option<Vec<LineItem>>,
    pub total_amount: Option<Decimal>,
    pub currency_id: Option<Option<Uuid>>,
    pub notes: Option<Option<String>>,
}
