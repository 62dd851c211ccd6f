use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;
use crate::invoice::{items_total, LineItem};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QuoteStatus::Draft => "Draft",
            QuoteStatus::Sent => "Sent",
            QuoteStatus::Accepted => "Accepted",
            QuoteStatus::Rejected => "Rejected",
            QuoteStatus::Expired => "Expired",
        };
        f.write_str(label)
    }
}

/// A price offer to a client. Read-mostly; never reconciled against payments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub id: Uuid,
    pub quote_number: String,
    pub client_id: Uuid,
    pub issue_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: QuoteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::impl_record!(Quote);

impl Displayable for Quote {
    fn display_label(&self) -> String {
        format!("#{} {} [{}]", self.quote_number, self.total_amount, self.status)
    }
}

/// Input for creating a [`Quote`]. Without an explicit total the line items' sum is used.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuote {
    pub quote_number: String,
    pub client_id: Uuid,
    pub issue_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub items: Vec<LineItem>,
    pub total_amount: Option<Decimal>,
    pub status: QuoteStatus,
    pub currency_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl NewQuote {
    pub fn new(quote_number: impl Into<String>, client_id: Uuid, issue_date: NaiveDate) -> Self {
        Self {
            quote_number: quote_number.into(),
            client_id,
            issue_date,
            valid_until: None,
            items: Vec::new(),
            total_amount: None,
            status: QuoteStatus::Draft,
            currency_id: None,
            notes: None,
        }
    }

    pub fn with_item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn resolved_total(&self) -> Option<Decimal> {
        match self.total_amount {
            Some(total) => Some(total),
            None => items_total(&self.items),
        }
    }
}

/// Partial update for a [`Quote`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotePatch {
    pub quote_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub valid_until: Option<Option<NaiveDate>>,
    pub items: Option<Vec<LineItem>>,
    pub total_amount: Option<Decimal>,
    pub status: Option<QuoteStatus>,
    pub currency_id: Option<Option<Uuid>>,
    pub notes: Option<Option<String>>,
}
