use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// Outstanding, unpaid portion of an invoice, tracked for due-date queries.
///
/// While pending, `amount` equals the linked invoice's outstanding amount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingBalance {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub client_id: Uuid,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::impl_record!(PendingBalance);

impl PendingBalance {
    pub fn is_open(&self) -> bool {
        self.status.is_pending()
    }
}

impl Displayable for PendingBalance {
    fn display_label(&self) -> String {
        format!("{} [{}]", self.amount, self.status)
    }
}

/// Partial update for a [`PendingBalance`]. Amount and status follow the
/// linked invoice and are only changed by payment reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingBalancePatch {
    pub due_date: Option<Option<NaiveDate>>,
}
