use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// A currency label. Balances are kept in each currency's own unit; there is no conversion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Currency {
    pub id: Uuid,
    pub code: String,
    pub symbol: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::impl_record!(Currency);

impl Displayable for Currency {
    fn display_label(&self) -> String {
        format!("{} ({})", self.code, self.symbol)
    }
}

/// Input for creating a [`Currency`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCurrency {
    pub code: String,
    pub symbol: String,
    pub name: String,
}

impl NewCurrency {
    pub fn new(
        code: impl Into<String>,
        symbol: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

/// Partial update for a [`Currency`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrencyPatch {
    pub code: Option<String>,
    pub symbol: Option<String>,
    pub name: Option<String>,
}
