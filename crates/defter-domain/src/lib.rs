//! defter-domain
//!
//! Pure bookkeeping records (currencies, cash accounts, clients, transactions,
//! debts, invoices, pending balances, regular payments, quotes) and the `Book`
//! snapshot that owns them. No I/O, no storage, no business rules beyond
//! arithmetic on a single record.

pub mod book;
pub mod cash_account;
pub mod client;
pub mod common;
pub mod currency;
pub mod debt;
pub mod invoice;
pub mod money;
pub mod pending_balance;
pub mod quote;
pub mod regular_payment;
pub mod transaction;

pub use book::*;
pub use cash_account::*;
pub use client::*;
pub use common::*;
pub use currency::*;
pub use debt::*;
pub use invoice::*;
pub use pending_balance::*;
pub use quote::*;
pub use regular_payment::*;
pub use transaction::*;

// Re-export common dependencies so consumers can rely on this crate as a façade.
pub use chrono;
pub use rust_decimal;
pub use uuid;
