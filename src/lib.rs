#![doc(test(attr(deny(warnings))))]

//! Defter is a small-business bookkeeping core: currencies, cash accounts,
//! clients, transactions, invoices, debts, and regular payments kept in one
//! `Book`, with payment reconciliation and balance reporting on top.
//!
//! This crate wires the workspace together. [`BookManager`] owns the open
//! book and persists every change through a [`defter_core::storage::BookStorage`].

pub mod clock;
pub mod dashboard;
pub mod errors;
pub mod manager;
pub mod utils;

pub use clock::SystemClock;
pub use dashboard::Dashboard;
pub use errors::{DefterError, Result};
pub use manager::{BookManager, LoadMetadata};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Defter tracing initialized.");
    });
}
