//! defter-core
//!
//! Business rules for the bookkeeping core: the entity store, balance
//! calculation, payment reconciliation, debt lifecycle, and regular payment
//! scheduling. Depends on defter-domain. No terminal I/O, no direct storage
//! interactions; persistence is reached through the [`storage::BookStorage`] trait.

pub mod balance;
pub mod error;
pub mod lifecycle;
pub mod reconciler;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod time;

pub use balance::*;
pub use error::{CoreError, CoreResult};
pub use lifecycle::*;
pub use reconciler::*;
pub use scheduler::*;
pub use store::{DeletePolicy, EntityStore};
pub use time::{Clock, FixedClock};
