//! Write transactions.
//!
//! A transaction applies its writes directly to the in-memory tables and
//! keeps an undo list. Commit appends the whole transaction to the log in
//! one write; an error or a drop before commit replays the undo list, so the
//! tables end up exactly as they were.

mod manager;
mod state;

pub use manager::TransactionManager;
pub use state::{Transaction, TransactionState};
