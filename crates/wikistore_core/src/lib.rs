//! # WikiStore Core
//!
//! Embedded, transactional record store for a multi-wiki content service.
//!
//! This crate provides:
//! - A schema of tables, columns and indices, resolved once at open
//! - An append-only, CRC-framed log with crash recovery and compaction
//! - B-tree indices with unique and prefix-ranged lookups
//! - Transactions with undo on failure and a single commit frame batch
//! - [`WikiStore`], the wiki/page CRUD surface serialized by one lock
//!
//! ```rust,no_run
//! use wikistore_core::{Config, WikiStore};
//!
//! let store = WikiStore::open_with_config(Config::new().path("wikis.wdb"))?;
//! let wiki = store.create_wiki("foo", "A wiki about foos.")?;
//! store.create_page(wiki.id, "Monkey")?;
//! assert_eq!(store.count_pages(wiki.id)?, 2);
//! store.close()?;
//! # Ok::<(), wikistore_core::StoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod global;
pub mod index;
mod lock;
pub mod log;
pub mod model;
pub mod schema;
pub mod store;
pub mod table;
pub mod transaction;
pub mod types;
pub mod value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use model::{Page, PageClass, PageIndexEntry, Wiki};
pub use schema::Schema;
pub use store::WikiStore;
pub use types::{PageId, RowId, SequenceNumber, TableId, TransactionId, WikiId};
pub use value::{Row, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
