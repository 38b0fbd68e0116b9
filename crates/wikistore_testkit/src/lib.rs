//! # WikiStore Testkit
//!
//! Test utilities for WikiStore.
//!
//! This crate provides:
//! - Test fixtures over in-memory and temporary-file stores
//! - Property-based test generators using proptest
//! - A reference model predicting every operation's outcome
//! - Crash simulation: torn frames, dropped commits, failing appends
//! - Concurrent load helpers
//!
//! ## Usage
//!
//! ```rust
//! use wikistore_testkit::prelude::*;
//!
//! with_temp_store(|store| {
//!     let foo = store.create_wiki("foo", "").unwrap();
//!     assert_eq!(store.count_pages(foo.id).unwrap(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;
pub mod model;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::model::*;
    pub use crate::stress::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
pub use model::*;
pub use stress::*;
