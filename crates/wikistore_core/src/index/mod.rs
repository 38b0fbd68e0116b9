//! Index structures.
//!
//! Every index is an ordered map from an [`IndexKey`] to the rows carrying
//! that key. Keys are built from the row's values according to the index
//! definition: ascending segments compare naturally, descending segments
//! compare reversed, so a plain forward scan yields the declared order.
//!
//! Rows that share a key are kept in ascending [`RowId`](crate::RowId)
//! order, which makes every scan deterministic.

mod btree;
mod key;

pub use btree::BTreeIndex;
pub use key::{IndexKey, KeyPart, TEXT_KEY_LIMIT};
