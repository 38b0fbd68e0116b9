//! Property-based test generators using proptest.
//!
//! Names are drawn from small pools so that generated operation sequences
//! hit duplicate names and missing identifiers often.

use proptest::prelude::*;

/// Page titles used by generated operations, including the cover page's.
pub const TITLE_POOL: &[&str] = &[
    "Front Page",
    "Monkey",
    "Hat",
    "Fish",
    "Cat",
    "fish",
    "Zebra crossing",
];

/// Wiki names used by generated operations.
pub const WIKI_POOL: &[&str] = &["foo", "bar", "baz", "qux", "Foo"];

/// Strategy for generating valid free-form names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,23}").expect("Invalid regex")
}

/// Strategy for generating descriptions, empty included.
pub fn description_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~]{0,40}").expect("Invalid regex")
}

/// Strategy for wiki names from [`WIKI_POOL`].
pub fn wiki_name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(WIKI_POOL).prop_map(str::to_string)
}

/// Strategy for page titles from [`TITLE_POOL`].
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(TITLE_POOL).prop_map(str::to_string)
}

/// One store operation.
///
/// `wiki` and `page` are slots: indices into the wikis (by id) and that
/// wiki's pages (by title) at the time the operation runs. Slots past the
/// end stand for identifiers that do not exist.
#[derive(Debug, Clone)]
pub enum StoreOp {
    /// Create a wiki.
    CreateWiki {
        /// Wiki name
        name: String,
    },
    /// Rename a wiki.
    RenameWiki {
        /// Wiki slot
        wiki: usize,
        /// New name
        name: String,
    },
    /// Delete a wiki and its pages.
    DeleteWiki {
        /// Wiki slot
        wiki: usize,
    },
    /// Create a page.
    CreatePage {
        /// Wiki slot
        wiki: usize,
        /// Page title
        title: String,
    },
    /// Rename a page and rewrite its contents through `save_page`.
    SavePage {
        /// Wiki slot
        wiki: usize,
        /// Page slot
        page: usize,
        /// New title
        title: String,
    },
    /// Delete a page.
    DeletePage {
        /// Wiki slot
        wiki: usize,
        /// Page slot
        page: usize,
    },
    /// Advance the clock.
    Tick {
        /// Microseconds to advance.
        micros: i64,
    },
}

/// Strategy for one operation.
pub fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    let slot = 0usize..5;
    prop_oneof![
        3 => wiki_name_strategy().prop_map(|name| StoreOp::CreateWiki { name }),
        1 => (slot.clone(), wiki_name_strategy())
            .prop_map(|(wiki, name)| StoreOp::RenameWiki { wiki, name }),
        1 => slot.clone().prop_map(|wiki| StoreOp::DeleteWiki { wiki }),
        4 => (slot.clone(), title_strategy())
            .prop_map(|(wiki, title)| StoreOp::CreatePage { wiki, title }),
        2 => (slot.clone(), 0usize..8, title_strategy())
            .prop_map(|(wiki, page, title)| StoreOp::SavePage { wiki, page, title }),
        2 => (slot, 0usize..8).prop_map(|(wiki, page)| StoreOp::DeletePage { wiki, page }),
        2 => (0i64..3_000_000).prop_map(|micros| StoreOp::Tick { micros }),
    ]
}

/// Strategy for a sequence of operations.
pub fn store_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<StoreOp>> {
    prop::collection::vec(store_op_strategy(), 1..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn names_are_never_blank() {
        let mut runner = TestRunner::default();
        for _ in 0..100 {
            let name = name_strategy().new_tree(&mut runner).unwrap().current();
            assert!(!name.trim().is_empty());
            assert!(name.len() <= 24);
        }
    }

    #[test]
    fn op_sequences_are_bounded() {
        let mut runner = TestRunner::default();
        let ops = store_ops_strategy(20).new_tree(&mut runner).unwrap().current();
        assert!(!ops.is_empty() && ops.len() < 20);
    }
}
