//! The process-wide store.
//!
//! Library code takes a [`WikiStore`] by reference. Binaries that want one
//! store per process go through [`init`] or [`instance`] instead.

use crate::config::Config;
use crate::error::StoreResult;
use crate::store::WikiStore;
use parking_lot::Mutex;
use std::sync::OnceLock;

static STORE: OnceLock<WikiStore> = OnceLock::new();

/// Serializes first-time opens so only one caller touches the file.
static INIT: Mutex<()> = parking_lot::const_mutex(());

/// Opens the process-wide store with `config`.
///
/// Later calls return the store opened by the first successful one and
/// ignore their `config`. A failed open leaves the store uninitialized.
pub fn init(config: Config) -> StoreResult<&'static WikiStore> {
    if let Some(store) = STORE.get() {
        return Ok(store);
    }
    let _guard = INIT.lock();
    if let Some(store) = STORE.get() {
        return Ok(store);
    }
    let store = WikiStore::open_with_config(config)?;
    Ok(STORE.get_or_init(|| store))
}

/// The process-wide store, opened with the default configuration on first
/// use.
pub fn instance() -> StoreResult<&'static WikiStore> {
    init(Config::default())
}

/// Whether the process-wide store has been opened.
pub fn is_initialized() -> bool {
    STORE.get().is_some()
}

/// Closes the process-wide store. Operations on it fail with `StoreClosed`
/// afterwards.
pub fn shutdown() -> StoreResult<()> {
    match STORE.get() {
        Some(store) => store.close(),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use tempfile::tempdir;

    // The global is shared by every test in this binary, so this is the only
    // test that touches it.
    #[test]
    fn single_initialization_then_shutdown() {
        let dir = tempdir().unwrap();
        let config = Config::new().path(dir.path().join("global.wdb"));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let config = config.clone();
                std::thread::spawn(move || init(config).map(|s| s as *const WikiStore as usize))
            })
            .collect();
        let addrs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
        assert!(addrs.windows(2).all(|w| w[0] == w[1]));
        assert!(is_initialized());

        let store = instance().unwrap();
        store.create_wiki("foo", "").unwrap();
        shutdown().unwrap();
        shutdown().unwrap();
        assert!(matches!(store.list_wikis(), Err(StoreError::StoreClosed)));
    }
}
