//! Concurrent load against one store.
//!
//! Every public store operation holds the store-wide lock, so these helpers
//! check that concurrent callers neither lose writes nor observe partial
//! ones.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use wikistore_core::{StoreError, WikiStore};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Operations rejected with `DuplicateName`.
    pub duplicate_ops: usize,
    /// Operations that failed any other way.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Duplicates: {}", self.duplicate_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent threads.
    pub threads: usize,
    /// Operations per thread.
    pub ops_per_thread: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            ops_per_thread: 50,
        }
    }
}

#[derive(Default)]
struct Counters {
    successful: AtomicUsize,
    duplicate: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn record<T>(&self, result: Result<T, StoreError>) {
        let counter = match result {
            Ok(_) => &self.successful,
            Err(StoreError::DuplicateName { .. }) => &self.duplicate,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(self, start: Instant) -> StressTestResult {
        let successful_ops = self.successful.into_inner();
        let duplicate_ops = self.duplicate.into_inner();
        let failed_ops = self.failed.into_inner();
        StressTestResult {
            total_ops: successful_ops + duplicate_ops + failed_ops,
            successful_ops,
            duplicate_ops,
            failed_ops,
            duration: start.elapsed(),
        }
    }
}

/// Every thread tries to create the same wiki names; each name must be won
/// by exactly one thread.
pub fn stress_contended_wiki_names(store: &WikiStore, config: &StressConfig) -> StressTestResult {
    let counters = Counters::default();
    let start = Instant::now();

    thread::scope(|scope| {
        for _ in 0..config.threads {
            scope.spawn(|| {
                for i in 0..config.ops_per_thread {
                    counters.record(store.create_wiki(&format!("wiki {i}"), ""));
                }
            });
        }
    });

    counters.finish(start)
}

/// Every thread creates distinct pages in one wiki while readers list it.
pub fn stress_pages_with_readers(store: &WikiStore, config: &StressConfig) -> StressTestResult {
    let counters = Counters::default();
    let start = Instant::now();
    let wiki = match store.create_wiki("stress", "") {
        Ok(wiki) => wiki.id,
        Err(_) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            return counters.finish(start);
        }
    };

    thread::scope(|scope| {
        for t in 0..config.threads {
            let counters = &counters;
            scope.spawn(move || {
                for i in 0..config.ops_per_thread {
                    counters.record(store.create_page(wiki, &format!("page {t}-{i}")));
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..config.ops_per_thread {
                let listing = store.list_pages_by_title(wiki);
                let consistent = listing
                    .as_ref()
                    .is_ok_and(|pages| pages.windows(2).all(|w| w[0].name < w[1].name));
                if !consistent {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
    });

    counters.finish(start)
}
