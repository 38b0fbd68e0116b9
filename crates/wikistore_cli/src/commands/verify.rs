//! Verify command implementation.

use std::collections::BTreeSet;
use std::path::Path;
use wikistore_core::log::{LogManager, LogRecord};
use wikistore_core::{Schema, TransactionId};
use wikistore_storage::FileBackend;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of frames checked.
    pub frames_checked: usize,
    /// Number of committed transactions.
    pub committed: usize,
    /// Transactions with no `Commit`, discarded on next open.
    pub uncommitted: usize,
    /// Whether the log ends in an incomplete frame.
    pub torn_tail: bool,
    /// Whether a committed schema matching this build was found.
    pub schema_ok: bool,
    /// Problems that make the file unopenable.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.schema_ok && self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying database at {}", path.display());
    println!();

    if !path.exists() {
        return Err(format!("No database found at {}", path.display()).into());
    }
    let log = LogManager::new(Box::new(FileBackend::open(path)?), false);
    let result = verify_log(&log)?;
    print_result(&result);

    println!();
    if result.is_ok() {
        println!("✓ Database verification passed");
        Ok(())
    } else {
        println!("✗ Database verification failed");
        Err("Verification failed".into())
    }
}

fn verify_log(log: &LogManager) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let mut result = VerifyResult::default();
    let expected = Schema::wiki_store();
    let mut open: BTreeSet<TransactionId> = BTreeSet::new();
    let mut pending_schema: Option<(TransactionId, Schema)> = None;
    let mut last_sequence = 0u64;

    let mut iter = log.iter()?;
    for entry in iter.by_ref() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                result.errors.push(err.to_string());
                break;
            }
        };
        result.frames_checked += 1;
        let txid = entry.record.txid();

        match entry.record {
            LogRecord::Begin { .. } => {
                if !open.insert(txid) {
                    result
                        .errors
                        .push(format!("transaction {txid} begins twice at offset {}", entry.offset));
                }
            }
            LogRecord::Commit { sequence, .. } => {
                if !open.remove(&txid) {
                    result
                        .errors
                        .push(format!("commit without begin for {txid} at offset {}", entry.offset));
                    continue;
                }
                if sequence.as_u64() <= last_sequence {
                    result.errors.push(format!(
                        "sequence {sequence} at offset {} does not follow {last_sequence}",
                        entry.offset
                    ));
                }
                last_sequence = sequence.as_u64();
                result.committed += 1;

                if let Some((schema_txid, schema)) = pending_schema.take() {
                    if schema_txid == txid {
                        match expected.ensure_matches(&schema) {
                            Ok(()) => result.schema_ok = true,
                            Err(err) => result.errors.push(err.to_string()),
                        }
                    } else {
                        pending_schema = Some((schema_txid, schema));
                    }
                }
            }
            LogRecord::Schema { schema, .. } => {
                if !open.contains(&txid) {
                    result.errors.push(format!(
                        "schema outside a transaction at offset {}",
                        entry.offset
                    ));
                }
                pending_schema = Some((txid, schema));
            }
            _ => {
                if !open.contains(&txid) {
                    result.errors.push(format!(
                        "{} outside a transaction at offset {}",
                        entry.record.kind(),
                        entry.offset
                    ));
                }
            }
        }
    }
    result.torn_tail = iter.torn_tail();
    result.uncommitted = open.len();

    if !result.schema_ok && result.errors.is_empty() {
        result.errors.push("no committed schema found".to_string());
    }
    Ok(result)
}

fn print_result(result: &VerifyResult) {
    println!(
        "  Frames checked: {}, committed transactions: {}",
        result.frames_checked, result.committed
    );
    if result.uncommitted > 0 {
        println!(
            "  WARNING: {} uncommitted transactions (discarded on next open)",
            result.uncommitted
        );
    }
    if result.torn_tail {
        println!("  WARNING: torn final frame (discarded on next open)");
    }
    for error in &result.errors {
        println!("    ERROR: {error}");
    }
}
