//! Inspect command implementation.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use wikistore_core::log::{LogManager, LogRecord};
use wikistore_storage::FileBackend;

/// Log inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Database path.
    pub path: String,
    /// Log size in bytes.
    pub log_size: u64,
    /// Number of complete frames.
    pub frame_count: usize,
    /// Frames per record kind.
    pub frames_by_kind: BTreeMap<&'static str, usize>,
    /// Number of committed transactions.
    pub committed_transactions: usize,
    /// Sequence number of the last commit.
    pub last_sequence: Option<u64>,
    /// Whether the log ends in an incomplete frame.
    pub torn_tail: bool,
    /// Decoded records (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<RecordView>>,
}

/// One decoded frame.
#[derive(Debug, Serialize)]
pub struct RecordView {
    /// Offset of the frame.
    pub offset: u64,
    /// Frame length in bytes.
    pub length: u64,
    /// The record.
    pub record: LogRecord,
}

/// Runs the inspect command.
pub fn run(
    path: &Path,
    show_records: bool,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No database found at {}", path.display()).into());
    }
    let log = LogManager::new(Box::new(FileBackend::open(path)?), false);

    let mut result = InspectResult {
        path: path.display().to_string(),
        log_size: log.size()?,
        frame_count: 0,
        frames_by_kind: BTreeMap::new(),
        committed_transactions: 0,
        last_sequence: None,
        torn_tail: false,
        records: show_records.then(Vec::new),
    };

    let mut iter = log.iter()?;
    for entry in iter.by_ref() {
        let entry = entry?;
        result.frame_count += 1;
        *result.frames_by_kind.entry(entry.record.kind()).or_default() += 1;
        if let LogRecord::Commit { sequence, .. } = &entry.record {
            result.committed_transactions += 1;
            result.last_sequence = Some(sequence.as_u64());
        }
        if let Some(records) = &mut result.records {
            if limit.map_or(true, |limit| records.len() < limit) {
                records.push(RecordView {
                    offset: entry.offset,
                    length: entry.end - entry.offset,
                    record: entry.record,
                });
            }
        }
    }
    result.torn_tail = iter.torn_tail();
    drop(iter);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("WikiStore Database Inspection");
    println!("=============================");
    println!();
    println!("Path: {}", result.path);
    println!("Log size: {}", format_size(result.log_size));
    println!();
    println!("Frames: {}", result.frame_count);
    for (kind, count) in &result.frames_by_kind {
        println!("  {kind:<10} {count}");
    }
    println!();
    println!("Committed transactions: {}", result.committed_transactions);
    if let Some(sequence) = result.last_sequence {
        println!("Last sequence:          {sequence}");
    }
    if result.torn_tail {
        println!("Torn tail: yes (discarded on next open)");
    }

    if let Some(records) = &result.records {
        println!();
        println!("Records:");
        for view in records {
            println!(
                "  {:>10} {:>6}B  {}",
                view.offset,
                view.length,
                describe(&view.record)
            );
        }
    }
}

fn describe(record: &LogRecord) -> String {
    match record {
        LogRecord::Schema { txid, schema } => {
            let tables: Vec<_> = schema.tables.iter().map(|t| t.name.as_str()).collect();
            format!("schema     txid={txid} tables={tables:?}")
        }
        LogRecord::Begin { txid } => format!("begin      txid={txid}"),
        LogRecord::Insert {
            txid, table, row_id, ..
        } => format!("insert     txid={txid} table={table} row={row_id}"),
        LogRecord::Update {
            txid, table, row_id, ..
        } => format!("update     txid={txid} table={table} row={row_id}"),
        LogRecord::Delete {
            txid,
            table,
            row_id,
        } => format!("delete     txid={txid} table={table} row={row_id}"),
        LogRecord::Commit { txid, sequence } => format!("commit     txid={txid} seq={sequence}"),
        LogRecord::Checkpoint {
            txid,
            sequence,
            next_ids,
        } => format!("checkpoint txid={txid} seq={sequence} next_ids={next_ids:?}"),
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
