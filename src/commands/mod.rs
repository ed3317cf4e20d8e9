//! Command implementations for netlatch.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. All commands operate on a file-backed lock store or on
//! plain statement text; none of them touch a protected database.

use crate::cli::{ClassifyArgs, ClearArgs, Command, ListArgs};
use crate::error::{NetlatchError, Result};
use crate::sql::{self, StatementKind};
use crate::store::{FileStore, LockRecord};
use chrono::Utc;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::List(args) => cmd_list(args),
        Command::Clear(args) => cmd_clear(args),
        Command::Classify(args) => cmd_classify(args),
    }
}

/// List all lock records in the store directory.
fn cmd_list(args: ListArgs) -> Result<()> {
    let store = FileStore::new(&args.store);
    let records = store
        .list()
        .map_err(|e| NetlatchError::UserError(e.to_string()))?;

    if records.is_empty() {
        println!("No lock records in {}", args.store.display());
        return Ok(());
    }

    let now = Utc::now();
    for record in &records {
        println!("{}", describe(record, record.is_stale(now)));
    }

    Ok(())
}

/// Force-remove a lock record.
fn cmd_clear(args: ClearArgs) -> Result<()> {
    if !args.force {
        return Err(NetlatchError::UserError(format!(
            "refusing to clear lock record '{}' without --force; \
             an abandoned record expires on its own",
            args.key
        )));
    }

    let store = FileStore::new(&args.store);
    let removed = store
        .remove(&args.key)
        .map_err(|e| NetlatchError::UserError(e.to_string()))?;

    println!("Cleared {}", describe(&removed, removed.is_stale(Utc::now())));
    Ok(())
}

/// Show normalization and classification of a statement.
fn cmd_classify(args: ClassifyArgs) -> Result<()> {
    let normalized = sql::normalize(&args.statement);
    let kind = match sql::classify(&args.statement) {
        StatementKind::TransactionStart => "transaction-start",
        StatementKind::Read => "read",
        StatementKind::Write => "write",
    };

    println!("normalized: {}", normalized);
    println!("kind:       {}", kind);
    Ok(())
}

/// One-line human-readable summary of a lock record.
fn describe(record: &LockRecord, stale: bool) -> String {
    format!(
        "{} (owner: {}, pid: {}, acquired: {}, expires: {}{})",
        record.key,
        record.owner,
        record
            .pid
            .map(|pid| pid.to_string())
            .unwrap_or_else(|| "-".to_string()),
        record.acquired_at.to_rfc3339(),
        record.expires_at.to_rfc3339(),
        if stale { ", EXPIRED" } else { "" }
    )
}
