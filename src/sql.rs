//! SQL statement normalization and classification.
//!
//! The lock manager only needs to know whether a statement starts a
//! transaction, writes, or merely reads. Classification is a best-effort
//! textual heuristic over the normalized statement, not a parser: malformed
//! input still classifies (as a write, the conservative choice).

/// How a statement relates to the lock protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Statement begins a transaction (`BEGIN`, `BEGIN TRANSACTION`, ...).
    TransactionStart,
    /// Pure read: row retrieval (`SELECT`) or query-plan explanation (`EXPLAIN`).
    Read,
    /// Anything else: assumed to mutate the database.
    Write,
}

impl StatementKind {
    /// Whether statements of this kind must hold the distributed lock.
    pub fn requires_lock(&self) -> bool {
        !matches!(self, StatementKind::Read)
    }
}

/// Normalize a statement: strip tabs, newlines, and carriage returns,
/// collapse whitespace runs to single spaces, and uppercase.
///
/// Idempotent: normalizing an already-normalized statement is a no-op.
pub fn normalize(statement: &str) -> String {
    statement
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Classify a statement by its normalized leading keyword.
pub fn classify(statement: &str) -> StatementKind {
    let normalized = normalize(statement);
    if normalized.starts_with("BEGIN") {
        StatementKind::TransactionStart
    } else if normalized.starts_with("SELECT") || normalized.starts_with("EXPLAIN") {
        StatementKind::Read
    } else {
        StatementKind::Write
    }
}
