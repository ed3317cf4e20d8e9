//! CLI argument parsing for netlatch.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// netlatch: distributed lock administration for file-backed databases on
/// shared network filesystems.
///
/// Inspects and repairs the lock records of a file-backed lock store, and
/// shows how statements are classified by the lock protocol.
#[derive(Parser, Debug)]
#[command(name = "netlatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for netlatch.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List lock records in a file-backed lock store.
    ///
    /// Shows owner, holding process, age, and expiry state per record.
    List(ListArgs),

    /// Force-remove a lock record.
    ///
    /// Requires --force to prevent accidental removal; the record's own
    /// expiry is usually the safer way to get rid of an abandoned lock.
    Clear(ClearArgs),

    /// Show how a statement is normalized and classified.
    ///
    /// Prints the normalized text and whether the statement is a
    /// transaction start, a write, or a read.
    Classify(ClassifyArgs),
}

/// Arguments for the `list` command.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Directory of the file-backed lock store.
    #[arg(long)]
    pub store: PathBuf,
}

/// Arguments for the `clear` command.
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Resource key whose record should be removed (e.g. "database#/srv/app.db").
    pub key: String,

    /// Directory of the file-backed lock store.
    #[arg(long)]
    pub store: PathBuf,

    /// Force removal of the record (required for safety).
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `classify` command.
#[derive(Parser, Debug)]
pub struct ClassifyArgs {
    /// The statement to classify.
    pub statement: String,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
