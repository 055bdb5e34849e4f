//! Command line interface for invoicer, built on clap.
//!
//! Without a subcommand the interactive wizard starts.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Interactive invoicing for freelancers: clients, tracked time and
/// monthly spreadsheet invoices.
#[derive(Debug, Parser)]
#[command(name = "invoicer", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file to read instead of `invoicer.toml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Record store location, overriding the configuration.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Spreadsheet template, overriding the configuration.
    #[arg(long, global = true)]
    pub template: Option<PathBuf>,

    /// Enable debug logging on stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the interactive wizard (the default).
    Start,

    /// Print the stored base info, clients and invoices.
    Status,

    /// Delete the record store.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
}
