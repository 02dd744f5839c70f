//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "pane", version, about = "Alias-identity signup automation")]
pub struct Cli {
    /// Path to pane.toml (defaults to the platform config dir)
    #[arg(long, global = true, env = "PANE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose logging (equivalent to RUST_LOG=pane=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Enroll an alias identity at a signup URL
    Enroll {
        /// Signup page URL
        url: String,

        /// Context name for the envelope (defaults to the seed phrase)
        #[arg(long)]
        context: Option<String>,

        /// Seed phrase for the synthetic identity (defaults to a fresh one)
        #[arg(long)]
        seed: Option<String>,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,
    },

    /// Generate alias seed phrases
    Scramble {
        /// Number of seeds to generate
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Write seeds to alias-seeds.txt
        #[arg(long)]
        export: bool,
    },

    /// Manage enrollment envelopes
    Context {
        #[command(subcommand)]
        command: ContextCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum ContextCommands {
    /// List all envelopes
    List,

    /// Show one envelope
    Show { name: String },

    /// Burn an envelope: delete the alias, freeze the card, tombstone
    Burn { name: String },
}
