//! CLI argument definitions for kobot.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kobot")]
#[command(about = "Game client memory inspector and cooldown-confirming action runner", version)]
pub struct Args {
    /// Field registry (TOML)
    #[arg(short, long, default_value = "kobot.toml", env = "KOBOT_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Trigger actions and confirm each one through its cooldown
    Run {
        /// Actions to run, in order
        #[arg(required = true)]
        actions: Vec<String>,
        /// Process ID (skip automatic detection)
        #[arg(long)]
        pid: Option<u32>,
        /// Keep cycling through the actions until stopped
        #[arg(long)]
        repeat: bool,
        /// Pause between rounds in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
        /// Print a status frame while running
        #[arg(long)]
        status: bool,
    },
    /// Show current field values
    Status {
        /// Process ID (skip automatic detection)
        #[arg(long)]
        pid: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Refresh every N milliseconds until stopped
        #[arg(long, value_name = "MS")]
        watch: Option<u64>,
    },
    /// Resolve every registry field and print its address
    Resolve {
        /// Process ID (skip automatic detection)
        #[arg(long)]
        pid: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search the scan window for a byte pattern
    Scan {
        /// Byte pattern (hex, e.g., "53 70 ?? 6B", use ?? for wildcard)
        pattern: String,
        /// Window start (hex, defaults to the registry's scan window)
        #[arg(long)]
        base: Option<String>,
        /// Window size in bytes (hex, defaults to the registry's scan window)
        #[arg(long)]
        size: Option<String>,
        /// Maximum number of results
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Process ID (skip automatic detection)
        #[arg(long)]
        pid: Option<u32>,
    },
    /// Walk a pointer chain and print every hop
    Chain {
        /// Offset from the module base to the first pointer (hex)
        base_offset: String,
        /// Offsets applied after each dereference (hex, may be negative: -0x8);
        /// give options before the offsets
        #[arg(allow_hyphen_values = true)]
        offsets: Vec<String>,
        /// Module whose load address starts the chain (defaults to the registry's)
        #[arg(long)]
        module: Option<String>,
        /// Pointer width in bits
        #[arg(long, default_value = "32", value_parser = ["32", "64"])]
        width: String,
        /// Process ID (skip automatic detection)
        #[arg(long)]
        pid: Option<u32>,
    },
}
