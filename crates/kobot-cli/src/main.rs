mod cli;
mod commands;
mod input;
mod shutdown;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kobot_cli=info,kobot_core=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let registry = commands::common::load_registry(&args.config)?;

    match args.command {
        Command::Run {
            actions,
            pid,
            repeat,
            interval_ms,
            status,
        } => commands::run::run(&registry, &actions, pid, repeat, interval_ms, status),
        Command::Status { pid, json, watch } => commands::status::run(&registry, pid, json, watch),
        Command::Resolve { pid, json } => commands::resolve::run(&registry, pid, json),
        Command::Scan {
            pattern,
            base,
            size,
            limit,
            pid,
        } => commands::scan::run(
            &registry,
            &pattern,
            base.as_deref(),
            size.as_deref(),
            limit,
            pid,
        ),
        Command::Chain {
            base_offset,
            offsets,
            module,
            width,
            pid,
        } => commands::chain::run(
            &registry,
            &base_offset,
            &offsets,
            module.as_deref(),
            &width,
            pid,
        ),
    }
}
