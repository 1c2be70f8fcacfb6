//! Status command implementation.

use std::io::{Write, stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use kobot_core::{FieldRegistry, StatusReport, format_status_console, format_status_json};

use super::common::{establish_session, open_process, setup_shutdown_handler};

pub fn run(registry: &FieldRegistry, pid: Option<u32>, json: bool, watch: Option<u64>) -> Result<()> {
    let process = open_process(registry, pid)?;
    let session = establish_session(&process, registry)?;

    let Some(interval_ms) = watch else {
        let report = StatusReport::collect(&session, &registry.gauges);
        print_report(&report, json)?;
        return Ok(());
    };

    let shutdown = setup_shutdown_handler()?;
    let interval = Duration::from_millis(interval_ms);
    while process.is_alive() {
        let report = StatusReport::collect(&session, &registry.gauges);
        if !json {
            execute!(stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
        }
        print_report(&report, json)?;
        stdout().flush()?;
        if shutdown.wait(interval) {
            break;
        }
    }
    Ok(())
}

fn print_report(report: &StatusReport, json: bool) -> Result<()> {
    if json {
        println!("{}", format_status_json(report)?);
    } else {
        println!("{}", format_status_console(report));
    }
    Ok(())
}
