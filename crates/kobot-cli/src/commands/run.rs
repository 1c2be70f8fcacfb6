//! Action runner: trigger each action and confirm it through its cooldown.

use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use kobot_core::registry::GaugeSpec;
use kobot_core::{
    ClientSession, Confirmation, Error, FieldRegistry, KeyboardTrigger, MemoryReader,
    ProcessHandle, SendInputInjector, StatusReport, SystemClock, format_status_console,
};
use tracing::{debug, error, info};

use super::common::{establish_session, open_process, setup_shutdown_handler};
use crate::shutdown::ShutdownSignal;

const STATUS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct RunSummary {
    succeeded: u32,
    failed: u32,
}

pub fn run(
    registry: &FieldRegistry,
    actions: &[String],
    pid: Option<u32>,
    repeat: bool,
    interval_ms: u64,
    status: bool,
) -> Result<()> {
    for name in actions {
        if registry.action(name).is_none() {
            return Err(Error::UnknownAction(name.clone()).into());
        }
    }

    let shutdown = setup_shutdown_handler()?;
    println!("kobot v{} (Press Esc or q to quit)", env!("CARGO_PKG_VERSION"));

    let process = open_process(registry, pid)?;
    let session = establish_session(&process, registry)?;
    if let Some(nation) = session.nation() {
        println!("Nation: {}", nation);
    }
    let interval = Duration::from_millis(interval_ms);

    let summary = thread::scope(|scope| {
        if status {
            let session = &session;
            let shutdown = &shutdown;
            scope.spawn(move || status_loop(session, &registry.gauges, shutdown));
        }

        let summary = action_loop(&session, &process, actions, repeat, interval, &shutdown);
        // Ends the status thread too.
        shutdown.trigger();
        summary
    })?;

    println!(
        "Done: {} confirmed, {} not confirmed",
        summary.succeeded, summary.failed
    );
    Ok(())
}

fn action_loop(
    session: &ClientSession<MemoryReader<'_>>,
    process: &ProcessHandle,
    actions: &[String],
    repeat: bool,
    interval: Duration,
    shutdown: &ShutdownSignal,
) -> Result<RunSummary> {
    let policy = session.policy();
    let mut summary = RunSummary::default();
    let mut round = 0u32;

    loop {
        round += 1;
        debug!("Round {}", round);

        for name in actions {
            if shutdown.is_shutdown() {
                return Ok(summary);
            }
            if !process.is_alive() {
                bail!("{} exited", session.process_name());
            }

            let action = session.action(name)?;
            let mut trigger = KeyboardTrigger::new(
                SendInputInjector,
                action.keys.clone(),
                policy.confirm_key,
                policy.key_hold(),
            )?;

            let outcome = match session.confirm_action(name, &mut trigger, SystemClock) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Action '{}' aborted: {}", name, e);
                    return Err(e.into());
                }
            };

            match outcome.confirmation {
                Confirmation::Succeeded => {
                    summary.succeeded += 1;
                    info!(
                        "{}: confirmed after {} triggers ({} ms)",
                        name,
                        outcome.triggers,
                        outcome.elapsed.as_millis()
                    );
                }
                Confirmation::Failed(reason) => {
                    summary.failed += 1;
                    let reason: &'static str = reason.into();
                    info!("{}: not confirmed ({})", name, reason);
                }
            }
        }

        if !repeat || shutdown.wait(interval) {
            return Ok(summary);
        }
    }
}

fn status_loop(
    session: &ClientSession<MemoryReader<'_>>,
    gauges: &[GaugeSpec],
    shutdown: &ShutdownSignal,
) {
    debug!("Status loop started");
    loop {
        let report = StatusReport::collect(session, gauges);
        println!("{}", format_status_console(&report));
        if shutdown.wait(STATUS_INTERVAL) {
            break;
        }
    }
    debug!("Status loop stopped");
}
