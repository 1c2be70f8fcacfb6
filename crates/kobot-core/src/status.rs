//! Read-only status report of an attached client

use std::fmt::Write as _;

use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::process::ReadMemory;
use crate::registry::{FieldKind, GaugeSpec};
use crate::resolve::{NationTag, ResolvedVia};
use crate::session::{ClientSession, FieldValue};

const GAUGE_WIDTH: usize = 24;

/// Current value of one resolved field
#[derive(Debug, Clone, Serialize)]
pub struct FieldStatus {
    pub name: String,
    pub address: u64,
    pub kind: FieldKind,
    pub via: ResolvedVia,
    pub value: Option<FieldValue>,
    /// Read error, when the value could not be read
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedField {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GaugeStatus {
    pub label: String,
    pub current: Option<f64>,
    pub max: Option<f64>,
}

impl GaugeStatus {
    /// Fill ratio clamped to `[0, 1]`, when both ends are known and `max > 0`.
    pub fn ratio(&self) -> Option<f64> {
        match (self.current, self.max) {
            (Some(current), Some(max)) if max > 0.0 => Some((current / max).clamp(0.0, 1.0)),
            _ => None,
        }
    }
}

/// Snapshot of everything the status view shows
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub process: String,
    pub pid: u32,
    pub nation: Option<NationTag>,
    pub attached_at: DateTime<Local>,
    pub captured_at: DateTime<Local>,
    pub fields: Vec<FieldStatus>,
    pub unresolved: Vec<UnresolvedField>,
    pub gauges: Vec<GaugeStatus>,
}

impl StatusReport {
    /// Read every resolved field once.
    ///
    /// Read errors are recorded per field and never abort the report.
    pub fn collect<R: ReadMemory>(session: &ClientSession<R>, gauges: &[GaugeSpec]) -> Self {
        let fields: Vec<FieldStatus> = session
            .fields()
            .iter()
            .map(|field| {
                let (value, error) = match session.read(&field.name) {
                    Ok(value) => (Some(value), None),
                    Err(e) => (None, Some(e.to_string())),
                };
                FieldStatus {
                    name: field.name.clone(),
                    address: field.address,
                    kind: field.kind,
                    via: field.via,
                    value,
                    error,
                }
            })
            .collect();

        let value_of = |name: &str| {
            fields
                .iter()
                .find(|f| f.name == name)
                .and_then(|f| f.value)
                .map(FieldValue::as_f64)
        };
        let gauges = gauges
            .iter()
            .map(|gauge| GaugeStatus {
                label: gauge.label.clone(),
                current: value_of(&gauge.current),
                max: gauge.max.as_deref().and_then(value_of),
            })
            .collect();

        let unresolved = session
            .failures()
            .iter()
            .map(|failure| UnresolvedField {
                name: failure.field.clone(),
                reason: failure.error.to_string(),
            })
            .collect();

        Self {
            process: session.process_name().to_string(),
            pid: session.pid(),
            nation: session.nation(),
            attached_at: session.established_at(),
            captured_at: Local::now(),
            fields,
            unresolved,
            gauges,
        }
    }
}

/// Format a status report for terminal display
pub fn format_status_console(report: &StatusReport) -> String {
    let mut output = String::new();
    let border = "━".repeat(56);

    let nation = report
        .nation
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(output, "{}", border.dimmed());
    let _ = writeln!(
        output,
        "  {} (PID {})  nation: {}",
        report.process.bold(),
        report.pid,
        nation
    );
    let _ = writeln!(
        output,
        "  {}",
        report.captured_at.format("%Y-%m-%d %H:%M:%S").dimmed()
    );
    let _ = writeln!(output, "{}", border.dimmed());

    for gauge in &report.gauges {
        let _ = writeln!(output, "  {:<10} {}", gauge.label, format_gauge(gauge));
    }
    if !report.gauges.is_empty() {
        let _ = writeln!(output);
    }

    for field in &report.fields {
        let value = match (&field.value, &field.error) {
            (Some(value), _) => value.to_string(),
            (None, Some(e)) => e.red().to_string(),
            (None, None) => "-".to_string(),
        };
        let _ = writeln!(
            output,
            "  {:<16} 0x{:012X}  {:<4} {}",
            field.name,
            field.address,
            field.kind.name(),
            value
        );
    }

    for field in &report.unresolved {
        let _ = writeln!(
            output,
            "  {:<16} {}  {}",
            field.name,
            "unresolved".yellow(),
            field.reason.dimmed()
        );
    }
    let _ = write!(output, "{}", border.dimmed());
    output
}

fn format_gauge(gauge: &GaugeStatus) -> String {
    let numbers = match (gauge.current, gauge.max) {
        (Some(current), Some(max)) => format!("{}/{}", current, max),
        (Some(current), None) => format!("{}", current),
        _ => "-".to_string(),
    };
    let Some(ratio) = gauge.ratio() else {
        return numbers;
    };

    let filled = (ratio * GAUGE_WIDTH as f64).round() as usize;
    let bar = format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(GAUGE_WIDTH - filled)
    );
    let bar = if ratio > 0.5 {
        bar.green().to_string()
    } else if ratio > 0.25 {
        bar.yellow().to_string()
    } else {
        bar.red().to_string()
    };
    format!("{} {} ({:.0}%)", bar, numbers, ratio * 100.0)
}

/// Format a status report as pretty-printed JSON
pub fn format_status_json(report: &StatusReport) -> crate::error::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
