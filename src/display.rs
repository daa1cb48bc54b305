use crate::connection::{Column, ConnectionRecord, Operation, port_text};
use crate::reconcile::CycleSummary;
use crate::traffic::TrafficReport;
use colored::{ColoredString, Colorize};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use serde::Serialize;

/// Columns shown by `list` and used for filtering by default
pub const DEFAULT_COLUMNS: [Column; 7] = [
    Column::Protocol,
    Column::LocalAddress,
    Column::LocalPort,
    Column::State,
    Column::RemoteAddress,
    Column::RemotePort,
    Column::ProgramName,
];

pub fn create_styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h)).collect::<Vec<_>>());
    table
}

/// One-character marker of an operation, colored like a diff
pub fn operation_marker(op: Operation) -> ColoredString {
    match op {
        Operation::Insert => "+".green().bold(),
        Operation::Update => "~".yellow().bold(),
        Operation::Delete => "-".red().bold(),
        Operation::None => " ".normal(),
    }
}

fn endpoint(address: &str, port: u16) -> String {
    if address.contains(':') {
        format!("[{}]:{}", address, port_text(port))
    } else {
        format!("{}:{}", address, port_text(port))
    }
}

/// `+ tcp 10.0.0.1:5000 -> 1.2.3.4:443 ESTABLISHED firefox`
pub fn format_operation_line(record: &ConnectionRecord) -> String {
    let mut line = format!(
        "{} {:<4} {} -> {}",
        operation_marker(record.operation),
        record.protocol.name(),
        endpoint(&record.local_address, record.local_port),
        endpoint(&record.remote_address, record.remote_port),
    );
    let state = record.state_name();
    if !state.is_empty() {
        line.push(' ');
        line.push_str(state);
    }
    if let Some(name) = &record.program_name {
        line.push(' ');
        line.push_str(name);
    }
    line
}

pub fn format_summary(summary: &CycleSummary, valid: usize, established: usize) -> String {
    format!(
        "{} inserted, {} updated, {} closed | {} connections, {} established",
        summary.inserted.to_string().green(),
        summary.updated.to_string().yellow(),
        summary.deleted.to_string().red(),
        valid,
        established
    )
}

/// Byte count with a binary unit, e.g. `1.5 KiB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// `Received: 1.2 MiB +3.0 KiB/s | Sent: 600 B +0 B/s`
pub fn format_traffic(report: &TrafficReport) -> String {
    format!(
        "Received: {} +{}/s | Sent: {} +{}/s",
        format_bytes(report.received),
        format_bytes(report.received_rate),
        format_bytes(report.sent),
        format_bytes(report.sent_rate)
    )
}

/// Table of `records` restricted to `columns`
pub fn connection_table<'a>(
    records: impl IntoIterator<Item = &'a ConnectionRecord>,
    columns: &[Column],
) -> Table {
    let headers: Vec<&str> = columns.iter().map(|c| c.title()).collect();
    let mut table = create_styled_table(&headers);
    for record in records {
        table.add_row(
            columns
                .iter()
                .map(|c| Cell::new(record.column_text(*c)))
                .collect::<Vec<_>>(),
        );
    }
    table
}

#[derive(Serialize)]
struct RecordView<'a> {
    #[serde(flatten)]
    record: &'a ConnectionRecord,
    operation: Operation,
}

/// Records as a pretty JSON array, each with its current operation
pub fn format_records_json<'a>(
    records: impl IntoIterator<Item = &'a ConnectionRecord>,
) -> serde_json::Result<String> {
    let views: Vec<RecordView<'_>> = records
        .into_iter()
        .map(|record| RecordView {
            record,
            operation: record.operation,
        })
        .collect();
    serde_json::to_string_pretty(&views)
}
