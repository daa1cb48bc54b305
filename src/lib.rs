pub mod cli;
pub mod config;
pub mod connection;
pub mod display;
pub mod filter;
pub mod logging;
pub mod poller;
pub mod reconcile;
pub mod source;
pub mod traffic;

use anyhow::Context;
use log::{debug, warn};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::config::{FilterSettings, ViewerConfig};
use crate::display::{
    DEFAULT_COLUMNS, connection_table, format_operation_line, format_records_json, format_summary,
    format_traffic,
};
use crate::filter::{format_mask, pre_parse, print_filter};
use crate::traffic::{DEFAULT_NET_DEV, TrafficMeter, read_net_statistics};
pub use cli::{Cli, Commands, OutputFormat, SourceSpec, cli_parse};
pub use connection::{
    ConnectionRecord, Operation, Protocol, TcpState, compare_addresses, compare_hosts,
};
pub use filter::{Filter, FilterError, FilterState};
pub use poller::Poller;
pub use reconcile::{CycleSummary, TrackedConnections, is_visible, reconcile};
pub use source::{
    ConnectionSource, JsonSnapshotSource, ProcNetSource, ServiceTable, SourceError, WithServices,
};

/// Resolve the filter from config, with command-line flags taking precedence
pub fn build_filter_state(cli: &Cli, config: &ViewerConfig) -> Result<FilterState, FilterError> {
    let mut settings: FilterSettings = config.filter.clone();
    if let Some(text) = &cli.filter {
        settings.text = text.clone();
        settings.enabled = true;
    }
    if cli.ignore_case {
        settings.case_sensitive = false;
    }
    if cli.operators {
        settings.operators = true;
    }
    settings.to_state()
}

fn open_source(spec: &SourceSpec, services: &ServiceTable) -> Box<dyn ConnectionSource + Send> {
    match spec {
        SourceSpec::Proc => Box::new(WithServices::new(ProcNetSource::new(), services.clone())),
        SourceSpec::Json(path) => Box::new(WithServices::new(
            JsonSnapshotSource::new(path.clone()),
            services.clone(),
        )),
    }
}

fn print_records<'a>(
    records: impl IntoIterator<Item = &'a ConnectionRecord>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            for record in records {
                println!("{}", format_operation_line(record));
            }
        }
        OutputFormat::Json => {
            println!("{}", format_records_json(records)?);
        }
    }
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    let cli = cli_parse();
    logging::init_logger(logging::level_from_verbosity(cli.verbose, cli.quiet));
    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = config::load_config(cli.config.as_deref()).context("Failed to load config")?;
    let filter = build_filter_state(&cli, &config)?;
    let format = cli.format;
    debug!("filter: {:?} (enabled: {})", filter.text(), filter.is_enabled());
    let services = ServiceTable::load_or_empty(&config.view.services_file);

    match &cli.command {
        Commands::Watch {
            source,
            iterations,
            interval_ms,
            established_only,
        } => {
            let interval = interval_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.poll.interval());
            let policy = config.view.retention();
            let show_unestablished = config.view.show_unestablished && !established_only;

            let poller = Poller::spawn(open_source(source, &services), interval)
                .context("Failed to start the poller thread")?;
            let mut tracked = TrackedConnections::new();
            let mut traffic = (config.view.show_traffic
                && *source == SourceSpec::Proc
                && format == OutputFormat::Text)
                .then(TrafficMeter::new);
            let timeout = interval * 2 + Duration::from_secs(1);
            let mut cycle = 0;

            while iterations.is_none_or(|limit| cycle < limit) {
                cycle += 1;
                let Some(latest) = poller.wait_latest(timeout) else {
                    warn!("no snapshot within {:?}", timeout);
                    continue;
                };

                let summary = tracked.apply_snapshot(&latest, &policy, Instant::now(), false);
                let changed = tracked.records().filter(|record| {
                    record.operation != Operation::None
                        && is_visible(record, show_unestablished, &filter, &DEFAULT_COLUMNS)
                });
                print_records(changed, format)?;

                if format == OutputFormat::Text {
                    let (valid, established) = tracked.counts();
                    println!("{}", format_summary(&summary, valid, established));
                }
                if let Some(meter) = traffic.as_mut() {
                    match read_net_statistics(Path::new(DEFAULT_NET_DEV)) {
                        Ok(stats) => {
                            let report = meter.update(stats, Instant::now());
                            println!("{}", format_traffic(&report));
                        }
                        Err(err) => {
                            warn!("traffic totals unavailable: {}", err);
                            traffic = None;
                        }
                    }
                }
            }
            poller.stop();
        }
        Commands::List {
            source,
            established_only,
        } => {
            let mut records = open_source(source, &services).snapshot()?;
            let show_unestablished = config.view.show_unestablished && !established_only;
            records
                .retain(|record| is_visible(record, show_unestablished, &filter, &DEFAULT_COLUMNS));
            records.sort_by(|a, b| {
                a.protocol
                    .name()
                    .cmp(b.protocol.name())
                    .then_with(|| compare_addresses(&a.local_address, &b.local_address))
                    .then(a.local_port.cmp(&b.local_port))
                    .then_with(|| {
                        compare_hosts(
                            a.remote_host.as_deref().unwrap_or_default(),
                            b.remote_host.as_deref().unwrap_or_default(),
                        )
                    })
                    .then_with(|| compare_addresses(&a.remote_address, &b.remote_address))
                    .then(a.remote_port.cmp(&b.remote_port))
            });

            match format {
                OutputFormat::Text => {
                    println!("{}", connection_table(&records, &DEFAULT_COLUMNS));
                    println!("{} connections", records.len());
                }
                OutputFormat::Json => println!("{}", format_records_json(&records)?),
            }
        }
        Commands::Reconcile { before, after } => {
            let mut before = JsonSnapshotSource::read(before)?;
            let mut after = JsonSnapshotSource::read(after)?;
            for record in before.iter_mut().chain(after.iter_mut()) {
                services.annotate(record);
            }

            let mut tracked: Vec<ConnectionRecord> = Vec::new();
            reconcile(&mut tracked, &before);
            let summary = reconcile(&mut tracked, &after);

            let shown = tracked
                .iter()
                .filter(|record| is_visible(record, true, &filter, &DEFAULT_COLUMNS));
            print_records(shown, format)?;
            if format == OutputFormat::Text {
                let valid = tracked.len() - summary.deleted;
                let established = tracked
                    .iter()
                    .filter(|r| r.operation != Operation::Delete && r.is_established())
                    .count();
                println!("{}", format_summary(&summary, valid, established));
            }
        }
        Commands::Filter { file } => {
            let reader: Box<dyn BufRead> = match file {
                Some(path) => Box::new(BufReader::new(
                    std::fs::File::open(path)
                        .with_context(|| format!("Failed to open '{}'", path.display()))?,
                )),
                None => Box::new(io::stdin().lock()),
            };
            for line in reader.lines() {
                let line = line.context("Failed to read input")?;
                if filter.matches(&line) {
                    println!("{line}");
                }
            }
        }
        Commands::PrintFilter { mask } => {
            let canonical = print_filter(filter.filter());
            let classes = if *mask {
                Some(format_mask(&pre_parse(filter.text())?))
            } else {
                None
            };
            match format {
                OutputFormat::Text => {
                    println!("{canonical}");
                    if let Some(classes) = classes {
                        println!("{}", filter.text());
                        println!("{classes}");
                    }
                }
                OutputFormat::Json => {
                    let value = serde_json::json!({
                        "text": filter.text(),
                        "canonical": canonical,
                        "operators": filter.uses_operators(),
                        "case_sensitive": filter.is_case_sensitive(),
                        "mask": classes,
                    });
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
            }
        }
    }

    Ok(())
}
