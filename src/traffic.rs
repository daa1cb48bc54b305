//! Interface traffic totals from `/proc/net/dev`
//!
//! [`TrafficMeter`] turns successive counter readings into totals since the
//! first reading plus per-second rates. Counters that go backwards (an
//! interface reset, a suspend/resume) restart the totals.

use crate::source::SourceError;
use log::{debug, trace};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

pub const DEFAULT_NET_DEV: &str = "/proc/net/dev";

/// Counters summed over every non-loopback interface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetStatistics {
    pub bytes_received: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub packets_sent: u64,
}

/// Sum the interface lines of a `/proc/net/dev` table.
///
/// Each line reads `iface: rx_bytes rx_packets ... (8 rx fields) tx_bytes
/// tx_packets ...`. Headers and malformed lines are skipped.
pub fn parse_net_dev(content: &str) -> NetStatistics {
    let mut stats = NetStatistics::default();
    for line in content.lines() {
        let Some((iface, counters)) = line.split_once(':') else {
            continue;
        };
        let iface = iface.trim();
        if iface == "lo" {
            continue;
        }
        let fields: Vec<u64> = match counters
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
        {
            Ok(fields) => fields,
            Err(_) => {
                trace!("skipping net dev line: {:?}", line);
                continue;
            }
        };
        if fields.len() < 10 {
            trace!("skipping short net dev line for {}", iface);
            continue;
        }
        stats.bytes_received += fields[0];
        stats.packets_received += fields[1];
        stats.bytes_sent += fields[8];
        stats.packets_sent += fields[9];
    }
    stats
}

pub fn read_net_statistics(path: &Path) -> Result<NetStatistics, SourceError> {
    let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_net_dev(&content))
}

/// Totals and rates reported after one reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficReport {
    pub received: u64,
    pub sent: u64,
    /// Bytes per second since the previous reading
    pub received_rate: u64,
    pub sent_rate: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TrafficMeter {
    base: NetStatistics,
    last: Option<(NetStatistics, Instant)>,
}

impl TrafficMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one reading taken at `now`
    pub fn update(&mut self, stats: NetStatistics, now: Instant) -> TrafficReport {
        let previous = match self.last {
            Some((last, at))
                if stats.bytes_received >= last.bytes_received
                    && stats.bytes_sent >= last.bytes_sent =>
            {
                Some((last, now.saturating_duration_since(at)))
            }
            Some(_) => {
                debug!("traffic counters went backwards, restarting totals");
                None
            }
            None => None,
        };
        if previous.is_none() {
            self.base = stats;
        }
        self.last = Some((stats, now));

        let mut report = TrafficReport {
            received: stats.bytes_received.saturating_sub(self.base.bytes_received),
            sent: stats.bytes_sent.saturating_sub(self.base.bytes_sent),
            ..TrafficReport::default()
        };
        if let Some((last, elapsed)) =
            previous.filter(|(_, elapsed)| *elapsed > Duration::from_millis(100))
        {
            report.received_rate = per_second(stats.bytes_received - last.bytes_received, elapsed);
            report.sent_rate = per_second(stats.bytes_sent - last.bytes_sent, elapsed);
        }
        report
    }
}

fn per_second(bytes: u64, elapsed: Duration) -> u64 {
    (bytes as f64 / elapsed.as_secs_f64()) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 9000      90    0    0    0     0          0         0     9000      90    0    0    0     0       0          0
  eth0: 1000      10    0    0    0     0          0         0      500       5    0    0    0     0       0          0
 wlan0:  200       2    0    0    0     0          0         0      300       3    0    0    0     0       0          0
";

    fn stats(received: u64, sent: u64) -> NetStatistics {
        NetStatistics {
            bytes_received: received,
            bytes_sent: sent,
            ..NetStatistics::default()
        }
    }

    #[test]
    fn test_parse_skips_loopback() {
        let stats = parse_net_dev(NET_DEV);
        assert_eq!(
            stats,
            NetStatistics {
                bytes_received: 1200,
                packets_received: 12,
                bytes_sent: 800,
                packets_sent: 8,
            }
        );
    }

    #[test]
    fn test_first_reading_is_the_base() {
        let mut meter = TrafficMeter::new();
        let report = meter.update(stats(5000, 7000), Instant::now());
        assert_eq!(report, TrafficReport::default());
    }

    #[test]
    fn test_totals_and_rates() {
        let mut meter = TrafficMeter::new();
        let t0 = Instant::now();
        meter.update(stats(1000, 1000), t0);
        let report = meter.update(stats(3000, 1500), t0 + Duration::from_secs(2));

        assert_eq!(report.received, 2000);
        assert_eq!(report.sent, 500);
        assert_eq!(report.received_rate, 1000);
        assert_eq!(report.sent_rate, 250);
    }

    #[test]
    fn test_counter_reset_restarts_totals() {
        let mut meter = TrafficMeter::new();
        let t0 = Instant::now();
        meter.update(stats(1000, 1000), t0);
        meter.update(stats(4000, 2000), t0 + Duration::from_secs(1));

        let report = meter.update(stats(100, 2500), t0 + Duration::from_secs(2));
        assert_eq!(report, TrafficReport::default());

        let report = meter.update(stats(600, 2600), t0 + Duration::from_secs(3));
        assert_eq!(report.received, 500);
        assert_eq!(report.sent, 100);
        assert_eq!(report.received_rate, 500);
    }
}
