use super::{ConnectionSource, SourceError};
use crate::connection::{ConnectionRecord, Protocol, TcpState};
use log::{debug, trace};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::sync::LazyLock;

// sl local rem st tx:rx tr:when retrnsmt uid timeout inode
static TABLE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*\d+:\s+([0-9A-Fa-f]{8}|[0-9A-Fa-f]{32}):([0-9A-Fa-f]{4})\s+([0-9A-Fa-f]{8}|[0-9A-Fa-f]{32}):([0-9A-Fa-f]{4})\s+([0-9A-Fa-f]{2})\s+\S+\s+\S+\s+\S+\s+\d+\s+\d+\s+(\d+)",
    )
    .expect("valid socket table regex")
});

/// Reads the kernel socket tables under `/proc/net`.
///
/// Process ownership is not resolved: records carry the socket inode only.
#[derive(Debug, Clone)]
pub struct ProcNetSource {
    root: PathBuf,
}

impl Default for ProcNetSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcNetSource {
    pub fn new() -> Self {
        Self::with_root("/proc/net")
    }

    /// Read `tcp`, `tcp6`, `udp` and `udp6` from `root` instead
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ConnectionSource for ProcNetSource {
    fn snapshot(&mut self) -> Result<Vec<ConnectionRecord>, SourceError> {
        let mut records = Vec::new();
        for protocol in Protocol::ALL {
            let path = self.root.join(protocol.name());
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                // no IPv6 stack, for instance
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!("socket table {} not present", path.display());
                    continue;
                }
                Err(source) => return Err(SourceError::Io { path, source }),
            };
            records.extend(parse_table(protocol, &content));
        }
        Ok(records)
    }
}

/// Parse the text of one socket table. The header and malformed lines are
/// skipped.
pub fn parse_table(protocol: Protocol, content: &str) -> Vec<ConnectionRecord> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parsed = parse_line(protocol, line);
            if parsed.is_none() {
                trace!("skipping {} table line: {:?}", protocol, line);
            }
            parsed
        })
        .collect()
}

fn parse_line(protocol: Protocol, line: &str) -> Option<ConnectionRecord> {
    let caps = TABLE_LINE_RE.captures(line)?;
    let local_address = decode_address(&caps[1])?;
    let local_port = u16::from_str_radix(&caps[2], 16).ok()?;
    let remote_address = decode_address(&caps[3])?;
    let remote_port = u16::from_str_radix(&caps[4], 16).ok()?;
    let state = TcpState::from_kernel(u8::from_str_radix(&caps[5], 16).ok()?);
    let inode = caps[6].parse().ok()?;

    Some(
        ConnectionRecord::new(protocol, local_address, local_port, remote_address, remote_port)
            .with_state(state)
            .with_inode(inode),
    )
}

/// Kernel tables print each 32-bit word of the address in host byte order.
fn decode_address(hex: &str) -> Option<String> {
    if hex.bytes().all(|b| b == b'0') {
        return Some("*".to_string());
    }

    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(8) {
        let word = u32::from_str_radix(hex.get(i..i + 8)?, 16).ok()?;
        bytes.extend_from_slice(&word.to_ne_bytes());
    }

    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(Ipv4Addr::from(octets).to_string())
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(Ipv6Addr::from(octets).to_string())
        }
        _ => None,
    }
}
