use super::{ConnectionSource, SourceError};
use crate::connection::{ConnectionRecord, Protocol};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_SERVICES_FILE: &str = "/etc/services";

/// Service names keyed by `port/proto`, as listed in a services database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceTable {
    names: HashMap<String, String>,
}

impl ServiceTable {
    /// Parse the text of a services file.
    ///
    /// Each line reads `name port/proto [aliases...] [# comment]`. Lines that
    /// do not fit are skipped. A later entry for the same `port/proto` wins.
    pub fn parse(content: &str) -> Self {
        let mut names = HashMap::new();
        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default();
            let mut fields = line.split_whitespace();
            let (Some(name), Some(key)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Some((port, proto)) = key.split_once('/') else {
                continue;
            };
            let Ok(port) = port.parse::<u16>() else {
                continue;
            };
            names.insert(format!("{port}/{proto}"), name.to_string());
        }
        Self { names }
    }

    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Load `path`, falling back to an empty table when it cannot be read
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(table) => {
                debug!("loaded {} services from {}", table.len(), path.display());
                table
            }
            Err(err) => {
                debug!("no service names: {}", err);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Service name of `port`; tcp6/udp6 share the tcp/udp entries
    pub fn lookup(&self, protocol: Protocol, port: u16) -> Option<&str> {
        if port == 0 {
            return None;
        }
        self.names
            .get(&format!("{}/{}", port, protocol.service_protocol()))
            .map(String::as_str)
    }

    /// Fill in the service names of both ports
    pub fn annotate(&self, record: &mut ConnectionRecord) {
        record.local_service = self
            .lookup(record.protocol, record.local_port)
            .map(str::to_string);
        record.remote_service = self
            .lookup(record.protocol, record.remote_port)
            .map(str::to_string);
    }
}

/// Wraps a source and names the ports of every record it produces
#[derive(Debug)]
pub struct WithServices<S> {
    inner: S,
    services: ServiceTable,
}

impl<S> WithServices<S> {
    pub fn new(inner: S, services: ServiceTable) -> Self {
        Self { inner, services }
    }
}

impl<S: ConnectionSource> ConnectionSource for WithServices<S> {
    fn snapshot(&mut self) -> Result<Vec<ConnectionRecord>, SourceError> {
        let mut records = self.inner.snapshot()?;
        for record in &mut records {
            self.services.annotate(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICES: &str = "\
# Network services, Internet style
ssh             22/tcp                          # SSH Remote Login Protocol
domain          53/tcp
domain          53/udp
https           443/tcp
https           443/udp         http3
mdns            5353/udp                        # Multicast DNS
broken          notaport/tcp
lonely
";

    #[test]
    fn test_parse_skips_comments_and_junk() {
        let table = ServiceTable::parse(SERVICES);
        assert_eq!(table.len(), 6);
        assert_eq!(table.lookup(Protocol::Tcp, 22), Some("ssh"));
        assert_eq!(table.lookup(Protocol::Udp, 22), None);
    }

    #[test]
    fn test_ipv6_protocols_share_entries() {
        let table = ServiceTable::parse(SERVICES);
        assert_eq!(table.lookup(Protocol::Tcp6, 443), Some("https"));
        assert_eq!(table.lookup(Protocol::Udp6, 5353), Some("mdns"));
        assert_eq!(table.lookup(Protocol::Tcp6, 5353), None);
    }

    #[test]
    fn test_wildcard_port_has_no_service() {
        let table = ServiceTable::parse("zero 0/tcp\n");
        assert_eq!(table.lookup(Protocol::Tcp, 0), None);
    }

    #[test]
    fn test_later_entry_wins() {
        let table = ServiceTable::parse("old 8080/tcp\nnew 8080/tcp\n");
        assert_eq!(table.lookup(Protocol::Tcp, 8080), Some("new"));
    }

    #[test]
    fn test_annotate_names_both_ports() {
        let table = ServiceTable::parse(SERVICES);
        let mut record = ConnectionRecord::new(Protocol::Tcp, "10.0.0.1", 50000, "1.1.1.1", 443);
        table.annotate(&mut record);

        assert_eq!(record.local_service, None);
        assert_eq!(record.remote_service.as_deref(), Some("https"));
    }
}
