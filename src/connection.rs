use std::cmp::Ordering;
use std::net::{Ipv4Addr, Ipv6Addr};

mod entities;

pub use entities::{
    Column, ConnectionRecord, Operation, Protocol, TcpState, full_port_text, port_text,
};

/// Order two textual addresses for sorting.
///
/// `*` and other one-character strings compare as text. Addresses of the same
/// family compare numerically, and IPv4 sorts before IPv6. tcp6/udp6 sockets
/// may carry plain IPv4 text, so the family is taken from the text itself.
pub fn compare_addresses(addr1: &str, addr2: &str) -> Ordering {
    if addr1.len() <= 1 || addr2.len() <= 1 {
        return addr1.cmp(addr2);
    }

    let v6_1 = addr1.contains(':');
    let v6_2 = addr2.contains(':');
    match (v6_1, v6_2) {
        (false, false) => {
            let a = addr1.parse::<Ipv4Addr>().unwrap_or(Ipv4Addr::UNSPECIFIED);
            let b = addr2.parse::<Ipv4Addr>().unwrap_or(Ipv4Addr::UNSPECIFIED);
            a.cmp(&b)
        }
        (true, true) => {
            let a = addr1.parse::<Ipv6Addr>().unwrap_or(Ipv6Addr::UNSPECIFIED);
            let b = addr2.parse::<Ipv6Addr>().unwrap_or(Ipv6Addr::UNSPECIFIED);
            a.cmp(&b)
        }
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
    }
}

/// Order host names so that domains sort before their subdomains.
///
/// Labels are compared right to left: `example.com` < `a.example.com` <
/// `b.example.com`. An empty name sorts first.
pub fn compare_hosts(host1: &str, host2: &str) -> Ordering {
    if host1.is_empty() || host2.is_empty() {
        return host1.len().cmp(&host2.len());
    }

    let mut labels1 = host1.rsplit('.');
    let mut labels2 = host2.rsplit('.');
    loop {
        match (labels1.next(), labels2.next()) {
            (Some(a), Some(b)) => {
                let ord = if a.is_empty() || b.is_empty() {
                    a.len().cmp(&b.len())
                } else {
                    a.cmp(b)
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}
