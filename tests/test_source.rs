use connview::connection::{Column, ConnectionRecord, Operation, Protocol, TcpState};
use connview::filter::FilterState;
use connview::poller::Poller;
use connview::reconcile::{RetentionPolicy, TrackedConnections};
use connview::source::{
    ConnectionSource, JsonSnapshotSource, ProcNetSource, ServiceTable, SourceError, WithServices,
};
use connview::traffic::read_net_statistics;
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const TCP_TABLE: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000:0016 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 1001 1 0000000000000000 100 0 0 10 0
   1: 0100007F:1F90 0100007F:D431 01 00000000:00000000 00:00000000 00000000  1000        0 1002 1 0000000000000000 20 4 30 10 -1
";

const UDP6_TABLE: &str = "  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode ref pointer drops
  5: 00000000000000000000000000000000:14E9 00000000000000000000000000000000:0000 07 00000000:00000000 00:00000000 00000000   108        0 2001 2 0000000000000000 0
";

#[cfg(target_endian = "little")]
#[test]
fn test_proc_net_source_reads_tables() {
    let dir = TempDir::new().expect("create temp dir");
    fs::write(dir.path().join("tcp"), TCP_TABLE).expect("write tcp table");
    fs::write(dir.path().join("udp6"), UDP6_TABLE).expect("write udp6 table");

    let mut source = ProcNetSource::with_root(dir.path());
    let records = source.snapshot().expect("snapshot should succeed");

    assert_eq!(records.len(), 3);

    let listener = &records[0];
    assert_eq!(listener.protocol, Protocol::Tcp);
    assert_eq!(listener.local_address, "*");
    assert_eq!(listener.local_port, 22);
    assert_eq!(listener.state, TcpState::Listen);
    assert_eq!(listener.inode, 1001);

    let loopback = &records[1];
    assert_eq!(loopback.local_address, "127.0.0.1");
    assert_eq!(loopback.remote_port, 54321);
    assert!(loopback.is_established());

    let mdns = &records[2];
    assert_eq!(mdns.protocol, Protocol::Udp6);
    assert_eq!(mdns.local_port, 5353);
    assert_eq!(mdns.state, TcpState::Close);
    assert_eq!(mdns.state_name(), "");
}

#[cfg(target_endian = "little")]
#[test]
fn test_service_names_are_filterable() {
    let dir = TempDir::new().expect("create temp dir");
    fs::write(dir.path().join("tcp"), TCP_TABLE).expect("write tcp table");
    let services_path = dir.path().join("services");
    fs::write(&services_path, "ssh 22/tcp\nhttp-alt 8080/tcp\n").expect("write services");

    let services = ServiceTable::load(&services_path).expect("services should load");
    let mut source = WithServices::new(ProcNetSource::with_root(dir.path()), services);
    let records = source.snapshot().expect("snapshot should succeed");

    assert_eq!(records[0].column_text(Column::LocalPort), "22 ssh");
    assert_eq!(records[1].column_text(Column::LocalPort), "8080 http-alt");
    assert_eq!(records[1].column_text(Column::RemotePort), "54321");

    let columns = [Column::Protocol, Column::LocalPort, Column::RemotePort];
    let filter = FilterState::new("ssh", true, false).expect("valid filter");
    assert!(filter.matches(&records[0].filter_text(&columns)));
    assert!(!filter.matches(&records[1].filter_text(&columns)));

    // digits still anchor on the port column
    let filter = FilterState::new("\" 22 \"", true, true).expect("valid filter");
    assert!(filter.matches(&records[0].filter_text(&columns)));
}

#[test]
fn test_missing_services_file() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("services");

    let err = ServiceTable::load(&path).expect_err("missing file should fail");
    assert!(matches!(err, SourceError::Io { .. }));
    assert!(ServiceTable::load_or_empty(&path).is_empty());
}

#[test]
fn test_net_dev_totals() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("dev");
    fs::write(
        &path,
        "Inter-|   Receive |  Transmit
 face |bytes packets errs drop fifo frame compressed multicast|bytes packets errs drop fifo colls carrier compressed
    lo: 50 1 0 0 0 0 0 0 50 1 0 0 0 0 0 0
  eth0: 4096 4 0 0 0 0 0 0 1024 2 0 0 0 0 0 0
",
    )
    .expect("write net dev");

    let stats = read_net_statistics(&path).expect("stats should load");
    assert_eq!(stats.bytes_received, 4096);
    assert_eq!(stats.packets_sent, 2);
}

#[test]
fn test_json_snapshot_source() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("snapshot.json");
    fs::write(
        &path,
        r#"[
            {"protocol": "tcp", "local_address": "10.0.0.1", "local_port": 5000,
             "remote_address": "1.1.1.1", "remote_port": 443, "state": "ESTABLISHED",
             "pid": 77, "program_name": "curl", "inode": 9},
            {"protocol": "udp6", "local_address": "*", "local_port": 5353}
        ]"#,
    )
    .expect("write snapshot");

    let mut source = JsonSnapshotSource::new(&path);
    let records = source.snapshot().expect("snapshot should load");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].state, TcpState::Established);
    assert_eq!(records[0].program_name.as_deref(), Some("curl"));
    assert_eq!(records[0].operation, Operation::None);
    assert_eq!(records[1].remote_address, "");
    assert_eq!(records[1].state, TcpState::Empty);
}

#[test]
fn test_json_snapshot_errors() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("broken.json");
    fs::write(&path, "[{").expect("write snapshot");

    let err = JsonSnapshotSource::new(&path)
        .snapshot()
        .expect_err("broken json should fail");
    assert!(matches!(err, SourceError::Json { .. }));

    let err = JsonSnapshotSource::read(&dir.path().join("missing.json"))
        .expect_err("missing file should fail");
    assert!(matches!(err, SourceError::Io { .. }));
}

#[test]
fn test_poller_feeds_tracked_set() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("snapshot.json");
    let record = ConnectionRecord::new(Protocol::Tcp, "10.0.0.1", 5000, "1.1.1.1", 443)
        .with_state(TcpState::Established)
        .with_inode(9);
    fs::write(&path, serde_json::to_string(&[&record]).expect("serialize")).expect("write");

    let poller = Poller::spawn(JsonSnapshotSource::new(&path), Duration::from_millis(20))
        .expect("spawn poller");
    let mut tracked = TrackedConnections::new();
    let policy = RetentionPolicy::default();

    let first = poller.wait_latest(Duration::from_secs(5)).expect("first snapshot");
    let summary = tracked.apply_snapshot(&first, &policy, Instant::now(), false);
    assert_eq!(summary.inserted, 1);

    fs::write(&path, "[]").expect("truncate snapshot");
    poller.request_refresh();
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut deleted = 0;
    while deleted == 0 && Instant::now() < deadline {
        if let Some(latest) = poller.wait_latest(Duration::from_millis(200)) {
            deleted = tracked.apply_snapshot(&latest, &policy, Instant::now(), false).deleted;
        }
    }
    poller.stop();

    assert_eq!(deleted, 1);
    assert_eq!(tracked.entries()[0].record.state, TcpState::Closed);
}
