//! Snapshot reconciliation
//!
//! Each poll produces a full snapshot of the socket tables. [`reconcile`]
//! folds that snapshot into the tracked set and tags every tracked record
//! with the [`Operation`] a renderer has to apply for this cycle:
//!
//! ```text
//! insert   new socket, appended to the tracked set
//! update   matched, state, pid or inode changed (fields merged)
//! none     matched, nothing to redraw
//! delete   not seen in this snapshot; kept for the eviction policy
//! ```
//!
//! Sockets have no reliable identity across polls, so matching is best
//! effort: an exact pass (inode included) runs first, then a fuzzy pass that
//! tolerates an unknown inode on either side. Both passes take the first
//! candidate in tracked order.

use crate::connection::{Column, ConnectionRecord, Operation, TcpState};
use crate::filter::FilterState;
use log::debug;
use std::time::{Duration, Instant};

/// Access to the connection record inside a tracked-set entry.
///
/// Lets the reconciler work on bare records as well as on entries that carry
/// presentation state owned by the consumer.
pub trait TrackedEntry {
    fn record(&self) -> &ConnectionRecord;
    fn record_mut(&mut self) -> &mut ConnectionRecord;
    /// Build a new entry for an inserted record
    fn from_record(record: ConnectionRecord) -> Self;
}

impl TrackedEntry for ConnectionRecord {
    fn record(&self) -> &ConnectionRecord {
        self
    }

    fn record_mut(&mut self) -> &mut ConnectionRecord {
        self
    }

    fn from_record(record: ConnectionRecord) -> Self {
        record
    }
}

/// Per-cycle operation counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

/// Fold `latest` into `tracked`, tagging every record touched this cycle.
///
/// Records already tagged [`Operation::Delete`] by an earlier cycle are left
/// alone; evicting them is up to the caller.
pub fn reconcile<E: TrackedEntry>(tracked: &mut Vec<E>, latest: &[ConnectionRecord]) -> CycleSummary {
    let mut summary = CycleSummary::default();

    let mut pool: Vec<usize> = Vec::with_capacity(tracked.len());
    for (idx, entry) in tracked.iter_mut().enumerate() {
        let record = entry.record_mut();
        if record.operation != Operation::Delete {
            record.operation = Operation::Delete;
            pool.push(idx);
        }
    }

    let mut consumed = vec![false; latest.len()];

    for (new_idx, new_conn) in latest.iter().enumerate() {
        let hit = pool
            .iter()
            .position(|&idx| tracked[idx].record().equals_exact(new_conn));
        if let Some(slot) = hit {
            let idx = pool.remove(slot);
            apply_match(tracked[idx].record_mut(), new_conn, &mut summary);
            consumed[new_idx] = true;
        }
    }

    for (new_idx, new_conn) in latest.iter().enumerate() {
        if consumed[new_idx] {
            continue;
        }
        let hit = pool
            .iter()
            .position(|&idx| tracked[idx].record().equals_fuzzy(new_conn));
        match hit {
            Some(slot) => {
                let idx = pool.remove(slot);
                apply_match(tracked[idx].record_mut(), new_conn, &mut summary);
            }
            None => {
                let mut added = new_conn.clone();
                added.operation = Operation::Insert;
                tracked.push(E::from_record(added));
                summary.inserted += 1;
            }
        }
    }

    summary.deleted = pool.len();
    debug!(
        "reconciled {} latest records: {} inserted, {} updated, {} unchanged, {} deleted",
        latest.len(),
        summary.inserted,
        summary.updated,
        summary.unchanged,
        summary.deleted
    );
    summary
}

fn apply_match(old_conn: &mut ConnectionRecord, new_conn: &ConnectionRecord, summary: &mut CycleSummary) {
    // a fuzzy hit may learn (or lose) the inode; keep the tracked one current
    if old_conn.info_equals(new_conn) && old_conn.inode == new_conn.inode {
        old_conn.operation = Operation::None;
        summary.unchanged += 1;
    } else {
        old_conn.merge_from(new_conn);
        old_conn.operation = Operation::Update;
        summary.updated += 1;
    }
}

/// When closed (delete-tagged) connections leave the tracked set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Keep closed connections visible for `closed_linger` before eviction
    pub show_closed: bool,
    /// Never evict closed connections
    pub keep_closed: bool,
    pub closed_linger: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            show_closed: true,
            keep_closed: true,
            closed_linger: Duration::from_secs(3),
        }
    }
}

/// A tracked record plus the time it was first seen closed
#[derive(Debug, Clone)]
pub struct TrackedConnection {
    pub record: ConnectionRecord,
    pub closed_at: Option<Instant>,
}

impl TrackedEntry for TrackedConnection {
    fn record(&self) -> &ConnectionRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut ConnectionRecord {
        &mut self.record
    }

    fn from_record(record: ConnectionRecord) -> Self {
        Self {
            record,
            closed_at: None,
        }
    }
}

/// The tracked set kept across polls, with its eviction housekeeping
#[derive(Debug, Default)]
pub struct TrackedConnections {
    entries: Vec<TrackedConnection>,
}

impl TrackedConnections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TrackedConnection] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ConnectionRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    /// Reconcile without any eviction or close stamping
    pub fn reconcile(&mut self, latest: &[ConnectionRecord]) -> CycleSummary {
        reconcile(&mut self.entries, latest)
    }

    /// Run one poll cycle: expire lingering closed connections, reconcile,
    /// stamp newly closed ones and apply the eviction policy.
    ///
    /// `manual` marks a user-requested refresh, which expires closed
    /// connections without waiting for the linger interval.
    pub fn apply_snapshot(
        &mut self,
        latest: &[ConnectionRecord],
        policy: &RetentionPolicy,
        now: Instant,
        manual: bool,
    ) -> CycleSummary {
        if policy.show_closed {
            self.purge_expired(policy, now, manual);
        }

        let summary = reconcile(&mut self.entries, latest);
        self.mark_closed(now);

        if !policy.show_closed {
            self.purge_closed(policy);
        }
        summary
    }

    /// First cycle a record is seen deleted: force CLOSED and stamp the time.
    pub fn mark_closed(&mut self, now: Instant) {
        for entry in &mut self.entries {
            if entry.record.operation == Operation::Delete && entry.closed_at.is_none() {
                entry.closed_at = Some(now);
                entry.record.state = TcpState::Closed;
            }
        }
    }

    /// Evict closed connections whose linger interval elapsed
    pub fn purge_expired(&mut self, policy: &RetentionPolicy, now: Instant, manual: bool) {
        if policy.keep_closed {
            return;
        }
        let before = self.entries.len();
        self.entries.retain(|entry| {
            if entry.record.operation != Operation::Delete {
                return true;
            }
            let expired = match entry.closed_at {
                Some(closed_at) => manual || now.duration_since(closed_at) > policy.closed_linger,
                None => manual,
            };
            !expired
        });
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!("evicted {} expired closed connections", evicted);
        }
    }

    /// Evict every closed connection at once
    pub fn purge_closed(&mut self, policy: &RetentionPolicy) {
        if policy.keep_closed {
            return;
        }
        self.entries
            .retain(|entry| entry.record.operation != Operation::Delete);
    }

    /// `(valid, established)` over connections not tagged delete
    pub fn counts(&self) -> (usize, usize) {
        self.records()
            .filter(|r| r.operation != Operation::Delete)
            .fold((0, 0), |(valid, established), r| {
                (valid + 1, established + usize::from(r.is_established()))
            })
    }
}

/// Whether a row is shown: established (or unestablished rows allowed) and
/// its `columns` text passes the filter.
pub fn is_visible(
    record: &ConnectionRecord,
    show_unestablished: bool,
    filter: &FilterState,
    columns: &[Column],
) -> bool {
    (show_unestablished || record.is_established()) && filter.matches(&record.filter_text(columns))
}
