//! Background polling with a single-slot handoff.
//!
//! The producer thread stores each snapshot in a slot the consumer drains.
//! A snapshot the consumer has not taken yet is replaced by the newer one,
//! so a slow consumer always reconciles the freshest state and never a
//! backlog.

use crate::connection::ConnectionRecord;
use crate::source::ConnectionSource;
use log::{debug, trace, warn};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Default)]
struct Slot {
    latest: Option<Vec<ConnectionRecord>>,
    refresh: bool,
    stop: bool,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    /// Signalled when a snapshot lands in the slot
    ready: Condvar,
    /// Signalled to cut the producer's sleep short
    wake: Condvar,
}

pub struct Poller {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Start polling `source` every `interval`, beginning immediately.
    pub fn spawn<S>(mut source: S, interval: Duration) -> std::io::Result<Self>
    where
        S: ConnectionSource + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let producer = Arc::clone(&shared);

        let handle = thread::Builder::new()
            .name("connview-poller".to_string())
            .spawn(move || {
                debug!("poller started, interval {:?}", interval);
                loop {
                    let snapshot = source.snapshot();

                    let mut slot = producer.slot.lock();
                    if slot.stop {
                        break;
                    }
                    match snapshot {
                        Ok(records) => {
                            if slot.latest.is_some() {
                                trace!("unconsumed snapshot superseded");
                            }
                            slot.latest = Some(records);
                            producer.ready.notify_all();
                        }
                        Err(err) => warn!("poll failed: {}", err),
                    }

                    let deadline = Instant::now() + interval;
                    while !slot.refresh && !slot.stop {
                        if producer.wake.wait_until(&mut slot, deadline).timed_out() {
                            break;
                        }
                    }
                    slot.refresh = false;
                    if slot.stop {
                        break;
                    }
                }
                debug!("poller stopped");
            })?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// The pending snapshot, if one arrived since the last take
    pub fn take_latest(&self) -> Option<Vec<ConnectionRecord>> {
        self.shared.slot.lock().latest.take()
    }

    /// Block until a snapshot is available or `timeout` elapses.
    pub fn wait_latest(&self, timeout: Duration) -> Option<Vec<ConnectionRecord>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        while slot.latest.is_none() {
            if self.shared.ready.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        slot.latest.take()
    }

    /// Poll again now instead of waiting out the interval
    pub fn request_refresh(&self) {
        self.shared.slot.lock().refresh = true;
        self.shared.wake.notify_all();
    }

    /// Stop the producer and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.shared.slot.lock().stop = true;
        self.shared.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("poller thread panicked");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
