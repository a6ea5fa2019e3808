//! A single subscriber's handle on the bus

use super::event_bus::Bus;
use super::Record;
use crate::core::{LoggerError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;

/// Identifier issued by [`Bus::subscribe`], unique per bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Live registration on one topic of a [`Bus`]
///
/// Records arrive on a single-slot queue in publish order. Closing (or
/// dropping) the subscription offers the done signal, closes its queues and
/// removes it from the bus; a publish still holding it in a snapshot finds
/// the queue closed and skips it.
///
/// # Example
///
/// ```
/// use fanout_logger::bus::Bus;
///
/// let bus = Bus::new();
/// let sub = bus.subscribe("audit");
///
/// bus.publish("audit", b"hello\n".to_vec());
/// assert_eq!(sub.recv().as_deref(), Some(&b"hello\n"[..]));
///
/// sub.close().unwrap();
/// ```
pub struct Subscription {
    id: SubscriptionId,
    topic: String,
    data: Receiver<Record>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
    error: Mutex<Option<LoggerError>>,
    bus: Bus,
    closed: bool,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, topic: String, data: Receiver<Record>, bus: Bus) -> Self {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        Self {
            id,
            topic,
            data,
            done_tx,
            done_rx,
            error: Mutex::new(None),
            bus,
            closed: false,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The data queue, for use in `crossbeam_channel::select!`
    pub fn data(&self) -> &Receiver<Record> {
        &self.data
    }

    /// Block until the next record arrives
    pub fn recv(&self) -> Option<Record> {
        self.data.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Record> {
        match self.data.recv_timeout(timeout) {
            Ok(record) => Some(record),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<Record> {
        self.data.try_recv().ok()
    }

    /// Signal fired once when the subscription closes
    ///
    /// The receiver yields `()` (or disconnects) after `close`, so other
    /// threads can watch for the end of the subscription.
    pub fn done(&self) -> Receiver<()> {
        self.done_rx.clone()
    }

    /// Store a failure for the owner to report; the first one wins
    pub fn fail(&self, err: LoggerError) {
        let mut slot = self.error.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    /// Take the stored failure, if any
    pub fn take_error(&self) -> Option<LoggerError> {
        self.error.lock().take()
    }

    /// Close the subscription and leave the bus
    ///
    /// Returns the stored failure if one was recorded, otherwise the
    /// unsubscribe result.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let _ = self.done_tx.try_send(());
        let err = self.error.lock().take();
        let unsubscribed = self.bus.unsubscribe(&self.topic, self.id);

        match err {
            Some(err) => Err(err),
            None => unsubscribed,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("pending", &self.data.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            eprintln!("[LOGGER WARNING] Subscription {} dropped with error: {}", self.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_returns_stored_error() {
        let bus = Bus::new();
        let sub = bus.subscribe("t");

        sub.fail(LoggerError::sink_write("buffer", "first"));
        sub.fail(LoggerError::sink_write("buffer", "second"));

        let err = sub.close().unwrap_err();
        assert!(err.to_string().contains("first"));
        assert_eq!(bus.subscriber_count("t"), 0);
    }

    #[test]
    fn test_take_error_drains_slot() {
        let bus = Bus::new();
        let sub = bus.subscribe("t");
        sub.fail(LoggerError::other("x"));

        assert!(sub.take_error().is_some());
        assert!(sub.take_error().is_none());
        assert!(sub.close().is_ok());
    }

    #[test]
    fn test_done_fires_on_close() {
        let bus = Bus::new();
        let sub = bus.subscribe("t");
        let done = sub.done();

        assert!(done.try_recv().is_err());
        sub.close().unwrap();
        assert!(done.recv_timeout(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = Bus::new();
        {
            let _sub = bus.subscribe("t");
            assert_eq!(bus.subscriber_count("t"), 1);
        }
        assert_eq!(bus.subscriber_count("t"), 0);
    }

    #[test]
    fn test_ids_are_distinct() {
        let bus = Bus::new();
        let a = bus.subscribe("t");
        let b = bus.subscribe("t");
        assert_ne!(a.id(), b.id());
        assert!(a.id() < b.id());
    }
}
