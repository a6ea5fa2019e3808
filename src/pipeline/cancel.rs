//! Shared cancellation signal for one pipeline run

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable one-shot cancellation signal
///
/// Cancelling drops the only sender of an internal channel, so every clone's
/// [`receiver`](Self::receiver) becomes ready at once and can be waited on
/// inside `crossbeam_channel::select!` next to a data queue.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    signal: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            trigger: Arc::new(Mutex::new(Some(trigger))),
            signal,
        }
    }

    /// Fire the signal; later calls do nothing
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.trigger.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Receiver that disconnects on cancellation
    pub fn receiver(&self) -> &Receiver<()> {
        &self.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_wakes_every_clone() {
        let token = CancelToken::new();
        let other = token.clone();

        let waiter = std::thread::spawn(move || other.receiver().recv().is_err());

        std::thread::sleep(Duration::from_millis(10));
        token.cancel();
        token.cancel();

        assert!(waiter.join().unwrap());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_not_cancelled_until_fired() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token
            .receiver()
            .recv_timeout(Duration::from_millis(5))
            .unwrap_err()
            .is_timeout());
    }
}
