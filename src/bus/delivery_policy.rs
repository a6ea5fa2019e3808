//! Backpressure policy for bus delivery
//!
//! Each subscription owns a single-slot queue. When the slot is still
//! occupied at delivery time, the policy decides whether the dispatcher
//! waits for the consumer or discards the record for that subscriber.

use std::fmt;
use std::time::Duration;

/// Policy for a subscriber whose queue is full
///
/// # Example
///
/// ```
/// use fanout_logger::bus::{Bus, DeliveryPolicy};
/// use std::time::Duration;
///
/// // Default: wait for every subscriber, nothing is dropped
/// let bus = Bus::new();
///
/// // Bound how long one stalled subscriber can hold up the others
/// let bus = Bus::with_policy(DeliveryPolicy::BlockWithTimeout(Duration::from_millis(100)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Wait until the subscriber takes the record
    ///
    /// A stalled subscriber delays delivery to the subscribers after it and
    /// to later publishes, but never the publishing caller.
    #[default]
    Block,

    /// Wait up to the timeout, then drop the record for that subscriber
    BlockWithTimeout(Duration),

    /// Never wait; drop the record if the slot is occupied
    DropNewest,
}

impl fmt::Display for DeliveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryPolicy::Block => write!(f, "Block"),
            DeliveryPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            DeliveryPolicy::DropNewest => write!(f, "DropNewest"),
        }
    }
}
