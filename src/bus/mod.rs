//! In-process event bus
//!
//! One writer, many readers: every record published on a topic is handed to
//! each subscription registered on that topic at publish time.

pub mod delivery_policy;
pub mod event_bus;
pub mod subscription;

pub use delivery_policy::DeliveryPolicy;
pub use event_bus::Bus;
pub use subscription::{Subscription, SubscriptionId};

use std::sync::Arc;

/// A published byte record, shared between all subscribers
pub type Record = Arc<[u8]>;

/// Topic name of the un-partitioned bus
pub const GLOBAL_TOPIC: &str = "";
