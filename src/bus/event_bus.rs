//! Topic-partitioned publish/subscribe registry

use super::delivery_policy::DeliveryPolicy;
use super::subscription::{Subscription, SubscriptionId};
use super::Record;
use crate::core::{BusMetrics, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

/// Registry entry: the id, the sending half of the subscriber's queue and
/// how to deliver into it
#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    queue: Sender<Record>,
    policy: DeliveryPolicy,
}

enum Job {
    Deliver {
        targets: Vec<Subscriber>,
        payload: Record,
    },
    Barrier(Sender<()>),
}

/// One topic: its subscribers and the job queue of its dispatcher thread
///
/// The dispatcher exits once the topic is removed from the registry (its
/// last subscriber left) and the jobs already queued are done.
struct Topic {
    subscribers: Vec<Subscriber>,
    jobs: Sender<Job>,
}

impl Topic {
    fn spawn(metrics: &Arc<BusMetrics>) -> Self {
        let (jobs, receiver) = unbounded();
        let metrics = Arc::clone(metrics);
        thread::spawn(move || Bus::dispatch(receiver, &metrics));

        Self {
            subscribers: Vec::new(),
            jobs,
        }
    }
}

struct BusInner {
    registry: RwLock<HashMap<String, Topic>>,
    next_id: AtomicU64,
    policy: DeliveryPolicy,
    metrics: Arc<BusMetrics>,
}

/// Broadcast bus fanning each published record out to every subscriber of
/// its topic
///
/// Subscribe and unsubscribe take the registry write lock. Publish takes the
/// read lock only long enough to copy the topic's subscriber list and queue
/// it for the topic's dispatcher thread, so the caller never waits on a
/// subscriber. Each topic has its own dispatcher, started with the topic's
/// first subscription: it runs that topic's publishes one after another and
/// sends to subscribers in registration order, which keeps every
/// subscriber's records in publish order. A stalled subscriber only holds up
/// its own topic.
///
/// The empty topic ([`GLOBAL_TOPIC`](super::GLOBAL_TOPIC)) serves as the
/// un-partitioned bus.
///
/// # Example
///
/// ```
/// use fanout_logger::bus::Bus;
///
/// let bus = Bus::new();
/// let a = bus.subscribe("logs");
/// let b = bus.subscribe("logs");
///
/// bus.publish("logs", b"hello\n".to_vec());
///
/// assert_eq!(a.recv().as_deref(), Some(&b"hello\n"[..]));
/// assert_eq!(b.recv().as_deref(), Some(&b"hello\n"[..]));
/// ```
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Bus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(DeliveryPolicy::default())
    }

    /// Bus whose subscriptions default to `policy`
    #[must_use]
    pub fn with_policy(policy: DeliveryPolicy) -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                policy,
                metrics: Arc::new(BusMetrics::new()),
            }),
        }
    }

    /// Register a new subscription on `topic` with the bus's delivery policy
    pub fn subscribe(&self, topic: &str) -> Subscription {
        self.subscribe_with_policy(topic, self.inner.policy)
    }

    /// Register a new subscription on `topic` delivered under `policy`
    ///
    /// A `DropNewest` subscription never holds up the other subscribers of
    /// its topic, nor [`flush`](Self::flush).
    pub fn subscribe_with_policy(&self, topic: &str, policy: DeliveryPolicy) -> Subscription {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (queue, data) = bounded(1);

        {
            let mut registry = self.inner.registry.write();
            registry
                .entry(topic.to_string())
                .or_insert_with(|| Topic::spawn(&self.inner.metrics))
                .subscribers
                .push(Subscriber { id, queue, policy });
        }

        Subscription::new(id, topic.to_string(), data, self.clone())
    }

    /// Remove the subscription with `id` from `topic`
    ///
    /// Unknown topics and ids are not an error, so repeated calls are no-ops.
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> Result<()> {
        let mut registry = self.inner.registry.write();

        if let Some(entry) = registry.get_mut(topic) {
            if let Some(pos) = entry.subscribers.iter().position(|s| s.id == id) {
                entry.subscribers.remove(pos);
            }
            if entry.subscribers.is_empty() {
                registry.remove(topic);
            }
        }

        Ok(())
    }

    /// Deliver `payload` to every current subscriber of `topic`
    ///
    /// Returns without waiting for delivery. Publishing to a topic nobody
    /// subscribed to does nothing.
    pub fn publish(&self, topic: &str, payload: impl Into<Record>) {
        let registry = self.inner.registry.read();
        let entry = match registry.get(topic) {
            Some(entry) if !entry.subscribers.is_empty() => entry,
            _ => return,
        };

        self.inner.metrics.record_published();
        let job = Job::Deliver {
            targets: entry.subscribers.clone(),
            payload: payload.into(),
        };
        if entry.jobs.send(job).is_err() {
            eprintln!(
                "[LOGGER ERROR] Bus dispatcher for topic '{}' is gone; record not delivered",
                topic
            );
        }
    }

    /// Block until everything published before this call, on every topic,
    /// reached its subscribers' queues (or was skipped by the delivery policy)
    pub fn flush(&self) {
        let jobs: Vec<Sender<Job>> = self
            .inner
            .registry
            .read()
            .values()
            .map(|entry| entry.jobs.clone())
            .collect();
        Self::barrier(&jobs);
    }

    /// Like [`flush`](Self::flush), for `topic` only
    pub fn flush_topic(&self, topic: &str) {
        let jobs: Vec<Sender<Job>> = self
            .inner
            .registry
            .read()
            .get(topic)
            .map(|entry| entry.jobs.clone())
            .into_iter()
            .collect();
        Self::barrier(&jobs);
    }

    fn barrier(jobs: &[Sender<Job>]) {
        let acks: Vec<Receiver<()>> = jobs
            .iter()
            .filter_map(|queue| {
                let (ack, done) = bounded(1);
                queue.send(Job::Barrier(ack)).ok().map(|()| done)
            })
            .collect();
        for done in acks {
            let _ = done.recv();
        }
    }

    /// Number of live subscriptions on `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .registry
            .read()
            .get(topic)
            .map(|entry| entry.subscribers.len())
            .unwrap_or(0)
    }

    /// Topics that currently have at least one subscriber
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.inner.registry.read().keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Delivery policy given to subscriptions made with [`subscribe`](Self::subscribe)
    pub fn policy(&self) -> DeliveryPolicy {
        self.inner.policy
    }

    pub fn metrics(&self) -> &BusMetrics {
        &self.inner.metrics
    }

    fn dispatch(jobs: Receiver<Job>, metrics: &BusMetrics) {
        for job in jobs.iter() {
            match job {
                Job::Deliver { targets, payload } => {
                    for target in &targets {
                        Self::deliver(target, &payload, metrics);
                    }
                }
                Job::Barrier(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    }

    fn deliver(target: &Subscriber, payload: &Record, metrics: &BusMetrics) {
        let record = Arc::clone(payload);

        // A closed queue means the subscription closed after the snapshot was taken
        match target.policy {
            DeliveryPolicy::Block => match target.queue.send(record) {
                Ok(()) => {
                    metrics.record_delivered();
                }
                Err(_) => {
                    metrics.record_undeliverable();
                }
            },
            DeliveryPolicy::BlockWithTimeout(timeout) => {
                match target.queue.send_timeout(record, timeout) {
                    Ok(()) => {
                        metrics.record_delivered();
                    }
                    Err(SendTimeoutError::Timeout(_)) => {
                        metrics.record_dropped();
                    }
                    Err(SendTimeoutError::Disconnected(_)) => {
                        metrics.record_undeliverable();
                    }
                }
            }
            DeliveryPolicy::DropNewest => match target.queue.try_send(record) {
                Ok(()) => {
                    metrics.record_delivered();
                }
                Err(TrySendError::Full(_)) => {
                    metrics.record_dropped();
                }
                Err(TrySendError::Disconnected(_)) => {
                    metrics.record_undeliverable();
                }
            },
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("topics", &self.topics())
            .field("policy", &self.inner.policy)
            .finish()
    }
}
