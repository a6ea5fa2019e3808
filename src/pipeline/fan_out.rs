//! Line fan-out: one input stream republished to many sinks through the bus

use super::cancel::CancelToken;
use crate::bus::{Bus, Record, Subscription, GLOBAL_TOPIC};
use crate::core::error::panic_message;
use crate::core::{Debugger, LoggerError, NoopDebugger, Result, Sink};
use crossbeam_channel::select;
use std::io::BufRead;
use std::sync::Arc;
use std::thread;

/// Republishes newline-delimited records from one reader to every sink
///
/// Each sink gets its own subscription and consumer thread. Records reach
/// every sink in the order they were read. The first sink write failure
/// cancels the run and becomes its result; end of input lets every sink
/// drain what was already published, then stops the consumers.
///
/// # Example
///
/// ```
/// use fanout_logger::bus::Bus;
/// use fanout_logger::pipeline::FanOut;
/// use fanout_logger::sinks::{SharedBuffer, WriterSink};
/// use fanout_logger::Sink;
///
/// let a = SharedBuffer::new();
/// let b = SharedBuffer::new();
/// let sinks: Vec<Box<dyn Sink>> = vec![
///     Box::new(WriterSink::new("a", a.clone())),
///     Box::new(WriterSink::new("b", b.clone())),
/// ];
///
/// FanOut::new(Bus::new()).run(&b"1\n2\n3\n"[..], sinks).unwrap();
///
/// assert_eq!(a.contents(), b"1\n2\n3\n");
/// assert_eq!(b.contents(), b"1\n2\n3\n");
/// ```
pub struct FanOut {
    bus: Bus,
    topic: String,
    debugger: Arc<dyn Debugger>,
    cancel: Option<CancelToken>,
}

/// Cancels the run when a consumer unwinds, as a write failure would
struct CancelOnPanic<'a>(&'a CancelToken);

impl Drop for CancelOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.cancel();
        }
    }
}

impl FanOut {
    /// Fan out on the global topic of `bus`
    pub fn new(bus: Bus) -> Self {
        Self {
            bus,
            topic: GLOBAL_TOPIC.to_string(),
            debugger: Arc::new(NoopDebugger),
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Receive lifecycle notices (end of input, sink failures)
    #[must_use]
    pub fn with_debugger(mut self, debugger: Arc<dyn Debugger>) -> Self {
        self.debugger = debugger;
        self
    }

    /// Use `token` as the run's cancellation signal
    ///
    /// Lets the owner of the input observe a sink failure, or stop the run
    /// itself. A token that is already cancelled ends the next run before it
    /// reads anything.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Run until `input` ends or a sink fails
    ///
    /// All consumer threads are joined before this returns. A sink failure
    /// is returned as is; a read failure on `input` is returned as is, or
    /// combined with a sink failure into [`LoggerError::Pipeline`].
    pub fn run<R: BufRead>(&self, mut input: R, sinks: Vec<Box<dyn Sink>>) -> Result<()> {
        let cancel = self.cancel.clone().unwrap_or_default();

        // Subscribe before reading so no record is published ahead of a sink
        let consumers: Vec<(Subscription, Box<dyn Sink>)> = sinks
            .into_iter()
            .map(|sink| (self.bus.subscribe(&self.topic), sink))
            .collect();

        thread::scope(|scope| {
            let handles: Vec<_> = consumers
                .into_iter()
                .map(|(subscription, sink)| {
                    let name = sink.name().to_string();
                    let cancel = cancel.clone();
                    let debugger = Arc::clone(&self.debugger);
                    let handle = scope.spawn(move || {
                        let _guard = CancelOnPanic(&cancel);
                        Self::consume(subscription, sink, &cancel, debugger.as_ref())
                    });
                    (name, handle)
                })
                .collect();

            let scanned = self.scan(&mut input, &cancel);
            // Everything published so far reaches the queues before consumers stop
            self.bus.flush_topic(&self.topic);
            cancel.cancel();

            let mut sink_error = None;
            for (name, handle) in handles {
                let outcome = handle
                    .join()
                    .unwrap_or_else(|payload| {
                        Err(LoggerError::worker_panicked(name, panic_message(payload.as_ref())))
                    });
                if let Err(e) = outcome {
                    sink_error.get_or_insert(e);
                }
            }

            match (scanned, sink_error) {
                (Ok(_), None) => Ok(()),
                (Ok(_), Some(sink)) => Err(sink),
                (Err(scan), None) => Err(scan),
                (Err(scan), Some(sink)) => Err(LoggerError::pipeline(scan, sink)),
            }
        })
    }

    /// Publish every line of `input` until it ends or the run is cancelled
    fn scan<R: BufRead>(&self, input: &mut R, cancel: &CancelToken) -> Result<u64> {
        let mut line = Vec::new();
        let mut published = 0u64;

        while !cancel.is_cancelled() {
            line.clear();
            let read = input.read_until(b'\n', &mut line).map_err(|e| {
                LoggerError::io_operation("scanning fan-out input", e.to_string(), e)
            })?;
            if read == 0 {
                self.debugger
                    .debugf(format_args!("fan-out: input closed after {} records", published));
                return Ok(published);
            }

            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            line.push(b'\n');

            self.bus.publish(&self.topic, Record::from(line.as_slice()));
            published += 1;
        }

        self.debugger
            .debugf(format_args!("fan-out: cancelled after {} records", published));
        Ok(published)
    }

    /// Drain one subscription into one sink
    fn consume(
        subscription: Subscription,
        mut sink: Box<dyn Sink>,
        cancel: &CancelToken,
        debugger: &dyn Debugger,
    ) -> Result<()> {
        let written = Self::write_until_cancelled(&subscription, sink.as_mut(), cancel)
            .and_then(|()| sink.flush());

        if let Err(e) = written {
            debugger.debugf(format_args!("fan-out: sink {} failed: {}", sink.name(), e));
            cancel.cancel();
            subscription.fail(e);
        }

        // Leaving the bus also unblocks a dispatcher waiting on our slot
        subscription.close()
    }

    fn write_until_cancelled(
        subscription: &Subscription,
        sink: &mut dyn Sink,
        cancel: &CancelToken,
    ) -> Result<()> {
        loop {
            select! {
                recv(subscription.data()) -> record => match record {
                    Ok(record) => sink.write_record(&record)?,
                    Err(_) => return Ok(()),
                },
                recv(cancel.receiver()) -> _ => {
                    while let Some(record) = subscription.try_recv() {
                        sink.write_record(&record)?;
                    }
                    return Ok(());
                }
            }
        }
    }
}
