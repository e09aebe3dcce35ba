//! Asynchronous dispatcher
//!
//! Producers on any thread `submit` events onto a FIFO queue; one dedicated
//! consumer thread pops them in submission order and fans each one out to
//! every registered sink whose level filter passes. Sink I/O happens only on
//! the consumer thread.
//!
//! A sink that blocks forever stalls the consumer for every sink; accept
//! calls carry no timeout.

use super::{
    error::{LoggerError, Result},
    event::Event,
    log_level::LogLevel,
    metrics::DispatcherMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
    sink::Sink,
};
use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::RwLock;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default wait for the consumer to drain when a running dispatcher is dropped
///
/// An explicit [`AsyncDispatcher::shutdown`] waits without limit.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of queued commands handled per consumer wake-up
const BATCH_SIZE: usize = 64;

enum Command {
    Record(Box<Event>),
    /// Barrier: acknowledged once everything queued before it is delivered
    Flush(Sender<()>),
}

enum State {
    Idle {
        sinks: Vec<Arc<dyn Sink>>,
    },
    Running {
        sender: Sender<Command>,
        handle: thread::JoinHandle<()>,
        sink_count: usize,
    },
    Stopped,
}

pub struct AsyncDispatcher {
    state: RwLock<State>,
    /// `None` means unbounded
    capacity: Option<usize>,
    /// Events below this level are discarded at submission
    min_level: Option<LogLevel>,
    /// Policy for a full bounded queue
    overflow_policy: OverflowPolicy,
    /// Optional callback for overflow notifications
    on_overflow: Option<OverflowCallback>,
    metrics: Arc<DispatcherMetrics>,
}

impl AsyncDispatcher {
    /// Unbounded dispatcher with no sinks; register sinks, then [`start`](Self::start)
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::Idle { sinks: Vec::new() }),
            capacity: None,
            min_level: None,
            overflow_policy: OverflowPolicy::default(),
            on_overflow: None,
            metrics: Arc::new(DispatcherMetrics::new()),
        }
    }

    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Register a sink. Only allowed before the consumer starts.
    ///
    /// # Errors
    ///
    /// [`LoggerError::DispatcherAlreadyStarted`] or
    /// [`LoggerError::DispatcherStopped`] once the dispatcher left its idle state.
    pub fn add_sink(&self, sink: Arc<dyn Sink>) -> Result<()> {
        match &mut *self.state.write() {
            State::Idle { sinks } => {
                sinks.push(sink);
                Ok(())
            }
            State::Running { .. } => Err(LoggerError::DispatcherAlreadyStarted),
            State::Stopped => Err(LoggerError::DispatcherStopped),
        }
    }

    /// Spawn the consumer thread. Called exactly once.
    ///
    /// # Errors
    ///
    /// Fails if the dispatcher is already running or stopped, or the
    /// thread cannot be spawned.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.write();
        let sinks = match &mut *state {
            State::Idle { sinks } => std::mem::take(sinks),
            State::Running { .. } => return Err(LoggerError::DispatcherAlreadyStarted),
            State::Stopped => return Err(LoggerError::DispatcherStopped),
        };

        let (sender, receiver) = match self.capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };
        let sink_count = sinks.len();
        let metrics = Arc::clone(&self.metrics);

        let spawned = thread::Builder::new()
            .name("log-dispatcher".to_string())
            .spawn(move || Self::run_consumer(receiver, sinks, metrics));

        match spawned {
            Ok(handle) => {
                *state = State::Running {
                    sender,
                    handle,
                    sink_count,
                };
                Ok(())
            }
            Err(e) => {
                *state = State::Stopped;
                Err(LoggerError::io_operation(
                    "spawning dispatcher thread",
                    "consumer could not be started",
                    e,
                ))
            }
        }
    }

    /// Enqueue an event for delivery; never waits on sink I/O.
    ///
    /// With a bounded queue, a full queue is handled by the overflow policy;
    /// only `Block` and `BlockWithTimeout` make the caller wait, and then only
    /// for queue space.
    ///
    /// # Errors
    ///
    /// [`LoggerError::DispatcherNotStarted`] before [`start`](Self::start),
    /// [`LoggerError::DispatcherStopped`] after shutdown,
    /// [`LoggerError::QueueFull`] when the event was dropped.
    pub fn submit(&self, event: Event) -> Result<()> {
        let state = self.state.read();
        let sender = self.running_sender(&state)?;

        if !self.accepts_level(event.level()) {
            return Ok(());
        }

        match sender.try_send(Command::Record(Box::new(event))) {
            Ok(()) => {
                self.metrics.record_submitted();
                Ok(())
            }
            Err(TrySendError::Full(command)) => self.handle_overflow(sender, command),
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::DispatcherStopped),
        }
    }

    /// Wait until every event submitted before this call has been delivered
    /// and all sinks have been flushed.
    ///
    /// # Errors
    ///
    /// [`LoggerError::FlushTimeout`] if the consumer does not acknowledge in time.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        let (ack_sender, ack_receiver) = bounded(1);
        {
            let state = self.state.read();
            let sender = self.running_sender(&state)?;
            sender
                .send_timeout(Command::Flush(ack_sender), timeout)
                .map_err(|e| match e {
                    SendTimeoutError::Timeout(_) => LoggerError::FlushTimeout(timeout),
                    SendTimeoutError::Disconnected(_) => LoggerError::DispatcherStopped,
                })?;
        }
        ack_receiver
            .recv_timeout(timeout)
            .map_err(|_| LoggerError::FlushTimeout(timeout))
    }

    /// Drain every queued event, then stop and join the consumer.
    ///
    /// Submissions racing with shutdown either land before the queue closes
    /// and are delivered, or are rejected with `DispatcherStopped`.
    ///
    /// # Errors
    ///
    /// [`LoggerError::DispatcherNotStarted`] if never started,
    /// [`LoggerError::DispatcherStopped`] on a second call,
    /// [`LoggerError::WorkerPanicked`] if the consumer thread died.
    pub fn shutdown(&self) -> Result<()> {
        let previous = {
            let mut state = self.state.write();
            match &*state {
                State::Idle { .. } => return Err(LoggerError::DispatcherNotStarted),
                State::Stopped => return Err(LoggerError::DispatcherStopped),
                State::Running { .. } => std::mem::replace(&mut *state, State::Stopped),
            }
        };

        if let State::Running { sender, handle, .. } = previous {
            // closing the channel lets the consumer finish what is queued
            drop(sender);
            handle
                .join()
                .map_err(|panic| LoggerError::WorkerPanicked(panic_message(&*panic)))?;
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.state.read(), State::Running { .. })
    }

    /// Number of registered sinks
    pub fn sink_count(&self) -> usize {
        match &*self.state.read() {
            State::Idle { sinks } => sinks.len(),
            State::Running { sink_count, .. } => *sink_count,
            State::Stopped => 0,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn min_level(&self) -> Option<LogLevel> {
        self.min_level
    }

    /// Whether an event at `level` passes the queue threshold
    pub fn accepts_level(&self, level: LogLevel) -> bool {
        self.min_level.map_or(true, |min| level >= min)
    }

    /// Get the dispatcher metrics for detailed observability
    pub fn metrics(&self) -> &DispatcherMetrics {
        &self.metrics
    }

    fn running_sender<'a>(&self, state: &'a State) -> Result<&'a Sender<Command>> {
        match state {
            State::Running { sender, .. } => Ok(sender),
            State::Idle { .. } => {
                self.metrics.record_rejected();
                Err(LoggerError::DispatcherNotStarted)
            }
            State::Stopped => {
                self.metrics.record_rejected();
                Err(LoggerError::DispatcherStopped)
            }
        }
    }

    /// Handle a full bounded queue based on the configured policy
    fn handle_overflow(&self, sender: &Sender<Command>, command: Command) -> Result<()> {
        self.metrics.record_queue_full();
        let full = LoggerError::QueueFull {
            capacity: self.capacity.unwrap_or_default(),
        };

        if self.overflow_policy.may_block() {
            self.metrics.record_block();
        }

        match &self.overflow_policy {
            OverflowPolicy::DropNewest => {
                self.metrics.record_dropped();
                Err(full)
            }

            OverflowPolicy::Block => {
                sender
                    .send(command)
                    .map_err(|_| LoggerError::DispatcherStopped)?;
                self.metrics.record_submitted();
                Ok(())
            }

            OverflowPolicy::BlockWithTimeout(timeout) => {
                match sender.send_timeout(command, *timeout) {
                    Ok(()) => {
                        self.metrics.record_submitted();
                        Ok(())
                    }
                    Err(SendTimeoutError::Timeout(_)) => {
                        self.alert_and_drop();
                        Err(full)
                    }
                    Err(SendTimeoutError::Disconnected(_)) => Err(LoggerError::DispatcherStopped),
                }
            }

            OverflowPolicy::AlertAndDrop => {
                self.alert_and_drop();
                Err(full)
            }
        }
    }

    /// Drop an event with alert notification
    fn alert_and_drop(&self) {
        let dropped_count = self.metrics.record_dropped();

        // Alert on first drop and periodically thereafter
        let should_alert = dropped_count == 0 || (dropped_count + 1) % 1000 == 0;

        if should_alert {
            eprintln!(
                "[LOGGER WARNING] Dispatch queue full, {} events dropped. \
                 Consider increasing capacity or using a different overflow policy.",
                dropped_count + 1
            );

            if let Some(ref callback) = self.on_overflow {
                callback(dropped_count + 1);
            }
        }
    }

    fn run_consumer(
        receiver: Receiver<Command>,
        sinks: Vec<Arc<dyn Sink>>,
        metrics: Arc<DispatcherMetrics>,
    ) {
        let mut batch = Vec::with_capacity(BATCH_SIZE);

        // recv only fails once the channel is closed and empty
        while let Ok(command) = receiver.recv() {
            batch.push(command);
            while batch.len() < BATCH_SIZE {
                match receiver.try_recv() {
                    Ok(command) => batch.push(command),
                    Err(_) => break,
                }
            }
            Self::process_batch(&sinks, &mut batch, &metrics);
        }
    }

    fn process_batch(
        sinks: &[Arc<dyn Sink>],
        batch: &mut Vec<Command>,
        metrics: &DispatcherMetrics,
    ) {
        for command in batch.drain(..) {
            match command {
                Command::Record(event) => Self::deliver(sinks, &event, metrics),
                Command::Flush(ack) => {
                    Self::flush_sinks(sinks);
                    // the waiter may have timed out already
                    let _ = ack.send(());
                }
            }
        }
        Self::flush_sinks(sinks);
    }

    /// Offer one event to every sink, isolating failures and panics per sink
    fn deliver(sinks: &[Arc<dyn Sink>], event: &Event, metrics: &DispatcherMetrics) {
        let mut accepted = false;
        for sink in sinks {
            if !sink.accepts_level(event.level()) {
                continue;
            }

            let result = catch_unwind(AssertUnwindSafe(|| sink.accept(event)));
            match result {
                Ok(Ok(())) => accepted = true,
                Ok(Err(e)) => {
                    metrics.record_sink_failure();
                    eprintln!("[LOGGER ERROR] Sink '{}' failed: {}", sink.name(), e);
                }
                Err(panic) => {
                    metrics.record_sink_failure();
                    eprintln!(
                        "[LOGGER CRITICAL] Sink '{}' panicked: {}. \
                         Other sinks continue to function.",
                        sink.name(),
                        panic_message(&*panic)
                    );
                }
            }
        }
        metrics.record_processed();
        if accepted {
            metrics.record_delivered();
        }
    }

    fn flush_sinks(sinks: &[Arc<dyn Sink>]) {
        for sink in sinks {
            match catch_unwind(AssertUnwindSafe(|| sink.flush())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!("[LOGGER ERROR] Sink '{}' flush failed: {}", sink.name(), e);
                }
                Err(panic) => {
                    eprintln!(
                        "[LOGGER CRITICAL] Sink '{}' panicked during flush: {}",
                        sink.name(),
                        panic_message(&*panic)
                    );
                }
            }
        }
    }
}

impl Default for AsyncDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AsyncDispatcher {
    fn drop(&mut self) {
        let previous = std::mem::replace(self.state.get_mut(), State::Stopped);
        let State::Running { sender, handle, .. } = previous else {
            return;
        };

        // Close the channel first so the consumer drains and exits
        drop(sender);

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(panic) = handle.join() {
                    eprintln!(
                        "[LOGGER ERROR] Dispatcher thread panicked during shutdown: {}",
                        panic_message(&*panic)
                    );
                }
                break;
            }

            if start.elapsed() >= DEFAULT_SHUTDOWN_TIMEOUT {
                eprintln!(
                    "[LOGGER WARNING] Dispatcher thread did not finish within {:?}. \
                     Some events may be lost.",
                    DEFAULT_SHUTDOWN_TIMEOUT
                );
                break;
            }

            thread::sleep(Duration::from_millis(10));
        }

        let dropped = self.metrics.dropped();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Dispatcher shutting down with {} dropped events (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Builder for constructing an [`AsyncDispatcher`] with a fluent API
///
/// # Example
/// ```
/// use log_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// let dispatcher = AsyncDispatcher::builder()
///     .sink(Arc::new(ConsoleSink::stdout()))
///     .capacity(1000)
///     .overflow_policy(OverflowPolicy::AlertAndDrop)
///     .on_overflow(Arc::new(|count| {
///         eprintln!("ALERT: {} events dropped", count);
///     }))
///     .build()
///     .unwrap();
/// dispatcher.start().unwrap();
/// dispatcher.shutdown().unwrap();
/// ```
pub struct DispatcherBuilder {
    sinks: Vec<Arc<dyn Sink>>,
    capacity: Option<usize>,
    min_level: Option<LogLevel>,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            capacity: None,
            min_level: None,
            overflow_policy: OverflowPolicy::default(),
            on_overflow: None,
        }
    }

    /// Register a sink
    #[must_use = "builder methods return a new value"]
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Bound the queue; unbounded when never called
    #[must_use = "builder methods return a new value"]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Discard events below `level` before they are queued
    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Policy applied when a bounded queue is full. Default is `AlertAndDrop`.
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Callback invoked with the total dropped count when events are dropped
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Build an idle dispatcher
    ///
    /// # Errors
    ///
    /// Fails on a zero capacity.
    pub fn build(self) -> Result<AsyncDispatcher> {
        if self.capacity == Some(0) {
            return Err(LoggerError::config(
                "AsyncDispatcher",
                "queue capacity must be greater than zero",
            ));
        }

        Ok(AsyncDispatcher {
            state: RwLock::new(State::Idle { sinks: self.sinks }),
            capacity: self.capacity,
            min_level: self.min_level,
            overflow_policy: self.overflow_policy,
            on_overflow: self.on_overflow,
            metrics: Arc::new(DispatcherMetrics::new()),
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
