//! Debug/diagnostics channel.
//!
//! A fan-out of compiler and runtime events to any number of listeners.
//! Listeners are called synchronously on the publishing thread; a bounded
//! receiver is available for consumers that must not be called back (an
//! audio thread reading events on its own schedule). Publishing never
//! blocks: a full receiver drops the event and the drop is counted.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};

use crate::LocatedDiagnostic;

/// Log level of a message, lowest first.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        })
    }
}

/// Something that happened while compiled code was executing.
#[derive(Clone, PartialEq, Debug)]
pub enum RuntimeEvent {
    /// An invocation stopped with a runtime fault.
    Fault {
        unit: Arc<str>,
        function: String,
        reason: String,
        message: String,
    },
    /// A unit's entry points were swapped in for execution.
    Bound { unit: Arc<str>, functions: usize },
    /// A unit was released; its handles are now invalid.
    Released { unit: Arc<str> },
}

/// An event published on the channel.
#[derive(Clone, PartialEq, Debug)]
pub enum DebugEvent {
    /// A compiler diagnostic with its resolved location.
    Diagnostic {
        unit: Arc<str>,
        diagnostic: LocatedDiagnostic,
    },
    Runtime(RuntimeEvent),
    /// Free-form log line, e.g. optimization traces.
    Trace {
        unit: Arc<str>,
        level: LogLevel,
        message: String,
    },
}

impl DebugEvent {
    pub fn level(&self) -> LogLevel {
        match self {
            DebugEvent::Diagnostic { diagnostic, .. } => match diagnostic.diagnostic.severity {
                crate::Severity::Error => LogLevel::Error,
                crate::Severity::Warning => LogLevel::Warning,
                crate::Severity::Info => LogLevel::Info,
            },
            DebugEvent::Runtime(RuntimeEvent::Fault { .. }) => LogLevel::Error,
            DebugEvent::Runtime(_) => LogLevel::Info,
            DebugEvent::Trace { level, .. } => *level,
        }
    }
}

/// Receives events synchronously from [`DebugChannel::publish`].
pub trait DebugListener: Send + Sync {
    fn on_event(&self, event: &DebugEvent);
}

impl<F> DebugListener for F
where
    F: Fn(&DebugEvent) + Send + Sync,
{
    fn on_event(&self, event: &DebugEvent) {
        self(event);
    }
}

/// Handle returned by [`DebugChannel::subscribe`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ListenerId(u64);

#[derive(Default)]
struct ChannelInner {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn DebugListener>)>>,
    receivers: Mutex<Vec<Sender<DebugEvent>>>,
    next_id: AtomicU64,
    dropped: AtomicU64,
    published: AtomicU64,
}

/// Cloneable handle to a shared event fan-out.
#[derive(Clone, Default)]
pub struct DebugChannel {
    inner: Arc<ChannelInner>,
}

impl DebugChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn DebugListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, listener));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// A bounded queue fed with every later event.
    ///
    /// When the queue is full the event is dropped for this receiver only.
    /// Dropping the receiver detaches it.
    pub fn bounded_receiver(&self, capacity: usize) -> Receiver<DebugEvent> {
        let (tx, rx) = channel::bounded(capacity.max(1));
        self.inner.receivers.lock().push(tx);
        rx
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    pub fn publish(&self, event: DebugEvent) {
        self.inner.published.fetch_add(1, Ordering::Relaxed);

        let listeners: Vec<Arc<dyn DebugListener>> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        let mut consumed = !listeners.is_empty();
        for listener in &listeners {
            listener.on_event(&event);
        }

        let mut receivers = self.inner.receivers.lock();
        receivers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                consumed = true;
                true
            }
            Err(TrySendError::Full(_)) => {
                consumed = true;
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });

        if !consumed {
            tracing::trace!(level = %event.level(), "debug event without consumer dropped");
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Publish a free-form message, the way `logMessage(level, msg)` did.
    pub fn log(&self, unit: &Arc<str>, level: LogLevel, message: impl Into<String>) {
        self.publish(DebugEvent::Trace {
            unit: Arc::clone(unit),
            level,
            message: message.into(),
        });
    }

    /// Events that reached no consumer or hit a full receiver.
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn published_count(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for DebugChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugChannel")
            .field("listeners", &self.listener_count())
            .field("published", &self.published_count())
            .field("dropped", &self.dropped_count())
            .finish()
    }
}

#[cfg(test)]
mod tests;
