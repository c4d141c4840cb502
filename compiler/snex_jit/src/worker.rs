//! Background compilation.
//!
//! A [`CompileWorker`] owns one thread that compiles requests one at a
//! time, so the caller's thread (typically the one feeding the real-time
//! path) never blocks on the compiler. At most one request waits: a new
//! request replaces a waiting one. A compile that already started always
//! runs to the end, since the backend cannot be interrupted; if a newer
//! request arrived meanwhile its result is dropped instead of delivered.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::debug;

use crate::{CompilationUnit, JitCompiler, JitError};

/// Identifies one [`CompileWorker::request`].
pub type CompileTicket = u64;

/// A finished compile delivered by the worker.
#[derive(Debug)]
pub struct CompileResult {
    pub ticket: CompileTicket,
    pub unit: CompilationUnit,
}

struct Request {
    ticket: CompileTicket,
    source: String,
    name: String,
}

#[derive(Default)]
struct Shared {
    pending: Mutex<Option<Request>>,
    /// Ticket whose result is still wanted.
    latest: AtomicU64,
    next_ticket: AtomicU64,
    discarded: AtomicU64,
    shutdown: AtomicBool,
}

pub struct CompileWorker {
    shared: Arc<Shared>,
    wake: Sender<()>,
    results: Receiver<CompileResult>,
    handle: Option<JoinHandle<()>>,
}

impl CompileWorker {
    /// Start the worker thread.
    pub fn spawn(compiler: JitCompiler) -> Result<Self, JitError> {
        let shared = Arc::new(Shared::default());
        let (wake, wake_rx) = channel::bounded(1);
        let (results_tx, results) = channel::unbounded();
        let handle = thread::Builder::new()
            .name("snex-compile".into())
            .spawn({
                let shared = Arc::clone(&shared);
                move || run(&compiler, &shared, &wake_rx, &results_tx)
            })
            .map_err(|err| JitError::WorkerSpawn(err.to_string()))?;
        Ok(CompileWorker {
            shared,
            wake,
            results,
            handle: Some(handle),
        })
    }

    /// Queue `source` for compilation as unit `name`, replacing any
    /// request that has not started yet.
    pub fn request(&self, source: &str, name: &str) -> Result<CompileTicket, JitError> {
        let ticket = self.shared.next_ticket.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut pending = self.shared.pending.lock();
            self.shared.latest.store(ticket, Ordering::Release);
            let replaced = pending.replace(Request {
                ticket,
                source: source.to_owned(),
                name: name.to_owned(),
            });
            if let Some(old) = replaced {
                self.shared.discarded.fetch_add(1, Ordering::Relaxed);
                debug!(ticket = old.ticket, by = ticket, "pending compile superseded");
            }
        }
        match self.wake.try_send(()) {
            // A full queue already holds a wake-up that will see this request.
            Ok(()) | Err(TrySendError::Full(())) => Ok(ticket),
            Err(TrySendError::Disconnected(())) => Err(JitError::WorkerGone),
        }
    }

    /// Drop the waiting request and the result of the running one.
    pub fn cancel(&self) {
        let ticket = self.shared.next_ticket.fetch_add(1, Ordering::Relaxed) + 1;
        let mut pending = self.shared.pending.lock();
        self.shared.latest.store(ticket, Ordering::Release);
        if pending.take().is_some() {
            self.shared.discarded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Completed compiles, in completion order.
    pub fn results(&self) -> &Receiver<CompileResult> {
        &self.results
    }

    pub fn try_result(&self) -> Option<CompileResult> {
        self.results.try_recv().ok()
    }

    pub fn wait_result(&self, timeout: Duration) -> Option<CompileResult> {
        self.results.recv_timeout(timeout).ok()
    }

    /// Requests replaced before they started plus results dropped after
    /// they finished.
    pub fn discarded(&self) -> u64 {
        self.shared.discarded.load(Ordering::Relaxed)
    }
}

impl Drop for CompileWorker {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        let _ = self.wake.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("compile worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for CompileWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileWorker")
            .field("latest", &self.shared.latest.load(Ordering::Relaxed))
            .field("discarded", &self.discarded())
            .finish_non_exhaustive()
    }
}

fn run(
    compiler: &JitCompiler,
    shared: &Shared,
    wake: &Receiver<()>,
    results: &Sender<CompileResult>,
) {
    while wake.recv().is_ok() {
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        let Some(request) = shared.pending.lock().take() else {
            continue;
        };
        debug!(ticket = request.ticket, unit = %request.name, "background compile");
        let unit = compiler.compile(&request.source, &request.name);
        if shared.latest.load(Ordering::Acquire) != request.ticket {
            shared.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(ticket = request.ticket, "superseded result discarded");
            continue;
        }
        let result = CompileResult {
            ticket: request.ticket,
            unit,
        };
        if results.send(result).is_err() {
            break;
        }
    }
}
