use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::OnceLock,
    thread,
};

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use super::{Engine, EngineError, WorkerStatus};
use crate::error::WorkerError;

const THREAD_NAME: &str = "petri-worker";

type EngineFactory = Box<dyn FnOnce() -> Box<dyn Engine> + Send>;
type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

enum Request {
    Init(Reply<()>),
    Discover {
        log: Vec<u8>,
        is_compressed: bool,
        reply: Reply<String>,
    },
    GraphDescription {
        net_json: String,
        reply: Reply<String>,
    },
    Import {
        text: String,
        reply: Reply<String>,
    },
    Export {
        net_json: String,
        reply: Reply<String>,
    },
}

/// Owner of the computation worker.
///
/// Construct one at startup and share it by reference (usually inside an
/// `Arc`). The worker thread is spawned at most once, by the first
/// [`WorkerBridge::start`]; it stops when the bridge is dropped.
///
/// All engine operations require the worker to be initialized. Calls made in
/// any other state are rejected with [`WorkerError::Unavailable`] and have no
/// side effects.
pub struct WorkerBridge {
    factory: Mutex<Option<EngineFactory>>,
    requests: OnceLock<Sender<Request>>,
    status: watch::Sender<WorkerStatus>,
    in_flight: Mutex<usize>,
}

impl std::fmt::Debug for WorkerBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerBridge")
            .field("status", &self.status())
            .field("in_flight", &*self.in_flight.lock())
            .finish_non_exhaustive()
    }
}

impl WorkerBridge {
    /// Creates an uninitialized bridge. `factory` runs on the worker thread.
    pub fn new<F, E>(factory: F) -> Self
    where
        F: FnOnce() -> E + Send + 'static,
        E: Engine + 'static,
    {
        let factory: EngineFactory = Box::new(move || Box::new(factory()) as Box<dyn Engine>);
        let (status, _) = watch::channel(WorkerStatus::Uninitialized);
        Self {
            factory: Mutex::new(Some(factory)),
            requests: OnceLock::new(),
            status,
            in_flight: Mutex::new(0),
        }
    }

    pub fn status(&self) -> WorkerStatus {
        *self.status.borrow()
    }

    /// Receiver observing every status change.
    pub fn subscribe(&self) -> watch::Receiver<WorkerStatus> {
        self.status.subscribe()
    }

    /// Spawns the worker and runs the engine's `init`.
    ///
    /// Only the first call spawns anything. Later calls wait for the outcome of
    /// the first one.
    pub async fn start(&self) -> Result<(), WorkerError> {
        let factory = self.factory.lock().take();
        let Some(factory) = factory else {
            return self.wait_settled().await;
        };

        self.status.send_replace(WorkerStatus::Initializing);
        debug!("spawning worker");

        let (tx, rx) = unbounded();
        if let Err(e) = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(factory, &rx))
        {
            error!(error = %e, "failed to spawn worker thread");
            self.status.send_replace(WorkerStatus::Error);
            return Err(WorkerError::Engine(e.to_string()));
        }

        let (reply, answer) = oneshot::channel();
        // init is the first request the thread sees
        let sent = tx.send(Request::Init(reply));
        let _ = self.requests.set(tx);
        if sent.is_err() {
            self.status.send_replace(WorkerStatus::Error);
            return Err(WorkerError::Disconnected);
        }

        match answer.await {
            Ok(Ok(())) => {
                info!("worker ready");
                self.status.send_replace(WorkerStatus::Ready);
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "worker init failed");
                self.status.send_replace(WorkerStatus::Error);
                Err(WorkerError::Engine(e.0))
            }
            Err(_) => {
                error!("worker died during init");
                self.status.send_replace(WorkerStatus::Error);
                Err(WorkerError::Disconnected)
            }
        }
    }

    /// Waits until initialization is over. Never resolves if the worker was
    /// never started.
    pub async fn wait_settled(&self) -> Result<(), WorkerError> {
        let mut rx = self.status.subscribe();
        let status = *rx
            .wait_for(|s| s.is_settled())
            .await
            .map_err(|_| WorkerError::Disconnected)?;
        if status.is_available() {
            Ok(())
        } else {
            Err(WorkerError::Unavailable(status))
        }
    }

    /// Discovers a net from an event log. Returns the canonical model as JSON.
    pub async fn discover_from_event_log(
        &self,
        log: Vec<u8>,
        is_compressed: bool,
    ) -> Result<String, WorkerError> {
        self.call("discover_from_event_log", |reply| Request::Discover {
            log,
            is_compressed,
            reply,
        })
        .await
    }

    /// Converts a canonical model (JSON) into a graph description (DOT).
    pub async fn to_graph_description(&self, net_json: String) -> Result<String, WorkerError> {
        self.call("to_graph_description", |reply| Request::GraphDescription {
            net_json,
            reply,
        })
        .await
    }

    /// Converts an exchange format document into a canonical model (JSON).
    pub async fn import_format(&self, text: String) -> Result<String, WorkerError> {
        self.call("import_format", |reply| Request::Import { text, reply })
            .await
    }

    /// Converts a canonical model (JSON) into an exchange format document.
    pub async fn export_format(&self, net_json: String) -> Result<String, WorkerError> {
        self.call("export_format", |reply| Request::Export { net_json, reply })
            .await
    }

    async fn call<T>(
        &self,
        op: &'static str,
        request: impl FnOnce(Reply<T>) -> Request,
    ) -> Result<T, WorkerError> {
        let status = self.status();
        let requests = match self.requests.get() {
            Some(requests) if status.is_available() => requests,
            _ => {
                warn!(op, %status, "worker call rejected");
                return Err(WorkerError::Unavailable(status));
            }
        };

        let (reply, answer) = oneshot::channel();
        let _busy = BusyGuard::enter(self);
        debug!(op, "dispatching to worker");

        if requests.send(request(reply)).is_err() {
            self.status.send_replace(WorkerStatus::Error);
            return Err(WorkerError::Disconnected);
        }

        match answer.await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => {
                warn!(op, error = %e, "engine failure");
                Err(WorkerError::Engine(e.0))
            }
            Err(_) => {
                error!(op, "worker disconnected");
                self.status.send_replace(WorkerStatus::Error);
                Err(WorkerError::Disconnected)
            }
        }
    }
}

/// Reports `Busy` while at least one call is in flight.
struct BusyGuard<'a> {
    bridge: &'a WorkerBridge,
}

impl<'a> BusyGuard<'a> {
    fn enter(bridge: &'a WorkerBridge) -> Self {
        let mut n = bridge.in_flight.lock();
        *n += 1;
        if *n == 1 {
            bridge
                .status
                .send_if_modified(|s| swap(s, WorkerStatus::Ready, WorkerStatus::Busy));
        }
        Self { bridge }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut n = self.bridge.in_flight.lock();
        *n -= 1;
        if *n == 0 {
            self.bridge
                .status
                .send_if_modified(|s| swap(s, WorkerStatus::Busy, WorkerStatus::Ready));
        }
    }
}

fn swap(status: &mut WorkerStatus, from: WorkerStatus, to: WorkerStatus) -> bool {
    if *status == from {
        *status = to;
        true
    } else {
        false
    }
}

/// Worker thread body. Serves requests in arrival order until the bridge is dropped.
fn run(factory: EngineFactory, requests: &Receiver<Request>) {
    let mut engine = match catch_unwind(AssertUnwindSafe(factory)) {
        Ok(engine) => engine,
        Err(panic) => {
            error!(panic = %panic_message(&*panic), "engine construction panicked");
            return;
        }
    };

    for request in requests {
        match request {
            Request::Init(reply) => {
                let _ = reply.send(guarded(|| engine.init()));
            }
            Request::Discover {
                log,
                is_compressed,
                reply,
            } => {
                let res = guarded(|| engine.discover_from_event_log(&log, is_compressed));
                let _ = reply.send(res);
            }
            Request::GraphDescription { net_json, reply } => {
                let _ = reply.send(guarded(|| engine.to_graph_description(&net_json)));
            }
            Request::Import { text, reply } => {
                let _ = reply.send(guarded(|| engine.import_format(&text)));
            }
            Request::Export { net_json, reply } => {
                let _ = reply.send(guarded(|| engine.export_format(&net_json)));
            }
        }
    }

    debug!("worker stopped");
}

/// Turns an engine panic into an ordinary failure.
fn guarded<T>(f: impl FnOnce() -> Result<T, EngineError>) -> Result<T, EngineError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| {
        Err(EngineError(format!(
            "engine panicked: {}",
            panic_message(&*panic)
        )))
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
