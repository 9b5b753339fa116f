//! Background loading with supersede semantics.
//!
//! A [`VolumeLoader`] owns a driver task holding the [`LoadStateMachine`].
//! Callers send requests without blocking; the driver runs at most one
//! pipeline task at a time and publishes only the result of the most
//! recently issued request.

mod state;

pub use state::{Completion, LoadStateMachine, LoaderStatus};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, VolumeError};
use crate::source::VolumePipeline;
use crate::types::{LoadRequest, LoadResult};

/// Capacity of the outcome event channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Outcome of a published load.
#[derive(Debug, Clone)]
pub enum LoadEvent {
    Succeeded(Arc<LoadResult>),
    Failed(Arc<LoadResult>),
}

impl LoadEvent {
    pub fn result(&self) -> &Arc<LoadResult> {
        match self {
            Self::Succeeded(result) | Self::Failed(result) => result,
        }
    }
}

/// Counters of loader activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Pipeline tasks started.
    pub launched: u64,
    /// Successful results made visible.
    pub published: u64,
    /// Failed results reported.
    pub failed: u64,
    /// Results dropped because a newer request arrived.
    pub discarded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    launched: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> LoaderStats {
        LoaderStats {
            launched: self.launched.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

type Published = Option<Arc<LoadResult>>;

/// Loads volumes in the background, one at a time.
///
/// Must be created inside a tokio runtime.
///
/// # Example
///
/// ```ignore
/// let loader = VolumeLoader::new(VolumePipeline::new(LoaderConfig::from_env())?);
/// let mut events = loader.subscribe();
/// loader.request_load(request)?;
/// match events.recv().await? {
///     LoadEvent::Succeeded(result) => render(&result.data),
///     LoadEvent::Failed(result) => eprintln!("{:?}", result.error),
/// }
/// ```
#[derive(Debug)]
pub struct VolumeLoader {
    requests: mpsc::UnboundedSender<LoadRequest>,
    published: watch::Receiver<Published>,
    status: watch::Receiver<LoaderStatus>,
    events: broadcast::Sender<LoadEvent>,
    counters: Arc<Counters>,
    driver: JoinHandle<()>,
}

impl VolumeLoader {
    /// Start a loader with nothing published.
    pub fn new(pipeline: VolumePipeline) -> Self {
        Self::start(pipeline, None, Counters::default())
    }

    /// Run `request` to completion, publish it if it succeeds, then start
    /// the loader.
    pub async fn preloaded(pipeline: VolumePipeline, request: LoadRequest) -> Self {
        let counters = Counters::default();
        counters.launched.fetch_add(1, Ordering::Relaxed);

        let result = pipeline.load(&request).await;
        let initial = if result.success {
            counters.published.fetch_add(1, Ordering::Relaxed);
            Some(Arc::new(result))
        } else {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(source = %request.source, "Initial volume failed to load");
            None
        };

        Self::start(pipeline, initial, counters)
    }

    fn start(pipeline: VolumePipeline, initial: Published, counters: Counters) -> Self {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::channel(1);
        let (published_tx, published_rx) = watch::channel(initial);
        let (status_tx, status_rx) = watch::channel(LoaderStatus::Idle);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let counters = Arc::new(counters);

        let driver = Driver {
            pipeline,
            machine: LoadStateMachine::new(),
            requests: requests_rx,
            completions: completions_rx,
            completions_tx,
            published: published_tx,
            status: status_tx,
            events: events_tx.clone(),
            counters: Arc::clone(&counters),
        };

        Self {
            requests: requests_tx,
            published: published_rx,
            status: status_rx,
            events: events_tx,
            counters,
            driver: tokio::spawn(driver.run()),
        }
    }

    /// Submit a request. Never blocks; the request supersedes any request
    /// still waiting for the task slot.
    pub fn request_load(&self, request: LoadRequest) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| VolumeError::LoaderClosed)
    }

    /// The most recently published successful result.
    pub fn published(&self) -> Option<Arc<LoadResult>> {
        self.published.borrow().clone()
    }

    /// Watch the published result for changes.
    pub fn published_changes(&self) -> watch::Receiver<Option<Arc<LoadResult>>> {
        self.published.clone()
    }

    /// Current status of the task slot.
    pub fn status(&self) -> LoaderStatus {
        *self.status.borrow()
    }

    /// Watch the status for changes.
    pub fn status_changes(&self) -> watch::Receiver<LoaderStatus> {
        self.status.clone()
    }

    /// Receive an event for every published outcome from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> LoaderStats {
        self.counters.snapshot()
    }

    /// Stop accepting requests and wait for work in flight (including a
    /// pending rerun) to finish and be published. Returns the final counters.
    pub async fn shutdown(self) -> LoaderStats {
        let Self {
            requests,
            driver,
            counters,
            ..
        } = self;
        drop(requests);
        if let Err(e) = driver.await {
            warn!(error = %e, "Loader driver task failed");
        }
        counters.snapshot()
    }
}

/// Owns the state machine; the only writer of published state.
struct Driver {
    pipeline: VolumePipeline,
    machine: LoadStateMachine,
    requests: mpsc::UnboundedReceiver<LoadRequest>,
    completions: mpsc::Receiver<LoadResult>,
    completions_tx: mpsc::Sender<LoadResult>,
    published: watch::Sender<Published>,
    status: watch::Sender<LoaderStatus>,
    events: broadcast::Sender<LoadEvent>,
    counters: Arc<Counters>,
}

impl Driver {
    async fn run(mut self) {
        let mut accepting = true;
        loop {
            tokio::select! {
                request = self.requests.recv(), if accepting => match request {
                    Some(request) => self.on_request(request),
                    None => {
                        debug!("Request channel closed");
                        accepting = false;
                    }
                },
                Some(result) = self.completions.recv() => self.on_task_complete(result),
                else => break,
            }

            if !accepting && self.machine.is_idle() {
                break;
            }
        }
        debug!("Loader driver stopped");
    }

    fn on_request(&mut self, request: LoadRequest) {
        let launch = self.machine.request_load(request);
        self.sync_status();
        if let Some(request) = launch {
            self.launch(request);
        }
    }

    fn on_task_complete(&mut self, result: LoadResult) {
        let completion = self.machine.on_task_complete(result);
        self.sync_status();
        match completion {
            Completion::Rerun(request) => {
                self.counters.discarded.fetch_add(1, Ordering::Relaxed);
                debug!(source = %request.source, "Discarded superseded result");
                self.launch(request);
            }
            Completion::Publish(result) => self.publish(Arc::new(result)),
        }
    }

    fn sync_status(&self) {
        self.status.send_replace(self.machine.status());
    }

    fn publish(&self, result: Arc<LoadResult>) {
        let event = if result.success {
            self.counters.published.fetch_add(1, Ordering::Relaxed);
            info!(source = %result.source, dims = %result.dims, "Published volume");
            self.published.send_replace(Some(Arc::clone(&result)));
            LoadEvent::Succeeded(result)
        } else {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(
                source = %result.source,
                error = ?result.error,
                "Load failed, keeping published volume"
            );
            LoadEvent::Failed(result)
        };
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    fn launch(&self, request: LoadRequest) {
        self.counters.launched.fetch_add(1, Ordering::Relaxed);
        debug!(source = %request.source, "Launching load task");

        let pipeline = self.pipeline.clone();
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let task = {
                let request = request.clone();
                tokio::spawn(async move { pipeline.load(&request).await })
            };
            let result = match task.await {
                Ok(result) => result,
                Err(e) => LoadResult::failed(&request, e.into()),
            };
            if completions.send(result).await.is_err() {
                debug!("Loader driver gone, dropping result");
            }
        });
    }
}
