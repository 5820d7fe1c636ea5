//! Routing consumed records to event handlers.
//!
//! Each decoded record is routed by its `event_type` tag to at most one
//! handler. Nothing raised here ever stops consumption: undecodable records
//! are skipped, handler failures are logged, and the offset is committed
//! either way. Delivery is at-least-once with drop-on-failure.

use crate::clients::ScoringError;
use crate::entities::ApplicationStatus;
use crate::events::{EventCodec, StatusChangeEvent};
use crate::pipeline::PipelineError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid application id in event: {0}")]
    InvalidApplicationId(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Reacts to one kind of status change event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Event type tag this handler is registered under.
    fn event_type(&self) -> ApplicationStatus;

    async fn handle(&self, event: &StatusChangeEvent) -> Result<(), HandlerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Undecodable,
    UnknownEventType,
    NoHandler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled(ApplicationStatus),
    Skipped(SkipReason),
    HandlerFailed(ApplicationStatus),
}

pub struct InboundDispatcher {
    codec: EventCodec,
    handlers: HashMap<ApplicationStatus, Arc<dyn EventHandler>>,
}

impl InboundDispatcher {
    pub fn new(codec: EventCodec) -> Self {
        Self {
            codec,
            handlers: HashMap::new(),
        }
    }

    /// Route events of `handler.event_type()` to `handler`.
    ///
    /// A second handler for the same tag replaces the first.
    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        let event_type = handler.event_type();
        if self.handlers.insert(event_type, handler).is_some() {
            warn!(event_type = %event_type, "Replaced previously registered event handler");
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.register(handler);
        self
    }

    pub async fn dispatch(&self, payload: &[u8]) -> DispatchOutcome {
        let event = match self.codec.decode(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Skipping undecodable record");
                return DispatchOutcome::Skipped(SkipReason::Undecodable);
            }
        };

        let Ok(event_type) = event.event_type.parse::<ApplicationStatus>() else {
            warn!(
                event_type = %event.event_type,
                message_id = %event.message_id,
                "Skipping record with unknown event type"
            );
            return DispatchOutcome::Skipped(SkipReason::UnknownEventType);
        };

        let Some(handler) = self.handlers.get(&event_type) else {
            debug!(event_type = %event_type, "No handler registered, skipping");
            return DispatchOutcome::Skipped(SkipReason::NoHandler);
        };

        match handler.handle(&event).await {
            Ok(()) => {
                debug!(
                    event_type = %event_type,
                    application_id = %event.application_id,
                    "Handled event"
                );
                DispatchOutcome::Handled(event_type)
            }
            Err(e) => {
                error!(
                    error = %e,
                    event_type = %event_type,
                    application_id = %event.application_id,
                    message_id = %event.message_id,
                    "Event handler failed"
                );
                DispatchOutcome::HandlerFailed(event_type)
            }
        }
    }
}

/// A consumed record, detached from the consumer that produced it.
#[derive(Debug, Clone)]
pub struct InboundRecord {
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

/// Consumer-side hooks the partition workers drive.
///
/// `commit` receives the partition and offset of the record that was just
/// dispatched. `pause` and `resume` stop and restart fetching for one
/// partition while its worker has a backlog.
pub trait PartitionControl: Send + Sync {
    fn commit(&self, partition: i32, offset: i64);
    fn pause(&self, partition: i32);
    fn resume(&self, partition: i32);
}

/// How long [`PartitionWorkers::shutdown`] waits for a worker to finish its
/// record in flight before aborting it.
pub const WORKER_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Records handed to a worker but not yet committed.
#[derive(Debug, Default)]
struct Backlog {
    queued: usize,
    paused: bool,
}

struct Worker {
    sender: mpsc::UnboundedSender<InboundRecord>,
    backlog: Arc<Mutex<Backlog>>,
    handle: JoinHandle<()>,
}

fn lock(backlog: &Mutex<Backlog>) -> MutexGuard<'_, Backlog> {
    backlog.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fans records out to one worker task per partition.
///
/// Records of a partition are dispatched strictly one after another. Routing
/// never waits: once a partition has `buffer` records outstanding it is
/// paused on the consumer, and it is resumed when its worker has worked the
/// backlog down to half of that. A stuck handler therefore only holds up its
/// own partition.
pub struct PartitionWorkers {
    dispatcher: Arc<InboundDispatcher>,
    control: Arc<dyn PartitionControl>,
    shutdown_rx: watch::Receiver<bool>,
    buffer: usize,
    workers: HashMap<i32, Worker>,
}

impl PartitionWorkers {
    pub fn new(
        dispatcher: Arc<InboundDispatcher>,
        control: Arc<dyn PartitionControl>,
        shutdown_rx: watch::Receiver<bool>,
        buffer: usize,
    ) -> Self {
        Self {
            dispatcher,
            control,
            shutdown_rx,
            buffer: buffer.max(1),
            workers: HashMap::new(),
        }
    }

    /// Hand `record` to its partition's worker, spawning the worker on first use.
    pub fn route(&mut self, record: InboundRecord) {
        let partition = record.partition;
        if self
            .workers
            .get(&partition)
            .is_none_or(|worker| worker.sender.is_closed())
        {
            let worker = self.spawn_worker(partition);
            self.workers.insert(partition, worker);
        }
        let Some(worker) = self.workers.get(&partition) else {
            return;
        };

        let mut backlog = lock(&worker.backlog);
        if worker.sender.send(record).is_err() {
            warn!(partition, "Partition worker stopped, record left uncommitted");
            return;
        }
        backlog.queued += 1;
        if backlog.queued >= self.buffer && !backlog.paused {
            backlog.paused = true;
            debug!(partition, queued = backlog.queued, "Pausing partition");
            self.control.pause(partition);
        }
    }

    fn spawn_worker(&self, partition: i32) -> Worker {
        let (sender, rx) = mpsc::unbounded_channel();
        let backlog = Arc::new(Mutex::new(Backlog::default()));
        let handle = tokio::spawn(partition_worker(
            PartitionTask {
                partition,
                dispatcher: self.dispatcher.clone(),
                control: self.control.clone(),
                backlog: backlog.clone(),
                resume_at: self.buffer / 2,
            },
            rx,
            self.shutdown_rx.clone(),
        ));
        Worker {
            sender,
            backlog,
            handle,
        }
    }

    /// Stop accepting records and wait for every worker to exit.
    ///
    /// A worker still busy after [`WORKER_SHUTDOWN_GRACE`] is aborted and its
    /// record stays uncommitted.
    pub async fn shutdown(self) {
        for (partition, worker) in self.workers {
            let Worker {
                sender, mut handle, ..
            } = worker;
            drop(sender);
            match tokio::time::timeout(WORKER_SHUTDOWN_GRACE, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(partition, error = %e, "Partition worker panicked"),
                Err(_) => {
                    warn!(partition, "Partition worker did not stop in time, aborting");
                    handle.abort();
                }
            }
        }
    }
}

struct PartitionTask {
    partition: i32,
    dispatcher: Arc<InboundDispatcher>,
    control: Arc<dyn PartitionControl>,
    backlog: Arc<Mutex<Backlog>>,
    resume_at: usize,
}

impl PartitionTask {
    async fn process(&self, record: InboundRecord) {
        let outcome = self.dispatcher.dispatch(&record.payload).await;
        debug!(
            partition = self.partition,
            offset = record.offset,
            outcome = ?outcome,
            "Dispatched record"
        );
        self.control.commit(record.partition, record.offset);

        let mut backlog = lock(&self.backlog);
        backlog.queued = backlog.queued.saturating_sub(1);
        if backlog.paused && backlog.queued <= self.resume_at {
            backlog.paused = false;
            debug!(partition = self.partition, "Resuming partition");
            self.control.resume(self.partition);
        }
    }
}

async fn partition_worker(
    task: PartitionTask,
    mut rx: mpsc::UnboundedReceiver<InboundRecord>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let partition = task.partition;
    debug!(partition, "Partition worker started");

    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!(partition, "Partition worker received shutdown signal");
                    break;
                }
            }

            record = rx.recv() => {
                let Some(record) = record else {
                    break;
                };
                task.process(record).await;
            }
        }
    }

    debug!(partition, "Partition worker exited");
}
