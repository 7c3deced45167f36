//! Bounded-concurrency task dispatcher.
//!
//! Tasks are pushed onto a FIFO queue by [`Dispatcher::submit`]. A single
//! queue processor pops them in order, acquires a permit from a semaphore
//! sized to the dispatcher's capacity, and only then spawns the execution.
//! This keeps at most `capacity` ffmpeg processes alive at any moment and,
//! with a capacity of one, runs tasks strictly in submission order.
//!
//! Every spawned execution is registered with a [`TaskTracker`] so that
//! [`Dispatcher::drain`] can wait for all of them.

mod execute;

use crate::error::{Error, Result};
use crate::tool::ToolRunner;
use crate::types::{DownloadTask, Event, ExecutionResult, TaskHandle};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{Semaphore, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::Dispatch;
use tracing::instrument::WithSubscriber;

use execute::{ExecContext, execute};

/// A queued task together with the channel its result is reported on
pub(crate) struct Job {
    pub(crate) task: DownloadTask,
    pub(crate) result_tx: oneshot::Sender<ExecutionResult>,
}

/// Executes [`DownloadTask`]s with at most `capacity` running at once
///
/// Cloning is cheap; all clones share the same queue and worker pool. When
/// the last clone is dropped without [`drain`](Self::drain) having been
/// called, the drop blocks until queued work has finished (see
/// [`Downloader`](crate::Downloader) for the runtime caveats).
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    capacity: usize,
    /// Sending half of the queue; `None` once draining has started
    queue_tx: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    /// Queue processor task, taken by the first drainer
    processor: Mutex<Option<JoinHandle<()>>>,
    tracker: TaskTracker,
    events: broadcast::Sender<Event>,
    runtime: Handle,
    log: Dispatch,
}

impl Dispatcher {
    /// Create a dispatcher and start its queue processor
    ///
    /// A capacity of zero is treated as one. Log records from the processor
    /// and from every execution go to `log`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(
        capacity: usize,
        runner: Arc<dyn ToolRunner>,
        events: broadcast::Sender<Event>,
        log: Dispatch,
    ) -> Self {
        let capacity = capacity.max(1);
        let runtime = Handle::current();
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let tracker = TaskTracker::new();

        let ctx = Arc::new(ExecContext {
            runner,
            events: events.clone(),
            log: log.clone(),
        });
        let semaphore = Arc::new(Semaphore::new(capacity));

        let processor = runtime.spawn(
            process_queue(queue_rx, semaphore, tracker.clone(), ctx).with_subscriber(log.clone()),
        );

        Self {
            inner: Arc::new(DispatcherInner {
                capacity,
                queue_tx: Mutex::new(Some(queue_tx)),
                processor: Mutex::new(Some(processor)),
                tracker,
                events,
                runtime,
                log,
            }),
        }
    }

    /// Maximum number of tasks executing at once
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Whether [`submit`](Self::submit) still accepts tasks
    pub fn is_accepting(&self) -> bool {
        lock(&self.inner.queue_tx).is_some()
    }

    /// Number of tasks currently executing
    pub fn running(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Queue a task for execution and return immediately
    ///
    /// Logs the submission and broadcasts [`Event::Submitted`] before the task
    /// can start, so subscribers always see `Submitted` ahead of `Started`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] once [`drain`](Self::drain) has been
    /// called.
    pub fn submit(&self, task: DownloadTask) -> Result<TaskHandle> {
        let queue = lock(&self.inner.queue_tx);
        let Some(queue_tx) = queue.as_ref() else {
            return Err(Error::ShuttingDown);
        };

        let (result_tx, result_rx) = oneshot::channel();
        let handle = TaskHandle::new(task.id(), task.filename().to_string(), result_rx);

        tracing::dispatcher::with_default(&self.inner.log, || {
            tracing::info!(task = %task.filename(), id = task.id().get(), "submitted task");
        });
        self.inner
            .events
            .send(Event::Submitted {
                id: task.id(),
                filename: task.filename().to_string(),
            })
            .ok();

        queue_tx
            .send(Job { task, result_tx })
            .map_err(|_| Error::ShuttingDown)?;

        Ok(handle)
    }

    /// Stop accepting tasks and wait until every submitted task has finished
    ///
    /// Safe to call more than once and from several places at the same time;
    /// every caller returns only after all work is done.
    pub async fn drain(&self) {
        let processor = {
            // Dropping the sender lets the processor exit once the queue is empty
            drop(lock(&self.inner.queue_tx).take());
            lock(&self.inner.processor).take()
        };

        wait_for_completion(processor, &self.inner.tracker).await;
    }
}

impl Drop for DispatcherInner {
    fn drop(&mut self) {
        let queue_tx = self
            .queue_tx
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if queue_tx.is_none() {
            return;
        }
        drop(queue_tx);

        let processor = self
            .processor
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let tracker = self.tracker.clone();
        let drain = async move { wait_for_completion(processor, &tracker).await }
            .with_subscriber(self.log.clone());

        tracing::dispatcher::with_default(&self.log, || {
            // Outside any runtime context (e.g. after `block_on` returned) the
            // stored handle is the only way back to the workers
            let (handle, inside) = match Handle::try_current() {
                Ok(handle) => (handle, true),
                Err(_) => (self.runtime.clone(), false),
            };

            // A current-thread runtime only makes progress inside its own
            // `Runtime::block_on`, which a drop cannot reach
            if handle.runtime_flavor() != RuntimeFlavor::MultiThread {
                tracing::warn!(
                    running = self.tracker.len(),
                    "dispatcher dropped without drain on a current-thread runtime; \
                     queued downloads continue in the background"
                );
                return;
            }

            tracing::info!("dispatcher dropped without drain, waiting for queued downloads");
            if inside {
                tokio::task::block_in_place(|| handle.block_on(drain));
            } else {
                handle.block_on(drain);
            }
        });
    }
}

/// Pop jobs in order and spawn each one once a concurrency permit is free
async fn process_queue(
    mut queue_rx: mpsc::UnboundedReceiver<Job>,
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    ctx: Arc<ExecContext>,
) {
    while let Some(job) = queue_rx.recv().await {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::error!("concurrency limiter closed, abandoning queued downloads");
                break;
            }
        };

        let ctx = Arc::clone(&ctx);
        let log = ctx.log.clone();
        tracker.spawn(
            async move {
                let _permit = permit;
                execute(&ctx, job).await;
            }
            .with_subscriber(log),
        );
    }

    // Only the processor closes the tracker, so waiters never observe an
    // empty-but-open gap between two tasks
    tracker.close();
    tracing::debug!("queue processor finished");
}

async fn wait_for_completion(processor: Option<JoinHandle<()>>, tracker: &TaskTracker) {
    if let Some(processor) = processor
        && let Err(e) = processor.await
    {
        tracing::error!(error = %e, "queue processor terminated abnormally");
        tracker.close();
    }

    tracker.wait().await;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
