//! Task queue implementation.

use crate::error::{HistoryError, Result};
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

/// A queued unit of work, already wired to report to its handle.
type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Serializes async tasks onto a single worker.
///
/// The worker runs on the runtime that was current when it was spawned. If
/// that runtime shuts down, the next `add` starts a new worker on the
/// caller's runtime.
pub struct TaskQueue {
    /// Submission side of the live worker's channel, if one was spawned.
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,

    /// Tasks queued or running.
    pending: Arc<AtomicUsize>,
}

/// Counts one task as pending until dropped, whether it ran or not.
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn new(pending: &Arc<AtomicUsize>) -> Self {
        pending.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(pending))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TaskQueue {
    /// Create an idle queue. No worker exists until the first `add`.
    pub fn new() -> Self {
        Self {
            sender: Mutex::new(None),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enqueue a task.
    ///
    /// The task starts once every previously added task has finished, whether
    /// or not the returned handle is ever awaited. Called outside a Tokio
    /// runtime, the task is dropped and the handle resolves to
    /// [`HistoryError::NoRuntime`].
    pub fn add<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => return TaskHandle::failed(HistoryError::NoRuntime),
        };

        let (tx, rx) = oneshot::channel();
        let guard = PendingGuard::new(&self.pending);

        let job: Job = Box::pin(async move {
            let outcome = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(HistoryError::TaskPanicked),
            };
            drop(guard);
            // Receiver may be gone; the task still ran.
            let _ = tx.send(outcome);
        });

        let mut sender = self.sender.lock();
        let job = match sender.as_ref() {
            Some(live) if !live.is_closed() => match live.send(job) {
                Ok(()) => return TaskHandle { rx },
                Err(mpsc::error::SendError(job)) => job,
            },
            _ => job,
        };

        // No worker yet, or its runtime has shut down.
        let live = Self::spawn_worker(&runtime);
        // If this runtime is itself shutting down the job is dropped here,
        // closing the oneshot so the handle resolves to QueueClosed.
        let _ = live.send(job);
        *sender = Some(live);

        TaskHandle { rx }
    }

    /// Number of tasks queued or currently running.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// True when nothing is queued or running.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    fn spawn_worker(runtime: &Handle) -> mpsc::UnboundedSender<Job> {
        let (sender, receiver) = mpsc::unbounded_channel();
        runtime.spawn(Self::run(receiver));
        sender
    }

    /// Worker loop: run jobs strictly one after another until every sender
    /// is dropped and the channel drains.
    async fn run(mut receiver: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = receiver.recv().await {
            job.await;
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Completion handle for a queued task.
#[must_use = "a TaskHandle does nothing unless awaited; the task runs regardless"]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    /// A handle that is already resolved to `err`.
    fn failed(err: HistoryError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self { rx }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            Err(_) => Err(HistoryError::QueueClosed),
        })
    }
}
