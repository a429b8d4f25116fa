//! Result queues: closable producer/consumer channels used by engines to
//! report progress, and a fan-in stream over many of them.
//!
//! Writing is synchronous and thread-safe, so producers can live on other
//! threads or tasks. Reading is async and done by a single consumer, either
//! through [`ResultQueue::get`] or by using the queue as a [`Stream`].
//!
//! All queues created from one [`ChannelRegistry`] can be poisoned at once.
//! After that, reading and writing any existing or future queue of that
//! registry fails with [`QueueError::Poisoned`].

use crate::errors::{QueueError, ResultError};
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use std::collections::HashMap;
use std::future::{Future, poll_fn};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll, ready};
use tokio::sync::mpsc;

/// A step of starting or stopping a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartStopResultStep {
    /// Total number of steps, if known.
    pub steps: Option<u32>,
    pub current_step: u32,
    pub text: String,
}

impl StartStopResultStep {
    pub fn new(steps: Option<u32>, current_step: u32, text: impl Into<String>) -> Self {
        Self {
            steps,
            current_step,
            text: text.into(),
        }
    }
}

/// An element read from a queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Item<T> {
    Value(T),
    /// The queue was ended normally.
    End,
    /// The queue was ended with an error.
    EndWithError(ResultError),
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Type-erased handle the registry uses to poison open queues.
trait OpenQueue: Send + Sync {
    fn end_poisoned(&self);
}

/// Tracks all open queues and the poisoned flag shared by them.
#[derive(Default)]
pub struct ChannelRegistry {
    poisoned: AtomicBool,
    next_id: AtomicU64,
    open: Mutex<HashMap<u64, Weak<dyn OpenQueue>>>,
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("poisoned", &self.is_poisoned())
            .field("open", &self.open_count())
            .finish()
    }
}

impl ChannelRegistry {
    /// Create a new registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a new open queue, returning its write and read halves.
    pub fn channel<T: Send + 'static>(self: &Arc<Self>) -> (ResultSender<T>, ResultQueue<T>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SenderState {
            id,
            registry: Arc::clone(self),
            ended_put: Mutex::new(false),
            tx,
        });
        let handle: Arc<dyn OpenQueue> = shared.clone();
        lock(&self.open).insert(id, Arc::downgrade(&handle));

        let sender = ResultSender { shared };
        let queue = ResultQueue {
            registry: Arc::clone(self),
            rx,
            ended_get: false,
        };
        (sender, queue)
    }

    /// Poison all queues of this registry.
    ///
    /// Every open queue is ended with a poisoned [`ResultError`], which wakes
    /// pending reads. Irreversible.
    pub fn poison(&self) {
        self.poisoned.store(true, Ordering::SeqCst);
        let open: Vec<Arc<dyn OpenQueue>> = lock(&self.open)
            .drain()
            .filter_map(|(_, queue)| queue.upgrade())
            .collect();
        tracing::debug!(queues = open.len(), "poisoning result queues");
        for queue in open {
            queue.end_poisoned();
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    /// Number of queues that were not ended normally yet.
    pub fn open_count(&self) -> usize {
        lock(&self.open).len()
    }

    fn deregister(&self, id: u64) {
        lock(&self.open).remove(&id);
    }
}

struct SenderState<T> {
    id: u64,
    registry: Arc<ChannelRegistry>,
    ended_put: Mutex<bool>,
    tx: mpsc::UnboundedSender<Item<T>>,
}

impl<T: Send> OpenQueue for SenderState<T> {
    fn end_poisoned(&self) {
        let mut ended = lock(&self.ended_put);
        if !*ended {
            *ended = true;
            let _ = self.tx.send(Item::EndWithError(ResultError::poisoned()));
        }
    }
}

/// Write half of a result queue. Cheap to clone and safe to use from any thread.
pub struct ResultSender<T> {
    shared: Arc<SenderState<T>>,
}

impl<T> Clone for ResultSender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> ResultSender<T> {
    /// Put a value into the queue.
    pub fn put(&self, value: T) -> Result<(), QueueError> {
        let ended = lock(&self.shared.ended_put);
        if self.shared.registry.is_poisoned() {
            return Err(QueueError::Poisoned);
        }
        if *ended {
            return Err(QueueError::AlreadyEnded);
        }
        // A dropped reader just means nobody is interested anymore.
        let _ = self.shared.tx.send(Item::Value(value));
        Ok(())
    }

    /// End the queue normally and remove it from the registry.
    pub fn end(&self) -> Result<(), QueueError> {
        let mut ended = lock(&self.shared.ended_put);
        if *ended {
            return Err(QueueError::AlreadyEnded);
        }
        *ended = true;
        let _ = self.shared.tx.send(Item::End);
        self.shared.registry.deregister(self.shared.id);
        Ok(())
    }

    /// End the queue with an error. The queue stays registered.
    pub fn end_with_error(&self, error: ResultError) -> Result<(), QueueError> {
        let mut ended = lock(&self.shared.ended_put);
        if *ended {
            return Err(QueueError::AlreadyEnded);
        }
        *ended = true;
        let _ = self.shared.tx.send(Item::EndWithError(error));
        Ok(())
    }

    pub fn is_ended(&self) -> bool {
        *lock(&self.shared.ended_put)
    }
}

/// Read half of a result queue.
pub struct ResultQueue<T> {
    registry: Arc<ChannelRegistry>,
    rx: mpsc::UnboundedReceiver<Item<T>>,
    ended_get: bool,
}

impl<T> ResultQueue<T> {
    /// Get the next element.
    ///
    /// The end markers are returned as terminal items. Once one was returned,
    /// every further call fails with [`QueueError::AlreadyEnded`].
    pub async fn get(&mut self) -> Result<Item<T>, QueueError> {
        poll_fn(|cx| self.poll_get(cx)).await
    }

    fn poll_get(&mut self, cx: &mut Context<'_>) -> Poll<Result<Item<T>, QueueError>> {
        if self.ended_get {
            return Poll::Ready(Err(QueueError::AlreadyEnded));
        }
        if self.registry.is_poisoned() {
            return Poll::Ready(Err(QueueError::Poisoned));
        }
        let item = match ready!(self.rx.poll_recv(cx)) {
            Some(Item::Value(value)) => return Poll::Ready(Ok(Item::Value(value))),
            Some(item) => item,
            None => Item::EndWithError(ResultError::new(
                "Result producer went away without ending the queue.",
            )),
        };
        self.ended_get = true;
        if self.registry.is_poisoned() {
            return Poll::Ready(Err(QueueError::Poisoned));
        }
        Poll::Ready(Ok(item))
    }

    pub fn is_ended(&self) -> bool {
        self.ended_get
    }
}

/// Iterating yields values, then the error if the queue was ended with one.
impl<T> Stream for ResultQueue<T> {
    type Item = Result<T, ResultError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.ended_get {
            return Poll::Ready(None);
        }
        match ready!(this.poll_get(cx)) {
            Ok(Item::Value(value)) => Poll::Ready(Some(Ok(value))),
            Ok(Item::End) | Err(QueueError::AlreadyEnded) => Poll::Ready(None),
            Ok(Item::EndWithError(error)) => Poll::Ready(Some(Err(error))),
            Err(QueueError::Poisoned) => {
                this.ended_get = true;
                Poll::Ready(Some(Err(ResultError::poisoned())))
            }
        }
    }
}

/// Update for one queue in a [`MultiResultQueue`].
#[derive(Debug, Clone, PartialEq)]
pub enum Update<T> {
    Value(T),
    /// The queue was ended normally.
    Ended,
    /// The queue was ended with an error, or reading it failed.
    Failed(ResultError),
}

impl<T> Update<T> {
    /// Whether this is the last update for its queue.
    pub fn is_final(&self) -> bool {
        !matches!(self, Update::Value(_))
    }
}

type PendingGet<T> =
    Pin<Box<dyn Future<Output = (ResultQueue<T>, String, Result<Item<T>, QueueError>)> + Send>>;

fn read_next<T: Send + 'static>(mut queue: ResultQueue<T>, id: String) -> PendingGet<T> {
    Box::pin(async move {
        let result = queue.get().await;
        (queue, id, result)
    })
}

/// Fan-in over many result queues, yielding `(id, update)` pairs.
///
/// Values of one queue arrive in the order they were put. Across queues,
/// updates arrive in completion order. The stream ends after every queue
/// delivered its final update, and immediately if there are no queues.
pub struct MultiResultQueue<T> {
    ids: Vec<String>,
    waiting: Vec<(ResultQueue<T>, String)>,
    pending: FuturesUnordered<PendingGet<T>>,
}

impl<T: Send + 'static> MultiResultQueue<T> {
    /// Create a fan-in from queues and their identifiers.
    pub fn new(queues: impl IntoIterator<Item = (ResultQueue<T>, String)>) -> Self {
        let waiting: Vec<_> = queues.into_iter().collect();
        let ids = waiting.iter().map(|(_, id)| id.clone()).collect();
        Self {
            ids,
            waiting,
            pending: FuturesUnordered::new(),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<T: Send + 'static> Stream for MultiResultQueue<T> {
    type Item = (String, Update<T>);

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        for (queue, id) in this.waiting.drain(..) {
            this.pending.push(read_next(queue, id));
        }

        let Some((queue, id, result)) = ready!(this.pending.poll_next_unpin(cx)) else {
            return Poll::Ready(None);
        };
        let update = match result {
            Ok(Item::Value(value)) => {
                this.pending.push(read_next(queue, id.clone()));
                Update::Value(value)
            }
            Ok(Item::End) => Update::Ended,
            Ok(Item::EndWithError(error)) => Update::Failed(error),
            Err(error) => Update::Failed(error.into()),
        };
        Poll::Ready(Some((id, update)))
    }
}
