//! Per-key serialized execution
//!
//! Operations enqueued under the same key run one at a time, in enqueue
//! order. A key with pending work has exactly one worker task draining its
//! list; the worker exits once the list is empty. Unrelated keys are
//! drained by independent workers and never wait on each other.

use crate::error::QueueError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

type Job = BoxFuture<'static, ()>;

pub struct SerializedQueue<K> {
    /// A key is present iff a worker is draining it. The deque holds the
    /// jobs waiting behind the one currently running.
    pending: Arc<Mutex<HashMap<K, VecDeque<Job>>>>,
}

impl<K> Clone for SerializedQueue<K> {
    fn clone(&self) -> Self {
        Self {
            pending: self.pending.clone(),
        }
    }
}

impl<K> Default for SerializedQueue<K>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> SerializedQueue<K>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Queue `operation` behind everything already enqueued for `key`.
    ///
    /// The operation is queued immediately, before the returned future is
    /// polled. Dropping the returned future discards the outcome but does
    /// not cancel the operation. A panic inside the operation is reported
    /// as [`QueueError::Panicked`] and the key's later operations still run.
    pub fn enqueue<F, T>(
        &self,
        key: K,
        operation: F,
    ) -> impl Future<Output = Result<T, QueueError>> + Send + 'static
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(operation)
                .catch_unwind()
                .await
                .map_err(|panic| QueueError::Panicked(panic_message(panic.as_ref())));
            // Receiver gone means the caller stopped listening.
            let _ = tx.send(outcome);
        });
        self.push(key, job);

        async move { rx.await.unwrap_or(Err(QueueError::Dropped)) }
    }

    fn push(&self, key: K, job: Job) {
        let mut pending = self.lock();
        if let Some(waiting) = pending.get_mut(&key) {
            waiting.push_back(job);
            debug!(key = ?key, waiting = waiting.len(), "operation queued behind active worker");
            return;
        }
        pending.insert(key.clone(), VecDeque::new());
        drop(pending);

        debug!(key = ?key, "queue worker started");
        let queue = self.clone();
        tokio::spawn(async move { queue.drain(key, job).await });
    }

    async fn drain(self, key: K, first: Job) {
        let mut next = Some(first);
        while let Some(job) = next {
            job.await;
            next = self.next_job(&key);
        }
        debug!(key = ?key, "queue worker finished");
    }

    /// Pop the next job, or retire the key's worker if nothing is waiting.
    /// Both happen under the lock `push` takes, so a concurrent enqueue
    /// either lands in this worker's list or starts a fresh worker.
    fn next_job(&self, key: &K) -> Option<Job> {
        let mut pending = self.lock();
        let job = pending.get_mut(key).and_then(VecDeque::pop_front);
        if job.is_none() {
            pending.remove(key);
        }
        job
    }

    /// Operations waiting behind the running one for `key`.
    pub fn pending(&self, key: &K) -> usize {
        self.lock().get(key).map_or(0, VecDeque::len)
    }

    /// Keys with a live worker.
    pub fn active_keys(&self) -> Vec<K> {
        self.lock().keys().cloned().collect()
    }

    pub fn is_idle(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, VecDeque<Job>>> {
        // Nothing panics while the lock is held; recover the map regardless.
        self.pending.lock().unwrap_or_else(|poisoned| {
            warn!("serialized queue lock was poisoned");
            PoisonError::into_inner(poisoned)
        })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_variants() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }

    #[tokio::test]
    async fn idle_after_drain() {
        let queue: SerializedQueue<&'static str> = SerializedQueue::new();
        assert_eq!(queue.enqueue("a", async { 1 }).await.unwrap(), 1);
        // Worker retires right after delivering the last result.
        for _ in 0..100 {
            if queue.is_idle() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(queue.is_idle());
        assert_eq!(queue.pending(&"a"), 0);
    }
}
