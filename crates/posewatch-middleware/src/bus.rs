//! Topic-based joint-state transport.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every batch without any single subscriber blocking
//! the others.  Each [`Subscription`] owns a task on the bus's runtime that
//! drains its receiver and hands every batch to a synchronous handler, so
//! handlers run on runtime worker threads, concurrently with the caller.
//!
//! Consumers that only need "give me joint states from this topic" should
//! depend on the [`JointStateSource`] trait rather than on [`JointStateBus`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use posewatch_types::{JointState, PoseError};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default per-topic channel capacity (number of buffered batches before old
/// ones are dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Callback invoked for every batch delivered to a [`Subscription`].
pub type JointStateHandler = Arc<dyn Fn(Arc<JointState>) + Send + Sync>;

/// Anything that can deliver joint-state batches for a named topic.
pub trait JointStateSource: Send + Sync {
    /// Start delivering batches published on `topic` to `handler`.
    ///
    /// `queue_size` is a hint for how many batches may be buffered for a
    /// slow handler before the oldest are dropped.
    fn subscribe(
        &self,
        topic: &str,
        queue_size: usize,
        handler: JointStateHandler,
    ) -> Result<Subscription, PoseError>;
}

/// Handle to an active subscription.  Delivery stops on
/// [`shutdown`][Subscription::shutdown] or drop.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// The topic this subscription is bound to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// `true` until [`shutdown`][Self::shutdown] has been called.
    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Stop delivery.  Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(topic = %self.topic, "subscription shut down");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// In-process joint-state bus.  Clone the `Arc` cheaply – all clones share the
/// same underlying broadcast channels.
#[derive(Debug)]
pub struct JointStateBus {
    runtime: Handle,
    capacity: usize,
    topics: Mutex<HashMap<String, broadcast::Sender<Arc<JointState>>>>,
}

impl JointStateBus {
    /// Create a bus whose subscription tasks run on `runtime`.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(runtime: Handle, capacity: usize) -> Self {
        Self {
            runtime,
            capacity: capacity.max(1),
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Create a bus with the default capacity.
    pub fn with_default_capacity(runtime: Handle) -> Self {
        Self::new(runtime, DEFAULT_CAPACITY)
    }

    /// Publish `joint_state` on `topic`.
    ///
    /// Returns the number of subscribers that were handed the batch; `Ok(0)`
    /// when nobody is listening (a normal condition, not an error).
    pub fn publish(&self, topic: &str, joint_state: JointState) -> Result<usize, PoseError> {
        let sender = self.sender(topic, self.capacity);
        if sender.receiver_count() == 0 {
            return Ok(0);
        }
        sender
            .send(Arc::new(joint_state))
            .map_err(|e| PoseError::Transport {
                topic: topic.to_string(),
                details: format!("send error: {e}"),
            })
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .get(topic)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    fn sender(&self, topic: &str, capacity: usize) -> broadcast::Sender<Arc<JointState>> {
        self.topics
            .lock()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(capacity.max(1)).0)
            .clone()
    }
}

impl JointStateSource for JointStateBus {
    fn subscribe(
        &self,
        topic: &str,
        queue_size: usize,
        handler: JointStateHandler,
    ) -> Result<Subscription, PoseError> {
        if topic.is_empty() {
            return Err(PoseError::Transport {
                topic: String::new(),
                details: "topic name must not be empty".to_string(),
            });
        }
        // The channel capacity is fixed when the topic is first seen.
        let mut receiver = self.sender(topic, queue_size.max(self.capacity)).subscribe();
        let task_topic = topic.to_string();
        let task = self.runtime.spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(joint_state) => handler(joint_state),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(topic = %task_topic, lagged_by = n, "joint state subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        debug!(topic, "subscribed to joint states");
        Ok(Subscription {
            topic: topic.to_string(),
            task: Some(task),
        })
    }
}
