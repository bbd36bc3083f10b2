//! Transform buffer.
//!
//! Maintains a graph of named reference frames and the latest stamped
//! transform on each parent → child edge.  Lookups compose the chain between
//! any two connected frames (edges may be walked in either direction) and
//! report the oldest stamp along the chain as the result's stamp.  Static
//! edges carry [`Stamp::ZERO`] and do not constrain the result; a chain made
//! only of static edges is itself static.
//!
//! Components that need to react to new transforms register a
//! "transforms changed" listener and receive a [`ListenerHandle`] to remove
//! it again.  Listeners run on the thread that inserted the transforms, after
//! the buffer's own lock has been released, so they may call
//! [`TransformBuffer::lookup_transform`].
//!
//! # Example
//!
//! ```rust
//! use posewatch_tf::TransformBuffer;
//! use posewatch_types::{Quaternion, Stamp, Transform3D, TransformStamped, Vec3};
//!
//! let tf = TransformBuffer::new();
//! let stamp = Stamp::from_secs_f64(1.0);
//!
//! tf.set_transform(TransformStamped::new(stamp, "odom", "base_link",
//!     Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity())), false);
//! tf.set_transform(TransformStamped::new(Stamp::ZERO, "base_link", "camera",
//!     Transform3D::new(Vec3::new(0.5, 0.0, 0.0), Quaternion::identity())), true);
//!
//! let t = tf.lookup_transform("odom", "camera").unwrap();
//! assert!((t.transform.translation.x - 1.5).abs() < 1e-9);
//! assert_eq!(t.stamp, stamp);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use posewatch_types::{Stamp, Transform3D, TransformStamped};
use thiserror::Error;
use tracing::trace;

/// Why a lookup could not be answered.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum LookupError {
    #[error("frame '{0}' does not exist")]
    UnknownFrame(String),

    #[error("frames '{target_frame}' and '{source_frame}' are not connected")]
    NotConnected {
        target_frame: String,
        source_frame: String,
    },
}

/// Registration token returned by
/// [`TransformBuffer::add_transforms_changed_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct Edge {
    transform: Transform3D,
    stamp: Stamp,
}

/// `edges[parent][child] = Edge`
#[derive(Debug, Default)]
struct FrameGraph {
    edges: HashMap<String, HashMap<String, Edge>>,
    /// child → parent, for walking edges backwards.
    parents: HashMap<String, String>,
}

impl FrameGraph {
    fn contains(&self, frame: &str) -> bool {
        self.edges.contains_key(frame) || self.parents.contains_key(frame)
    }

    fn insert(&mut self, msg: &TransformStamped, stamp: Stamp) {
        // A frame has exactly one parent; re-parenting drops the old edge.
        if let Some(old_parent) = self.parents.get(&msg.child_frame)
            && old_parent != &msg.parent_frame
            && let Some(children) = self.edges.get_mut(old_parent)
        {
            children.remove(&msg.child_frame);
        }
        self.parents
            .insert(msg.child_frame.clone(), msg.parent_frame.clone());
        self.edges
            .entry(msg.parent_frame.clone())
            .or_default()
            .insert(
                msg.child_frame.clone(),
                Edge {
                    transform: msg.transform,
                    stamp,
                },
            );
    }

    /// Neighbours of `frame` with the transform that moves from `frame` to
    /// the neighbour.
    fn neighbours(&self, frame: &str) -> Vec<(String, Edge)> {
        let mut out = Vec::new();
        if let Some(children) = self.edges.get(frame) {
            out.extend(children.iter().map(|(c, e)| (c.clone(), *e)));
        }
        if let Some(parent) = self.parents.get(frame)
            && let Some(edge) = self.edges.get(parent).and_then(|c| c.get(frame))
        {
            out.push((
                parent.clone(),
                Edge {
                    transform: edge.transform.inverse(),
                    stamp: edge.stamp,
                },
            ));
        }
        out
    }
}

/// Thread-safe store of the latest transforms between named frames.
#[derive(Default)]
pub struct TransformBuffer {
    graph: RwLock<FrameGraph>,
    listeners: Mutex<Vec<(ListenerHandle, Listener)>>,
    next_listener_id: AtomicU64,
}

impl TransformBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the transform `msg.parent_frame` → `msg.child_frame`
    /// and notify listeners.  Static transforms are stored with
    /// [`Stamp::ZERO`] regardless of `msg.stamp`.
    pub fn set_transform(&self, msg: TransformStamped, is_static: bool) {
        self.set_transforms(std::slice::from_ref(&msg), is_static);
    }

    /// Insert a batch of transforms and notify listeners once.
    pub fn set_transforms(&self, msgs: &[TransformStamped], is_static: bool) {
        if msgs.is_empty() {
            return;
        }
        {
            let mut graph = self.graph.write();
            for msg in msgs {
                let stamp = if is_static { Stamp::ZERO } else { msg.stamp };
                graph.insert(msg, stamp);
            }
        }
        trace!(count = msgs.len(), is_static, "transforms updated");
        self.notify_listeners();
    }

    /// `true` when `frame` appears on any edge.
    pub fn frame_exists(&self, frame: &str) -> bool {
        self.graph.read().contains(frame)
    }

    /// Latest transform of `source_frame` expressed in `target_frame`
    /// (T_target_source).
    pub fn lookup_transform(
        &self,
        target_frame: &str,
        source_frame: &str,
    ) -> Result<TransformStamped, LookupError> {
        let graph = self.graph.read();
        if target_frame == source_frame {
            return Ok(TransformStamped::new(
                Stamp::ZERO,
                target_frame,
                source_frame,
                Transform3D::identity(),
            ));
        }
        for frame in [target_frame, source_frame] {
            if !graph.contains(frame) {
                return Err(LookupError::UnknownFrame(frame.to_string()));
            }
        }

        // BFS from target to source; each queue item carries the composed
        // transform and the oldest non-static stamp seen so far.
        let mut queue: VecDeque<(String, Transform3D, Option<Stamp>)> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        queue.push_back((target_frame.to_string(), Transform3D::identity(), None));
        visited.insert(target_frame.to_string());

        while let Some((current, accumulated, oldest)) = queue.pop_front() {
            for (next, edge) in graph.neighbours(&current) {
                if visited.contains(&next) {
                    continue;
                }
                let composed = accumulated.compose(edge.transform);
                let oldest = match (oldest, edge.stamp.is_zero()) {
                    (o, true) => o,
                    (None, false) => Some(edge.stamp),
                    (Some(o), false) => Some(o.min(edge.stamp)),
                };
                if next == source_frame {
                    return Ok(TransformStamped::new(
                        oldest.unwrap_or(Stamp::ZERO),
                        target_frame,
                        source_frame,
                        composed,
                    ));
                }
                visited.insert(next.clone());
                queue.push_back((next, composed, oldest));
            }
        }

        Err(LookupError::NotConnected {
            target_frame: target_frame.to_string(),
            source_frame: source_frame.to_string(),
        })
    }

    /// Register `listener` to be called after every insertion.
    pub fn add_transforms_changed_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = ListenerHandle(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((handle, Arc::new(listener)));
        handle
    }

    /// Deregister a listener.  Returns `false` when the handle was already
    /// removed.
    pub fn remove_transforms_changed_listener(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(h, _)| *h != handle);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn notify_listeners(&self) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

impl std::fmt::Debug for TransformBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformBuffer")
            .field("frames", &self.graph.read().parents.len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
