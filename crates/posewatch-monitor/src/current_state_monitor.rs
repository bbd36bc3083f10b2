//! [`CurrentStateMonitor`] – the live pose of a robot.
//!
//! The monitor owns a [`RobotState`] and a per-joint record of when each
//! joint was last updated.  Both live behind one lock so that every read
//! (snapshot, freshness query, value export) sees a single accepted update.
//!
//! # Feeds
//!
//! * **Joint states.**  [`CurrentStateMonitor::start`] subscribes to a topic
//!   on the configured [`JointStateSource`]; every batch goes through
//!   [`CurrentStateMonitor::update_joint_state`].
//! * **Transforms.**  When the model has planar or floating joints and a
//!   [`TransformBuffer`] is attached, `start` registers a
//!   "transforms changed" listener that calls
//!   [`CurrentStateMonitor::update_from_transforms`].
//!
//! Both entry points are public and can be driven directly.
//!
//! # Update times
//!
//! A batch stamped *older* than the time recorded for one of its joints is
//! taken as a replayed or looped recording: every recorded time is dropped
//! and that joint is re-seeded with the batch stamp.  Until the other joints
//! are seen again the state is reported incomplete.
//!
//! Transform-driven joints record the stamp of the looked-up transform.
//! Static transforms carry [`Stamp::ZERO`]; they count as "updated" for
//! completeness but never hold back [`CurrentStateMonitor::current_state_time`].
//!
//! # Callbacks
//!
//! Update callbacks run after the state lock has been released and before
//! waiters are woken, so a callback may query the monitor.  Transform-driven
//! changes are reported with an empty [`JointState`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use posewatch_middleware::{JointStateHandler, JointStateSource, Subscription};
use posewatch_model::{RobotModel, VariableBounds};
use posewatch_tf::{ListenerHandle, TransformBuffer};
use posewatch_types::{JointState, Stamp};
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::robot_state::RobotState;

/// Called with every joint-state batch that changed the state, or with an
/// empty batch when a transform moved a planar / floating joint.
pub type UpdateCallback = Arc<dyn Fn(&JointState) + Send + Sync>;

// ────────────────────────────────────────────────────────────────────────────
// Shared state
// ────────────────────────────────────────────────────────────────────────────

struct StateData {
    robot_state: RobotState,
    /// Joint index → stamp of the last accepted update.
    joint_time: HashMap<usize, Stamp>,
}

/// Everything the feed handlers need.  Handlers hold a `Weak` to it so a
/// dropped monitor is never kept alive by a stray delivery.
struct Shared {
    model: Arc<RobotModel>,
    tf_buffer: Option<Arc<TransformBuffer>>,
    config: MonitorConfig,
    state: Mutex<StateData>,
    state_update: Condvar,
    callbacks: Mutex<Vec<UpdateCallback>>,
    reported_lookup_failures: Mutex<HashSet<String>>,
    invalid_batch_log: LogThrottle,
}

/// Lets a message through at most once per `period`.
struct LogThrottle {
    period: Duration,
    last: Mutex<Option<Instant>>,
}

impl LogThrottle {
    fn new(period: Duration) -> Self {
        Self {
            period,
            last: Mutex::new(None),
        }
    }

    fn ready(&self, now: Instant) -> bool {
        let mut last = self.last.lock();
        match *last {
            Some(prev) if now.saturating_duration_since(prev) < self.period => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

struct MonitoringSession {
    subscription: Option<Subscription>,
    tf_listener: Option<ListenerHandle>,
    started_at: Stamp,
}

// ────────────────────────────────────────────────────────────────────────────
// CurrentStateMonitor
// ────────────────────────────────────────────────────────────────────────────

/// Keeps an up-to-date [`RobotState`] from joint-state batches and
/// transforms.
///
/// Reads and ingestion take `&self` and may run concurrently from any
/// thread.  [`start`][Self::start] and [`stop`][Self::stop] take `&mut self`.
pub struct CurrentStateMonitor {
    shared: Arc<Shared>,
    source: Option<Arc<dyn JointStateSource>>,
    session: Option<MonitoringSession>,
}

impl CurrentStateMonitor {
    /// Create a stopped monitor with every variable at its default value.
    pub fn new(
        model: Arc<RobotModel>,
        tf_buffer: Option<Arc<TransformBuffer>>,
        config: MonitorConfig,
    ) -> Self {
        let robot_state = RobotState::new(Arc::clone(&model));
        Self {
            shared: Arc::new(Shared {
                model,
                tf_buffer,
                config,
                state: Mutex::new(StateData {
                    robot_state,
                    joint_time: HashMap::new(),
                }),
                state_update: Condvar::new(),
                callbacks: Mutex::new(Vec::new()),
                reported_lookup_failures: Mutex::new(HashSet::new()),
                invalid_batch_log: LogThrottle::new(Duration::from_secs(1)),
            }),
            source: None,
            session: None,
        }
    }

    /// Use `source` to receive joint states once [`start`][Self::start]ed.
    pub fn with_joint_state_source(mut self, source: Arc<dyn JointStateSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn model(&self) -> &Arc<RobotModel> {
        &self.shared.model
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    pub fn tf_buffer(&self) -> Option<&Arc<TransformBuffer>> {
        self.shared.tf_buffer.as_ref()
    }

    // ── Ingestion ───────────────────────────────────────────────────────────

    /// Merge a joint-state batch into the current state.
    ///
    /// A batch whose name and position arrays differ in length is dropped as
    /// a whole.  Unknown joints and joints with more than one variable are
    /// skipped.
    pub fn update_joint_state(&self, joint_state: &JointState) {
        self.shared.update_joint_state(joint_state);
    }

    /// Refresh every planar / floating joint from the transform buffer.
    /// Does nothing without a buffer.
    pub fn update_from_transforms(&self) {
        self.shared.update_from_transforms();
    }

    // ── Snapshots ───────────────────────────────────────────────────────────

    /// Copy of the current state.
    pub fn current_state(&self) -> RobotState {
        self.shared.state.lock().robot_state.clone()
    }

    /// Copy of the current state together with
    /// [`current_state_time`][Self::current_state_time], taken under one
    /// lock.
    pub fn current_state_and_time(&self, group: Option<&str>) -> (RobotState, Stamp) {
        let data = self.shared.state.lock();
        let time = self.shared.current_state_time_locked(&data, group);
        (data.robot_state.clone(), time)
    }

    /// Variable name → position.
    pub fn current_state_values(&self) -> BTreeMap<String, f64> {
        let data = self.shared.state.lock();
        self.shared
            .model
            .variable_names()
            .iter()
            .cloned()
            .zip(data.robot_state.variable_positions().iter().copied())
            .collect()
    }

    /// Overwrite the positions of `target` with the current ones.  With
    /// `copy_dynamics`, velocities, accelerations and efforts are copied too
    /// when the monitor has them.
    pub fn copy_current_state_into(&self, target: &mut RobotState) {
        let data = self.shared.state.lock();
        let current = &data.robot_state;
        target.set_variable_positions(current.variable_positions());
        if self.shared.config.copy_dynamics {
            if let Some(v) = current.variable_velocities() {
                target.set_variable_velocities(v);
            }
            if let Some(a) = current.variable_accelerations() {
                target.set_variable_accelerations(a);
            }
            if let Some(e) = current.variable_efforts() {
                target.set_variable_efforts(e);
            }
        }
    }

    // ── Freshness ───────────────────────────────────────────────────────────

    /// Oldest update time over the active joints of `group` (the whole model
    /// for `None`).
    ///
    /// Returns [`Stamp::ZERO`] when a joint was never updated or the group
    /// does not exist.  Joints updated only from static transforms are
    /// ignored; if nothing else is left the result is the current time.
    pub fn current_state_time(&self, group: Option<&str>) -> Stamp {
        let data = self.shared.state.lock();
        self.shared.current_state_time_locked(&data, group)
    }

    /// `true` when every active joint of `group` has been updated at least
    /// once.
    pub fn have_complete_state(&self, group: Option<&str>) -> bool {
        self.missing_joints(group).is_empty()
    }

    /// Active joints of `group` that were never updated.  An unknown group
    /// reports every active joint of the model.
    pub fn missing_joints(&self, group: Option<&str>) -> Vec<String> {
        self.shared.missing_joints(Stamp::ZERO, group)
    }

    /// Like [`have_complete_state`][Self::have_complete_state], but joints
    /// last updated before `oldest_allowed` count as missing.
    pub fn have_complete_state_since(&self, oldest_allowed: Stamp, group: Option<&str>) -> bool {
        self.missing_joints_since(oldest_allowed, group).is_empty()
    }

    pub fn missing_joints_since(&self, oldest_allowed: Stamp, group: Option<&str>) -> Vec<String> {
        self.shared.missing_joints(oldest_allowed, group)
    }

    /// Block until [`current_state_time`][Self::current_state_time] reaches
    /// `t` or `timeout` elapses.  Returns whether `t` was reached.  A timeout
    /// too large to represent as a deadline waits without limit.
    pub fn wait_for_current_state(&self, t: Stamp, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let shared = &self.shared;
        let mut data = shared.state.lock();
        while shared.current_state_time_locked(&data, None) < t {
            let Some(deadline) = deadline else {
                shared.state_update.wait(&mut data);
                continue;
            };
            if shared.state_update.wait_until(&mut data, deadline).timed_out() {
                if shared.current_state_time_locked(&data, None) >= t {
                    return true;
                }
                info!(
                    timeout_secs = timeout.as_secs_f64(),
                    requested = %t,
                    "no robot state with a recent enough timestamp arrived in time; check clock synchronisation"
                );
                return false;
            }
        }
        true
    }

    /// Poll [`have_complete_state`][Self::have_complete_state] until it
    /// holds or `timeout` elapses.  On failure the error names the joints
    /// still missing.
    pub fn wait_for_complete_state(
        &self,
        group: Option<&str>,
        timeout: Duration,
    ) -> Result<(), MonitorError> {
        let step = self
            .shared
            .config
            .complete_poll_interval()
            .min(timeout / 10)
            .max(Duration::from_millis(1));
        let deadline = Instant::now().checked_add(timeout);

        while !self.have_complete_state(group) {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => step,
            };
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(step.min(remaining));
        }

        let joints = self.missing_joints(group);
        if joints.is_empty() {
            return Ok(());
        }
        error!(
            group = group.unwrap_or(""),
            missing = %joints.join(","),
            "robot state is incomplete"
        );
        Err(MonitorError::MissingJoints {
            group: group.map(str::to_string),
            joints,
        })
    }

    // ── Callbacks ───────────────────────────────────────────────────────────

    /// Register `callback`; callbacks run in registration order.
    pub fn add_update_callback<F>(&self, callback: F)
    where
        F: Fn(&JointState) + Send + Sync + 'static,
    {
        self.shared.callbacks.lock().push(Arc::new(callback));
    }

    pub fn clear_update_callbacks(&self) {
        self.shared.callbacks.lock().clear();
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Start listening to joint states on `topic` and, for models with
    /// planar / floating joints, to the transform buffer.
    ///
    /// No-op while already active.  Recorded update times are cleared.  An
    /// empty topic is logged as an error; the transform listener is still
    /// registered and the monitor becomes active.
    pub fn start(&mut self, topic: &str) {
        if self.session.is_some() {
            return;
        }
        self.shared.state.lock().joint_time.clear();

        let subscription = if topic.is_empty() {
            error!("the joint states topic cannot be an empty string");
            None
        } else {
            self.subscribe(topic)
        };

        let tf_listener = match &self.shared.tf_buffer {
            Some(tf) if self.shared.model.has_multi_dof_joints() => {
                let weak = Arc::downgrade(&self.shared);
                Some(tf.add_transforms_changed_listener(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.update_from_transforms();
                    }
                }))
            }
            _ => None,
        };

        self.session = Some(MonitoringSession {
            subscription,
            tf_listener,
            started_at: Stamp::now(),
        });
        debug!(topic, "listening to joint states");
    }

    fn subscribe(&self, topic: &str) -> Option<Subscription> {
        let Some(source) = &self.source else {
            warn!(topic, "no joint state source attached; only direct updates will be seen");
            return None;
        };
        let weak = Arc::downgrade(&self.shared);
        let handler: JointStateHandler = Arc::new(move |joint_state: Arc<JointState>| {
            if let Some(shared) = weak.upgrade() {
                shared.update_joint_state(&joint_state);
            }
        });
        match source.subscribe(topic, self.shared.config.queue_size, handler) {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                error!(topic, error = %e, "failed to subscribe to joint states");
                None
            }
        }
    }

    /// Stop both feeds.  No-op while stopped.
    pub fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Some(subscription) = session.subscription.as_mut() {
            subscription.shutdown();
        }
        if let (Some(tf), Some(handle)) = (&self.shared.tf_buffer, session.tf_listener.take()) {
            tf.remove_transforms_changed_listener(handle);
        }
        debug!("no longer listening for joint states");
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Topic of the live subscription, or `""` when there is none.
    pub fn monitored_topic(&self) -> &str {
        self.session
            .as_ref()
            .and_then(|s| s.subscription.as_ref())
            .map_or("", Subscription::topic)
    }

    /// When the current monitoring session started.
    pub fn monitor_start_time(&self) -> Option<Stamp> {
        self.session.as_ref().map(|s| s.started_at)
    }
}

impl Drop for CurrentStateMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ingestion and queries on the shared state
// ────────────────────────────────────────────────────────────────────────────

impl Shared {
    /// Active joint indices of `group`; `None` / `""` means the whole model.
    fn resolve_group(&self, group: Option<&str>) -> Option<&[usize]> {
        match group.filter(|g| !g.is_empty()) {
            None => Some(self.model.active_joint_indices()),
            Some(name) => self.model.group(name).map(|g| g.active_joint_indices()),
        }
    }

    fn current_state_time_locked(&self, data: &StateData, group: Option<&str>) -> Stamp {
        let Some(joints) = self.resolve_group(group) else {
            error!(group = group.unwrap_or(""), "there is no group with this name");
            return Stamp::ZERO;
        };
        let mut oldest = Stamp::now();
        for &j in joints {
            match data.joint_time.get(&j) {
                None => {
                    debug!(
                        joint = self.model.joints()[j].name(),
                        "joint has never been updated (and possibly others as well)"
                    );
                    return Stamp::ZERO;
                }
                Some(t) if !t.is_zero() => oldest = oldest.min(*t),
                Some(_) => {}
            }
        }
        oldest
    }

    fn missing_joints(&self, oldest_allowed: Stamp, group: Option<&str>) -> Vec<String> {
        let Some(joints) = self.resolve_group(group) else {
            error!(
                group = group.unwrap_or(""),
                "there is no group with this name; all joints are considered missing"
            );
            return self.model.active_joint_names();
        };
        let data = self.state.lock();
        joints
            .iter()
            .filter_map(|&j| {
                let joint = &self.model.joints()[j];
                match data.joint_time.get(&j) {
                    None => {
                        debug!(joint = joint.name(), "joint has never been updated");
                    }
                    Some(t) if *t < oldest_allowed => {
                        debug!(
                            joint = joint.name(),
                            age_secs = oldest_allowed.seconds_since(*t),
                            "joint was last updated before the requested time"
                        );
                    }
                    Some(_) => return None,
                }
                Some(joint.name().to_string())
            })
            .collect()
    }

    fn update_joint_state(&self, msg: &JointState) {
        if msg.name.len() != msg.position.len() {
            if self.invalid_batch_log.ready(Instant::now()) {
                error!(
                    names = msg.name.len(),
                    positions = msg.position.len(),
                    "invalid joint state: number of joint names does not match number of positions"
                );
            }
            return;
        }

        let copy_dynamics = self.config.copy_dynamics;
        let mut changed = false;
        {
            let mut guard = self.state.lock();
            let data = &mut *guard;
            for (i, name) in msg.name.iter().enumerate() {
                let Some(joint) = self.model.joint(name) else {
                    continue;
                };
                // Multi-variable joints come from transforms.
                if joint.variable_count() != 1 {
                    continue;
                }

                if let Some(&recorded) = data.joint_time.get(&joint.index())
                    && msg.stamp < recorded
                {
                    warn!(
                        joint = %name,
                        %recorded,
                        stamp = %msg.stamp,
                        "joint state is older than the previous one; assuming the recording looped"
                    );
                    data.joint_time.clear();
                }
                data.joint_time.insert(joint.index(), msg.stamp);

                let position = msg.position[i];
                if data.robot_state.joint_positions(joint)[0] != position {
                    changed = true;
                    let stored = if joint.is_continuous() {
                        position
                    } else {
                        clamp_within_tolerance(
                            position,
                            &joint.bounds()[0],
                            self.config.bounds_tolerance,
                        )
                    };
                    data.robot_state.set_joint_positions(joint, &[stored]);
                }

                if copy_dynamics {
                    if msg.velocity.len() == msg.name.len()
                        && data.robot_state.joint_velocity(joint) != Some(msg.velocity[i])
                    {
                        changed = true;
                        data.robot_state
                            .set_joint_velocities(joint, &[msg.velocity[i]]);
                    }
                    if msg.effort.len() == msg.name.len()
                        && data.robot_state.joint_effort(joint) != Some(msg.effort[i])
                    {
                        changed = true;
                        data.robot_state.set_joint_efforts(joint, &[msg.effort[i]]);
                    }
                }
            }
        }

        if changed {
            self.dispatch(msg);
        }
        self.state_update.notify_all();
    }

    fn update_from_transforms(&self) {
        let Some(tf) = &self.tf_buffer else {
            return;
        };
        let threshold = self.config.transform_change_threshold;
        let mut updated = false;
        let mut changed = false;
        {
            let mut guard = self.state.lock();
            let data = &mut *guard;
            for joint in self.model.multi_dof_joints() {
                let parent = joint.parent_link().unwrap_or(self.model.model_frame());
                let child = joint.child_link();

                let transform = match tf.lookup_transform(parent, child) {
                    Ok(t) => t,
                    Err(e) => {
                        let cause = format!("{}: {e}", joint.name());
                        if self.reported_lookup_failures.lock().insert(cause) {
                            warn!(
                                joint = joint.name(),
                                parent,
                                child,
                                error = %e,
                                "unable to update multi-DOF joint: transform lookup failed"
                            );
                        }
                        continue;
                    }
                };

                if let Some(&recorded) = data.joint_time.get(&joint.index())
                    && transform.stamp <= recorded
                    && !transform.stamp.is_zero()
                {
                    continue;
                }
                data.joint_time.insert(joint.index(), transform.stamp);

                let pose = if joint.origin_is_identity() {
                    transform.transform
                } else {
                    joint.origin().inverse().compose(transform.transform)
                };
                let values = joint.compute_variable_positions(&pose);
                if joint.distance(&values, data.robot_state.joint_positions(joint)) > threshold {
                    changed = true;
                }
                data.robot_state.set_joint_positions(joint, &values);
                updated = true;
            }
        }

        if changed {
            self.dispatch(&JointState::default());
        }
        if updated {
            self.state_update.notify_all();
        }
    }

    fn dispatch(&self, msg: &JointState) {
        // Snapshot so callbacks may register further callbacks.
        let callbacks = self.callbacks.lock().clone();
        for callback in &callbacks {
            callback(msg);
        }
    }
}

/// Snap `value` onto a bound it exceeds by at most `tolerance`.
fn clamp_within_tolerance(value: f64, bounds: &VariableBounds, tolerance: f64) -> f64 {
    if value < bounds.min_position && value >= bounds.min_position - tolerance {
        bounds.min_position
    } else if value > bounds.max_position && value <= bounds.max_position + tolerance {
        bounds.max_position
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posewatch_middleware::JointStateBus;
    use posewatch_model::{JointDescription, ModelDescription};
    use posewatch_types::{Quaternion, Transform3D, TransformStamped, Vec3};
    use std::f64::consts::PI;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    fn t(secs: f64) -> Stamp {
        Stamp::from_secs_f64(secs)
    }

    /// J1 revolute bounded to [0, 1], J2 continuous.
    fn two_joint_model() -> Arc<RobotModel> {
        Arc::new(
            RobotModel::from_description(
                ModelDescription::new("two", "base_link")
                    .with_joint(JointDescription::revolute("j1", Some("base_link"), "l1", 0.0, 1.0))
                    .with_joint(JointDescription::continuous("j2", Some("l1"), "l2"))
                    .with_group("first", &["j1"]),
            )
            .unwrap(),
        )
    }

    /// A planar base under `odom` carrying a revolute arm joint.
    fn mobile_model(base_origin: Transform3D) -> Arc<RobotModel> {
        Arc::new(
            RobotModel::from_description(
                ModelDescription::new("mobile", "odom")
                    .with_joint(
                        JointDescription::planar("base", None, "base_link").with_origin(base_origin),
                    )
                    .with_joint(JointDescription::revolute(
                        "arm",
                        Some("base_link"),
                        "arm_link",
                        -1.0,
                        1.0,
                    )),
            )
            .unwrap(),
        )
    }

    fn monitor(model: Arc<RobotModel>) -> CurrentStateMonitor {
        CurrentStateMonitor::new(model, None, MonitorConfig::default())
    }

    fn counting_callback(monitor: &CurrentStateMonitor) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        monitor.add_update_callback(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    fn base_pose(x: f64, y: f64, yaw: f64) -> Transform3D {
        Transform3D::new(Vec3::new(x, y, 0.0), Quaternion::from_yaw(yaw))
    }

    // ── Discrete ingestion ──────────────────────────────────────────────────

    #[test]
    fn complete_state_scenario() {
        let m = monitor(two_joint_model());
        m.update_joint_state(&JointState::new(t(1.0)).with_position("j1", 0.5));
        assert!(!m.have_complete_state(None));
        assert_eq!(m.missing_joints(None), ["j2"]);

        m.update_joint_state(&JointState::new(t(2.0)).with_position("j2", 3.0));
        assert!(m.have_complete_state(None));
        assert!(m.missing_joints(None).is_empty());
        assert_eq!(m.current_state_time(None), t(1.0));
    }

    #[test]
    fn completeness_flips_on_last_missing_joint() {
        let m = monitor(two_joint_model());
        assert!(!m.have_complete_state(None));
        m.update_joint_state(&JointState::new(t(1.0)).with_position("j2", 0.1));
        assert!(!m.have_complete_state(None));
        m.update_joint_state(&JointState::new(t(1.5)).with_position("j1", 0.2));
        assert!(m.have_complete_state(None));
    }

    #[test]
    fn older_batch_clears_update_times() {
        let m = monitor(two_joint_model());
        m.update_joint_state(
            &JointState::new(t(5.0))
                .with_position("j1", 0.5)
                .with_position("j2", 1.0),
        );
        assert!(m.have_complete_state(None));

        m.update_joint_state(&JointState::new(t(3.0)).with_position("j1", 0.6));
        assert!(!m.have_complete_state(None));
        assert_eq!(m.missing_joints(None), ["j2"]);
        assert_eq!(m.current_state_time(None), Stamp::ZERO);
        assert_eq!(m.current_state_values()["j1"], 0.6);

        m.update_joint_state(&JointState::new(t(6.0)).with_position("j2", 1.0));
        assert_eq!(m.current_state_time(None), t(3.0));
    }

    #[test]
    fn first_update_of_a_joint_is_never_a_loop() {
        let m = monitor(two_joint_model());
        m.update_joint_state(&JointState::new(t(5.0)).with_position("j1", 0.5));
        // Before the epoch, but j2 has no recorded time to be older than.
        m.update_joint_state(&JointState::new(t(-5.0)).with_position("j2", 1.0));
        assert!(m.have_complete_state(None));
        assert_eq!(m.current_state_time(None), t(-5.0));
    }

    #[test]
    fn update_times_never_decrease_without_reset() {
        let m = monitor(two_joint_model());
        for k in 1..=5 {
            m.update_joint_state(
                &JointState::new(t(k as f64))
                    .with_position("j1", 0.1)
                    .with_position("j2", k as f64),
            );
            assert_eq!(m.current_state_time(None), t(k as f64));
        }
    }

    #[test]
    fn repeated_batch_is_silent_and_keeps_update_times() {
        let m = monitor(two_joint_model());
        let count = counting_callback(&m);
        let batch = JointState::new(t(2.0))
            .with_position("j1", 0.5)
            .with_position("j2", 0.5);

        m.update_joint_state(&batch);
        m.update_joint_state(&batch);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(m.have_complete_state(None));
        assert_eq!(m.current_state_time(None), t(2.0));
    }

    #[test]
    fn mismatched_lengths_drop_whole_batch() {
        let m = monitor(two_joint_model());
        let count = counting_callback(&m);
        let mut batch = JointState::new(t(1.0)).with_position("j1", 0.5);
        batch.name.push("j2".into());
        m.update_joint_state(&batch);

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(m.missing_joints(None), ["j1", "j2"]);
        assert_eq!(m.current_state_values()["j1"], 0.0);
    }

    #[test]
    fn unknown_and_multi_variable_joints_are_skipped() {
        let m = monitor(mobile_model(Transform3D::identity()));
        m.update_joint_state(
            &JointState::new(t(1.0))
                .with_position("ghost", 4.0)
                .with_position("base", 2.0)
                .with_position("arm", 0.3),
        );
        let values = m.current_state_values();
        assert_eq!(values["arm"], 0.3);
        assert_eq!(values["base/x"], 0.0);
        assert_eq!(m.missing_joints(None), ["base"]);
    }

    #[test]
    fn bounds_tolerance_with_default_epsilon() {
        let m = monitor(two_joint_model());
        m.update_joint_state(&JointState::new(t(1.0)).with_position("j1", -0.4 * f64::EPSILON));
        assert_eq!(m.current_state_values()["j1"], 0.0);

        m.update_joint_state(&JointState::new(t(2.0)).with_position("j1", -2.0 * f64::EPSILON));
        assert_eq!(m.current_state_values()["j1"], -2.0 * f64::EPSILON);

        m.update_joint_state(&JointState::new(t(3.0)).with_position("j1", 1.0 + 2.0 * f64::EPSILON));
        assert_eq!(m.current_state_values()["j1"], 1.0 + 2.0 * f64::EPSILON);
    }

    #[test]
    fn bounds_tolerance_is_configurable() {
        let m = CurrentStateMonitor::new(
            two_joint_model(),
            None,
            MonitorConfig::default().with_bounds_tolerance(1e-3),
        );
        m.update_joint_state(&JointState::new(t(1.0)).with_position("j1", 1.0005));
        assert_eq!(m.current_state_values()["j1"], 1.0);
        m.update_joint_state(&JointState::new(t(2.0)).with_position("j1", 1.002));
        assert_eq!(m.current_state_values()["j1"], 1.002);
    }

    #[test]
    fn continuous_joint_is_never_clamped() {
        let m = CurrentStateMonitor::new(
            two_joint_model(),
            None,
            MonitorConfig::default().with_bounds_tolerance(1.0),
        );
        m.update_joint_state(&JointState::new(t(1.0)).with_position("j2", PI + 0.5));
        assert_eq!(m.current_state_values()["j2"], PI + 0.5);
    }

    #[test]
    fn dynamics_are_ignored_by_default() {
        let m = monitor(two_joint_model());
        m.update_joint_state(&JointState::new(t(1.0)).with_dynamics("j1", 0.5, 0.1, 2.0));
        assert!(!m.current_state().has_velocities());
        assert!(!m.current_state().has_efforts());
    }

    #[test]
    fn dynamics_copy_merges_and_marks_changes() {
        let m = CurrentStateMonitor::new(
            two_joint_model(),
            None,
            MonitorConfig::default().with_copy_dynamics(true),
        );
        let count = counting_callback(&m);
        m.update_joint_state(&JointState::new(t(1.0)).with_dynamics("j1", 0.5, 0.1, 2.0));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Same position, new velocity.
        m.update_joint_state(&JointState::new(t(2.0)).with_dynamics("j1", 0.5, 0.2, 2.0));
        assert_eq!(count.load(Ordering::SeqCst), 2);

        let state = m.current_state();
        let j1 = m.model().joint("j1").unwrap();
        assert_eq!(state.joint_velocity(j1), Some(0.2));
        assert_eq!(state.joint_effort(j1), Some(2.0));

        // Dynamics arrays shorter than the name array are ignored.
        let batch = JointState::new(t(3.0))
            .with_dynamics("j1", 0.5, 0.9, 9.0)
            .with_position("j2", 0.0);
        m.update_joint_state(&batch);
        let state = m.current_state();
        assert_eq!(state.joint_velocity(j1), Some(0.2));
        assert_eq!(state.joint_effort(j1), Some(2.0));
    }

    #[test]
    fn copy_into_follows_dynamics_setting() {
        let model = two_joint_model();
        for copy_dynamics in [false, true] {
            let m = CurrentStateMonitor::new(
                Arc::clone(&model),
                None,
                MonitorConfig::default().with_copy_dynamics(copy_dynamics),
            );
            m.update_joint_state(&JointState::new(t(1.0)).with_dynamics("j1", 0.7, 0.3, 1.5));

            let mut target = RobotState::new(Arc::clone(&model));
            m.copy_current_state_into(&mut target);
            assert_eq!(target.variable_positions()[0], 0.7);
            assert_eq!(target.has_velocities(), copy_dynamics);
            assert_eq!(target.has_efforts(), copy_dynamics);
            assert!(!target.has_accelerations());
        }
    }

    #[test]
    fn state_and_time_match_for_group() {
        let m = monitor(two_joint_model());
        m.update_joint_state(&JointState::new(t(4.0)).with_position("j1", 0.25));
        let (state, time) = m.current_state_and_time(Some("first"));
        assert_eq!(state.variable_positions()[0], 0.25);
        assert_eq!(time, t(4.0));
        assert_eq!(m.current_state_time(None), Stamp::ZERO);
    }

    #[test]
    fn unknown_group_reports_everything_missing() {
        let m = monitor(two_joint_model());
        m.update_joint_state(
            &JointState::new(t(1.0))
                .with_position("j1", 0.1)
                .with_position("j2", 0.1),
        );
        assert!(m.have_complete_state(None));
        assert!(!m.have_complete_state(Some("nope")));
        assert_eq!(m.missing_joints(Some("nope")), ["j1", "j2"]);
        assert_eq!(m.current_state_time(Some("nope")), Stamp::ZERO);
    }

    #[test]
    fn stale_joints_count_as_missing_since() {
        let m = monitor(two_joint_model());
        m.update_joint_state(&JointState::new(t(1.0)).with_position("j1", 0.1));
        m.update_joint_state(&JointState::new(t(5.0)).with_position("j2", 0.1));
        assert!(m.have_complete_state_since(t(1.0), None));
        assert_eq!(m.missing_joints_since(t(3.0), None), ["j1"]);
        assert!(!m.have_complete_state_since(t(3.0), Some("nope")));
    }

    // ── Callbacks ───────────────────────────────────────────────────────────

    #[test]
    fn callbacks_run_in_order_and_can_be_cleared() {
        let m = monitor(two_joint_model());
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for id in 0..3 {
            let order = Arc::clone(&order);
            m.add_update_callback(move |_| order.lock().push(id));
        }
        m.update_joint_state(&JointState::new(t(1.0)).with_position("j1", 0.5));
        assert_eq!(*order.lock(), [0, 1, 2]);

        m.clear_update_callbacks();
        m.update_joint_state(&JointState::new(t(2.0)).with_position("j1", 0.6));
        assert_eq!(order.lock().len(), 3);
    }

    #[test]
    fn callback_may_read_monitor() {
        let m = Arc::new(monitor(two_joint_model()));
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let weak = Arc::downgrade(&m);
        let s = Arc::clone(&seen);
        m.add_update_callback(move |_| {
            if let Some(m) = weak.upgrade() {
                *s.lock() = Some(m.current_state_values()["j1"]);
            }
        });
        m.update_joint_state(&JointState::new(t(1.0)).with_position("j1", 0.42));
        assert_eq!(*seen.lock(), Some(0.42));
    }

    // ── Transforms ──────────────────────────────────────────────────────────

    fn tf_monitor(model: Arc<RobotModel>) -> (CurrentStateMonitor, Arc<TransformBuffer>) {
        let tf = Arc::new(TransformBuffer::new());
        let m = CurrentStateMonitor::new(model, Some(Arc::clone(&tf)), MonitorConfig::default());
        (m, tf)
    }

    #[test]
    fn planar_joint_follows_transform() {
        let (m, tf) = tf_monitor(mobile_model(Transform3D::identity()));
        let payloads = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let p = Arc::clone(&payloads);
        m.add_update_callback(move |js| p.lock().push(js.is_empty()));

        tf.set_transform(
            TransformStamped::new(t(1.0), "odom", "base_link", base_pose(1.0, 2.0, 0.5)),
            false,
        );
        m.update_from_transforms();

        let values = m.current_state_values();
        assert!((values["base/x"] - 1.0).abs() < 1e-9);
        assert!((values["base/y"] - 2.0).abs() < 1e-9);
        assert!((values["base/theta"] - 0.5).abs() < 1e-9);
        assert_eq!(*payloads.lock(), [true]);
        assert_eq!(m.missing_joints(None), ["arm"]);
    }

    #[test]
    fn older_or_equal_transform_is_ignored() {
        let (m, tf) = tf_monitor(mobile_model(Transform3D::identity()));
        tf.set_transform(
            TransformStamped::new(t(2.0), "odom", "base_link", base_pose(1.0, 0.0, 0.0)),
            false,
        );
        m.update_from_transforms();
        tf.set_transform(
            TransformStamped::new(t(1.0), "odom", "base_link", base_pose(5.0, 0.0, 0.0)),
            false,
        );
        m.update_from_transforms();
        assert!((m.current_state_values()["base/x"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn static_transform_is_always_accepted_but_not_timed() {
        let (m, tf) = tf_monitor(mobile_model(Transform3D::identity()));
        let count = counting_callback(&m);
        tf.set_transform(
            TransformStamped::new(Stamp::ZERO, "odom", "base_link", base_pose(1.0, 0.0, 0.0)),
            true,
        );
        m.update_from_transforms();
        m.update_from_transforms();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tf.set_transform(
            TransformStamped::new(Stamp::ZERO, "odom", "base_link", base_pose(3.0, 0.0, 0.0)),
            true,
        );
        m.update_from_transforms();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!((m.current_state_values()["base/x"] - 3.0).abs() < 1e-9);

        m.update_joint_state(&JointState::new(t(7.0)).with_position("arm", 0.1));
        assert!(m.have_complete_state(None));
        assert_eq!(m.current_state_time(None), t(7.0));
    }

    #[test]
    fn tiny_transform_change_updates_without_callback() {
        let (m, tf) = tf_monitor(mobile_model(Transform3D::identity()));
        let count = counting_callback(&m);
        tf.set_transform(
            TransformStamped::new(t(1.0), "odom", "base_link", base_pose(1.0, 0.0, 0.0)),
            false,
        );
        m.update_from_transforms();
        tf.set_transform(
            TransformStamped::new(t(2.0), "odom", "base_link", base_pose(1.0 + 1e-7, 0.0, 0.0)),
            false,
        );
        m.update_from_transforms();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(m.current_state_values()["base/x"], 1.0 + 1e-7);
    }

    #[test]
    fn joint_origin_is_removed_from_transform() {
        let origin = Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity());
        let (m, tf) = tf_monitor(mobile_model(origin));
        tf.set_transform(
            TransformStamped::new(t(1.0), "odom", "base_link", base_pose(3.0, 1.0, 0.0)),
            false,
        );
        m.update_from_transforms();
        let values = m.current_state_values();
        assert!((values["base/x"] - 2.0).abs() < 1e-9);
        assert!((values["base/y"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn lookup_failure_is_reported_once() {
        let (m, _tf) = tf_monitor(mobile_model(Transform3D::identity()));
        m.update_from_transforms();
        m.update_from_transforms();
        assert_eq!(m.shared.reported_lookup_failures.lock().len(), 1);
        assert_eq!(m.current_state_values()["base/x"], 0.0);
    }

    // ── Waiting ─────────────────────────────────────────────────────────────

    #[test]
    fn wait_for_current_state_wakes_on_update() {
        let m = Arc::new(monitor(two_joint_model()));
        m.update_joint_state(
            &JointState::new(t(8.0))
                .with_position("j1", 0.1)
                .with_position("j2", 0.1),
        );

        let writer = Arc::clone(&m);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            writer.update_joint_state(
                &JointState::new(t(10.0))
                    .with_position("j1", 0.2)
                    .with_position("j2", 0.2),
            );
        });

        let started = Instant::now();
        assert!(m.wait_for_current_state(t(10.0), Duration::from_secs(1)));
        assert!(started.elapsed() < Duration::from_millis(900));
        handle.join().unwrap();
    }

    #[test]
    fn wait_for_current_state_times_out() {
        let m = monitor(two_joint_model());
        m.update_joint_state(
            &JointState::new(t(8.0))
                .with_position("j1", 0.1)
                .with_position("j2", 0.1),
        );
        let started = Instant::now();
        assert!(!m.wait_for_current_state(t(10.0), Duration::from_secs(1)));
        assert!(started.elapsed() >= Duration::from_millis(990));
    }

    #[test]
    fn wait_for_complete_state_reports_missing_joints() {
        let m = monitor(two_joint_model());
        m.update_joint_state(&JointState::new(t(1.0)).with_position("j1", 0.1));
        let err = m
            .wait_for_complete_state(None, Duration::from_millis(50))
            .unwrap_err();
        assert_eq!(
            err,
            MonitorError::MissingJoints {
                group: None,
                joints: vec!["j2".into()],
            }
        );
        assert!(m.wait_for_complete_state(Some("first"), Duration::from_millis(50)).is_ok());
    }

    #[test]
    fn wait_for_complete_state_succeeds_when_feed_catches_up() {
        let m = Arc::new(monitor(two_joint_model()));
        let writer = Arc::clone(&m);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            writer.update_joint_state(
                &JointState::new(t(1.0))
                    .with_position("j1", 0.1)
                    .with_position("j2", 0.1),
            );
        });
        assert!(m.wait_for_complete_state(None, Duration::from_secs(2)).is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn wait_for_current_state_accepts_unbounded_timeout() {
        let m = Arc::new(monitor(two_joint_model()));
        m.update_joint_state(
            &JointState::new(t(8.0))
                .with_position("j1", 0.1)
                .with_position("j2", 0.1),
        );
        assert!(m.wait_for_current_state(t(1.0), Duration::MAX));

        let writer = Arc::clone(&m);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            writer.update_joint_state(
                &JointState::new(t(10.0))
                    .with_position("j1", 0.2)
                    .with_position("j2", 0.2),
            );
        });
        assert!(m.wait_for_current_state(t(10.0), Duration::MAX));
        handle.join().unwrap();
    }

    #[test]
    fn wait_for_complete_state_accepts_unbounded_timeout() {
        let m = Arc::new(monitor(two_joint_model()));
        m.update_joint_state(&JointState::new(t(1.0)).with_position("j1", 0.1));
        assert!(m.wait_for_complete_state(Some("first"), Duration::MAX).is_ok());

        let writer = Arc::clone(&m);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            writer.update_joint_state(&JointState::new(t(2.0)).with_position("j2", 0.1));
        });
        assert!(m.wait_for_complete_state(None, Duration::MAX).is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn waiters_wake_after_callbacks_finish() {
        let m = Arc::new(monitor(two_joint_model()));
        m.update_joint_state(
            &JointState::new(t(8.0))
                .with_position("j1", 0.1)
                .with_position("j2", 0.1),
        );
        let callback_done = Arc::new(AtomicBool::new(false));
        let done = Arc::clone(&callback_done);
        m.add_update_callback(move |_| {
            thread::sleep(Duration::from_millis(100));
            done.store(true, Ordering::SeqCst);
        });

        let waiter = Arc::clone(&m);
        let seen = Arc::clone(&callback_done);
        let handle = thread::spawn(move || {
            let reached = waiter.wait_for_current_state(t(10.0), Duration::from_secs(5));
            (reached, seen.load(Ordering::SeqCst))
        });

        thread::sleep(Duration::from_millis(100));
        m.update_joint_state(
            &JointState::new(t(10.0))
                .with_position("j1", 0.2)
                .with_position("j2", 0.2),
        );
        assert_eq!(handle.join().unwrap(), (true, true));
    }

    #[test]
    fn unchanged_batch_with_newer_stamp_releases_waiter() {
        let m = Arc::new(monitor(two_joint_model()));
        let batch = |secs| {
            JointState::new(t(secs))
                .with_position("j1", 0.3)
                .with_position("j2", 0.3)
        };
        m.update_joint_state(&batch(8.0));
        let calls = counting_callback(&m);

        let writer = Arc::clone(&m);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            writer.update_joint_state(&batch(10.0));
        });
        assert!(m.wait_for_current_state(t(10.0), Duration::from_secs(2)));
        handle.join().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_batch_errors_are_throttled() {
        let throttle = LogThrottle::new(Duration::from_secs(1));
        let now = Instant::now();
        assert!(throttle.ready(now));
        assert!(!throttle.ready(now + Duration::from_millis(500)));
        assert!(throttle.ready(now + Duration::from_secs(1)));
        assert!(!throttle.ready(now + Duration::from_millis(1500)));
    }

    // ── Concurrency ─────────────────────────────────────────────────────────

    #[test]
    fn snapshot_values_and_time_come_from_same_update() {
        let m = Arc::new(monitor(two_joint_model()));
        let writer = Arc::clone(&m);
        let handle = thread::spawn(move || {
            for k in 1..=2000 {
                let k = k as f64;
                writer.update_joint_state(
                    &JointState::new(t(k))
                        .with_position("j1", 0.5)
                        .with_position("j2", k),
                );
            }
        });

        let j2 = m.model().joint("j2").unwrap().first_variable_index();
        for _ in 0..2000 {
            let (state, time) = m.current_state_and_time(None);
            if time.is_zero() {
                continue;
            }
            assert_eq!(state.variable_positions()[j2], time.as_secs_f64());
        }
        handle.join().unwrap();
    }

    #[test]
    fn concurrent_feeds_do_not_interleave() {
        let (m, tf) = tf_monitor(mobile_model(Transform3D::identity()));
        let m = Arc::new(m);

        let joints = {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                for k in 1..=500 {
                    m.update_joint_state(
                        &JointState::new(t(k as f64)).with_position("arm", (k % 10) as f64 * 0.1),
                    );
                }
            })
        };
        let transforms = {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                for k in 1..=500 {
                    tf.set_transform(
                        TransformStamped::new(
                            t(k as f64),
                            "odom",
                            "base_link",
                            base_pose(k as f64, 0.0, 0.0),
                        ),
                        false,
                    );
                    m.update_from_transforms();
                }
            })
        };
        joints.join().unwrap();
        transforms.join().unwrap();

        assert!(m.have_complete_state(None));
        assert!((m.current_state_values()["base/x"] - 500.0).abs() < 1e-9);
        assert_eq!(m.current_state_time(None), t(500.0));
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    #[test]
    fn start_and_stop_wire_both_feeds() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let bus = Arc::new(JointStateBus::with_default_capacity(rt.handle().clone()));
        let (m, tf) = tf_monitor(mobile_model(Transform3D::identity()));
        let mut m = m.with_joint_state_source(bus.clone());

        assert!(!m.is_active());
        assert_eq!(m.monitored_topic(), "");
        assert_eq!(m.monitor_start_time(), None);

        m.start("/joint_states");
        assert!(m.is_active());
        assert_eq!(m.monitored_topic(), "/joint_states");
        assert!(m.monitor_start_time().is_some());
        assert_eq!(tf.listener_count(), 1);

        // The listener feeds the base joint as soon as the transform lands.
        tf.set_transform(
            TransformStamped::new(t(3.0), "odom", "base_link", base_pose(2.0, 0.0, 0.0)),
            false,
        );
        assert!((m.current_state_values()["base/x"] - 2.0).abs() < 1e-9);

        assert_eq!(
            bus.publish("/joint_states", JointState::new(t(3.0)).with_position("arm", 0.4))
                .unwrap(),
            1
        );
        assert!(m.wait_for_current_state(t(3.0), Duration::from_secs(2)));
        assert_eq!(m.current_state_values()["arm"], 0.4);

        m.stop();
        m.stop();
        assert!(!m.is_active());
        assert_eq!(m.monitored_topic(), "");
        assert_eq!(tf.listener_count(), 0);

        tf.set_transform(
            TransformStamped::new(t(4.0), "odom", "base_link", base_pose(9.0, 0.0, 0.0)),
            false,
        );
        assert!((m.current_state_values()["base/x"] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn start_clears_update_times_and_is_idempotent() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let bus = Arc::new(JointStateBus::with_default_capacity(rt.handle().clone()));
        let mut m = monitor(two_joint_model()).with_joint_state_source(bus.clone());
        m.update_joint_state(
            &JointState::new(t(1.0))
                .with_position("j1", 0.1)
                .with_position("j2", 0.1),
        );
        assert!(m.have_complete_state(None));

        m.start("/joint_states");
        assert!(!m.have_complete_state(None));
        let started = m.monitor_start_time();

        m.start("/other");
        assert_eq!(m.monitored_topic(), "/joint_states");
        assert_eq!(m.monitor_start_time(), started);
        assert_eq!(bus.subscriber_count("/other"), 0);
    }

    #[test]
    fn empty_topic_still_registers_transform_listener() {
        let (m, tf) = tf_monitor(mobile_model(Transform3D::identity()));
        let mut m = m;
        m.start("");
        assert!(m.is_active());
        assert_eq!(m.monitored_topic(), "");
        assert_eq!(tf.listener_count(), 1);
    }

    #[test]
    fn no_listener_without_transform_joints() {
        let tf = Arc::new(TransformBuffer::new());
        let mut m =
            CurrentStateMonitor::new(two_joint_model(), Some(Arc::clone(&tf)), MonitorConfig::default());
        m.start("/joint_states");
        assert!(m.is_active());
        assert_eq!(tf.listener_count(), 0);
    }

    #[test]
    fn drop_deregisters_listener() {
        let (m, tf) = tf_monitor(mobile_model(Transform3D::identity()));
        let mut m = m;
        m.start("/joint_states");
        assert_eq!(tf.listener_count(), 1);
        drop(m);
        assert_eq!(tf.listener_count(), 0);
    }
}
