//! Tunables of [`CurrentStateMonitor`][crate::CurrentStateMonitor].

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Monitor configuration.  Every field has a default, so a partial TOML
/// table (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Merge velocity and effort from joint-state batches, and copy
    /// velocity / acceleration / effort in
    /// [`copy_current_state_into`][crate::CurrentStateMonitor::copy_current_state_into].
    #[serde(default)]
    pub copy_dynamics: bool,

    /// A bounded joint reported at most this far outside its limits is
    /// clamped onto the limit.
    #[serde(default = "default_bounds_tolerance")]
    pub bounds_tolerance: f64,

    /// Transform-driven joints whose new values are within this distance of
    /// the stored ones do not fire update callbacks.
    #[serde(default = "default_transform_change_threshold")]
    pub transform_change_threshold: f64,

    /// Upper bound on the polling step of
    /// [`wait_for_complete_state`][crate::CurrentStateMonitor::wait_for_complete_state].
    #[serde(default = "default_complete_poll_interval_ms")]
    pub complete_poll_interval_ms: u64,

    /// Queue size requested when subscribing to the joint-state topic.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

fn default_bounds_tolerance() -> f64 {
    f64::EPSILON
}
fn default_transform_change_threshold() -> f64 {
    1e-5
}
fn default_complete_poll_interval_ms() -> u64 {
    50
}
fn default_queue_size() -> usize {
    25
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            copy_dynamics: false,
            bounds_tolerance: default_bounds_tolerance(),
            transform_change_threshold: default_transform_change_threshold(),
            complete_poll_interval_ms: default_complete_poll_interval_ms(),
            queue_size: default_queue_size(),
        }
    }
}

impl MonitorConfig {
    pub fn with_copy_dynamics(mut self, copy_dynamics: bool) -> Self {
        self.copy_dynamics = copy_dynamics;
        self
    }

    pub fn with_bounds_tolerance(mut self, tolerance: f64) -> Self {
        self.bounds_tolerance = tolerance;
        self
    }

    pub fn complete_poll_interval(&self) -> Duration {
        Duration::from_millis(self.complete_poll_interval_ms)
    }
}
