//! `posewatch-monitor` – live robot state from joint-state and transform feeds.
//!
//! [`CurrentStateMonitor`] fuses two asynchronous feeds into one consistent
//! [`RobotState`]:
//!
//! | Feed | Drives | Entry point |
//! |------|--------|-------------|
//! | Joint-state batches (topic) | single-variable joints | [`CurrentStateMonitor::update_joint_state`] |
//! | Transform buffer changes | planar / floating joints | [`CurrentStateMonitor::update_from_transforms`] |
//!
//! Besides the pose itself, the monitor tracks when every joint was last
//! updated, which answers "is the state complete?" and "is it at least as
//! new as time *t*?".
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use posewatch_model::{JointDescription, ModelDescription, RobotModel};
//! use posewatch_monitor::{CurrentStateMonitor, MonitorConfig};
//! use posewatch_types::{JointState, Stamp};
//!
//! let model = Arc::new(RobotModel::from_description(
//!     ModelDescription::new("arm", "base_link")
//!         .with_joint(JointDescription::revolute("shoulder", Some("base_link"), "upper_arm", -1.0, 1.0)),
//! ).unwrap());
//!
//! let monitor = CurrentStateMonitor::new(model, None, MonitorConfig::default());
//! assert!(!monitor.have_complete_state(None));
//!
//! monitor.update_joint_state(
//!     &JointState::new(Stamp::from_secs_f64(1.0)).with_position("shoulder", 0.25),
//! );
//! assert!(monitor.have_complete_state(None));
//! assert_eq!(monitor.current_state_values()["shoulder"], 0.25);
//! ```

pub mod config;
pub mod current_state_monitor;
pub mod error;
pub mod robot_state;

pub use config::MonitorConfig;
pub use current_state_monitor::{CurrentStateMonitor, UpdateCallback};
pub use error::MonitorError;
pub use robot_state::RobotState;
