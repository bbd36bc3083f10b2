use thiserror::Error;

/// Failures reported by the blocking queries of
/// [`CurrentStateMonitor`][crate::CurrentStateMonitor].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// The state did not become complete in time.  `group` is `None` when the
    /// whole model was requested.
    #[error(
        "{} has missing joints: {}",
        group.as_deref().map_or("robot model".to_string(), |g| format!("group '{g}'")),
        joints.join(", ")
    )]
    MissingJoints {
        group: Option<String>,
        joints: Vec<String>,
    },
}
