//! Feed payloads.

use serde::{Deserialize, Serialize};

use crate::geometry::Transform3D;
use crate::stamp::Stamp;

/// A batch of joint readings sharing one timestamp.
///
/// `name` and `position` must have equal length for the batch to be usable.
/// `velocity` and `effort` are optional: an empty vector (or any vector whose
/// length differs from `name`) means "not reported".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointState {
    pub stamp: Stamp,
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub position: Vec<f64>,
    #[serde(default)]
    pub velocity: Vec<f64>,
    #[serde(default)]
    pub effort: Vec<f64>,
}

impl JointState {
    /// An empty batch stamped with `stamp`.
    pub fn new(stamp: Stamp) -> Self {
        Self {
            stamp,
            ..Self::default()
        }
    }

    /// Append a position-only reading.
    pub fn with_position(mut self, name: impl Into<String>, position: f64) -> Self {
        self.name.push(name.into());
        self.position.push(position);
        self
    }

    /// Append a reading with velocity and effort.
    pub fn with_dynamics(
        mut self,
        name: impl Into<String>,
        position: f64,
        velocity: f64,
        effort: f64,
    ) -> Self {
        self.name.push(name.into());
        self.position.push(position);
        self.velocity.push(velocity);
        self.effort.push(effort);
        self
    }

    /// `true` when the batch carries no joints.  Transform-driven updates are
    /// announced to update callbacks with an empty batch.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

/// A transform between two named frames at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformStamped {
    pub stamp: Stamp,
    pub parent_frame: String,
    pub child_frame: String,
    pub transform: Transform3D,
}

impl TransformStamped {
    pub fn new(
        stamp: Stamp,
        parent_frame: impl Into<String>,
        child_frame: impl Into<String>,
        transform: Transform3D,
    ) -> Self {
        Self {
            stamp,
            parent_frame: parent_frame.into(),
            child_frame: child_frame.into(),
            transform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_arrays_aligned() {
        let js = JointState::new(Stamp::from_secs_f64(1.0))
            .with_position("shoulder", 0.5)
            .with_position("elbow", -0.2);
        assert_eq!(js.name.len(), js.position.len());
        assert!(js.velocity.is_empty());
        assert!(!js.is_empty());
    }

    #[test]
    fn default_batch_is_empty() {
        assert!(JointState::default().is_empty());
    }

    #[test]
    fn missing_optional_arrays_deserialize_empty() {
        let js: JointState = serde_json::from_str(
            r#"{"stamp":"1970-01-01T00:00:05Z","name":["a"],"position":[1.0]}"#,
        )
        .unwrap();
        assert_eq!(js.stamp, Stamp::from_secs_f64(5.0));
        assert!(js.effort.is_empty());
    }
}
