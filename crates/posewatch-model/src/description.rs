//! Serializable robot description.
//!
//! A [`ModelDescription`] is the on-disk (TOML) form of a
//! [`RobotModel`][crate::RobotModel]:
//!
//! ```toml
//! name = "mobile_arm"
//! model_frame = "odom"
//!
//! [[joints]]
//! name = "base_joint"
//! type = "planar"
//! child = "base_link"
//!
//! [[joints]]
//! name = "shoulder"
//! type = "revolute"
//! parent = "base_link"
//! child = "upper_arm"
//! limits = { lower = -1.5, upper = 1.5 }
//!
//! [[groups]]
//! name = "arm"
//! joints = ["shoulder"]
//! ```

use posewatch_types::{Transform3D, Vec3};
use serde::{Deserialize, Serialize};

use crate::joint::JointType;

fn default_axis() -> Vec3 {
    Vec3::new(0.0, 0.0, 1.0)
}

/// Position limits of a bounded single-variable joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitsDescription {
    pub lower: f64,
    pub upper: f64,
}

/// One joint of a [`ModelDescription`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub joint_type: JointType,
    /// Parent link; omitted for the root joint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub child: String,
    #[serde(default = "default_axis")]
    pub axis: Vec3,
    #[serde(default)]
    pub origin: Transform3D,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<LimitsDescription>,
}

impl JointDescription {
    fn new(name: &str, joint_type: JointType, parent: Option<&str>, child: &str) -> Self {
        Self {
            name: name.to_string(),
            joint_type,
            parent: parent.map(str::to_string),
            child: child.to_string(),
            axis: default_axis(),
            origin: Transform3D::identity(),
            limits: None,
        }
    }

    pub fn fixed(name: &str, parent: Option<&str>, child: &str) -> Self {
        Self::new(name, JointType::Fixed, parent, child)
    }

    pub fn revolute(name: &str, parent: Option<&str>, child: &str, lower: f64, upper: f64) -> Self {
        Self::new(name, JointType::Revolute, parent, child).with_limits(lower, upper)
    }

    pub fn continuous(name: &str, parent: Option<&str>, child: &str) -> Self {
        Self::new(name, JointType::Continuous, parent, child)
    }

    pub fn prismatic(name: &str, parent: Option<&str>, child: &str, lower: f64, upper: f64) -> Self {
        Self::new(name, JointType::Prismatic, parent, child).with_limits(lower, upper)
    }

    pub fn planar(name: &str, parent: Option<&str>, child: &str) -> Self {
        Self::new(name, JointType::Planar, parent, child)
    }

    pub fn floating(name: &str, parent: Option<&str>, child: &str) -> Self {
        Self::new(name, JointType::Floating, parent, child)
    }

    pub fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.limits = Some(LimitsDescription { lower, upper });
        self
    }

    pub fn with_axis(mut self, axis: Vec3) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_origin(mut self, origin: Transform3D) -> Self {
        self.origin = origin;
        self
    }
}

/// A named subset of joints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDescription {
    pub name: String,
    pub joints: Vec<String>,
}

/// Complete robot description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub name: String,
    /// Frame root joints are attached to.
    pub model_frame: String,
    #[serde(default)]
    pub joints: Vec<JointDescription>,
    #[serde(default)]
    pub groups: Vec<GroupDescription>,
}

impl ModelDescription {
    pub fn new(name: &str, model_frame: &str) -> Self {
        Self {
            name: name.to_string(),
            model_frame: model_frame.to_string(),
            joints: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_joint(mut self, joint: JointDescription) -> Self {
        self.joints.push(joint);
        self
    }

    pub fn with_group(mut self, name: &str, joints: &[&str]) -> Self {
        self.groups.push(GroupDescription {
            name: name.to_string(),
            joints: joints.iter().map(|j| j.to_string()).collect(),
        });
        self
    }
}
