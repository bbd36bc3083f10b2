//! [`JointModel`] – one degree-of-freedom connector between two links.
//!
//! A joint owns a contiguous slice of the model's variable vector starting at
//! [`JointModel::first_variable_index`].  Single-variable joints (revolute,
//! continuous, prismatic) are reported by the joint-state feed; multi-variable
//! joints (planar, floating) are driven by transforms.

use std::f64::consts::PI;

use posewatch_types::{Quaternion, Transform3D, Vec3};
use serde::{Deserialize, Serialize};

/// Joint kinds understood by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    /// No motion; contributes no variables.
    Fixed,
    /// Rotation around `axis` within position bounds.
    Revolute,
    /// Unbounded (wrapping) rotation around `axis`.
    Continuous,
    /// Translation along `axis` within position bounds.
    Prismatic,
    /// Motion in the parent XY plane: `x`, `y`, `theta`.
    Planar,
    /// Full 6-DOF motion: translation plus a quaternion.
    Floating,
}

impl JointType {
    /// Number of scalar variables a joint of this kind contributes.
    pub fn variable_count(self) -> usize {
        match self {
            JointType::Fixed => 0,
            JointType::Revolute | JointType::Continuous | JointType::Prismatic => 1,
            JointType::Planar => 3,
            JointType::Floating => 7,
        }
    }

    fn variable_suffixes(self) -> &'static [&'static str] {
        match self {
            JointType::Planar => &["x", "y", "theta"],
            JointType::Floating => &[
                "trans_x", "trans_y", "trans_z", "rot_x", "rot_y", "rot_z", "rot_w",
            ],
            _ => &[],
        }
    }
}

/// Position bounds of a single variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableBounds {
    pub min_position: f64,
    pub max_position: f64,
    /// `false` for variables that wrap or are not limited at all.
    pub position_bounded: bool,
}

impl VariableBounds {
    pub fn bounded(min_position: f64, max_position: f64) -> Self {
        Self {
            min_position,
            max_position,
            position_bounded: true,
        }
    }

    pub fn unbounded(min_position: f64, max_position: f64) -> Self {
        Self {
            min_position,
            max_position,
            position_bounded: false,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min_position && value <= self.max_position
    }
}

/// Read-only description of one joint inside a [`RobotModel`][crate::RobotModel].
#[derive(Debug, Clone)]
pub struct JointModel {
    pub(crate) name: String,
    pub(crate) joint_type: JointType,
    pub(crate) index: usize,
    pub(crate) parent_link: Option<String>,
    pub(crate) child_link: String,
    pub(crate) axis: Vec3,
    pub(crate) origin: Transform3D,
    pub(crate) origin_is_identity: bool,
    pub(crate) bounds: Vec<VariableBounds>,
    pub(crate) variable_names: Vec<String>,
    pub(crate) first_variable_index: usize,
}

impl JointModel {
    pub(crate) fn new(
        name: String,
        joint_type: JointType,
        parent_link: Option<String>,
        child_link: String,
        axis: Vec3,
        origin: Transform3D,
        limits: Option<(f64, f64)>,
    ) -> Self {
        let variable_names = match joint_type.variable_count() {
            0 => Vec::new(),
            1 => vec![name.clone()],
            _ => joint_type
                .variable_suffixes()
                .iter()
                .map(|s| format!("{name}/{s}"))
                .collect(),
        };
        let bounds = match joint_type {
            JointType::Fixed => Vec::new(),
            JointType::Revolute | JointType::Prismatic => {
                let (lo, hi) = limits.unwrap_or((-PI, PI));
                vec![VariableBounds::bounded(lo, hi)]
            }
            JointType::Continuous => vec![VariableBounds::unbounded(-PI, PI)],
            JointType::Planar => vec![
                VariableBounds::unbounded(f64::NEG_INFINITY, f64::INFINITY),
                VariableBounds::unbounded(f64::NEG_INFINITY, f64::INFINITY),
                VariableBounds::unbounded(-PI, PI),
            ],
            JointType::Floating => {
                let mut b = vec![VariableBounds::unbounded(f64::NEG_INFINITY, f64::INFINITY); 3];
                b.extend([VariableBounds::unbounded(-1.0, 1.0); 4]);
                b
            }
        };
        Self {
            name,
            joint_type,
            index: 0,
            parent_link,
            child_link,
            axis: axis.normalized(),
            origin_is_identity: origin.is_identity(f64::EPSILON),
            origin,
            bounds,
            variable_names,
            first_variable_index: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn joint_type(&self) -> JointType {
        self.joint_type
    }

    /// Position of this joint in [`RobotModel::joints`][crate::RobotModel::joints].
    pub fn index(&self) -> usize {
        self.index
    }

    /// Parent link name, or `None` for a root joint (whose parent frame is
    /// the model frame).
    pub fn parent_link(&self) -> Option<&str> {
        self.parent_link.as_deref()
    }

    pub fn child_link(&self) -> &str {
        &self.child_link
    }

    /// Fixed offset between the parent link and the joint frame.
    pub fn origin(&self) -> &Transform3D {
        &self.origin
    }

    pub fn origin_is_identity(&self) -> bool {
        self.origin_is_identity
    }

    pub fn variable_count(&self) -> usize {
        self.variable_names.len()
    }

    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    pub fn first_variable_index(&self) -> usize {
        self.first_variable_index
    }

    pub fn bounds(&self) -> &[VariableBounds] {
        &self.bounds
    }

    /// Wrap-around revolute joint, exempt from bounds enforcement.
    pub fn is_continuous(&self) -> bool {
        self.joint_type == JointType::Continuous
    }

    /// Joints whose motion is defined by an external transform.
    pub fn is_multi_dof(&self) -> bool {
        matches!(self.joint_type, JointType::Planar | JointType::Floating)
    }

    /// Variable values used before any reading arrives: zero when it lies
    /// within bounds, else the middle of the bounds.
    pub fn default_positions(&self) -> Vec<f64> {
        match self.joint_type {
            JointType::Floating => vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            _ => self
                .bounds
                .iter()
                .map(|b| {
                    if !b.position_bounded || b.contains(0.0) {
                        0.0
                    } else {
                        (b.min_position + b.max_position) / 2.0
                    }
                })
                .collect(),
        }
    }

    /// Joint variable values that reproduce `transform` (joint frame → child
    /// link).
    pub fn compute_variable_positions(&self, transform: &Transform3D) -> Vec<f64> {
        let t = transform.translation;
        let q = transform.rotation.normalized();
        match self.joint_type {
            JointType::Fixed => Vec::new(),
            JointType::Revolute => vec![rotation_about(q, self.axis)],
            JointType::Continuous => vec![wrap_angle(rotation_about(q, self.axis))],
            JointType::Prismatic => vec![t.dot(self.axis)],
            JointType::Planar => vec![t.x, t.y, q.yaw()],
            JointType::Floating => vec![t.x, t.y, t.z, q.x, q.y, q.z, q.w],
        }
    }

    /// Distance between two value vectors of this joint.  Angular components
    /// use the shortest way around; mismatched inputs are infinitely apart.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let n = self.variable_count();
        if a.len() != n || b.len() != n {
            return f64::INFINITY;
        }
        match self.joint_type {
            JointType::Fixed => 0.0,
            JointType::Continuous => wrap_angle(a[0] - b[0]).abs(),
            JointType::Revolute | JointType::Prismatic => (a[0] - b[0]).abs(),
            JointType::Planar => {
                let dx = a[0] - b[0];
                let dy = a[1] - b[1];
                (dx * dx + dy * dy).sqrt() + wrap_angle(a[2] - b[2]).abs()
            }
            JointType::Floating => {
                let ta = Vec3::new(a[0], a[1], a[2]);
                let tb = Vec3::new(b[0], b[1], b[2]);
                let qa = Quaternion::new(a[6], a[3], a[4], a[5]).normalized();
                let qb = Quaternion::new(b[6], b[3], b[4], b[5]).normalized();
                ta.sub(tb).norm() + qa.angle_to(qb)
            }
        }
    }
}

fn rotation_about(q: Quaternion, axis: Vec3) -> f64 {
    let v = Vec3::new(q.x, q.y, q.z);
    2.0 * v.dot(axis).atan2(q.w)
}

/// Map an angle into `(-π, π]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}
