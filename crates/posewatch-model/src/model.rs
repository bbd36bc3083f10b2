//! [`RobotModel`] – immutable kinematic model consumed by the state monitor.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::description::ModelDescription;
use crate::joint::JointModel;

/// Reasons a [`ModelDescription`] cannot be turned into a [`RobotModel`].
#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("duplicate joint '{0}'")]
    DuplicateJoint(String),

    #[error("link '{0}' is the child of more than one joint")]
    DuplicateLink(String),

    #[error("joint '{joint}' references unknown parent link '{link}'")]
    UnknownParentLink { joint: String, link: String },

    #[error("joint '{joint}' has invalid limits [{lower}, {upper}]")]
    InvalidLimits { joint: String, lower: f64, upper: f64 },

    #[error("group '{group}' references unknown joint '{joint}'")]
    UnknownGroupJoint { group: String, joint: String },

    #[error("duplicate group '{0}'")]
    DuplicateGroup(String),

    #[error("failed to read model description: {0}")]
    Io(String),

    #[error("failed to parse model description: {0}")]
    Parse(String),
}

/// A named subset of the model's active joints.
#[derive(Debug, Clone)]
pub struct JointModelGroup {
    name: String,
    active_joints: Vec<usize>,
    active_joint_names: Vec<String>,
}

impl JointModelGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Indices into [`RobotModel::joints`] of the group's active joints.
    pub fn active_joint_indices(&self) -> &[usize] {
        &self.active_joints
    }

    pub fn active_joint_names(&self) -> &[String] {
        &self.active_joint_names
    }
}

/// Read-only kinematic model: joints, variable layout, bounds and groups.
///
/// # Example
///
/// ```
/// use posewatch_model::{JointDescription, ModelDescription, RobotModel};
///
/// let model = RobotModel::from_description(
///     ModelDescription::new("arm", "world")
///         .with_joint(JointDescription::revolute("j1", None, "l1", 0.0, 1.0))
///         .with_joint(JointDescription::continuous("j2", Some("l1"), "l2")),
/// )
/// .unwrap();
///
/// assert_eq!(model.variable_count(), 2);
/// assert!(model.joint("j2").unwrap().is_continuous());
/// ```
#[derive(Debug, Clone)]
pub struct RobotModel {
    name: String,
    model_frame: String,
    joints: Vec<JointModel>,
    joint_index: HashMap<String, usize>,
    variable_names: Vec<String>,
    active_joints: Vec<usize>,
    multi_dof_joints: Vec<usize>,
    groups: HashMap<String, JointModelGroup>,
}

impl RobotModel {
    /// Validate `desc` and lay out the variable vector in joint order.
    pub fn from_description(desc: ModelDescription) -> Result<Self, ModelError> {
        let mut joints = Vec::with_capacity(desc.joints.len());
        let mut joint_index = HashMap::new();
        let mut child_links = HashSet::new();

        for jd in &desc.joints {
            if joint_index.contains_key(&jd.name) {
                return Err(ModelError::DuplicateJoint(jd.name.clone()));
            }
            if !child_links.insert(jd.child.clone()) {
                return Err(ModelError::DuplicateLink(jd.child.clone()));
            }
            if let Some(limits) = jd.limits
                && !(limits.lower <= limits.upper)
            {
                return Err(ModelError::InvalidLimits {
                    joint: jd.name.clone(),
                    lower: limits.lower,
                    upper: limits.upper,
                });
            }
            joint_index.insert(jd.name.clone(), joints.len());
            joints.push(JointModel::new(
                jd.name.clone(),
                jd.joint_type,
                jd.parent.clone(),
                jd.child.clone(),
                jd.axis,
                jd.origin,
                jd.limits.map(|l| (l.lower, l.upper)),
            ));
        }

        for joint in &joints {
            if let Some(parent) = joint.parent_link()
                && !child_links.contains(parent)
                && parent != desc.model_frame
            {
                return Err(ModelError::UnknownParentLink {
                    joint: joint.name().to_string(),
                    link: parent.to_string(),
                });
            }
        }

        let mut variable_names = Vec::new();
        let mut active_joints = Vec::new();
        let mut multi_dof_joints = Vec::new();
        for (i, joint) in joints.iter_mut().enumerate() {
            joint.index = i;
            joint.first_variable_index = variable_names.len();
            variable_names.extend(joint.variable_names.iter().cloned());
            if joint.variable_count() > 0 {
                active_joints.push(i);
            }
            if joint.is_multi_dof() {
                multi_dof_joints.push(i);
            }
        }

        let mut groups = HashMap::new();
        for gd in &desc.groups {
            let mut group = JointModelGroup {
                name: gd.name.clone(),
                active_joints: Vec::new(),
                active_joint_names: Vec::new(),
            };
            for name in &gd.joints {
                let idx = *joint_index
                    .get(name)
                    .ok_or_else(|| ModelError::UnknownGroupJoint {
                        group: gd.name.clone(),
                        joint: name.clone(),
                    })?;
                if joints[idx].variable_count() > 0 && !group.active_joints.contains(&idx) {
                    group.active_joints.push(idx);
                    group.active_joint_names.push(name.clone());
                }
            }
            if groups.insert(gd.name.clone(), group).is_some() {
                return Err(ModelError::DuplicateGroup(gd.name.clone()));
            }
        }

        debug!(
            model = %desc.name,
            joints = joints.len(),
            variables = variable_names.len(),
            groups = groups.len(),
            "robot model loaded"
        );

        Ok(Self {
            name: desc.name,
            model_frame: desc.model_frame,
            joints,
            joint_index,
            variable_names,
            active_joints,
            multi_dof_joints,
            groups,
        })
    }

    /// Parse a TOML [`ModelDescription`] and build the model.
    pub fn from_toml_str(raw: &str) -> Result<Self, ModelError> {
        let desc: ModelDescription =
            toml::from_str(raw).map_err(|e| ModelError::Parse(e.to_string()))?;
        Self::from_description(desc)
    }

    /// Read and build a TOML model description from `path`.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ModelError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frame used as parent for root joints.
    pub fn model_frame(&self) -> &str {
        &self.model_frame
    }

    pub fn joints(&self) -> &[JointModel] {
        &self.joints
    }

    pub fn joint(&self, name: &str) -> Option<&JointModel> {
        self.joint_index.get(name).map(|&i| &self.joints[i])
    }

    pub fn variable_count(&self) -> usize {
        self.variable_names.len()
    }

    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    /// Indices of all joints that contribute variables.
    pub fn active_joint_indices(&self) -> &[usize] {
        &self.active_joints
    }

    pub fn active_joint_names(&self) -> Vec<String> {
        self.active_joints
            .iter()
            .map(|&i| self.joints[i].name.clone())
            .collect()
    }

    /// Joints driven by the transform feed.
    pub fn multi_dof_joints(&self) -> impl Iterator<Item = &JointModel> {
        self.multi_dof_joints.iter().map(|&i| &self.joints[i])
    }

    pub fn has_multi_dof_joints(&self) -> bool {
        !self.multi_dof_joints.is_empty()
    }

    pub fn group(&self, name: &str) -> Option<&JointModelGroup> {
        self.groups.get(name)
    }

    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.groups.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Default value for every variable, in layout order.
    pub fn default_positions(&self) -> Vec<f64> {
        self.joints
            .iter()
            .flat_map(|j| j.default_positions())
            .collect()
    }
}
