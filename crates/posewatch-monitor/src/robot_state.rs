//! [`RobotState`] – one value per model variable, plus optional dynamics.

use std::sync::Arc;

use posewatch_model::{JointModel, RobotModel};

/// Positions (and optionally velocities, accelerations and efforts) laid out
/// by the model's variable order.  The vectors always have exactly
/// [`RobotModel::variable_count`] entries.
#[derive(Debug, Clone)]
pub struct RobotState {
    model: Arc<RobotModel>,
    positions: Vec<f64>,
    velocities: Option<Vec<f64>>,
    accelerations: Option<Vec<f64>>,
    efforts: Option<Vec<f64>>,
}

impl RobotState {
    /// State with every variable at its default value and no dynamics.
    pub fn new(model: Arc<RobotModel>) -> Self {
        let positions = model.default_positions();
        Self {
            model,
            positions,
            velocities: None,
            accelerations: None,
            efforts: None,
        }
    }

    pub fn model(&self) -> &Arc<RobotModel> {
        &self.model
    }

    pub fn variable_positions(&self) -> &[f64] {
        &self.positions
    }

    /// Overwrite all positions.  Extra input is ignored; missing input
    /// leaves the tail unchanged.
    pub fn set_variable_positions(&mut self, positions: &[f64]) {
        copy_prefix(&mut self.positions, positions);
    }

    /// Position of the variable called `name`.
    pub fn variable_position(&self, name: &str) -> Option<f64> {
        self.model
            .variable_names()
            .iter()
            .position(|n| n == name)
            .map(|i| self.positions[i])
    }

    pub fn joint_positions(&self, joint: &JointModel) -> &[f64] {
        &self.positions[joint_range(joint)]
    }

    pub fn set_joint_positions(&mut self, joint: &JointModel, values: &[f64]) {
        copy_prefix(&mut self.positions[joint_range(joint)], values);
    }

    pub fn has_velocities(&self) -> bool {
        self.velocities.is_some()
    }

    pub fn variable_velocities(&self) -> Option<&[f64]> {
        self.velocities.as_deref()
    }

    pub fn set_variable_velocities(&mut self, values: &[f64]) {
        let n = self.positions.len();
        copy_prefix(self.velocities.get_or_insert_with(|| vec![0.0; n]), values);
    }

    /// Velocity of a single-variable joint, if velocities are tracked.
    pub fn joint_velocity(&self, joint: &JointModel) -> Option<f64> {
        self.velocities
            .as_ref()
            .map(|v| v[joint.first_variable_index()])
    }

    pub fn set_joint_velocities(&mut self, joint: &JointModel, values: &[f64]) {
        let n = self.positions.len();
        let v = self.velocities.get_or_insert_with(|| vec![0.0; n]);
        copy_prefix(&mut v[joint_range(joint)], values);
    }

    pub fn has_accelerations(&self) -> bool {
        self.accelerations.is_some()
    }

    pub fn variable_accelerations(&self) -> Option<&[f64]> {
        self.accelerations.as_deref()
    }

    pub fn set_variable_accelerations(&mut self, values: &[f64]) {
        let n = self.positions.len();
        copy_prefix(self.accelerations.get_or_insert_with(|| vec![0.0; n]), values);
    }

    pub fn has_efforts(&self) -> bool {
        self.efforts.is_some()
    }

    pub fn variable_efforts(&self) -> Option<&[f64]> {
        self.efforts.as_deref()
    }

    pub fn set_variable_efforts(&mut self, values: &[f64]) {
        let n = self.positions.len();
        copy_prefix(self.efforts.get_or_insert_with(|| vec![0.0; n]), values);
    }

    /// Effort of a single-variable joint, if efforts are tracked.
    pub fn joint_effort(&self, joint: &JointModel) -> Option<f64> {
        self.efforts.as_ref().map(|e| e[joint.first_variable_index()])
    }

    pub fn set_joint_efforts(&mut self, joint: &JointModel, values: &[f64]) {
        let n = self.positions.len();
        let e = self.efforts.get_or_insert_with(|| vec![0.0; n]);
        copy_prefix(&mut e[joint_range(joint)], values);
    }
}

fn joint_range(joint: &JointModel) -> std::ops::Range<usize> {
    let start = joint.first_variable_index();
    start..start + joint.variable_count()
}

fn copy_prefix(dst: &mut [f64], src: &[f64]) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use posewatch_model::{JointDescription, ModelDescription};

    fn model() -> Arc<RobotModel> {
        Arc::new(
            RobotModel::from_description(
                ModelDescription::new("m", "odom")
                    .with_joint(JointDescription::planar("base", None, "base_link"))
                    .with_joint(JointDescription::revolute(
                        "j1",
                        Some("base_link"),
                        "l1",
                        0.5,
                        1.5,
                    )),
            )
            .unwrap(),
        )
    }

    #[test]
    fn starts_at_defaults_without_dynamics() {
        let state = RobotState::new(model());
        assert_eq!(state.variable_positions(), [0.0, 0.0, 0.0, 1.0]);
        assert!(!state.has_velocities());
        assert!(!state.has_efforts());
        assert!(!state.has_accelerations());
    }

    #[test]
    fn joint_slices_follow_layout() {
        let m = model();
        let mut state = RobotState::new(Arc::clone(&m));
        let base = m.joint("base").unwrap();
        state.set_joint_positions(base, &[1.0, 2.0, 0.3]);
        assert_eq!(state.joint_positions(base), [1.0, 2.0, 0.3]);
        assert_eq!(state.variable_position("base/y"), Some(2.0));
        assert_eq!(state.variable_position("j1"), Some(1.0));
        assert_eq!(state.variable_position("nope"), None);
    }

    #[test]
    fn setting_joint_velocity_allocates_vector() {
        let m = model();
        let mut state = RobotState::new(Arc::clone(&m));
        let j1 = m.joint("j1").unwrap();
        assert_eq!(state.joint_velocity(j1), None);
        state.set_joint_velocities(j1, &[0.25]);
        assert_eq!(state.joint_velocity(j1), Some(0.25));
        assert_eq!(state.variable_velocities().unwrap().len(), m.variable_count());
    }

    #[test]
    fn short_input_leaves_tail_unchanged() {
        let mut state = RobotState::new(model());
        state.set_variable_positions(&[9.0]);
        assert_eq!(state.variable_positions(), [9.0, 0.0, 0.0, 1.0]);
    }
}
