//! `posewatch-model` – the kinematic model.
//!
//! Describes joints, links, the variable layout, per-variable bounds and
//! named joint groups.  The model is built once, shared behind an `Arc`, and
//! never mutated afterwards.
//!
//! # Modules
//!
//! - [`joint`] – [`JointModel`][joint::JointModel]: variable layout, bounds,
//!   transform-to-variables conversion and per-joint distance.
//! - [`model`] – [`RobotModel`][model::RobotModel] and
//!   [`JointModelGroup`][model::JointModelGroup].
//! - [`description`] – [`ModelDescription`][description::ModelDescription]:
//!   the TOML form of a model.

pub mod description;
pub mod joint;
pub mod model;

pub use description::{GroupDescription, JointDescription, LimitsDescription, ModelDescription};
pub use joint::{JointModel, JointType, VariableBounds};
pub use model::{JointModelGroup, ModelError, RobotModel};
