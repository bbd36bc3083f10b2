//! `posewatch-types` – shared vocabulary of the posewatch workspace.
//!
//! # Modules
//!
//! - [`geometry`] – [`Vec3`], [`Quaternion`] and [`Transform3D`]: rigid-body
//!   math shared by the kinematic model and the transform buffer.
//! - [`stamp`] – [`Stamp`]: message timestamps, including the zero sentinel
//!   used for static transforms.
//! - [`msg`] – [`JointState`] and [`TransformStamped`]: the payloads delivered
//!   by the joint-state and transform feeds.

pub mod geometry;
pub mod msg;
pub mod stamp;

pub use geometry::{Quaternion, Transform3D, Vec3};
pub use msg::{JointState, TransformStamped};
pub use stamp::Stamp;

use thiserror::Error;

/// Error type shared by the transport and decoding layers.
#[derive(Error, Debug)]
pub enum PoseError {
    #[error("Transport Error on {topic}: {details}")]
    Transport { topic: String, details: String },

    #[error("Parse Error: {0}")]
    Parsing(String),
}
