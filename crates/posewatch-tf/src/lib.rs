//! `posewatch-tf` – the transform feed.
//!
//! # Modules
//!
//! - [`buffer`] – [`TransformBuffer`][buffer::TransformBuffer]: thread-safe
//!   frame graph with stamped and static transforms, chain lookup, and
//!   "transforms changed" listeners identified by
//!   [`ListenerHandle`][buffer::ListenerHandle].

pub mod buffer;

pub use buffer::{ListenerHandle, LookupError, TransformBuffer};
