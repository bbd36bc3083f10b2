//! `posewatch-middleware` – joint-state transport.
//!
//! Delivers joint-state batches to consumers without caring about their
//! meaning.
//!
//! # Modules
//!
//! - [`bus`] – [`JointStateSource`] trait and the Tokio-broadcast
//!   [`JointStateBus`] with per-topic channels and [`Subscription`] handles.
//! - [`rosbridge`] – decoding of rosbridge JSON frames carrying joint states
//!   and transforms.

pub mod bus;
pub mod rosbridge;

pub use bus::{JointStateBus, JointStateHandler, JointStateSource, Subscription};
pub use rosbridge::{BridgeMessage, decode_frame};
