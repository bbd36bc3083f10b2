//! rosbridge JSON decoding.
//!
//! Translates rosbridge v2 `publish` frames carrying `sensor_msgs/JointState`
//! or `tf2_msgs/TFMessage` payloads into posewatch types.  Recorded sessions
//! are stored one frame per line, which is what the CLI replays.
//!
//! ```json
//! {"op":"publish","topic":"/joint_states","msg":{
//!   "header":{"stamp":{"sec":12,"nanosec":0},"frame_id":""},
//!   "name":["shoulder"],"position":[0.5],"velocity":[],"effort":[]}}
//! ```

use posewatch_types::{
    JointState, PoseError, Quaternion, Stamp, Transform3D, TransformStamped, Vec3,
};
use serde::Deserialize;

/// Topic carrying dynamic transforms.
pub const TF_TOPIC: &str = "/tf";
/// Topic carrying static transforms.
pub const TF_STATIC_TOPIC: &str = "/tf_static";

/// A decoded rosbridge frame.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMessage {
    JointState { topic: String, msg: JointState },
    Transforms {
        is_static: bool,
        transforms: Vec<TransformStamped>,
    },
    /// A well-formed frame for a topic or op this module does not handle.
    Ignored { op: String, topic: String },
}

#[derive(Deserialize)]
struct Frame {
    op: String,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    msg: Option<serde_json::Value>,
}

#[derive(Deserialize, Default)]
struct WireTime {
    #[serde(default, alias = "secs")]
    sec: i64,
    #[serde(default, alias = "nsecs")]
    nanosec: u32,
}

#[derive(Deserialize, Default)]
struct WireHeader {
    #[serde(default)]
    stamp: WireTime,
    #[serde(default)]
    frame_id: String,
}

#[derive(Deserialize)]
struct WireJointState {
    #[serde(default)]
    header: WireHeader,
    #[serde(default)]
    name: Vec<String>,
    #[serde(default)]
    position: Vec<f64>,
    #[serde(default)]
    velocity: Vec<f64>,
    #[serde(default)]
    effort: Vec<f64>,
}

#[derive(Deserialize)]
struct WireVector3 {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize)]
struct WireQuaternion {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

#[derive(Deserialize)]
struct WireTransform {
    translation: WireVector3,
    rotation: WireQuaternion,
}

#[derive(Deserialize)]
struct WireTransformStamped {
    header: WireHeader,
    child_frame_id: String,
    transform: WireTransform,
}

#[derive(Deserialize)]
struct WireTfMessage {
    transforms: Vec<WireTransformStamped>,
}

impl TryFrom<WireTime> for Stamp {
    type Error = PoseError;

    fn try_from(t: WireTime) -> Result<Self, Self::Error> {
        Stamp::from_sec_nanosec(t.sec, t.nanosec).ok_or_else(|| {
            PoseError::Parsing(format!("invalid stamp: sec={} nanosec={}", t.sec, t.nanosec))
        })
    }
}

impl TryFrom<WireTransformStamped> for TransformStamped {
    type Error = PoseError;

    fn try_from(w: WireTransformStamped) -> Result<Self, Self::Error> {
        let t = w.transform;
        Ok(TransformStamped::new(
            w.header.stamp.try_into()?,
            w.header.frame_id,
            w.child_frame_id,
            Transform3D::new(
                Vec3::new(t.translation.x, t.translation.y, t.translation.z),
                Quaternion::new(t.rotation.w, t.rotation.x, t.rotation.y, t.rotation.z),
            ),
        ))
    }
}

/// Decode a single rosbridge frame.
///
/// Frames on [`TF_TOPIC`] / [`TF_STATIC_TOPIC`] are decoded as transforms;
/// any other `publish` frame whose payload has a `name` array is decoded as
/// a joint state.
pub fn decode_frame(raw: &str) -> Result<BridgeMessage, PoseError> {
    let frame: Frame =
        serde_json::from_str(raw).map_err(|e| PoseError::Parsing(format!("invalid frame: {e}")))?;

    let msg = match (frame.op.as_str(), frame.msg) {
        ("publish", Some(msg)) => msg,
        _ => {
            return Ok(BridgeMessage::Ignored {
                op: frame.op,
                topic: frame.topic,
            });
        }
    };

    if frame.topic == TF_TOPIC || frame.topic == TF_STATIC_TOPIC {
        let tf: WireTfMessage = serde_json::from_value(msg)
            .map_err(|e| PoseError::Parsing(format!("invalid TF message on {}: {e}", frame.topic)))?;
        return Ok(BridgeMessage::Transforms {
            is_static: frame.topic == TF_STATIC_TOPIC,
            transforms: tf
                .transforms
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
        });
    }

    if msg.get("name").is_some() {
        let js: WireJointState = serde_json::from_value(msg).map_err(|e| {
            PoseError::Parsing(format!("invalid joint state on {}: {e}", frame.topic))
        })?;
        return Ok(BridgeMessage::JointState {
            topic: frame.topic,
            msg: JointState {
                stamp: js.header.stamp.try_into()?,
                name: js.name,
                position: js.position,
                velocity: js.velocity,
                effort: js.effort,
            },
        });
    }

    Ok(BridgeMessage::Ignored {
        op: frame.op,
        topic: frame.topic,
    })
}
