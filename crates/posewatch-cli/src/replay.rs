//! Playback of recorded rosbridge sessions.
//!
//! A recording is a JSON-lines file with one rosbridge frame per line.
//! Joint-state frames are published on the [`JointStateBus`]; transform
//! frames go straight into the [`TransformBuffer`].  Playing a recording
//! more than once replays the same stamps, which the monitor detects as a
//! loop.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use posewatch_middleware::{BridgeMessage, JointStateBus, decode_frame};
use posewatch_tf::TransformBuffer;
use tracing::{debug, warn};

/// Frames of a recording, in file order.
#[derive(Debug, Default)]
pub struct Recording {
    pub frames: Vec<BridgeMessage>,
    /// Lines that could not be decoded.
    pub malformed: usize,
}

/// Counters reported after a replay.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub loops_completed: u32,
    pub joint_batches: usize,
    pub transform_batches: usize,
    pub ignored: usize,
    pub interrupted: bool,
}

/// Read and decode the recording at `path`.  Blank lines are skipped; lines
/// that fail to decode are counted and logged.
pub fn load_recording(path: &Path) -> Result<Recording, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read recording at {}: {}", path.display(), e))?;

    let mut recording = Recording::default();
    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match decode_frame(line) {
            Ok(frame) => recording.frames.push(frame),
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "skipping malformed frame");
                recording.malformed += 1;
            }
        }
    }
    debug!(
        frames = recording.frames.len(),
        malformed = recording.malformed,
        "recording loaded"
    );
    Ok(recording)
}

/// Play `recording` `loops` times, pausing `frame_interval` after every
/// joint-state or transform frame.  Stops early once `shutdown` is set.
pub fn replay(
    recording: &Recording,
    bus: &JointStateBus,
    tf: &TransformBuffer,
    loops: u32,
    frame_interval: Duration,
    shutdown: &AtomicBool,
) -> ReplaySummary {
    let mut summary = ReplaySummary::default();

    for _ in 0..loops {
        for frame in &recording.frames {
            if shutdown.load(Ordering::SeqCst) {
                summary.interrupted = true;
                return summary;
            }
            match frame {
                BridgeMessage::JointState { topic, msg } => {
                    if let Err(e) = bus.publish(topic, msg.clone()) {
                        warn!(topic = %topic, error = %e, "failed to publish joint state");
                    }
                    summary.joint_batches += 1;
                }
                BridgeMessage::Transforms {
                    is_static,
                    transforms,
                } => {
                    tf.set_transforms(transforms, *is_static);
                    summary.transform_batches += 1;
                }
                BridgeMessage::Ignored { .. } => {
                    summary.ignored += 1;
                    continue;
                }
            }
            if !frame_interval.is_zero() {
                std::thread::sleep(frame_interval);
            }
        }
        summary.loops_completed += 1;
        debug!(loops = summary.loops_completed, "recording played");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use posewatch_model::RobotModel;
    use posewatch_monitor::{CurrentStateMonitor, MonitorConfig};
    use posewatch_types::Stamp;
    use std::io::Write;
    use std::sync::Arc;

    const MODEL: &str = r#"
name = "rover"
model_frame = "odom"

[[joints]]
name = "base"
type = "planar"
child = "base_link"

[[joints]]
name = "mast"
type = "revolute"
parent = "base_link"
child = "mast_link"
limits = { lower = -1.0, upper = 1.0 }
"#;

    fn joint_frame(sec: i64, mast: f64) -> String {
        format!(
            r#"{{"op":"publish","topic":"/joint_states","msg":{{"header":{{"stamp":{{"sec":{sec},"nanosec":0}}}},"name":["mast"],"position":[{mast}]}}}}"#
        )
    }

    fn static_base_frame(x: f64) -> String {
        format!(
            r#"{{"op":"publish","topic":"/tf_static","msg":{{"transforms":[{{"header":{{"stamp":{{"sec":0,"nanosec":0}},"frame_id":"odom"}},"child_frame_id":"base_link","transform":{{"translation":{{"x":{x},"y":0.0,"z":0.0}},"rotation":{{"x":0.0,"y":0.0,"z":0.0,"w":1.0}}}}}}]}}}}"#
        )
    }

    fn write_recording(lines: &[String]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tmp file");
        for line in lines {
            writeln!(file, "{line}").expect("write");
        }
        file
    }

    #[test]
    fn load_counts_malformed_lines() {
        let file = write_recording(&[
            joint_frame(1, 0.1),
            String::new(),
            "{not json".to_string(),
            r#"{"op":"advertise","topic":"/joint_states"}"#.to_string(),
        ]);
        let recording = load_recording(file.path()).expect("load");
        assert_eq!(recording.frames.len(), 2);
        assert_eq!(recording.malformed, 1);
    }

    #[test]
    fn missing_recording_is_an_error() {
        assert!(load_recording(Path::new("/nonexistent/session.jsonl")).is_err());
    }

    #[test]
    fn replay_feeds_monitor_through_bus_and_buffer() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let bus = Arc::new(JointStateBus::with_default_capacity(rt.handle().clone()));
        let tf = Arc::new(TransformBuffer::new());
        let model = Arc::new(RobotModel::from_toml_str(MODEL).unwrap());
        let mut monitor =
            CurrentStateMonitor::new(model, Some(Arc::clone(&tf)), MonitorConfig::default())
                .with_joint_state_source(bus.clone());
        monitor.start("/joint_states");

        let file = write_recording(&[
            static_base_frame(2.5),
            joint_frame(1, 0.1),
            joint_frame(2, 0.2),
        ]);
        let recording = load_recording(file.path()).unwrap();
        let shutdown = AtomicBool::new(false);
        let summary = replay(&recording, &bus, &tf, 1, Duration::from_millis(1), &shutdown);

        assert_eq!(summary.loops_completed, 1);
        assert_eq!(summary.joint_batches, 2);
        assert_eq!(summary.transform_batches, 1);
        assert!(monitor.wait_for_current_state(Stamp::from_secs_f64(2.0), Duration::from_secs(2)));
        let values = monitor.current_state_values();
        assert_eq!(values["mast"], 0.2);
        assert!((values["base/x"] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn looping_replays_every_frame_again() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let bus = Arc::new(JointStateBus::with_default_capacity(rt.handle().clone()));
        let tf = TransformBuffer::new();
        let file = write_recording(&[joint_frame(1, 0.1), joint_frame(2, 0.2)]);
        let recording = load_recording(file.path()).unwrap();

        let shutdown = AtomicBool::new(false);
        let summary = replay(&recording, &bus, &tf, 3, Duration::ZERO, &shutdown);
        assert_eq!(summary.loops_completed, 3);
        assert_eq!(summary.joint_batches, 6);
        assert!(!summary.interrupted);
    }

    #[test]
    fn shutdown_flag_interrupts_replay() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let bus = JointStateBus::with_default_capacity(rt.handle().clone());
        let tf = TransformBuffer::new();
        let file = write_recording(&[joint_frame(1, 0.1)]);
        let recording = load_recording(file.path()).unwrap();

        let shutdown = AtomicBool::new(true);
        let summary = replay(&recording, &bus, &tf, 5, Duration::ZERO, &shutdown);
        assert!(summary.interrupted);
        assert_eq!(summary.loops_completed, 0);
        assert_eq!(summary.joint_batches, 0);
    }
}
