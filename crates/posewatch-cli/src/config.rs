//! Configuration file – reads/writes `~/.posewatch/config.toml`.

use posewatch_monitor::MonitorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Options of the `replay` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// How many times the recording is played back.
    #[serde(default = "default_loops")]
    pub loops: u32,

    /// Pause between two frames, in milliseconds.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// How long to wait for a complete state after the last frame.
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
}

fn default_loops() -> u32 {
    1
}
fn default_frame_interval_ms() -> u64 {
    5
}
fn default_settle_timeout_ms() -> u64 {
    1000
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            loops: default_loops(),
            frame_interval_ms: default_frame_interval_ms(),
            settle_timeout_ms: default_settle_timeout_ms(),
        }
    }
}

/// Persisted user configuration stored in `~/.posewatch/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// TOML robot model description.
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Topic carrying joint-state batches.
    #[serde(default = "default_joint_states_topic")]
    pub joint_states_topic: String,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub replay: ReplayConfig,
}

fn default_model_path() -> String {
    "robot.toml".to_string()
}
fn default_joint_states_topic() -> String {
    "/joint_states".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            joint_states_topic: default_joint_states_topic(),
            monitor: MonitorConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

/// Return the path to `~/.posewatch/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".posewatch").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `POSEWATCH_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `POSEWATCH_MODEL` | `model_path` |
/// | `POSEWATCH_TOPIC` | `joint_states_topic` |
/// | `POSEWATCH_COPY_DYNAMICS` | `monitor.copy_dynamics` |
/// | `POSEWATCH_REPLAY_LOOPS` | `replay.loops` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("POSEWATCH_MODEL") {
        cfg.model_path = v;
    }
    if let Ok(v) = std::env::var("POSEWATCH_TOPIC") {
        cfg.joint_states_topic = v;
    }
    if let Ok(v) = std::env::var("POSEWATCH_COPY_DYNAMICS")
        && let Ok(flag) = v.parse::<bool>()
    {
        cfg.monitor.copy_dynamics = flag;
    }
    if let Ok(v) = std::env::var("POSEWATCH_REPLAY_LOOPS")
        && let Ok(loops) = v.parse::<u32>()
    {
        cfg.replay.loops = loops;
    }
}

/// Save the config to disk, creating `~/.posewatch/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
