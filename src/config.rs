//! Client configuration
//!
//! Loaded from `~/.config/argus-client/config.json` with every field
//! optional, then overridden by environment variables for the deployment
//! identity (`ARGUS_SERVER_URL`, `ARGUS_DEVICE_ID`, `ARGUS_STUDENT_ID`).
//! A missing or unparsable file falls back to defaults with a logged
//! warning; the client should come up in some usable shape regardless.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Capture sample rate in Hz. The source is opened at this rate; all
    /// container arithmetic derives from it.
    pub sample_rate: u32,

    /// Fixed clip duration in seconds. Both trigger kinds record the same
    /// fixed duration.
    pub record_seconds: u32,

    /// Samples requested per source pull (one pull moves up to 4x this
    /// many raw bytes).
    pub block_samples: usize,

    /// Per-pull source timeout. A stalled microphone fails the cycle
    /// instead of hanging the client.
    pub read_timeout_ms: u64,

    /// Inference service endpoint, e.g. "http://192.168.1.10:5000/upload".
    pub server_url: String,

    /// Identity headers sent with every upload.
    pub device_id: String,
    pub student_id: String,

    /// Upload request timeout.
    pub upload_timeout_secs: u64,

    /// Continuous-monitoring interval between automatic captures.
    pub auto_interval_secs: u64,

    /// evdev key name acting as the record button, e.g. "KEY_F12".
    pub button_key: String,

    /// Minimum gap between observed button presses.
    pub debounce_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            record_seconds: 3,
            block_samples: 1024,
            read_timeout_ms: 2000,
            server_url: String::new(),
            device_id: "argus-dev-001".to_string(),
            student_id: String::new(),
            upload_timeout_secs: 60,
            auto_interval_secs: 10,
            button_key: "KEY_F12".to_string(),
            debounce_ms: 300,
        }
    }
}

impl ClientConfig {
    /// Number of narrowed samples in one clip: `sample_rate * record_seconds`.
    pub fn target_samples(&self) -> usize {
        self.sample_rate as usize * self.record_seconds as usize
    }
}

fn config_path() -> Result<PathBuf, String> {
    let dir = dirs::config_dir().ok_or("Could not determine config directory".to_string())?;
    Ok(dir.join("argus-client").join(CONFIG_FILE_NAME))
}

/// Load the config file, then apply environment overrides.
pub fn load_config() -> ClientConfig {
    let mut config = load_config_file();
    apply_env_overrides(&mut config);
    config
}

fn load_config_file() -> ClientConfig {
    let path = match config_path() {
        Ok(p) => p,
        Err(e) => {
            log::warn!("Config: {}", e);
            return ClientConfig::default();
        }
    };
    read_config(&path)
}

fn read_config(path: &std::path::Path) -> ClientConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<ClientConfig>(&contents) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Config: failed to parse {:?}: {}", path, e);
                ClientConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ClientConfig::default(),
        Err(e) => {
            log::warn!("Config: failed to read {:?}: {}", path, e);
            ClientConfig::default()
        }
    }
}

fn apply_env_overrides(config: &mut ClientConfig) {
    if let Some(url) = env_non_empty("ARGUS_SERVER_URL") {
        config.server_url = url;
    }
    if let Some(id) = env_non_empty("ARGUS_DEVICE_ID") {
        config.device_id = id;
    }
    if let Some(id) = env_non_empty("ARGUS_STUDENT_ID") {
        config.student_id = id;
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_configuration() {
        let config = ClientConfig::default();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.record_seconds, 3);
        assert_eq!(config.block_samples, 1024);
        assert_eq!(config.auto_interval_secs, 10);
    }

    #[test]
    fn target_samples_is_rate_times_seconds() {
        let config = ClientConfig::default();
        assert_eq!(config.target_samples(), 48000);
    }

    #[test]
    fn partial_config_file_fills_in_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"sample_rate": 8000, "server_url": "http://x/upload"}"#)
                .unwrap();
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.server_url, "http://x/upload");
        assert_eq!(config.record_seconds, 3);
        assert_eq!(config.button_key, "KEY_F12");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = read_config(&dir.path().join("nope.json"));
        assert_eq!(config.sample_rate, 16000);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let config = read_config(&path);
        assert_eq!(config.record_seconds, 3);
    }

    #[test]
    fn valid_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"device_id": "bench-rig-7"}"#).unwrap();
        let config = read_config(&path);
        assert_eq!(config.device_id, "bench-rig-7");
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = ClientConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sample_rate, config.sample_rate);
        assert_eq!(back.device_id, config.device_id);
    }
}
