use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::slider::SliderPosition;

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sliderd: DaemonConfig,

    /// Shell hooks implementing the platform capabilities, keyed by
    /// hook name.
    #[serde(default)]
    pub hooks: HashMap<String, String>,
}

/// Global daemon settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Per-user settings file.
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    /// User id the daemon reads and writes settings for.
    #[serde(default)]
    pub user: u32,

    /// Input device names probed for the tri-state alert slider.
    #[serde(default = "default_tri_state_names")]
    pub tri_state_device_names: Vec<String>,

    /// Scan codes the tri-state device emits per position.
    #[serde(default)]
    pub slider_scan_codes: SliderScanCodes,

    /// Milliseconds between zen commit polls.
    #[serde(default = "default_commit_poll_ms")]
    pub commit_poll_ms: u64,

    /// Upper bound on the zen commit wait.
    #[serde(default = "default_commit_timeout_ms")]
    pub commit_timeout_ms: u64,

    /// Lifetime of the mode confirmation dialog.
    #[serde(default = "default_dialog_timeout_ms")]
    pub dialog_timeout_ms: u64,

    /// Upper bound on the wake assertion held around gesture handling.
    #[serde(default = "default_wake_lock_timeout_ms")]
    pub wake_lock_timeout_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            user: 0,
            tri_state_device_names: default_tri_state_names(),
            slider_scan_codes: SliderScanCodes::default(),
            commit_poll_ms: default_commit_poll_ms(),
            commit_timeout_ms: default_commit_timeout_ms(),
            dialog_timeout_ms: default_dialog_timeout_ms(),
            wake_lock_timeout_ms: default_wake_lock_timeout_ms(),
        }
    }
}

/// Per-position scan codes of the tri-state key.
#[derive(Debug, Clone, Deserialize)]
pub struct SliderScanCodes {
    pub top: u32,
    pub middle: u32,
    pub bottom: u32,
}

impl SliderScanCodes {
    /// Map a scan code to its slider position.
    pub fn position_for(&self, scan_code: u32) -> Option<SliderPosition> {
        if scan_code == self.top {
            Some(SliderPosition::Top)
        } else if scan_code == self.middle {
            Some(SliderPosition::Middle)
        } else if scan_code == self.bottom {
            Some(SliderPosition::Bottom)
        } else {
            None
        }
    }
}

impl Default for SliderScanCodes {
    fn default() -> Self {
        Self {
            top: 601,
            middle: 602,
            bottom: 603,
        }
    }
}

// --- Defaults ---

fn default_settings_path() -> PathBuf {
    PathBuf::from("/var/lib/sliderd/settings.toml")
}

fn default_tri_state_names() -> Vec<String> {
    vec![
        "oplus,hall_tri_state_key".to_string(),
        "oplus,tri-state-key".to_string(),
    ]
}

fn default_commit_poll_ms() -> u64 {
    10
}

fn default_commit_timeout_ms() -> u64 {
    2000
}

fn default_dialog_timeout_ms() -> u64 {
    1000
}

fn default_wake_lock_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config_gets_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.sliderd.commit_poll_ms, 10);
        assert_eq!(config.sliderd.commit_timeout_ms, 2000);
        assert_eq!(config.sliderd.dialog_timeout_ms, 1000);
        assert_eq!(config.sliderd.slider_scan_codes.top, 601);
        assert_eq!(config.sliderd.tri_state_device_names.len(), 2);
        assert!(config.hooks.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[sliderd]
settings_path = "/tmp/sliderd-settings.toml"
user = 10
commit_timeout_ms = 500
tri_state_device_names = ["vendor,tri-state"]

[sliderd.slider_scan_codes]
top = 11
middle = 12
bottom = 13

[hooks]
ringer_mode = "audioctl ringer"
vibrate = "hapticctl play"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sliderd.user, 10);
        assert_eq!(config.sliderd.commit_timeout_ms, 500);
        assert_eq!(
            config.sliderd.slider_scan_codes.position_for(12),
            Some(SliderPosition::Middle)
        );
        assert_eq!(config.sliderd.slider_scan_codes.position_for(601), None);
        assert_eq!(config.hooks["vibrate"], "hapticctl play");
    }
}
