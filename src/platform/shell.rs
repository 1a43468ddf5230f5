use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    AudioControl, DeviceActions, HapticEffect, Haptics, HwRingerMode, MediaControl, MediaKey,
    Platform, PowerControl, TouchPanel, ZenControl, ZenLevel,
};
use crate::dialog::{Anchor, DialogSurface};
use crate::gesture::Gesture;
use crate::slider::RingerMode;

const MUTE_EVENT_CAPACITY: usize = 16;

/// Platform implementation backed by configured shell hooks.
///
/// Each capability maps to a named command from the config's `[hooks]`
/// table, invoked via `/bin/sh -c` with positional arguments. Query
/// hooks report through stdout. An unconfigured hook degrades to a
/// logged no-op, and queries fall back to the last requested value, so
/// the daemon runs on devices where only some integrations exist.
pub struct ShellPlatform {
    hooks: HashMap<String, String>,
    requested_ringer: Mutex<HwRingerMode>,
    requested_zen: Mutex<ZenLevel>,
    mute_tx: broadcast::Sender<bool>,
}

impl ShellPlatform {
    pub fn new(hooks: HashMap<String, String>) -> Arc<Self> {
        let (mute_tx, _) = broadcast::channel(MUTE_EVENT_CAPACITY);
        Arc::new(Self {
            hooks,
            requested_ringer: Mutex::new(HwRingerMode::Normal),
            requested_zen: Mutex::new(ZenLevel::Off),
            mute_tx,
        })
    }

    /// Capability bundle sharing this instance.
    pub fn platform(self: &Arc<Self>) -> Platform {
        Platform {
            audio: Arc::clone(self) as Arc<dyn AudioControl>,
            zen: Arc::clone(self) as Arc<dyn ZenControl>,
            haptics: Arc::clone(self) as Arc<dyn Haptics>,
            power: Arc::clone(self) as Arc<dyn PowerControl>,
            media: Arc::clone(self) as Arc<dyn MediaControl>,
            actions: Arc::clone(self) as Arc<dyn DeviceActions>,
            touch: Arc::clone(self) as Arc<dyn TouchPanel>,
        }
    }

    /// Spawn the long-running `media_mute_watch` hook, if configured,
    /// feeding external mute-state changes into the broadcast. Lines of
    /// `muted` / `unmuted` (or `1` / `0`) are expected on stdout.
    pub fn spawn_mute_watch(
        self: &Arc<Self>,
        cancel: CancellationToken,
    ) -> Option<tokio::task::JoinHandle<()>> {
        let command = self.hooks.get("media_mute_watch")?.clone();
        let mute_tx = self.mute_tx.clone();
        Some(tokio::spawn(async move {
            let child = tokio::process::Command::new("/bin/sh")
                .arg("-c")
                .arg(&command)
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn();
            let mut child = match child {
                Ok(c) => c,
                Err(e) => {
                    warn!("media_mute_watch hook failed to start: {e}");
                    return;
                }
            };
            let Some(stdout) = child.stdout.take() else {
                return;
            };
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        let _ = child.kill().await;
                        return;
                    }
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let muted = match line.trim() {
                                "muted" | "1" => true,
                                "unmuted" | "0" => false,
                                other => {
                                    debug!("media_mute_watch: ignoring line {other:?}");
                                    continue;
                                }
                            };
                            let _ = mute_tx.send(muted);
                        }
                        Ok(None) => {
                            warn!("media_mute_watch hook exited");
                            return;
                        }
                        Err(e) => {
                            warn!("media_mute_watch read error: {e}");
                            return;
                        }
                    }
                }
            }
        }))
    }

    /// Run a hook to completion. Returns false when the hook is missing
    /// or exits non-zero.
    fn run_hook(&self, name: &str, args: &[&str]) -> bool {
        let Some(command) = self.hooks.get(name) else {
            debug!("hook {name} not configured");
            return false;
        };
        let status = std::process::Command::new("/bin/sh")
            .arg("-c")
            .arg(format!("{command} \"$@\""))
            .arg(name)
            .args(args)
            .status();
        match status {
            Ok(status) if status.success() => true,
            Ok(status) => {
                warn!("hook {name} exited with {status}");
                false
            }
            Err(e) => {
                warn!("hook {name} failed to spawn: {e}");
                false
            }
        }
    }

    /// Run a query hook, returning trimmed stdout on success.
    fn query_hook(&self, name: &str) -> Option<String> {
        let command = self.hooks.get(name)?;
        let output = std::process::Command::new("/bin/sh")
            .arg("-c")
            .arg(command)
            .output();
        match output {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(output) => {
                warn!("query hook {name} exited with {}", output.status);
                None
            }
            Err(e) => {
                warn!("query hook {name} failed to spawn: {e}");
                None
            }
        }
    }

    fn query_flag(&self, name: &str, default: bool) -> bool {
        match self.query_hook(name).as_deref() {
            Some("1") | Some("true") => true,
            Some("0") | Some("false") => false,
            Some(other) => {
                warn!("query hook {name}: unrecognized output {other:?}");
                default
            }
            None => default,
        }
    }
}

impl AudioControl for ShellPlatform {
    fn set_ringer_mode(&self, mode: HwRingerMode) {
        *self.requested_ringer.lock().unwrap() = mode;
        self.run_hook("ringer_mode", &[mode.name()]);
    }

    fn ringer_mode(&self) -> HwRingerMode {
        match self.query_hook("ringer_query").as_deref() {
            Some("normal") => HwRingerMode::Normal,
            Some("vibrate") => HwRingerMode::Vibrate,
            Some("silent") => HwRingerMode::Silent,
            Some(other) => {
                warn!("ringer_query: unrecognized output {other:?}");
                *self.requested_ringer.lock().unwrap()
            }
            None => *self.requested_ringer.lock().unwrap(),
        }
    }

    fn adjust_media_volume(&self, raise: bool) -> bool {
        self.run_hook("media_volume", &[if raise { "up" } else { "down" }])
    }

    fn set_media_muted(&self, muted: bool) {
        self.run_hook("media_mute", &[if muted { "1" } else { "0" }]);
    }

    fn subscribe_media_mute(&self) -> broadcast::Receiver<bool> {
        self.mute_tx.subscribe()
    }
}

impl ZenControl for ShellPlatform {
    fn request_zen(&self, level: ZenLevel) {
        *self.requested_zen.lock().unwrap() = level;
        self.run_hook("zen_mode", &[level.name()]);
    }

    fn zen(&self) -> ZenLevel {
        match self.query_hook("zen_query").as_deref() {
            Some("off") => ZenLevel::Off,
            Some("important") => ZenLevel::ImportantInterruptions,
            Some("no_interruptions") => ZenLevel::NoInterruptions,
            Some(other) => {
                warn!("zen_query: unrecognized output {other:?}");
                *self.requested_zen.lock().unwrap()
            }
            // Without a query hook the requested level counts as
            // committed, so the commit-wait returns at once.
            None => *self.requested_zen.lock().unwrap(),
        }
    }
}

impl Haptics for ShellPlatform {
    fn has_vibrator(&self) -> bool {
        self.hooks.contains_key("vibrate")
    }

    fn vibrate(&self, effect: HapticEffect) {
        self.run_hook("vibrate", &[effect.name()]);
    }
}

impl PowerControl for ShellPlatform {
    fn is_interactive(&self) -> bool {
        self.query_flag("display_interactive", true)
    }

    fn wake_up(&self, reason: &str) {
        self.run_hook("wake_up", &[reason]);
    }

    fn acquire_wake_lock(&self, tag: &str, timeout: Duration) {
        self.run_hook(
            "wake_lock_acquire",
            &[tag, &timeout.as_millis().to_string()],
        );
    }

    fn release_wake_lock(&self, tag: &str) {
        self.run_hook("wake_lock_release", &[tag]);
    }
}

impl MediaControl for ShellPlatform {
    fn dispatch_media_key(&self, key: MediaKey) -> bool {
        self.run_hook("media_key", &[key.name()])
    }
}

impl DeviceActions for ShellPlatform {
    fn toggle_flashlight(&self) -> bool {
        self.run_hook("flashlight_toggle", &[])
    }

    fn launch_camera(&self) -> bool {
        self.run_hook("camera_launch", &[])
    }

    fn launch_app(&self, package: &str) -> bool {
        self.run_hook("app_launch", &[package])
    }

    fn pulse_ambient(&self) -> bool {
        self.run_hook("pulse", &[])
    }

    fn pulse_enabled(&self) -> bool {
        self.query_flag("pulse_enabled", false)
    }

    fn is_device_locked(&self) -> bool {
        self.query_flag("device_locked", false)
    }
}

impl TouchPanel for ShellPlatform {
    fn set_gesture_enabled(&self, gesture: Gesture, enabled: bool) -> bool {
        // Missing hook is not a panel rejection: gestures still reach us
        // through the key broker.
        if !self.hooks.contains_key("touch_gesture") {
            return true;
        }
        self.run_hook(
            "touch_gesture",
            &[gesture.name(), if enabled { "1" } else { "0" }],
        )
    }
}

impl DialogSurface for ShellPlatform {
    fn show(&self, mode: RingerMode, anchor: Anchor) {
        self.run_hook("dialog_show", &[mode.name(), anchor.name()]);
    }

    fn hide(&self) {
        self.run_hook("dialog_hide", &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_hooks_degrade_to_failure() {
        let shell = ShellPlatform::new(HashMap::new());
        assert!(!shell.run_hook("flashlight_toggle", &[]));
        assert!(!shell.has_vibrator());
        // Queries fall back to last requested values.
        assert_eq!(shell.ringer_mode(), HwRingerMode::Normal);
        assert_eq!(shell.zen(), ZenLevel::Off);
        assert!(shell.is_interactive());
    }

    #[test]
    fn zen_without_query_hook_commits_immediately() {
        let shell = ShellPlatform::new(HashMap::new());
        shell.request_zen(ZenLevel::NoInterruptions);
        assert_eq!(shell.zen(), ZenLevel::NoInterruptions);
    }

    #[test]
    fn hooks_receive_positional_args() {
        let marker = std::env::temp_dir().join(format!("sliderd-hook-{}.txt", std::process::id()));
        let mut hooks = HashMap::new();
        hooks.insert(
            "vibrate".to_string(),
            format!("printf '%s' \"$1\" > {} ; true", marker.display()),
        );
        let shell = ShellPlatform::new(hooks);
        shell.vibrate(HapticEffect::DoubleClick);
        let recorded = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(recorded, "double_click");
        let _ = std::fs::remove_file(&marker);
    }

    #[test]
    fn query_hook_parses_stdout() {
        let mut hooks = HashMap::new();
        hooks.insert("zen_query".to_string(), "echo important".to_string());
        let shell = ShellPlatform::new(hooks);
        assert_eq!(shell.zen(), ZenLevel::ImportantInterruptions);
    }
}
