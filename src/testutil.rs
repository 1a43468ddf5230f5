//! Shared fakes for unit tests: an in-memory settings store and a
//! platform that records every capability call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::dialog::{Anchor, DialogSurface};
use crate::error::Result;
use crate::gesture::Gesture;
use crate::platform::{
    AudioControl, DeviceActions, HapticEffect, Haptics, HwRingerMode, MediaControl, MediaKey,
    Platform, PowerControl, TouchPanel, ZenControl, ZenLevel,
};
use crate::settings::{SettingsStore, UserId};
use crate::slider::{RingerMode, SliderController};

/// In-memory settings store.
#[derive(Default)]
pub struct MemSettings {
    values: Mutex<HashMap<(u32, String), String>>,
}

impl MemSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Set a key for user 0.
    pub fn put(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert((0, key.to_string()), value.to_string());
    }
}

impl SettingsStore for MemSettings {
    fn get_string(&self, user: UserId, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap()
            .get(&(user.0, key.to_string()))
            .cloned()
    }

    fn put_string(&self, user: UserId, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert((user.0, key.to_string()), value.to_string());
        Ok(())
    }
}

/// Fake platform recording every capability call in order.
pub struct FakeSystem {
    calls: Mutex<Vec<String>>,
    last_ringer: Mutex<HwRingerMode>,
    ringer_override: Mutex<Option<HwRingerMode>>,
    zen_requested: Mutex<ZenLevel>,
    zen_commits: AtomicBool,
    interactive: AtomicBool,
    locked: AtomicBool,
    pulse_enabled: AtomicBool,
    actions_fail: AtomicBool,
    mute_tx: broadcast::Sender<bool>,
}

impl FakeSystem {
    pub fn new() -> Arc<Self> {
        let (mute_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            last_ringer: Mutex::new(HwRingerMode::Normal),
            ringer_override: Mutex::new(None),
            zen_requested: Mutex::new(ZenLevel::Off),
            zen_commits: AtomicBool::new(true),
            interactive: AtomicBool::new(true),
            locked: AtomicBool::new(false),
            pulse_enabled: AtomicBool::new(false),
            actions_fail: AtomicBool::new(false),
            mute_tx,
        })
    }

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

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn succeed(&self, call: impl Into<String>) -> bool {
        self.record(call);
        !self.actions_fail.load(Ordering::Relaxed)
    }

    /// Inject an external media mute-state change.
    pub fn send_mute_event(&self, muted: bool) {
        let _ = self.mute_tx.send(muted);
    }

    /// Whether `zen()` reflects the requested level (commit succeeds).
    pub fn set_zen_commits(&self, commits: bool) {
        self.zen_commits.store(commits, Ordering::Relaxed);
    }

    /// Force the reported ringer mode regardless of `set_ringer_mode`.
    pub fn set_ringer(&self, mode: HwRingerMode) {
        *self.ringer_override.lock().unwrap() = Some(mode);
    }

    pub fn set_interactive(&self, interactive: bool) {
        self.interactive.store(interactive, Ordering::Relaxed);
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::Relaxed);
    }

    pub fn set_pulse_enabled(&self, enabled: bool) {
        self.pulse_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Make every device action report failure.
    pub fn set_actions_fail(&self, fail: bool) {
        self.actions_fail.store(fail, Ordering::Relaxed);
    }
}

impl AudioControl for FakeSystem {
    fn set_ringer_mode(&self, mode: HwRingerMode) {
        self.record(format!("set_ringer_mode {}", mode.name()));
        *self.last_ringer.lock().unwrap() = mode;
    }

    fn ringer_mode(&self) -> HwRingerMode {
        self.ringer_override
            .lock()
            .unwrap()
            .unwrap_or(*self.last_ringer.lock().unwrap())
    }

    fn adjust_media_volume(&self, raise: bool) -> bool {
        self.succeed(format!("media_volume {}", if raise { "up" } else { "down" }))
    }

    fn set_media_muted(&self, muted: bool) {
        self.record(format!("set_media_muted {muted}"));
    }

    fn subscribe_media_mute(&self) -> broadcast::Receiver<bool> {
        self.mute_tx.subscribe()
    }
}

impl ZenControl for FakeSystem {
    fn request_zen(&self, level: ZenLevel) {
        self.record(format!("request_zen {}", level.name()));
        *self.zen_requested.lock().unwrap() = level;
    }

    fn zen(&self) -> ZenLevel {
        let requested = *self.zen_requested.lock().unwrap();
        if self.zen_commits.load(Ordering::Relaxed) {
            requested
        } else if requested == ZenLevel::Off {
            ZenLevel::ImportantInterruptions
        } else {
            ZenLevel::Off
        }
    }
}

impl Haptics for FakeSystem {
    fn has_vibrator(&self) -> bool {
        true
    }

    fn vibrate(&self, effect: HapticEffect) {
        self.record(format!("vibrate {}", effect.name()));
    }
}

impl PowerControl for FakeSystem {
    fn is_interactive(&self) -> bool {
        self.interactive.load(Ordering::Relaxed)
    }

    fn wake_up(&self, reason: &str) {
        self.record(format!("wake_up {reason}"));
    }

    fn acquire_wake_lock(&self, tag: &str, _timeout: Duration) {
        self.record(format!("wake_lock_acquire {tag}"));
    }

    fn release_wake_lock(&self, tag: &str) {
        self.record(format!("wake_lock_release {tag}"));
    }
}

impl MediaControl for FakeSystem {
    fn dispatch_media_key(&self, key: MediaKey) -> bool {
        self.succeed(format!("media_key {}", key.name()))
    }
}

impl DeviceActions for FakeSystem {
    fn toggle_flashlight(&self) -> bool {
        self.succeed("toggle_flashlight")
    }

    fn launch_camera(&self) -> bool {
        self.succeed("launch_camera")
    }

    fn launch_app(&self, package: &str) -> bool {
        self.succeed(format!("launch_app {package}"))
    }

    fn pulse_ambient(&self) -> bool {
        self.succeed("pulse_ambient")
    }

    fn pulse_enabled(&self) -> bool {
        self.pulse_enabled.load(Ordering::Relaxed)
    }

    fn is_device_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

impl TouchPanel for FakeSystem {
    fn set_gesture_enabled(&self, gesture: Gesture, enabled: bool) -> bool {
        self.record(format!(
            "set_gesture_enabled {} {}",
            gesture.name(),
            u8::from(enabled)
        ));
        true
    }
}

impl DialogSurface for FakeSystem {
    fn show(&self, mode: RingerMode, anchor: Anchor) {
        self.record(format!("dialog_show {} {}", mode.name(), anchor.name()));
    }

    fn hide(&self) {
        self.record("dialog_hide");
    }
}

/// Build a `SliderController` over a fake system and fresh settings.
pub fn test_controller(
    system: &Arc<FakeSystem>,
    commit_poll: Duration,
    commit_timeout: Duration,
) -> (Arc<SliderController>, Arc<MemSettings>) {
    let settings = MemSettings::new_arc();
    let controller = SliderController::new(
        system.platform(),
        Arc::clone(&settings) as Arc<dyn SettingsStore>,
        UserId(0),
        commit_poll,
        commit_timeout,
    );
    (controller, settings)
}
