pub mod shell;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::gesture::Gesture;

/// Hardware ringer state of the audio subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwRingerMode {
    Normal,
    Vibrate,
    Silent,
}

impl HwRingerMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Vibrate => "vibrate",
            Self::Silent => "silent",
        }
    }
}

/// Interruption-filtering level of the notification subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZenLevel {
    Off,
    ImportantInterruptions,
    NoInterruptions,
}

impl ZenLevel {
    pub fn name(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::ImportantInterruptions => "important",
            Self::NoInterruptions => "no_interruptions",
        }
    }
}

/// Builtin haptic patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticEffect {
    HeavyClick,
    DoubleClick,
}

impl HapticEffect {
    pub fn name(self) -> &'static str {
        match self {
            Self::HeavyClick => "heavy_click",
            Self::DoubleClick => "double_click",
        }
    }
}

/// Media transport keys dispatched to the active media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKey {
    PlayPause,
    Previous,
    Next,
}

impl MediaKey {
    pub fn name(self) -> &'static str {
        match self {
            Self::PlayPause => "play_pause",
            Self::Previous => "previous",
            Self::Next => "next",
        }
    }
}

/// System audio: ringer mode, media stream volume and mute.
pub trait AudioControl: Send + Sync {
    fn set_ringer_mode(&self, mode: HwRingerMode);
    fn ringer_mode(&self) -> HwRingerMode;

    /// Raise or lower the media stream. Returns false on failure.
    fn adjust_media_volume(&self, raise: bool) -> bool;

    fn set_media_muted(&self, muted: bool);

    /// Mute-state changes of the media stream, including ones made by
    /// other processes. Payload is the new muted state.
    fn subscribe_media_mute(&self) -> broadcast::Receiver<bool>;
}

/// Do-not-disturb control. `zen` reports the committed state, which lags
/// a `request_zen` call; callers poll it to observe the commit.
pub trait ZenControl: Send + Sync {
    fn request_zen(&self, level: ZenLevel);
    fn zen(&self) -> ZenLevel;
}

pub trait Haptics: Send + Sync {
    fn has_vibrator(&self) -> bool;
    fn vibrate(&self, effect: HapticEffect);
}

/// Display and wake state.
pub trait PowerControl: Send + Sync {
    /// Whether the display is interactive (awake).
    fn is_interactive(&self) -> bool;

    fn wake_up(&self, reason: &str);

    /// Acquire a wake assertion that the platform drops after `timeout`
    /// even if never released.
    fn acquire_wake_lock(&self, tag: &str, timeout: Duration);

    fn release_wake_lock(&self, tag: &str);
}

pub trait MediaControl: Send + Sync {
    /// Dispatch a transport key to the active media session. Returns
    /// false when no session accepts it.
    fn dispatch_media_key(&self, key: MediaKey) -> bool;
}

/// Miscellaneous device-level actions reachable from gestures.
pub trait DeviceActions: Send + Sync {
    fn toggle_flashlight(&self) -> bool;
    fn launch_camera(&self) -> bool;
    fn launch_app(&self, package: &str) -> bool;

    /// Fire an ambient-display pulse.
    fn pulse_ambient(&self) -> bool;

    /// Whether ambient-display pulsing is enabled for the current user.
    fn pulse_enabled(&self) -> bool;

    fn is_device_locked(&self) -> bool;
}

/// Touch panel gesture firmware control.
pub trait TouchPanel: Send + Sync {
    /// Enable or disable recognition of one hardware gesture. Returns
    /// false if the panel rejects the change.
    fn set_gesture_enabled(&self, gesture: Gesture, enabled: bool) -> bool;
}

/// Bundle of capability handles threaded through the controllers.
#[derive(Clone)]
pub struct Platform {
    pub audio: Arc<dyn AudioControl>,
    pub zen: Arc<dyn ZenControl>,
    pub haptics: Arc<dyn Haptics>,
    pub power: Arc<dyn PowerControl>,
    pub media: Arc<dyn MediaControl>,
    pub actions: Arc<dyn DeviceActions>,
    pub touch: Arc<dyn TouchPanel>,
}

/// RAII wake assertion; released on drop, bounded by `timeout` on the
/// platform side regardless.
pub struct WakeLockGuard {
    power: Arc<dyn PowerControl>,
    tag: &'static str,
}

impl WakeLockGuard {
    pub fn acquire(power: Arc<dyn PowerControl>, tag: &'static str, timeout: Duration) -> Self {
        power.acquire_wake_lock(tag, timeout);
        Self { power, tag }
    }
}

impl Drop for WakeLockGuard {
    fn drop(&mut self) {
        self.power.release_wake_lock(self.tag);
    }
}
