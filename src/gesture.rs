use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::action::{self, Action};
use crate::platform::{HapticEffect, HwRingerMode, MediaKey, Platform, WakeLockGuard};
use crate::settings::{keys, SettingsStore, UserId};

const GESTURE_WAKELOCK_TAG: &str = "sliderd:gesture";
const GESTURE_WAKEUP_REASON: &str = "touchscreen-gesture-wakeup";

/// A recognized touchscreen gesture, identified by its kernel scan code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    DoubleTap,
    DownArrow,
    UpArrow,
    RightArrow,
    LeftArrow,
    LetterO,
    DoubleSwipe,
    RightSwipe,
    LeftSwipe,
    DownSwipe,
    UpSwipe,
    LetterM,
    LetterW,
    FingerprintDown,
    FingerprintUp,
    SingleTap,
    Heart,
    LetterS,
}

impl Gesture {
    pub const ALL: [Self; 18] = [
        Self::DoubleTap,
        Self::DownArrow,
        Self::UpArrow,
        Self::RightArrow,
        Self::LeftArrow,
        Self::LetterO,
        Self::DoubleSwipe,
        Self::RightSwipe,
        Self::LeftSwipe,
        Self::DownSwipe,
        Self::UpSwipe,
        Self::LetterM,
        Self::LetterW,
        Self::FingerprintDown,
        Self::FingerprintUp,
        Self::SingleTap,
        Self::Heart,
        Self::LetterS,
    ];

    pub fn scan_code(self) -> u32 {
        match self {
            Self::DoubleTap => 247,
            Self::DownArrow => 248,
            Self::UpArrow => 249,
            Self::RightArrow => 250,
            Self::LeftArrow => 251,
            Self::LetterO => 252,
            Self::DoubleSwipe => 253,
            Self::RightSwipe => 254,
            Self::LeftSwipe => 255,
            Self::DownSwipe => 256,
            Self::UpSwipe => 257,
            Self::LetterM => 258,
            Self::LetterW => 259,
            Self::FingerprintDown => 260,
            Self::FingerprintUp => 261,
            Self::SingleTap => 262,
            Self::Heart => 263,
            Self::LetterS => 264,
        }
    }

    pub fn from_scan_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.scan_code() == code)
    }

    /// Stable lowercase identifier, also the tail of the settings key.
    pub fn name(self) -> &'static str {
        match self {
            Self::DoubleTap => "double_tap",
            Self::DownArrow => "down_arrow",
            Self::UpArrow => "up_arrow",
            Self::RightArrow => "right_arrow",
            Self::LeftArrow => "left_arrow",
            Self::LetterO => "letter_o",
            Self::DoubleSwipe => "double_swipe",
            Self::RightSwipe => "right_swipe",
            Self::LeftSwipe => "left_swipe",
            Self::DownSwipe => "down_swipe",
            Self::UpSwipe => "up_swipe",
            Self::LetterM => "letter_m",
            Self::LetterW => "letter_w",
            Self::FingerprintDown => "fingerprint_down",
            Self::FingerprintUp => "fingerprint_up",
            Self::SingleTap => "single_tap",
            Self::Heart => "heart",
            Self::LetterS => "letter_s",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::DoubleTap => "Double tap",
            Self::DownArrow => "Down arrow",
            Self::UpArrow => "Up arrow",
            Self::RightArrow => "Right arrow",
            Self::LeftArrow => "Left arrow",
            Self::LetterO => "Letter O",
            Self::DoubleSwipe => "Two-finger swipe",
            Self::RightSwipe => "Right swipe",
            Self::LeftSwipe => "Left swipe",
            Self::DownSwipe => "Down swipe",
            Self::UpSwipe => "Up swipe",
            Self::LetterM => "Letter M",
            Self::LetterW => "Letter W",
            Self::FingerprintDown => "Fingerprint down",
            Self::FingerprintUp => "Fingerprint up",
            Self::SingleTap => "Single tap",
            Self::Heart => "Heart",
            Self::LetterS => "Letter S",
        }
    }

    /// Settings key holding the user's action for this gesture.
    pub fn setting_key(self) -> String {
        format!("ts_gesture_{}", self.name())
    }

    /// Compile-time default action.
    pub fn default_action(self) -> Action {
        match self {
            Self::DoubleTap => Action::WakeUp { vibrate: false },
            Self::SingleTap => Action::Pulse { vibrate: false },
            Self::DoubleSwipe => Action::TogglePlayback { vibrate: true },
            Self::DownArrow => Action::Flashlight { vibrate: true },
            Self::LeftArrow => Action::PreviousTrack { vibrate: true },
            Self::RightArrow => Action::NextTrack { vibrate: true },
            _ => Action::None,
        }
    }
}

/// Scan codes registered with the key broker for the gesture source.
pub fn scan_codes() -> Vec<u32> {
    Gesture::ALL.iter().map(|g| g.scan_code()).collect()
}

/// Resolves gesture scan codes to saved actions and dispatches them.
pub struct GestureController {
    platform: Platform,
    settings: Arc<dyn SettingsStore>,
    user: UserId,
    wake_lock_timeout: Duration,
}

impl GestureController {
    pub fn new(
        platform: Platform,
        settings: Arc<dyn SettingsStore>,
        user: UserId,
        wake_lock_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            platform,
            settings,
            user,
            wake_lock_timeout,
        })
    }

    /// Enable recognition for every gesture whose resolved action is not
    /// `None`, and mirror double-tap-to-wake into settings. Run at
    /// startup and after a settings change.
    pub fn enable_gestures(&self) {
        let mut dt2w = false;
        for gesture in Gesture::ALL {
            let action = self.saved_action(gesture);
            let enabled = action != Action::None;
            if !self.platform.touch.set_gesture_enabled(gesture, enabled) {
                warn!("touch panel rejected {} enablement", gesture.name());
            }
            if gesture == Gesture::DoubleTap && matches!(action, Action::WakeUp { .. }) {
                dt2w = true;
            }
        }
        if let Err(e) = self
            .settings
            .put_int(self.user, keys::DOUBLE_TAP_TO_WAKE, i64::from(dt2w))
        {
            warn!("failed to mirror double-tap-to-wake: {e}");
        }
    }

    /// Handle one gesture scan code from the broker.
    pub fn handle_scan_code(&self, scan_code: u32) {
        let Some(gesture) = Gesture::from_scan_code(scan_code) else {
            debug!("ignoring unknown gesture scan code {scan_code}");
            return;
        };

        // A single tap on an unlocked device only wakes it.
        if gesture == Gesture::SingleTap && !self.platform.actions.is_device_locked() {
            self.platform.power.wake_up(GESTURE_WAKEUP_REASON);
            return;
        }

        let _wake = WakeLockGuard::acquire(
            Arc::clone(&self.platform.power),
            GESTURE_WAKELOCK_TAG,
            self.wake_lock_timeout,
        );
        let action = self.saved_action(gesture);
        debug!("gesture {} -> {}", gesture.name(), action.title());
        let succeeded = self.perform(&action);
        if succeeded && action.vibrate() {
            self.haptic_confirm();
        }
    }

    fn saved_action(&self, gesture: Gesture) -> Action {
        action::resolve_saved(
            self.settings.as_ref(),
            self.user,
            &gesture.setting_key(),
            gesture.default_action(),
        )
    }

    /// Dispatch an action. Returns false on failure; the failed effect
    /// itself is the only user-visible outcome.
    fn perform(&self, action: &Action) -> bool {
        let p = &self.platform;
        match action {
            Action::None => false,
            Action::Flashlight { .. } => p.actions.toggle_flashlight(),
            Action::Camera { .. } => {
                p.power.wake_up("camera-gesture");
                p.actions.launch_camera()
            }
            Action::TogglePlayback { .. } => p.media.dispatch_media_key(MediaKey::PlayPause),
            Action::PreviousTrack { .. } => p.media.dispatch_media_key(MediaKey::Previous),
            Action::NextTrack { .. } => p.media.dispatch_media_key(MediaKey::Next),
            Action::VolumeDown { .. } => p.audio.adjust_media_volume(false),
            Action::VolumeUp { .. } => p.audio.adjust_media_volume(true),
            Action::WakeUp { .. } => {
                p.power.wake_up(GESTURE_WAKEUP_REASON);
                true
            }
            Action::Pulse { .. } => p.actions.pulse_enabled() && p.actions.pulse_ambient(),
            Action::OpenApp { package, .. } => {
                let launched = p.actions.launch_app(package);
                if launched {
                    p.power.wake_up("open-app-gesture");
                } else {
                    warn!("failed to launch {package}");
                }
                launched
            }
        }
    }

    /// Haptic confirmation after a successful action; suppressed while
    /// the ringer is silent or no vibrator is present.
    fn haptic_confirm(&self) {
        if self.platform.audio.ringer_mode() == HwRingerMode::Silent {
            return;
        }
        if self.platform.haptics.has_vibrator() {
            self.platform.haptics.vibrate(HapticEffect::HeavyClick);
        }
    }
}
