use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dialog::Anchor;
use crate::error::SliderError;
use crate::platform::{HapticEffect, HwRingerMode, Platform, ZenLevel};
use crate::settings::{keys, SettingsStore, UserId};

/// Physical position of the three-way alert slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderPosition {
    Top,
    Middle,
    Bottom,
}

impl SliderPosition {
    pub const ALL: [Self; 3] = [Self::Top, Self::Middle, Self::Bottom];

    /// Settings key holding the user's mode for this position.
    pub fn setting_key(self) -> &'static str {
        match self {
            Self::Top => "alert_slider_top",
            Self::Middle => "alert_slider_middle",
            Self::Bottom => "alert_slider_bottom",
        }
    }

    /// Mode applied when no preference is saved.
    pub fn default_mode(self) -> RingerMode {
        match self {
            Self::Top => RingerMode::Silent,
            Self::Middle => RingerMode::Vibrate,
            Self::Bottom => RingerMode::Normal,
        }
    }

    /// Physical location the confirmation dialog anchors to.
    pub fn anchor(self) -> Anchor {
        match self {
            Self::Top => Anchor::Top,
            Self::Middle => Anchor::Middle,
            Self::Bottom => Anchor::Bottom,
        }
    }
}

/// Resolved target state for a slider position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingerMode {
    Normal,
    Priority,
    Vibrate,
    Silent,
    DoNotDisturb,
}

impl RingerMode {
    /// Canonical persisted name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Priority => "priority",
            Self::Vibrate => "vibrate",
            Self::Silent => "silent",
            Self::DoNotDisturb => "do_not_disturb",
        }
    }

    /// Display label for the confirmation dialog.
    pub fn title(self) -> &'static str {
        match self {
            Self::Normal => "Ring",
            Self::Priority => "Priority only",
            Self::Vibrate => "Vibrate",
            Self::Silent => "Silent",
            Self::DoNotDisturb => "Do not disturb",
        }
    }

    /// Symbolic icon name for the confirmation dialog.
    pub fn icon(self) -> &'static str {
        match self {
            Self::Normal => "ring",
            Self::Priority => "priority",
            Self::Vibrate => "vibrate",
            Self::Silent => "silent",
            Self::DoNotDisturb => "dnd",
        }
    }

    fn hw_ringer(self) -> HwRingerMode {
        match self {
            Self::Normal | Self::Priority | Self::DoNotDisturb => HwRingerMode::Normal,
            Self::Vibrate => HwRingerMode::Vibrate,
            Self::Silent => HwRingerMode::Silent,
        }
    }

    fn zen_level(self) -> ZenLevel {
        match self {
            Self::Normal | Self::Vibrate | Self::Silent => ZenLevel::Off,
            Self::Priority => ZenLevel::ImportantInterruptions,
            Self::DoNotDisturb => ZenLevel::NoInterruptions,
        }
    }

    /// Haptic confirmation on entry. Silent and DND never vibrate.
    fn haptic(self) -> Option<HapticEffect> {
        match self {
            Self::Normal | Self::Priority => Some(HapticEffect::HeavyClick),
            Self::Vibrate => Some(HapticEffect::DoubleClick),
            Self::Silent | Self::DoNotDisturb => None,
        }
    }
}

impl FromStr for RingerMode {
    type Err = SliderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "normal" => Ok(Self::Normal),
            "priority" => Ok(Self::Priority),
            "vibrate" => Ok(Self::Vibrate),
            "silent" => Ok(Self::Silent),
            "do_not_disturb" => Ok(Self::DoNotDisturb),
            other => Err(SliderError::Config(format!("unknown ringer mode: {other}"))),
        }
    }
}

impl std::fmt::Display for RingerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one slider effect application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedEffect {
    pub mode: RingerMode,

    /// False when the zen subsystem did not report the requested level
    /// within the commit timeout.
    pub zen_committed: bool,
}

/// Applies slider modes to the audio/zen/haptic subsystems and tracks
/// the media-mute side effect.
pub struct SliderController {
    platform: Platform,
    settings: Arc<dyn SettingsStore>,
    user: UserId,
    commit_poll: Duration,
    commit_timeout: Duration,

    // Set when Silent muted the media stream on our behalf; cleared by
    // an observed external unmute so a manual unmute is never undone.
    // Written by the slider worker and the mute-observer task.
    was_muted: AtomicBool,
}

impl SliderController {
    pub fn new(
        platform: Platform,
        settings: Arc<dyn SettingsStore>,
        user: UserId,
        commit_poll: Duration,
        commit_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            platform,
            settings,
            user,
            commit_poll,
            commit_timeout,
            was_muted: AtomicBool::new(false),
        })
    }

    /// Resolve the saved mode for a position, falling back to the
    /// position's default on a missing or unreadable preference.
    pub fn resolve_mode(&self, position: SliderPosition) -> RingerMode {
        let Some(saved) = self.settings.get_string(self.user, position.setting_key()) else {
            return position.default_mode();
        };
        if saved.trim().is_empty() {
            return position.default_mode();
        }
        match saved.parse() {
            Ok(mode) => mode,
            Err(e) => {
                warn!("{e}, using default for {position:?}");
                position.default_mode()
            }
        }
    }

    /// Handle a settled slider position: resolve the mode and apply it.
    pub async fn handle_position(&self, position: SliderPosition) -> AppliedEffect {
        let mode = self.resolve_mode(position);
        debug!("slider {position:?} -> {mode}");
        let mute_media = self
            .settings
            .get_int(self.user, keys::MUTE_MEDIA_WITH_SILENT, 0)
            == 1;
        self.apply(mode, true, mute_media).await
    }

    /// Apply a mode's full side-effect set: ringer, zen (with commit
    /// wait), haptic confirmation, and the media-mute policy.
    pub async fn apply(&self, mode: RingerMode, vibrate: bool, mute_media: bool) -> AppliedEffect {
        self.platform.audio.set_ringer_mode(mode.hw_ringer());
        let zen_committed = self.request_zen_committed(mode.zen_level()).await;

        if vibrate {
            if let Some(effect) = mode.haptic() {
                if self.platform.haptics.has_vibrator() {
                    self.platform.haptics.vibrate(effect);
                }
            }
        }

        match mode {
            RingerMode::Silent => {
                if mute_media {
                    self.platform.audio.set_media_muted(true);
                    self.was_muted.store(true, Ordering::Release);
                }
            }
            RingerMode::Normal | RingerMode::Priority | RingerMode::Vibrate => {
                if mute_media && self.was_muted.swap(false, Ordering::AcqRel) {
                    self.platform.audio.set_media_muted(false);
                }
            }
            RingerMode::DoNotDisturb => {}
        }

        AppliedEffect {
            mode,
            zen_committed,
        }
    }

    /// Request a zen level and poll until the subsystem reports it
    /// committed, bounded by the commit timeout.
    async fn request_zen_committed(&self, level: ZenLevel) -> bool {
        self.platform.zen.request_zen(level);
        let deadline = tokio::time::Instant::now() + self.commit_timeout;
        loop {
            if self.platform.zen.zen() == level {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    "{}",
                    SliderError::ZenCommitTimeout {
                        timeout_ms: self.commit_timeout.as_millis() as u64,
                    }
                );
                return false;
            }
            tokio::time::sleep(self.commit_poll).await;
        }
    }

    /// Observe external media mute-state changes: an unmute made outside
    /// this process clears the was-muted flag without another `apply`.
    pub fn spawn_mute_observer(
        self: &Arc<Self>,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let controller = Arc::clone(self);
        let mut rx = controller.platform.audio.subscribe_media_mute();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    event = rx.recv() => match event {
                        Ok(false) => {
                            debug!("media stream unmuted externally");
                            controller.was_muted.store(false, Ordering::Release);
                        }
                        Ok(true) => {}
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("mute observer lagged, missed {n} events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("mute event source closed");
                            return;
                        }
                    }
                }
            }
        })
    }

    #[cfg(test)]
    pub(crate) fn was_muted(&self) -> bool {
        self.was_muted.load(Ordering::Acquire)
    }
}
