use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::settings::{SettingsStore, UserId};

/// A user-assignable gesture action.
///
/// Persisted as a flat JSON record: `name` (snake_case variant name),
/// `vibrate`, and `package` for `OpenApp`. Unknown fields are ignored on
/// read; an unknown `name` is a parse error so callers can substitute
/// their default instead of inventing a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Action {
    None,
    Flashlight {
        #[serde(default = "vibrate_default")]
        vibrate: bool,
    },
    Camera {
        #[serde(default = "vibrate_default")]
        vibrate: bool,
    },
    TogglePlayback {
        #[serde(default = "vibrate_default")]
        vibrate: bool,
    },
    PreviousTrack {
        #[serde(default = "vibrate_default")]
        vibrate: bool,
    },
    NextTrack {
        #[serde(default = "vibrate_default")]
        vibrate: bool,
    },
    VolumeDown {
        #[serde(default = "vibrate_default")]
        vibrate: bool,
    },
    VolumeUp {
        #[serde(default = "vibrate_default")]
        vibrate: bool,
    },
    WakeUp {
        #[serde(default = "vibrate_default")]
        vibrate: bool,
    },
    Pulse {
        #[serde(default = "vibrate_default")]
        vibrate: bool,
    },
    OpenApp {
        #[serde(default = "vibrate_default")]
        vibrate: bool,
        package: String,
    },
}

// Missing `vibrate` in a persisted record means enabled.
fn vibrate_default() -> bool {
    true
}

impl Action {
    /// Whether haptic confirmation is enabled. `None` never vibrates.
    pub fn vibrate(&self) -> bool {
        match self {
            Self::None => false,
            Self::Flashlight { vibrate }
            | Self::Camera { vibrate }
            | Self::TogglePlayback { vibrate }
            | Self::PreviousTrack { vibrate }
            | Self::NextTrack { vibrate }
            | Self::VolumeDown { vibrate }
            | Self::VolumeUp { vibrate }
            | Self::WakeUp { vibrate }
            | Self::Pulse { vibrate }
            | Self::OpenApp { vibrate, .. } => *vibrate,
        }
    }

    /// Set the haptic confirmation flag. No-op for `None`.
    pub fn set_vibrate(&mut self, on: bool) {
        match self {
            Self::None => {}
            Self::Flashlight { vibrate }
            | Self::Camera { vibrate }
            | Self::TogglePlayback { vibrate }
            | Self::PreviousTrack { vibrate }
            | Self::NextTrack { vibrate }
            | Self::VolumeDown { vibrate }
            | Self::VolumeUp { vibrate }
            | Self::WakeUp { vibrate }
            | Self::Pulse { vibrate }
            | Self::OpenApp { vibrate, .. } => *vibrate = on,
        }
    }

    /// Display title.
    pub fn title(&self) -> Cow<'static, str> {
        match self {
            Self::None => Cow::Borrowed("Do nothing"),
            Self::Flashlight { .. } => Cow::Borrowed("Toggle flashlight"),
            Self::Camera { .. } => Cow::Borrowed("Open camera"),
            Self::TogglePlayback { .. } => Cow::Borrowed("Play/pause music"),
            Self::PreviousTrack { .. } => Cow::Borrowed("Previous track"),
            Self::NextTrack { .. } => Cow::Borrowed("Next track"),
            Self::VolumeDown { .. } => Cow::Borrowed("Volume down"),
            Self::VolumeUp { .. } => Cow::Borrowed("Volume up"),
            Self::WakeUp { .. } => Cow::Borrowed("Wake up"),
            Self::Pulse { .. } => Cow::Borrowed("Ambient display"),
            Self::OpenApp { package, .. } => Cow::Owned(format!("Open {package}")),
        }
    }

    /// Symbolic icon name handed to UI surfaces.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Flashlight { .. } => "flashlight",
            Self::Camera { .. } => "camera",
            Self::TogglePlayback { .. } => "play-pause",
            Self::PreviousTrack { .. } => "skip-previous",
            Self::NextTrack { .. } => "skip-next",
            Self::VolumeDown { .. } => "volume-down",
            Self::VolumeUp { .. } => "volume-up",
            Self::WakeUp { .. } => "wake-up",
            Self::Pulse { .. } => "pulse",
            Self::OpenApp { .. } => "open-app",
        }
    }

    /// Serialize to the canonical persisted form.
    ///
    /// # Errors
    /// Returns `SliderError::Action` if encoding fails; with the current
    /// variant set this is not reachable at runtime.
    pub fn serialize(&self) -> crate::error::Result<String> {
        serde_json::to_string(self).map_err(|e| crate::error::SliderError::Action(e.to_string()))
    }

    /// Parse the persisted form.
    ///
    /// # Errors
    /// Returns `SliderError::Action` on malformed JSON or an unknown
    /// action name.
    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        serde_json::from_str(raw).map_err(|e| crate::error::SliderError::Action(e.to_string()))
    }
}

/// Resolve the persisted action for `key`, falling back to `default` when
/// nothing is saved or the saved value does not parse. Never fails.
pub fn resolve_saved(
    settings: &dyn SettingsStore,
    user: UserId,
    key: &str,
    default: Action,
) -> Action {
    let Some(raw) = settings.get_string(user, key) else {
        return default;
    };
    if raw.trim().is_empty() {
        return default;
    }
    match Action::parse(&raw) {
        Ok(action) => action,
        Err(e) => {
            warn!("unreadable saved action for {key}: {e}");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemSettings;

    fn all_variants() -> Vec<Action> {
        vec![
            Action::None,
            Action::Flashlight { vibrate: true },
            Action::Camera { vibrate: false },
            Action::TogglePlayback { vibrate: true },
            Action::PreviousTrack { vibrate: false },
            Action::NextTrack { vibrate: true },
            Action::VolumeDown { vibrate: false },
            Action::VolumeUp { vibrate: true },
            Action::WakeUp { vibrate: false },
            Action::Pulse { vibrate: true },
            Action::OpenApp {
                vibrate: true,
                package: "org.lineageos.jelly".to_string(),
            },
        ]
    }

    #[test]
    fn round_trips_every_variant() {
        for action in all_variants() {
            let raw = action.serialize().unwrap();
            assert_eq!(Action::parse(&raw).unwrap(), action, "raw: {raw}");
        }
    }

    #[test]
    fn names_are_snake_case() {
        let raw = Action::TogglePlayback { vibrate: true }.serialize().unwrap();
        assert!(raw.contains("\"name\":\"toggle_playback\""), "raw: {raw}");
        let raw = Action::OpenApp {
            vibrate: false,
            package: "com.example".to_string(),
        }
        .serialize()
        .unwrap();
        assert!(raw.contains("\"name\":\"open_app\""), "raw: {raw}");
        assert!(raw.contains("\"package\":\"com.example\""), "raw: {raw}");
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert!(Action::parse(r#"{"name":"warp_drive","vibrate":true}"#).is_err());
    }

    #[test]
    fn missing_vibrate_defaults_to_enabled() {
        let action = Action::parse(r#"{"name":"flashlight"}"#).unwrap();
        assert_eq!(action, Action::Flashlight { vibrate: true });
    }

    #[test]
    fn unknown_extra_fields_are_ignored() {
        let action = Action::parse(r#"{"name":"camera","vibrate":false,"color":"red"}"#).unwrap();
        assert_eq!(action, Action::Camera { vibrate: false });
    }

    #[test]
    fn none_never_vibrates() {
        let mut action = Action::parse(r#"{"name":"none","vibrate":true}"#).unwrap();
        assert!(!action.vibrate());
        action.set_vibrate(true);
        assert!(!action.vibrate());
    }

    #[test]
    fn resolve_saved_falls_back_on_unknown_name() {
        let settings = MemSettings::new();
        let user = UserId(0);
        settings.put("ts_gesture_heart", r#"{"name":"teleport","vibrate":true}"#);
        let action = resolve_saved(
            &settings,
            user,
            "ts_gesture_heart",
            Action::Pulse { vibrate: false },
        );
        assert_eq!(action, Action::Pulse { vibrate: false });
    }

    #[test]
    fn resolve_saved_falls_back_on_blank_or_missing() {
        let settings = MemSettings::new();
        let user = UserId(0);
        assert_eq!(
            resolve_saved(&settings, user, "ts_gesture_letter_o", Action::None),
            Action::None
        );
        settings.put("ts_gesture_letter_o", "   ");
        assert_eq!(
            resolve_saved(&settings, user, "ts_gesture_letter_o", Action::None),
            Action::None
        );
    }

    #[test]
    fn resolve_saved_reads_valid_record() {
        let settings = MemSettings::new();
        let user = UserId(0);
        settings.put(
            "ts_gesture_double_swipe",
            r#"{"name":"toggle_playback","vibrate":true}"#,
        );
        let action = resolve_saved(&settings, user, "ts_gesture_double_swipe", Action::None);
        assert_eq!(action, Action::TogglePlayback { vibrate: true });
    }
}
