use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::platform::PowerControl;
use crate::slider::{RingerMode, SliderPosition};

/// Physical screen edge the dialog attaches to, following the slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Top,
    Middle,
    Bottom,
}

impl Anchor {
    pub fn name(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Middle => "middle",
            Self::Bottom => "bottom",
        }
    }
}

/// Rendering surface for the transient mode dialog.
pub trait DialogSurface: Send + Sync {
    fn show(&self, mode: RingerMode, anchor: Anchor);
    fn hide(&self);
}

/// Shows a transient confirmation of the applied mode, auto-dismissed
/// after a timeout.
///
/// Owned by the slider worker, so `show`/`dismiss` are never invoked
/// concurrently. The pending dismissal is an abortable task handle: a
/// newer `show` cancels it before scheduling its own.
pub struct DialogPresenter {
    surface: Arc<dyn DialogSurface>,
    power: Arc<dyn PowerControl>,
    timeout: Duration,
    pending_dismiss: Option<tokio::task::JoinHandle<()>>,
}

impl DialogPresenter {
    pub fn new(
        surface: Arc<dyn DialogSurface>,
        power: Arc<dyn PowerControl>,
        timeout: Duration,
    ) -> Self {
        Self {
            surface,
            power,
            timeout,
            pending_dismiss: None,
        }
    }

    /// Show the dialog for `mode` at the position's anchor and schedule
    /// its dismissal. No-op while the display is asleep; the show is not
    /// deferred.
    pub fn show(&mut self, mode: RingerMode, position: SliderPosition) {
        self.cancel_pending();
        if !self.power.is_interactive() {
            debug!("display not interactive, skipping dialog for {mode}");
            return;
        }
        self.surface.show(mode, position.anchor());

        let surface = Arc::clone(&self.surface);
        let timeout = self.timeout;
        self.pending_dismiss = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            surface.hide();
        }));
    }

    /// Dismiss immediately, cancelling any scheduled dismissal.
    pub fn dismiss(&mut self) {
        self.cancel_pending();
        self.surface.hide();
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending_dismiss.take() {
            handle.abort();
        }
    }
}

impl Drop for DialogPresenter {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeSystem;

    const TIMEOUT: Duration = Duration::from_millis(1000);

    fn presenter(system: &Arc<FakeSystem>) -> DialogPresenter {
        DialogPresenter::new(
            Arc::clone(system) as Arc<dyn DialogSurface>,
            Arc::clone(system) as Arc<dyn PowerControl>,
            TIMEOUT,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn auto_dismisses_after_timeout() {
        let system = FakeSystem::new();
        let mut presenter = presenter(&system);

        presenter.show(RingerMode::Silent, SliderPosition::Top);
        assert!(system.calls().contains(&"dialog_show silent top".to_string()));
        assert!(!system.calls().contains(&"dialog_hide".to_string()));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(system.calls().contains(&"dialog_hide".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn second_show_cancels_first_dismissal() {
        let system = FakeSystem::new();
        let mut presenter = presenter(&system);

        presenter.show(RingerMode::Silent, SliderPosition::Top);
        tokio::time::sleep(Duration::from_millis(500)).await;
        presenter.show(RingerMode::Vibrate, SliderPosition::Middle);

        // Past the first show's deadline: its dismissal was cancelled.
        tokio::time::sleep(Duration::from_millis(700)).await;
        let hides = system.calls().iter().filter(|c| *c == "dialog_hide").count();
        assert_eq!(hides, 0);

        // The second show's own deadline fires exactly once.
        tokio::time::sleep(Duration::from_millis(400)).await;
        let hides = system.calls().iter().filter(|c| *c == "dialog_hide").count();
        assert_eq!(hides, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_show_while_display_asleep() {
        let system = FakeSystem::new();
        system.set_interactive(false);
        let mut presenter = presenter(&system);

        presenter.show(RingerMode::Normal, SliderPosition::Bottom);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let calls = system.calls();
        assert!(!calls.iter().any(|c| c.starts_with("dialog_")), "{calls:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_dismiss_cancels_pending_timer() {
        let system = FakeSystem::new();
        let mut presenter = presenter(&system);

        presenter.show(RingerMode::Normal, SliderPosition::Bottom);
        presenter.dismiss();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let hides = system.calls().iter().filter(|c| *c == "dialog_hide").count();
        assert_eq!(hides, 1);
    }
}
