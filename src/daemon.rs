use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::broker::evdev::EvdevBroker;
use crate::broker::{Handler, KeyBroker, RegistrationManager};
use crate::config::schema::AppConfig;
use crate::dialog::{DialogPresenter, DialogSurface};
use crate::error::Result;
use crate::event::KeyEvent;
use crate::gesture::GestureController;
use crate::pipeline::{self, SlotReceiver};
use crate::platform::shell::ShellPlatform;
use crate::settings::{watcher, FileStore, SettingsStore, UserId};
use crate::slider::{SliderController, SliderPosition};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Run the sliderd daemon.
///
/// # Errors
/// Returns `SliderError` if the settings store cannot be opened or the
/// key broker rejects a registration; both are fatal.
pub async fn run(config: AppConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    let daemon = config.sliderd.clone();
    let user = UserId(daemon.user);

    let settings = Arc::new(FileStore::open(&daemon.settings_path)?);
    let shell = ShellPlatform::new(config.hooks.clone());
    let platform = shell.platform();

    let slider = SliderController::new(
        platform.clone(),
        Arc::clone(&settings) as Arc<dyn SettingsStore>,
        user,
        Duration::from_millis(daemon.commit_poll_ms),
        Duration::from_millis(daemon.commit_timeout_ms),
    );
    let gestures = GestureController::new(
        platform.clone(),
        Arc::clone(&settings) as Arc<dyn SettingsStore>,
        user,
        Duration::from_millis(daemon.wake_lock_timeout_ms),
    );
    gestures.enable_gestures();

    let mut background = Vec::new();
    if let Some(handle) = shell.spawn_mute_watch(cancel.clone()) {
        background.push(handle);
    }
    background.push(slider.spawn_mute_observer(cancel.clone()));

    let (slider_tx, slider_rx) = pipeline::slot();
    let (gesture_tx, gesture_rx) = pipeline::slot();

    let broker: Arc<dyn KeyBroker> = Arc::new(EvdevBroker::new()?);
    let scan_codes = daemon.slider_scan_codes.clone();
    let slider_handler: Handler = Arc::new(move |event: KeyEvent| {
        match scan_codes.position_for(event.scan_code) {
            Some(position) => slider_tx.send(position),
            None => debug!("unmapped tri-state scan code {}", event.scan_code),
        }
    });
    let gesture_handler: Handler = Arc::new(move |event: KeyEvent| gesture_tx.send(event.scan_code));

    let mut registrations = RegistrationManager::register_sources(
        broker,
        &daemon.tri_state_device_names,
        slider_handler,
        gesture_handler,
    )?;

    let presenter = DialogPresenter::new(
        Arc::clone(&shell) as Arc<dyn DialogSurface>,
        Arc::clone(&platform.power),
        Duration::from_millis(daemon.dialog_timeout_ms),
    );

    let slider_worker_handle = tokio::spawn(slider_worker(
        Arc::clone(&slider),
        presenter,
        slider_rx,
        cancel.clone(),
    ));
    let gesture_worker_handle = tokio::spawn(gesture_worker(
        Arc::clone(&gestures),
        gesture_rx,
        cancel.clone(),
    ));
    let watcher_handle = spawn_settings_watcher(&settings, &gestures, &cancel);

    info!("sliderd daemon running, user {}", daemon.user);

    tokio::select! {
        () = cancel.cancelled() => {}
        () = async { tokio::signal::ctrl_c().await.ok(); } => {
            info!("received SIGINT, shutting down");
            cancel.cancel();
        }
    }

    info!("daemon shutting down...");
    cancel.cancel();

    let mut handles = vec![slider_worker_handle, gesture_worker_handle, watcher_handle];
    handles.append(&mut background);
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(handles)).await;

    registrations.unregister_all();
    info!("daemon stopped");
    Ok(())
}

/// Drain the slider slot: apply the latest settled position, then show
/// the confirmation dialog. Processing never overlaps for this source.
async fn slider_worker(
    controller: Arc<SliderController>,
    mut presenter: DialogPresenter,
    mut rx: SlotReceiver<SliderPosition>,
    cancel: CancellationToken,
) {
    loop {
        let position = tokio::select! {
            () = cancel.cancelled() => return,
            position = rx.recv() => match position {
                Some(position) => position,
                None => return,
            },
        };
        let effect = controller.handle_position(position).await;
        info!("alert slider {position:?}: applied {}", effect.mode);
        presenter.show(effect.mode, position);
    }
}

/// Drain the gesture slot: dispatch the latest scan code.
async fn gesture_worker(
    controller: Arc<GestureController>,
    mut rx: SlotReceiver<u32>,
    cancel: CancellationToken,
) {
    loop {
        let scan_code = tokio::select! {
            () = cancel.cancelled() => return,
            scan_code = rx.recv() => match scan_code {
                Some(scan_code) => scan_code,
                None => return,
            },
        };
        controller.handle_scan_code(scan_code);
    }
}

fn spawn_settings_watcher(
    settings: &Arc<FileStore>,
    gestures: &Arc<GestureController>,
    cancel: &CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let path = settings.path().to_path_buf();
    let store = Arc::clone(settings);
    let gestures = Arc::clone(gestures);
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = watcher::watch_settings(path, store, gestures, cancel).await {
            error!("settings watcher error: {e}");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slider::RingerMode;
    use crate::testutil::{FakeSystem, MemSettings};

    fn test_workers(
        system: &Arc<FakeSystem>,
    ) -> (
        Arc<SliderController>,
        DialogPresenter,
        Arc<MemSettings>,
    ) {
        let settings = MemSettings::new_arc();
        let controller = SliderController::new(
            system.platform(),
            Arc::clone(&settings) as Arc<dyn SettingsStore>,
            UserId(0),
            Duration::from_millis(10),
            Duration::from_millis(2000),
        );
        let presenter = DialogPresenter::new(
            Arc::clone(system) as Arc<dyn DialogSurface>,
            Arc::clone(&system.platform().power),
            Duration::from_millis(1000),
        );
        (controller, presenter, settings)
    }

    #[tokio::test(start_paused = true)]
    async fn slider_bottom_end_to_end() {
        let system = FakeSystem::new();
        let (controller, presenter, _settings) = test_workers(&system);
        let cancel = CancellationToken::new();
        let (tx, rx) = pipeline::slot();
        let worker = tokio::spawn(slider_worker(controller, presenter, rx, cancel.clone()));

        // No saved preference: Bottom resolves to its compile-time default.
        tx.send(SliderPosition::Bottom);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let calls = system.calls();
        assert!(calls.contains(&"set_ringer_mode normal".to_string()), "{calls:?}");
        assert!(calls.contains(&"request_zen off".to_string()), "{calls:?}");
        assert!(calls.contains(&"dialog_show normal bottom".to_string()), "{calls:?}");
        assert!(!calls.contains(&"dialog_hide".to_string()), "{calls:?}");

        // Absent further events the dialog dismisses after its timeout.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(system.calls().contains(&"dialog_hide".to_string()));

        cancel.cancel();
        let _ = worker.await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_applies_only_final_position() {
        let system = FakeSystem::new();
        let (controller, presenter, _settings) = test_workers(&system);
        let cancel = CancellationToken::new();
        let (tx, rx) = pipeline::slot();

        // Burst lands before the worker first drains the slot.
        tx.send(SliderPosition::Bottom);
        tx.send(SliderPosition::Middle);
        tx.send(SliderPosition::Top);

        let worker = tokio::spawn(slider_worker(controller, presenter, rx, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let calls = system.calls();
        let ringer_calls: Vec<&str> = calls
            .iter()
            .filter(|c| c.starts_with("set_ringer_mode"))
            .map(String::as_str)
            .collect();
        // Intermediate positions dropped; the final rest state applied once.
        assert_eq!(ringer_calls, vec!["set_ringer_mode silent"], "{calls:?}");
        assert!(calls.contains(&"dialog_show silent top".to_string()), "{calls:?}");

        cancel.cancel();
        let _ = worker.await;
    }

    #[tokio::test(start_paused = true)]
    async fn saved_preference_wins_over_default() {
        let system = FakeSystem::new();
        let (controller, presenter, settings) = test_workers(&system);
        settings.put("alert_slider_top", "do_not_disturb");
        let cancel = CancellationToken::new();
        let (tx, rx) = pipeline::slot();
        let worker = tokio::spawn(slider_worker(controller, presenter, rx, cancel.clone()));

        tx.send(SliderPosition::Top);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let calls = system.calls();
        assert!(calls.contains(&"request_zen no_interruptions".to_string()), "{calls:?}");
        assert!(
            calls.contains(&format!("dialog_show {} top", RingerMode::DoNotDisturb.name())),
            "{calls:?}"
        );

        cancel.cancel();
        let _ = worker.await;
    }

    #[tokio::test]
    async fn gesture_worker_dispatches_latest_scan_code() {
        let system = FakeSystem::new();
        let settings = MemSettings::new_arc();
        let controller = GestureController::new(
            system.platform(),
            Arc::clone(&settings) as Arc<dyn SettingsStore>,
            UserId(0),
            Duration::from_secs(10),
        );
        let cancel = CancellationToken::new();
        let (tx, rx) = pipeline::slot();
        let worker = tokio::spawn(gesture_worker(controller, rx, cancel.clone()));

        tx.send(crate::gesture::Gesture::DownArrow.scan_code());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(system.calls().contains(&"toggle_flashlight".to_string()));

        cancel.cancel();
        let _ = worker.await;
    }
}
