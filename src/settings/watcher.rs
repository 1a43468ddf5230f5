use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::SliderError;
use crate::gesture::GestureController;
use crate::settings::FileStore;

/// Watch the settings file for edits by other processes (the settings
/// UI), reload the snapshot, and re-run gesture enablement so bindings
/// take effect without a restart.
///
/// # Errors
/// Returns `SliderError::Watcher` if the file watcher cannot be created.
pub async fn watch_settings(
    path: PathBuf,
    store: Arc<FileStore>,
    gestures: Arc<GestureController>,
    cancel: CancellationToken,
) -> crate::error::Result<()> {
    let (notify_tx, mut notify_rx) = tokio::sync::mpsc::channel::<()>(16);
    let watch_path = path.clone();
    let thread_cancel = cancel.clone();

    // The notify watcher is callback-driven and must live on a blocking
    // thread for the lifetime of the daemon.
    let _watcher_thread = tokio::task::spawn_blocking(move || {
        let debouncer = new_debouncer(
            Duration::from_millis(500),
            move |events: Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                match events {
                    Ok(events) => {
                        if events.iter().any(|e| e.kind == DebouncedEventKind::Any) {
                            let _ = notify_tx.blocking_send(());
                        }
                    }
                    Err(e) => warn!("settings watcher error: {e}"),
                }
            },
        )
        .map_err(|e| SliderError::Watcher(e.to_string()));

        let mut debouncer = match debouncer {
            Ok(d) => d,
            Err(e) => {
                warn!("failed to create settings watcher: {e}");
                return;
            }
        };
        // Watch the parent directory so the file may not exist yet.
        let target = watch_path.parent().unwrap_or(&watch_path);
        if let Err(e) = debouncer
            .watcher()
            .watch(target, notify::RecursiveMode::NonRecursive)
        {
            warn!("failed to watch settings path: {e}");
            return;
        }
        info!("watching settings file: {}", watch_path.display());
        while !thread_cancel.is_cancelled() {
            std::thread::sleep(Duration::from_secs(1));
        }
    });

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                info!("settings watcher shutting down");
                return Ok(());
            }
            Some(()) = notify_rx.recv() => {
                match store.reload() {
                    Ok(()) => {
                        info!("settings reloaded, re-evaluating gesture enablement");
                        gestures.enable_gestures();
                    }
                    Err(e) => warn!("settings reload failed, keeping old snapshot: {e}"),
                }
            }
        }
    }
}
