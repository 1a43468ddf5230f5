use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use evdev::{Device, EventType};
use tracing::{debug, info, warn};

use super::{DeviceSelector, Handler, InputDeviceInfo, KeyBroker, KeyFilter, RegistrationToken};
use crate::error::{Result, SliderError};
use crate::event::{KeyAction, KeyEvent};

/// Key broker reading kernel input devices under `/dev/input`.
///
/// Each registration opens its matching devices and spawns one reader
/// task per device; the handler runs on that task, never on a worker.
pub struct EvdevBroker {
    devices: Vec<(InputDeviceInfo, PathBuf)>,
    readers: Mutex<HashMap<u64, Vec<tokio::task::JoinHandle<()>>>>,
    next_token: AtomicU64,
}

impl EvdevBroker {
    /// Enumerate input devices.
    ///
    /// # Errors
    /// Returns `SliderError::Broker` when no input device is accessible;
    /// the daemon has no degraded mode without its event source.
    pub fn new() -> Result<Self> {
        let mut devices = Vec::new();
        for (id, (path, device)) in evdev::enumerate().enumerate() {
            let name = device.name().unwrap_or("unknown").to_string();
            debug!("input device {id}: {name} ({})", path.display());
            devices.push((
                InputDeviceInfo {
                    id: id as u32,
                    name,
                },
                path,
            ));
        }
        if devices.is_empty() {
            return Err(SliderError::Broker(
                "no input devices accessible under /dev/input".into(),
            ));
        }
        info!("key broker found {} input devices", devices.len());
        Ok(Self {
            devices,
            readers: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        })
    }

    fn spawn_reader(
        device_id: u32,
        device: Device,
        filter: KeyFilter,
        handler: Handler,
    ) -> Result<tokio::task::JoinHandle<()>> {
        let mut stream = device
            .into_event_stream()
            .map_err(|e| SliderError::Registration(e.to_string()))?;
        Ok(tokio::spawn(async move {
            loop {
                match stream.next_event().await {
                    Ok(raw) => {
                        if raw.event_type() != EventType::KEY {
                            continue;
                        }
                        // Value 2 is key autorepeat; not an edge.
                        let action = match raw.value() {
                            1 => KeyAction::Down,
                            0 => KeyAction::Up,
                            _ => continue,
                        };
                        let event = KeyEvent {
                            scan_code: u32::from(raw.code()),
                            action,
                            device_id,
                        };
                        if filter.matches(&event) {
                            handler(event);
                        }
                    }
                    Err(e) => {
                        warn!("input device {device_id} read failed: {e}");
                        return;
                    }
                }
            }
        }))
    }
}

impl KeyBroker for EvdevBroker {
    fn input_devices(&self) -> Vec<InputDeviceInfo> {
        self.devices.iter().map(|(info, _)| info.clone()).collect()
    }

    fn register(&self, filter: KeyFilter, handler: Handler) -> Result<RegistrationToken> {
        let targets: Vec<&(InputDeviceInfo, PathBuf)> = match filter.device {
            DeviceSelector::Any => self.devices.iter().collect(),
            DeviceSelector::Id(id) => self
                .devices
                .iter()
                .filter(|(info, _)| info.id == id)
                .collect(),
        };
        if targets.is_empty() {
            return Err(SliderError::Registration(format!(
                "no input device matches {:?}",
                filter.device
            )));
        }

        let mut handles = Vec::with_capacity(targets.len());
        for (info, path) in targets {
            let device =
                Device::open(path).map_err(|e| SliderError::Registration(e.to_string()))?;
            handles.push(Self::spawn_reader(
                info.id,
                device,
                filter.clone(),
                handler.clone(),
            )?);
        }

        let token = RegistrationToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.readers.lock().unwrap().insert(token.0, handles);
        Ok(token)
    }

    fn unregister(&self, token: RegistrationToken) {
        if let Some(handles) = self.readers.lock().unwrap().remove(&token.0) {
            for handle in handles {
                handle.abort();
            }
            debug!("unregistered key handler {}", token.0);
        }
    }
}
