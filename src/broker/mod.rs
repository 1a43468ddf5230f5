pub mod evdev;

use std::sync::Arc;

use tracing::{error, info};

use crate::error::Result;
use crate::event::{KeyAction, KeyEvent};

/// Callback invoked on the broker's delivery context for each matching
/// event. Must not block; hand the event to a pipeline slot.
pub type Handler = Arc<dyn Fn(KeyEvent) + Send + Sync>;

/// Which device a registration listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelector {
    Any,
    Id(u32),
}

/// Event filter for one registration.
#[derive(Debug, Clone)]
pub struct KeyFilter {
    /// Scan codes to match; empty matches every code.
    pub scan_codes: Vec<u32>,

    /// Edges to match.
    pub edges: Vec<KeyAction>,

    pub device: DeviceSelector,
}

impl KeyFilter {
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if let DeviceSelector::Id(id) = self.device {
            if event.device_id != id {
                return false;
            }
        }
        if !self.edges.contains(&event.action) {
            return false;
        }
        self.scan_codes.is_empty() || self.scan_codes.contains(&event.scan_code)
    }
}

/// Token identifying one live registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationToken(pub u64);

#[derive(Debug, Clone)]
pub struct InputDeviceInfo {
    pub id: u32,
    pub name: String,
}

/// The platform's device-key broker, at its boundary.
pub trait KeyBroker: Send + Sync {
    fn input_devices(&self) -> Vec<InputDeviceInfo>;

    /// Register a handler for events matching `filter`.
    ///
    /// # Errors
    /// Returns an error if the broker rejects the registration; callers
    /// treat this as fatal.
    fn register(&self, filter: KeyFilter, handler: Handler) -> Result<RegistrationToken>;

    fn unregister(&self, token: RegistrationToken);
}

/// Owns the daemon's two registrations: the alert slider on its detected
/// tri-state device and the gesture scan-code set on any device.
pub struct RegistrationManager {
    broker: Arc<dyn KeyBroker>,
    tokens: Vec<RegistrationToken>,
}

impl RegistrationManager {
    /// Register both input sources.
    ///
    /// A missing tri-state device disables the slider source with an
    /// error log; a broker failure is returned and ends the daemon.
    ///
    /// # Errors
    /// Returns an error if the broker rejects either registration.
    pub fn register_sources(
        broker: Arc<dyn KeyBroker>,
        tri_state_names: &[String],
        slider_handler: Handler,
        gesture_handler: Handler,
    ) -> Result<Self> {
        let mut tokens = Vec::new();

        let tri_state = broker
            .input_devices()
            .into_iter()
            .find(|d| tri_state_names.iter().any(|n| n == &d.name));
        match tri_state {
            Some(device) => {
                info!("registering alert slider handler on {} (id {})", device.name, device.id);
                tokens.push(broker.register(
                    KeyFilter {
                        scan_codes: Vec::new(),
                        edges: vec![KeyAction::Down],
                        device: DeviceSelector::Id(device.id),
                    },
                    slider_handler,
                )?);
            }
            None => error!("tri-state device not found, alert slider disabled"),
        }

        info!("registering gesture handler");
        tokens.push(broker.register(
            KeyFilter {
                scan_codes: crate::gesture::scan_codes(),
                edges: vec![KeyAction::Up],
                device: DeviceSelector::Any,
            },
            gesture_handler,
        )?);

        Ok(Self { broker, tokens })
    }

    pub fn unregister_all(&mut self) {
        for token in self.tokens.drain(..) {
            self.broker.unregister(token);
        }
    }
}

impl Drop for RegistrationManager {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SliderError;
    use std::sync::Mutex;

    #[test]
    fn filter_matches_device_edge_and_code() {
        let filter = KeyFilter {
            scan_codes: vec![247, 248],
            edges: vec![KeyAction::Up],
            device: DeviceSelector::Any,
        };
        let event = KeyEvent {
            scan_code: 247,
            action: KeyAction::Up,
            device_id: 3,
        };
        assert!(filter.matches(&event));
        assert!(!filter.matches(&KeyEvent {
            action: KeyAction::Down,
            ..event
        }));
        assert!(!filter.matches(&KeyEvent {
            scan_code: 300,
            ..event
        }));

        let pinned = KeyFilter {
            scan_codes: Vec::new(),
            edges: vec![KeyAction::Up],
            device: DeviceSelector::Id(7),
        };
        assert!(!pinned.matches(&event));
        assert!(pinned.matches(&KeyEvent {
            device_id: 7,
            ..event
        }));
        // Empty scan code set matches any code.
        assert!(pinned.matches(&KeyEvent {
            device_id: 7,
            scan_code: 999,
            ..event
        }));
    }

    #[derive(Default)]
    struct FakeBroker {
        devices: Vec<InputDeviceInfo>,
        reject: bool,
        registered: Mutex<Vec<(u64, KeyFilter)>>,
        unregistered: Mutex<Vec<u64>>,
    }

    impl KeyBroker for FakeBroker {
        fn input_devices(&self) -> Vec<InputDeviceInfo> {
            self.devices.clone()
        }

        fn register(&self, filter: KeyFilter, _handler: Handler) -> Result<RegistrationToken> {
            if self.reject {
                return Err(SliderError::Registration("broker offline".into()));
            }
            let mut registered = self.registered.lock().unwrap();
            let token = registered.len() as u64;
            registered.push((token, filter));
            Ok(RegistrationToken(token))
        }

        fn unregister(&self, token: RegistrationToken) {
            self.unregistered.lock().unwrap().push(token.0);
        }
    }

    fn noop_handler() -> Handler {
        Arc::new(|_| {})
    }

    #[test]
    fn registers_slider_and_gestures_when_device_present() {
        let broker = Arc::new(FakeBroker {
            devices: vec![InputDeviceInfo {
                id: 4,
                name: "oplus,hall_tri_state_key".into(),
            }],
            ..FakeBroker::default()
        });
        let manager = RegistrationManager::register_sources(
            Arc::clone(&broker) as Arc<dyn KeyBroker>,
            &["oplus,hall_tri_state_key".to_string()],
            noop_handler(),
            noop_handler(),
        )
        .unwrap();

        let registered = broker.registered.lock().unwrap();
        assert_eq!(registered.len(), 2);
        assert_eq!(registered[0].1.device, DeviceSelector::Id(4));
        assert_eq!(registered[0].1.edges, vec![KeyAction::Down]);
        assert!(registered[0].1.scan_codes.is_empty());
        assert_eq!(registered[1].1.device, DeviceSelector::Any);
        assert_eq!(registered[1].1.edges, vec![KeyAction::Up]);
        assert_eq!(registered[1].1.scan_codes, crate::gesture::scan_codes());
        drop(registered);
        drop(manager);
    }

    #[test]
    fn missing_tri_state_device_skips_slider_only() {
        let broker = Arc::new(FakeBroker::default());
        let _manager = RegistrationManager::register_sources(
            Arc::clone(&broker) as Arc<dyn KeyBroker>,
            &["oplus,hall_tri_state_key".to_string()],
            noop_handler(),
            noop_handler(),
        )
        .unwrap();
        assert_eq!(broker.registered.lock().unwrap().len(), 1);
    }

    #[test]
    fn rejected_registration_is_fatal() {
        let broker = Arc::new(FakeBroker {
            reject: true,
            ..FakeBroker::default()
        });
        let result = RegistrationManager::register_sources(
            Arc::clone(&broker) as Arc<dyn KeyBroker>,
            &[],
            noop_handler(),
            noop_handler(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn drop_unregisters_every_token() {
        let broker = Arc::new(FakeBroker {
            devices: vec![InputDeviceInfo {
                id: 0,
                name: "oplus,tri-state-key".into(),
            }],
            ..FakeBroker::default()
        });
        let manager = RegistrationManager::register_sources(
            Arc::clone(&broker) as Arc<dyn KeyBroker>,
            &["oplus,tri-state-key".to_string()],
            noop_handler(),
            noop_handler(),
        )
        .unwrap();
        drop(manager);
        assert_eq!(broker.unregistered.lock().unwrap().len(), 2);
    }
}
