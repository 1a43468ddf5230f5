/// Edge of a key event as delivered by the key broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Down,
    Up,
}

/// A raw key event from an input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Kernel scan code of the key.
    pub scan_code: u32,

    /// Press or release edge.
    pub action: KeyAction,

    /// Broker-assigned id of the originating device.
    pub device_id: u32,
}
