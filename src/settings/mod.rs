pub mod watcher;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tracing::{debug, warn};

use crate::error::Result;

/// Numeric user scope for a setting, mirroring the platform's multi-user
/// settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub u32);

/// Well-known setting keys.
pub mod keys {
    /// Int flag: mute the media stream while the slider is on Silent.
    pub const MUTE_MEDIA_WITH_SILENT: &str = "config_mute_media";

    /// Int flag mirrored from gesture enablement: double tap wakes the
    /// device.
    pub const DOUBLE_TAP_TO_WAKE: &str = "double_tap_to_wake";
}

/// Persisted per-user string settings.
pub trait SettingsStore: Send + Sync {
    fn get_string(&self, user: UserId, key: &str) -> Option<String>;

    /// # Errors
    /// Returns an error if the value cannot be persisted.
    fn put_string(&self, user: UserId, key: &str, value: &str) -> Result<()>;

    fn get_int(&self, user: UserId, key: &str, default: i64) -> i64 {
        self.get_string(user, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// # Errors
    /// Returns an error if the value cannot be persisted.
    fn put_int(&self, user: UserId, key: &str, value: i64) -> Result<()> {
        self.put_string(user, key, &value.to_string())
    }
}

/// Per-user tables of string settings, keyed by user id.
type Snapshot = BTreeMap<String, BTreeMap<String, String>>;

/// TOML-file settings store.
///
/// Reads go through a lock-free snapshot; writes are serialized, persist
/// the whole file, then publish a new snapshot.
pub struct FileStore {
    path: PathBuf,
    snapshot: ArcSwap<Snapshot>,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open a store at `path`. A missing file starts empty and is created
    /// on the first write.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn open(path: &Path) -> Result<Self> {
        let snapshot = if path.exists() {
            load_snapshot(path)?
        } else {
            debug!("settings file {} absent, starting empty", path.display());
            Snapshot::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            snapshot: ArcSwap::from_pointee(snapshot),
            write_lock: Mutex::new(()),
        })
    }

    /// Re-read the file, replacing the snapshot. Used when an external
    /// process (a settings UI) edits the file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed; the old
    /// snapshot stays in place.
    pub fn reload(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let snapshot = load_snapshot(&self.path)?;
        self.snapshot.store(Arc::new(snapshot));
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, rendered)?;
        Ok(())
    }
}

fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

impl SettingsStore for FileStore {
    fn get_string(&self, user: UserId, key: &str) -> Option<String> {
        self.snapshot
            .load()
            .get(&user.0.to_string())
            .and_then(|table| table.get(key))
            .cloned()
    }

    fn put_string(&self, user: UserId, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut snapshot = Snapshot::clone(&self.snapshot.load());
        snapshot
            .entry(user.0.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&snapshot) {
            warn!("failed to persist settings: {e}");
            return Err(e);
        }
        self.snapshot.store(Arc::new(snapshot));
        Ok(())
    }
}
