//! Settings: The persisted key-value boundary.
//!
//! Storage itself belongs to the host. The engine reads a handful of keys
//! at startup and writes a few back; a key that is missing or holds a
//! value of the wrong type reads as absent, never as an error.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::geometry::AnyRectD;
use crate::message::MyPositionMode;

/// Last position mode, stored as its code.
pub const LAST_LOCATION_STATE_MODE: &str = "LastLocationStateMode";
/// Last visible area as a rotated rectangle.
pub const SCREEN_CLIP_RECT: &str = "ScreenClipRect";
/// Unix time in seconds when the app last went to background.
pub const LAST_ENTER_BACKGROUND: &str = "LastEnterBackground";
/// Whether antialiasing is on.
pub const ANTIALIASING: &str = "Antialiasing";

/// A persisted value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    /// Flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Free text.
    Text(String),
    /// Rotated rectangle.
    Rect(AnyRectD),
}

/// Key-value store provided by the host.
///
/// Called from the caller thread and, for position mode changes, from the
/// render thread.
pub trait SettingsStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<SettingValue>;

    /// Write a value.
    fn set(&self, key: &str, value: SettingValue);
}

/// Read a flag; anything else reads as absent.
pub fn get_bool(store: &dyn SettingsStore, key: &str) -> Option<bool> {
    match store.get(key)? {
        SettingValue::Bool(value) => Some(value),
        _ => None,
    }
}

/// Read an integer; anything else reads as absent.
pub fn get_int(store: &dyn SettingsStore, key: &str) -> Option<i64> {
    match store.get(key)? {
        SettingValue::Int(value) => Some(value),
        _ => None,
    }
}

/// Read a finite number. Integers are widened.
#[allow(clippy::cast_precision_loss)]
pub fn get_float(store: &dyn SettingsStore, key: &str) -> Option<f64> {
    let value = match store.get(key)? {
        SettingValue::Float(value) => value,
        SettingValue::Int(value) => value as f64,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Read a rotated rectangle; anything else reads as absent.
pub fn get_rect(store: &dyn SettingsStore, key: &str) -> Option<AnyRectD> {
    match store.get(key)? {
        SettingValue::Rect(rect) => Some(rect),
        _ => None,
    }
}

/// The persisted position mode, if present and known.
pub fn last_location_state_mode(store: &dyn SettingsStore) -> Option<MyPositionMode> {
    get_int(store, LAST_LOCATION_STATE_MODE).and_then(MyPositionMode::from_code)
}

/// Persist the position mode.
pub fn set_last_location_state_mode(store: &dyn SettingsStore, mode: MyPositionMode) {
    store.set(LAST_LOCATION_STATE_MODE, SettingValue::Int(mode.code()));
}

/// Whether antialiasing is on; off when unset.
pub fn antialiasing(store: &dyn SettingsStore) -> bool {
    get_bool(store, ANTIALIASING).unwrap_or(false)
}

/// In-process store, for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, SettingValue>>,
}

impl MemorySettings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `values`.
    pub fn with_values<K: Into<String>>(values: impl IntoIterator<Item = (K, SettingValue)>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: SettingValue) {
        self.values.lock().insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PointD;

    #[test]
    fn test_mismatched_types_read_as_absent() {
        let store = MemorySettings::with_values([
            (LAST_LOCATION_STATE_MODE, SettingValue::Text("Follow".into())),
            (ANTIALIASING, SettingValue::Int(1)),
            (SCREEN_CLIP_RECT, SettingValue::Bool(true)),
        ]);
        assert_eq!(last_location_state_mode(&store), None);
        assert!(!antialiasing(&store));
        assert_eq!(get_rect(&store, SCREEN_CLIP_RECT), None);
    }

    #[test]
    fn test_unknown_mode_code_reads_as_absent() {
        let store = MemorySettings::with_values([(LAST_LOCATION_STATE_MODE, SettingValue::Int(99))]);
        assert_eq!(last_location_state_mode(&store), None);
    }

    #[test]
    fn test_mode_persists() {
        let store = MemorySettings::new();
        set_last_location_state_mode(&store, MyPositionMode::FollowAndRotate);
        assert_eq!(last_location_state_mode(&store), Some(MyPositionMode::FollowAndRotate));
    }

    #[test]
    fn test_float_widens_ints_and_rejects_nan() {
        let store = MemorySettings::with_values([
            ("a", SettingValue::Int(3)),
            ("b", SettingValue::Float(f64::NAN)),
        ]);
        assert_eq!(get_float(&store, "a"), Some(3.0));
        assert_eq!(get_float(&store, "b"), None);
    }

    #[test]
    fn test_rect_round_trip() {
        let rect = AnyRectD::new(PointD::new(1.0, 2.0), 3.0, 4.0, 0.5);
        let store = MemorySettings::new();
        store.set(SCREEN_CLIP_RECT, SettingValue::Rect(rect));
        assert_eq!(get_rect(&store, SCREEN_CLIP_RECT), Some(rect));
    }
}
