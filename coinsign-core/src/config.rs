//! Parameter store
//!
//! Fixed registry of named configuration items shared by the menu, remote
//! directives and persistence. Naming convention: a single `_` prefix
//! marks an internal item that remote directives may not change, a double
//! `__` prefix additionally hides the item from configuration dumps to
//! the peer.
//!
//! The store only holds values; applying side effects (brightness, fonts,
//! clock behavior) is the controller's job, driven by the dirty flags set
//! here.

use heapless::{String, Vec};

use crate::fmt::debug;

/// Maximum registered parameters
pub const MAX_PARAMS: usize = 12;

/// Maximum parameter value length in bytes
pub const MAX_VALUE_LEN: usize = 100;

/// A registered configuration item
#[derive(Debug, Clone)]
pub struct Parameter {
    name: &'static str,
    /// Human-readable label shown by provisioning UIs
    label: &'static str,
    value: String<MAX_VALUE_LEN>,
    /// Per-item value length cap (values are truncated to fit)
    max_len: usize,
    dirty: bool,
}

impl Parameter {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Internal items are never applied from remote directives
    pub fn is_internal(&self) -> bool {
        self.name.starts_with('_')
    }

    /// Dumpable items are included in configuration dumps to the peer
    pub fn is_dumpable(&self) -> bool {
        !self.name.starts_with("__")
    }
}

/// Registry of configuration items
pub struct ParameterStore {
    items: Vec<Parameter, MAX_PARAMS>,
}

impl ParameterStore {
    /// Empty store; prefer [`ParameterStore::with_defaults`]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Store preloaded with the firmware's parameter set and defaults
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.register("__device_uuid", "", "", 40);
        store.register("update_url", "Update server", "update.coinsign.net", 50);
        store.register(
            "ticker_url",
            "Ticker server",
            "wss://ticker.coinsign.net:443/",
            100,
        );
        store.register("brightness", "Brightness (1-5)", "3", 5);
        store.register("font", "Font (0-2)", "0", 5);
        store.register("rotate_display", "Rotate Display (0,1)", "0", 5);
        store.register("clock_mode", "Show Clock (0-2)", "1", 5);
        store.register("clock_interval", "Clock display interval (secs)", "30", 5);
        store.register("timezone", "Timezone (-11..+13)", "1", 5);
        store
    }

    /// Register an item; silently ignored when the registry is full
    pub fn register(
        &mut self,
        name: &'static str,
        label: &'static str,
        default: &str,
        max_len: usize,
    ) {
        let value = truncated(default, max_len.min(MAX_VALUE_LEN));
        let _ = self.items.push(Parameter {
            name,
            label,
            value,
            max_len: max_len.min(MAX_VALUE_LEN),
            dirty: false,
        });
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .map(|item| item.value.as_str())
    }

    /// Value parsed as an integer, when the item exists and parses
    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.get(name)?.parse().ok()
    }

    /// Set an existing item, truncating to its length cap
    ///
    /// Returns whether the stored value changed; a change marks the item
    /// dirty for [`ParameterStore::take_dirty`]. Unknown names are a
    /// no-op reporting `false`.
    pub fn set_if_exists(&mut self, name: &str, value: &str) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.name == name) else {
            debug!("ignoring unknown parameter");
            return false;
        };
        let capped = truncated(value, item.max_len);
        if item.value == capped {
            return false;
        }
        item.value = capped;
        item.dirty = true;
        true
    }

    /// Write back an integer (used by clamping side effects)
    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        let mut text = String::<12>::new();
        let _ = core::fmt::write(&mut text, format_args!("{value}"));
        self.set_if_exists(name, &text)
    }

    /// All registered items in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.items.iter()
    }

    /// Pop one dirty item name, clearing its flag
    pub fn take_dirty(&mut self) -> Option<&'static str> {
        let item = self.items.iter_mut().find(|item| item.dirty)?;
        item.dirty = false;
        Some(item.name)
    }

    /// Whether any item changed since the flags were last drained
    pub fn any_dirty(&self) -> bool {
        self.items.iter().any(|item| item.dirty)
    }

    /// Serialize all values for persistence
    #[cfg(feature = "serde")]
    pub fn snapshot<'a>(&self, buf: &'a mut [u8]) -> postcard::Result<&'a mut [u8]> {
        let mut entries: Vec<(&str, &str), MAX_PARAMS> = Vec::new();
        for item in &self.items {
            let _ = entries.push((item.name, item.value.as_str()));
        }
        postcard::to_slice(&entries, buf)
    }

    /// Load values from a snapshot; entries for unknown names are skipped
    ///
    /// Loaded values do not mark items dirty: restoring persisted state is
    /// not a change.
    #[cfg(feature = "serde")]
    pub fn restore(&mut self, data: &[u8]) -> postcard::Result<()> {
        let entries: Vec<(&str, &str), MAX_PARAMS> = postcard::from_bytes(data)?;
        for (name, value) in entries {
            self.set_if_exists(name, value);
        }
        for item in &mut self.items {
            item.dirty = false;
        }
        Ok(())
    }
}

/// Character-capped copy of `value`
fn truncated(value: &str, cap: usize) -> String<MAX_VALUE_LEN> {
    let mut out = String::new();
    for c in value.chars().take(cap) {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_present() {
        let store = ParameterStore::with_defaults();
        assert_eq!(store.get("brightness"), Some("3"));
        assert_eq!(store.get("ticker_url"), Some("wss://ticker.coinsign.net:443/"));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_set_marks_dirty_only_on_change() {
        let mut store = ParameterStore::with_defaults();
        assert!(!store.set_if_exists("brightness", "3")); // unchanged
        assert!(!store.any_dirty());

        assert!(store.set_if_exists("brightness", "5"));
        assert_eq!(store.take_dirty(), Some("brightness"));
        assert_eq!(store.take_dirty(), None);
    }

    #[test]
    fn test_set_unknown_is_noop() {
        let mut store = ParameterStore::with_defaults();
        assert!(!store.set_if_exists("nonsense", "1"));
    }

    #[test]
    fn test_values_truncate_to_item_cap() {
        let mut store = ParameterStore::with_defaults();
        store.set_if_exists("brightness", "123456789");
        assert_eq!(store.get("brightness"), Some("12345"));
    }

    #[test]
    fn test_internal_and_dumpable_classification() {
        let store = ParameterStore::with_defaults();
        let uuid = store.iter().find(|p| p.name() == "__device_uuid").unwrap();
        assert!(uuid.is_internal());
        assert!(!uuid.is_dumpable());

        let url = store.iter().find(|p| p.name() == "ticker_url").unwrap();
        assert!(!url.is_internal());
        assert!(url.is_dumpable());
    }

    #[test]
    fn test_get_int() {
        let mut store = ParameterStore::with_defaults();
        assert_eq!(store.get_int("timezone"), Some(1));
        store.set_if_exists("timezone", "-11");
        assert_eq!(store.get_int("timezone"), Some(-11));
        store.set_if_exists("ticker_url", "abc");
        assert_eq!(store.get_int("ticker_url"), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_snapshot_restore() {
        let mut store = ParameterStore::with_defaults();
        store.set_if_exists("brightness", "5");
        store.set_if_exists("__device_uuid", "abc-123");

        let mut buf = [0u8; 512];
        let data = store.snapshot(&mut buf).unwrap();

        let mut fresh = ParameterStore::with_defaults();
        fresh.restore(data).unwrap();
        assert_eq!(fresh.get("brightness"), Some("5"));
        assert_eq!(fresh.get("__device_uuid"), Some("abc-123"));
        assert!(!fresh.any_dirty());
    }
}
