//! Host-wide state cache.
//!
//! Namespaced key-value store using `serde_json::Value` for values. The
//! provider writes under the `sysctl` namespace, keyed by parameter name.
//! Dirty tracking lets the caller skip a save when nothing changed.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde_json::Value;

use crate::errors::{ProviderError, Result};

/// Namespace the provider caches resolved values under.
pub const SYSCTL_NAMESPACE: &str = "sysctl";

/// In-memory host state, keyed by namespace then key.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    data: BTreeMap<String, BTreeMap<String, Value>>,
    dirty: HashSet<(String, String)>,
}

impl HostState {
    /// Create an empty store.
    pub fn new() -> Self {
        HostState::default()
    }

    /// Load from a JSON file. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HostState::new()),
            Err(e) => return Err(ProviderError::io(path, e)),
        };
        let data: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_str(&content)
            .map_err(|e| ProviderError::State(format!("cannot parse {}: {}", path.display(), e)))?;
        Ok(HostState {
            data,
            dirty: HashSet::new(),
        })
    }

    /// Write the whole store as pretty JSON and clear the dirty set.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.data)
            .map_err(|e| ProviderError::Serialization(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ProviderError::io(parent, e))?;
        }
        std::fs::write(path, json + "\n").map_err(|e| ProviderError::io(path, e))?;
        self.dirty.clear();
        Ok(())
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<&Value> {
        self.data.get(namespace).and_then(|ns| ns.get(key))
    }

    /// Set a value, marking it dirty only when it actually changes.
    pub fn set(&mut self, namespace: &str, key: &str, value: Value) {
        let ns = self.data.entry(namespace.to_string()).or_default();
        if ns.get(key) != Some(&value) {
            ns.insert(key.to_string(), value);
            self.dirty.insert((namespace.to_string(), key.to_string()));
        }
    }

    /// All entries of one namespace, ordered by key.
    pub fn namespace(&self, namespace: &str) -> Vec<(&str, &Value)> {
        self.data
            .get(namespace)
            .map(|ns| ns.iter().map(|(k, v)| (k.as_str(), v)).collect())
            .unwrap_or_default()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("sysctl-provider-state-{}-{}", std::process::id(), name))
    }

    #[test]
    fn set_and_get() {
        let mut state = HostState::new();
        assert!(state.get(SYSCTL_NAMESPACE, "vm.swappiness").is_none());
        state.set(SYSCTL_NAMESPACE, "vm.swappiness", json!("10"));
        assert_eq!(state.get(SYSCTL_NAMESPACE, "vm.swappiness"), Some(&json!("10")));
        assert!(state.get("other", "vm.swappiness").is_none());
    }

    #[test]
    fn dirty_only_on_change() {
        let mut state = HostState::new();
        assert!(!state.is_dirty());
        state.set(SYSCTL_NAMESPACE, "a", json!("1"));
        assert!(state.is_dirty());

        let path = scratch("dirty");
        state.save(&path).unwrap();
        assert!(!state.is_dirty());
        state.set(SYSCTL_NAMESPACE, "a", json!("1"));
        assert!(!state.is_dirty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn namespace_lists_sorted_entries() {
        let mut state = HostState::new();
        state.set(SYSCTL_NAMESPACE, "net.z", json!("1"));
        state.set(SYSCTL_NAMESPACE, "net.a", json!("2"));
        let keys: Vec<&str> = state.namespace(SYSCTL_NAMESPACE).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["net.a", "net.z"]);
        assert!(state.namespace("empty").is_empty());
    }

    #[test]
    fn save_load_preserves_entries() {
        let dir = scratch("roundtrip");
        let path = dir.join("state.json");
        let mut state = HostState::new();
        state.set(SYSCTL_NAMESPACE, "kernel.sysrq", json!("0"));
        state.save(&path).unwrap();

        let loaded = HostState::load(&path).unwrap();
        assert_eq!(loaded.get(SYSCTL_NAMESPACE, "kernel.sysrq"), Some(&json!("0")));
        assert!(!loaded.is_dirty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let state = HostState::load(&scratch("missing.json")).unwrap();
        assert!(state.namespace(SYSCTL_NAMESPACE).is_empty());
    }

    #[test]
    fn load_garbage_is_state_error() {
        let path = scratch("garbage.json");
        std::fs::write(&path, "not json").unwrap();
        let err = HostState::load(&path).unwrap_err();
        assert!(matches!(err, ProviderError::State(_)));
        let _ = std::fs::remove_file(&path);
    }
}
