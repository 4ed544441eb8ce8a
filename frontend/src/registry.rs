//! Device/host registry: per-host capability caches and last known device positions.
//!
//! Loaders never return errors; failures are recorded in the matching
//! `*_error` field so they can be driven from places with no caller to report to.

use crate::api::{ApiResult, HostApi};
use crate::clock::Clock;
use navgraph_types::api::{ActionDefinition, VerificationDefinition};
use navgraph_types::{DevicePosition, DevicePositionKey, Host};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Actions or verifications grouped by category.
pub type Catalog<T> = BTreeMap<String, Vec<T>>;

/// One lazily loaded capability list with its loading flags.
#[derive(Debug, Clone)]
pub struct CapabilityCache<T> {
    pub data: Catalog<T>,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
}

impl<T> Default for CapabilityCache<T> {
    fn default() -> Self {
        Self {
            data: BTreeMap::new(),
            loading: false,
            loaded: false,
            error: None,
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    host: Option<Host>,
    device_id: Option<String>,
    is_control_active: bool,
    actions: CapabilityCache<ActionDefinition>,
    verifications: CapabilityCache<VerificationDefinition>,
    positions: HashMap<DevicePositionKey, DevicePosition>,
}

/// Shared handle to the registry. Cloning is cheap; all clones see the same state.
#[derive(Clone)]
pub struct DeviceRegistry {
    api: Arc<dyn HostApi>,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<RegistryState>>,
}

impl DeviceRegistry {
    pub fn new(api: Arc<dyn HostApi>, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            clock,
            state: Arc::new(Mutex::new(RegistryState::default())),
        }
    }

    /// Switch the active host/device.
    ///
    /// A different host identity (name + URL) drops every cached capability and
    /// all device positions; the same host only updates the device and control flag.
    pub fn set_control_state(&self, host: Option<&Host>, device_id: Option<&str>, is_active: bool) {
        let mut state = self.state.lock();

        let same_host = match (&state.host, host) {
            (Some(current), Some(new)) => current.same_identity(new),
            (None, None) => true,
            _ => false,
        };

        if !same_host {
            info!(
                "Host changed to {}, clearing cached capabilities and device positions",
                host.map(|h| h.host_name.as_str()).unwrap_or("<none>")
            );
            state.actions = CapabilityCache::default();
            state.verifications = CapabilityCache::default();
            state.positions.clear();
        }

        state.host = host.cloned();
        state.device_id = device_id.map(str::to_string);
        state.is_control_active = is_active;
    }

    pub fn current_host(&self) -> Option<Host> {
        self.state.lock().host.clone()
    }

    pub fn device_id(&self) -> Option<String> {
        self.state.lock().device_id.clone()
    }

    pub fn is_control_active(&self) -> bool {
        self.state.lock().is_control_active
    }

    /// Active (host name, device id) pair, if both are set.
    pub fn active_device(&self) -> Option<(String, String)> {
        let state = self.state.lock();
        match (&state.host, &state.device_id) {
            (Some(host), Some(device)) => Some((host.host_name.clone(), device.clone())),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Capability loaders
    // ------------------------------------------------------------------

    /// Load the host's available actions unless already loaded.
    pub async fn fetch_available_actions(&self, force: bool) {
        let api = self.api.clone();
        self.load(
            "available actions",
            force,
            |s| &mut s.actions,
            move |host| async move { api.get_available_actions(&host).await },
        )
        .await;
    }

    /// Load the host's verification types unless already loaded.
    pub async fn fetch_verification_types(&self, force: bool) {
        let api = self.api.clone();
        self.load(
            "verification types",
            force,
            |s| &mut s.verifications,
            move |host| async move { api.get_verification_types(&host).await },
        )
        .await;
    }

    /// Load every capability list.
    pub async fn fetch_all(&self, force: bool) {
        tokio::join!(
            self.fetch_available_actions(force),
            self.fetch_verification_types(force)
        );
    }

    async fn load<T, S, F, Fut>(&self, what: &str, force: bool, select: S, fetch: F)
    where
        S: Fn(&mut RegistryState) -> &mut CapabilityCache<T>,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ApiResult<Catalog<T>>>,
    {
        let host = {
            let mut state = self.state.lock();
            let Some(host) = state.host.clone() else {
                debug!("No host selected, skipping {} load", what);
                return;
            };
            let cache = select(&mut *state);
            if cache.loading || (cache.loaded && !force) {
                debug!("Skipping {} load for {}: already loaded", what, host.host_name);
                return;
            }
            cache.loading = true;
            cache.error = None;
            host
        };

        let result = fetch(host.host_name.clone()).await;

        let mut state = self.state.lock();
        let still_current = state
            .host
            .as_ref()
            .is_some_and(|current| current.same_identity(&host));
        if !still_current {
            debug!("Host changed while loading {}, discarding result", what);
            return;
        }

        let cache = select(&mut *state);
        cache.loading = false;
        match result {
            Ok(data) => {
                info!("Loaded {} for {}", what, host.host_name);
                cache.data = data;
                cache.loaded = true;
            }
            Err(e) => {
                warn!("Failed to load {} for {}: {}", what, host.host_name, e);
                cache.error = Some(e.to_string());
            }
        }
    }

    pub fn available_actions(&self) -> CapabilityCache<ActionDefinition> {
        self.state.lock().actions.clone()
    }

    pub fn verification_types(&self) -> CapabilityCache<VerificationDefinition> {
        self.state.lock().verifications.clone()
    }

    // ------------------------------------------------------------------
    // Device positions
    // ------------------------------------------------------------------

    /// Last known position of a device in a tree.
    pub fn get_device_position(
        &self,
        host_name: &str,
        device_id: &str,
        tree_id: &str,
    ) -> Option<DevicePosition> {
        let key = DevicePositionKey::new(host_name, device_id, tree_id);
        self.state.lock().positions.get(&key).cloned()
    }

    /// Record a device position, overwriting any previous one.
    pub fn set_device_position(
        &self,
        host_name: &str,
        device_id: &str,
        tree_id: &str,
        node_id: &str,
        node_label: &str,
    ) -> DevicePosition {
        let key = DevicePositionKey::new(host_name, device_id, tree_id);
        let position = DevicePosition {
            node_id: node_id.to_string(),
            node_label: node_label.to_string(),
            tree_id: tree_id.to_string(),
            timestamp: self.clock.now_millis(),
        };
        debug!("Device position {} -> {}", key, node_id);
        self.state.lock().positions.insert(key, position.clone());
        position
    }

    /// Seed a device position to the root node unless one is already known.
    /// Returns whichever position is stored afterwards.
    pub fn initialize_device_position(
        &self,
        host_name: &str,
        device_id: &str,
        tree_id: &str,
        root_node_id: &str,
        root_label: &str,
    ) -> DevicePosition {
        let key = DevicePositionKey::new(host_name, device_id, tree_id);
        let now = self.clock.now_millis();
        let mut state = self.state.lock();
        state
            .positions
            .entry(key)
            .or_insert_with(|| DevicePosition {
                node_id: root_node_id.to_string(),
                node_label: root_label.to_string(),
                tree_id: tree_id.to_string(),
                timestamp: now,
            })
            .clone()
    }

    /// Drop everything (logout/unmount).
    pub fn reset(&self) {
        *self.state.lock() = RegistryState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::FakeHost;
    use chrono::Duration;

    fn registry() -> (DeviceRegistry, Arc<FakeHost>, Arc<ManualClock>) {
        let api = Arc::new(FakeHost::new());
        let clock = Arc::new(ManualClock::default());
        (DeviceRegistry::new(api.clone(), clock.clone()), api, clock)
    }

    #[test]
    fn test_initialize_device_position_is_idempotent() {
        let (registry, _, clock) = registry();

        let first = registry.initialize_device_position("host", "dev", "tree", "root", "Root");
        clock.advance(Duration::seconds(10));
        let second = registry.initialize_device_position("host", "dev", "tree", "other", "Other");

        assert_eq!(first, second);
        assert_eq!(second.node_id, "root");
        assert_eq!(
            registry.get_device_position("host", "dev", "tree"),
            Some(first)
        );
    }

    #[test]
    fn test_set_device_position_always_overwrites() {
        let (registry, _, _) = registry();

        registry.initialize_device_position("host", "dev", "tree", "root", "Root");
        registry.set_device_position("host", "dev", "tree", "live", "Live");
        let pos = registry.get_device_position("host", "dev", "tree").unwrap();
        assert_eq!(pos.node_id, "live");
        assert_eq!(pos.node_label, "Live");

        // Positions are tracked per (host, device, tree)
        assert!(registry.get_device_position("host", "dev2", "tree").is_none());
    }

    #[test]
    fn test_host_switch_clears_positions_but_device_switch_does_not() {
        let (registry, _, _) = registry();
        let host_a = Host::new("host-a", "http://a:5109");
        let host_b = Host::new("host-b", "http://b:5109");

        registry.set_control_state(Some(&host_a), Some("dev1"), true);
        registry.set_device_position("host-a", "dev1", "tree", "live", "Live");

        registry.set_control_state(Some(&host_a), Some("dev2"), false);
        assert!(registry.get_device_position("host-a", "dev1", "tree").is_some());
        assert_eq!(registry.device_id().as_deref(), Some("dev2"));
        assert!(!registry.is_control_active());

        registry.set_control_state(Some(&host_b), Some("dev1"), true);
        assert!(registry.get_device_position("host-a", "dev1", "tree").is_none());
    }

    #[tokio::test]
    async fn test_fetch_skips_when_already_loaded() {
        let (registry, api, _) = registry();
        registry.set_control_state(Some(&Host::new("host-a", "http://a")), Some("dev1"), true);

        registry.fetch_available_actions(false).await;
        registry.fetch_available_actions(false).await;
        assert_eq!(api.call_count("get_available_actions"), 1);

        registry.fetch_available_actions(true).await;
        assert_eq!(api.call_count("get_available_actions"), 2);

        let actions = registry.available_actions();
        assert!(actions.loaded);
        assert!(!actions.loading);
        assert!(actions.data.contains_key("remote"));
    }

    #[tokio::test]
    async fn test_fetch_failure_sets_error_and_keeps_data() {
        let (registry, api, _) = registry();
        registry.set_control_state(Some(&Host::new("host-a", "http://a")), None, true);

        registry.fetch_verification_types(false).await;
        assert!(registry.verification_types().loaded);

        api.fail_next("get_verification_types");
        registry.fetch_verification_types(true).await;

        let verifications = registry.verification_types();
        assert!(!verifications.loading);
        assert_eq!(verifications.error.as_deref(), Some("HTTP 500"));
        assert!(!verifications.data.is_empty());
    }

    #[tokio::test]
    async fn test_host_switch_resets_loaded_flags() {
        let (registry, api, _) = registry();
        registry.set_control_state(Some(&Host::new("host-a", "http://a")), None, true);
        registry.fetch_all(false).await;

        registry.set_control_state(Some(&Host::new("host-a", "http://other")), None, true);
        assert!(!registry.available_actions().loaded);

        registry.fetch_all(false).await;
        assert_eq!(api.call_count("get_available_actions"), 2);
        assert_eq!(api.call_count("get_verification_types"), 2);
    }
}
