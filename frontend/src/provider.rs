//! Composition root: wires registry, preview cache and graph core together.

use crate::api::HostApi;
use crate::clock::{Clock, SystemClock};
use crate::navigation::NavigationContext;
use crate::preview_cache::PreviewCache;
use crate::registry::DeviceRegistry;
use crate::state::{EditorChannels, EditorEvent};
use crate::storage::LocalStorage;
use crate::EditorSettings;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{info, warn};

/// Owns one editor session.
///
/// Built in dependency order: the registry first, then the preview cache, then the
/// graph core that uses both.
pub struct NavigationEditorProvider {
    registry: DeviceRegistry,
    preview_cache: PreviewCache,
    navigation: NavigationContext,
    events: Receiver<EditorEvent>,
}

impl NavigationEditorProvider {
    pub fn new(
        api: Arc<dyn HostApi>,
        storage: Arc<dyn LocalStorage>,
        settings: EditorSettings,
    ) -> Self {
        Self::with_clock(api, storage, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        api: Arc<dyn HostApi>,
        storage: Arc<dyn LocalStorage>,
        settings: EditorSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = DeviceRegistry::new(api.clone(), clock.clone());
        let preview_cache = PreviewCache::new(storage, clock.clone(), &settings);
        let EditorChannels { tx, rx } = EditorChannels::new();
        let navigation = NavigationContext::new(
            api,
            registry.clone(),
            preview_cache.clone(),
            clock,
            settings,
            tx,
        );
        info!("Navigation editor ready");

        Self {
            registry,
            preview_cache,
            navigation,
            events: rx,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn preview_cache(&self) -> &PreviewCache {
        &self.preview_cache
    }

    pub fn navigation(&self) -> &NavigationContext {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut NavigationContext {
        &mut self.navigation
    }

    /// Events for the UI layer.
    pub fn events(&self) -> &Receiver<EditorEvent> {
        &self.events
    }

    /// Tear down the session: persist pending previews and forget host state.
    pub fn shutdown(self) {
        if let Err(e) = self.preview_cache.flush() {
            warn!("Failed to persist preview cache on shutdown: {}", e);
        }
        self.registry.reset();
        info!("Navigation editor shut down");
    }
}
