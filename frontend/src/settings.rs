//! Tunables of the editor core.

use std::time::Duration;

/// Timing and sizing knobs shared by the registry, preview cache and graph core.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSettings {
    /// Maximum number of undo snapshots kept
    pub history_limit: usize,
    /// How long a success banner stays visible
    pub success_banner: Duration,
    /// How long an error banner stays visible
    pub error_banner: Duration,
    /// Age after which a cached path preview is stale
    pub preview_ttl: Duration,
    /// Quiet period before preview cache writes are flushed
    pub flush_debounce: Duration,
    /// Delay between exploration steps
    pub exploration_poll: Duration,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            history_limit: 100,
            success_banner: Duration::from_secs(3),
            error_banner: Duration::from_secs(5),
            preview_ttl: Duration::from_secs(5 * 60),
            flush_debounce: Duration::from_millis(500),
            exploration_poll: Duration::from_millis(500),
        }
    }
}
