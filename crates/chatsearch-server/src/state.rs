//! Shared application state.

use std::sync::Arc;

use chatsearch_core::ChatSearchConfig;
use chatsearch_runtime::Orchestrator;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: ChatSearchConfig,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(config: ChatSearchConfig) -> Self {
        // One orchestrator, hence one credential cache, for the whole process.
        let orchestrator = Arc::new(Orchestrator::from_config(&config.backend));
        Self {
            config,
            orchestrator,
        }
    }
}
