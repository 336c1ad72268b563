//! Application state for the HTTP server.

use std::sync::Arc;

use crate::engine::ExternalServices;
use crate::store::StoreGateway;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Store gateway shared by all in-flight requests.
    pub store: Arc<dyn StoreGateway>,
    /// Live external services (name resolution, skymap downloads).
    pub services: Arc<ExternalServices>,
}

impl AppState {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self {
            store,
            services: Arc::new(ExternalServices::default()),
        }
    }

    pub fn with_services(mut self, services: ExternalServices) -> Self {
        self.services = Arc::new(services);
        self
    }
}
