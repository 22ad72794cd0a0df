//! Shared application state.

use std::sync::Arc;

use ratebridge_fx::FxEngine;

use crate::config::ServerConfig;
use crate::metrics::{Metrics, SharedMetrics};

/// State handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FxEngine>,
    pub metrics: SharedMetrics,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build the engine from the configuration.
    pub fn new(config: ServerConfig) -> Self {
        let engine = FxEngine::new(config.fx_engine_config());
        Self::with_engine(config, engine)
    }

    pub fn with_engine(config: ServerConfig, engine: FxEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            metrics: Arc::new(Metrics::new()),
            config: Arc::new(config),
        }
    }
}
