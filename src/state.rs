//! Application state: configuration, level ladder and the text-service gateway.
//!
//! Built once at start-up and shared read-only through `Arc`. Nothing here is
//! mutated per request, so concurrent sessions need no coordination.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::levels::LevelCatalog;
use crate::openai::{GatewayError, OpenAI, TextGateway};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub catalog: LevelCatalog,
    pub gateway: Arc<dyn TextGateway>,
}

impl AppState {
    /// Load config from env/TOML and build the OpenAI gateway.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, GatewayError> {
        let config = AppConfig::load();
        let gateway = OpenAI::new(&config.gateway)?;
        info!(
            target: "vibecode_tutor",
            base_url = %gateway.base_url,
            strong_model = %config.gateway.strong_model,
            fast_model = %config.gateway.fast_model,
            timeout_secs = config.gateway.timeout_secs,
            "Text service gateway configured."
        );
        Ok(Self::new(config, Arc::new(gateway)))
    }

    pub fn new(config: AppConfig, gateway: Arc<dyn TextGateway>) -> Self {
        let catalog = config.catalog();
        for p in catalog.profiles() {
            info!(target: "vibecode_tutor", level = p.level, name = %p.name, min_xp = p.min_xp, ai = p.requires_ai_integration, "Level ladder");
        }
        Self { config, catalog, gateway }
    }
}
