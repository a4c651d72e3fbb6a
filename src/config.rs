//! Service configuration: defaults, optional TOML file (TUTOR_CONFIG_PATH), env overrides.
//!
//! The resulting `AppConfig` is built once at start-up and only read afterwards.
//!
//! TOML schema (every section optional):
//!
//! ```toml
//! [gateway]
//! base_url = "https://api.openai.com/v1"
//! strong_model = "gpt-4o-mini"
//! fast_model = "gpt-4o-mini"
//! timeout_secs = 90
//!
//! [prompts]
//! language = "Dutch"
//!
//! [[levels]]
//! level = 1
//! name = "HTML Basics"
//! focus = "Simple HTML structure"
//! ai_integration = false
//! min_xp = 0
//! ```

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::LevelProfile;
use crate::levels::LevelCatalog;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub gateway: GatewaySettings,
  #[serde(default)]
  pub prompts: PromptSettings,
  #[serde(default)]
  pub levels: Vec<LevelProfile>,
}

/// Outbound text-completion settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
  pub base_url: String,
  /// Assignment and code generation.
  pub strong_model: String,
  /// Evaluation and the credential probe.
  pub fast_model: String,
  pub timeout_secs: u64,
  pub temperature: f32,
  pub assignment_max_tokens: u32,
  pub code_max_tokens: u32,
  pub evaluation_max_tokens: u32,
  pub probe_max_tokens: u32,
  /// Credentials without this prefix are rejected before any call.
  pub credential_prefix: String,
}

impl Default for GatewaySettings {
  fn default() -> Self {
    Self {
      base_url: "https://api.openai.com/v1".into(),
      strong_model: "gpt-4o-mini".into(),
      fast_model: "gpt-4o-mini".into(),
      timeout_secs: 90,
      temperature: 0.8,
      assignment_max_tokens: 4000,
      code_max_tokens: 4000,
      evaluation_max_tokens: 1000,
      probe_max_tokens: 5,
      credential_prefix: "sk-".into(),
    }
  }
}

/// Knobs for prompt construction.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
  /// Language for all learner-facing text the model writes.
  pub language: String,
  /// Endpoint the generated pages call from the browser on AI tiers.
  pub browser_endpoint: String,
  pub browser_model: String,
  /// Generated code beyond this many characters is cut from the evaluation prompt.
  pub eval_code_limit: usize,
}

impl Default for PromptSettings {
  fn default() -> Self {
    Self {
      language: "English".into(),
      browser_endpoint: "https://api.openai.com/v1/chat/completions".into(),
      browser_model: "gpt-4o-mini".into(),
      eval_code_limit: 4000,
    }
  }
}

impl AppConfig {
  /// Defaults, then TUTOR_CONFIG_PATH (if set and valid), then env overrides.
  pub fn load() -> Self {
    let mut cfg = load_config_file_from_env().unwrap_or_default();
    cfg.apply_env_overrides(|key| std::env::var(key).ok());
    cfg
  }

  fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("OPENAI_BASE_URL") { self.gateway.base_url = v; }
    if let Some(v) = lookup("OPENAI_STRONG_MODEL") { self.gateway.strong_model = v; }
    if let Some(v) = lookup("OPENAI_FAST_MODEL") { self.gateway.fast_model = v; }
    if let Some(v) = lookup("OPENAI_TIMEOUT_SECS") {
      match v.parse::<u64>() {
        Ok(secs) if secs > 0 => self.gateway.timeout_secs = secs,
        _ => error!(target: "vibecode_tutor", value = %v, "Ignoring invalid OPENAI_TIMEOUT_SECS"),
      }
    }
  }

  /// Configured ladder, or the built-in one when none is configured or it is invalid.
  pub fn catalog(&self) -> LevelCatalog {
    if self.levels.is_empty() {
      return LevelCatalog::default();
    }
    match LevelCatalog::new(self.levels.clone()) {
      Ok(c) => {
        info!(target: "vibecode_tutor", levels = c.len(), "Using configured level ladder");
        c
      }
      Err(e) => {
        error!(target: "vibecode_tutor", error = %e, "Invalid level ladder in config; using built-in ladder");
        LevelCatalog::default()
      }
    }
  }
}

/// Attempt to load `AppConfig` from TUTOR_CONFIG_PATH. On any parsing/IO error, returns None.
fn load_config_file_from_env() -> Option<AppConfig> {
  let path = std::env::var("TUTOR_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "vibecode_tutor", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "vibecode_tutor", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "vibecode_tutor", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
