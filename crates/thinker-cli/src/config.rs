//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thinker_ai::ProviderConfig;
use thinker_chain::{ChainConfig, DirectivePolicy};

/// Configuration for thinker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model for new sessions
    pub model: Option<String>,
    /// Base URL of the OpenAI-compatible endpoint
    pub base_url: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Turns per submission when not given on the command line
    pub default_turns: Option<u32>,
    /// Whether new sessions start with the wit toggle on
    pub max_wit: Option<bool>,
    /// System prompt for new sessions
    pub system_prompt: Option<String>,
    /// Per-turn timeout in seconds
    pub turn_timeout_secs: Option<u64>,
    /// Whole-chain deadline in seconds
    pub chain_deadline_secs: Option<u64>,
    /// Start the next submission from the previous chain's final prompt
    pub resume_from_directive: Option<bool>,
    /// Cap on the length of model-written system prompts
    pub directive_max_chars: Option<usize>,
    /// API keys (alternative to environment variables)
    #[serde(default)]
    pub api_keys: ApiKeys,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub xai: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("thinker")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("THINKER_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a file, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            model: Some(thinker_ai::models::DEFAULT_MODEL.to_string()),
            base_url: Some(ProviderConfig::DEFAULT_BASE_URL.to_string()),
            temperature: Some(ProviderConfig::DEFAULT_TEMPERATURE),
            default_turns: Some(1),
            max_wit: Some(false),
            ..Default::default()
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    /// Get the xAI API key, checking config then env
    pub fn get_api_key(&self) -> Option<String> {
        thinker_ai::providers::get_api_key(
            self.api_keys.xai.as_deref(),
            thinker_ai::providers::openai::API_KEY_ENV_VAR,
        )
        .ok()
    }

    /// Endpoint settings for the completion provider
    pub fn provider_config(&self) -> ProviderConfig {
        let defaults = ProviderConfig::default();
        ProviderConfig {
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            request_timeout_secs: self
                .turn_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
        }
    }

    /// Orchestrator settings
    pub fn chain_config(&self) -> ChainConfig {
        let defaults = ChainConfig::default();
        ChainConfig {
            turn_timeout: self
                .turn_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.turn_timeout),
            chain_deadline: self
                .chain_deadline_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.chain_deadline),
            directive_policy: match self.directive_max_chars {
                Some(max) => DirectivePolicy::Truncate(max),
                None => DirectivePolicy::Trust,
            },
            resume_from_directive: self.resume_from_directive.unwrap_or(false),
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# thinker configuration file
# Place at ~/.config/thinker/config.toml (Linux/Mac) or %APPDATA%\thinker\config.toml (Windows)

# Model for new sessions (grok-3-mini, grok-3, grok-4)
model = "grok-3"

# OpenAI-compatible endpoint; "/chat/completions" is appended
base_url = "https://api.x.ai/v1"

# Sampling temperature sent with every call
temperature = 0.7

# Reasoning turns per message (1-10)
default_turns = 1

# Start new sessions with the wit instruction on
max_wit = false

# System prompt for new sessions (optional)
# system_prompt = "You are an expert coder."

# Seconds to wait for one turn, and for the whole chain
# turn_timeout_secs = 120
# chain_deadline_secs = 600

# Continue the next message from the last chain's refined prompt
# resume_from_directive = false

# Limit how long a model-written system prompt may be (optional)
# directive_max_chars = 2000

# API keys (optional - can also use the XAI_API_KEY environment variable)
[api_keys]
# xai = "xai-..."
"#
}
