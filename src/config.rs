use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Conventional variable holding the scraping provider key
pub const SCRAPER_API_KEY_VAR: &str = "FIRECRAWL_API_KEY";
/// Conventional variable holding the language model gateway key
pub const LLM_API_KEY_VAR: &str = "LOVABLE_API_KEY";

/// Top-level importer configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ImporterConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Scraping provider settings
#[derive(Debug, Deserialize, Clone)]
pub struct ScraperConfig {
    /// API key for the scraping provider
    pub api_key: Option<String>,
    /// Base URL; `/v1/scrape` is appended
    #[serde(default = "default_scraper_base_url")]
    pub base_url: String,
    /// Deadline for the scrape call in seconds
    #[serde(default = "default_scraper_timeout")]
    pub timeout_secs: u64,
    /// Exact deadline set programmatically; takes precedence over `timeout_secs`
    #[serde(skip)]
    pub timeout_override: Option<Duration>,
    /// Ask the provider to drop navigation, footers and ads
    #[serde(default = "default_only_main_content")]
    pub only_main_content: bool,
}

/// Language model gateway settings
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// API key for the OpenAI-compatible gateway
    pub api_key: Option<String>,
    /// Base URL; `/v1/chat/completions` is appended
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Model identifier passed through to the gateway
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature, kept low for extraction
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Optional cap on generated tokens
    pub max_tokens: Option<u32>,
    /// Deadline for the completion call in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Exact deadline set programmatically; takes precedence over `timeout_secs`
    #[serde(skip)]
    pub timeout_override: Option<Duration>,
    /// Page markdown sent to the model is cut to this many characters
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

/// HTTP server settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_scraper_base_url(),
            timeout_secs: default_scraper_timeout(),
            timeout_override: None,
            only_main_content: default_only_main_content(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_llm_timeout(),
            timeout_override: None,
            max_content_chars: default_max_content_chars(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        self.timeout_override
            .unwrap_or_else(|| Duration::from_secs(self.timeout_secs))
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        self.timeout_override
            .unwrap_or_else(|| Duration::from_secs(self.timeout_secs))
    }
}

// Default value functions
fn default_scraper_base_url() -> String {
    "https://api.firecrawl.dev".to_string()
}

fn default_llm_base_url() -> String {
    "https://ai.gateway.lovable.dev".to_string()
}

fn default_model() -> String {
    "google/gemini-3-flash-preview".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_scraper_timeout() -> u64 {
    30
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_only_main_content() -> bool {
    true
}

fn default_max_content_chars() -> usize {
    15_000
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl ImporterConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_IMPORT__ prefix
    /// 2. recipe-import.toml file in current directory
    /// 3. Default values
    ///
    /// API keys missing from both fall back to `FIRECRAWL_API_KEY` and
    /// `LOVABLE_API_KEY`.
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
///
/// Environment variable format: RECIPE_IMPORT__LLM__MODEL
pub fn load_config() -> Result<ImporterConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("recipe-import").required(false))
        .add_source(
            Environment::with_prefix("RECIPE_IMPORT")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut config: ImporterConfig = settings.try_deserialize()?;
    config.scraper.api_key =
        resolve_secret(config.scraper.api_key.take(), env::var(SCRAPER_API_KEY_VAR).ok());
    config.llm.api_key = resolve_secret(config.llm.api_key.take(), env::var(LLM_API_KEY_VAR).ok());
    Ok(config)
}

/// Prefer the configured key, then the conventional variable; blank values count as absent.
fn resolve_secret(configured: Option<String>, from_env: Option<String>) -> Option<String> {
    configured
        .filter(|key| !key.trim().is_empty())
        .or_else(|| from_env.filter(|key| !key.trim().is_empty()))
        .map(|key| key.trim().to_string())
}
