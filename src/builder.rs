use std::time::Duration;

use log::error;

use crate::config::ImporterConfig;
use crate::error::{ImportError, Provider};
use crate::fetchers::{FirecrawlFetcher, PageFetcher};
use crate::pipelines::url::RecipeImporter;
use crate::providers::{LlmProvider, OpenAIProvider};

/// Builder for configuring a [`RecipeImporter`]
///
/// Values set on the builder override those of the base configuration
/// (see [`RecipeImporterBuilder::config`]), which defaults to
/// [`ImporterConfig::default`].
#[derive(Default)]
pub struct RecipeImporterBuilder {
    config: Option<ImporterConfig>,
    scraper_api_key: Option<String>,
    llm_api_key: Option<String>,
    scraper_base_url: Option<String>,
    llm_base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
    max_content_chars: Option<usize>,
    fetcher: Option<Box<dyn PageFetcher>>,
    provider: Option<Box<dyn LlmProvider>>,
}

impl RecipeImporterBuilder {
    /// Start from a loaded configuration
    ///
    /// # Example
    /// ```no_run
    /// use recipe_import::{load_config, RecipeImporter};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let importer = RecipeImporter::builder()
    ///     .config(load_config()?)
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn config(mut self, config: ImporterConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the API key for the scraping provider
    pub fn scraper_api_key(mut self, key: impl Into<String>) -> Self {
        self.scraper_api_key = Some(key.into());
        self
    }

    /// Set the API key for the language model gateway
    pub fn llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.llm_api_key = Some(key.into());
        self
    }

    /// Point the scraping provider at a different host
    pub fn scraper_base_url(mut self, url: impl Into<String>) -> Self {
        self.scraper_base_url = Some(url.into());
        self
    }

    /// Point the language model gateway at a different host
    pub fn llm_base_url(mut self, url: impl Into<String>) -> Self {
        self.llm_base_url = Some(url.into());
        self
    }

    /// Set the model name sent to the gateway
    ///
    /// # Example
    /// ```
    /// use recipe_import::RecipeImporter;
    ///
    /// let builder = RecipeImporter::builder()
    ///     .model("openai/gpt-4o-mini");
    /// ```
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set one deadline for both outbound calls
    ///
    /// The duration is kept exactly, so sub-second deadlines are honored.
    ///
    /// # Example
    /// ```
    /// use recipe_import::RecipeImporter;
    /// use std::time::Duration;
    ///
    /// let builder = RecipeImporter::builder()
    ///     .timeout(Duration::from_secs(20));
    /// ```
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Set how many characters of page markdown reach the model
    pub fn max_content_chars(mut self, max_chars: usize) -> Self {
        self.max_content_chars = Some(max_chars);
        self
    }

    /// Use a custom page fetcher instead of the Firecrawl client
    pub fn fetcher(mut self, fetcher: Box<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Use a custom language model instead of the OpenAI-compatible client
    pub fn provider(mut self, provider: Box<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Build the importer
    ///
    /// # Errors
    /// Returns [`ImportError::ProviderNotConfigured`] if a collaborator has
    /// neither a custom implementation nor an API key, checking the scraping
    /// provider first.
    /// Returns [`ImportError::InvalidInput`] if either deadline is zero.
    pub fn build(self) -> Result<RecipeImporter, ImportError> {
        let mut config = self.config.unwrap_or_default();

        if let Some(key) = self.scraper_api_key {
            config.scraper.api_key = Some(key);
        }
        if let Some(key) = self.llm_api_key {
            config.llm.api_key = Some(key);
        }
        config.scraper.api_key = non_blank(config.scraper.api_key.take());
        config.llm.api_key = non_blank(config.llm.api_key.take());
        if let Some(url) = self.scraper_base_url {
            config.scraper.base_url = url;
        }
        if let Some(url) = self.llm_base_url {
            config.llm.base_url = url;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(timeout) = self.timeout {
            config.scraper.timeout_override = Some(timeout);
            config.llm.timeout_override = Some(timeout);
        }
        if config.scraper.timeout().is_zero() || config.llm.timeout().is_zero() {
            return Err(ImportError::InvalidInput(
                "Timeout must be greater than zero".to_string(),
            ));
        }
        if let Some(max_chars) = self.max_content_chars {
            config.llm.max_content_chars = max_chars;
        }

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let key = config
                    .scraper
                    .api_key
                    .clone()
                    .ok_or_else(|| not_configured(Provider::Scraper))?;
                let fetcher = FirecrawlFetcher::new(key, &config.scraper)
                    .map_err(|e| ImportError::Unexpected(e.to_string()))?;
                Box::new(fetcher) as Box<dyn PageFetcher>
            }
        };

        let provider = match self.provider {
            Some(provider) => provider,
            None => {
                let key = config
                    .llm
                    .api_key
                    .clone()
                    .ok_or_else(|| not_configured(Provider::LanguageModel))?;
                let provider = OpenAIProvider::new(key, &config.llm)
                    .map_err(|e| ImportError::Unexpected(e.to_string()))?;
                Box::new(provider) as Box<dyn LlmProvider>
            }
        };

        Ok(RecipeImporter {
            fetcher,
            provider,
            scrape_timeout: config.scraper.timeout(),
            extract_timeout: config.llm.timeout(),
            max_content_chars: config.llm.max_content_chars,
        })
    }
}

fn non_blank(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

fn not_configured(provider: Provider) -> ImportError {
    error!("{} API key not configured", provider);
    ImportError::ProviderNotConfigured(provider)
}
