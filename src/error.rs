use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Outbound call that a timeout or failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Page retrieval through the scraping provider
    Scrape,
    /// Structured extraction through the language model
    Extract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Scrape => f.write_str("scrape"),
            Stage::Extract => f.write_str("extract"),
        }
    }
}

/// Collaborator whose credentials are missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Scraper,
    LanguageModel,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Scraper => f.write_str("scraping provider"),
            Provider::LanguageModel => f.write_str("language model gateway"),
        }
    }
}

/// Machine-readable classification of an [`ImportError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    ProviderNotConfigured,
    FetchFailed,
    EmptyContent,
    RateLimited,
    BillingRequired,
    ExtractionFailed,
    UnparsableResponse,
    NoRecipeFound,
    Timeout,
    Unexpected,
}

/// Errors that can occur while importing a recipe from a URL
#[derive(Error, Debug)]
pub enum ImportError {
    /// The request carried no usable URL
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required API key is absent from configuration
    #[error("The {0} is not configured")]
    ProviderNotConfigured(Provider),

    /// The scraping provider could not retrieve the page
    #[error("Failed to fetch page: {0}")]
    FetchFailed(String),

    /// The page was retrieved but carried no text
    #[error("The page returned no extractable content")]
    EmptyContent,

    /// The language model gateway answered 429
    #[error("Rate limited by the language model gateway")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The language model gateway answered 402
    #[error("The language model gateway requires more credits")]
    BillingRequired,

    /// Any other failure of the language model call
    #[error("Recipe extraction failed: {0}")]
    ExtractionFailed(String),

    /// The model reply could not be read as a recipe object
    #[error("Unparsable model reply: {0}")]
    UnparsableResponse(String),

    /// The model reported that the page holds no recipe
    #[error("No recipe found: {0}")]
    NoRecipeFound(String),

    /// An outbound call exceeded its deadline
    #[error("The {stage} step timed out after {millis}ms")]
    Timeout { stage: Stage, millis: u64 },

    /// Anything else
    #[error("{0}")]
    Unexpected(String),
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::InvalidInput(_) => ErrorKind::InvalidInput,
            ImportError::ProviderNotConfigured(_) => ErrorKind::ProviderNotConfigured,
            ImportError::FetchFailed(_) => ErrorKind::FetchFailed,
            ImportError::EmptyContent => ErrorKind::EmptyContent,
            ImportError::RateLimited { .. } => ErrorKind::RateLimited,
            ImportError::BillingRequired => ErrorKind::BillingRequired,
            ImportError::ExtractionFailed(_) => ErrorKind::ExtractionFailed,
            ImportError::UnparsableResponse(_) => ErrorKind::UnparsableResponse,
            ImportError::NoRecipeFound(_) => ErrorKind::NoRecipeFound,
            ImportError::Timeout { .. } => ErrorKind::Timeout,
            ImportError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Message suitable for showing to the person who submitted the URL.
    ///
    /// Upstream bodies and configuration details stay in the logs; only the
    /// model's own "no recipe" message and unexpected error text pass through.
    pub fn user_message(&self) -> String {
        match self {
            ImportError::InvalidInput(message) => message.clone(),
            ImportError::ProviderNotConfigured(_) => {
                "Recipe import is not configured".to_string()
            }
            ImportError::FetchFailed(_) => {
                "Could not access the page. Check that the URL is correct.".to_string()
            }
            ImportError::EmptyContent => "Could not extract content from the page".to_string(),
            ImportError::RateLimited { .. } => {
                "Too many requests. Try again in a few minutes.".to_string()
            }
            ImportError::BillingRequired => {
                "Insufficient credits. Please add credits to your account.".to_string()
            }
            ImportError::ExtractionFailed(_) => {
                "Error processing the recipe with AI".to_string()
            }
            ImportError::UnparsableResponse(_) => {
                "Could not extract the recipe from this page".to_string()
            }
            ImportError::NoRecipeFound(message) => message.clone(),
            ImportError::Timeout { .. } => {
                "The page took too long to process. Try again later.".to_string()
            }
            ImportError::Unexpected(message) => message.clone(),
        }
    }

    /// HTTP status reported to clients for this error class
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidInput
            | ErrorKind::FetchFailed
            | ErrorKind::EmptyContent
            | ErrorKind::UnparsableResponse
            | ErrorKind::NoRecipeFound => 400,
            ErrorKind::BillingRequired => 402,
            ErrorKind::RateLimited => 429,
            ErrorKind::Timeout => 504,
            ErrorKind::ProviderNotConfigured
            | ErrorKind::ExtractionFailed
            | ErrorKind::Unexpected => 500,
        }
    }
}

impl From<config::ConfigError> for ImportError {
    fn from(err: config::ConfigError) -> Self {
        ImportError::Unexpected(format!("Configuration error: {err}"))
    }
}
