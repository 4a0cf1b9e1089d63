mod open_ai;
mod prompt;

pub use open_ai::OpenAIProvider;
pub use prompt::{
    build_user_message, truncate_chars, IMAGE_EXTRACTION_PROMPT, IMAGE_USER_MESSAGE,
    RECIPE_EXTRACTION_PROMPT,
};

use crate::image::ImageInput;
use async_trait::async_trait;
use thiserror::Error;

/// Failure of a completion call
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("payment required")]
    PaymentRequired,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response body: {0}")]
    InvalidBody(String),

    #[error("{0} does not accept images")]
    ImagesUnsupported(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::InvalidBody(err.to_string())
        } else {
            ProviderError::Request(err.to_string())
        }
    }
}

/// Chat-style language model used for structured extraction
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai")
    fn provider_name(&self) -> &str;

    /// Send one system and one user message, returning the reply text
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError>;

    /// Like [`LlmProvider::complete`], with an image attached to the user message
    async fn complete_with_image(
        &self,
        _system: &str,
        _user: &str,
        _image: &ImageInput,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::ImagesUnsupported(
            self.provider_name().to_string(),
        ))
    }
}
