use crate::config::LlmConfig;
use crate::image::ImageInput;
use crate::providers::{LlmProvider, ProviderError};
use async_trait::async_trait;
use log::debug;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

/// Client for OpenAI-compatible `/v1/chat/completions` gateways
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl OpenAIProvider {
    /// Create a new provider from configuration and a resolved API key
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(OpenAIProvider {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        OpenAIProvider {
            client: Client::new(),
            api_key,
            base_url,
            model,
            temperature: 0.1,
            max_tokens: None,
        }
    }

    /// `user` is either a plain string or a list of content parts
    fn request_body(&self, system: &str, user: Value) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": self.temperature
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse().ok());
                return Err(ProviderError::RateLimited { retry_after_secs });
            }
            StatusCode::PAYMENT_REQUIRED => return Err(ProviderError::PaymentRequired),
            _ if !status.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(ProviderError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        let response_body: Value = response.json().await?;
        debug!("{:?}", response_body);

        // A reply without content is left for the caller's parser to reject
        let content = response_body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(content)
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        self.send(&self.request_body(system, json!(user))).await
    }

    async fn complete_with_image(
        &self,
        system: &str,
        user: &str,
        image: &ImageInput,
    ) -> Result<String, ProviderError> {
        let content = json!([
            {"type": "text", "text": user},
            {"type": "image_url", "image_url": {"url": image.data_url()}}
        ]);
        self.send(&self.request_body(system, content)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    fn provider(server: &ServerGuard) -> OpenAIProvider {
        OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "google/gemini-3-flash-preview".to_string(),
        )
    }

    #[tokio::test]
    async fn test_complete() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer fake_api_key")
            .match_body(Matcher::PartialJson(json!({
                "model": "google/gemini-3-flash-preview",
                "messages": [
                    {"role": "system", "content": "system prompt"},
                    {"role": "user", "content": "page text"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "choices": [{
                        "message": {
                            "content": "{\"title\": \"Bolo de Chocolate\"}"
                        }
                    }]
                }"#,
            )
            .create_async()
            .await;

        let result = provider(&server)
            .complete("system prompt", "page text")
            .await
            .unwrap();
        assert_eq!(result, r#"{"title": "Bolo de Chocolate"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_with_image_sends_content_parts() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "messages": [
                    {"role": "system", "content": "system prompt"},
                    {"role": "user", "content": [
                        {"type": "text", "text": "read this"},
                        {"type": "image_url", "image_url": {"url": "data:image/png;base64,iVBORw0KGgo="}}
                    ]}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"content": "{}"}}]}"#)
            .create_async()
            .await;

        let image = ImageInput {
            media_type: "image/png".to_string(),
            data: "iVBORw0KGgo=".to_string(),
        };
        let result = provider(&server)
            .complete_with_image("system prompt", "read this", &image)
            .await
            .unwrap();
        assert_eq!(result, "{}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_rate_limited_reads_retry_after() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_header("retry-after", "17")
            .with_body(r#"{"error": "slow down"}"#)
            .create_async()
            .await;

        let err = provider(&server).complete("s", "u").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RateLimited {
                retry_after_secs: Some(17)
            }
        ));
    }

    #[tokio::test]
    async fn test_complete_payment_required() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(402)
            .with_body(r#"{"error": "no credits"}"#)
            .create_async()
            .await;

        let err = provider(&server).complete("s", "u").await.unwrap_err();
        assert!(matches!(err, ProviderError::PaymentRequired));
    }

    #[tokio::test]
    async fn test_complete_api_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Invalid request"}"#)
            .create_async()
            .await;

        let err = provider(&server).complete("s", "u").await.unwrap_err();
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("Invalid request"));
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_without_choices_returns_empty_text() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let result = provider(&server).complete("s", "u").await.unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_request_body_includes_max_tokens_only_when_set() {
        let mut provider = OpenAIProvider::with_base_url(
            "k".to_string(),
            "http://localhost".to_string(),
            "m".to_string(),
        );
        let body = provider.request_body("s", json!("u"));
        assert!(body.get("max_tokens").is_none());
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);

        provider.max_tokens = Some(1024);
        assert_eq!(provider.request_body("s", json!("u"))["max_tokens"], 1024);
    }

    #[test]
    fn test_provider_name() {
        let provider = OpenAIProvider::with_base_url(
            "k".to_string(),
            "http://localhost".to_string(),
            "m".to_string(),
        );
        assert_eq!(provider.provider_name(), "openai");
    }
}
