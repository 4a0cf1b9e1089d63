use crate::builder::RecipeImporterBuilder;
use crate::config::ImporterConfig;
use crate::error::{ImportError, Stage};
use crate::extract::{interpret_reply, parse_reply, ModelReply, RecipeDraft};
use crate::fetchers::{FetchError, PageFetcher};
use crate::model::{ExtractedRecipe, ScrapedPage};
use crate::providers::{build_user_message, LlmProvider, ProviderError, RECIPE_EXTRACTION_PROMPT};
use log::{debug, info, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Imports recipes from URLs
///
/// Each import runs these steps, stopping at the first failure:
/// 1. Normalizes the URL (`https://` is added when no scheme is present)
/// 2. Fetches page markdown through the [`PageFetcher`]
/// 3. Sends the truncated markdown to the [`LlmProvider`] with the extraction prompt
/// 4. Parses and validates the reply
/// 5. Attaches the source URL and the page's open-graph image as fallback
///
/// Nothing is cached or retried; concurrent imports share no state.
pub struct RecipeImporter {
    pub(crate) fetcher: Box<dyn PageFetcher>,
    pub(crate) provider: Box<dyn LlmProvider>,
    pub(crate) scrape_timeout: Duration,
    pub(crate) extract_timeout: Duration,
    pub(crate) max_content_chars: usize,
}

impl RecipeImporter {
    /// Creates a new builder for configuring an importer
    pub fn builder() -> RecipeImporterBuilder {
        RecipeImporterBuilder::default()
    }

    /// Build an importer from loaded configuration.
    ///
    /// Fails with [`ImportError::ProviderNotConfigured`] when either API key is missing.
    pub fn from_config(config: &ImporterConfig) -> Result<Self, ImportError> {
        Self::builder().config(config.clone()).build()
    }

    /// Import the recipe found at `url`.
    pub async fn import_from_url(&self, url: &str) -> Result<ExtractedRecipe, ImportError> {
        let url = normalize_url(url)?;

        info!("Scraping URL: {}", url);
        let page = self.scrape(&url).await?;
        if page.markdown.trim().is_empty() {
            warn!("{} returned no content for {}", self.fetcher.name(), url);
            return Err(ImportError::EmptyContent);
        }

        info!(
            "Page scraped successfully, extracting recipe with {}",
            self.provider.provider_name()
        );
        let reply = self.extract(&page.markdown).await?;
        debug!("Model reply: {}", reply);

        let draft = read_reply(&reply, &url)?;
        let recipe = draft.finish(url, page.metadata.og_image);
        info!("Recipe extracted successfully: {}", recipe.title);
        Ok(recipe)
    }

    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ImportError> {
        let timed_out = || ImportError::Timeout {
            stage: Stage::Scrape,
            millis: as_millis(self.scrape_timeout),
        };

        match timeout(self.scrape_timeout, self.fetcher.fetch(url)).await {
            Ok(Ok(page)) => Ok(page),
            Ok(Err(FetchError::Timeout)) | Err(_) => {
                warn!("{} timed out fetching {}", self.fetcher.name(), url);
                Err(timed_out())
            }
            Ok(Err(e)) => {
                warn!("{} could not fetch {}: {}", self.fetcher.name(), url, e);
                Err(ImportError::FetchFailed(e.to_string()))
            }
        }
    }

    async fn extract(&self, markdown: &str) -> Result<String, ImportError> {
        let user_message = build_user_message(markdown, self.max_content_chars);
        self.complete_within(
            self.provider
                .complete(RECIPE_EXTRACTION_PROMPT, &user_message),
        )
        .await
    }

    /// Await a model call under the extract deadline and classify its failure.
    pub(super) async fn complete_within<F>(&self, call: F) -> Result<String, ImportError>
    where
        F: Future<Output = Result<String, ProviderError>>,
    {
        let err = match timeout(self.extract_timeout, call).await {
            Ok(Ok(reply)) => return Ok(reply),
            Ok(Err(e)) => e,
            Err(_) => ProviderError::Timeout,
        };

        warn!("{} API error: {}", self.provider.provider_name(), err);
        Err(match err {
            ProviderError::RateLimited { retry_after_secs } => {
                ImportError::RateLimited { retry_after_secs }
            }
            ProviderError::PaymentRequired => ImportError::BillingRequired,
            ProviderError::Timeout => ImportError::Timeout {
                stage: Stage::Extract,
                millis: as_millis(self.extract_timeout),
            },
            other => ImportError::ExtractionFailed(other.to_string()),
        })
    }
}

/// Turn a model reply into a recipe draft; `origin` names the source in logs.
pub(super) fn read_reply(reply: &str, origin: &str) -> Result<RecipeDraft, ImportError> {
    match parse_reply(reply).and_then(interpret_reply) {
        Ok(ModelReply::Recipe(draft)) => Ok(draft),
        Ok(ModelReply::NoRecipe(message)) => {
            info!("No recipe found in {}: {}", origin, message);
            Err(ImportError::NoRecipeFound(message))
        }
        Err(e) => {
            warn!("Failed to parse model reply for {}: {}", origin, e);
            Err(ImportError::UnparsableResponse(e.to_string()))
        }
    }
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Trim `url` and make sure it carries an explicit scheme.
///
/// Idempotent: an already normalized URL is returned unchanged.
pub fn normalize_url(url: &str) -> Result<String, ImportError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ImportError::InvalidInput("URL is required".to_string()));
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("https://{trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::PageMetadata;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Calls {
        fetched: Arc<Mutex<Vec<String>>>,
        prompts: Arc<Mutex<Vec<String>>>,
        completions: Arc<AtomicUsize>,
    }

    struct StubFetcher {
        calls: Calls,
        result: fn() -> Result<ScrapedPage, FetchError>,
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        fn name(&self) -> &str {
            "stub"
        }

        async fn fetch(&self, url: &str) -> Result<ScrapedPage, FetchError> {
            self.calls.fetched.lock().unwrap().push(url.to_string());
            (self.result)()
        }
    }

    struct StubProvider {
        calls: Calls,
        result: fn() -> Result<String, ProviderError>,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn provider_name(&self) -> &str {
            "stub"
        }

        async fn complete(&self, _system: &str, user: &str) -> Result<String, ProviderError> {
            self.calls.completions.fetch_add(1, Ordering::SeqCst);
            self.calls.prompts.lock().unwrap().push(user.to_string());
            (self.result)()
        }
    }

    fn stub_importer(
        page: fn() -> Result<ScrapedPage, FetchError>,
        reply: fn() -> Result<String, ProviderError>,
    ) -> (RecipeImporter, Calls) {
        let calls = Calls::default();
        let importer = RecipeImporter::builder()
            .fetcher(Box::new(StubFetcher {
                calls: calls.clone(),
                result: page,
            }))
            .provider(Box::new(StubProvider {
                calls: calls.clone(),
                result: reply,
            }))
            .build()
            .unwrap();
        (importer, calls)
    }

    fn bolo_page() -> Result<ScrapedPage, FetchError> {
        Ok(ScrapedPage {
            markdown: "# Bolo\n\n2 ovos\n1 xícara de chocolate".to_string(),
            metadata: PageMetadata {
                og_image: Some("https://example.com/bolo.jpg".to_string()),
                ..Default::default()
            },
        })
    }

    fn bolo_reply() -> Result<String, ProviderError> {
        Ok(r#"```json
{"title": "Bolo de Chocolate", "ingredients": "2 ovos\n1 xícara de chocolate", "instructions": "Misture\nAsse", "prep_time": 15, "cook_time": 40, "servings": 8, "category": "Sobremesa"}
```"#
            .to_string())
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("example.com/recipe").unwrap(),
            "https://example.com/recipe"
        );
        assert_eq!(
            normalize_url("  http://example.com  ").unwrap(),
            "http://example.com"
        );
        let once = normalize_url("example.com").unwrap();
        assert_eq!(normalize_url(&once).unwrap(), once);
    }

    #[test]
    fn test_normalize_url_rejects_blank() {
        assert_eq!(
            normalize_url("   \t").unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }

    #[tokio::test]
    async fn test_import_success() {
        let (importer, calls) = stub_importer(bolo_page, bolo_reply);
        let recipe = importer.import_from_url("example.com/recipe").await.unwrap();

        assert_eq!(recipe.title, "Bolo de Chocolate");
        assert_eq!(recipe.source_url, "https://example.com/recipe");
        assert_eq!(recipe.image_url.as_deref(), Some("https://example.com/bolo.jpg"));
        assert_eq!(recipe.servings, Some(8));
        assert_eq!(
            *calls.fetched.lock().unwrap(),
            vec!["https://example.com/recipe".to_string()]
        );
    }

    #[tokio::test]
    async fn test_blank_url_makes_no_calls() {
        let (importer, calls) = stub_importer(bolo_page, bolo_reply);
        let err = importer.import_from_url("  ").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(calls.fetched.lock().unwrap().is_empty());
        assert_eq!(calls.completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_model() {
        let (importer, calls) = stub_importer(
            || Err(FetchError::Unsuccessful("blocked".to_string())),
            bolo_reply,
        );
        let err = importer.import_from_url("example.com").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FetchFailed);
        assert_eq!(calls.completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_markdown_skips_model() {
        let (importer, calls) = stub_importer(
            || {
                Ok(ScrapedPage {
                    markdown: "  \n ".to_string(),
                    ..Default::default()
                })
            },
            bolo_reply,
        );
        let err = importer.import_from_url("example.com").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EmptyContent);
        assert_eq!(calls.completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetcher_timeout_is_timeout() {
        let (importer, _) = stub_importer(|| Err(FetchError::Timeout), bolo_reply);
        let err = importer.import_from_url("example.com").await.unwrap_err();

        assert!(matches!(
            err,
            ImportError::Timeout {
                stage: Stage::Scrape,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_provider_errors_are_classified() {
        let (importer, _) = stub_importer(bolo_page, || {
            Err(ProviderError::RateLimited {
                retry_after_secs: Some(5),
            })
        });
        assert!(matches!(
            importer.import_from_url("example.com").await.unwrap_err(),
            ImportError::RateLimited {
                retry_after_secs: Some(5)
            }
        ));

        let (importer, _) = stub_importer(bolo_page, || Err(ProviderError::PaymentRequired));
        assert_eq!(
            importer.import_from_url("example.com").await.unwrap_err().kind(),
            ErrorKind::BillingRequired
        );

        let (importer, _) = stub_importer(bolo_page, || {
            Err(ProviderError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        });
        assert_eq!(
            importer.import_from_url("example.com").await.unwrap_err().kind(),
            ErrorKind::ExtractionFailed
        );

        let (importer, _) = stub_importer(bolo_page, || Err(ProviderError::Timeout));
        assert_eq!(
            importer.import_from_url("example.com").await.unwrap_err().kind(),
            ErrorKind::Timeout
        );
    }

    #[tokio::test]
    async fn test_no_recipe_reply() {
        let (importer, _) = stub_importer(bolo_page, || {
            Ok(r#"{"error": "This page is a news article"}"#.to_string())
        });
        let err = importer.import_from_url("example.com").await.unwrap_err();

        match err {
            ImportError::NoRecipeFound(message) => {
                assert_eq!(message, "This page is a news article")
            }
            other => panic!("Expected NoRecipeFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_prose_reply_is_unparsable() {
        let (importer, _) = stub_importer(bolo_page, || {
            Ok("Sure! The recipe is a chocolate cake.".to_string())
        });
        let err = importer.import_from_url("example.com").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnparsableResponse);
    }

    #[tokio::test]
    async fn test_model_image_wins_over_og_image() {
        let (importer, _) = stub_importer(bolo_page, || {
            Ok(r#"{"title": "Bolo", "ingredients": "", "instructions": "", "image_url": "https://cdn.example.com/own.jpg"}"#.to_string())
        });
        let recipe = importer.import_from_url("example.com").await.unwrap();
        assert_eq!(
            recipe.image_url.as_deref(),
            Some("https://cdn.example.com/own.jpg")
        );
    }

    #[tokio::test]
    async fn test_long_pages_are_truncated() {
        let (importer, calls) = stub_importer(
            || {
                Ok(ScrapedPage {
                    markdown: "z".repeat(20_000),
                    ..Default::default()
                })
            },
            bolo_reply,
        );
        importer.import_from_url("example.com").await.unwrap();

        let prompts = calls.prompts.lock().unwrap();
        let sent = prompts[0].chars().filter(|c| *c == 'z').count();
        assert_eq!(sent, 15_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetcher_hits_deadline() {
        struct SlowFetcher;

        #[async_trait]
        impl PageFetcher for SlowFetcher {
            fn name(&self) -> &str {
                "slow"
            }

            async fn fetch(&self, _url: &str) -> Result<ScrapedPage, FetchError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                bolo_page()
            }
        }

        let importer = RecipeImporter::builder()
            .fetcher(Box::new(SlowFetcher))
            .provider(Box::new(StubProvider {
                calls: Calls::default(),
                result: bolo_reply,
            }))
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let err = importer.import_from_url("example.com").await.unwrap_err();
        assert!(matches!(
            err,
            ImportError::Timeout {
                stage: Stage::Scrape,
                millis: 5_000
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_model_hits_extract_deadline() {
        struct SlowProvider;

        #[async_trait]
        impl LlmProvider for SlowProvider {
            fn provider_name(&self) -> &str {
                "slow"
            }

            async fn complete(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                bolo_reply()
            }
        }

        let importer = RecipeImporter::builder()
            .fetcher(Box::new(StubFetcher {
                calls: Calls::default(),
                result: bolo_page,
            }))
            .provider(Box::new(SlowProvider))
            .timeout(Duration::from_millis(750))
            .build()
            .unwrap();

        let err = importer.import_from_url("example.com").await.unwrap_err();
        assert!(matches!(
            err,
            ImportError::Timeout {
                stage: Stage::Extract,
                millis: 750
            }
        ));
        assert_eq!(err.status_code(), 504);
    }
}
