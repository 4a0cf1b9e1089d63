use crate::config::ScraperConfig;
use crate::fetchers::{FetchError, PageFetcher};
use crate::model::{PageMetadata, ScrapedPage};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 1],
    only_main_content: bool,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
    metadata: Option<PageMetadata>,
}

/// Fetches page markdown through a Firecrawl-compatible `/v1/scrape` endpoint
pub struct FirecrawlFetcher {
    client: Client,
    api_key: String,
    base_url: String,
    only_main_content: bool,
}

impl FirecrawlFetcher {
    /// Create a fetcher from configuration and a resolved API key
    pub fn new(api_key: String, config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            only_main_content: config.only_main_content,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            only_main_content: true,
        }
    }
}

#[async_trait]
impl PageFetcher for FirecrawlFetcher {
    fn name(&self) -> &str {
        "firecrawl"
    }

    async fn fetch(&self, url: &str) -> Result<ScrapedPage, FetchError> {
        let response = self
            .client
            .post(format!("{}/v1/scrape", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ScrapeRequest {
                url,
                formats: ["markdown"],
                only_main_content: self.only_main_content,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ScrapeResponse = response.json().await?;
        if !body.success {
            return Err(FetchError::Unsuccessful(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let data = body.data.unwrap_or(ScrapeData {
            markdown: None,
            metadata: None,
        });
        let page = ScrapedPage {
            markdown: data.markdown.unwrap_or_default(),
            metadata: data.metadata.unwrap_or_default(),
        };
        debug!(
            "Scraped {} characters from {} (title: {:?})",
            page.markdown.chars().count(),
            url,
            page.metadata.title
        );

        Ok(page)
    }
}
