//! Two-stage scrape orchestration
//!
//! 1. Page URLs → listing URL discovery, one page at a time
//! 2. Listing URLs → detail extraction → normalization, one listing at a time
//!
//! Processing is strictly sequential so the per-request delay stays a real
//! rate budget. Per-page and per-listing failures are logged and contained;
//! only an unusable page range or site setup ends the run.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::attribute_normalizer::AttributeNormalizer;
use crate::domain::{ListingUrl, NormalizedCarRecord, PageUrlError, PageUrlGenerator};
use crate::infrastructure::{
    AppConfig, BackoffPolicy, BrowserHeaderProvider, DetailAttributeExtractor, HeaderProvider,
    HttpClient, ListingUrlExtractor, PageFetcher, ParsingError, RequestExecutor,
};

/// Unrecoverable run-level failures.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    PageUrls(#[from] PageUrlError),

    #[error("Invalid parser configuration: {0}")]
    Parser(#[from] ParsingError),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeRequest {
    pub region: String,
    pub category: String,
    pub start_page: u32,
    pub end_page: u32,
    pub expected_per_page: usize,
}

impl ScrapeRequest {
    pub fn new(region: impl Into<String>, category: impl Into<String>, start_page: u32, end_page: u32) -> Self {
        Self {
            region: region.into(),
            category: category.into(),
            start_page,
            end_page,
            expected_per_page: crate::infrastructure::config::defaults::EXPECTED_LISTINGS_PER_PAGE,
        }
    }

    pub fn with_expected_per_page(mut self, expected_per_page: usize) -> Self {
        self.expected_per_page = expected_per_page;
        self
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeSummary {
    pub pages_requested: usize,
    pub pages_below_expectation: usize,
    pub listing_urls_discovered: usize,
    pub details_extracted: usize,
    pub details_skipped: usize,
}

pub struct ScrapePipeline {
    page_urls: PageUrlGenerator,
    listing_extractor: ListingUrlExtractor,
    detail_extractor: DetailAttributeExtractor,
    normalizer: AttributeNormalizer,
    listing_max_attempts: u32,
}

impl ScrapePipeline {
    /// Pipeline over the real HTTP client with browser-like headers.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let client = HttpClient::new(&config.http)?;
        Self::with_fetcher(
            config,
            Arc::new(client),
            Arc::new(BrowserHeaderProvider),
            BackoffPolicy::from_config(&config.http, &config.crawling),
        )
    }

    /// Pipeline over any fetcher and header source.
    pub fn with_fetcher(
        config: &AppConfig,
        fetcher: Arc<dyn PageFetcher>,
        header_provider: Arc<dyn HeaderProvider>,
        backoff: BackoffPolicy,
    ) -> Result<Self, PipelineError> {
        let site = &config.site;
        let page_urls = PageUrlGenerator::new(
            &site.base_url,
            &site.listing_path,
            &site.page_param,
            &site.default_region,
        )?;
        let base_url = page_urls.origin().clone();

        let executor = RequestExecutor::new(fetcher, header_provider, backoff, config.http.max_retries);

        Ok(Self {
            page_urls,
            listing_extractor: ListingUrlExtractor::new(executor.clone(), &config.parsing, base_url)?,
            detail_extractor: DetailAttributeExtractor::new(executor, &config.parsing)?,
            normalizer: AttributeNormalizer,
            listing_max_attempts: config.crawling.listing_max_attempts,
        })
    }

    pub async fn run(&self, request: &ScrapeRequest) -> Result<Vec<NormalizedCarRecord>, PipelineError> {
        self.run_with_summary(request).await.map(|(records, _)| records)
    }

    pub async fn run_with_summary(
        &self,
        request: &ScrapeRequest,
    ) -> Result<(Vec<NormalizedCarRecord>, ScrapeSummary), PipelineError> {
        let page_urls = self.page_urls.generate(
            &request.region,
            &request.category,
            request.start_page,
            request.end_page,
        )?;

        info!(
            region = %request.region,
            category = %request.category,
            start = request.start_page,
            end = request.end_page,
            pages = page_urls.len(),
            "Starting scrape"
        );

        let mut summary = ScrapeSummary {
            pages_requested: page_urls.len(),
            ..ScrapeSummary::default()
        };

        let listing_urls = self.discover_listings(&page_urls, request.expected_per_page, &mut summary).await;
        summary.listing_urls_discovered = listing_urls.len();
        info!(listings = listing_urls.len(), "Found listing URLs");

        let records = self.extract_records(&listing_urls, &mut summary).await;

        info!(
            pages = summary.pages_requested,
            pages_below_expectation = summary.pages_below_expectation,
            listings = summary.listing_urls_discovered,
            extracted = summary.details_extracted,
            skipped = summary.details_skipped,
            "Scrape finished"
        );
        Ok((records, summary))
    }

    /// Stage 1. Cross-page duplicates are kept.
    async fn discover_listings(
        &self,
        page_urls: &[String],
        expected_per_page: usize,
        summary: &mut ScrapeSummary,
    ) -> Vec<ListingUrl> {
        let mut listing_urls = Vec::new();

        for (index, page_url) in page_urls.iter().enumerate() {
            let found = self
                .listing_extractor
                .extract(page_url, expected_per_page, self.listing_max_attempts)
                .await;

            if found.len() < expected_per_page {
                summary.pages_below_expectation += 1;
                warn!(
                    page = %page_url,
                    found = found.len(),
                    expected = expected_per_page,
                    "Page yielded fewer listings than expected"
                );
            }
            info!(page = index + 1, of = page_urls.len(), found = found.len(), "Collected page");

            listing_urls.extend(found);
        }

        listing_urls
    }

    /// Stages 2 and 3, in listing order.
    async fn extract_records(
        &self,
        listing_urls: &[ListingUrl],
        summary: &mut ScrapeSummary,
    ) -> Vec<NormalizedCarRecord> {
        let mut records = Vec::with_capacity(listing_urls.len());

        for listing_url in listing_urls {
            match self.detail_extractor.extract(listing_url.as_str()).await {
                Some(attributes) => {
                    records.push(self.normalizer.normalize(&attributes));
                    summary.details_extracted += 1;
                }
                None => summary.details_skipped += 1,
            }
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{PageContent, TransportError};
    use async_trait::async_trait;
    use reqwest::header::HeaderMap;

    struct OfflineFetcher;

    #[async_trait]
    impl PageFetcher for OfflineFetcher {
        async fn fetch(&self, url: &str, _headers: &HeaderMap) -> Result<PageContent, TransportError> {
            Err(TransportError::Request {
                url: url.to_string(),
                message: "offline".to_string(),
            })
        }
    }

    fn pipeline(config: &AppConfig) -> Result<ScrapePipeline, PipelineError> {
        ScrapePipeline::with_fetcher(
            config,
            Arc::new(OfflineFetcher),
            Arc::new(BrowserHeaderProvider),
            BackoffPolicy::immediate(),
        )
    }

    #[tokio::test]
    async fn invalid_page_range_is_unrecoverable() {
        let pipeline = pipeline(&AppConfig::default()).unwrap();
        let err = pipeline.run(&ScrapeRequest::new("", "", 3, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PageUrls(PageUrlError::InvalidPageRange { start: 3, end: 1 })
        ));
    }

    #[test]
    fn invalid_base_url_is_rejected_at_construction() {
        let mut config = AppConfig::default();
        config.site.base_url = "not a url".to_string();
        assert!(matches!(pipeline(&config), Err(PipelineError::PageUrls(_))));
    }

    #[test]
    fn configured_selectors_reach_the_extractors() {
        let mut config = AppConfig::default();
        config.parsing.listing.listing_card = vec!["div[class*=".to_string()];
        assert!(matches!(pipeline(&config), Err(PipelineError::Parser(_))));

        let mut config = AppConfig::default();
        config.parsing.detail.ad_id_pattern = "(unclosed".to_string();
        assert!(matches!(pipeline(&config), Err(PipelineError::Parser(_))));
    }

    #[tokio::test]
    async fn total_fetch_loss_yields_empty_output() {
        let mut config = AppConfig::default();
        config.http.max_retries = 0;
        config.crawling.listing_max_attempts = 1;

        let (records, summary) = pipeline(&config)
            .unwrap()
            .run_with_summary(&ScrapeRequest::new("", "", 1, 2))
            .await
            .unwrap();

        assert!(records.is_empty());
        assert_eq!(
            summary,
            ScrapeSummary {
                pages_requested: 2,
                pages_below_expectation: 2,
                ..ScrapeSummary::default()
            }
        );
    }
}
