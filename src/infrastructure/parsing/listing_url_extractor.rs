//! Listing URL discovery for search-result pages
//!
//! Three independent strategies feed one set per attempt:
//! - structured data (`ld+json` item lists)
//! - listing-card DOM patterns
//! - embedded application state (`__NEXT_DATA__` items)
//!
//! A strategy failure is logged and does not stop the others. The whole
//! fetch+extract cycle is retried until a page yields the expected count,
//! and the largest set seen across attempts is returned otherwise.

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashSet;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use url::Url;

use super::config::{ListingSelectors, ParsingConfig};
use super::json_nav::{items, lookup};
use super::{
    ContextualParser, ParseContext, ParsingError, ParsingResult, compile_selector,
    compile_selectors, script_text,
};
use crate::domain::ListingUrl;
use crate::infrastructure::request_executor::RequestExecutor;

/// One way of finding listing URLs in a parsed search-result page.
pub trait ListingStrategy:
    ContextualParser<Output = Vec<ListingUrl>, Context = ParseContext> + Send + Sync
{
    fn name(&self) -> &'static str;
}

/// Reads `itemListElement[*].item.url` from `ld+json` blocks.
pub struct StructuredDataStrategy {
    script_selector: Selector,
}

impl StructuredDataStrategy {
    pub fn new(selectors: &ListingSelectors) -> ParsingResult<Self> {
        Ok(Self {
            script_selector: compile_selector(&selectors.structured_data_script)?,
        })
    }

    /// Item lists may sit at the payload root or inside a top-level array
    /// of schema.org objects.
    fn item_lists(payload: &Value) -> Vec<&Value> {
        match payload {
            Value::Array(entries) => entries
                .iter()
                .map(|entry| lookup(entry, &["itemListElement"]))
                .filter(|list| list.is_array())
                .collect(),
            other => vec![lookup(other, &["itemListElement"])],
        }
    }
}

impl ContextualParser for StructuredDataStrategy {
    type Output = Vec<ListingUrl>;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        let Some(script) = html.select(&self.script_selector).next() else {
            return Ok(Vec::new());
        };

        let payload: Value = serde_json::from_str(&script_text(script))
            .map_err(|e| ParsingError::invalid_json(&context.url, &e))?;

        let lists = Self::item_lists(&payload);
        if !lists.iter().any(|list| list.is_array()) {
            return Err(ParsingError::missing_structure(&context.url, "itemListElement"));
        }

        Ok(lists
            .into_iter()
            .flat_map(items)
            .filter_map(|entry| lookup(entry, &["item", "url"]).as_str())
            .filter_map(|href| accept(context, href))
            .collect())
    }
}

impl ListingStrategy for StructuredDataStrategy {
    fn name(&self) -> &'static str {
        "structured_data"
    }
}

/// Finds one listing link per listing card.
///
/// Card selectors short-circuit: the first selector with any match is the
/// only one applied.
pub struct DomPatternStrategy {
    card_selectors: Vec<(String, Selector)>,
    anchor_selector: Selector,
    preferred_link: Regex,
    fallback_link: Regex,
}

impl DomPatternStrategy {
    pub fn new(selectors: &ListingSelectors) -> ParsingResult<Self> {
        Ok(Self {
            card_selectors: compile_selectors(&selectors.listing_card)?,
            anchor_selector: compile_selector("a[href]")?,
            preferred_link: compile_pattern(&selectors.preferred_link_pattern)?,
            fallback_link: compile_pattern(&selectors.fallback_link_pattern)?,
        })
    }

    fn card_link<'a>(&self, card: scraper::ElementRef<'a>) -> Option<&'a str> {
        let hrefs: Vec<&str> = card
            .select(&self.anchor_selector)
            .filter_map(|anchor| anchor.value().attr("href"))
            .collect();

        hrefs
            .iter()
            .find(|href| self.preferred_link.is_match(href))
            .or_else(|| hrefs.iter().find(|href| self.fallback_link.is_match(href)))
            .copied()
    }
}

impl ContextualParser for DomPatternStrategy {
    type Output = Vec<ListingUrl>;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        for (selector_str, selector) in &self.card_selectors {
            let cards: Vec<_> = html.select(selector).collect();
            if cards.is_empty() {
                continue;
            }

            debug!(selector = %selector_str, cards = cards.len(), "Listing cards matched");
            return Ok(cards
                .into_iter()
                .filter_map(|card| self.card_link(card))
                .filter_map(|href| accept(context, href))
                .collect());
        }

        Ok(Vec::new())
    }
}

impl ListingStrategy for DomPatternStrategy {
    fn name(&self) -> &'static str {
        "dom_pattern"
    }
}

/// Reads `props.pageProps.items[*].url` from the embedded application state.
pub struct AppStateStrategy {
    script_selector: Selector,
}

impl AppStateStrategy {
    const ITEMS_PATH: [&'static str; 3] = ["props", "pageProps", "items"];

    pub fn new(selectors: &ListingSelectors) -> ParsingResult<Self> {
        Ok(Self {
            script_selector: compile_selector(&selectors.app_state_script)?,
        })
    }
}

impl ContextualParser for AppStateStrategy {
    type Output = Vec<ListingUrl>;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        let Some(script) = html.select(&self.script_selector).next() else {
            return Ok(Vec::new());
        };

        let payload: Value = serde_json::from_str(&script_text(script))
            .map_err(|e| ParsingError::invalid_json(&context.url, &e))?;

        Ok(items(lookup(&payload, &Self::ITEMS_PATH))
            .iter()
            .filter_map(|item| lookup(item, &["url"]).as_str())
            .filter_map(|href| accept(context, href))
            .collect())
    }
}

impl ListingStrategy for AppStateStrategy {
    fn name(&self) -> &'static str {
        "app_state"
    }
}

fn compile_pattern(pattern: &str) -> ParsingResult<Regex> {
    Regex::new(pattern).map_err(|e| ParsingError::invalid_selector(pattern, &e.to_string()))
}

/// Resolve a candidate link, logging and dropping anything that is not a
/// listing URL.
fn accept(context: &ParseContext, href: &str) -> Option<ListingUrl> {
    match context.resolve_listing_url(href) {
        Ok(url) => Some(url),
        Err(e) => {
            debug!(page = %context.url, error = %e, "Ignoring candidate link");
            None
        }
    }
}

/// Fetch+extract cycle for search-result pages.
pub struct ListingUrlExtractor {
    executor: RequestExecutor,
    strategies: Vec<Box<dyn ListingStrategy>>,
    base_url: Url,
}

impl ListingUrlExtractor {
    /// Extractor with the three standard strategies.
    pub fn new(executor: RequestExecutor, config: &ParsingConfig, base_url: Url) -> ParsingResult<Self> {
        let strategies: Vec<Box<dyn ListingStrategy>> = vec![
            Box::new(StructuredDataStrategy::new(&config.listing)?),
            Box::new(DomPatternStrategy::new(&config.listing)?),
            Box::new(AppStateStrategy::new(&config.listing)?),
        ];
        Ok(Self::with_strategies(executor, strategies, base_url))
    }

    pub fn with_strategies(
        executor: RequestExecutor,
        strategies: Vec<Box<dyn ListingStrategy>>,
        base_url: Url,
    ) -> Self {
        Self {
            executor,
            strategies,
            base_url,
        }
    }

    /// Listing URLs on `page_url`. Never fails: fetch errors count as empty
    /// attempts and the best attempt wins once `max_attempts` are used up.
    pub async fn extract(
        &self,
        page_url: &str,
        expected_count: usize,
        max_attempts: u32,
    ) -> HashSet<ListingUrl> {
        let mut best = HashSet::new();

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.executor.backoff().cycle_delay(attempt);
                info!(
                    page = page_url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying listing page"
                );
                sleep(delay).await;
            }

            let found = match self.executor.fetch(page_url).await {
                Ok(page) => self.extract_from_markup(page_url, &page.body),
                Err(e) => {
                    error!(page = page_url, attempt = attempt + 1, error = %e, "Listing page fetch failed");
                    HashSet::new()
                }
            };

            if found.len() >= expected_count {
                info!(page = page_url, found = found.len(), "Collected listing URLs");
                return found;
            }

            warn!(
                page = page_url,
                attempt = attempt + 1,
                max_attempts,
                found = found.len(),
                expected = expected_count,
                "Listing page below expected count"
            );
            if found.len() > best.len() {
                best = found;
            }
        }

        warn!(
            page = page_url,
            max_attempts,
            best = best.len(),
            expected = expected_count,
            "Returning best listing result"
        );
        best
    }

    /// Run every strategy over `body` and union their results.
    pub fn extract_from_markup(&self, page_url: &str, body: &str) -> HashSet<ListingUrl> {
        let html = Html::parse_document(body);
        let context = ParseContext::new(page_url, self.base_url.clone());
        let mut found = HashSet::new();

        for strategy in &self.strategies {
            match strategy.parse_with_context(&html, &context) {
                Ok(urls) => {
                    debug!(page = page_url, strategy = strategy.name(), count = urls.len(), "Strategy finished");
                    found.extend(urls);
                }
                Err(e) => {
                    warn!(page = page_url, strategy = strategy.name(), error = %e, "Strategy failed");
                }
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::backoff::BackoffPolicy;
    use crate::infrastructure::http_client::{
        BrowserHeaderProvider, PageContent, PageFetcher, TransportError,
    };
    use async_trait::async_trait;
    use reqwest::header::HeaderMap;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const PAGE: &str = "https://www.mudah.my/malaysia/cars-for-sale?o=1";

    struct ScriptedFetcher {
        bodies: Mutex<VecDeque<Option<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        /// `None` entries fail; an exhausted script keeps failing.
        fn new(bodies: Vec<Option<String>>) -> Arc<Self> {
            Arc::new(Self {
                bodies: Mutex::new(bodies.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str, _headers: &HeaderMap) -> Result<PageContent, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.bodies.lock().unwrap().pop_front().flatten() {
                Some(body) => Ok(PageContent::new(url, 200, body)),
                None => Err(TransportError::Request {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    fn extractor(fetcher: Arc<ScriptedFetcher>) -> ListingUrlExtractor {
        extractor_with_backoff(fetcher, BackoffPolicy::immediate())
    }

    fn extractor_with_backoff(fetcher: Arc<ScriptedFetcher>, backoff: BackoffPolicy) -> ListingUrlExtractor {
        let executor = RequestExecutor::new(fetcher, Arc::new(BrowserHeaderProvider), backoff, 0);
        ListingUrlExtractor::new(
            executor,
            &ParsingConfig::default(),
            Url::parse("https://www.mudah.my").unwrap(),
        )
        .unwrap()
    }

    fn cards(ids: &[u32]) -> String {
        ids.iter()
            .map(|id| {
                format!(
                    r#"<div class="listing-card-a1"><a href="/profile">seller</a><a href="/cars/car-{id}.htm">car</a></div>"#
                )
            })
            .collect()
    }

    fn page(body: &str) -> String {
        format!("<html><head></head><body>{body}</body></html>")
    }

    #[test]
    fn strategies_are_unioned_and_deduplicated() {
        let ld_json = r#"<script type="application/ld+json">[{"@type":"Organization"},{"@type":"BreadcrumbList"},{"itemListElement":[{"item":{"url":"https://www.mudah.my/cars/car-1.htm"}},{"item":{"url":"https://www.mudah.my/cars/car-9.htm"}}]}]</script>"#;
        let next_data = r#"<script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"items":[{"url":"https://www.mudah.my/cars/car-2.htm"},{"name":"no url"},{"url":"https://www.mudah.my/cars/car-7.htm"}]}}}</script>"#;
        let body = page(&format!("{ld_json}{}{next_data}", cards(&[1, 2, 3])));

        let found = extractor(ScriptedFetcher::new(vec![])).extract_from_markup(PAGE, &body);
        let mut urls: Vec<_> = found.iter().map(ListingUrl::as_str).collect();
        urls.sort_unstable();

        assert_eq!(
            urls,
            vec![
                "https://www.mudah.my/cars/car-1.htm",
                "https://www.mudah.my/cars/car-2.htm",
                "https://www.mudah.my/cars/car-3.htm",
                "https://www.mudah.my/cars/car-7.htm",
                "https://www.mudah.my/cars/car-9.htm",
            ]
        );
    }

    #[test]
    fn malformed_embedded_json_does_not_stop_other_strategies() {
        let body = page(&format!(
            r#"<script type="application/ld+json">{{not json</script>{}<script id="__NEXT_DATA__">[]</script>"#,
            cards(&[4])
        ));

        let found = extractor(ScriptedFetcher::new(vec![])).extract_from_markup(PAGE, &body);
        assert_eq!(found.len(), 1);
        assert!(found.contains(&ListingUrl::parse("https://www.mudah.my/cars/car-4.htm").unwrap()));
    }

    #[test]
    fn first_matching_card_pattern_wins() {
        let body = page(concat!(
            r#"<div class="listing-item"><a href="/cars/item-1.htm">a</a></div>"#,
            r#"<div class="product-card"><a href="/cars/product-2.htm">b</a></div>"#,
        ));

        let found = extractor(ScriptedFetcher::new(vec![])).extract_from_markup(PAGE, &body);
        let urls: Vec<_> = found.iter().map(ListingUrl::as_str).collect();
        assert_eq!(urls, vec!["https://www.mudah.my/cars/item-1.htm"]);
    }

    #[test]
    fn card_falls_back_to_any_html_link() {
        let body = page(r#"<div class="listing-card"><a href="/search">x</a><a href="/toyota-vios-55.html">y</a></div>"#);

        let found = extractor(ScriptedFetcher::new(vec![])).extract_from_markup(PAGE, &body);
        assert!(found.contains(&ListingUrl::parse("https://www.mudah.my/toyota-vios-55.html").unwrap()));
    }

    #[tokio::test]
    async fn always_failing_fetch_yields_empty_set() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let found = extractor(fetcher.clone()).extract(PAGE, 40, 3).await;

        assert!(found.is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_as_soon_as_expected_count_is_reached() {
        let fetcher = ScriptedFetcher::new(vec![
            Some(page(&cards(&[1, 2]))),
            Some(page(&cards(&[1, 2, 3]))),
            Some(page(&cards(&[1, 2, 3, 4]))),
        ]);
        let found = extractor(fetcher.clone()).extract(PAGE, 3, 3).await;

        assert_eq!(found.len(), 3);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn keeps_best_result_across_non_monotonic_attempts() {
        let fetcher = ScriptedFetcher::new(vec![
            Some(page(&cards(&[1]))),
            Some(page(&cards(&[1, 2, 3]))),
            None,
        ]);
        let found = extractor(fetcher.clone()).extract(PAGE, 10, 3).await;

        assert_eq!(found.len(), 3);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycles_wait_exponential_delay_plus_jitter() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let backoff = BackoffPolicy::new(100, 50, 60);
        let extractor = extractor_with_backoff(fetcher.clone(), backoff);

        let started = tokio::time::Instant::now();
        let found = extractor.extract(PAGE, 40, 3).await;
        let elapsed = started.elapsed().as_millis();

        // cycle delays: 100+[50,60] before attempt 2, 200+[50,60] before attempt 3
        // fetch delays: 100*[0.5,1.5] before each of the 3 fetches
        assert!(found.is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
        assert!((400 + 150..=420 + 450).contains(&elapsed), "elapsed {elapsed}ms");
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_cycle_skips_cycle_delay() {
        let fetcher = ScriptedFetcher::new(vec![Some(page(&cards(&[1, 2])))]);
        let extractor = extractor_with_backoff(fetcher.clone(), BackoffPolicy::new(100, 5000, 5000));

        let started = tokio::time::Instant::now();
        let found = extractor.extract(PAGE, 2, 3).await;
        let elapsed = started.elapsed().as_millis();

        assert_eq!(found.len(), 2);
        assert!((50..=150).contains(&elapsed), "elapsed {elapsed}ms");
    }
}
