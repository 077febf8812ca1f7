//! Attribute extraction for listing detail pages
//!
//! The detail page embeds the full application state as JSON. The ad's own
//! entry lives under `props.initialState.adDetails.byID.<ad id>` and carries
//! two attribute collections:
//! - `attributes.categoryParams`: flat, already attribute-shaped
//! - `attributes.mcdParams`: groups, each with a `params` array

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, error};

use super::config::{DetailSelectors, ParsingConfig};
use super::json_nav::{display_path, items, lookup};
use super::{
    ContextualParser, ExtractionError, ParsingError, ParsingResult,
    compile_selectors, script_text,
};
use crate::domain::RawAttribute;
use crate::infrastructure::request_executor::RequestExecutor;

const AD_DETAILS_PATH: [&str; 4] = ["props", "initialState", "adDetails", "byID"];

/// A detail page needs only its own URL, which carries the ad id.
#[derive(Debug, Clone)]
pub struct DetailContext {
    pub url: String,
}

impl DetailContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Pure detail page parser: markup in, attributes out.
pub struct DetailPageParser {
    script_selectors: Vec<(String, Selector)>,
    ad_id_pattern: Regex,
}

impl DetailPageParser {
    pub fn new(selectors: &DetailSelectors) -> ParsingResult<Self> {
        Ok(Self {
            script_selectors: compile_selectors(&selectors.state_script)?,
            ad_id_pattern: Regex::new(&selectors.ad_id_pattern).map_err(|e| {
                ParsingError::invalid_selector(&selectors.ad_id_pattern, &e.to_string())
            })?,
        })
    }

    /// Numeric ad identifier embedded in the listing URL.
    pub fn ad_id<'u>(&self, url: &'u str) -> ParsingResult<&'u str> {
        self.ad_id_pattern
            .captures(url)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| ParsingError::MissingAdId {
                url: url.to_string(),
            })
    }

    /// Parse a fetched detail page body.
    pub fn parse_detail_page(&self, url: &str, body: &str) -> ParsingResult<Vec<RawAttribute>> {
        let html = Html::parse_document(body);
        let context = DetailContext::new(url);
        self.parse_with_context(&html, &context)
    }

    fn state_payload(&self, html: &Html, url: &str) -> ParsingResult<Value> {
        let script = self
            .script_selectors
            .iter()
            .find_map(|(_, selector)| html.select(selector).next())
            .ok_or_else(|| {
                let tried: Vec<String> =
                    self.script_selectors.iter().map(|(s, _)| s.clone()).collect();
                ParsingError::script_not_found(url, &tried)
            })?;

        serde_json::from_str(&script_text(script)).map_err(|e| ParsingError::invalid_json(url, &e))
    }

    fn flatten_mcd_params(groups: &Value) -> impl Iterator<Item = RawAttribute> + '_ {
        items(groups)
            .iter()
            .flat_map(|group| items(lookup(group, &["params"])))
            .filter_map(RawAttribute::from_json)
    }
}

impl ContextualParser for DetailPageParser {
    type Output = Vec<RawAttribute>;
    type Context = DetailContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        let payload = self.state_payload(html, &context.url)?;
        let ad_id = self.ad_id(&context.url)?;

        let ad = lookup(lookup(&payload, &AD_DETAILS_PATH), &[ad_id]);
        if ad.is_null() {
            let mut path = AD_DETAILS_PATH.to_vec();
            path.push(ad_id);
            debug!(url = %context.url, path = %display_path(&path), "Ad entry missing, keeping id only");
        }

        let attributes = lookup(ad, &["attributes"]);
        let mut result: Vec<RawAttribute> = items(lookup(attributes, &["categoryParams"]))
            .iter()
            .filter_map(RawAttribute::from_json)
            .collect();
        result.push(RawAttribute::ad_id(ad_id));
        result.extend(Self::flatten_mcd_params(lookup(attributes, &["mcdParams"])));

        Ok(result)
    }
}

/// Fetches and parses one listing detail page.
pub struct DetailAttributeExtractor {
    executor: RequestExecutor,
    parser: DetailPageParser,
}

impl DetailAttributeExtractor {
    pub fn new(executor: RequestExecutor, config: &ParsingConfig) -> ParsingResult<Self> {
        Ok(Self {
            executor,
            parser: DetailPageParser::new(&config.detail)?,
        })
    }

    /// Attributes for `url`, or `None` when the listing has to be skipped.
    pub async fn extract(&self, url: &str) -> Option<Vec<RawAttribute>> {
        match self.try_extract(url).await {
            Ok(attributes) => Some(attributes),
            Err(e) => {
                error!(url, error = %e, "Error processing listing details");
                None
            }
        }
    }

    pub async fn try_extract(&self, url: &str) -> Result<Vec<RawAttribute>, ExtractionError> {
        let page = self.executor.fetch(url).await?;
        Ok(self.parser.parse_detail_page(url, &page.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::car_attribute::AD_ID_FIELD;
    use serde_json::json;

    const URL: &str = "https://www.mudah.my/2019-perodua-myvi-1.5-av-108123456.htm";

    fn parser() -> DetailPageParser {
        DetailPageParser::new(&DetailSelectors::default()).unwrap()
    }

    fn page_with_state(state: &Value) -> String {
        format!(
            r#"<html><body><script id="__NEXT_DATA__" type="application/json">{state}</script></body></html>"#
        )
    }

    fn ad_state(ad_id: &str, attributes: Value) -> Value {
        json!({
            "props": { "initialState": { "adDetails": { "byID": {
                ad_id: { "attributes": attributes }
            }}}}
        })
    }

    #[test]
    fn merges_category_id_and_mcd_params_in_order() {
        let state = ad_state(
            "108123456",
            json!({
                "categoryParams": [
                    { "id": "price", "value": "45000", "realValue": "45000", "label": "Price" },
                    { "id": "make", "value": "Perodua", "label": "Make" }
                ],
                "mcdParams": [
                    { "name": "engine", "params": [
                        { "id": "cc", "value": 1496 },
                        { "id": "fuel_type", "value": "Petrol", "label": "Fuel" }
                    ]},
                    { "name": "empty group" }
                ]
            }),
        );

        let attributes = parser().parse_detail_page(URL, &page_with_state(&state)).unwrap();
        let ids: Vec<_> = attributes.iter().map(|a| a.id.as_str()).collect();

        assert_eq!(ids, vec!["price", "make", AD_ID_FIELD, "cc", "fuel_type"]);
        assert_eq!(attributes[2], RawAttribute::ad_id("108123456"));
        assert_eq!(attributes[3].value, "1496");
        assert_eq!(attributes[3].label, "");
    }

    #[test]
    fn ad_missing_from_by_id_yields_only_ad_id() {
        let state = ad_state("999", json!({ "categoryParams": [{ "id": "price", "value": "1" }] }));

        let attributes = parser().parse_detail_page(URL, &page_with_state(&state)).unwrap();
        assert_eq!(attributes, vec![RawAttribute::ad_id("108123456")]);
    }

    #[test]
    fn generic_json_script_is_a_fallback() {
        let state = ad_state("108123456", json!({ "categoryParams": [{ "id": "model", "value": "Myvi" }] }));
        let body = format!(r#"<html><body><script type="application/json">{state}</script></body></html>"#);

        let attributes = parser().parse_detail_page(URL, &body).unwrap();
        assert_eq!(attributes[0], RawAttribute::new("model", "Myvi"));
    }

    #[test]
    fn missing_script_is_an_error() {
        let err = parser()
            .parse_detail_page(URL, "<html><body><p>captcha</p></body></html>")
            .unwrap_err();
        assert!(matches!(err, ParsingError::ScriptNotFound { .. }));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let body = r#"<html><body><script id="__NEXT_DATA__">{"props":</script></body></html>"#;
        assert!(matches!(
            parser().parse_detail_page(URL, body),
            Err(ParsingError::InvalidJson { .. })
        ));
    }

    #[test]
    fn url_without_ad_id_is_an_error() {
        let state = ad_state("1", json!({}));
        assert!(matches!(
            parser().parse_detail_page("https://www.mudah.my/about.htm", &page_with_state(&state)),
            Err(ParsingError::MissingAdId { .. })
        ));
    }

    #[test]
    fn relative_detail_url_still_parses() {
        let state = ad_state("4242", json!({ "categoryParams": [{ "id": "make", "value": "Honda" }] }));

        let attributes = parser()
            .parse_detail_page("/cars/honda-civic-4242.htm", &page_with_state(&state))
            .unwrap();
        assert_eq!(
            attributes,
            vec![RawAttribute::new("make", "Honda"), RawAttribute::ad_id("4242")]
        );
    }

    #[test]
    fn ad_id_uses_trailing_digits() {
        assert_eq!(parser().ad_id(URL).unwrap(), "108123456");
        assert_eq!(
            parser().ad_id("https://www.mudah.my/honda-city-v-i-vtec-77001122.html").unwrap(),
            "77001122"
        );
    }
}
