//! HTML and embedded-JSON parsing for listing and detail pages
//!
//! Parsers work on an already-parsed `scraper::Html`. `Html` is not `Send`,
//! so async callers parse markup inside synchronous helpers and never hold a
//! document across an `.await`.

pub mod config;
pub mod context;
pub mod detail_attribute_extractor;
pub mod json_nav;
pub mod listing_url_extractor;

pub use super::parsing_error::{ExtractionError, ParsingError, ParsingResult};
pub use config::ParsingConfig;
pub use context::ParseContext;
pub use detail_attribute_extractor::{DetailAttributeExtractor, DetailContext, DetailPageParser};
pub use listing_url_extractor::{
    AppStateStrategy, DomPatternStrategy, ListingStrategy, ListingUrlExtractor,
    StructuredDataStrategy,
};

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}

/// Compile a single selector string.
pub fn compile_selector(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, &e.to_string()))
}

/// Compile multiple selector strings, keeping their source text for diagnostics.
///
/// Invalid entries are logged and skipped; at least one must compile.
pub fn compile_selectors(selector_strings: &[String]) -> ParsingResult<Vec<(String, Selector)>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match compile_selector(selector_str) {
            Ok(selector) => selectors.push((selector_str.clone(), selector)),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                errors.push(e);
            }
        }
    }

    if selectors.is_empty() {
        return Err(errors.into_iter().next().unwrap_or_else(|| {
            ParsingError::invalid_selector("", "no selectors configured")
        }));
    }

    if !errors.is_empty() {
        debug!("{} selector(s) failed to compile", errors.len());
    }

    Ok(selectors)
}

/// Text content of a script element.
pub fn script_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}
