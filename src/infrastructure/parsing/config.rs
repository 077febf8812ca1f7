//! Parsing configuration for listing and detail extraction
//!
//! Centralized selector and pattern lists. Lists are tried in order.

use serde::{Deserialize, Serialize};

/// Main parsing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Listing (search-result) page selectors
    pub listing: ListingSelectors,

    /// Detail page selectors and patterns
    pub detail: DetailSelectors,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            listing: ListingSelectors::default(),
            detail: DetailSelectors::default(),
        }
    }
}

/// Selectors for search-result pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    /// Structured-data (`ld+json`) script blocks
    pub structured_data_script: String,

    /// Listing card containers; the first selector with any match wins
    pub listing_card: Vec<String>,

    /// Link path shape of a listing detail page
    pub preferred_link_pattern: String,

    /// Any HTML-like link, used when no preferred link is present in a card
    pub fallback_link_pattern: String,

    /// Embedded application state script
    pub app_state_script: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            structured_data_script: r#"script[type="application/ld+json"]"#.to_string(),
            listing_card: vec![
                r#"div[class*="listing-card"]"#.to_string(),
                r#"div[class*="listing-item"]"#.to_string(),
                r#"div[class*="product-card"]"#.to_string(),
            ],
            preferred_link_pattern: r"/cars/.+\.html?".to_string(),
            fallback_link_pattern: r".+\.html?".to_string(),
            app_state_script: "script#__NEXT_DATA__".to_string(),
        }
    }
}

/// Selectors for listing detail pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSelectors {
    /// Embedded state scripts, most specific first
    pub state_script: Vec<String>,

    /// Captures the numeric ad id from the listing URL
    pub ad_id_pattern: String,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            state_script: vec![
                "script#__NEXT_DATA__".to_string(),
                r#"script[type="application/json"]"#.to_string(),
            ],
            ad_id_pattern: r"-(\d+)\.htm".to_string(),
        }
    }
}
