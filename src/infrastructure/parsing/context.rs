//! Parsing context for the listing strategies.

use url::Url;

use super::{ParsingError, ParsingResult};
use crate::domain::ListingUrl;

/// Context information for one parsed page
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// URL of the page being parsed
    pub url: String,

    /// Site origin for resolving relative links
    pub base_url: Url,
}

impl ParseContext {
    pub fn new(url: impl Into<String>, base_url: Url) -> Self {
        Self {
            url: url.into(),
            base_url,
        }
    }

    /// Make `href` absolute against the site origin and validate it as a
    /// listing URL.
    pub fn resolve_listing_url(&self, href: &str) -> ParsingResult<ListingUrl> {
        let href = href.trim();
        let absolute = if href.starts_with("http") {
            href.to_string()
        } else {
            self.base_url
                .join(href)
                .map_err(|e| ParsingError::UrlResolutionFailed {
                    url: href.to_string(),
                    reason: e.to_string(),
                    base_url: self.base_url.to_string(),
                })?
                .to_string()
        };

        ListingUrl::parse(&absolute).map_err(|reason| ParsingError::InvalidListingUrl {
            url: absolute,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ParseContext {
        ParseContext::new(
            "https://www.mudah.my/malaysia/cars-for-sale?o=1",
            Url::parse("https://www.mudah.my").unwrap(),
        )
    }

    #[test]
    fn relative_links_use_site_origin() {
        let url = context()
            .resolve_listing_url("/cars/perodua-myvi-1001.htm")
            .unwrap();
        assert_eq!(url.as_str(), "https://www.mudah.my/cars/perodua-myvi-1001.htm");
    }

    #[test]
    fn absolute_links_are_kept() {
        let url = context()
            .resolve_listing_url("https://cdn.mudah.my/x/honda-city-77.html")
            .unwrap();
        assert_eq!(url.as_str(), "https://cdn.mudah.my/x/honda-city-77.html");
    }

    #[test]
    fn non_document_links_are_rejected() {
        assert!(matches!(
            context().resolve_listing_url("/selangor/cars-for-sale?o=2"),
            Err(ParsingError::InvalidListingUrl { .. })
        ));
    }
}
