use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Absolute URL of one listing detail page.
///
/// Construction goes through [`ListingUrl::parse`], so every value is an
/// absolute http(s) URL whose path ends in an HTML document segment
/// (`.htm` or `.html`). Equality and hashing use the URL text, which gives
/// the per-page set semantics the listing extractor relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingUrl(String);

impl ListingUrl {
    /// Validate a raw URL string. Returns the reason on rejection.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        let parsed = Url::parse(trimmed).map_err(|e| format!("not an absolute URL: {e}"))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("unsupported scheme '{}'", parsed.scheme()));
        }

        let path = parsed.path().to_ascii_lowercase();
        if !(path.ends_with(".htm") || path.ends_with(".html")) {
            return Err(format!("path '{}' is not an HTML document", parsed.path()));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<ListingUrl> for String {
    fn from(listing_url: ListingUrl) -> Self {
        listing_url.0
    }
}

impl AsRef<str> for ListingUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
