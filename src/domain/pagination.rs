//! Search-result page URL generation.
//!
//! Responsibility:
//! - region / category path segments (with the "all regions" and "no category" sentinels)
//! - one URL per page number in an inclusive range, ascending

use thiserror::Error;
use url::Url;

/// Category value that means "no category segment".
pub const NO_CATEGORY_SENTINEL: &str = "none";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageUrlError {
    #[error("Invalid page range {start}..={end}: pages start at 1 and end must not precede start")]
    InvalidPageRange { start: u32, end: u32 },

    #[error("Invalid site base URL '{base_url}': {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrlGenerator {
    origin: Url,
    base_url: String,
    listing_path: String,
    page_param: String,
    default_region: String,
}

impl PageUrlGenerator {
    pub fn new(
        base_url: &str,
        listing_path: &str,
        page_param: &str,
        default_region: &str,
    ) -> Result<Self, PageUrlError> {
        let parsed = Url::parse(base_url).map_err(|e| PageUrlError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(PageUrlError::InvalidBaseUrl {
                base_url: base_url.to_string(),
                reason: "expected an absolute http(s) URL".to_string(),
            });
        }

        Ok(Self {
            origin: parsed,
            base_url: base_url.trim_end_matches('/').to_string(),
            listing_path: listing_path.trim_matches('/').to_string(),
            page_param: page_param.to_string(),
            default_region: default_region.to_string(),
        })
    }

    /// Validated site base, used to absolutize relative links.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Search-result page URLs for `start_page..=end_page`, ascending.
    pub fn generate(
        &self,
        region: &str,
        category: &str,
        start_page: u32,
        end_page: u32,
    ) -> Result<Vec<String>, PageUrlError> {
        if start_page == 0 || end_page < start_page {
            return Err(PageUrlError::InvalidPageRange {
                start: start_page,
                end: end_page,
            });
        }

        let prefix = self.page_prefix(region, category);
        Ok((start_page..=end_page)
            .map(|page| format!("{prefix}{page}"))
            .collect())
    }

    fn page_prefix(&self, region: &str, category: &str) -> String {
        let region = slug(region);
        let region = if region.is_empty() {
            self.default_region.as_str()
        } else {
            region.as_str()
        };

        let category = category.trim();
        if category.is_empty() || category.eq_ignore_ascii_case(NO_CATEGORY_SENTINEL) {
            format!(
                "{}/{}/{}?{}=",
                self.base_url, region, self.listing_path, self.page_param
            )
        } else {
            format!(
                "{}/{}/{}/{}?{}=",
                self.base_url, region, self.listing_path, category, self.page_param
            )
        }
    }
}

/// Lowercase, with inner whitespace runs collapsed to `-`.
fn slug(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn generator() -> PageUrlGenerator {
        PageUrlGenerator::new("https://www.mudah.my", "cars-for-sale", "o", "malaysia").unwrap()
    }

    #[test]
    fn default_region_without_category() {
        let urls = generator().generate("", "", 2, 4).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://www.mudah.my/malaysia/cars-for-sale?o=2",
                "https://www.mudah.my/malaysia/cars-for-sale?o=3",
                "https://www.mudah.my/malaysia/cars-for-sale?o=4",
            ]
        );
    }

    #[test]
    fn region_is_lowercased_and_brand_kept() {
        let urls = generator().generate("Selangor", "toyota", 1, 1).unwrap();
        assert_eq!(urls, vec!["https://www.mudah.my/selangor/cars-for-sale/toyota?o=1"]);
    }

    #[rstest]
    #[case("none")]
    #[case("NONE")]
    #[case("  ")]
    fn category_sentinels_drop_the_segment(#[case] category: &str) {
        let urls = generator().generate("johor", category, 1, 1).unwrap();
        assert_eq!(urls, vec!["https://www.mudah.my/johor/cars-for-sale?o=1"]);
    }

    #[test]
    fn multi_word_region_becomes_slug() {
        let urls = generator().generate("Kuala  Lumpur", "", 1, 1).unwrap();
        assert_eq!(urls, vec!["https://www.mudah.my/kuala-lumpur/cars-for-sale?o=1"]);
    }

    #[rstest]
    #[case(0, 3)]
    #[case(5, 4)]
    fn rejects_invalid_ranges(#[case] start: u32, #[case] end: u32) {
        assert_eq!(
            generator().generate("", "", start, end),
            Err(PageUrlError::InvalidPageRange { start, end })
        );
    }

    #[test]
    fn origin_is_the_validated_base() {
        let generator =
            PageUrlGenerator::new("https://www.mudah.my/", "cars-for-sale", "o", "malaysia").unwrap();
        assert_eq!(generator.origin().as_str(), "https://www.mudah.my/");
        assert_eq!(
            generator.origin().join("/cars/a-1.htm").unwrap().as_str(),
            "https://www.mudah.my/cars/a-1.htm"
        );
    }

    #[test]
    fn rejects_relative_base_url() {
        assert!(PageUrlGenerator::new("www.mudah.my", "cars-for-sale", "o", "malaysia").is_err());
    }
}
