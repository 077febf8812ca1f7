//! Car Harvester - vehicle listing extraction for paginated classifieds sites
//!
//! Discovers listing URLs across search-result pages, extracts each
//! listing's embedded attributes and normalizes them onto a fixed schema.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{AttributeNormalizer, PipelineError, ScrapePipeline, ScrapeRequest, ScrapeSummary};
pub use domain::{KNOWN_FIELDS, ListingUrl, NormalizedCarRecord, PageUrlGenerator, RawAttribute};
