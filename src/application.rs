//! Application layer module
//!
//! Orchestrates the domain types and infrastructure into a complete scrape.

pub mod attribute_normalizer;
pub mod scrape_pipeline;

pub use attribute_normalizer::AttributeNormalizer;
pub use scrape_pipeline::{PipelineError, ScrapePipeline, ScrapeRequest, ScrapeSummary};
