//! Infrastructure layer: configuration, logging, network access, parsing
//! and export.

pub mod backoff;
pub mod config;
pub mod csv_export;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod parsing_error;
pub mod request_executor;

// Re-export commonly used items
pub use backoff::BackoffPolicy;
pub use config::{AppConfig, ConfigError, ConfigManager};
pub use http_client::{
    BrowserHeaderProvider, HeaderProvider, HttpClient, PageContent, PageFetcher, TransportError,
};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use parsing::{
    DetailAttributeExtractor, DetailPageParser, ListingUrlExtractor, ParsingConfig,
};
pub use parsing_error::{ExtractionError, ParsingError, ParsingResult};
pub use request_executor::{FetchError, RequestExecutor};
