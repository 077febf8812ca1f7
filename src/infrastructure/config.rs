//! Configuration infrastructure
//!
//! Settings are layered with the `config` crate:
//! 1. Built-in defaults (`defaults` module, via `#[serde(default)]`)
//! 2. Optional config file (TOML/JSON/YAML, chosen by extension)
//! 3. `CAR_HARVESTER_*` environment variables (`__` separates nesting levels)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::parsing::config::ParsingConfig;

/// Environment variable prefix, e.g. `CAR_HARVESTER_HTTP__MAX_RETRIES=5`.
pub const ENV_PREFIX: &str = "CAR_HARVESTER";

const APP_DIR_NAME: &str = "car-harvester";
const CONFIG_FILE_STEM: &str = "config";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub crawling: CrawlingConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    /// Listing and detail page selectors
    pub parsing: ParsingConfig,
}

/// Target site layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site origin; also used to absolutize relative listing links
    pub base_url: String,
    /// Path segment of the search-result listing
    pub listing_path: String,
    /// Query parameter carrying the page number
    pub page_param: String,
    /// Region segment used when no region is given
    pub default_region: String,
}

/// Listing discovery behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlingConfig {
    /// Listing URLs a healthy search-result page is expected to yield
    pub expected_listings_per_page: usize,
    /// Fetch+extract cycles per search-result page
    pub listing_max_attempts: u32,
    pub cycle_jitter_min_ms: u64,
    pub cycle_jitter_max_ms: u64,
}

/// Outbound request behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Base delay before each request, doubled per retry
    pub base_delay_ms: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub request_timeout_seconds: u64,
    /// Aggregate request budget; 0 disables the limiter
    pub max_requests_per_second: u32,
    pub follow_redirects: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    /// Enable JSON formatted logs
    pub json_format: bool,
    /// Enable console output
    pub console_output: bool,
    /// Enable file output
    pub file_output: bool,
    /// Log directory; defaults to the user data dir when unset
    pub log_dir: Option<PathBuf>,
    pub file_name: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::SITE_BASE_URL.to_string(),
            listing_path: defaults::LISTING_PATH.to_string(),
            page_param: defaults::PAGE_PARAM.to_string(),
            default_region: defaults::DEFAULT_REGION.to_string(),
        }
    }
}

impl Default for CrawlingConfig {
    fn default() -> Self {
        Self {
            expected_listings_per_page: defaults::EXPECTED_LISTINGS_PER_PAGE,
            listing_max_attempts: defaults::LISTING_MAX_ATTEMPTS,
            cycle_jitter_min_ms: defaults::CYCLE_JITTER_MIN_MS,
            cycle_jitter_max_ms: defaults::CYCLE_JITTER_MAX_MS,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: defaults::BASE_DELAY_MS,
            max_retries: defaults::MAX_RETRIES,
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            follow_redirects: defaults::FOLLOW_REDIRECTS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            file_name: defaults::LOG_FILE_NAME.to_string(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = Url::parse(&self.site.base_url).map_err(|e| {
            ConfigError::validation(format!("site.base_url '{}': {e}", self.site.base_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            return Err(ConfigError::validation(format!(
                "site.base_url '{}' must be an absolute http(s) URL",
                self.site.base_url
            )));
        }
        if self.site.page_param.trim().is_empty() {
            return Err(ConfigError::validation("site.page_param must not be empty"));
        }
        if self.site.default_region.trim().is_empty() {
            return Err(ConfigError::validation("site.default_region must not be empty"));
        }

        if self.crawling.expected_listings_per_page == 0 {
            return Err(ConfigError::validation(
                "crawling.expected_listings_per_page must be greater than 0",
            ));
        }
        if !(1..=defaults::MAX_ATTEMPTS_LIMIT).contains(&self.crawling.listing_max_attempts) {
            return Err(ConfigError::validation(format!(
                "crawling.listing_max_attempts must be within 1..={}",
                defaults::MAX_ATTEMPTS_LIMIT
            )));
        }
        if self.crawling.cycle_jitter_min_ms > self.crawling.cycle_jitter_max_ms {
            return Err(ConfigError::validation(
                "crawling.cycle_jitter_min_ms cannot be greater than cycle_jitter_max_ms",
            ));
        }

        if self.http.max_retries > defaults::MAX_ATTEMPTS_LIMIT {
            return Err(ConfigError::validation(format!(
                "http.max_retries must not exceed {}",
                defaults::MAX_ATTEMPTS_LIMIT
            )));
        }
        if self.http.request_timeout_seconds == 0 {
            return Err(ConfigError::validation(
                "http.request_timeout_seconds must be greater than 0",
            ));
        }

        if self.parsing.listing.listing_card.is_empty() {
            return Err(ConfigError::validation("parsing.listing.listing_card must not be empty"));
        }
        if self.parsing.detail.state_script.is_empty() {
            return Err(ConfigError::validation("parsing.detail.state_script must not be empty"));
        }

        Ok(())
    }
}

pub struct ConfigManager;

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME))
    }

    /// Get application data directory (default home of log files)
    pub fn get_app_data_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join(APP_DIR_NAME))
    }

    /// Load configuration. An explicit `path` must exist; without one the
    /// per-user config file is used if present.
    pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                builder = builder.add_source(config::File::from(path));
            }
            None => {
                if let Some(dir) = Self::get_config_dir() {
                    let default_path = dir.join(CONFIG_FILE_STEM);
                    debug!("Looking for optional configuration at {}", default_path.display());
                    builder = builder
                        .add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = settings.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }
}

/// Default configuration values
pub mod defaults {
    pub const SITE_BASE_URL: &str = "https://www.mudah.my";
    pub const LISTING_PATH: &str = "cars-for-sale";
    pub const PAGE_PARAM: &str = "o";
    pub const DEFAULT_REGION: &str = "malaysia";

    pub const EXPECTED_LISTINGS_PER_PAGE: usize = 40;
    pub const LISTING_MAX_ATTEMPTS: u32 = 3;
    pub const CYCLE_JITTER_MIN_MS: u64 = 1000;
    pub const CYCLE_JITTER_MAX_MS: u64 = 3000;

    pub const BASE_DELAY_MS: u64 = 2000;
    pub const MAX_RETRIES: u32 = 3;
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    /// 0 = unlimited
    pub const MAX_REQUESTS_PER_SECOND: u32 = 0;
    pub const FOLLOW_REDIRECTS: bool = true;

    /// Upper bound for retries and cycle attempts
    pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
    pub const LOG_FILE_NAME: &str = "car-harvester.log";
}
