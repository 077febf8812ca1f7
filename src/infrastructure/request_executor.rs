//! Single-URL fetch with bounded retry and jittered exponential backoff.

use std::sync::Arc;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, warn};

use super::backoff::BackoffPolicy;
use super::http_client::{HeaderProvider, PageContent, PageFetcher, TransportError};

/// Retries for one URL are exhausted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fetching {url} failed after {attempts} attempts: {last_error}")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    pub last_error: TransportError,
}

/// The only component that talks to the [`PageFetcher`].
///
/// Every attempt, the first included, is preceded by
/// [`BackoffPolicy::fetch_delay`] and sent with freshly generated headers.
/// A non-2xx status counts as a failed attempt.
#[derive(Clone)]
pub struct RequestExecutor {
    fetcher: Arc<dyn PageFetcher>,
    header_provider: Arc<dyn HeaderProvider>,
    backoff: BackoffPolicy,
    max_retries: u32,
}

impl RequestExecutor {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        header_provider: Arc<dyn HeaderProvider>,
        backoff: BackoffPolicy,
        max_retries: u32,
    ) -> Self {
        Self {
            fetcher,
            header_provider,
            backoff,
            max_retries,
        }
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    pub async fn fetch(&self, url: &str) -> Result<PageContent, FetchError> {
        let mut retry = 0;

        loop {
            let delay = self.backoff.fetch_delay(retry);
            if !delay.is_zero() {
                sleep(delay).await;
            }

            let headers = self.header_provider.headers();
            let failure = match self.fetcher.fetch(url, &headers).await {
                Ok(page) if page.is_success() => return Ok(page),
                Ok(page) => TransportError::Status {
                    url: url.to_string(),
                    status: page.status,
                },
                Err(e) => e,
            };

            if retry >= self.max_retries {
                error!(url, attempts = retry + 1, error = %failure, "Max retries reached");
                return Err(FetchError {
                    url: url.to_string(),
                    attempts: retry + 1,
                    last_error: failure,
                });
            }

            retry += 1;
            warn!(
                url,
                retry,
                max_retries = self.max_retries,
                error = %failure,
                "Request failed, retrying"
            );
        }
    }
}
