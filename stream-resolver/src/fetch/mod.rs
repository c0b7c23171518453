mod relay;

pub use relay::{apply_session_cap, RelayClient, RelayPoolConfig, RelayPools};

use crate::Provider;
use ::utils::surf_logging::SurfLogging;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use surf::Client;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Per-call knobs for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// `Some` routes the call through the anti-bot relay, using that provider's session pool.
    pub relay: Option<Provider>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            relay: None,
        }
    }
}

impl FetchOptions {
    pub fn direct(timeout: Duration) -> Self {
        Self {
            timeout,
            relay: None,
        }
    }

    pub fn relayed(provider: Provider, timeout: Duration) -> Self {
        Self {
            timeout,
            relay: Some(provider),
        }
    }

    pub fn uses_relay(&self) -> bool {
        self.relay.is_some()
    }
}

/// Bounded-timeout GET. Every failure (timeout, non-2xx, transport error, relay refusal)
/// answers `None`.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch_text(&self, url: &str, options: FetchOptions) -> Option<String>;
}

/// Fetches `url` and decodes the body as JSON; a malformed body is `None`.
pub async fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn Fetch,
    url: &str,
    options: FetchOptions,
) -> Option<T> {
    let body = fetcher.fetch_text(url, options).await?;
    match serde_json::from_str(&body) {
        Ok(value) => Some(value),
        Err(err) => {
            log::debug!("Discarding malformed JSON from {}: {}", url, err);
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Http(surf::Error),
    #[error("relay refused request: {0}")]
    Relay(String),
    #[error("no relay configured")]
    NoRelay,
}

/// [`Fetch`] over a shared surf client with an optional relay.
#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
    user_agent: String,
    relay: Option<Arc<RelayClient>>,
}

impl HttpFetcher {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            http: Client::new().with(SurfLogging),
            user_agent: user_agent.into(),
            relay: None,
        }
    }

    pub fn with_relay(mut self, relay: Option<Arc<RelayClient>>) -> Self {
        self.relay = relay;
        self
    }

    async fn get_direct(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let request = async {
            let mut response = self
                .http
                .get(url)
                .header("User-Agent", self.user_agent.as_str())
                .await
                .map_err(FetchError::Http)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status as u16));
            }
            response.body_string().await.map_err(FetchError::Http)
        };

        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| FetchError::Timeout(timeout))?
    }

    async fn get(&self, url: &str, options: FetchOptions) -> Result<String, FetchError> {
        match options.relay {
            Some(provider) => {
                let relay = self.relay.as_ref().ok_or(FetchError::NoRelay)?;
                relay.request_get(url, options.timeout, Some(provider)).await
            }
            None => self.get_direct(url, options.timeout).await,
        }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_text(&self, url: &str, options: FetchOptions) -> Option<String> {
        match self.get(url, options).await {
            Ok(body) => Some(body),
            Err(err) => {
                log::debug!(
                    "Fetch of {} failed{}: {}",
                    url,
                    if options.uses_relay() { " via relay" } else { "" },
                    err
                );
                None
            }
        }
    }
}
