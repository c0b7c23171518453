use crate::cache::SharedCache;
use crate::fetch::{Fetch, HttpFetcher, RelayClient, RelayPools};
use crate::{Error, ParsedIdentifier, Provider, ResolverConfig, StreamAggregator, StreamResponse};
use getset::Getters;
use log::info;
use movie_info::TitleMetadata;
use std::sync::Arc;
use strum::IntoEnumIterator;

/// Process-wide state: built once at start-up, handed to request handlers, torn down on exit.
#[derive(Getters)]
#[get = "pub"]
pub struct Context {
    config: ResolverConfig,
    aggregator: StreamAggregator,
    cache: SharedCache,
    relay: Option<Arc<RelayClient>>,
}

impl Context {
    pub async fn init(
        config: ResolverConfig,
        metadata: Arc<dyn TitleMetadata>,
        cache: SharedCache,
    ) -> Result<Self, Error> {
        for provider in Provider::iter() {
            info!("{} mirrors: {:?}", provider, config.mirrors(provider));
        }
        if let Some(proxy) = ResolverConfig::detected_proxy() {
            info!("Outbound requests use proxy {}", proxy);
        }

        let pools = RelayPools::from_config(&config);
        let relay = match &config.relay_url {
            Some(url) if url.trim().is_empty() => {
                return Err(Error::Config("relay_url is empty".to_string()));
            }
            Some(url) => {
                let relay = Arc::new(RelayClient::new(url, pools.clone()));
                relay.warm_up().await;
                Some(relay)
            }
            None => None,
        };

        let fetcher: Arc<dyn Fetch> =
            Arc::new(HttpFetcher::new(config.user_agent.clone()).with_relay(relay.clone()));
        let aggregator =
            StreamAggregator::from_config(&config, fetcher, metadata, &pools, cache.clone());

        info!(
            "Initialized stream resolver (cache TTL: {}s, fetch timeout: {}ms)",
            config.cache_ttl_seconds(),
            config.fetch_timeout_ms
        );

        Ok(Self {
            config,
            aggregator,
            cache,
            relay,
        })
    }

    pub async fn resolve_streams(
        &self,
        content_type: &str,
        identifier: &ParsedIdentifier,
    ) -> Result<StreamResponse, Error> {
        self.aggregator.resolve_streams(content_type, identifier).await
    }

    /// Releases relay sessions. The context stays usable for direct fetches afterwards.
    pub async fn shutdown(&self) {
        if let Some(relay) = &self.relay {
            info!("Releasing relay sessions");
            relay.shutdown().await;
        }
    }
}

pub type ContextPointer = Arc<Context>;
