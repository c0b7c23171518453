//! Cache-aside fan-out over the configured scrapers.

use crate::cache::{CacheKey, SharedCache};
use crate::client::{Provider, StreamScraper};
use crate::fetch::{Fetch, FetchOptions, RelayPools};
use crate::{
    ContentType, Eztv, Error, ParsedIdentifier, ResolverConfig, ScraperQuery, StreamCandidate,
    StreamResponse, TorrentGalaxy, Yts,
};
use futures::future::join_all;
use movie_info::TitleMetadata;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One week.
pub const CACHE_TTL_SECONDS: u64 = 604_800;

pub struct StreamAggregator {
    cache: SharedCache,
    ttl_seconds: u64,
    movie_scrapers: Vec<Arc<dyn StreamScraper>>,
    series_scrapers: Vec<Arc<dyn StreamScraper>>,
    mirrors: HashMap<Provider, Vec<String>>,
}

impl StreamAggregator {
    /// An aggregator with no scrapers; add them in priority order.
    pub fn new(cache: SharedCache, ttl_seconds: u64) -> Self {
        Self {
            cache,
            ttl_seconds,
            movie_scrapers: Vec::new(),
            series_scrapers: Vec::new(),
            mirrors: HashMap::new(),
        }
    }

    /// Movies: YTS then TGx. Series: EZTV then TGx.
    pub fn from_config(
        config: &ResolverConfig,
        fetcher: Arc<dyn Fetch>,
        metadata: Arc<dyn TitleMetadata>,
        relay: &RelayPools,
        cache: SharedCache,
    ) -> Self {
        let options = |provider: Provider| {
            if relay.uses_relay(provider) {
                FetchOptions::relayed(provider, config.fetch_timeout())
            } else {
                FetchOptions::direct(config.fetch_timeout())
            }
        };

        let yts: Arc<dyn StreamScraper> = Arc::new(Yts::new(fetcher.clone(), options(Provider::Yts)));
        let eztv: Arc<dyn StreamScraper> = Arc::new(Eztv::new(fetcher.clone(), options(Provider::Eztv)));
        let tgx: Arc<dyn StreamScraper> = Arc::new(TorrentGalaxy::new(
            fetcher,
            metadata,
            options(Provider::TorrentGalaxy),
        ));

        let mut aggregator = Self::new(cache, config.cache_ttl_seconds())
            .with_movie_scraper(yts)
            .with_movie_scraper(tgx.clone())
            .with_series_scraper(eztv)
            .with_series_scraper(tgx);
        for provider in [Provider::Yts, Provider::Eztv, Provider::TorrentGalaxy] {
            aggregator = aggregator.with_mirrors(provider, config.mirrors(provider).to_vec());
        }
        aggregator
    }

    pub fn with_movie_scraper(mut self, scraper: Arc<dyn StreamScraper>) -> Self {
        self.movie_scrapers.push(scraper);
        self
    }

    pub fn with_series_scraper(mut self, scraper: Arc<dyn StreamScraper>) -> Self {
        self.series_scrapers.push(scraper);
        self
    }

    pub fn with_mirrors(mut self, provider: Provider, mirrors: Vec<String>) -> Self {
        self.mirrors.insert(provider, mirrors);
        self
    }

    fn scrapers(&self, content_type: ContentType) -> &[Arc<dyn StreamScraper>] {
        match content_type {
            ContentType::Movie => &self.movie_scrapers,
            ContentType::Series => &self.series_scrapers,
        }
    }

    /// Resolves a request to a deduplicated stream list.
    ///
    /// Only an unsupported `content_type` is an error. A cached response is returned unchanged;
    /// otherwise every scraper for the content type runs to completion, the fulfilled ones are
    /// merged in priority order, and the result (even an empty one) is written back.
    pub async fn resolve_streams(
        &self,
        content_type: &str,
        identifier: &ParsedIdentifier,
    ) -> Result<StreamResponse, Error> {
        let content_type = ContentType::parse(content_type)?;
        let key = CacheKey::for_request(content_type, identifier);

        if let Some(cached) = self.read_cache(&key).await {
            log::info!("Returning cached streams for {}", key);
            return Ok(cached);
        }

        let results = self.scrape_all(content_type, identifier).await;
        let response = merge_streams(results);
        log::info!("Resolved {} stream(s) for {}", response.len(), key);

        self.write_cache(&key, &response).await;
        Ok(response)
    }

    async fn read_cache(&self, key: &CacheKey) -> Option<StreamResponse> {
        let payload = match self.cache.get(key).await {
            Ok(payload) => payload?,
            Err(err) => {
                log::warn!("Cache read for {} failed, treating as miss: {}", key, err);
                return None;
            }
        };
        match serde_json::from_str(&payload) {
            Ok(response) => Some(response),
            Err(err) => {
                log::warn!("{} for {}, treating as miss", Error::from(err), key);
                None
            }
        }
    }

    async fn write_cache(&self, key: &CacheKey, response: &StreamResponse) {
        let payload = match serde_json::to_string(response) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("Could not serialize streams for {}: {}", key, err);
                return;
            }
        };
        if let Err(err) = self.cache.set(key, payload, self.ttl_seconds).await {
            log::warn!("Cache write for {} failed: {}", key, err);
        }
    }

    /// Runs every scraper concurrently and waits for all of them. Fulfilled outputs come back in
    /// scraper priority order regardless of completion order; rejected ones are dropped.
    async fn scrape_all(
        &self,
        content_type: ContentType,
        identifier: &ParsedIdentifier,
    ) -> Vec<Vec<StreamCandidate>> {
        let scrapers = self.scrapers(content_type);
        let handles = scrapers.iter().map(|scraper| {
            let scraper = Arc::clone(scraper);
            let mirrors = self.mirrors.get(&scraper.provider()).cloned().unwrap_or_default();
            let query = ScraperQuery::new(identifier.clone(), mirrors);
            tokio::spawn(async move { scraper.scrape(&query).await })
        });
        let settled = join_all(handles).await;

        scrapers
            .iter()
            .zip(settled)
            .filter_map(|(scraper, outcome)| {
                let provider = scraper.provider();
                let outcome = outcome.unwrap_or_else(|err| {
                    Err(Error::TaskAborted {
                        provider,
                        message: err.to_string(),
                    })
                });
                match outcome {
                    Ok(streams) => {
                        log::debug!("{} contributed {} stream(s)", provider, streams.len());
                        Some(streams)
                    }
                    Err(err) => {
                        log::warn!("{} contributed nothing: {}", provider, err);
                        None
                    }
                }
            })
            .collect()
    }
}

/// Concatenates per-scraper outputs in order, keeping the first candidate for each `url`.
pub fn merge_streams(results: Vec<Vec<StreamCandidate>>) -> StreamResponse {
    let mut seen = HashSet::new();
    let streams = results
        .into_iter()
        .flatten()
        .filter(|stream| seen.insert(stream.url().clone()))
        .collect();
    StreamResponse { streams }
}
