use crate::{Provider, CACHE_TTL_SECONDS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const PROXY_VARIABLES: [&str; 6] = [
    "https_proxy",
    "HTTPS_PROXY",
    "http_proxy",
    "HTTP_PROXY",
    "all_proxy",
    "ALL_PROXY",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub yts_urls: Vec<String>,
    pub eztv_urls: Vec<String>,
    pub tgx_urls: Vec<String>,
    /// Base URL of the anti-bot relay, e.g. `http://localhost:8191`.
    pub relay_url: Option<String>,
    /// Upper bound on relay sessions per provider. 0 disables session pools.
    pub relay_sessions: usize,
    /// Providers whose requests are sent through the relay when one is configured.
    pub relay_providers: Vec<Provider>,
    pub cache_ttl_hours: f64,
    /// Capacity of the in-memory cache. 0 disables caching.
    pub cache_max_entries: usize,
    pub fetch_timeout_ms: u64,
    pub user_agent: String,
    /// Optional IMDb `title.basics.tsv` dump used to build search queries.
    pub title_basics_path: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            yts_urls: vec!["https://yts.mx".to_string()],
            eztv_urls: vec!["https://eztvx.to".to_string()],
            tgx_urls: vec!["https://torrentgalaxy.one".to_string()],
            relay_url: None,
            relay_sessions: 2,
            relay_providers: vec![Provider::TorrentGalaxy],
            cache_ttl_hours: CACHE_TTL_SECONDS as f64 / 3600.0,
            cache_max_entries: 1000,
            fetch_timeout_ms: 10_000,
            user_agent: "stream-resolver".to_string(),
            title_basics_path: None,
        }
    }
}

impl ResolverConfig {
    pub fn mirrors(&self, provider: Provider) -> &[String] {
        match provider {
            Provider::Yts => &self.yts_urls,
            Provider::Eztv => &self.eztv_urls,
            Provider::TorrentGalaxy => &self.tgx_urls,
        }
    }

    /// TTL in whole seconds, never below one.
    pub fn cache_ttl_seconds(&self) -> u64 {
        let seconds = (self.cache_ttl_hours * 3600.0).round();
        if seconds.is_finite() && seconds >= 1.0 {
            seconds as u64
        } else {
            1
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn relay_enabled_for(&self, provider: Provider) -> bool {
        self.relay_url.is_some() && self.relay_providers.contains(&provider)
    }

    /// The outbound proxy the HTTP backend will pick up from the environment, if any.
    pub fn detected_proxy() -> Option<String> {
        PROXY_VARIABLES
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_defaults_to_one_week() {
        assert_eq!(ResolverConfig::default().cache_ttl_seconds(), 604_800);
    }

    #[test]
    fn ttl_never_drops_below_one_second() {
        let config = ResolverConfig {
            cache_ttl_hours: 0.0,
            ..Default::default()
        };
        assert_eq!(config.cache_ttl_seconds(), 1);

        let config = ResolverConfig {
            cache_ttl_hours: 0.5,
            ..Default::default()
        };
        assert_eq!(config.cache_ttl_seconds(), 1800);
    }

    #[test]
    fn relay_requires_url_and_opt_in() {
        let mut config = ResolverConfig::default();
        assert!(!config.relay_enabled_for(Provider::TorrentGalaxy));

        config.relay_url = Some("http://localhost:8191".to_string());
        assert!(config.relay_enabled_for(Provider::TorrentGalaxy));
        assert!(!config.relay_enabled_for(Provider::Eztv));
    }

    #[test]
    fn deserializes_partial_documents() {
        let config: ResolverConfig = serde_json::from_str(
            r#"{"eztv_urls": ["https://a.example", "https://b.example"], "relay_providers": ["eztv"]}"#,
        )
        .unwrap();
        assert_eq!(config.mirrors(Provider::Eztv).len(), 2);
        assert_eq!(config.relay_providers, vec![Provider::Eztv]);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
    }
}
