use super::{Provider, StreamScraper};
use crate::display::{format_stream_display, DisplayOptions};
use crate::fetch::{fetch_json, Fetch, FetchOptions};
use crate::utils::lenient_u64;
use crate::{BehaviorHints, Error, ScraperQuery, StreamCandidate};
use ::utils::urls::{build_url, normalize_base_url};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

const ADDON_PREFIX: &str = "LT";

/// Text fields are optional because the API sends `null` for them as often as it omits them.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct YtsTorrent {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub seeds: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct YtsMovie {
    #[serde(default)]
    pub imdb_code: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_long: Option<String>,
    #[serde(default)]
    pub torrents: Option<Vec<YtsTorrent>>,
}

#[derive(Debug, Default, Deserialize)]
struct YtsData {
    #[serde(default)]
    movies: Option<Vec<YtsMovie>>,
}

#[derive(Debug, Default, Deserialize)]
struct YtsResponse {
    #[serde(default)]
    data: Option<YtsData>,
}

/// Movie list API returning every quality variant of a title in one call.
pub struct Yts {
    fetcher: Arc<dyn Fetch>,
    options: FetchOptions,
}

impl Yts {
    pub fn new(fetcher: Arc<dyn Fetch>, options: FetchOptions) -> Self {
        Self { fetcher, options }
    }

    async fn fetch_movies(&self, base_url: &str, imdb_id: &str) -> Option<Vec<YtsMovie>> {
        let url = match list_url(base_url, imdb_id) {
            Ok(url) => url,
            Err(err) => {
                log::warn!("[YTS] invalid mirror {}: {}", base_url, err);
                return None;
            }
        };
        let response: YtsResponse = fetch_json(self.fetcher.as_ref(), &url, self.options).await?;
        Some(response.data.and_then(|d| d.movies).unwrap_or_default())
    }
}

/// Appends the default API root unless the mirror already names one.
fn api_root(base_url: &str) -> String {
    let base_url = normalize_base_url(base_url);
    if base_url.contains("/api/") {
        base_url.to_string()
    } else {
        format!("{}/api/v2", base_url)
    }
}

fn list_url(base_url: &str, imdb_id: &str) -> Result<String, ::utils::urls::ParseError> {
    build_url(
        &api_root(base_url),
        "/list_movies.json",
        &[("query_term", imdb_id), ("limit", "1")],
    )
    .map(String::from)
}

fn magnet_uri(hash: &str, name: &str) -> String {
    format!(
        "magnet:?xt=urn:btih:{}&dn={}",
        hash.to_lowercase(),
        urlencoding::encode(name)
    )
}

/// Variants ordered by seed count, highest first; ties keep upstream order.
fn sorted_by_seeds(torrents: &[YtsTorrent]) -> Vec<&YtsTorrent> {
    let mut sorted: Vec<&YtsTorrent> = torrents.iter().collect();
    sorted.sort_by_key(|torrent| Reverse(torrent.seeds.unwrap_or(0)));
    sorted
}

fn to_candidate(movie: &YtsMovie, torrent: &YtsTorrent, hash: &str) -> StreamCandidate {
    let imdb_title = [movie.title_long.as_deref(), movie.title.as_deref()]
        .into_iter()
        .flatten()
        .find(|title| !title.is_empty())
        .unwrap_or("YTS");
    let quality = [torrent.quality.as_deref(), torrent.kind.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let torrent_name = format!("{} {}", imdb_title, quality).trim().to_string();

    let display = format_stream_display(&DisplayOptions {
        addon_prefix: ADDON_PREFIX,
        imdb_title,
        torrent_name: Some(&torrent_name),
        quality: Some(&quality),
        seeders: torrent.seeds,
        size_bytes: torrent.size_bytes,
        ..Default::default()
    });

    StreamCandidate::new(display.name, display.title, magnet_uri(hash, &torrent_name))
        .with_seeders(torrent.seeds)
        .with_description(display.description)
        .with_behavior_hints(BehaviorHints::new(torrent.size_bytes, None))
}

#[async_trait]
impl StreamScraper for Yts {
    fn provider(&self) -> Provider {
        Provider::Yts
    }

    async fn scrape(&self, query: &ScraperQuery) -> Result<Vec<StreamCandidate>, Error> {
        let imdb_id = query.identifier().base_id();
        let responses = join_all(
            query
                .mirrors()
                .iter()
                .map(|mirror| self.fetch_movies(mirror, imdb_id)),
        )
        .await;

        if !responses.is_empty() && responses.iter().all(Option::is_none) {
            return Err(Error::upstream(Provider::Yts, "no mirror responded"));
        }

        let mut seen = HashSet::new();
        let streams: Vec<StreamCandidate> = responses
            .iter()
            .flatten()
            .flatten()
            .filter(|movie| movie.imdb_code.as_deref() == Some(imdb_id.as_str()))
            .flat_map(|movie| {
                let torrents = movie.torrents.as_deref().unwrap_or_default();
                sorted_by_seeds(torrents)
                    .into_iter()
                    .map(move |torrent| (movie, torrent))
            })
            .filter_map(|(movie, torrent)| {
                let hash = torrent.hash.as_deref().filter(|hash| !hash.is_empty())?;
                seen.insert(hash.to_lowercase()).then(|| to_candidate(movie, torrent, hash))
            })
            .collect();

        log::debug!("[YTS] {} stream(s) for {}", streams.len(), imdb_id);
        Ok(streams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(hash: &str, quality: &str, seeds: u64) -> YtsTorrent {
        YtsTorrent {
            hash: Some(hash.to_string()),
            quality: Some(quality.to_string()),
            kind: Some("web".to_string()),
            seeds: Some(seeds),
            size_bytes: Some(1024),
        }
    }

    #[test]
    fn api_root_is_appended_once() {
        assert_eq!(api_root("https://yts.example/"), "https://yts.example/api/v2");
        assert_eq!(api_root("https://yts.example/api/v2/"), "https://yts.example/api/v2");
        assert_eq!(
            list_url("https://yts.example", "tt0133093").unwrap(),
            "https://yts.example/api/v2/list_movies.json?query_term=tt0133093&limit=1"
        );
    }

    #[test]
    fn sorts_by_seeds_descending_and_stably() {
        let torrents = vec![
            variant("a", "720p", 5),
            variant("b", "1080p", 50),
            variant("c", "2160p", 5),
        ];
        let order: Vec<&str> = sorted_by_seeds(&torrents)
            .iter()
            .filter_map(|t| t.hash.as_deref())
            .collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn candidate_carries_display_and_size_hint() {
        let movie = YtsMovie {
            imdb_code: Some("tt0133093".to_string()),
            title: Some("The Matrix".to_string()),
            title_long: Some("The Matrix (1999)".to_string()),
            torrents: None,
        };
        let candidate = to_candidate(&movie, &variant("ABCDEF", "1080p", 42), "ABCDEF");
        assert_eq!(candidate.display_name(), "🧲 LT 1080p web");
        assert_eq!(
            candidate.url(),
            "magnet:?xt=urn:btih:abcdef&dn=The%20Matrix%20%281999%29%201080p%20web"
        );
        assert_eq!(candidate.seeders(), Some(42));
        assert_eq!(
            candidate.behavior_hints().as_ref().and_then(|h| h.video_size),
            Some(1024)
        );
        assert!(candidate.title().starts_with("🎬 The Matrix (1999)"));

        let r#unsized = YtsTorrent {
            size_bytes: Some(0),
            ..variant("abc", "720p", 1)
        };
        assert!(to_candidate(&movie, &r#unsized, "abc").behavior_hints().is_none());
    }
}
