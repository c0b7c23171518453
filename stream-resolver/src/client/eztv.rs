use super::{Provider, StreamScraper};
use crate::fetch::{fetch_json, Fetch, FetchOptions};
use crate::utils::{extract_filename, lenient_u32, lenient_u64};
use crate::{BehaviorHints, Error, ParsedIdentifier, ScraperQuery, StreamCandidate};
use ::utils::urls::build_url;
use async_trait::async_trait;
use bytesize::GIB;
use futures::future::join_all;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

const DEFAULT_LIMIT: u64 = 30;
const MAX_PAGES: u64 = 50;
const PAGE_CONCURRENCY: usize = 5;

lazy_static! {
    /// Tried in order; the first pattern that matches decides.
    static ref EPISODE_PATTERNS: [Regex; 3] = [
        Regex::new(r"(?i)season\s*(\d{1,2})[\s._-]*episode\s*(\d{1,2})").expect("valid long form"),
        Regex::new(r"(?i)s(\d{1,2})\s*e(\d{1,2})").expect("valid short form"),
        Regex::new(r"(?i)(?:^|[^0-9])(\d{1,2})x(\d{1,2})(?:[^0-9]|$)").expect("valid NxM form"),
    ];
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct EztvTorrent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub torrent_url: Option<String>,
    #[serde(default)]
    pub magnet_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub seeds: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub size_bytes: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub season: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub episode: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct EztvResponse {
    #[serde(default)]
    torrents: Option<Vec<EztvTorrent>>,
    #[serde(default, deserialize_with = "lenient_u64")]
    torrents_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    limit: Option<u64>,
}

/// Paginated JSON API keyed by the numeric part of an IMDb id.
pub struct Eztv {
    fetcher: Arc<dyn Fetch>,
    options: FetchOptions,
}

impl Eztv {
    pub fn new(fetcher: Arc<dyn Fetch>, options: FetchOptions) -> Self {
        Self { fetcher, options }
    }

    async fn fetch_page(&self, base_url: &str, imdb_id: &str, page: u64) -> Option<EztvResponse> {
        let page = page.to_string();
        let url = match build_url(
            base_url,
            "/api/get-torrents",
            &[("imdb_id", imdb_id), ("page", page.as_str())],
        ) {
            Ok(url) => url,
            Err(err) => {
                log::warn!("[EZTV] invalid mirror {}: {}", base_url, err);
                return None;
            }
        };
        fetch_json(self.fetcher.as_ref(), url.as_str(), self.options).await
    }

    /// Collects every record the mirror reports for `imdb_id`. `None` when page 1 itself failed.
    pub(crate) async fn fetch_all_torrents(
        &self,
        base_url: &str,
        imdb_id: &str,
    ) -> Option<Vec<EztvTorrent>> {
        let first = self.fetch_page(base_url, imdb_id, 1).await?;
        let mut torrents = first.torrents.unwrap_or_default();
        let expected_total = first.torrents_count;
        let page_limit = first.limit.filter(|limit| *limit > 0).unwrap_or(DEFAULT_LIMIT);
        let total_reached = |count: usize| expected_total.is_some_and(|total| count as u64 >= total);

        if torrents.is_empty() || total_reached(torrents.len()) || (torrents.len() as u64) < page_limit {
            log::debug!("[EZTV] {} {}: single page, {} record(s)", base_url, imdb_id, torrents.len());
            return Some(torrents);
        }

        let total_pages = expected_total
            .map(|total| total.div_ceil(page_limit))
            .unwrap_or(MAX_PAGES);
        let last_page = total_pages.min(MAX_PAGES);
        let pages: Vec<u64> = (2..=last_page).collect();

        for batch in pages.chunks(PAGE_CONCURRENCY) {
            let responses = join_all(
                batch
                    .iter()
                    .map(|page| self.fetch_page(base_url, imdb_id, *page)),
            )
            .await;

            // A short or failed page only ends the current batch.
            for response in responses {
                let records = response.and_then(|r| r.torrents).unwrap_or_default();
                let short_page = (records.len() as u64) < page_limit;
                torrents.extend(records);
                if short_page || total_reached(torrents.len()) {
                    break;
                }
            }
            if total_reached(torrents.len()) {
                break;
            }
        }

        log::debug!(
            "[EZTV] {} {}: {} record(s) across up to {} page(s)",
            base_url,
            imdb_id,
            torrents.len(),
            last_page
        );
        Some(torrents)
    }
}

/// Season and episode named in free text, using the first pattern that matches.
pub(crate) fn parse_episode_from_text(text: &str) -> Option<(u32, u32)> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    EPISODE_PATTERNS.iter().find_map(|pattern| {
        let captures = pattern.captures(&normalized)?;
        let season = captures[1].parse().ok()?;
        let episode = captures[2].parse().ok()?;
        Some((season, episode))
    })
}

pub(crate) fn matches_episode(torrent: &EztvTorrent, identifier: &ParsedIdentifier) -> bool {
    let Some(wanted) = identifier.episode_pair() else {
        return true;
    };

    match (torrent.season, torrent.episode) {
        (Some(season), Some(episode)) if season > 0 && episode > 0 => (season, episode) == wanted,
        _ => [torrent.title.as_deref(), torrent.filename.as_deref()]
            .into_iter()
            .flatten()
            .find_map(parse_episode_from_text)
            .is_some_and(|parsed| parsed == wanted),
    }
}

fn format_title(torrent: &EztvTorrent) -> String {
    let base = torrent
        .title
        .as_deref()
        .or(torrent.filename.as_deref())
        .unwrap_or("EZTV");

    let mut parts = Vec::new();
    if let Some(seeds) = torrent.seeds.filter(|s| *s > 0) {
        parts.push(format!("S:{}", seeds));
    }
    if let Some(size) = torrent.size_bytes.filter(|s| *s > 0) {
        parts.push(format!("{:.2} GiB", size as f64 / GIB as f64));
    }

    if parts.is_empty() {
        base.to_string()
    } else {
        format!("{} ({})", base, parts.join(" • "))
    }
}

fn link(torrent: &EztvTorrent) -> Option<&str> {
    torrent
        .magnet_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .or(torrent.torrent_url.as_deref().filter(|url| !url.is_empty()))
}

#[async_trait]
impl StreamScraper for Eztv {
    fn provider(&self) -> Provider {
        Provider::Eztv
    }

    async fn scrape(&self, query: &ScraperQuery) -> Result<Vec<StreamCandidate>, Error> {
        let identifier = query.identifier();
        let base_id = identifier.base_id().as_str();
        let digits = base_id.strip_prefix("tt").unwrap_or(base_id);
        let imdb_ids = [digits.to_string(), format!("tt{}", digits)];

        let jobs = query.mirrors().iter().flat_map(|mirror| {
            imdb_ids
                .iter()
                .map(move |imdb_id| self.fetch_all_torrents(mirror, imdb_id))
        });
        let responses = join_all(jobs).await;

        if !responses.is_empty() && responses.iter().all(Option::is_none) {
            return Err(Error::upstream(Provider::Eztv, "no mirror responded"));
        }

        let mut seen = HashSet::new();
        let streams: Vec<StreamCandidate> = responses
            .into_iter()
            .flatten()
            .flatten()
            .filter(|torrent| matches_episode(torrent, identifier))
            .filter_map(|torrent| {
                let url = link(&torrent)?.to_string();
                if !seen.insert(url.clone()) {
                    return None;
                }
                let filename = torrent
                    .filename
                    .clone()
                    .or_else(|| torrent.title.as_deref().and_then(extract_filename));
                Some(
                    StreamCandidate::new(Provider::Eztv.to_string(), format_title(&torrent), url)
                        .with_seeders(torrent.seeds)
                        .with_behavior_hints(BehaviorHints::new(torrent.size_bytes, filename)),
                )
            })
            .collect();

        log::debug!("[EZTV] {} stream(s) for {}", streams.len(), base_id);
        Ok(streams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torrent(title: &str, season: Option<u32>, episode: Option<u32>) -> EztvTorrent {
        EztvTorrent {
            title: Some(title.to_string()),
            season,
            episode,
            ..Default::default()
        }
    }

    #[test]
    fn parses_episode_forms_in_priority_order() {
        assert_eq!(parse_episode_from_text("Show Season 02 Episode 05 720p"), Some((2, 5)));
        assert_eq!(parse_episode_from_text("Show   season 3  episode 10"), Some((3, 10)));
        assert_eq!(parse_episode_from_text("Show.S02E05.1080p"), Some((2, 5)));
        assert_eq!(parse_episode_from_text("Show s2 e7"), Some((2, 7)));
        assert_eq!(parse_episode_from_text("Show 2x05 HDTV"), Some((2, 5)));
        assert_eq!(parse_episode_from_text("Show 1920x1080 WEB"), None);
        assert_eq!(parse_episode_from_text("Show Complete Series"), None);
    }

    #[test]
    fn explicit_fields_win_over_text() {
        let id = ParsedIdentifier::episode_of("tt1", 2, 5);
        assert!(matches_episode(&torrent("Show S09E09", Some(2), Some(5)), &id));
        assert!(!matches_episode(&torrent("Show S02E05", Some(2), Some(6)), &id));
    }

    #[test]
    fn zero_fields_fall_back_to_text() {
        let id = ParsedIdentifier::episode_of("tt1", 2, 5);
        assert!(matches_episode(&torrent("Show S02E05 1080p", Some(0), Some(0)), &id));
        assert!(matches_episode(&torrent("Show S02E05 1080p", None, None), &id));
        assert!(!matches_episode(&torrent("Show 1080p", None, None), &id));

        let other = ParsedIdentifier::episode_of("tt1", 2, 6);
        assert!(!matches_episode(&torrent("Show S02E05 1080p", None, None), &other));
    }

    #[test]
    fn filename_is_consulted_when_title_has_no_episode() {
        let id = ParsedIdentifier::episode_of("tt1", 1, 3);
        let record = EztvTorrent {
            title: Some("Show 720p".to_string()),
            filename: Some("Show.S01E03.720p.mkv".to_string()),
            ..Default::default()
        };
        assert!(matches_episode(&record, &id));
    }

    #[test]
    fn title_only_requests_accept_everything() {
        let id = ParsedIdentifier::title("tt1");
        assert!(matches_episode(&torrent("Anything", None, None), &id));
    }

    #[test]
    fn title_includes_seeds_and_size() {
        let record = EztvTorrent {
            title: Some("Show S01E01".to_string()),
            seeds: Some(42),
            size_bytes: Some(GIB + GIB / 2),
            ..Default::default()
        };
        assert_eq!(format_title(&record), "Show S01E01 (S:42 • 1.50 GiB)");

        let bare = EztvTorrent::default();
        assert_eq!(format_title(&bare), "EZTV");
    }

    #[test]
    fn magnet_is_preferred_over_torrent_file() {
        let record = EztvTorrent {
            magnet_url: Some("magnet:?xt=urn:btih:abc".to_string()),
            torrent_url: Some("https://eztv.example/a.torrent".to_string()),
            ..Default::default()
        };
        assert_eq!(link(&record), Some("magnet:?xt=urn:btih:abc"));

        let record = EztvTorrent {
            magnet_url: Some(String::new()),
            torrent_url: Some("https://eztv.example/a.torrent".to_string()),
            ..Default::default()
        };
        assert_eq!(link(&record), Some("https://eztv.example/a.torrent"));
    }
}
