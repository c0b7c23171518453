use super::{Provider, StreamScraper};
use crate::fetch::{Fetch, FetchOptions};
use crate::utils::{extract_filename, parse_number, parse_size_to_bytes};
use crate::{BehaviorHints, Error, ParsedIdentifier, ScraperQuery, StreamCandidate};
use ::utils::urls::{build_url, normalize_base_url, resolve_link};
use async_trait::async_trait;
use futures::future::join_all;
use lazy_static::lazy_static;
use movie_info::TitleMetadata;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;

/// Most listing rows collected across all mirrors.
pub const CANDIDATE_CAP: usize = 20;

lazy_static! {
    static ref ROW: Selector = Selector::parse(".table-list-wrap tbody tr").expect("valid selector");
    static ref NAME_LINK: Selector = Selector::parse("td .tt-name a").expect("valid selector");
    static ref CELL: Selector = Selector::parse("td").expect("valid selector");
    static ref MAGNET_LINK: Selector = Selector::parse("a[href^='magnet:?']").expect("valid selector");
    static ref TORRENT_LINK: Selector = Selector::parse("a[href$='.torrent']").expect("valid selector");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListingRow {
    pub name: String,
    pub detail_url: String,
    pub size: String,
    pub seeders: u64,
    pub leechers: u64,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct DetailLinks {
    pub magnet: Option<String>,
    pub torrent: Option<String>,
}

impl DetailLinks {
    fn into_url(self) -> Option<String> {
        self.magnet.or(self.torrent)
    }
}

/// Search-listing scraper followed by a detail-page fetch per row.
pub struct TorrentGalaxy {
    fetcher: Arc<dyn Fetch>,
    metadata: Arc<dyn TitleMetadata>,
    options: FetchOptions,
}

impl TorrentGalaxy {
    pub fn new(fetcher: Arc<dyn Fetch>, metadata: Arc<dyn TitleMetadata>, options: FetchOptions) -> Self {
        Self {
            fetcher,
            metadata,
            options,
        }
    }

    /// Canonical title, plus an `SxxEyy` suffix for episodic requests.
    pub(crate) async fn build_query(&self, identifier: &ParsedIdentifier) -> String {
        let basics = self.metadata.title_basics(identifier.base_id()).await;
        let title = basics
            .as_ref()
            .and_then(|b| b.display_title())
            .unwrap_or(identifier.base_id().as_str());
        let suffix = episode_suffix(identifier);
        let episodic = basics.as_ref().is_some_and(|b| b.is_series()) || suffix.is_some();

        match suffix {
            Some(suffix) if episodic => format!("{} {}", title, suffix),
            _ => title.to_string(),
        }
    }

    /// Walks result pages of one mirror until `limit` rows or an empty page.
    /// `None` when the first page could not be fetched.
    async fn search_mirror(&self, base_url: &str, query: &str, limit: usize) -> Option<Vec<ListingRow>> {
        let base_url = normalize_base_url(base_url);
        let mut rows = Vec::new();
        let mut page = 1u32;

        while rows.len() < limit {
            let page_param = page.to_string();
            let url = match build_url(
                base_url,
                "/lmsearch",
                &[("q", query), ("category", "lmsearch"), ("page", page_param.as_str())],
            ) {
                Ok(url) => url,
                Err(err) => {
                    log::warn!("[TGx] invalid mirror {}: {}", base_url, err);
                    return None;
                }
            };

            let Some(html) = self.fetcher.fetch_text(url.as_str(), self.options).await else {
                if page == 1 {
                    return None;
                }
                break;
            };
            let batch = parse_search_results(&html, base_url, limit - rows.len());
            if batch.is_empty() {
                break;
            }
            rows.extend(batch);
            page += 1;
        }

        Some(rows)
    }

    async fn fetch_details(&self, detail_url: &str) -> Option<DetailLinks> {
        let html = self.fetcher.fetch_text(detail_url, self.options).await?;
        Some(parse_details(&html, detail_url))
    }
}

fn episode_suffix(identifier: &ParsedIdentifier) -> Option<String> {
    identifier
        .episode_pair()
        .map(|(season, episode)| format!("S{:02}E{:02}", season, episode))
}

fn cell_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub(crate) fn parse_search_results(html: &str, base_url: &str, limit: usize) -> Vec<ListingRow> {
    let document = Html::parse_document(html);
    let mut rows = Vec::new();

    for row in document.select(&ROW) {
        if rows.len() >= limit {
            break;
        }
        let Some(anchor) = row.select(&NAME_LINK).next() else {
            continue;
        };
        let Some(detail_url) = anchor
            .value()
            .attr("href")
            .and_then(|href| resolve_link(base_url, href))
        else {
            continue;
        };

        let cells: Vec<String> = row.select(&CELL).map(|cell| cell_text(&cell)).collect();
        let cell = |index: usize| cells.get(index).map(String::as_str).unwrap_or_default();

        rows.push(ListingRow {
            name: cell_text(&anchor),
            detail_url,
            size: cell(2).to_string(),
            seeders: parse_number(cell(3)),
            leechers: parse_number(cell(4)),
        });
    }
    rows
}

pub(crate) fn parse_details(html: &str, page_url: &str) -> DetailLinks {
    let document = Html::parse_document(html);
    let magnet = document
        .select(&MAGNET_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);
    let torrent = document
        .select(&TORRENT_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_link(page_url, href));
    DetailLinks { magnet, torrent }
}

/// First occurrence of each detail page wins.
fn dedupe_rows(rows: Vec<ListingRow>) -> Vec<ListingRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.detail_url.clone()))
        .collect()
}

fn format_title(row: &ListingRow) -> String {
    let base = if row.name.is_empty() { "TGx" } else { row.name.as_str() };

    let mut parts = Vec::new();
    if row.seeders > 0 {
        parts.push(format!("S:{}", row.seeders));
    }
    if row.leechers > 0 {
        parts.push(format!("L:{}", row.leechers));
    }
    if !row.size.is_empty() {
        parts.push(row.size.clone());
    }

    if parts.is_empty() {
        base.to_string()
    } else {
        format!("{} ({})", base, parts.join(" • "))
    }
}

#[async_trait]
impl StreamScraper for TorrentGalaxy {
    fn provider(&self) -> Provider {
        Provider::TorrentGalaxy
    }

    async fn scrape(&self, query: &ScraperQuery) -> Result<Vec<StreamCandidate>, Error> {
        let search = self.build_query(query.identifier()).await;
        log::debug!("[TGx] searching for {:?}", search);

        let mut rows = Vec::new();
        let mut responded = false;
        for mirror in query.mirrors() {
            if rows.len() >= CANDIDATE_CAP {
                break;
            }
            if let Some(batch) = self.search_mirror(mirror, &search, CANDIDATE_CAP - rows.len()).await {
                responded = true;
                rows.extend(batch);
            }
        }
        if !query.mirrors().is_empty() && !responded {
            return Err(Error::upstream(Provider::TorrentGalaxy, "no mirror responded"));
        }

        let rows = dedupe_rows(rows);
        let details = join_all(rows.iter().map(|row| self.fetch_details(&row.detail_url))).await;

        let streams: Vec<StreamCandidate> = rows
            .iter()
            .zip(details)
            .filter_map(|(row, details)| {
                let url = details?.into_url()?;
                Some(
                    StreamCandidate::new(Provider::TorrentGalaxy.to_string(), format_title(row), url)
                        .with_seeders(Some(row.seeders).filter(|s| *s > 0))
                        .with_behavior_hints(BehaviorHints::new(
                            parse_size_to_bytes(&row.size),
                            extract_filename(&row.name),
                        )),
                )
            })
            .collect();

        log::debug!(
            "[TGx] {} stream(s) from {} listing row(s)",
            streams.len(),
            rows.len()
        );
        Ok(streams)
    }
}
