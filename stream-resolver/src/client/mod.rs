pub mod eztv;
pub mod torrent_galaxy;
pub mod yts;

use crate::{Error, ScraperQuery, StreamCandidate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[strum(to_string = "YTS")]
    Yts,
    #[strum(to_string = "EZTV")]
    Eztv,
    #[strum(to_string = "TGx")]
    TorrentGalaxy,
}

impl Provider {
    /// Short lowercase identifier, stable across releases.
    pub fn slug(&self) -> &'static str {
        match self {
            Provider::Yts => "yts",
            Provider::Eztv => "eztv",
            Provider::TorrentGalaxy => "tgx",
        }
    }
}

/// One upstream source. Implementations swallow per-mirror and per-record failures and only
/// return `Err` when the source as a whole produced nothing usable.
#[async_trait]
pub trait StreamScraper: Send + Sync {
    fn provider(&self) -> Provider;

    async fn scrape(&self, query: &ScraperQuery) -> Result<Vec<StreamCandidate>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names() {
        assert_eq!(Provider::TorrentGalaxy.to_string(), "TGx");
        assert_eq!(Provider::Eztv.slug(), "eztv");
        assert_eq!(<Provider as strum::IntoEnumIterator>::iter().count(), 3);
        assert_eq!(
            serde_json::from_str::<Provider>("\"torrentgalaxy\"").unwrap(),
            Provider::TorrentGalaxy
        );
    }
}
