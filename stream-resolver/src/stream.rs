use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

/// Optional hints a player can use before opening the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl BehaviorHints {
    /// Returns `None` when neither hint is known.
    pub fn new(video_size: Option<u64>, filename: Option<String>) -> Option<Self> {
        let video_size = video_size.filter(|size| *size > 0);
        if video_size.is_none() && filename.is_none() {
            return None;
        }
        Some(Self {
            video_size,
            filename,
        })
    }
}

/// One downloadable link produced by a scraper from a single upstream record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, CopyGetters)]
#[serde(rename_all = "camelCase")]
pub struct StreamCandidate {
    #[serde(rename = "name")]
    #[get = "pub"]
    display_name: String,
    #[get = "pub"]
    title: String,
    /// Magnet URI or `.torrent` URL.
    #[get = "pub"]
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[get_copy = "pub"]
    seeders: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[get = "pub"]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[get = "pub"]
    behavior_hints: Option<BehaviorHints>,
}

impl StreamCandidate {
    pub fn new(
        display_name: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            title: title.into(),
            url: url.into(),
            seeders: None,
            description: None,
            behavior_hints: None,
        }
    }

    pub fn with_seeders(mut self, seeders: Option<u64>) -> Self {
        self.seeders = seeders;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_behavior_hints(mut self, hints: Option<BehaviorHints>) -> Self {
        self.behavior_hints = hints;
        self
    }
}

/// Ordered streams; no two share a `url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamResponse {
    pub streams: Vec<StreamCandidate>,
}

impl StreamResponse {
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.streams.iter().map(|stream| stream.url().as_str())
    }
}
