use crate::Error;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Series,
}

impl ContentType {
    /// Accepts exactly `movie` or `series`.
    pub fn parse(value: &str) -> Result<Self, Error> {
        ContentType::from_str(value).map_err(|_| Error::InvalidContentType(value.to_string()))
    }
}

/// A title identifier with an optional episode coordinate. Zero is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, CopyGetters)]
pub struct ParsedIdentifier {
    #[get = "pub"]
    base_id: String,
    #[get_copy = "pub"]
    season: Option<u32>,
    #[get_copy = "pub"]
    episode: Option<u32>,
}

impl ParsedIdentifier {
    pub fn new(base_id: impl Into<String>, season: Option<u32>, episode: Option<u32>) -> Self {
        Self {
            base_id: base_id.into(),
            season: season.filter(|s| *s > 0),
            episode: episode.filter(|e| *e > 0),
        }
    }

    pub fn title(base_id: impl Into<String>) -> Self {
        Self::new(base_id, None, None)
    }

    pub fn episode_of(base_id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self::new(base_id, Some(season), Some(episode))
    }

    /// `(season, episode)` when both are known.
    pub fn episode_pair(&self) -> Option<(u32, u32)> {
        self.season.zip(self.episode)
    }
}

/// Input handed to every scraper.
#[derive(Debug, Clone, Getters)]
#[get = "pub"]
pub struct ScraperQuery {
    identifier: ParsedIdentifier,
    mirrors: Vec<String>,
}

impl ScraperQuery {
    pub fn new(identifier: ParsedIdentifier, mirrors: Vec<String>) -> Self {
        Self {
            identifier,
            mirrors,
        }
    }
}
