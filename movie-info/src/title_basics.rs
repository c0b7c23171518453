use getset::Getters;
use serde::{Deserialize, Serialize};

const SERIES_TITLE_TYPES: [&str; 3] = ["tvseries", "tvminiseries", "tvepisode"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[get = "pub"]
pub struct TitleBasics {
    primary_title: Option<String>,
    original_title: Option<String>,
    title_type: Option<String>,
}

impl TitleBasics {
    pub fn new(
        primary_title: Option<String>,
        original_title: Option<String>,
        title_type: Option<String>,
    ) -> Self {
        Self {
            primary_title: non_empty(primary_title),
            original_title: non_empty(original_title),
            title_type: non_empty(title_type),
        }
    }

    /// Primary title, else original title.
    pub fn display_title(&self) -> Option<&str> {
        self.primary_title
            .as_deref()
            .or(self.original_title.as_deref())
    }

    /// Whether the title type marks a series, mini-series or single episode.
    pub fn is_series(&self) -> bool {
        self.title_type.as_deref().is_some_and(|kind| {
            let kind = kind.to_lowercase();
            SERIES_TITLE_TYPES.contains(&kind.as_str())
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && v != "\\N")
}
