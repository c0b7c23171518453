use crate::{TitleBasics, TitleMetadata};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to open title basics dump: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed title basics dump: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct TitleBasicsRow {
    tconst: String,
    #[serde(rename = "titleType")]
    title_type: Option<String>,
    #[serde(rename = "primaryTitle")]
    primary_title: Option<String>,
    #[serde(rename = "originalTitle")]
    original_title: Option<String>,
}

/// In-memory lookup over an IMDb `title.basics.tsv` dump.
#[derive(Debug, Default)]
pub struct TitleBasicsIndex {
    titles: HashMap<String, TitleBasics>,
}

impl TitleBasicsIndex {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let file = std::fs::File::open(path.as_ref())?;
        let index = Self::from_reader(file)?;
        log::info!(
            "Loaded {} titles from {}",
            index.len(),
            path.as_ref().display()
        );
        Ok(index)
    }

    /// Reads a tab-separated dump with a header row. Unknown columns are ignored.
    pub fn from_reader(reader: impl Read) -> Result<Self, IndexError> {
        let mut csv = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .from_reader(reader);

        let mut titles = HashMap::new();
        for row in csv.deserialize::<TitleBasicsRow>() {
            let row = row?;
            let basics = TitleBasics::new(row.primary_title, row.original_title, row.title_type);
            titles.insert(row.tconst, basics);
        }
        Ok(Self { titles })
    }

    pub fn insert(&mut self, base_id: impl Into<String>, basics: TitleBasics) {
        self.titles.insert(base_id.into(), basics);
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

#[async_trait]
impl TitleMetadata for TitleBasicsIndex {
    async fn title_basics(&self, base_id: &str) -> Option<TitleBasics> {
        self.titles.get(base_id).cloned()
    }
}
