//! Human-readable stream labels.

use lazy_static::lazy_static;
use regex::Regex;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

lazy_static! {
    static ref NON_ALPHANUMERIC: Regex = Regex::new(r"[^a-zA-Z0-9]+").expect("valid pattern");
    static ref SEPARATORS: Regex = Regex::new(r"[._]+").expect("valid pattern");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid pattern");
    static ref EDGE_PUNCTUATION: Regex =
        Regex::new(r"(?i)^[^a-z0-9]+|[^a-z0-9]+$").expect("valid pattern");
}

#[derive(Debug, Clone, Default)]
pub struct DisplayOptions<'a> {
    pub addon_prefix: &'a str,
    pub imdb_title: &'a str,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub torrent_name: Option<&'a str>,
    pub quality: Option<&'a str>,
    pub seeders: Option<u64>,
    pub size_bytes: Option<u64>,
    pub size_label: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDisplay {
    pub name: String,
    pub title: String,
    pub description: Option<String>,
}

pub fn format_stream_display(options: &DisplayOptions<'_>) -> StreamDisplay {
    let name = match options.quality.map(str::trim).filter(|q| !q.is_empty()) {
        Some(quality) => format!("🧲 {} {}", options.addon_prefix, quality),
        None => format!("🧲 {}", options.addon_prefix),
    };

    let episode = options.season.zip(options.episode).filter(|(s, e)| *s > 0 && *e > 0);
    let emoji = if episode.is_some() { "📺" } else { "🎬" };

    let mut lines = vec![format!("{} {}", emoji, options.imdb_title)];
    if let Some((season, episode)) = episode {
        lines.push(format!("📌 S{:02}E{:02}", season, episode));
    }
    if let Some(slug) = torrent_slug(options.torrent_name, options.imdb_title) {
        lines.push(format!("🏷️ {}", slug));
    }

    StreamDisplay {
        name,
        title: lines.join("\n"),
        description: info_line(options.seeders, options.size_bytes, options.size_label),
    }
}

/// Torrent name with the title removed and separators tidied; what remains is usually the
/// release tag (resolution, codec, group).
fn torrent_slug(torrent_name: Option<&str>, imdb_title: &str) -> Option<String> {
    let mut stripped = torrent_name?.to_string();
    if let Some(pattern) = title_pattern(imdb_title) {
        stripped = pattern.replace(&stripped, "").into_owned();
    }
    let cleaned = SEPARATORS.replace_all(&stripped, " ");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let cleaned = EDGE_PUNCTUATION.replace_all(&cleaned, "");
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Case-insensitive pattern for a title where any run of punctuation matches any other.
fn title_pattern(title: &str) -> Option<Regex> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return None;
    }
    let pattern = NON_ALPHANUMERIC.replace_all(trimmed, "[^a-z0-9]+");
    Regex::new(&format!("(?i){}", pattern)).ok()
}

fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let precision = if value >= 10.0 || unit == 0 { 0 } else { 2 };
    format!("{:.*} {}", precision, value, SIZE_UNITS[unit])
}

fn info_line(seeders: Option<u64>, size_bytes: Option<u64>, size_label: Option<&str>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(seeders) = seeders.filter(|s| *s > 0) {
        parts.push(format!("🌱 {}", seeders));
    }
    match (size_bytes.filter(|b| *b > 0), size_label.map(str::trim).filter(|l| !l.is_empty())) {
        (Some(bytes), _) => parts.push(format!("💾 {}", format_bytes(bytes))),
        (None, Some(label)) => parts.push(format!("💾 {}", label)),
        (None, None) => {}
    }
    (!parts.is_empty()).then(|| parts.join(" • "))
}
