use bytesize::{GIB, KIB, MIB, TIB};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

lazy_static! {
    static ref SIZE_PATTERN: Regex =
        Regex::new(r"(?i)([\d.]+)\s*(B|KB|MB|GB|TB|KIB|MIB|GIB|TIB)").expect("valid size pattern");
    static ref FILENAME_PATTERN: Regex =
        Regex::new(r"(?i)\b([^\s/\\]+?\.(?:mkv|mp4|avi|ts|m4v))\b").expect("valid filename pattern");
}

/// Parses a count such as `"1,234"`. Anything unparsable, negative or non-finite is 0.
pub fn parse_number(value: &str) -> u64 {
    match value.replace(',', "").trim().parse::<f64>() {
        Ok(number) if number.is_finite() && number > 0.0 => number as u64,
        _ => 0,
    }
}

/// Parses a human size such as `"700 MB"` or `"1.5 GiB"`. Decimal and binary units are both
/// read as powers of 1024.
pub fn parse_size_to_bytes(raw: &str) -> Option<u64> {
    let captures = SIZE_PATTERN.captures(raw.trim())?;
    let value: f64 = captures[1].parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let multiplier = match captures[2].to_uppercase().as_str() {
        "B" => 1,
        "KB" | "KIB" => KIB,
        "MB" | "MIB" => MIB,
        "GB" | "GIB" => GIB,
        "TB" | "TIB" => TIB,
        _ => return None,
    };
    Some((value * multiplier as f64).round() as u64)
}

/// First video file name embedded in a release name.
pub fn extract_filename(name: &str) -> Option<String> {
    FILENAME_PATTERN
        .captures(name)
        .map(|captures| captures[1].to_string())
}

/// Accepts a JSON number or a numeric string; anything else is `None`.
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }))
}

pub(crate) fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_u64(deserializer)?.and_then(|n| u32::try_from(n).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_with_commas() {
        assert_eq!(parse_number("1,234"), 1234);
        assert_eq!(parse_number(" 99 "), 99);
        assert_eq!(parse_number("nope"), 0);
        assert_eq!(parse_number(""), 0);
        assert_eq!(parse_number("-4"), 0);
    }

    #[test]
    fn parses_sizes_into_bytes() {
        assert_eq!(parse_size_to_bytes("700 MB"), Some(734_003_200));
        assert_eq!(
            parse_size_to_bytes("1.5 GiB"),
            Some((1.5 * 1024f64.powi(3)).round() as u64)
        );
        assert_eq!(parse_size_to_bytes("12 kb"), Some(12 * 1024));
        assert_eq!(parse_size_to_bytes("Size: 2 TB"), Some(2 * 1024u64.pow(4)));
        assert_eq!(parse_size_to_bytes("bad"), None);
        assert_eq!(parse_size_to_bytes(". GB"), None);
    }

    #[test]
    fn extracts_filenames_from_release_names() {
        assert_eq!(
            extract_filename("Movie.2024.1080p.mkv").as_deref(),
            Some("Movie.2024.1080p.mkv")
        );
        assert_eq!(
            extract_filename("Show.S01E01.720p.mp4").as_deref(),
            Some("Show.S01E01.720p.mp4")
        );
        assert_eq!(extract_filename("No file here"), None);
    }

    #[derive(Deserialize)]
    struct Record {
        #[serde(default, deserialize_with = "lenient_u64")]
        size: Option<u64>,
        #[serde(default, deserialize_with = "lenient_u32")]
        season: Option<u32>,
    }

    #[test]
    fn lenient_numbers() {
        let record: Record = serde_json::from_str(r#"{"size": "1048576", "season": 2}"#).unwrap();
        assert_eq!(record.size, Some(1_048_576));
        assert_eq!(record.season, Some(2));

        let record: Record = serde_json::from_str(r#"{"size": null, "season": "x"}"#).unwrap();
        assert_eq!(record.size, None);
        assert_eq!(record.season, None);

        let record: Record = serde_json::from_str("{}").unwrap();
        assert_eq!(record.size, None);
    }
}
