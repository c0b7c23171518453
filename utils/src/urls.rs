use url::Url;

pub use url::ParseError;

/// Strips every trailing `/` so paths can be appended with a single separator.
pub fn normalize_base_url(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

/// Builds `{base}{path}?{params}` with the parameters form-encoded in the given order.
pub fn build_url(base_url: &str, path: &str, params: &[(&str, &str)]) -> Result<Url, ParseError> {
    let mut url = Url::parse(&format!("{}{}", normalize_base_url(base_url), path))?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter());
    }
    Ok(url)
}

/// Resolves a possibly relative `href` against the page it was found on.
pub fn resolve_link(page_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    base.join(href).ok().map(|url| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_trailing_slashes() {
        assert_eq!(normalize_base_url("https://eztv.example///"), "https://eztv.example");
        assert_eq!(normalize_base_url("https://eztv.example"), "https://eztv.example");
    }

    #[test]
    fn builds_query_urls_in_order() {
        let url = build_url(
            "https://eztv.example/",
            "/api/get-torrents",
            &[("imdb_id", "0944947"), ("page", "2")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://eztv.example/api/get-torrents?imdb_id=0944947&page=2"
        );
    }

    #[test]
    fn encodes_query_values() {
        let url = build_url("https://tgx.example", "/lmsearch", &[("q", "Some Show S01E02")]).unwrap();
        assert_eq!(url.as_str(), "https://tgx.example/lmsearch?q=Some+Show+S01E02");
    }

    #[test]
    fn resolves_relative_links() {
        assert_eq!(
            resolve_link("https://tgx.example/lmsearch?q=x", "/post-detail/abc/name/").as_deref(),
            Some("https://tgx.example/post-detail/abc/name/")
        );
        assert_eq!(
            resolve_link("https://tgx.example/a", "https://cdn.example/f.torrent").as_deref(),
            Some("https://cdn.example/f.torrent")
        );
        assert_eq!(resolve_link("not a url", "/x"), None);
    }
}
