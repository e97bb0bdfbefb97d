use scraper::{Html, Selector};

use crate::geo::GeoClient;

/// Result of asking the file server for a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Files(Vec<String>),
    Unavailable(String),
}

impl Listing {
    /// Names to stream, or `None` when a fallback strategy has to take over.
    pub fn usable_files(&self) -> Option<&[String]> {
        match self {
            Listing::Files(files) if !files.is_empty() => Some(files),
            _ => None,
        }
    }
}

pub fn fetch_listing<G: GeoClient + ?Sized>(
    client: &G,
    url: &str,
    keyword: Option<&str>,
) -> Listing {
    tracing::debug!(url, "requesting directory listing");
    match client.fetch_page(url) {
        Ok(body) if body.trim().is_empty() => Listing::Unavailable("empty listing page".to_string()),
        Ok(body) => Listing::Files(parse_listing(&body, keyword)),
        Err(err) => {
            tracing::warn!(url, error = %err, "directory listing unavailable");
            Listing::Unavailable(err.to_string())
        }
    }
}

/// Relative file links of a listing page, in document order. Sub-directory
/// links (trailing `/`) and absolute links are dropped; `keyword` keeps only
/// names containing it.
pub fn parse_listing(html: &str, keyword: Option<&str>) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&anchor)
        .filter_map(|link| link.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.ends_with('/') && !has_scheme(href))
        .filter(|href| keyword.is_none_or(|keyword| href.contains(keyword)))
        .map(str::to_string)
        .collect()
}

fn has_scheme(href: &str) -> bool {
    let Some((scheme, _)) = href.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|ch| ch.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
}
