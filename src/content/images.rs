use crate::feed::FeedDocument;
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Link targets treated as images when they appear in an `<a href>`.
const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif"];

fn image_tags() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Selector::parse("img[src], a[href]")
            .unwrap_or_else(|e| unreachable!("static selector: {e}"))
    })
}

/// Collect image URLs from every entry of `doc`.
///
/// Order is entry order, then document order inside each entry. Duplicates
/// are kept; filtering against already-published images happens at delivery.
pub fn extract_images(doc: &FeedDocument) -> Vec<String> {
    doc.entries
        .iter()
        .filter_map(|entry| entry.description.as_deref())
        .filter(|description| !description.trim().is_empty())
        .flat_map(images_in_html)
        .collect()
}

/// Image URLs in one HTML fragment: every `img[src]`, plus every `a[href]`
/// whose path ends in a known image extension.
///
/// Surrounding whitespace and embedded tabs or line breaks are removed from
/// each value; values that end up empty are dropped.
pub fn images_in_html(html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let mut images = Vec::new();

    for element in fragment.select(image_tags()) {
        let value = element.value();
        let url = match value.name() {
            "img" => value.attr("src").map(normalize_url),
            "a" => value
                .attr("href")
                .map(normalize_url)
                .filter(|href| has_image_extension(href)),
            _ => None,
        };
        let Some(url) = url.filter(|url| !url.is_empty()) else {
            continue;
        };
        tracing::info!(image = %url, "Found image");
        images.push(url);
    }

    images
}

/// Trim surrounding whitespace and strip embedded tabs and line breaks, the
/// same characters URL parsers discard. The result is the key stored in the
/// published images file, which holds one URL per line.
fn normalize_url(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// True when the path part of `href` (before any query or fragment) ends in
/// one of [`IMAGE_EXTENSIONS`], ignoring case.
fn has_image_extension(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let path = path.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
