use scraper::{Html, Selector};
use std::collections::HashSet;

/// Collect every distinct image URL referenced by the document, in
/// document order: `img` `src` attributes plus all `srcset` candidates.
///
/// The parser is tolerant of broken real-world markup; a document that
/// fails to yield a tree simply yields no URLs.
pub fn collect_image_urls(html: &str) -> Vec<String> {
    let Ok(img_selector) = Selector::parse("img") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    let mut push = |url: &str| {
        let url = url.trim();
        if !url.is_empty() && seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    };

    for element in document.select(&img_selector) {
        if let Some(src) = element.value().attr("src") {
            push(src);
        }
        if let Some(srcset) = element.value().attr("srcset") {
            for candidate in srcset_candidates(srcset) {
                push(candidate);
            }
        }
    }

    urls
}

/// Split a `srcset` attribute into its candidate URLs, dropping the
/// width/density descriptors.
fn srcset_candidates(srcset: &str) -> impl Iterator<Item = &str> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
}

/// Replace every occurrence of each source URL with its local reference,
/// operating on the original document text so unrelated markup survives
/// byte-for-byte.
///
/// Attribute values in raw HTML may carry `&` as `&amp;`, so the escaped
/// spelling of each URL is replaced as well. Returns the rewritten
/// document and the number of URLs that were actually substituted.
pub fn substitute_urls(html: &str, replacements: &[(String, String)]) -> (String, usize) {
    let mut result = html.to_string();
    let mut substituted = 0;

    // Longest URL first: a URL that is a prefix of another must never be
    // replaced before the longer one.
    let mut ordered: Vec<&(String, String)> = replacements.iter().collect();
    ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

    for (from, to) in ordered {
        if from.is_empty() {
            continue;
        }

        let mut replaced = false;

        if result.contains(from.as_str()) {
            result = result.replace(from.as_str(), to);
            replaced = true;
        }

        if from.contains('&') {
            let escaped = from.replace('&', "&amp;");
            if result.contains(&escaped) {
                result = result.replace(&escaped, to);
                replaced = true;
            }
        }

        if replaced {
            substituted += 1;
        }
    }

    (result, substituted)
}
