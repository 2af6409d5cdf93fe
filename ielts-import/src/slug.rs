//! Slug and natural-key generation
//!
//! Slugs are the external identifiers Tests are upserted by, so the same
//! input must always produce the same slug. Output alphabet is `[a-z0-9-]`
//! with no leading, trailing or doubled hyphens.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize free text into a slug
///
/// Diacritics are removed by canonical decomposition, every run of
/// characters outside `[a-z0-9]` becomes a single hyphen.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Slug of the last non-empty path segment of a URL
///
/// Query and fragment are ignored. A URL without any path segment is
/// slugified as a whole.
pub fn slug_from_url(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let path = without_fragment.split('?').next().unwrap_or_default();
    let after_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);

    let segment = after_scheme
        .split('/')
        .skip(1)
        .filter(|s| !s.is_empty())
        .last();

    match segment {
        Some(segment) => slugify(segment),
        None => slugify(url),
    }
}

/// Canonical Test slug: `cambridge-ielts-{series}-{skill}-test-{n}`
///
/// Returns `None` when the series or test number cannot be read from the
/// labels (e.g. "Cambridge IELTS 20", "Test 2").
pub fn test_slug(series: &str, skill: &str, test_label: &str) -> Option<String> {
    let series = series_number(series)?;
    let test = test_number(test_label)?;
    Some(slugify(&format!(
        "cambridge-ielts-{}-{}-test-{}",
        series, skill, test
    )))
}

/// Series number from a label such as "Cambridge IELTS 20" or a slug
/// such as "cambridge-ielts-20-listening-test-2"
pub fn series_number(label: &str) -> Option<u32> {
    number_after(label, "ielts").or_else(|| number_after(label, "cam"))
}

/// Test number from a label such as "Test 2" or a slug containing "test-2"
pub fn test_number(label: &str) -> Option<u32> {
    number_after(label, "test")
}

/// Series and test labels recovered from a slug, for sources that omit them
pub fn labels_from_slug(slug: &str) -> (Option<String>, Option<String>) {
    (
        series_number(slug).map(|n| format!("Cambridge IELTS {}", n)),
        test_number(slug).map(|n| format!("Test {}", n)),
    )
}

/// First number following `keyword` (case-insensitive), allowing one
/// separator between them
fn number_after(haystack: &str, keyword: &str) -> Option<u32> {
    let lower = haystack.to_ascii_lowercase();

    lower.match_indices(keyword).find_map(|(start, _)| {
        let rest = &lower[start + keyword.len()..];
        let rest = rest
            .strip_prefix(|c: char| c == ' ' || c == '-' || c == '_')
            .unwrap_or(rest);
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    })
}
