//! URL normalisation for candidate deduplication and link resolution.
//!
//! Canonicalises URLs so that equivalent pages (differing only in
//! query-parameter order, tracking parameters, fragments, trailing slashes
//! or capitalisation) compare as equal, and resolves raw `href` values
//! found in fetched documents into absolute web URLs.

use url::Url;

/// Tracking query parameters that are stripped during normalisation.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "fbclid",
    "gclid",
    "msclkid",
    "yclid",
    "igshid",
    "mc_eid",
    "ref",
    "si",
    "feature",
];

/// `href` prefixes that never point at a fetchable page.
const NON_WEB_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "#"];

/// Normalise a URL for deduplication comparison.
///
/// Applies the following transformations:
///
/// 1. Lowercase scheme and host (path is preserved as-is).
/// 2. Remove default ports (`:80` for HTTP, `:443` for HTTPS).
/// 3. Remove trailing slash from the path (unless path is exactly `"/"`).
/// 4. Sort remaining query parameters alphabetically by key.
/// 5. Strip known tracking parameters (UTM, fbclid, gclid, etc.).
/// 6. Remove the fragment (`#…`).
///
/// If the input cannot be parsed as a valid URL, it is returned unchanged.
///
/// # Examples
///
/// ```
/// use magma_search::orchestrator::url_normalize::normalize_url;
///
/// let a = normalize_url("https://Example.COM/path/?b=2&a=1#section");
/// let b = normalize_url("https://example.com/path?a=1&b=2");
/// assert_eq!(a, b);
/// ```
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw.trim()) else {
        return raw.to_string();
    };

    parsed.set_fragment(None);

    if is_default_port(&parsed) {
        let _ = parsed.set_port(None);
    }

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    if params.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(&params);
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    // Url::parse already lowercases scheme and host, so the serialised
    // form is canonical.
    parsed.to_string()
}

/// Resolve a raw `href` into an absolute `http`/`https` URL.
///
/// - `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only links are
///   discarded.
/// - Protocol-relative links (`//host/path`) are promoted to `https:`.
/// - Relative links are joined onto `base` when one is given.
///
/// Returns `None` for anything that does not end up as a web URL.
pub fn normalize_href(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if NON_WEB_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
        return None;
    }

    let resolved = if href.starts_with("//") {
        Url::parse(&format!("https:{href}")).ok()?
    } else {
        match Url::parse(href) {
            Ok(absolute) => absolute,
            Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(href).ok()?,
            Err(_) => return None,
        }
    };

    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Returns `true` if the URL uses the default port for its scheme.
fn is_default_port(url: &Url) -> bool {
    matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    )
}
