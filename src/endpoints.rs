// Endpoint classification
// Decides whether a request path tolerates anonymous access

use once_cell::sync::Lazy;
use regex::Regex;

/// API version prefix the backend mounts every route under. Callers may
/// pass paths with or without it; classification sees the stripped form.
const API_VERSION_PREFIX: &str = "/api/v1";

/// Public read endpoints matched exactly after normalization.
const ANONYMOUS_EXACT: &[&str] = &[
    "/news",
    "/news/search",
    "/news/latest",
    "/podcasts",
    "/podcasts/search",
    "/categories",
    "/tags",
    "/search",
];

// Numeric-id detail reads: /news/42, /podcasts/7
static DETAIL_ROUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(?:news|podcasts)/\d+$").unwrap());

// Nested public sub-resources: article comments, comment replies,
// podcast episodes, per-category and per-tag article listings
static NESTED_PUBLIC_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:/news/\d+/comments|/comments/\d+/replies|/podcasts/\d+/episodes(?:/\d+)?|/(?:categories|tags)/\d+/news)$",
    )
    .unwrap()
});

// Media streaming and download routes
static MEDIA_ROUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/media/\d+/(?:stream|download)$").unwrap());

/// Normalize a request path for classification.
///
/// Transformations:
/// - /api/v1/news/42 → /news/42 (strip version prefix)
/// - /news?page=2 → /news (strip query string)
/// - news/42 → /news/42 (ensure leading slash)
pub(crate) fn normalize_path(path: &str) -> String {
    let without_query = match path.find('?') {
        Some(idx) => &path[..idx],
        None => path,
    };

    let mut normalized = without_query
        .strip_prefix(API_VERSION_PREFIX)
        .unwrap_or(without_query)
        .to_string();

    if !normalized.starts_with('/') {
        normalized.insert(0, '/');
    }

    normalized
}

/// Whether the backend handler for `path` succeeds without a credential.
///
/// Used by the request pipeline to retry a failed call anonymously
/// instead of forcing a token refresh: an expired token on a public
/// endpoint is not a session problem. Total and deterministic; never
/// panics on arbitrary input.
pub fn is_anonymous_tolerant(path: &str) -> bool {
    let normalized = normalize_path(path);

    if ANONYMOUS_EXACT.contains(&normalized.as_str()) {
        return true;
    }

    DETAIL_ROUTE.is_match(&normalized)
        || NESTED_PUBLIC_ROUTE.is_match(&normalized)
        || MEDIA_ROUTE.is_match(&normalized)
}
