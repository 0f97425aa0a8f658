//! Subscription candidate filter

/// Substrings suggesting the URL points at a subscription file
const SUBSCRIPTION_KEYWORDS: &[&str] = &[
    "sub",
    "clash",
    "v2ray",
    "node",
    "yaml",
    "yml",
    "txt",
    "free",
    "subscribe",
];

/// Substrings of pages that are never subscription files
const NON_FILE_MARKERS: &[&str] = &[
    "/tree/main",
    "/blob/main",
    "/settings/",
    "google.com",
    "bing.com",
];

/// Whether `url` plausibly points at a subscription file.
pub fn is_candidate(url: &str) -> bool {
    let url = url.to_lowercase();
    let has_keyword = SUBSCRIPTION_KEYWORDS.iter().any(|k| url.contains(k));
    let is_page = NON_FILE_MARKERS.iter().any(|m| url.contains(m));
    has_keyword && !is_page
}
