//! URL extraction from free-form generated text

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Hosting domains that publish subscription files
pub const KNOWN_HOSTS: &[&str] = &[
    "raw.githubusercontent.com",
    "github.com",
    "nodesave.com",
    "freeclashx.com",
];

/// Links on a known host (or one of its subdomains) followed by a path.
/// The last character may not be quoting or sentence punctuation.
static SUBSCRIPTION_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    let hosts = KNOWN_HOSTS
        .iter()
        .map(|h| regex::escape(h))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(
        r#"(?i)https?://(?:[a-z0-9-]+\.)*(?:{hosts})/[^\s"<>`*]*[^\s"<>`*.,!?;:]"#
    );
    Regex::new(&pattern).expect("Invalid subscription URL regex")
});

/// Strip trailing markdown residue and whitespace.
///
/// Backslashes, backticks and asterisks go, as does a closing parenthesis
/// with no opening one in the URL (the tail of `[text](url)`).
pub fn trim_markdown(url: &str) -> &str {
    let mut url = url.trim();
    loop {
        let trimmed = url.trim_end_matches(['\\', '`', '*']);
        let trimmed = match trimmed.strip_suffix(')') {
            Some(rest) if trimmed.matches(')').count() > trimmed.matches('(').count() => rest,
            _ => trimmed,
        };
        if trimmed.len() == url.len() {
            return url;
        }
        url = trimmed;
    }
}

/// Find every link to a known hosting domain in `text`.
///
/// Order follows first appearance; duplicates are dropped.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();

    SUBSCRIPTION_URL_REGEX
        .find_iter(text)
        .map(|m| trim_markdown(m.as_str()).to_string())
        .filter(|url| !url.is_empty() && seen.insert(url.clone()))
        .collect()
}
