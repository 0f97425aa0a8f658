//! Export of usable links as downloadable text artifacts

use crate::subscription::models::{LinkStatus, LinkType, SubscriptionLink, FAST_PING_THRESHOLD_MS};
use chrono::{DateTime, Local};
use std::fmt;
use std::fs;
use std::path::Path;

/// Kind of export artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Newline-joined V2Ray subscription URLs
    V2Ray,
    /// Newline-joined Clash subscription URLs
    Clash,
    /// Numbered report over every type
    Report,
}

impl ExportKind {
    /// Type restriction applied when selecting links
    pub fn link_type(&self) -> Option<LinkType> {
        match self {
            ExportKind::V2Ray => Some(LinkType::V2Ray),
            ExportKind::Clash => Some(LinkType::Clash),
            ExportKind::Report => None,
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            ExportKind::V2Ray | ExportKind::Clash => "txt",
            ExportKind::Report => "doc",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.link_type() {
            Some(t) => write!(f, "{}", t),
            None => write!(f, "ALL"),
        }
    }
}

/// A rendered export, ready to be written out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub file_name: String,
    pub content: String,
    pub count: usize,
}

impl Export {
    /// Write the artifact into `dir` under its file name
    pub fn save_to_dir<P: AsRef<Path>>(&self, dir: P) -> crate::Result<std::path::PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        fs::write(&path, &self.content)?;
        Ok(path)
    }
}

/// Active links of the given type (any type when `None`), optionally fast only
pub fn select_links(
    links: &[SubscriptionLink],
    link_type: Option<LinkType>,
    only_fast: bool,
) -> Vec<&SubscriptionLink> {
    links
        .iter()
        .filter(|l| link_type.map_or(true, |t| l.link_type == t))
        .filter(|l| l.status == LinkStatus::Active)
        .filter(|l| !only_fast || l.ping.is_some_and(|p| p < FAST_PING_THRESHOLD_MS))
        .collect()
}

/// Render an export artifact; `None` when no link qualifies.
pub fn render(
    kind: ExportKind,
    links: &[SubscriptionLink],
    only_fast: bool,
    now: DateTime<Local>,
) -> Option<Export> {
    let selected = select_links(links, kind.link_type(), only_fast);
    if selected.is_empty() {
        return None;
    }

    let content = match kind {
        ExportKind::V2Ray | ExportKind::Clash => selected
            .iter()
            .map(|l| l.url.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        ExportKind::Report => render_report(kind, &selected, now),
    };

    Some(Export {
        file_name: format!("VPN_{}_{}.{}", kind, now.format("%Y-%m-%d"), kind.extension()),
        content,
        count: selected.len(),
    })
}

fn render_report(kind: ExportKind, links: &[&SubscriptionLink], now: DateTime<Local>) -> String {
    let mut report = format!(
        "VPN aggregation report\nExported at: {}\nCategory: {}\n\n",
        now.format("%Y-%m-%d %H:%M:%S"),
        kind
    );
    let entries: Vec<String> = links
        .iter()
        .enumerate()
        .map(|(i, l)| {
            let ping = l.ping.map_or_else(|| "-".to_string(), |p| p.to_string());
            format!(
                "{}. [{}] {}\n   {}\n   Latency: {}ms\n",
                i + 1,
                l.link_type,
                l.title,
                l.url,
                ping
            )
        })
        .collect();
    report.push_str(&entries.join("\n"));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::models::ProbeOutcome;
    use chrono::TimeZone;

    fn link(url: &str, outcome: Option<ProbeOutcome>) -> SubscriptionLink {
        let mut link = SubscriptionLink::new(url, "feed");
        if let Some(outcome) = outcome {
            link.apply_probe(&outcome);
        }
        link
    }

    fn sample() -> Vec<SubscriptionLink> {
        vec![
            link("https://a.com/v2ray.txt", Some(ProbeOutcome::active(150))),
            link("https://b.com/clash.yaml", Some(ProbeOutcome::active(800))),
            link("https://c.com/v2ray.txt", Some(ProbeOutcome::active(3500))),
            link("https://d.com/v2ray.txt", Some(ProbeOutcome::expired())),
            link("https://e.com/v2ray.txt", None),
        ]
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_select_links() {
        let links = sample();
        assert_eq!(select_links(&links, Some(LinkType::V2Ray), true).len(), 1);
        assert_eq!(select_links(&links, Some(LinkType::V2Ray), false).len(), 2);
        assert_eq!(select_links(&links, None, true).len(), 2);
        assert_eq!(select_links(&links, Some(LinkType::Unknown), false).len(), 0);
    }

    #[test]
    fn test_render_url_list() {
        let export = render(ExportKind::V2Ray, &sample(), false, now()).unwrap();
        assert_eq!(export.file_name, "VPN_V2Ray_2025-06-01.txt");
        assert_eq!(export.content, "https://a.com/v2ray.txt\nhttps://c.com/v2ray.txt");
        assert_eq!(export.count, 2);

        let export = render(ExportKind::Clash, &sample(), true, now()).unwrap();
        assert_eq!(export.file_name, "VPN_Clash_2025-06-01.txt");
        assert_eq!(export.content, "https://b.com/clash.yaml");
    }

    #[test]
    fn test_render_report() {
        let export = render(ExportKind::Report, &sample(), true, now()).unwrap();
        assert_eq!(export.file_name, "VPN_ALL_2025-06-01.doc");
        assert!(export.content.starts_with("VPN aggregation report\n"));
        assert!(export.content.contains("Category: ALL\n\n"));
        assert!(export
            .content
            .contains("1. [V2Ray] feed\n   https://a.com/v2ray.txt\n   Latency: 150ms\n"));
        assert!(export
            .content
            .contains("2. [Clash] feed\n   https://b.com/clash.yaml\n   Latency: 800ms\n"));
        assert!(!export.content.contains("c.com"));
    }

    #[test]
    fn test_render_nothing_selected() {
        let links = vec![link("https://d.com/clash.yaml", Some(ProbeOutcome::expired()))];
        assert!(render(ExportKind::Clash, &links, false, now()).is_none());
        assert!(render(ExportKind::Report, &[], false, now()).is_none());
    }

    #[test]
    fn test_save_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let export = render(ExportKind::V2Ray, &sample(), true, now()).unwrap();
        let path = export.save_to_dir(dir.path()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "https://a.com/v2ray.txt");
    }
}
