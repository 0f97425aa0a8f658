//! Heuristic link classification

use crate::subscription::models::LinkType;

/// Assign a format family to a URL.
///
/// Rules are evaluated on the lower-cased URL, first match wins:
/// 1. YAML extension -> Clash
/// 2. mentions "clash" but not "v2ray" -> Clash
/// 3. mentions "v2ray", "/v2" or "vmess", or plain-text extension -> V2Ray
/// 4. mentions "sub" -> V2Ray
/// 5. otherwise Unknown
pub fn classify(url: &str) -> LinkType {
    let url = url.to_lowercase();

    if url.ends_with(".yaml") || url.ends_with(".yml") {
        LinkType::Clash
    } else if url.contains("clash") && !url.contains("v2ray") {
        LinkType::Clash
    } else if url.contains("v2ray")
        || url.contains("/v2")
        || url.contains("vmess")
        || url.ends_with(".txt")
    {
        LinkType::V2Ray
    } else if url.contains("sub") {
        // Generic aggregators usually serve base64 URI lists
        LinkType::V2Ray
    } else {
        LinkType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_extension_is_clash() {
        assert_eq!(
            classify("https://raw.githubusercontent.com/x/clash.yaml"),
            LinkType::Clash
        );
        assert_eq!(classify("https://a.com/v2ray/nodes.YML"), LinkType::Clash);
    }

    #[test]
    fn test_clash_keyword() {
        assert_eq!(classify("https://a.com/Clash/latest"), LinkType::Clash);
        // v2ray wins the keyword conflict
        assert_eq!(classify("https://a.com/clash-v2ray/latest"), LinkType::V2Ray);
    }

    #[test]
    fn test_v2ray_rules() {
        assert_eq!(
            classify("https://raw.githubusercontent.com/x/y/v2ray_nodes.txt"),
            LinkType::V2Ray
        );
        assert_eq!(classify("https://a.com/v2/list"), LinkType::V2Ray);
        assert_eq!(classify("https://a.com/vmess"), LinkType::V2Ray);
        assert_eq!(classify("https://a.com/nodes.txt"), LinkType::V2Ray);
    }

    #[test]
    fn test_sub_keyword() {
        assert_eq!(classify("https://a.com/api/subscribe?token=1"), LinkType::V2Ray);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(classify("https://example.com/"), LinkType::Unknown);
        assert_eq!(classify(""), LinkType::Unknown);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            classify("HTTPS://EXAMPLE.COM/CLASH.YAML"),
            classify("https://example.com/clash.yaml")
        );
    }
}
