//! Outbound request blocking for tracking/analytics domains.
//!
//! The block list is installed on the session before the first navigation,
//! so even the initial page load leaks nothing to trackers.

/// Known tracking/analytics domains, blocked for the lifetime of a session.
const TRACKER_DOMAINS: &[&str] = &[
    "google-analytics.com",
    "googletagmanager.com",
    "doubleclick.net",
    "googleadservices.com",
    "googlesyndication.com",
    "connect.facebook.net",
    "facebook.com/tr",
    "analytics.tiktok.com",
    "snap.licdn.com",
    "bat.bing.com",
    "hotjar.com",
    "fullstory.com",
    "mouseflow.com",
    "segment.io",
    "segment.com",
    "mixpanel.com",
    "amplitude.com",
    "heap.io",
    "clarity.ms",
    "quantserve.com",
    "scorecardresearch.com",
    "criteo.com",
    "branch.io",
    "braze.com",
    "sentry.io",
];

/// URL patterns for `Network.setBlockedURLs`. `*` wildcards on both sides
/// so any scheme, subdomain, and path under a tracker domain is caught.
pub fn block_patterns() -> Vec<String> {
    TRACKER_DOMAINS
        .iter()
        .map(|domain| format!("*{domain}*"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_wrap_every_domain_with_wildcards() {
        let patterns = block_patterns();
        assert_eq!(patterns.len(), TRACKER_DOMAINS.len());
        for pattern in &patterns {
            assert!(pattern.starts_with('*') && pattern.ends_with('*'));
        }
        assert!(patterns.iter().any(|p| p.contains("doubleclick.net")));
    }
}
