//! Derived link categories.
//!
//! The `links` category tracks raw hyperlinks cited in answers. Two
//! derived categories group them: `linkTypes` buckets every link into a
//! fixed small set of types (a closed partition, so its influence is
//! sum-normalized), and `linkDomains` groups by registrable domain.

use std::sync::OnceLock;

use regex::Regex;

use crate::category::names;
use crate::entity::Entity;
use crate::snapshot::Snapshot;

/// The closed set of link types. Every link falls into exactly one.
pub const LINK_TYPES: [&str; 8] = [
    "social",
    "video",
    "docs",
    "blog",
    "news",
    "forum",
    "corporate",
    "other",
];

const SOCIAL_HOSTS: &[&str] = &[
    "twitter.com",
    "x.com",
    "facebook.com",
    "instagram.com",
    "linkedin.com",
    "tiktok.com",
    "threads.net",
    "bsky.app",
];

const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be", "vimeo.com", "twitch.tv"];

const FORUM_HOSTS: &[&str] = &[
    "reddit.com",
    "stackoverflow.com",
    "stackexchange.com",
    "news.ycombinator.com",
    "quora.com",
];

const NEWS_HOSTS: &[&str] = &[
    "nytimes.com",
    "theguardian.com",
    "bbc.com",
    "bbc.co.uk",
    "reuters.com",
    "bloomberg.com",
    "techcrunch.com",
    "theverge.com",
    "wired.com",
    "forbes.com",
    "wsj.com",
];

const BLOG_HOSTS: &[&str] = &[
    "medium.com",
    "substack.com",
    "dev.to",
    "hashnode.com",
    "wordpress.com",
    "blogspot.com",
];

static HOST_RE: OnceLock<Regex> = OnceLock::new();

fn host_re() -> &'static Regex {
    HOST_RE.get_or_init(|| {
        Regex::new(r"^(?:[a-z][a-z0-9+.-]*://)?(?:[^/@?#]*@)?(?:www\.)?([^/:?#]+)")
            .expect("host pattern is valid")
    })
}

fn host_and_path(url: &str) -> Option<(String, String)> {
    let lowered = url.trim().to_lowercase();
    let captures = host_re().captures(&lowered)?;
    let full = captures.get(0)?.as_str();
    let host = captures.get(1)?.as_str();
    if !host.contains('.') {
        return None;
    }
    let rest = &lowered[full.len()..];
    let path = rest
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .trim_start_matches(':')
        .trim_start_matches(|c: char| c.is_ascii_digit());
    Some((host.to_string(), path.to_string()))
}

fn host_in(host: &str, list: &[&str]) -> bool {
    list.iter()
        .any(|item| host == *item || host.ends_with(&format!(".{item}")))
}

/// Registrable domain of a link, lowercased, without a `www.` prefix.
///
/// Returns `None` for values that do not look like URLs or host names.
#[must_use]
pub fn link_domain(url: &str) -> Option<String> {
    host_and_path(url).map(|(host, _)| host)
}

/// Buckets a link URL into one of [`LINK_TYPES`].
///
/// Host markers win over path markers; anything unrecognized with a
/// shallow path reads as a corporate page, the rest as `other`.
#[must_use]
pub fn classify_link(url: &str) -> &'static str {
    let Some((host, path)) = host_and_path(url) else {
        return "other";
    };

    if host_in(&host, SOCIAL_HOSTS) {
        return "social";
    }
    if host_in(&host, VIDEO_HOSTS) {
        return "video";
    }
    if host_in(&host, FORUM_HOSTS) {
        return "forum";
    }
    if host_in(&host, NEWS_HOSTS) {
        return "news";
    }
    if host_in(&host, BLOG_HOSTS) || host.starts_with("blog.") || path.starts_with("/blog") {
        return "blog";
    }
    if host.starts_with("docs.")
        || host.starts_with("developer.")
        || path.starts_with("/docs")
        || path.starts_with("/documentation")
    {
        return "docs";
    }
    if path.starts_with("/news") {
        return "news";
    }
    if path.starts_with("/forum") || path.starts_with("/community") {
        return "forum";
    }

    let depth = path.split('/').filter(|s| !s.is_empty()).count();
    if depth <= 1 {
        "corporate"
    } else {
        "other"
    }
}

/// Groups a `links` snapshot into the closed `linkTypes` category.
#[must_use]
pub fn derive_link_types(links: &Snapshot) -> Snapshot {
    group_links(links, names::LINK_TYPES, |url| {
        Some(classify_link(url).to_string())
    })
}

/// Groups a `links` snapshot into the `linkDomains` category. Links with
/// no recognizable domain are dropped.
#[must_use]
pub fn derive_link_domains(links: &Snapshot) -> Snapshot {
    group_links(links, names::LINK_DOMAINS, link_domain)
}

fn group_links(
    links: &Snapshot,
    category: &str,
    key_fn: impl Fn(&str) -> Option<String>,
) -> Snapshot {
    let mut grouped = Snapshot::new(
        links.project.clone(),
        links.scope.clone(),
        category,
        links.date,
    );
    for link in links.entities() {
        let Some(group_value) = key_fn(&link.value) else {
            continue;
        };
        let mut member = Entity::new(group_value);
        member.mentions = link.mentions;
        member.mentions_by_source = link.mentions_by_source.clone();
        member.appearance_order = link.appearance_order;
        member.appearance_order_by_source = link.appearance_order_by_source.clone();
        member.recount_sources();
        // Snapshot::insert folds same-key members: counts sum, the
        // earliest appearance order wins.
        grouped.insert(member);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::QueryScope;
    use chrono::NaiveDate;
    use std::collections::BTreeMap as Map;

    fn d() -> NaiveDate {
        "2026-08-05".parse().unwrap()
    }

    fn link(url: &str, source: &str, mentions: u64, order: f64) -> Entity {
        Entity::from_sources(
            url,
            Map::from([(source.to_string(), mentions)]),
            Map::from([(source.to_string(), order)]),
        )
    }

    #[test]
    fn classifies_well_known_hosts() {
        assert_eq!(classify_link("https://www.youtube.com/watch?v=abc"), "video");
        assert_eq!(classify_link("https://x.com/acme/status/1"), "social");
        assert_eq!(classify_link("https://old.reddit.com/r/rust"), "forum");
        assert_eq!(classify_link("https://techcrunch.com/2026/08/01/acme"), "news");
        assert_eq!(classify_link("https://medium.com/@dev/why-acme"), "blog");
    }

    #[test]
    fn classifies_by_path_markers() {
        assert_eq!(classify_link("https://acme.io/docs/getting-started"), "docs");
        assert_eq!(classify_link("https://docs.acme.io/api"), "docs");
        assert_eq!(classify_link("https://acme.io/blog/launch"), "blog");
        assert_eq!(classify_link("https://acme.io/community/threads/42"), "forum");
    }

    #[test]
    fn shallow_unknown_links_are_corporate() {
        assert_eq!(classify_link("https://acme.io"), "corporate");
        assert_eq!(classify_link("https://acme.io/pricing"), "corporate");
        assert_eq!(classify_link("https://acme.io/a/b/c"), "other");
        assert_eq!(classify_link("not a url"), "other");
    }

    #[test]
    fn domain_extraction_strips_scheme_and_www() {
        assert_eq!(
            link_domain("https://www.Acme.io/pricing").as_deref(),
            Some("acme.io")
        );
        assert_eq!(link_domain("acme.io/pricing").as_deref(), Some("acme.io"));
        assert_eq!(
            link_domain("https://sub.acme.io:8080/x").as_deref(),
            Some("sub.acme.io")
        );
        assert_eq!(link_domain("garbage"), None);
    }

    #[test]
    fn link_domains_groups_and_sums() {
        let links = Snapshot::from_entities(
            "proj",
            QueryScope::query("q1"),
            names::LINKS,
            d(),
            vec![
                link("https://acme.io/pricing", "gpt", 2, 3.0),
                link("https://www.acme.io/blog/launch", "claude", 1, 1.0),
                link("https://rival.com", "gpt", 4, 2.0),
            ],
        );

        let domains = derive_link_domains(&links);
        assert_eq!(domains.category, names::LINK_DOMAINS);
        assert_eq!(domains.len(), 2);

        let acme = domains.get("acme.io").unwrap();
        assert_eq!(acme.mentions, 3);
        assert_eq!(acme.mentions_by_source["gpt"], 2);
        assert_eq!(acme.mentions_by_source["claude"], 1);
        assert!((acme.appearance_order - 1.0).abs() < 1e-9);
    }

    #[test]
    fn link_types_partition_every_link() {
        let links = Snapshot::from_entities(
            "proj",
            QueryScope::query("q1"),
            names::LINKS,
            d(),
            vec![
                link("https://youtube.com/watch?v=1", "gpt", 1, 1.0),
                link("https://vimeo.com/99", "claude", 2, 2.0),
                link("https://acme.io", "gpt", 3, 3.0),
            ],
        );

        let types = derive_link_types(&links);
        let total: u64 = types.entities().map(|e| e.mentions).sum();
        assert_eq!(total, 6);
        assert_eq!(types.get("video").unwrap().mentions, 3);
        assert_eq!(types.get("corporate").unwrap().mentions, 3);
    }
}
