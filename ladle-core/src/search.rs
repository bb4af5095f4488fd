//! Per-site recipe search and the multi-site fan-out.
//!
//! Each site's own search page is the primary discovery mechanism; no
//! third-party search API is involved. A search proxy strategy exists for
//! sites whose search pages are not crawlable.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::classify::is_recipe_link;
use crate::http::HttpClient;

/// Search URL templates tried against each site, in order.
const SEARCH_URL_TEMPLATES: [&str; 2] = [
    "https://www.{site}/search?q={query}",
    "https://www.{site}/search/{query}",
];

/// HTML results endpoint of the search proxy used by [`ProxySearch`].
const PROXY_SEARCH_URL: &str = "https://html.duckduckgo.com/html/?q={query}";

/// Delay applied after each site's search. This is the only throttling the
/// search stage performs.
pub const SEARCH_DELAY: Duration = Duration::from_millis(750);

/// URL fragments that disqualify a result regardless of source site.
const INVALID_URL_PATTERNS: [&str; 10] = [
    "google.com",
    "youtube.com",
    "pinterest.com",
    "facebook.com",
    "/search",
    "/category",
    "/tag",
    "/author",
    "/collections",
    "/gallery",
];

/// One way of turning a query into candidate recipe URLs on a single site.
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    /// Return up to `limit` recipe URLs for `query` on `site`, in discovery
    /// order without duplicates. Failures of any kind yield an empty list.
    async fn search_site(&self, query: &str, site: &str, limit: usize) -> Vec<String>;
}

/// Queries each site's own search page.
pub struct DirectSearch<C> {
    client: C,
}

impl<C: HttpClient> DirectSearch<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: HttpClient> SearchStrategy for DirectSearch<C> {
    async fn search_site(&self, query: &str, site: &str, limit: usize) -> Vec<String> {
        let encoded = urlencoding::encode(query);

        for template in SEARCH_URL_TEMPLATES {
            let search_url = template.replace("{site}", site).replace("{query}", &encoded);

            let html = match self.client.fetch_html(&search_url).await {
                Ok(html) => html,
                Err(e) => {
                    debug!(url = search_url.as_str(), error = %e, "search page fetch failed");
                    continue;
                }
            };

            let urls = collect_recipe_links(&html, site, limit);
            if !urls.is_empty() {
                return urls; // First template that produces links wins
            }
        }

        Vec::new()
    }
}

/// Scopes a query to one site through a general-purpose HTML search proxy
/// using the `site:` operator.
pub struct ProxySearch<C> {
    client: C,
}

impl<C: HttpClient> ProxySearch<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: HttpClient> SearchStrategy for ProxySearch<C> {
    async fn search_site(&self, query: &str, site: &str, limit: usize) -> Vec<String> {
        let scoped = format!("{} site:{}", query, site);
        let search_url = PROXY_SEARCH_URL.replace("{query}", &urlencoding::encode(&scoped));

        let html = match self.client.fetch_html(&search_url).await {
            Ok(html) => html,
            Err(e) => {
                debug!(site, error = %e, "proxy search failed");
                return Vec::new();
            }
        };

        let document = Html::parse_document(&html);
        let selector = Selector::parse("a[href]").expect("Invalid anchor selector");

        let mut urls = Vec::new();
        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Some(target) = unwrap_redirect(href) else {
                continue;
            };
            let normalized = normalize_url(&target);
            if is_recipe_link(&normalized, site) && !urls.contains(&normalized) {
                urls.push(normalized);
            }
            if urls.len() >= limit {
                break;
            }
        }
        urls
    }
}

/// Pull classifier-approved recipe links out of a search results page.
fn collect_recipe_links(html: &str, site: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("Invalid anchor selector");

    let mut urls = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_href(href, site) else {
            continue;
        };
        let normalized = normalize_url(&resolved);
        if is_recipe_link(&normalized, site) && !urls.contains(&normalized) {
            urls.push(normalized);
        }
        if urls.len() >= limit {
            break;
        }
    }
    urls
}

/// Make a discovered href absolute against `https://www.{site}`.
fn resolve_href(href: &str, site: &str) -> Option<String> {
    let href = href.trim();
    if let Some(rest) = href.strip_prefix("//") {
        Some(format!("https://{}", rest))
    } else if href.starts_with('/') {
        Some(format!("https://www.{}{}", site, href))
    } else if href.starts_with("http") {
        Some(href.to_string())
    } else {
        None
    }
}

/// Strip query string, fragment, and trailing slash.
fn normalize_url(url: &str) -> String {
    let base = url.split(['?', '#']).next().unwrap_or(url);
    base.trim_end_matches('/').to_string()
}

/// Recover the destination URL from a proxy redirect-wrapper link.
///
/// The proxy's HTML results wrap each hit as
/// `//duckduckgo.com/l/?uddg=<encoded target>`; plain links pass through.
fn unwrap_redirect(href: &str) -> Option<String> {
    let absolute = if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        href.trim().to_string()
    };
    if !absolute.starts_with("http") {
        return None;
    }

    if let Ok(parsed) = url::Url::parse(&absolute) {
        for (key, value) in parsed.query_pairs() {
            if key == "uddg" && value.starts_with("http") {
                return Some(value.into_owned());
            }
        }
    }
    Some(absolute)
}

/// Quota of links requested from each site.
fn per_site_quota(num_results: usize, site_count: usize) -> usize {
    (num_results / site_count).max(2)
}

/// Fans a [`SearchStrategy`] out across the configured site list.
pub struct MultiSiteSearcher {
    strategy: Box<dyn SearchStrategy>,
    sites: Vec<String>,
    delay: Duration,
}

impl MultiSiteSearcher {
    pub fn new(strategy: Box<dyn SearchStrategy>, sites: Vec<String>) -> Self {
        Self {
            strategy,
            sites,
            delay: SEARCH_DELAY,
        }
    }

    /// Override the post-site delay (tests use zero).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sites configured for this searcher.
    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    /// Search every configured site and merge the results.
    ///
    /// Each site gets a quota of `max(2, num_results / sites)`. The merged
    /// list is validity-filtered, deduplicated in first-seen order, and
    /// capped at `num_results`. An empty result is a normal outcome.
    pub async fn search_all(&self, query: &str, num_results: usize) -> Vec<String> {
        if self.sites.is_empty() {
            return Vec::new();
        }
        info!(sites = self.sites.len(), query, "searching recipe sites");

        let per_site = per_site_quota(num_results, self.sites.len());
        let mut found = Vec::new();
        for site in &self.sites {
            let urls = self.strategy.search_site(query, site, per_site).await;
            info!(site = site.as_str(), results = urls.len(), "site searched");
            found.extend(urls);
            sleep(self.delay).await;
        }

        let mut seen = HashSet::new();
        let unique: Vec<String> = found
            .into_iter()
            .filter(|url| self.is_valid_recipe_url(url))
            .filter(|url| seen.insert(url.clone()))
            .take(num_results)
            .collect();

        info!(count = unique.len(), "unique recipe urls found");
        unique
    }

    /// Global validity check applied to merged results.
    fn is_valid_recipe_url(&self, url: &str) -> bool {
        if !url.starts_with("http") {
            return false;
        }

        let lowered = url.to_lowercase();
        if INVALID_URL_PATTERNS.iter().any(|p| lowered.contains(p)) {
            return false;
        }

        // Substring host match, same leniency as the link classifier.
        match url::Url::parse(url) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) => self.sites.iter().any(|site| host.contains(site.as_str())),
                None => false,
            },
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockClient;

    /// Strategy that replays fixed results per site, ignoring the query.
    struct FixedStrategy {
        results: std::collections::HashMap<String, Vec<String>>,
    }

    impl FixedStrategy {
        fn new(per_site: &[(&str, &[&str])]) -> Self {
            Self {
                results: per_site
                    .iter()
                    .map(|(site, urls)| {
                        (
                            site.to_string(),
                            urls.iter().map(|u| u.to_string()).collect(),
                        )
                    })
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl SearchStrategy for FixedStrategy {
        async fn search_site(&self, _query: &str, site: &str, _limit: usize) -> Vec<String> {
            self.results.get(site).cloned().unwrap_or_default()
        }
    }

    fn sites(domains: &[&str]) -> Vec<String> {
        domains.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn quota_floors_at_two() {
        assert_eq!(per_site_quota(20, 10), 2);
        assert_eq!(per_site_quota(5, 10), 2);
        assert_eq!(per_site_quota(40, 10), 4);
        assert_eq!(per_site_quota(45, 10), 4);
    }

    #[test]
    fn collects_and_normalizes_recipe_links() {
        let html = r#"
            <html><body>
            <a href="/recipes/carbonara">Carbonara</a>
            <a href="/recipes/carbonara/">dup</a>
            <a href="/recipes/carbonara?utm=1">dup with query</a>
            <a href="//www.example.com/recipes/cacio-e-pepe#reviews">scheme relative</a>
            <a href="https://www.example.com/recipe/search?x=1">search page</a>
            <a href="/recipes/">index</a>
            <a href="mailto:tips@example.com">mail</a>
            </body></html>
        "#;

        let urls = collect_recipe_links(html, "example.com", 10);
        assert_eq!(
            urls,
            vec![
                "https://www.example.com/recipes/carbonara",
                "https://www.example.com/recipes/cacio-e-pepe",
            ]
        );
    }

    #[test]
    fn link_collection_respects_the_limit() {
        let html = r#"
            <a href="/recipes/one-pot-pasta">1</a>
            <a href="/recipes/two-bean-chili">2</a>
            <a href="/recipes/three-cheese-pizza">3</a>
        "#;

        let urls = collect_recipe_links(html, "example.com", 2);
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn unwraps_proxy_redirect_links() {
        let wrapped = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.example.com%2Frecipes%2Flasagna&rut=abc";
        assert_eq!(
            unwrap_redirect(wrapped).unwrap(),
            "https://www.example.com/recipes/lasagna"
        );

        let plain = "https://www.example.com/recipes/lasagna";
        assert_eq!(unwrap_redirect(plain).unwrap(), plain);
        assert!(unwrap_redirect("javascript:void(0)").is_none());
    }

    #[tokio::test]
    async fn direct_search_falls_back_to_second_template() {
        let first = "https://www.example.com/search?q=pasta";
        let second = "https://www.example.com/search/pasta";
        let client = MockClient::new()
            .with_html(first, "<html><body>no links here</body></html>")
            .with_html(
                second,
                r#"<a href="/recipes/one-pot-pasta">hit</a>"#,
            );

        let urls = DirectSearch::new(client)
            .search_site("pasta", "example.com", 5)
            .await;
        assert_eq!(urls, vec!["https://www.example.com/recipes/one-pot-pasta"]);
    }

    #[tokio::test]
    async fn direct_search_treats_errors_as_zero_results() {
        let client = MockClient::new()
            .with_status("https://www.example.com/search?q=pasta", 403)
            .with_error("https://www.example.com/search/pasta", "timed out");

        let urls = DirectSearch::new(client)
            .search_site("pasta", "example.com", 5)
            .await;
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn proxy_search_unwraps_wrapped_results() {
        let results_page = "https://html.duckduckgo.com/html/?q=lasagna%20site%3Aexample.com";
        let html = r#"
            <div class="result">
            <a class="result__a"
               href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.example.com%2Frecipes%2Flasagna&rut=abc">
               Lasagna</a>
            <a href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.example.com%2Ftag%2Fpasta&rut=def">tag</a>
            </div>
        "#;
        let client = MockClient::new().with_html(results_page, html);

        let urls = ProxySearch::new(client)
            .search_site("lasagna", "example.com", 5)
            .await;
        assert_eq!(urls, vec!["https://www.example.com/recipes/lasagna"]);
    }

    #[tokio::test]
    async fn search_all_dedupes_and_filters() {
        let strategy = FixedStrategy::new(&[
            (
                "site0.com",
                &[
                    "https://www.site0.com/recipes/apple-pie",
                    "https://www.site0.com/recipes/banana-bread",
                ][..],
            ),
            (
                "site1.com",
                &[
                    // Repeat of a site0 result, first-seen order must hold.
                    "https://www.site0.com/recipes/apple-pie",
                    "https://www.pinterest.com/recipes/apple-pie",
                    "https://www.site1.com/recipes/cherry-tart",
                ][..],
            ),
        ]);

        let searcher =
            MultiSiteSearcher::new(Box::new(strategy), sites(&["site0.com", "site1.com"]))
                .with_delay(Duration::ZERO);
        let urls = searcher.search_all("pie", 10).await;

        assert_eq!(
            urls,
            vec![
                "https://www.site0.com/recipes/apple-pie",
                "https://www.site0.com/recipes/banana-bread",
                "https://www.site1.com/recipes/cherry-tart",
            ]
        );
    }

    #[tokio::test]
    async fn search_all_caps_at_num_results() {
        let strategy = FixedStrategy::new(&[(
            "site0.com",
            &[
                "https://www.site0.com/recipes/a-pie",
                "https://www.site0.com/recipes/b-pie",
                "https://www.site0.com/recipes/c-pie",
            ][..],
        )]);

        let searcher = MultiSiteSearcher::new(Box::new(strategy), sites(&["site0.com"]))
            .with_delay(Duration::ZERO);
        let urls = searcher.search_all("pie", 2).await;
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn validity_check_rejects_foreign_hosts_and_blocked_paths() {
        let searcher =
            MultiSiteSearcher::new(Box::new(FixedStrategy::new(&[])), sites(&["allrecipes.com"]));

        assert!(searcher.is_valid_recipe_url("https://www.allrecipes.com/recipes/pie"));
        // Substring host match is deliberately lenient.
        assert!(searcher.is_valid_recipe_url("https://notallrecipes.com/recipes/pie"));
        assert!(!searcher.is_valid_recipe_url("https://www.unrelated.com/recipes/pie"));
        assert!(!searcher.is_valid_recipe_url("https://www.allrecipes.com/gallery/pies"));
        assert!(!searcher.is_valid_recipe_url("https://www.youtube.com/watch?v=1"));
        assert!(!searcher.is_valid_recipe_url("ftp://allrecipes.com/recipes/pie"));
    }
}
