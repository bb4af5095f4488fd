//! Heuristic classification of hyperlinks as recipe pages.

/// Path fragments that mark a link as pointing at recipe content.
const RECIPE_PATH_SIGNALS: [&str; 2] = ["/recipe/", "/recipes/"];

/// Path fragments belonging to listing, editorial, and navigation pages.
const NON_RECIPE_PATTERNS: [&str; 14] = [
    "/search",
    "/tag/",
    "/tags/",
    "/author/",
    "/category/",
    "/collections/",
    "/gallery/",
    "/how-to/",
    "/article/",
    "/news/",
    "/video/",
    "/podcast/",
    "/shop/",
    "/review/",
];

/// Return true if `href` looks like a single recipe page on `domain`.
///
/// The domain check is a plain substring match, so subdomains pass. The
/// path must carry a recipe signal, avoid the known non-recipe sections,
/// and have at least one slug segment after the `recipe`/`recipes` segment
/// (a bare `/recipes/` index is not a recipe).
pub fn is_recipe_link(href: &str, domain: &str) -> bool {
    if !href.contains(domain) {
        return false;
    }

    let path = match url_path(href) {
        Some(p) => p,
        None => return false,
    };
    let path = path.trim_end_matches('/');

    if !RECIPE_PATH_SIGNALS.iter().any(|s| path.contains(s)) {
        return false;
    }
    if NON_RECIPE_PATTERNS.iter().any(|p| path.contains(p)) {
        return false;
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments
        .iter()
        .position(|s| *s == "recipe" || *s == "recipes")
    {
        Some(idx) => idx + 1 < segments.len(),
        None => false,
    }
}

/// The path portion of `href`. Tolerates hrefs that have not been resolved
/// to absolute URLs yet.
fn url_path(href: &str) -> Option<String> {
    if let Ok(parsed) = url::Url::parse(href) {
        return Some(parsed.path().to_string());
    }
    if href.starts_with('/') {
        let path = href.split(['?', '#']).next().unwrap_or(href);
        return Some(path.to_string());
    }
    None
}
