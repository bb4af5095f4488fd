//! Target site list loading.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

/// Default site list file, one domain per line.
pub const DEFAULT_SITES_FILE: &str = "website-recipe-list.txt";

/// Built-in fallback used when the site list file is missing or empty.
pub const DEFAULT_RECIPE_SITES: [&str; 10] = [
    "allrecipes.com",
    "foodnetwork.com",
    "bonappetit.com",
    "epicurious.com",
    "seriouseats.com",
    "tasty.co",
    "simplyrecipes.com",
    "delish.com",
    "thekitchn.com",
    "food52.com",
];

/// Load the recipe site list from `path`.
///
/// Lines starting with `#` and blank lines are ignored. Falls back to
/// [`DEFAULT_RECIPE_SITES`] if the file is missing or has no usable lines.
pub fn load_recipe_sites(path: &Path) -> Vec<String> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => {
            info!(path = %path.display(), "site list file not found, using built-in list");
            return builtin_sites();
        }
    };

    let sites: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if sites.is_empty() {
        warn!(path = %path.display(), "no usable sites in site list file, using built-in list");
        return builtin_sites();
    }

    info!(count = sites.len(), path = %path.display(), "loaded site list");
    sites
}

fn builtin_sites() -> Vec<String> {
    DEFAULT_RECIPE_SITES.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_domains_skipping_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# favorites").unwrap();
        writeln!(file, "allrecipes.com").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  seriouseats.com  ").unwrap();

        let sites = load_recipe_sites(file.path());
        assert_eq!(sites, vec!["allrecipes.com", "seriouseats.com"]);
    }

    #[test]
    fn missing_file_falls_back_to_builtin_list() {
        let dir = tempfile::tempdir().unwrap();
        let sites = load_recipe_sites(&dir.path().join("no-such-file.txt"));
        assert_eq!(sites.len(), DEFAULT_RECIPE_SITES.len());
        assert_eq!(sites[0], "allrecipes.com");
    }

    #[test]
    fn comment_only_file_falls_back_to_builtin_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here").unwrap();

        let sites = load_recipe_sites(file.path());
        assert_eq!(sites.len(), DEFAULT_RECIPE_SITES.len());
    }
}
