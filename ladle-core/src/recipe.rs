//! Canonical recipe record and derived-field normalization.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Instructions longer than this are cut and marked with an ellipsis.
const MAX_INSTRUCTIONS_CHARS: usize = 2000;

/// Separator used when flattening ingredient lines for storage.
pub const INGREDIENT_SEPARATOR: &str = " | ";

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("Invalid paragraph break regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// One scraped recipe page, normalized for storage.
///
/// `url` is the identity key: re-scraping the same URL replaces every other
/// field but never creates a second record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    pub url: String,
    pub author: String,
    pub source_site: String,
    pub image_url: String,
    pub total_time: String,
    pub yields: String,
    pub cuisine: String,
    pub category: String,
    pub calories: String,
    pub dietary_tags: Vec<String>,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub scraped_date: String,
}

impl Recipe {
    /// Ingredient lines flattened for the storage layer.
    pub fn ingredients_joined(&self) -> String {
        self.ingredients.join(INGREDIENT_SEPARATOR)
    }

    /// Dietary tags flattened for the storage layer.
    pub fn dietary_tags_joined(&self) -> String {
        self.dietary_tags.join(", ")
    }
}

/// A recipe's total time as structured data provides it: either a count of
/// minutes or free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TotalTime {
    Minutes(u64),
    Text(String),
}

/// Render a total time for storage: minute counts become `"<n> minutes"`,
/// free text passes through unchanged.
pub fn format_total_time(value: &TotalTime) -> String {
    match value {
        TotalTime::Minutes(n) => format!("{} minutes", n),
        TotalTime::Text(s) => s.clone(),
    }
}

/// Normalize an instruction blob for storage.
///
/// Paragraph breaks become `" | "`, remaining whitespace runs collapse to a
/// single space, and the result is capped at 2000 characters with a
/// trailing `"..."`.
pub fn clean_instructions(raw: &str) -> String {
    let cleaned = PARAGRAPH_BREAK
        .split(raw)
        .map(|paragraph| {
            WHITESPACE_RUN
                .replace_all(paragraph, " ")
                .trim()
                .to_string()
        })
        .filter(|paragraph| !paragraph.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");

    if cleaned.chars().count() > MAX_INSTRUCTIONS_CHARS {
        let mut truncated: String = cleaned.chars().take(MAX_INSTRUCTIONS_CHARS).collect();
        truncated.push_str("...");
        truncated
    } else {
        cleaned
    }
}

/// Reduce a nutrition "calories" entry to its bare value.
pub fn clean_calories(raw: &str) -> String {
    raw.replace("calories", "").trim().to_string()
}

// Ingredient keywords that rule out each label. Vegan is the stricter set;
// vegetarian tolerates dairy and eggs but not meat or seafood.
const NON_VEGAN_KEYWORDS: [&str; 17] = [
    "meat", "chicken", "beef", "pork", "fish", "egg", "milk", "cheese", "butter", "cream",
    "honey", "bacon", "sausage", "turkey", "lamb", "yogurt", "gelatin",
];

const NON_VEGETARIAN_KEYWORDS: [&str; 15] = [
    "meat", "chicken", "beef", "pork", "fish", "bacon", "sausage", "turkey", "lamb", "anchovy",
    "shrimp", "crab", "lobster", "clam", "oyster",
];

const KEYWORD_TAGS: [(&str, &[&str]); 4] = [
    ("gluten-free", &["gluten-free", "gluten free"]),
    ("dairy-free", &["dairy-free", "dairy free"]),
    ("keto", &["keto", "low-carb", "low carb"]),
    ("paleo", &["paleo"]),
];

/// Infer dietary tags from ingredient text alone.
///
/// Vegan is checked first and excludes vegetarian; the remaining labels are
/// independent keyword matches against the joined, case-folded text.
pub fn dietary_tags(ingredients: &[String]) -> Vec<String> {
    let text = ingredients.join(" ").to_lowercase();
    let mut tags = Vec::new();

    if NON_VEGAN_KEYWORDS.iter().all(|k| !text.contains(k)) {
        tags.push("vegan".to_string());
    } else if NON_VEGETARIAN_KEYWORDS.iter().all(|k| !text.contains(k)) {
        tags.push("vegetarian".to_string());
    }

    for (label, keywords) in KEYWORD_TAGS {
        if keywords.iter().any(|k| text.contains(k)) {
            tags.push(label.to_string());
        }
    }

    tags
}

/// Capture-time timestamp stored with every scraped recipe.
pub fn scraped_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn minutes_render_with_unit() {
        assert_eq!(format_total_time(&TotalTime::Minutes(45)), "45 minutes");
        assert_eq!(
            format_total_time(&TotalTime::Text("about an hour".to_string())),
            "about an hour"
        );
    }

    #[test]
    fn instructions_collapse_whitespace_and_mark_paragraphs() {
        let raw = "Preheat  the\toven.\n\nMix   the\ndough.\n\n\nBake.";
        assert_eq!(
            clean_instructions(raw),
            "Preheat the oven. | Mix the dough. | Bake."
        );
    }

    #[test]
    fn long_instructions_truncate_to_2003_chars() {
        let raw = "a".repeat(2500);
        let cleaned = clean_instructions(&raw);
        assert_eq!(cleaned.chars().count(), 2003);
        assert!(cleaned.ends_with("..."));
    }

    #[test]
    fn short_instructions_are_not_marked() {
        let cleaned = clean_instructions("Mix and bake.");
        assert_eq!(cleaned, "Mix and bake.");
    }

    #[test]
    fn calories_strip_the_unit_word() {
        assert_eq!(clean_calories("240 calories"), "240");
        assert_eq!(clean_calories("  240  "), "240");
        assert_eq!(clean_calories(""), "");
    }

    #[test]
    fn plant_only_ingredients_are_vegan_not_vegetarian() {
        let tags = dietary_tags(&lines(&["2 cups flour", "1 cup sugar"]));
        assert!(tags.contains(&"vegan".to_string()));
        assert!(!tags.contains(&"vegetarian".to_string()));
    }

    #[test]
    fn butter_blocks_vegan_but_not_vegetarian() {
        let tags = dietary_tags(&lines(&["2 cups flour", "1 stick butter"]));
        assert!(!tags.contains(&"vegan".to_string()));
        assert!(tags.contains(&"vegetarian".to_string()));
    }

    #[test]
    fn bacon_blocks_both() {
        let tags = dietary_tags(&lines(&["pasta", "egg", "bacon"]));
        assert!(tags.is_empty());
    }

    #[test]
    fn keyword_labels_are_independent() {
        let tags = dietary_tags(&lines(&[
            "1 cup gluten-free flour",
            "keto sweetener",
            "chicken breast",
        ]));
        assert_eq!(tags, vec!["gluten-free", "keto"]);
    }

    #[test]
    fn ingredient_lines_join_with_pipe_separator() {
        let recipe = Recipe {
            title: "T".to_string(),
            url: "https://www.example.com/recipes/t".to_string(),
            author: "Unknown".to_string(),
            source_site: "www.example.com".to_string(),
            image_url: String::new(),
            total_time: String::new(),
            yields: String::new(),
            cuisine: String::new(),
            category: String::new(),
            calories: String::new(),
            dietary_tags: vec!["vegan".to_string(), "keto".to_string()],
            ingredients: lines(&["2 cups flour", "1 cup sugar"]),
            instructions: String::new(),
            scraped_date: String::new(),
        };
        assert_eq!(recipe.ingredients_joined(), "2 cups flour | 1 cup sugar");
        assert_eq!(recipe.dietary_tags_joined(), "vegan, keto");
    }
}
