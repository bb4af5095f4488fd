//! Structured-data extraction of recipe fields from fetched HTML.
//!
//! The extractor is modeled as a capability: a [`RecipeParser`] turns a
//! page into a [`RecipeDocument`], and every field accessor on the document
//! can fail on its own without poisoning the others. The built-in
//! [`JsonLdParser`] reads schema.org JSON-LD, the markup nearly all recipe
//! sites publish.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::ExtractError;
use crate::recipe::TotalTime;

/// Regex to find JSON-LD script tags (case-insensitive for type attribute).
static JSONLD_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("Invalid JSON-LD script regex")
});

/// ISO-8601 duration of the shape recipe sites emit (`PT1H30M`, `P1DT2H`).
static ISO8601_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("Invalid duration regex")
});

/// A parsed recipe page with independently-failable field accessors.
///
/// One accessor failing must not prevent the others from being read; the
/// caller decides which fields are required.
pub trait RecipeDocument: Send {
    fn title(&self) -> Result<String, ExtractError>;
    fn author(&self) -> Result<String, ExtractError>;
    fn image(&self) -> Result<String, ExtractError>;
    fn total_time(&self) -> Result<TotalTime, ExtractError>;
    fn yields(&self) -> Result<String, ExtractError>;
    fn cuisine(&self) -> Result<String, ExtractError>;
    fn category(&self) -> Result<String, ExtractError>;
    fn ingredients(&self) -> Result<Vec<String>, ExtractError>;
    fn instructions(&self) -> Result<String, ExtractError>;
    fn nutrients(&self) -> Result<HashMap<String, String>, ExtractError>;
}

/// Turns raw HTML into a [`RecipeDocument`].
pub trait RecipeParser: Send + Sync {
    fn parse(&self, html: &str, url: &str) -> Result<Box<dyn RecipeDocument>, ExtractError>;
}

/// Parser backed by schema.org JSON-LD script tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLdParser;

impl RecipeParser for JsonLdParser {
    fn parse(&self, html: &str, _url: &str) -> Result<Box<dyn RecipeDocument>, ExtractError> {
        for cap in JSONLD_SCRIPT.captures_iter(html) {
            let json_text = match cap.get(1) {
                Some(m) => m.as_str(),
                None => continue,
            };

            let sanitized = sanitize_json(json_text);
            let json: Value = match serde_json::from_str(&sanitized) {
                Ok(v) => v,
                Err(_) => continue, // Try next script tag
            };

            if let Some(recipe) = find_recipe_in_json(&json) {
                return Ok(Box::new(JsonLdDocument {
                    recipe: recipe.clone(),
                }));
            }
        }

        Err(ExtractError::NoRecipe)
    }
}

/// Sanitize JSON-LD content to handle common malformed patterns.
/// Some sites include literal newlines/tabs inside JSON strings instead of
/// escaped versions.
fn sanitize_json(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut in_string = false;
    let mut prev_char = '\0';

    for c in json.chars() {
        if c == '"' && prev_char != '\\' {
            in_string = !in_string;
            result.push(c);
        } else if in_string {
            match c {
                '\n' => result.push_str("\\n"),
                '\r' => result.push_str("\\r"),
                '\t' => result.push_str("\\t"),
                c if c.is_control() => {}
                _ => result.push(c),
            }
        } else {
            result.push(c);
        }
        prev_char = c;
    }

    result
}

/// Recursively search for a Recipe object in JSON-LD.
/// Handles @graph arrays and nested structures.
fn find_recipe_in_json(json: &Value) -> Option<&Value> {
    match json {
        Value::Object(obj) => {
            if let Some(type_val) = obj.get("@type") {
                let is_recipe = match type_val {
                    Value::String(s) => s == "Recipe",
                    Value::Array(arr) => arr.iter().any(|v| v == "Recipe"),
                    _ => false,
                };
                if is_recipe {
                    return Some(json);
                }
            }

            if let Some(graph) = obj.get("@graph") {
                if let Some(recipe) = find_recipe_in_json(graph) {
                    return Some(recipe);
                }
            }

            for (_, value) in obj {
                if let Some(recipe) = find_recipe_in_json(value) {
                    return Some(recipe);
                }
            }
        }
        Value::Array(arr) => {
            for item in arr {
                if let Some(recipe) = find_recipe_in_json(item) {
                    return Some(recipe);
                }
            }
        }
        _ => {}
    }
    None
}

/// Document view over one JSON-LD Recipe object.
struct JsonLdDocument {
    recipe: Value,
}

impl JsonLdDocument {
    fn field(&self, key: &str) -> Result<&Value, ExtractError> {
        self.recipe
            .get(key)
            .ok_or_else(|| ExtractError::MissingField(key.to_string()))
    }
}

impl RecipeDocument for JsonLdDocument {
    fn title(&self) -> Result<String, ExtractError> {
        text_value(self.field("name")?)
            .ok_or_else(|| ExtractError::MissingField("name".to_string()))
    }

    fn author(&self) -> Result<String, ExtractError> {
        person_name(self.field("author")?)
            .ok_or_else(|| ExtractError::MissingField("author".to_string()))
    }

    fn image(&self) -> Result<String, ExtractError> {
        image_source(self.field("image")?)
            .ok_or_else(|| ExtractError::MissingField("image".to_string()))
    }

    fn total_time(&self) -> Result<TotalTime, ExtractError> {
        match self.field("totalTime")? {
            Value::Number(n) => n
                .as_u64()
                .map(TotalTime::Minutes)
                .ok_or_else(|| ExtractError::InvalidJson("totalTime is negative".to_string())),
            Value::String(s) => Ok(match parse_duration_minutes(s) {
                Some(minutes) => TotalTime::Minutes(minutes),
                None => TotalTime::Text(s.trim().to_string()),
            }),
            _ => Err(ExtractError::MissingField("totalTime".to_string())),
        }
    }

    fn yields(&self) -> Result<String, ExtractError> {
        text_value(self.field("recipeYield")?)
            .ok_or_else(|| ExtractError::MissingField("recipeYield".to_string()))
    }

    fn cuisine(&self) -> Result<String, ExtractError> {
        text_value(self.field("recipeCuisine")?)
            .ok_or_else(|| ExtractError::MissingField("recipeCuisine".to_string()))
    }

    fn category(&self) -> Result<String, ExtractError> {
        text_value(self.field("recipeCategory")?)
            .ok_or_else(|| ExtractError::MissingField("recipeCategory".to_string()))
    }

    fn ingredients(&self) -> Result<Vec<String>, ExtractError> {
        let raw = self.field("recipeIngredient")?;
        let arr = raw.as_array().ok_or_else(|| {
            ExtractError::InvalidJson("recipeIngredient is not an array".to_string())
        })?;

        let ingredients: Vec<String> = arr
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if ingredients.is_empty() {
            return Err(ExtractError::MissingField(
                "recipeIngredient (empty)".to_string(),
            ));
        }

        Ok(ingredients)
    }

    fn instructions(&self) -> Result<String, ExtractError> {
        match self.field("recipeInstructions")? {
            Value::String(s) => Ok(s.trim().to_string()),
            Value::Array(arr) => {
                let steps: Vec<String> = arr
                    .iter()
                    .filter_map(|item| {
                        // HowToStep objects
                        if let Some(text) = item.get("text").and_then(|v| v.as_str()) {
                            return Some(text.trim().to_string());
                        }
                        // Plain strings
                        if let Some(s) = item.as_str() {
                            return Some(s.trim().to_string());
                        }
                        // HowToSection with itemListElement
                        if let Some(items) = item.get("itemListElement").and_then(|v| v.as_array())
                        {
                            let section: Vec<String> = items
                                .iter()
                                .filter_map(|step| step.get("text").and_then(|v| v.as_str()))
                                .map(|s| s.trim().to_string())
                                .collect();
                            if !section.is_empty() {
                                return Some(section.join("\n\n"));
                            }
                        }
                        None
                    })
                    .collect();

                if steps.is_empty() {
                    return Err(ExtractError::MissingField(
                        "recipeInstructions (empty)".to_string(),
                    ));
                }

                Ok(steps.join("\n\n"))
            }
            _ => Err(ExtractError::InvalidJson(
                "recipeInstructions is not a string or array".to_string(),
            )),
        }
    }

    fn nutrients(&self) -> Result<HashMap<String, String>, ExtractError> {
        let nutrition = self.field("nutrition")?;
        let obj = nutrition
            .as_object()
            .ok_or_else(|| ExtractError::InvalidJson("nutrition is not an object".to_string()))?;

        Ok(obj
            .iter()
            .filter_map(|(key, value)| text_value(value).map(|v| (key.clone(), v)))
            .collect())
    }
}

/// First usable string in a `"x"` / `["x", ...]` / number shape.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(arr) => arr.iter().find_map(text_value),
        _ => None,
    }
}

/// Author name in a `"x"` / `{"name": "x"}` / array-of-either shape.
fn person_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Array(arr) => arr.iter().find_map(person_name),
        Value::Object(obj) => obj.get("name").and_then(person_name),
        _ => None,
    }
}

/// Image URL in a `"x"` / `{"url": "x"}` / array-of-either shape.
fn image_source(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Array(arr) => arr.iter().find_map(image_source),
        Value::Object(obj) => obj.get("url").and_then(image_source),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse an ISO-8601 duration or bare digit string into minutes.
/// Seconds round down; returns None for anything else so the raw text can
/// pass through unchanged.
fn parse_duration_minutes(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u64>() {
        return Some(n);
    }

    let caps = ISO8601_DURATION.captures(s)?;
    let part = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    let (days, hours, minutes, seconds) = (part(1), part(2), part(3), part(4));
    if days == 0 && hours == 0 && minutes == 0 && seconds == 0 {
        return None;
    }

    Some(days * 1440 + hours * 60 + minutes + seconds / 60)
}

/// Fixed-value document for tests; unset fields fail like real accessors.
#[derive(Debug, Default, Clone)]
pub struct MockDocument {
    pub title: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
    pub total_time: Option<TotalTime>,
    pub yields: Option<String>,
    pub cuisine: Option<String>,
    pub category: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<String>,
    pub nutrients: Option<HashMap<String, String>>,
}

impl MockDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn with_total_time(mut self, total_time: TotalTime) -> Self {
        self.total_time = Some(total_time);
        self
    }

    pub fn with_ingredients(mut self, lines: &[&str]) -> Self {
        self.ingredients = Some(lines.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = Some(instructions.to_string());
        self
    }

    pub fn with_nutrient(mut self, key: &str, value: &str) -> Self {
        self.nutrients
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }
}

fn mock_field<T: Clone>(field: &Option<T>, name: &str) -> Result<T, ExtractError> {
    field
        .clone()
        .ok_or_else(|| ExtractError::MissingField(name.to_string()))
}

impl RecipeDocument for MockDocument {
    fn title(&self) -> Result<String, ExtractError> {
        mock_field(&self.title, "name")
    }

    fn author(&self) -> Result<String, ExtractError> {
        mock_field(&self.author, "author")
    }

    fn image(&self) -> Result<String, ExtractError> {
        mock_field(&self.image, "image")
    }

    fn total_time(&self) -> Result<TotalTime, ExtractError> {
        mock_field(&self.total_time, "totalTime")
    }

    fn yields(&self) -> Result<String, ExtractError> {
        mock_field(&self.yields, "recipeYield")
    }

    fn cuisine(&self) -> Result<String, ExtractError> {
        mock_field(&self.cuisine, "recipeCuisine")
    }

    fn category(&self) -> Result<String, ExtractError> {
        mock_field(&self.category, "recipeCategory")
    }

    fn ingredients(&self) -> Result<Vec<String>, ExtractError> {
        mock_field(&self.ingredients, "recipeIngredient")
    }

    fn instructions(&self) -> Result<String, ExtractError> {
        mock_field(&self.instructions, "recipeInstructions")
    }

    fn nutrients(&self) -> Result<HashMap<String, String>, ExtractError> {
        mock_field(&self.nutrients, "nutrition")
    }
}

/// Parser that serves canned documents keyed by URL.
#[derive(Default)]
pub struct MockParser {
    documents: HashMap<String, MockDocument>,
}

impl MockParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, url: &str, document: MockDocument) -> Self {
        self.documents.insert(url.to_string(), document);
        self
    }
}

impl RecipeParser for MockParser {
    fn parse(&self, _html: &str, url: &str) -> Result<Box<dyn RecipeDocument>, ExtractError> {
        self.documents
            .get(url)
            .cloned()
            .map(|d| Box::new(d) as Box<dyn RecipeDocument>)
            .ok_or(ExtractError::NoRecipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Box<dyn RecipeDocument> {
        JsonLdParser
            .parse(html, "https://www.example.com/recipes/test")
            .unwrap()
    }

    #[test]
    fn parses_a_plain_jsonld_recipe() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">
            {
                "@type": "Recipe",
                "name": "Test Recipe",
                "author": "Jane Doe",
                "recipeIngredient": ["1 cup flour", "2 eggs"],
                "recipeInstructions": "Mix and bake.",
                "recipeYield": "4 servings"
            }
            </script>
            </head><body></body></html>
        "#;

        let doc = parse(html);
        assert_eq!(doc.title().unwrap(), "Test Recipe");
        assert_eq!(doc.author().unwrap(), "Jane Doe");
        assert_eq!(doc.ingredients().unwrap(), vec!["1 cup flour", "2 eggs"]);
        assert_eq!(doc.instructions().unwrap(), "Mix and bake.");
        assert_eq!(doc.yields().unwrap(), "4 servings");
    }

    #[test]
    fn finds_the_recipe_inside_a_graph() {
        let html = r#"
            <script type="application/ld+json">
            {
                "@graph": [
                    {"@type": "WebSite", "name": "Some Site"},
                    {
                        "@type": ["Recipe", "NewsArticle"],
                        "name": "Nested Recipe",
                        "recipeIngredient": ["1 cup rice"],
                        "recipeInstructions": "Cook the rice."
                    }
                ]
            }
            </script>
        "#;

        let doc = parse(html);
        assert_eq!(doc.title().unwrap(), "Nested Recipe");
    }

    #[test]
    fn author_object_and_image_array_shapes() {
        let html = r#"
            <script type="application/ld+json">
            {
                "@type": "Recipe",
                "name": "Shapes",
                "author": [{"@type": "Person", "name": "Marco"}],
                "image": [{"@type": "ImageObject", "url": "https://img.example.com/1.jpg"}],
                "recipeIngredient": ["1 cup flour"],
                "recipeInstructions": "Bake."
            }
            </script>
        "#;

        let doc = parse(html);
        assert_eq!(doc.author().unwrap(), "Marco");
        assert_eq!(doc.image().unwrap(), "https://img.example.com/1.jpg");
    }

    #[test]
    fn howto_step_instructions_join_as_paragraphs() {
        let html = r#"
            <script type="application/ld+json">
            {
                "@type": "Recipe",
                "name": "Steps",
                "recipeIngredient": ["1 cup flour"],
                "recipeInstructions": [
                    {"@type": "HowToStep", "text": "Preheat oven."},
                    {"@type": "HowToStep", "text": "Bake it."}
                ]
            }
            </script>
        "#;

        let doc = parse(html);
        assert_eq!(doc.instructions().unwrap(), "Preheat oven.\n\nBake it.");
    }

    #[test]
    fn iso_durations_and_numbers_become_minutes() {
        assert_eq!(parse_duration_minutes("PT30M"), Some(30));
        assert_eq!(parse_duration_minutes("PT1H30M"), Some(90));
        assert_eq!(parse_duration_minutes("P1DT2H"), Some(1560));
        assert_eq!(parse_duration_minutes("45"), Some(45));
        assert_eq!(parse_duration_minutes("about an hour"), None);
    }

    #[test]
    fn total_time_falls_back_to_text() {
        let html = r#"
            <script type="application/ld+json">
            {
                "@type": "Recipe",
                "name": "Timed",
                "totalTime": "overnight",
                "recipeIngredient": ["1 cup flour"],
                "recipeInstructions": "Rest the dough."
            }
            </script>
        "#;

        let doc = parse(html);
        assert_eq!(
            doc.total_time().unwrap(),
            TotalTime::Text("overnight".to_string())
        );
    }

    #[test]
    fn nutrients_stringify_numbers() {
        let html = r#"
            <script type="application/ld+json">
            {
                "@type": "Recipe",
                "name": "Nutritious",
                "nutrition": {"@type": "NutritionInformation", "calories": "240 calories", "servingSize": 1},
                "recipeIngredient": ["1 cup flour"],
                "recipeInstructions": "Bake."
            }
            </script>
        "#;

        let doc = parse(html);
        let nutrients = doc.nutrients().unwrap();
        assert_eq!(nutrients.get("calories").unwrap(), "240 calories");
        assert_eq!(nutrients.get("servingSize").unwrap(), "1");
    }

    #[test]
    fn empty_ingredients_fail_that_accessor_only() {
        let html = r#"
            <script type="application/ld+json">
            {
                "@type": "Recipe",
                "name": "Sparse",
                "recipeIngredient": [],
                "recipeInstructions": "Bake."
            }
            </script>
        "#;

        let doc = parse(html);
        assert!(doc.ingredients().is_err());
        assert_eq!(doc.title().unwrap(), "Sparse");
    }

    #[test]
    fn pages_without_structured_data_do_not_parse() {
        let err = JsonLdParser
            .parse("<html><body>plain page</body></html>", "https://x.test/")
            .err()
            .unwrap();
        assert!(matches!(err, ExtractError::NoRecipe));
    }

    #[test]
    fn sanitizes_literal_newlines_inside_strings() {
        let html = "<script type=\"application/ld+json\">\
            {\"@type\": \"Recipe\", \"name\": \"Line\nBreak\", \
             \"recipeIngredient\": [\"1 cup flour\"], \
             \"recipeInstructions\": \"Bake.\"}\
            </script>";

        let doc = parse(html);
        assert_eq!(doc.title().unwrap(), "Line\nBreak");
    }
}
