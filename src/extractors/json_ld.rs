use super::{decode_html_symbols, Extractor, ParsingContext};
use crate::model::{ExtractorKind, Nutrition, ParsedIngredient, Recipe, UNTITLED_RECIPE};
use crate::passive_time::extract_passive_minutes;
use log::debug;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// JSON-LD script blocks, case-insensitive, non-greedy body
static JSONLD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<script[^>]*type\s*=\s*["']?application/ld\+json["']?[^>]*>(.*?)</script>"#,
    )
    .expect("Invalid JSON-LD regex")
});

/// ISO-8601 durations: P1DT2H30M, PT45M, PT5400.0S
static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^P(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("Invalid duration regex")
});

static NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("Invalid number regex"));

/// Start of an inline "2. " step number
static STEP_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(\d+\.\s)").expect("Invalid step number regex"));

pub struct JsonLdExtractor;

impl Extractor for JsonLdExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::SchemaFastPath
    }

    fn extract(&self, context: &ParsingContext) -> Option<Recipe> {
        debug!("JsonLdExtractor: Starting extraction for URL: {}", context.url);
        extract_from_markup(context.html)
    }
}

/// Extract the first schema.org Recipe embedded as JSON-LD.
///
/// Returns `None` when no Recipe-typed block exists. Microdata-only pages are
/// not handled here.
pub fn extract_from_markup(html: &str) -> Option<Recipe> {
    for (index, cap) in JSONLD_REGEX.captures_iter(html).enumerate() {
        let Some(body) = cap.get(1) else { continue };

        let json: Value = match serde_json::from_str(&sanitize_json(body.as_str())) {
            Ok(json) => json,
            Err(e) => {
                debug!("JsonLdExtractor: Failed to parse JSON-LD {}: {}", index, e);
                continue;
            }
        };

        if let Some(recipe) = find_recipe(&json) {
            debug!("JsonLdExtractor: Found Recipe in JSON-LD block {}", index);
            return Some(recipe_from_json(recipe));
        }
    }

    debug!("JsonLdExtractor: No Recipe found in any JSON-LD script");
    None
}

/// Escape raw control characters inside strings and drop HTML comment
/// wrappers. Both show up in real pages and break strict JSON parsing.
fn sanitize_json(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_start_matches("<!--")
        .trim_end_matches("-->")
        .trim();

    let mut result = String::with_capacity(trimmed.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in trimmed.chars() {
        if in_string {
            if escaped {
                escaped = false;
                result.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    result.push(c);
                }
                '"' => {
                    in_string = false;
                    result.push(c);
                }
                '\n' => result.push_str("\\n"),
                '\r' => result.push_str("\\r"),
                '\t' => result.push_str("\\t"),
                c if c.is_control() => {}
                c => result.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            result.push(c);
        }
    }

    result
}

/// `Recipe`, `schema:Recipe`, `http://schema.org/Recipe` and friends.
fn names_recipe(type_name: &str) -> bool {
    type_name.to_ascii_lowercase().contains("recipe")
}

fn is_recipe_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => names_recipe(t),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(names_recipe),
        _ => false,
    }
}

/// Direct object, array member, or `@graph` member; first match wins.
fn find_recipe(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_recipe),
        Value::Object(obj) => {
            if is_recipe_type(value) {
                Some(value)
            } else {
                obj.get("@graph").and_then(find_recipe)
            }
        }
        _ => None,
    }
}

fn recipe_from_json(json: &Value) -> Recipe {
    let title = json
        .get("name")
        .and_then(Value::as_str)
        .map(|name| decode_html_symbols(name).trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNTITLED_RECIPE.to_string());

    let description = json
        .get("description")
        .and_then(|desc| match desc {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("text").and_then(Value::as_str),
            _ => None,
        })
        .map(|desc| decode_html_symbols(desc).trim().to_string())
        .filter(|desc| !desc.is_empty());

    let ingredients = json
        .get("recipeIngredient")
        .or_else(|| json.get("ingredients"))
        .map(ingredient_lines)
        .unwrap_or_default()
        .into_iter()
        .map(ParsedIngredient::unparsed)
        .collect();

    let instructions = json
        .get("recipeInstructions")
        .map(flatten_instructions)
        .unwrap_or_default();

    let inactive_time = Some(extract_passive_minutes(&instructions)).filter(|m| *m > 0);

    let nutrition = json
        .get("nutrition")
        .map(nutrition_from_json)
        .filter(|n| !n.is_empty());

    Recipe {
        title,
        description,
        ingredients,
        servings: json.get("recipeYield").and_then(parse_servings),
        prep_time: json.get("prepTime").and_then(Value::as_str).and_then(parse_time),
        cook_time: json.get("cookTime").and_then(Value::as_str).and_then(parse_time),
        total_time: json.get("totalTime").and_then(Value::as_str).and_then(parse_time),
        inactive_time,
        image_url: json.get("image").and_then(first_image),
        thumbnail_url: json.get("thumbnailUrl").and_then(first_image),
        nutrition,
        instructions,
    }
}

fn ingredient_lines(value: &Value) -> Vec<String> {
    let lines: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                // { "name": "flour", "amount": "2 cups" }
                Value::Object(obj) => {
                    let name = obj.get("name").and_then(Value::as_str)?;
                    match obj.get("amount").and_then(Value::as_str).map(str::trim) {
                        Some(amount) if !amount.is_empty() => Some(format!("{amount} {name}")),
                        _ => Some(name.to_string()),
                    }
                }
                _ => None,
            })
            .collect(),
        Value::String(s) => s.lines().map(str::to_string).collect(),
        _ => Vec::new(),
    };

    lines
        .iter()
        .map(|line| decode_html_symbols(line).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// One node of a loosely typed `recipeInstructions` tree.
#[derive(Debug, Clone, PartialEq)]
enum InstructionNode {
    Step(String),
    Section(Vec<InstructionNode>),
    Unknown,
}

impl From<&Value> for InstructionNode {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(s) => InstructionNode::Step(s.clone()),
            Value::Array(items) => InstructionNode::Section(items.iter().map(Into::into).collect()),
            Value::Object(obj) => {
                let is_section = obj
                    .get("@type")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t.eq_ignore_ascii_case("HowToSection"));
                let children = obj.get("itemListElement");

                match (is_section, children) {
                    (true, Some(children)) => section_of(children),
                    (true, None) => InstructionNode::Unknown,
                    (false, _) => {
                        if let Some(text) = obj.get("text").and_then(Value::as_str) {
                            InstructionNode::Step(text.to_string())
                        } else if let Some(children) = children {
                            section_of(children)
                        } else if let Some(name) = obj.get("name").and_then(Value::as_str) {
                            InstructionNode::Step(name.to_string())
                        } else {
                            InstructionNode::Unknown
                        }
                    }
                }
            }
            _ => InstructionNode::Unknown,
        }
    }
}

fn section_of(children: &Value) -> InstructionNode {
    match children {
        Value::Array(items) => InstructionNode::Section(items.iter().map(Into::into).collect()),
        other => InstructionNode::Section(vec![other.into()]),
    }
}

impl InstructionNode {
    /// Leaf steps in document order. Section names are dropped.
    fn flatten_into(self, out: &mut Vec<String>) {
        match self {
            InstructionNode::Step(text) => out.push(text),
            InstructionNode::Section(children) => {
                for child in children {
                    child.flatten_into(out);
                }
            }
            InstructionNode::Unknown => {}
        }
    }
}

fn flatten_instructions(value: &Value) -> Vec<String> {
    let raw = match value {
        Value::String(text) => split_instruction_text(text),
        other => {
            let mut steps = Vec::new();
            InstructionNode::from(other).flatten_into(&mut steps);
            steps
        }
    };

    raw.iter()
        .map(|step| decode_html_symbols(step).trim().to_string())
        .filter(|step| !step.is_empty())
        .collect()
}

/// A single instruction string holds several steps separated by newlines or
/// by inline "1. ", "2. " numbering.
fn split_instruction_text(text: &str) -> Vec<String> {
    if text.contains('\n') {
        return text.lines().map(str::to_string).collect();
    }

    let mut starts: Vec<usize> = STEP_NUMBER_REGEX
        .captures_iter(text)
        .filter_map(|cap| cap.get(1).map(|m| m.start()))
        .filter(|&start| start > 0)
        .collect();
    starts.insert(0, 0);
    starts.push(text.len());

    starts
        .windows(2)
        .map(|w| text[w[0]..w[1]].to_string())
        .collect()
}

/// ISO-8601 duration to whole minutes. Zero and unparseable durations are
/// `None` so "unspecified" is never conflated with "0 minutes".
pub fn parse_time(duration: &str) -> Option<u32> {
    let caps = DURATION_REGEX.captures(duration.trim())?;
    let part = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    let minutes = part(1) * 1440.0 + part(2) * 60.0 + part(3) + part(4) / 60.0;
    let minutes = minutes.round();
    if minutes <= 0.0 {
        None
    } else {
        Some(minutes as u32)
    }
}

fn parse_servings(value: &Value) -> Option<u32> {
    let servings = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => NUMBER_REGEX
            .find(s)
            .and_then(|m| m.as_str().split('.').next().and_then(|i| i.parse().ok())),
        Value::Array(items) => items.iter().find_map(|item| parse_servings(item).map(u64::from)),
        _ => None,
    }?;
    u32::try_from(servings).ok().filter(|n| *n > 0)
}

fn first_image(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let url = decode_html_symbols(s).trim().to_string();
            (!url.is_empty()).then_some(url)
        }
        Value::Array(items) => items.iter().find_map(first_image),
        Value::Object(obj) => obj
            .get("url")
            .or_else(|| obj.get("contentUrl"))
            .and_then(first_image),
        _ => None,
    }
}

fn nutrition_value(value: Option<&Value>) -> Option<u32> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => NUMBER_REGEX.find(s).and_then(|m| m.as_str().parse().ok()),
        _ => None,
    }?;
    (number >= 0.0).then(|| number.round() as u32)
}

fn nutrition_from_json(value: &Value) -> Nutrition {
    Nutrition {
        calories: nutrition_value(value.get("calories")),
        protein: nutrition_value(value.get("proteinContent")),
        carbs: nutrition_value(value.get("carbohydrateContent")),
        fat: nutrition_value(value.get("fatContent")),
        fiber: nutrition_value(value.get("fiberContent")),
        sodium: nutrition_value(value.get("sodiumContent")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_html_document(json_ld: &str) -> String {
        format!(
            r#"
            <!DOCTYPE html>
            <html>
            <head>
                <script type="application/ld+json">
                    {json_ld}
                </script>
            </head>
            <body></body>
            </html>
            "#
        )
    }

    #[test]
    fn test_no_json_ld() {
        assert!(extract_from_markup("<html><body>Test</body></html>").is_none());
    }

    #[test]
    fn test_parse_basic_recipe() {
        let html = create_html_document(
            r#"
        {
            "@context": "https://schema.org/",
            "@type": "Recipe",
            "name": "Chocolate Chip Cookies",
            "description": "Delicious homemade cookies",
            "image": "https://example.com/cookie.jpg",
            "recipeIngredient": ["2 cups flour", "1 cup sugar", "chocolate chips"],
            "recipeInstructions": "Mix ingredients. Bake at 350F for 10 minutes.",
            "prepTime": "PT15M",
            "cookTime": "PT10M",
            "totalTime": "PT25M",
            "recipeYield": "24 cookies"
        }
        "#,
        );

        let recipe = extract_from_markup(&html).unwrap();
        assert_eq!(recipe.title, "Chocolate Chip Cookies");
        assert_eq!(recipe.description.as_deref(), Some("Delicious homemade cookies"));
        assert_eq!(recipe.image_url.as_deref(), Some("https://example.com/cookie.jpg"));
        assert_eq!(recipe.ingredients.len(), 3);
        assert_eq!(recipe.ingredients[0].text, "2 cups flour");
        assert_eq!(recipe.ingredients[0].quantity, None);
        assert_eq!(
            recipe.instructions,
            vec!["Mix ingredients. Bake at 350F for 10 minutes."]
        );
        assert_eq!(recipe.prep_time, Some(15));
        assert_eq!(recipe.cook_time, Some(10));
        assert_eq!(recipe.total_time, Some(25));
        assert_eq!(recipe.servings, Some(24));
        assert_eq!(recipe.inactive_time, None);
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("PT30M"), Some(30));
        assert_eq!(parse_time("PT1H"), Some(60));
        assert_eq!(parse_time("PT1H30M"), Some(90));
        assert_eq!(parse_time("PT2H15M"), Some(135));
        assert_eq!(parse_time("P1DT2H"), Some(1560));
        assert_eq!(parse_time("PT5400.0S"), Some(90));
        assert_eq!(parse_time("pt20m"), Some(20));
        assert_eq!(parse_time("PT0H0M"), None);
        assert_eq!(parse_time("PT0S"), None);
        assert_eq!(parse_time(""), None);
        assert_eq!(parse_time("30 minutes"), None);
    }

    #[test]
    fn test_parse_time_round_trips_hours_and_minutes() {
        for hours in 0..5u32 {
            for minutes in [0u32, 1, 15, 45, 59] {
                let expected = hours * 60 + minutes;
                let parsed = parse_time(&format!("PT{hours}H{minutes}M"));
                if expected == 0 {
                    assert_eq!(parsed, None);
                } else {
                    assert_eq!(parsed, Some(expected));
                }
            }
        }
    }

    #[test]
    fn test_graph_container_and_type_array() {
        let html = create_html_document(
            r#"
        {
            "@context": "https://schema.org",
            "@graph": [
                {"@type": "WebSite", "name": "Site"},
                {"@type": ["Recipe", "NewsArticle"], "name": "Graph Soup",
                 "recipeIngredient": ["water"], "recipeInstructions": ["Boil."]}
            ]
        }
        "#,
        );
        let recipe = extract_from_markup(&html).unwrap();
        assert_eq!(recipe.title, "Graph Soup");
        assert_eq!(recipe.instructions, vec!["Boil."]);
    }

    #[test]
    fn test_prefixed_and_iri_types() {
        for type_name in ["schema:Recipe", "http://schema.org/Recipe", "RECIPE"] {
            let html = create_html_document(&format!(
                r#"{{"@type": "{type_name}", "name": "Toast",
                    "recipeIngredient": ["bread"], "recipeInstructions": ["Toast it."]}}"#
            ));
            let recipe = extract_from_markup(&html).unwrap();
            assert_eq!(recipe.title, "Toast", "type {type_name}");
        }

        let html = create_html_document(
            r#"{"@type": ["Thing", "https://schema.org/Recipe"], "name": "Jam"}"#,
        );
        assert_eq!(extract_from_markup(&html).unwrap().title, "Jam");

        let html = create_html_document(r#"{"@type": "NewsArticle", "name": "News"}"#);
        assert!(extract_from_markup(&html).is_none());
    }

    #[test]
    fn test_skips_broken_block_and_first_recipe_wins() {
        let html = r#"
            <script type="application/ld+json">{ this is not json </script>
            <SCRIPT TYPE="application/LD+JSON">{"@type": "Recipe", "name": "First"}</SCRIPT>
            <script type="application/ld+json">{"@type": "Recipe", "name": "Second"}</script>
        "#;
        let recipe = extract_from_markup(html).unwrap();
        assert_eq!(recipe.title, "First");
    }

    #[test]
    fn test_missing_name_defaults() {
        let html = create_html_document(r#"{"@type": "Recipe", "recipeIngredient": ["salt"]}"#);
        let recipe = extract_from_markup(&html).unwrap();
        assert_eq!(recipe.title, "Untitled Recipe");
        assert!(recipe.instructions.is_empty());
    }

    #[test]
    fn test_html_entities_decoded() {
        let html = create_html_document(
            r#"{"@type": "Recipe", "name": "Mac &amp;amp; Cheese",
                "recipeIngredient": ["1 cup cr&egrave;me fra&icirc;che"],
                "recipeInstructions": ["Stir &amp; serve."]}"#,
        );
        let recipe = extract_from_markup(&html).unwrap();
        assert_eq!(recipe.title, "Mac & Cheese");
        assert_eq!(recipe.ingredients[0].text, "1 cup crème fraîche");
        assert_eq!(recipe.instructions, vec!["Stir & serve."]);
    }

    #[test]
    fn test_section_flattening_drops_section_name() {
        let value: Value = serde_json::from_str(
            r#"[
                {"@type": "HowToSection", "name": "For the dough", "itemListElement": [
                    {"@type": "HowToStep", "text": "Mix flour and water."},
                    {"@type": "HowToStep", "text": "Knead for 10 minutes."}
                ]}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            flatten_instructions(&value),
            vec!["Mix flour and water.", "Knead for 10 minutes."]
        );
    }

    #[test]
    fn test_mixed_instruction_shapes() {
        let value: Value = serde_json::from_str(
            r#"[
                "Preheat the oven.",
                {"@type": "HowToStep", "name": "Only a name"},
                {"text": "Generic object step."},
                {"@type": "HowToSection", "name": "Sauce", "itemListElement": [
                    {"@type": "HowToSection", "name": "Nested", "itemListElement": [
                        {"@type": "HowToStep", "text": "Deeply nested step."}
                    ]}
                ]},
                42,
                {"@type": "HowToStep"}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            flatten_instructions(&value),
            vec![
                "Preheat the oven.",
                "Only a name",
                "Generic object step.",
                "Deeply nested step."
            ]
        );
    }

    #[test]
    fn test_instruction_string_splitting() {
        assert_eq!(
            split_instruction_text("Mix.\nBake.\n"),
            vec!["Mix.", "Bake."]
        );
        assert_eq!(
            flatten_instructions(&Value::String(
                "1. Mix the batter. 2. Pour into pan. 3. Bake 30 minutes.".to_string()
            )),
            vec!["1. Mix the batter.", "2. Pour into pan.", "3. Bake 30 minutes."]
        );
    }

    #[test]
    fn test_yield_variants() {
        assert_eq!(parse_servings(&serde_json::json!(4)), Some(4));
        assert_eq!(parse_servings(&serde_json::json!("Serves 6-8")), Some(6));
        assert_eq!(parse_servings(&serde_json::json!(["8", "8 slices"])), Some(8));
        assert_eq!(parse_servings(&serde_json::json!("a few")), None);
        assert_eq!(parse_servings(&serde_json::json!(0)), None);
    }

    #[test]
    fn test_image_variants() {
        assert_eq!(
            first_image(&serde_json::json!(["https://a.jpg", "https://b.jpg"])).as_deref(),
            Some("https://a.jpg")
        );
        assert_eq!(
            first_image(&serde_json::json!({"@type": "ImageObject", "url": "https://c.jpg"}))
                .as_deref(),
            Some("https://c.jpg")
        );
        assert_eq!(
            first_image(&serde_json::json!([{"url": "https://d.jpg"}])).as_deref(),
            Some("https://d.jpg")
        );
        assert_eq!(first_image(&serde_json::json!("")), None);
    }

    #[test]
    fn test_nutrition_and_passive_time() {
        let html = create_html_document(
            r#"{"@type": "Recipe", "name": "Bread",
                "recipeIngredient": ["500 g flour"],
                "recipeInstructions": [
                    {"@type": "HowToStep", "text": "Knead the dough."},
                    {"@type": "HowToStep", "text": "Let rise for 1 to 2 hours."}
                ],
                "nutrition": {"@type": "NutritionInformation", "calories": "240 calories",
                              "proteinContent": "8.6 g", "sodiumContent": "410 mg"}}"#,
        );
        let recipe = extract_from_markup(&html).unwrap();
        assert_eq!(recipe.inactive_time, Some(60));
        let nutrition = recipe.nutrition.unwrap();
        assert_eq!(nutrition.calories, Some(240));
        assert_eq!(nutrition.protein, Some(9));
        assert_eq!(nutrition.sodium, Some(410));
        assert_eq!(nutrition.fat, None);
    }

    #[test]
    fn test_sanitize_control_characters() {
        let raw = "{\"@type\": \"Recipe\", \"name\": \"Line\nBreak\"}";
        let value: Value = serde_json::from_str(&sanitize_json(raw)).unwrap();
        assert_eq!(value["name"], "Line\nBreak");
    }

    #[test]
    fn test_microdata_only_page_is_not_handled() {
        let html = r#"<div itemscope itemtype="https://schema.org/Recipe">
            <h1 itemprop="name">Microdata Pie</h1></div>"#;
        assert!(extract_from_markup(html).is_none());
    }
}
