//! The fixed tool registry the orchestration loop exposes to the model.

mod context;
mod dispatcher;

pub use context::ExtractionToolContext;
pub use dispatcher::{RecipeDraft, ToolDispatcher};

use crate::providers::ToolDefinition;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Bumped whenever a tool is added, removed or changes its argument shape.
pub const TOOL_REGISTRY_VERSION: &str = "1.0.0";

/// Default cap on the page excerpt returned by `extract_heuristic`.
pub const DEFAULT_EXCERPT_CHARS: usize = 6000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CheckCache,
    FetchPage,
    ExtractStructured,
    ExtractSiteSpecific,
    ExtractHeuristic,
    ParseIngredient,
    ParseIngredients,
    ClassifyIngredient,
    FetchImage,
    SaveRecipe,
}

impl ToolName {
    pub const ALL: [ToolName; 10] = [
        ToolName::CheckCache,
        ToolName::FetchPage,
        ToolName::ExtractStructured,
        ToolName::ExtractSiteSpecific,
        ToolName::ExtractHeuristic,
        ToolName::ParseIngredient,
        ToolName::ParseIngredients,
        ToolName::ClassifyIngredient,
        ToolName::FetchImage,
        ToolName::SaveRecipe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CheckCache => "check_cache",
            ToolName::FetchPage => "fetch_page",
            ToolName::ExtractStructured => "extract_structured",
            ToolName::ExtractSiteSpecific => "extract_site_specific",
            ToolName::ExtractHeuristic => "extract_heuristic",
            ToolName::ParseIngredient => "parse_ingredient",
            ToolName::ParseIngredients => "parse_ingredients",
            ToolName::ClassifyIngredient => "classify_ingredient",
            ToolName::FetchImage => "fetch_image",
            ToolName::SaveRecipe => "save_recipe",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ToolName::CheckCache => {
                "Check whether this URL was already extracted, first for the requesting user, then globally."
            }
            ToolName::FetchPage => {
                "Fetch the recipe page over HTTP. Returns status, content type and body length; the body is kept for the extraction tools."
            }
            ToolName::ExtractStructured => {
                "Extract a recipe from schema.org JSON-LD in the fetched page."
            }
            ToolName::ExtractSiteSpecific => {
                "Extract a recipe from known recipe-card plugin markup (WP Recipe Maker, Tasty Recipes, Mediavine and similar)."
            }
            ToolName::ExtractHeuristic => {
                "Extract a recipe using page headings, lists and meta tags. Also returns a plain-text excerpt of the page for manual assembly."
            }
            ToolName::ParseIngredient => {
                "Parse one ingredient line into quantity, unit, item, preparation and category."
            }
            ToolName::ParseIngredients => {
                "Parse a list of ingredient lines. Without arguments, re-parses the ingredients of the current recipe."
            }
            ToolName::ClassifyIngredient => "Classify an ingredient into a shopping category.",
            ToolName::FetchImage => {
                "Check that an image URL serves an image. Defaults to the current recipe's image."
            }
            ToolName::SaveRecipe => {
                "Save the current recipe for the user. Pass `recipe` to save one you assembled yourself."
            }
        }
    }

    fn parameters(&self) -> Value {
        let url = json!({"type": "string", "description": "Page URL. Defaults to the URL being extracted."});
        let html = json!({"type": "string", "description": "HTML to parse. Defaults to the fetched page."});

        match self {
            ToolName::CheckCache | ToolName::FetchPage => json!({
                "type": "object",
                "properties": {"url": url},
                "required": []
            }),
            ToolName::ExtractStructured | ToolName::ExtractSiteSpecific => json!({
                "type": "object",
                "properties": {"html": html},
                "required": []
            }),
            ToolName::ExtractHeuristic => json!({
                "type": "object",
                "properties": {
                    "html": html,
                    "max_chars": {"type": "integer", "description": "Maximum excerpt length in characters."}
                },
                "required": []
            }),
            ToolName::ParseIngredient | ToolName::ClassifyIngredient => json!({
                "type": "object",
                "properties": {"text": {"type": "string", "description": "One ingredient line, e.g. \"2 cups flour, sifted\"."}},
                "required": ["text"]
            }),
            ToolName::ParseIngredients => json!({
                "type": "object",
                "properties": {"ingredients": {"type": "array", "items": {"type": "string"}}},
                "required": []
            }),
            ToolName::FetchImage => json!({
                "type": "object",
                "properties": {"url": {"type": "string", "description": "Image URL. Defaults to the recipe image."}},
                "required": []
            }),
            ToolName::SaveRecipe => json!({
                "type": "object",
                "properties": {
                    "recipe": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "description": {"type": "string"},
                            "ingredients": {"type": "array", "items": {"type": "string"}},
                            "instructions": {"type": "array", "items": {"type": "string"}},
                            "servings": {"type": "integer"},
                            "prep_time": {"type": "integer", "description": "Minutes"},
                            "cook_time": {"type": "integer", "description": "Minutes"},
                            "total_time": {"type": "integer", "description": "Minutes"},
                            "image_url": {"type": "string"}
                        },
                        "required": ["title", "ingredients", "instructions"]
                    },
                    "confidence": {"type": "number", "minimum": 0, "maximum": 1},
                    "extractor": {"type": "string", "enum": ["schema_fast_path", "site_specific", "generic", "llm"]}
                },
                "required": []
            }),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .iter()
            .find(|tool| tool.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown tool: {}", s))
    }
}

/// Every tool definition, in registry order.
pub fn registry() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(ToolName::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_shape() {
        let tools = registry();
        assert_eq!(tools.len(), 10);
        assert_eq!(tools[0].name, "check_cache");
        for tool in &tools {
            assert_eq!(tool.parameters["type"], "object");
            assert!(tool.parameters["required"].is_array());
            assert!(!tool.description.is_empty());
        }
    }

    #[test]
    fn test_name_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), tool);
        }
        assert!("drop_tables".parse::<ToolName>().is_err());
    }
}
