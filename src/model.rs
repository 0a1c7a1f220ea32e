use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingredients::IngredientCategory;

pub const UNTITLED_RECIPE: &str = "Untitled Recipe";

/// An extracted recipe that has not been persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<ParsedIngredient>,
    /// Plain-text steps, in order.
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
}

impl Default for Recipe {
    fn default() -> Self {
        Recipe {
            title: UNTITLED_RECIPE.to_string(),
            description: None,
            ingredients: Vec::new(),
            instructions: Vec::new(),
            servings: None,
            prep_time: None,
            cook_time: None,
            total_time: None,
            inactive_time: None,
            image_url: None,
            thumbnail_url: None,
            nutrition: None,
        }
    }
}

impl Recipe {
    /// A recipe is complete when it has both ingredients and steps.
    pub fn is_complete(&self) -> bool {
        !self.ingredients.is_empty() && !self.instructions.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Nutrition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<u32>,
}

impl Nutrition {
    pub fn is_empty(&self) -> bool {
        self == &Nutrition::default()
    }
}

/// One ingredient line split into its parts. `text` always holds the raw line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedIngredient {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preparation: Option<String>,
    pub category: IngredientCategory,
}

impl ParsedIngredient {
    /// An ingredient line that has not been through the parser yet.
    pub fn unparsed(text: impl Into<String>) -> Self {
        let text = text.into();
        ParsedIngredient {
            item: text.clone(),
            text,
            quantity: None,
            unit: None,
            preparation: None,
            category: IngredientCategory::Other,
        }
    }
}

/// Which extraction path produced a recipe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    SchemaFastPath,
    SiteSpecific,
    Generic,
    Llm,
}

impl ExtractorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorKind::SchemaFastPath => "schema_fast_path",
            ExtractorKind::SiteSpecific => "site_specific",
            ExtractorKind::Generic => "generic",
            ExtractorKind::Llm => "llm",
        }
    }

    /// Confidence stamped on a saved recipe when the caller gives none.
    pub fn default_confidence(&self) -> f32 {
        match self {
            ExtractorKind::SchemaFastPath => 0.95,
            ExtractorKind::SiteSpecific => 0.85,
            ExtractorKind::Generic => 0.7,
            ExtractorKind::Llm => 0.6,
        }
    }
}

/// A recipe plus the persistence metadata the rest of the app depends on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecipe {
    pub id: String,
    pub user_id: String,
    pub source_url: String,
    pub cache_key: String,
    #[serde(flatten)]
    pub recipe: Recipe,
    pub extracted_at: DateTime<Utc>,
    pub confidence: f32,
    pub extractor_used: ExtractorKind,
    pub agents_used: Vec<String>,
    #[serde(default)]
    pub user_modified: bool,
}
