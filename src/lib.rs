//! Extract normalized, structured recipes from recipe web pages.
//!
//! ```no_run
//! use recipe_extractor::{ExtractOptions, RecipeExtractor};
//!
//! # async fn example() -> Result<(), recipe_extractor::ExtractError> {
//! let extractor = RecipeExtractor::builder().build()?;
//! let result = extractor
//!     .extract("https://example.com/lasagna", "alice", ExtractOptions::default())
//!     .await;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod extraction;
pub mod extractors;
pub mod fetchers;
pub mod ingredients;
pub mod model;
pub mod passive_time;
pub mod providers;
pub mod tools;

pub use builder::RecipeExtractorBuilder;
pub use cache::{cache_key, normalize, CacheService, InMemoryStore, RecipeStore};
pub use config::ExtractorConfig;
pub use error::{ErrorCode, ExtractError, ExtractionError};
pub use extraction::{
    ExtractOptions, ExtractionMetadata, ExtractionResult, RecipeExtractor, ResultSource,
};
pub use ingredients::{classify, parse_ingredient, IngredientCategory};
pub use model::{ExtractorKind, ParsedIngredient, Recipe, SavedRecipe};
pub use passive_time::extract_passive_minutes;
pub use providers::{LlmProvider, ProviderFactory};
