use crate::cache::cache_key;
use crate::model::{ExtractorKind, Recipe};

/// Mutable state shared by the tools of one extraction request.
///
/// Owned by exactly one in-flight request and moved into each tool call;
/// never stored anywhere that outlives the request.
#[derive(Debug, Clone)]
pub struct ExtractionToolContext {
    pub url: String,
    pub cache_key: String,
    pub user_id: String,
    pub force_refresh: bool,
    /// Body of the most recent successful `fetch_page`.
    pub html: Option<String>,
    pub final_url: Option<String>,
    /// Most recent recipe candidate and the extractor that produced it.
    pub recipe: Option<Recipe>,
    pub extractor: Option<ExtractorKind>,
    /// Names of every tool dispatched for this request, in order.
    pub agents_used: Vec<String>,
    pub saved_id: Option<String>,
}

impl ExtractionToolContext {
    pub fn new(url: &str, user_id: &str, force_refresh: bool) -> Self {
        ExtractionToolContext {
            url: url.to_string(),
            cache_key: cache_key(url),
            user_id: user_id.to_string(),
            force_refresh,
            html: None,
            final_url: None,
            recipe: None,
            extractor: None,
            agents_used: Vec::new(),
            saved_id: None,
        }
    }

    pub(crate) fn set_recipe(&mut self, recipe: Recipe, extractor: ExtractorKind) {
        self.recipe = Some(recipe);
        self.extractor = Some(extractor);
    }
}
