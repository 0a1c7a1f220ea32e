use crate::tools::{ExtractionToolContext, TOOL_REGISTRY_VERSION};

/// System prompt for the tool-calling extraction agent.
///
/// Loaded from `prompt.txt` at compile time so it can be edited as plain text.
pub const RECIPE_AGENT_PROMPT: &str = include_str!("prompt.txt");

/// The instruction that opens every conversation.
pub fn build_seed_message(context: &ExtractionToolContext) -> String {
    let mut message = format!(
        "Extract the recipe at {} for user {}. Cache key: {}. Tool registry version: {}.",
        context.url, context.user_id, context.cache_key, TOOL_REGISTRY_VERSION
    );
    if context.html.is_some() {
        message.push_str(
            " The page is already fetched: extraction tools read it when called without html, so skip fetch_page.",
        );
    }
    if context.force_refresh {
        message.push_str(" This is a forced refresh: ignore cached copies and extract the page again.");
    }
    message
}
