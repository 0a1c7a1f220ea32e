//! Public entry point: one URL in, one `ExtractionResult` out.
//!
//! A request goes through the user's cache, then the global cache, then the
//! structured-data fast path. Only when all of those come up empty does the
//! bounded LLM loop run, and only if a provider is configured.

use log::{error, info, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::agent::OrchestrationLoop;
use crate::builder::RecipeExtractorBuilder;
use crate::cache::{is_valid_url, CacheService};
use crate::error::{ErrorCode, ExtractError, ExtractionError};
use crate::model::{ExtractorKind, SavedRecipe};
use crate::providers::{LlmProvider, ToolCall};
use crate::tools::{ExtractionToolContext, ToolDispatcher, ToolName};

/// Where the recipe in a result came from, or why there is none.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    UserCache,
    GlobalCache,
    FreshExtraction,
    ExtractionFailed,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    pub extraction_time_ms: u64,
    pub source: ResultSource,
    /// Every tool dispatched for the request, in order.
    pub agents_used: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extractor_used: Option<ExtractorKind>,
}

/// The envelope returned for every request. Exactly one of `recipe` and
/// `error` is set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<SavedRecipe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExtractionError>,
    pub cached: bool,
    pub metadata: ExtractionMetadata,
}

impl ExtractionResult {
    fn success(
        record: SavedRecipe,
        source: ResultSource,
        agents_used: Vec<String>,
        started: Instant,
    ) -> Self {
        let cached = matches!(source, ResultSource::UserCache | ResultSource::GlobalCache);
        ExtractionResult {
            success: true,
            cached,
            metadata: ExtractionMetadata {
                extraction_time_ms: elapsed_ms(started),
                source,
                agents_used,
                confidence: Some(record.confidence),
                extractor_used: Some(record.extractor_used),
            },
            recipe: Some(record),
            error: None,
        }
    }

    fn failure(
        error: ExtractionError,
        source: ResultSource,
        agents_used: Vec<String>,
        started: Instant,
    ) -> Self {
        ExtractionResult {
            success: false,
            recipe: None,
            error: Some(error),
            cached: false,
            metadata: ExtractionMetadata {
                extraction_time_ms: elapsed_ms(started),
                source,
                agents_used,
                confidence: None,
                extractor_used: None,
            },
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Skip both cache lookups and extract the page again.
    pub force_refresh: bool,
}

/// Drives a request through cache, fast path and LLM fallback.
pub struct RecipeExtractor {
    cache: CacheService,
    dispatcher: ToolDispatcher,
    provider: Option<Arc<dyn LlmProvider>>,
    max_iterations: usize,
}

impl RecipeExtractor {
    pub(crate) fn new(
        cache: CacheService,
        dispatcher: ToolDispatcher,
        provider: Option<Arc<dyn LlmProvider>>,
        max_iterations: usize,
    ) -> Self {
        Self {
            cache,
            dispatcher,
            provider,
            max_iterations,
        }
    }

    /// Create a new builder for configuring an extractor
    ///
    /// # Example
    /// ```no_run
    /// use recipe_extractor::{ExtractOptions, RecipeExtractor};
    ///
    /// # async fn example() -> Result<(), recipe_extractor::ExtractError> {
    /// let extractor = RecipeExtractor::builder().build()?;
    /// let result = extractor
    ///     .extract("https://example.com/recipe", "alice", ExtractOptions::default())
    ///     .await;
    /// if let Some(record) = result.recipe {
    ///     println!("{}", record.recipe.title);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> RecipeExtractorBuilder {
        RecipeExtractorBuilder::default()
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// The cache the extractor reads and writes, for user edits and syncs.
    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    /// Extract the recipe at `url` for `user_id`. Never fails: problems are
    /// reported in the result's `error`.
    pub async fn extract(
        &self,
        url: &str,
        user_id: &str,
        options: ExtractOptions,
    ) -> ExtractionResult {
        let started = Instant::now();
        let url = url.trim();

        if !is_valid_url(url) {
            warn!("Rejecting invalid URL: {}", url);
            return ExtractionResult::failure(
                ExtractionError::new(
                    ErrorCode::InvalidUrl,
                    format!("Not an http(s) URL: {}", url),
                ),
                ResultSource::Error,
                Vec::new(),
                started,
            );
        }

        info!(
            "Extracting {} for {} (force_refresh: {})",
            url, user_id, options.force_refresh
        );

        match self.run(url, user_id, options, started).await {
            Ok(result) => result,
            Err(e) => {
                error!("Extraction of {} failed: {}", url, e);
                let code = match e {
                    ExtractError::LlmError(_) => ErrorCode::LlmError,
                    _ => ErrorCode::NoRecipeFound,
                };
                ExtractionResult::failure(
                    ExtractionError::new(code, e.to_string()),
                    ResultSource::Error,
                    Vec::new(),
                    started,
                )
            }
        }
    }

    async fn run(
        &self,
        url: &str,
        user_id: &str,
        options: ExtractOptions,
        started: Instant,
    ) -> Result<ExtractionResult, ExtractError> {
        let context = ExtractionToolContext::new(url, user_id, options.force_refresh);

        let context = if options.force_refresh {
            context
        } else {
            let (context, result) = self.call(ToolName::CheckCache, context).await?;
            if let Some(source) = cache_hit_source(&result) {
                if let Some(record) = self
                    .cache
                    .get_user_record(&context.user_id, &context.cache_key)
                    .await?
                {
                    info!("Serving {} from {:?}", url, source);
                    return Ok(ExtractionResult::success(
                        record,
                        source,
                        context.agents_used,
                        started,
                    ));
                }
            }
            context
        };

        let mut agent_context = ExtractionToolContext::new(url, user_id, options.force_refresh);
        let (fast_trail, saved) = match self.fast_path(context).await {
            Ok((fast, saved)) => {
                agent_context.html = fast.html;
                agent_context.final_url = fast.final_url;
                (fast.agents_used, saved)
            }
            Err(e) => {
                warn!("Fast path for {} failed, falling back: {}", url, e);
                (Vec::new(), None)
            }
        };
        if let Some(record) = saved {
            return Ok(ExtractionResult::success(
                record,
                ResultSource::FreshExtraction,
                fast_trail,
                started,
            ));
        }

        let Some(provider) = self.provider.clone() else {
            info!("No recipe found at {} and no LLM fallback configured", url);
            return Ok(ExtractionResult::failure(
                ExtractionError::new(
                    ErrorCode::NoRecipeFound,
                    "No structured recipe data found on the page",
                ),
                ResultSource::ExtractionFailed,
                fast_trail,
                started,
            ));
        };

        info!("Falling back to {} for {}", provider.provider_name(), url);
        let agent = OrchestrationLoop::new(provider, self.dispatcher.clone(), self.cache.clone())
            .max_iterations(self.max_iterations);
        let report = agent.run(agent_context).await;

        let mut agents_used = fast_trail;
        agents_used.extend(report.context.agents_used);

        match (report.record, report.failure) {
            (Some(record), _) => Ok(ExtractionResult::success(
                record,
                ResultSource::FreshExtraction,
                agents_used,
                started,
            )),
            (None, Some(ExtractError::LlmError(e))) => Ok(ExtractionResult::failure(
                ExtractionError::new(ErrorCode::LlmError, e.to_string()),
                ResultSource::Error,
                agents_used,
                started,
            )),
            (None, failure) => {
                let message = match failure {
                    Some(e) => e.to_string(),
                    None => format!(
                        "Could not extract a recipe after {} model turn(s)",
                        report.iterations
                    ),
                };
                Ok(ExtractionResult::failure(
                    ExtractionError::new(ErrorCode::NoRecipeFound, message),
                    ResultSource::ExtractionFailed,
                    agents_used,
                    started,
                ))
            }
        }
    }

    /// Fetch, read structured data, parse ingredients and save, without a
    /// model. Returns the tools run and the saved record when every step
    /// succeeded with a complete recipe.
    async fn fast_path(
        &self,
        context: ExtractionToolContext,
    ) -> Result<(ExtractionToolContext, Option<SavedRecipe>), ExtractError> {
        let (context, page) = self.call(ToolName::FetchPage, context).await?;
        if page["ok"] != json!(true) {
            warn!("Fast path could not fetch {}: {}", context.url, page);
            return Ok((context, None));
        }

        let (context, extracted) = self.call(ToolName::ExtractStructured, context).await?;
        if extracted["found"] != json!(true) || extracted["complete"] != json!(true) {
            info!("No complete structured recipe at {}", context.url);
            return Ok((context, None));
        }

        let (context, _) = self.call(ToolName::ParseIngredients, context).await?;
        let (context, saved) = self.call(ToolName::SaveRecipe, context).await?;
        if saved.get("error").is_some() {
            warn!("Fast path could not save {}: {}", context.url, saved);
            return Ok((context, None));
        }

        let record = self
            .cache
            .get_user_record(&context.user_id, &context.cache_key)
            .await?;
        Ok((context, record))
    }

    async fn call(
        &self,
        tool: ToolName,
        context: ExtractionToolContext,
    ) -> Result<(ExtractionToolContext, Value), ExtractError> {
        let call = ToolCall {
            id: format!("fast-{}", context.agents_used.len()),
            name: tool.as_str().to_string(),
            arguments: json!({}),
        };
        self.dispatcher.dispatch_owned(call, context).await
    }
}

fn cache_hit_source(result: &Value) -> Option<ResultSource> {
    if result["hit"] != json!(true) {
        return None;
    }
    match result["source"].as_str() {
        Some("user_cache") => Some(ResultSource::UserCache),
        Some("global_cache") => Some(ResultSource::GlobalCache),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_source() {
        assert_eq!(
            cache_hit_source(&json!({"hit": true, "source": "user_cache"})),
            Some(ResultSource::UserCache)
        );
        assert_eq!(
            cache_hit_source(&json!({"hit": true, "source": "global_cache"})),
            Some(ResultSource::GlobalCache)
        );
        assert_eq!(cache_hit_source(&json!({"hit": false})), None);
    }

    #[test]
    fn test_failure_envelope_shape() {
        let result = ExtractionResult::failure(
            ExtractionError::new(ErrorCode::InvalidUrl, "bad"),
            ResultSource::Error,
            Vec::new(),
            Instant::now(),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["cached"], false);
        assert_eq!(json["error"]["code"], "INVALID_URL");
        assert_eq!(json["metadata"]["source"], "error");
        assert!(json["metadata"]["extractionTimeMs"].is_u64());
        assert!(json.get("recipe").is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_short_circuits() {
        let extractor = RecipeExtractor::builder().build().unwrap();
        let result = extractor
            .extract("ftp://example.com/pie", "alice", ExtractOptions::default())
            .await;
        assert!(!result.success);
        let error = result.error.unwrap();
        assert_eq!(error.code, ErrorCode::InvalidUrl);
        assert!(!error.retryable);
        assert!(result.metadata.agents_used.is_empty());
    }
}
