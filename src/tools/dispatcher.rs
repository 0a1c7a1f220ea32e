use chrono::Utc;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{ExtractionToolContext, ToolName, DEFAULT_EXCERPT_CHARS};
use crate::cache::{is_valid_url, CacheService};
use crate::error::ExtractError;
use crate::extractors::{
    page_text_excerpt, Extractor, GenericExtractor, HtmlClassExtractor, JsonLdExtractor,
    ParsingContext,
};
use crate::fetchers::RequestFetcher;
use crate::ingredients::{classify, parse_ingredient, parse_ingredients};
use crate::model::{ExtractorKind, Recipe, SavedRecipe, UNTITLED_RECIPE};
use crate::passive_time::extract_passive_minutes;
use crate::providers::ToolCall;

#[derive(Debug, Default, Deserialize)]
struct UrlArgs {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HtmlArgs {
    html: Option<String>,
    max_chars: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TextArgs {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct IngredientListArgs {
    ingredients: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct SaveArgs {
    recipe: Option<RecipeDraft>,
    confidence: Option<f32>,
    extractor: Option<ExtractorKind>,
}

/// A recipe assembled by the model, with ingredients still as plain lines.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeDraft {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    pub servings: Option<u32>,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub total_time: Option<u32>,
    pub image_url: Option<String>,
}

impl RecipeDraft {
    pub fn into_recipe(self) -> Recipe {
        let title = match self.title.trim() {
            "" => UNTITLED_RECIPE.to_string(),
            title => title.to_string(),
        };
        let instructions: Vec<String> = self
            .instructions
            .into_iter()
            .map(|step| step.trim().to_string())
            .filter(|step| !step.is_empty())
            .collect();

        Recipe {
            title,
            description: self.description,
            ingredients: parse_ingredients(&self.ingredients),
            inactive_time: Some(extract_passive_minutes(&instructions)).filter(|m| *m > 0),
            instructions,
            servings: self.servings.filter(|s| *s > 0),
            prep_time: self.prep_time.filter(|t| *t > 0),
            cook_time: self.cook_time.filter(|t| *t > 0),
            total_time: self.total_time.filter(|t| *t > 0),
            image_url: self.image_url,
            ..Default::default()
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ExtractError> {
    let args = if args.is_null() { json!({}) } else { args };
    Ok(serde_json::from_value(args)?)
}

/// Executes registry tools against a request context.
#[derive(Clone)]
pub struct ToolDispatcher {
    cache: CacheService,
    fetcher: Arc<RequestFetcher>,
}

impl ToolDispatcher {
    pub fn new(cache: CacheService, fetcher: Arc<RequestFetcher>) -> Self {
        Self { cache, fetcher }
    }

    /// Run one tool call. The name is always appended to the context's audit
    /// trail; failures come back as `{"error": ...}` so the model can react.
    pub async fn dispatch(
        &self,
        name: &str,
        args: Value,
        context: &mut ExtractionToolContext,
    ) -> Value {
        info!("Dispatching tool {} for {}", name, context.url);
        context.agents_used.push(name.to_string());

        let result = match name.parse::<ToolName>() {
            Ok(tool) => self.execute(tool, args, context).await,
            Err(_) => Err(ExtractError::UnknownTool(name.to_string())),
        };

        match result {
            Ok(value) => value,
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                json!({"error": e.to_string()})
            }
        }
    }

    /// Run one tool call on a spawned task that owns the context, so a
    /// dropped caller cannot leave the call half-applied.
    pub async fn dispatch_owned(
        &self,
        call: ToolCall,
        mut context: ExtractionToolContext,
    ) -> Result<(ExtractionToolContext, Value), ExtractError> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let result = dispatcher
                .dispatch(&call.name, call.arguments, &mut context)
                .await;
            (context, result)
        })
        .await
        .map_err(|e| ExtractError::TaskError(e.to_string()))
    }

    async fn execute(
        &self,
        tool: ToolName,
        args: Value,
        context: &mut ExtractionToolContext,
    ) -> Result<Value, ExtractError> {
        match tool {
            ToolName::CheckCache => self.check_cache(parse_args(args)?, context).await,
            ToolName::FetchPage => self.fetch_page(parse_args(args)?, context).await,
            ToolName::ExtractStructured => {
                extract_with(parse_args(args)?, context, &JsonLdExtractor)
            }
            ToolName::ExtractSiteSpecific => {
                extract_with(parse_args(args)?, context, &HtmlClassExtractor)
            }
            ToolName::ExtractHeuristic => extract_heuristic(parse_args(args)?, context),
            ToolName::ParseIngredient => {
                let args: TextArgs = parse_args(args)?;
                Ok(serde_json::to_value(parse_ingredient(&args.text))?)
            }
            ToolName::ParseIngredients => {
                parse_ingredient_list(parse_args(args)?, context)
            }
            ToolName::ClassifyIngredient => {
                let args: TextArgs = parse_args(args)?;
                Ok(json!({"text": args.text, "category": classify(&args.text)}))
            }
            ToolName::FetchImage => self.fetch_image(parse_args(args)?, context).await,
            ToolName::SaveRecipe => self.save_recipe(parse_args(args)?, context).await,
        }
    }

    async fn check_cache(
        &self,
        args: UrlArgs,
        context: &mut ExtractionToolContext,
    ) -> Result<Value, ExtractError> {
        if context.force_refresh {
            return Ok(json!({"hit": false, "reason": "force_refresh"}));
        }

        let url = args.url.unwrap_or_else(|| context.url.clone());
        let Some(hit) = self.cache.lookup(&context.user_id, &url).await? else {
            return Ok(json!({"hit": false}));
        };

        let title = hit.record.recipe.title.clone();
        context.saved_id = Some(hit.record.id.clone());
        context.set_recipe(hit.record.recipe, hit.record.extractor_used);

        Ok(json!({
            "hit": true,
            "source": hit.source,
            "recipe_id": context.saved_id,
            "title": title,
        }))
    }

    async fn fetch_page(
        &self,
        args: UrlArgs,
        context: &mut ExtractionToolContext,
    ) -> Result<Value, ExtractError> {
        let url = args.url.unwrap_or_else(|| context.url.clone());
        if !is_valid_url(&url) {
            return Err(ExtractError::InvalidUrl(url));
        }

        let page = self.fetcher.fetch_page(&url).await?;
        let ok = (200..300).contains(&page.status);
        let content_length = page.body.len();

        if ok {
            context.html = Some(page.body);
            context.final_url = Some(page.final_url.clone());
        } else {
            warn!("fetch_page {} returned status {}", url, page.status);
        }

        // The body stays in the context; the model only sees its size.
        Ok(json!({
            "ok": ok,
            "status": page.status,
            "content_type": page.content_type,
            "content_length": content_length,
            "final_url": page.final_url,
        }))
    }

    async fn fetch_image(
        &self,
        args: UrlArgs,
        context: &mut ExtractionToolContext,
    ) -> Result<Value, ExtractError> {
        let url = args
            .url
            .or_else(|| context.recipe.as_ref().and_then(|r| r.image_url.clone()))
            .ok_or_else(|| ExtractError::InvalidUrl("no image URL".to_string()))?;
        if !is_valid_url(&url) {
            return Err(ExtractError::InvalidUrl(url));
        }

        let Some(content_type) = self.fetcher.head_image(&url).await? else {
            return Ok(json!({"valid": false, "image_url": url}));
        };

        // Resizing is out of scope: the original doubles as the thumbnail.
        if let Some(recipe) = context.recipe.as_mut() {
            if recipe.image_url.is_none() || recipe.image_url.as_deref() == Some(url.as_str()) {
                recipe.image_url = Some(url.clone());
                recipe.thumbnail_url = Some(url.clone());
            }
        }

        Ok(json!({
            "valid": true,
            "content_type": content_type,
            "image_url": url,
            "thumbnail_url": url,
        }))
    }

    async fn save_recipe(
        &self,
        args: SaveArgs,
        context: &mut ExtractionToolContext,
    ) -> Result<Value, ExtractError> {
        if let Some(draft) = args.recipe {
            context.set_recipe(draft.into_recipe(), ExtractorKind::Llm);
        }

        let mut recipe = context.recipe.clone().ok_or(ExtractError::MissingRecipe)?;
        let texts: Vec<&str> = recipe.ingredients.iter().map(|i| i.text.as_str()).collect();
        recipe.ingredients = parse_ingredients(&texts);
        if recipe.title.trim().is_empty() {
            recipe.title = UNTITLED_RECIPE.to_string();
        }

        let extractor = args
            .extractor
            .or(context.extractor)
            .unwrap_or(ExtractorKind::Llm);
        let confidence = args
            .confidence
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or_else(|| extractor.default_confidence());

        let record = SavedRecipe {
            id: String::new(),
            user_id: context.user_id.clone(),
            source_url: context.url.clone(),
            cache_key: context.cache_key.clone(),
            recipe: recipe.clone(),
            extracted_at: Utc::now(),
            confidence,
            extractor_used: extractor,
            agents_used: context.agents_used.clone(),
            user_modified: false,
        };

        let id = self.cache.save(record).await?;
        debug!("Saved '{}' as {} for {}", recipe.title, id, context.user_id);
        context.recipe = Some(recipe);
        context.extractor = Some(extractor);
        context.saved_id = Some(id.clone());

        Ok(json!({
            "saved": true,
            "recipe_id": id,
            "cache_key": context.cache_key,
            "extractor": extractor,
            "confidence": confidence,
        }))
    }
}

fn html_source<'a>(
    explicit: &'a Option<String>,
    context: &'a ExtractionToolContext,
) -> Result<&'a str, ExtractError> {
    explicit
        .as_deref()
        .or(context.html.as_deref())
        .ok_or(ExtractError::MissingHtml)
}

fn page_url(context: &ExtractionToolContext) -> &str {
    context.final_url.as_deref().unwrap_or(&context.url)
}

fn found(recipe: &Recipe, extractor: ExtractorKind) -> Result<Value, ExtractError> {
    Ok(json!({
        "found": true,
        "extractor": extractor,
        "complete": recipe.is_complete(),
        "recipe": serde_json::to_value(recipe)?,
    }))
}

fn extract_with(
    args: HtmlArgs,
    context: &mut ExtractionToolContext,
    extractor: &dyn Extractor,
) -> Result<Value, ExtractError> {
    let html = html_source(&args.html, context)?;
    let recipe = extractor.extract(&ParsingContext {
        url: page_url(context),
        html,
    });

    let Some(recipe) = recipe else {
        return Ok(json!({"found": false}));
    };
    let kind = extractor.kind();
    let result = found(&recipe, kind)?;
    context.set_recipe(recipe, kind);
    Ok(result)
}

fn extract_heuristic(
    args: HtmlArgs,
    context: &mut ExtractionToolContext,
) -> Result<Value, ExtractError> {
    let html = html_source(&args.html, context)?;
    let max_chars = args.max_chars.unwrap_or(DEFAULT_EXCERPT_CHARS);

    let parsing = ParsingContext {
        url: page_url(context),
        html,
    };
    let extractors: [&dyn Extractor; 2] = [&JsonLdExtractor, &GenericExtractor];
    let candidate = extractors
        .iter()
        .find_map(|extractor| Some((extractor.extract(&parsing)?, extractor.kind())));

    let Some((recipe, kind)) = candidate else {
        return Ok(json!({
            "found": false,
            "page_text": page_text_excerpt(html, max_chars),
        }));
    };

    let mut result = found(&recipe, kind)?;
    if !recipe.is_complete() {
        result["page_text"] = json!(page_text_excerpt(html, max_chars));
    }
    context.set_recipe(recipe, kind);
    Ok(result)
}

fn parse_ingredient_list(
    args: IngredientListArgs,
    context: &mut ExtractionToolContext,
) -> Result<Value, ExtractError> {
    if let Some(lines) = args.ingredients {
        return Ok(serde_json::to_value(parse_ingredients(&lines))?);
    }

    let recipe = context.recipe.as_mut().ok_or(ExtractError::MissingRecipe)?;
    let texts: Vec<&str> = recipe.ingredients.iter().map(|i| i.text.as_str()).collect();
    recipe.ingredients = parse_ingredients(&texts);
    Ok(serde_json::to_value(&recipe.ingredients)?)
}
