use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::agent::MAX_ITERATIONS;
use crate::cache::{CacheService, InMemoryStore, RecipeStore};
use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::extraction::RecipeExtractor;
use crate::fetchers::RequestFetcher;
use crate::providers::{LlmProvider, ProviderFactory};
use crate::tools::ToolDispatcher;

/// Builder for configuring a [`RecipeExtractor`]
#[derive(Default)]
pub struct RecipeExtractorBuilder {
    config: Option<ExtractorConfig>,
    store: Option<Arc<dyn RecipeStore>>,
    provider: Option<Arc<dyn LlmProvider>>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    max_iterations: Option<usize>,
}

impl RecipeExtractorBuilder {
    /// Use a loaded configuration (providers, fallback chain, fetch settings)
    ///
    /// # Example
    /// ```
    /// use recipe_extractor::{ExtractorConfig, RecipeExtractor};
    ///
    /// let builder = RecipeExtractor::builder().config(ExtractorConfig::default());
    /// ```
    pub fn config(mut self, config: ExtractorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the record store. Defaults to an in-memory store.
    pub fn store(mut self, store: Arc<dyn RecipeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the model used for the LLM fallback, overriding any configured
    /// provider.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the total timeout for page and image requests
    ///
    /// # Example
    /// ```
    /// use recipe_extractor::RecipeExtractor;
    /// use std::time::Duration;
    ///
    /// let builder = RecipeExtractor::builder().timeout(Duration::from_secs(15));
    /// ```
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Lower the model-turn cap for the LLM fallback (never above 10)
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    /// Build the extractor
    ///
    /// # Errors
    /// Returns `ExtractError` if the HTTP client cannot be created or a
    /// configured provider cannot be initialised.
    pub fn build(self) -> Result<RecipeExtractor, ExtractError> {
        if self.max_iterations == Some(0) {
            return Err(ExtractError::BuilderError(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        let mut config = self.config.unwrap_or_default();
        if let Some(timeout) = self.timeout {
            config.fetch.timeout_secs = timeout.as_secs().max(1);
        }
        if let Some(user_agent) = self.user_agent {
            config.fetch.user_agent = user_agent;
        }

        let provider = match self.provider {
            Some(provider) => Some(provider),
            None if config.providers.is_empty() => {
                debug!("No LLM provider configured; fallback disabled");
                None
            }
            None => Some(ProviderFactory::from_config(&config)?),
        };

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let cache = CacheService::new(store);
        let fetcher = Arc::new(RequestFetcher::new(&config.fetch)?);
        let dispatcher = ToolDispatcher::new(cache.clone(), fetcher);

        Ok(RecipeExtractor::new(
            cache,
            dispatcher,
            provider,
            self.max_iterations.unwrap_or(MAX_ITERATIONS).min(MAX_ITERATIONS),
        ))
    }
}
