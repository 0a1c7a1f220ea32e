use crate::config::{ExtractorConfig, ProviderConfig};
use crate::providers::{AnthropicProvider, FallbackProvider, LlmError, LlmProvider, OpenAIProvider};
use std::sync::Arc;
use std::time::Duration;

pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider instance from configuration
    pub fn create(
        provider_name: &str,
        config: &ProviderConfig,
        timeout: Duration,
    ) -> Result<Box<dyn LlmProvider>, LlmError> {
        // Validate that provider is enabled
        if !config.enabled {
            return Err(LlmError::Config(format!(
                "Provider '{}' is not enabled in configuration",
                provider_name
            )));
        }

        match provider_name {
            "openai" => Ok(Box::new(OpenAIProvider::new(config, timeout)?)),
            "anthropic" => Ok(Box::new(AnthropicProvider::new(config, timeout)?)),
            _ => Err(LlmError::Config(format!(
                "Unknown provider: {}",
                provider_name
            ))),
        }
    }

    /// Get the default provider from configuration
    pub fn get_default_provider(
        config: &ExtractorConfig,
    ) -> Result<Box<dyn LlmProvider>, LlmError> {
        let provider_name = &config.default_provider;
        let provider_config = config.providers.get(provider_name).ok_or_else(|| {
            LlmError::Config(format!(
                "Default provider '{}' not found in configuration",
                provider_name
            ))
        })?;

        Self::create(provider_name, provider_config, config.llm_timeout())
    }

    /// The provider an extractor should talk to: the fallback chain when
    /// enabled, otherwise the default provider.
    pub fn from_config(config: &ExtractorConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
        if config.fallback.enabled {
            Ok(Arc::new(FallbackProvider::new(config)?))
        } else {
            Ok(Arc::from(Self::get_default_provider(config)?))
        }
    }

    /// List all available provider names
    pub fn available_providers() -> Vec<&'static str> {
        vec!["openai", "anthropic"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn create_test_provider_config() -> ProviderConfig {
        ProviderConfig {
            enabled: true,
            model: "test-model".to_string(),
            temperature: 0.2,
            max_tokens: 2000,
            api_key: Some("test-key".to_string()),
            base_url: None,
        }
    }

    fn timeout() -> Duration {
        Duration::from_secs(10)
    }

    #[test]
    fn test_create_openai_provider() {
        let config = create_test_provider_config();
        let provider = ProviderFactory::create("openai", &config, timeout()).unwrap();
        assert_eq!(provider.provider_name(), "openai");
    }

    #[test]
    fn test_create_anthropic_provider() {
        let config = create_test_provider_config();
        let provider = ProviderFactory::create("anthropic", &config, timeout()).unwrap();
        assert_eq!(provider.provider_name(), "anthropic");
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = create_test_provider_config();
        let result = ProviderFactory::create("unknown", &config, timeout());
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("Unknown provider"));
        }
    }

    #[test]
    fn test_create_disabled_provider() {
        let mut config = create_test_provider_config();
        config.enabled = false;

        let result = ProviderFactory::create("openai", &config, timeout());
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("not enabled in configuration"));
        }
    }

    #[test]
    fn test_get_default_provider() {
        let mut providers = HashMap::new();
        providers.insert("anthropic".to_string(), create_test_provider_config());

        let config = ExtractorConfig {
            default_provider: "anthropic".to_string(),
            providers,
            ..Default::default()
        };

        let provider = ProviderFactory::get_default_provider(&config).unwrap();
        assert_eq!(provider.provider_name(), "anthropic");
    }

    #[test]
    fn test_get_default_provider_not_found() {
        let config = ExtractorConfig::default();

        let result = ProviderFactory::get_default_provider(&config);
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("not found"));
        }
    }

    #[test]
    fn test_from_config_uses_fallback_chain() {
        let mut config = ExtractorConfig::default();
        config
            .providers
            .insert("openai".to_string(), create_test_provider_config());
        config.fallback.enabled = true;
        config.fallback.order = vec!["openai".to_string()];

        let provider = ProviderFactory::from_config(&config).unwrap();
        assert_eq!(provider.provider_name(), "fallback");
    }
}
