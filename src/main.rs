use clap::Parser;
use log::{info, warn};
use std::sync::Arc;

use recipe_extractor::{
    ExtractOptions, ExtractorConfig, InMemoryStore, ProviderFactory, RecipeExtractor,
};

#[derive(Parser, Debug)]
#[command(
    name = "recipe-extractor",
    about = "Extract a structured recipe from a web page and print it as JSON"
)]
struct Cli {
    /// Recipe page to extract
    url: String,

    /// User the extraction is saved for
    #[arg(long, default_value = "cli")]
    user: String,

    /// Ignore cached copies and extract the page again
    #[arg(long, default_value_t = false)]
    force_refresh: bool,

    /// Skip the LLM fallback even when a provider is configured
    #[arg(long, default_value_t = false)]
    no_llm: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let config = ExtractorConfig::load()?;
    let mut builder = RecipeExtractor::builder().store(Arc::new(InMemoryStore::new()));

    if !cli.no_llm && !config.providers.is_empty() {
        match ProviderFactory::from_config(&config) {
            Ok(provider) => {
                info!("LLM fallback via {}", provider.provider_name());
                builder = builder.provider(provider);
            }
            Err(e) => warn!("LLM fallback disabled: {}", e),
        }
    }

    let mut fetch_only = config.clone();
    fetch_only.providers.clear();
    let extractor = builder.config(fetch_only).build()?;

    let result = extractor
        .extract(
            &cli.url,
            &cli.user,
            ExtractOptions {
                force_refresh: cli.force_refresh,
            },
        )
        .await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
