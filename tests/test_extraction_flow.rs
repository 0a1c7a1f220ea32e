use recipe_extractor::{
    cache_key, ErrorCode, ExtractOptions, ExtractorKind, InMemoryStore, RecipeExtractor,
    RecipeStore, ResultSource,
};
use std::sync::Arc;

const LASAGNA_PAGE: &str = r#"
<html>
<head>
  <title>Weeknight Lasagna | Example Kitchen</title>
  <script type="application/ld+json">
  {
    "@context": "https://schema.org",
    "@graph": [
      {"@type": "WebSite", "name": "Example Kitchen"},
      {
        "@type": "Recipe",
        "name": "Weeknight Lasagna",
        "description": "Cheesy &amp; quick.",
        "image": ["https://example.com/lasagna.jpg"],
        "recipeYield": "6 servings",
        "prepTime": "PT20M",
        "cookTime": "PT45M",
        "recipeIngredient": [
          "1 lb ground beef",
          "2 cups ricotta cheese",
          "1 (24 oz) jar marinara sauce",
          "12 lasagna noodles"
        ],
        "recipeInstructions": [
          {"@type": "HowToStep", "text": "Brown the beef."},
          {"@type": "HowToStep", "text": "Layer noodles, sauce and cheese."},
          {"@type": "HowToStep", "text": "Bake for 45 minutes, then let rest for 15 minutes."}
        ]
      }
    ]
  }
  </script>
</head>
<body><h1>Weeknight Lasagna</h1></body>
</html>
"#;

async fn serve(server: &mut mockito::ServerGuard, path: &str, body: &str) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test]
async fn test_fast_path_extracts_and_saves() {
    let mut server = mockito::Server::new_async().await;
    let page = serve(&mut server, "/lasagna", LASAGNA_PAGE).await;
    let url = format!("{}/lasagna", server.url());

    let store = Arc::new(InMemoryStore::new());
    let extractor = RecipeExtractor::builder()
        .store(store.clone())
        .build()
        .unwrap();

    let result = extractor
        .extract(&url, "alice", ExtractOptions::default())
        .await;
    page.assert_async().await;

    assert!(result.success, "{:?}", result.error);
    assert!(!result.cached);
    assert_eq!(result.metadata.source, ResultSource::FreshExtraction);
    assert_eq!(
        result.metadata.agents_used,
        vec![
            "check_cache",
            "fetch_page",
            "extract_structured",
            "parse_ingredients",
            "save_recipe"
        ]
    );
    assert_eq!(result.metadata.extractor_used, Some(ExtractorKind::SchemaFastPath));
    assert!((result.metadata.confidence.unwrap() - 0.95).abs() < 1e-6);

    let record = result.recipe.unwrap();
    assert!(!record.id.is_empty());
    assert_eq!(record.user_id, "alice");
    assert_eq!(record.cache_key, cache_key(&url));
    assert_eq!(record.recipe.title, "Weeknight Lasagna");
    assert_eq!(record.recipe.description.as_deref(), Some("Cheesy & quick."));
    assert_eq!(record.recipe.servings, Some(6));
    assert_eq!(record.recipe.prep_time, Some(20));
    assert_eq!(record.recipe.cook_time, Some(45));
    assert_eq!(record.recipe.inactive_time, Some(15));
    assert_eq!(record.recipe.ingredients.len(), 4);
    assert_eq!(record.recipe.ingredients[0].quantity, Some(1.0));
    assert_eq!(record.recipe.ingredients[0].unit.as_deref(), Some("lb"));
    assert_eq!(record.recipe.ingredients[0].category.as_str(), "meat_seafood");
    assert_eq!(record.recipe.ingredients[1].category.as_str(), "dairy");

    let stored = store
        .get(
            &recipe_extractor::cache::Scope::Global,
            &cache_key(&url),
        )
        .await
        .unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn test_global_then_user_cache_without_refetch() {
    let mut server = mockito::Server::new_async().await;
    let page = server
        .mock("GET", "/lasagna")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(LASAGNA_PAGE)
        .expect(1)
        .create_async()
        .await;
    let url = format!("{}/lasagna", server.url());

    let extractor = RecipeExtractor::builder().build().unwrap();
    let first = extractor
        .extract(&url, "alice", ExtractOptions::default())
        .await;
    assert!(first.success);

    // Same page through a tracking link
    let tracked = format!("{}/lasagna/?utm_source=newsletter", server.url());
    let second = extractor
        .extract(&tracked, "bob", ExtractOptions::default())
        .await;
    assert!(second.success);
    assert!(second.cached);
    assert_eq!(second.metadata.source, ResultSource::GlobalCache);
    assert_eq!(second.metadata.agents_used, vec!["check_cache"]);
    let bob_record = second.recipe.unwrap();
    assert_eq!(bob_record.user_id, "bob");
    assert_eq!(bob_record.recipe.title, "Weeknight Lasagna");

    let third = extractor
        .extract(&url, "bob", ExtractOptions::default())
        .await;
    assert!(third.cached);
    assert_eq!(third.metadata.source, ResultSource::UserCache);
    assert_eq!(third.recipe.unwrap().id, bob_record.id);

    page.assert_async().await;
}

#[tokio::test]
async fn test_force_refresh_refetches_and_keeps_id() {
    let mut server = mockito::Server::new_async().await;
    let page = server
        .mock("GET", "/lasagna")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(LASAGNA_PAGE)
        .expect(2)
        .create_async()
        .await;
    let url = format!("{}/lasagna", server.url());

    let extractor = RecipeExtractor::builder().build().unwrap();
    let first = extractor
        .extract(&url, "alice", ExtractOptions::default())
        .await;
    let first_id = first.recipe.unwrap().id;

    let refreshed = extractor
        .extract(&url, "alice", ExtractOptions { force_refresh: true })
        .await;
    assert!(refreshed.success);
    assert!(!refreshed.cached);
    assert_eq!(refreshed.metadata.source, ResultSource::FreshExtraction);
    assert_eq!(refreshed.metadata.agents_used[0], "fetch_page");
    assert_eq!(refreshed.recipe.unwrap().id, first_id);

    page.assert_async().await;
}

#[tokio::test]
async fn test_user_edits_are_served_from_cache() {
    let mut server = mockito::Server::new_async().await;
    serve(&mut server, "/lasagna", LASAGNA_PAGE).await;
    let url = format!("{}/lasagna", server.url());

    let extractor = RecipeExtractor::builder().build().unwrap();
    let first = extractor
        .extract(&url, "alice", ExtractOptions::default())
        .await;
    let mut edited = first.recipe.unwrap().recipe;
    edited.title = "Alice's Lasagna".to_string();

    let marked = extractor
        .cache()
        .mark_user_modified("alice", &cache_key(&url), edited)
        .await
        .unwrap()
        .unwrap();
    assert!(marked.user_modified);

    let cached = extractor
        .extract(&url, "alice", ExtractOptions::default())
        .await;
    assert_eq!(cached.recipe.unwrap().recipe.title, "Alice's Lasagna");
}

#[tokio::test]
async fn test_invalid_url_makes_no_request() {
    let extractor = RecipeExtractor::builder().build().unwrap();

    for url in ["not a url", "", "mailto:chef@example.com", "file:///etc/passwd"] {
        let result = extractor.extract(url, "alice", ExtractOptions::default()).await;
        assert!(!result.success);
        assert!(result.recipe.is_none());
        assert_eq!(result.metadata.source, ResultSource::Error);
        assert_eq!(result.error.unwrap().code, ErrorCode::InvalidUrl);
    }
}

#[tokio::test]
async fn test_missing_page_without_llm() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/gone")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;
    let url = format!("{}/gone", server.url());

    let extractor = RecipeExtractor::builder().build().unwrap();
    let result = extractor
        .extract(&url, "alice", ExtractOptions::default())
        .await;

    assert!(!result.success);
    assert_eq!(result.metadata.source, ResultSource::ExtractionFailed);
    assert_eq!(result.metadata.agents_used, vec!["check_cache", "fetch_page"]);
    let error = result.error.unwrap();
    assert_eq!(error.code, ErrorCode::NoRecipeFound);
    assert!(!error.retryable);
}

#[tokio::test]
async fn test_page_without_structured_data_without_llm() {
    let mut server = mockito::Server::new_async().await;
    serve(
        &mut server,
        "/blog",
        "<html><body><h1>My trip</h1><p>No recipe here.</p></body></html>",
    )
    .await;
    let url = format!("{}/blog", server.url());

    let extractor = RecipeExtractor::builder().build().unwrap();
    let result = extractor
        .extract(&url, "alice", ExtractOptions::default())
        .await;

    assert!(!result.success);
    assert_eq!(
        result.metadata.agents_used,
        vec!["check_cache", "fetch_page", "extract_structured"]
    );

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["error"]["code"], "NO_RECIPE_FOUND");
    assert_eq!(json["metadata"]["source"], "extraction_failed");
}
