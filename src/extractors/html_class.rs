use super::{decode_html_symbols, element_text, Extractor, ParsingContext};
use crate::model::{ExtractorKind, ParsedIngredient, Recipe, UNTITLED_RECIPE};
use crate::passive_time::extract_passive_minutes;
use log::debug;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Selector-based extraction for the recipe-card plugins most publishers
/// embed (WP Recipe Maker, Tasty Recipes, Mediavine Create, WPZoom, ...).
pub struct HtmlClassExtractor;

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Description,
    Ingredients,
    Instructions,
    PrepTime,
    CookTime,
    TotalTime,
    Servings,
    Image,
}

impl Field {
    fn classes(&self) -> &'static [&'static str] {
        match self {
            Field::Title => &[
                "wprm-recipe-name",
                "tasty-recipes-title",
                "mv-create-title",
                "wpzoom-recipe-card-title",
                "recipe-card-title",
                "wpupg-recipe-name",
                "simple-recipe-pro-recipe-title",
            ],
            Field::Description => &[
                "wprm-recipe-summary",
                "tasty-recipes-description",
                "mv-create-description",
                "wpzoom-recipe-summary",
                "recipe-card-summary",
            ],
            Field::Ingredients => &[
                "wprm-recipe-ingredient",
                "tasty-recipes-ingredients",
                "mv-create-ingredients",
                "wpzoom-recipe-ingredients",
                "recipe-card-ingredients",
                "simple-recipe-pro-recipe-ingredients",
                "mpprecipe-ingredients",
            ],
            Field::Instructions => &[
                "wprm-recipe-instruction-text",
                "wprm-recipe-instruction",
                "tasty-recipes-instructions",
                "mv-create-instructions",
                "wpzoom-recipe-instructions",
                "recipe-card-instructions",
                "simple-recipe-pro-recipe-instructions",
                "mpprecipe-instructions",
            ],
            Field::PrepTime => &[
                "wprm-recipe-prep_time-container",
                "wprm-recipe-prep-time",
                "tasty-recipes-prep-time",
                "mv-create-time-prep",
                "wpzoom-recipe-prep-time",
            ],
            Field::CookTime => &[
                "wprm-recipe-cook_time-container",
                "wprm-recipe-cook-time",
                "tasty-recipes-cook-time",
                "mv-create-time-active",
                "wpzoom-recipe-cook-time",
            ],
            Field::TotalTime => &[
                "wprm-recipe-total_time-container",
                "wprm-recipe-total-time",
                "tasty-recipes-total-time",
                "mv-create-time-total",
                "wpzoom-recipe-total-time",
            ],
            Field::Servings => &[
                "wprm-recipe-servings",
                "tasty-recipes-yield",
                "mv-create-yield",
                "wpzoom-recipe-servings",
                "recipe-card-servings",
            ],
            Field::Image => &[
                "wprm-recipe-image",
                "tasty-recipes-image",
                "mv-create-image",
                "wpzoom-recipe-card-image",
            ],
        }
    }
}

static HOURS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:hours?|hrs?|h)\b").expect("Invalid hours regex")
});

static MINUTES_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:minutes?|mins?|m)\b").expect("Invalid minutes regex")
});

static INTEGER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid integer regex"));

/// "1 hr 30 mins" -> 90. Zero or no match is `None`.
pub(crate) fn parse_time_text(text: &str) -> Option<u32> {
    let sum = |regex: &Regex| -> u32 {
        regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1)?.as_str().parse::<u32>().ok())
            .fold(0u32, u32::saturating_add)
    };
    let minutes = sum(&HOURS_REGEX)
        .saturating_mul(60)
        .saturating_add(sum(&MINUTES_REGEX));
    (minutes > 0).then_some(minutes)
}

fn class_selector(class_name: &str) -> Option<Selector> {
    Selector::parse(&format!(".{class_name}")).ok()
}

fn find_text(document: &Html, field: Field) -> Option<String> {
    for class_name in field.classes() {
        let Some(selector) = class_selector(class_name) else { continue };
        if let Some(element) = document.select(&selector).next() {
            let text = element_text(&element);
            if !text.is_empty() {
                debug!("Found {:?} using class: {}", field, class_name);
                return Some(decode_html_symbols(&text));
            }
        }
    }
    None
}

/// Items of a list field: `<li>` children of the container, or every
/// matching element when the class marks the items themselves.
fn find_list(document: &Html, field: Field) -> Vec<String> {
    let li = Selector::parse("li").ok();

    for class_name in field.classes() {
        let Some(selector) = class_selector(class_name) else { continue };
        let mut items = Vec::new();

        for element in document.select(&selector) {
            let children: Vec<String> = li
                .as_ref()
                .map(|li| element.select(li).map(|item| element_text(&item)).collect())
                .unwrap_or_default();

            if children.is_empty() {
                items.push(element_text(&element));
            } else {
                items.extend(children);
            }
        }

        let items: Vec<String> = items
            .iter()
            .map(|item| decode_html_symbols(item).trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        if !items.is_empty() {
            debug!("Found {} {:?} using class: {}", items.len(), field, class_name);
            return items;
        }
    }

    Vec::new()
}

fn find_image(document: &Html) -> Option<String> {
    let img = Selector::parse("img").ok()?;
    for class_name in Field::Image.classes() {
        let Some(selector) = class_selector(class_name) else { continue };
        for container in document.select(&selector) {
            let candidate = if container.value().name() == "img" {
                Some(container)
            } else {
                container.select(&img).next()
            };
            let src = candidate.and_then(|el| {
                el.value()
                    .attr("data-src")
                    .or_else(|| el.value().attr("src"))
            });
            if let Some(src) = src.filter(|s| !s.is_empty()) {
                return Some(src.to_string());
            }
        }
    }
    None
}

impl Extractor for HtmlClassExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::SiteSpecific
    }

    fn extract(&self, context: &ParsingContext) -> Option<Recipe> {
        debug!("Attempting recipe-card extraction for {}", context.url);
        let document = Html::parse_document(context.html);

        let ingredients = find_list(&document, Field::Ingredients);
        let instructions = find_list(&document, Field::Instructions);
        if ingredients.is_empty() && instructions.is_empty() {
            debug!("No recipe-card markup found");
            return None;
        }

        let title = find_text(&document, Field::Title)
            .unwrap_or_else(|| UNTITLED_RECIPE.to_string());
        let inactive_time = Some(extract_passive_minutes(&instructions)).filter(|m| *m > 0);

        debug!(
            "Recipe card '{}': {} ingredients, {} steps",
            title,
            ingredients.len(),
            instructions.len()
        );

        Some(Recipe {
            title,
            description: find_text(&document, Field::Description),
            ingredients: ingredients.into_iter().map(ParsedIngredient::unparsed).collect(),
            servings: find_text(&document, Field::Servings)
                .and_then(|s| INTEGER_REGEX.find(&s)?.as_str().parse().ok())
                .filter(|n: &u32| *n > 0),
            prep_time: find_text(&document, Field::PrepTime).and_then(|t| parse_time_text(&t)),
            cook_time: find_text(&document, Field::CookTime).and_then(|t| parse_time_text(&t)),
            total_time: find_text(&document, Field::TotalTime).and_then(|t| parse_time_text(&t)),
            inactive_time,
            image_url: find_image(&document),
            instructions,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WPRM_CARD: &str = r#"
        <html><body>
        <div class="wprm-recipe-container">
          <h2 class="wprm-recipe-name">Lemon Bars</h2>
          <div class="wprm-recipe-summary">Bright and tangy.</div>
          <div class="wprm-recipe-image"><img src="https://example.com/bars.jpg"></div>
          <span class="wprm-recipe-servings">16</span>
          <div class="wprm-recipe-prep_time-container">Prep Time 20 mins</div>
          <div class="wprm-recipe-total_time-container">Total Time 1 hr 5 mins</div>
          <ul class="wprm-recipe-ingredients">
            <li class="wprm-recipe-ingredient">1 cup   flour</li>
            <li class="wprm-recipe-ingredient">2 eggs</li>
          </ul>
          <ul class="wprm-recipe-instructions">
            <li class="wprm-recipe-instruction"><div class="wprm-recipe-instruction-text">Bake the crust.</div></li>
            <li class="wprm-recipe-instruction"><div class="wprm-recipe-instruction-text">Chill for 2 hours.</div></li>
          </ul>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_wprm_card() {
        let context = ParsingContext {
            url: "https://example.com/lemon-bars",
            html: WPRM_CARD,
        };
        let recipe = HtmlClassExtractor.extract(&context).unwrap();

        assert_eq!(recipe.title, "Lemon Bars");
        assert_eq!(recipe.description.as_deref(), Some("Bright and tangy."));
        assert_eq!(recipe.image_url.as_deref(), Some("https://example.com/bars.jpg"));
        assert_eq!(recipe.servings, Some(16));
        assert_eq!(recipe.prep_time, Some(20));
        assert_eq!(recipe.total_time, Some(65));
        assert_eq!(recipe.cook_time, None);
        let texts: Vec<&str> = recipe.ingredients.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["1 cup flour", "2 eggs"]);
        assert_eq!(recipe.instructions, vec!["Bake the crust.", "Chill for 2 hours."]);
        assert_eq!(recipe.inactive_time, Some(120));
    }

    #[test]
    fn test_no_card_markup() {
        let context = ParsingContext {
            url: "https://example.com",
            html: "<html><body><h1>Blog post</h1><p>No recipe.</p></body></html>",
        };
        assert!(HtmlClassExtractor.extract(&context).is_none());
    }

    #[test]
    fn test_parse_time_text() {
        assert_eq!(parse_time_text("1 hr 30 mins"), Some(90));
        assert_eq!(parse_time_text("45 minutes"), Some(45));
        assert_eq!(parse_time_text("2 hours"), Some(120));
        assert_eq!(parse_time_text("soon"), None);
        assert_eq!(parse_time_text("100000000 hours"), Some(u32::MAX));
    }
}
