use super::{decode_html_symbols, element_text, Extractor, ParsingContext};
use crate::model::{ExtractorKind, ParsedIngredient, Recipe, UNTITLED_RECIPE};
use crate::passive_time::extract_passive_minutes;
use log::debug;
use scraper::{ElementRef, Html, Selector};

/// Last-resort heuristics for pages without structured data or a known
/// recipe card: section headings, loosely named classes and Open Graph tags.
pub struct GenericExtractor;

const INGREDIENT_HEADINGS: &[&str] = &["ingredients"];
const INSTRUCTION_HEADINGS: &[&str] = &["instructions", "directions", "method", "preparation", "steps"];

const INGREDIENT_CLASSES: &str = r#"[class*="ingredient"]"#;
const INSTRUCTION_CLASSES: &str =
    r#"[class*="instruction"], [class*="direction"], [class*="method"], [class*="step"]"#;

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

fn is_heading(element: &ElementRef) -> bool {
    matches!(
        element.value().name(),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    )
}

fn list_items(element: &ElementRef) -> Vec<String> {
    let Ok(li) = Selector::parse("li") else {
        return Vec::new();
    };
    element
        .select(&li)
        .map(|item| decode_html_symbols(&element_text(&item)))
        .filter(|item| !item.is_empty())
        .collect()
}

/// Items of the first list following a heading whose text starts with one
/// of `names`. Stops at the next heading.
fn list_after_heading(document: &Html, names: &[&str]) -> Vec<String> {
    let Ok(headings) = Selector::parse("h1, h2, h3, h4, h5, h6") else {
        return Vec::new();
    };

    for heading in document.select(&headings) {
        let text = element_text(&heading).to_lowercase();
        if !names.iter().any(|name| text.starts_with(name)) {
            continue;
        }

        for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
            if is_heading(&sibling) {
                break;
            }
            let items = list_items(&sibling);
            if !items.is_empty() {
                debug!("Found {} items under heading '{}'", items.len(), text);
                return items;
            }
        }
    }

    Vec::new()
}

/// Items from the first element whose class merely mentions the field.
fn list_by_fuzzy_class(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|element| list_items(&element))
        .find(|items| !items.is_empty())
        .unwrap_or_default()
}

fn meta_content(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(
        r#"meta[property="{property}"], meta[name="{property}"]"#
    ))
    .ok()?;
    document
        .select(&selector)
        .filter_map(|meta| meta.value().attr("content"))
        .map(|content| decode_html_symbols(content.trim()))
        .find(|content| !content.is_empty())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(|element| decode_html_symbols(&element_text(&element)))
        .find(|text| !text.is_empty())
}

impl Extractor for GenericExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Generic
    }

    fn extract(&self, context: &ParsingContext) -> Option<Recipe> {
        debug!("Attempting generic extraction for {}", context.url);
        let document = Html::parse_document(context.html);

        let mut ingredients = list_after_heading(&document, INGREDIENT_HEADINGS);
        if ingredients.is_empty() {
            ingredients = list_by_fuzzy_class(&document, INGREDIENT_CLASSES);
        }
        let mut instructions = list_after_heading(&document, INSTRUCTION_HEADINGS);
        if instructions.is_empty() {
            instructions = list_by_fuzzy_class(&document, INSTRUCTION_CLASSES);
        }

        if ingredients.is_empty() && instructions.is_empty() {
            debug!("Generic heuristics found no ingredient or instruction lists");
            return None;
        }

        let title = meta_content(&document, "og:title")
            .or_else(|| first_text(&document, "h1"))
            .or_else(|| first_text(&document, "title"))
            .unwrap_or_else(|| UNTITLED_RECIPE.to_string());

        Some(Recipe {
            title,
            description: meta_content(&document, "og:description")
                .or_else(|| meta_content(&document, "description")),
            ingredients: ingredients.into_iter().map(ParsedIngredient::unparsed).collect(),
            inactive_time: Some(extract_passive_minutes(&instructions)).filter(|m| *m > 0),
            image_url: meta_content(&document, "og:image"),
            instructions,
            ..Default::default()
        })
    }
}

/// Visible page text with scripts and styles removed, whitespace collapsed
/// and cut to at most `max_chars` characters.
pub fn page_text_excerpt(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut words: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_TAGS.contains(&el.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ").chars().take(max_chars).collect()
}
