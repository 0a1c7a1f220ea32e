use crate::model::{ExtractorKind, Recipe};
use scraper::ElementRef;

mod generic;
mod html_class;
mod json_ld;

pub use generic::{page_text_excerpt, GenericExtractor};
pub use html_class::HtmlClassExtractor;
pub use json_ld::{extract_from_markup, parse_time, JsonLdExtractor};

/// Everything an extractor needs to look at one page.
pub struct ParsingContext<'a> {
    pub url: &'a str,
    pub html: &'a str,
}

/// A page-to-recipe strategy. Extractors never fail loudly: `None` means
/// "nothing usable here" and the caller decides what to try next.
pub trait Extractor {
    fn kind(&self) -> ExtractorKind;
    fn extract(&self, context: &ParsingContext) -> Option<Recipe>;
}

/// Visible text of an element with whitespace collapsed.
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode entities twice; some publishers double-encode (`&amp;amp;`).
fn decode_html_symbols(text: &str) -> String {
    html_escape::decode_html_entities(&html_escape::decode_html_entities(text)).into_owned()
}
