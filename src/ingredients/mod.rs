mod categories;
mod parser;

pub use categories::{classify, IngredientCategory};
pub use parser::{parse_ingredient, parse_ingredients};
