use super::categories::classify;
use crate::model::ParsedIngredient;
use regex::Regex;
use std::sync::LazyLock;

const VULGAR_FRACTIONS: &[(char, f64)] = &[
    ('½', 0.5),
    ('⅓', 1.0 / 3.0),
    ('⅔', 2.0 / 3.0),
    ('¼', 0.25),
    ('¾', 0.75),
    ('⅛', 0.125),
    ('⅜', 0.375),
    ('⅝', 0.625),
    ('⅞', 0.875),
];

/// Unit tokens, singular and plural, as they appear after lowercasing and
/// dropping a trailing period.
const UNITS: &[&str] = &[
    "cup", "cups",
    "tbsp", "tbsps", "tbs", "tablespoon", "tablespoons",
    "tsp", "tsps", "teaspoon", "teaspoons",
    "oz", "ounce", "ounces",
    "lb", "lbs", "pound", "pounds",
    "g", "gram", "grams",
    "kg", "kgs", "kilogram", "kilograms",
    "ml", "milliliter", "milliliters", "millilitre", "millilitres",
    "l", "liter", "liters", "litre", "litres",
    "pinch", "pinches",
    "dash", "dashes",
    "clove", "cloves",
    "can", "cans",
    "package", "packages",
    "bunch", "bunches",
    "slice", "slices",
    "piece", "pieces",
    "head", "heads",
    "stalk", "stalks",
    "sprig", "sprigs",
    "leaf", "leaves",
];

static RANGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)(?:\s*[-–]\s*|\s+to\s+)(\d+(?:\.\d+)?)")
        .expect("Invalid range regex")
});

static MIXED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(\d+)/(\d+)").expect("Invalid mixed fraction regex"));

static FRACTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)/(\d+)").expect("Invalid fraction regex"));

static DECIMAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?").expect("Invalid decimal regex"));

/// Replace unicode fractions with decimals, folding a preceding whole
/// number in ("1½" and "1 ½" both become "1.5").
fn replace_vulgar_fractions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let Some(&(_, value)) = VULGAR_FRACTIONS.iter().find(|(f, _)| *f == c) else {
            out.push(c);
            continue;
        };

        let head = out.trim_end_matches(' ');
        let digits = head.len() - head.trim_end_matches(|ch: char| ch.is_ascii_digit()).len();
        let whole_start = head.len() - digits;
        let preceded_by_word = head[..whole_start]
            .chars()
            .next_back()
            .is_some_and(|ch| !ch.is_whitespace());

        let mut amount = value;
        if digits > 0 && !preceded_by_word {
            if let Ok(whole) = head[whole_start..].parse::<f64>() {
                amount += whole;
                out.truncate(whole_start);
            }
        }
        out.push_str(&amount.to_string());

        if chars.peek().is_some_and(|next| !next.is_whitespace()) {
            out.push(' ');
        }
    }

    out
}

fn ratio(num: &str, den: &str) -> Option<f64> {
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    (den != 0.0).then(|| num / den)
}

/// Leading quantity and the rest of the string. Ranges take the lower bound.
fn split_quantity(text: &str) -> (Option<f64>, &str) {
    if let Some(caps) = RANGE_REGEX.captures(text) {
        let low: Option<f64> = caps[1].parse().ok();
        let high: Option<f64> = caps[2].parse().ok();
        if let (Some(low), Some(high)) = (low, high) {
            return (Some(low.min(high)), &text[caps[0].len()..]);
        }
    }

    if let Some(caps) = MIXED_REGEX.captures(text) {
        let whole: Option<f64> = caps[1].parse().ok();
        if let (Some(whole), Some(fraction)) = (whole, ratio(&caps[2], &caps[3])) {
            return (Some(whole + fraction), &text[caps[0].len()..]);
        }
    }

    if let Some(caps) = FRACTION_REGEX.captures(text) {
        if let Some(fraction) = ratio(&caps[1], &caps[2]) {
            return (Some(fraction), &text[caps[0].len()..]);
        }
    }

    if let Some(m) = DECIMAL_REGEX.find(text) {
        if let Ok(value) = m.as_str().parse() {
            return (Some(value), &text[m.end()..]);
        }
    }

    (None, text)
}

/// Leading unit token (lowercased, period stripped) and the rest.
fn split_unit(text: &str) -> (Option<String>, &str) {
    let text = text.trim_start();
    let (token, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    let candidate = token.to_lowercase();
    let candidate = candidate.trim_end_matches('.');

    if UNITS.contains(&candidate) {
        (Some(candidate.to_string()), rest)
    } else {
        (None, text)
    }
}

/// Parse one free-text ingredient line. Never fails; unparseable parts stay
/// in `item` and `text` is always the raw input.
pub fn parse_ingredient(raw: &str) -> ParsedIngredient {
    let (working, preparation) = match raw.rsplit_once(',') {
        Some((head, prep)) => {
            let prep = prep.trim();
            (head, (!prep.is_empty()).then(|| prep.to_string()))
        }
        None => (raw, None),
    };

    let working = replace_vulgar_fractions(working.trim());
    let (quantity, rest) = split_quantity(&working);
    let (unit, rest) = split_unit(rest);

    let rest = rest.trim();
    let item = match unit {
        Some(_) => rest.strip_prefix("of ").unwrap_or(rest),
        None => rest,
    }
    .trim()
    .to_string();

    let category = if item.is_empty() {
        classify(raw)
    } else {
        classify(&item)
    };

    ParsedIngredient {
        text: raw.to_string(),
        quantity,
        unit,
        item,
        preparation,
        category,
    }
}

pub fn parse_ingredients<S: AsRef<str>>(lines: &[S]) -> Vec<ParsedIngredient> {
    lines
        .iter()
        .map(|line| parse_ingredient(line.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingredients::IngredientCategory;

    #[test]
    fn test_mixed_number_with_preparation() {
        let parsed = parse_ingredient("2 1/2 cups flour, sifted");
        assert_eq!(parsed.text, "2 1/2 cups flour, sifted");
        assert_eq!(parsed.quantity, Some(2.5));
        assert_eq!(parsed.unit.as_deref(), Some("cups"));
        assert_eq!(parsed.item, "flour");
        assert_eq!(parsed.preparation.as_deref(), Some("sifted"));
        assert_eq!(parsed.category, IngredientCategory::Pantry);
    }

    #[test]
    fn test_range_takes_lower_bound() {
        let parsed = parse_ingredient("2-3 cloves garlic, minced");
        assert_eq!(parsed.quantity, Some(2.0));
        assert_eq!(parsed.unit.as_deref(), Some("cloves"));
        assert_eq!(parsed.item, "garlic");
        assert_eq!(parsed.category, IngredientCategory::Produce);

        let parsed = parse_ingredient("1 to 2 tbsp. olive oil");
        assert_eq!(parsed.quantity, Some(1.0));
        assert_eq!(parsed.unit.as_deref(), Some("tbsp"));
        assert_eq!(parsed.item, "olive oil");
    }

    #[test]
    fn test_simple_fraction_and_decimal() {
        let parsed = parse_ingredient("1/4 tsp onion powder");
        assert_eq!(parsed.quantity, Some(0.25));
        assert_eq!(parsed.unit.as_deref(), Some("tsp"));
        assert_eq!(parsed.category, IngredientCategory::Spices);

        let parsed = parse_ingredient("1.5 lbs chicken thighs");
        assert_eq!(parsed.quantity, Some(1.5));
        assert_eq!(parsed.unit.as_deref(), Some("lbs"));
        assert_eq!(parsed.item, "chicken thighs");
    }

    #[test]
    fn test_vulgar_fractions() {
        let parsed = parse_ingredient("½ cup milk");
        assert_eq!(parsed.quantity, Some(0.5));
        assert_eq!(parsed.unit.as_deref(), Some("cup"));
        assert_eq!(parsed.item, "milk");

        assert_eq!(parse_ingredient("1½ cups sugar").quantity, Some(1.5));
        assert_eq!(parse_ingredient("1 ¾ cups sugar").quantity, Some(1.75));
        assert_eq!(parse_ingredient("¼cup water").unit.as_deref(), Some("cup"));
    }

    #[test]
    fn test_no_quantity() {
        let parsed = parse_ingredient("Salt and pepper to taste");
        assert_eq!(parsed.quantity, None);
        assert_eq!(parsed.unit, None);
        assert_eq!(parsed.item, "Salt and pepper to taste");
        assert_eq!(parsed.category, IngredientCategory::Spices);

        let parsed = parse_ingredient("pinch of nutmeg");
        assert_eq!(parsed.unit.as_deref(), Some("pinch"));
        assert_eq!(parsed.item, "nutmeg");
    }

    #[test]
    fn test_no_unit() {
        let parsed = parse_ingredient("3 large eggs");
        assert_eq!(parsed.quantity, Some(3.0));
        assert_eq!(parsed.unit, None);
        assert_eq!(parsed.item, "large eggs");
        assert_eq!(parsed.category, IngredientCategory::Dairy);
    }

    #[test]
    fn test_canned_over_produce() {
        let parsed = parse_ingredient("1 can canned tomatoes, drained");
        assert_eq!(parsed.unit.as_deref(), Some("can"));
        assert_eq!(parsed.item, "canned tomatoes");
        assert_eq!(parsed.category, IngredientCategory::Canned);
    }

    #[test]
    fn test_degenerate_input() {
        let parsed = parse_ingredient("");
        assert_eq!(parsed.text, "");
        assert_eq!(parsed.item, "");
        assert_eq!(parsed.category, IngredientCategory::Other);

        let parsed = parse_ingredient("1/0 cup mystery");
        assert_eq!(parsed.text, "1/0 cup mystery");
        assert_eq!(parsed.quantity, Some(1.0));
    }

    #[test]
    fn test_parse_many() {
        let parsed = parse_ingredients(&["1 cup rice", "2 cups water"]);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].quantity, Some(2.0));
    }

    #[test]
    fn test_categories_ignore_words_inside_words() {
        let cases = [
            ("1 small bunch cilantro", IngredientCategory::Produce),
            ("1 heaping teaspoon sugar", IngredientCategory::Pantry),
            ("2 cups rolled oats", IngredientCategory::Pantry),
            ("1 cup steamed rice", IngredientCategory::Pantry),
            ("9 graham crackers", IngredientCategory::Pantry),
        ];
        for (line, category) in cases {
            assert_eq!(parse_ingredient(line).category, category, "{line}");
        }
    }
}
