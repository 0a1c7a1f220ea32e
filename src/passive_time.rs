//! Estimates inactive (waiting) minutes from instruction text.

use log::debug;
use regex::Regex;
use std::sync::LazyLock;

/// A duration such as "30 minutes", "1 1/2 hours" or "1 to 2 hrs".
const DURATION: &str = r"(?P<low>\d+(?:\.\d+)?(?:\s+\d+/\d+)?|\d+/\d+)(?:\s*(?:-|–|to)\s*(?P<high>\d+(?:\.\d+)?(?:\s+\d+/\d+)?|\d+/\d+))?\s*(?P<unit>hours?|hrs?|minutes?|mins?)\b";

/// Up to six filler words between the verb and the duration ("for about", "in the fridge for").
const FILLER: &str = r"(?:[a-z,']+\s+){0,6}?";

/// Verb groups in scan order. Earlier groups win overlapping spans.
const VERBS: &[&str] = &[
    r"(?:rise|rising|proof|proofing|ferment|fermenting)",
    r"(?:rest|resting|sit|sitting|stand|standing)",
    r"(?:chill|chilling|refrigerate|refrigerating|cool|cooling)",
    r"(?:marinate|marinating)",
    r"(?:soak|soaking)",
    r"(?:freeze|freezing)",
    r"(?:set|setting)",
    r"(?:wait|waiting)",
];

static PASSIVE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    VERBS
        .iter()
        .map(|verb| {
            Regex::new(&format!(r"\b{verb}\b\s+{FILLER}{DURATION}"))
                .expect("Invalid passive time regex")
        })
        .collect()
});

static OVERNIGHT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let verbs = r"(?:rise|proof|ferment|rest|sit|stand|chill|refrigerate|marinate|soak|set|freeze)\w*";
    Regex::new(&format!(
        r"\b{verbs}\b[^.]{{0,40}}\bovernight\b|\bovernight\b[^.]{{0,40}}\b{verbs}\b"
    ))
    .expect("Invalid overnight regex")
});

static FRIDGE_HOURS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<a>\d+)\s*(?:hours?|hrs?)\s+(?:[a-z]+\s+){0,3}?(?:fridge|refrigerator)|(?:fridge|refrigerator)\s+(?:[a-z]+\s+){0,3}?(?P<b>\d+)\s*(?:hours?|hrs?)",
    )
    .expect("Invalid fridge regex")
});

const OVERNIGHT_MINUTES: u32 = 8 * 60;

/// Parse "2", "1.5", "1/2" or "1 1/2".
fn parse_amount(text: &str) -> Option<f64> {
    let mut total = 0.0;
    for part in text.split_whitespace() {
        if let Some((num, den)) = part.split_once('/') {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            total += num / den;
        } else {
            total += part.parse::<f64>().ok()?;
        }
    }
    Some(total)
}

/// Estimate passive minutes (rising, resting, chilling, ...) across all steps.
///
/// Returns 0 when nothing is detected.
pub fn extract_passive_minutes(instructions: &[String]) -> u32 {
    let text = instructions.join(" ").to_lowercase();
    let mut accepted: Vec<(usize, usize)> = Vec::new();
    let mut total: f64 = 0.0;

    for pattern in PASSIVE_PATTERNS.iter() {
        for caps in pattern.captures_iter(&text) {
            let Some(whole) = caps.get(0) else { continue };
            let span = (whole.start(), whole.end());
            if accepted.iter().any(|&(s, e)| span.0 < e && s < span.1) {
                continue;
            }

            let low = caps.name("low").and_then(|m| parse_amount(m.as_str()));
            let high = caps.name("high").and_then(|m| parse_amount(m.as_str()));
            let amount = match (low, high) {
                (Some(low), Some(high)) => low.min(high),
                (Some(low), None) => low,
                _ => continue,
            };
            let unit = caps.name("unit").map(|m| m.as_str()).unwrap_or("");
            let minutes = if unit.starts_with('h') {
                amount * 60.0
            } else {
                amount
            };

            debug!("Passive time match '{}' -> {} min", whole.as_str(), minutes);
            accepted.push(span);
            total += minutes;
        }
    }

    let mut total = total.round().max(0.0) as u32;

    if total < OVERNIGHT_MINUTES && OVERNIGHT_REGEX.is_match(&text) {
        debug!("Overnight passive step detected, flooring at {} min", OVERNIGHT_MINUTES);
        total = OVERNIGHT_MINUTES;
    }

    for caps in FRIDGE_HOURS_REGEX.captures_iter(&text) {
        let hours = caps
            .name("a")
            .or_else(|| caps.name("b"))
            .and_then(|m| m.as_str().parse::<u32>().ok());
        if let Some(hours) = hours {
            if hours >= 8 {
                total = total.max(hours.saturating_mul(60));
            }
        }
    }

    total
}
