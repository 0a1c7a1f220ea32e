//! URL canonicalization and cache-key derivation.
//!
//! The cache key is a dedup fingerprint, not a security boundary. The hash is
//! the classic `hash * 31 + code_unit` over UTF-16 code units with 32-bit
//! wraparound; stored keys depend on it staying bit-for-bit identical.

use url::Url;

/// Query parameters that never change what page is served.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "fbclid",
    "gclid",
    "dclid",
    "msclkid",
    "yclid",
    "twclid",
    "igshid",
    "mc_cid",
    "mc_eid",
    "ref",
    "source",
    "referrer",
    "origin",
    "print",
    "printview",
    "shared",
];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Canonicalize a URL so that trivially different links share a cache key.
///
/// Input that does not parse as a URL is returned unchanged.
pub fn normalize(url: &str) -> String {
    let mut parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return url.to_string(),
    };

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    // Stable: repeated keys keep their relative order
    params.sort_by(|a, b| a.0.cmp(&b.0));

    if params.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(params);
    }

    if let Some(stripped) = parsed.host_str().and_then(|h| h.strip_prefix("www.")) {
        let stripped = stripped.to_string();
        let _ = parsed.set_host(Some(&stripped));
    }

    let path = parsed.path().to_string();
    if path != "/" && path.ends_with('/') {
        parsed.set_path(&path[..path.len() - 1]);
    }

    // The url crate already lowercases scheme and host and leaves path/query alone
    parsed.to_string()
}

/// True only for parseable `http`/`https` URLs with a host.
pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        })
        .unwrap_or(false)
}

fn rolling_hash<I: Iterator<Item = u16>>(units: I) -> i32 {
    units.fold(0i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(i32::from(unit))
    })
}

/// Derive the 16-character lowercase hex cache key for a URL.
pub fn cache_key(url: &str) -> String {
    let normalized = normalize(url);
    let units: Vec<u16> = normalized.encode_utf16().collect();

    let forward = rolling_hash(units.iter().copied());
    let backward = rolling_hash(units.iter().rev().copied());

    let combined = format!(
        "{:x}{:x}",
        i64::from(forward).abs(),
        i64::from(backward).abs()
    );
    let padded = format!("{combined:0>16}");
    padded.chars().take(16).collect()
}
