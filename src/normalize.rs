// 🧹 Normalizer - canonical keys for names, addresses and URLs
//
// Every function here is pure. The keys they produce are what the identity
// repository matches on, so any change to them changes which records merge.

use crate::address::Address;
use crate::error::NormalizationError;

/// Postal codes are compared on their first five characters only
pub const POSTAL_CODE_PREFIX_LEN: usize = 5;

// ============================================================================
// NAMES
// ============================================================================

/// Normalize an organization or person name into a matching key.
///
/// - `-`, `/` and `,` become spaces
/// - anything outside `[A-Za-z0-9\s]` is dropped
/// - the result is upper-cased
///
/// Example: "Acme-Clinic, Inc." → "ACME CLINIC  INC"
pub fn normalize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '-' | '/' | ',' => ' ',
            other => other,
        })
        .filter(|c| c.is_ascii_alphanumeric() || c.is_ascii_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

// ============================================================================
// URLS
// ============================================================================

/// Prepend `https://` when the URL has no http(s) scheme (e.g. "foobar.com").
/// The scheme is matched case-insensitively; the URL is otherwise kept as given.
pub fn normalize_url(url: &str) -> String {
    if has_scheme(url, "https://") || has_scheme(url, "http://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

fn has_scheme(url: &str, scheme: &str) -> bool {
    url.get(..scheme.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
}

/// Scheme-normalized URL that always ends with `/`. Case is preserved.
pub fn normalize_endpoint_url(url: &str) -> String {
    let mut normalized = normalize_url(url);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Canonical endpoint identity: scheme + trailing slash, lower-cased.
pub fn normalize_endpoint_id(url: &str) -> String {
    normalize_endpoint_url(url).to_lowercase()
}

// ============================================================================
// ADDRESSES
// ============================================================================

/// First five characters of a postal code ("123456789" → "12345").
pub fn truncate_postal_code(postal_code: &str) -> &str {
    match postal_code.char_indices().nth(POSTAL_CODE_PREFIX_LEN) {
        Some((idx, _)) => &postal_code[..idx],
        None => postal_code,
    }
}

/// Canonical location key, built by the country's address format.
///
/// Lines come out of the formatter joined with `,`, country name last:
/// `123 MAIN ST,SPRINGFIELD, IL 62701,UNITED STATES`
pub fn normalize_address(
    lines: &[String],
    city: &str,
    state: &str,
    postal_code: &str,
    country: &str,
) -> Result<String, NormalizationError> {
    let address = Address::new_valid(
        lines,
        city,
        state,
        truncate_postal_code(postal_code.trim()),
        country,
    )?;

    Ok(address.format_lines().join(","))
}

// ============================================================================
// TESTS
// ============================================================================
