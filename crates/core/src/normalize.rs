//! Normalization helpers for contractor identity comparison.
//!
//! All comparisons in the dedup engine run over normalized values, never
//! over raw user input. Each function returns `None` when the input
//! normalizes to nothing usable.

/// Business suffixes stripped during name normalization.
const NAME_SUFFIXES: &[&str] = &[
    " llc", " inc", " corp", " ltd", " co", " company", " services", " service",
];

/// Normalize a business name: lowercase, trim, strip one trailing
/// business suffix (`LLC`, `Inc`, ...).
pub fn normalize_name(name: &str) -> Option<String> {
    let mut normalized = name.trim().to_lowercase();
    for suffix in NAME_SUFFIXES {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            normalized = stripped.trim_end().to_string();
            break;
        }
    }
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Normalize a phone number to its last 10 digits (country code ignored).
///
/// Returns whatever digits remain when fewer than 10 are present, and
/// `None` when the input contains no digits at all.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    if digits.len() >= 10 {
        Some(digits[digits.len() - 10..].to_string())
    } else {
        Some(digits)
    }
}

/// Normalize a street address: lowercase, strip punctuation, collapse
/// runs of whitespace to a single space.
pub fn normalize_address(address: &str) -> Option<String> {
    let cleaned: String = address
        .to_lowercase()
        .chars()
        .map(|c| if c == '.' || c == ',' || c == '#' { ' ' } else { c })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- normalize_name -------------------------------------------------------

    #[test]
    fn name_lowercases_and_trims() {
        assert_eq!(normalize_name("  Smith Plumbing  "), Some("smith plumbing".into()));
    }

    #[test]
    fn name_strips_business_suffix() {
        assert_eq!(normalize_name("Smith Plumbing LLC"), Some("smith plumbing".into()));
        assert_eq!(normalize_name("Acme Roofing Inc"), Some("acme roofing".into()));
        assert_eq!(normalize_name("Valley HVAC Services"), Some("valley hvac".into()));
    }

    #[test]
    fn name_strips_only_one_suffix() {
        // Only the trailing suffix is removed, not interior words.
        assert_eq!(
            normalize_name("Company Services"),
            Some("company".into())
        );
    }

    #[test]
    fn empty_name_returns_none() {
        assert_eq!(normalize_name("   "), None);
    }

    // -- normalize_phone ------------------------------------------------------

    #[test]
    fn phone_extracts_digits() {
        assert_eq!(normalize_phone("(304) 555-0123"), Some("3045550123".into()));
    }

    #[test]
    fn phone_drops_country_code() {
        assert_eq!(normalize_phone("+1 304 555 0123"), Some("3045550123".into()));
    }

    #[test]
    fn short_phone_kept_as_is() {
        assert_eq!(normalize_phone("555-0123"), Some("5550123".into()));
    }

    #[test]
    fn phone_without_digits_returns_none() {
        assert_eq!(normalize_phone("n/a"), None);
    }

    // -- normalize_address ----------------------------------------------------

    #[test]
    fn address_strips_punctuation_and_collapses_whitespace() {
        assert_eq!(
            normalize_address("123 Main St.,  Suite #4"),
            Some("123 main st suite 4".into())
        );
    }

    #[test]
    fn empty_address_returns_none() {
        assert_eq!(normalize_address(" , "), None);
    }
}
