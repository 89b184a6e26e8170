//! Identity keys, the field merge policy, and completeness scoring for
//! the duplicate cleanup engine.
//!
//! Two records are considered the same contractor when their identity
//! keys match: `(normalized name, normalized phone, normalized address)`.
//! No database access, pure domain logic; the repository layer applies
//! these decisions to stored rows.

use crate::error::CoreError;
use crate::normalize::{normalize_address, normalize_name, normalize_phone};

/// Identity key for duplicate detection.
///
/// Missing phone/address components participate as empty strings, so two
/// records that both lack a phone still collide when name and address
/// agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// Build the identity key for a record.
///
/// Returns `None` when the name normalizes to nothing; a record without
/// a usable business name never matches anything.
pub fn identity_key(
    name: &str,
    phone: Option<&str>,
    address: Option<&str>,
) -> Option<IdentityKey> {
    let name = normalize_name(name)?;
    Some(IdentityKey {
        name,
        phone: phone.and_then(normalize_phone).unwrap_or_default(),
        address: address.and_then(normalize_address).unwrap_or_default(),
    })
}

/// Returns `true` when an optional field holds a non-empty value.
pub fn is_filled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Per-field merge policy for [`merge_or_insert`]-style operations.
///
/// A non-empty incoming value wins; an empty incoming value never clears
/// an existing one.
pub fn merge_field(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    if is_filled(incoming) {
        incoming.map(str::to_string)
    } else {
        existing.filter(|v| !v.trim().is_empty()).map(str::to_string)
    }
}

/// Count the non-empty fields of a record.
///
/// Used to pick the keeper of a duplicate group: the most complete record
/// survives; ties are broken by the caller on creation order.
pub fn completeness(fields: &[Option<&str>]) -> usize {
    fields.iter().filter(|f| is_filled(**f)).count()
}

/// Validate the keep-set for a location cleanup.
///
/// An empty keep-set would delete every record and is rejected as a
/// validation error rather than executed.
pub fn validate_keep_states(keep: &[String]) -> Result<(), CoreError> {
    if keep.iter().all(|s| s.trim().is_empty()) {
        return Err(CoreError::Validation(
            "At least one state to keep is required".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- identity_key ---------------------------------------------------------

    #[test]
    fn identical_records_share_a_key() {
        let a = identity_key("Smith Plumbing LLC", Some("(304) 555-0123"), Some("12 Oak St."));
        let b = identity_key("smith plumbing", Some("304-555-0123"), Some("12 oak st"));
        assert_eq!(a, b);
        assert!(a.is_some());
    }

    #[test]
    fn different_phones_produce_different_keys() {
        let a = identity_key("Smith Plumbing", Some("304-555-0123"), None);
        let b = identity_key("Smith Plumbing", Some("304-555-9999"), None);
        assert_ne!(a, b);
    }

    #[test]
    fn missing_phone_and_address_still_keyed_by_name() {
        let a = identity_key("Smith Plumbing", None, None);
        let b = identity_key("Smith Plumbing LLC", None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn unusable_name_yields_no_key() {
        assert_eq!(identity_key("  ", Some("304-555-0123"), None), None);
    }

    // -- merge_field ----------------------------------------------------------

    #[test]
    fn incoming_fills_empty_existing() {
        assert_eq!(merge_field(None, Some("Jane Doe")), Some("Jane Doe".into()));
    }

    #[test]
    fn empty_incoming_preserves_existing() {
        assert_eq!(merge_field(Some("Jane Doe"), None), Some("Jane Doe".into()));
        assert_eq!(merge_field(Some("Jane Doe"), Some("  ")), Some("Jane Doe".into()));
    }

    #[test]
    fn non_empty_incoming_overwrites_existing() {
        assert_eq!(
            merge_field(Some("old@example.com"), Some("new@example.com")),
            Some("new@example.com".into())
        );
    }

    #[test]
    fn both_empty_yields_none() {
        assert_eq!(merge_field(None, Some("")), None);
    }

    // -- completeness ---------------------------------------------------------

    #[test]
    fn completeness_counts_filled_fields() {
        assert_eq!(
            completeness(&[Some("a"), None, Some(""), Some("b")]),
            2
        );
    }

    // -- validate_keep_states -------------------------------------------------

    #[test]
    fn empty_keep_set_rejected() {
        assert!(validate_keep_states(&[]).is_err());
        assert!(validate_keep_states(&["".to_string()]).is_err());
    }

    #[test]
    fn non_empty_keep_set_accepted() {
        assert!(validate_keep_states(&["WV".to_string()]).is_ok());
    }
}
