//! Name derivation - human-readable names and foreign key naming conventions
//!
//! All transforms are pure functions of their input, so results are memoized in
//! process-wide caches that are never invalidated.

use dashmap::DashMap;
use heck::ToSnakeCase;
use once_cell::sync::Lazy;

/// Suffix every foreign key attribute carries
pub const ID_SUFFIX: &str = "Id";

static HUMANIZE_CACHE: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);
static SINGULARIZE_CACHE: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);
static PLURALIZE_CACHE: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);
static ID_SUFFIX_CACHE: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

fn memoized(cache: &DashMap<String, String>, input: &str, transform: impl FnOnce(&str) -> String) -> String {
    if let Some(cached) = cache.get(input) {
        return cached.clone();
    }
    let output = transform(input);
    cache.insert(input.to_string(), output.clone());
    output
}

/// Turn a programmatic identifier into a capitalized, spaced display string.
///
/// `sourceAccountId` becomes `Source account id`, `incoming_transactions`
/// becomes `Incoming transactions`.
pub fn humanize(identifier: &str) -> String {
    memoized(&HUMANIZE_CACHE, identifier, |input| {
        let words = input.trim().to_snake_case().replace('_', " ");
        upper_first(&words)
    })
}

/// Singular form of an English word, preserving its case
pub fn singularize(word: &str) -> String {
    memoized(&SINGULARIZE_CACHE, word, |input| {
        pluralizer::pluralize(input, 1, false)
    })
}

/// Plural form of an English word, preserving its case
pub fn pluralize(word: &str) -> String {
    memoized(&PLURALIZE_CACHE, word, |input| {
        pluralizer::pluralize(input, 2, false)
    })
}

/// Append the `Id` suffix unless the name already carries it.
///
/// The first character is always lower-cased, so `Owner` becomes `ownerId`.
pub fn ensure_id_suffix(name: &str) -> String {
    memoized(&ID_SUFFIX_CACHE, name, |input| {
        if input.ends_with(ID_SUFFIX) {
            lower_first(input)
        } else {
            lower_first(&format!("{}{}", input, ID_SUFFIX))
        }
    })
}

/// Foreign key name referencing records of the given collection
pub fn foreign_key_for_collection(collection_name: &str) -> String {
    ensure_id_suffix(&singularize(collection_name))
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("sourceAccountId"), "Source account id");
        assert_eq!(humanize("owner"), "Owner");
        assert_eq!(humanize("incoming_transactions"), "Incoming transactions");
        assert_eq!(humanize("companies"), "Companies");
        assert_eq!(humanize(""), "");
    }

    #[test]
    fn test_humanize_is_stable() {
        let first = humanize("targetAccountId");
        let second = humanize("targetAccountId");
        assert_eq!(first, second);
    }

    #[test]
    fn test_inflection() {
        assert_eq!(singularize("accounts"), "account");
        assert_eq!(singularize("companies"), "company");
        assert_eq!(singularize("Accounts"), "Account");
        assert_eq!(pluralize("Owner"), "Owners");
        assert_eq!(pluralize("company"), "companies");
    }

    #[test]
    fn test_ensure_id_suffix() {
        assert_eq!(ensure_id_suffix("owner"), "ownerId");
        assert_eq!(ensure_id_suffix("ownerId"), "ownerId");
        assert_eq!(ensure_id_suffix("Owner"), "ownerId");
        assert_eq!(ensure_id_suffix("TargetAccountId"), "targetAccountId");
    }

    #[test]
    fn test_foreign_key_for_collection() {
        assert_eq!(foreign_key_for_collection("companies"), "companyId");
        assert_eq!(foreign_key_for_collection("accounts"), "accountId");
    }
}
