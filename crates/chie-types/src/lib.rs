//! Shared types for the Chie Q&A service.
//!
//! This crate holds the vocabulary every other crate speaks: the validated
//! [`LdapId`] users sign in with, the fixed [`Category`] list questions are
//! filed under, and the helpers that turn a tag list into the comma-joined
//! string stored alongside a question.
//!
//! It depends on nothing but `serde` and `thiserror` so that the database,
//! domain and server crates can all share it without cycles.

mod category;
mod ldap;

pub use category::{Category, ParseCategoryError};
pub use ldap::{LdapId, ParseLdapIdError, LDAP_ID_LEN};

/// Display name used when a question or answer author has no user record.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Splits a comma-separated tag string into trimmed, non-empty tags.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Joins tags into the comma-separated form persisted with a question.
///
/// Blank entries are dropped and surrounding whitespace is trimmed, so
/// `join_tags(&split_tags(s))` normalises `s`.
pub fn join_tags<S: AsRef<str>>(tags: &[S]) -> String {
    tags.iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tags_trims_and_drops_blanks() {
        assert_eq!(
            split_tags(" pump, valve ,,  ,filter"),
            vec!["pump", "valve", "filter"]
        );
        assert!(split_tags("").is_empty());
        assert!(split_tags(" , ,").is_empty());
    }

    #[test]
    fn join_tags_normalises() {
        assert_eq!(join_tags(&["pump", " valve ", ""]), "pump,valve");
        assert_eq!(join_tags::<&str>(&[]), "");
        assert_eq!(join_tags(&split_tags("a , b,c")), "a,b,c");
    }
}
