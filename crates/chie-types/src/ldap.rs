//! Organisational user identifiers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of digits in an LDAP ID.
pub const LDAP_ID_LEN: usize = 8;

/// An organisational LDAP ID: exactly eight ASCII digits.
///
/// The value is the primary key of the `users` table and the author key of
/// every question and answer. Construction always validates, including when
/// deserialising from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LdapId(String);

/// Errors returned when parsing an [`LdapId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseLdapIdError {
    #[error("ldap id must be {expected} digits, got {actual} characters")]
    Length { expected: usize, actual: usize },
    #[error("ldap id must contain only ASCII digits")]
    NonDigit,
}

impl LdapId {
    /// Parses and validates an LDAP ID. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, ParseLdapIdError> {
        let trimmed = raw.trim();
        let actual = trimmed.chars().count();
        if actual != LDAP_ID_LEN {
            return Err(ParseLdapIdError::Length {
                expected: LDAP_ID_LEN,
                actual,
            });
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseLdapIdError::NonDigit);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LdapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for LdapId {
    type Err = ParseLdapIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LdapId {
    type Error = ParseLdapIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LdapId> for String {
    fn from(id: LdapId) -> Self {
        id.0
    }
}

impl AsRef<str> for LdapId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
