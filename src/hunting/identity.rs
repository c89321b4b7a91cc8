use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::ComicIdentity;

/// Normalized `title|issue|publisher|variant` key.
///
/// Cache lookups and ownership checks both go through this type, so they can
/// never disagree about what counts as the same book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(title: &str, issue_number: &str, publisher: &str, variant: &str) -> Self {
        Self(format!(
            "{}|{}|{}|{}",
            normalize_text(title),
            normalize_issue_number(issue_number),
            normalize_text(publisher),
            normalize_text(variant),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&ComicIdentity> for IdentityKey {
    fn from(identity: &ComicIdentity) -> Self {
        Self::new(
            &identity.title,
            &identity.issue_number,
            identity.publisher.as_deref().unwrap_or_default(),
            identity.variant.as_deref().unwrap_or_default(),
        )
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase, trim, collapse internal whitespace runs to one space.
pub fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text normalization plus: drop a leading `#`, drop leading zeros ("#007" -> "7").
pub fn normalize_issue_number(value: &str) -> String {
    let text = normalize_text(value);
    let text = text.trim_start_matches('#').trim_start();

    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if digits > 1 {
        let stripped = text.trim_start_matches('0');
        // Keep one zero when the number itself is zero ("000" -> "0", "00.5" -> "0.5").
        if stripped.len() < text.len() && !stripped.starts_with(|c: char| c.is_ascii_digit()) {
            return format!("0{stripped}");
        }
        return stripped.to_string();
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_case_insensitive() {
        assert_eq!(
            IdentityKey::new("Amazing Spider-Man", "300", "Marvel", ""),
            IdentityKey::new("amazing spider-man", "300", "marvel", "")
        );
    }

    #[test]
    fn key_ignores_incidental_whitespace() {
        assert_eq!(
            IdentityKey::new("  Amazing   Spider-Man ", " 300", "Marvel\t", ""),
            IdentityKey::new("Amazing Spider-Man", "300", "Marvel", "")
        );
    }

    #[test]
    fn issue_number_formatting_is_normalized() {
        assert_eq!(normalize_issue_number("#1"), "1");
        assert_eq!(normalize_issue_number("001"), "1");
        assert_eq!(normalize_issue_number("# 12"), "12");
        assert_eq!(normalize_issue_number("0"), "0");
        assert_eq!(normalize_issue_number("000"), "0");
        assert_eq!(normalize_issue_number("00.5"), "0.5");
        assert_eq!(normalize_issue_number("1/2"), "1/2");
        assert_eq!(normalize_issue_number("Annual 1"), "annual 1");
    }

    #[test]
    fn variant_and_publisher_distinguish_books() {
        let base = IdentityKey::new("Saga", "1", "Image", "");
        assert_ne!(base, IdentityKey::new("Saga", "1", "Image", "Virgin"));
        assert_ne!(base, IdentityKey::new("Saga", "1", "", ""));
        assert_ne!(base, IdentityKey::new("Saga", "2", "Image", ""));
    }

    #[test]
    fn key_from_identity_treats_missing_fields_as_empty() {
        let identity = ComicIdentity::new("X-Men", "#94");
        assert_eq!(
            IdentityKey::from(&identity),
            IdentityKey::new("x-men", "94", "", "")
        );
        assert_eq!(IdentityKey::from(&identity).as_str(), "x-men|94||");
    }
}
