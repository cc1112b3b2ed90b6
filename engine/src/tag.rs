//! Version tags for optimistic concurrency.
//!
//! A tag is opaque: the engine only ever compares tags for equality. Stores
//! decide how tags are minted (a counter, a uuid, a content hash) as long as a
//! tag is never issued twice for different contents.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An entity tag identifying one stored revision of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    /// Wrap a raw tag value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw tag value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render as a strong HTTP entity tag, e.g. `"v3"`.
    pub fn to_header_value(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Parse an `ETag` / `If-Match` header value.
    ///
    /// Accepts quoted, unquoted and weak (`W/"..."`) forms. Weak tags are
    /// treated as strong; the store only knows one kind. Returns `None` for an
    /// empty value or the `*` wildcard.
    pub fn from_header_value(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix("W/").unwrap_or(trimmed);
        let inner = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(trimmed);

        if inner.is_empty() || inner == "*" {
            return None;
        }
        Some(Self(inner.to_string()))
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VersionTag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_value_is_quoted() {
        assert_eq!(VersionTag::new("v3").to_header_value(), "\"v3\"");
    }

    #[test]
    fn parse_header_forms() {
        assert_eq!(
            VersionTag::from_header_value("\"v3\""),
            Some(VersionTag::new("v3"))
        );
        assert_eq!(
            VersionTag::from_header_value("W/\"v3\""),
            Some(VersionTag::new("v3"))
        );
        assert_eq!(
            VersionTag::from_header_value("  00000a00-0000 "),
            Some(VersionTag::new("00000a00-0000"))
        );
        assert_eq!(VersionTag::from_header_value("\"\""), None);
        assert_eq!(VersionTag::from_header_value("*"), None);
    }

    #[test]
    fn serializes_as_plain_string() {
        let tag = VersionTag::new("v7");
        assert_eq!(serde_json::to_string(&tag).unwrap(), "\"v7\"");
        let parsed: VersionTag = serde_json::from_str("\"v7\"").unwrap();
        assert_eq!(parsed, tag);
    }
}
