//! Content keys and version tags.
//!
//! Every managed page has a key in the `Documentation` namespace. Keys compare
//! case-insensitively in the store, but are carried here exactly as written.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DOC_NAMESPACE;

/// Prefix of version tags in the tag index.
pub const VERSION_TAG_PREFIX: &str = "V:";

/// Page holding the version declarations.
pub const VERSIONS_PAGE: &str = "Documentation:Versions";

/// Page holding the manual declarations.
pub const MANUALS_PAGE: &str = "Documentation:Manuals";

/// Key of a stored content unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentKey(String);

/// A topic key split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicKeyParts {
    /// Manual and slug.
    pub topic: TopicRef,
    /// Version the unit was originally created for.
    pub version: String,
}

impl ContentKey {
    /// Wrap a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key of a topic unit: `Documentation:<manual>:<slug>:<version>`.
    pub fn topic(manual: &str, slug: &str, version: &str) -> Self {
        Self(format!("{}:{}:{}:{}", DOC_NAMESPACE, manual, slug, version))
    }

    /// Key of a TOC document: `Documentation:<manual>TOC<version>`.
    pub fn toc(manual: &str, version: &str) -> Self {
        Self(format!("{}TOC{}", toc_prefix(manual), version))
    }

    /// Raw key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a topic key. Returns `None` for anything that is not
    /// exactly `Documentation:<manual>:<slug>:<version>`.
    pub fn parse_topic(&self) -> Option<TopicKeyParts> {
        let mut parts = self.0.split(':');
        let namespace = parts.next()?;
        let manual = parts.next()?;
        let slug = parts.next()?;
        let version = parts.next()?;
        if parts.next().is_some()
            || !namespace.eq_ignore_ascii_case(DOC_NAMESPACE)
            || manual.is_empty()
            || slug.is_empty()
            || version.is_empty()
        {
            return None;
        }
        Some(TopicKeyParts {
            topic: TopicRef::new(manual, slug),
            version: version.to_string(),
        })
    }

    /// Split a TOC key into `(manual, version suffix)`.
    pub fn parse_toc(&self) -> Option<(String, String)> {
        let rest = strip_prefix_ignore_case(&self.0, DOC_NAMESPACE)?.strip_prefix(':')?;
        if rest.contains(':') {
            return None;
        }
        let at = rest.find("TOC")?;
        let (manual, version) = (&rest[..at], &rest[at + 3..]);
        if manual.is_empty() || version.is_empty() {
            return None;
        }
        Some((manual.to_string(), version.to_string()))
    }

    /// Whether this key names a TOC document.
    pub fn is_toc(&self) -> bool {
        self.parse_toc().is_some()
    }

    /// Page path (`:` kept, spaces to underscores) suitable for URLs.
    pub fn to_url_path(&self) -> String {
        self.0.replace(' ', "_")
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identity of a topic across versions: `(manual, slug)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TopicRef {
    /// Manual short name.
    pub manual: String,
    /// Topic slug.
    pub slug: String,
}

impl TopicRef {
    /// Create a topic reference.
    pub fn new(manual: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            manual: manual.into(),
            slug: slug.into(),
        }
    }

    /// Topic reference for the display text of a TOC line.
    pub fn from_text(manual: &str, text: &str) -> Self {
        Self::new(manual, topic_slug(text))
    }

    /// Key prefix shared by every unit of this topic.
    pub fn unit_prefix(&self) -> String {
        format!("{}:{}:{}:", DOC_NAMESPACE, self.manual, self.slug)
    }

    /// Unit key of this topic for a version.
    pub fn key_for(&self, version: &str) -> ContentKey {
        ContentKey::topic(&self.manual, &self.slug, version)
    }
}

impl fmt::Display for TopicRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.manual, self.slug)
    }
}

/// Key prefix shared by all TOC documents of a manual.
pub fn toc_prefix(manual: &str) -> String {
    format!("{}:{}TOC", DOC_NAMESPACE, manual)
}

/// Version tag for a version name: `V:<name>`.
pub fn version_tag(name: &str) -> String {
    format!("{}{}", VERSION_TAG_PREFIX, name)
}

/// Version name carried by a tag, if the tag is a version tag.
pub fn parse_version_tag(tag: &str) -> Option<&str> {
    let name = strip_prefix_ignore_case(tag.trim(), VERSION_TAG_PREFIX)?.trim();
    (!name.is_empty()).then_some(name)
}

/// Derive a topic slug from TOC display text.
///
/// Characters that cannot appear in a page key are dropped, as are spaces and
/// the `:`/`/` separators used by keys and aliased paths.
pub fn topic_slug(text: &str) -> String {
    text.chars().filter(|c| is_slug_char(*c)).collect()
}

fn is_slug_char(c: char) -> bool {
    if !c.is_ascii() {
        return !c.is_control();
    }
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '%' | '!' | '"' | '$' | '&' | '\'' | '(' | ')' | '*' | ',' | '-' | '.' | ';' | '='
                | '?' | '@' | '\\' | '^' | '_' | '`' | '~' | '+'
        )
}

pub(crate) fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_key_layout() {
        let key = ContentKey::topic("User", "Install", "1.0");
        assert_eq!(key.as_str(), "Documentation:User:Install:1.0");

        let parts = key.parse_topic().unwrap();
        assert_eq!(parts.topic, TopicRef::new("User", "Install"));
        assert_eq!(parts.version, "1.0");
    }

    #[test]
    fn test_parse_topic_rejects_other_shapes() {
        assert!(ContentKey::new("Documentation:User:Install").parse_topic().is_none());
        assert!(ContentKey::new("Help:User:Install:1.0").parse_topic().is_none());
        assert!(ContentKey::new("Documentation:User:Install:1.0:x").parse_topic().is_none());
        assert!(ContentKey::new("Documentation:UserTOC1.0").parse_topic().is_none());
    }

    #[test]
    fn test_toc_key() {
        let key = ContentKey::toc("User", "2.0");
        assert_eq!(key.as_str(), "Documentation:UserTOC2.0");
        assert_eq!(key.parse_toc(), Some(("User".to_string(), "2.0".to_string())));
        assert!(key.is_toc());
        assert!(!ContentKey::topic("User", "Install", "1.0").is_toc());
    }

    #[test]
    fn test_version_tags() {
        assert_eq!(version_tag("2.0"), "V:2.0");
        assert_eq!(parse_version_tag("V:2.0"), Some("2.0"));
        assert_eq!(parse_version_tag("v:2.0"), Some("2.0"));
        assert_eq!(parse_version_tag("V:"), None);
        assert_eq!(parse_version_tag("Deprecated"), None);
    }

    #[test]
    fn test_topic_slug() {
        assert_eq!(topic_slug("Getting Started"), "GettingStarted");
        assert_eq!(topic_slug("What's new?"), "What'snew?");
        assert_eq!(topic_slug("Input/Output: Files"), "InputOutputFiles");
        assert_eq!(topic_slug("<b>Bold</b>"), "bBoldb");
    }

    #[test]
    fn test_unit_prefix() {
        let topic = TopicRef::new("User", "Install");
        assert_eq!(topic.unit_prefix(), "Documentation:User:Install:");
        assert_eq!(topic.key_for("3.0").as_str(), "Documentation:User:Install:3.0");
    }
}
