//! Tag conflicts: other units of a topic already carrying the target tag.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::registry::VersionRegistry;
use crate::store::TaggedUnit;
use crate::types::{version_tag, ContentKey, TopicRef};

/// A unit involved in a conflict, with its tags at detection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingUnit {
    /// Unit key.
    pub key: ContentKey,
    /// Tags on the unit.
    pub tags: Vec<String>,
}

/// Units of a topic that already serve the target version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Topic in conflict.
    pub topic: TopicRef,
    /// Version being branched or inherited to.
    pub target_version: String,
    /// Units holding the target tag.
    pub units: Vec<ConflictingUnit>,
}

impl ConflictRecord {
    /// Collect units holding the target version's tag, skipping `exclude`.
    pub fn detect(
        topic: &TopicRef,
        target_version: &str,
        units: &[TaggedUnit],
        exclude: Option<&ContentKey>,
    ) -> Self {
        let tag = version_tag(target_version);
        let units = units
            .iter()
            .filter(|u| u.has_tag(&tag))
            .filter(|u| exclude.map_or(true, |x| !u.key.as_str().eq_ignore_ascii_case(x.as_str())))
            .map(|u| ConflictingUnit {
                key: u.key.clone(),
                tags: u.tags.iter().cloned().collect(),
            })
            .collect();
        Self {
            topic: topic.clone(),
            target_version: target_version.to_string(),
            units,
        }
    }

    /// Whether nothing conflicts.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Conflicting unit keys.
    pub fn keys(&self) -> Vec<&ContentKey> {
        self.units.iter().map(|u| &u.key).collect()
    }

    /// Version names carried by conflicting units, oldest first in declared
    /// order, without repeats. Undeclared versions are dropped.
    pub fn versions(&self, registry: &VersionRegistry) -> Vec<String> {
        let tags = self.units.iter().flat_map(|u| u.tags.iter().map(String::as_str));
        let mut versions = registry.versions_from_tags(tags);
        versions.reverse();
        versions.into_iter().map(|v| v.name).collect()
    }

    /// Comma-separated conflicting keys; empty when there are none.
    pub fn summary(&self) -> String {
        self.units
            .iter()
            .map(|u| u.key.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Version {} of {} is already served by {}",
            self.target_version,
            self.topic,
            self.summary()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AllowAll;
    use std::sync::Arc;

    fn unit(key: ContentKey, tags: &[&str]) -> TaggedUnit {
        TaggedUnit {
            key,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_detect_skips_excluded_unit() {
        let topic = TopicRef::new("User", "Install");
        let units = vec![
            unit(topic.key_for("1.0"), &["V:1.0", "V:2.0"]),
            unit(topic.key_for("2.0"), &["V:2.0", "V:2.1"]),
            unit(topic.key_for("3.0"), &["V:3.0"]),
        ];

        let all = ConflictRecord::detect(&topic, "2.0", &units, None);
        assert_eq!(all.units.len(), 2);

        let others = ConflictRecord::detect(&topic, "2.0", &units, Some(&topic.key_for("1.0")));
        assert_eq!(others.summary(), "Documentation:User:Install:2.0");

        assert!(ConflictRecord::detect(&topic, "4.0", &units, None).is_empty());
    }

    #[test]
    fn test_versions_follow_declared_order() {
        let registry = VersionRegistry::from_definition(
            "{{#version:2.0|released}}{{#version:9.0|released}}{{#version:10.0|released}}",
            Arc::new(AllowAll),
        );
        let topic = TopicRef::new("User", "Install");
        let units = vec![
            unit(topic.key_for("9.0"), &["V:10.0", "V:9.0"]),
            unit(topic.key_for("2.0"), &["V:2.0", "V:10.0", "V:Draft"]),
        ];

        let record = ConflictRecord::detect(&topic, "10.0", &units, None);
        assert_eq!(record.versions(&registry), vec!["2.0", "9.0", "10.0"]);
    }

    #[test]
    fn test_display() {
        let topic = TopicRef::new("User", "Install");
        let units = vec![unit(topic.key_for("2.0"), &["V:2.0"])];
        let record = ConflictRecord::detect(&topic, "2.0", &units, None);
        assert_eq!(
            record.to_string(),
            "Version 2.0 of User:Install is already served by Documentation:User:Install:2.0"
        );
    }
}
