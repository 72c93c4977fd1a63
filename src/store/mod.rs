//! Collaborator interfaces: content store, tag index and access policy.

pub mod access;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{title::toc_prefix, ContentKey, TopicRef};

/// How a write treats an existing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail if the unit already exists.
    Create,
    /// Fail if the unit does not exist.
    Update,
}

/// A content unit key together with its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedUnit {
    /// Unit key.
    pub key: ContentKey,
    /// Tags as stored.
    pub tags: BTreeSet<String>,
}

impl TaggedUnit {
    /// Whether the unit carries `tag` (ASCII case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Page store keyed by content key.
///
/// Keys compare case-insensitively.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether a unit exists under `key`.
    async fn exists(&self, key: &ContentKey) -> Result<bool, Self::Error>;

    /// Read the text of a unit.
    async fn read(&self, key: &ContentKey) -> Result<Option<String>, Self::Error>;

    /// Write the text of a unit.
    async fn write(&self, key: &ContentKey, content: &str, mode: WriteMode) -> Result<(), Self::Error>;
}

/// Tag index over stored units.
#[async_trait]
pub trait TagIndex: Send + Sync {
    /// Error type for index operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Units whose key starts with `prefix` (case-insensitive), ordered by key.
    async fn find_units_by_prefix(&self, prefix: &str) -> Result<Vec<TaggedUnit>, Self::Error>;

    /// Tags of a unit. Empty when the unit is unknown.
    async fn tags_of(&self, key: &ContentKey) -> Result<Vec<String>, Self::Error>;

    /// Attach a tag. Attaching a tag the unit already has is a no-op.
    async fn add_tag(&self, key: &ContentKey, tag: &str) -> Result<(), Self::Error>;

    /// Detach a tag. Detaching a missing tag is a no-op.
    async fn remove_tag(&self, key: &ContentKey, tag: &str) -> Result<(), Self::Error>;

    /// Every unit of a topic, across versions.
    async fn units_for_topic(&self, topic: &TopicRef) -> Result<Vec<TaggedUnit>, Self::Error> {
        let units = self.find_units_by_prefix(&topic.unit_prefix()).await?;
        Ok(units
            .into_iter()
            .filter(|u| u.key.parse_topic().is_some())
            .collect())
    }

    /// Every TOC document of a manual, across versions.
    async fn tocs_for_manual(&self, manual: &str) -> Result<Vec<TaggedUnit>, Self::Error> {
        let units = self.find_units_by_prefix(&toc_prefix(manual)).await?;
        Ok(units
            .into_iter()
            .filter(|u| {
                u.key
                    .parse_toc()
                    .is_some_and(|(m, _)| m.eq_ignore_ascii_case(manual))
            })
            .collect())
    }
}

/// A backend providing both pages and tags.
pub trait WikiStore: ContentStore + TagIndex {}

impl<T: ContentStore + TagIndex> WikiStore for T {}

pub use access::{AccessPolicy, AllowAll, GroupAccessPolicy};
pub use memory::{InMemoryError, InMemoryWiki, PageSeed, WikiSnapshot};
