//! In-memory wiki store for testing and local runs.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{ContentStore, TagIndex, TaggedUnit, WriteMode};
use crate::types::ContentKey;

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Create on an existing key.
    #[error("Content unit already exists: {0}")]
    AlreadyExists(ContentKey),
    /// Update or tag on a missing key.
    #[error("Content unit not found: {0}")]
    NotFound(ContentKey),
    /// Write refused by a configured rejection.
    #[error("Write rejected: {0}")]
    Rejected(ContentKey),
}

/// One seeded page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSeed {
    /// Page key.
    pub key: String,
    /// Page text.
    #[serde(default)]
    pub content: String,
    /// Tags attached to the page.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Serializable seed for an [`InMemoryWiki`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiSnapshot {
    /// Pages in any order.
    pub pages: Vec<PageSeed>,
}

#[derive(Debug, Clone)]
struct Page {
    key: ContentKey,
    content: String,
    tags: BTreeSet<String>,
}

/// In-memory page store and tag index.
///
/// Pages live in a BTreeMap keyed by lowercased key, so prefix scans come back
/// in deterministic key order.
#[derive(Debug, Default)]
pub struct InMemoryWiki {
    pages: RwLock<BTreeMap<String, Page>>,
    rejected: RwLock<BTreeSet<String>>,
}

fn fold(key: &str) -> String {
    key.to_lowercase()
}

impl InMemoryWiki {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot.
    pub fn from_snapshot(snapshot: WikiSnapshot) -> Self {
        let wiki = Self::new();
        for page in snapshot.pages {
            wiki.insert_page(ContentKey::new(page.key), page.content, page.tags);
        }
        wiki
    }

    /// Dump the store as a snapshot.
    pub fn snapshot(&self) -> WikiSnapshot {
        let pages = self
            .pages
            .read()
            .values()
            .map(|p| PageSeed {
                key: p.key.to_string(),
                content: p.content.clone(),
                tags: p.tags.iter().cloned().collect(),
            })
            .collect();
        WikiSnapshot { pages }
    }

    /// Insert or overwrite a page with tags, bypassing write modes.
    pub fn insert_page<I, T>(&self, key: ContentKey, content: impl Into<String>, tags: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let page = Page {
            key: key.clone(),
            content: content.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        };
        self.pages.write().insert(fold(key.as_str()), page);
    }

    /// Make every later write to `key` fail.
    pub fn reject_writes_to(&self, key: &ContentKey) {
        self.rejected.write().insert(fold(key.as_str()));
    }

    /// Page text, if present.
    pub fn content_of(&self, key: &ContentKey) -> Option<String> {
        self.pages
            .read()
            .get(&fold(key.as_str()))
            .map(|p| p.content.clone())
    }

    /// Page tags, sorted. Empty when absent.
    pub fn tags_on(&self, key: &ContentKey) -> Vec<String> {
        self.pages
            .read()
            .get(&fold(key.as_str()))
            .map(|p| p.tags.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Get number of pages.
    pub fn num_pages(&self) -> usize {
        self.pages.read().len()
    }

    /// Keys of every page.
    pub fn all_keys(&self) -> Vec<ContentKey> {
        self.pages.read().values().map(|p| p.key.clone()).collect()
    }
}

#[async_trait]
impl ContentStore for InMemoryWiki {
    type Error = InMemoryError;

    async fn exists(&self, key: &ContentKey) -> Result<bool, Self::Error> {
        Ok(self.pages.read().contains_key(&fold(key.as_str())))
    }

    async fn read(&self, key: &ContentKey) -> Result<Option<String>, Self::Error> {
        Ok(self.content_of(key))
    }

    async fn write(&self, key: &ContentKey, content: &str, mode: WriteMode) -> Result<(), Self::Error> {
        let folded = fold(key.as_str());
        if self.rejected.read().contains(&folded) {
            return Err(InMemoryError::Rejected(key.clone()));
        }

        let mut pages = self.pages.write();
        match mode {
            WriteMode::Create => {
                if pages.contains_key(&folded) {
                    return Err(InMemoryError::AlreadyExists(key.clone()));
                }
                pages.insert(
                    folded,
                    Page {
                        key: key.clone(),
                        content: content.to_string(),
                        tags: BTreeSet::new(),
                    },
                );
                Ok(())
            }
            WriteMode::Update => {
                let page = pages
                    .get_mut(&folded)
                    .ok_or_else(|| InMemoryError::NotFound(key.clone()))?;
                page.content = content.to_string();
                Ok(())
            }
        }
    }
}

#[async_trait]
impl TagIndex for InMemoryWiki {
    type Error = InMemoryError;

    async fn find_units_by_prefix(&self, prefix: &str) -> Result<Vec<TaggedUnit>, Self::Error> {
        let prefix = fold(prefix);
        let pages = self.pages.read();
        Ok(pages
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(_, p)| TaggedUnit {
                key: p.key.clone(),
                tags: p.tags.clone(),
            })
            .collect())
    }

    async fn tags_of(&self, key: &ContentKey) -> Result<Vec<String>, Self::Error> {
        Ok(self.tags_on(key))
    }

    async fn add_tag(&self, key: &ContentKey, tag: &str) -> Result<(), Self::Error> {
        let mut pages = self.pages.write();
        let page = pages
            .get_mut(&fold(key.as_str()))
            .ok_or_else(|| InMemoryError::NotFound(key.clone()))?;
        if !page.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            page.tags.insert(tag.to_string());
        }
        Ok(())
    }

    async fn remove_tag(&self, key: &ContentKey, tag: &str) -> Result<(), Self::Error> {
        let mut pages = self.pages.write();
        if let Some(page) = pages.get_mut(&fold(key.as_str())) {
            page.tags.retain(|t| !t.eq_ignore_ascii_case(tag));
        }
        Ok(())
    }
}
