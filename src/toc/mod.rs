//! Tables of contents.
//!
//! A manual has at most one TOC document per version: the TOC unit carrying
//! that version's tag. [`TocModel`] finds it, parses it into a [`Toc`] with
//! resolved topic links, caches the result, and owns the save path that
//! validates a TOC and creates stubs for topics it names.

pub mod cache;
pub mod parse;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::canonical::canonical_hash_hex;
use crate::config::KernelConfig;
use crate::error::DocsError;
use crate::registry::VersionRegistry;
use crate::store::{TaggedUnit, WikiStore, WriteMode};
use crate::types::{version_tag, ContentKey, TopicRef, Version};

pub use cache::{CacheStats, TocCache};
pub use parse::{OutlineItem, OutlineTopic, TocDocument, TocLine, TocOutline};

/// Kind of TOC entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Section header.
    Section,
    /// Topic.
    Topic,
}

/// One resolved TOC entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Section or topic.
    pub kind: EntryKind,
    /// Display text.
    pub text: String,
    /// Backing unit key. Topics only; for unresolved topics this is the key a
    /// unit would have for the TOC's version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<ContentKey>,
    /// Aliased link. Present only for topics backed by a unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl TocEntry {
    fn section(text: &str) -> Self {
        Self {
            kind: EntryKind::Section,
            text: text.to_string(),
            title: None,
            link: None,
        }
    }

    /// Whether this entry is a topic.
    pub fn is_topic(&self) -> bool {
        self.kind == EntryKind::Topic
    }
}

/// A parsed TOC for one (manual, version).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toc {
    /// Manual short name.
    pub manual: String,
    /// Version name.
    pub version: String,
    /// TOC unit, if one is tagged with the version.
    pub document: Option<ContentKey>,
    /// Entries in document order.
    pub entries: Vec<TocEntry>,
}

/// Entries around a topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocNeighbors<'a> {
    /// Previous topic.
    pub prev: Option<&'a TocEntry>,
    /// Next topic.
    pub next: Option<&'a TocEntry>,
}

impl Toc {
    /// TOC with no document and no entries.
    pub fn empty(manual: &str, version: &str) -> Self {
        Self {
            manual: manual.to_string(),
            version: version.to_string(),
            document: None,
            entries: Vec::new(),
        }
    }

    /// Whether a TOC document backs this TOC.
    pub fn exists(&self) -> bool {
        self.document.is_some()
    }

    /// Topic entries.
    pub fn topics(&self) -> impl Iterator<Item = &TocEntry> {
        self.entries.iter().filter(|e| e.is_topic())
    }

    /// First topic with a link.
    pub fn first_link(&self) -> Option<&TocEntry> {
        self.topics().find(|e| e.link.is_some())
    }

    /// Previous and next linked topics around `title`.
    pub fn neighbors(&self, title: &ContentKey) -> TocNeighbors<'_> {
        let linked: Vec<&TocEntry> = self.topics().filter(|e| e.link.is_some()).collect();
        let Some(at) = linked.iter().position(|e| {
            e.title
                .as_ref()
                .is_some_and(|t| t.as_str().eq_ignore_ascii_case(title.as_str()))
        }) else {
            return TocNeighbors::default();
        };
        TocNeighbors {
            prev: at.checked_sub(1).and_then(|i| linked.get(i).copied()),
            next: linked.get(at + 1).copied(),
        }
    }

    /// Fingerprint of the entries.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(&self.entries)
    }
}

/// Result of saving a TOC document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TocSaveOutcome {
    /// Versions the TOC is tagged with, oldest first.
    pub versions: Vec<String>,
    /// Stub topics created for the save.
    pub created: Vec<ContentKey>,
}

/// TOC access over a wiki store.
#[derive(Debug)]
pub struct TocModel<W: WikiStore> {
    store: Arc<W>,
    cache: Arc<TocCache>,
    config: Arc<KernelConfig>,
}

impl<W: WikiStore> Clone for TocModel<W> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            config: Arc::clone(&self.config),
        }
    }
}

impl<W: WikiStore> TocModel<W> {
    /// Create a model over a store and cache.
    pub fn new(store: Arc<W>, cache: Arc<TocCache>, config: Arc<KernelConfig>) -> Self {
        Self { store, cache, config }
    }

    /// The TOC cache.
    pub fn cache(&self) -> &Arc<TocCache> {
        &self.cache
    }

    /// The TOC unit of a manual tagged with `version`.
    pub async fn find_toc_unit(&self, manual: &str, version: &str) -> Result<Option<TaggedUnit>, DocsError> {
        let tag = version_tag(version);
        let units = self
            .store
            .tocs_for_manual(manual)
            .await
            .map_err(DocsError::index)?;
        Ok(units.into_iter().find(|u| u.has_tag(&tag)))
    }

    /// Whether a manual has a TOC for `version`.
    pub async fn toc_exists(&self, manual: &str, version: &str) -> Result<bool, DocsError> {
        Ok(self.find_toc_unit(manual, version).await?.is_some())
    }

    /// The unit of a topic tagged with `version`.
    pub async fn find_topic_unit(&self, topic: &TopicRef, version: &str) -> Result<Option<TaggedUnit>, DocsError> {
        let tag = version_tag(version);
        let units = self
            .store
            .units_for_topic(topic)
            .await
            .map_err(DocsError::index)?;
        Ok(units.into_iter().find(|u| u.has_tag(&tag)))
    }

    /// Parsed TOC of a manual for a version, from cache when possible.
    ///
    /// A manual without a TOC for the version yields an empty TOC.
    pub async fn load(&self, manual: &str, version: &str) -> Result<Arc<Toc>, DocsError> {
        if let Some(toc) = self.cache.get(manual, version) {
            return Ok(toc);
        }

        let toc = Arc::new(self.build(manual, version).await?);
        tracing::debug!(
            manual,
            version,
            entries = toc.entries.len(),
            fingerprint = %toc.fingerprint(),
            "Loaded TOC"
        );
        self.cache.insert(Arc::clone(&toc));
        Ok(toc)
    }

    async fn build(&self, manual: &str, version: &str) -> Result<Toc, DocsError> {
        let Some(unit) = self.find_toc_unit(manual, version).await? else {
            return Ok(Toc::empty(manual, version));
        };
        let raw = self
            .store
            .read(&unit.key)
            .await
            .map_err(DocsError::content_store)?
            .unwrap_or_default();

        let outline = TocOutline::parse(&raw);
        let mut entries = Vec::with_capacity(outline.items().len());
        for item in outline.items() {
            match item {
                OutlineItem::Section(name) => entries.push(TocEntry::section(name)),
                OutlineItem::Topic(topic) => {
                    let topic_ref = TopicRef::new(manual, topic.slug.clone());
                    let backing = self.find_topic_unit(&topic_ref, version).await?;
                    let (title, link) = match backing {
                        Some(topic_unit) => (
                            topic_unit.key,
                            Some(self.config.topic_link(version, manual, &topic.slug)),
                        ),
                        None => (topic_ref.key_for(version), None),
                    };
                    entries.push(TocEntry {
                        kind: EntryKind::Topic,
                        text: topic.text.clone(),
                        title: Some(title),
                        link,
                    });
                }
            }
        }

        Ok(Toc {
            manual: manual.to_string(),
            version: version.to_string(),
            document: Some(unit.key),
            entries,
        })
    }

    /// Create stub units for TOC topics that no unit serves in any of `versions`.
    ///
    /// Stubs are keyed by the earliest version and tagged with every version.
    pub async fn ensure_topics_exist(
        &self,
        outline: &TocOutline,
        manual: &str,
        versions: &[Version],
        registry: &VersionRegistry,
    ) -> Result<Vec<ContentKey>, DocsError> {
        let Some(earliest) = registry.find_earliest(versions.iter().map(|v| v.name.as_str())) else {
            return Ok(Vec::new());
        };
        let tags: Vec<String> = versions.iter().map(|v| version_tag(&v.name)).collect();

        let mut seen = HashSet::new();
        let mut created = Vec::new();
        for topic in outline.topics() {
            if !seen.insert(topic.slug.to_lowercase()) {
                continue;
            }
            let topic_ref = TopicRef::new(manual, topic.slug.clone());
            let units = self
                .store
                .units_for_topic(&topic_ref)
                .await
                .map_err(DocsError::index)?;
            if units.iter().any(|u| tags.iter().any(|t| u.has_tag(t))) {
                continue;
            }

            let key = topic_ref.key_for(&earliest.name);
            if self.store.exists(&key).await.map_err(DocsError::content_store)? {
                continue;
            }
            self.store
                .write(&key, &stub_content(&topic.text), WriteMode::Create)
                .await
                .map_err(DocsError::content_store)?;
            for tag in &tags {
                self.store.add_tag(&key, tag).await.map_err(DocsError::index)?;
            }
            tracing::info!(key = %key, "Created stub topic");
            created.push(key);
        }
        Ok(created)
    }

    /// Save a TOC document.
    ///
    /// Rejects documents naming a topic twice. After the write, every version
    /// the TOC is tagged with has its cached TOC dropped, and missing topics
    /// get stubs.
    pub async fn save(
        &self,
        key: &ContentKey,
        raw: &str,
        registry: &VersionRegistry,
    ) -> Result<TocSaveOutcome, DocsError> {
        let (manual, _) = key
            .parse_toc()
            .ok_or_else(|| DocsError::InvalidRequest(format!("not a TOC document: {}", key)))?;
        let outline = TocOutline::parse_validated(raw)?;

        let mode = if self.store.exists(key).await.map_err(DocsError::content_store)? {
            WriteMode::Update
        } else {
            WriteMode::Create
        };
        self.store
            .write(key, raw, mode)
            .await
            .map_err(DocsError::content_store)?;

        let tags = self.store.tags_of(key).await.map_err(DocsError::index)?;
        let mut versions = registry.versions_from_tags(tags.iter().map(String::as_str));
        versions.reverse();
        for version in &versions {
            self.cache.invalidate(&manual, &version.name);
        }

        let created = self.ensure_topics_exist(&outline, &manual, &versions, registry).await?;
        Ok(TocSaveOutcome {
            versions: versions.into_iter().map(|v| v.name).collect(),
            created,
        })
    }
}

/// Initial text of a stub topic.
pub fn stub_content(text: &str) -> String {
    format!("= {} =\n\n", text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GroupAccessPolicy, InMemoryWiki, TagIndex};

    fn model(wiki: Arc<InMemoryWiki>) -> TocModel<InMemoryWiki> {
        TocModel::new(wiki, Arc::new(TocCache::default()), Arc::new(KernelConfig::default()))
    }

    fn registry() -> VersionRegistry {
        VersionRegistry::from_definition(
            "{{#version:1.0|released}}{{#version:2.0|released}}",
            Arc::new(GroupAccessPolicy::default()),
        )
    }

    fn seeded() -> Arc<InMemoryWiki> {
        let wiki = InMemoryWiki::new();
        wiki.insert_page(
            ContentKey::toc("User", "1.0"),
            "Start\n* {{#topic:Introduction}}\n* {{#topic:Install}}\n* {{#topic:Missing}}",
            ["V:1.0", "V:2.0"],
        );
        wiki.insert_page(ContentKey::topic("User", "Introduction", "1.0"), "intro", ["V:1.0", "V:2.0"]);
        wiki.insert_page(ContentKey::topic("User", "Install", "1.0"), "old", ["V:1.0"]);
        wiki.insert_page(ContentKey::topic("User", "Install", "2.0"), "new", ["V:2.0"]);
        Arc::new(wiki)
    }

    #[tokio::test]
    async fn test_load_resolves_links() {
        let toc = model(seeded()).load("User", "2.0").await.unwrap();
        assert!(toc.exists());
        assert_eq!(toc.entries.len(), 4);

        let install = &toc.entries[2];
        assert_eq!(install.title.as_ref().unwrap().as_str(), "Documentation:User:Install:2.0");
        assert_eq!(install.link.as_deref(), Some("/Documentation/2.0/User/Install"));

        let missing = &toc.entries[3];
        assert_eq!(missing.title.as_ref().unwrap().as_str(), "Documentation:User:Missing:2.0");
        assert!(missing.link.is_none());

        assert_eq!(toc.first_link().unwrap().text, "Introduction");
    }

    #[tokio::test]
    async fn test_load_without_toc_is_empty() {
        let toc = model(seeded()).load("User", "3.0").await.unwrap();
        assert!(!toc.exists());
        assert!(toc.entries.is_empty());
    }

    #[tokio::test]
    async fn test_load_is_cached_until_invalidated() {
        let wiki = seeded();
        let toc_model = model(Arc::clone(&wiki));
        let first = toc_model.load("User", "1.0").await.unwrap();

        wiki.insert_page(ContentKey::toc("User", "1.0"), "Start\n* {{#topic:Install}}", ["V:1.0", "V:2.0"]);
        let cached = toc_model.load("User", "1.0").await.unwrap();
        assert_eq!(first.fingerprint(), cached.fingerprint());

        toc_model.cache().invalidate("User", "1.0");
        let fresh = toc_model.load("User", "1.0").await.unwrap();
        assert_eq!(fresh.entries.len(), 2);
    }

    #[tokio::test]
    async fn test_neighbors() {
        let toc = model(seeded()).load("User", "2.0").await.unwrap();
        let install = ContentKey::topic("User", "Install", "2.0");
        let around = toc.neighbors(&install);
        assert_eq!(around.prev.unwrap().text, "Introduction");
        assert!(around.next.is_none());
    }

    #[tokio::test]
    async fn test_save_creates_stubs_for_earliest_version() {
        let wiki = seeded();
        let toc_model = model(Arc::clone(&wiki));
        let reg = registry();
        let key = ContentKey::toc("User", "1.0");

        let outcome = toc_model
            .save(&key, "Start\n* {{#topic:Install}}\n* {{#topic:Brand New}}", &reg)
            .await
            .unwrap();
        assert_eq!(outcome.versions, vec!["1.0", "2.0"]);
        assert_eq!(outcome.created, vec![ContentKey::topic("User", "BrandNew", "1.0")]);

        let stub = ContentKey::topic("User", "BrandNew", "1.0");
        assert_eq!(wiki.content_of(&stub).as_deref(), Some("= Brand New =\n\n"));
        assert_eq!(wiki.tags_of(&stub).await.unwrap(), vec!["V:1.0", "V:2.0"]);
    }

    #[tokio::test]
    async fn test_save_rejects_duplicates_without_writing() {
        let wiki = seeded();
        let toc_model = model(Arc::clone(&wiki));
        let key = ContentKey::toc("User", "1.0");
        let before = wiki.content_of(&key);

        let result = toc_model
            .save(&key, "Start\n* {{#topic:Install}}\n* {{#topic:Install}}", &registry())
            .await;
        assert!(matches!(result, Err(DocsError::DuplicateTopicTitle(_))));
        assert_eq!(wiki.content_of(&key), before);
    }

    #[tokio::test]
    async fn test_save_untagged_toc_creates_nothing() {
        let wiki = seeded();
        let toc_model = model(Arc::clone(&wiki));
        let key = ContentKey::toc("User", "9.0");

        let outcome = toc_model
            .save(&key, "Start\n* {{#topic:Orphan}}", &registry())
            .await
            .unwrap();
        assert!(outcome.versions.is_empty());
        assert!(outcome.created.is_empty());
        assert!(wiki.content_of(&key).is_some());
    }
}
