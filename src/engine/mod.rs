//! Branch/inherit propagation between versions.
//!
//! ## Operations
//!
//! | Action | Effect on the target version |
//! |--------|------------------------------|
//! | `inherit` | source unit gains the target tag |
//! | `inheritpurge` | other holders lose the target tag, then inherit |
//! | `branch` | source content copied to a new unit tagged with the target |
//! | `branchsplit` | as `branch`, source unit loses the target tag |
//! | `branchpurge` | as `branch`, every other holder loses the target tag |
//!
//! After any action succeeds, exactly one unit of the topic carries the
//! target tag. Plain `inherit` and `branch` refuse with
//! [`DocsError::TagConflict`] rather than create a second holder.
//!
//! ## Batches
//!
//! [`BranchInheritEngine::run_batch`] checks the versions and manuals named by
//! the request before touching anything. Per manual it handles the TOC, then
//! each topic row in order. A failing row is logged and skipped; the batch
//! carries on. Progress is reported to the job tracker before each row.

pub mod conflict;
pub mod report;
pub mod request;

use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::error::DocsError;
use crate::jobs::{JobId, JobProgress, JobTracker, ProgressStore};
use crate::nav::NavCache;
use crate::registry::{ManualRegistry, VersionRegistry};
use crate::store::{TaggedUnit, WikiStore, WriteMode};
use crate::toc::{TocDocument, TocModel};
use crate::types::{parse_version_tag, version_tag, ContentKey, OrderedMap, TopicRef, Version};

pub use conflict::{ConflictRecord, ConflictingUnit};
pub use report::{BatchLog, BatchReport, LogLevel, LogLine, TocOperation, TocOutcome, TopicOutcome};
pub use request::{BatchRequest, ManualRequest, TocAction, TopicAction, TopicRequest};

/// How a branch treats other holders of the target tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchMode {
    /// Refuse if any unit holds the target tag.
    Plain,
    /// Detach the target tag from the source unit; refuse if others hold it.
    Split,
    /// Detach the target tag from every holder.
    Purge,
}

/// Applies branch/inherit actions to a wiki store.
#[derive(Debug)]
pub struct BranchInheritEngine<W: WikiStore> {
    store: Arc<W>,
    registry: Arc<VersionRegistry>,
    manuals: Arc<ManualRegistry>,
    toc: TocModel<W>,
    nav: Arc<NavCache>,
}

impl<W: WikiStore> Clone for BranchInheritEngine<W> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            manuals: Arc::clone(&self.manuals),
            toc: self.toc.clone(),
            nav: Arc::clone(&self.nav),
        }
    }
}

impl<W: WikiStore> BranchInheritEngine<W> {
    /// Create an engine.
    pub fn new(
        store: Arc<W>,
        registry: Arc<VersionRegistry>,
        manuals: Arc<ManualRegistry>,
        toc: TocModel<W>,
        nav: Arc<NavCache>,
    ) -> Self {
        Self {
            store,
            registry,
            manuals,
            toc,
            nav,
        }
    }

    fn touched(&self, manual: &str, version: &str) {
        self.toc.cache().invalidate(manual, version);
        self.nav.invalidate(version);
    }

    async fn source_toc(&self, manual: &str, source: &Version) -> Result<TaggedUnit, DocsError> {
        self.toc
            .find_toc_unit(manual, &source.name)
            .await?
            .ok_or_else(|| DocsError::UnresolvableTopic(ContentKey::toc(manual, &source.name).to_string()))
    }

    // ───────────────────────────────────────────────────────────────────────
    // TOC operations
    // ───────────────────────────────────────────────────────────────────────

    /// Whether a manual has a TOC for `version`.
    pub async fn toc_exists(&self, manual: &str, version: &Version) -> Result<bool, DocsError> {
        self.toc.toc_exists(manual, &version.name).await
    }

    /// Tag the source TOC with the target version.
    pub async fn add_version_to_toc(
        &self,
        manual: &str,
        source: &Version,
        target: &Version,
    ) -> Result<ContentKey, DocsError> {
        let unit = self.source_toc(manual, source).await?;
        self.store
            .add_tag(&unit.key, &version_tag(&target.name))
            .await
            .map_err(DocsError::index)?;
        self.touched(manual, &target.name);
        tracing::info!(manual, key = %unit.key, target = %target.name, "Inherited TOC");
        Ok(unit.key)
    }

    /// Copy the source TOC to a new TOC unit for the target version.
    pub async fn branch_toc(
        &self,
        manual: &str,
        source: &Version,
        target: &Version,
    ) -> Result<ContentKey, DocsError> {
        let unit = self.source_toc(manual, source).await?;
        let content = self
            .store
            .read(&unit.key)
            .await
            .map_err(DocsError::content_store)?
            .unwrap_or_default();
        let key = self.create_unit(ContentKey::toc(manual, &target.name), &content, target).await?;
        self.touched(manual, &target.name);
        tracing::info!(manual, key = %key, "Branched TOC");
        Ok(key)
    }

    /// Create a target TOC listing `sections`.
    pub async fn create_toc(
        &self,
        manual: &str,
        target: &Version,
        sections: &OrderedMap<Vec<String>>,
    ) -> Result<ContentKey, DocsError> {
        let content = TocDocument::from_sections(sections).render();
        let key = self.create_unit(ContentKey::toc(manual, &target.name), &content, target).await?;
        self.touched(manual, &target.name);
        tracing::info!(manual, key = %key, "Created TOC");
        Ok(key)
    }

    /// Merge `sections` into the target TOC. Returns the number of topics added.
    pub async fn add_collection_to_toc(
        &self,
        manual: &str,
        target: &Version,
        sections: &OrderedMap<Vec<String>>,
    ) -> Result<usize, DocsError> {
        let unit = self
            .toc
            .find_toc_unit(manual, &target.name)
            .await?
            .ok_or_else(|| DocsError::UnresolvableTopic(ContentKey::toc(manual, &target.name).to_string()))?;
        let raw = self
            .store
            .read(&unit.key)
            .await
            .map_err(DocsError::content_store)?
            .unwrap_or_default();

        let mut doc = TocDocument::parse(&raw);
        let added = doc.add_collection(sections);
        if added > 0 {
            self.store
                .write(&unit.key, &doc.render(), WriteMode::Update)
                .await
                .map_err(DocsError::content_store)?;
            // The document serves every version it is tagged with.
            let tags = self.store.tags_of(&unit.key).await.map_err(DocsError::index)?;
            for version in self.registry.versions_from_tags(tags.iter().map(String::as_str)) {
                self.touched(manual, &version.name);
            }
        }
        tracing::info!(manual, key = %unit.key, added, "Merged topics into TOC");
        Ok(added)
    }

    /// Write a new unit under `key`, or adopt one an interrupted run left
    /// behind: untagged and holding exactly `content`.
    async fn write_new_unit(&self, key: &ContentKey, content: &str) -> Result<(), DocsError> {
        if !self.store.exists(key).await.map_err(DocsError::content_store)? {
            return self
                .store
                .write(key, content, WriteMode::Create)
                .await
                .map_err(DocsError::content_store);
        }

        let tags = self.store.tags_of(key).await.map_err(DocsError::index)?;
        let untagged = tags.iter().all(|t| parse_version_tag(t).is_none());
        let existing = self.store.read(key).await.map_err(DocsError::content_store)?;
        if untagged && existing.as_deref() == Some(content) {
            tracing::warn!(key = %key, "Adopting untagged unit from an earlier run");
            return Ok(());
        }
        Err(DocsError::TopicExists(key.clone()))
    }

    async fn create_unit(&self, key: ContentKey, content: &str, target: &Version) -> Result<ContentKey, DocsError> {
        self.write_new_unit(&key, content).await?;
        self.store
            .add_tag(&key, &version_tag(&target.name))
            .await
            .map_err(DocsError::index)?;
        Ok(key)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Conflicts
    // ───────────────────────────────────────────────────────────────────────

    /// Units of `topic` holding the target tag, other than `exclude`.
    pub async fn conflicts(
        &self,
        topic: &TopicRef,
        target: &Version,
        exclude: Option<&ContentKey>,
    ) -> Result<ConflictRecord, DocsError> {
        let units = self
            .store
            .units_for_topic(topic)
            .await
            .map_err(DocsError::index)?;
        Ok(ConflictRecord::detect(topic, &target.name, &units, exclude))
    }

    /// Conflicts for a unit that would take on `target`.
    pub async fn get_conflicts(&self, title: &ContentKey, target: &Version) -> Result<ConflictRecord, DocsError> {
        let topic = title
            .parse_topic()
            .ok_or_else(|| DocsError::UnresolvableTopic(title.to_string()))?
            .topic;
        self.conflicts(&topic, target, Some(title)).await
    }

    /// Conflicts for a unit that would take on any of `versions`, merged.
    pub async fn conflicts_for_tags(
        &self,
        title: &ContentKey,
        versions: &[Version],
    ) -> Result<Vec<ConflictRecord>, DocsError> {
        let mut records = Vec::new();
        for version in versions {
            let record = self.get_conflicts(title, version).await?;
            if !record.is_empty() {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Detach version tags from a unit.
    pub async fn detach_tags(&self, title: &ContentKey, versions: &[Version]) -> Result<(), DocsError> {
        let manual = title.parse_topic().map(|p| p.topic.manual);
        for version in versions {
            self.store
                .remove_tag(title, &version_tag(&version.name))
                .await
                .map_err(DocsError::index)?;
            if let Some(manual) = &manual {
                self.touched(manual, &version.name);
            }
        }
        tracing::info!(key = %title, count = versions.len(), "Detached version tags");
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────
    // Topic operations
    // ───────────────────────────────────────────────────────────────────────

    async fn source_unit(
        &self,
        topic: &TopicRef,
        source: &Version,
    ) -> Result<(TaggedUnit, Vec<TaggedUnit>), DocsError> {
        let units = self
            .store
            .units_for_topic(topic)
            .await
            .map_err(DocsError::index)?;
        let tag = version_tag(&source.name);
        let unit = units
            .iter()
            .find(|u| u.has_tag(&tag))
            .cloned()
            .ok_or_else(|| DocsError::UnresolvableTopic(topic.key_for(&source.name).to_string()))?;
        Ok((unit, units))
    }

    /// Branch a topic: copy the source unit's content to a new unit for the
    /// target version.
    pub async fn branch_topic(
        &self,
        topic: &TopicRef,
        source: &Version,
        target: &Version,
        mode: BranchMode,
    ) -> Result<ContentKey, DocsError> {
        let (source_unit, units) = self.source_unit(topic, source).await?;
        let holders = ConflictRecord::detect(topic, &target.name, &units, None);

        let detach: Vec<ContentKey> = match mode {
            BranchMode::Plain => {
                if !holders.is_empty() {
                    return Err(DocsError::TagConflict(holders));
                }
                Vec::new()
            }
            BranchMode::Split => {
                let others = ConflictRecord::detect(topic, &target.name, &units, Some(&source_unit.key));
                if !others.is_empty() {
                    return Err(DocsError::TagConflict(others));
                }
                holders.units.into_iter().map(|u| u.key).collect()
            }
            BranchMode::Purge => holders.units.into_iter().map(|u| u.key).collect(),
        };

        let new_key = topic.key_for(&target.name);
        let content = self
            .store
            .read(&source_unit.key)
            .await
            .map_err(DocsError::content_store)?
            .ok_or_else(|| DocsError::ContentStore(format!("no content for {}", source_unit.key)))?;
        self.write_new_unit(&new_key, &content).await?;

        let tag = version_tag(&target.name);
        for key in &detach {
            self.store.remove_tag(key, &tag).await.map_err(DocsError::index)?;
        }
        self.store.add_tag(&new_key, &tag).await.map_err(DocsError::index)?;

        self.touched(&topic.manual, &target.name);
        tracing::info!(
            from = %source_unit.key,
            to = %new_key,
            detached = detach.len(),
            "Branched topic"
        );
        Ok(new_key)
    }

    /// Inherit a topic: tag the source unit with the target version.
    pub async fn inherit_topic(
        &self,
        topic: &TopicRef,
        source: &Version,
        target: &Version,
        purge: bool,
    ) -> Result<ContentKey, DocsError> {
        let (source_unit, units) = self.source_unit(topic, source).await?;
        let others = ConflictRecord::detect(topic, &target.name, &units, Some(&source_unit.key));
        if !others.is_empty() && !purge {
            return Err(DocsError::TagConflict(others));
        }

        let tag = version_tag(&target.name);
        for unit in &others.units {
            self.store.remove_tag(&unit.key, &tag).await.map_err(DocsError::index)?;
        }
        if !source_unit.has_tag(&tag) {
            self.store
                .add_tag(&source_unit.key, &tag)
                .await
                .map_err(DocsError::index)?;
        }

        self.touched(&topic.manual, &target.name);
        tracing::info!(key = %source_unit.key, target = %target.name, purged = others.units.len(), "Inherited topic");
        Ok(source_unit.key)
    }

    /// Apply one topic row. `Ok(None)` for ignored rows.
    pub async fn apply_topic(
        &self,
        manual: &str,
        row: &TopicRequest,
        source: &Version,
        target: &Version,
    ) -> Result<Option<ContentKey>, DocsError> {
        let topic = row.topic_ref(manual);
        let key = match row.action {
            TopicAction::Ignore => return Ok(None),
            TopicAction::Branch => self.branch_topic(&topic, source, target, BranchMode::Plain).await?,
            TopicAction::BranchSplit => self.branch_topic(&topic, source, target, BranchMode::Split).await?,
            TopicAction::BranchPurge => self.branch_topic(&topic, source, target, BranchMode::Purge).await?,
            TopicAction::Inherit => self.inherit_topic(&topic, source, target, false).await?,
            TopicAction::InheritPurge => self.inherit_topic(&topic, source, target, true).await?,
        };
        Ok(Some(key))
    }

    // ───────────────────────────────────────────────────────────────────────
    // Batches
    // ───────────────────────────────────────────────────────────────────────

    async fn apply_toc(
        &self,
        manual: &str,
        request: &ManualRequest,
        source: &Version,
        target: &Version,
        log: &mut BatchLog,
    ) -> TocOutcome {
        let (operation, result) = match self.toc_exists(manual, target).await {
            Err(e) => (TocOperation::Merged { added: 0 }, Err(e)),
            Ok(true) => {
                log.normal("Attempting to update TOC for target version.");
                let result = self
                    .add_collection_to_toc(manual, target, &request.section_texts(false))
                    .await;
                match result {
                    Ok(added) => (TocOperation::Merged { added }, Ok(())),
                    Err(e) => (TocOperation::Merged { added: 0 }, Err(e)),
                }
            }
            Ok(false) => {
                log.normal(format!(
                    "TOC does not exist for manual {} for version {}",
                    manual, target.name
                ));
                match (request.toc_action, request.toc_inherit) {
                    (TocAction::ForceInherit, _) => {
                        log.normal("Forcing inheritance of source TOC.");
                        let r = self.add_version_to_toc(manual, source, target).await;
                        (TocOperation::Inherited, r.map(drop))
                    }
                    (TocAction::ForceBranch, _) => {
                        log.normal("Forcing branch of source TOC.");
                        let r = self.branch_toc(manual, source, target).await;
                        (TocOperation::Branched, r.map(drop))
                    }
                    (TocAction::Default, true) => {
                        log.normal("Attempting to add target version to existing source version TOC.");
                        let r = self.add_version_to_toc(manual, source, target).await;
                        (TocOperation::Inherited, r.map(drop))
                    }
                    (TocAction::Default, false) => {
                        log.normal("Attempting to create TOC for target version.");
                        let r = self
                            .create_toc(manual, target, &request.section_texts(true))
                            .await;
                        (TocOperation::Created, r.map(drop))
                    }
                }
            }
        };

        match &result {
            Ok(()) => log.normal("Complete"),
            Err(e) => log.error(e.to_string()),
        }
        TocOutcome {
            manual: manual.to_string(),
            operation,
            error: result.err(),
        }
    }

    /// Run a batch, reporting progress under `job`.
    ///
    /// Fails without side effects when a version or manual is unknown. Once
    /// running, individual failures land in the report instead. The job is
    /// closed when the batch ends; its final progress is in the report.
    pub async fn run_batch<P: ProgressStore>(
        &self,
        jobs: &JobTracker<P>,
        job: &JobId,
        source: &str,
        target: &str,
        request: &BatchRequest,
    ) -> Result<BatchReport, DocsError> {
        let source = self.registry.require(source)?;
        let target = self.registry.require(target)?;
        let manuals = request
            .manuals
            .keys()
            .map(|name| self.manuals.require(name).map(|m| m.short_name))
            .collect::<Result<Vec<_>, _>>()?;

        let span = tracing::info_span!("batch", job_id = %job, source = %source.name, target = %target.name);
        Ok(self
            .execute(jobs, job, source, target, &manuals, request)
            .instrument(span)
            .await)
    }

    async fn execute<P: ProgressStore>(
        &self,
        jobs: &JobTracker<P>,
        job: &JobId,
        source: Version,
        target: Version,
        manuals: &[String],
        request: &BatchRequest,
    ) -> BatchReport {
        let started = Instant::now();
        let mut log = BatchLog::default();
        log.normal(format!("Beginning process job for source version: {}", source.name));
        log.normal(format!("Target version is: {}", target.name));

        let total = request.topic_count();
        let mut completed = 0;
        let mut toc_outcomes = Vec::with_capacity(manuals.len());
        let mut outcomes = Vec::with_capacity(total);
        let mut last_target = None;

        for (manual, manual_request) in manuals.iter().zip(request.manuals.values()) {
            toc_outcomes.push(self.apply_toc(manual, manual_request, &source, &target, &mut log).await);

            log.normal("Processing topics.");
            for (section, rows) in manual_request.sections.iter() {
                log.normal(format!("Processing section {}", section));
                for row in rows {
                    jobs.update_progress(job, completed, total);
                    let label = if row.title.is_empty() { &row.text } else { &row.title };
                    if row.action == TopicAction::Ignore {
                        log.normal(format!("Ignoring topic: {}", label));
                    } else {
                        log.normal(format!("Attempting to {} topic {}", row.action.as_str(), label));
                    }

                    let (target_key, error) = match self.apply_topic(manual, row, &source, &target).await {
                        Ok(key) => {
                            if key.is_some() {
                                log.normal("Complete");
                                last_target.clone_from(&key);
                            }
                            (key, None)
                        }
                        Err(e) => {
                            if let DocsError::TagConflict(record) = &e {
                                tracing::warn!(
                                    topic = %record.topic,
                                    versions = ?record.versions(&self.registry),
                                    "Topic row refused on tag conflict"
                                );
                            }
                            log.error(e.to_string());
                            (None, Some(e))
                        }
                    };
                    outcomes.push(TopicOutcome {
                        manual: manual.clone(),
                        section: section.to_string(),
                        text: row.text.clone(),
                        action: row.action,
                        target: target_key,
                        error,
                    });
                    completed += 1;
                }
            }
        }

        jobs.update_progress(job, completed, total);
        let progress = jobs
            .close_job(job)
            .unwrap_or_else(|| JobProgress::new(completed, total));

        let elapsed = started.elapsed();
        log.normal("All done!");
        log.normal(format!("Execution Time: {:.3} seconds", elapsed.as_secs_f64()));
        if total == 1 {
            if let Some(key) = &last_target {
                log.normal(format!("Link to new topic: {}", key.to_url_path()));
            }
        }

        tracing::info!(
            completed,
            total,
            failures = outcomes.iter().filter(|o| !o.is_success()).count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Batch finished"
        );

        BatchReport {
            source: source.name,
            target: target.name,
            toc_outcomes,
            outcomes,
            progress,
            elapsed,
            log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::store::{AllowAll, InMemoryWiki, TagIndex};
    use crate::toc::TocCache;
    use std::time::Duration;

    fn engine(wiki: &Arc<InMemoryWiki>) -> BranchInheritEngine<InMemoryWiki> {
        let registry = VersionRegistry::from_definition(
            "{{#version:1.0|released}}{{#version:2.0|released}}{{#version:3.0|unreleased}}",
            Arc::new(AllowAll),
        );
        let toc = TocModel::new(
            Arc::clone(wiki),
            Arc::new(TocCache::default()),
            Arc::new(KernelConfig::default()),
        );
        BranchInheritEngine::new(
            Arc::clone(wiki),
            Arc::new(registry),
            Arc::new(ManualRegistry::from_definition("{{#manual:User|User Manual}}")),
            toc,
            Arc::new(NavCache::new(Duration::from_secs(60))),
        )
    }

    fn v(name: &str, rank: usize) -> Version {
        Version::new(name, crate::types::VersionStatus::Released, rank)
    }

    fn holders(wiki: &InMemoryWiki, topic: &TopicRef, version: &str) -> usize {
        let tag = version_tag(version);
        wiki.all_keys()
            .into_iter()
            .filter(|k| k.parse_topic().is_some_and(|p| p.topic == *topic))
            .filter(|k| wiki.tags_on(k).iter().any(|t| *t == tag))
            .count()
    }

    #[tokio::test]
    async fn test_branch_split_detaches_source() {
        let wiki = Arc::new(InMemoryWiki::new());
        let topic = TopicRef::new("User", "Install");
        wiki.insert_page(topic.key_for("1.0"), "body", ["V:1.0", "V:2.0"]);

        let key = engine(&wiki)
            .branch_topic(&topic, &v("1.0", 0), &v("2.0", 1), BranchMode::Split)
            .await
            .unwrap();
        assert_eq!(key, topic.key_for("2.0"));
        assert_eq!(wiki.tags_on(&topic.key_for("1.0")), vec!["V:1.0"]);
        assert_eq!(wiki.content_of(&key).as_deref(), Some("body"));
        assert_eq!(holders(&wiki, &topic, "2.0"), 1);
    }

    #[tokio::test]
    async fn test_plain_branch_refuses_when_target_is_served() {
        let wiki = Arc::new(InMemoryWiki::new());
        let topic = TopicRef::new("User", "Install");
        wiki.insert_page(topic.key_for("1.0"), "body", ["V:1.0", "V:2.0"]);

        let err = engine(&wiki)
            .branch_topic(&topic, &v("1.0", 0), &v("2.0", 1), BranchMode::Plain)
            .await
            .unwrap_err();
        assert!(matches!(err, DocsError::TagConflict(ref r) if r.units.len() == 1));
        assert_eq!(wiki.num_pages(), 1);
    }

    #[tokio::test]
    async fn test_branch_onto_existing_key() {
        let wiki = Arc::new(InMemoryWiki::new());
        let topic = TopicRef::new("User", "Install");
        wiki.insert_page(topic.key_for("1.0"), "body", ["V:1.0"]);
        wiki.insert_page(topic.key_for("2.0"), "stale", Vec::<String>::new());

        let err = engine(&wiki)
            .branch_topic(&topic, &v("1.0", 0), &v("2.0", 1), BranchMode::Purge)
            .await
            .unwrap_err();
        assert!(matches!(err, DocsError::TopicExists(_)));
    }

    #[tokio::test]
    async fn test_missing_source_is_unresolvable() {
        let wiki = Arc::new(InMemoryWiki::new());
        let topic = TopicRef::new("User", "Ghost");
        let err = engine(&wiki)
            .inherit_topic(&topic, &v("1.0", 0), &v("2.0", 1), false)
            .await
            .unwrap_err();
        assert!(matches!(err, DocsError::UnresolvableTopic(_)));
    }

    #[tokio::test]
    async fn test_inherit_purge_moves_the_tag() {
        let wiki = Arc::new(InMemoryWiki::new());
        let topic = TopicRef::new("User", "Install");
        wiki.insert_page(topic.key_for("1.0"), "old", ["V:1.0"]);
        wiki.insert_page(topic.key_for("2.0"), "new", ["V:2.0"]);

        let key = engine(&wiki)
            .inherit_topic(&topic, &v("1.0", 0), &v("2.0", 1), true)
            .await
            .unwrap();
        assert_eq!(key, topic.key_for("1.0"));
        assert!(wiki.tags_on(&topic.key_for("2.0")).is_empty());
        assert_eq!(holders(&wiki, &topic, "2.0"), 1);
    }

    #[tokio::test]
    async fn test_detach_and_conflicts_for_tags() {
        let wiki = Arc::new(InMemoryWiki::new());
        let topic = TopicRef::new("User", "Install");
        wiki.insert_page(topic.key_for("1.0"), "old", ["V:1.0"]);
        wiki.insert_page(topic.key_for("2.0"), "new", ["V:2.0", "V:3.0"]);
        let eng = engine(&wiki);

        let records = eng
            .conflicts_for_tags(&topic.key_for("1.0"), &[v("2.0", 1), v("3.0", 2)])
            .await
            .unwrap();
        assert_eq!(records.len(), 2);

        eng.detach_tags(&topic.key_for("2.0"), &[v("3.0", 2)]).await.unwrap();
        assert_eq!(wiki.tags_of(&topic.key_for("2.0")).await.unwrap(), vec!["V:2.0"]);
    }

    #[tokio::test]
    async fn test_add_collection_to_missing_toc() {
        let wiki = Arc::new(InMemoryWiki::new());
        let err = engine(&wiki)
            .add_collection_to_toc("User", &v("2.0", 1), &OrderedMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DocsError::UnresolvableTopic(_)));
    }

    #[tokio::test]
    async fn test_batch_with_unknown_version_has_no_side_effects() {
        let wiki = Arc::new(InMemoryWiki::new());
        wiki.insert_page(TopicRef::new("User", "Install").key_for("1.0"), "", ["V:1.0"]);
        let jobs = JobTracker::<crate::jobs::InMemoryProgressStore>::default();
        let job = jobs.new_job();
        let request = BatchRequest::from_json(
            r#"{"User":{"sections":{"S":[{"title":"Documentation:User:Install:1.0","text":"Install","action":"inherit"}]}}}"#,
        )
        .unwrap();

        let err = engine(&wiki)
            .run_batch(&jobs, &job, "1.0", "9.9", &request)
            .await
            .unwrap_err();
        assert!(matches!(err, DocsError::UnknownVersion(_)));
        assert_eq!(wiki.num_pages(), 1);
        assert_eq!(jobs.read_progress(&job), crate::jobs::DETERMINING_PROGRESS);
    }
}
