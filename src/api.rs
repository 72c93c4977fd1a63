//! Caller-facing facade.
//!
//! `DocsKernel` wires the registries, TOC model, caches, resolver, engine and
//! job tracker over one store, and exposes the operations a UI or service
//! calls: manual and topic listings for the branch/inherit screen, job ids and
//! progress, batch processing, TOC saves and alias resolution.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::KernelConfig;
use crate::engine::{BatchReport, BatchRequest, BranchInheritEngine, ConflictRecord};
use crate::error::DocsError;
use crate::jobs::{InMemoryProgressStore, JobId, JobTracker, ProgressStore};
use crate::nav::{ManualSummary, NavCache};
use crate::registry::{ManualRegistry, VersionRegistry};
use crate::resolver::{AliasResolver, Resolution};
use crate::store::{AccessPolicy, WikiStore, WriteMode};
use crate::toc::{TocCache, TocModel, TocSaveOutcome};
use crate::types::{ContentKey, OrderedMap, RequestContext, User, Version};

/// Reply to a batch whose payload could not be read.
pub const FAILED_TO_READ_REQUEST: &str = "Failed to read request.";

/// A manual in the manual listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualInfo {
    /// Short name.
    pub shortname: String,
    /// Display name.
    pub longname: String,
}

/// Manual-level metadata in a topic listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualMeta {
    /// Manual display name.
    pub text: String,
    /// Whether the target version already has a TOC.
    pub toc_exists: bool,
}

/// Section-level metadata in a topic listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMeta {}

/// One topic in a topic listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicListing {
    /// Unit key serving the source version.
    pub title: String,
    /// TOC display text.
    pub text: String,
    /// Comma-separated units already serving the target version, or empty.
    pub conflicts: String,
}

/// Topics of one section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTopics {
    /// Section metadata.
    pub meta: SectionMeta,
    /// Topics in TOC order.
    pub topics: Vec<TopicListing>,
}

/// Topics of one manual, by section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualTopics {
    /// Manual metadata.
    pub meta: ManualMeta,
    /// Non-empty sections in TOC order.
    pub sections: OrderedMap<SectionTopics>,
}

/// The documentation kernel.
#[derive(Debug)]
pub struct DocsKernel<W: WikiStore, P: ProgressStore = InMemoryProgressStore> {
    store: Arc<W>,
    config: Arc<KernelConfig>,
    registry: Arc<VersionRegistry>,
    manuals: Arc<ManualRegistry>,
    toc: TocModel<W>,
    nav: Arc<NavCache>,
    jobs: Arc<JobTracker<P>>,
}

impl<W: WikiStore> DocsKernel<W> {
    /// Load definitions from the store and build a kernel with in-memory
    /// job progress.
    pub async fn load(store: Arc<W>, policy: Arc<dyn AccessPolicy>, config: KernelConfig) -> Result<Self, DocsError> {
        Self::load_with_progress(store, policy, config, InMemoryProgressStore::new()).await
    }
}

impl<W: WikiStore, P: ProgressStore> DocsKernel<W, P> {
    /// Load definitions from the store, using `progress` for job records.
    pub async fn load_with_progress(
        store: Arc<W>,
        policy: Arc<dyn AccessPolicy>,
        config: KernelConfig,
        progress: P,
    ) -> Result<Self, DocsError> {
        let registry = VersionRegistry::load(store.as_ref(), policy).await?;
        let manuals = ManualRegistry::load(store.as_ref()).await?;
        tracing::info!(
            versions = registry.all().len(),
            manuals = manuals.manuals().len(),
            "Loaded documentation definitions"
        );
        Ok(Self::from_parts(store, registry, manuals, config, progress))
    }

    /// Assemble a kernel from already built registries.
    pub fn from_parts(
        store: Arc<W>,
        registry: VersionRegistry,
        manuals: ManualRegistry,
        config: KernelConfig,
        progress: P,
    ) -> Self {
        let config = Arc::new(config);
        let cache = Arc::new(TocCache::new(&config.toc_cache));
        Self {
            toc: TocModel::new(Arc::clone(&store), cache, Arc::clone(&config)),
            nav: Arc::new(NavCache::new(config.nav_cache_ttl)),
            jobs: Arc::new(JobTracker::new(progress)),
            registry: Arc::new(registry),
            manuals: Arc::new(manuals),
            store,
            config,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<W> {
        &self.store
    }

    /// Kernel configuration.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Version registry.
    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    /// Manual registry.
    pub fn manuals(&self) -> &ManualRegistry {
        &self.manuals
    }

    /// TOC model.
    pub fn toc(&self) -> &TocModel<W> {
        &self.toc
    }

    /// Navigation cache.
    pub fn nav(&self) -> &NavCache {
        &self.nav
    }

    /// Job tracker.
    pub fn jobs(&self) -> &JobTracker<P> {
        &self.jobs
    }

    /// Whether `user` may author.
    pub fn is_author(&self, user: &User) -> bool {
        self.registry.policy().is_author(user)
    }

    /// A resolver sharing this kernel's caches.
    pub fn resolver(&self) -> AliasResolver<W> {
        AliasResolver::new(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            Arc::clone(&self.manuals),
            self.toc.clone(),
            Arc::clone(&self.config),
        )
    }

    /// An engine sharing this kernel's caches.
    pub fn engine(&self) -> BranchInheritEngine<W> {
        BranchInheritEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            Arc::clone(&self.manuals),
            self.toc.clone(),
            Arc::clone(&self.nav),
        )
    }

    /// Re-read the version and manual definitions and drop every cache.
    pub async fn reload_definitions(&self) -> Result<(), DocsError> {
        self.registry.reload(self.store.as_ref()).await?;
        self.manuals.reload(self.store.as_ref()).await?;
        self.toc.cache().clear();
        self.nav.clear();
        Ok(())
    }

    /// Manuals with a TOC for `version`.
    pub async fn fetch_manuals(&self, ctx: &mut RequestContext, version: &str) -> Result<Vec<ManualInfo>, DocsError> {
        let scoped = ctx.scoped_version(version);
        let version = self.registry.require(scoped.selected_version().unwrap_or_default())?;

        let mut result = Vec::new();
        for manual in self.manuals.manuals() {
            if self.toc.toc_exists(&manual.short_name, &version.name).await? {
                result.push(ManualInfo {
                    shortname: manual.short_name,
                    longname: manual.long_name,
                });
            }
        }
        Ok(result)
    }

    /// Topics of the source TOCs of `manuals`, with conflicts against `target`.
    ///
    /// With `forced_title`, only that unit is listed. Sections left without
    /// topics are dropped.
    pub async fn fetch_topics(
        &self,
        source: &str,
        target: &str,
        manuals: &[String],
        forced_title: Option<&str>,
    ) -> Result<OrderedMap<ManualTopics>, DocsError> {
        let source = self.registry.require(source)?;
        let target = self.registry.require(target)?;
        let engine = self.engine();

        let mut result = OrderedMap::new();
        for name in manuals.iter().map(|m| m.trim()).filter(|m| !m.is_empty()) {
            let manual = self.manuals.require(name)?;
            let toc = self.toc.load(&manual.short_name, &source.name).await?;

            let mut sections: OrderedMap<SectionTopics> = OrderedMap::new();
            let mut section = String::new();
            for entry in &toc.entries {
                if !entry.is_topic() {
                    section = entry.text.clone();
                    sections.get_or_insert_with(&section, SectionTopics::default);
                    continue;
                }
                let Some(title) = &entry.title else { continue };
                if forced_title.is_some_and(|f| f != title.as_str()) {
                    continue;
                }
                let conflicts = engine.get_conflicts(title, &target).await?;
                sections
                    .get_or_insert_with(&section, SectionTopics::default)
                    .topics
                    .push(TopicListing {
                        title: title.to_string(),
                        text: entry.text.clone(),
                        conflicts: conflicts.summary(),
                    });
            }
            sections.retain(|_, s| !s.topics.is_empty());

            result.insert(
                name,
                ManualTopics {
                    meta: ManualMeta {
                        text: manual.long_name,
                        toc_exists: self.toc.toc_exists(&manual.short_name, &target.name).await?,
                    },
                    sections,
                },
            );
        }
        Ok(result)
    }

    /// Issue a job id.
    pub fn fetch_job_id(&self) -> JobId {
        self.jobs.new_job()
    }

    /// Progress text of a job.
    pub fn fetch_job_progress(&self, job: &str) -> String {
        self.jobs.read_progress(&JobId::from_string(job))
    }

    /// Run a parsed batch.
    pub async fn run_batch(
        &self,
        job: &JobId,
        source: &str,
        target: &str,
        request: &BatchRequest,
    ) -> Result<BatchReport, DocsError> {
        self.engine()
            .run_batch(self.jobs.as_ref(), job, source, target, request)
            .await
    }

    /// Run a batch from its JSON payload and return the log text.
    pub async fn process_batch(&self, job: &str, source: &str, target: &str, topic_actions: &str) -> String {
        let job = JobId::from_string(job);
        let request = match BatchRequest::from_json(topic_actions) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(job_id = %job, error = %e, "Rejected batch payload");
                self.jobs.close_job(&job);
                return FAILED_TO_READ_REQUEST.to_string();
            }
        };
        match self.run_batch(&job, source, target, &request).await {
            Ok(report) => report.log.render(),
            Err(e) => {
                tracing::warn!(job_id = %job, error = %e, "Batch aborted");
                self.jobs.close_job(&job);
                format!("Error: {}", e)
            }
        }
    }

    /// Conflicts for a unit that would take on `target`.
    pub async fn conflicts(&self, title: &ContentKey, target: &str) -> Result<ConflictRecord, DocsError> {
        let target = self.registry.require(target)?;
        self.engine().get_conflicts(title, &target).await
    }

    /// Detach version tags from a unit.
    pub async fn detach_tags(&self, title: &ContentKey, versions: &[String]) -> Result<(), DocsError> {
        let versions = versions
            .iter()
            .map(|v| self.registry.require(v))
            .collect::<Result<Vec<Version>, _>>()?;
        self.engine().detach_tags(title, &versions).await
    }

    /// Save a TOC document and drop navigation summaries.
    pub async fn save_toc(&self, key: &ContentKey, raw: &str) -> Result<TocSaveOutcome, DocsError> {
        let outcome = self.toc.save(key, raw, &self.registry).await?;
        self.nav.clear();
        tracing::info!(key = %key, created = outcome.created.len(), "Saved TOC");
        Ok(outcome)
    }

    /// Save a topic and create stubs for documentation links it makes to
    /// topics nothing serves yet. Returns the created stub keys.
    pub async fn save_topic(&self, ctx: &RequestContext, key: &ContentKey, raw: &str) -> Result<Vec<ContentKey>, DocsError> {
        let parts = key
            .parse_topic()
            .ok_or_else(|| DocsError::InvalidRequest(format!("not a topic: {}", key)))?;
        let mode = if self.store.exists(key).await.map_err(DocsError::content_store)? {
            WriteMode::Update
        } else {
            WriteMode::Create
        };
        self.store
            .write(key, raw, mode)
            .await
            .map_err(DocsError::content_store)?;

        let created = self
            .resolver()
            .ensure_linked_topics_exist(ctx, Some(&parts.topic.manual), raw)
            .await?;
        for stub in &created {
            let Some(stub_parts) = stub.parse_topic() else {
                continue;
            };
            let tags = self.store.tags_of(stub).await.map_err(DocsError::index)?;
            for version in self.registry.versions_from_tags(tags.iter().map(String::as_str)) {
                self.toc.cache().invalidate(&stub_parts.topic.manual, &version.name);
                self.nav.invalidate(&version.name);
            }
        }
        tracing::info!(key = %key, created = created.len(), "Saved topic");
        Ok(created)
    }

    /// Navigation summary for a version.
    pub async fn navigation(&self, ctx: &mut RequestContext, version: &str) -> Result<Arc<Vec<ManualSummary>>, DocsError> {
        self.nav
            .get_or_build(ctx, version, &self.registry, &self.manuals, &self.toc)
            .await
    }

    /// Resolve an aliased documentation path.
    pub async fn resolve(&self, ctx: &RequestContext, path: &str) -> Result<Resolution, DocsError> {
        self.resolver().resolve_path(ctx, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AllowAll, ContentStore, InMemoryWiki};
    use crate::types::{MANUALS_PAGE, VERSIONS_PAGE};

    async fn kernel() -> DocsKernel<InMemoryWiki> {
        let wiki = InMemoryWiki::new();
        wiki.insert_page(
            ContentKey::new(VERSIONS_PAGE),
            "{{#version:1.0|released}}\n{{#version:2.0|released}}",
            Vec::<String>::new(),
        );
        wiki.insert_page(
            ContentKey::new(MANUALS_PAGE),
            "{{#manual:User|User Manual}}\n{{#manual:Admin|Admin Guide}}",
            Vec::<String>::new(),
        );
        wiki.insert_page(
            ContentKey::toc("User", "1.0"),
            "Intro\n* {{#topic:Welcome}}\nEmpty\n* {{#topic:Nowhere}}\nSetup\n* {{#topic:Install}}",
            ["V:1.0"],
        );
        wiki.insert_page(ContentKey::topic("User", "Welcome", "1.0"), "hi", ["V:1.0"]);
        wiki.insert_page(ContentKey::topic("User", "Install", "1.0"), "old", ["V:1.0"]);
        wiki.insert_page(ContentKey::topic("User", "Install", "2.0"), "new", ["V:2.0"]);

        DocsKernel::load(Arc::new(wiki), Arc::new(AllowAll), KernelConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_topic_creates_linked_stubs() {
        let k = kernel().await;
        let ctx = RequestContext::anonymous().with_selected_version("1.0");

        let before = k.toc().load("User", "1.0").await.unwrap();
        assert!(before.entries.iter().find(|e| e.text == "Nowhere").unwrap().link.is_none());

        let welcome = ContentKey::topic("User", "Welcome", "1.0");
        let created = k
            .save_topic(&ctx, &welcome, "hi, see [[Nowhere|Going nowhere]] and [[Install]]")
            .await
            .unwrap();
        assert_eq!(created, vec![ContentKey::topic("User", "Nowhere", "1.0")]);
        assert_eq!(
            k.store().read(&welcome).await.unwrap().as_deref(),
            Some("hi, see [[Nowhere|Going nowhere]] and [[Install]]")
        );

        let after = k.toc().load("User", "1.0").await.unwrap();
        assert_eq!(
            after.entries.iter().find(|e| e.text == "Nowhere").unwrap().link.as_deref(),
            Some("/Documentation/1.0/User/Nowhere")
        );

        let err = k
            .save_topic(&ctx, &ContentKey::toc("User", "1.0"), "")
            .await
            .unwrap_err();
        assert!(matches!(err, DocsError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_fetch_manuals() {
        let k = kernel().await;
        let mut ctx = RequestContext::anonymous();
        let manuals = k.fetch_manuals(&mut ctx, "1.0").await.unwrap();
        assert_eq!(
            manuals,
            vec![ManualInfo {
                shortname: "User".into(),
                longname: "User Manual".into()
            }]
        );
        assert_eq!(ctx.selected_version(), None);
        assert!(k.fetch_manuals(&mut ctx, "2.0").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_topics_shape() {
        let k = kernel().await;
        let topics = k
            .fetch_topics("1.0", "2.0", &["User".to_string()], None)
            .await
            .unwrap();
        let json = serde_json::to_value(&topics).unwrap();

        assert_eq!(json["User"]["meta"]["text"], "User Manual");
        assert_eq!(json["User"]["meta"]["toc_exists"], false);
        assert_eq!(json["User"]["sections"]["Intro"]["meta"], serde_json::json!({}));
        assert_eq!(
            json["User"]["sections"]["Intro"]["topics"][0],
            serde_json::json!({"title": "Documentation:User:Welcome:1.0", "text": "Welcome", "conflicts": ""})
        );
        assert_eq!(
            json["User"]["sections"]["Setup"]["topics"][0]["conflicts"],
            "Documentation:User:Install:2.0"
        );
        // "Nowhere" has no unit; its placeholder key is still listed.
        assert_eq!(topics.get("User").unwrap().sections.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_topics_forced_title_drops_empty_sections() {
        let k = kernel().await;
        let topics = k
            .fetch_topics("1.0", "2.0", &["User".to_string()], Some("Documentation:User:Install:1.0"))
            .await
            .unwrap();
        let sections = &topics.get("User").unwrap().sections;
        assert_eq!(sections.keys().collect::<Vec<_>>(), vec!["Setup"]);
    }

    #[tokio::test]
    async fn test_fetch_topics_unknown_inputs() {
        let k = kernel().await;
        assert!(matches!(
            k.fetch_topics("1.0", "9.0", &[], None).await,
            Err(DocsError::UnknownVersion(_))
        ));
        assert!(matches!(
            k.fetch_topics("1.0", "2.0", &["Dev".to_string()], None).await,
            Err(DocsError::UnknownManual(_))
        ));
    }

    #[tokio::test]
    async fn test_process_batch_rejects_bad_payload() {
        let k = kernel().await;
        let job = k.fetch_job_id();
        let log = k.process_batch(job.as_str(), "1.0", "2.0", "not json").await;
        assert_eq!(log, FAILED_TO_READ_REQUEST);
        assert_eq!(k.fetch_job_progress(job.as_str()), crate::jobs::NO_PROGRESS);
    }

    #[tokio::test]
    async fn test_save_toc_clears_navigation() {
        let k = kernel().await;
        let mut ctx = RequestContext::anonymous();
        let nav = k.navigation(&mut ctx, "1.0").await.unwrap();
        assert_eq!(nav.len(), 1);
        assert!(k.nav().get("1.0").is_some());

        k.save_toc(&ContentKey::toc("User", "1.0"), "Intro\n* {{#topic:Welcome}}")
            .await
            .unwrap();
        assert!(k.nav().get("1.0").is_none());
    }
}
