//! Per-version navigation summaries.
//!
//! For each version, the manuals that have a TOC with at least one linked
//! topic, with the link to jump to. Entries expire after a TTL and are
//! dropped whenever a TOC is saved or branched.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::DocsError;
use crate::registry::{ManualRegistry, VersionRegistry};
use crate::store::WikiStore;
use crate::toc::TocModel;
use crate::types::RequestContext;

/// One manual in the navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualSummary {
    /// Manual short name.
    pub short_name: String,
    /// Manual display name.
    pub long_name: String,
    /// Link to the first linked topic of the manual's TOC.
    pub first_url: String,
}

#[derive(Debug)]
struct NavEntry {
    built_at: Instant,
    manuals: Arc<Vec<ManualSummary>>,
}

/// TTL cache of navigation summaries keyed by version name.
#[derive(Debug)]
pub struct NavCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, NavEntry>>,
}

impl NavCache {
    /// Create a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh summary for a version, if cached.
    pub fn get(&self, version: &str) -> Option<Arc<Vec<ManualSummary>>> {
        self.entries
            .read()
            .get(version)
            .filter(|e| e.built_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.manuals))
    }

    /// Summary for a version, building and caching it when missing or stale.
    ///
    /// The build reads TOCs with `version` selected on `ctx`; the previous
    /// selection is back in place when this returns, error or not.
    pub async fn get_or_build<W: WikiStore>(
        &self,
        ctx: &mut RequestContext,
        version: &str,
        registry: &VersionRegistry,
        manuals: &ManualRegistry,
        toc: &TocModel<W>,
    ) -> Result<Arc<Vec<ManualSummary>>, DocsError> {
        if let Some(cached) = self.get(version) {
            return Ok(cached);
        }

        let built = {
            let scoped = ctx.scoped_version(version);
            Self::build(&scoped, registry, manuals, toc).await
        };
        let built = Arc::new(built?);

        self.entries.write().insert(
            version.to_string(),
            NavEntry {
                built_at: Instant::now(),
                manuals: Arc::clone(&built),
            },
        );
        tracing::debug!(version, manuals = built.len(), "Built navigation summary");
        Ok(built)
    }

    async fn build<W: WikiStore>(
        ctx: &RequestContext,
        registry: &VersionRegistry,
        manuals: &ManualRegistry,
        toc: &TocModel<W>,
    ) -> Result<Vec<ManualSummary>, DocsError> {
        let selected = ctx.selected_version().unwrap_or_default();
        let version = registry.require(selected)?;

        let mut summaries = Vec::new();
        for manual in manuals.manuals() {
            let toc = toc.load(&manual.short_name, &version.name).await?;
            if let Some(first) = toc.first_link().and_then(|e| e.link.clone()) {
                summaries.push(ManualSummary {
                    short_name: manual.short_name,
                    long_name: manual.long_name,
                    first_url: first,
                });
            }
        }
        Ok(summaries)
    }

    /// Drop the entry for a version.
    pub fn invalidate(&self, version: &str) {
        self.entries.write().remove(version);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::store::{AllowAll, InMemoryWiki};
    use crate::toc::TocCache;
    use crate::types::ContentKey;

    struct Fixture {
        wiki: Arc<InMemoryWiki>,
        registry: VersionRegistry,
        manuals: ManualRegistry,
        toc: TocModel<InMemoryWiki>,
    }

    fn fixture() -> Fixture {
        let wiki = Arc::new(InMemoryWiki::new());
        wiki.insert_page(ContentKey::toc("User", "1.0"), "Start\n* {{#topic:Intro}}", ["V:1.0"]);
        wiki.insert_page(ContentKey::topic("User", "Intro", "1.0"), "", ["V:1.0"]);
        wiki.insert_page(ContentKey::toc("Admin", "1.0"), "Start\n* {{#topic:Nothing}}", ["V:1.0"]);

        Fixture {
            registry: VersionRegistry::from_definition(
                "{{#version:1.0|released}}{{#version:2.0|released}}",
                Arc::new(AllowAll),
            ),
            manuals: ManualRegistry::from_definition(
                "{{#manual:User|User Manual}}{{#manual:Admin|Admin Manual}}",
            ),
            toc: TocModel::new(
                Arc::clone(&wiki),
                Arc::new(TocCache::default()),
                Arc::new(KernelConfig::default()),
            ),
            wiki,
        }
    }

    #[tokio::test]
    async fn test_build_and_restore_selection() {
        let f = fixture();
        let cache = NavCache::new(Duration::from_secs(60));
        let mut ctx = RequestContext::anonymous().with_selected_version("2.0");

        let nav = cache
            .get_or_build(&mut ctx, "1.0", &f.registry, &f.manuals, &f.toc)
            .await
            .unwrap();
        assert_eq!(
            nav.as_ref(),
            &vec![ManualSummary {
                short_name: "User".into(),
                long_name: "User Manual".into(),
                first_url: "/Documentation/1.0/User/Intro".into(),
            }]
        );
        assert_eq!(ctx.selected_version(), Some("2.0"));
        assert!(cache.get("1.0").is_some());
    }

    #[tokio::test]
    async fn test_error_restores_selection() {
        let f = fixture();
        let cache = NavCache::new(Duration::from_secs(60));
        let mut ctx = RequestContext::anonymous();

        let result = cache
            .get_or_build(&mut ctx, "7.0", &f.registry, &f.manuals, &f.toc)
            .await;
        assert!(matches!(result, Err(DocsError::UnknownVersion(_))));
        assert_eq!(ctx.selected_version(), None);
    }

    #[tokio::test]
    async fn test_expired_and_invalidated_entries_rebuild() {
        let f = fixture();
        let cache = NavCache::new(Duration::ZERO);
        let mut ctx = RequestContext::anonymous();
        cache
            .get_or_build(&mut ctx, "1.0", &f.registry, &f.manuals, &f.toc)
            .await
            .unwrap();
        assert!(cache.get("1.0").is_none());

        let cache = NavCache::new(Duration::from_secs(60));
        cache
            .get_or_build(&mut ctx, "1.0", &f.registry, &f.manuals, &f.toc)
            .await
            .unwrap();
        cache.invalidate("1.0");
        assert!(cache.get("1.0").is_none());
        assert_eq!(f.wiki.num_pages(), 3);
    }
}
