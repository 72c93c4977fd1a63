//! Alias resolution: from `(manual, version-or-latest, topic)` to a stored unit.
//!
//! Resolution never guesses. When no unit can be chosen the outcome is a
//! redirect to the documentation root or, on the strict explicit-version path,
//! a not-found the caller renders as a 404.
//!
//! `latest` picks the newest version that both tags a unit of the topic and is
//! visible to the caller. The strict form additionally requires that version
//! to be the latest released one; otherwise the reader is sent to the
//! latest-doc fallback page instead of stale content.

pub mod links;
pub mod path;

use serde::Serialize;
use std::sync::Arc;

use crate::config::KernelConfig;
use crate::error::DocsError;
use crate::registry::{ManualRegistry, VersionRegistry};
use crate::store::{TaggedUnit, WikiStore};
use crate::toc::TocModel;
use crate::types::{version_tag, ContentKey, RequestContext, TopicRef, Version};
use crate::DOC_NAMESPACE;

pub use path::AliasPath;

/// Version segment meaning "newest visible".
pub const LATEST: &str = "latest";

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Resolution {
    /// Serve this unit.
    Concrete {
        /// Unit key.
        key: ContentKey,
        /// Version the unit was chosen for.
        version: String,
    },
    /// Send the reader elsewhere.
    Redirect {
        /// Target location.
        location: String,
    },
    /// Render a 404.
    NotFound,
}

impl Resolution {
    /// The chosen unit, if concrete.
    pub fn key(&self) -> Option<&ContentKey> {
        match self {
            Self::Concrete { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Which resolution policy to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Redirect to the documentation root on any failure.
    Lenient,
    /// Require `latest` to be the latest released version; 404 on a missing
    /// explicit version.
    Strict,
}

/// Resolves aliased topic references.
#[derive(Debug)]
pub struct AliasResolver<W: WikiStore> {
    store: Arc<W>,
    registry: Arc<VersionRegistry>,
    manuals: Arc<ManualRegistry>,
    toc: TocModel<W>,
    config: Arc<KernelConfig>,
}

impl<W: WikiStore> Clone for AliasResolver<W> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            manuals: Arc::clone(&self.manuals),
            toc: self.toc.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<W: WikiStore> AliasResolver<W> {
    /// Create a resolver.
    pub fn new(
        store: Arc<W>,
        registry: Arc<VersionRegistry>,
        manuals: Arc<ManualRegistry>,
        toc: TocModel<W>,
        config: Arc<KernelConfig>,
    ) -> Self {
        Self {
            store,
            registry,
            manuals,
            toc,
            config,
        }
    }

    fn redirect_default(&self) -> Resolution {
        Resolution::Redirect {
            location: self.config.default_redirect(),
        }
    }

    fn redirect_latest_fallback(&self, topic: &TopicRef) -> Resolution {
        Resolution::Redirect {
            location: format!(
                "{}?t={}/{}/{}/{}",
                self.config.latest_fallback_path, DOC_NAMESPACE, LATEST, topic.manual, topic.slug
            ),
        }
    }

    /// Lenient resolution.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        manual: &str,
        version_or_latest: &str,
        slug: &str,
    ) -> Result<Resolution, DocsError> {
        self.resolve_with(ctx, manual, version_or_latest, slug, ResolutionMode::Lenient)
            .await
    }

    /// Strict resolution.
    pub async fn resolve_strict(
        &self,
        ctx: &RequestContext,
        manual: &str,
        version_or_latest: &str,
        slug: &str,
    ) -> Result<Resolution, DocsError> {
        self.resolve_with(ctx, manual, version_or_latest, slug, ResolutionMode::Strict)
            .await
    }

    /// Resolve under the given policy.
    pub async fn resolve_with(
        &self,
        ctx: &RequestContext,
        manual: &str,
        version_or_latest: &str,
        slug: &str,
        mode: ResolutionMode,
    ) -> Result<Resolution, DocsError> {
        let topic = TopicRef::new(manual.trim(), slug.trim());
        let units = self
            .store
            .units_for_topic(&topic)
            .await
            .map_err(DocsError::index)?;

        let resolution = if version_or_latest.eq_ignore_ascii_case(LATEST) {
            self.latest(ctx, &topic, &units, mode)
        } else {
            self.explicit(ctx, version_or_latest, &units, mode)
        };
        tracing::debug!(
            topic = %topic,
            version = version_or_latest,
            ?mode,
            ?resolution,
            "Resolved topic"
        );
        Ok(resolution)
    }

    fn latest(
        &self,
        ctx: &RequestContext,
        topic: &TopicRef,
        units: &[TaggedUnit],
        mode: ResolutionMode,
    ) -> Resolution {
        let tagged = self
            .registry
            .versions_from_tags(units.iter().flat_map(|u| u.tags.iter().map(String::as_str)));
        if tagged.is_empty() {
            return self.redirect_default();
        }

        let visible = match mode {
            ResolutionMode::Lenient => self.registry.get_versions(ctx.user(), true),
            ResolutionMode::Strict => self.registry.released_versions(ctx.user(), true),
        };
        let Some(chosen) = tagged.into_iter().find(|v| visible.contains(v)) else {
            return match mode {
                ResolutionMode::Lenient => self.redirect_default(),
                ResolutionMode::Strict => self.redirect_latest_fallback(topic),
            };
        };

        if mode == ResolutionMode::Strict && self.registry.latest_released().as_ref() != Some(&chosen) {
            return self.redirect_latest_fallback(topic);
        }

        match unit_tagged(units, &chosen) {
            Some(unit) => Resolution::Concrete {
                key: unit.key.clone(),
                version: chosen.name,
            },
            None => self.redirect_default(),
        }
    }

    fn explicit(
        &self,
        ctx: &RequestContext,
        version: &str,
        units: &[TaggedUnit],
        mode: ResolutionMode,
    ) -> Resolution {
        let missing = || match mode {
            ResolutionMode::Lenient => self.redirect_default(),
            ResolutionMode::Strict => Resolution::NotFound,
        };

        let Some(version) = self.registry.get_version_by_name(version) else {
            return self.redirect_default();
        };
        if !self.registry.policy().can_access_version(ctx.user(), &version) {
            return missing();
        }
        match unit_tagged(units, &version) {
            Some(unit) => Resolution::Concrete {
                key: unit.key.clone(),
                version: version.name,
            },
            None => missing(),
        }
    }

    /// Resolve `Documentation:<manual>:<topic>` as lenient latest.
    pub async fn resolve_unversioned(&self, ctx: &RequestContext, title: &str) -> Result<Resolution, DocsError> {
        match AliasPath::parse(title) {
            Some(AliasPath::Unversioned { manual, topic }) => self.resolve(ctx, &manual, LATEST, &topic).await,
            _ => Ok(self.redirect_default()),
        }
    }

    /// Redirect to the first linked topic of a manual's TOC.
    ///
    /// With no version, the caller's selected version is used, then the
    /// latest released one.
    pub async fn resolve_landing(
        &self,
        ctx: &RequestContext,
        manual: &str,
        version: Option<&str>,
    ) -> Result<Resolution, DocsError> {
        let Some(manual) = self.manuals.get(manual) else {
            return Ok(self.redirect_default());
        };
        let version = match version.or(ctx.selected_version()) {
            Some(v) if !v.eq_ignore_ascii_case(LATEST) => self.registry.get_version_by_name(v),
            _ => self.registry.latest_released(),
        };
        let Some(version) = version.filter(|v| self.registry.policy().can_access_version(ctx.user(), v)) else {
            return Ok(self.redirect_default());
        };

        let toc = self.toc.load(&manual.short_name, &version.name).await?;
        Ok(match toc.first_link().and_then(|e| e.link.clone()) {
            Some(location) => Resolution::Redirect { location },
            None => self.redirect_default(),
        })
    }

    /// Resolve a path in any of the [`AliasPath`] forms.
    pub async fn resolve_path(&self, ctx: &RequestContext, path: &str) -> Result<Resolution, DocsError> {
        let Some(parsed) = AliasPath::parse(path) else {
            return Ok(Resolution::NotFound);
        };
        match parsed {
            AliasPath::Strict { version, manual, topic } => {
                self.resolve_strict(ctx, &manual, &version, &topic).await
            }
            AliasPath::Legacy { manual, version, topic } => self.resolve(ctx, &manual, &version, &topic).await,
            AliasPath::Unversioned { manual, topic } => self.resolve(ctx, &manual, LATEST, &topic).await,
            AliasPath::Concrete(key) => self.resolve_concrete(ctx, key).await,
            AliasPath::Landing { version, manual } => {
                self.resolve_landing(ctx, &manual, version.as_deref()).await
            }
        }
    }

    async fn resolve_concrete(&self, ctx: &RequestContext, key: ContentKey) -> Result<Resolution, DocsError> {
        let Some(parts) = key.parse_topic() else {
            return Ok(Resolution::NotFound);
        };
        if !self.store.exists(&key).await.map_err(DocsError::content_store)? {
            return Ok(Resolution::NotFound);
        }
        let visible = self
            .registry
            .get_version_by_name(&parts.version)
            .map_or(true, |v| self.registry.policy().can_access_version(ctx.user(), &v));
        Ok(if visible {
            Resolution::Concrete {
                key,
                version: parts.version,
            }
        } else {
            Resolution::NotFound
        })
    }

    /// The version a link should point at: the caller's selection, then the
    /// latest released version.
    fn link_version(&self, ctx: &RequestContext) -> Option<Version> {
        ctx.selected_version()
            .and_then(|v| self.registry.get_version_by_name(v))
            .or_else(|| self.registry.latest_released())
    }
}

fn unit_tagged<'a>(units: &'a [TaggedUnit], version: &Version) -> Option<&'a TaggedUnit> {
    let tag = version_tag(&version.name);
    units.iter().find(|u| u.has_tag(&tag))
}
