//! Version registry.
//!
//! Versions are declared on `Documentation:Versions`, one per line:
//!
//! ```text
//! {{#version:1.0|deprecated}}
//! {{#version:2.0|released}}
//! {{#version:3.0|unreleased}}
//! ```
//!
//! Declaration order is the version order, oldest first. Lines that do not
//! parse are skipped with a warning.

use parking_lot::RwLock;
use regex_lite::Regex;
use std::sync::{Arc, OnceLock};

use crate::error::DocsError;
use crate::store::{AccessPolicy, ContentStore};
use crate::types::{parse_version_tag, ContentKey, User, Version, VersionStatus, VERSIONS_PAGE};

fn version_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\{\{\s*#version\s*:\s*([^|}]+?)\s*\|\s*([a-z]+)\s*\}\}")
            .expect("version declaration pattern is valid")
    })
}

/// Parse version declarations from definition text.
pub fn parse_version_definitions(text: &str) -> Vec<Version> {
    let mut versions: Vec<Version> = Vec::new();
    for caps in version_line().captures_iter(text) {
        let name = caps[1].to_string();
        let status = match caps[2].parse::<VersionStatus>() {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(version = %name, error = %e, "Skipping version declaration");
                continue;
            }
        };
        if versions.iter().any(|v| v.name == name) {
            tracing::warn!(version = %name, "Skipping duplicate version declaration");
            continue;
        }
        let rank = versions.len();
        versions.push(Version::new(name, status, rank));
    }
    versions
}

/// Registry of declared versions.
#[derive(Debug)]
pub struct VersionRegistry {
    versions: RwLock<Arc<Vec<Version>>>,
    policy: Arc<dyn AccessPolicy>,
}

impl VersionRegistry {
    /// Build from definition text.
    pub fn from_definition(text: &str, policy: Arc<dyn AccessPolicy>) -> Self {
        Self::from_versions(parse_version_definitions(text), policy)
    }

    /// Build from an already ordered list. Ranks are reassigned from list order.
    pub fn from_versions(versions: Vec<Version>, policy: Arc<dyn AccessPolicy>) -> Self {
        Self {
            versions: RwLock::new(Arc::new(rerank(versions))),
            policy,
        }
    }

    /// Load from the versions page of a content store.
    pub async fn load<S: ContentStore>(store: &S, policy: Arc<dyn AccessPolicy>) -> Result<Self, DocsError> {
        let registry = Self::from_versions(Vec::new(), policy);
        registry.reload(store).await?;
        Ok(registry)
    }

    /// Re-read the versions page, replacing the catalog.
    pub async fn reload<S: ContentStore>(&self, store: &S) -> Result<(), DocsError> {
        let text = store
            .read(&ContentKey::new(VERSIONS_PAGE))
            .await
            .map_err(DocsError::content_store)?;
        let text = text.unwrap_or_else(|| {
            tracing::warn!(page = VERSIONS_PAGE, "Versions page missing, no versions declared");
            String::new()
        });
        self.reload_from_definition(&text);
        Ok(())
    }

    /// Replace the catalog from definition text.
    pub fn reload_from_definition(&self, text: &str) {
        let versions = parse_version_definitions(text);
        tracing::debug!(count = versions.len(), "Loaded version declarations");
        *self.versions.write() = Arc::new(versions);
    }

    fn catalog(&self) -> Arc<Vec<Version>> {
        self.versions.read().clone()
    }

    /// The access policy used for filtering.
    pub fn policy(&self) -> &Arc<dyn AccessPolicy> {
        &self.policy
    }

    /// Every declared version, oldest first.
    pub fn all(&self) -> Vec<Version> {
        self.catalog().as_ref().clone()
    }

    /// Versions by status, oldest first.
    ///
    /// The base set is released and deprecated versions. `include_unreleased`
    /// adds unreleased ones; `include_all` returns every declared version.
    pub fn load_versions(&self, include_unreleased: bool, include_all: bool) -> Vec<Version> {
        self.catalog()
            .iter()
            .filter(|v| include_all || include_unreleased || v.is_public())
            .cloned()
            .collect()
    }

    /// Versions visible to `user`, oldest first. Unfiltered returns all declared.
    pub fn get_versions(&self, user: &User, filtered: bool) -> Vec<Version> {
        self.catalog()
            .iter()
            .filter(|v| !filtered || self.policy.can_access_version(user, v))
            .cloned()
            .collect()
    }

    /// Released versions, oldest first, optionally filtered for `user`.
    pub fn released_versions(&self, user: &User, filtered: bool) -> Vec<Version> {
        self.get_versions(user, filtered)
            .into_iter()
            .filter(Version::is_released)
            .collect()
    }

    /// Look up a version by name. Exact match wins over a case-insensitive one.
    pub fn get_version_by_name(&self, name: &str) -> Option<Version> {
        let catalog = self.catalog();
        catalog
            .iter()
            .find(|v| v.name == name)
            .or_else(|| catalog.iter().find(|v| v.name.eq_ignore_ascii_case(name)))
            .cloned()
    }

    /// Look up a version by name, failing with `UnknownVersion`.
    pub fn require(&self, name: &str) -> Result<Version, DocsError> {
        self.get_version_by_name(name)
            .ok_or_else(|| DocsError::UnknownVersion(name.to_string()))
    }

    /// The newest released version.
    pub fn latest_released(&self) -> Option<Version> {
        self.catalog().iter().rev().find(|v| v.is_released()).cloned()
    }

    /// The oldest of the named versions. Unknown names are ignored.
    pub fn find_earliest<'a, I>(&self, names: I) -> Option<Version>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter_map(|n| self.get_version_by_name(n))
            .min()
    }

    /// Declared versions named by version tags, newest first, without repeats.
    ///
    /// Tags for undeclared versions are dropped.
    pub fn versions_from_tags<'a, I>(&self, tags: I) -> Vec<Version>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut versions: Vec<Version> = tags
            .into_iter()
            .filter_map(parse_version_tag)
            .filter_map(|n| self.get_version_by_name(n))
            .collect();
        versions.sort_by(|a, b| b.cmp(a));
        versions.dedup();
        versions
    }
}

fn rerank(mut versions: Vec<Version>) -> Vec<Version> {
    for (rank, v) in versions.iter_mut().enumerate() {
        v.rank = rank;
    }
    versions
}
