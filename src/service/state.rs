//! Service state management.
//!
//! Holds the shared kernel and turns request headers into a
//! [`RequestContext`].

use axum::http::HeaderMap;
use std::sync::Arc;
use std::time::Instant;

use crate::api::DocsKernel;
use crate::canonical::canonical_hash_hex;
use crate::store::WikiStore;
use crate::types::{RequestContext, User};

/// Header naming the caller.
pub const USER_HEADER: &str = "X-Docs-User";
/// Header listing the caller's groups, comma separated.
pub const GROUPS_HEADER: &str = "X-Docs-Groups";
/// Header carrying the caller's selected version.
pub const VERSION_HEADER: &str = "X-Docs-Version";

/// Shared service state.
pub struct ServiceState<W: WikiStore> {
    /// The documentation kernel.
    pub kernel: Arc<DocsKernel<W>>,
    started_at: Instant,
}

impl<W: WikiStore> ServiceState<W> {
    /// Wrap a loaded kernel.
    pub fn new(kernel: DocsKernel<W>) -> Self {
        Self {
            kernel: Arc::new(kernel),
            started_at: Instant::now(),
        }
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Fingerprint of the loaded version and manual definitions.
    ///
    /// Changes whenever either definition page changes after a reload.
    pub fn definitions_fingerprint(&self) -> String {
        let versions = self.kernel.registry().all();
        let manuals = self.kernel.manuals().manuals();
        canonical_hash_hex(&(versions, manuals))
    }
}

impl<W: WikiStore> Clone for ServiceState<W> {
    fn clone(&self) -> Self {
        Self {
            kernel: Arc::clone(&self.kernel),
            started_at: self.started_at,
        }
    }
}

/// Build the caller's context from request headers.
///
/// Missing headers mean an anonymous caller with no selected version.
pub fn request_context(headers: &HeaderMap) -> RequestContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let mut user = match header(USER_HEADER) {
        Some(name) => User::new(name),
        None => User::anonymous(),
    };
    if let Some(groups) = header(GROUPS_HEADER) {
        for group in groups.split(',').map(str::trim).filter(|g| !g.is_empty()) {
            user = user.with_group(group);
        }
    }

    let ctx = RequestContext::new(user);
    match header(VERSION_HEADER) {
        Some(version) => ctx.with_selected_version(version),
        None => ctx,
    }
}
