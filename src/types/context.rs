//! Per-request context: the acting user and the selected version.
//!
//! The selected version is passed explicitly rather than read from ambient
//! state. Operations that need to look at another version for a while take a
//! [`ScopedVersion`] guard, which puts the previous selection back when dropped,
//! including on early return.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

/// The acting user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User name. Empty for anonymous readers.
    pub name: String,
    /// Group memberships.
    #[serde(default)]
    pub groups: BTreeSet<String>,
}

impl User {
    /// Anonymous reader with no groups.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Named user with no groups.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: BTreeSet::new(),
        }
    }

    /// Add a group membership.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Whether the user belongs to `group` (ASCII case-insensitive).
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g.eq_ignore_ascii_case(group))
    }
}

/// Request-scoped state.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    user: User,
    selected_version: Option<String>,
}

impl RequestContext {
    /// Context for a user with no version selected.
    pub fn new(user: User) -> Self {
        Self {
            user,
            selected_version: None,
        }
    }

    /// Anonymous context.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Select a version for the rest of the request.
    pub fn with_selected_version(mut self, version: impl Into<String>) -> Self {
        self.selected_version = Some(version.into());
        self
    }

    /// The acting user.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// The currently selected version name.
    pub fn selected_version(&self) -> Option<&str> {
        self.selected_version.as_deref()
    }

    /// Select `version` until the returned guard drops.
    pub fn scoped_version(&mut self, version: impl Into<String>) -> ScopedVersion<'_> {
        let previous = self.selected_version.replace(version.into());
        ScopedVersion {
            ctx: self,
            previous,
        }
    }
}

/// Guard restoring the previously selected version on drop.
#[derive(Debug)]
pub struct ScopedVersion<'a> {
    ctx: &'a mut RequestContext,
    previous: Option<String>,
}

impl Deref for ScopedVersion<'_> {
    type Target = RequestContext;

    fn deref(&self) -> &RequestContext {
        self.ctx
    }
}

impl DerefMut for ScopedVersion<'_> {
    fn deref_mut(&mut self) -> &mut RequestContext {
        self.ctx
    }
}

impl Drop for ScopedVersion<'_> {
    fn drop(&mut self) {
        self.ctx.selected_version = self.previous.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_version_restores() {
        let mut ctx = RequestContext::anonymous().with_selected_version("1.0");
        {
            let scoped = ctx.scoped_version("2.0");
            assert_eq!(scoped.selected_version(), Some("2.0"));
        }
        assert_eq!(ctx.selected_version(), Some("1.0"));
    }

    #[test]
    fn test_scoped_version_restores_none() {
        let mut ctx = RequestContext::anonymous();
        fn inner(ctx: &mut RequestContext) -> Result<(), ()> {
            let _scoped = ctx.scoped_version("2.0");
            Err(())
        }
        assert!(inner(&mut ctx).is_err());
        assert_eq!(ctx.selected_version(), None);
    }

    #[test]
    fn test_group_membership_ignores_case() {
        let user = User::new("ann").with_group("DocTeam");
        assert!(user.in_group("docteam"));
        assert!(!user.in_group("employees"));
    }
}
