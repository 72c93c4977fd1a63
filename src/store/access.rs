//! Access policy: who may see which versions and who may author.

use std::collections::BTreeSet;

use crate::types::{User, Version};

/// Decides version visibility and authoring rights.
pub trait AccessPolicy: Send + Sync + std::fmt::Debug {
    /// Whether `user` may see content of `version`.
    fn can_access_version(&self, user: &User, version: &Version) -> bool;

    /// Whether `user` may run branch/inherit batches and edit TOCs.
    fn is_author(&self, _user: &User) -> bool {
        false
    }
}

/// Everyone sees everything and may author.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn can_access_version(&self, _user: &User, _version: &Version) -> bool {
        true
    }

    fn is_author(&self, _user: &User) -> bool {
        true
    }
}

/// Group-based policy.
///
/// Public versions are visible to everyone. Unreleased versions are visible to
/// members of a preview group. Authors are members of an author group.
#[derive(Debug, Clone)]
pub struct GroupAccessPolicy {
    preview_groups: BTreeSet<String>,
    author_groups: BTreeSet<String>,
}

impl Default for GroupAccessPolicy {
    fn default() -> Self {
        Self::new(["docteam", "employees"], ["docteam"])
    }
}

impl GroupAccessPolicy {
    /// Create a policy from preview and author group names.
    pub fn new<P, A>(preview_groups: P, author_groups: A) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self {
            preview_groups: preview_groups.into_iter().map(Into::into).collect(),
            author_groups: author_groups.into_iter().map(Into::into).collect(),
        }
    }

    fn in_any(user: &User, groups: &BTreeSet<String>) -> bool {
        groups.iter().any(|g| user.in_group(g))
    }
}

impl AccessPolicy for GroupAccessPolicy {
    fn can_access_version(&self, user: &User, version: &Version) -> bool {
        version.is_public() || Self::in_any(user, &self.preview_groups)
    }

    fn is_author(&self, user: &User) -> bool {
        Self::in_any(user, &self.author_groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VersionStatus;

    #[test]
    fn test_unreleased_needs_preview_group() {
        let policy = GroupAccessPolicy::default();
        let unreleased = Version::new("3.0", VersionStatus::Unreleased, 2);
        let released = Version::new("2.0", VersionStatus::Released, 1);

        let reader = User::anonymous();
        let employee = User::new("emp").with_group("employees");

        assert!(policy.can_access_version(&reader, &released));
        assert!(!policy.can_access_version(&reader, &unreleased));
        assert!(policy.can_access_version(&employee, &unreleased));
    }

    #[test]
    fn test_author_group() {
        let policy = GroupAccessPolicy::default();
        assert!(policy.is_author(&User::new("w").with_group("docteam")));
        assert!(!policy.is_author(&User::new("e").with_group("employees")));
    }
}
