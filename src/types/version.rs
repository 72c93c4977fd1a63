//! Versions and manuals.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    /// Visible to preview groups only.
    Unreleased,
    /// Publicly visible.
    Released,
    /// Publicly visible, but no longer current.
    Deprecated,
}

impl VersionStatus {
    /// Lowercase name as written in the versions definition.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreleased => "unreleased",
            Self::Released => "released",
            Self::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unreleased" => Ok(Self::Unreleased),
            "released" => Ok(Self::Released),
            "deprecated" => Ok(Self::Deprecated),
            other => Err(format!("unknown version status: {}", other)),
        }
    }
}

/// A declared documentation version.
///
/// Versions order by `rank`, which is the declaration position (oldest first).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Version name, e.g. `2.0`.
    pub name: String,
    /// Lifecycle status.
    pub status: VersionStatus,
    /// Position in the declared order. Higher is newer.
    pub rank: usize,
}

impl Version {
    /// Create a version.
    pub fn new(name: impl Into<String>, status: VersionStatus, rank: usize) -> Self {
        Self {
            name: name.into(),
            status,
            rank,
        }
    }

    /// Whether the version is released.
    pub fn is_released(&self) -> bool {
        self.status == VersionStatus::Released
    }

    /// Whether the version is publicly visible.
    pub fn is_public(&self) -> bool {
        self.status != VersionStatus::Unreleased
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// A declared manual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manual {
    /// Short name used in keys and paths.
    pub short_name: String,
    /// Display name.
    pub long_name: String,
}

impl Manual {
    /// Create a manual.
    pub fn new(short_name: impl Into<String>, long_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            long_name: long_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("Released".parse::<VersionStatus>(), Ok(VersionStatus::Released));
        assert_eq!(" deprecated ".parse::<VersionStatus>(), Ok(VersionStatus::Deprecated));
        assert!("beta".parse::<VersionStatus>().is_err());
    }

    #[test]
    fn test_versions_order_by_rank() {
        let old = Version::new("10.0", VersionStatus::Deprecated, 0);
        let new = Version::new("9.0", VersionStatus::Released, 1);
        assert!(old < new);
    }
}
