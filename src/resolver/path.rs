//! Aliased path grammar.
//!
//! | Form | Example |
//! |------|---------|
//! | strict | `Documentation/latest/User/Install` |
//! | legacy | `Documentation:User/2.0/Install` |
//! | unversioned | `Documentation:User:Install` |
//! | concrete | `Documentation:User:Install:2.0` |
//! | landing | `Documentation/User`, `Documentation/2.0/User` |

use crate::types::title::strip_prefix_ignore_case;
use crate::types::ContentKey;
use crate::DOC_NAMESPACE;

/// A parsed documentation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasPath {
    /// `Documentation/<version|latest>/<manual>/<topic>`.
    Strict {
        /// Version name or `latest`.
        version: String,
        /// Manual short name.
        manual: String,
        /// Topic slug.
        topic: String,
    },
    /// `Documentation:<manual>/<version|latest>/<topic>`.
    Legacy {
        /// Manual short name.
        manual: String,
        /// Version name or `latest`.
        version: String,
        /// Topic slug.
        topic: String,
    },
    /// `Documentation:<manual>:<topic>`.
    Unversioned {
        /// Manual short name.
        manual: String,
        /// Topic slug.
        topic: String,
    },
    /// `Documentation:<manual>:<topic>:<version>`, a stored key.
    Concrete(ContentKey),
    /// `Documentation/[<version|latest>/]<manual>`.
    Landing {
        /// Version name or `latest`; `None` means the caller's selection.
        version: Option<String>,
        /// Manual short name.
        manual: String,
    },
}

impl AliasPath {
    /// Parse a path relative to the article root. A leading `/` is ignored.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim().trim_start_matches('/');
        let rest = strip_prefix_ignore_case(path, DOC_NAMESPACE)?;

        if let Some(rest) = rest.strip_prefix('/') {
            let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
            return match segments.as_slice() {
                [version, manual, topic] => Some(Self::Strict {
                    version: version.to_string(),
                    manual: manual.to_string(),
                    topic: topic.to_string(),
                }),
                [version, manual] => Some(Self::Landing {
                    version: Some(version.to_string()),
                    manual: manual.to_string(),
                }),
                [manual] => Some(Self::Landing {
                    version: None,
                    manual: manual.to_string(),
                }),
                _ => None,
            };
        }

        let rest = rest.strip_prefix(':')?;
        if rest.contains('/') {
            let parts: Vec<&str> = rest.split('/').collect();
            return match parts.as_slice() {
                [manual, version, topic]
                    if !manual.is_empty() && !version.is_empty() && !topic.is_empty() =>
                {
                    Some(Self::Legacy {
                        manual: manual.to_string(),
                        version: version.to_string(),
                        topic: topic.to_string(),
                    })
                }
                _ => None,
            };
        }

        let parts: Vec<&str> = rest.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        match parts.as_slice() {
            [manual, topic] => Some(Self::Unversioned {
                manual: manual.to_string(),
                topic: topic.to_string(),
            }),
            [_, _, _] => Some(Self::Concrete(ContentKey::new(format!("{}:{}", DOC_NAMESPACE, rest)))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_and_landing() {
        assert_eq!(
            AliasPath::parse("/Documentation/latest/User/Install"),
            Some(AliasPath::Strict {
                version: "latest".into(),
                manual: "User".into(),
                topic: "Install".into()
            })
        );
        assert_eq!(
            AliasPath::parse("Documentation/2.0/User/"),
            Some(AliasPath::Landing {
                version: Some("2.0".into()),
                manual: "User".into()
            })
        );
        assert_eq!(
            AliasPath::parse("Documentation/User"),
            Some(AliasPath::Landing {
                version: None,
                manual: "User".into()
            })
        );
    }

    #[test]
    fn test_colon_forms() {
        assert_eq!(
            AliasPath::parse("Documentation:User/2.0/Install"),
            Some(AliasPath::Legacy {
                manual: "User".into(),
                version: "2.0".into(),
                topic: "Install".into()
            })
        );
        assert_eq!(
            AliasPath::parse("Documentation:User:Install"),
            Some(AliasPath::Unversioned {
                manual: "User".into(),
                topic: "Install".into()
            })
        );
        assert_eq!(
            AliasPath::parse("Documentation:User:Install:2.0"),
            Some(AliasPath::Concrete(ContentKey::topic("User", "Install", "2.0")))
        );
    }

    #[test]
    fn test_rejects_other_paths() {
        assert_eq!(AliasPath::parse("Help:Contents"), None);
        assert_eq!(AliasPath::parse("Documentation/a/b/c/d"), None);
        assert_eq!(AliasPath::parse("Documentation:User::Install"), None);
        assert_eq!(AliasPath::parse("Documentation"), None);
    }
}
