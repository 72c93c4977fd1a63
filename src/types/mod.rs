//! Core types for the documentation kernel.

pub mod title;
pub mod version;
pub mod context;
pub mod ordered;

pub use title::{
    parse_version_tag, topic_slug, version_tag, ContentKey, TopicKeyParts, TopicRef,
    MANUALS_PAGE, VERSIONS_PAGE, VERSION_TAG_PREFIX,
};
pub use version::{Manual, Version, VersionStatus};
pub use context::{RequestContext, ScopedVersion, User};
pub use ordered::OrderedMap;
