//! Error kinds surfaced by the kernel.
//!
//! Nothing here is fatal to the host process. Resolution failures turn into
//! redirects or 404s, batch failures into per-topic outcomes, and validation
//! failures into rejected saves.

use crate::engine::ConflictRecord;
use crate::types::ContentKey;

/// Error type for kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DocsError {
    /// Version name not declared in the versions definition.
    #[error("Unknown version: {0}")]
    UnknownVersion(String),
    /// Manual short name not declared in the manuals definition.
    #[error("Unknown manual: {0}")]
    UnknownManual(String),
    /// No content unit backs the requested topic.
    #[error("Unable to resolve topic: {0}")]
    UnresolvableTopic(String),
    /// The same topic appears more than once in a table of contents.
    #[error("Duplicate topic in table of contents: {0}")]
    DuplicateTopicTitle(String),
    /// Another content unit already carries the target version tag.
    #[error("{0}")]
    TagConflict(ConflictRecord),
    /// A content unit already exists under the key that would be created.
    #[error("Content unit already exists: {0}")]
    TopicExists(ContentKey),
    /// Content store failure.
    #[error("Content store error: {0}")]
    ContentStore(String),
    /// Tag index failure.
    #[error("Tag index error: {0}")]
    Index(String),
    /// Malformed or unusable request payload.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DocsError {
    /// Create a content store error from any error type.
    pub fn content_store<E: std::error::Error>(e: E) -> Self {
        Self::ContentStore(e.to_string())
    }

    /// Create a tag index error from any error type.
    pub fn index<E: std::error::Error>(e: E) -> Self {
        Self::Index(e.to_string())
    }

    /// Machine-readable kind, stable across messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownVersion(_) => "UnknownVersion",
            Self::UnknownManual(_) => "UnknownManual",
            Self::UnresolvableTopic(_) => "UnresolvableTopic",
            Self::DuplicateTopicTitle(_) => "DuplicateTopicTitle",
            Self::TagConflict(_) => "TagConflict",
            Self::TopicExists(_) => "TopicExists",
            Self::ContentStore(_) => "ContentStoreError",
            Self::Index(_) => "IndexError",
            Self::InvalidRequest(_) => "InvalidRequest",
        }
    }

    /// Whether a batch may skip the failing item and carry on.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(DocsError::UnknownVersion("9.9".into()).kind(), "UnknownVersion");
        assert_eq!(DocsError::ContentStore("down".into()).kind(), "ContentStoreError");
        assert_eq!(DocsError::Index("down".into()).kind(), "IndexError");
    }

    #[test]
    fn test_invalid_request_is_not_recoverable() {
        assert!(!DocsError::InvalidRequest("bad json".into()).is_recoverable());
        assert!(DocsError::TopicExists(ContentKey::new("Documentation:User:Foo:2.0")).is_recoverable());
    }
}
