//! # doc-version-kernel
//!
//! Version resolution and branch/inherit propagation for multi-version
//! documentation layered over a wiki content store.
//!
//! The kernel answers two questions:
//!
//! > Given `(manual, version-or-latest, topic)`, which stored page should the reader see?
//!
//! > Given a source and a target version, how do a manual's table of contents and its
//! > topics get carried over to the target?
//!
//! ## Architecture
//!
//! ```text
//!   Documentation:Versions ──► VersionRegistry ──┐
//!   Documentation:Manuals  ──► ManualRegistry  ──┤
//!                                                ├─► AliasResolver ─► Resolution
//!   ContentStore + TagIndex ──► TocModel ◄─ TocCache
//!                                 │              └─► NavCache
//!                                 ▼
//!                         BranchInheritEngine ──► JobTracker (progress)
//! ```
//!
//! ## Content keys
//!
//! - Topic unit: `Documentation:<manual>:<slug>:<version>`
//! - TOC document: `Documentation:<manual>TOC<version>`
//! - Version tag carried in the index: `V:<version>`
//!
//! The version suffix of a key is only the version the unit was created for; which
//! versions a unit serves is decided by its tags alone.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod canonical;
pub mod config;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod nav;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod toc;
pub mod types;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use api::{DocsKernel, ManualInfo, ManualTopics, TopicListing};
pub use config::{CacheConfig, KernelConfig};
pub use engine::{
    BatchLog, BatchReport, BatchRequest, BranchInheritEngine, BranchMode, ConflictRecord,
    ConflictingUnit, LogLevel, ManualRequest, TocAction, TopicAction, TopicOutcome, TopicRequest,
};
pub use error::DocsError;
pub use jobs::{InMemoryProgressStore, JobId, JobProgress, JobTracker, ProgressStore};
pub use nav::{ManualSummary, NavCache};
pub use registry::{ManualRegistry, VersionRegistry};
pub use resolver::{AliasPath, AliasResolver, Resolution, ResolutionMode, LATEST};
pub use store::{
    AccessPolicy, AllowAll, ContentStore, GroupAccessPolicy, InMemoryWiki, TagIndex, TaggedUnit,
    WikiSnapshot, WikiStore, WriteMode,
};
pub use toc::{Toc, TocCache, TocDocument, TocEntry, TocModel, TocOutline};
pub use types::{
    ContentKey, Manual, OrderedMap, RequestContext, TopicRef, User, Version, VersionStatus,
};
pub use canonical::{canonical_hash, canonical_hash_hex};

/// Name of the documentation namespace every managed page lives in.
pub const DOC_NAMESPACE: &str = "Documentation";
