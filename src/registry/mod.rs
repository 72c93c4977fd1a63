//! Declared versions and manuals.
//!
//! Both registries are read from definition pages in the content store and
//! can be reloaded in place. Readers always see a complete catalog: a reload
//! swaps the whole catalog at once.

pub mod manuals;
pub mod versions;

pub use manuals::{parse_manual_definitions, ManualRegistry};
pub use versions::{parse_version_definitions, VersionRegistry};
