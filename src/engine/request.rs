//! Batch request payload.
//!
//! ```json
//! {
//!   "User": {
//!     "tocAction": "default",
//!     "tocInherit": false,
//!     "sections": {
//!       "Getting Started": [
//!         {"title": "Documentation:User:Install:1.0", "text": "Install", "action": "branch"}
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! Manual and section order is kept. Topic rows with blank text (a client
//! artifact) are dropped while parsing.

use serde::{Deserialize, Serialize};

use crate::error::DocsError;
use crate::types::{ContentKey, OrderedMap, TopicRef};

/// What to do with one topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicAction {
    /// Leave alone.
    #[default]
    Ignore,
    /// Copy to a new unit for the target version.
    Branch,
    /// Branch, detaching the target tag from every other unit first.
    BranchPurge,
    /// Branch, detaching the target tag from the source unit only.
    BranchSplit,
    /// Tag the source unit with the target version.
    Inherit,
    /// Inherit, detaching the target tag from every other unit first.
    InheritPurge,
}

impl TopicAction {
    /// Lowercase action name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Branch => "branch",
            Self::BranchPurge => "branchpurge",
            Self::BranchSplit => "branchsplit",
            Self::Inherit => "inherit",
            Self::InheritPurge => "inheritpurge",
        }
    }
}

/// What to do with a manual's TOC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TocAction {
    /// Create or merge depending on whether the target has a TOC.
    #[default]
    Default,
    /// Tag the source TOC with the target version.
    ForceInherit,
    /// Copy the source TOC to a new unit for the target version.
    ForceBranch,
}

/// One topic row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRequest {
    /// Unit key shown to the client, e.g. `Documentation:User:Install:1.0`.
    #[serde(default)]
    pub title: String,
    /// Display text from the source TOC.
    #[serde(default)]
    pub text: String,
    /// Requested action.
    #[serde(default)]
    pub action: TopicAction,
}

impl TopicRequest {
    /// Create a topic row.
    pub fn new(title: impl Into<String>, text: impl Into<String>, action: TopicAction) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            action,
        }
    }

    /// The topic this row is about.
    ///
    /// Taken from the title when it is a topic key of `manual`, otherwise
    /// derived from the display text.
    pub fn topic_ref(&self, manual: &str) -> TopicRef {
        ContentKey::new(self.title.clone())
            .parse_topic()
            .map(|p| p.topic)
            .filter(|t| t.manual.eq_ignore_ascii_case(manual))
            .unwrap_or_else(|| TopicRef::from_text(manual, &self.text))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManualRequest {
    #[serde(default)]
    toc_action: TocAction,
    #[serde(default)]
    toc_inherit: bool,
    #[serde(default)]
    sections: OrderedMap<Vec<Option<TopicRequest>>>,
}

/// Requested work for one manual.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualRequest {
    /// TOC handling.
    pub toc_action: TocAction,
    /// With the default TOC action and a target lacking a TOC, tag the source
    /// TOC instead of creating a new one.
    pub toc_inherit: bool,
    /// Topic rows by section.
    pub sections: OrderedMap<Vec<TopicRequest>>,
}

impl ManualRequest {
    /// Topic rows across all sections.
    pub fn topics(&self) -> impl Iterator<Item = (&str, &TopicRequest)> {
        self.sections
            .iter()
            .flat_map(|(section, topics)| topics.iter().map(move |t| (section, t)))
    }

    /// Topic texts per section, optionally skipping ignored rows.
    pub fn section_texts(&self, include_ignored: bool) -> OrderedMap<Vec<String>> {
        self.sections
            .iter()
            .map(|(section, topics)| {
                let texts = topics
                    .iter()
                    .filter(|t| include_ignored || t.action != TopicAction::Ignore)
                    .map(|t| t.text.clone())
                    .collect();
                (section.to_string(), texts)
            })
            .collect()
    }
}

impl From<RawManualRequest> for ManualRequest {
    fn from(raw: RawManualRequest) -> Self {
        let sections = raw
            .sections
            .into_iter()
            .map(|(section, rows)| {
                let topics = rows
                    .into_iter()
                    .flatten()
                    .filter(|t| !t.text.trim().is_empty())
                    .collect();
                (section, topics)
            })
            .collect();
        Self {
            toc_action: raw.toc_action,
            toc_inherit: raw.toc_inherit,
            sections,
        }
    }
}

/// A whole batch: manual name to its requested work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchRequest {
    /// Manuals in request order.
    pub manuals: OrderedMap<ManualRequest>,
}

impl BatchRequest {
    /// Parse the JSON payload.
    pub fn from_json(json: &str) -> Result<Self, DocsError> {
        let raw: OrderedMap<RawManualRequest> =
            serde_json::from_str(json).map_err(|e| DocsError::InvalidRequest(e.to_string()))?;
        Ok(Self {
            manuals: raw
                .into_iter()
                .map(|(manual, req)| (manual, ManualRequest::from(req)))
                .collect(),
        })
    }

    /// Number of topic rows, including ignored ones.
    pub fn topic_count(&self) -> usize {
        self.manuals.values().map(|m| m.topics().count()).sum()
    }
}
