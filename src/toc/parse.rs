//! TOC document markup.
//!
//! A TOC document is line-oriented:
//!
//! ```text
//! Getting Started
//! * {{#topic:Introduction}}
//! * {{#topic:Installing the Server}}
//! Reference
//! * {{#topic:Configuration}}
//! [[Category:V:2.0]]
//! ```
//!
//! Plain non-blank lines open a section; `{{#topic:...}}` lines are topics in
//! the current section. Anything else is kept verbatim so edits round-trip.

use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::error::DocsError;
use crate::types::{topic_slug, OrderedMap};

fn topic_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*\*?\s*\{\{\s*#topic\s*:\s*(.*?)\s*\}\}\s*$")
            .expect("topic line pattern is valid")
    })
}

/// One line of a TOC document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocLine {
    /// Section header.
    Section(String),
    /// Topic entry with its display text.
    Topic(String),
    /// Blank, category, comment or other markup, kept as written.
    Other(String),
}

impl TocLine {
    fn classify(raw: &str) -> Self {
        if let Some(caps) = topic_line().captures(raw) {
            return Self::Topic(caps[1].to_string());
        }
        let trimmed = raw.trim();
        let passthrough = trimmed.is_empty()
            || trimmed.starts_with('*')
            || trimmed.starts_with("[[")
            || trimmed.starts_with("{{")
            || trimmed.starts_with("<!--")
            || trimmed.starts_with("__");
        if passthrough {
            Self::Other(raw.to_string())
        } else {
            Self::Section(trimmed.to_string())
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Section(name) => name.clone(),
            Self::Topic(text) => format!("* {{{{#topic:{}}}}}", text),
            Self::Other(raw) => raw.clone(),
        }
    }
}

/// A TOC document as an editable list of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocDocument {
    lines: Vec<TocLine>,
}

impl TocDocument {
    /// Parse document text.
    pub fn parse(raw: &str) -> Self {
        Self {
            lines: raw.lines().map(TocLine::classify).collect(),
        }
    }

    /// Build a fresh document from `section -> topic texts`.
    pub fn from_sections(sections: &OrderedMap<Vec<String>>) -> Self {
        let mut doc = Self::default();
        for (section, texts) in sections.iter() {
            if !section.trim().is_empty() {
                doc.lines.push(TocLine::Section(section.trim().to_string()));
            }
            doc.lines
                .extend(texts.iter().map(|t| TocLine::Topic(t.trim().to_string())));
        }
        doc
    }

    /// Lines of the document.
    pub fn lines(&self) -> &[TocLine] {
        &self.lines
    }

    /// Render back to document text.
    pub fn render(&self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(TocLine::render)
            .collect::<Vec<_>>()
            .join("\n");
        out.push('\n');
        out
    }

    /// Structured view of sections and topics.
    pub fn outline(&self) -> TocOutline {
        let mut items = Vec::new();
        let mut section: Option<String> = None;
        for line in &self.lines {
            match line {
                TocLine::Section(name) => {
                    section = Some(name.clone());
                    items.push(OutlineItem::Section(name.clone()));
                }
                TocLine::Topic(text) => {
                    let slug = topic_slug(text);
                    // A topic whose text legalizes to nothing cannot be addressed.
                    if slug.is_empty() {
                        continue;
                    }
                    items.push(OutlineItem::Topic(OutlineTopic {
                        section: section.clone(),
                        text: text.clone(),
                        slug,
                    }));
                }
                TocLine::Other(_) => {}
            }
        }
        TocOutline { items }
    }

    /// Merge topics into their sections.
    ///
    /// Topics already present anywhere in the document (same slug, ignoring
    /// case) are skipped. A known section receives new topics after its last
    /// topic; an unknown section is appended with its topics. Returns the number
    /// of topics added.
    pub fn add_collection(&mut self, sections: &OrderedMap<Vec<String>>) -> usize {
        let mut present: HashSet<String> = self
            .lines
            .iter()
            .filter_map(|l| match l {
                TocLine::Topic(text) => Some(topic_slug(text).to_lowercase()),
                _ => None,
            })
            .collect();

        let mut added = 0;
        for (section, texts) in sections.iter() {
            let fresh: Vec<TocLine> = texts
                .iter()
                .map(|t| t.trim())
                .filter(|t| {
                    let slug = topic_slug(t).to_lowercase();
                    !slug.is_empty() && present.insert(slug)
                })
                .map(|t| TocLine::Topic(t.to_string()))
                .collect();
            if fresh.is_empty() {
                continue;
            }
            added += fresh.len();

            match self.section_insert_point(section.trim()) {
                Some(at) => {
                    self.lines.splice(at..at, fresh);
                }
                None => {
                    if !section.trim().is_empty() {
                        self.lines.push(TocLine::Section(section.trim().to_string()));
                    }
                    self.lines.extend(fresh);
                }
            }
        }
        added
    }

    fn section_insert_point(&self, section: &str) -> Option<usize> {
        let start = self
            .lines
            .iter()
            .position(|l| matches!(l, TocLine::Section(name) if name == section))?;
        let mut at = start + 1;
        for (idx, line) in self.lines.iter().enumerate().skip(start + 1) {
            match line {
                TocLine::Section(_) => break,
                TocLine::Topic(_) => at = idx + 1,
                TocLine::Other(_) => {}
            }
        }
        Some(at)
    }
}

/// A topic in an outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineTopic {
    /// Enclosing section, if any.
    pub section: Option<String>,
    /// Display text.
    pub text: String,
    /// Slug derived from the text.
    pub slug: String,
}

/// One outline item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineItem {
    /// Section header.
    Section(String),
    /// Topic.
    Topic(OutlineTopic),
}

/// Sections and topics of a TOC, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocOutline {
    items: Vec<OutlineItem>,
}

impl TocOutline {
    /// Lenient parse: duplicate topics are kept.
    pub fn parse(raw: &str) -> Self {
        TocDocument::parse(raw).outline()
    }

    /// Strict parse: rejects a document naming the same topic twice.
    pub fn parse_validated(raw: &str) -> Result<Self, DocsError> {
        let outline = Self::parse(raw);
        let dupes = outline.duplicates();
        if dupes.is_empty() {
            Ok(outline)
        } else {
            Err(DocsError::DuplicateTopicTitle(dupes.join(", ")))
        }
    }

    /// Outline items.
    pub fn items(&self) -> &[OutlineItem] {
        &self.items
    }

    /// Topics only.
    pub fn topics(&self) -> impl Iterator<Item = &OutlineTopic> {
        self.items.iter().filter_map(|i| match i {
            OutlineItem::Topic(t) => Some(t),
            OutlineItem::Section(_) => None,
        })
    }

    /// Display texts of topics whose slug repeats an earlier one.
    pub fn duplicates(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.topics()
            .filter(|t| !seen.insert(t.slug.to_lowercase()))
            .map(|t| t.text.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "Getting Started\n\
                       * {{#topic:Introduction}}\n\
                       * {{#topic:Installing the Server}}\n\
                       \n\
                       Reference\n\
                       * {{#topic:Configuration}}\n\
                       [[Category:V:2.0]]";

    fn sections(pairs: &[(&str, &[&str])]) -> OrderedMap<Vec<String>> {
        pairs
            .iter()
            .map(|(s, ts)| (s.to_string(), ts.iter().map(|t| t.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_outline() {
        let outline = TocOutline::parse(RAW);
        let slugs: Vec<_> = outline.topics().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["Introduction", "InstallingtheServer", "Configuration"]);
        assert_eq!(outline.items().len(), 5);

        let config = outline.topics().last().unwrap();
        assert_eq!(config.section.as_deref(), Some("Reference"));
    }

    #[test]
    fn test_render_preserves_passthrough_lines() {
        let doc = TocDocument::parse(RAW);
        let rendered = doc.render();
        assert!(rendered.contains("[[Category:V:2.0]]"));
        assert_eq!(TocDocument::parse(&rendered), doc);
    }

    #[test]
    fn test_duplicate_topics_rejected() {
        let raw = "Start\n* {{#topic:Install}}\nMore\n* {{#topic:install}}";
        assert!(TocOutline::parse(raw).duplicates().len() == 1);
        assert!(matches!(
            TocOutline::parse_validated(raw),
            Err(DocsError::DuplicateTopicTitle(t)) if t == "install"
        ));
        assert!(TocOutline::parse_validated(RAW).is_ok());
    }

    #[test]
    fn test_add_collection_merges_into_sections() {
        let mut doc = TocDocument::parse(RAW);
        let added = doc.add_collection(&sections(&[
            ("Getting Started", &["Introduction", "Upgrading"]),
            ("Appendix", &["Glossary"]),
        ]));
        assert_eq!(added, 2);

        let outline = doc.outline();
        let slugs: Vec<_> = outline.topics().map(|t| t.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec!["Introduction", "InstallingtheServer", "Upgrading", "Configuration", "Glossary"]
        );
        let glossary = outline.topics().last().unwrap();
        assert_eq!(glossary.section.as_deref(), Some("Appendix"));
    }

    #[test]
    fn test_from_sections() {
        let doc = TocDocument::from_sections(&sections(&[("Intro", &["Welcome", "Setup"])]));
        assert_eq!(doc.render(), "Intro\n* {{#topic:Welcome}}\n* {{#topic:Setup}}\n");
    }
}
