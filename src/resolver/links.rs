//! Rewriting of wiki links inside documentation topics.
//!
//! - `[[Documentation:M:T]]` points at the selected version (or `latest` when
//!   the selection is the latest released version), if a unit serves it.
//! - `[[Documentation:M:T:V]]` always points at version `V`.
//! - `[[T]]` inside a topic of manual `M` behaves like `[[Documentation:M:T]]`,
//!   but keeps the explicit version in the link.
//!
//! Anything else is left alone.
//!
//! The same link forms drive stub creation when a topic is saved: a link to a
//! topic nothing serves yet gets a stub unit so the link resolves.

use regex_lite::Regex;
use std::ops::Range;
use std::sync::OnceLock;

use super::{AliasResolver, LATEST};
use crate::error::DocsError;
use crate::store::{WikiStore, WriteMode};
use crate::toc::stub_content;
use crate::types::{topic_slug, version_tag, ContentKey, RequestContext, TopicRef, Version};
use crate::DOC_NAMESPACE;

fn wiki_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[\[([^\]\|#\[]+)(#[^\]\|]*)?(?:\|([^\]]*))?\]\]").expect("wiki link pattern is valid")
    })
}

struct LinkMatch {
    span: Range<usize>,
    target: String,
    anchor: String,
    label: Option<String>,
}

fn find_links(text: &str) -> Vec<LinkMatch> {
    wiki_link()
        .captures_iter(text)
        .filter_map(|caps| {
            Some(LinkMatch {
                span: caps.get(0)?.range(),
                target: caps[1].trim().to_string(),
                anchor: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
                label: caps.get(3).map(|m| m.as_str().trim().to_string()),
            })
        })
        .collect()
}

impl<W: WikiStore> AliasResolver<W> {
    /// Rewrite documentation links in `text` to aliased external links.
    ///
    /// `current` is the unit the text belongs to; bare links only rewrite when
    /// it is a topic unit.
    pub async fn rewrite_links(
        &self,
        ctx: &RequestContext,
        current: Option<&ContentKey>,
        text: &str,
    ) -> Result<String, DocsError> {
        let matches = find_links(text);
        if matches.is_empty() {
            return Ok(text.to_string());
        }

        let current_manual = current.and_then(|k| k.parse_topic()).map(|p| p.topic.manual);
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut rewritten = 0usize;
        for link in &matches {
            out.push_str(&text[cursor..link.span.start]);
            cursor = link.span.end;

            match self.link_href(ctx, current_manual.as_deref(), &link.target).await? {
                Some(href) => {
                    let label = link.label.as_deref().unwrap_or(&link.target);
                    let origin = self.config.server_name.as_deref().unwrap_or("");
                    out.push_str(&format!("[{}{}{} {}]", origin, href, link.anchor, label));
                    rewritten += 1;
                }
                None => out.push_str(&text[link.span.clone()]),
            }
        }
        out.push_str(&text[cursor..]);

        tracing::debug!(found = matches.len(), rewritten, "Rewrote documentation links");
        Ok(out)
    }

    /// Create stub units for documentation links in `text` that nothing
    /// serves yet. Returns the created keys.
    ///
    /// Links without a version use the link version: the caller's selection,
    /// else the latest released version. Stubs are tagged with the version
    /// they were created for and headed with the link label, or the key when
    /// the link has none. `manual` is the manual of the text being saved; bare
    /// links are skipped without it.
    pub async fn ensure_linked_topics_exist(
        &self,
        ctx: &RequestContext,
        manual: Option<&str>,
        text: &str,
    ) -> Result<Vec<ContentKey>, DocsError> {
        let selected = self.link_version(ctx);

        let mut created: Vec<ContentKey> = Vec::new();
        for link in find_links(text) {
            let pieces: Vec<&str> = link.target.split(':').map(str::trim).collect();
            let (topic, version) = match (pieces.as_slice(), manual, &selected) {
                ([ns, m, topic], _, Some(v)) if ns.eq_ignore_ascii_case(DOC_NAMESPACE) => {
                    (TopicRef::new(*m, topic_slug(topic)), v.clone())
                }
                ([ns, m, topic, version], _, _) if ns.eq_ignore_ascii_case(DOC_NAMESPACE) => {
                    match self.registry.get_version_by_name(version) {
                        Some(v) => (TopicRef::new(*m, topic_slug(topic)), v),
                        None => continue,
                    }
                }
                ([topic], Some(m), Some(v)) => (TopicRef::new(m, topic_slug(topic)), v.clone()),
                _ => continue,
            };
            let Some(key) = self.unserved(&topic, &version).await? else {
                continue;
            };
            if created.contains(&key) || self.store.exists(&key).await.map_err(DocsError::content_store)? {
                continue;
            }

            let heading = link.label.as_deref().filter(|l| !l.is_empty()).unwrap_or(key.as_str());
            self.store
                .write(&key, &stub_content(heading), WriteMode::Create)
                .await
                .map_err(DocsError::content_store)?;
            self.store
                .add_tag(&key, &version_tag(&version.name))
                .await
                .map_err(DocsError::index)?;
            tracing::info!(key = %key, version = %version.name, "Created stub for linked topic");
            created.push(key);
        }
        Ok(created)
    }

    /// The key a stub for `topic` would take, when no unit serves `version`.
    async fn unserved(&self, topic: &TopicRef, version: &Version) -> Result<Option<ContentKey>, DocsError> {
        if self.toc.find_topic_unit(topic, &version.name).await?.is_some() {
            return Ok(None);
        }
        Ok(Some(topic.key_for(&version.name)))
    }

    async fn link_href(
        &self,
        ctx: &RequestContext,
        current_manual: Option<&str>,
        target: &str,
    ) -> Result<Option<String>, DocsError> {
        let pieces: Vec<&str> = target.split(':').map(str::trim).collect();
        match pieces.as_slice() {
            [ns, manual, topic] if ns.eq_ignore_ascii_case(DOC_NAMESPACE) => {
                let Some(selected) = self.link_version(ctx) else {
                    return Ok(None);
                };
                let slug = topic_slug(topic);
                let topic_ref = TopicRef::new(*manual, slug.clone());
                if self.toc.find_topic_unit(&topic_ref, &selected.name).await?.is_none() {
                    return Ok(None);
                }
                let segment = if self.registry.latest_released().as_ref() == Some(&selected) {
                    LATEST.to_string()
                } else {
                    selected.name
                };
                Ok(Some(self.config.topic_link(&segment, manual, &slug)))
            }
            [ns, manual, topic, version] if ns.eq_ignore_ascii_case(DOC_NAMESPACE) => {
                Ok(Some(self.config.topic_link(version, manual, &topic_slug(topic))))
            }
            [topic] => {
                let (Some(manual), Some(selected)) = (current_manual, self.link_version(ctx)) else {
                    return Ok(None);
                };
                let slug = topic_slug(topic);
                let topic_ref = TopicRef::new(manual, slug.clone());
                if self.toc.find_topic_unit(&topic_ref, &selected.name).await?.is_none() {
                    return Ok(None);
                }
                Ok(Some(self.config.topic_link(&selected.name, manual, &slug)))
            }
            _ => Ok(None),
        }
    }
}
