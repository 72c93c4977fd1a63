//! Manual registry, read from `{{#manual:short|Long Name}}` lines.

use parking_lot::RwLock;
use regex_lite::Regex;
use std::sync::{Arc, OnceLock};

use crate::error::DocsError;
use crate::store::ContentStore;
use crate::types::{ContentKey, Manual, MANUALS_PAGE};

fn manual_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\{\{\s*#manual\s*:\s*([^|}]+?)\s*\|\s*([^}]*?)\s*\}\}")
            .expect("manual declaration pattern is valid")
    })
}

/// Parse manual declarations. A blank long name falls back to the short name.
pub fn parse_manual_definitions(text: &str) -> Vec<Manual> {
    let mut manuals: Vec<Manual> = Vec::new();
    for caps in manual_line().captures_iter(text) {
        let short = caps[1].to_string();
        if short.contains(':') || short.contains('/') {
            tracing::warn!(manual = %short, "Skipping manual with separator in its name");
            continue;
        }
        if manuals.iter().any(|m| m.short_name.eq_ignore_ascii_case(&short)) {
            continue;
        }
        let long = match caps[2].trim() {
            "" => short.clone(),
            long => long.to_string(),
        };
        manuals.push(Manual::new(short, long));
    }
    manuals
}

/// Registry of declared manuals, in declaration order.
#[derive(Debug, Default)]
pub struct ManualRegistry {
    manuals: RwLock<Arc<Vec<Manual>>>,
}

impl ManualRegistry {
    /// Build from definition text.
    pub fn from_definition(text: &str) -> Self {
        Self::from_manuals(parse_manual_definitions(text))
    }

    /// Build from a list.
    pub fn from_manuals(manuals: Vec<Manual>) -> Self {
        Self {
            manuals: RwLock::new(Arc::new(manuals)),
        }
    }

    /// Load from the manuals page of a content store.
    pub async fn load<S: ContentStore>(store: &S) -> Result<Self, DocsError> {
        let registry = Self::default();
        registry.reload(store).await?;
        Ok(registry)
    }

    /// Re-read the manuals page.
    pub async fn reload<S: ContentStore>(&self, store: &S) -> Result<(), DocsError> {
        let text = store
            .read(&ContentKey::new(MANUALS_PAGE))
            .await
            .map_err(DocsError::content_store)?
            .unwrap_or_default();
        *self.manuals.write() = Arc::new(parse_manual_definitions(&text));
        Ok(())
    }

    /// Every declared manual.
    pub fn manuals(&self) -> Vec<Manual> {
        self.manuals.read().as_ref().clone()
    }

    /// Look up a manual by short name, ignoring ASCII case.
    pub fn get(&self, short_name: &str) -> Option<Manual> {
        self.manuals
            .read()
            .iter()
            .find(|m| m.short_name.eq_ignore_ascii_case(short_name))
            .cloned()
    }

    /// Look up a manual, failing with `UnknownManual`.
    pub fn require(&self, short_name: &str) -> Result<Manual, DocsError> {
        self.get(short_name)
            .ok_or_else(|| DocsError::UnknownManual(short_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manuals() {
        let manuals = parse_manual_definitions(
            "{{#manual:User|User Manual}}\n{{#manual:Admin|}}\n{{#manual:user|Dup}}\n{{#manual:a/b|Bad}}",
        );
        assert_eq!(
            manuals,
            vec![Manual::new("User", "User Manual"), Manual::new("Admin", "Admin")]
        );
    }

    #[test]
    fn test_lookup_ignores_case() {
        let reg = ManualRegistry::from_definition("{{#manual:User|User Manual}}");
        assert_eq!(reg.get("user").unwrap().short_name, "User");
        assert!(matches!(reg.require("Dev"), Err(DocsError::UnknownManual(_))));
    }
}
