//! Ordered fallthrough across abbreviation sources.

use crate::{AbbreviationSource, SourceError};

/// The outcome of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The abbreviated title, or the normalized input when no source matched.
    pub abbreviation: String,
    /// Name of the source that answered; `None` when every source declined.
    pub source: Option<String>,
}

/// Normalize a journal title for lookup: trim, undo BibTeX escape artifacts,
/// drop braces, and strip a leading "The" article.
pub fn normalize_title(title: &str) -> String {
    let mut t = title.trim().to_string();
    t = t
        .replace("\\&", "&")
        .replace("\\ ", " ")
        .replace('\n', " ");
    t.retain(|c| c != '{' && c != '}');
    let t = t.trim();
    // Whole-word prefix only, so "Theme Park Engineering" survives intact.
    match t.get(..4) {
        Some(prefix) if t.len() > 4 && prefix.eq_ignore_ascii_case("the ") => {
            t[4..].trim_start().to_string()
        }
        _ => t.to_string(),
    }
}

/// Tries each enabled source in caller-specified order and falls back to the
/// unabbreviated title.
///
/// The source list is always explicit input; the resolver itself holds no
/// enable/disable state.
pub struct Resolver {
    sources: Vec<Box<dyn AbbreviationSource>>,
    fail_on_ambiguous: bool,
}

impl Resolver {
    pub fn new(sources: Vec<Box<dyn AbbreviationSource>>) -> Self {
        Self {
            sources,
            fail_on_ambiguous: false,
        }
    }

    /// Propagate ambiguous matches instead of falling through (off by
    /// default).
    pub fn fail_on_ambiguous(mut self, strict: bool) -> Self {
        self.fail_on_ambiguous = strict;
        self
    }

    /// Names of the enabled sources, in lookup order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolve a journal title to its abbreviation.
    ///
    /// A source's `NotFound` falls through silently; any other source error
    /// is logged and falls through. When every source declines, the
    /// normalized title itself is returned with no source recorded. The only
    /// error this can return is an ambiguous match under
    /// [`fail_on_ambiguous`](Self::fail_on_ambiguous).
    pub async fn resolve(
        &self,
        title: &str,
        client: &reqwest::Client,
    ) -> Result<Resolution, SourceError> {
        let normalized = normalize_title(title);
        for source in &self.sources {
            match source.lookup(&normalized, client).await {
                Ok(abbreviation) => {
                    tracing::debug!(
                        source = source.name(),
                        journal = %normalized,
                        abbreviation = %abbreviation,
                        "abbreviated journal"
                    );
                    return Ok(Resolution {
                        abbreviation,
                        source: Some(source.name().to_string()),
                    });
                }
                Err(SourceError::NotFound) => continue,
                Err(err @ SourceError::Ambiguous { .. }) if self.fail_on_ambiguous => {
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        source = source.name(),
                        journal = %normalized,
                        error = %err,
                        "abbreviation source failed, trying next"
                    );
                }
            }
        }
        tracing::warn!(journal = %normalized, "could not abbreviate journal");
        Ok(Resolution {
            abbreviation: normalized,
            source: None,
        })
    }
}
