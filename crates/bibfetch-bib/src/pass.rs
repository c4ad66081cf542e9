//! The per-entry bibliography pass: filter, repair, abbreviate, re-case.

use std::collections::HashSet;

use bibfetch_abbrev::{Resolver, SourceError};

use crate::braces::fix_braces;
use crate::parser::Entry;
use crate::titlecase::titlecase;

/// Options for [`abbreviate_bibliography`].
#[derive(Debug, Clone, Default)]
pub struct PassOptions {
    /// Re-case `title` and `booktitle` fields.
    pub fix_titlecase: bool,
}

/// Run the abbreviation pass over a bibliography.
///
/// Entries absent from `citation_filter` (when provided) are dropped from the
/// output entirely. Every surviving entry gets its brace artifacts repaired,
/// its `journal` field replaced by the resolver's answer, and, with
/// [`PassOptions::fix_titlecase`], its title fields re-cased. Entries are
/// processed strictly in order, one resolver call at a time; `progress` is
/// invoked after each emitted entry.
///
/// The only error that can surface is an ambiguous match from a resolver
/// configured with `fail_on_ambiguous`.
pub async fn abbreviate_bibliography(
    entries: Vec<Entry>,
    citation_filter: Option<&HashSet<String>>,
    resolver: &Resolver,
    client: &reqwest::Client,
    options: &PassOptions,
    mut progress: impl FnMut(&Entry),
) -> Result<Vec<Entry>, SourceError> {
    let mut out = Vec::with_capacity(entries.len());

    for mut entry in entries {
        if let Some(filter) = citation_filter {
            if !filter.contains(&entry.key) {
                tracing::debug!(key = %entry.key, "entry not cited, dropping");
                continue;
            }
        }

        for (_, value) in entry.fields.iter_mut() {
            *value = fix_braces(value);
        }

        if let Some(journal) = entry.get("journal").map(str::to_string) {
            let resolution = resolver.resolve(&journal, client).await?;
            entry.set("journal", resolution.abbreviation);
        }

        if options.fix_titlecase {
            for field in ["title", "booktitle"] {
                if let Some(value) = entry.get(field).map(str::to_string) {
                    entry.set(field, titlecase(&value));
                }
            }
        }

        progress(&entry);
        out.push(entry);
    }

    Ok(out)
}
