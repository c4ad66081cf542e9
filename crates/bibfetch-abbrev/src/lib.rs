//! Journal-title abbreviation sources and the fallback resolver.
//!
//! Three sources are provided: a built-in static table ([`native`]), the
//! CASSI search service ([`cassi`], scraped), and an LTWA word-rule
//! abbreviator ([`ltwa`]). The [`Resolver`] tries an explicit, ordered list
//! of sources and falls back to the unabbreviated title when all of them
//! decline.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub mod cassi;
pub mod ltwa;
pub mod mock;
pub mod native;
pub mod resolver;

pub use cassi::CassiSource;
pub use ltwa::{AbbreviationRule, LtwaAbbreviator};
pub use native::NativeTable;
pub use resolver::{Resolution, Resolver, normalize_title};

/// Errors a single source can report for one lookup.
///
/// Only [`SourceError::NotFound`] is routine. The other variants indicate a
/// data-quality or service problem worth a warning, but the resolver converts
/// every variant into fallthrough to the next source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source has no entry for this title.
    #[error("no abbreviation found")]
    NotFound,

    /// More than one equally valid match for the same query.
    #[error("found {count} equally valid matches for '{query}'")]
    Ambiguous { query: String, count: usize },

    /// The service's expected request/response protocol broke down, e.g. the
    /// consent token could not be obtained.
    #[error("service protocol error: {0}")]
    Protocol(String),

    /// The response arrived but could not be parsed into a result.
    #[error("could not parse service response: {0}")]
    Parse(String),

    /// The request itself failed.
    #[error("request failed: {0}")]
    Connectivity(#[from] reqwest::Error),

    /// The rule table backing this source could not be loaded at all. The
    /// source stays disabled for the rest of the run.
    #[error("rule table unavailable: {0}")]
    TableUnavailable(String),
}

/// A lookup source that can abbreviate a journal title.
pub trait AbbreviationSource: Send + Sync {
    /// The canonical name of this source (e.g. "native", "CASSI", "LTWA").
    fn name(&self) -> &str;

    /// Look up the abbreviation for `title`.
    ///
    /// Offline sources ignore `client`.
    fn lookup<'a>(
        &'a self,
        title: &'a str,
        client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<String, SourceError>> + Send + 'a>>;
}
