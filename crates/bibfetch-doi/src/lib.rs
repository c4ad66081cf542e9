//! DOI resolution and article retrieval.
//!
//! An [`Article`] wraps one DOI and lazily retrieves its BibTeX metadata from
//! the doi.org content-negotiation endpoint. Publisher-specific PDF download
//! rules live in [`publishers`]; the end-to-end add-to-bibliography flow in
//! [`fetch`].

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub mod article;
pub mod fetch;
pub mod publishers;

pub use article::{Article, ArticleMetadata, Author};
pub use fetch::{FetchError, FetchOptions, existing_keys, fetch_doi};

#[derive(Error, Debug)]
pub enum DoiError {
    #[error("not a valid DOI: '{0}'")]
    Invalid(String),
    #[error("DOI not found: {0}")]
    NotFound(String),
    #[error("unexpected handle-server response: {0}")]
    Handle(String),
    #[error("could not retrieve metadata: {0}")]
    Metadata(String),
    #[error("journal abbreviation failed: {0}")]
    Abbreviation(#[from] bibfetch_abbrev::SourceError),
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("no PDF available for {doi}")]
    NotFound { doi: String },
    #[error("no download rule for publisher '{0}'")]
    UnknownPublisher(String),
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

static DOI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b10\.\d{4,9}/\S+").unwrap());

/// Extract a DOI from user input: either a bare identifier or a
/// `doi.org`-style URL carrying one.
pub fn parse_doi(input: &str) -> Result<String, DoiError> {
    DOI_RE
        .find(input.trim())
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| DoiError::Invalid(input.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_dois() {
        assert_eq!(
            parse_doi("10.1021/acs.chemmater.6b05114").unwrap(),
            "10.1021/acs.chemmater.6b05114"
        );
        assert_eq!(
            parse_doi("10.1021/acs.chemmater:6b05114").unwrap(),
            "10.1021/acs.chemmater:6b05114"
        );
    }

    #[test]
    fn extracts_doi_from_urls() {
        assert_eq!(
            parse_doi("https://dx.doi.org/10.1021/acs.chemmater.6b05114").unwrap(),
            "10.1021/acs.chemmater.6b05114"
        );
        assert_eq!(
            parse_doi("https://doi.org/10.1149/2.0011514jes").unwrap(),
            "10.1149/2.0011514jes"
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse_doi("hello"), Err(DoiError::Invalid(_))));
        assert!(matches!(parse_doi("gibberish doi"), Err(DoiError::Invalid(_))));
    }
}
