//! Mock abbreviation source for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{AbbreviationSource, SourceError};

/// A configurable response for [`MockSource`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Simulate a successful lookup.
    Found(String),
    /// Simulate "not in this source".
    NotFound,
    /// Simulate an ambiguous match.
    Ambiguous { count: usize },
    /// Simulate a service protocol failure.
    Protocol(String),
}

/// A hand-rolled mock implementing [`AbbreviationSource`] for tests.
///
/// Returns the same response for every call and counts calls via
/// [`call_count()`](MockSource::call_count).
pub struct MockSource {
    name: &'static str,
    response: MockResponse,
    call_count: AtomicUsize,
}

impl MockSource {
    pub fn new(name: &'static str, response: MockResponse) -> Self {
        Self {
            name,
            response,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `lookup()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

/// Shared handles work as sources too, so tests can keep one to inspect the
/// call count after handing the resolver its source list.
impl AbbreviationSource for std::sync::Arc<MockSource> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn lookup<'a>(
        &'a self,
        title: &'a str,
        client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<String, SourceError>> + Send + 'a>> {
        self.as_ref().lookup(title, client)
    }
}

impl AbbreviationSource for MockSource {
    fn name(&self) -> &str {
        self.name
    }

    fn lookup<'a>(
        &'a self,
        title: &'a str,
        _client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<String, SourceError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let response = self.response.clone();
        Box::pin(async move {
            match response {
                MockResponse::Found(abbr) => Ok(abbr),
                MockResponse::NotFound => Err(SourceError::NotFound),
                MockResponse::Ambiguous { count } => Err(SourceError::Ambiguous {
                    query: title.to_string(),
                    count,
                }),
                MockResponse::Protocol(msg) => Err(SourceError::Protocol(msg)),
            }
        })
    }
}
