//! Scraped CASSI journal abbreviation lookups.
//!
//! CASSI has no API; lookups go through the server-rendered search pages.
//! The protocol is two-step: fetch the consent page (carrying the acceptance
//! cookie) to obtain a hidden validation token, then POST the actual search.
//! The response is either a single-journal page or a results table that needs
//! disambiguation by exact title match.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node};

use crate::{AbbreviationSource, SourceError};

/// Production service root.
pub const CASSI_BASE_URL: &str = "https://cassi.cas.org";

/// Present when the server refuses the cookie-only consent path.
const JS_WALL_MARKER: &str = "You have to enable JavaScript";

/// Present when the response is a results table rather than a single hit.
const MULTI_RESULT_MARKER: &str = "Results of Search for";

/// Inline search-term highlighting wrapped around result text.
static HIGHLIGHT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<span style="background-color:#7FFFD4">([^<]*)</span>"#).unwrap()
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Hidden terms-of-service validation token on the consent page.
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<input type="hidden" name="c" value="([^"]+)""#).unwrap());

/// Abbreviated-title row of a single-journal page.
static SINGLE_HIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<tr><td class="name">Abbreviated Title</td><td class="value">(?:<span [^>]+>)?([-_:A-Za-z0-9. ]+)(?:</span>)?</td></tr>"#,
    )
    .unwrap()
});

/// Result-row cells carry an id like `ABCDEF_TVALUE` holding the CODEN.
static CODEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z]+)_TVALUE").unwrap());

/// One row parsed out of a results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CassiRecord {
    pub title: String,
    pub abbreviation: String,
    pub coden: Option<String>,
}

/// Scraped-service abbreviation source.
///
/// Lookups are memoized per normalized title so a batch never repeats the
/// two-request round trip for the same journal.
pub struct CassiSource {
    base_url: String,
    cache: Mutex<HashMap<String, String>>,
}

impl Default for CassiSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CassiSource {
    pub fn new() -> Self {
        Self::with_base_url(CASSI_BASE_URL)
    }

    /// Point the source at a different service root (tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn search(&self, title: &str, client: &reqwest::Client) -> Result<String, SourceError> {
        // Step 1: accept the terms of service and pick up the validation token.
        let consent = client
            .get(format!("{}/search.jsp", self.base_url))
            .header(reqwest::header::COOKIE, "UserAccepted=YES")
            .send()
            .await?
            .text()
            .await?;
        let token = extract_token(&consent)?;

        // Step 2: run the search. Exact match misfires on ampersands, so
        // those titles use the relaxed search.
        let mut form = vec![
            ("searchIn", "titles".to_string()),
            ("searchFor", title.to_string()),
            ("c", token),
        ];
        if !title.contains('&') {
            form.push(("exactMatch", "on".to_string()));
        }
        let body = client
            .post(format!("{}/searching.jsp", self.base_url))
            .form(&form)
            .send()
            .await?
            .text()
            .await?;

        // Strip the result highlighting and collapse whitespace before any
        // pattern matching.
        let body = HIGHLIGHT_RE.replace_all(&body, "$1");
        let body = WHITESPACE_RE.replace_all(&body, " ");

        if body.contains(MULTI_RESULT_MARKER) {
            disambiguate(&parse_result_table(&body), title)
        } else {
            parse_single_result(&body, title)
        }
    }
}

/// Extract the hidden validation token from the consent page.
fn extract_token(consent_page: &str) -> Result<String, SourceError> {
    if consent_page.contains(JS_WALL_MARKER) {
        return Err(SourceError::Protocol(
            "consent page requires client-side scripting".into(),
        ));
    }
    TOKEN_RE
        .captures(consent_page)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| SourceError::Protocol("validation token not found in consent page".into()))
}

/// Extract the abbreviation from a single-journal page.
fn parse_single_result(body: &str, title: &str) -> Result<String, SourceError> {
    SINGLE_HIT_RE
        .captures(body)
        .map(|caps| caps[1].trim().to_string())
        .ok_or_else(|| SourceError::Parse(format!("no abbreviated title found for '{title}'")))
}

/// States of the results-table scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Idle,
    InTitle,
    InAbbreviation,
}

/// Scan a results table into records.
///
/// A flat state machine over the document's nodes in order: a link to
/// `publication.jsp` opens a title cell, a `valueAbbr` cell holds the
/// abbreviation, and an id matching `*_TVALUE` carries the row's CODEN. The
/// first abbreviation text completes a record and returns to `Idle`; a row
/// boundary also resets the scan.
fn parse_result_table(html: &str) -> Vec<CassiRecord> {
    let document = Html::parse_document(html);
    let mut state = ScanState::Idle;
    let mut title = String::new();
    let mut coden: Option<String> = None;
    let mut records = Vec::new();

    for node in document.root_element().descendants() {
        match node.value() {
            Node::Element(el) => {
                let tag = el.name();
                if tag == "tr" {
                    state = ScanState::Idle;
                    continue;
                }
                if let Some(caps) = el.attr("id").and_then(|id| CODEN_RE.captures(id)) {
                    coden = Some(caps[1].to_string());
                    state = ScanState::Idle;
                } else if tag == "a"
                    && el.attr("href").is_some_and(|h| h.contains("publication.jsp"))
                {
                    title.clear();
                    state = ScanState::InTitle;
                } else if tag == "td" && el.attr("class") == Some("valueAbbr") {
                    state = ScanState::InAbbreviation;
                }
            }
            Node::Text(text) => {
                let data = text.trim();
                if data.is_empty() {
                    continue;
                }
                match state {
                    ScanState::InTitle => title.push_str(data),
                    ScanState::InAbbreviation => {
                        records.push(CassiRecord {
                            title: std::mem::take(&mut title),
                            abbreviation: data.to_string(),
                            coden: coden.take(),
                        });
                        state = ScanState::Idle;
                    }
                    ScanState::Idle => {}
                }
            }
            _ => {}
        }
    }
    records
}

/// Pick the single record whose title matches the query exactly
/// (case-insensitively).
fn disambiguate(records: &[CassiRecord], title: &str) -> Result<String, SourceError> {
    let matched: Vec<&CassiRecord> = records
        .iter()
        .filter(|r| r.title.eq_ignore_ascii_case(title))
        .collect();
    match matched.len() {
        0 => Err(SourceError::NotFound),
        1 => Ok(matched[0].abbreviation.clone()),
        count => Err(SourceError::Ambiguous {
            query: title.to_string(),
            count,
        }),
    }
}

impl AbbreviationSource for CassiSource {
    fn name(&self) -> &str {
        "CASSI"
    }

    fn lookup<'a>(
        &'a self,
        title: &'a str,
        client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<String, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let key = title.to_lowercase();
            if let Some(hit) = self.cache.lock().unwrap().get(&key) {
                return Ok(hit.clone());
            }
            let abbr = self.search(title, client).await?;
            self.cache.lock().unwrap().insert(key, abbr.clone());
            Ok(abbr)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONSENT_PAGE: &str = concat!(
        r#"<html><body><form action="searching.jsp" method="post">"#,
        r#"<input type="hidden" name="c" value="WIy460-R_DY">"#,
        r#"<input type="submit" value="Search"></form></body></html>"#,
    );

    fn result_row(title: &str, abbr: &str, coden: &str) -> String {
        format!(
            concat!(
                r#"<tr><td id="{coden}_TVALUE"><span>{coden}</span></td>"#,
                r#"<td><a href="publication.jsp?id=1">{title}</a></td>"#,
                r#"<td class="valueAbbr">{abbr}</td></tr>"#,
            ),
            coden = coden,
            title = title,
            abbr = abbr,
        )
    }

    fn results_page(rows: &[String]) -> String {
        format!(
            "<html><body><p>Results of Search for title</p><table>{}</table></body></html>",
            rows.join("")
        )
    }

    #[test]
    fn extracts_validation_token() {
        assert_eq!(extract_token(CONSENT_PAGE).unwrap(), "WIy460-R_DY");
    }

    #[test]
    fn scripting_wall_is_a_protocol_error() {
        let err = extract_token("<p>You have to enable JavaScript to use this site.</p>")
            .unwrap_err();
        assert!(matches!(err, SourceError::Protocol(_)));
    }

    #[test]
    fn missing_token_is_a_protocol_error() {
        let err = extract_token("<html><body>no token here</body></html>").unwrap_err();
        assert!(matches!(err, SourceError::Protocol(_)));
    }

    #[test]
    fn parses_single_result_page() {
        let body = concat!(
            r#"<table><tr><td class="name">Title</td><td class="value">Journal of Physical Chemistry C</td></tr>"#,
            r#"<tr><td class="name">Abbreviated Title</td><td class="value">J. Phys. Chem. C</td></tr></table>"#,
        );
        assert_eq!(
            parse_single_result(body, "Journal of Physical Chemistry C").unwrap(),
            "J. Phys. Chem. C"
        );
    }

    #[test]
    fn single_result_without_field_is_a_parse_error() {
        let err = parse_single_result("<html><body>nothing</body></html>", "X").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn scans_result_table_rows() {
        let page = results_page(&[
            result_row("Applied Radiation", "Appl. Radiat.", "ABCDE"),
            result_row("Applied Radiation and Isotopes", "Appl. Radiat. Isot.", "FGHIJ"),
        ]);
        let records = parse_result_table(&page);
        assert_eq!(
            records,
            vec![
                CassiRecord {
                    title: "Applied Radiation".into(),
                    abbreviation: "Appl. Radiat.".into(),
                    coden: Some("ABCDE".into()),
                },
                CassiRecord {
                    title: "Applied Radiation and Isotopes".into(),
                    abbreviation: "Appl. Radiat. Isot.".into(),
                    coden: Some("FGHIJ".into()),
                },
            ]
        );
    }

    #[test]
    fn disambiguation_requires_exact_title() {
        let records = vec![
            CassiRecord {
                title: "Applied Radiation".into(),
                abbreviation: "Appl. Radiat.".into(),
                coden: None,
            },
            CassiRecord {
                title: "Applied Radiation and Isotopes".into(),
                abbreviation: "Appl. Radiat. Isot.".into(),
                coden: None,
            },
        ];
        assert_eq!(
            disambiguate(&records, "APPLIED RADIATION AND ISOTOPES").unwrap(),
            "Appl. Radiat. Isot."
        );
        assert!(matches!(
            disambiguate(&records, "Unlisted Journal").unwrap_err(),
            SourceError::NotFound
        ));
    }

    #[test]
    fn duplicate_titles_are_ambiguous() {
        let records = vec![
            CassiRecord {
                title: "Science in China".into(),
                abbreviation: "Sci. China A".into(),
                coden: None,
            },
            CassiRecord {
                title: "Science in China".into(),
                abbreviation: "Sci. China B".into(),
                coden: None,
            },
        ];
        let err = disambiguate(&records, "Science in China").unwrap_err();
        assert!(matches!(err, SourceError::Ambiguous { count: 2, .. }));
    }

    #[test]
    fn highlight_markup_is_stripped_before_matching() {
        let highlighted = concat!(
            r#"<td class="value"><span style="background-color:#7FFFD4">J. Phys.</span> Chem. C</td>"#,
        );
        let stripped = HIGHLIGHT_RE.replace_all(highlighted, "$1");
        assert_eq!(stripped, r#"<td class="value">J. Phys. Chem. C</td>"#);
    }
}
