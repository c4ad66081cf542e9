//! Word-rule journal abbreviation (List of Title Word Abbreviations).
//!
//! The rule table maps words or wildcard word-stems to standard
//! abbreviations, e.g. `chemistr-` → `chem.`. Titles are abbreviated word by
//! word: exact rules first, then wildcard rules with captured-stem
//! substitution, keeping any word no rule covers.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;

use regex::Regex;

use crate::{AbbreviationSource, SourceError};

/// Where the tab-separated LTWA rule table is published.
pub const DEFAULT_LTWA_URL: &str =
    "https://www.issn.org/wp-content/uploads/2021/07/ltwa_20210702.txt";

/// Wildcard marker used by both rule patterns and abbreviations.
const WILDCARD: char = '-';

/// Sentinel abbreviation meaning "this word is never abbreviated".
const NO_ABBREVIATION: &str = "n.a.";

/// Words dropped from abbreviated titles entirely.
const STOP_WORDS: [&str; 5] = ["of", "the", "a", "&", "and"];

/// One row of the rule table.
///
/// A pattern holds at most one wildcard segment. When the abbreviation also
/// carries a wildcard, the text captured by the pattern is substituted there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbbreviationRule {
    pub pattern: String,
    pub abbreviation: String,
    pub languages: Vec<String>,
}

impl AbbreviationRule {
    pub fn new(pattern: &str, abbreviation: &str, languages: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            abbreviation: abbreviation.to_string(),
            languages: languages
                .split(',')
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug)]
struct CompiledRule {
    rule: AbbreviationRule,
    /// Anchored, case-insensitive, wildcard as a capture group, one optional
    /// trailing plural "s" allowed.
    matcher: Regex,
}

/// Word-rule abbreviator over a loaded rule table.
///
/// Abbreviated titles are memoized per distinct input title.
#[derive(Debug)]
pub struct LtwaAbbreviator {
    rules: Vec<CompiledRule>,
    cache: Mutex<HashMap<String, String>>,
}

impl LtwaAbbreviator {
    /// Build an abbreviator from already-parsed rules.
    pub fn from_rules(rules: Vec<AbbreviationRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter_map(|rule| {
                let matcher = compile_pattern(&rule.pattern)?;
                Some(CompiledRule { rule, matcher })
            })
            .collect();
        Self {
            rules,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Parse a tab-separated rule table (WORD / ABBREVIATIONS / LANGUAGES,
    /// with a header row).
    pub fn from_tsv(text: &str) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rules = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| SourceError::TableUnavailable(e.to_string()))?;
            let (Some(pattern), Some(abbreviation)) = (record.get(0), record.get(1)) else {
                continue;
            };
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            rules.push(AbbreviationRule::new(
                pattern,
                abbreviation.trim(),
                record.get(2).unwrap_or(""),
            ));
        }

        if rules.is_empty() {
            return Err(SourceError::TableUnavailable(
                "no rules parsed from table".into(),
            ));
        }
        Ok(Self::from_rules(rules))
    }

    /// Load the rule table from a local file.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SourceError::TableUnavailable(format!("{}: {}", path.display(), e)))?;
        Self::from_tsv(&text)
    }

    /// Fetch the rule table over HTTP.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Self, SourceError> {
        let resp = client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::TableUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(SourceError::TableUnavailable(format!(
                "HTTP {} from {}",
                resp.status(),
                url
            )));
        }
        let text = resp
            .text()
            .await
            .map_err(|e| SourceError::TableUnavailable(e.to_string()))?;
        Self::from_tsv(&text)
    }

    /// Number of loaded rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Abbreviate a full journal title word by word.
    ///
    /// Stop words are dropped. Words no rule covers pass through unchanged,
    /// so the result for a title with no matching rules is the title itself.
    pub fn abbreviate_title(&self, title: &str) -> Result<String, SourceError> {
        if let Some(hit) = self.cache.lock().unwrap().get(title) {
            return Ok(hit.clone());
        }

        let mut parts = Vec::new();
        for word in title.split_whitespace() {
            if STOP_WORDS.contains(&word.to_lowercase().as_str()) {
                continue;
            }
            let abbr = self.abbreviate_word(word)?;
            let part = if is_all_caps(&abbr) {
                // Acronyms keep their original casing.
                abbr
            } else {
                title_case_word(&abbr)
            };
            parts.push(part);
        }
        let result = parts.join(" ");

        self.cache
            .lock()
            .unwrap()
            .insert(title.to_string(), result.clone());
        Ok(result)
    }

    /// Abbreviate a single word: exact rules first, then wildcard rules.
    fn abbreviate_word(&self, word: &str) -> Result<String, SourceError> {
        let lower = word.to_lowercase();
        let exact: Vec<&AbbreviationRule> = self
            .rules
            .iter()
            .map(|c| &c.rule)
            .filter(|r| !r.pattern.contains(WILDCARD) && r.pattern.to_lowercase() == lower)
            .collect();
        if exact.len() > 1 {
            return Err(SourceError::Ambiguous {
                query: word.to_string(),
                count: exact.len(),
            });
        }
        if let Some(rule) = exact.first() {
            return Ok(if rule.abbreviation == NO_ABBREVIATION {
                word.to_string()
            } else {
                rule.abbreviation.clone()
            });
        }

        let mut hits: Vec<String> = Vec::new();
        for compiled in &self.rules {
            let Some(caps) = compiled.matcher.captures(word) else {
                continue;
            };
            if compiled.rule.abbreviation == NO_ABBREVIATION {
                hits.push(word.to_string());
            } else {
                hits.push(substitute(&compiled.rule.abbreviation, &caps));
            }
        }

        match hits.len() {
            0 => Ok(word.to_string()),
            1 => {
                let mut out = hits.pop().unwrap();
                // Pluralizing an abbreviation that already ends in a period
                // leaves a stray ".s".
                if out.ends_with(".s") {
                    out.pop();
                }
                Ok(out)
            }
            count => Err(SourceError::Ambiguous {
                query: word.to_string(),
                count,
            }),
        }
    }
}

/// Compile a rule pattern into its word matcher.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    let body = match pattern.find(WILDCARD) {
        Some(idx) => format!(
            "{}(.*){}",
            regex::escape(&pattern[..idx]),
            regex::escape(&pattern[idx + 1..])
        ),
        None => regex::escape(pattern),
    };
    Regex::new(&format!("(?i)^{body}s?$")).ok()
}

/// Substitute captured pattern text into the abbreviation's wildcard
/// markers, left to right.
fn substitute(abbreviation: &str, caps: &regex::Captures) -> String {
    let mut out = abbreviation.to_string();
    for cap in caps.iter().skip(1).flatten() {
        if let Some(pos) = out.find(WILDCARD) {
            out.replace_range(pos..pos + WILDCARD.len_utf8(), cap.as_str());
        }
    }
    out
}

fn is_all_caps(word: &str) -> bool {
    word.chars().any(char::is_alphabetic) && !word.chars().any(char::is_lowercase)
}

/// Per-word generic casing: first letter of every alphabetic run uppercased,
/// the rest lowercased ("a-accelerators" becomes "A-Accelerators").
fn title_case_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_alpha = false;
    for c in word.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

impl AbbreviationSource for LtwaAbbreviator {
    fn name(&self) -> &str {
        "LTWA"
    }

    fn lookup<'a>(
        &'a self,
        title: &'a str,
        _client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<String, SourceError>> + Send + 'a>> {
        Box::pin(async move { self.abbreviate_title(title) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rules() -> LtwaAbbreviator {
        LtwaAbbreviator::from_rules(vec![
            AbbreviationRule::new("a-", "a.", "en"),
            AbbreviationRule::new("b-", "n.a.", "en"),
            AbbreviationRule::new("chuck-", "c.-", "en"),
            AbbreviationRule::new("journal", "j.", "fre, eng"),
        ])
    }

    #[test]
    fn wildcard_match_without_substitution() {
        assert_eq!(sample_rules().abbreviate_word("art").unwrap(), "a.");
    }

    #[test]
    fn wildcard_match_with_substitution() {
        assert_eq!(sample_rules().abbreviate_word("chuckle").unwrap(), "c.le");
    }

    #[test]
    fn no_abbreviation_sentinel_keeps_word() {
        assert_eq!(sample_rules().abbreviate_word("bowl").unwrap(), "bowl");
    }

    #[test]
    fn unmatched_word_passes_through() {
        assert_eq!(sample_rules().abbreviate_word("dance").unwrap(), "dance");
    }

    #[test]
    fn exact_match_beats_wildcards() {
        assert_eq!(sample_rules().abbreviate_word("journal").unwrap(), "j.");
    }

    #[test]
    fn plural_word_matches_exact_pattern() {
        assert_eq!(sample_rules().abbreviate_word("journals").unwrap(), "j.");
    }

    #[test]
    fn plural_artifact_is_trimmed() {
        let ltwa = LtwaAbbreviator::from_rules(vec![AbbreviationRule::new(
            "science-",
            "sci.-",
            "en",
        )]);
        assert_eq!(ltwa.abbreviate_word("sciences").unwrap(), "sci.");
    }

    #[test]
    fn overlapping_wildcards_are_ambiguous() {
        let ltwa = LtwaAbbreviator::from_rules(vec![
            AbbreviationRule::new("a-", "a.", "en"),
            AbbreviationRule::new("ar-", "ar.", "en"),
        ]);
        let err = ltwa.abbreviate_word("art").unwrap_err();
        assert!(matches!(err, SourceError::Ambiguous { count: 2, .. }));
    }

    #[test]
    fn title_abbreviation_drops_stop_words_and_cases() {
        let ltwa = LtwaAbbreviator::from_rules(vec![
            AbbreviationRule::new("journal", "j.", "eng"),
            AbbreviationRule::new("american", "am.", "eng"),
            AbbreviationRule::new("chemic-", "chem.", "eng"),
            AbbreviationRule::new("society", "soc.", "eng"),
        ]);
        assert_eq!(
            ltwa
                .abbreviate_title("Journal of the american Chemical Society")
                .unwrap(),
            "J. Am. Chem. Soc."
        );
    }

    #[test]
    fn acronyms_keep_their_case() {
        let ltwa = LtwaAbbreviator::from_rules(vec![AbbreviationRule::new(
            "journal", "j.", "eng",
        )]);
        assert_eq!(
            ltwa.abbreviate_title("SPIE Newsroom").unwrap(),
            "SPIE Newsroom"
        );
    }

    #[test]
    fn memoized_result_is_stable() {
        let ltwa = sample_rules();
        let first = ltwa.abbreviate_title("Journal of Chuckles").unwrap();
        let second = ltwa.abbreviate_title("Journal of Chuckles").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parses_tab_separated_table() {
        let tsv = "WORD\tABBREVIATIONS\tLANGUAGES\n\
                   journal\tj.\tfre, eng\n\
                   chemic-\tchem.\teng\n";
        let ltwa = LtwaAbbreviator::from_tsv(tsv).unwrap();
        assert_eq!(ltwa.len(), 2);
        assert_eq!(ltwa.abbreviate_word("chemical").unwrap(), "chem.");
    }

    #[test]
    fn empty_table_is_unavailable() {
        let err = LtwaAbbreviator::from_tsv("WORD\tABBREVIATIONS\tLANGUAGES\n").unwrap_err();
        assert!(matches!(err, SourceError::TableUnavailable(_)));
    }
}
