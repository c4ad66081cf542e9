//! Raw BibTeX reading and writing.
//!
//! Values are kept exactly as written between their delimiters (outer braces
//! or quotes stripped, interior untouched), and field order is preserved, so
//! a parse/serialize cycle keeps unknown fields and brace conventions intact.

use std::path::Path;

use crate::BibError;

/// One bibliography entry: an open-ended ordered field map plus its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry type, lower-cased (`article`, `book`, ...).
    pub entry_type: String,
    pub key: String,
    /// Field name (lower-cased) and raw value, in file order.
    pub fields: Vec<(String, String)>,
}

impl Entry {
    pub fn new(entry_type: &str, key: &str) -> Self {
        Self {
            entry_type: entry_type.to_lowercase(),
            key: key.to_string(),
            fields: Vec::new(),
        }
    }

    /// Case-insensitive field lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace a field's value, appending the field if absent.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .fields
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value,
            None => self.fields.push((name.to_lowercase(), value)),
        }
    }

    pub fn to_bibtex_string(&self) -> String {
        let mut out = format!("@{}{{{},\n", self.entry_type, self.key);
        for (name, value) in &self.fields {
            out.push_str(&format!("  {name} = {{{value}}},\n"));
        }
        out.push('}');
        out
    }
}

/// Serialize a whole bibliography.
pub fn to_bibtex_string(entries: &[Entry]) -> String {
    let mut out = entries
        .iter()
        .map(Entry::to_bibtex_string)
        .collect::<Vec<_>>()
        .join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Read and parse a bibliography file.
pub fn read_bibliography(path: &Path) -> Result<Vec<Entry>, BibError> {
    parse(&std::fs::read_to_string(path)?)
}

/// Parse BibTeX source into entries. Text between entries is ignored, as are
/// `@comment`, `@preamble`, and `@string` blocks.
pub fn parse(src: &str) -> Result<Vec<Entry>, BibError> {
    let mut scanner = Scanner { src, pos: 0 };
    let mut entries = Vec::new();

    while let Some(at) = scanner.find('@') {
        scanner.pos = at + 1;
        let entry_type = scanner.take_ident().to_lowercase();
        if entry_type.is_empty() {
            // A stray '@' in inter-entry text.
            continue;
        }
        scanner.skip_whitespace();
        scanner.expect('{')?;

        if matches!(entry_type.as_str(), "comment" | "preamble" | "string") {
            scanner.skip_balanced()?;
            continue;
        }

        let key = scanner.take_until(&[',', '}'])?.trim().to_string();
        let mut entry = Entry {
            entry_type,
            key,
            fields: Vec::new(),
        };

        loop {
            scanner.skip_whitespace();
            match scanner.peek() {
                Some(',') => {
                    scanner.bump();
                }
                Some('}') => {
                    scanner.bump();
                    break;
                }
                Some(_) => {
                    let name = scanner.take_field_name()?.to_lowercase();
                    scanner.skip_whitespace();
                    scanner.expect('=')?;
                    scanner.skip_whitespace();
                    let value = scanner.take_value()?;
                    entry.fields.push((name, value));
                }
                None => {
                    return Err(scanner.error("unterminated entry"));
                }
            }
        }

        entries.push(entry);
    }

    Ok(entries)
}

struct Scanner<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Scanner<'s> {
    fn error(&self, message: &str) -> BibError {
        BibError::Parse {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn find(&self, needle: char) -> Option<usize> {
        self.rest().find(needle).map(|i| self.pos + i)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), BibError> {
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{expected}'")))
        }
    }

    fn take_ident(&mut self) -> &'s str {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn take_field_name(&mut self) -> Result<&'s str, BibError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && c != '=' && c != ',' && c != '}')
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected field name"));
        }
        Ok(&self.src[start..self.pos])
    }

    /// Take raw text up to (not including) one of `stops`. Fails at EOF.
    fn take_until(&mut self, stops: &[char]) -> Result<&'s str, BibError> {
        let start = self.pos;
        loop {
            match self.peek() {
                Some(c) if stops.contains(&c) => return Ok(&self.src[start..self.pos]),
                Some(_) => {
                    self.bump();
                }
                None => return Err(self.error("unterminated entry")),
            }
        }
    }

    /// Take one field value: a balanced brace group, a quoted string, or a
    /// bare word. Delimiters are stripped; the interior stays raw.
    fn take_value(&mut self) -> Result<String, BibError> {
        match self.peek() {
            Some('{') => {
                self.bump();
                let start = self.pos;
                let end = self.scan_balanced(start)?;
                let value = self.src[start..end].trim().to_string();
                self.pos = end + 1;
                Ok(value)
            }
            Some('"') => {
                self.bump();
                let start = self.pos;
                let mut depth = 0u32;
                let mut escaped = false;
                loop {
                    let Some(c) = self.bump() else {
                        return Err(self.error("unterminated quoted value"));
                    };
                    if escaped {
                        escaped = false;
                        continue;
                    }
                    match c {
                        '\\' => escaped = true,
                        '{' => depth += 1,
                        '}' => depth = depth.saturating_sub(1),
                        '"' if depth == 0 => {
                            return Ok(self.src[start..self.pos - 1].trim().to_string());
                        }
                        _ => {}
                    }
                }
            }
            Some(_) => {
                let value = self.take_until(&[',', '}', '\n'])?.trim().to_string();
                if value.is_empty() {
                    Err(self.error("expected field value"))
                } else {
                    Ok(value)
                }
            }
            None => Err(self.error("expected field value")),
        }
    }

    /// Scan from `start` (just inside an opening brace) to the byte index of
    /// the matching close brace. Escaped braces don't count toward balance.
    fn scan_balanced(&self, start: usize) -> Result<usize, BibError> {
        let mut depth = 1u32;
        let mut escaped = false;
        for (i, c) in self.src[start..].char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(start + i);
                    }
                }
                _ => {}
            }
        }
        Err(BibError::Parse {
            offset: start,
            message: "unbalanced braces".to_string(),
        })
    }

    /// Consume a balanced brace group whose opening brace was already taken.
    fn skip_balanced(&mut self) -> Result<(), BibError> {
        let end = self.scan_balanced(self.pos)?;
        self.pos = end + 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        "@article{small,\n",
        "  author = {Freely, I.P.},\n",
        "  title = {A small paper},\n",
        "  journal = {The journal of small papers},\n",
        "  year = 1997,\n",
        "  volume = {-1},\n",
        "  note = {to appear},\n",
        "}\n",
    );

    #[test]
    fn parses_fields_in_order() {
        let entries = parse(SAMPLE).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.entry_type, "article");
        assert_eq!(entry.key, "small");
        assert_eq!(entry.get("author"), Some("Freely, I.P."));
        assert_eq!(entry.get("year"), Some("1997"));
        assert_eq!(
            entry.fields.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            vec!["author", "title", "journal", "year", "volume", "note"]
        );
    }

    #[test]
    fn values_keep_interior_braces_raw() {
        let entries = parse("@article{k, title = {{A normal title}}, }").unwrap();
        assert_eq!(entries[0].get("title"), Some("{A normal title}"));
    }

    #[test]
    fn quoted_values_are_supported() {
        let entries = parse("@article{k, title = \"Spam {and} eggs\", year = 2008}").unwrap();
        assert_eq!(entries[0].get("title"), Some("Spam {and} eggs"));
        assert_eq!(entries[0].get("year"), Some("2008"));
    }

    #[test]
    fn comment_and_preamble_blocks_are_skipped() {
        let src = "@comment{ignore me}\n@preamble{\"\\newcommand{x}\"}\n@book{b, year = 2020}";
        let entries = parse(src).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "b");
    }

    #[test]
    fn inter_entry_text_is_ignored() {
        let src = "stray text user@example.org\n@misc{m, note = {x}}";
        let entries = parse(src).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "m");
    }

    #[test]
    fn unterminated_entry_is_an_error() {
        let err = parse("@article{k, title = {open").unwrap_err();
        assert!(matches!(err, crate::BibError::Parse { .. }));
    }

    #[test]
    fn round_trip_preserves_unknown_fields() {
        let entries = parse(SAMPLE).unwrap();
        let rendered = to_bibtex_string(&entries);
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(entries, reparsed);
        assert!(rendered.contains("note = {to appear}"));
    }

    #[test]
    fn reads_bibliography_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.bib");
        std::fs::write(&path, SAMPLE).unwrap();
        let entries = read_bibliography(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "small");
    }

    #[test]
    fn set_replaces_in_place_and_appends_new() {
        let mut entry = parse(SAMPLE).unwrap().remove(0);
        entry.set("journal", "J. Sm. Papers");
        entry.set("doi", "10.1000/xyz123");
        assert_eq!(entry.get("journal"), Some("J. Sm. Papers"));
        assert_eq!(entry.fields[2].0, "journal");
        assert_eq!(entry.fields.last().unwrap().0, "doi");
    }
}
