//! Cited-key extraction from LaTeX `.aux` files.

use std::collections::HashSet;
use std::path::Path;

/// Collect the keys named by `\citation{...}` lines.
///
/// Lines with any other shape are ignored; comma-separated interiors
/// contribute each key.
pub fn cited_keys(aux: &str) -> HashSet<String> {
    let mut keys = HashSet::new();
    for line in aux.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("\\citation{") else {
            continue;
        };
        let Some(interior) = rest.strip_suffix('}') else {
            continue;
        };
        for key in interior.split(',') {
            let key = key.trim();
            if !key.is_empty() {
                keys.insert(key.to_string());
            }
        }
    }
    keys
}

/// Read a `.aux` file and collect its cited keys.
pub fn read_cited_keys(path: &Path) -> std::io::Result<HashSet<String>> {
    Ok(cited_keys(&std::fs::read_to_string(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_citations() {
        let aux = "\\relax\n\\citation{small}\n\\bibstyle{unsrt}\n";
        let keys = cited_keys(aux);
        assert_eq!(keys, HashSet::from(["small".to_string()]));
    }

    #[test]
    fn splits_comma_separated_citations() {
        let keys = cited_keys("\\citation{wolf2017,groot2008}\n\\citation{small}\n");
        assert_eq!(keys.len(), 3);
        assert!(keys.contains("wolf2017"));
        assert!(keys.contains("groot2008"));
        assert!(keys.contains("small"));
    }

    #[test]
    fn other_lines_are_ignored() {
        assert!(cited_keys("\\bibdata{refs}\nplain text\n").is_empty());
    }
}
