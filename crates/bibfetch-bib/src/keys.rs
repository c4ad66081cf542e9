//! Citation-key derivation and uniqueness.

use std::collections::HashSet;
use std::path::Path;

/// Find a key that collides with neither existing file names (compared by
/// stem, so `wolf2017.pdf` blocks `wolf2017`) nor existing entry keys.
///
/// Returns `base` itself when free, otherwise `base-2`, `base-3`, ... Pure;
/// the caller supplies both namespaces and persists the result.
pub fn unique_key(base: &str, file_names: &[String], entry_keys: &[String]) -> String {
    let stems: HashSet<String> = file_names
        .iter()
        .filter_map(|name| Path::new(name).file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .collect();
    let keys: HashSet<&str> = entry_keys.iter().map(String::as_str).collect();
    let taken = |candidate: &str| stems.contains(candidate) || keys.contains(candidate);

    if !taken(base) {
        return base.to_string();
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Default key for a new entry: first-author surname plus year, lower-cased
/// and stripped to key-safe characters.
pub fn default_key(surname: &str, year: &str) -> String {
    let name: String = surname
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect();
    format!("{}{}", name, year.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn free_base_is_returned_unchanged() {
        assert_eq!(unique_key("wolf2017", &[], &[]), "wolf2017");
    }

    #[test]
    fn collision_with_files_appends_suffix() {
        assert_eq!(
            unique_key("wolf2017", &strings(&["wolf2017.pdf"]), &[]),
            "wolf2017-2"
        );
        assert_eq!(
            unique_key(
                "wolf2017",
                &strings(&["wolf2017.pdf", "wolf2017-2.pdf"]),
                &[]
            ),
            "wolf2017-3"
        );
    }

    #[test]
    fn collision_with_entries_appends_suffix() {
        assert_eq!(
            unique_key("wolf2017", &[], &strings(&["wolf2017"])),
            "wolf2017-2"
        );
        assert_eq!(
            unique_key("wolf2017", &[], &strings(&["wolf2017", "wolf2017-2"])),
            "wolf2017-3"
        );
    }

    #[test]
    fn both_namespaces_are_checked() {
        assert_eq!(
            unique_key(
                "wolf2017",
                &strings(&["wolf2017.pdf"]),
                &strings(&["wolf2017-2"])
            ),
            "wolf2017-3"
        );
    }

    #[test]
    fn default_key_folds_surname() {
        assert_eq!(default_key("Wolf", "2017"), "wolf2017");
        assert_eq!(default_key("O'Brien", "1997"), "obrien1997");
    }
}
