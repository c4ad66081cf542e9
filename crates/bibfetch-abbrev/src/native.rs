//! Built-in static table of journal abbreviations.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use once_cell::sync::Lazy;

use crate::{AbbreviationSource, SourceError};

/// Keyed by lower-cased full journal name.
static ABBREVIATIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("the journal of small papers", "J. Sm. Papers");
    m.insert("materials today nano", "Mater. Today Nano");
    m.insert("materials today", "Mater. Today");
    m.insert("advanced energy materials", "Adv. Energy Mater.");
    m.insert("advanced materials", "Adv. Mater.");
    m.insert("journal of applied physics", "J. Appl. Phys.");
    m.insert("journal of materials chemistry a", "J. Mater. Chem. A");
    m.insert("chemical communications", "Chem. Commun.");
    m.insert(
        "ieee transactions on systems, man, and cybernetics",
        "IEEE Transactions on Systems, Man, and Cybernetics",
    );
    m.insert(
        "ieee computer graphics and applications",
        "IEEE Computer Graphics and Applications",
    );
    m.insert("ieee signal processing letters", "IEEE Signal Processing Letters");
    m.insert(
        "ieee transactions on image processing",
        "IEEE Transactions on Image Processing",
    );
    m.insert("ieee signal processing magazine", "IEEE Signal Processing Magazine");
    m.insert(
        "ieee transactions on pattern analysis and machine intelligence",
        "IEEE Transactions on Pattern Analysis and Machine Intelligence",
    );
    m.insert(
        "ieee transactions on visualization and computer graphics",
        "IEEE Transactions on Visualization and Computer Graphics",
    );
    m.insert("analytical chemistry", "Anal. Chem.");
    m.insert("science", "Science");
    m.insert("nature", "Nature");
    m.insert("advanced functional materials", "Adv. Funct. Mater.");
    m.insert("electrochemistry", "Electrochemistry");
    m.insert("advanced materials interfaces", "Adv. Mater. Interfaces");
    m.insert("chemical reviews", "Chem. Rev.");
    m.insert("journal of energy storage", "J. Energy Storage");
    m.insert("atomic data and nuclear data tables", "At. Data Nucl. Data Tables");
    m.insert("radiation physics and chemistry", "Radiat. Phys. Chem.");
    m.insert("materials characterization", "Mater. Charact.");
    m.insert("inorganic chemistry", "Inorg. Chem.");
    m.insert("journal of physics d: applied physics", "J. Phys. D");
    m.insert("frontiers in energy research", "Front. Energy Res.");
    m.insert("journal of physics: condensed matter", "J. Phys. Condens. Matter");
    m.insert("energy storage materials", "Energy Storage Mater.");
    m.insert("spie newsroom", "SPIE Newsroom");
    m.insert(
        "journal of polymer science, part b: polymer physics",
        "J. Polym. Sci., Part B: Polym. Phys.",
    );
    m.insert("environmental science & technology", "Environ. Sci. Technol.");
    m.insert("journal of electronic imaging", "J. Electron. Imaging");
    m
});

/// Offline source backed by the built-in table. Pure and deterministic.
pub struct NativeTable;

impl NativeTable {
    /// Case-insensitive lookup in the built-in table.
    pub fn get(title: &str) -> Option<&'static str> {
        ABBREVIATIONS.get(title.to_lowercase().as_str()).copied()
    }
}

impl AbbreviationSource for NativeTable {
    fn name(&self) -> &str {
        "native"
    }

    fn lookup<'a>(
        &'a self,
        title: &'a str,
        _client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = Result<String, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            Self::get(title)
                .map(str::to_string)
                .ok_or(SourceError::NotFound)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(NativeTable::get("Advanced Materials"), Some("Adv. Mater."));
        assert_eq!(NativeTable::get("ADVANCED MATERIALS"), Some("Adv. Mater."));
        assert_eq!(NativeTable::get("advanced materials"), Some("Adv. Mater."));
    }

    #[test]
    fn unknown_title_is_absent() {
        assert_eq!(NativeTable::get("Journal of Imaginary Results"), None);
    }

    #[tokio::test]
    async fn source_reports_not_found() {
        let client = reqwest::Client::new();
        let err = NativeTable
            .lookup("Journal of Imaginary Results", &client)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound));
    }
}
