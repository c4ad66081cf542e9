//! One published article, addressed by DOI.

use bibfetch_abbrev::Resolver;
use bibfetch_bib::Entry;
use tokio::sync::OnceCell;

use crate::{DoiError, parse_doi};

/// Fields emitted first, in this order; anything else follows alphabetically.
const PREFERRED_FIELDS: [&str; 14] = [
    "author",
    "title",
    "journal",
    "booktitle",
    "volume",
    "number",
    "pages",
    "year",
    "month",
    "publisher",
    "doi",
    "url",
    "isbn",
    "issn",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub given: String,
    pub family: String,
}

/// Structured metadata for one article, as returned by the DOI server.
#[derive(Debug, Clone)]
pub struct ArticleMetadata {
    /// BibTeX entry type (`article`, `book`, ...).
    pub entry_type: String,
    /// Field name and plain-text value, in serialization order. The server's
    /// own entry key is not carried here; callers assign their own.
    pub fields: Vec<(String, String)>,
    pub authors: Vec<Author>,
}

impl ArticleMetadata {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Default citation key: first-author surname plus year.
    pub fn default_key(&self) -> Option<String> {
        let author = self.authors.first()?;
        let year = self.get("year")?;
        let surname = if author.family.is_empty() {
            &author.given
        } else {
            &author.family
        };
        Some(bibfetch_bib::default_key(surname, year))
    }
}

/// A published article addressed by DOI. Metadata is fetched once and cached
/// for the lifetime of the value.
pub struct Article {
    doi: String,
    metadata: OnceCell<ArticleMetadata>,
}

impl Article {
    /// Validate the DOI (bare or URL form) and wrap it.
    pub fn new(doi: &str) -> Result<Self, DoiError> {
        Ok(Self {
            doi: parse_doi(doi)?,
            metadata: OnceCell::new(),
        })
    }

    pub fn doi(&self) -> &str {
        &self.doi
    }

    /// Resolve the DOI to its current landing URL via the handle API.
    pub async fn resolve_url(&self, client: &reqwest::Client) -> Result<String, DoiError> {
        let url = format!("https://doi.org/api/handles/{}", self.doi);
        let data: serde_json::Value = client.get(&url).send().await?.json().await?;
        match data["responseCode"].as_i64() {
            Some(1) => data["values"][0]["data"]["value"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| DoiError::Handle("handle record carries no URL".into())),
            Some(100) => Err(DoiError::NotFound(self.doi.clone())),
            _ => Err(DoiError::Handle(format!("unexpected response: {data}"))),
        }
    }

    /// Metadata for this article, fetched on first use.
    pub async fn metadata(&self, client: &reqwest::Client) -> Result<&ArticleMetadata, DoiError> {
        self.metadata
            .get_or_try_init(|| async {
                let url = format!("https://doi.org/{}", self.doi);
                let resp = client
                    .get(&url)
                    .header(reqwest::header::ACCEPT, "application/x-bibtex")
                    .send()
                    .await?;
                if resp.status().as_u16() == 404 {
                    return Err(DoiError::NotFound(self.doi.clone()));
                }
                if !resp.status().is_success() {
                    return Err(DoiError::Metadata(format!(
                        "HTTP {} from {}",
                        resp.status(),
                        url
                    )));
                }
                let text = resp.text().await?;
                parse_metadata(&text, &self.doi)
            })
            .await
    }

    /// Build the BibTeX entry for this article under the caller's key,
    /// abbreviating the journal through `resolver` when one is given.
    pub async fn bibtex_entry(
        &self,
        key: &str,
        resolver: Option<&Resolver>,
        client: &reqwest::Client,
    ) -> Result<Entry, DoiError> {
        let metadata = self.metadata(client).await?;
        let mut entry = Entry::new(&metadata.entry_type, key);
        for (name, value) in &metadata.fields {
            entry.set(name, value.clone());
        }
        if let Some(resolver) = resolver {
            if let Some(journal) = entry.get("journal").map(str::to_string) {
                let resolution = resolver.resolve(&journal, client).await?;
                entry.set("journal", resolution.abbreviation);
            }
        }
        Ok(entry)
    }
}

/// Parse the server-returned BibTeX into metadata. Exactly one entry is
/// expected for a DOI.
fn parse_metadata(bibtex: &str, doi: &str) -> Result<ArticleMetadata, DoiError> {
    let bibliography = biblatex::Bibliography::parse(bibtex)
        .map_err(|e| DoiError::Metadata(format!("unparseable BibTeX for '{doi}': {e}")))?;
    let entries: Vec<&biblatex::Entry> = bibliography.iter().collect();
    if entries.len() != 1 {
        return Err(DoiError::Metadata(format!(
            "found {} BibTeX entries for '{doi}'",
            entries.len()
        )));
    }
    let entry = entries[0];

    let authors: Vec<Author> = entry
        .author()
        .unwrap_or_default()
        .into_iter()
        .map(|p| Author {
            given: p.given_name,
            family: p.name,
        })
        .collect();

    let mut fields = Vec::new();
    for name in PREFERRED_FIELDS {
        if let Some(chunks) = entry.get(name) {
            fields.push((name.to_string(), chunks_to_string(chunks)));
        }
    }
    for (name, chunks) in &entry.fields {
        let name = name.to_lowercase();
        if !PREFERRED_FIELDS.contains(&name.as_str()) {
            fields.push((name, chunks_to_string(chunks)));
        }
    }

    Ok(ArticleMetadata {
        entry_type: entry.entry_type.to_string(),
        fields,
        authors,
    })
}

fn chunks_to_string(chunks: &[biblatex::Spanned<biblatex::Chunk>]) -> String {
    chunks
        .iter()
        .map(|c| match &c.v {
            biblatex::Chunk::Normal(s) => s.as_str(),
            biblatex::Chunk::Verbatim(s) => s.as_str(),
            biblatex::Chunk::Math(s) => s.as_str(),
        })
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_BIBTEX: &str = concat!(
        "@article{Wolf_2017,\n",
        "  doi = {10.1021/acs.chemmater.6b05114},\n",
        "  url = {https://doi.org/10.1021/acs.chemmater.6b05114},\n",
        "  year = 2017,\n",
        "  publisher = {American Chemical Society ({ACS})},\n",
        "  volume = {29},\n",
        "  number = {7},\n",
        "  pages = {2876--2883},\n",
        "  author = {Matthew Wolf and Brian May and Jordi Cabana},\n",
        "  title = {Visualization of Electrochemical Reactions},\n",
        "  journal = {Chemistry of Materials}\n",
        "}\n",
    );

    #[test]
    fn parses_single_entry_metadata() {
        let metadata = parse_metadata(SERVER_BIBTEX, "10.1021/acs.chemmater.6b05114").unwrap();
        assert_eq!(metadata.entry_type, "article");
        assert_eq!(metadata.get("journal"), Some("Chemistry of Materials"));
        assert_eq!(metadata.get("year"), Some("2017"));
        assert_eq!(metadata.authors.len(), 3);
        assert_eq!(metadata.authors[0].family, "Wolf");
    }

    #[test]
    fn preferred_fields_lead_the_entry() {
        let metadata = parse_metadata(SERVER_BIBTEX, "10.1021/acs.chemmater.6b05114").unwrap();
        let names: Vec<&str> = metadata.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names[0], "author");
        assert_eq!(names[1], "title");
        assert_eq!(names[2], "journal");
    }

    #[test]
    fn default_key_is_surname_plus_year() {
        let metadata = parse_metadata(SERVER_BIBTEX, "10.1021/acs.chemmater.6b05114").unwrap();
        assert_eq!(metadata.default_key().as_deref(), Some("wolf2017"));
    }

    #[test]
    fn empty_response_is_a_metadata_error() {
        let err = parse_metadata("", "10.1000/x").unwrap_err();
        assert!(matches!(err, DoiError::Metadata(_)));
    }
}
