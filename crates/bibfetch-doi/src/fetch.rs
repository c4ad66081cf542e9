//! The end-to-end fetch flow: DOI in, bibliography entry and PDF out.

use std::path::Path;

use thiserror::Error;

use bibfetch_abbrev::Resolver;
use bibfetch_bib::{BibError, Entry, read_bibliography, unique_key};

use crate::article::Article;
use crate::{DoiError, PdfError, publishers};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Doi(#[from] DoiError),
    #[error(transparent)]
    Pdf(#[from] PdfError),
    #[error(transparent)]
    Bib(#[from] BibError),
    #[error("bibliography already contains {doi} as '{key}'")]
    Duplicate { doi: String, key: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Use this key instead of the derived surname+year one.
    pub bibtex_key: Option<String>,
    pub retrieve_pdf: bool,
    pub abbreviate_journal: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            bibtex_key: None,
            retrieve_pdf: true,
            abbreviate_journal: true,
        }
    }
}

/// Keys of entries already carrying this DOI.
pub fn existing_keys(doi: &str, entries: &[Entry]) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.get("doi").is_some_and(|d| d.eq_ignore_ascii_case(doi)))
        .map(|e| e.key.clone())
        .collect()
}

/// Retrieve a document by DOI: append a new entry with a unique key to the
/// bibliography at `bib_path` and, when requested, save the PDF as
/// `{pdf_dir}/{key}.pdf`. Returns the new key.
pub async fn fetch_doi(
    doi: &str,
    bib_path: &Path,
    pdf_dir: &Path,
    options: &FetchOptions,
    resolver: &Resolver,
    client: &reqwest::Client,
) -> Result<String, FetchError> {
    let article = Article::new(doi)?;
    let entries = read_bibliography(bib_path)?;

    if let Some(key) = existing_keys(article.doi(), &entries).into_iter().next() {
        return Err(FetchError::Duplicate {
            doi: article.doi().to_string(),
            key,
        });
    }

    let metadata = article.metadata(client).await?;
    let base_key = match &options.bibtex_key {
        Some(key) => key.clone(),
        None => metadata.default_key().ok_or_else(|| {
            DoiError::Metadata(format!(
                "metadata for {} carries no author or year to derive a key from",
                article.doi()
            ))
        })?,
    };

    let file_names = list_file_names(pdf_dir)?;
    let entry_keys: Vec<String> = entries.iter().map(|e| e.key.clone()).collect();
    let key = unique_key(&base_key, &file_names, &entry_keys);

    if options.retrieve_pdf {
        let publisher = metadata.get("publisher").unwrap_or("").to_string();
        let bytes = publishers::download_pdf(&publisher, article.doi(), client).await?;
        std::fs::create_dir_all(pdf_dir)?;
        let pdf_path = pdf_dir.join(format!("{key}.pdf"));
        std::fs::write(&pdf_path, &bytes)?;
        tracing::info!(path = %pdf_path.display(), bytes = bytes.len(), "saved PDF");
    }

    let entry = article
        .bibtex_entry(&key, options.abbreviate_journal.then_some(resolver), client)
        .await?;
    append_entry(bib_path, &entry)?;
    tracing::info!(key = %key, doi = %article.doi(), "added bibliography entry");

    Ok(key)
}

/// Append an entry to the end of a bibliography file.
pub fn append_entry(path: &Path, entry: &Entry) -> std::io::Result<()> {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    writeln!(file)?;
    writeln!(file, "{}", entry.to_bibtex_string())?;
    Ok(())
}

fn list_file_names(dir: &Path) -> std::io::Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    Ok(std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect())
}
