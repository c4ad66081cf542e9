use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use bibfetch_abbrev::ltwa::DEFAULT_LTWA_URL;
use bibfetch_abbrev::{AbbreviationSource, CassiSource, LtwaAbbreviator, NativeTable, Resolver};
use bibfetch_bib::{PassOptions, abbreviate_bibliography, read_cited_keys, to_bibtex_string};
use bibfetch_doi::{FetchOptions, fetch_doi};

mod config;

use config::ConfigFile;

/// Fetch articles by DOI and abbreviate journal titles in BibTeX bibliographies
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch an article by its digital object identifier
    Fetch {
        /// The DOI (or doi.org URL) to retrieve
        doi: String,

        /// Bibliography file that receives the new entry
        #[arg(short, long, value_name = "FILE")]
        bibtex_file: Option<PathBuf>,

        /// Where to store the downloaded PDF
        #[arg(short, long, value_name = "PATH")]
        pdf_dir: Option<PathBuf>,

        /// Use this entry key instead of the derived surname+year one
        #[arg(long, value_name = "KEY")]
        bibtex_id: Option<String>,

        /// Don't attempt to download the article as a PDF
        #[arg(long)]
        no_pdf: bool,

        /// Don't abbreviate the journal name
        #[arg(long)]
        no_abbrev: bool,
    },

    /// Abbreviate journal titles in a BibTeX file
    Abbrev {
        /// BibTeX input file
        bibfile: PathBuf,

        /// BibTeX output file (default: <input>-abbrev.<ext>)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Overwrite an existing output file
        #[arg(short, long)]
        force: bool,

        /// Do not query the built-in abbreviation table
        #[arg(long)]
        no_native: bool,

        /// Do not query the CASSI database
        #[arg(long)]
        no_cassi: bool,

        /// Do not use the LTWA word-abbreviation rules
        #[arg(long)]
        no_ltwa: bool,

        /// Only emit entries cited in this LaTeX .aux file
        #[arg(long, value_name = "AUX")]
        only_cited: Option<PathBuf>,

        /// Re-case title and booktitle fields
        #[arg(long)]
        fix_titlecase: bool,

        /// Fail on ambiguous matches instead of falling through
        #[arg(long)]
        strict_ambiguous: bool,

        /// Load the LTWA rule table from a local file instead of the network
        #[arg(long, value_name = "PATH")]
        ltwa_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_config();

    match cli.command {
        Command::Fetch {
            doi,
            bibtex_file,
            pdf_dir,
            bibtex_id,
            no_pdf,
            no_abbrev,
        } => fetch(doi, bibtex_file, pdf_dir, bibtex_id, no_pdf, no_abbrev, config).await,
        Command::Abbrev {
            bibfile,
            output,
            force,
            no_native,
            no_cassi,
            no_ltwa,
            only_cited,
            fix_titlecase,
            strict_ambiguous,
            ltwa_file,
        } => {
            abbrev(
                bibfile,
                output,
                force,
                no_native,
                no_cassi,
                no_ltwa,
                only_cited,
                fix_titlecase,
                strict_ambiguous,
                ltwa_file,
                config,
            )
            .await
        }
    }
}

async fn fetch(
    doi: String,
    bibtex_file: Option<PathBuf>,
    pdf_dir: Option<PathBuf>,
    bibtex_id: Option<String>,
    no_pdf: bool,
    no_abbrev: bool,
    config: ConfigFile,
) -> anyhow::Result<()> {
    // Resolve configuration: CLI flags > env vars > config file > defaults
    let fetch_config = config.fetch.clone().unwrap_or_default();
    let bibtex_file = bibtex_file
        .or_else(|| std::env::var("BIBFETCH_BIBTEX_FILE").ok().map(PathBuf::from))
        .or_else(|| fetch_config.bibtex_file.as_deref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./refs.bib"));
    let pdf_dir = pdf_dir
        .or_else(|| std::env::var("BIBFETCH_PDF_DIR").ok().map(PathBuf::from))
        .or_else(|| fetch_config.pdf_dir.as_deref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./papers/"));

    if !bibtex_file.exists() {
        anyhow::bail!(
            "Cannot find bibliography file: {}. Create it first or pass --bibtex-file.",
            bibtex_file.display()
        );
    }

    let client = http_client()?;
    let resolver = if no_abbrev {
        // No sources needed; the journal field is left as delivered.
        Resolver::new(Vec::new())
    } else {
        build_resolver(&config, false, false, false, false, None, &client).await
    };

    let options = FetchOptions {
        bibtex_key: bibtex_id,
        retrieve_pdf: !no_pdf,
        abbreviate_journal: !no_abbrev,
    };
    let key = fetch_doi(&doi, &bibtex_file, &pdf_dir, &options, &resolver, &client).await?;

    if no_pdf {
        println!("Saved entry as {}", key.green());
    } else {
        println!(
            "Saved entry as {} ({})",
            key.green(),
            pdf_dir.join(format!("{key}.pdf")).display()
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn abbrev(
    bibfile: PathBuf,
    output: Option<PathBuf>,
    force: bool,
    no_native: bool,
    no_cassi: bool,
    no_ltwa: bool,
    only_cited: Option<PathBuf>,
    fix_titlecase: bool,
    strict_ambiguous: bool,
    ltwa_file: Option<PathBuf>,
    config: ConfigFile,
) -> anyhow::Result<()> {
    if !bibfile.exists() {
        anyhow::bail!("Cannot find BibTeX file: {}", bibfile.display());
    }
    let output = output.unwrap_or_else(|| default_output(&bibfile));
    if output.exists() && !force {
        anyhow::bail!(
            "Output file '{}' already exists. Use --force to overwrite.",
            output.display()
        );
    }

    let citation_filter: Option<HashSet<String>> = match &only_cited {
        Some(aux) => Some(read_cited_keys(aux).map_err(|e| {
            anyhow::anyhow!("Cannot read citation log {}: {}", aux.display(), e)
        })?),
        None => None,
    };

    let entries = bibfetch_bib::read_bibliography(&bibfile)?;
    let client = http_client()?;
    let resolver = build_resolver(
        &config,
        no_native,
        no_cassi,
        no_ltwa,
        strict_ambiguous,
        ltwa_file,
        &client,
    )
    .await;
    if resolver.source_names().is_empty() {
        tracing::warn!("no abbreviation sources enabled, journals will pass through unchanged");
    }

    let bar = ProgressBar::new(entries.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        bar.set_style(style);
    }

    let options = PassOptions { fix_titlecase };
    let processed = abbreviate_bibliography(
        entries,
        citation_filter.as_ref(),
        &resolver,
        &client,
        &options,
        |entry| {
            bar.set_message(entry.key.clone());
            bar.inc(1);
        },
    )
    .await?;
    bar.finish_and_clear();

    std::fs::write(&output, to_bibtex_string(&processed))?;
    println!(
        "Wrote {} entries to {}",
        processed.len().green(),
        output.display()
    );
    Ok(())
}

/// Assemble the enabled sources in lookup order: native table, CASSI, LTWA.
///
/// An unavailable LTWA rule table disables that source for the run instead of
/// failing the batch.
async fn build_resolver(
    config: &ConfigFile,
    no_native: bool,
    no_cassi: bool,
    no_ltwa: bool,
    strict_ambiguous: bool,
    ltwa_file: Option<PathBuf>,
    client: &reqwest::Client,
) -> Resolver {
    let sources_config = config.sources.clone().unwrap_or_default();
    let use_native = !no_native && sources_config.native.unwrap_or(true);
    let use_cassi = !no_cassi && sources_config.cassi.unwrap_or(true);
    let use_ltwa = !no_ltwa && sources_config.ltwa.unwrap_or(true);

    let mut sources: Vec<Box<dyn AbbreviationSource>> = Vec::new();
    if use_native {
        sources.push(Box::new(NativeTable));
    }
    if use_cassi {
        sources.push(Box::new(CassiSource::new()));
    }
    if use_ltwa {
        let ltwa_file = ltwa_file.or_else(|| sources_config.ltwa_file.as_deref().map(PathBuf::from));
        let table = match &ltwa_file {
            Some(path) => LtwaAbbreviator::from_path(path),
            None => {
                let url = std::env::var("BIBFETCH_LTWA_URL")
                    .ok()
                    .or_else(|| sources_config.ltwa_url.clone())
                    .unwrap_or_else(|| DEFAULT_LTWA_URL.to_string());
                LtwaAbbreviator::fetch(client, &url).await
            }
        };
        match table {
            Ok(ltwa) => sources.push(Box::new(ltwa)),
            Err(e) => tracing::warn!(error = %e, "LTWA rule table unavailable, source disabled"),
        }
    }

    Resolver::new(sources).fail_on_ambiguous(strict_ambiguous)
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    input.with_file_name(format!("{stem}-abbrev{ext}"))
}

fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("bibfetch/", env!("CARGO_PKG_VERSION")))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_inserts_abbrev_suffix() {
        assert_eq!(
            default_output(Path::new("refs.bib")),
            PathBuf::from("refs-abbrev.bib")
        );
        assert_eq!(
            default_output(Path::new("notes/library.bib")),
            PathBuf::from("notes/library-abbrev.bib")
        );
        assert_eq!(
            default_output(Path::new("noext")),
            PathBuf::from("noext-abbrev")
        );
    }
}
