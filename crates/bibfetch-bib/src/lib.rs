//! BibTeX bibliography handling: a raw, round-trip-safe entry model plus the
//! text repairs and the journal abbreviation pass applied to it.
//!
//! Parsing here deliberately keeps field values as the raw text between the
//! delimiters. Brace artifacts like `{{Title}}` are data this crate must see
//! and repair, and unknown fields must survive a read/modify/write cycle
//! verbatim.

use thiserror::Error;

pub mod aux;
pub mod braces;
pub mod keys;
pub mod parser;
pub mod pass;
pub mod titlecase;

pub use aux::{cited_keys, read_cited_keys};
pub use braces::fix_braces;
pub use keys::{default_key, unique_key};
pub use parser::{Entry, parse, read_bibliography, to_bibtex_string};
pub use pass::{PassOptions, abbreviate_bibliography};
pub use titlecase::titlecase;

#[derive(Error, Debug)]
pub enum BibError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed BibTeX at byte {offset}: {message}")]
    Parse { offset: usize, message: String },
}
