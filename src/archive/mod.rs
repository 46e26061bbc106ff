//! Archive transport.
//!
//! The transfer format is a plain zip with one `<full-name>/config.xml` entry
//! per item and no manifest.
//!
//! # Submodules
//!
//! - [`writer`] - Deterministic archive writer
//! - [`extract`] - Zip-slip-safe extraction

pub mod extract;
pub mod writer;

pub use extract::{ExtractError, ExtractStats, extract, extract_file};
pub use writer::{ArchiveEntry, ArchiveWriter, entry_name, sanitize, write_archive};
