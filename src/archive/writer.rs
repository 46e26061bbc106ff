//! Deterministic archive writer.
//!
//! Entries are written in caller order with a fixed timestamp and Deflate
//! compression, so the same items always produce the same bytes.

use std::io::{Seek, Write};

use tracing::debug;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::CONFIG_FILE_NAME;

/// One item to be archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub full_name: String,
    pub config: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(full_name: impl Into<String>, config: Vec<u8>) -> Self {
        Self {
            full_name: full_name.into(),
            config,
        }
    }
}

/// Normalize a full name for use as an entry directory: backslashes become
/// `/` and leading slashes are dropped.
#[must_use]
pub fn sanitize(full_name: &str) -> String {
    full_name.replace('\\', "/").trim_start_matches('/').to_string()
}

/// Entry name for an item (`A/job` -> `A/job/config.xml`).
#[must_use]
pub fn entry_name(full_name: &str) -> String {
    format!("{}/{CONFIG_FILE_NAME}", sanitize(full_name))
}

/// Streaming zip writer over any seekable sink.
pub struct ArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
    entries: usize,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn new(output: W) -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        Self {
            zip: ZipWriter::new(output),
            options,
            entries: 0,
        }
    }

    /// Append one item's configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    pub fn add(&mut self, full_name: &str, config: &[u8]) -> ZipResult<()> {
        let name = entry_name(full_name);
        self.zip.start_file(name.as_str(), self.options)?;
        self.zip.write_all(config)?;
        self.entries += 1;
        debug!(entry = %name, bytes = config.len(), "Archived item");
        Ok(())
    }

    /// Number of entries written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Write the central directory and return the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be finalized.
    pub fn finish(self) -> ZipResult<W> {
        self.zip.finish()
    }
}

/// Write `items` in order into a new archive on `output`.
///
/// # Errors
///
/// Returns an error if any entry or the central directory cannot be written.
pub fn write_archive<'a, W, I>(items: I, output: W) -> ZipResult<W>
where
    W: Write + Seek,
    I: IntoIterator<Item = &'a ArchiveEntry>,
{
    let mut writer = ArchiveWriter::new(output);
    for item in items {
        writer.add(&item.full_name, &item.config)?;
    }
    writer.finish()
}
