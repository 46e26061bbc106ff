//! Export orchestration.
//!
//! Resolves a selection against the live hierarchy and streams the selected
//! configurations into an archive. Also builds the rows of the export picker,
//! including synthetic folders for ancestors that are not items themselves.

use std::collections::BTreeSet;
use std::io::{Seek, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive::ArchiveWriter;
use crate::error::Result;
use crate::hierarchy::Hierarchy;
use crate::model::{ItemDescriptor, ItemRow};
use crate::namespace::{ancestors, compare_hierarchical};
use crate::selection;

/// Counters for a completed export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    /// Items matched by the selection
    pub selected: usize,
    /// Items written to the archive
    pub written: usize,
    /// Items whose configuration could not be read
    pub skipped: usize,
    /// Configuration bytes written, before compression
    pub bytes: u64,
}

/// File name for an export taken at `now`.
///
/// `job-backup-2025-12-11T01_42_36.025Z.zip`: UTC, millisecond precision,
/// `:` replaced by `_` so the name is valid everywhere.
#[must_use]
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("job-backup-{}.zip", now.format("%Y-%m-%dT%H_%M_%S%.3fZ"))
}

/// Rows of the export picker, in tree order.
///
/// # Errors
///
/// Returns an error if the hierarchy cannot be listed.
pub fn list_rows<H: Hierarchy + ?Sized>(hierarchy: &H) -> Result<Vec<ItemRow>> {
    let items = hierarchy.list_all()?;
    let known: BTreeSet<&str> = items.iter().map(|i| i.full_name.as_str()).collect();

    let missing: BTreeSet<&str> = items
        .iter()
        .flat_map(|i| ancestors(&i.full_name))
        .filter(|a| !known.contains(a))
        .collect();

    let mut rows: Vec<ItemRow> = items.iter().map(ItemRow::from).collect();
    rows.extend(missing.into_iter().map(ItemRow::folder));
    rows.sort_by(|a, b| {
        compare_hierarchical(
            (a.full_name.as_str(), a.is_container),
            (b.full_name.as_str(), b.is_container),
        )
    });
    Ok(rows)
}

/// Exports items from a live hierarchy.
pub struct Exporter<'a, H: Hierarchy + ?Sized> {
    hierarchy: &'a H,
}

impl<'a, H: Hierarchy + ?Sized> Exporter<'a, H> {
    pub fn new(hierarchy: &'a H) -> Self {
        Self { hierarchy }
    }

    /// Exportable items matched by `selection`, parents first.
    ///
    /// # Errors
    ///
    /// Returns an error if the hierarchy cannot be listed.
    pub fn targets<S: AsRef<str>>(&self, selection: &[S]) -> Result<Vec<ItemDescriptor>> {
        let mut items: Vec<ItemDescriptor> = self
            .hierarchy
            .list_all()?
            .into_iter()
            .filter(|i| self.hierarchy.is_exportable(i))
            .collect();

        let names = selection::expand(selection, items.iter().map(|i| i.full_name.as_str()));
        let mut ordered = Vec::with_capacity(names.len());
        for name in names {
            if let Some(pos) = items.iter().position(|i| i.full_name == name) {
                ordered.push(items.swap_remove(pos));
            }
        }
        Ok(ordered)
    }

    /// Write `targets` in order into an archive on `output`.
    ///
    /// Items whose configuration cannot be read are skipped and counted.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be written.
    pub fn write<W: Write + Seek>(
        &self,
        targets: &[ItemDescriptor],
        output: W,
    ) -> Result<(W, ExportStats)> {
        let mut writer = ArchiveWriter::new(output);
        let mut stats = ExportStats {
            selected: targets.len(),
            ..ExportStats::default()
        };

        for item in targets {
            match self.hierarchy.read_config_bytes(item) {
                Ok(config) => {
                    writer.add(&item.full_name, &config)?;
                    stats.written += 1;
                    stats.bytes += config.len() as u64;
                }
                Err(e) => {
                    warn!(full_name = %item.full_name, error = %e, "Skipping unreadable item");
                    stats.skipped += 1;
                }
            }
        }

        let output = writer.finish()?;
        info!(written = stats.written, skipped = stats.skipped, "Export finished");
        Ok((output, stats))
    }

    /// Resolve `selection` and write the matching items to `output`.
    ///
    /// An empty or unmatched selection produces an empty archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the hierarchy cannot be listed or the archive
    /// cannot be written.
    pub fn export<S: AsRef<str>, W: Write + Seek>(
        &self,
        selection: &[S],
        output: W,
    ) -> Result<(W, ExportStats)> {
        let targets = self.targets(selection)?;
        debug!(count = targets.len(), "Resolved export targets");
        self.write(&targets, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::MemoryHierarchy;
    use chrono::TimeZone;
    use std::io::Cursor;
    use zip::ZipArchive;

    fn hierarchy() -> MemoryHierarchy {
        MemoryHierarchy::new()
            .with_folder("A")
            .with_item("A/B/job", b"<flow-definition/>")
            .with_item("A/other", b"<project/>")
            .with_item("solo", b"<project/>")
    }

    fn entry_names(bytes: Vec<u8>) -> Vec<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_export_file_name() {
        let now = Utc.with_ymd_and_hms(2025, 12, 11, 1, 42, 36).unwrap()
            + chrono::Duration::milliseconds(25);
        assert_eq!(
            export_file_name(now),
            "job-backup-2025-12-11T01_42_36.025Z.zip"
        );
    }

    #[test]
    fn test_export_folder_prefix() {
        let h = hierarchy();
        let (out, stats) = Exporter::new(&h)
            .export(&["A"], Cursor::new(Vec::new()))
            .unwrap();

        assert_eq!(stats.selected, 3);
        assert_eq!(stats.written, 3);
        assert_eq!(
            entry_names(out.into_inner()),
            vec!["A/config.xml", "A/other/config.xml", "A/B/job/config.xml"]
        );
    }

    #[test]
    fn test_synthetic_prefix_selects_descendants() {
        let h = hierarchy();
        let targets = Exporter::new(&h).targets(&["A/B"]).unwrap();
        let names: Vec<_> = targets.iter().map(|t| t.full_name.as_str()).collect();
        assert_eq!(names, vec!["A/B/job"]);
    }

    #[test]
    fn test_empty_selection_writes_empty_archive() {
        let h = hierarchy();
        let empty: [&str; 0] = [];
        let (out, stats) = Exporter::new(&h)
            .export(&empty, Cursor::new(Vec::new()))
            .unwrap();
        assert_eq!(stats.selected, 0);
        assert!(entry_names(out.into_inner()).is_empty());
    }

    #[test]
    fn test_list_rows_adds_synthetic_folders() {
        let rows = list_rows(&hierarchy()).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["A", "A/B", "A/B/job", "A/other", "solo"]);

        assert!(!rows[0].synthetic);
        assert!(rows[1].synthetic);
        assert!(rows[1].is_container);
    }
}
