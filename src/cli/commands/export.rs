//! Export command implementation.

use std::fs::{self, File};
use std::io::{BufWriter, IntoInnerError};
use std::path::{Path, PathBuf};

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use crate::cli::commands::Workspace;
use crate::error::{Error, Result};
use crate::export::{ExportStats, Exporter, export_file_name};
use crate::hierarchy::FsHierarchy;
use crate::model::ItemDescriptor;

#[derive(Serialize)]
struct ExportOutput {
    path: String,
    #[serde(flatten)]
    stats: ExportStats,
}

/// Export the selection to a zip archive.
///
/// # Errors
///
/// Returns [`Error::NothingSelected`] when the selection matches no
/// exportable item, or an error if the archive cannot be written.
pub fn execute(
    workspace: &Workspace,
    selection: &[String],
    output: Option<&PathBuf>,
    out_dir: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let hierarchy = workspace.hierarchy()?;
    let exporter = Exporter::new(&hierarchy);

    let targets = exporter.targets(selection)?;
    if targets.is_empty() {
        return Err(Error::NothingSelected);
    }

    let path = match (output, out_dir) {
        (Some(path), _) => path.clone(),
        (None, Some(dir)) => dir.join(export_file_name(Utc::now())),
        (None, None) => PathBuf::from(export_file_name(Utc::now())),
    };
    debug!(path = %path.display(), count = targets.len(), "Writing export");

    let stats = write_to(&exporter, &targets, &path)?;

    if json {
        let output = ExportOutput {
            path: path.display().to_string(),
            stats,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "{} Exported {} item(s) to {}",
            "✓".green(),
            stats.written,
            path.display()
        );
        if stats.skipped > 0 {
            println!(
                "  {}",
                format!("{} item(s) skipped (unreadable configuration)", stats.skipped).yellow()
            );
        }
    }

    Ok(())
}

/// Write into a sibling temp file and rename it into place, so a failed
/// export never leaves a truncated archive at `path`.
fn write_to(
    exporter: &Exporter<'_, FsHierarchy>,
    targets: &[ItemDescriptor],
    path: &Path,
) -> Result<ExportStats> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp = path.with_extension("zip.tmp");
    let written = File::create(&temp).map_err(Error::from).and_then(|file| {
        let (writer, stats) = exporter.write(targets, BufWriter::new(file))?;
        writer
            .into_inner()
            .map_err(IntoInnerError::into_error)?
            .sync_all()?;
        Ok(stats)
    });

    match written {
        Ok(stats) => {
            fs::rename(&temp, path)?;
            Ok(stats)
        }
        Err(e) => {
            let _ = fs::remove_file(&temp);
            Err(e)
        }
    }
}
