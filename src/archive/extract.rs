//! Zip-slip-safe extraction.
//!
//! Every entry is checked before anything is written for it:
//!
//! 1. Names starting with `/` or `\`, or containing a `..` segment, are
//!    rejected as [`ExtractError::UnsafeEntry`].
//! 2. The target, joined to the canonical destination and resolved through
//!    whatever part of it already exists on disk, must stay inside the
//!    destination, otherwise [`ExtractError::PathEscape`]. This catches
//!    symlinks already present under the destination.
//!
//! Extraction stops at the first bad entry. Entries already written stay on
//! disk; the caller owns the destination and removes it on failure.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

/// Errors raised while extracting an archive.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsafe archive entry: {name}")]
    UnsafeEntry { name: String },

    #[error("Archive entry escapes the destination: {name}")]
    PathEscape { name: String },

    #[error("Invalid archive: {0}")]
    Archive(#[from] ZipError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Counters for a completed extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub directories: usize,
    pub files: usize,
    pub bytes: u64,
}

/// Extract an in-memory archive into `destination`.
///
/// # Errors
///
/// Returns an error on the first unsafe entry, or if the archive is
/// malformed or cannot be written.
pub fn extract(archive_bytes: &[u8], destination: &Path) -> Result<ExtractStats, ExtractError> {
    extract_from(Cursor::new(archive_bytes), destination)
}

/// Extract an archive file into `destination`.
///
/// # Errors
///
/// Same as [`extract`], plus failure to open `path`.
pub fn extract_file(path: &Path, destination: &Path) -> Result<ExtractStats, ExtractError> {
    extract_from(File::open(path)?, destination)
}

fn extract_from<R: Read + Seek>(reader: R, destination: &Path) -> Result<ExtractStats, ExtractError> {
    let mut archive = ZipArchive::new(reader)?;

    fs::create_dir_all(destination)?;
    let dest_real = destination.canonicalize()?;
    let mut stats = ExtractStats::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        if is_unsafe_name(&name) {
            warn!(entry = %name, "Rejected unsafe archive entry");
            return Err(ExtractError::UnsafeEntry { name });
        }

        let target = normalize(&dest_real.join(&name));
        let is_dir = entry.is_dir();
        let contained =
            target.starts_with(&dest_real) && resolve_existing(&target)?.starts_with(&dest_real);
        if !contained {
            warn!(entry = %name, "Rejected archive entry outside destination");
            return Err(ExtractError::PathEscape { name });
        }

        if is_dir {
            fs::create_dir_all(&target)?;
            stats.directories += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        let written = io::copy(&mut entry, &mut out)?;
        stats.files += 1;
        stats.bytes += written;
        debug!(entry = %name, bytes = written, "Extracted entry");
    }

    Ok(stats)
}

/// Absolute-looking names and any `..` segment, with either separator.
fn is_unsafe_name(name: &str) -> bool {
    name.starts_with('/')
        || name.starts_with('\\')
        || name.split(['/', '\\']).any(|segment| segment == "..")
}

/// Canonical path of the deepest part of `path` that exists.
///
/// A dangling symlink counts as existing and resolves to where it points.
fn resolve_existing(path: &Path) -> io::Result<PathBuf> {
    let mut current = path;
    loop {
        match current.canonicalize() {
            Ok(real) => return Ok(real),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let parent = current.parent();
                if let Ok(link) = fs::read_link(current) {
                    let base = parent.unwrap_or(current);
                    return resolve_existing(&normalize(&base.join(link)));
                }
                match parent {
                    Some(parent) => current = parent,
                    None => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content).unwrap();
            }
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extract_nested_entries() {
        let temp = TempDir::new().unwrap();
        let bytes = build_zip(&[
            ("A/", b""),
            ("A/config.xml", b"<folder/>"),
            ("A/job/config.xml", b"<project/>"),
        ]);

        let stats = extract(&bytes, temp.path()).unwrap();
        assert_eq!(stats.directories, 1);
        assert_eq!(stats.files, 2);
        assert_eq!(stats.bytes, 19);
        assert_eq!(
            fs::read(temp.path().join("A/job/config.xml")).unwrap(),
            b"<project/>"
        );
    }

    #[test]
    fn test_rejects_parent_traversal() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dest");
        let bytes = build_zip(&[("ok/config.xml", b"<project/>"), ("../evil.txt", b"x")]);

        let err = extract(&bytes, &dest).unwrap_err();
        assert!(matches!(err, ExtractError::UnsafeEntry { ref name } if name == "../evil.txt"));
        assert!(!temp.path().join("evil.txt").exists());
        // Entries before the offending one stay for the caller to clean up.
        assert!(dest.join("ok/config.xml").exists());
    }

    #[test]
    fn test_rejects_absolute_names() {
        let temp = TempDir::new().unwrap();
        let bytes = build_zip(&[("/etc/passwd", b"root")]);
        assert!(matches!(
            extract(&bytes, temp.path()),
            Err(ExtractError::UnsafeEntry { .. })
        ));

        let bytes = build_zip(&[("\\windows\\evil", b"x")]);
        assert!(matches!(
            extract(&bytes, temp.path()),
            Err(ExtractError::UnsafeEntry { .. })
        ));
    }

    #[test]
    fn test_rejects_backslash_traversal() {
        let temp = TempDir::new().unwrap();
        let bytes = build_zip(&[("a\\..\\..\\evil", b"x")]);
        assert!(matches!(
            extract(&bytes, temp.path()),
            Err(ExtractError::UnsafeEntry { .. })
        ));
    }

    #[test]
    fn test_later_entries_not_written_after_rejection() {
        let temp = TempDir::new().unwrap();
        let bytes = build_zip(&[("../evil.txt", b"x"), ("after/config.xml", b"<project/>")]);

        assert!(extract(&bytes, temp.path()).is_err());
        assert!(!temp.path().join("after").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_entries_through_existing_symlinks() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dest");
        let outside = temp.path().join("outside");
        fs::create_dir_all(&dest).unwrap();
        fs::create_dir_all(&outside).unwrap();
        symlink(&outside, dest.join("link")).unwrap();
        symlink(outside.join("target.xml"), dest.join("file-link")).unwrap();

        let bytes = build_zip(&[("link/sub/config.xml", b"<project/>")]);
        let err = extract(&bytes, &dest).unwrap_err();
        assert!(matches!(err, ExtractError::PathEscape { ref name } if name == "link/sub/config.xml"));
        assert!(!outside.join("sub").exists());

        let bytes = build_zip(&[("link/", b"")]);
        assert!(matches!(
            extract(&bytes, &dest),
            Err(ExtractError::PathEscape { .. })
        ));

        let bytes = build_zip(&[("file-link", b"x")]);
        assert!(matches!(
            extract(&bytes, &dest),
            Err(ExtractError::PathEscape { .. })
        ));
        assert!(!outside.join("target.xml").exists());
    }

    #[test]
    fn test_not_a_zip() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            extract(b"definitely not a zip", temp.path()),
            Err(ExtractError::Archive(_))
        ));
    }

    #[test]
    fn test_dot_segments_stay_inside() {
        let temp = TempDir::new().unwrap();
        let bytes = build_zip(&[("./A/./config.xml", b"<project/>")]);
        extract(&bytes, temp.path()).unwrap();
        assert!(temp.path().join("A/config.xml").exists());
    }

    #[test]
    fn test_extract_file() {
        let temp = TempDir::new().unwrap();
        let zip_path = temp.path().join("upload.zip");
        fs::write(&zip_path, build_zip(&[("job/config.xml", b"<project/>")])).unwrap();

        let stats = extract_file(&zip_path, &temp.path().join("out")).unwrap();
        assert_eq!(stats.files, 1);
    }
}
