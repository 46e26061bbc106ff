//! Import candidate discovery.
//!
//! Walks an extracted archive and turns every `config.xml` into an
//! [`ArchiveCandidate`] named after its directory. Missing ancestors become
//! synthetic folder candidates so the preview tree has no holes.
//!
//! # Submodules
//!
//! - [`classify`] - Root element to container/leaf/unknown and display labels
//! - [`sniff`] - Streaming root-element reader
//! - [`hash`] - Content hashing for the `unchanged` flag

pub mod classify;
pub mod hash;
pub mod sniff;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::CONFIG_FILE_NAME;
use crate::error::{Error, Result};
use crate::hierarchy::Hierarchy;
use crate::model::{ArchiveCandidate, ItemDescriptor};
use crate::namespace::{ancestors, compare_hierarchical, parent_of};

use classify::classify;
use hash::{content_hash, has_changed};
use sniff::root_element_of_file;

/// Map every archived full name to its extracted `config.xml`.
///
/// A `config.xml` directly under `root` has no name and is skipped, as is
/// any directory whose path is not valid UTF-8.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked.
pub fn index_configs(root: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut out = BTreeMap::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() || entry.file_name() != CONFIG_FILE_NAME {
            continue;
        }

        let path = entry.path();
        let Some(dir) = path.parent() else {
            continue;
        };
        let Ok(rel) = dir.strip_prefix(root) else {
            continue;
        };

        match full_name_of(rel) {
            Some(name) if name.is_empty() => {
                warn!(path = %path.display(), "Ignoring configuration at archive root");
            }
            Some(name) => {
                out.insert(name, path.to_path_buf());
            }
            None => {
                warn!(path = %path.display(), "Ignoring configuration with non UTF-8 path");
            }
        }
    }

    Ok(out)
}

/// Build the candidate list for an extracted archive.
///
/// Each candidate is classified from its payload, checked for existence in
/// `hierarchy`, and flagged `unchanged` when the live configuration hashes
/// equal to the archived one. Results are in hierarchical order.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or the hierarchy lookup fails.
pub fn discover<H: Hierarchy + ?Sized>(root: &Path, hierarchy: &H) -> Result<Vec<ArchiveCandidate>> {
    let configs = index_configs(root)?;
    let mut candidates: Vec<ArchiveCandidate> = Vec::with_capacity(configs.len());

    for (full_name, config_path) in &configs {
        let declared_kind = root_element_of_file(config_path).unwrap_or_default();
        let is_container = classify(&declared_kind).is_container();
        let live = hierarchy.get_by_full_name(full_name)?;

        let unchanged = match &live {
            Some(item) => is_unchanged(hierarchy, item, config_path),
            None => false,
        };

        debug!(%full_name, kind = %declared_kind, exists = live.is_some(), "Discovered candidate");
        candidates.push(ArchiveCandidate {
            full_name: full_name.clone(),
            parent_full_name: parent_of(full_name).map(ToString::to_string),
            config_path: Some(config_path.clone()),
            exists: live.is_some(),
            is_container,
            declared_kind,
            unchanged,
        });
    }

    let missing: BTreeSet<String> = configs
        .keys()
        .flat_map(|name| ancestors(name))
        .filter(|a| !configs.contains_key(*a))
        .map(ToString::to_string)
        .collect();

    for ancestor in missing {
        let exists = hierarchy.get_by_full_name(&ancestor)?.is_some();
        candidates.push(ArchiveCandidate::synthetic_folder(&ancestor, exists));
    }

    candidates.sort_by(|a, b| {
        compare_hierarchical(
            (a.full_name.as_str(), a.is_container),
            (b.full_name.as_str(), b.is_container),
        )
    });

    Ok(candidates)
}

fn is_unchanged<H: Hierarchy + ?Sized>(
    hierarchy: &H,
    item: &ItemDescriptor,
    config_path: &Path,
) -> bool {
    let Ok(archived) = fs::read(config_path) else {
        return false;
    };
    let live = hierarchy.read_config_bytes(item).ok().map(|b| content_hash(&b));
    !has_changed(&content_hash(&archived), live.as_deref())
}

/// Join the normal components of a relative path with `/`.
fn full_name_of(rel: &Path) -> Option<String> {
    let mut segments = Vec::new();
    for component in rel.components() {
        if let Component::Normal(part) = component {
            segments.push(part.to_str()?);
        }
    }
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::MemoryHierarchy;
    use tempfile::TempDir;

    fn write_config(root: &Path, rel: &str, content: &str) {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(CONFIG_FILE_NAME), content).unwrap();
    }

    #[test]
    fn test_index_configs_skips_root_config() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "<project/>").unwrap();
        write_config(temp.path(), "A/job", "<project/>");
        fs::write(temp.path().join("A").join("notes.txt"), "x").unwrap();

        let index = index_configs(temp.path()).unwrap();
        let names: Vec<_> = index.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["A/job"]);
    }

    #[test]
    fn test_discover_adds_synthetic_ancestors() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "A/B/job", "<flow-definition/>");
        write_config(temp.path(), "solo", "<project/>");

        let hierarchy = MemoryHierarchy::new().with_folder("A");
        let candidates = discover(temp.path(), &hierarchy).unwrap();

        let names: Vec<_> = candidates.iter().map(|c| c.full_name.as_str()).collect();
        assert_eq!(names, vec!["A", "A/B", "A/B/job", "solo"]);

        assert!(candidates[0].is_synthetic());
        assert!(candidates[0].exists);
        assert!(candidates[1].is_synthetic());
        assert!(!candidates[1].exists);
        assert!(!candidates[2].is_container);
        assert_eq!(candidates[2].kind_label(), "Pipeline");
    }

    #[test]
    fn test_container_comes_from_payload_not_path() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "F",
            "<com.cloudbees.hudson.plugins.folder.Folder plugin=\"cloudbees-folder\"/>",
        );
        write_config(temp.path(), "F/job", "<project/>");
        write_config(temp.path(), "leafy", "plain text, no markup");

        let candidates = discover(temp.path(), &MemoryHierarchy::new()).unwrap();
        let folder = candidates.iter().find(|c| c.full_name == "F").unwrap();
        assert!(folder.is_container);
        assert!(!folder.is_synthetic());

        let broken = candidates.iter().find(|c| c.full_name == "leafy").unwrap();
        assert!(!broken.is_container);
        assert_eq!(broken.declared_kind, "");
    }

    #[test]
    fn test_unchanged_flag() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "same", "<project/>");
        write_config(temp.path(), "diff", "<project>new</project>");

        let hierarchy = MemoryHierarchy::new()
            .with_item("same", b"<project/>")
            .with_item("diff", b"<project>old</project>");
        let candidates = discover(temp.path(), &hierarchy).unwrap();

        let same = candidates.iter().find(|c| c.full_name == "same").unwrap();
        let diff = candidates.iter().find(|c| c.full_name == "diff").unwrap();
        assert!(same.exists && same.unchanged);
        assert!(diff.exists && !diff.unchanged);
    }

    #[test]
    fn test_discover_empty_tree() {
        let temp = TempDir::new().unwrap();
        assert!(discover(temp.path(), &MemoryHierarchy::new()).unwrap().is_empty());
    }
}
