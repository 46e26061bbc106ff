//! Jenkins-home style hierarchy on disk.
//!
//! Layout:
//!
//! ```text
//! <home>/jobs/<name>/config.xml             root-level item
//! <home>/jobs/<folder>/jobs/<name>/config.xml   item inside a folder
//! ```
//!
//! Whether an item is a folder is decided by sniffing its `config.xml` root
//! element with the same classifier the import preview uses.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::CONFIG_FILE_NAME;
use crate::discovery::classify::{FOLDER_ROOT_ELEMENT, classify, kind_label};
use crate::discovery::sniff::{root_element_of_bytes, root_element_of_file};
use crate::file::atomic_write;
use crate::hierarchy::name::{validate_full_name, validate_item_name};
use crate::hierarchy::{Hierarchy, HostError, HostResult};
use crate::model::ItemDescriptor;

/// Directory holding child items, both at the root and inside folders.
const JOBS_DIR: &str = "jobs";

/// Hierarchy rooted at a Jenkins-home style directory.
#[derive(Debug, Clone)]
pub struct FsHierarchy {
    home: PathBuf,
    container_type: bool,
}

impl FsHierarchy {
    /// Open a hierarchy at `home`. The directory does not need a `jobs/`
    /// subdirectory yet; it is created on first write.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            container_type: true,
        }
    }

    /// Pretend the folder type is not installed; container creation fails.
    #[must_use]
    pub fn without_container_type(mut self) -> Self {
        self.container_type = false;
        self
    }

    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Directory of an item. Callers validate `full_name` first.
    fn item_dir(&self, full_name: &str) -> PathBuf {
        let mut dir = self.home.join(JOBS_DIR);
        for (i, segment) in full_name.split('/').enumerate() {
            if i > 0 {
                dir.push(JOBS_DIR);
            }
            dir.push(segment);
        }
        dir
    }

    /// Directory that holds children of `parent` (or root-level items).
    fn children_dir(&self, parent: Option<&ItemDescriptor>) -> PathBuf {
        match parent {
            Some(p) => self.item_dir(&p.full_name).join(JOBS_DIR),
            None => self.home.join(JOBS_DIR),
        }
    }

    fn child_full_name(parent: Option<&ItemDescriptor>, name: &str) -> String {
        match parent {
            Some(p) => format!("{}/{name}", p.full_name),
            None => name.to_string(),
        }
    }

    fn describe(full_name: &str, dir: &Path) -> Option<ItemDescriptor> {
        let config = dir.join(CONFIG_FILE_NAME);
        if !config.is_file() {
            return None;
        }
        let root = root_element_of_file(&config).unwrap_or_default();
        let is_container = classify(&root).is_container();
        Some(ItemDescriptor::new(
            full_name,
            kind_label(&root, is_container),
            is_container,
        ))
    }

    fn walk(&self, jobs_dir: &Path, prefix: Option<&str>, out: &mut Vec<ItemDescriptor>) -> HostResult<()> {
        let entries = match fs::read_dir(jobs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut dirs: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort();

        for dir in dirs {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if validate_item_name(name).is_err() {
                debug!(path = %dir.display(), "Skipping directory with unusable item name");
                continue;
            }
            let full_name = match prefix {
                Some(p) => format!("{p}/{name}"),
                None => name.to_string(),
            };
            let Some(item) = Self::describe(&full_name, &dir) else {
                continue;
            };
            let recurse = item.is_container;
            out.push(item);
            if recurse {
                self.walk(&dir.join(JOBS_DIR), Some(&full_name), out)?;
            }
        }

        Ok(())
    }

    fn check_new_name(parent: Option<&ItemDescriptor>, name: &str) -> HostResult<String> {
        validate_item_name(name).map_err(|reason| HostError::InvalidName {
            name: name.to_string(),
            reason,
        })?;
        if let Some(p) = parent.filter(|p| !p.is_container) {
            return Err(HostError::Rejected(format!(
                "'{}' is not a folder and cannot hold items",
                p.full_name
            )));
        }
        Ok(Self::child_full_name(parent, name))
    }
}

impl Hierarchy for FsHierarchy {
    fn list_all(&self) -> HostResult<Vec<ItemDescriptor>> {
        let mut out = Vec::new();
        self.walk(&self.home.join(JOBS_DIR), None, &mut out)?;
        Ok(out)
    }

    fn get_by_full_name(&self, full_name: &str) -> HostResult<Option<ItemDescriptor>> {
        if validate_full_name(full_name).is_err() {
            return Ok(None);
        }
        Ok(Self::describe(full_name, &self.item_dir(full_name)))
    }

    fn read_config_bytes(&self, item: &ItemDescriptor) -> HostResult<Vec<u8>> {
        let path = self.item_dir(&item.full_name).join(CONFIG_FILE_NAME);
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => HostError::NotFound {
                full_name: item.full_name.clone(),
            },
            _ => HostError::Io(e),
        })
    }

    fn replace_config_bytes(&mut self, item: &ItemDescriptor, bytes: &[u8]) -> HostResult<()> {
        let dir = self.item_dir(&item.full_name);
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Err(HostError::NotFound {
                full_name: item.full_name.clone(),
            });
        }

        // The on-disk layout differs between folders and jobs.
        let current = root_element_of_file(&path).unwrap_or_default();
        let incoming = root_element_of_bytes(bytes).unwrap_or_default();
        if classify(&current).is_container() != classify(&incoming).is_container() {
            return Err(HostError::Rejected(format!(
                "'{}' cannot change between folder and job",
                item.full_name
            )));
        }

        atomic_write(&path, bytes)?;
        Ok(())
    }

    fn create_from_config_bytes(
        &mut self,
        parent: Option<&ItemDescriptor>,
        name: &str,
        bytes: &[u8],
    ) -> HostResult<ItemDescriptor> {
        let full_name = Self::check_new_name(parent, name)?;
        let dir = self.children_dir(parent).join(name);
        if dir.join(CONFIG_FILE_NAME).exists() {
            return Err(HostError::AlreadyExists { full_name });
        }

        fs::create_dir_all(&dir)?;
        atomic_write(&dir.join(CONFIG_FILE_NAME), bytes)?;

        let root = root_element_of_bytes(bytes).unwrap_or_default();
        let is_container = classify(&root).is_container();
        if is_container {
            fs::create_dir_all(dir.join(JOBS_DIR))?;
        }

        debug!(%full_name, "Created item");
        Ok(ItemDescriptor::new(
            full_name,
            kind_label(&root, is_container),
            is_container,
        ))
    }

    fn create_container(
        &mut self,
        parent: Option<&ItemDescriptor>,
        name: &str,
    ) -> HostResult<ItemDescriptor> {
        if !self.container_type {
            return Err(HostError::ContainerTypeUnavailable);
        }
        let full_name = Self::check_new_name(parent, name)?;
        let dir = self.children_dir(parent).join(name);
        if dir.join(CONFIG_FILE_NAME).exists() {
            return Err(HostError::AlreadyExists { full_name });
        }

        fs::create_dir_all(dir.join(JOBS_DIR))?;
        atomic_write(&dir.join(CONFIG_FILE_NAME), folder_config().as_bytes())?;

        debug!(%full_name, "Created folder");
        Ok(ItemDescriptor::new(
            full_name,
            kind_label(FOLDER_ROOT_ELEMENT, true),
            true,
        ))
    }

    fn persist(&mut self, item: &ItemDescriptor) -> HostResult<()> {
        let path = self.item_dir(&item.full_name).join(CONFIG_FILE_NAME);
        File::open(&path)?.sync_all()?;
        Ok(())
    }

    fn supports_container_creation(&self) -> bool {
        self.container_type
    }

    fn is_exportable(&self, item: &ItemDescriptor) -> bool {
        self.item_dir(&item.full_name)
            .join(CONFIG_FILE_NAME)
            .is_file()
    }
}

/// Configuration written for folders created to complete a path.
fn folder_config() -> String {
    format!(
        "<?xml version='1.1' encoding='UTF-8'?>\n\
         <{FOLDER_ROOT_ELEMENT}>\n  \
         <description></description>\n  \
         <properties/>\n  \
         <folderViews/>\n  \
         <healthMetrics/>\n\
         </{FOLDER_ROOT_ELEMENT}>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PIPELINE: &[u8] = b"<?xml version='1.1'?>\n<flow-definition plugin=\"workflow-job\"/>";

    fn write_item(home: &Path, rel: &str, content: &str) {
        let dir = home.join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(CONFIG_FILE_NAME), content).unwrap();
    }

    #[test]
    fn test_list_all_walks_folders() {
        let temp = TempDir::new().unwrap();
        write_item(temp.path(), "jobs/A", &folder_config());
        write_item(temp.path(), "jobs/A/jobs/build", "<flow-definition/>");
        write_item(temp.path(), "jobs/solo", "<project/>");
        // Not an item: no config.xml
        fs::create_dir_all(temp.path().join("jobs/empty")).unwrap();

        let h = FsHierarchy::new(temp.path());
        let items = h.list_all().unwrap();
        let names: Vec<_> = items.iter().map(|i| i.full_name.as_str()).collect();
        assert_eq!(names, vec!["A", "A/build", "solo"]);

        assert!(items[0].is_container);
        assert_eq!(items[0].kind_label, "Folder");
        assert_eq!(items[1].kind_label, "Pipeline");
        assert_eq!(items[1].parent_full_name.as_deref(), Some("A"));
    }

    #[test]
    fn test_list_all_on_empty_home() {
        let temp = TempDir::new().unwrap();
        let h = FsHierarchy::new(temp.path());
        assert!(h.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_get_by_full_name_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        write_item(temp.path(), "jobs/solo", "<project/>");
        let h = FsHierarchy::new(temp.path());

        assert!(h.get_by_full_name("solo").unwrap().is_some());
        assert!(h.get_by_full_name("../jobs/solo").unwrap().is_none());
        assert!(h.get_by_full_name("missing").unwrap().is_none());
    }

    #[test]
    fn test_create_container_then_leaf() {
        let temp = TempDir::new().unwrap();
        let mut h = FsHierarchy::new(temp.path());

        let folder = h.create_container(None, "A").unwrap();
        assert!(folder.is_container);
        let job = h
            .create_from_config_bytes(Some(&folder), "build", PIPELINE)
            .unwrap();
        assert_eq!(job.full_name, "A/build");
        assert!(!job.is_container);
        h.persist(&job).unwrap();

        assert!(temp.path().join("jobs/A/jobs/build/config.xml").is_file());
        assert_eq!(h.read_config_bytes(&job).unwrap(), PIPELINE);
    }

    #[test]
    fn test_create_refuses_duplicates_and_bad_names() {
        let temp = TempDir::new().unwrap();
        let mut h = FsHierarchy::new(temp.path());
        h.create_from_config_bytes(None, "job", PIPELINE).unwrap();

        assert!(matches!(
            h.create_from_config_bytes(None, "job", PIPELINE),
            Err(HostError::AlreadyExists { .. })
        ));
        assert!(matches!(
            h.create_from_config_bytes(None, "..", PIPELINE),
            Err(HostError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_create_under_leaf_is_rejected() {
        let temp = TempDir::new().unwrap();
        let mut h = FsHierarchy::new(temp.path());
        let job = h.create_from_config_bytes(None, "job", PIPELINE).unwrap();

        assert!(!h.supports_item_creation(Some(&job)));
        assert!(matches!(
            h.create_from_config_bytes(Some(&job), "child", PIPELINE),
            Err(HostError::Rejected(_))
        ));
    }

    #[test]
    fn test_container_type_unavailable() {
        let temp = TempDir::new().unwrap();
        let mut h = FsHierarchy::new(temp.path()).without_container_type();
        assert!(matches!(
            h.create_container(None, "A"),
            Err(HostError::ContainerTypeUnavailable)
        ));
    }

    #[test]
    fn test_replace_config_bytes() {
        let temp = TempDir::new().unwrap();
        let mut h = FsHierarchy::new(temp.path());
        let job = h.create_from_config_bytes(None, "job", PIPELINE).unwrap();

        h.replace_config_bytes(&job, b"<project/>").unwrap();
        assert_eq!(h.read_config_bytes(&job).unwrap(), b"<project/>");
        let reloaded = h.get_by_full_name("job").unwrap().unwrap();
        assert_eq!(reloaded.kind_label, "Freestyle");

        let ghost = ItemDescriptor::new("ghost", "Job", false);
        assert!(matches!(
            h.replace_config_bytes(&ghost, b"<project/>"),
            Err(HostError::NotFound { .. })
        ));
    }

    #[test]
    fn test_replace_refuses_kind_change() {
        let temp = TempDir::new().unwrap();
        let mut h = FsHierarchy::new(temp.path());
        let folder = h.create_container(None, "team").unwrap();
        h.create_from_config_bytes(Some(&folder), "build", PIPELINE).unwrap();
        let before = h.read_config_bytes(&folder).unwrap();

        assert!(matches!(
            h.replace_config_bytes(&folder, b"<project/>"),
            Err(HostError::Rejected(_))
        ));
        assert_eq!(h.read_config_bytes(&folder).unwrap(), before);
        assert!(h.get_by_full_name("team/build").unwrap().is_some());

        let job = h.create_from_config_bytes(None, "job", PIPELINE).unwrap();
        assert!(matches!(
            h.replace_config_bytes(&job, folder_config().as_bytes()),
            Err(HostError::Rejected(_))
        ));
        assert!(!h.get_by_full_name("job").unwrap().unwrap().is_container);
    }
}
