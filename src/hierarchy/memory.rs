//! In-memory hierarchy.
//!
//! Used by tests and by embedders that keep their own item store. Capability
//! switches let callers simulate a host without folder support, items that
//! refuse configuration replacement, and parents that refuse new children.

use std::collections::{BTreeMap, HashSet};

use crate::discovery::classify::{FOLDER_ROOT_ELEMENT, classify, kind_label};
use crate::discovery::sniff::root_element_of_bytes;
use crate::hierarchy::name::validate_item_name;
use crate::hierarchy::{Hierarchy, HostError, HostResult};
use crate::model::ItemDescriptor;

/// Key used for the hierarchy root in the non-creatable parent set.
const ROOT_KEY: &str = "";

#[derive(Debug, Clone)]
struct Entry {
    item: ItemDescriptor,
    config: Vec<u8>,
}

/// Ordered in-memory item tree.
#[derive(Debug, Clone)]
pub struct MemoryHierarchy {
    items: BTreeMap<String, Entry>,
    container_type: bool,
    not_updatable: HashSet<String>,
    not_creatable: HashSet<String>,
    persisted: Vec<String>,
}

impl Default for MemoryHierarchy {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            container_type: true,
            not_updatable: HashSet::new(),
            not_creatable: HashSet::new(),
            persisted: Vec::new(),
        }
    }
}

impl MemoryHierarchy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable container creation.
    #[must_use]
    pub fn without_container_type(mut self) -> Self {
        self.container_type = false;
        self
    }

    /// Builder form of [`Self::insert_item`].
    #[must_use]
    pub fn with_item(mut self, full_name: &str, config: &[u8]) -> Self {
        self.insert_item(full_name, config);
        self
    }

    /// Builder form of [`Self::insert_folder`].
    #[must_use]
    pub fn with_folder(mut self, full_name: &str) -> Self {
        self.insert_folder(full_name);
        self
    }

    /// Insert or overwrite an item directly, classifying it from `config`.
    ///
    /// No ancestor checks: callers seeding a fixture decide the shape.
    pub fn insert_item(&mut self, full_name: &str, config: &[u8]) {
        let item = describe(full_name, config);
        self.items.insert(
            full_name.to_string(),
            Entry {
                item,
                config: config.to_vec(),
            },
        );
    }

    /// Insert a folder with a minimal configuration.
    pub fn insert_folder(&mut self, full_name: &str) {
        self.insert_item(full_name, folder_config().as_bytes());
    }

    /// Make `full_name` refuse configuration replacement.
    pub fn mark_not_updatable(&mut self, full_name: &str) {
        self.not_updatable.insert(full_name.to_string());
    }

    /// Make `parent` (`None` = root) refuse new children.
    pub fn mark_not_creatable(&mut self, parent: Option<&str>) {
        self.not_creatable
            .insert(parent.unwrap_or(ROOT_KEY).to_string());
    }

    /// Current configuration of an item.
    #[must_use]
    pub fn config(&self, full_name: &str) -> Option<&[u8]> {
        self.items.get(full_name).map(|e| e.config.as_slice())
    }

    /// Full names passed to [`Hierarchy::persist`], in call order.
    #[must_use]
    pub fn persisted(&self) -> &[String] {
        &self.persisted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn insert_child(
        &mut self,
        parent: Option<&ItemDescriptor>,
        name: &str,
        config: &[u8],
    ) -> HostResult<ItemDescriptor> {
        validate_item_name(name).map_err(|reason| HostError::InvalidName {
            name: name.to_string(),
            reason,
        })?;
        if !self.supports_item_creation(parent) {
            let target = parent.map_or("the root", |p| p.full_name.as_str());
            return Err(HostError::Rejected(format!(
                "Items cannot be created in {target}"
            )));
        }

        let full_name = match parent {
            Some(p) => {
                if !self.items.contains_key(&p.full_name) {
                    return Err(HostError::NotFound {
                        full_name: p.full_name.clone(),
                    });
                }
                format!("{}/{name}", p.full_name)
            }
            None => name.to_string(),
        };
        if self.items.contains_key(&full_name) {
            return Err(HostError::AlreadyExists { full_name });
        }

        self.insert_item(&full_name, config);
        Ok(describe(&full_name, config))
    }
}

impl Hierarchy for MemoryHierarchy {
    fn list_all(&self) -> HostResult<Vec<ItemDescriptor>> {
        Ok(self.items.values().map(|e| e.item.clone()).collect())
    }

    fn get_by_full_name(&self, full_name: &str) -> HostResult<Option<ItemDescriptor>> {
        Ok(self.items.get(full_name).map(|e| e.item.clone()))
    }

    fn read_config_bytes(&self, item: &ItemDescriptor) -> HostResult<Vec<u8>> {
        self.items
            .get(&item.full_name)
            .map(|e| e.config.clone())
            .ok_or_else(|| HostError::NotFound {
                full_name: item.full_name.clone(),
            })
    }

    fn replace_config_bytes(&mut self, item: &ItemDescriptor, bytes: &[u8]) -> HostResult<()> {
        if !self.supports_config_replacement(item) {
            return Err(HostError::Rejected(format!(
                "'{}' does not accept configuration updates",
                item.full_name
            )));
        }
        if !self.items.contains_key(&item.full_name) {
            return Err(HostError::NotFound {
                full_name: item.full_name.clone(),
            });
        }
        self.insert_item(&item.full_name, bytes);
        Ok(())
    }

    fn create_from_config_bytes(
        &mut self,
        parent: Option<&ItemDescriptor>,
        name: &str,
        bytes: &[u8],
    ) -> HostResult<ItemDescriptor> {
        self.insert_child(parent, name, bytes)
    }

    fn create_container(
        &mut self,
        parent: Option<&ItemDescriptor>,
        name: &str,
    ) -> HostResult<ItemDescriptor> {
        if !self.container_type {
            return Err(HostError::ContainerTypeUnavailable);
        }
        self.insert_child(parent, name, folder_config().as_bytes())
    }

    fn persist(&mut self, item: &ItemDescriptor) -> HostResult<()> {
        self.persisted.push(item.full_name.clone());
        Ok(())
    }

    fn supports_container_creation(&self) -> bool {
        self.container_type
    }

    fn supports_config_replacement(&self, item: &ItemDescriptor) -> bool {
        !self.not_updatable.contains(&item.full_name)
    }

    fn supports_item_creation(&self, parent: Option<&ItemDescriptor>) -> bool {
        match parent {
            Some(p) => p.is_container && !self.not_creatable.contains(&p.full_name),
            None => !self.not_creatable.contains(ROOT_KEY),
        }
    }
}

fn describe(full_name: &str, config: &[u8]) -> ItemDescriptor {
    let root = root_element_of_bytes(config).unwrap_or_default();
    let is_container = classify(&root).is_container();
    ItemDescriptor::new(full_name, kind_label(&root, is_container), is_container)
}

fn folder_config() -> String {
    format!("<{FOLDER_ROOT_ELEMENT}/>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_items_are_classified() {
        let h = MemoryHierarchy::new()
            .with_folder("A")
            .with_item("A/job", b"<flow-definition/>");

        let items = h.list_all().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_container);
        assert_eq!(items[1].kind_label, "Pipeline");
        assert_eq!(items[1].parent_full_name.as_deref(), Some("A"));
    }

    #[test]
    fn test_create_requires_existing_parent() {
        let mut h = MemoryHierarchy::new();
        let ghost = ItemDescriptor::new("ghost", "Folder", true);
        assert!(matches!(
            h.create_from_config_bytes(Some(&ghost), "job", b"<project/>"),
            Err(HostError::NotFound { .. })
        ));
    }

    #[test]
    fn test_capability_switches() {
        let mut h = MemoryHierarchy::new()
            .without_container_type()
            .with_item("job", b"<project/>");
        h.mark_not_updatable("job");
        h.mark_not_creatable(None);

        let job = h.get_by_full_name("job").unwrap().unwrap();
        assert!(!h.supports_config_replacement(&job));
        assert!(!h.supports_item_creation(None));
        assert!(matches!(
            h.create_container(None, "A"),
            Err(HostError::ContainerTypeUnavailable)
        ));
        assert!(h.replace_config_bytes(&job, b"<project>2</project>").is_err());
        assert!(h.create_from_config_bytes(None, "other", b"<project/>").is_err());
    }

    #[test]
    fn test_replace_and_persist() {
        let mut h = MemoryHierarchy::new().with_item("job", b"<project/>");
        let job = h.get_by_full_name("job").unwrap().unwrap();

        h.replace_config_bytes(&job, b"<flow-definition/>").unwrap();
        h.persist(&job).unwrap();

        assert_eq!(h.config("job"), Some(&b"<flow-definition/>"[..]));
        assert_eq!(h.persisted(), ["job".to_string()]);
        assert_eq!(h.get_by_full_name("job").unwrap().unwrap().kind_label, "Pipeline");
    }
}
