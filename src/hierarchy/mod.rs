//! Host hierarchy capability set.
//!
//! The live item tree (jobs and folders) belongs to the host instance. The
//! core only talks to it through [`Hierarchy`], passed in explicitly, so the
//! same export/discovery/apply code runs against a Jenkins-home directory
//! ([`FsHierarchy`]) or an in-memory tree ([`MemoryHierarchy`]).
//!
//! # Submodules
//!
//! - [`fs`] - Jenkins-home style directory layout
//! - [`memory`] - In-memory tree for tests and embedders
//! - [`name`] - Item name validation

pub mod fs;
pub mod memory;
pub mod name;

pub use fs::FsHierarchy;
pub use memory::MemoryHierarchy;

use crate::model::ItemDescriptor;

/// Errors reported by hierarchy adapters.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Item not found: {full_name}")]
    NotFound { full_name: String },

    #[error("Item already exists: {full_name}")]
    AlreadyExists { full_name: String },

    #[error("Container type is not available in this instance (folder support missing)")]
    ContainerTypeUnavailable,

    #[error("Invalid item name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("{0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for hierarchy operations.
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Capabilities the core needs from a live item hierarchy.
///
/// `parent: None` always means the hierarchy root.
pub trait Hierarchy {
    /// Enumerate every item, containers included.
    fn list_all(&self) -> HostResult<Vec<ItemDescriptor>>;

    /// Look up an item by full name.
    fn get_by_full_name(&self, full_name: &str) -> HostResult<Option<ItemDescriptor>>;

    /// Raw configuration bytes of an item.
    fn read_config_bytes(&self, item: &ItemDescriptor) -> HostResult<Vec<u8>>;

    /// Replace an existing item's configuration in place.
    fn replace_config_bytes(&mut self, item: &ItemDescriptor, bytes: &[u8]) -> HostResult<()>;

    /// Create a new item named `name` under `parent` from raw configuration.
    fn create_from_config_bytes(
        &mut self,
        parent: Option<&ItemDescriptor>,
        name: &str,
        bytes: &[u8],
    ) -> HostResult<ItemDescriptor>;

    /// Create an empty container named `name` under `parent`.
    ///
    /// Fails with [`HostError::ContainerTypeUnavailable`] when the host has
    /// no container type.
    fn create_container(
        &mut self,
        parent: Option<&ItemDescriptor>,
        name: &str,
    ) -> HostResult<ItemDescriptor>;

    /// Flush an item's metadata.
    fn persist(&mut self, item: &ItemDescriptor) -> HostResult<()>;

    /// Whether the item exposes a readable configuration blob.
    fn is_exportable(&self, _item: &ItemDescriptor) -> bool {
        true
    }

    /// Whether the item's configuration can be replaced in place.
    fn supports_config_replacement(&self, _item: &ItemDescriptor) -> bool {
        true
    }

    /// Whether the host has a container type at all.
    fn supports_container_creation(&self) -> bool {
        true
    }

    /// Whether new items can be created under `parent`.
    fn supports_item_creation(&self, parent: Option<&ItemDescriptor>) -> bool {
        parent.is_none_or(|p| p.is_container)
    }
}
