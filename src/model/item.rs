//! Live hierarchy item model.

use serde::{Deserialize, Serialize};

use crate::discovery::classify::LABEL_FOLDER;
use crate::namespace::{depth_of, leaf_name, parent_of};

/// An item in the live hierarchy, as reported by a [`crate::hierarchy::Hierarchy`].
///
/// Descriptors are read-only snapshots. The core never mutates them; it goes
/// through the hierarchy's create/update calls instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    /// Full namespace path (e.g. `Folder/Sub/job`)
    pub full_name: String,

    /// Full name of the containing folder, `None` for root-level items
    pub parent_full_name: Option<String>,

    /// Human-readable kind (e.g. `Pipeline`, `Folder`)
    pub kind_label: String,

    /// Whether this item can hold children
    pub is_container: bool,
}

impl ItemDescriptor {
    /// Build a descriptor, deriving the parent from the full name.
    pub fn new(full_name: impl Into<String>, kind_label: impl Into<String>, is_container: bool) -> Self {
        let full_name = full_name.into();
        let parent_full_name = parent_of(&full_name).map(ToString::to_string);
        Self {
            full_name,
            parent_full_name,
            kind_label: kind_label.into(),
            is_container,
        }
    }

    /// Last segment of the full name.
    #[must_use]
    pub fn leaf_name(&self) -> &str {
        leaf_name(&self.full_name)
    }
}

/// A row in the export picker.
///
/// Real items plus synthetic folder rows for ancestors that are not items
/// themselves, so every path in the tree can be clicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRow {
    pub full_name: String,
    pub parent_full_name: Option<String>,
    pub kind_label: String,
    pub is_container: bool,
    /// True for rows inferred from a descendant's path
    pub synthetic: bool,
}

impl ItemRow {
    /// Synthetic folder row for an ancestor path.
    #[must_use]
    pub fn folder(full_name: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            parent_full_name: parent_of(full_name).map(ToString::to_string),
            kind_label: LABEL_FOLDER.to_string(),
            is_container: true,
            synthetic: true,
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        depth_of(&self.full_name)
    }

    #[must_use]
    pub fn leaf_name(&self) -> &str {
        leaf_name(&self.full_name)
    }
}

impl From<&ItemDescriptor> for ItemRow {
    fn from(item: &ItemDescriptor) -> Self {
        Self {
            full_name: item.full_name.clone(),
            parent_full_name: item.parent_full_name.clone(),
            kind_label: item.kind_label.clone(),
            is_container: item.is_container,
            synthetic: false,
        }
    }
}
