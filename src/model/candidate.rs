//! Import candidate model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::discovery::classify::{SYNTHETIC_FOLDER_MARKER, kind_label};
use crate::namespace::{depth_of, leaf_name, parent_of};

/// An item found in an extracted archive, or a synthetic folder inferred
/// from the paths of such items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveCandidate {
    /// Full namespace path reconstructed from the archive directory layout
    pub full_name: String,

    /// Parent path, `None` for root-level candidates
    pub parent_full_name: Option<String>,

    /// Extracted configuration file; `None` for synthetic folders
    pub config_path: Option<PathBuf>,

    /// Whether an item with the same full name exists in the live hierarchy
    pub exists: bool,

    /// Container classification from the payload's root element
    pub is_container: bool,

    /// Root element of the payload (e.g. `flow-definition`), empty when unknown
    pub declared_kind: String,

    /// True when the live item's configuration is byte-identical to the archived one
    #[serde(default)]
    pub unchanged: bool,
}

impl ArchiveCandidate {
    /// Synthetic folder for an ancestor path with no archived configuration.
    #[must_use]
    pub fn synthetic_folder(full_name: &str, exists: bool) -> Self {
        Self {
            full_name: full_name.to_string(),
            parent_full_name: parent_of(full_name).map(ToString::to_string),
            config_path: None,
            exists,
            is_container: true,
            declared_kind: SYNTHETIC_FOLDER_MARKER.to_string(),
            unchanged: false,
        }
    }

    /// True for folders inferred from descendant paths.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.config_path.is_none()
    }

    /// Human-readable kind for display.
    #[must_use]
    pub fn kind_label(&self) -> String {
        kind_label(&self.declared_kind, self.is_container)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_folder() {
        let c = ArchiveCandidate::synthetic_folder("A/B", true);
        assert!(c.is_synthetic());
        assert!(c.is_container);
        assert!(c.exists);
        assert_eq!(c.parent_full_name.as_deref(), Some("A"));
        assert_eq!(c.kind_label(), "Folder");
        assert_eq!(c.depth(), 1);
        assert_eq!(c.leaf_name(), "B");
    }
}
