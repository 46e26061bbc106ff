//! Payload classification.
//!
//! Maps the root element of an item's configuration to a [`NodeKind`] and a
//! display label. Only an explicit folder marker makes a node a container;
//! everything else is a leaf or unknown. New kinds are added to the tables
//! below without touching the discovery walk.

use serde::{Deserialize, Serialize};

pub const LABEL_FOLDER: &str = "Folder";
pub const LABEL_PIPELINE: &str = "Pipeline";
pub const LABEL_FREESTYLE: &str = "Freestyle";
pub const LABEL_MAVEN: &str = "Maven";
pub const LABEL_MULTIBRANCH_PIPELINE: &str = "Multibranch Pipeline";
pub const LABEL_ORG_FOLDER: &str = "Organization Folder";
pub const LABEL_JOB: &str = "Job";

/// Marker stored as the declared kind of synthetic folders.
pub const SYNTHETIC_FOLDER_MARKER: &str = "synthetic-folder";

/// Root element written for folders created by the filesystem hierarchy.
pub const FOLDER_ROOT_ELEMENT: &str = "com.cloudbees.hudson.plugins.folder.Folder";

/// Classification of a configuration payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Can hold child items
    Container,
    /// A known job type
    Leaf,
    /// Unrecognized or unreadable payload; treated as a leaf
    Unknown,
}

impl NodeKind {
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Container)
    }
}

/// Exact root elements of known leaf kinds and their labels.
const LEAF_ROOTS: &[(&str, &str)] = &[
    ("flow-definition", LABEL_PIPELINE),
    ("project", LABEL_FREESTYLE),
    ("maven2-moduleset", LABEL_MAVEN),
];

/// Class-name suffixes (lowercase) of known leaf kinds and their labels.
///
/// Serializers emit these either fully qualified or shortened, so matching
/// is on the trailing `.ClassName` part.
const LEAF_CLASS_SUFFIXES: &[(&str, &str)] = &[
    (".workflowmultibranchproject", LABEL_MULTIBRANCH_PIPELINE),
    (".organizationfolder", LABEL_ORG_FOLDER),
];

const CONTAINER_CLASS: &str = "com.cloudbees.hudson.plugins.folder.folder";
const CONTAINER_CLASS_SUFFIX: &str = ".folder";

/// Classify a payload by its root element.
#[must_use]
pub fn classify(root_element: &str) -> NodeKind {
    let root = root_element.trim();
    if root.is_empty() {
        return NodeKind::Unknown;
    }

    let normalized = root.to_lowercase();
    if normalized == CONTAINER_CLASS || normalized.ends_with(CONTAINER_CLASS_SUFFIX) {
        return NodeKind::Container;
    }

    if LEAF_ROOTS.iter().any(|(r, _)| *r == root)
        || LEAF_CLASS_SUFFIXES
            .iter()
            .any(|(suffix, _)| normalized.ends_with(suffix))
    {
        return NodeKind::Leaf;
    }

    NodeKind::Unknown
}

/// Display label for a root element.
///
/// Containers are always `Folder`. Unknown elements fall back to their
/// simple class name so long package names stay out of listings.
#[must_use]
pub fn kind_label(root_element: &str, is_container: bool) -> String {
    if is_container {
        return LABEL_FOLDER.to_string();
    }

    let root = root_element.trim();
    if root.is_empty() {
        return LABEL_JOB.to_string();
    }

    if let Some((_, label)) = LEAF_ROOTS.iter().find(|(r, _)| *r == root) {
        return (*label).to_string();
    }

    let normalized = root.to_lowercase();
    if let Some((_, label)) = LEAF_CLASS_SUFFIXES
        .iter()
        .find(|(suffix, _)| normalized.ends_with(suffix))
    {
        return (*label).to_string();
    }

    simplify(root).to_string()
}

fn simplify(root: &str) -> &str {
    match root.rfind('.') {
        Some(idx) if idx + 1 < root.len() => &root[idx + 1..],
        _ => root,
    }
}
