//! Create-or-update engine.
//!
//! Targets are processed shallow-first so every ancestor is handled before
//! its descendants. Missing ancestors are created as containers and persisted
//! right away; the item itself is then replaced in place when it exists, or
//! created under its parent when it does not. A failing target is recorded
//! and the batch moves on.
//!
//! There is no rollback: items applied before a failure stay applied.
//! [`ApplyEngine::plan`] computes the same decisions without mutating anything.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::discovery::classify::classify;
use crate::discovery::sniff::root_element_of_bytes;
use crate::hierarchy::name::validate_item_name;
use crate::hierarchy::{Hierarchy, HostError};
use crate::model::{ApplyFailure, ApplyResult, ItemDescriptor};
use crate::namespace::{ancestors, leaf_name};
use crate::selection;

/// Failure key used when the archive held nothing to apply.
pub const EMPTY_ARCHIVE_KEY: &str = "(archive)";

/// Why a single target could not be applied.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("No config.xml files found in the archive")]
    EmptyArchive,

    #[error("No configuration in the archive for '{full_name}'")]
    MissingConfiguration { full_name: String },

    #[error("'{segment}' exists but is not a folder")]
    PathConflict { segment: String },

    #[error("'{full_name}' does not accept configuration updates")]
    NotUpdatable { full_name: String },

    #[error("'{full_name}' is {current}; the archived configuration would make it {incoming}")]
    KindChange {
        full_name: String,
        current: &'static str,
        incoming: &'static str,
    },

    #[error("Parent '{parent}' is not available for new items{}", cause_suffix(.cause.as_deref()))]
    ParentNotCreatable {
        parent: String,
        cause: Option<Box<ApplyError>>,
    },

    #[error("Folder type is not available in this instance")]
    ContainerTypeUnavailable,

    #[error("Invalid item name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Cannot read archived configuration: {0}")]
    Read(#[source] std::io::Error),

    #[error("{0}")]
    Host(#[source] HostError),
}

fn kind_name(folder: bool) -> &'static str {
    if folder { "a folder" } else { "a job" }
}

fn cause_suffix(cause: Option<&ApplyError>) -> String {
    cause.map(|c| format!(" ({})", c.message())).unwrap_or_default()
}

impl ApplyError {
    /// Short kind name used as the message prefix.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EmptyArchive => "EmptyArchive",
            Self::MissingConfiguration { .. } => "MissingConfiguration",
            Self::PathConflict { .. } => "PathConflict",
            Self::NotUpdatable { .. } | Self::KindChange { .. } => "NotUpdatable",
            Self::ParentNotCreatable { .. } => "ParentNotCreatable",
            Self::ContainerTypeUnavailable => "ContainerTypeUnavailable",
            Self::InvalidName { .. } => "InvalidName",
            Self::Read(_) => "ReadError",
            Self::Host(_) => "HostError",
        }
    }

    /// Classified message stored in [`ApplyFailure::error`]: `"<Kind>: <detail>"`.
    #[must_use]
    pub fn message(&self) -> String {
        format!("{}: {self}", self.kind())
    }
}

impl From<HostError> for ApplyError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::ContainerTypeUnavailable => Self::ContainerTypeUnavailable,
            HostError::InvalidName { name, reason } => Self::InvalidName { name, reason },
            other => Self::Host(other),
        }
    }
}

/// What an apply would do to one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanAction {
    Create,
    Update,
    Blocked { reason: String },
}

/// Dry-run decision for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    pub full_name: String,
    #[serde(flatten)]
    pub action: PlanAction,
    /// Ancestor folders this target would create first, root first
    pub creates_folders: Vec<String>,
}

/// Applies archived configurations to a live hierarchy.
pub struct ApplyEngine<'a, H: Hierarchy + ?Sized> {
    hierarchy: &'a mut H,
}

impl<'a, H: Hierarchy + ?Sized> ApplyEngine<'a, H> {
    pub fn new(hierarchy: &'a mut H) -> Self {
        Self { hierarchy }
    }

    /// Apply `selection` using the archived configurations in `configs`.
    ///
    /// Every expanded target lands in exactly one of `applied` or `failures`.
    pub fn apply<S: AsRef<str>>(
        &mut self,
        selection: &[S],
        configs: &BTreeMap<String, PathBuf>,
    ) -> ApplyResult {
        let mut result = ApplyResult::default();

        if configs.is_empty() {
            result.failures.push(ApplyFailure::new(
                EMPTY_ARCHIVE_KEY,
                ApplyError::EmptyArchive.message(),
            ));
            return result;
        }

        let targets = selection::expand(selection, configs.keys());
        for full_name in targets {
            let outcome = match configs.get(&full_name) {
                Some(path) => fs::read(path)
                    .map_err(ApplyError::Read)
                    .and_then(|bytes| self.apply_one(&full_name, &bytes)),
                None => Err(ApplyError::MissingConfiguration {
                    full_name: full_name.clone(),
                }),
            };

            match outcome {
                Ok(_) => result.applied.push(full_name),
                Err(e) => {
                    warn!(%full_name, error = %e, "Apply failed");
                    result.failures.push(ApplyFailure::new(full_name, e.message()));
                }
            }
        }

        info!(
            applied = result.applied_count(),
            failed = result.failures_count(),
            "Apply finished"
        );
        result
    }

    /// Create or update a single item, creating missing ancestor folders first.
    ///
    /// # Errors
    ///
    /// Returns the classified reason the item could not be applied. Ancestor
    /// folders created before the error are kept.
    pub fn apply_one(&mut self, full_name: &str, config: &[u8]) -> Result<ItemDescriptor, ApplyError> {
        let name = leaf_name(full_name);
        validate_item_name(name).map_err(|reason| ApplyError::InvalidName {
            name: name.to_string(),
            reason,
        })?;

        let parent = self.ensure_ancestors(full_name)?;

        if let Some(existing) = self.hierarchy.get_by_full_name(full_name)? {
            check_replaceable(&*self.hierarchy, &existing, config)?;
            self.hierarchy.replace_config_bytes(&existing, config)?;
            self.hierarchy.persist(&existing)?;
            debug!(%full_name, "Updated item");
            return Ok(existing);
        }

        if !self.hierarchy.supports_item_creation(parent.as_ref()) {
            return Err(ApplyError::ParentNotCreatable {
                parent: parent_label(parent.as_ref()),
                cause: None,
            });
        }
        let created = self
            .hierarchy
            .create_from_config_bytes(parent.as_ref(), name, config)?;
        self.hierarchy.persist(&created)?;
        debug!(%full_name, "Created item");
        Ok(created)
    }

    /// Resolve every ancestor of `full_name` to a container, creating the
    /// missing ones root to leaf. Returns the direct parent.
    fn ensure_ancestors(&mut self, full_name: &str) -> Result<Option<ItemDescriptor>, ApplyError> {
        let mut parent: Option<ItemDescriptor> = None;

        for path in ancestors(full_name) {
            match self.hierarchy.get_by_full_name(path)? {
                Some(item) if item.is_container => parent = Some(item),
                Some(_) => {
                    return Err(ApplyError::PathConflict {
                        segment: path.to_string(),
                    });
                }
                None => {
                    let created = self.create_folder(parent.as_ref(), path).map_err(|cause| {
                        ApplyError::ParentNotCreatable {
                            parent: path.to_string(),
                            cause: Some(Box::new(cause)),
                        }
                    })?;
                    parent = Some(created);
                }
            }
        }

        Ok(parent)
    }

    fn create_folder(
        &mut self,
        parent: Option<&ItemDescriptor>,
        path: &str,
    ) -> Result<ItemDescriptor, ApplyError> {
        if !self.hierarchy.supports_item_creation(parent) {
            return Err(ApplyError::ParentNotCreatable {
                parent: parent_label(parent),
                cause: None,
            });
        }
        let created = self.hierarchy.create_container(parent, leaf_name(path))?;
        self.hierarchy.persist(&created)?;
        debug!(folder = %path, "Created missing folder");
        Ok(created)
    }

    /// Dry run of [`Self::apply`]; see [`plan`].
    ///
    /// # Errors
    ///
    /// Returns an error only if a hierarchy lookup fails.
    pub fn plan<S: AsRef<str>>(
        &self,
        selection: &[S],
        configs: &BTreeMap<String, PathBuf>,
    ) -> Result<Vec<PlannedAction>, HostError> {
        plan(&*self.hierarchy, selection, configs)
    }
}

/// Compute what [`ApplyEngine::apply`] would do, without touching the hierarchy.
///
/// Folders planned for creation by earlier targets count as existing for
/// later ones, mirroring the order the real apply runs in.
///
/// # Errors
///
/// Returns an error only if a hierarchy lookup fails.
pub fn plan<H: Hierarchy + ?Sized, S: AsRef<str>>(
    hierarchy: &H,
    selection: &[S],
    configs: &BTreeMap<String, PathBuf>,
) -> Result<Vec<PlannedAction>, HostError> {
    let mut planned: HashMap<String, bool> = HashMap::new();
    let mut out = Vec::new();

    for full_name in selection::expand(selection, configs.keys()) {
        let mut creates_folders = Vec::new();
        let action = match configs.get(&full_name) {
            None => blocked(&ApplyError::MissingConfiguration {
                full_name: full_name.clone(),
            }),
            Some(path) => match fs::read(path) {
                Err(e) => blocked(&ApplyError::Read(e)),
                Ok(bytes) => {
                    plan_one(hierarchy, &full_name, &bytes, &mut planned, &mut creates_folders)?
                }
            },
        };
        out.push(PlannedAction {
            full_name,
            action,
            creates_folders,
        });
    }

    Ok(out)
}

fn plan_one<H: Hierarchy + ?Sized>(
    hierarchy: &H,
    full_name: &str,
    config: &[u8],
    planned: &mut HashMap<String, bool>,
    creates_folders: &mut Vec<String>,
) -> Result<PlanAction, HostError> {
    let name = leaf_name(full_name);
    if let Err(reason) = validate_item_name(name) {
        return Ok(blocked(&ApplyError::InvalidName {
            name: name.to_string(),
            reason,
        }));
    }

    let mut parent: Option<ItemDescriptor> = None;
    let mut parent_is_new = false;
    for path in ancestors(full_name) {
        let live = hierarchy.get_by_full_name(path)?;
        let is_container = match (&live, planned.get(path)) {
            (Some(item), _) => Some(item.is_container),
            (None, Some(c)) => Some(*c),
            (None, None) => None,
        };
        match is_container {
            Some(true) => {
                parent_is_new = live.is_none();
                parent = live;
            }
            Some(false) => {
                return Ok(blocked(&ApplyError::PathConflict {
                    segment: path.to_string(),
                }));
            }
            None => {
                let parent_refuses =
                    !parent_is_new && !hierarchy.supports_item_creation(parent.as_ref());
                let refused = if parent_refuses {
                    Some(ApplyError::ParentNotCreatable {
                        parent: parent_label(parent.as_ref()),
                        cause: None,
                    })
                } else if !hierarchy.supports_container_creation() {
                    Some(ApplyError::ContainerTypeUnavailable)
                } else {
                    None
                };
                if let Some(cause) = refused {
                    return Ok(blocked(&ApplyError::ParentNotCreatable {
                        parent: path.to_string(),
                        cause: Some(Box::new(cause)),
                    }));
                }
                creates_folders.push(path.to_string());
                parent = None;
                parent_is_new = true;
            }
        }
    }

    planned.extend(creates_folders.iter().map(|f| (f.clone(), true)));

    if let Some(existing) = hierarchy.get_by_full_name(full_name)? {
        return Ok(match check_replaceable(hierarchy, &existing, config) {
            Ok(()) => PlanAction::Update,
            Err(e) => blocked(&e),
        });
    }
    if planned.contains_key(full_name) {
        return Ok(PlanAction::Update);
    }

    if !parent_is_new && !hierarchy.supports_item_creation(parent.as_ref()) {
        return Ok(blocked(&ApplyError::ParentNotCreatable {
            parent: parent_label(parent.as_ref()),
            cause: None,
        }));
    }

    let root = root_element_of_bytes(config).unwrap_or_default();
    planned.insert(full_name.to_string(), classify(&root).is_container());
    Ok(PlanAction::Create)
}

/// An existing item takes a new configuration only if the host allows it and
/// the payload keeps it the same kind. A folder turned into a job would
/// strand its children.
fn check_replaceable<H: Hierarchy + ?Sized>(
    hierarchy: &H,
    existing: &ItemDescriptor,
    config: &[u8],
) -> Result<(), ApplyError> {
    if !hierarchy.supports_config_replacement(existing) {
        return Err(ApplyError::NotUpdatable {
            full_name: existing.full_name.clone(),
        });
    }
    let incoming_root = root_element_of_bytes(config).unwrap_or_default();
    let incoming_container = classify(&incoming_root).is_container();
    if incoming_container != existing.is_container {
        return Err(ApplyError::KindChange {
            full_name: existing.full_name.clone(),
            current: kind_name(existing.is_container),
            incoming: kind_name(incoming_container),
        });
    }
    Ok(())
}

fn blocked(err: &ApplyError) -> PlanAction {
    PlanAction::Blocked {
        reason: err.message(),
    }
}

fn parent_label(parent: Option<&ItemDescriptor>) -> String {
    parent.map_or_else(|| "(root)".to_string(), |p| p.full_name.clone())
}
