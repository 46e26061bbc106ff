//! Command implementations.

pub mod completions;
pub mod export;
pub mod import;
pub mod list;
pub mod session;
pub mod version;

use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::{require_home, resolve_home, resolve_sessions_dir};
use crate::error::Result;
use crate::hierarchy::FsHierarchy;
use crate::session::SessionStore;

/// Locations and switches shared by every command.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub home: PathBuf,
    pub sessions_dir: PathBuf,
    pub no_folders: bool,
}

impl Workspace {
    /// Resolve paths from global flags.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let home = resolve_home(cli.home.as_deref())?;
        let sessions_dir = resolve_sessions_dir(cli.sessions_dir.as_deref(), &home);
        Ok(Self {
            home,
            sessions_dir,
            no_folders: cli.no_folders,
        })
    }

    /// The live hierarchy under the home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory does not exist.
    pub fn hierarchy(&self) -> Result<FsHierarchy> {
        require_home(&self.home)?;
        let hierarchy = FsHierarchy::new(&self.home);
        Ok(if self.no_folders {
            hierarchy.without_container_type()
        } else {
            hierarchy
        })
    }

    #[must_use]
    pub fn store(&self) -> SessionStore {
        SessionStore::new(&self.sessions_dir)
    }
}
