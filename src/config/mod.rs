//! Path resolution.
//!
//! Two locations matter:
//! - **Home**: the instance home whose `jobs/` tree is exported from and
//!   applied into.
//! - **Sessions dir**: where import sessions live, by default
//!   `<home>/job-backup/import`.
//!
//! Both follow the same priority chain: explicit CLI flag (which clap also
//! fills from `JOB_BACKUP_HOME` / `JOB_BACKUP_SESSIONS_DIR`), then the
//! host's own environment, then a default.

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};

/// Environment variable read by `--home`.
pub const HOME_ENV: &str = "JOB_BACKUP_HOME";

/// Environment variable read by `--sessions-dir`.
pub const SESSIONS_DIR_ENV: &str = "JOB_BACKUP_SESSIONS_DIR";

/// Home variable of the host instance itself.
pub const HOST_HOME_ENV: &str = "JENKINS_HOME";

/// Default sessions location relative to the home.
const SESSIONS_SUBDIR: [&str; 2] = ["job-backup", "import"];

/// Default home when nothing else is configured: `~/.jenkins`.
#[must_use]
pub fn default_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".jenkins"))
}

/// Resolve the instance home.
///
/// Priority:
/// 1. Explicit `--home` flag (or `JOB_BACKUP_HOME`)
/// 2. `JENKINS_HOME` environment variable
/// 3. `~/.jenkins`
///
/// # Errors
///
/// Returns [`Error::Config`] if no location can be determined.
pub fn resolve_home(explicit: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: Explicit path from CLI flag
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    // Priority 2: the host's own home variable
    if let Ok(home) = std::env::var(HOST_HOME_ENV) {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    // Priority 3: default location
    default_home().ok_or_else(|| {
        Error::Config("cannot determine a home directory; pass --home".to_string())
    })
}

/// Resolve the import sessions directory for `home`.
///
/// Priority:
/// 1. Explicit `--sessions-dir` flag (or `JOB_BACKUP_SESSIONS_DIR`)
/// 2. `<home>/job-backup/import`
#[must_use]
pub fn resolve_sessions_dir(explicit: Option<&Path>, home: &Path) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => SESSIONS_SUBDIR.iter().fold(home.to_path_buf(), |p, s| p.join(s)),
    }
}

/// Fail unless `home` is an existing directory.
///
/// # Errors
///
/// Returns [`Error::Config`] when the directory is missing.
pub fn require_home(home: &Path) -> Result<()> {
    if home.is_dir() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "home directory does not exist: {}",
            home.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_home_with_explicit() {
        let explicit = PathBuf::from("/custom/jenkins");
        assert_eq!(resolve_home(Some(&explicit)).unwrap(), explicit);
    }

    #[test]
    fn test_default_home_returns_some() {
        let home = default_home().unwrap();
        assert!(home.ends_with(".jenkins"));
    }

    #[test]
    fn test_resolve_sessions_dir() {
        let home = PathBuf::from("/var/jenkins");
        assert_eq!(
            resolve_sessions_dir(None, &home),
            PathBuf::from("/var/jenkins/job-backup/import")
        );

        let explicit = PathBuf::from("/tmp/sessions");
        assert_eq!(resolve_sessions_dir(Some(&explicit), &home), explicit);
    }

    #[test]
    fn test_require_home() {
        let temp = TempDir::new().unwrap();
        assert!(require_home(temp.path()).is_ok());
        assert!(matches!(
            require_home(&temp.path().join("missing")),
            Err(Error::Config(_))
        ));
    }
}
