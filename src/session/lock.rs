//! Per-session apply lock.
//!
//! A lock is an `apply.lock` file created with `create_new`, so at most one
//! holder exists per session across processes. The file holds the holder's
//! pid and is removed when the guard drops.
//!
//! A process that dies mid-apply never drops its guard. Such a lock is stale
//! once its pid is gone (where that can be checked) or it is older than
//! [`STALE_AFTER`], and the next `acquire` clears it.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::{Error, Result};

pub(crate) const LOCK_FILE: &str = "apply.lock";

/// Age after which a lock is treated as abandoned (2 hours).
pub const STALE_AFTER: Duration = Duration::from_secs(2 * 60 * 60);

/// RAII guard for a session's apply lock.
#[derive(Debug)]
pub struct SessionLock {
    path: PathBuf,
}

impl SessionLock {
    /// Take the lock in `session_dir`, clearing a stale one first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionBusy`] if a live holder has the lock, or an
    /// I/O error if the lock file cannot be created.
    pub(crate) fn acquire(session_dir: &Path, id: &str) -> Result<Self> {
        let path = session_dir.join(LOCK_FILE);
        let mut file = match create(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !clear_if_stale(&path) {
                    return Err(Error::SessionBusy { id: id.to_string() });
                }
                match create(&path) {
                    Ok(file) => file,
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        return Err(Error::SessionBusy { id: id.to_string() });
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        debug!(session = %id, "Acquired apply lock");
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            // Deleting a session removes the lock together with its directory.
            Err(e) if e.kind() != ErrorKind::NotFound => {
                warn!(path = %self.path.display(), error = %e, "Failed to release apply lock");
            }
            _ => {}
        }
    }
}

fn create(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Remove the lock at `path` if its holder is gone.
///
/// Returns `true` when no lock remains afterwards.
fn clear_if_stale(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return !path.exists();
    };
    let holder = contents.trim().parse::<u32>().ok();

    let exited = holder.is_some_and(holder_exited);
    let expired = fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_AFTER);
    if !exited && !expired {
        return false;
    }

    // Another process may have cleared and retaken it since the read above.
    if fs::read_to_string(path).ok().as_deref() != Some(contents.as_str()) {
        return false;
    }

    warn!(path = %path.display(), pid = ?holder, exited, expired, "Clearing stale apply lock");
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not clear stale apply lock");
            false
        }
    }
}

/// Whether the process that wrote a lock is known to have exited.
#[cfg(target_os = "linux")]
fn holder_exited(pid: u32) -> bool {
    pid != std::process::id() && !Path::new("/proc").join(pid.to_string()).exists()
}

/// Liveness cannot be checked here; only lock age applies.
#[cfg(not(target_os = "linux"))]
fn holder_exited(_pid: u32) -> bool {
    false
}
