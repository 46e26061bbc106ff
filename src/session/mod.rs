//! Filesystem-backed import sessions.
//!
//! Each upload gets its own directory under the base:
//!
//! ```text
//! <base>/<id>/session.json   SessionInfo
//! <base>/<id>/upload.zip     the uploaded archive
//! <base>/<id>/unzipped/      extracted archive
//! <base>/<id>/result.json    last ApplyResult
//! <base>/<id>/apply.lock     present while an apply runs
//! ```
//!
//! Ids are UUID v4 strings generated here. Anything that does not parse back
//! to the same UUID is treated as unknown, so a caller-supplied id never
//! addresses a path outside the base directory.

mod lock;

pub use lock::SessionLock;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::file::{read_json, write_json};
use crate::model::ApplyResult;

const INFO_FILE: &str = "session.json";
const RESULT_FILE: &str = "result.json";
const UPLOAD_FILE: &str = "upload.zip";
const UNZIPPED_DIR: &str = "unzipped";

/// Session metadata persisted as `session.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub has_result: bool,
}

/// Owner of all session directories under one base path.
#[derive(Debug, Clone)]
pub struct SessionStore {
    base: PathBuf,
}

impl SessionStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// True when `id` is a canonical hyphenated UUID.
    #[must_use]
    pub fn is_valid_id(id: &str) -> bool {
        Uuid::try_parse(id).is_ok_and(|u| u.hyphenated().to_string() == id)
    }

    fn dir(&self, id: &str) -> Option<PathBuf> {
        Self::is_valid_id(id).then(|| self.base.join(id))
    }

    fn dir_or_unknown(&self, id: &str) -> Result<PathBuf> {
        self.dir(id).ok_or_else(|| Error::UnknownSession { id: id.to_string() })
    }

    /// Create a new empty session and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory cannot be created.
    pub fn create(&self) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let dir = self.base.join(&id);
        fs::create_dir_all(dir.join(UNZIPPED_DIR))?;

        let info = SessionInfo {
            id: id.clone(),
            created_at: Utc::now(),
            has_result: false,
        };
        write_json(&dir.join(INFO_FILE), &info)?;

        info!(session = %id, "Created import session");
        Ok(id)
    }

    /// Whether a session directory exists for `id`.
    #[must_use]
    pub fn exists(&self, id: &str) -> bool {
        self.dir(id).is_some_and(|d| d.is_dir())
    }

    /// Remove a session under its apply lock.
    ///
    /// Unknown and malformed ids are a no-op. Once the lock is held, removal
    /// is best effort: failures are logged and swallowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionBusy`] while an apply holds the session.
    pub fn delete(&self, id: &str) -> Result<()> {
        let Some(dir) = self.dir(id).filter(|d| d.is_dir()) else {
            return Ok(());
        };
        let _lock = match SessionLock::acquire(&dir, id) {
            Ok(lock) => lock,
            // Removed by someone else in the meantime.
            Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!(session = %id, "Deleted import session");
                return Ok(());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => warn!(session = %id, error = %e, "Session cleanup failed, removing what we can"),
        }

        // Fall back to removing entries one at a time, deepest first.
        for entry in WalkDir::new(&dir).contents_first(true).into_iter().flatten() {
            let path = entry.path();
            let removed = if entry.file_type().is_dir() {
                fs::remove_dir(path)
            } else {
                fs::remove_file(path)
            };
            if let Err(e) = removed {
                warn!(path = %path.display(), error = %e, "Could not remove session file");
            }
        }
        Ok(())
    }

    /// Directory holding the extracted archive of a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSession`] for malformed ids.
    pub fn extracted_root(&self, id: &str) -> Result<PathBuf> {
        Ok(self.dir_or_unknown(id)?.join(UNZIPPED_DIR))
    }

    /// Path of the stored upload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSession`] for malformed ids.
    pub fn upload_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.dir_or_unknown(id)?.join(UPLOAD_FILE))
    }

    /// Persist the result of an apply and flag the session as having one.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown sessions or if the write fails.
    pub fn write_result(&self, id: &str, result: &ApplyResult) -> Result<()> {
        let dir = self.dir_or_unknown(id)?;
        if !dir.is_dir() {
            return Err(Error::UnknownSession { id: id.to_string() });
        }
        write_json(&dir.join(RESULT_FILE), result)?;

        let mut info = self.info(id).unwrap_or_else(|| SessionInfo {
            id: id.to_string(),
            created_at: Utc::now(),
            has_result: false,
        });
        info.has_result = true;
        write_json(&dir.join(INFO_FILE), &info)?;
        Ok(())
    }

    /// Last stored result; `None` when absent or unreadable.
    #[must_use]
    pub fn read_result(&self, id: &str) -> Option<ApplyResult> {
        read_json(&self.dir(id)?.join(RESULT_FILE))
    }

    /// Metadata of a session.
    ///
    /// Falls back to the directory's modification time when `session.json`
    /// is missing or unreadable.
    #[must_use]
    pub fn info(&self, id: &str) -> Option<SessionInfo> {
        let dir = self.dir(id)?;
        if !dir.is_dir() {
            return None;
        }
        if let Some(info) = read_json::<SessionInfo>(&dir.join(INFO_FILE)) {
            return Some(info);
        }

        let created_at = fs::metadata(&dir)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Some(SessionInfo {
            id: id.to_string(),
            created_at,
            has_result: dir.join(RESULT_FILE).is_file(),
        })
    }

    /// All sessions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the base directory exists but cannot be read.
    pub fn list(&self) -> Result<Vec<SessionInfo>> {
        let entries = match fs::read_dir(&self.base) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sessions: Vec<SessionInfo> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().and_then(|id| self.info(id)))
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions)
    }

    /// Delete sessions older than `max_age`. Returns how many were removed.
    ///
    /// Sessions with an apply in progress are skipped; abandoned locks are
    /// cleared and their sessions removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the sessions cannot be listed.
    pub fn prune(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - max_age;
        let mut removed = 0;

        for session in self.list()? {
            if session.created_at >= cutoff {
                continue;
            }
            match self.delete(&session.id) {
                Ok(()) => removed += 1,
                Err(Error::SessionBusy { .. }) => {
                    debug!(session = %session.id, "Skipping locked session");
                }
                Err(e) => warn!(session = %session.id, error = %e, "Could not prune session"),
            }
        }

        if removed > 0 {
            info!(removed, "Pruned import sessions");
        }
        Ok(removed)
    }

    /// Take the apply lock of a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSession`] if the session does not exist and
    /// [`Error::SessionBusy`] if another apply holds the lock.
    pub fn lock(&self, id: &str) -> Result<SessionLock> {
        let dir = self.dir_or_unknown(id)?;
        if !dir.is_dir() {
            return Err(Error::UnknownSession { id: id.to_string() });
        }
        SessionLock::acquire(&dir, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ApplyFailure;
    use tempfile::TempDir;

    fn store() -> (TempDir, SessionStore) {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("import"));
        (temp, store)
    }

    #[test]
    fn test_create_and_delete() {
        let (_temp, store) = store();
        let id = store.create().unwrap();

        assert!(SessionStore::is_valid_id(&id));
        assert!(store.exists(&id));
        assert!(store.extracted_root(&id).unwrap().is_dir());
        assert!(!store.info(&id).unwrap().has_result);

        store.delete(&id).unwrap();
        assert!(!store.exists(&id));
        // Deleting twice is harmless.
        store.delete(&id).unwrap();
    }

    #[test]
    fn test_malformed_ids_are_unknown() {
        let (temp, store) = store();
        fs::create_dir_all(temp.path().join("escape")).unwrap();

        assert!(!store.exists("../escape"));
        assert!(!store.exists(""));
        assert!(!store.exists("not-a-uuid"));
        assert!(matches!(
            store.extracted_root("../escape"),
            Err(Error::UnknownSession { .. })
        ));
        store.delete("../escape").unwrap();
        assert!(temp.path().join("escape").exists());
    }

    #[test]
    fn test_result_roundtrip() {
        let (_temp, store) = store();
        let id = store.create().unwrap();
        assert!(store.read_result(&id).is_none());

        let result = ApplyResult {
            applied: vec!["A".into(), "A/job".into()],
            failures: vec![ApplyFailure::new("B", "NotUpdatable: nope")],
        };
        store.write_result(&id, &result).unwrap();

        assert_eq!(store.read_result(&id), Some(result));
        assert!(store.info(&id).unwrap().has_result);
    }

    #[test]
    fn test_read_result_never_fails() {
        let (_temp, store) = store();
        let id = store.create().unwrap();
        fs::write(store.base().join(&id).join(RESULT_FILE), "{broken").unwrap();

        assert!(store.read_result(&id).is_none());
        assert!(store.read_result("bogus").is_none());
    }

    #[test]
    fn test_write_result_unknown_session() {
        let (_temp, store) = store();
        let id = Uuid::new_v4().to_string();
        assert!(matches!(
            store.write_result(&id, &ApplyResult::default()),
            Err(Error::UnknownSession { .. })
        ));
    }

    #[test]
    fn test_list_and_prune() {
        let (_temp, store) = store();
        assert!(store.list().unwrap().is_empty());

        let old = store.create().unwrap();
        let fresh = store.create().unwrap();

        let mut info = store.info(&old).unwrap();
        info.created_at = Utc::now() - Duration::hours(48);
        write_json(&store.base().join(&old).join(INFO_FILE), &info).unwrap();

        let listed: Vec<_> = store.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(listed, vec![old.clone(), fresh.clone()]);

        assert_eq!(store.prune(Duration::hours(24)).unwrap(), 1);
        assert!(!store.exists(&old));
        assert!(store.exists(&fresh));
    }

    #[test]
    fn test_prune_skips_locked_sessions() {
        let (_temp, store) = store();
        let id = store.create().unwrap();
        let _lock = store.lock(&id).unwrap();

        assert_eq!(store.prune(Duration::zero()).unwrap(), 0);
        assert!(store.exists(&id));
    }

    #[test]
    fn test_delete_refuses_locked_session() {
        let (_temp, store) = store();
        let id = store.create().unwrap();
        let guard = store.lock(&id).unwrap();

        assert!(matches!(store.delete(&id), Err(Error::SessionBusy { .. })));
        assert!(store.exists(&id));
        assert!(guard.path().exists());

        drop(guard);
        store.delete(&id).unwrap();
        assert!(!store.exists(&id));
    }

    #[test]
    fn test_abandoned_lock_does_not_block_session() {
        let (_temp, store) = store();
        let id = store.create().unwrap();
        let lock_path = store.lock(&id).unwrap().path().to_path_buf();

        // Leave a lock behind as a crashed apply would, then age it out.
        fs::write(&lock_path, format!("{}\n", std::process::id())).unwrap();
        assert!(matches!(store.lock(&id), Err(Error::SessionBusy { .. })));
        fs::OpenOptions::new()
            .write(true)
            .open(&lock_path)
            .unwrap()
            .set_modified(std::time::SystemTime::now() - lock::STALE_AFTER * 2)
            .unwrap();

        drop(store.lock(&id).unwrap());
        assert!(!lock_path.exists());

        fs::write(&lock_path, "4294967295\n").unwrap();
        fs::OpenOptions::new()
            .write(true)
            .open(&lock_path)
            .unwrap()
            .set_modified(std::time::SystemTime::now() - lock::STALE_AFTER * 2)
            .unwrap();
        assert_eq!(store.prune(Duration::zero()).unwrap(), 1);
        assert!(!store.exists(&id));
    }

    #[test]
    fn test_lock_is_exclusive() {
        let (_temp, store) = store();
        let id = store.create().unwrap();

        let guard = store.lock(&id).unwrap();
        assert!(matches!(store.lock(&id), Err(Error::SessionBusy { .. })));
        drop(guard);
        assert!(store.lock(&id).is_ok());

        let missing = Uuid::new_v4().to_string();
        assert!(matches!(store.lock(&missing), Err(Error::UnknownSession { .. })));
    }
}
