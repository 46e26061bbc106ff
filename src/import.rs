//! Upload, preview and apply, as independent steps over a session.
//!
//! Each step is one request: an upload creates a session and returns its id,
//! later steps only need the id. Nothing is re-uploaded or re-extracted
//! between steps.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::apply::{self, ApplyEngine, PlannedAction};
use crate::archive::{ExtractStats, extract_file};
use crate::discovery::{discover, index_configs};
use crate::error::{Error, Result};
use crate::hierarchy::Hierarchy;
use crate::model::{ApplyResult, ArchiveCandidate};
use crate::selection;
use crate::session::SessionStore;

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub session_id: String,
    pub extracted: ExtractStats,
    /// Number of `config.xml` entries found
    pub importable: usize,
}

/// Import steps bound to a session store.
pub struct ImportWorkflow<'s> {
    store: &'s SessionStore,
}

impl<'s> ImportWorkflow<'s> {
    pub fn new(store: &'s SessionStore) -> Self {
        Self { store }
    }

    /// Store and extract an uploaded archive into a new session.
    ///
    /// The session is removed again when the archive cannot be extracted or
    /// holds nothing importable.
    ///
    /// # Errors
    ///
    /// [`Error::NoArchive`] for empty input, [`Error::InvalidArchive`] when
    /// extraction fails, [`Error::NothingImportable`] when no `config.xml`
    /// was found.
    pub fn upload(&self, archive: &[u8]) -> Result<UploadSummary> {
        if archive.is_empty() {
            return Err(Error::NoArchive);
        }

        let id = self.store.create()?;
        match self.unpack(&id, archive) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                warn!(session = %id, error = %e, "Upload rejected, discarding session");
                if let Err(cleanup) = self.store.delete(&id) {
                    warn!(session = %id, error = %cleanup, "Could not discard session");
                }
                Err(e)
            }
        }
    }

    /// [`Self::upload`] reading the archive from disk.
    ///
    /// # Errors
    ///
    /// Same as [`Self::upload`], plus failure to read `path`.
    pub fn upload_file(&self, path: &Path) -> Result<UploadSummary> {
        let bytes = fs::read(path)?;
        self.upload(&bytes)
    }

    fn unpack(&self, id: &str, archive: &[u8]) -> Result<UploadSummary> {
        let upload = self.store.upload_path(id)?;
        fs::write(&upload, archive)?;

        let root = self.store.extracted_root(id)?;
        let extracted = extract_file(&upload, &root)?;

        let importable = index_configs(&root)?.len();
        if importable == 0 {
            return Err(Error::NothingImportable);
        }

        info!(session = %id, files = extracted.files, importable, "Archive uploaded");
        Ok(UploadSummary {
            session_id: id.to_string(),
            extracted,
            importable,
        })
    }

    /// Fail unless `id` names an existing session.
    ///
    /// # Errors
    ///
    /// [`Error::MissingSessionId`] for blank ids, [`Error::UnknownSession`]
    /// otherwise.
    pub fn check_session(&self, id: &str) -> Result<()> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::MissingSessionId);
        }
        if !self.store.exists(id) {
            return Err(Error::UnknownSession { id: id.to_string() });
        }
        Ok(())
    }

    /// Candidates of a session, checked against the live hierarchy.
    ///
    /// # Errors
    ///
    /// Session errors as in [`Self::check_session`], or
    /// [`Error::NothingImportable`] if the session holds no candidates.
    pub fn preview<H: Hierarchy + ?Sized>(&self, id: &str, hierarchy: &H) -> Result<Vec<ArchiveCandidate>> {
        self.check_session(id)?;
        let candidates = discover(&self.store.extracted_root(id.trim())?, hierarchy)?;
        if candidates.is_empty() {
            return Err(Error::NothingImportable);
        }
        Ok(candidates)
    }

    /// Apply a selection from a session and store the result.
    ///
    /// Per-item failures are part of the returned result, not errors.
    ///
    /// # Errors
    ///
    /// Session errors as in [`Self::check_session`],
    /// [`Error::NothingSelected`] for an empty selection,
    /// [`Error::SessionBusy`] while another apply runs on the same session.
    pub fn apply<H: Hierarchy + ?Sized, S: AsRef<str>>(
        &self,
        id: &str,
        selection: &[S],
        hierarchy: &mut H,
    ) -> Result<ApplyResult> {
        let id = id.trim();
        self.check_session(id)?;
        let selection = selection::normalize(selection);
        if selection.is_empty() {
            return Err(Error::NothingSelected);
        }

        let _lock = self.store.lock(id)?;
        let configs = index_configs(&self.store.extracted_root(id)?)?;
        let result = ApplyEngine::new(hierarchy).apply(&selection, &configs);
        self.store.write_result(id, &result)?;

        info!(
            session = %id,
            applied = result.applied_count(),
            failed = result.failures_count(),
            "Import applied"
        );
        Ok(result)
    }

    /// What [`Self::apply`] would do, without changing anything.
    ///
    /// # Errors
    ///
    /// Same validation as [`Self::apply`].
    pub fn plan<H: Hierarchy + ?Sized, S: AsRef<str>>(
        &self,
        id: &str,
        selection: &[S],
        hierarchy: &H,
    ) -> Result<Vec<PlannedAction>> {
        let id = id.trim();
        self.check_session(id)?;
        let selection = selection::normalize(selection);
        if selection.is_empty() {
            return Err(Error::NothingSelected);
        }

        let configs = index_configs(&self.store.extracted_root(id)?)?;
        Ok(apply::plan(hierarchy, &selection, &configs)?)
    }

    /// Last stored result of a session, if any.
    ///
    /// # Errors
    ///
    /// Session errors as in [`Self::check_session`].
    pub fn result(&self, id: &str) -> Result<Option<ApplyResult>> {
        self.check_session(id)?;
        Ok(self.store.read_result(id.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveEntry, write_archive};
    use crate::hierarchy::MemoryHierarchy;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn setup() -> (TempDir, SessionStore) {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("sessions"));
        (temp, store)
    }

    fn archive(items: &[(&str, &[u8])]) -> Vec<u8> {
        let entries: Vec<_> = items
            .iter()
            .map(|(name, config)| ArchiveEntry::new(*name, config.to_vec()))
            .collect();
        write_archive(&entries, Cursor::new(Vec::new()))
            .unwrap()
            .into_inner()
    }

    fn session_count(store: &SessionStore) -> usize {
        store.list().unwrap().len()
    }

    #[test]
    fn test_upload_empty_input() {
        let (_temp, store) = setup();
        let err = ImportWorkflow::new(&store).upload(&[]).unwrap_err();
        assert!(matches!(err, Error::NoArchive));
        assert_eq!(session_count(&store), 0);
    }

    #[test]
    fn test_upload_garbage_deletes_session() {
        let (_temp, store) = setup();
        let err = ImportWorkflow::new(&store).upload(b"not a zip").unwrap_err();
        assert!(matches!(err, Error::InvalidArchive(_)));
        assert_eq!(session_count(&store), 0);
    }

    #[test]
    fn test_upload_zip_slip_deletes_session() {
        let (temp, store) = setup();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("../evil.txt", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"x").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = ImportWorkflow::new(&store).upload(&bytes).unwrap_err();
        assert_eq!(err.error_code(), crate::error::ErrorCode::UnsafeEntry);
        assert_eq!(session_count(&store), 0);
        assert!(!temp.path().join("sessions").join("evil.txt").exists());
    }

    #[test]
    fn test_upload_without_configs_is_nothing_importable() {
        let (_temp, store) = setup();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("README.txt", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"hello").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = ImportWorkflow::new(&store).upload(&bytes).unwrap_err();
        assert!(matches!(err, Error::NothingImportable));
        assert_eq!(session_count(&store), 0);
    }

    #[test]
    fn test_upload_preview_apply_result() {
        let (_temp, store) = setup();
        let workflow = ImportWorkflow::new(&store);
        let bytes = archive(&[("A/B/job", b"<flow-definition/>"), ("solo", b"<project/>")]);

        let summary = workflow.upload(&bytes).unwrap();
        assert_eq!(summary.importable, 2);
        assert!(store.upload_path(&summary.session_id).unwrap().is_file());

        let mut hierarchy = MemoryHierarchy::new();
        let preview = workflow.preview(&summary.session_id, &hierarchy).unwrap();
        let names: Vec<_> = preview.iter().map(|c| c.full_name.as_str()).collect();
        assert_eq!(names, vec!["A", "A/B", "A/B/job", "solo"]);
        assert!(preview.iter().all(|c| !c.exists));

        assert!(workflow.result(&summary.session_id).unwrap().is_none());
        let result = workflow
            .apply(&summary.session_id, &["A"], &mut hierarchy)
            .unwrap();
        assert_eq!(result.applied, vec!["A/B/job"]);
        assert_eq!(workflow.result(&summary.session_id).unwrap(), Some(result));
        assert!(hierarchy.get_by_full_name("A/B").unwrap().unwrap().is_container);
    }

    #[test]
    fn test_session_validation() {
        let (_temp, store) = setup();
        let workflow = ImportWorkflow::new(&store);
        let hierarchy = MemoryHierarchy::new();

        assert!(matches!(
            workflow.preview("  ", &hierarchy),
            Err(Error::MissingSessionId)
        ));
        assert!(matches!(
            workflow.preview("6f1c1f9e-0000-4000-8000-000000000000", &hierarchy),
            Err(Error::UnknownSession { .. })
        ));
        assert!(matches!(
            workflow.result("../../etc"),
            Err(Error::UnknownSession { .. })
        ));
    }

    #[test]
    fn test_apply_requires_selection() {
        let (_temp, store) = setup();
        let workflow = ImportWorkflow::new(&store);
        let id = workflow
            .upload(&archive(&[("job", b"<project/>")]))
            .unwrap()
            .session_id;

        let mut hierarchy = MemoryHierarchy::new();
        assert!(matches!(
            workflow.apply(&id, &["", "  "], &mut hierarchy),
            Err(Error::NothingSelected)
        ));
        assert!(hierarchy.is_empty());
    }

    #[test]
    fn test_apply_while_locked_is_busy() {
        let (_temp, store) = setup();
        let workflow = ImportWorkflow::new(&store);
        let id = workflow
            .upload(&archive(&[("job", b"<project/>")]))
            .unwrap()
            .session_id;

        let _held = store.lock(&id).unwrap();
        let mut hierarchy = MemoryHierarchy::new();
        assert!(matches!(
            workflow.apply(&id, &["job"], &mut hierarchy),
            Err(Error::SessionBusy { .. })
        ));
    }

    #[test]
    fn test_plan_leaves_hierarchy_untouched() {
        let (_temp, store) = setup();
        let workflow = ImportWorkflow::new(&store);
        let id = workflow
            .upload(&archive(&[("A/job", b"<project/>")]))
            .unwrap()
            .session_id;

        let hierarchy = MemoryHierarchy::new();
        let plan = workflow.plan(&id, &["A"], &hierarchy).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].creates_folders, vec!["A"]);
        assert!(hierarchy.is_empty());
        assert!(store.read_result(&id).is_none());
    }
}
