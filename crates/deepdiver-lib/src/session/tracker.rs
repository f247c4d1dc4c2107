//! Session store: `current_session.json` for the open session plus one
//! `session_<id>.json` snapshot per session under `session_dir`.
//!
//! Single writer, no locking. Every mutation goes through `&mut self` and is
//! written back immediately when `auto_save` is on.

use std::path::{Path, PathBuf};

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::records::{
    ArtifactRecord, CollaboratorRecord, NoteEntry, NotebookRecord, SessionRecord, SessionStatus,
    SessionSummary, SourceRecord,
};
use crate::config::settings::SessionSettings;
use crate::errors::{DeepDiverError, Result};

const CURRENT_FILE: &str = "current_session.json";

pub struct SessionTracker {
    session_dir: PathBuf,
    auto_save: bool,
    max_sessions: usize,
    current: Option<SessionRecord>,
}

impl SessionTracker {
    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::open(&settings.session_dir, settings.auto_save, settings.max_sessions)
    }

    /// Open the store at `dir`, picking up an open session if one exists.
    pub fn open(dir: impl AsRef<Path>, auto_save: bool, max_sessions: usize) -> Self {
        let session_dir = dir.as_ref().to_path_buf();
        let current = match read_record(&session_dir.join(CURRENT_FILE)) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable current session");
                None
            }
        };
        Self {
            session_dir,
            auto_save,
            max_sessions,
            current,
        }
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn current(&self) -> Option<&SessionRecord> {
        self.current.as_ref()
    }

    fn current_mut(&mut self) -> Result<&mut SessionRecord> {
        self.current
            .as_mut()
            .ok_or_else(|| DeepDiverError::Session("No active session".into()))
    }

    fn snapshot_path(&self, session_id: &str) -> PathBuf {
        self.session_dir.join(format!("session_{}.json", session_id))
    }

    /// Write the open session to both the current file and its snapshot.
    pub fn save(&self) -> Result<()> {
        let Some(record) = &self.current else {
            return Ok(());
        };
        std::fs::create_dir_all(&self.session_dir).map_err(|e| {
            DeepDiverError::Session(format!(
                "Failed to create {}: {}",
                self.session_dir.display(),
                e
            ))
        })?;
        let data = serde_json::to_string_pretty(record)?;
        std::fs::write(self.session_dir.join(CURRENT_FILE), &data)?;
        std::fs::write(self.snapshot_path(&record.session_id), &data)?;
        Ok(())
    }

    fn autosave(&self) -> Result<()> {
        if self.auto_save {
            self.save()
        } else {
            Ok(())
        }
    }

    /// Begin a new session, replacing any open one.
    pub fn start_session(
        &mut self,
        ai_assistant: &str,
        issue_number: Option<u64>,
    ) -> Result<&SessionRecord> {
        if let Some(previous) = &self.current {
            tracing::info!(session_id = %previous.session_id, "replacing open session");
        }
        let record = SessionRecord {
            session_id: Uuid::new_v4().to_string(),
            ai_assistant: ai_assistant.to_string(),
            issue_number,
            created_at: Utc::now(),
            status: SessionStatus::Active,
            ended_at: None,
            notebooks: Vec::new(),
            active_notebook_id: None,
            podcasts_created: Vec::new(),
            documents_processed: Vec::new(),
            notes: Vec::new(),
        };
        tracing::info!(session_id = %record.session_id, ai_assistant, "session started");
        self.current = Some(record);
        self.save()?;
        self.prune_snapshots()?;
        self.current_mut().map(|r| &*r)
    }

    pub fn write_note(&mut self, message: &str, kind: &str) -> Result<()> {
        self.current_mut()?.notes.push(NoteEntry {
            timestamp: Utc::now(),
            kind: kind.to_string(),
            message: message.to_string(),
        });
        self.autosave()
    }

    pub fn add_podcast(&mut self, info: Value) -> Result<()> {
        self.current_mut()?.podcasts_created.push(json!({
            "timestamp": Utc::now(),
            "podcast_info": info,
        }));
        self.autosave()
    }

    pub fn add_document(&mut self, info: Value) -> Result<()> {
        self.current_mut()?.documents_processed.push(json!({
            "timestamp": Utc::now(),
            "document_info": info,
        }));
        self.autosave()
    }

    /// Append a notebook. The first notebook, or one flagged active, becomes
    /// the session's active notebook.
    pub fn add_notebook(&mut self, notebook: NotebookRecord) -> Result<()> {
        let session = self.current_mut()?;
        let make_active = session.active_notebook_id.is_none() || notebook.active;
        let id = notebook.id.clone();
        session.notebooks.push(notebook);
        if make_active {
            mark_active(session, &id);
        }
        tracing::info!(notebook_id = %id, "notebook added to session");
        self.autosave()
    }

    pub fn active_notebook(&self) -> Option<&NotebookRecord> {
        let session = self.current.as_ref()?;
        let id = session.active_notebook_id.as_deref()?;
        session.notebooks.iter().find(|n| n.id == id)
    }

    pub fn set_active_notebook(&mut self, id: &str) -> Result<()> {
        let session = self.current_mut()?;
        if !session.notebooks.iter().any(|n| n.id == id) {
            return Err(DeepDiverError::Session(format!(
                "Notebook '{}' is not part of this session",
                id
            )));
        }
        mark_active(session, id);
        self.autosave()
    }

    pub fn notebooks(&self) -> &[NotebookRecord] {
        self.current
            .as_ref()
            .map(|s| s.notebooks.as_slice())
            .unwrap_or(&[])
    }

    pub fn notebook(&self, id: &str) -> Option<&NotebookRecord> {
        self.notebooks().iter().find(|n| n.id == id)
    }

    /// Apply `change` to the notebook with `id` and stamp `updated_at`.
    pub fn update_notebook<F>(&mut self, id: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut NotebookRecord),
    {
        let session = self.current_mut()?;
        let notebook = session
            .notebooks
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| DeepDiverError::Session(format!("Notebook '{}' not found", id)))?;
        change(notebook);
        notebook.updated_at = Some(Utc::now());
        self.autosave()
    }

    pub fn add_source(&mut self, notebook_id: &str, source: SourceRecord) -> Result<()> {
        self.update_notebook(notebook_id, |n| n.sources.push(source))
    }

    pub fn add_collaborator(&mut self, notebook_id: &str, who: CollaboratorRecord) -> Result<()> {
        self.update_notebook(notebook_id, |n| n.collaborators.push(who))
    }

    pub fn add_artifact(&mut self, notebook_id: &str, artifact: ArtifactRecord) -> Result<()> {
        self.update_notebook(notebook_id, |n| n.artifacts.push(artifact))
    }

    pub fn status(&self) -> Option<SessionSummary> {
        self.current.as_ref().map(SessionRecord::summary)
    }

    /// Make the snapshot `session_id` the open session.
    pub fn load_session(&mut self, session_id: &str) -> Result<&SessionRecord> {
        let path = self.snapshot_path(session_id);
        let record = read_record(&path)?.ok_or_else(|| {
            DeepDiverError::Session(format!("Session file not found: {}", path.display()))
        })?;
        tracing::info!(session_id, "session loaded");
        self.current = Some(record);
        self.save()?;
        self.current_mut().map(|r| &*r)
    }

    /// Close the open session: stamp it ended, write its snapshot and remove
    /// the current-session file.
    pub fn end_session(&mut self) -> Result<SessionRecord> {
        let session = self.current_mut()?;
        session.status = SessionStatus::Ended;
        session.ended_at = Some(Utc::now());
        self.save()?;

        let current_file = self.session_dir.join(CURRENT_FILE);
        if current_file.exists() {
            std::fs::remove_file(&current_file)?;
        }
        let ended = self
            .current
            .take()
            .ok_or_else(|| DeepDiverError::Session("No active session".into()))?;
        tracing::info!(session_id = %ended.session_id, "session ended");
        Ok(ended)
    }

    /// Summaries of every snapshot, newest first. Unreadable files are skipped.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut sessions: Vec<SessionSummary> = self
            .snapshots()?
            .into_iter()
            .map(|(_, record)| record.summary())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    /// Delete snapshots whose last activity is older than `days`. The open
    /// session is never deleted.
    pub fn cleanup_old_sessions(&self, days: u64) -> Result<usize> {
        let cutoff = Utc::now() - ChronoDuration::days(days as i64);
        let open_id = self.current.as_ref().map(|s| s.session_id.as_str());
        let mut deleted = 0;
        for (path, record) in self.snapshots()? {
            if Some(record.session_id.as_str()) == open_id {
                continue;
            }
            let last_activity = record.ended_at.unwrap_or(record.created_at);
            if last_activity < cutoff {
                std::fs::remove_file(&path)?;
                deleted += 1;
            }
        }
        tracing::info!(deleted, days, "old sessions cleaned up");
        Ok(deleted)
    }

    /// Keep at most `max_sessions` snapshots, dropping the oldest.
    fn prune_snapshots(&self) -> Result<()> {
        if self.max_sessions == 0 {
            return Ok(());
        }
        let mut snapshots = self.snapshots()?;
        if snapshots.len() <= self.max_sessions {
            return Ok(());
        }
        snapshots.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        let open_id = self.current.as_ref().map(|s| s.session_id.clone());
        for (path, record) in snapshots.into_iter().skip(self.max_sessions) {
            if Some(&record.session_id) == open_id.as_ref() {
                continue;
            }
            tracing::debug!(session_id = %record.session_id, "pruning old session");
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn snapshots(&self) -> Result<Vec<(PathBuf, SessionRecord)>> {
        if !self.session_dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.session_dir)?.flatten() {
            let path = entry.path();
            let is_snapshot = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("session_") && n.ends_with(".json"))
                .unwrap_or(false);
            if !is_snapshot {
                continue;
            }
            match read_record(&path) {
                Ok(Some(record)) => out.push((path, record)),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping session file"),
            }
        }
        Ok(out)
    }
}

fn mark_active(session: &mut SessionRecord, id: &str) {
    for notebook in &mut session.notebooks {
        notebook.active = notebook.id == id;
    }
    session.active_notebook_id = Some(id.to_string());
}

fn read_record(path: &Path) -> Result<Option<SessionRecord>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&data)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::source_kind::SourceLabel;
    use crate::session::records::{ArtifactStatus, ShareRole};

    fn tracker(dir: &Path) -> SessionTracker {
        SessionTracker::open(dir, true, 100)
    }

    #[test]
    fn test_mutations_need_a_session() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = tracker(tmp.path());
        assert!(t.current().is_none());
        assert!(matches!(t.write_note("hi", "note"), Err(DeepDiverError::Session(_))));
        assert!(t.end_session().is_err());
        assert!(t.status().is_none());
    }

    #[test]
    fn test_start_persists_and_reopens() {
        let tmp = tempfile::tempdir().unwrap();
        let id = {
            let mut t = tracker(tmp.path());
            let s = t.start_session("claude", Some(42)).unwrap();
            assert_eq!(s.status, SessionStatus::Active);
            s.session_id.clone()
        };
        assert!(tmp.path().join(CURRENT_FILE).exists());
        assert!(tmp.path().join(format!("session_{}.json", id)).exists());

        let reopened = tracker(tmp.path());
        let current = reopened.current().unwrap();
        assert_eq!(current.session_id, id);
        assert_eq!(current.issue_number, Some(42));
    }

    #[test]
    fn test_notes_podcasts_documents_counted() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = tracker(tmp.path());
        t.start_session("claude", None).unwrap();
        t.write_note("kicked off", "note").unwrap();
        t.add_podcast(json!({"title": "ep1"})).unwrap();
        t.add_document(json!({"path": "paper.pdf"})).unwrap();

        let status = t.status().unwrap();
        assert_eq!(status.notes_count, 1);
        assert_eq!(status.podcasts_count, 1);
        assert_eq!(status.documents_count, 1);

        let on_disk = tracker(tmp.path());
        let session = on_disk.current().unwrap();
        assert_eq!(session.notes[0].kind, "note");
        assert_eq!(session.podcasts_created[0]["podcast_info"]["title"], "ep1");
    }

    #[test]
    fn test_first_notebook_becomes_active() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = tracker(tmp.path());
        t.start_session("claude", None).unwrap();

        let mut first = NotebookRecord::new("nb1", "https://x/notebook/nb1", "First");
        first.active = false;
        t.add_notebook(first).unwrap();
        assert_eq!(t.active_notebook().unwrap().id, "nb1");

        let mut second = NotebookRecord::new("nb2", "https://x/notebook/nb2", "Second");
        second.active = false;
        t.add_notebook(second).unwrap();
        assert_eq!(t.active_notebook().unwrap().id, "nb1");

        t.add_notebook(NotebookRecord::new("nb3", "https://x/notebook/nb3", "Third"))
            .unwrap();
        assert_eq!(t.active_notebook().unwrap().id, "nb3");
        assert!(!t.notebook("nb1").unwrap().active);

        t.set_active_notebook("nb2").unwrap();
        assert_eq!(t.active_notebook().unwrap().id, "nb2");
        assert!(t.set_active_notebook("missing").is_err());
        assert_eq!(t.notebooks().len(), 3);
    }

    #[test]
    fn test_notebook_children_stamp_updated_at() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = tracker(tmp.path());
        t.start_session("claude", None).unwrap();
        t.add_notebook(NotebookRecord::new("nb1", "u", "t")).unwrap();

        t.add_source("nb1", SourceRecord::new("paper.pdf", SourceLabel::File))
            .unwrap();
        t.add_collaborator("nb1", CollaboratorRecord::new("a@b.c", ShareRole::Viewer))
            .unwrap();
        t.add_artifact(
            "nb1",
            ArtifactRecord {
                artifact_id: "art".into(),
                kind: "audio_overview".into(),
                format: "Deep Dive".into(),
                language: "English".into(),
                length: "Default".into(),
                focus_prompt: Some("methods".into()),
                status: ArtifactStatus::Completed,
                created_at: "now".into(),
                generation_time: 12.0,
            },
        )
        .unwrap();

        let nb = t.notebook("nb1").unwrap();
        assert_eq!(nb.sources.len(), 1);
        assert_eq!(nb.collaborators[0].role, ShareRole::Viewer);
        assert_eq!(nb.artifacts[0].artifact_id, "art");
        assert!(nb.updated_at.is_some());

        assert!(t
            .add_source("nope", SourceRecord::new("x", SourceLabel::File))
            .is_err());
    }

    #[test]
    fn test_end_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = tracker(tmp.path());
        let id = t.start_session("claude", None).unwrap().session_id.clone();
        t.write_note("done", "summary").unwrap();

        let ended = t.end_session().unwrap();
        assert_eq!(ended.status, SessionStatus::Ended);
        assert!(ended.ended_at.is_some());
        assert!(t.current().is_none());
        assert!(!tmp.path().join(CURRENT_FILE).exists());

        let loaded = t.load_session(&id).unwrap();
        assert_eq!(loaded.notes.len(), 1);
        assert!(tmp.path().join(CURRENT_FILE).exists());
        assert!(t.load_session("missing").is_err());
    }

    #[test]
    fn test_list_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = tracker(tmp.path());
        let first = t.start_session("a", None).unwrap().session_id.clone();
        t.end_session().unwrap();
        let second = t.start_session("b", None).unwrap().session_id.clone();

        std::fs::write(tmp.path().join("session_garbage.json"), "{not json").unwrap();

        let list = t.list_sessions().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].session_id, second);
        assert_eq!(list[1].session_id, first);
        assert_eq!(list[1].status, SessionStatus::Ended);
    }

    #[test]
    fn test_cleanup_skips_recent_and_open() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = tracker(tmp.path());
        t.start_session("a", None).unwrap();
        let mut old = t.end_session().unwrap();
        old.session_id = "old".into();
        old.created_at = Utc::now() - ChronoDuration::days(90);
        old.ended_at = Some(old.created_at);
        std::fs::write(
            tmp.path().join("session_old.json"),
            serde_json::to_string(&old).unwrap(),
        )
        .unwrap();
        t.start_session("b", None).unwrap();

        assert_eq!(t.cleanup_old_sessions(30).unwrap(), 1);
        assert!(!tmp.path().join("session_old.json").exists());
        assert_eq!(t.list_sessions().unwrap().len(), 2);
    }

    #[test]
    fn test_max_sessions_prunes_oldest() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = SessionTracker::open(tmp.path(), true, 2);
        for name in ["a", "b", "c"] {
            t.start_session(name, None).unwrap();
            t.end_session().unwrap();
        }
        let list = t.list_sessions().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|s| s.ai_assistant != "a"));
    }

    #[test]
    fn test_auto_save_off_keeps_changes_in_memory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = SessionTracker::open(tmp.path(), false, 100);
        t.start_session("claude", None).unwrap();
        t.write_note("unsaved", "note").unwrap();
        assert_eq!(tracker(tmp.path()).current().unwrap().notes.len(), 0);
        t.save().unwrap();
        assert_eq!(tracker(tmp.path()).current().unwrap().notes.len(), 1);
    }
}
