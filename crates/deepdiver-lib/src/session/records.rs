use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::automation::source_kind::SourceLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareRole {
    Editor,
    Viewer,
}

impl std::fmt::Display for ShareRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShareRole::Editor => write!(f, "editor"),
            ShareRole::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for ShareRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "editor" => Ok(ShareRole::Editor),
            "viewer" => Ok(ShareRole::Viewer),
            other => Err(format!("unknown role '{}' (expected editor or viewer)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub input: String,
    pub kind: SourceLabel,
    pub added_at: DateTime<Utc>,
}

impl SourceRecord {
    pub fn new(input: impl Into<String>, kind: SourceLabel) -> Self {
        Self {
            input: input.into(),
            kind,
            added_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorRecord {
    pub email: String,
    pub role: ShareRole,
    pub added_at: DateTime<Utc>,
}

impl CollaboratorRecord {
    pub fn new(email: impl Into<String>, role: ShareRole) -> Self {
        Self {
            email: email.into(),
            role,
            added_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub artifact_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    pub language: String,
    pub length: String,
    #[serde(default)]
    pub focus_prompt: Option<String>,
    pub status: ArtifactStatus,
    /// Creation time as shown by the UI, or detection time when it shows none.
    pub created_at: String,
    /// Seconds from clicking Generate to the completion marker.
    pub generation_time: f64,
}

impl ArtifactRecord {
    pub fn generation_duration(&self) -> Duration {
        Duration::from_secs_f64(self.generation_time.max(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookRecord {
    pub id: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    #[serde(default)]
    pub collaborators: Vec<CollaboratorRecord>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactRecord>,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NotebookRecord {
    pub fn new(id: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            created_at: Utc::now(),
            title: title.into(),
            sources: Vec::new(),
            collaborators: Vec::new(),
            artifacts: Vec::new(),
            active: true,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Ended,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Ended => write!(f, "ended"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub ai_assistant: String,
    #[serde(default)]
    pub issue_number: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notebooks: Vec<NotebookRecord>,
    #[serde(default)]
    pub active_notebook_id: Option<String>,
    /// Free-form podcast entries: `{timestamp, podcast_info}`.
    #[serde(default)]
    pub podcasts_created: Vec<Value>,
    /// Free-form document entries: `{timestamp, document_info}`.
    #[serde(default)]
    pub documents_processed: Vec<Value>,
    #[serde(default)]
    pub notes: Vec<NoteEntry>,
}

impl SessionRecord {
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            ai_assistant: self.ai_assistant.clone(),
            issue_number: self.issue_number,
            created_at: self.created_at,
            status: self.status,
            notebooks_count: self.notebooks.len(),
            active_notebook_id: self.active_notebook_id.clone(),
            podcasts_count: self.podcasts_created.len(),
            documents_count: self.documents_processed.len(),
            notes_count: self.notes.len(),
        }
    }
}

/// Counts-only view used by `session status` and `session list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub ai_assistant: String,
    pub issue_number: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub notebooks_count: usize,
    pub active_notebook_id: Option<String>,
    pub podcasts_count: usize,
    pub documents_count: usize,
    pub notes_count: usize,
}
