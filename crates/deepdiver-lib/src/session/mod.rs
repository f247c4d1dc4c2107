//! Flat JSON ledger of sessions and the notebooks they touched.

pub mod records;
pub mod tracker;

pub use records::{
    ArtifactRecord, ArtifactStatus, CollaboratorRecord, NoteEntry, NotebookRecord, SessionRecord,
    SessionStatus, SessionSummary, ShareRole, SourceRecord,
};
pub use tracker::SessionTracker;
