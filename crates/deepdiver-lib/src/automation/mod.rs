//! NotebookLM workflows built on the page abstraction.

pub mod audio;
pub mod notebook;
pub mod poll;
pub mod resolver;
pub mod selectors;
pub mod source_kind;
pub mod sources;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use audio::{download_audio, generate_audio_overview, AudioOptions};
pub use notebook::{
    check_authentication, create_notebook, navigate_to_app, navigate_to_notebook, page_content,
    share_notebook, AuthStatus, Verification,
};
pub use resolver::{resolve, Resolution, ResolveOptions};
pub use source_kind::{classify, SourceKind, SourceLabel};
pub use sources::{add_source, SourceAdded};
pub use workflow::{
    AutomationSettings, BrowserSession, Diagnostics, Stage, StageOutcome, WorkflowTrace,
};
