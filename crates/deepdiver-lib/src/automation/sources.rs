//! Adding a file, website or video source to a notebook.
//!
//! Stages run in order: EnsureNotebook, EnsureSourcesTabActive,
//! EnsureAddDialogOpen, then the kind-specific input stages, then
//! WaitForIngestAck. Stages whose target state already holds are skipped.

use std::path::Path;
use std::time::Duration;

use super::notebook::{self, notebook_id_from_url, Verification};
use super::poll::{poll_until, PollOptions, PollOutcome};
use super::resolver::ResolveOptions;
use super::selectors as sel;
use super::source_kind::{classify, SourceKind};
use super::workflow::{BrowserSession, Stage, StageOutcome, WorkflowTrace};
use crate::browser::ElementHandle;
use crate::errors::{DeepDiverError, Result};
use crate::session::{NotebookRecord, SourceRecord};

const INGEST_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SourceAdded {
    pub notebook_id: String,
    /// Set when the workflow had to create the notebook.
    pub created: Option<NotebookRecord>,
    pub kind: SourceKind,
    pub record: SourceRecord,
    pub trace: WorkflowTrace,
}

/// Add `input` to the notebook `notebook_id`, or to the page's current
/// notebook when none is given. From the main page a notebook is created.
pub async fn add_source(
    session: &BrowserSession,
    input: &str,
    notebook_id: Option<&str>,
) -> Result<SourceAdded> {
    let kind = classify(input);
    if let SourceKind::File(path) = &kind {
        if !path.is_file() {
            return Err(DeepDiverError::Content(format!(
                "File not found: {}",
                path.display()
            )));
        }
    }
    tracing::info!(input, kind = %kind.label(), "adding source");

    let mut trace = WorkflowTrace::new();
    let (notebook_id, created) = ensure_notebook(session, notebook_id, &mut trace).await?;
    ensure_sources_tab(session, &mut trace).await?;
    ensure_add_surface(session, &kind, &mut trace).await?;

    match &kind {
        SourceKind::File(path) => attach_file(session, path, &mut trace).await?,
        SourceKind::Website(url) | SourceKind::Video(url) => {
            let chip = kind.chip_label().unwrap_or("Website");
            enter_url(session, chip, url, &mut trace).await?
        }
    }

    wait_for_ingest_ack(session, &mut trace).await?;

    tracing::info!(notebook_id = %notebook_id, verified = trace.fully_verified(), "source added");
    Ok(SourceAdded {
        record: SourceRecord::new(input, kind.label()),
        notebook_id,
        created,
        kind,
        trace,
    })
}

async fn ensure_notebook(
    session: &BrowserSession,
    notebook_id: Option<&str>,
    trace: &mut WorkflowTrace,
) -> Result<(String, Option<NotebookRecord>)> {
    let current = session.page().url().await?;

    if let Some(id) = notebook_id {
        if notebook_id_from_url(&current).as_deref() == Some(id) {
            trace.record(Stage::EnsureNotebook, StageOutcome::Skipped);
            return Ok((id.to_string(), None));
        }
        let outcome = match notebook::navigate_to_notebook(session, id).await? {
            Verification::Confirmed => StageOutcome::Completed,
            Verification::Unverified => StageOutcome::Unverified,
        };
        trace.record(Stage::EnsureNotebook, outcome);
        return Ok((id.to_string(), None));
    }

    if let Some(id) = notebook_id_from_url(&current) {
        trace.record(Stage::EnsureNotebook, StageOutcome::Skipped);
        return Ok((id, None));
    }

    if session.is_visible(sel::MAIN_PAGE).await? || session.is_visible(sel::CREATE_NOTEBOOK).await? {
        let created = notebook::create_notebook(session, None).await?;
        trace.record(Stage::EnsureNotebook, StageOutcome::Completed);
        return Ok((created.id.clone(), Some(created)));
    }

    Err(session
        .fail(
            Stage::EnsureNotebook,
            format!("not inside a notebook or on the main page ({})", current),
        )
        .await)
}

async fn ensure_sources_tab(session: &BrowserSession, trace: &mut WorkflowTrace) -> Result<()> {
    let probe = session.settings().probe_timeout;
    let Some(tab) = session.find(sel::SOURCES_TAB, probe).await? else {
        // Wide layouts show every panel at once and have no tab strip.
        trace.note(
            Stage::EnsureSourcesTabActive,
            StageOutcome::Unverified,
            Some("no Sources tab"),
        );
        return Ok(());
    };

    let selected = session.page().attribute(&tab, "aria-selected").await?;
    if selected.as_deref() == Some("true") {
        trace.record(Stage::EnsureSourcesTabActive, StageOutcome::Skipped);
        return Ok(());
    }

    session.page().click(&tab).await?;
    session.settle().await;
    trace.record(Stage::EnsureSourcesTabActive, StageOutcome::Completed);
    Ok(())
}

/// Open the add-source surface unless it is already showing. A notebook with
/// no sources opens with the source-type chips exposed.
async fn ensure_add_surface(
    session: &BrowserSession,
    kind: &SourceKind,
    trace: &mut WorkflowTrace,
) -> Result<()> {
    let settings = session.settings();
    let chips;
    let markers: Vec<&str> = match kind.chip_label() {
        Some(label) => {
            chips = sel::source_chips(label);
            sel::as_refs(&chips)
        }
        None => sel::UPLOAD_SURFACE.to_vec(),
    };

    if session.find(&markers, settings.settle).await?.is_some() {
        trace.record(Stage::EnsureAddDialogOpen, StageOutcome::Skipped);
        return Ok(());
    }

    let add = session
        .require(
            Stage::EnsureAddDialogOpen,
            sel::ADD_SOURCE_BUTTON,
            ResolveOptions::visible(settings.element_timeout),
        )
        .await?;
    session.page().click(&add).await?;
    session.settle().await;
    trace.record(Stage::EnsureAddDialogOpen, StageOutcome::Completed);
    Ok(())
}

async fn enter_url(
    session: &BrowserSession,
    chip_label: &str,
    url: &str,
    trace: &mut WorkflowTrace,
) -> Result<()> {
    let page = session.page();
    let settings = session.settings();

    let chips = sel::source_chips(chip_label);
    let chip = session
        .require(
            Stage::SelectSourceTypeChip,
            &sel::as_refs(&chips),
            ResolveOptions::visible(settings.element_timeout),
        )
        .await?;
    page.click(&chip).await?;
    session.settle().await;
    trace.record(Stage::SelectSourceTypeChip, StageOutcome::Completed);

    let input = session
        .require(
            Stage::FillSourceInput,
            sel::URL_INPUTS,
            ResolveOptions::visible(settings.element_timeout),
        )
        .await?;
    page.fill(&input, url).await?;
    trace.record(Stage::FillSourceInput, StageOutcome::Completed);

    match session.find(sel::SUBMIT_SOURCE, settings.probe_timeout).await? {
        Some(submit) => {
            page.click(&submit).await?;
            trace.record(Stage::Submit, StageOutcome::Completed);
        }
        None => {
            tracing::warn!("no enabled submit button, pressing Enter");
            page.press_key("Enter").await?;
            trace.note(Stage::Submit, StageOutcome::Unverified, Some("submitted with Enter"));
        }
    }
    Ok(())
}

async fn attach_file(session: &BrowserSession, path: &Path, trace: &mut WorkflowTrace) -> Result<()> {
    let page = session.page();
    let settings = session.settings();
    let file = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    let trigger = session
        .require(
            Stage::SelectUploadTrigger,
            sel::UPLOAD_TRIGGERS,
            ResolveOptions::visible(settings.element_timeout),
        )
        .await?;
    trace.record(Stage::SelectUploadTrigger, StageOutcome::Completed);

    let target = if page.tag_name(&trigger).await? == "INPUT" {
        trigger
    } else {
        page.click(&trigger).await?;
        session.settle().await;
        hidden_file_input(session).await?
    };

    page.set_input_files(&target, &[file.clone()]).await?;
    tracing::info!(file = %file.display(), "file attached");
    trace.record(Stage::AttachFile, StageOutcome::Completed);
    Ok(())
}

async fn hidden_file_input(session: &BrowserSession) -> Result<ElementHandle> {
    session
        .require(
            Stage::AttachFile,
            sel::FILE_INPUTS,
            ResolveOptions::attached(session.settings().element_timeout),
        )
        .await
}

/// The add surface closing while a source row is visible acknowledges the
/// ingest. Running out of time is reported as `Unverified`, not an error.
async fn wait_for_ingest_ack(session: &BrowserSession, trace: &mut WorkflowTrace) -> Result<()> {
    let opts = PollOptions::new(session.settings().upload_timeout, INGEST_POLL);
    let outcome = poll_until(
        move || async move {
            let open = session.is_visible(sel::DIALOG).await?;
            let acked = !open && session.is_visible(sel::INGEST_ACK).await?;
            Ok::<_, DeepDiverError>(acked.then_some(()))
        },
        opts,
        |elapsed| tracing::info!(elapsed_secs = elapsed.as_secs(), "waiting for source to ingest"),
    )
    .await?;

    match outcome {
        PollOutcome::Ready { elapsed, .. } => {
            tracing::debug!(?elapsed, "ingest acknowledged");
            trace.record(Stage::WaitForIngestAck, StageOutcome::Completed);
        }
        PollOutcome::TimedOut { elapsed } => {
            tracing::warn!(?elapsed, "no ingest acknowledgement");
            trace.note(
                Stage::WaitForIngestAck,
                StageOutcome::Unverified,
                Some(format!("no acknowledgement within {}s", elapsed.as_secs())),
            );
        }
    }
    Ok(())
}
