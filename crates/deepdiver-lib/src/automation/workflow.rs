//! Shared plumbing for the NotebookLM workflows: the browser session handle,
//! stage bookkeeping and failure diagnostics.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use super::resolver::{self, Resolution, ResolveOptions};
use crate::browser::{ElementHandle, Page};
use crate::config::DeepDiverConfig;
use crate::errors::{DeepDiverError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    NavigateToApp,
    CheckAuthentication,
    CreateNotebook,
    VerifyNotebook,
    EnsureNotebook,
    EnsureSourcesTabActive,
    EnsureAddDialogOpen,
    SelectSourceTypeChip,
    FillSourceInput,
    SelectUploadTrigger,
    AttachFile,
    Submit,
    WaitForIngestAck,
    OpenCustomization,
    ConfigureAudio,
    StartGeneration,
    WaitForGeneration,
    Download,
    OpenShareDialog,
    EnterCollaborator,
    SelectRole,
    SendInvite,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    /// The page was already in the state the stage would produce.
    Skipped,
    /// The action ran but its effect could not be confirmed.
    Unverified,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub detail: Option<String>,
}

/// Ordered log of what each stage of one workflow run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WorkflowTrace {
    records: Vec<StageRecord>,
}

impl WorkflowTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.note(stage, outcome, None::<String>);
    }

    pub fn note(&mut self, stage: Stage, outcome: StageOutcome, detail: Option<impl Into<String>>) {
        let detail = detail.map(Into::into);
        tracing::debug!(%stage, ?outcome, detail = detail.as_deref().unwrap_or(""), "stage finished");
        self.records.push(StageRecord {
            stage,
            outcome,
            detail,
        });
    }

    pub fn outcome_of(&self, stage: Stage) -> Option<StageOutcome> {
        self.records
            .iter()
            .rev()
            .find(|r| r.stage == stage)
            .map(|r| r.outcome)
    }

    pub fn was_skipped(&self, stage: Stage) -> bool {
        self.outcome_of(stage) == Some(StageOutcome::Skipped)
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    /// True when no stage ended `Unverified`.
    pub fn fully_verified(&self) -> bool {
        self.records
            .iter()
            .all(|r| r.outcome != StageOutcome::Unverified)
    }

    pub fn extend(&mut self, other: WorkflowTrace) {
        self.records.extend(other.records);
    }
}

/// Where failed stages drop a screenshot and an HTML dump.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
    enabled: bool,
}

impl Diagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save `<label>_<timestamp>.png` and `.html`; returns the screenshot path,
    /// or the HTML path when the screenshot failed. Never errors.
    pub async fn capture(&self, page: &dyn Page, label: &str) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), error = %e, "cannot create debug dir");
            return None;
        }
        let stem = format!("{}_{}", label, Utc::now().format("%Y%m%d_%H%M%S"));
        let mut saved = None;

        match page.content().await {
            Ok(html) => {
                let path = self.dir.join(format!("{}.html", stem));
                match std::fs::write(&path, html) {
                    Ok(()) => saved = Some(path),
                    Err(e) => tracing::warn!(error = %e, "failed to write HTML dump"),
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to read page HTML"),
        }

        match page.screenshot().await {
            Ok(png) => {
                let path = self.dir.join(format!("{}.png", stem));
                match std::fs::write(&path, png) {
                    Ok(()) => saved = Some(path),
                    Err(e) => tracing::warn!(error = %e, "failed to write screenshot"),
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to capture screenshot"),
        }

        if let Some(path) = &saved {
            tracing::info!(path = %path.display(), "diagnostics captured");
        }
        saved
    }
}

/// Timing knobs for every workflow, derived from the loaded configuration.
#[derive(Debug, Clone)]
pub struct AutomationSettings {
    pub base_url: String,
    pub navigation_timeout: Duration,
    /// How long the ready marker may take, covering a manual sign-in.
    pub login_timeout: Duration,
    /// Per-candidate wait for required elements.
    pub element_timeout: Duration,
    /// Per-candidate wait for optional elements.
    pub probe_timeout: Duration,
    pub upload_timeout: Duration,
    pub generation_timeout: Duration,
    pub poll_interval: Duration,
    pub heartbeat: Duration,
    /// Pause after clicks that open menus or dialogs.
    pub settle: Duration,
}

impl AutomationSettings {
    pub fn from_config(config: &DeepDiverConfig) -> Self {
        let nb = &config.notebooklm;
        Self {
            base_url: nb.base_url.trim_end_matches('/').to_string(),
            navigation_timeout: config.browser.navigation_timeout(),
            login_timeout: Duration::from_secs(nb.login_timeout),
            element_timeout: Duration::from_secs(nb.element_timeout),
            probe_timeout: Duration::from_secs(5),
            upload_timeout: Duration::from_secs(nb.upload_timeout),
            generation_timeout: config.audio.generation_timeout(),
            poll_interval: config.audio.poll_interval(),
            heartbeat: super::poll::DEFAULT_HEARTBEAT,
            settle: Duration::from_secs(1),
        }
    }
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self::from_config(&DeepDiverConfig::default())
    }
}

/// One attached browser tab plus the settings every workflow runs with.
pub struct BrowserSession {
    page: Arc<dyn Page>,
    settings: AutomationSettings,
    diagnostics: Diagnostics,
}

impl BrowserSession {
    pub fn new(page: Arc<dyn Page>, settings: AutomationSettings, diagnostics: Diagnostics) -> Self {
        Self {
            page,
            settings,
            diagnostics,
        }
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    pub fn settings(&self) -> &AutomationSettings {
        &self.settings
    }

    pub async fn resolve(&self, candidates: &[&str], opts: ResolveOptions) -> Result<Resolution> {
        Ok(resolver::resolve(self.page(), candidates, opts).await?)
    }

    /// First visible match with a per-candidate wait, or `None`.
    pub async fn find(&self, candidates: &[&str], wait: Duration) -> Result<Option<ElementHandle>> {
        Ok(self
            .resolve(candidates, ResolveOptions::visible(wait))
            .await?
            .into_element())
    }

    /// Single probe of every candidate.
    pub async fn is_visible(&self, candidates: &[&str]) -> Result<bool> {
        Ok(self
            .resolve(candidates, ResolveOptions::instant())
            .await?
            .is_found())
    }

    /// Resolve an element a stage cannot do without; a miss aborts the
    /// workflow with a diagnostic.
    pub async fn require(
        &self,
        stage: Stage,
        candidates: &[&str],
        opts: ResolveOptions,
    ) -> Result<ElementHandle> {
        match self.resolve(candidates, opts).await? {
            Resolution::Found { element, .. } => Ok(element),
            Resolution::NotFound { tried, elapsed } => Err(self
                .fail(
                    stage,
                    format!(
                        "no element matched any of {} selector(s) within {:?}",
                        tried, elapsed
                    ),
                )
                .await),
        }
    }

    /// Capture diagnostics and build the error for a failed stage.
    pub async fn fail(&self, stage: Stage, reason: impl Into<String>) -> DeepDiverError {
        let reason = reason.into();
        tracing::error!(%stage, %reason, "workflow stage failed");
        let label = format!("failed_{}", stage).to_lowercase();
        let diagnostic = self.diagnostics.capture(self.page(), &label).await;
        DeepDiverError::Workflow {
            stage: stage.to_string(),
            reason,
            diagnostic,
        }
    }

    /// Save a screenshot and HTML dump on demand.
    pub async fn capture(&self, label: &str) -> Option<PathBuf> {
        self.diagnostics.capture(self.page(), label).await
    }

    pub async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    pub async fn settle(&self) {
        self.pause(self.settings.settle).await;
    }
}

#[cfg(test)]
pub(crate) fn test_session(page: Arc<dyn Page>) -> BrowserSession {
    BrowserSession::new(page, AutomationSettings::default(), Diagnostics::disabled())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::testing::{FakeElement, FakePage};

    #[test]
    fn test_trace_outcomes() {
        let mut trace = WorkflowTrace::new();
        trace.record(Stage::EnsureNotebook, StageOutcome::Skipped);
        trace.note(Stage::Submit, StageOutcome::Unverified, Some("pressed Enter"));

        assert!(trace.was_skipped(Stage::EnsureNotebook));
        assert_eq!(trace.outcome_of(Stage::Submit), Some(StageOutcome::Unverified));
        assert_eq!(trace.outcome_of(Stage::Download), None);
        assert!(!trace.fully_verified());
        assert_eq!(trace.records()[1].detail.as_deref(), Some("pressed Enter"));
    }

    #[test]
    fn test_settings_follow_config() {
        let mut cfg = DeepDiverConfig::default();
        cfg.notebooklm.base_url = "https://notebooklm.google.com/".into();
        cfg.notebooklm.element_timeout = 3;
        cfg.audio.generation_timeout = 900;
        let s = AutomationSettings::from_config(&cfg);
        assert_eq!(s.base_url, "https://notebooklm.google.com");
        assert_eq!(s.element_timeout, Duration::from_secs(3));
        assert_eq!(s.generation_timeout, Duration::from_secs(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_require_miss_names_stage_and_saves_diagnostics() {
        let tmp = tempfile::tempdir().unwrap();
        let page = Arc::new(FakePage::new("https://notebooklm.google.com/"));
        page.set_html("<html><body>broken</body></html>");
        let session = BrowserSession::new(
            page,
            AutomationSettings::default(),
            Diagnostics::new(tmp.path().join("debug")),
        );

        let err = session
            .require(Stage::OpenShareDialog, &["#share"], ResolveOptions::instant())
            .await
            .unwrap_err();

        match err {
            DeepDiverError::Workflow {
                stage, diagnostic, ..
            } => {
                assert_eq!(stage, "OpenShareDialog");
                let path = diagnostic.expect("diagnostic path");
                assert!(path.exists());
                assert!(path.extension().is_some_and(|e| e == "png"));
                let html = path.with_extension("html");
                assert_eq!(std::fs::read_to_string(html).unwrap(), "<html><body>broken</body></html>");
            }
            other => panic!("expected Workflow error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_require_hit() {
        let page = Arc::new(FakePage::new("about:blank"));
        page.add("#go", FakeElement::visible());
        let session = test_session(page);
        let el = session
            .require(Stage::Submit, &["#missing", "#go"], ResolveOptions::instant())
            .await
            .unwrap();
        assert_eq!(el.locator, "#go");
        assert!(session.is_visible(&["#go"]).await.unwrap());
    }
}
