//! Audio Overview customization, generation and download.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use md5::{Digest, Md5};
use tokio::time::Instant;

use super::poll::{poll_until, PollOptions, PollOutcome};
use super::resolver::ResolveOptions;
use super::selectors as sel;
use super::workflow::{BrowserSession, Stage, StageOutcome, WorkflowTrace};
use crate::browser::{BrowserError, ElementHandle, ElementState, Page};
use crate::config::settings::AudioSettings;
use crate::errors::{DeepDiverError, Result};
use crate::session::{ArtifactRecord, ArtifactStatus};

pub const ARTIFACT_KIND: &str = "audio_overview";
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq)]
pub struct AudioOptions {
    /// Format tile label, e.g. "Deep Dive", "Brief", "Critique", "Debate".
    pub format: String,
    pub language: String,
    /// "Short", "Default" or "Long".
    pub length: String,
    pub focus_prompt: Option<String>,
}

impl AudioOptions {
    pub fn from_settings(settings: &AudioSettings) -> Self {
        Self {
            format: settings.default_format.clone(),
            language: settings.default_language.clone(),
            length: settings.default_length.clone(),
            focus_prompt: None,
        }
    }
}

/// Id for an artifact whose element carries none.
pub fn fallback_artifact_id() -> String {
    format!("{:x}", Md5::digest(Utc::now().to_rfc3339().as_bytes()))
}

/// Customize and generate an Audio Overview, then wait for it to finish.
///
/// `on_heartbeat` receives the elapsed generation time roughly every
/// heartbeat interval while the poller waits.
pub async fn generate_audio_overview<H>(
    session: &BrowserSession,
    options: &AudioOptions,
    mut on_heartbeat: H,
) -> Result<(ArtifactRecord, WorkflowTrace)>
where
    H: FnMut(Duration),
{
    let page = session.page();
    let settings = session.settings();
    let mut trace = WorkflowTrace::new();

    let edit = session
        .require(
            Stage::OpenCustomization,
            sel::AUDIO_CUSTOMIZE,
            ResolveOptions::visible(settings.element_timeout),
        )
        .await?;
    page.click(&edit).await?;
    session.settle().await;
    session
        .require(
            Stage::OpenCustomization,
            sel::DIALOG,
            ResolveOptions::visible(settings.element_timeout),
        )
        .await?;
    trace.record(Stage::OpenCustomization, StageOutcome::Completed);

    let missed = configure(session, options).await?;
    if missed.is_empty() {
        trace.record(Stage::ConfigureAudio, StageOutcome::Completed);
    } else {
        tracing::warn!(settings = ?missed, "some audio settings could not be applied");
        trace.note(
            Stage::ConfigureAudio,
            StageOutcome::Unverified,
            Some(format!("not applied: {}", missed.join(", "))),
        );
    }

    let generate = session
        .require(
            Stage::StartGeneration,
            sel::GENERATE,
            ResolveOptions::visible(settings.element_timeout),
        )
        .await?;
    let baseline = MarkerBaseline::from_scan(&scan_markers(page).await?);
    if !baseline.is_empty() {
        tracing::debug!(known = ?baseline.ids, "audio overviews already present");
    }
    page.click(&generate).await?;
    let started = Instant::now();
    trace.record(Stage::StartGeneration, StageOutcome::Completed);
    tracing::info!(
        format = %options.format,
        timeout_secs = settings.generation_timeout.as_secs(),
        "audio generation started"
    );

    let opts = PollOptions::new(settings.generation_timeout, settings.poll_interval)
        .with_heartbeat(settings.heartbeat);
    let baseline = &baseline;
    let outcome = poll_until(
        move || async move {
            match scan_markers(session.page()).await {
                Ok(scan) => Ok::<_, DeepDiverError>(baseline.fresh(scan)),
                Err(DeepDiverError::Browser(BrowserError::CdpError { message, .. })) => {
                    tracing::debug!(error = %message, "transient marker scan error");
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        },
        opts,
        |elapsed| {
            tracing::info!(elapsed_secs = elapsed.as_secs(), "audio generation in progress");
            on_heartbeat(elapsed);
        },
    )
    .await?;

    let marker = match outcome {
        PollOutcome::Ready { value, .. } => value,
        PollOutcome::TimedOut { elapsed } => {
            session.capture("audio_generation_timeout").await;
            return Err(DeepDiverError::Timeout {
                what: "audio generation".into(),
                elapsed,
            });
        }
    };
    let generation_time = started.elapsed();
    tracing::debug!(locator = %marker.element.locator, "completion marker found");
    trace.record(Stage::WaitForGeneration, StageOutcome::Completed);

    let artifact = ArtifactRecord {
        artifact_id: marker.artifact_id.unwrap_or_else(fallback_artifact_id),
        kind: ARTIFACT_KIND.into(),
        format: options.format.clone(),
        language: options.language.clone(),
        length: options.length.clone(),
        focus_prompt: options.focus_prompt.clone(),
        status: ArtifactStatus::Completed,
        created_at: displayed_timestamp(session).await,
        generation_time: generation_time.as_secs_f64(),
    };
    tracing::info!(
        artifact_id = %artifact.artifact_id,
        generation_secs = generation_time.as_secs(),
        "audio overview ready"
    );
    Ok((artifact, trace))
}

/// Apply format, language, length and focus prompt. Returns the names of
/// settings whose controls could not be found.
async fn configure(session: &BrowserSession, options: &AudioOptions) -> Result<Vec<&'static str>> {
    let page = session.page();
    let probe = session.settings().probe_timeout;
    let mut missed = Vec::new();

    let tiles = sel::format_tiles(&options.format);
    match session.find(&sel::as_refs(&tiles), probe).await? {
        Some(tile) => page.click(&tile).await?,
        None => missed.push("format"),
    }

    let mut language_set = false;
    if let Some(select) = session.find(sel::LANGUAGE_SELECT, probe).await? {
        page.click(&select).await?;
        session.settle().await;
        let choices = sel::language_options(&options.language);
        if let Some(choice) = session.find(&sel::as_refs(&choices), probe).await? {
            page.click(&choice).await?;
            language_set = true;
        } else {
            page.press_key("Escape").await?;
        }
    }
    if !language_set {
        missed.push("language");
    }

    let lengths = sel::length_buttons(&options.length);
    match session.find(&sel::as_refs(&lengths), probe).await? {
        Some(button) => page.click(&button).await?,
        None => missed.push("length"),
    }

    if let Some(prompt) = options.focus_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
        match session.find(sel::FOCUS_PROMPT, probe).await? {
            Some(area) => page.fill(&area, prompt).await?,
            None => missed.push("focus prompt"),
        }
    }

    Ok(missed)
}

/// A completion marker found on the page.
#[derive(Debug, Clone)]
struct Marker {
    element: ElementHandle,
    artifact_id: Option<String>,
}

/// Completion markers present before Generate was clicked. Only markers
/// outside this set count as the submitted job finishing.
#[derive(Debug, Default)]
struct MarkerBaseline {
    ids: HashSet<String>,
    /// Markers without an id, per `AUDIO_READY` candidate.
    anonymous: Vec<usize>,
}

impl MarkerBaseline {
    fn from_scan(scan: &[Vec<Marker>]) -> Self {
        let mut baseline = Self::default();
        for markers in scan {
            let mut anonymous = 0;
            for marker in markers {
                match &marker.artifact_id {
                    Some(id) => {
                        baseline.ids.insert(id.clone());
                    }
                    None => anonymous += 1,
                }
            }
            baseline.anonymous.push(anonymous);
        }
        baseline
    }

    fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.anonymous.iter().all(|n| *n == 0)
    }

    /// First marker that was not there before. Markers with an unseen id win
    /// over a grown count of anonymous ones.
    fn fresh(&self, scan: Vec<Vec<Marker>>) -> Option<Marker> {
        let unseen = scan.iter().flatten().find(|m| {
            m.artifact_id
                .as_ref()
                .is_some_and(|id| !self.ids.contains(id))
        });
        if let Some(marker) = unseen {
            return Some(marker.clone());
        }
        scan.into_iter().enumerate().find_map(|(i, markers)| {
            let known = self.anonymous.get(i).copied().unwrap_or(0);
            let anonymous: Vec<Marker> = markers
                .into_iter()
                .filter(|m| m.artifact_id.is_none())
                .collect();
            if anonymous.len() > known {
                anonymous.into_iter().last()
            } else {
                None
            }
        })
    }
}

/// Every visible completion marker, grouped by `AUDIO_READY` candidate.
async fn scan_markers(page: &dyn Page) -> Result<Vec<Vec<Marker>>> {
    let mut scan = Vec::with_capacity(sel::AUDIO_READY.len());
    for locator in sel::AUDIO_READY {
        let elements = match page.query_all(locator, ElementState::Visible).await {
            Ok(elements) => elements,
            Err(BrowserError::JsException { .. } | BrowserError::InvalidSelector { .. }) => {
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        let mut markers = Vec::with_capacity(elements.len());
        for element in elements {
            let artifact_id = marker_id(page, &element).await;
            markers.push(Marker {
                element,
                artifact_id,
            });
        }
        scan.push(markers);
    }
    Ok(scan)
}

async fn marker_id(page: &dyn Page, marker: &ElementHandle) -> Option<String> {
    for name in sel::ARTIFACT_ID_ATTRIBUTES {
        match page.attribute(marker, name).await {
            Ok(Some(value)) if !value.trim().is_empty() => return Some(value),
            Ok(_) => {}
            Err(e) => tracing::debug!(attribute = name, error = %e, "artifact id lookup failed"),
        }
    }
    None
}

async fn displayed_timestamp(session: &BrowserSession) -> String {
    let shown = match session.find(sel::ARTIFACT_TIMESTAMP, Duration::ZERO).await {
        Ok(Some(el)) => session.page().text(&el).await.ok(),
        _ => None,
    };
    shown
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| Utc::now().to_rfc3339())
}

/// Download an Audio Overview into `dest_dir`.
///
/// With `artifact_id`, controls inside that artifact are tried first and the
/// page-wide controls are the fallback.
pub async fn download_audio(
    session: &BrowserSession,
    artifact_id: Option<&str>,
    dest_dir: &Path,
    timeout: Duration,
) -> Result<PathBuf> {
    let probe = session.settings().probe_timeout;

    let mut button = None;
    if let Some(id) = artifact_id {
        let buttons = sel::artifact_downloads(id);
        let menus = sel::artifact_menus(id);
        button = find_download(
            session,
            &sel::as_refs(&buttons),
            &sel::as_refs(&menus),
            Duration::ZERO,
        )
        .await?;
        if button.is_none() {
            tracing::warn!(artifact_id = id, "no download control inside the artifact, using page-wide controls");
        }
    }
    if button.is_none() {
        button = find_download(session, sel::DOWNLOAD, sel::ARTIFACT_MENU, probe).await?;
    }
    let Some(button) = button else {
        return Err(session
            .fail(Stage::Download, "no download control found")
            .await);
    };

    std::fs::create_dir_all(dest_dir)?;
    match session.page().download(&button, dest_dir, timeout).await {
        Ok(path) => {
            tracing::info!(path = %path.display(), "audio downloaded");
            Ok(path)
        }
        Err(e) => Err(session.fail(Stage::Download, e.to_string()).await),
    }
}

/// A download button, opening the overflow menu when the button is hidden in it.
async fn find_download(
    session: &BrowserSession,
    buttons: &[&str],
    menus: &[&str],
    wait: Duration,
) -> Result<Option<ElementHandle>> {
    if let Some(button) = session.find(buttons, wait).await? {
        return Ok(Some(button));
    }
    let Some(menu) = session.find(menus, wait).await? else {
        return Ok(None);
    };
    session.page().click(&menu).await?;
    session.settle().await;
    session.find(sel::DOWNLOAD, session.settings().probe_timeout).await
}
