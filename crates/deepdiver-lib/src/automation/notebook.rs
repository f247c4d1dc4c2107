//! App navigation, authentication, notebook lifecycle and sharing.

use std::time::Duration;

use serde::Serialize;

use super::resolver::ResolveOptions;
use super::selectors as sel;
use super::source_kind::hostname;
use super::workflow::{BrowserSession, Stage, StageOutcome, WorkflowTrace};
use crate::errors::Result;
use crate::session::{CollaboratorRecord, NotebookRecord, ShareRole};

pub const DEFAULT_NOTEBOOK_TITLE: &str = "Untitled Notebook";

/// Host the app bounces to when the browser profile is signed out.
const SIGN_IN_HOST: &str = "accounts.google.com";

const CREATE_LOAD_WAIT: Duration = Duration::from_secs(15);
const URL_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Authenticated,
    SignedOut,
    /// Neither a profile control nor a sign-in control was found.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    Confirmed,
    Unverified,
}

/// Notebook id from a `.../notebook/<id>[?query][#frag]` URL.
pub fn notebook_id_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/notebook/")?;
    let id = rest.split(['/', '?', '#']).next().unwrap_or("");
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

pub fn notebook_url(base_url: &str, id: &str) -> String {
    format!("{}/notebook/{}", base_url.trim_end_matches('/'), id)
}

/// Open the app and wait for the landing page to render.
pub async fn navigate_to_app(session: &BrowserSession) -> Result<()> {
    let settings = session.settings();
    tracing::info!(url = %settings.base_url, "navigating to NotebookLM");

    if let Err(e) = session
        .page()
        .goto(&settings.base_url, settings.navigation_timeout)
        .await
    {
        return Err(session.fail(Stage::NavigateToApp, e.to_string()).await);
    }

    session
        .require(
            Stage::NavigateToApp,
            sel::APP_READY,
            ResolveOptions::visible(settings.login_timeout),
        )
        .await?;

    let current = session.page().url().await?;
    if hostname(&current) != hostname(&settings.base_url) {
        return Err(session
            .fail(
                Stage::NavigateToApp,
                format!("landed on unexpected page {}", current),
            )
            .await);
    }
    tracing::info!("NotebookLM ready");
    Ok(())
}

pub async fn check_authentication(session: &BrowserSession) -> Result<AuthStatus> {
    let current = session.page().url().await?;
    if hostname(&current).is_some_and(|h| h == SIGN_IN_HOST) {
        tracing::warn!(url = %current, "redirected to Google sign-in");
        return Ok(AuthStatus::SignedOut);
    }

    let probe = session.settings().probe_timeout;
    if session.find(sel::PROFILE_INDICATORS, probe).await?.is_some() {
        tracing::info!("signed in");
        return Ok(AuthStatus::Authenticated);
    }
    if session.is_visible(sel::SIGN_IN_INDICATORS).await? {
        tracing::warn!("sign-in button visible, not authenticated");
        return Ok(AuthStatus::SignedOut);
    }
    tracing::warn!("authentication state could not be determined");
    Ok(AuthStatus::Unknown)
}

/// Click "Create new notebook" and record the notebook it opens.
pub async fn create_notebook(session: &BrowserSession, title: Option<&str>) -> Result<NotebookRecord> {
    let page = session.page();
    let settings = session.settings();
    let before = page.url().await?;

    let button = session
        .require(
            Stage::CreateNotebook,
            sel::CREATE_NOTEBOOK,
            ResolveOptions::visible(settings.element_timeout),
        )
        .await?;
    page.click(&button).await?;

    if let Err(e) = page.wait_for_load(CREATE_LOAD_WAIT).await {
        tracing::warn!(error = %e, "notebook page did not finish loading");
    }

    let mut url = page.url().await?;
    if url == before {
        session.pause(URL_RETRY_DELAY).await;
        url = page.url().await?;
    }
    let id = notebook_id_from_url(&url).unwrap_or_else(|| {
        tracing::warn!(url = %url, "could not extract notebook id");
        "unknown".to_string()
    });

    if session
        .find(sel::NOTEBOOK_UI, settings.element_timeout)
        .await?
        .is_none()
    {
        tracing::warn!(notebook_id = %id, "notebook UI not detected after creation");
    }

    tracing::info!(notebook_id = %id, url = %url, "notebook created");
    Ok(NotebookRecord::new(
        id,
        url,
        title.unwrap_or(DEFAULT_NOTEBOOK_TITLE),
    ))
}

pub async fn navigate_to_notebook(session: &BrowserSession, id: &str) -> Result<Verification> {
    let settings = session.settings();
    let target = notebook_url(&settings.base_url, id);
    tracing::info!(notebook_id = id, url = %target, "opening notebook");

    if let Err(e) = session
        .page()
        .goto(&target, settings.navigation_timeout)
        .await
    {
        return Err(session.fail(Stage::VerifyNotebook, e.to_string()).await);
    }
    if let Err(e) = session.page().wait_for_load(CREATE_LOAD_WAIT).await {
        tracing::warn!(error = %e, "notebook page did not finish loading");
    }

    let current = session.page().url().await?;
    match notebook_id_from_url(&current) {
        Some(open) if open == id => return Ok(Verification::Confirmed),
        Some(open) => {
            tracing::warn!(notebook_id = id, open = %open, "a different notebook is open");
            session.capture("notebook_mismatch").await;
            return Ok(Verification::Unverified);
        }
        None => {}
    }
    if session
        .find(sel::NOTEBOOK_INDICATORS, settings.probe_timeout)
        .await?
        .is_some()
    {
        return Ok(Verification::Confirmed);
    }
    tracing::warn!(notebook_id = id, url = %current, "could not confirm notebook is open");
    session.capture("notebook_unverified").await;
    Ok(Verification::Unverified)
}

/// Invite `email` to the open notebook.
pub async fn share_notebook(
    session: &BrowserSession,
    email: &str,
    role: ShareRole,
) -> Result<(CollaboratorRecord, WorkflowTrace)> {
    let page = session.page();
    let probe = session.settings().probe_timeout;
    let mut trace = WorkflowTrace::new();

    let share = session
        .require(
            Stage::OpenShareDialog,
            sel::SHARE_BUTTON,
            ResolveOptions::visible(probe),
        )
        .await?;
    page.click(&share).await?;
    session.settle().await;
    if session.find(sel::SHARE_DIALOG, probe).await?.is_some() {
        trace.record(Stage::OpenShareDialog, StageOutcome::Completed);
    } else {
        tracing::warn!("share dialog not detected, continuing");
        trace.note(
            Stage::OpenShareDialog,
            StageOutcome::Unverified,
            Some("dialog not detected"),
        );
    }

    let input = session
        .require(
            Stage::EnterCollaborator,
            sel::EMAIL_INPUT,
            ResolveOptions::visible(probe),
        )
        .await?;
    page.click(&input).await?;
    session.pause(Duration::from_millis(500)).await;
    page.type_text(email).await?;
    session.settle().await;
    trace.record(Stage::EnterCollaborator, StageOutcome::Completed);

    match role {
        ShareRole::Editor => trace.record(Stage::SelectRole, StageOutcome::Skipped),
        ShareRole::Viewer => {
            let mut selected = false;
            if let Some(select) = session.find(sel::ROLE_SELECT, probe).await? {
                page.click(&select).await?;
                session.settle().await;
                if let Some(option) = session.find(sel::VIEWER_OPTION, probe).await? {
                    page.click(&option).await?;
                    selected = true;
                }
            }
            if selected {
                trace.record(Stage::SelectRole, StageOutcome::Completed);
            } else {
                tracing::warn!("could not switch role to viewer, default role applies");
                trace.note(
                    Stage::SelectRole,
                    StageOutcome::Unverified,
                    Some("viewer option not found"),
                );
            }
        }
    }

    if let Some(send) = session.find(sel::SEND_INVITE, probe).await? {
        page.click(&send).await?;
        trace.record(Stage::SendInvite, StageOutcome::Completed);
    } else {
        tracing::warn!("no enabled send button, pressing Enter");
        page.press_key("Enter").await?;
        trace.note(
            Stage::SendInvite,
            StageOutcome::Unverified,
            Some("submitted with Enter"),
        );
    }
    session.pause(Duration::from_secs(2)).await;

    tracing::info!(email, %role, "notebook shared");
    Ok((CollaboratorRecord::new(email, role), trace))
}

/// Current page HTML.
pub async fn page_content(session: &BrowserSession) -> Result<String> {
    Ok(session.page().content().await?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::automation::testing::{ClickEffect, FakeElement, FakePage};
    use crate::automation::workflow::{test_session, AutomationSettings, Diagnostics};
    use crate::errors::DeepDiverError;

    const BASE: &str = "https://notebooklm.google.com";

    #[test]
    fn test_notebook_id_from_url() {
        assert_eq!(
            notebook_id_from_url("https://notebooklm.google.com/notebook/abc-123").as_deref(),
            Some("abc-123")
        );
        assert_eq!(
            notebook_id_from_url("https://notebooklm.google.com/notebook/abc?authuser=0").as_deref(),
            Some("abc")
        );
        assert_eq!(
            notebook_id_from_url("https://notebooklm.google.com/notebook/abc#x").as_deref(),
            Some("abc")
        );
        assert_eq!(notebook_id_from_url("https://notebooklm.google.com/"), None);
        assert_eq!(notebook_id_from_url("https://notebooklm.google.com/notebook/"), None);
    }

    #[test]
    fn test_notebook_url() {
        assert_eq!(notebook_url("https://x.com/", "id1"), "https://x.com/notebook/id1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_to_app_waits_for_ready_marker() {
        let page = Arc::new(FakePage::new("about:blank"));
        page.add(sel::APP_READY[0], FakeElement::visible().appears_after(Duration::from_secs(8)));
        let session = test_session(page.clone());

        navigate_to_app(&session).await.unwrap();
        assert!(page.calls().contains(&format!("goto {}", BASE)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_to_app_fails_without_marker() {
        let page = Arc::new(FakePage::new("about:blank"));
        let session = test_session(page);
        let err = navigate_to_app(&session).await.unwrap_err();
        assert!(matches!(err, DeepDiverError::Workflow { ref stage, .. } if stage == "NavigateToApp"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_states() {
        let page = Arc::new(FakePage::new(BASE));
        page.add(sel::PROFILE_INDICATORS[2], FakeElement::visible());
        assert_eq!(
            check_authentication(&test_session(page)).await.unwrap(),
            AuthStatus::Authenticated
        );

        let page = Arc::new(FakePage::new(BASE));
        page.add(sel::SIGN_IN_INDICATORS[1], FakeElement::visible());
        assert_eq!(
            check_authentication(&test_session(page)).await.unwrap(),
            AuthStatus::SignedOut
        );

        let page = Arc::new(FakePage::new("https://accounts.google.com/signin"));
        assert_eq!(
            check_authentication(&test_session(page)).await.unwrap(),
            AuthStatus::SignedOut
        );

        let page = Arc::new(FakePage::new(BASE));
        assert_eq!(
            check_authentication(&test_session(page)).await.unwrap(),
            AuthStatus::Unknown
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_notebook_parses_id() {
        let page = Arc::new(FakePage::new(BASE));
        page.add(sel::CREATE_NOTEBOOK[0], FakeElement::visible());
        page.on_click(
            sel::CREATE_NOTEBOOK[0],
            ClickEffect::SetUrl(format!("{}/notebook/nb-42?original_referer=x", BASE)),
        );
        page.on_click(
            sel::CREATE_NOTEBOOK[0],
            ClickEffect::Reveal(sel::NOTEBOOK_UI[0].into(), FakeElement::visible()),
        );
        let session = test_session(page);

        let nb = create_notebook(&session, Some("Research")).await.unwrap();
        assert_eq!(nb.id, "nb-42");
        assert_eq!(nb.title, "Research");
        assert!(nb.active);
        assert!(nb.sources.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_notebook_unknown_id_is_lenient() {
        let page = Arc::new(FakePage::new(BASE));
        page.add(sel::CREATE_NOTEBOOK[1], FakeElement::visible());
        let session = test_session(page);

        let nb = create_notebook(&session, None).await.unwrap();
        assert_eq!(nb.id, "unknown");
        assert_eq!(nb.title, DEFAULT_NOTEBOOK_TITLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_to_notebook_tristate() {
        let page = Arc::new(FakePage::new(BASE));
        let session = test_session(page.clone());
        assert_eq!(
            navigate_to_notebook(&session, "nb1").await.unwrap(),
            Verification::Confirmed
        );
        assert!(page.calls().contains(&format!("goto {}/notebook/nb1", BASE)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_to_notebook_other_id_is_unverified() {
        let tmp = tempfile::tempdir().unwrap();
        let page = Arc::new(FakePage::new(BASE));
        let nb1 = format!("{}/notebook/nb1", BASE);
        page.on_goto(&nb1, &format!("{}/notebook/nb-other", BASE));
        page.add(sel::NOTEBOOK_INDICATORS[2], FakeElement::visible());
        let session = BrowserSession::new(
            page.clone(),
            AutomationSettings::default(),
            Diagnostics::new(tmp.path()),
        );

        assert_eq!(
            navigate_to_notebook(&session, "nb1").await.unwrap(),
            Verification::Unverified
        );
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_to_notebook_by_indicator() {
        let page = Arc::new(FakePage::new(BASE));
        page.on_goto(&format!("{}/notebook/nb1", BASE), &format!("{}/app", BASE));
        page.add(
            sel::NOTEBOOK_INDICATORS[0],
            FakeElement::visible().appears_after(Duration::from_secs(3)),
        );
        let session = test_session(page);
        assert_eq!(
            navigate_to_notebook(&session, "nb1").await.unwrap(),
            Verification::Confirmed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_to_notebook_without_indicator_is_unverified() {
        let page = Arc::new(FakePage::new(BASE));
        page.on_goto(&format!("{}/notebook/nb1", BASE), &format!("{}/app", BASE));
        let session = test_session(page);
        assert_eq!(
            navigate_to_notebook(&session, "nb1").await.unwrap(),
            Verification::Unverified
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_share_viewer_with_enter_fallback() {
        let page = Arc::new(FakePage::new(format!("{}/notebook/nb1", BASE).as_str()));
        page.add(sel::SHARE_BUTTON[1], FakeElement::visible());
        page.add(sel::EMAIL_INPUT[0], FakeElement::visible().tag("INPUT"));
        page.add(sel::ROLE_SELECT[1], FakeElement::visible());
        page.on_click(
            sel::ROLE_SELECT[1],
            ClickEffect::Reveal(sel::VIEWER_OPTION[0].into(), FakeElement::visible()),
        );
        let session = test_session(page.clone());

        let (who, trace) = share_notebook(&session, "friend@example.com", ShareRole::Viewer)
            .await
            .unwrap();

        assert_eq!(who.email, "friend@example.com");
        assert_eq!(who.role, ShareRole::Viewer);
        assert_eq!(trace.outcome_of(Stage::OpenShareDialog), Some(StageOutcome::Unverified));
        assert_eq!(trace.outcome_of(Stage::SelectRole), Some(StageOutcome::Completed));
        assert_eq!(trace.outcome_of(Stage::SendInvite), Some(StageOutcome::Unverified));
        let calls = page.calls();
        assert!(calls.contains(&"type friend@example.com".to_string()));
        assert!(calls.contains(&"press Enter".to_string()));
        assert!(page.clicked(sel::VIEWER_OPTION[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_share_editor_skips_role() {
        let page = Arc::new(FakePage::new(BASE));
        page.add(sel::SHARE_BUTTON[0], FakeElement::visible());
        page.add(sel::SHARE_DIALOG[0], FakeElement::visible());
        page.add(sel::EMAIL_INPUT[0], FakeElement::visible());
        page.add(sel::SEND_INVITE[0], FakeElement::visible());
        let session = test_session(page.clone());

        let (_, trace) = share_notebook(&session, "a@b.c", ShareRole::Editor).await.unwrap();
        assert!(trace.was_skipped(Stage::SelectRole));
        assert!(trace.fully_verified());
        assert!(page.clicked(sel::SEND_INVITE[0]));
        assert_eq!(page.query_count(sel::ROLE_SELECT[0]), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_share_without_button_fails() {
        let page = Arc::new(FakePage::new(BASE));
        let session = test_session(page);
        let err = share_notebook(&session, "a@b.c", ShareRole::Editor).await.unwrap_err();
        assert!(matches!(err, DeepDiverError::Workflow { ref stage, .. } if stage == "OpenShareDialog"));
    }

    #[tokio::test]
    async fn test_page_content() {
        let page = Arc::new(FakePage::new(BASE));
        page.set_html("<html>hi</html>");
        assert_eq!(page_content(&test_session(page)).await.unwrap(), "<html>hi</html>");
    }
}
