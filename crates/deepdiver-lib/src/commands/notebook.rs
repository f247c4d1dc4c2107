//! Notebook CLI command — create, open, list, share and feed notebooks.
//!
//! Subcommands: create, open, list, url, share, add-source.

use clap::{Arg, ArgMatches, Command};
use serde::Serialize;

use super::services::ServiceRegistry;
use crate::automation::{self, AuthStatus, BrowserSession, StageOutcome, Verification, WorkflowTrace};
use crate::cli::{self, CommandBuilder, CommandCategory, CommandMeta};
use crate::errors::{DeepDiverError, Result};
use crate::output;
use crate::session::{NotebookRecord, SessionTracker, ShareRole, SourceRecord};

/// AI assistant recorded when a command has to open a session itself.
pub const DEFAULT_AI_ASSISTANT: &str = "claude";

#[derive(Debug, Serialize)]
struct NotebookLink<'a> {
    id: &'a str,
    url: &'a str,
    title: &'a str,
    created_at: String,
    sources: &'a [SourceRecord],
}

fn notebook_id_arg() -> Arg {
    Arg::new("notebook-id")
        .long("notebook-id")
        .short('n')
        .help("Notebook ID (defaults to the session's active notebook)")
}

/// Build the `notebook` clap command.
pub fn notebook_command() -> Command {
    Command::new("notebook")
        .aliases(["nb"])
        .about("Manage NotebookLM notebooks")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("create")
                .about("Create a new notebook and make it active")
                .arg(
                    Arg::new("title")
                        .long("title")
                        .short('t')
                        .help("Title recorded for the notebook"),
                ),
        )
        .subcommand(
            Command::new("open")
                .about("Navigate to an existing notebook")
                .arg(Arg::new("notebook_id").required(true).help("Notebook ID")),
        )
        .subcommand(Command::new("list").aliases(["ls"]).about("List notebooks in the current session"))
        .subcommand(
            Command::new("url")
                .about("Print a notebook URL")
                .arg(notebook_id_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .value_parser(["url", "markdown", "json"])
                        .default_value("url")
                        .help("Output format"),
                ),
        )
        .subcommand(
            Command::new("share")
                .about("Share a notebook with a collaborator by email")
                .arg(Arg::new("email").required(true).help("Collaborator email"))
                .arg(notebook_id_arg())
                .arg(
                    Arg::new("role")
                        .long("role")
                        .short('r')
                        .value_parser(["editor", "viewer"])
                        .default_value("editor")
                        .help("Role to grant"),
                ),
        )
        .subcommand(
            Command::new("add-source")
                .about("Add a file, website or YouTube URL to a notebook")
                .arg(Arg::new("source").required(true).help("File path or URL"))
                .arg(notebook_id_arg()),
        )
}

/// Build the `CommandMeta` for registry registration.
pub fn notebook_meta() -> CommandMeta {
    CommandBuilder::from_clap(notebook_command())
        .category(CommandCategory::Notebook)
        .build()
}

/// Handle the `notebook` command.
pub async fn handle_notebook(matches: &ArgMatches, services: &ServiceRegistry) -> Result<()> {
    match matches.subcommand() {
        Some(("create", sub)) => {
            let title = sub.get_one::<String>("title").map(String::as_str);
            let session = services.browser().await?;
            open_app(&session).await?;
            let notebook = automation::create_notebook(&session, title).await?;

            let sessions = services.sessions().await;
            let mut tracker = sessions.lock().await;
            ensure_session(&mut tracker)?;
            tracker.add_notebook(notebook.clone())?;

            if cli::is_json(sub) {
                return output::json(&notebook);
            }
            output::success("Notebook created");
            output::field("ID", &notebook.id);
            output::field("URL", &notebook.url);
            Ok(())
        }
        Some(("open", sub)) => {
            let id = required(sub, "notebook_id")?;
            let session = services.browser().await?;
            match automation::navigate_to_notebook(&session, id).await? {
                Verification::Confirmed => output::success(&format!("Opened notebook {}", id)),
                Verification::Unverified => {
                    output::warning(&format!("Navigated to notebook {} but could not confirm it loaded", id))
                }
            }

            let sessions = services.sessions().await;
            let mut tracker = sessions.lock().await;
            if tracker.current().is_some() {
                if tracker.notebook(id).is_some() {
                    tracker.set_active_notebook(id)?;
                } else {
                    let url = session.page().url().await?;
                    tracker.add_notebook(NotebookRecord::new(
                        id,
                        url,
                        automation::notebook::DEFAULT_NOTEBOOK_TITLE,
                    ))?;
                }
                output::info("Set as active notebook in session");
            }
            Ok(())
        }
        Some(("list", sub)) => {
            let sessions = services.sessions().await;
            let tracker = sessions.lock().await;
            list_notebooks(&tracker, cli::is_json(sub))
        }
        Some(("url", sub)) => {
            let sessions = services.sessions().await;
            let tracker = sessions.lock().await;
            let notebook = target_notebook(&tracker, sub.get_one::<String>("notebook-id"))?;
            let format = sub.get_one::<String>("format").map(String::as_str).unwrap_or("url");
            println!("{}", format_link(notebook, format)?);
            Ok(())
        }
        Some(("share", sub)) => {
            let email = required(sub, "email")?;
            let role: ShareRole = sub
                .get_one::<String>("role")
                .map(String::as_str)
                .unwrap_or("editor")
                .parse()
                .map_err(DeepDiverError::Command)?;
            let notebook = {
                let sessions = services.sessions().await;
                let tracker = sessions.lock().await;
                let notebook = target_notebook(&tracker, sub.get_one::<String>("notebook-id"))?.clone();
                notebook
            };

            let session = services.browser().await?;
            if automation::navigate_to_notebook(&session, &notebook.id).await? == Verification::Unverified {
                output::warning("Could not confirm the notebook loaded, trying to share anyway");
            }
            let (collaborator, trace) = automation::share_notebook(&session, email, role).await?;
            report_trace(&trace);

            let sessions = services.sessions().await;
            sessions
                .lock()
                .await
                .add_collaborator(&notebook.id, collaborator)?;
            output::success(&format!("Shared notebook {} with {} as {}", notebook.id, email, role));
            Ok(())
        }
        Some(("add-source", sub)) => {
            let source = required(sub, "source")?;
            let explicit = sub.get_one::<String>("notebook-id").cloned();
            let active = {
                let sessions = services.sessions().await;
                let tracker = sessions.lock().await;
                tracker.active_notebook().map(|n| n.id.clone())
            };
            let target = explicit.or(active);

            let session = services.browser().await?;
            if target.is_none() {
                open_app(&session).await?;
            }
            let added = automation::add_source(&session, source, target.as_deref()).await?;
            report_trace(&added.trace);

            let sessions = services.sessions().await;
            let mut tracker = sessions.lock().await;
            ensure_session(&mut tracker)?;
            record_source(&mut tracker, &added, &session.settings().base_url)?;

            if cli::is_json(sub) {
                return output::json(&added.record);
            }
            output::success(&format!(
                "Added {} source to notebook {}",
                added.record.kind, added.notebook_id
            ));
            Ok(())
        }
        _ => Err(DeepDiverError::Command(
            "Unknown notebook subcommand. Use --help for usage.".into(),
        )),
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| DeepDiverError::Command(format!("{} is required", name)))
}

/// Navigate to the app and refuse to continue when signed out.
pub(crate) async fn open_app(session: &BrowserSession) -> Result<()> {
    automation::navigate_to_app(session).await?;
    match automation::check_authentication(session).await? {
        AuthStatus::Authenticated => Ok(()),
        AuthStatus::Unknown => {
            output::warning("Could not confirm sign-in, continuing");
            Ok(())
        }
        AuthStatus::SignedOut => Err(DeepDiverError::Application(
            "Not signed in to NotebookLM; sign in within the Chrome window and retry".into(),
        )),
    }
}

/// Start a session when none is open so results have somewhere to go.
pub(crate) fn ensure_session(tracker: &mut SessionTracker) -> Result<()> {
    if tracker.current().is_none() {
        let record = tracker.start_session(DEFAULT_AI_ASSISTANT, None)?;
        output::info(&format!("New session started: {}", record.session_id));
    }
    Ok(())
}

/// The notebook named by `id`, else the session's active notebook.
pub(crate) fn target_notebook<'a>(
    tracker: &'a SessionTracker,
    id: Option<&String>,
) -> Result<&'a NotebookRecord> {
    if tracker.current().is_none() {
        return Err(DeepDiverError::Session(
            "No active session; create a notebook first with `deepdiver notebook create`".into(),
        ));
    }
    match id {
        Some(id) => tracker
            .notebook(id)
            .ok_or_else(|| DeepDiverError::Session(format!("Notebook not found: {}", id))),
        None => tracker
            .active_notebook()
            .ok_or_else(|| DeepDiverError::Session("No active notebook".into())),
    }
}

/// Record a new source, and the notebook that was created for it if any.
pub(crate) fn record_source(
    tracker: &mut SessionTracker,
    added: &automation::SourceAdded,
    base_url: &str,
) -> Result<()> {
    if let Some(created) = &added.created {
        tracker.add_notebook(created.clone())?;
    } else if tracker.notebook(&added.notebook_id).is_none() {
        tracker.add_notebook(NotebookRecord::new(
            added.notebook_id.clone(),
            automation::notebook::notebook_url(base_url, &added.notebook_id),
            automation::notebook::DEFAULT_NOTEBOOK_TITLE,
        ))?;
    }
    tracker.add_source(&added.notebook_id, added.record.clone())
}

fn format_link(notebook: &NotebookRecord, format: &str) -> Result<String> {
    match format {
        "url" => Ok(notebook.url.clone()),
        "markdown" => Ok(format!("[{}]({})", notebook.title, notebook.url)),
        "json" => Ok(serde_json::to_string_pretty(&NotebookLink {
            id: &notebook.id,
            url: &notebook.url,
            title: &notebook.title,
            created_at: notebook.created_at.to_rfc3339(),
            sources: &notebook.sources,
        })?),
        other => Err(DeepDiverError::Command(format!("Unknown format: {}", other))),
    }
}

fn list_notebooks(tracker: &SessionTracker, json: bool) -> Result<()> {
    let Some(current) = tracker.current() else {
        return Err(DeepDiverError::Session("No active session".into()));
    };
    if json {
        return output::json(&current.notebooks);
    }
    if current.notebooks.is_empty() {
        output::info("No notebooks in this session; create one with `deepdiver notebook create`");
        return Ok(());
    }
    output::info(&format!("Notebooks in session ({} total):", current.notebooks.len()));
    for nb in &current.notebooks {
        let marker = if current.active_notebook_id.as_deref() == Some(nb.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} {}", marker, nb.title);
        output::field("ID", &nb.id);
        output::field("URL", &nb.url);
        output::field("Sources", &nb.sources.len().to_string());
        output::field("Created", &nb.created_at.to_rfc3339());
    }
    Ok(())
}

/// Warn about stages whose effect could not be confirmed.
pub(crate) fn report_trace(trace: &WorkflowTrace) {
    for record in trace.records() {
        if record.outcome == StageOutcome::Unverified {
            output::warning(&format!(
                "{}: not confirmed{}",
                record.stage,
                record
                    .detail
                    .as_deref()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::{SourceKind, SourceLabel};

    fn tracker_with_notebook(dir: &std::path::Path) -> SessionTracker {
        let mut tracker = SessionTracker::open(dir, true, 10);
        tracker.start_session("claude", None).unwrap();
        tracker
            .add_notebook(NotebookRecord::new(
                "nb-1",
                "https://notebooklm.google.com/notebook/nb-1",
                "Research",
            ))
            .unwrap();
        tracker
    }

    #[test]
    fn test_notebook_command_parses() {
        let m = notebook_command()
            .try_get_matches_from(["notebook", "share", "a@b.c", "-r", "viewer", "-n", "nb-1"])
            .unwrap();
        let (name, sub) = m.subcommand().unwrap();
        assert_eq!(name, "share");
        assert_eq!(sub.get_one::<String>("role").unwrap(), "viewer");
        assert_eq!(sub.get_one::<String>("notebook-id").unwrap(), "nb-1");

        assert!(notebook_command()
            .try_get_matches_from(["notebook", "share", "a@b.c", "-r", "owner"])
            .is_err());
        assert!(notebook_command()
            .try_get_matches_from(["notebook", "url", "-f", "html"])
            .is_err());
    }

    #[test]
    fn test_notebook_meta() {
        let meta = notebook_meta();
        assert_eq!(meta.name, "notebook");
        assert_eq!(meta.category, CommandCategory::Notebook);
    }

    #[test]
    fn test_target_notebook() {
        let tmp = tempfile::TempDir::new().unwrap();
        let empty = SessionTracker::open(tmp.path().join("none"), true, 10);
        assert!(target_notebook(&empty, None).is_err());

        let tracker = tracker_with_notebook(tmp.path());
        assert_eq!(target_notebook(&tracker, None).unwrap().id, "nb-1");
        let id = "nb-1".to_string();
        assert_eq!(target_notebook(&tracker, Some(&id)).unwrap().title, "Research");
        let missing = "nb-2".to_string();
        assert!(target_notebook(&tracker, Some(&missing)).is_err());
    }

    #[test]
    fn test_format_link() {
        let nb = NotebookRecord::new("nb-1", "https://notebooklm.google.com/notebook/nb-1", "Research");
        assert_eq!(format_link(&nb, "url").unwrap(), nb.url);
        assert_eq!(
            format_link(&nb, "markdown").unwrap(),
            "[Research](https://notebooklm.google.com/notebook/nb-1)"
        );
        let json: serde_json::Value = serde_json::from_str(&format_link(&nb, "json").unwrap()).unwrap();
        assert_eq!(json["id"], "nb-1");
        assert!(json["sources"].as_array().unwrap().is_empty());
        assert!(format_link(&nb, "html").is_err());
    }

    #[test]
    fn test_record_source_adds_unknown_notebook() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut tracker = tracker_with_notebook(tmp.path());
        let added = automation::SourceAdded {
            notebook_id: "nb-9".into(),
            created: None,
            kind: SourceKind::Website("https://example.com".into()),
            record: SourceRecord::new("https://example.com", SourceLabel::Website),
            trace: WorkflowTrace::new(),
        };
        record_source(&mut tracker, &added, "https://notebooklm.google.com").unwrap();
        let nb = tracker.notebook("nb-9").unwrap();
        assert_eq!(nb.sources.len(), 1);
        assert_eq!(nb.url, "https://notebooklm.google.com/notebook/nb-9");
        assert_eq!(tracker.active_notebook().unwrap().id, "nb-9");
        assert!(tracker.notebook("nb-1").unwrap().sources.is_empty());
    }

    #[test]
    fn test_ensure_session_starts_once() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut tracker = SessionTracker::open(tmp.path(), true, 10);
        ensure_session(&mut tracker).unwrap();
        let id = tracker.current().unwrap().session_id.clone();
        ensure_session(&mut tracker).unwrap();
        assert_eq!(tracker.current().unwrap().session_id, id);
        assert_eq!(tracker.current().unwrap().ai_assistant, DEFAULT_AI_ASSISTANT);
    }
}
