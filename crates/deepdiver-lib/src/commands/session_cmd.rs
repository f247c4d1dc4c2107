//! Session CLI command — manage the session ledger.
//!
//! Subcommands: start, write, status, list, load, end, cleanup.
//! Named `session_cmd` to avoid conflict with the `session` module.

use clap::{Arg, ArgMatches, Command};

use crate::cli::{self, CommandBuilder, CommandCategory, CommandMeta};
use crate::errors::{DeepDiverError, Result};
use crate::output;
use crate::session::{SessionSummary, SessionTracker};

/// Build the `session` clap command.
pub fn session_command() -> Command {
    Command::new("session")
        .about("Manage DeepDiver sessions")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("start")
                .about("Start a new session, replacing any open one")
                .arg(
                    Arg::new("ai")
                        .long("ai")
                        .default_value("claude")
                        .help("AI assistant name"),
                )
                .arg(
                    Arg::new("issue")
                        .long("issue")
                        .value_parser(clap::value_parser!(u64))
                        .help("Issue number"),
                ),
        )
        .subcommand(
            Command::new("write")
                .about("Append a note to the current session")
                .arg(Arg::new("message").required(true).help("Note text"))
                .arg(
                    Arg::new("type")
                        .long("type")
                        .short('t')
                        .default_value("note")
                        .help("Note type"),
                ),
        )
        .subcommand(Command::new("status").about("Show the current session"))
        .subcommand(Command::new("list").aliases(["ls"]).about("List saved sessions"))
        .subcommand(
            Command::new("load")
                .about("Reopen a saved session")
                .arg(Arg::new("session_id").required(true).help("Session ID")),
        )
        .subcommand(Command::new("end").about("End the current session"))
        .subcommand(
            Command::new("cleanup")
                .about("Delete sessions older than a number of days")
                .arg(
                    Arg::new("days")
                        .long("days")
                        .short('d')
                        .value_parser(clap::value_parser!(u64))
                        .default_value("30")
                        .help("Age threshold in days"),
                ),
        )
}

/// Build the `CommandMeta` for registry registration.
pub fn session_meta() -> CommandMeta {
    CommandBuilder::from_clap(session_command())
        .category(CommandCategory::Session)
        .build()
}

/// Handle the `session` command.
pub fn handle_session(matches: &ArgMatches, tracker: &mut SessionTracker) -> Result<()> {
    match matches.subcommand() {
        Some(("start", sub)) => {
            let ai = sub
                .get_one::<String>("ai")
                .map(String::as_str)
                .unwrap_or("claude");
            let issue = sub.get_one::<u64>("issue").copied();
            let record = tracker.start_session(ai, issue)?;
            if cli::is_json(sub) {
                return output::json(&record.summary());
            }
            output::success(&format!("Session started: {}", record.session_id));
            output::field("AI assistant", &record.ai_assistant);
            if let Some(issue) = record.issue_number {
                output::field("Issue", &format!("#{}", issue));
            }
            Ok(())
        }
        Some(("write", sub)) => {
            let message = sub
                .get_one::<String>("message")
                .ok_or_else(|| DeepDiverError::Command("message is required".into()))?;
            let kind = sub
                .get_one::<String>("type")
                .map(String::as_str)
                .unwrap_or("note");
            tracker.write_note(message, kind)?;
            output::success("Note written to session");
            Ok(())
        }
        Some(("status", sub)) => {
            let summary = tracker.status().ok_or_else(no_session)?;
            if cli::is_json(sub) {
                return output::json(&summary);
            }
            print_summary(&summary);
            Ok(())
        }
        Some(("list", sub)) => {
            let sessions = tracker.list_sessions()?;
            if cli::is_json(sub) {
                return output::json(&sessions);
            }
            if sessions.is_empty() {
                output::info("No sessions found");
                return Ok(());
            }
            let open = tracker.current().map(|s| s.session_id.clone());
            for s in &sessions {
                let marker = if Some(&s.session_id) == open.as_ref() { "*" } else { " " };
                println!(
                    "{} {}  {}  {:<7} {} notebook(s), {} podcast(s)",
                    marker,
                    s.session_id,
                    s.created_at.format("%Y-%m-%d %H:%M"),
                    s.status.to_string(),
                    s.notebooks_count,
                    s.podcasts_count
                );
            }
            Ok(())
        }
        Some(("load", sub)) => {
            let id = sub
                .get_one::<String>("session_id")
                .ok_or_else(|| DeepDiverError::Command("session_id is required".into()))?;
            let record = tracker.load_session(id)?;
            output::success(&format!("Session loaded: {}", record.session_id));
            Ok(())
        }
        Some(("end", _)) => {
            let ended = tracker.end_session()?;
            output::success(&format!("Session ended: {}", ended.session_id));
            output::field("Notebooks", &ended.notebooks.len().to_string());
            output::field("Podcasts", &ended.podcasts_created.len().to_string());
            Ok(())
        }
        Some(("cleanup", sub)) => {
            let days = sub.get_one::<u64>("days").copied().unwrap_or(30);
            let deleted = tracker.cleanup_old_sessions(days)?;
            output::success(&format!("Deleted {} session(s) older than {} days", deleted, days));
            Ok(())
        }
        _ => Err(DeepDiverError::Command(
            "Unknown session subcommand. Use --help for usage.".into(),
        )),
    }
}

fn no_session() -> DeepDiverError {
    DeepDiverError::Session("No active session".into())
}

fn print_summary(s: &SessionSummary) {
    output::info("Session status");
    output::field("Session ID", &s.session_id);
    output::field("Status", &s.status.to_string());
    output::field("AI assistant", &s.ai_assistant);
    if let Some(issue) = s.issue_number {
        output::field("Issue", &format!("#{}", issue));
    }
    output::field("Created", &s.created_at.to_rfc3339());
    output::field("Notebooks", &s.notebooks_count.to_string());
    if let Some(active) = &s.active_notebook_id {
        output::field("Active notebook", active);
    }
    output::field("Podcasts", &s.podcasts_count.to_string());
    output::field("Documents", &s.documents_count.to_string());
    output::field("Notes", &s.notes_count.to_string());
}
