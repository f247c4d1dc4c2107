//! Status CLI command — configuration, Chrome reachability and the open session.

use std::path::PathBuf;

use clap::{ArgMatches, Command};
use serde::Serialize;

use super::services::ServiceRegistry;
use crate::browser::chrome;
use crate::cli::{self, CommandBuilder, CommandCategory, CommandMeta};
use crate::errors::Result;
use crate::output;
use crate::session::SessionSummary;

#[derive(Debug, Serialize)]
struct StatusReport {
    config_file: Option<PathBuf>,
    cdp_url: String,
    cdp_reachable: bool,
    browser: Option<String>,
    session: Option<SessionSummary>,
}

/// Build the `status` clap command.
pub fn status_command() -> Command {
    Command::new("status")
        .aliases(["st"])
        .about("Show configuration, Chrome reachability and the current session")
}

/// Build the `CommandMeta` for registry registration.
pub fn status_meta() -> CommandMeta {
    CommandBuilder::from_clap(status_command())
        .category(CommandCategory::Core)
        .build()
}

/// Handle the `status` command. Never touches the page, only the HTTP endpoint.
pub async fn handle_status(matches: &ArgMatches, services: &ServiceRegistry) -> Result<()> {
    let config_mgr = &services.config_manager;
    let cdp_url = config_mgr.cdp_url().await;
    let browser = match chrome::fetch_version(&cdp_url).await {
        Ok(version) => Some(version.browser),
        Err(e) => {
            tracing::debug!(error = %e, "CDP version probe failed");
            None
        }
    };
    let report = StatusReport {
        config_file: config_mgr.source_path().cloned(),
        cdp_reachable: browser.is_some(),
        cdp_url,
        browser,
        session: services.sessions().await.lock().await.status(),
    };

    if cli::is_json(matches) {
        return output::json(&report);
    }

    output::info("DeepDiver status");
    output::field(
        "Config file",
        &report
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".into()),
    );
    output::field("CDP URL", &report.cdp_url);
    match &report.browser {
        Some(version) => output::field("Chrome", &format!("reachable ({})", version)),
        None => output::field("Chrome", "not reachable"),
    }
    match &report.session {
        Some(s) => {
            output::field("Session", &format!("{} ({})", s.session_id, s.status));
            output::field("AI assistant", &s.ai_assistant);
            output::field("Notebooks", &s.notebooks_count.to_string());
            if let Some(active) = &s.active_notebook_id {
                output::field("Active notebook", active);
            }
            output::field("Podcasts", &s.podcasts_count.to_string());
            output::field("Notes", &s.notes_count.to_string());
        }
        None => output::field("Session", "none"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigManager, DeepDiverConfig};
    use std::sync::Arc;

    #[test]
    fn test_status_command_parses() {
        let _m = status_command().try_get_matches_from(["status"]).unwrap();
        let cmd = status_command();
        let aliases: Vec<&str> = cmd.get_all_aliases().collect();
        assert_eq!(aliases, vec!["st"]);
    }

    #[test]
    fn test_status_meta() {
        assert_eq!(status_meta().category, CommandCategory::Core);
    }

    #[tokio::test]
    async fn test_status_without_chrome_or_session() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut cfg = DeepDiverConfig::default();
        cfg.browser.cdp_url = Some("http://127.0.0.1:1".into());
        cfg.session.session_dir = tmp.path().to_string_lossy().into_owned();
        let services = ServiceRegistry::new(Arc::new(ConfigManager::from_config(cfg)));

        let m = status_command().try_get_matches_from(["status"]).unwrap();
        handle_status(&m, &services).await.unwrap();
    }
}
