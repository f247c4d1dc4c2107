//! Podcast CLI command — turn a document into an Audio Overview and manage
//! the local podcast library.
//!
//! Subcommands: create, list, info, delete, cleanup.
//! Named `podcast_cmd` to avoid conflict with the `podcast` module.

use std::path::PathBuf;

use clap::{Arg, ArgMatches, Command};
use serde_json::{json, Map};

use super::notebook::{ensure_session, open_app, record_source, report_trace};
use super::services::ServiceRegistry;
use crate::automation::{self, audio, AudioOptions, SourceKind};
use crate::cli::{self, CommandBuilder, CommandCategory, CommandMeta};
use crate::config::settings::AudioSettings;
use crate::content::format_file_size;
use crate::errors::{DeepDiverError, Result};
use crate::output::{self, progress, prompt};
use crate::podcast::PodcastManager;

const DEFAULT_TITLE: &str = "Generated Podcast";

/// Build the `podcast` clap command.
pub fn podcast_command() -> Command {
    Command::new("podcast")
        .aliases(["pod"])
        .about("Create podcasts and manage the podcast library")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("create")
                .about("Create a podcast from a file or URL")
                .arg(Arg::new("source").required(true).help("File path, website or YouTube URL"))
                .arg(
                    Arg::new("title")
                        .long("title")
                        .short('t')
                        .default_value(DEFAULT_TITLE)
                        .help("Podcast title"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Audio format, e.g. \"Deep Dive\", \"Brief\", \"Critique\", \"Debate\""),
                )
                .arg(Arg::new("language").long("language").short('l').help("Output language"))
                .arg(
                    Arg::new("length")
                        .long("length")
                        .value_parser(["Short", "Default", "Long"])
                        .help("Episode length"),
                )
                .arg(
                    Arg::new("focus")
                        .long("focus")
                        .help("What the hosts should focus on"),
                )
                .arg(
                    Arg::new("notebook-id")
                        .long("notebook-id")
                        .short('n')
                        .help("Notebook to use (defaults to the active notebook, else a new one)"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Library directory (overrides AUDIO_SETTINGS.output_dir)"),
                ),
        )
        .subcommand(Command::new("list").aliases(["ls"]).about("List saved podcasts"))
        .subcommand(
            Command::new("info")
                .about("Show details of a saved podcast")
                .arg(Arg::new("filename").required(true)),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a saved podcast")
                .arg(Arg::new("filename").required(true))
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .short('y')
                        .action(clap::ArgAction::SetTrue)
                        .help("Do not ask for confirmation"),
                ),
        )
        .subcommand(
            Command::new("cleanup")
                .about("Delete podcasts older than a number of days")
                .arg(
                    Arg::new("days")
                        .long("days")
                        .short('d')
                        .value_parser(clap::value_parser!(u64))
                        .default_value("30"),
                ),
        )
}

/// Build the `CommandMeta` for registry registration.
pub fn podcast_meta() -> CommandMeta {
    CommandBuilder::from_clap(podcast_command())
        .category(CommandCategory::Podcast)
        .build()
}

/// Handle the `podcast` command.
pub async fn handle_podcast(matches: &ArgMatches, services: &ServiceRegistry) -> Result<()> {
    match matches.subcommand() {
        Some(("create", sub)) => create(sub, services).await,
        Some(("list", sub)) => {
            let library = services.podcasts().await;
            let entries = library.list()?;
            if cli::is_json(sub) {
                return output::json(&entries);
            }
            if entries.is_empty() {
                output::info(&format!("No podcasts in {}", library.output_dir().display()));
                return Ok(());
            }
            for entry in &entries {
                let title = entry
                    .metadata
                    .as_ref()
                    .map(|m| m.title.as_str())
                    .unwrap_or("-");
                println!("{}  {:>8}  {}", entry.filename, format_file_size(entry.size), title);
            }
            Ok(())
        }
        Some(("info", sub)) => {
            let name = filename(sub)?;
            let entry = services
                .podcasts()
                .await
                .info(name)?
                .ok_or_else(|| DeepDiverError::Content(format!("Podcast not found: {}", name)))?;
            if cli::is_json(sub) {
                return output::json(&entry);
            }
            output::field("File", &entry.path.display().to_string());
            output::field("Size", &format_file_size(entry.size));
            if let Some(meta) = &entry.metadata {
                output::field("Title", &meta.title);
                output::field("Created", &meta.created_at.to_rfc3339());
                output::field("Source", &meta.source_file.display().to_string());
                if let Some(q) = &meta.quality_check {
                    output::field(
                        "Quality",
                        &format!("content: {}, valid format: {}", q.has_content, q.format_valid),
                    );
                }
            }
            Ok(())
        }
        Some(("delete", sub)) => {
            let name = filename(sub)?;
            if !sub.get_flag("yes")
                && prompt::confirm(&format!("Delete {}?", name), false)? != Some(true)
            {
                output::info("Cancelled");
                return Ok(());
            }
            if services.podcasts().await.delete(name)? {
                output::success(&format!("Deleted {}", name));
                Ok(())
            } else {
                Err(DeepDiverError::Content(format!("Podcast not found: {}", name)))
            }
        }
        Some(("cleanup", sub)) => {
            let days = sub.get_one::<u64>("days").copied().unwrap_or(30);
            let deleted = services.podcasts().await.cleanup_old(days)?;
            output::success(&format!("Deleted {} podcast(s) older than {} days", deleted, days));
            Ok(())
        }
        _ => Err(DeepDiverError::Command(
            "Unknown podcast subcommand. Use --help for usage.".into(),
        )),
    }
}

fn filename(matches: &ArgMatches) -> Result<&str> {
    matches
        .get_one::<String>("filename")
        .map(String::as_str)
        .ok_or_else(|| DeepDiverError::Command("filename is required".into()))
}

/// Audio options from config defaults with command-line overrides applied.
fn audio_options(matches: &ArgMatches, settings: &AudioSettings) -> AudioOptions {
    let mut options = AudioOptions::from_settings(settings);
    if let Some(format) = matches.get_one::<String>("format") {
        options.format = format.clone();
    }
    if let Some(language) = matches.get_one::<String>("language") {
        options.language = language.clone();
    }
    if let Some(length) = matches.get_one::<String>("length") {
        options.length = length.clone();
    }
    options.focus_prompt = matches
        .get_one::<String>("focus")
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());
    options
}

async fn create(matches: &ArgMatches, services: &ServiceRegistry) -> Result<()> {
    let source = matches
        .get_one::<String>("source")
        .ok_or_else(|| DeepDiverError::Command("source is required".into()))?;
    let title = matches
        .get_one::<String>("title")
        .map(String::as_str)
        .unwrap_or(DEFAULT_TITLE);
    let config = services.config_manager.get_config().await;
    let options = audio_options(matches, &config.audio);

    let content = services.content().await;
    let prepared = match automation::classify(source) {
        SourceKind::File(path) => Some(content.prepare(&path, None)?),
        _ => None,
    };
    let input = prepared
        .as_ref()
        .map(|p| p.upload_path.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.clone());

    let target = match matches.get_one::<String>("notebook-id") {
        Some(id) => Some(id.clone()),
        None => {
            let sessions = services.sessions().await;
            let tracker = sessions.lock().await;
            tracker.active_notebook().map(|n| n.id.clone())
        }
    };

    output::info(&format!("Creating podcast: {}", title));
    let session = services.browser().await?;
    open_app(&session).await?;

    output::info("Adding source...");
    let added = automation::add_source(&session, &input, target.as_deref()).await?;
    report_trace(&added.trace);

    let timeout = session.settings().generation_timeout;
    let spinner = progress::create_spinner("Generating Audio Overview");
    let generated = automation::generate_audio_overview(&session, &options, |elapsed| {
        spinner.set_message(progress::heartbeat_message("Generating Audio Overview", elapsed, timeout));
    })
    .await;
    spinner.finish_and_clear();
    let (artifact, trace) = generated?;
    report_trace(&trace);
    output::success(&format!(
        "Audio Overview ready after {:.0}s",
        artifact.generation_time
    ));

    output::info("Downloading audio...");
    let download_dir = content.temp_dir().join("downloads");
    let downloaded = automation::download_audio(
        &session,
        Some(&artifact.artifact_id),
        &download_dir,
        audio::DEFAULT_DOWNLOAD_TIMEOUT,
    )
    .await?;

    let library = match matches.get_one::<PathBuf>("output") {
        Some(dir) => {
            let mut settings = config.audio.clone();
            settings.output_dir = dir.to_string_lossy().into_owned();
            PodcastManager::from_settings(&settings)
        }
        None => services.podcasts().await,
    };
    let mut extra = Map::new();
    extra.insert("notebook_id".into(), json!(added.notebook_id));
    extra.insert("artifact_id".into(), json!(artifact.artifact_id));
    extra.insert("source".into(), json!(source));
    extra.insert("format".into(), json!(options.format));
    extra.insert("language".into(), json!(options.language));
    extra.insert("length".into(), json!(options.length));
    let saved = library.save(&downloaded, title, extra)?;
    if let Err(e) = std::fs::remove_file(&downloaded) {
        tracing::debug!(error = %e, path = %downloaded.display(), "could not remove downloaded file");
    }

    let sessions = services.sessions().await;
    let mut tracker = sessions.lock().await;
    ensure_session(&mut tracker)?;
    record_source(&mut tracker, &added, &session.settings().base_url)?;
    tracker.add_artifact(&added.notebook_id, artifact)?;
    tracker.add_podcast(serde_json::to_value(&saved.metadata)?)?;
    if let Some(prepared) = &prepared {
        tracker.add_document(serde_json::to_value(prepared)?)?;
    }

    if cli::is_json(matches) {
        return output::json(&saved);
    }
    output::success(&format!("Podcast created: {}", saved.path.display()));
    output::field("Notebook", &added.notebook_id);
    if let Some(meta) = &saved.metadata_path {
        output::field("Metadata", &meta.display().to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigManager, DeepDiverConfig};
    use std::sync::Arc;

    fn create_matches(args: &[&str]) -> ArgMatches {
        let mut argv = vec!["podcast", "create"];
        argv.extend_from_slice(args);
        let m = podcast_command().try_get_matches_from(argv).unwrap();
        m.subcommand_matches("create").unwrap().clone()
    }

    #[test]
    fn test_podcast_command_parses() {
        let sub = create_matches(&["paper.pdf"]);
        assert_eq!(sub.get_one::<String>("title").unwrap(), DEFAULT_TITLE);
        assert!(podcast_command()
            .try_get_matches_from(["podcast", "create", "x.pdf", "--length", "Huge"])
            .is_err());
        assert!(podcast_command().try_get_matches_from(["podcast"]).is_err());
    }

    #[test]
    fn test_podcast_meta() {
        let meta = podcast_meta();
        assert_eq!(meta.name, "podcast");
        assert_eq!(meta.category, CommandCategory::Podcast);
    }

    #[test]
    fn test_audio_options_overrides() {
        let settings = AudioSettings::default();
        let defaults = audio_options(&create_matches(&["a.pdf"]), &settings);
        assert_eq!(defaults, AudioOptions::from_settings(&settings));

        let custom = audio_options(
            &create_matches(&[
                "a.pdf", "-f", "Debate", "-l", "Deutsch", "--length", "Long", "--focus", "  chapter 3 ",
            ]),
            &settings,
        );
        assert_eq!(custom.format, "Debate");
        assert_eq!(custom.language, "Deutsch");
        assert_eq!(custom.length, "Long");
        assert_eq!(custom.focus_prompt.as_deref(), Some("chapter 3"));

        let blank = audio_options(&create_matches(&["a.pdf", "--focus", "   "]), &settings);
        assert_eq!(blank.focus_prompt, None);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_file_before_browser() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut cfg = DeepDiverConfig::default();
        cfg.browser.cdp_url = Some("http://127.0.0.1:1".into());
        cfg.session.session_dir = tmp.path().join("sessions").to_string_lossy().into_owned();
        let services = ServiceRegistry::new(Arc::new(ConfigManager::from_config(cfg)));

        let missing = tmp.path().join("missing.pdf");
        let arg = missing.to_string_lossy().into_owned();
        let m = podcast_command()
            .try_get_matches_from(["podcast", "create", arg.as_str()])
            .unwrap();
        let err = handle_podcast(&m, &services).await.unwrap_err();
        assert!(matches!(err, DeepDiverError::Content(_)), "{}", err);
    }

    #[tokio::test]
    async fn test_library_subcommands() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut cfg = DeepDiverConfig::default();
        cfg.audio.output_dir = tmp.path().to_string_lossy().into_owned();
        let services = ServiceRegistry::new(Arc::new(ConfigManager::from_config(cfg)));

        let src = tmp.path().join("download.mp3");
        std::fs::write(&src, b"ID3fake-audio").unwrap();
        let saved = services
            .podcasts()
            .await
            .save(&src, "Episode", Map::new())
            .unwrap();

        let run = |args: Vec<&str>| {
            let mut argv = vec!["podcast"];
            argv.extend(args);
            podcast_command().try_get_matches_from(argv).unwrap()
        };
        handle_podcast(&run(vec!["list"]), &services).await.unwrap();
        handle_podcast(&run(vec!["info", saved.filename.as_str()]), &services)
            .await
            .unwrap();
        assert!(handle_podcast(&run(vec!["info", "nope.mp3"]), &services).await.is_err());
        handle_podcast(&run(vec!["delete", saved.filename.as_str(), "--yes"]), &services)
            .await
            .unwrap();
        assert!(!saved.path.exists());
        handle_podcast(&run(vec!["cleanup", "--days", "1"]), &services)
            .await
            .unwrap();
    }
}
