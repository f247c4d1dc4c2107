//! Init CLI command — first-run checks and Chrome bootstrap.

use std::path::{Path, PathBuf};

use clap::{Arg, ArgMatches, Command};

use crate::browser::chrome;
use crate::cli::{CommandBuilder, CommandCategory, CommandMeta};
use crate::config::ConfigManager;
use crate::errors::Result;
use crate::output::{self, prompt};

const SETUP_STEPS: &[&str] = &[
    "Start Chrome with remote debugging: google-chrome --remote-debugging-port=9222",
    "Sign in to NotebookLM in that Chrome window",
    "Run `deepdiver test` to verify the connection and sign-in",
    "Run `deepdiver session start` to begin tracking work",
    "Run `deepdiver podcast create <file-or-url>` to make a podcast",
];

/// Build the `init` clap command.
pub fn init_command() -> Command {
    Command::new("init")
        .about("Validate configuration, check Chrome and print setup steps")
        .arg(
            Arg::new("launch")
                .long("launch")
                .action(clap::ArgAction::SetTrue)
                .help("Launch Chrome without asking when it is not reachable"),
        )
        .arg(
            Arg::new("write-config")
                .long("write-config")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Write a default config file to PATH"),
        )
}

/// Build the `CommandMeta` for registry registration.
pub fn init_meta() -> CommandMeta {
    CommandBuilder::from_clap(init_command())
        .category(CommandCategory::Core)
        .build()
}

/// Handle the `init` command.
pub async fn handle_init(matches: &ArgMatches, config_mgr: &ConfigManager) -> Result<()> {
    let config = config_mgr.get_config().await;
    output::info("DeepDiver setup");

    if let Some(path) = matches.get_one::<PathBuf>("write-config") {
        ConfigManager::write_default(path).await?;
        output::success(&format!("Wrote default config to {}", path.display()));
    }

    match config_mgr.source_path() {
        Some(path) => output::field("Config file", &path.display().to_string()),
        None => output::field("Config file", "none found, using defaults"),
    }
    let problems = config.validate();
    if problems.is_empty() {
        output::success("Configuration is valid");
    } else {
        for problem in &problems {
            output::warning(problem);
        }
    }

    let cdp_url = config_mgr.cdp_url().await;
    if chrome::is_cdp_running(&cdp_url).await {
        output::success(&format!("Chrome DevTools reachable at {}", cdp_url));
    } else {
        output::warning(&format!("Chrome DevTools not reachable at {}", cdp_url));
        offer_launch(matches, &cdp_url, Path::new(&config.browser.user_data_dir)).await?;
    }

    println!();
    output::info("Next steps:");
    for (i, step) in SETUP_STEPS.iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }
    Ok(())
}

async fn offer_launch(matches: &ArgMatches, cdp_url: &str, user_data_dir: &Path) -> Result<()> {
    let Some(port) = chrome::port_from_url(cdp_url) else {
        output::info("CDP URL has no port, start Chrome on that host yourself");
        return Ok(());
    };

    let launch = matches.get_flag("launch")
        || prompt::confirm(
            &format!("Launch Chrome with remote debugging on port {}?", port),
            true,
        )?
        .unwrap_or(false);
    if !launch {
        return Ok(());
    }

    if chrome::launch_chrome(port, user_data_dir).await? {
        output::success(&format!("Chrome started on port {}", port));
    } else {
        output::warning("Chrome did not come up; start it manually");
    }
    Ok(())
}
