//! Config CLI command — show where configuration came from and its effective
//! values. Named `config_cmd` to avoid conflict with the `config` module.

use std::path::PathBuf;

use clap::{ArgMatches, Command};
use serde::Serialize;

use crate::cli::{self, CommandBuilder, CommandCategory, CommandMeta};
use crate::config::{ConfigManager, DeepDiverConfig};
use crate::errors::Result;
use crate::output;

#[derive(Debug, Serialize)]
struct ConfigReport {
    config_file: Option<PathBuf>,
    cdp_url: String,
    cdp_url_source: String,
    config: DeepDiverConfig,
}

/// Build the `config` clap command.
pub fn config_command() -> Command {
    Command::new("config")
        .aliases(["c", "conf"])
        .about("Show the resolved config file, CDP URL and effective settings")
}

/// Build the `CommandMeta` for registry registration.
pub fn config_meta() -> CommandMeta {
    CommandBuilder::from_clap(config_command())
        .category(CommandCategory::Core)
        .build()
}

/// Handle the `config` command.
pub async fn handle_config(matches: &ArgMatches, config_mgr: &ConfigManager) -> Result<()> {
    let (cdp_url, source) = config_mgr.cdp_endpoint().await;

    if cli::is_json(matches) {
        return output::json(&ConfigReport {
            config_file: config_mgr.source_path().cloned(),
            cdp_url,
            cdp_url_source: source.to_string(),
            config: config_mgr.get_config().await,
        });
    }

    match config_mgr.source_path() {
        Some(path) => output::field("Config file", &path.display().to_string()),
        None => output::field("Config file", "none found, using defaults"),
    }
    output::field("CDP URL", &format!("{} (from {})", cdp_url, source));
    println!();
    print!("{}", config_mgr.to_yaml().await?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_command_parses() {
        let cmd = config_command();
        let _m = cmd.try_get_matches_from(["config"]).unwrap();
    }

    #[test]
    fn test_config_aliases() {
        let cmd = config_command();
        let aliases: Vec<&str> = cmd.get_all_aliases().collect();
        assert!(aliases.contains(&"c"));
        assert!(aliases.contains(&"conf"));
    }

    #[test]
    fn test_config_meta() {
        let meta = config_meta();
        assert_eq!(meta.name, "config");
        assert_eq!(meta.category, CommandCategory::Core);
    }

    #[tokio::test]
    async fn test_handle_config_with_defaults() {
        let mgr = ConfigManager::from_config(DeepDiverConfig::default());
        let matches = config_command().try_get_matches_from(["config"]).unwrap();
        handle_config(&matches, &mgr).await.unwrap();
    }
}
