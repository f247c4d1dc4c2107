//! Version CLI command — display application version.
//!
//! Honors the global `--json` flag for machine-readable output.

use clap::{ArgMatches, Command};
use serde::Serialize;

use crate::cli::{self, CommandBuilder, CommandCategory, CommandMeta};
use crate::errors::Result;

#[derive(Debug, Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
}

/// Build the `version` clap command.
pub fn version_command() -> Command {
    Command::new("version")
        .about("Show version information")
        .aliases(["v"])
}

/// Build the `CommandMeta` for registry registration.
pub fn version_meta() -> CommandMeta {
    CommandBuilder::from_clap(version_command())
        .category(CommandCategory::Core)
        .build()
}

/// Handle the `version` command.
pub fn handle_version(matches: &ArgMatches) -> Result<()> {
    let info = VersionInfo {
        name: "deepdiver",
        version: env!("CARGO_PKG_VERSION"),
    };
    if cli::is_json(matches) {
        crate::output::json(&info)?;
    } else {
        println!("{} version {}", info.name, info.version);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_command_parses() {
        let matches = version_command().try_get_matches_from(["version"]).unwrap();
        assert!(!cli::is_json(&matches));
        assert!(handle_version(&matches).is_ok());
    }

    #[test]
    fn test_version_json_flag_from_root() {
        let matches = cli::create_root_command()
            .subcommand(version_command())
            .try_get_matches_from(["deepdiver", "version", "--json"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert!(cli::is_json(sub));
        assert!(handle_version(sub).is_ok());
    }

    #[test]
    fn test_version_meta() {
        let meta = version_meta();
        assert_eq!(meta.name, "version");
        assert_eq!(meta.category, CommandCategory::Core);
        assert!(!meta.description.is_empty());
    }
}
