pub mod registry;

use std::path::PathBuf;

pub use registry::{CommandBuilder, CommandCategory, CommandMeta, CommandRegistry};

/// Creates the root clap Command with the global flags.
///
/// `--verbose` / `-v` enables debug logging; combined with `--json` it is
/// suppressed to keep JSON output clean. `--config` points at a YAML file and
/// `--cdp-url` overrides every other source of the Chrome endpoint.
pub fn create_root_command() -> clap::Command {
    clap::Command::new("deepdiver")
        .about("Drive NotebookLM through Chrome DevTools to turn documents into podcasts")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Enable verbose output"),
        )
        .arg(
            clap::Arg::new("json")
                .long("json")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Output in JSON format"),
        )
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Configuration file to use"),
        )
        .arg(
            clap::Arg::new("cdp-url")
                .long("cdp-url")
                .global(true)
                .value_name("URL")
                .help("Chrome DevTools endpoint, e.g. http://localhost:9222"),
        )
}

/// Returns whether verbose mode is active based on parsed matches.
///
/// Verbose is suppressed when `--json` is also set, to keep JSON output clean.
pub fn is_verbose(matches: &clap::ArgMatches) -> bool {
    let verbose = matches.get_flag("verbose");
    let json = matches.get_flag("json");
    verbose && !json
}

/// Whether `--json` was given, at the root or on a subcommand.
pub fn is_json(matches: &clap::ArgMatches) -> bool {
    matches.try_get_one::<bool>("json").ok().flatten().copied().unwrap_or(false)
}

pub fn config_path(matches: &clap::ArgMatches) -> Option<PathBuf> {
    matches.get_one::<PathBuf>("config").cloned()
}

pub fn cdp_url_override(matches: &clap::ArgMatches) -> Option<String> {
    matches.get_one::<String>("cdp-url").cloned()
}
