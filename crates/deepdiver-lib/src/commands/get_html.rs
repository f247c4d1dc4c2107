//! Get-html CLI command — dump the NotebookLM page for selector debugging.

use clap::{Arg, ArgMatches, Command};

use super::services::ServiceRegistry;
use crate::automation;
use crate::cli::{CommandBuilder, CommandCategory, CommandMeta};
use crate::content::html;
use crate::errors::Result;

/// Build the `get-html` clap command.
pub fn get_html_command() -> Command {
    Command::new("get-html")
        .about("Print the HTML of the NotebookLM page")
        .arg(
            Arg::new("text")
                .long("text")
                .action(clap::ArgAction::SetTrue)
                .help("Print the visible text instead of markup"),
        )
        .arg(
            Arg::new("no-navigate")
                .long("no-navigate")
                .action(clap::ArgAction::SetTrue)
                .help("Dump the current tab as-is instead of opening the app first"),
        )
}

/// Build the `CommandMeta` for registry registration.
pub fn get_html_meta() -> CommandMeta {
    CommandBuilder::from_clap(get_html_command())
        .category(CommandCategory::Browser)
        .build()
}

/// Handle the `get-html` command. Markup goes to stdout, logs to stderr.
pub async fn handle_get_html(matches: &ArgMatches, services: &ServiceRegistry) -> Result<()> {
    let session = services.browser().await?;
    if !matches.get_flag("no-navigate") {
        automation::navigate_to_app(&session).await?;
    }
    let markup = automation::page_content(&session).await?;
    if matches.get_flag("text") {
        println!("{}", html::html_to_text(&markup));
    } else {
        println!("{}", markup);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_html_command_parses() {
        let m = get_html_command()
            .try_get_matches_from(["get-html", "--text"])
            .unwrap();
        assert!(m.get_flag("text"));
        assert!(!m.get_flag("no-navigate"));
    }

    #[test]
    fn test_get_html_meta() {
        let meta = get_html_meta();
        assert_eq!(meta.name, "get-html");
        assert_eq!(meta.category, CommandCategory::Browser);
    }
}
