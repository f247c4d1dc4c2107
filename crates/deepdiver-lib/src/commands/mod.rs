pub mod config_cmd;
pub mod get_html;
pub mod init;
pub mod notebook;
pub mod podcast_cmd;
pub mod services;
pub mod session_cmd;
pub mod status;
pub mod test_cmd;
pub mod version;

use clap::ArgMatches;

use crate::cli::CommandRegistry;
use crate::errors::{DeepDiverError, Result};
use services::ServiceRegistry;

/// Register every deepdiver command.
pub fn register_commands(registry: &mut CommandRegistry) -> Result<()> {
    registry.register(version::version_meta())?;
    registry.register(config_cmd::config_meta())?;
    registry.register(init::init_meta())?;
    registry.register(status::status_meta())?;
    registry.register(test_cmd::test_meta())?;
    registry.register(get_html::get_html_meta())?;
    registry.register(notebook::notebook_meta())?;
    registry.register(podcast_cmd::podcast_meta())?;
    registry.register(session_cmd::session_meta())?;
    Ok(())
}

/// Route a parsed subcommand to its handler.
pub async fn dispatch_command(
    name: &str,
    matches: &ArgMatches,
    services: &ServiceRegistry,
) -> Result<()> {
    match name {
        "version" => version::handle_version(matches)?,
        "config" => config_cmd::handle_config(matches, &services.config_manager).await?,
        "init" => init::handle_init(matches, &services.config_manager).await?,
        "status" => status::handle_status(matches, services).await?,
        "test" => test_cmd::handle_test(matches, services).await?,
        "get-html" => get_html::handle_get_html(matches, services).await?,
        "notebook" => notebook::handle_notebook(matches, services).await?,
        "podcast" => podcast_cmd::handle_podcast(matches, services).await?,
        "session" => {
            let sessions = services.sessions().await;
            let mut tracker = sessions.lock().await;
            session_cmd::handle_session(matches, &mut tracker)?
        }
        _ => {
            return Err(DeepDiverError::Command(format!("Unknown command: {}", name)));
        }
    }
    Ok(())
}
