use std::sync::Arc;

use deepdiver_lib::cli::{self, create_root_command, is_verbose, CommandRegistry};
use deepdiver_lib::commands::services::ServiceRegistry;
use deepdiver_lib::commands::{dispatch_command, register_commands};
use deepdiver_lib::config::ConfigManager;
use deepdiver_lib::errors::{handle_command_error, handle_fatal, DeepDiverError};
use deepdiver_lib::signal::{run_until_cancelled, SignalHandler};

#[tokio::main]
async fn main() {
    // Step 1: Parse args with every command registered
    let mut registry = CommandRegistry::new(create_root_command());
    if let Err(e) = register_commands(&mut registry) {
        handle_fatal(e);
    }
    let mut root = registry.build_root();
    let matches = root.clone().get_matches();

    // Step 2: Initialize Logger; verbose picks DEBUG, --json keeps it quiet
    let verbose = is_verbose(&matches);
    deepdiver_lib::logger::init(verbose);
    deepdiver_lib::logger::set_verbose(verbose);

    // Step 3: Spawn SignalHandler
    let signal_handler = SignalHandler::new();
    let shutdown_token = signal_handler.token();
    tokio::spawn(async move {
        signal_handler.listen().await;
    });

    // Step 4: Load configuration (--config, discovery, defaults) and services
    let config_manager = Arc::new(
        ConfigManager::load(
            cli::config_path(&matches).as_deref(),
            cli::cdp_url_override(&matches),
        )
        .await,
    );
    let services = ServiceRegistry::new(config_manager);

    // Step 5: Dispatch to subcommand handler
    match matches.subcommand() {
        Some((name, sub_matches)) => {
            tracing::debug!(command = name, "Executing command");
            let result = run_until_cancelled(
                &shutdown_token,
                dispatch_command(name, sub_matches, &services),
            )
            .await;
            if let Err(e) = result {
                handle_command_error(&e);
                std::process::exit(1);
            }
        }
        None => {
            // No subcommand, print help
            if let Err(e) = root.print_help() {
                handle_fatal(DeepDiverError::Application(format!(
                    "Failed to print help: {e}"
                )));
            }
        }
    }
}
