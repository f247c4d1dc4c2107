use std::io::IsTerminal;

use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::errors::{DeepDiverError, Result};

/// Ask a yes/no question on the terminal.
///
/// Returns `None` when stdin is not a terminal or the user cancels, so
/// scripted runs never block on a prompt.
pub fn confirm(prompt: &str, default: bool) -> Result<Option<bool>> {
    if !std::io::stdin().is_terminal() {
        tracing::debug!(prompt, "stdin is not a terminal, skipping prompt");
        return Ok(None);
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact_opt()
        .map_err(|e| DeepDiverError::Application(format!("Confirm prompt error: {e}")))
}
