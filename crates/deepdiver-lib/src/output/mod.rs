pub mod progress;
pub mod prompt;

use crossterm::style::{Color, Stylize};
use serde::Serialize;

use crate::errors::Result;

/// Print a success message in green to stdout.
pub fn success(msg: &str) {
    println!("{}", msg.with(Color::Green));
}

/// Print an error message in red to stderr.
pub fn error(msg: &str) {
    eprintln!("{}", msg.with(Color::Red));
}

/// Print a warning message in yellow to stderr.
pub fn warning(msg: &str) {
    eprintln!("{}", msg.with(Color::Yellow));
}

/// Print an info message in cyan to stdout.
pub fn info(msg: &str) {
    println!("{}", msg.with(Color::Cyan));
}

/// Print a dimmed `key: value` line, used by the status style commands.
pub fn field(key: &str, value: &str) {
    println!("  {} {}", format!("{key}:").with(Color::DarkGrey), value);
}

/// Print a value as pretty JSON on stdout.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printers_do_not_panic() {
        success("Notebook created");
        error("Something went wrong");
        warning("Careful now");
        info("FYI");
        field("cdp_url", "http://localhost:9222");
    }

    #[test]
    fn test_json_output() {
        let value = serde_json::json!({"id": "abc"});
        assert!(json(&value).is_ok());
    }
}
