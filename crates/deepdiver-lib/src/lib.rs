// deepdiver-lib: NotebookLM automation over the Chrome DevTools Protocol

pub mod automation;
pub mod browser;
pub mod cli;
pub mod commands;
pub mod config;
pub mod content;
pub mod errors;
pub mod logger;
pub mod output;
pub mod podcast;
pub mod session;
pub mod signal;
