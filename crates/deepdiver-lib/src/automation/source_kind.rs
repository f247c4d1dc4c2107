//! Routing of a source argument to the file or URL ingestion workflow.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Hostname fragments that mark a URL as a video-hosting source.
pub const VIDEO_HOST_FRAGMENTS: &[&str] = &["youtube.com", "youtu.be"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    File(PathBuf),
    Website(String),
    Video(String),
}

/// Label stored on source records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLabel {
    File,
    Website,
    Youtube,
}

impl std::fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLabel::File => write!(f, "file"),
            SourceLabel::Website => write!(f, "website"),
            SourceLabel::Youtube => write!(f, "youtube"),
        }
    }
}

impl SourceKind {
    pub fn is_url(&self) -> bool {
        !matches!(self, SourceKind::File(_))
    }

    pub fn label(&self) -> SourceLabel {
        match self {
            SourceKind::File(_) => SourceLabel::File,
            SourceKind::Website(_) => SourceLabel::Website,
            SourceKind::Video(_) => SourceLabel::Youtube,
        }
    }

    /// Text of the source-type chip the URL flow clicks.
    pub fn chip_label(&self) -> Option<&'static str> {
        match self {
            SourceKind::File(_) => None,
            SourceKind::Website(_) => Some("Website"),
            SourceKind::Video(_) => Some("YouTube"),
        }
    }
}

/// Extract the lower-cased host of an `scheme://host[:port]/...` URL.
pub fn hostname(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

/// Total and deterministic: `http://`/`https://` prefixes are URLs, anything
/// else is a file path. URLs whose host contains a video-hosting fragment
/// are videos, every other URL is a website.
pub fn classify(input: &str) -> SourceKind {
    if input.starts_with("http://") || input.starts_with("https://") {
        let is_video = hostname(input)
            .map(|host| VIDEO_HOST_FRAGMENTS.iter().any(|frag| host.contains(frag)))
            .unwrap_or(false);
        if is_video {
            SourceKind::Video(input.to_string())
        } else {
            SourceKind::Website(input.to_string())
        }
    } else {
        SourceKind::File(PathBuf::from(input))
    }
}
