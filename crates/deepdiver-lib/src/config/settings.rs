use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Typed view of `deepdiver.yaml`.
///
/// Every section and field has a default, so a partial file (or no file at
/// all) still yields a complete configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DeepDiverConfig {
    #[serde(rename = "BROWSER_SETTINGS")]
    pub browser: BrowserSettings,
    #[serde(rename = "NOTEBOOKLM_SETTINGS")]
    pub notebooklm: NotebookLmSettings,
    #[serde(rename = "AUDIO_SETTINGS")]
    pub audio: AudioSettings,
    #[serde(rename = "CONTENT_SETTINGS")]
    pub content: ContentSettings,
    #[serde(rename = "SESSION_TRACKING")]
    pub session: SessionSettings,
    #[serde(rename = "LOGGING")]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserSettings {
    /// Chrome DevTools HTTP endpoint. `None` falls through to the built-in default.
    pub cdp_url: Option<String>,
    pub user_data_dir: String,
    pub headless: bool,
    /// Navigation timeout in seconds.
    pub timeout: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            cdp_url: None,
            user_data_dir: "/tmp/chrome-deepdiver".into(),
            headless: false,
            timeout: 30,
        }
    }
}

impl BrowserSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotebookLmSettings {
    pub base_url: String,
    /// Seconds to wait for the signed-in landing page.
    pub login_timeout: u64,
    /// Seconds to wait for an upload trigger or an ingest acknowledgement.
    pub upload_timeout: u64,
    /// Per-candidate wait in seconds for ordinary UI elements.
    pub element_timeout: u64,
}

impl Default for NotebookLmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://notebooklm.google.com".into(),
            login_timeout: 60,
            upload_timeout: 30,
            element_timeout: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioSettings {
    pub default_format: String,
    pub default_language: String,
    pub default_length: String,
    /// Seconds before an audio generation job is declared failed.
    pub generation_timeout: u64,
    /// Seconds between completion-marker probes.
    pub poll_interval: u64,
    pub output_dir: String,
    pub naming_pattern: String,
    pub metadata_embed: bool,
    pub quality_check: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            default_format: "Deep Dive".into(),
            default_language: "English".into(),
            default_length: "Default".into(),
            generation_timeout: 600,
            poll_interval: 10,
            output_dir: "./output/podcasts".into(),
            naming_pattern: "{title}_{timestamp}".into(),
            metadata_embed: true,
            quality_check: true,
        }
    }
}

impl AudioSettings {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentSettings {
    pub supported_formats: Vec<String>,
    /// Human readable limit such as `50MB`.
    pub max_file_size: String,
    pub temp_dir: String,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            supported_formats: ["pdf", "docx", "txt", "md", "html"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_file_size: "50MB".into(),
            temp_dir: "./temp".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    pub session_dir: String,
    pub auto_save: bool,
    pub max_sessions: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_dir: "./sessions".into(),
            auto_save: true,
            max_sessions: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Directory receiving screenshots and HTML dumps from failed stages.
    pub debug_dir: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            debug_dir: "./debug".into(),
        }
    }
}

impl LoggingSettings {
    pub fn debug_dir(&self) -> PathBuf {
        PathBuf::from(&self.debug_dir)
    }
}

impl DeepDiverConfig {
    /// Returns human readable problems with the configuration. Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.notebooklm.base_url.starts_with("http://")
            && !self.notebooklm.base_url.starts_with("https://")
        {
            issues.push(format!(
                "NOTEBOOKLM_SETTINGS.base_url is not an http(s) URL: {}",
                self.notebooklm.base_url
            ));
        }
        if let Some(url) = &self.browser.cdp_url {
            if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
                issues.push(format!("BROWSER_SETTINGS.cdp_url is not an http(s) URL: {}", url));
            }
        }
        if self.audio.poll_interval == 0 {
            issues.push("AUDIO_SETTINGS.poll_interval must be greater than zero".into());
        }
        if self.audio.poll_interval > self.audio.generation_timeout {
            issues.push("AUDIO_SETTINGS.poll_interval exceeds generation_timeout".into());
        }
        if crate::content::parse_file_size(&self.content.max_file_size).is_none() {
            issues.push(format!(
                "CONTENT_SETTINGS.max_file_size is not a size: {}",
                self.content.max_file_size
            ));
        }
        if self.content.supported_formats.is_empty() {
            issues.push("CONTENT_SETTINGS.supported_formats is empty".into());
        }

        issues
    }
}
