use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::discovery;
use super::endpoint;
use super::settings::DeepDiverConfig;
use crate::errors::{DeepDiverError, Result};

/// Holds the effective configuration and where it was loaded from.
///
/// Loading never fails: a missing file means defaults, and an unreadable or
/// unparsable file logs a warning and also yields defaults.
pub struct ConfigManager {
    config: Arc<RwLock<DeepDiverConfig>>,
    source: Option<PathBuf>,
    cdp_override: Option<String>,
}

impl ConfigManager {
    /// Discover and load the config file.
    ///
    /// * `explicit` is tried first when it exists (`--config`).
    /// * `cdp_override` is the `--cdp-url` flag, kept for endpoint resolution.
    pub async fn load(explicit: Option<&Path>, cdp_override: Option<String>) -> Self {
        let source = discovery::discover(explicit);
        let config = match &source {
            Some(path) => Self::read_config(path).await,
            None => {
                tracing::debug!("no config file found, using defaults");
                DeepDiverConfig::default()
            }
        };

        Self {
            config: Arc::new(RwLock::new(config)),
            source,
            cdp_override,
        }
    }

    /// Build a manager around an in-memory config (tests, embedding).
    pub fn from_config(config: DeepDiverConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            source: None,
            cdp_override: None,
        }
    }

    /// Path of the file the config was loaded from, if any.
    pub fn source_path(&self) -> Option<&PathBuf> {
        self.source.as_ref()
    }

    /// Return a clone of the current configuration.
    pub async fn get_config(&self) -> DeepDiverConfig {
        self.config.read().await.clone()
    }

    /// The CDP endpoint after applying override, environment and config.
    pub async fn cdp_url(&self) -> String {
        let config = self.config.read().await;
        endpoint::resolve_cdp_url_from_env(
            self.cdp_override.as_deref(),
            config.browser.cdp_url.as_deref(),
        )
    }

    /// Like [`Self::cdp_url`], also reporting which level supplied it.
    pub async fn cdp_endpoint(&self) -> (String, endpoint::CdpUrlSource) {
        let config = self.config.read().await;
        let env = std::env::var(endpoint::CDP_URL_ENV).ok();
        endpoint::resolve_cdp_url(
            self.cdp_override.as_deref(),
            env.as_deref(),
            config.browser.cdp_url.as_deref(),
        )
    }

    /// Serialize the effective configuration as YAML.
    pub async fn to_yaml(&self) -> Result<String> {
        let config = self.config.read().await;
        Ok(serde_yaml::to_string(&*config)?)
    }

    /// Write a default config file at `path`, creating parent directories.
    ///
    /// Refuses to overwrite an existing file.
    pub async fn write_default(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(DeepDiverError::Config(format!(
                "{} already exists",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DeepDiverError::Config(format!("Failed to create config dir: {e}")))?;
        }
        let yaml = serde_yaml::to_string(&DeepDiverConfig::default())?;
        tokio::fs::write(path, yaml)
            .await
            .map_err(|e| DeepDiverError::Config(format!("Failed to write config file: {e}")))?;
        Ok(())
    }

    async fn read_config(path: &Path) -> DeepDiverConfig {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => match serde_yaml::from_str::<DeepDiverConfig>(&contents) {
                Ok(cfg) => {
                    tracing::debug!(path = %path.display(), "loaded config");
                    cfg
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse config file {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    DeepDiverConfig::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                DeepDiverConfig::default()
            }
        }
    }
}
