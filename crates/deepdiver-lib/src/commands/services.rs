//! `ServiceRegistry`, the holder for lazily-initialized services shared
//! across command handlers.

use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::automation::{AutomationSettings, BrowserSession, Diagnostics};
use crate::browser;
use crate::config::ConfigManager;
use crate::content::ContentProcessor;
use crate::errors::Result;
use crate::podcast::PodcastManager;
use crate::session::SessionTracker;

/// Created once at startup and passed to the dispatch layer.
///
/// The browser connection is only opened when a command needs it, so
/// `session`, `podcast list` and friends work without Chrome running.
pub struct ServiceRegistry {
    pub config_manager: Arc<ConfigManager>,
    browser: OnceCell<Arc<BrowserSession>>,
    sessions: OnceCell<Arc<Mutex<SessionTracker>>>,
}

impl ServiceRegistry {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self {
            config_manager,
            browser: OnceCell::new(),
            sessions: OnceCell::new(),
        }
    }

    /// Attach to Chrome on first use. Prefers a tab already on the app host.
    pub async fn browser(&self) -> Result<Arc<BrowserSession>> {
        let session = self
            .browser
            .get_or_try_init(|| async {
                let config = self.config_manager.get_config().await;
                let cdp_url = self.config_manager.cdp_url().await;
                let host = app_host(&config.notebooklm.base_url);
                tracing::info!(cdp_url = %cdp_url, "connecting to Chrome");
                let page = browser::connect(&cdp_url, host.as_deref()).await?;
                Ok::<_, crate::errors::DeepDiverError>(Arc::new(BrowserSession::new(
                    Arc::new(page),
                    AutomationSettings::from_config(&config),
                    Diagnostics::new(config.logging.debug_dir()),
                )))
            })
            .await?;
        Ok(Arc::clone(session))
    }

    /// The session ledger, loaded from disk on first use.
    pub async fn sessions(&self) -> Arc<Mutex<SessionTracker>> {
        let tracker = self
            .sessions
            .get_or_init(|| async {
                let config = self.config_manager.get_config().await;
                Arc::new(Mutex::new(SessionTracker::from_settings(&config.session)))
            })
            .await;
        Arc::clone(tracker)
    }

    pub async fn podcasts(&self) -> PodcastManager {
        PodcastManager::from_settings(&self.config_manager.get_config().await.audio)
    }

    pub async fn content(&self) -> ContentProcessor {
        ContentProcessor::from_settings(&self.config_manager.get_config().await.content)
    }
}

/// Host part of `base_url`, used to pick the right browser tab.
pub fn app_host(base_url: &str) -> Option<String> {
    let rest = base_url.split_once("://").map_or(base_url, |(_, r)| r);
    let host = rest.split(['/', '?', '#']).next()?;
    (!host.is_empty()).then(|| host.to_string())
}
