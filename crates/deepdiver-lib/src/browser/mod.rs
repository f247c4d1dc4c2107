//! Browser transport: CDP client, page abstraction and Chrome discovery.

pub mod cdp;
pub mod cdp_page;
pub mod chrome;
pub mod error;
pub mod locator;
pub mod page;

pub use cdp_page::CdpPage;
pub use error::BrowserError;
pub use locator::ElementState;
pub use page::{ElementHandle, Page};

use crate::errors::{DeepDiverError, Result};

/// Attach to the Chrome behind `cdp_url`, preferring a tab already on `prefer_host`.
pub async fn connect(cdp_url: &str, prefer_host: Option<&str>) -> Result<CdpPage> {
    if !chrome::is_cdp_running(cdp_url).await {
        return Err(DeepDiverError::CdpUnavailable {
            url: cdp_url.to_string(),
        });
    }
    let ws_url = chrome::page_websocket_url(cdp_url, prefer_host).await?;
    Ok(CdpPage::attach(&ws_url).await?)
}
