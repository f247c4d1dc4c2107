use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use super::error::BrowserError;
use super::locator::ElementState;

/// Opaque reference to a DOM element that a [`Page`] handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    /// Driver specific id (a CDP `objectId` for the real browser).
    pub id: String,
    /// Locator the element was found with, kept for logging.
    pub locator: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            locator: locator.into(),
        }
    }
}

/// The operations workflows need from a browser tab.
///
/// `query` is a single non-blocking probe; waiting and candidate fallback are
/// layered on top in `automation::resolver`. The CDP driver implements this
/// for a live Chrome tab and tests implement it with an in-memory page.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate and wait until the document has loaded.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Wait until `document.readyState` is `complete`.
    async fn wait_for_load(&self, timeout: Duration) -> Result<(), BrowserError>;

    async fn url(&self) -> Result<String, BrowserError>;

    /// First element matching `locator` in the given state, if any, right now.
    async fn query(
        &self,
        locator: &str,
        state: ElementState,
    ) -> Result<Option<ElementHandle>, BrowserError>;

    /// Every element matching `locator` in the given state, in document order.
    async fn query_all(
        &self,
        locator: &str,
        state: ElementState,
    ) -> Result<Vec<ElementHandle>, BrowserError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError>;

    /// Replace the element's value and fire `input`/`change`.
    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<(), BrowserError>;

    /// Type into the focused element key by key.
    async fn type_text(&self, text: &str) -> Result<(), BrowserError>;

    /// Press a named key such as `Enter` or `Escape`.
    async fn press_key(&self, key: &str) -> Result<(), BrowserError>;

    async fn set_input_files(
        &self,
        element: &ElementHandle,
        files: &[PathBuf],
    ) -> Result<(), BrowserError>;

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError>;

    /// Upper-case tag name, e.g. `INPUT`.
    async fn tag_name(&self, element: &ElementHandle) -> Result<String, BrowserError>;

    /// PNG bytes of the viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;

    /// Serialized HTML of the whole document.
    async fn content(&self) -> Result<String, BrowserError>;

    /// Click `trigger`, wait for the resulting download to land in `dest_dir`
    /// and return the downloaded file's path.
    async fn download(
        &self,
        trigger: &ElementHandle,
        dest_dir: &Path,
        timeout: Duration,
    ) -> Result<PathBuf, BrowserError>;
}
