//! In-memory [`Page`] for workflow tests. Runs on tokio's clock so
//! `start_paused` tests can make elements appear "later".

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::browser::{locator, BrowserError, ElementHandle, ElementState, Page};

#[derive(Debug, Clone)]
pub struct FakeElement {
    visible: bool,
    appears_after: Duration,
    tag: String,
    attributes: HashMap<String, String>,
    text: String,
}

impl FakeElement {
    pub fn visible() -> Self {
        Self {
            visible: true,
            appears_after: Duration::ZERO,
            tag: "BUTTON".into(),
            attributes: HashMap::new(),
            text: String::new(),
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible: false,
            ..Self::visible()
        }
    }

    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }
}

/// What a click on a given locator does to the page.
#[derive(Debug, Clone)]
pub enum ClickEffect {
    SetUrl(String),
    Reveal(String, FakeElement),
    /// Like `Reveal`, but keeps elements already matching the locator.
    Append(String, FakeElement),
    Hide(String),
}

struct Placed {
    element: FakeElement,
    added: Instant,
}

impl Placed {
    fn now(element: FakeElement) -> Self {
        Self {
            element,
            added: Instant::now(),
        }
    }

    fn matches(&self, state: ElementState) -> bool {
        Instant::now() >= self.added + self.element.appears_after
            && match state {
                ElementState::Visible => self.element.visible,
                ElementState::Attached => true,
            }
    }
}

/// Handle id of the `index`th match of `locator`.
fn handle_id(locator: &str, index: usize) -> String {
    if index == 0 {
        locator.to_string()
    } else {
        format!("{locator}#{index}")
    }
}

#[derive(Default)]
struct State {
    url: String,
    html: String,
    elements: HashMap<String, Vec<Placed>>,
    failures: HashMap<String, BrowserError>,
    effects: HashMap<String, Vec<ClickEffect>>,
    redirects: HashMap<String, String>,
    queries: HashMap<String, usize>,
    values: HashMap<String, String>,
    calls: Vec<String>,
}

pub struct FakePage {
    state: Mutex<State>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            state: Mutex::new(State {
                url: url.to_string(),
                html: "<html><body></body></html>".into(),
                ..State::default()
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut state)
    }

    /// Place `element` as the only match for `locator`.
    pub fn add(&self, locator: &str, element: FakeElement) {
        self.with(|s| {
            s.elements.insert(locator.to_string(), vec![Placed::now(element)]);
        });
    }

    /// Place another match for `locator` after the existing ones.
    pub fn add_another(&self, locator: &str, element: FakeElement) {
        self.with(|s| {
            s.elements
                .entry(locator.to_string())
                .or_default()
                .push(Placed::now(element));
        });
    }

    pub fn fail_query(&self, locator: &str, error: BrowserError) {
        self.with(|s| {
            s.failures.insert(locator.to_string(), error);
        });
    }

    pub fn on_click(&self, locator: &str, effect: ClickEffect) {
        self.with(|s| s.effects.entry(locator.to_string()).or_default().push(effect));
    }

    /// Land on `to` whenever `goto(from)` is called.
    pub fn on_goto(&self, from: &str, to: &str) {
        self.with(|s| {
            s.redirects.insert(from.to_string(), to.to_string());
        });
    }

    pub fn set_html(&self, html: &str) {
        self.with(|s| s.html = html.to_string());
    }

    pub fn query_count(&self, locator: &str) -> usize {
        self.with(|s| s.queries.get(locator).copied().unwrap_or(0))
    }

    pub fn calls(&self) -> Vec<String> {
        self.with(|s| s.calls.clone())
    }

    pub fn clicked(&self, locator: &str) -> bool {
        let wanted = format!("click {}", locator);
        self.calls().iter().any(|c| *c == wanted)
    }

    pub fn value_of(&self, locator: &str) -> Option<String> {
        self.with(|s| s.values.get(locator).cloned())
    }

    fn element(&self, handle: &ElementHandle) -> Result<FakeElement, BrowserError> {
        self.with(|s| {
            let found = match s.elements.get(&handle.id) {
                Some(list) => list.first(),
                None => handle.id.rsplit_once('#').and_then(|(locator, n)| {
                    let index = n.parse::<usize>().ok()?;
                    s.elements.get(locator)?.get(index)
                }),
            };
            found
                .map(|p| p.element.clone())
                .ok_or_else(|| BrowserError::ElementNotInteractable {
                    reason: format!("{} is gone", handle.id),
                })
        })
    }

    /// Counts the query and applies scripted failures and locator syntax checks.
    fn begin_query(s: &mut State, locator: &str) -> Result<(), BrowserError> {
        *s.queries.entry(locator.to_string()).or_insert(0) += 1;
        if let Some(err) = s.failures.get(locator) {
            return Err(err.clone());
        }
        locator::parse(locator).map_err(|e| BrowserError::InvalidSelector {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        self.with(|s| {
            s.calls.push(format!("goto {}", url));
            s.url = s.redirects.get(url).cloned().unwrap_or_else(|| url.to_string());
        });
        Ok(())
    }

    async fn wait_for_load(&self, _timeout: Duration) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn url(&self) -> Result<String, BrowserError> {
        Ok(self.with(|s| s.url.clone()))
    }

    async fn query(
        &self,
        locator: &str,
        state: ElementState,
    ) -> Result<Option<ElementHandle>, BrowserError> {
        self.with(|s| {
            Self::begin_query(s, locator)?;
            let index = s
                .elements
                .get(locator)
                .and_then(|list| list.iter().position(|p| p.matches(state)));
            Ok(index.map(|i| ElementHandle::new(handle_id(locator, i), locator)))
        })
    }

    async fn query_all(
        &self,
        locator: &str,
        state: ElementState,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        self.with(|s| {
            Self::begin_query(s, locator)?;
            Ok(s.elements
                .get(locator)
                .map(|list| {
                    list.iter()
                        .enumerate()
                        .filter(|(_, p)| p.matches(state))
                        .map(|(i, _)| ElementHandle::new(handle_id(locator, i), locator))
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        self.element(element)?;
        self.with(|s| {
            s.calls.push(format!("click {}", element.id));
            let effects = s.effects.get(&element.id).cloned().unwrap_or_default();
            for effect in effects {
                match effect {
                    ClickEffect::SetUrl(url) => s.url = url,
                    ClickEffect::Reveal(locator, el) => {
                        s.elements.insert(locator, vec![Placed::now(el)]);
                    }
                    ClickEffect::Append(locator, el) => {
                        s.elements.entry(locator).or_default().push(Placed::now(el));
                    }
                    ClickEffect::Hide(locator) => {
                        s.elements.remove(&locator);
                    }
                }
            }
        });
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<(), BrowserError> {
        self.element(element)?;
        self.with(|s| {
            s.calls.push(format!("fill {}", element.id));
            s.values.insert(element.id.clone(), value.to_string());
        });
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), BrowserError> {
        self.with(|s| s.calls.push(format!("type {}", text)));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        self.with(|s| s.calls.push(format!("press {}", key)));
        Ok(())
    }

    async fn set_input_files(
        &self,
        element: &ElementHandle,
        files: &[PathBuf],
    ) -> Result<(), BrowserError> {
        self.element(element)?;
        let names: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
        self.with(|s| {
            s.calls.push(format!("files {}", element.id));
            s.values.insert(element.id.clone(), names.join(","));
        });
        Ok(())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        Ok(self.element(element)?.attributes.get(name).cloned())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        Ok(self.element(element)?.text)
    }

    async fn tag_name(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        Ok(self.element(element)?.tag.to_ascii_uppercase())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.with(|s| s.html.clone()))
    }

    async fn download(
        &self,
        trigger: &ElementHandle,
        dest_dir: &Path,
        _timeout: Duration,
    ) -> Result<PathBuf, BrowserError> {
        self.click(trigger).await?;
        let path = dest_dir.join("Audio Overview.mp3");
        std::fs::write(&path, b"ID3fake-audio").map_err(|e| BrowserError::DownloadFailed {
            reason: e.to_string(),
        })?;
        Ok(path)
    }
}
