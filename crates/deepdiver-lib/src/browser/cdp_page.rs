//! [`Page`] implementation driving a live Chrome tab over CDP.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;

use super::cdp::CdpClient;
use super::error::BrowserError;
use super::locator::{self, ElementState};
use super::page::{ElementHandle, Page};

const LOAD_POLL: Duration = Duration::from_millis(100);

pub struct CdpPage {
    client: CdpClient,
}

impl CdpPage {
    /// Attach to a page target and enable the domains the driver relies on.
    pub async fn attach(ws_url: &str) -> Result<Self, BrowserError> {
        let client = CdpClient::connect(ws_url).await?;
        client.enable_domain("Page").await?;
        client.enable_domain("DOM").await?;
        client.enable_domain("Runtime").await?;
        tracing::info!(url = ws_url, "attached to browser tab");
        Ok(Self { client })
    }

    /// Evaluate an expression and return its JSON value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        let result = self
            .client
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;
        check_exception(&result)?;
        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Call `function` with `this` bound to the element.
    async fn call_on(
        &self,
        element: &ElementHandle,
        function: &str,
        args: &[Value],
    ) -> Result<Value, BrowserError> {
        let arguments: Vec<Value> = args.iter().map(|v| json!({ "value": v })).collect();
        let result = self
            .client
            .send(
                "Runtime.callFunctionOn",
                json!({
                    "objectId": element.id,
                    "functionDeclaration": function,
                    "arguments": arguments,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await
            .map_err(|e| match e {
                BrowserError::CdpError { message, .. } => BrowserError::ElementNotInteractable {
                    reason: format!("{}: {}", element.locator, message),
                },
                other => other,
            })?;
        check_exception(&result)?;
        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn key_event(&self, kind: &str, key: &str) -> Result<(), BrowserError> {
        self.client
            .send("Input.dispatchKeyEvent", build_key_event_params(kind, key))
            .await?;
        Ok(())
    }
}

fn check_exception(result: &Value) -> Result<(), BrowserError> {
    if let Some(exception) = result.get("exceptionDetails") {
        let message = exception
            .get("exception")
            .and_then(|e| e.get("description"))
            .and_then(Value::as_str)
            .or_else(|| exception.get("text").and_then(Value::as_str))
            .unwrap_or("unknown exception")
            .to_string();
        return Err(BrowserError::JsException { message });
    }
    Ok(())
}

#[async_trait]
impl Page for CdpPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let result = self
            .client
            .send_with_timeout("Page.navigate", json!({ "url": url }), timeout)
            .await?;
        if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
            return Err(BrowserError::NavigationFailed {
                reason: format!("{url}: {error_text}"),
            });
        }
        self.wait_for_load(timeout).await
    }

    async fn wait_for_load(&self, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Evaluation fails briefly while a navigation swaps contexts.
            if let Ok(state) = self.evaluate("document.readyState").await {
                if state.as_str() == Some("complete") {
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::PageLoadTimeout { duration: timeout });
            }
            tokio::time::sleep(LOAD_POLL).await;
        }
    }

    async fn url(&self) -> Result<String, BrowserError> {
        let value = self.evaluate("window.location.href").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol {
                detail: "location.href did not return a string".to_string(),
            })
    }

    async fn query(
        &self,
        locator: &str,
        state: ElementState,
    ) -> Result<Option<ElementHandle>, BrowserError> {
        let steps = parse_locator(locator)?;
        let result = self
            .client
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": locator::query_script(&steps, state),
                    "returnByValue": false,
                }),
            )
            .await?;
        check_exception(&result)?;

        let object_id = result
            .get("result")
            .and_then(|r| r.get("objectId"))
            .and_then(Value::as_str);
        Ok(object_id.map(|id| ElementHandle::new(id, locator)))
    }

    async fn query_all(
        &self,
        locator: &str,
        state: ElementState,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        let steps = parse_locator(locator)?;
        let result = self
            .client
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": locator::query_all_script(&steps, state),
                    "returnByValue": false,
                }),
            )
            .await?;
        check_exception(&result)?;

        let Some(array_id) = result
            .get("result")
            .and_then(|r| r.get("objectId"))
            .and_then(Value::as_str)
        else {
            return Ok(Vec::new());
        };
        let props = self
            .client
            .send(
                "Runtime.getProperties",
                json!({ "objectId": array_id, "ownProperties": true }),
            )
            .await?;
        Ok(array_element_ids(&props)
            .into_iter()
            .map(|id| ElementHandle::new(id, locator))
            .collect())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        let center = self
            .call_on(
                element,
                "function() { this.scrollIntoView({block: 'center', inline: 'center'}); \
                 const r = this.getBoundingClientRect(); \
                 return [r.left + r.width / 2, r.top + r.height / 2, r.width, r.height]; }",
                &[],
            )
            .await?;
        let (x, y) = parse_center(&center).ok_or_else(|| BrowserError::ElementNotInteractable {
            reason: format!("{} has no clickable box", element.locator),
        })?;

        for kind in ["mousePressed", "mouseReleased"] {
            self.client
                .send("Input.dispatchMouseEvent", build_click_params(x, y, kind))
                .await?;
        }
        tracing::debug!(locator = %element.locator, x, y, "clicked");
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<(), BrowserError> {
        self.call_on(
            element,
            "function(v) { this.focus(); \
             if ('value' in this) { this.value = v; } else { this.textContent = v; } \
             this.dispatchEvent(new Event('input', {bubbles: true})); \
             this.dispatchEvent(new Event('change', {bubbles: true})); }",
            &[json!(value)],
        )
        .await?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), BrowserError> {
        for ch in text.chars() {
            let s = ch.to_string();
            self.key_event("keyDown", &s).await?;
            self.key_event("keyUp", &s).await?;
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        self.key_event("keyDown", key).await?;
        self.key_event("keyUp", key).await
    }

    async fn set_input_files(
        &self,
        element: &ElementHandle,
        files: &[PathBuf],
    ) -> Result<(), BrowserError> {
        let files: Vec<String> = files
            .iter()
            .map(|p| std::path::absolute(p).unwrap_or_else(|_| p.clone()))
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        self.client
            .send(
                "DOM.setFileInputFiles",
                json!({ "files": files, "objectId": element.id }),
            )
            .await?;
        Ok(())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let value = self
            .call_on(element, "function(n) { return this.getAttribute(n); }", &[json!(name)])
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        let value = self
            .call_on(element, "function() { return this.innerText || this.textContent || ''; }", &[])
            .await?;
        Ok(value.as_str().unwrap_or_default().trim().to_string())
    }

    async fn tag_name(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        let value = self
            .call_on(element, "function() { return this.tagName; }", &[])
            .await?;
        Ok(value.as_str().unwrap_or_default().to_uppercase())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        let result = self
            .client
            .send("Page.captureScreenshot", json!({ "format": "png" }))
            .await?;
        let data = result
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol {
                detail: "Page.captureScreenshot returned no data".to_string(),
            })?;
        B64.decode(data).map_err(|e| BrowserError::Protocol {
            detail: format!("failed to decode screenshot: {e}"),
        })
    }

    async fn content(&self) -> Result<String, BrowserError> {
        let value = self.evaluate("document.documentElement.outerHTML").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol {
                detail: "outerHTML did not return a string".to_string(),
            })
    }

    async fn download(
        &self,
        trigger: &ElementHandle,
        dest_dir: &Path,
        timeout: Duration,
    ) -> Result<PathBuf, BrowserError> {
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| BrowserError::DownloadFailed {
                reason: format!("cannot create {}: {e}", dest_dir.display()),
            })?;
        let dest_dir = std::path::absolute(dest_dir).unwrap_or_else(|_| dest_dir.to_path_buf());

        self.client
            .send(
                "Page.setDownloadBehavior",
                json!({ "behavior": "allow", "downloadPath": dest_dir.to_string_lossy() }),
            )
            .await?;

        // Subscribe before clicking so the begin event cannot be missed.
        let mut events = self.client.subscribe();
        self.click(trigger).await?;

        let wait = async {
            let mut filename: Option<String> = None;
            loop {
                let event = match events.recv().await {
                    Ok(ev) => ev,
                    Err(RecvError::Lagged(n)) => {
                        tracing::debug!(skipped = n, "download watcher lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        return Err(BrowserError::DownloadFailed {
                            reason: "browser connection closed".to_string(),
                        })
                    }
                };
                match event.method.as_str() {
                    "Page.downloadWillBegin" => {
                        filename = event
                            .params
                            .get("suggestedFilename")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        tracing::info!(file = ?filename, "download started");
                    }
                    "Page.downloadProgress" => {
                        match event.params.get("state").and_then(Value::as_str) {
                            Some("completed") => {
                                let name = filename.clone().ok_or_else(|| {
                                    BrowserError::DownloadFailed {
                                        reason: "download finished without a file name".to_string(),
                                    }
                                })?;
                                return Ok(dest_dir.join(name));
                            }
                            Some("canceled") => {
                                return Err(BrowserError::DownloadFailed {
                                    reason: "download was canceled".to_string(),
                                })
                            }
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| BrowserError::DownloadFailed {
                reason: format!("no completed download within {timeout:?}"),
            })?
    }
}

fn parse_locator(locator: &str) -> Result<Vec<locator::LocatorStep>, BrowserError> {
    locator::parse(locator).map_err(|e| BrowserError::InvalidSelector {
        locator: locator.to_string(),
        reason: e.to_string(),
    })
}

/// Object ids of an array's elements from a `Runtime.getProperties` reply,
/// in index order.
fn array_element_ids(props: &Value) -> Vec<String> {
    let mut indexed: Vec<(usize, String)> = props
        .get("result")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|p| {
                    let index = p.get("name")?.as_str()?.parse::<usize>().ok()?;
                    let id = p.get("value")?.get("objectId")?.as_str()?;
                    Some((index, id.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, id)| id).collect()
}

/// `[x, y, width, height]` from the click probe; `None` for a zero-size box.
fn parse_center(value: &Value) -> Option<(f64, f64)> {
    let arr = value.as_array()?;
    let nums: Vec<f64> = arr.iter().filter_map(Value::as_f64).collect();
    if nums.len() != 4 || nums[2] <= 0.0 || nums[3] <= 0.0 {
        return None;
    }
    Some((nums[0], nums[1]))
}

/// `Input.dispatchMouseEvent` parameters for a left click at (x, y).
pub fn build_click_params(x: f64, y: f64, event_type: &str) -> Value {
    json!({
        "type": event_type,
        "x": x,
        "y": y,
        "button": "left",
        "clickCount": 1,
    })
}

/// `Input.dispatchKeyEvent` parameters. Named keys carry key codes, single
/// characters carry text.
pub fn build_key_event_params(event_type: &str, key: &str) -> Value {
    let named = match key {
        "Enter" => Some(("Enter", 13, "\r")),
        "Tab" => Some(("Tab", 9, "")),
        "Escape" => Some(("Escape", 27, "")),
        "Backspace" => Some(("Backspace", 8, "")),
        _ => None,
    };
    match named {
        Some((code, vk, text)) => {
            let kind = if event_type == "keyDown" && text.is_empty() {
                "rawKeyDown"
            } else {
                event_type
            };
            let mut params = json!({
                "type": kind,
                "key": key,
                "code": code,
                "windowsVirtualKeyCode": vk,
                "nativeVirtualKeyCode": vk,
            });
            if event_type == "keyDown" && !text.is_empty() {
                params["text"] = json!(text);
                params["unmodifiedText"] = json!(text);
            }
            params
        }
        None => json!({
            "type": event_type,
            "text": key,
            "unmodifiedText": key,
            "key": key,
        }),
    }
}
