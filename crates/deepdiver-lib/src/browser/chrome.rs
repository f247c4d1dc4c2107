//! Locating, probing and launching a Chrome instance with remote debugging.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::error::BrowserError;
use crate::errors::{DeepDiverError, Result};

/// Executable names tried in order when launching Chrome.
pub const CHROME_CANDIDATES: &[&str] = &["google-chrome", "chromium", "chromium-browser", "chrome"];

/// Liveness probe timeout for `/json/version`.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Time given to a freshly spawned Chrome before probing it.
pub const LAUNCH_SETTLE: Duration = Duration::from_secs(3);

/// Response of `GET /json/version`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChromeVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: String,
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: String,
}

/// One entry of `GET /json/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: Option<String>,
}

/// First executable from `candidates` found on `path_var` (a `PATH` value).
pub fn find_in_path(candidates: &[&str], path_var: &OsStr) -> Option<PathBuf> {
    let dirs: Vec<PathBuf> = std::env::split_paths(path_var).collect();
    candidates.iter().find_map(|name| {
        dirs.iter()
            .map(|dir| dir.join(name))
            .find(|p| is_executable(p))
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

pub fn find_chrome_executable() -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    find_in_path(CHROME_CANDIDATES, &path)
}

/// Normalize a CDP endpoint to an `http://host:port` base without a trailing slash.
pub fn http_base(cdp_url: &str) -> String {
    let trimmed = cdp_url.trim().trim_end_matches('/');
    let host = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    let host = host.split('/').next().unwrap_or(host);
    format!("http://{host}")
}

/// Port of a CDP endpoint, if it names one.
pub fn port_from_url(cdp_url: &str) -> Option<u16> {
    let base = http_base(cdp_url);
    base.rsplit_once(':')?.1.parse().ok()
}

fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?)
}

pub async fn fetch_version(cdp_url: &str) -> Result<ChromeVersion> {
    let url = format!("{}/json/version", http_base(cdp_url));
    let version = http_client()?
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json::<ChromeVersion>()
        .await?;
    Ok(version)
}

/// True when `/json/version` answers within [`PROBE_TIMEOUT`].
pub async fn is_cdp_running(cdp_url: &str) -> bool {
    match fetch_version(cdp_url).await {
        Ok(v) => {
            tracing::debug!(browser = %v.browser, "CDP endpoint alive");
            true
        }
        Err(e) => {
            tracing::debug!(url = cdp_url, error = %e, "CDP endpoint not reachable");
            false
        }
    }
}

/// Pick the tab to drive: a page already showing `prefer_host`, else the first page.
pub fn select_page_target<'a>(targets: &'a [TargetInfo], prefer_host: Option<&str>) -> Option<&'a TargetInfo> {
    let pages = targets
        .iter()
        .filter(|t| t.kind == "page" && t.web_socket_debugger_url.is_some());
    if let Some(host) = prefer_host {
        if let Some(t) = pages.clone().find(|t| t.url.contains(host)) {
            return Some(t);
        }
    }
    pages.clone().next()
}

/// WebSocket URL of the tab to drive, opening a blank tab when none exist.
pub async fn page_websocket_url(cdp_url: &str, prefer_host: Option<&str>) -> Result<String> {
    let base = http_base(cdp_url);
    let client = http_client()?;

    let targets: Vec<TargetInfo> = client
        .get(format!("{base}/json/list"))
        .send()
        .await
        .map_err(|_| DeepDiverError::CdpUnavailable {
            url: cdp_url.to_string(),
        })?
        .error_for_status()?
        .json()
        .await?;

    if let Some(target) = select_page_target(&targets, prefer_host) {
        tracing::debug!(id = %target.id, url = %target.url, title = %target.title, "selected page target");
        if let Some(ws) = &target.web_socket_debugger_url {
            return Ok(ws.clone());
        }
    }

    tracing::info!("no open tab found, creating one");
    let created: TargetInfo = client
        .put(format!("{base}/json/new?about:blank"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    created.web_socket_debugger_url.ok_or_else(|| {
        BrowserError::NoPageTarget {
            url: cdp_url.to_string(),
        }
        .into()
    })
}

/// Spawn Chrome with remote debugging and report whether the endpoint came up.
///
/// Best effort: returns `Ok(false)` when no executable is found or the port
/// never answers, and only errors when spawning itself fails.
pub async fn launch_chrome(port: u16, user_data_dir: &Path) -> Result<bool> {
    let Some(exe) = find_chrome_executable() else {
        tracing::warn!("no Chrome executable found on PATH");
        return Ok(false);
    };

    tracing::info!(exe = %exe.display(), port, "launching Chrome with remote debugging");
    tokio::process::Command::new(&exe)
        .arg(format!("--remote-debugging-port={port}"))
        .arg(format!("--user-data-dir={}", user_data_dir.display()))
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()?;

    tokio::time::sleep(LAUNCH_SETTLE).await;
    Ok(is_cdp_running(&format!("http://localhost:{port}")).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: &str, kind: &str, url: &str) -> TargetInfo {
        TargetInfo {
            id: id.into(),
            kind: kind.into(),
            title: String::new(),
            url: url.into(),
            web_socket_debugger_url: Some(format!("ws://localhost:9222/devtools/page/{id}")),
        }
    }

    #[test]
    fn test_http_base() {
        assert_eq!(http_base("http://localhost:9222"), "http://localhost:9222");
        assert_eq!(http_base("http://localhost:9222/"), "http://localhost:9222");
        assert_eq!(http_base("localhost:9222"), "http://localhost:9222");
        assert_eq!(http_base("ws://10.0.0.2:9333/devtools/browser/x"), "http://10.0.0.2:9333");
    }

    #[test]
    fn test_port_from_url() {
        assert_eq!(port_from_url("http://localhost:9222"), Some(9222));
        assert_eq!(port_from_url("http://example.com"), None);
    }

    #[test]
    fn test_select_prefers_host() {
        let targets = vec![
            target("A", "page", "https://example.com"),
            target("B", "service_worker", "https://notebooklm.google.com/sw.js"),
            target("C", "page", "https://notebooklm.google.com/notebook/1"),
        ];
        let picked = select_page_target(&targets, Some("notebooklm.google.com")).unwrap();
        assert_eq!(picked.id, "C");
    }

    #[test]
    fn test_select_falls_back_to_first_page() {
        let targets = vec![
            target("W", "worker", "https://x"),
            target("A", "page", "https://example.com"),
        ];
        assert_eq!(select_page_target(&targets, Some("notebooklm")).unwrap().id, "A");
        assert!(select_page_target(&[], None).is_none());
    }

    #[test]
    fn test_target_list_deserializes() {
        let json = r#"[{"id":"T1","type":"page","title":"NotebookLM","url":"https://notebooklm.google.com/",
            "webSocketDebuggerUrl":"ws://localhost:9222/devtools/page/T1"}]"#;
        let targets: Vec<TargetInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(targets[0].kind, "page");
        assert_eq!(targets[0].web_socket_debugger_url.as_deref(), Some("ws://localhost:9222/devtools/page/T1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_in_path_respects_order_and_exec_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let chromium = dir.path().join("chromium");
        let chrome = dir.path().join("chrome");
        std::fs::write(&chromium, "#!/bin/sh\n").unwrap();
        std::fs::write(&chrome, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&chrome, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::set_permissions(&chromium, std::fs::Permissions::from_mode(0o644)).unwrap();

        let path_var = std::env::join_paths([dir.path()]).unwrap();
        assert_eq!(find_in_path(CHROME_CANDIDATES, &path_var), Some(chrome));

        std::fs::set_permissions(&chromium, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_in_path(CHROME_CANDIDATES, &path_var), Some(chromium));
    }

    #[tokio::test]
    async fn test_probe_unreachable_endpoint() {
        assert!(!is_cdp_running("http://127.0.0.1:1").await);
    }
}
