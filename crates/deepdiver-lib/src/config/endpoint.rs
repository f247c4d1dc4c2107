/// Environment variable consulted when no explicit CDP URL is given.
pub const CDP_URL_ENV: &str = "DEEPDIVER_CDP_URL";

/// Used when neither flag, environment nor config provides an endpoint.
pub const DEFAULT_CDP_URL: &str = "http://localhost:9222";

/// Where a resolved CDP URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdpUrlSource {
    Override,
    Environment,
    Config,
    Default,
}

impl std::fmt::Display for CdpUrlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CdpUrlSource::Override => write!(f, "command line"),
            CdpUrlSource::Environment => write!(f, "{CDP_URL_ENV}"),
            CdpUrlSource::Config => write!(f, "config file"),
            CdpUrlSource::Default => write!(f, "default"),
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve the CDP endpoint: override > environment > config > default.
///
/// Blank strings count as absent at every level.
pub fn resolve_cdp_url(
    override_url: Option<&str>,
    env_url: Option<&str>,
    config_url: Option<&str>,
) -> (String, CdpUrlSource) {
    if let Some(url) = present(override_url) {
        return (url.to_string(), CdpUrlSource::Override);
    }
    if let Some(url) = present(env_url) {
        return (url.to_string(), CdpUrlSource::Environment);
    }
    if let Some(url) = present(config_url) {
        return (url.to_string(), CdpUrlSource::Config);
    }
    (DEFAULT_CDP_URL.to_string(), CdpUrlSource::Default)
}

/// [`resolve_cdp_url`] reading the environment level from `DEEPDIVER_CDP_URL`.
pub fn resolve_cdp_url_from_env(override_url: Option<&str>, config_url: Option<&str>) -> String {
    let env = std::env::var(CDP_URL_ENV).ok();
    let (url, source) = resolve_cdp_url(override_url, env.as_deref(), config_url);
    tracing::debug!(url = %url, source = %source, "resolved CDP endpoint");
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_chain() {
        let over = Some("http://x:1");
        let env = Some("http://y:2");
        let cfg = Some("http://z:3");

        assert_eq!(resolve_cdp_url(over, env, cfg).0, "http://x:1");
        assert_eq!(resolve_cdp_url(None, env, cfg).0, "http://y:2");
        assert_eq!(resolve_cdp_url(None, None, cfg).0, "http://z:3");
        assert_eq!(resolve_cdp_url(None, None, None).0, "http://localhost:9222");
    }

    #[test]
    fn test_sources_reported() {
        assert_eq!(resolve_cdp_url(Some("http://x:1"), None, None).1, CdpUrlSource::Override);
        assert_eq!(resolve_cdp_url(None, Some("http://y:2"), None).1, CdpUrlSource::Environment);
        assert_eq!(resolve_cdp_url(None, None, Some("http://z:3")).1, CdpUrlSource::Config);
        assert_eq!(resolve_cdp_url(None, None, None).1, CdpUrlSource::Default);
    }

    #[test]
    fn test_override_wins_regardless_of_others() {
        for env in [None, Some("http://y:2")] {
            for cfg in [None, Some("http://z:3")] {
                assert_eq!(resolve_cdp_url(Some("http://x:1"), env, cfg).0, "http://x:1");
            }
        }
    }

    #[test]
    fn test_blank_values_are_absent() {
        assert_eq!(
            resolve_cdp_url(Some("  "), Some(""), Some("http://z:3")).0,
            "http://z:3"
        );
    }
}
