use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STORE_PATH: &str = "output/notices.json";
pub const DEFAULT_PUBLICATIONS_PATH: &str = "content/publications.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing marketplace credentials: set {0}")]
    MissingCredentials(String),
    #[error("missing marketplace setting {0}")]
    MissingSetting(&'static str),
    #[error("invalid marketplace URL in {name}: {reason}")]
    InvalidUrl { name: &'static str, reason: String },
}

/// Client-credentials settings for the tender marketplace.
#[derive(Clone)]
pub struct MarketplaceSettings {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: url::Url,
    pub api_base: url::Url,
    pub scope: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for MarketplaceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url.as_str())
            .field("api_base", &self.api_base.as_str())
            .field("scope", &self.scope)
            .finish()
    }
}

impl MarketplaceSettings {
    /// Credentials are checked first so a misconfigured run fails before any URL parsing or I/O.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |k: &str| get(k).filter(|v| !v.trim().is_empty());

        let client_id = non_empty("UNGM_CLIENT_ID");
        let client_secret = non_empty("UNGM_CLIENT_SECRET");
        let (client_id, client_secret) = match (client_id, client_secret) {
            (Some(id), Some(secret)) => (id, secret),
            (None, Some(_)) => return Err(ConfigError::MissingCredentials("UNGM_CLIENT_ID".into())),
            (Some(_), None) => return Err(ConfigError::MissingCredentials("UNGM_CLIENT_SECRET".into())),
            (None, None) => {
                return Err(ConfigError::MissingCredentials(
                    "UNGM_CLIENT_ID and UNGM_CLIENT_SECRET".into(),
                ))
            }
        };

        let token_url = parse_url("UNGM_TOKEN_URL", non_empty("UNGM_TOKEN_URL"))?;
        let mut api_base = parse_url("UNGM_API_BASE", non_empty("UNGM_API_BASE"))?;
        // Url::join drops the last path segment unless the base ends with a slash.
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        let timeout = non_empty("UNGM_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(Self {
            client_id,
            client_secret,
            token_url,
            api_base,
            scope: non_empty("UNGM_SCOPE"),
            timeout,
        })
    }
}

fn parse_url(name: &'static str, value: Option<String>) -> Result<url::Url, ConfigError> {
    let raw = value.ok_or(ConfigError::MissingSetting(name))?;
    url::Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl { name, reason: e.to_string() })
}

/// Shared site credentials for the access gate. `None` leaves the site open.
#[derive(Clone)]
pub struct GateSettings {
    pub username: String,
    pub password: String,
    pub session_ttl: Duration,
    pub secure_cookie: bool,
}

impl std::fmt::Debug for GateSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateSettings")
            .field("username", &self.username)
            .field("session_ttl", &self.session_ttl)
            .field("secure_cookie", &self.secure_cookie)
            .finish_non_exhaustive()
    }
}

impl GateSettings {
    pub fn from_env() -> Option<Self> {
        let username = env::var("SITE_USERNAME").ok().filter(|v| !v.is_empty())?;
        let password = env::var("SITE_PASSWORD").ok().filter(|v| !v.is_empty())?;
        Some(Self {
            username,
            password,
            session_ttl: Duration::from_secs(6 * 60 * 60),
            secure_cookie: env::var("SITE_SECURE_COOKIE").map(|v| v == "1" || v == "true").unwrap_or(false),
        })
    }
}

/// Store path: CLI flag > NOTICES_PATH > default.
pub fn resolve_store_path(cli: Option<PathBuf>) -> PathBuf {
    cli.or_else(|| env::var("NOTICES_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
}

/// Publications catalog path: CLI flag > PUBLICATIONS_PATH > default.
pub fn resolve_publications_path(cli: Option<PathBuf>) -> PathBuf {
    cli.or_else(|| env::var("PUBLICATIONS_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLICATIONS_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn missing_credentials_fail_before_urls_are_checked() {
        let err = MarketplaceSettings::from_lookup(lookup(&[("UNGM_CLIENT_ID", "abc")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials(ref k) if k == "UNGM_CLIENT_SECRET"));

        let err = MarketplaceSettings::from_lookup(lookup(&[("UNGM_CLIENT_SECRET", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials(_)));
    }

    #[test]
    fn api_base_gains_trailing_slash() {
        let s = MarketplaceSettings::from_lookup(lookup(&[
            ("UNGM_CLIENT_ID", "id"),
            ("UNGM_CLIENT_SECRET", "secret"),
            ("UNGM_TOKEN_URL", "https://auth.example.org/oauth/token"),
            ("UNGM_API_BASE", "https://api.example.org/v1"),
        ]))
        .unwrap();
        assert_eq!(s.api_base.join("notice/search").unwrap().as_str(), "https://api.example.org/v1/notice/search");
        assert!(s.scope.is_none());
        assert_eq!(s.timeout, Duration::from_secs(30));
        assert!(!format!("{:?}", s).contains("\"secret\""));
    }

    #[test]
    fn missing_url_is_a_config_error() {
        let err = MarketplaceSettings::from_lookup(lookup(&[
            ("UNGM_CLIENT_ID", "id"),
            ("UNGM_CLIENT_SECRET", "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting("UNGM_TOKEN_URL")));
    }
}
