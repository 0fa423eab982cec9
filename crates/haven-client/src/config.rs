use std::time::Duration;

use reqwest::Url;

use haven_types::UserId;

use crate::error::{ClientError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:5001";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: Url,
    /// Bearer token for REST calls and gateway Identify.
    pub token: Option<String>,
    /// The viewer: whose reactions count as "acted" and whose permissions apply.
    pub user_id: UserId,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: &str, user_id: impl Into<UserId>) -> Result<Self> {
        Ok(Self {
            api_url: parse_base_url(api_url)?,
            token: None,
            user_id: user_id.into(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = get("HAVEN_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let user_id = get("HAVEN_USER_ID")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ClientError::Config("HAVEN_USER_ID is not set".into()))?;
        let timeout_secs = match get("HAVEN_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ClientError::Config(format!("HAVEN_REQUEST_TIMEOUT_SECS={raw}: {e}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let mut config = Self::new(&api_url, user_id)?;
        config.token = get("HAVEN_TOKEN").filter(|t| !t.is_empty());
        config.request_timeout = Duration::from_secs(timeout_secs);
        Ok(config)
    }
}

/// Parse and normalise so relative joins keep the full base path.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|e| ClientError::Config(format!("HAVEN_API_URL={raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Config(format!("HAVEN_API_URL={raw} cannot be a base URL")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = ClientConfig::from_lookup(lookup(&[("HAVEN_USER_ID", "alice")])).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:5001/");
        assert_eq!(config.user_id, UserId::from("alice"));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.token.is_none());
    }

    #[test]
    fn user_id_is_required() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn overrides_are_read() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("HAVEN_USER_ID", "bob"),
            ("HAVEN_API_URL", "https://chat.example.com/api"),
            ("HAVEN_TOKEN", "secret"),
            ("HAVEN_REQUEST_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.api_url.as_str(), "https://chat.example.com/api/");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[
            ("HAVEN_USER_ID", "bob"),
            ("HAVEN_REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("HAVEN_REQUEST_TIMEOUT_SECS"));
    }
}
