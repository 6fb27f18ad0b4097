//! Startup configuration read from the environment.

use reqwest::Url;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SCOPE: &str = "read:clients create:clients delete:clients update:clients";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("env var {0} is not set")]
    Missing(&'static str),
    #[error("env var {key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Tenant origin the token endpoint and management API live under.
    pub base_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
    pub scope: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let domain = require("AUTH0_DOMAIN")?;
        let base_url = base_url(&domain)?;
        let client_id = require("AUTH0_CLIENT_ID")?;
        let client_secret = require("AUTH0_CLIENT_SECRET")?;
        let audience = get("AUTH0_AUDIENCE").unwrap_or_else(|| default_audience(&base_url));
        let scope = get("AUTH0_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_owned());
        let port = match get("PORT") {
            Some(port) => port.trim().parse().map_err(|err| ConfigError::Invalid {
                key: "PORT",
                reason: format!("{err}"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            base_url,
            client_id,
            client_secret,
            audience,
            scope,
            port,
        })
    }
}

/// `tenant.auth0.com` means `https://tenant.auth0.com/`; an explicit
/// `http(s)://` origin is taken as is.
fn base_url(domain: &str) -> Result<Url, ConfigError> {
    let domain = domain.trim().trim_end_matches('/');
    let origin = if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_owned()
    } else {
        format!("https://{domain}")
    };
    let url = Url::parse(&origin).map_err(|err| ConfigError::Invalid {
        key: "AUTH0_DOMAIN",
        reason: err.to_string(),
    })?;
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid {
            key: "AUTH0_DOMAIN",
            reason: "no host".into(),
        });
    }
    Ok(url)
}

fn default_audience(base_url: &Url) -> String {
    format!("{}api/v2/", base_url)
}
